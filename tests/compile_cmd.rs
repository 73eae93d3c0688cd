use assert_cmd::Command;
use predicates::prelude::*;

fn cargo_bin() -> Command {
    let mut cmd = Command::cargo_bin("bfstep").unwrap();
    cmd.env("BFSTEP_CONFIG", "/nonexistent/bfstep.toml")
        .env_remove("BFSTEP_MAX_STEPS")
        .env_remove("BFSTEP_INITIAL_CELLS")
        .env_remove("BFSTEP_LOG");
    cmd
}

#[test]
fn listing_shows_merged_runs_and_jump_targets() {
    cargo_bin()
        .args(["compile", "+++--[->>+<<]"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("ADDR  | BP | INSTR | OPERAND | TARGET")
                .and(predicate::str::contains("0     |    | add   | +1      | \n"))
                .and(predicate::str::contains("1     |    | jz    | +5      | 6"))
                .and(predicate::str::contains("6     |    | jnz   | -5      | 1")),
        )
        .stderr(predicate::str::is_empty());
}

#[test]
fn listing_marks_source_breakpoints() {
    cargo_bin()
        .args(["compile", "+!."])
        .assert()
        .success()
        .stdout(predicate::str::contains("1     | !  | out"));
}

#[test]
fn compile_without_code_is_usage_error() {
    cargo_bin()
        .arg("compile")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}
