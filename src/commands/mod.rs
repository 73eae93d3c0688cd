//! Subcommand argument types and entry points used by `main.rs`.

use std::fs;
use std::io::{self, Write};

pub mod compile;
pub mod repl;
pub mod run;

/// Resolve program text from either `--file` or the positional parts.
///
/// Returns the exit code to use when neither (or both) were given, or when
/// the file cannot be read. `usage` is called for usage errors and never returns.
pub(crate) fn source_from_args(
    program: &str,
    file: Option<String>,
    code: Vec<String>,
    usage: fn(&str, i32) -> !,
) -> Result<String, i32> {
    if file.is_none() && code.is_empty() {
        usage(program, 2);
    }

    if file.is_some() && !code.is_empty() {
        eprintln!("{program}: cannot use positional code together with --file");
        usage(program, 2);
    }

    match file {
        Some(path) => fs::read_to_string(&path).map_err(|e| {
            eprintln!("{program}: failed to read code file as UTF-8: {e}");
            let _ = io::stderr().flush();
            1
        }),
        None => Ok(code.join("")),
    }
}
