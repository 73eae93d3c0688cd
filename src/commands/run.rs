use clap::Args;
use std::io::{self, Write};
use crate::cli_util::{print_compile_error, print_engine_error, print_instruction_window};
use crate::config::settings;
use crate::{compile, Engine, EngineError, RunOutcome};

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Stop at breakpoints (set with `!` in the source or --break)
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Set a breakpoint at instruction N (repeatable)
    #[arg(short = 'b', long = "break", value_name = "N")]
    pub breaks: Vec<usize>,

    /// Read Brainfuck code from PATH instead of positional "<code>"
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Concatenated Brainfuck code parts
    #[arg(value_name = "code", trailing_var_arg = true)]
    pub code: Vec<String>,

    /// Maximum instructions to execute before abort (fallback BFSTEP_MAX_STEPS; default unlimited)
    #[arg(long = "max-steps", value_name = "N")]
    pub max_steps: Option<usize>,

    /// Print a step-by-step table of executed instructions to stderr
    #[arg(short = 't', long = "trace")]
    pub trace: bool,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program: &str, args: RunArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let RunArgs {
        debug,
        breaks,
        file,
        code,
        max_steps,
        trace,
        ..
    } = args;

    let code_str = match super::source_from_args(program, file, code, usage_and_exit) {
        Ok(s) => s,
        Err(exit_code) => return exit_code,
    };

    let compiled = match compile(&code_str) {
        Ok(p) => p,
        Err(err) => {
            print_compile_error(Some(program), &code_str, &err);
            return 1;
        }
    };

    let settings = settings();
    let mut engine = Engine::with_tape_cells(compiled, settings.initial_cells);
    for position in breaks {
        if let Err(e) = engine.set_breakpoint(position) {
            eprintln!("{program}: {e}");
            let _ = io::stderr().flush();
            return 2;
        }
    }
    engine.set_debug_mode(debug);

    // Resolve limits: flags -> env/config -> unlimited
    let max_steps = max_steps.or(settings.max_steps);

    let result = if trace {
        run_traced(&mut engine, max_steps)
    } else {
        match max_steps {
            Some(limit) => engine.execute(limit),
            None => engine.run(),
        }
    };

    // Program output never ends with a newline of its own
    println!();
    let _ = io::stdout().flush();

    let exit_code = match result {
        Ok(RunOutcome::Finished) => 0,
        Ok(RunOutcome::Breakpoint(ip)) => {
            eprintln!(
                "Breakpoint hit at instruction {ip} (ptr={}, cell={}, steps={})",
                engine.tape().cursor(),
                engine.peek(),
                engine.steps()
            );
            print_instruction_window(engine.program(), ip, 2);
            0
        }
        Ok(RunOutcome::StepLimit) => {
            eprintln!("Execution aborted: step limit exceeded ({})", max_steps.unwrap_or_default());
            1
        }
        Err(err) => {
            print_engine_error(Some(program), engine.program(), &err);
            1
        }
    };

    let _ = io::stderr().flush();
    exit_code
}

/// Step through the program, writing one table row per executed instruction
/// to stderr. Honours the debug flag and the optional step budget.
fn run_traced(engine: &mut Engine, max_steps: Option<usize>) -> Result<RunOutcome, EngineError> {
    let mut err = io::stderr().lock();
    let _ = writeln!(err, "STEP | IP    | PTR   | CELL | INSTR");
    let _ = writeln!(err, "-----+-------+-------+------+------------");

    let mut executed = 0usize;
    loop {
        if engine.is_finished() {
            return Ok(RunOutcome::Finished);
        }
        if max_steps.is_some_and(|limit| executed >= limit) {
            return Ok(RunOutcome::StepLimit);
        }

        let ip = engine.program_cursor();
        let (ptr, cell) = (engine.tape().cursor(), engine.peek());
        let instr = engine.program()[ip];
        let stepped = engine.step();
        // The failing instruction still gets its row
        let _ = writeln!(err, "{:<4} | {:<5} | {:<5} | {:<4} | {}", executed, ip, ptr, cell, instr);
        executed += 1;
        let hit = stepped?;

        if hit && engine.debug_mode() {
            return Ok(RunOutcome::Breakpoint(engine.program_cursor()));
        }
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run [--debug|-d] [--break N]... [--max-steps N] [--trace] "<code>"
  {0} run [--debug|-d] [--break N]... [--max-steps N] [--trace] --file <PATH>

Options:
  --file,  -f <PATH>  Read Brainfuck code from PATH instead of positional "<code>"
  --debug, -d         Stop at the first breakpoint reached and report the state
  --break, -b <N>     Set a breakpoint at instruction N (see `{0} compile`)
  --max-steps <N>     Abort after N instructions (fallback BFSTEP_MAX_STEPS)
  --trace, -t         Print a step-by-step table of executed instructions to stderr
  --help,  -h         Show this help

Notes:
- Input (`,`) reads a single byte from stdin; on EOF the current cell is set to 0.
- `!` in the source sets a breakpoint on the next instruction.
- Characters outside of ><+-.,[]! are ignored.

Examples:
- Load Brainfuck code from a file:
    {0} run --file ./program.bf
- Stop before the second output:
    {0} run --debug "+.!+."
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
