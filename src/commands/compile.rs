use clap::Args;
use std::io::{self, Write};
use crate::cli_util::print_compile_error;
use crate::compile;

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct CompileArgs {
    /// Read Brainfuck code from PATH instead of positional "<code>"
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Concatenated Brainfuck code parts
    #[arg(value_name = "code", trailing_var_arg = true)]
    pub code: Vec<String>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program: &str, args: CompileArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let code_str = match super::source_from_args(program, args.file, args.code, usage_and_exit) {
        Ok(s) => s,
        Err(exit_code) => return exit_code,
    };

    match compile(&code_str) {
        Ok(compiled) => {
            print!("{compiled}");
            let _ = io::stdout().flush();
            0
        }
        Err(err) => {
            print_compile_error(Some(program), &code_str, &err);
            1
        }
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} compile "<code>"
  {0} compile --file <PATH>

Options:
  --file,  -f <PATH>  Read Brainfuck code from PATH instead of positional "<code>"
  --help,  -h         Show this help

Description:
  Prints the compiled instruction stream: one row per instruction with its
  address, breakpoint marker, operand and (for loops) the jump target.
  Addresses are the ones accepted by `{0} run --break N` and the shell's `break N`.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
