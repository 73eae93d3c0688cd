use bfstep::commands::{self, compile::CompileArgs, repl::ReplArgs, run::RunArgs};
use bfstep::logging;
use clap::{Parser, Subcommand};
use std::env;
use std::io::{self, Write};

fn print_top_usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run     [--debug|-d] [--break N]... "<code>"   # Run Brainfuck code (args are concatenated)
  {0} run     [--debug|-d] --file <PATH>             # Run Brainfuck code loaded from file
  {0} compile "<code>" | --file <PATH>               # Print the compiled instruction stream
  {0} repl    [--bare|--editor] [--file <PATH>]      # Start the debugger shell
  {0}                                                # Same as `repl`

Run "{0} <subcommand> --help" for more info.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}

#[derive(Parser, Debug)]
#[command(name = "bfstep", disable_help_flag = true, disable_help_subcommand = true)]
struct Cli {
    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    help: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Run(RunArgs),
    Compile(CompileArgs),
    Repl(ReplArgs),
}

fn main() {
    // We still pull the program name for help rendering consistency
    let program = env::args().next().unwrap_or_else(|| String::from("bfstep"));

    logging::init();

    // Ctrl+C ends the whole process; the engine keeps no state worth unwinding.
    if let Err(e) = ctrlc::set_handler(|| {
        let _ = io::stdout().flush();
        eprintln!("\nCaught termination signal, exiting");
        let _ = io::stderr().flush();
        std::process::exit(130);
    }) {
        eprintln!("{program}: failed to set ctrl+c handler: {e}");
        let _ = io::stderr().flush();
        std::process::exit(1);
    }

    let cli = Cli::parse();

    if cli.help {
        print_top_usage_and_exit(&program, 0);
    }

    let code = match cli.command {
        Some(Command::Run(args)) => commands::run::run(&program, args),
        Some(Command::Compile(args)) => commands::compile::run(&program, args),
        Some(Command::Repl(args)) => commands::repl::run(&program, args),
        None => commands::repl::run(&program, ReplArgs::default()),
    };

    std::process::exit(code);
}
