use std::io::{self, IsTerminal, Write};
use clap::Args;

use crate::config::settings;
use crate::repl::{bare_loop, repl_loop, select_mode, ModeFlagOverride, ReplMode, Session};

#[derive(Args, Debug, Default)]
#[command(disable_help_flag = true)]
pub struct ReplArgs {
    /// Force non-interactive bare mode
    #[arg(long = "bare", conflicts_with = "editor")]
    pub bare: bool,

    /// Force interactive mode (errors if stdin is not a TTY)
    #[arg(long = "editor", conflicts_with = "bare")]
    pub editor: bool,

    /// Load the program at PATH before the first prompt
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub file: Option<String>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

impl ReplArgs {
    pub fn mode_flag(&self) -> ModeFlagOverride {
        if self.bare {
            ModeFlagOverride::Bare
        } else if self.editor {
            ModeFlagOverride::Editor
        } else {
            ModeFlagOverride::None
        }
    }
}

// Public entry point for the debugger shell from main.rs
pub fn run(program: &str, args: ReplArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    // Determine mode: flags -> env -> auto-detect via is_terminal()
    let mode = match select_mode(args.mode_flag()) {
        Ok(m) => m,
        Err(msg) => {
            eprintln!("{program}: {msg}");
            let _ = io::stderr().flush();
            return 1;
        }
    };

    let settings = settings();
    let mut session = Session::new(settings.initial_cells);
    if let Some(path) = args.file.as_deref() {
        if let Err(err) = session.load_file(path) {
            session.report(&err);
        }
    }

    match mode {
        ReplMode::Editor => {
            // Print banners only if stderr is a TTY
            if io::stderr().is_terminal() {
                eprintln!("Brainfuck debugger (interactive editor mode)");
                eprintln!("Type 'help' for commands. Ctrl+d or 'exit' leaves, ctrl+c exits immediately");
                let _ = io::stderr().flush();
            }

            if let Err(e) = repl_loop(&mut session, &settings.prompt, settings.history_size) {
                eprintln!("{program}: REPL error: {e}");
                let _ = io::stderr().flush();
                return 1;
            }

            0
        }
        ReplMode::Bare => match bare_loop(&mut session) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("{program}: REPL error: {e}");
                let _ = io::stderr().flush();
                1
            }
        },
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} repl [--bare|--editor] [--file <PATH>]   # Start the Brainfuck debugger shell

Options:
  --help,   -h        Show this help
  --bare              Force non-interactive bare mode
  --editor            Force interactive editor mode (errors if stdin is not a TTY)
  --file,   -f        Load a program before the first prompt

Description:
  Starts a shell that compiles a program and lets you run it, single-step it,
  set and clear breakpoints, and inspect the tape.

{1}

Notes:
    - In bare mode each stdin line is one command; `,` reads the bytes that follow.
    - Ctrl+D or `exit` leaves the shell; Ctrl+C exits immediately.
    - Mode selection:
        * Flags: --bare|--editor override environment and auto-detection.
        * Env: BFSTEP_REPL_MODE=bare|editor overrides auto-detection.
        * Auto-detect: if stdin is a TTY, starts in interactive editor mode; otherwise, bare mode.
        * Banners are suppressed if stderr is not a TTY.
"#,
        program,
        crate::repl::HELP
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
