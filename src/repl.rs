//! Line-oriented debugger shell driving an [`Engine`].
//!
//! Program output goes to stdout, as do the views the user asks for (`peek`,
//! `tape`, `list`, `status`). Everything else (prompts, run results, errors)
//! goes to stderr.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::rc::Rc;
use reedline::{Signal, DefaultPrompt, DefaultPromptSegment, HistoryItem, Highlighter, StyledText};
use nu_ansi_term::Style;
use tracing::debug;
use crate::{cli_util, compile, theme, BreakpointError, CompileError, Engine, EngineError, RunOutcome};

/// Cells shown either side of the cursor by `tape`.
const TAPE_RADIUS: usize = 8;

pub const HELP: &str = r#"Commands:
  load PATH      Compile the file at PATH and make it the current program
  code SOURCE    Compile SOURCE (rest of the line) as the current program
  run            Run until the program finishes or hits a breakpoint (debug on)
  step [N]       Execute N instructions (default 1)
  break N        Set a breakpoint at instruction N
  clear N        Remove the breakpoint at instruction N
  debug on|off   Honour breakpoints during run/step
  peek           Show the current cell
  tape           Show the cells around the tape pointer
  list           Show the compiled instructions
  status         Show the program cursor, step count and breakpoints
  reset          Restart the program with a fresh tape (breakpoints are kept)
  help           Show this help
  exit           Leave the shell"#;

/// Errors reported by the shell. None of them end the session.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Unknown command '{0}' (try 'help')")]
    UnknownCommand(String),

    #[error("'{command}' needs {what}")]
    MissingArgument { command: &'static str, what: &'static str },

    #[error("'{0}' is not a valid number")]
    InvalidNumber(String),

    #[error("'{0}' is not on/off")]
    InvalidToggle(String),

    #[error("No program loaded (use 'load PATH' or 'code SOURCE')")]
    NoProgram,

    #[error("failed to read {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{error}")]
    Compile {
        code: String,
        #[source]
        error: CompileError,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Breakpoint(#[from] BreakpointError),
}

/// What the loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Exit,
}

/// Debugger state carried between commands.
pub struct Session {
    engine: Option<Engine>,
    initial_cells: usize,
    debug_mode: bool,
    output: Option<Rc<dyn Fn(u8)>>,
    input: Option<Rc<dyn Fn() -> Option<u8>>>,
}

impl Session {
    pub fn new(initial_cells: usize) -> Self {
        Self {
            engine: None,
            initial_cells,
            debug_mode: false,
            output: None,
            input: None,
        }
    }

    /// Route program output to `sink` instead of stdout, for every program loaded later.
    pub fn set_output_sink<F: Fn(u8) + 'static>(&mut self, sink: F) {
        self.output = Some(Rc::new(sink));
    }

    /// Route program input from `provider` instead of stdin, for every program loaded later.
    pub fn set_input_provider<F: Fn() -> Option<u8> + 'static>(&mut self, provider: F) {
        self.input = Some(Rc::new(provider));
    }

    pub fn engine(&self) -> Option<&Engine> {
        self.engine.as_ref()
    }

    fn engine_mut(&mut self) -> Result<&mut Engine, ShellError> {
        self.engine.as_mut().ok_or(ShellError::NoProgram)
    }

    /// Compile `code` and replace the current program. On failure the
    /// previous program stays loaded.
    pub fn load_source(&mut self, code: &str) -> Result<(), ShellError> {
        let program = compile(code).map_err(|error| ShellError::Compile {
            code: code.to_string(),
            error,
        })?;
        let mut engine = Engine::with_tape_cells(program, self.initial_cells);
        engine.set_debug_mode(self.debug_mode);
        if let Some(out) = self.output.clone() {
            engine.set_output_sink(move |b| out(b));
        }
        if let Some(input) = self.input.clone() {
            engine.set_input_provider(move || input());
        }
        debug!(target: "bfstep::repl", instructions = engine.program().len(), "program loaded");
        self.engine = Some(engine);
        Ok(())
    }

    pub fn load_file(&mut self, path: &str) -> Result<(), ShellError> {
        let code = fs::read_to_string(path).map_err(|source| ShellError::Load {
            path: path.to_string(),
            source,
        })?;
        self.load_source(&code)
    }

    /// Handle one command line.
    pub fn handle(&mut self, line: &str) -> Result<Control, ShellError> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "exit" | "quit" => return Ok(Control::Exit),
            "help" => eprintln!("{HELP}"),
            "load" => {
                if rest.is_empty() {
                    return Err(ShellError::MissingArgument { command: "load", what: "a PATH" });
                }
                self.load_file(rest)?;
                self.report_loaded();
            }
            "code" => {
                if rest.is_empty() {
                    return Err(ShellError::MissingArgument { command: "code", what: "program source" });
                }
                self.load_source(rest)?;
                self.report_loaded();
            }
            "run" => {
                let engine = self.engine_mut()?;
                if engine.is_finished() {
                    eprintln!("Program already finished (use 'reset' to start over)");
                } else {
                    let outcome = engine.run()?;
                    self.report_outcome(outcome);
                }
            }
            "step" => {
                let count = if rest.is_empty() { 1 } else { parse_number(rest)? };
                let outcome = self.engine_mut()?.execute(count)?;
                self.report_outcome(outcome);
            }
            "break" => {
                let position = parse_number(required(rest, "break")?)?;
                self.engine_mut()?.set_breakpoint(position)?;
                eprintln!("Breakpoint set at {position}");
            }
            "clear" => {
                let position = parse_number(required(rest, "clear")?)?;
                self.engine_mut()?.clear_breakpoint(position)?;
                eprintln!("Breakpoint cleared at {position}");
            }
            "debug" => {
                let mode = match rest {
                    "" => !self.debug_mode,
                    "on" | "true" | "1" => true,
                    "off" | "false" | "0" => false,
                    other => return Err(ShellError::InvalidToggle(other.to_string())),
                };
                self.debug_mode = mode;
                if let Some(engine) = self.engine.as_mut() {
                    engine.set_debug_mode(mode);
                }
                eprintln!("Debug mode {}", if mode { "on" } else { "off" });
            }
            "peek" => {
                let engine = self.engine_mut()?;
                let value = engine.peek();
                println!("cell[{}] = {} {}", engine.tape().cursor(), value, printable(value));
            }
            "tape" => println!("{}", format_tape(self.engine_mut()?)),
            "list" => print!("{}", format_listing(self.engine_mut()?)),
            "status" => println!("{}", format_status(self.engine_mut()?)),
            "reset" => {
                self.engine_mut()?.reset();
                eprintln!("Program reset");
            }
            other => return Err(ShellError::UnknownCommand(other.to_string())),
        }

        let _ = io::stdout().flush();
        let _ = io::stderr().flush();
        Ok(Control::Continue)
    }

    /// Print an error the way the CLI does, with caret or instruction context.
    pub fn report(&self, err: &ShellError) {
        match err {
            ShellError::Compile { code, error } => cli_util::print_compile_error(None, code, error),
            ShellError::Engine(error) => match self.engine.as_ref() {
                Some(engine) => cli_util::print_engine_error(None, engine.program(), error),
                None => eprintln!("{error}"),
            },
            ShellError::Breakpoint(error) => cli_util::print_breakpoint_error(error),
            other => eprintln!("{other}"),
        }
        let _ = io::stderr().flush();
    }

    fn report_loaded(&self) {
        if let Some(engine) = self.engine.as_ref() {
            let bps = engine.breakpoints().count();
            eprintln!("Loaded {} instructions ({bps} breakpoints)", engine.program().len());
        }
    }

    fn report_outcome(&self, outcome: RunOutcome) {
        // Program output may have left the cursor mid-line
        let _ = io::stdout().flush();
        match outcome {
            RunOutcome::Finished => eprintln!("\nProgram finished successfully"),
            RunOutcome::Breakpoint(ip) => {
                eprintln!("\nBreakpoint hit at instruction {ip}");
                if let Some(engine) = self.engine.as_ref() {
                    cli_util::print_instruction_window(engine.program(), ip, 2);
                }
            }
            RunOutcome::StepLimit => {
                if let Some(engine) = self.engine.as_ref() {
                    let next = engine
                        .program()
                        .get(engine.program_cursor())
                        .map(|i| i.to_string())
                        .unwrap_or_else(|| "<end>".to_string());
                    eprintln!(
                        "ip={} ptr={} cell={} next: {next}",
                        engine.program_cursor(),
                        engine.tape().cursor(),
                        engine.peek()
                    );
                }
            }
        }
    }
}

fn required<'a>(rest: &'a str, command: &'static str) -> Result<&'a str, ShellError> {
    if rest.is_empty() {
        Err(ShellError::MissingArgument { command, what: "an instruction index" })
    } else {
        Ok(rest)
    }
}

fn parse_number(s: &str) -> Result<usize, ShellError> {
    s.trim()
        .parse::<usize>()
        .map_err(|_| ShellError::InvalidNumber(s.to_string()))
}

fn printable(value: u8) -> String {
    if value.is_ascii_graphic() || value == b' ' {
        format!("'{}'", value as char)
    } else {
        String::new()
    }
}

/// Cells around the tape pointer, the current one bracketed.
pub fn format_tape(engine: &Engine) -> String {
    let tape = engine.tape();
    let (base, cells) = tape.window(TAPE_RADIUS);
    let mut out = format!("[{base}]");
    for (i, cell) in cells.iter().enumerate() {
        if base + i == tape.cursor() {
            let _ = write!(out, " >{cell}<");
        } else {
            let _ = write!(out, " {cell}");
        }
    }
    let _ = write!(out, "  (len {})", tape.len());
    out
}

/// Instruction listing with live breakpoints and the program cursor.
pub fn format_listing(engine: &Engine) -> String {
    let program = engine.program();
    let breakpoints: Vec<usize> = engine.breakpoints().collect();
    let mut out = String::new();
    for (addr, instr) in program.instructions().iter().enumerate() {
        let cursor = if addr == engine.program_cursor() { "->" } else { "  " };
        let bp = if breakpoints.contains(&addr) { "!" } else { " " };
        let _ = write!(out, "{cursor}{bp} {addr:<5} {instr}");
        if let Some(target) = program.jump_target(addr) {
            let _ = write!(out, "  ; -> {target}");
        }
        out.push('\n');
    }
    if engine.is_finished() {
        let _ = writeln!(out, "->  {:<5} <end>", program.len());
    }
    out
}

pub fn format_status(engine: &Engine) -> String {
    let breakpoints: Vec<String> = engine.breakpoints().map(|b| b.to_string()).collect();
    format!(
        "ip={}/{} steps={} ptr={} debug={} finished={} breakpoints=[{}]",
        engine.program_cursor(),
        engine.program().len(),
        engine.steps(),
        engine.tape().cursor(),
        if engine.debug_mode() { "on" } else { "off" },
        engine.is_finished(),
        breakpoints.join(", ")
    )
}

/// Interactive loop on a reedline editor.
pub fn repl_loop(session: &mut Session, prompt: &str, history_size: usize) -> io::Result<()> {
    // Initialize interactive line editor
    let mut editor = init_line_editor(history_size)?;
    let prompt = DefaultPrompt::new(DefaultPromptSegment::Basic(prompt.to_string()), DefaultPromptSegment::Empty);

    loop {
        let line = match editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => buffer,
            Ok(Signal::CtrlC) | Ok(Signal::CtrlD) => {
                // Leave cleanly; the prompt line may still be open
                println!();
                io::stdout().flush()?;
                return Ok(());
            }
            Err(e) => {
                eprintln!("repl: editor error: {e}");
                let _ = io::stderr().flush();
                return Ok(());
            }
        };

        if !line.trim().is_empty() {
            let _ = editor.history_mut().save(HistoryItem::from_command_line(line.clone()));
        }

        match session.handle(&line) {
            Ok(Control::Exit) => return Ok(()),
            Ok(Control::Continue) => {}
            Err(err) => session.report(&err),
        }
    }
}

fn init_line_editor(history_size: usize) -> io::Result<reedline::Reedline> {
    use reedline::{default_emacs_keybindings, Emacs, KeyCode, KeyModifiers, Reedline, ReedlineEvent};

    // Default emacs-like bindings; Alt/Ctrl + Up/Down browse history.
    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(KeyModifiers::ALT, KeyCode::Up, ReedlineEvent::PreviousHistory);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Up, ReedlineEvent::PreviousHistory);
    keybindings.add_binding(KeyModifiers::ALT, KeyCode::Down, ReedlineEvent::NextHistory);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Down, ReedlineEvent::NextHistory);

    let history = reedline::FileBackedHistory::new(history_size.max(1))
        .map_err(|e| io::Error::other(e.to_string()))?;

    let editor = Reedline::create()
        .with_highlighter(Box::new(CommandHighlighter))
        .with_history(Box::new(history))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    Ok(editor)
}

/// Non-interactive loop: one command per stdin line until EOF or `exit`.
///
/// Lines are read through the shared stdin handle so `,` instructions consume
/// the bytes that follow the command that started them.
pub fn bare_loop(session: &mut Session) -> io::Result<()> {
    loop {
        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            return Ok(());
        }

        match session.handle(&line) {
            Ok(Control::Exit) => return Ok(()),
            Ok(Control::Continue) => {}
            Err(err) => session.report(&err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplMode {
    Bare,
    Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFlagOverride {
    None,
    Bare,
    Editor,
}

pub fn select_mode(flag: ModeFlagOverride) -> Result<ReplMode, String> {
    // Flag override
    match flag {
        ModeFlagOverride::Bare => return Ok(ReplMode::Bare),
        ModeFlagOverride::Editor => {
            if !io::stdin().is_terminal() {
                return Err("cannot start editor: stdin is not a TTY (use --bare or BFSTEP_REPL_MODE=bare)".to_string());
            }
            return Ok(ReplMode::Editor);
        }
        ModeFlagOverride::None => {}
    }

    // Environment override
    if let Ok(val) = env::var("BFSTEP_REPL_MODE") {
        let v = val.trim().to_ascii_lowercase();
        return match v.as_str() {
            "bare" => Ok(ReplMode::Bare),
            "editor" => {
                if !io::stdin().is_terminal() {
                    return Err("cannot start editor: stdin is not a TTY (use BFSTEP_REPL_MODE=bare)".to_string());
                }
                Ok(ReplMode::Editor)
            }
            _ => Err(format!("invalid BFSTEP_REPL_MODE value: {val}, must be 'bare' or 'editor'")),
        };
    }

    // Auto-detect
    if io::stdin().is_terminal() {
        Ok(ReplMode::Editor)
    } else {
        Ok(ReplMode::Bare)
    }
}

/// Colours the command word and, for `code`, the source symbols after it.
struct CommandHighlighter;

impl Highlighter for CommandHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut out = StyledText::new();
        let trimmed = line.trim_start();
        let lead = line.len() - trimmed.len();
        let word_end = lead + trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());

        if word_end > 0 {
            out.push((theme::command(), line[..word_end].to_string()));
        }
        // Only `code` arguments are Brainfuck; everything else stays plain.
        let is_code = &line[lead..word_end] == "code";

        let mut current_style: Option<Style> = None;
        let mut buffer = String::new();
        for ch in line[word_end..].chars() {
            let style = if is_code { theme::symbol(ch) } else { theme::plain() };
            match current_style {
                Some(s) if s == style => buffer.push(ch),
                Some(s) => {
                    out.push((s, std::mem::take(&mut buffer)));
                    current_style = Some(style);
                    buffer.push(ch);
                }
                None => {
                    current_style = Some(style);
                    buffer.push(ch);
                }
            }
        }
        if let Some(s) = current_style {
            if !buffer.is_empty() {
                out.push((s, buffer));
            }
        }
        out
    }
}
