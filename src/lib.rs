//! A small Brainfuck compiler and stepping debugger.
//!
//! Source text is compiled in one pass into a [`Program`]: runs of `+`/`-`
//! and `<`/`>` are folded into single counted instructions and every
//! `[`/`]` pair is resolved to relative jump offsets. An [`Engine`] then
//! executes the program against a [`Tape`].
//!
//! Features and behaviors:
//! - Tape starts with 10 zeroed cells and grows to the right on demand.
//! - Moving left of cell 0 is an error ([`EngineError::OutOfBoundsLeft`]).
//! - Cells wrap modulo 256.
//! - Input `,` reads one byte from the input provider (stdin by default);
//!   on EOF the current cell is set to 0.
//! - Output `.` writes the current cell as a raw byte.
//! - `!` in the source sets a breakpoint on the next instruction. Breakpoints
//!   suspend `run`/`execute` only while debug mode is on.
//! - Characters outside `+-<>.,[]!` are comments.
//!
//! Quick start:
//!
//! ```no_run
//! use bfstep::Engine;
//!
//! // Classic "Hello World!" in Brainfuck
//! let code = "++++++++++[>+++++++>++++++++++>+++>+<<<<-]>++.>+.+++++++..+++.>++.<<+++++++++++++++.>.+++.------.--------.>+.>.";
//! let mut bf = Engine::from_source(code).expect("program should compile");
//! bf.run().expect("program should run");
//! println!(); // ensure a trailing newline for readability
//! ```

pub mod cli_util;
pub mod commands;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod logging;
pub mod program;
pub mod repl;
pub mod tape;
mod theme;

pub use compiler::{compile, compile_chars, compile_reader, BracketKind, CompileError};
pub use engine::{BreakpointError, Engine, EngineError, RunOutcome};
pub use program::{Instruction, Program};
pub use tape::{OutOfBoundsLeft, Tape};

