//! Single-pass compiler from source text to a [`Program`].
//!
//! Recognised symbols are `+ - < > . , [ ]`. A `!` marks the next emitted
//! instruction as a breakpoint. Everything else is a comment.
//!
//! Runs of `+`/`-` fold into one [`Instruction::Add`] and runs of `<`/`>`
//! into one [`Instruction::Move`]. Comment characters inside a run do not
//! split it; any other instruction symbol or a `!` does.

use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;

use tracing::debug;

use crate::program::{Instruction, Program};

/// Errors that can occur while compiling source text.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Loops were not balanced; a matching `[` or `]` was not found.
    #[error("Unbalanced bracket {kind} at source position {position}")]
    UnbalancedBracket { position: usize, kind: BracketKind },

    /// The source could not be read.
    #[error("failed to read source: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },
}

/// Which side of the loop was unmatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketKind {
    Open,
    Close,
}

impl fmt::Display for BracketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BracketKind::Open => write!(f, "'['"),
            BracketKind::Close => write!(f, "']'"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Run {
    Add(i32),
    Move(isize),
}

impl Run {
    fn into_instruction(self) -> Instruction {
        match self {
            Run::Add(n) => Instruction::Add(n),
            Run::Move(n) => Instruction::Move(n),
        }
    }
}

#[derive(Default)]
struct Emitter {
    instructions: Vec<Instruction>,
    breakpoints: BTreeSet<usize>,
    run: Option<Run>,
    break_next: bool,
    // (instruction slot, source position) of every pending '['
    open: Vec<(usize, usize)>,
}

impl Emitter {
    fn add(&mut self, delta: i32) {
        match self.run {
            Some(Run::Add(n)) => self.run = Some(Run::Add(n.wrapping_add(delta))),
            _ => {
                self.flush();
                self.run = Some(Run::Add(delta));
            }
        }
    }

    fn shift(&mut self, delta: isize) {
        match self.run {
            Some(Run::Move(n)) => self.run = Some(Run::Move(n.saturating_add(delta))),
            _ => {
                self.flush();
                self.run = Some(Run::Move(delta));
            }
        }
    }

    fn flush(&mut self) {
        if let Some(run) = self.run.take() {
            self.push(run.into_instruction());
        }
    }

    /// Append an instruction and return its slot.
    fn push(&mut self, instruction: Instruction) -> usize {
        let slot = self.instructions.len();
        if std::mem::take(&mut self.break_next) {
            self.breakpoints.insert(slot);
        }
        self.instructions.push(instruction);
        slot
    }

    fn emit(&mut self, instruction: Instruction) -> usize {
        self.flush();
        self.push(instruction)
    }

    fn mark_breakpoint(&mut self) {
        self.flush();
        self.break_next = true;
    }

    fn open_loop(&mut self, position: usize) {
        // Placeholder offset, patched when the matching ']' arrives.
        let slot = self.emit(Instruction::JumpIfZero(0));
        self.open.push((slot, position));
    }

    fn close_loop(&mut self, position: usize) -> Result<(), CompileError> {
        self.flush();
        let Some((open_slot, _)) = self.open.pop() else {
            return Err(CompileError::UnbalancedBracket {
                position,
                kind: BracketKind::Close,
            });
        };
        let slot = self.instructions.len();
        let distance = (slot - open_slot) as isize;
        self.push(Instruction::JumpIfNonZero(-distance));
        self.instructions[open_slot] = Instruction::JumpIfZero(distance);
        Ok(())
    }

    fn finish(mut self) -> Result<Program, CompileError> {
        self.flush();
        if let Some(&(_, position)) = self.open.last() {
            return Err(CompileError::UnbalancedBracket {
                position,
                kind: BracketKind::Open,
            });
        }
        if self.break_next {
            debug!(target: "bfstep::compiler", "trailing breakpoint marker has no instruction; ignored");
        }
        debug!(
            target: "bfstep::compiler",
            instructions = self.instructions.len(),
            breakpoints = self.breakpoints.len(),
            "compiled program"
        );
        Ok(Program::new(self.instructions, self.breakpoints))
    }
}

/// Compile a stream of source characters.
pub fn compile_chars<I>(source: I) -> Result<Program, CompileError>
where
    I: IntoIterator<Item = char>,
{
    let mut emitter = Emitter::default();

    for (position, ch) in source.into_iter().enumerate() {
        match ch {
            '+' => emitter.add(1),
            '-' => emitter.add(-1),
            '>' => emitter.shift(1),
            '<' => emitter.shift(-1),
            '.' => {
                emitter.emit(Instruction::Output);
            }
            ',' => {
                emitter.emit(Instruction::Input);
            }
            '[' => emitter.open_loop(position),
            ']' => emitter.close_loop(position)?,
            '!' => emitter.mark_breakpoint(),
            _ => {}
        }
    }

    emitter.finish()
}

/// Compile source text.
pub fn compile(source: &str) -> Result<Program, CompileError> {
    compile_chars(source.chars())
}

/// Read UTF-8 source to the end and compile it.
pub fn compile_reader<R: Read>(mut reader: R) -> Result<Program, CompileError> {
    let mut source = String::new();
    reader
        .read_to_string(&mut source)
        .map_err(|e| CompileError::Io { source: e })?;
    compile(&source)
}
