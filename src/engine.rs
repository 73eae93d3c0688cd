//! The stepping execution engine.
//!
//! ```
//! use bfstep::Engine;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let out = Rc::new(RefCell::new(Vec::new()));
//! let sink = out.clone();
//! let mut engine = Engine::from_source("++>+++<.>.").unwrap();
//! engine.set_output_sink(move |b| sink.borrow_mut().push(b));
//! engine.run().unwrap();
//! assert_eq!(*out.borrow(), vec![2, 3]);
//! ```

use std::io::{self, Read, Write};

use tracing::{debug, trace};

use crate::compiler::{self, CompileError};
use crate::program::{Instruction, Program};
use crate::tape::{Tape, DEFAULT_INITIAL_CELLS};

/// Errors that stop execution.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A move would have taken the tape cursor before cell 0.
    #[error("Tape pointer tried leaving tape at instruction {ip} (cursor={cursor}, delta={delta})")]
    OutOfBoundsLeft { ip: usize, cursor: usize, delta: isize },

    /// The default stdin/stdout collaborator failed.
    #[error("I/O error at instruction {ip}: {source}")]
    Io {
        ip: usize,
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    /// Instruction index the error was raised at.
    pub fn ip(&self) -> usize {
        match self {
            EngineError::OutOfBoundsLeft { ip, .. } | EngineError::Io { ip, .. } => *ip,
        }
    }
}

/// Rejected breakpoint edits. These never affect the engine state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BreakpointError {
    #[error("No instruction at {position} (program has {len} instructions)")]
    OutOfRange { position: usize, len: usize },

    #[error("No breakpoint found at {position}")]
    NotSet { position: usize },
}

/// Why `run` or `execute` handed control back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The program cursor reached the end of the program.
    Finished,
    /// Debug mode is on and the cursor reached a breakpoint at this position.
    Breakpoint(usize),
    /// `execute` used up its step budget.
    StepLimit,
}

type OutputSink = Box<dyn FnMut(u8)>;
type InputProvider = Box<dyn FnMut() -> Option<u8>>;

/// Executes a compiled [`Program`] against a [`Tape`].
///
/// The engine keeps:
/// - the frozen instruction stream,
/// - the tape and its cursor,
/// - a program cursor in `0..=len` where `len` means finished,
/// - one breakpoint flag per instruction and a debug flag gating them.
pub struct Engine {
    program: Program,
    tape: Tape,
    initial_cells: usize,
    ip: usize,
    breakpoints: Vec<bool>,
    debug_mode: bool,
    steps: u64,
    // Optional hooks; stdout/stdin are used when unset.
    output_sink: Option<OutputSink>,
    input_provider: Option<InputProvider>,
}

impl Engine {
    /// Create an engine with the default tape size.
    pub fn new(program: Program) -> Self {
        Self::with_tape_cells(program, DEFAULT_INITIAL_CELLS)
    }

    /// Create an engine whose tape starts with `initial_cells` cells.
    pub fn with_tape_cells(program: Program, initial_cells: usize) -> Self {
        let mut breakpoints = vec![false; program.len()];
        for &bp in program.breakpoints() {
            breakpoints[bp] = true;
        }
        Self {
            program,
            tape: Tape::with_cells(initial_cells),
            initial_cells,
            ip: 0,
            breakpoints,
            debug_mode: false,
            steps: 0,
            output_sink: None,
            input_provider: None,
        }
    }

    /// Compile `source` and wrap it in a fresh engine.
    pub fn from_source(source: &str) -> Result<Self, CompileError> {
        compiler::compile(source).map(Self::new)
    }

    /// Provide an output sink. When set, `.` sends bytes here instead of stdout.
    pub fn set_output_sink<F>(&mut self, sink: F)
    where
        F: FnMut(u8) + 'static,
    {
        self.output_sink = Some(Box::new(sink));
    }

    /// Provide an input provider. When set, `,` reads from it instead of stdin.
    /// Returning `None` means EOF and stores 0 in the cell.
    pub fn set_input_provider<F>(&mut self, provider: F)
    where
        F: FnMut() -> Option<u8> + 'static,
    {
        self.input_provider = Some(Box::new(provider));
    }

    /// Execute one instruction.
    ///
    /// Returns whether the new program cursor sits on a breakpoint, whatever
    /// the debug mode. Stepping a finished engine does nothing.
    pub fn step(&mut self) -> Result<bool, EngineError> {
        let ip = self.ip;
        let Some(&instr) = self.program.get(ip) else {
            return Ok(false);
        };

        trace!(
            target: "bfstep::engine",
            ip,
            ptr = self.tape.cursor(),
            cell = self.tape.current_value(),
            %instr,
            "step"
        );

        let next = match instr {
            Instruction::Add(delta) => {
                self.tape.mutate(delta);
                ip + 1
            }
            Instruction::Move(delta) => {
                self.tape
                    .move_by(delta)
                    .map_err(|e| EngineError::OutOfBoundsLeft { ip, cursor: e.cursor, delta: e.delta })?;
                ip + 1
            }
            Instruction::Input => {
                let byte = self.read_byte()?;
                self.tape.set(byte.unwrap_or(0));
                ip + 1
            }
            Instruction::Output => {
                self.write_byte(self.tape.current_value())?;
                ip + 1
            }
            Instruction::JumpIfZero(offset) if self.tape.current_value() == 0 => jump(ip, offset),
            Instruction::JumpIfNonZero(offset) if self.tape.current_value() != 0 => jump(ip, offset),
            Instruction::JumpIfZero(_) | Instruction::JumpIfNonZero(_) => ip + 1,
        };

        self.ip = next;
        self.steps += 1;
        Ok(self.has_breakpoint(next))
    }

    /// Step until the program finishes or, in debug mode, a breakpoint is reached.
    pub fn run(&mut self) -> Result<RunOutcome, EngineError> {
        while !self.is_finished() {
            if self.step()? && self.debug_mode {
                return Ok(self.suspend());
            }
        }
        debug!(target: "bfstep::engine", steps = self.steps, "program finished");
        Ok(RunOutcome::Finished)
    }

    /// Like [`Engine::run`] but executes at most `count` instructions.
    pub fn execute(&mut self, count: usize) -> Result<RunOutcome, EngineError> {
        for _ in 0..count {
            if self.is_finished() {
                break;
            }
            if self.step()? && self.debug_mode {
                return Ok(self.suspend());
            }
        }

        if self.is_finished() {
            Ok(RunOutcome::Finished)
        } else {
            Ok(RunOutcome::StepLimit)
        }
    }

    fn suspend(&self) -> RunOutcome {
        debug!(target: "bfstep::engine", ip = self.ip, steps = self.steps, "breakpoint hit");
        RunOutcome::Breakpoint(self.ip)
    }

    pub fn set_breakpoint(&mut self, position: usize) -> Result<(), BreakpointError> {
        let flag = self.breakpoint_slot(position)?;
        *flag = true;
        Ok(())
    }

    pub fn clear_breakpoint(&mut self, position: usize) -> Result<(), BreakpointError> {
        let flag = self.breakpoint_slot(position)?;
        if !*flag {
            return Err(BreakpointError::NotSet { position });
        }
        *flag = false;
        Ok(())
    }

    fn breakpoint_slot(&mut self, position: usize) -> Result<&mut bool, BreakpointError> {
        let len = self.breakpoints.len();
        self.breakpoints
            .get_mut(position)
            .ok_or(BreakpointError::OutOfRange { position, len })
    }

    fn has_breakpoint(&self, position: usize) -> bool {
        self.breakpoints.get(position).copied().unwrap_or(false)
    }

    /// Positions that currently carry a breakpoint, ascending.
    pub fn breakpoints(&self) -> impl Iterator<Item = usize> + '_ {
        self.breakpoints
            .iter()
            .enumerate()
            .filter_map(|(i, &set)| set.then_some(i))
    }

    pub fn set_debug_mode(&mut self, mode: bool) {
        self.debug_mode = mode;
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn is_finished(&self) -> bool {
        self.ip == self.program.len()
    }

    /// Index of the next instruction to execute.
    pub fn program_cursor(&self) -> usize {
        self.ip
    }

    /// Value of the current cell, without executing anything.
    pub fn peek(&self) -> u8 {
        self.tape.current_value()
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Number of instructions executed since creation or the last reset.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Start over with a fresh tape. Breakpoints, debug mode and hooks are kept.
    pub fn reset(&mut self) {
        debug!(target: "bfstep::engine", "engine reset");
        self.tape = Tape::with_cells(self.initial_cells);
        self.ip = 0;
        self.steps = 0;
    }

    fn read_byte(&mut self) -> Result<Option<u8>, EngineError> {
        if let Some(provider) = self.input_provider.as_mut() {
            return Ok(provider());
        }

        // Read exactly one byte from stdin; 0 bytes read is EOF.
        let mut buf = [0u8; 1];
        match io::stdin().read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) => Err(EngineError::Io { ip: self.ip, source: e }),
        }
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), EngineError> {
        if let Some(sink) = self.output_sink.as_mut() {
            sink(byte);
            return Ok(());
        }

        let mut stdout = io::stdout().lock();
        stdout
            .write_all(&[byte])
            .and_then(|()| stdout.flush())
            .map_err(|e| EngineError::Io { ip: self.ip, source: e })
    }
}

fn jump(ip: usize, offset: isize) -> usize {
    // Offsets are resolved by the compiler and always land inside the program.
    ip.wrapping_add_signed(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    fn engine(source: &str) -> (Engine, Rc<RefCell<Vec<u8>>>) {
        let out = Rc::new(RefCell::new(Vec::new()));
        let sink = out.clone();
        let mut engine = Engine::from_source(source).unwrap();
        engine.set_output_sink(move |b| sink.borrow_mut().push(b));
        engine.set_input_provider(|| None);
        (engine, out)
    }

    #[test]
    fn outputs_cells_in_order() {
        let (mut bf, out) = engine("++>+++<.>.");
        assert_eq!(bf.run().unwrap(), RunOutcome::Finished);
        assert_eq!(*out.borrow(), vec![2, 3]);
    }

    #[test]
    fn clear_loop_terminates() {
        let (mut bf, _) = engine("+[-]");
        assert_eq!(bf.run().unwrap(), RunOutcome::Finished);
        assert!(bf.is_finished());
        assert_eq!(bf.tape().cells()[0], 0);
    }

    #[test]
    fn skipped_loop_lands_on_close() {
        let (mut bf, _) = engine("[-]+");
        assert!(!bf.step().unwrap());
        assert_eq!(bf.program_cursor(), 2);
        bf.step().unwrap();
        assert_eq!(bf.program_cursor(), 3);
        bf.run().unwrap();
        assert_eq!(bf.peek(), 1);
    }

    #[test]
    fn nested_loops_multiply() {
        // 3 * 4 into cell 1
        let (mut bf, out) = engine("+++[>++++<-]>.");
        bf.run().unwrap();
        assert_eq!(*out.borrow(), vec![12]);
    }

    #[test]
    fn leftward_first_move_fails_before_mutation() {
        let (mut bf, _) = engine("<+");
        let err = bf.run().unwrap_err();
        assert!(matches!(err, EngineError::OutOfBoundsLeft { ip: 0, cursor: 0, delta: -1 }));
        assert!(bf.tape().cells().iter().all(|&c| c == 0));
        assert_eq!(bf.program_cursor(), 0);
        assert!(!bf.is_finished());
    }

    #[test]
    fn state_is_not_rolled_back_after_failure() {
        let (mut bf, _) = engine("+++>>.<<<");
        assert!(matches!(bf.run(), Err(EngineError::OutOfBoundsLeft { ip: 3, cursor: 2, delta: -3 })));
        assert_eq!(bf.tape().cells()[0], 3);
        assert_eq!(bf.tape().cursor(), 2);
    }

    #[test]
    fn tape_grows_on_demand() {
        let source = ">".repeat(25) + ".";
        let (mut bf, out) = engine(&source);
        bf.run().unwrap();
        assert_eq!(bf.tape().cursor(), 25);
        assert_eq!(*out.borrow(), vec![0]);
    }

    #[test]
    fn input_reads_from_provider_and_eof_is_zero() {
        let input = Rc::new(RefCell::new(VecDeque::from(vec![b'A'])));
        let (mut bf, out) = engine(",.+,.");
        let src = input.clone();
        bf.set_input_provider(move || src.borrow_mut().pop_front());
        bf.run().unwrap();
        assert_eq!(*out.borrow(), vec![b'A', 0]);
    }

    #[test]
    fn breakpoint_suspends_and_resumes() {
        let (mut bf, out) = engine("+.+.+.");
        bf.set_breakpoint(3).unwrap();
        bf.set_debug_mode(true);

        assert_eq!(bf.run().unwrap(), RunOutcome::Breakpoint(3));
        assert!(!bf.is_finished());
        assert_eq!(bf.program_cursor(), 3);
        assert_eq!(*out.borrow(), vec![1]);

        assert_eq!(bf.run().unwrap(), RunOutcome::Finished);
        assert_eq!(*out.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn breakpoint_inside_loop_hits_every_iteration() {
        let (mut bf, _) = engine("+++[!-]");
        bf.set_debug_mode(true);
        let mut hits = 0;
        while bf.run().unwrap() != RunOutcome::Finished {
            hits += 1;
        }
        assert_eq!(hits, 3);
    }

    #[test]
    fn breakpoints_ignored_without_debug_mode() {
        let (mut bf, _) = engine("+!+!+");
        assert_eq!(bf.run().unwrap(), RunOutcome::Finished);
        assert_eq!(bf.peek(), 3);
    }

    #[test]
    fn step_reports_breakpoint_regardless_of_debug_mode() {
        let (mut bf, _) = engine("+!+");
        assert!(bf.step().unwrap());
    }

    #[test]
    fn execute_stops_after_count() {
        let (mut bf, _) = engine("+++.+.");
        assert_eq!(bf.execute(2).unwrap(), RunOutcome::StepLimit);
        assert_eq!(bf.program_cursor(), 2);
        assert_eq!(bf.execute(10).unwrap(), RunOutcome::Finished);
        assert_eq!(bf.steps(), 4);
    }

    #[test]
    fn execute_honours_breakpoints_in_debug_mode() {
        let (mut bf, _) = engine("+.+.+.");
        bf.set_breakpoint(2).unwrap();
        bf.set_debug_mode(true);
        assert_eq!(bf.execute(100).unwrap(), RunOutcome::Breakpoint(2));
    }

    #[test]
    fn execute_zero_on_unfinished_is_step_limit() {
        let (mut bf, _) = engine("+");
        assert_eq!(bf.execute(0).unwrap(), RunOutcome::StepLimit);
    }

    #[test]
    fn breakpoint_edits_are_validated() {
        let (mut bf, _) = engine("+.");
        assert_eq!(
            bf.set_breakpoint(2),
            Err(BreakpointError::OutOfRange { position: 2, len: 2 })
        );
        assert_eq!(bf.clear_breakpoint(1), Err(BreakpointError::NotSet { position: 1 }));
        bf.set_breakpoint(1).unwrap();
        assert_eq!(bf.breakpoints().collect::<Vec<_>>(), vec![1]);
        bf.clear_breakpoint(1).unwrap();
        assert_eq!(bf.breakpoints().count(), 0);
    }

    #[test]
    fn source_breakpoints_are_loaded() {
        let (bf, _) = engine("+!.");
        assert_eq!(bf.breakpoints().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn reset_keeps_breakpoints() {
        let (mut bf, _) = engine("++>+");
        bf.set_breakpoint(1).unwrap();
        bf.run().unwrap();
        bf.reset();
        assert_eq!(bf.program_cursor(), 0);
        assert_eq!(bf.steps(), 0);
        assert!(bf.tape().cells().iter().all(|&c| c == 0));
        assert_eq!(bf.breakpoints().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn stepping_finished_engine_is_noop() {
        let (mut bf, _) = engine("+");
        bf.run().unwrap();
        assert!(!bf.step().unwrap());
        assert_eq!(bf.steps(), 1);
    }

    #[test]
    fn empty_program_is_finished() {
        let (mut bf, _) = engine("");
        assert!(bf.is_finished());
        assert_eq!(bf.run().unwrap(), RunOutcome::Finished);
    }
}
