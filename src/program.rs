//! The compiled instruction stream.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Index;

/// One resolved instruction.
///
/// Jump offsets are relative to the jump's own slot: a jump at `p` with
/// offset `k` moves the program cursor to `p + k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Add(i32),
    Move(isize),
    Input,
    Output,
    JumpIfZero(isize),
    JumpIfNonZero(isize),
}

impl Instruction {
    /// Mnemonic used by listings and the trace table.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Add(_) => "add",
            Instruction::Move(_) => "move",
            Instruction::Input => "in",
            Instruction::Output => "out",
            Instruction::JumpIfZero(_) => "jz",
            Instruction::JumpIfNonZero(_) => "jnz",
        }
    }

    pub fn operand(&self) -> Option<isize> {
        match *self {
            Instruction::Add(n) => Some(n as isize),
            Instruction::Move(n) | Instruction::JumpIfZero(n) | Instruction::JumpIfNonZero(n) => Some(n),
            Instruction::Input | Instruction::Output => None,
        }
    }

    pub fn is_jump(&self) -> bool {
        matches!(self, Instruction::JumpIfZero(_) | Instruction::JumpIfNonZero(_))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operand() {
            Some(n) => write!(f, "{} {:+}", self.mnemonic(), n),
            None => write!(f, "{}", self.mnemonic()),
        }
    }
}

/// A compiled program: frozen instructions plus the breakpoints that were
/// marked with `!` in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    instructions: Box<[Instruction]>,
    breakpoints: BTreeSet<usize>,
}

impl Program {
    /// Freeze a resolved instruction list.
    pub(crate) fn new(instructions: Vec<Instruction>, breakpoints: BTreeSet<usize>) -> Self {
        debug_assert!(breakpoints.iter().all(|&bp| bp < instructions.len()));
        Self {
            instructions: instructions.into_boxed_slice(),
            breakpoints,
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Breakpoint positions marked in the source.
    pub fn breakpoints(&self) -> &BTreeSet<usize> {
        &self.breakpoints
    }

    /// Absolute target of the jump at `index`, if it is one.
    pub fn jump_target(&self, index: usize) -> Option<usize> {
        let instr = self.instructions.get(index)?;
        if !instr.is_jump() {
            return None;
        }
        index.checked_add_signed(instr.operand()?)
    }
}

impl Index<usize> for Program {
    type Output = Instruction;

    fn index(&self, index: usize) -> &Instruction {
        &self.instructions[index]
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ADDR  | BP | INSTR | OPERAND | TARGET")?;
        writeln!(f, "------+----+-------+---------+-------")?;
        for (addr, instr) in self.instructions.iter().enumerate() {
            let bp = if self.breakpoints.contains(&addr) { "!" } else { "" };
            let operand = instr.operand().map(|n| format!("{n:+}")).unwrap_or_default();
            let target = self.jump_target(addr).map(|t| t.to_string()).unwrap_or_default();
            writeln!(
                f,
                "{:<5} | {:<2} | {:<5} | {:<7} | {}",
                addr,
                bp,
                instr.mnemonic(),
                operand,
                target
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shows_signed_operands() {
        assert_eq!(Instruction::Add(3).to_string(), "add +3");
        assert_eq!(Instruction::Move(-2).to_string(), "move -2");
        assert_eq!(Instruction::Output.to_string(), "out");
    }

    #[test]
    fn jump_target_is_relative_to_slot() {
        let program = Program::new(
            vec![Instruction::JumpIfZero(2), Instruction::Add(-1), Instruction::JumpIfNonZero(-2)],
            BTreeSet::new(),
        );
        assert_eq!(program.jump_target(0), Some(2));
        assert_eq!(program.jump_target(2), Some(0));
        assert_eq!(program.jump_target(1), None);
        assert_eq!(program.jump_target(3), None);
    }

    #[test]
    fn listing_marks_breakpoints() {
        let program = Program::new(vec![Instruction::Add(1), Instruction::Output], BTreeSet::from([1]));
        let listing = program.to_string();
        let line = listing.lines().nth(3).unwrap();
        assert!(line.starts_with("1     | !"), "got {line:?}");
    }
}
