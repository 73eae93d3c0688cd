//! The engine's memory: a row of byte cells that only grows to the right.

/// Number of zeroed cells a fresh tape starts with.
pub const DEFAULT_INITIAL_CELLS: usize = 10;

/// A leftward move would have taken the cursor before cell 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("tape cursor would leave the tape (cursor={cursor}, delta={delta})")]
pub struct OutOfBoundsLeft {
    pub cursor: usize,
    pub delta: isize,
}

/// A growable byte tape with a single cursor.
///
/// The cursor is stored as an index, so appending cells never invalidates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<u8>,
    cursor: usize,
}

impl Tape {
    /// Create a tape with [`DEFAULT_INITIAL_CELLS`] zeroed cells.
    pub fn new() -> Self {
        Self::with_cells(DEFAULT_INITIAL_CELLS)
    }

    /// Create a tape with a custom number of initial cells (at least one).
    pub fn with_cells(initial: usize) -> Self {
        Self {
            cells: vec![0; initial.max(1)],
            cursor: 0,
        }
    }

    pub fn current_value(&self) -> u8 {
        self.cells[self.cursor]
    }

    /// Add `delta` to the current cell, wrapping modulo 256.
    pub fn mutate(&mut self, delta: i32) {
        let cell = &mut self.cells[self.cursor];
        *cell = cell.wrapping_add(delta.rem_euclid(256) as u8);
    }

    /// Overwrite the current cell.
    pub fn set(&mut self, value: u8) {
        self.cells[self.cursor] = value;
    }

    /// Shift the cursor by `delta`.
    ///
    /// Moving right past the end appends zero cells; moving left past cell 0
    /// fails and leaves the tape untouched.
    pub fn move_by(&mut self, delta: isize) -> Result<(), OutOfBoundsLeft> {
        let Some(target) = self.cursor.checked_add_signed(delta) else {
            return Err(OutOfBoundsLeft {
                cursor: self.cursor,
                delta,
            });
        };

        if target >= self.cells.len() {
            self.cells.resize(target + 1, 0);
        }
        self.cursor = target;
        Ok(())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Cells within `radius` of the cursor, with the index of the first one.
    pub fn window(&self, radius: usize) -> (usize, &[u8]) {
        let base = self.cursor.saturating_sub(radius);
        let end = (self.cursor + radius + 1).min(self.cells.len());
        (base, &self.cells[base..end])
    }
}

impl Default for Tape {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tape_is_zeroed() {
        let tape = Tape::new();
        assert_eq!(tape.len(), DEFAULT_INITIAL_CELLS);
        assert_eq!(tape.cursor(), 0);
        assert!(tape.cells().iter().all(|&c| c == 0));
    }

    #[test]
    fn mutate_wraps_both_ways() {
        let mut tape = Tape::new();
        tape.mutate(-1);
        assert_eq!(tape.current_value(), 255);
        tape.mutate(2);
        assert_eq!(tape.current_value(), 1);
        tape.mutate(512);
        assert_eq!(tape.current_value(), 1);
        tape.mutate(-257);
        assert_eq!(tape.current_value(), 0);
    }

    #[test]
    fn moving_left_of_zero_fails_without_side_effects() {
        let mut tape = Tape::with_cells(3);
        tape.mutate(7);
        let before = tape.clone();
        let err = tape.move_by(-1).unwrap_err();
        assert_eq!(err, OutOfBoundsLeft { cursor: 0, delta: -1 });
        assert_eq!(tape, before);
    }

    #[test]
    fn partial_left_move_is_not_applied() {
        let mut tape = Tape::with_cells(5);
        tape.move_by(2).unwrap();
        assert!(tape.move_by(-3).is_err());
        assert_eq!(tape.cursor(), 2);
    }

    #[test]
    fn moving_right_grows_with_zeroes() {
        let mut tape = Tape::with_cells(2);
        tape.mutate(9);
        tape.move_by(5).unwrap();
        assert_eq!(tape.cursor(), 5);
        assert_eq!(tape.len(), 6);
        assert_eq!(tape.current_value(), 0);
        assert_eq!(tape.cells()[0], 9);
    }

    #[test]
    fn repeated_growth_reads_zero() {
        let mut tape = Tape::new();
        for _ in 0..50 {
            tape.move_by(1).unwrap();
            assert_eq!(tape.current_value(), 0);
        }
        assert_eq!(tape.len(), 51);
    }

    #[test]
    fn window_is_clamped_to_tape() {
        let mut tape = Tape::with_cells(4);
        tape.move_by(1).unwrap();
        let (base, cells) = tape.window(2);
        assert_eq!(base, 0);
        assert_eq!(cells.len(), 4);
    }
}
