use std::io::{self, Write};
use crate::{BreakpointError, CompileError, EngineError, Program};

fn prefixed(program: Option<&str>, msg: &str) -> String {
    match program {
        Some(p) => format!("{p}: {msg}"),
        None => msg.to_string(),
    }
}

/// Pretty-print a CompileError with caret positioning into `source`.
/// If `program` is `Some("bfstep")`, prefix messages with "bfstep: ...".
pub fn print_compile_error(program: Option<&str>, source: &str, err: &CompileError) {
    match err {
        CompileError::UnbalancedBracket { position, kind } => {
            let msg = prefixed(program, &format!("Parse error: unbalanced bracket {kind}"));
            print_error_with_context(&msg, source, *position);
        }
        CompileError::Io { source: e } => {
            eprintln!("{}", prefixed(program, &format!("I/O error: {e}")));
            let _ = io::stderr().flush();
        }
    }
}

/// Pretty-print an EngineError with the surrounding instructions.
pub fn print_engine_error(program: Option<&str>, compiled: &Program, err: &EngineError) {
    let msg = match err {
        EngineError::OutOfBoundsLeft { cursor, delta, .. } => {
            format!("Runtime error: tape pointer tried leaving tape (ptr={cursor}, move={delta})")
        }
        EngineError::Io { source, .. } => format!("I/O error: {source}"),
    };
    eprintln!("{} at instruction {}", prefixed(program, &msg), err.ip());
    print_instruction_window(compiled, err.ip(), 3);
}

pub fn print_breakpoint_error(err: &BreakpointError) {
    eprintln!("{err}");
    let _ = io::stderr().flush();
}

/// Print the instructions within `radius` of `ip`, marking `ip` with an arrow.
pub fn print_instruction_window(compiled: &Program, ip: usize, radius: usize) {
    let start = ip.saturating_sub(radius);
    let end = (ip + radius + 1).min(compiled.len());
    for addr in start..end {
        let marker = if addr == ip { "->" } else { "  " };
        eprintln!("  {marker} {addr:<5} {}", compiled[addr]);
    }
    if ip >= compiled.len() {
        eprintln!("  -> {ip:<5} <end>");
    }
    let _ = io::stderr().flush();
}

/// Print a concise error with source position and a caret context window,
/// working with UTF-8 by slicing using char indices.
pub fn print_error_with_context(prefix: &str, code: &str, pos: usize) {
    eprintln!("{prefix} at position {pos}");

    // Show a short window around the position for context
    const WINDOW_CHARS: usize = 32;

    let total_chars = code.chars().count();
    let start_char = pos.saturating_sub(WINDOW_CHARS);
    let end_char = (pos + WINDOW_CHARS + 1).min(total_chars);

    let start_byte = char_to_byte_index(code, start_char);
    let end_byte = char_to_byte_index(code, end_char);
    // Newlines would break the caret alignment
    let slice: String = code[start_byte..end_byte]
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    eprintln!("  {}", slice);

    // Caret under the exact position
    let caret_offset_chars = pos.saturating_sub(start_char);
    eprintln!("  {}^", " ".repeat(caret_offset_chars));
    let _ = io::stderr().flush();
}

/// Convert a char index into a byte index in the given UTF-8 string.
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(byte_idx, _)| byte_idx)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_index_maps_multibyte() {
        let s = "é+[";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 1), 2);
        assert_eq!(char_to_byte_index(s, 3), s.len());
        assert_eq!(char_to_byte_index(s, 10), s.len());
    }
}
