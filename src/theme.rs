//! Shell colours (Catppuccin Mocha), named by what they mark.

use nu_ansi_term::{Color, Style};

const COMMAND: Color = Color::Rgb(205, 214, 244);
const COMMENT: Color = Color::Rgb(108, 112, 134);

const MOVE_RIGHT: Color = Color::Rgb(137, 220, 235);
const MOVE_LEFT: Color = Color::Rgb(148, 226, 213);
const INCREMENT: Color = Color::Rgb(166, 227, 161);
const DECREMENT: Color = Color::Rgb(243, 139, 168);
const OUTPUT: Color = Color::Rgb(249, 226, 175);
const INPUT: Color = Color::Rgb(250, 179, 135);
const LOOP: Color = Color::Rgb(203, 166, 247);
const BREAKPOINT: Color = Color::Rgb(242, 205, 205);

/// The leading command word of a shell line.
pub fn command() -> Style {
    Style::new().fg(COMMAND).bold()
}

/// Anything that is neither a command word nor a source symbol.
pub fn plain() -> Style {
    Style::new().fg(COMMENT)
}

/// Style for one character of program source.
pub fn symbol(ch: char) -> Style {
    let color = match ch {
        '>' => MOVE_RIGHT,
        '<' => MOVE_LEFT,
        '+' => INCREMENT,
        '-' => DECREMENT,
        '.' => OUTPUT,
        ',' => INPUT,
        '[' | ']' => LOOP,
        '!' => return Style::new().fg(BREAKPOINT).bold().underline(),
        _ => return plain(),
    };
    Style::new().fg(color).bold()
}
