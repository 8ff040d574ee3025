//! G-code parser
//!
//! Tokenization, an editable line model and a reader that tracks the
//! machine position across lines.

pub mod lexer;
pub mod line;
pub mod reader;

pub use lexer::{tokenize_line, Token, TokenKind};
pub use line::{GCodeLine, Parameter};
pub use reader::GCodeReader;

/// Parse a single line of G-code.
pub fn parse_line(line: &str) -> GCodeLine {
    GCodeLine::parse(line)
}
