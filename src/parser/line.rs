//! Parsed G-code line
//!
//! Keeps the original text alongside the parsed words so an untouched line
//! is written back byte for byte, while `set` rewrites single axes.

use crate::format::{FixedDecimal, E_DIGITS, XYZF_DIGITS};
use crate::parser::lexer::{tokenize_line, TokenKind};
use crate::parser::reader::GCodeReader;

/// Canonical order in which axes are written
const AXIS_ORDER: &str = "XYZIJEF";

/// A command parameter like "X10" or "S255"
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Upper-case parameter letter
    pub letter: char,
    /// Value text as written (without the letter)
    pub text: String,
    /// Numeric value, when the text is a number
    pub value: Option<f64>,
}

/// One line of G-code
#[derive(Debug, Clone, PartialEq)]
pub struct GCodeLine {
    raw: String,
    command: String,
    params: Vec<Parameter>,
    comment: Option<String>,
}

impl GCodeLine {
    pub fn parse(raw: &str) -> Self {
        let mut command = String::new();
        let mut params = Vec::new();
        let mut comments: Vec<&str> = Vec::new();

        for token in tokenize_line(raw) {
            match token.kind {
                TokenKind::Command => command = token.text.to_ascii_uppercase(),
                TokenKind::Parameter => {
                    let mut chars = token.text.chars();
                    let Some(letter) = chars.next() else { continue };
                    let text = chars.as_str();
                    params.push(Parameter {
                        letter: letter.to_ascii_uppercase(),
                        text: text.to_string(),
                        value: text.parse().ok(),
                    });
                }
                TokenKind::Comment => comments.push(token.text),
            }
        }

        Self {
            raw: raw.trim_end_matches(['\r', '\n']).to_string(),
            command,
            params,
            comment: (!comments.is_empty()).then(|| comments.join(" ")),
        }
    }

    /// Line text, rebuilt if an axis was rewritten
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Upper-case command word, empty for comment-only lines
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn cmd_is(&self, cmd: &str) -> bool {
        self.command.eq_ignore_ascii_case(cmd)
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn has(&self, letter: char) -> bool {
        self.params.iter().any(|p| p.letter == letter)
    }

    pub fn value(&self, letter: char) -> Option<f64> {
        self.params
            .iter()
            .find(|p| p.letter == letter)
            .and_then(|p| p.value)
    }

    pub fn x(&self) -> Option<f64> {
        self.value('X')
    }

    pub fn y(&self) -> Option<f64> {
        self.value('Y')
    }

    pub fn z(&self) -> Option<f64> {
        self.value('Z')
    }

    pub fn e(&self) -> Option<f64> {
        self.value('E')
    }

    pub fn f(&self) -> Option<f64> {
        self.value('F')
    }

    pub fn is_move(&self) -> bool {
        matches!(self.command.as_str(), "G0" | "G1" | "G2" | "G3")
    }

    /// Set an axis, inserting it in canonical order when missing.
    ///
    /// The value is written with the writer's precision for that axis.
    pub fn set(&mut self, letter: char, value: f64) {
        let digits = if letter == 'E' { E_DIGITS } else { XYZF_DIGITS };
        let text = FixedDecimal::new(value, digits).to_string();

        if let Some(param) = self.params.iter_mut().find(|p| p.letter == letter) {
            param.text = text;
            param.value = Some(value);
        } else {
            let rank = axis_rank(letter);
            let at = self
                .params
                .iter()
                .position(|p| axis_rank(p.letter) > rank)
                .unwrap_or(self.params.len());
            self.params.insert(
                at,
                Parameter {
                    letter,
                    text,
                    value: Some(value),
                },
            );
        }
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let mut raw = String::with_capacity(self.raw.len() + 8);
        raw.push_str(&self.command);
        for p in &self.params {
            raw.push(' ');
            raw.push(p.letter);
            raw.push_str(&p.text);
        }
        if let Some(comment) = &self.comment {
            raw.push(' ');
            raw.push_str(comment);
        }
        self.raw = raw;
    }

    /// Horizontal distance from the reader position
    pub fn dist_xy(&self, reader: &GCodeReader) -> f64 {
        let dx = self.x().map_or(0.0, |x| x - reader.x());
        let dy = self.y().map_or(0.0, |y| y - reader.y());
        dx.hypot(dy)
    }

    /// Vertical distance from the reader position, 0 without Z
    pub fn dist_z(&self, reader: &GCodeReader) -> f64 {
        self.z().map_or(0.0, |z| z - reader.z())
    }

    /// Filament pushed by this line, honouring the extrusion mode
    pub fn dist_e(&self, reader: &GCodeReader) -> f64 {
        match self.e() {
            Some(e) if reader.relative_e() => e,
            Some(e) => e - reader.e(),
            None => 0.0,
        }
    }

    /// Z after this line
    pub fn new_z(&self, reader: &GCodeReader) -> f64 {
        self.z().unwrap_or(reader.z())
    }

    /// Whether this is a move that pushes filament
    pub fn extruding(&self, reader: &GCodeReader) -> bool {
        matches!(self.command.as_str(), "G1" | "G2" | "G3") && self.dist_e(reader) > 0.0
    }
}

fn axis_rank(letter: char) -> usize {
    AXIS_ORDER.find(letter).unwrap_or(AXIS_ORDER.len())
}
