//! Command line builder
//!
//! Assembles one motion command (`G1`, or `G2`/`G3` for arcs). Axes are
//! appended in call order; writers call them in the order X, Y, Z, I/J, E, F.

use crate::format::number::push_fixed;
use crate::geometry::{Vec2, Vec3};

/// Decimal places for X, Y, Z, I, J and F.
pub const XYZF_DIGITS: usize = 3;
/// Decimal places for the extrusion axis.
pub const E_DIGITS: usize = 5;

/// Builder for a single newline-terminated command line
#[derive(Debug, Clone)]
pub struct LineBuilder {
    buf: String,
}

impl LineBuilder {
    /// Linear move (`G1`)
    pub fn linear() -> Self {
        Self::command("G1")
    }

    /// Arc move: `G3` when counter-clockwise, `G2` otherwise
    pub fn arc(ccw: bool) -> Self {
        Self::command(if ccw { "G3" } else { "G2" })
    }

    fn command(cmd: &str) -> Self {
        let mut buf = String::with_capacity(64);
        buf.push_str(cmd);
        Self { buf }
    }

    pub fn emit_axis(&mut self, axis: char, value: f64, digits: usize) {
        self.buf.push(' ');
        self.buf.push(axis);
        push_fixed(&mut self.buf, value, digits);
    }

    pub fn emit_xy(&mut self, point: Vec2) {
        self.emit_axis('X', point.x, XYZF_DIGITS);
        self.emit_axis('Y', point.y, XYZF_DIGITS);
    }

    pub fn emit_xyz(&mut self, point: Vec3) {
        self.emit_xy(point.xy());
        self.emit_z(point.z);
    }

    pub fn emit_z(&mut self, z: f64) {
        self.emit_axis('Z', z, XYZF_DIGITS);
    }

    /// Arc centre offset relative to the start point
    pub fn emit_ij(&mut self, offset: Vec2) {
        self.emit_axis('I', offset.x, XYZF_DIGITS);
        self.emit_axis('J', offset.y, XYZF_DIGITS);
    }

    pub fn emit_e(&mut self, e: f64) {
        self.emit_axis('E', e, E_DIGITS);
    }

    pub fn emit_f(&mut self, speed: f64) {
        self.emit_axis('F', speed, XYZF_DIGITS);
    }

    /// Integer parameter such as the arc turn count `P1`
    pub fn emit_param(&mut self, letter: char, value: u32) {
        self.buf.push(' ');
        self.buf.push(letter);
        self.buf.push_str(&value.to_string());
    }

    /// Raw text appended verbatim, e.g. a cooling marker
    pub fn emit_string(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    pub fn emit_comment(&mut self, allow_comments: bool, comment: &str) {
        if allow_comments && !comment.is_empty() {
            self.buf.push_str(" ; ");
            self.buf.push_str(comment);
        }
    }

    pub fn finish(mut self) -> String {
        self.buf.push('\n');
        self.buf
    }
}

/// A complete non-motion command line with an optional comment.
pub fn command_line(body: &str, allow_comments: bool, comment: &str) -> String {
    let mut line = String::with_capacity(body.len() + comment.len() + 4);
    line.push_str(body);
    if allow_comments && !comment.is_empty() {
        line.push_str(" ; ");
        line.push_str(comment);
    }
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_line_with_comment() {
        let mut w = LineBuilder::linear();
        w.emit_xy(Vec2::new(10.0, 20.5));
        w.emit_e(1.234567);
        w.emit_f(1800.0);
        w.emit_comment(true, "perimeter");
        assert_eq!(w.finish(), "G1 X10 Y20.5 E1.23457 F1800 ; perimeter\n");
    }

    #[test]
    fn comment_suppressed() {
        let mut w = LineBuilder::linear();
        w.emit_z(0.2);
        w.emit_comment(false, "lift Z");
        assert_eq!(w.finish(), "G1 Z0.2\n");

        let mut w = LineBuilder::linear();
        w.emit_z(0.2);
        w.emit_comment(true, "");
        assert_eq!(w.finish(), "G1 Z0.2\n");
    }

    #[test]
    fn arc_direction_and_center() {
        let mut w = LineBuilder::arc(true);
        w.emit_xy(Vec2::new(1.0, 1.0));
        w.emit_ij(Vec2::new(-0.5, 0.25));
        assert_eq!(w.finish(), "G3 X1 Y1 I-0.5 J0.25\n");

        let mut w = LineBuilder::arc(false);
        w.emit_xy(Vec2::new(1.0, 1.0));
        assert!(w.finish().starts_with("G2 "));
    }

    #[test]
    fn command_line_gating() {
        assert_eq!(command_line("G92 E0", true, "reset"), "G92 E0 ; reset\n");
        assert_eq!(command_line("G92 E0", false, "reset"), "G92 E0\n");
    }
}
