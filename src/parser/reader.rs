//! Position-tracking G-code reader
//!
//! Feeds lines to a callback, then advances its own position from the line
//! as parsed, so a callback that rewrites a copy never skews the tracking.

use log::trace;

use crate::parser::line::GCodeLine;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GCodeReader {
    x: f64,
    y: f64,
    z: f64,
    /// Absolute filament position
    e: f64,
    f: f64,
    relative_e: bool,
}

impl GCodeReader {
    pub fn new(relative_e: bool) -> Self {
        Self {
            relative_e,
            ..Self::default()
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn e(&self) -> f64 {
        self.e
    }

    pub fn f(&self) -> f64 {
        self.f
    }

    /// Whether E values are deltas (`M83`)
    pub fn relative_e(&self) -> bool {
        self.relative_e
    }

    /// Parse every line of `buffer`, calling `callback` before the position
    /// is advanced past each line.
    pub fn parse_buffer<F>(&mut self, buffer: &str, mut callback: F)
    where
        F: FnMut(&GCodeReader, &GCodeLine),
    {
        for raw in buffer.lines() {
            self.parse_line(raw, &mut callback);
        }
    }

    pub fn parse_line<F>(&mut self, raw: &str, callback: &mut F)
    where
        F: FnMut(&GCodeReader, &GCodeLine),
    {
        let line = GCodeLine::parse(raw);
        callback(self, &line);
        self.update(&line);
    }

    fn update(&mut self, line: &GCodeLine) {
        match line.command() {
            "G0" | "G1" | "G2" | "G3" => {
                if let Some(x) = line.x() {
                    self.x = x;
                }
                if let Some(y) = line.y() {
                    self.y = y;
                }
                if let Some(z) = line.z() {
                    self.z = z;
                }
                if let Some(e) = line.e() {
                    if self.relative_e {
                        self.e += e;
                    } else {
                        self.e = e;
                    }
                }
                if let Some(f) = line.f() {
                    self.f = f;
                }
            }
            "G92" => {
                let axes = [line.x(), line.y(), line.z(), line.e()];
                if axes.iter().all(Option::is_none) {
                    self.x = 0.0;
                    self.y = 0.0;
                    self.z = 0.0;
                    self.e = 0.0;
                } else {
                    self.x = axes[0].unwrap_or(self.x);
                    self.y = axes[1].unwrap_or(self.y);
                    self.z = axes[2].unwrap_or(self.z);
                    self.e = axes[3].unwrap_or(self.e);
                }
            }
            "M82" => {
                trace!("reader: absolute extrusion");
                self.relative_e = false;
            }
            "M83" => {
                trace!("reader: relative extrusion");
                self.relative_e = true;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_absolute_moves() {
        let mut reader = GCodeReader::new(false);
        reader.parse_buffer("G1 X10 Y5 F3000\nG1 Z0.3\nG1 X20 E1.5\n", |_, _| {});
        assert_eq!((reader.x(), reader.y(), reader.z()), (20.0, 5.0, 0.3));
        assert_eq!(reader.e(), 1.5);
        assert_eq!(reader.f(), 3000.0);
    }

    #[test]
    fn relative_e_accumulates() {
        let mut reader = GCodeReader::new(false);
        reader.parse_buffer("M83\nG1 X1 E0.5\nG1 X2 E0.25\n", |_, _| {});
        assert!(reader.relative_e());
        assert_eq!(reader.e(), 0.75);

        reader.parse_buffer("M82\nG92 E0\n", |_, _| {});
        assert!(!reader.relative_e());
        assert_eq!(reader.e(), 0.0);
        assert_eq!(reader.x(), 2.0);
    }

    #[test]
    fn callback_sees_position_before_the_line() {
        let mut reader = GCodeReader::new(false);
        let mut seen = Vec::new();
        reader.parse_buffer("G1 X1\nG1 X2\nG1 X3\n", |r, line| {
            seen.push((r.x(), line.x()));
        });
        assert_eq!(
            seen,
            vec![(0.0, Some(1.0)), (1.0, Some(2.0)), (2.0, Some(3.0))]
        );
    }

    #[test]
    fn clone_does_not_share_position() {
        let mut reader = GCodeReader::new(false);
        reader.parse_buffer("G1 X5\n", |_, _| {});
        let mut copy = reader.clone();
        copy.parse_buffer("G1 X50\n", |_, _| {});
        assert_eq!(reader.x(), 5.0);
        assert_eq!(copy.x(), 50.0);
    }
}
