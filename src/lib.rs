//! G-code Writer
//!
//! A stateful generator of printer G-code and a spiral-vase post-processor.
//!
//! This library provides:
//! - Fixed-precision number formatting and G-code line building
//! - Per-extruder filament and retraction bookkeeping
//! - A writer that tracks machine state and speaks one firmware dialect
//! - A post-processor turning layered single-wall prints into a helix
//! - Configuration management

pub mod config;
pub mod error;
pub mod extruder;
pub mod flavor;
pub mod format;
pub mod geometry;
pub mod layers;
pub mod parser;
pub mod print_config;
pub mod sample;
pub mod spiral_vase;
pub mod writer;

// Re-exports for clean public API
pub use config::Config;
pub use error::ConfigError;
pub use extruder::Extruder;
pub use flavor::{dialect_for, Dialect, GCodeFlavor};
pub use format::{FixedDecimal, LineBuilder};
pub use geometry::{Vec2, Vec3};
pub use parser::{parse_line, GCodeLine, GCodeReader};
pub use print_config::{ExtruderConfig, PrintConfig};
pub use spiral_vase::SpiralVase;
pub use writer::{GCodeWriter, LiftType};
