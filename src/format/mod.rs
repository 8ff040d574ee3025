//! G-code text formatting
//!
//! Number rendering and command line assembly, shared by the writer and the
//! spiral-vase rewriter so both produce byte-identical numbers.

pub mod line;
pub mod number;

pub use line::{command_line, LineBuilder, E_DIGITS, XYZF_DIGITS};
pub use number::{push_fixed, FixedDecimal, MAX_DIGITS};
