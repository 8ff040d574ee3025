//! Fixed-precision number rendering
//!
//! Renders a float with a fixed number of decimal places into a stack
//! buffer, then trims the result to its minimal width:
//! - trailing zeros and a bare trailing decimal point are dropped
//! - the integer part is never empty (`-0.5`, never `-.5`)
//! - values that round to zero render as `0`, never `-0`
//!
//! Rounding is half away from zero for both signs (`f64::round` applied to
//! the value scaled by `10^digits`). Output never depends on the locale.

use std::fmt;

/// Largest supported number of decimal places.
pub const MAX_DIGITS: usize = 9;

const POW_10: [f64; MAX_DIGITS + 1] = [1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9];
const POW_10_INT: [u64; MAX_DIGITS + 1] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
];

// sign + 19 integer digits + '.' + padding
const CAPACITY: usize = 24;

/// A formatted decimal held in a fixed-size stack buffer.
#[derive(Clone, Copy)]
pub struct FixedDecimal {
    buf: [u8; CAPACITY],
    len: usize,
}

impl FixedDecimal {
    /// Format `value` rounded to `digits` decimal places (at most [`MAX_DIGITS`]).
    pub fn new(value: f64, digits: usize) -> Self {
        debug_assert!(digits <= MAX_DIGITS, "at most {MAX_DIGITS} decimal places");
        let digits = digits.min(MAX_DIGITS);

        let scaled = (value * POW_10[digits]).round();
        debug_assert!(
            !scaled.is_finite() || scaled.abs() < i64::MAX as f64,
            "{value} does not fit the formatter"
        );
        let scaled = scaled as i64;

        let mut out = Self {
            buf: [0; CAPACITY],
            len: 0,
        };
        if scaled < 0 {
            out.push(b'-');
        }

        let magnitude = scaled.unsigned_abs();
        let divisor = POW_10_INT[digits];
        out.push_integer(magnitude / divisor);

        let mut fraction = magnitude % divisor;
        if fraction != 0 {
            let mut width = digits;
            while fraction % 10 == 0 {
                fraction /= 10;
                width -= 1;
            }
            out.push(b'.');
            for _ in count_digits(fraction)..width {
                out.push(b'0');
            }
            out.push_integer(fraction);
        }

        out
    }

    /// Format `value` with `digits` significant digits, without an
    /// exponent and never past [`MAX_DIGITS`] decimal places.
    pub fn significant(value: f64, digits: usize) -> Self {
        if value == 0.0 || !value.is_finite() {
            return Self::new(value, 0);
        }
        let magnitude = value.abs().log10().floor() as i32;
        let decimals = (digits as i32 - 1 - magnitude).clamp(0, MAX_DIGITS as i32);
        Self::new(value, decimals as usize)
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII digits, '-' and '.' are ever written.
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn push(&mut self, byte: u8) {
        if self.len < CAPACITY {
            self.buf[self.len] = byte;
            self.len += 1;
        }
    }

    fn push_integer(&mut self, mut n: u64) {
        let mut digits = [0u8; 20];
        let mut count = 0;
        loop {
            digits[count] = b'0' + (n % 10) as u8;
            count += 1;
            n /= 10;
            if n == 0 {
                break;
            }
        }
        for &d in digits[..count].iter().rev() {
            self.push(d);
        }
    }
}

fn count_digits(mut n: u64) -> usize {
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    count
}

impl fmt::Display for FixedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for FixedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedDecimal({})", self.as_str())
    }
}

/// Append `value` rounded to `digits` decimal places to `out`.
pub fn push_fixed(out: &mut String, value: f64, digits: usize) {
    out.push_str(FixedDecimal::new(value, digits).as_str());
}
