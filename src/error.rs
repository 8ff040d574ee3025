//! Error types for printer configuration.

use thiserror::Error;

/// Invalid printer settings, detected when a configuration is loaded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// No extruder configured at all.
    #[error("at least one extruder must be configured")]
    NoExtruders,

    /// A length or speed that must not be negative.
    #[error("extruder {extruder}: {field} must not be negative (got {value})")]
    NegativeValue {
        extruder: usize,
        field: &'static str,
        value: f64,
    },

    /// Retract-before-wipe is a percentage.
    #[error("extruder {extruder}: retract_before_wipe must be within 0..=100 (got {value})")]
    RetractBeforeWipeOutOfRange { extruder: usize, value: f64 },

    /// Travel speed must be positive.
    #[error("travel_speed must be positive (got {0})")]
    InvalidTravelSpeed(f64),

    /// A machine limit that must not be negative.
    #[error("{field} must not be negative (got {value})")]
    NegativeLimit { field: &'static str, value: f64 },

    /// Unknown firmware flavor name.
    #[error("unknown G-code flavor '{0}'")]
    UnknownFlavor(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
