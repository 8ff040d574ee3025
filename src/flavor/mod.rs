//! Firmware flavors
//!
//! The closed set of firmware dialects the writer can target, their
//! configuration names, and the per-flavor command strategies.

pub mod dialect;
pub mod registry;

pub use dialect::{dialect_for, Dialect};
pub use registry::detect_embedded_flavor;

use serde::Deserialize;

/// Firmware flavor (G-code dialect)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GCodeFlavor {
    /// Marlin 1.x
    #[serde(rename = "marlin")]
    MarlinLegacy,
    /// Marlin 2.x with separate print/travel acceleration
    #[default]
    #[serde(rename = "marlin2")]
    MarlinFirmware,
    /// RepRap / Sprinter
    #[serde(rename = "reprap")]
    RepRapSprinter,
    Smoothie,
    Repetier,
    Teacup,
    Klipper,
    MakerWare,
    Sailfish,
    Mach3,
    Machinekit,
    RepRapFirmware,
    /// Bambu Lab and other generic printers
    Generic,
    /// Motion only, extrusion handled elsewhere
    #[serde(rename = "no-extrusion")]
    NoExtrusion,
}
