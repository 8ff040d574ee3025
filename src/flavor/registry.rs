//! Flavor names
//!
//! Maps configuration and command-line names to flavors, and finds the
//! flavor a sliced file declares in its embedded settings.

use std::fmt;
use std::str::FromStr;

use super::GCodeFlavor;
use crate::error::ConfigError;

impl GCodeFlavor {
    /// Every supported flavor
    pub const ALL: [GCodeFlavor; 14] = [
        GCodeFlavor::MarlinLegacy,
        GCodeFlavor::MarlinFirmware,
        GCodeFlavor::RepRapSprinter,
        GCodeFlavor::Smoothie,
        GCodeFlavor::Repetier,
        GCodeFlavor::Teacup,
        GCodeFlavor::Klipper,
        GCodeFlavor::MakerWare,
        GCodeFlavor::Sailfish,
        GCodeFlavor::Mach3,
        GCodeFlavor::Machinekit,
        GCodeFlavor::RepRapFirmware,
        GCodeFlavor::Generic,
        GCodeFlavor::NoExtrusion,
    ];

    /// Canonical configuration name
    pub fn name(&self) -> &'static str {
        match self {
            GCodeFlavor::MarlinLegacy => "marlin",
            GCodeFlavor::MarlinFirmware => "marlin2",
            GCodeFlavor::RepRapSprinter => "reprap",
            GCodeFlavor::Smoothie => "smoothie",
            GCodeFlavor::Repetier => "repetier",
            GCodeFlavor::Teacup => "teacup",
            GCodeFlavor::Klipper => "klipper",
            GCodeFlavor::MakerWare => "makerware",
            GCodeFlavor::Sailfish => "sailfish",
            GCodeFlavor::Mach3 => "mach3",
            GCodeFlavor::Machinekit => "machinekit",
            GCodeFlavor::RepRapFirmware => "reprapfirmware",
            GCodeFlavor::Generic => "generic",
            GCodeFlavor::NoExtrusion => "no-extrusion",
        }
    }
}

impl fmt::Display for GCodeFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GCodeFlavor {
    type Err = ConfigError;

    /// Case-insensitive; accepts the canonical names plus a few common aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let alias = match lower.as_str() {
            "marlin1" | "marlin-legacy" => Some(GCodeFlavor::MarlinLegacy),
            "marlin-firmware" => Some(GCodeFlavor::MarlinFirmware),
            "sprinter" => Some(GCodeFlavor::RepRapSprinter),
            "rrf" | "duet" => Some(GCodeFlavor::RepRapFirmware),
            "bbl" | "bambu" => Some(GCodeFlavor::Generic),
            "linuxcnc" => Some(GCodeFlavor::Machinekit),
            _ => None,
        };

        alias
            .or_else(|| GCodeFlavor::ALL.into_iter().find(|f| f.name() == lower))
            .ok_or_else(|| ConfigError::UnknownFlavor(s.to_string()))
    }
}

/// Find the flavor declared by a `; gcode_flavor = <name>` settings line.
///
/// Slicers write their settings as comments at the end of the file, so the
/// whole content is scanned. Unknown names are ignored.
pub fn detect_embedded_flavor(content: &str) -> Option<GCodeFlavor> {
    content
        .lines()
        .rev()
        .filter_map(extract_flavor_from_settings_line)
        .find_map(|name| name.parse().ok())
}

/// Extract the flavor name from a settings comment line
fn extract_flavor_from_settings_line(line: &str) -> Option<&str> {
    let comment = line.trim_start().strip_prefix(';')?;
    let rest = comment.trim_start().strip_prefix("gcode_flavor")?;
    let value = rest.trim_start().strip_prefix('=')?.trim();
    let end = value
        .find(|c: char| c.is_whitespace() || c == ';')
        .unwrap_or(value.len());
    let name = &value[..end];

    if !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        Some(name)
    } else {
        None
    }
}
