//! Printer settings
//!
//! Loaded from a TOML file; every field has a default so a partial file
//! (or none at all) describes a usable single-extruder Marlin 2 printer.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::error::{self, ConfigError};
use crate::flavor::GCodeFlavor;

/// Retraction and z-hop settings of one extruder
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtruderConfig {
    /// Regular retraction length in mm of filament
    pub retraction_length: f64,
    /// Extra filament pushed on unretract, in mm
    pub retract_restart_extra: f64,
    /// mm/s
    pub retract_speed: f64,
    /// mm/s, 0 means "same as retract_speed"
    pub deretract_speed: f64,
    pub retract_length_toolchange: f64,
    pub retract_restart_extra_toolchange: f64,
    /// Percentage of the retraction performed before a wipe
    pub retract_before_wipe: f64,
    /// Lift height in mm
    pub z_hop: f64,
}

impl Default for ExtruderConfig {
    fn default() -> Self {
        Self {
            retraction_length: 0.8,
            retract_restart_extra: 0.0,
            retract_speed: 30.0,
            deretract_speed: 0.0,
            retract_length_toolchange: 2.0,
            retract_restart_extra_toolchange: 0.0,
            retract_before_wipe: 70.0,
            z_hop: 0.4,
        }
    }
}

/// Spiral-vase post-processing options
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpiralVaseConfig {
    /// Also blend XY toward the previous layer
    pub smooth: bool,
    /// Farthest previous-layer point (mm) a point may be blended toward
    pub max_xy_smoothing: f64,
}

impl Default for SpiralVaseConfig {
    fn default() -> Self {
        Self {
            smooth: false,
            max_xy_smoothing: 0.8,
        }
    }
}

/// Everything the writer and post-processor need to know about the printer
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PrintConfig {
    pub gcode_flavor: GCodeFlavor,
    pub use_relative_e_distances: bool,
    pub use_firmware_retraction: bool,
    pub single_extruder_multi_material: bool,
    /// Append explanatory comments to emitted commands
    pub gcode_comments: bool,
    /// mm/s
    pub travel_speed: f64,
    /// mm/s, 0 means "same as travel_speed"
    pub travel_speed_z: f64,
    /// mm/s², 0 disables clamping
    pub machine_max_acceleration_extruding: f64,
    pub machine_max_jerk_x: f64,
    pub machine_max_jerk_y: f64,
    /// Klipper: keep accel_to_decel at half the acceleration
    pub adjust_accel_to_decel: bool,
    /// Bambu Lab printers use the linear pressure advance model
    pub bbl_printer: bool,
    pub extruders: Vec<ExtruderConfig>,
    pub spiral_vase: SpiralVaseConfig,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            gcode_flavor: GCodeFlavor::default(),
            use_relative_e_distances: false,
            use_firmware_retraction: false,
            single_extruder_multi_material: false,
            gcode_comments: true,
            travel_speed: 120.0,
            travel_speed_z: 0.0,
            machine_max_acceleration_extruding: 0.0,
            machine_max_jerk_x: 0.0,
            machine_max_jerk_y: 0.0,
            adjust_accel_to_decel: false,
            bbl_printer: false,
            extruders: vec![ExtruderConfig::default()],
            spiral_vase: SpiralVaseConfig::default(),
        }
    }
}

impl PrintConfig {
    /// Parse settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PrintConfig =
            toml::from_str(content).context("Failed to parse printer settings")?;
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read printer settings: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid printer settings in {}", path.display()))
    }

    /// Settings used by extruder `id`.
    ///
    /// A single-extruder multi-material printer shares the first entry
    /// between all its tools, and an id past the end of the list falls back
    /// to it as well.
    pub fn extruder_config(&self, id: u32) -> ExtruderConfig {
        let index = if self.single_extruder_multi_material {
            0
        } else {
            id as usize
        };
        self.extruders
            .get(index)
            .or_else(|| self.extruders.first())
            .cloned()
            .unwrap_or_default()
    }

    /// Z travel speed in mm/s
    pub fn z_travel_speed(&self) -> f64 {
        if self.travel_speed_z == 0.0 {
            self.travel_speed
        } else {
            self.travel_speed_z
        }
    }

    /// Reject physically meaningless values.
    pub fn validate(&self) -> error::Result<()> {
        if self.extruders.is_empty() {
            return Err(ConfigError::NoExtruders);
        }
        if self.travel_speed.is_nan() || self.travel_speed <= 0.0 {
            return Err(ConfigError::InvalidTravelSpeed(self.travel_speed));
        }

        let limits = [
            ("travel_speed_z", self.travel_speed_z),
            ("machine_max_acceleration_extruding", self.machine_max_acceleration_extruding),
            ("machine_max_jerk_x", self.machine_max_jerk_x),
            ("machine_max_jerk_y", self.machine_max_jerk_y),
            ("spiral_vase.max_xy_smoothing", self.spiral_vase.max_xy_smoothing),
        ];
        if let Some(&(field, value)) = limits.iter().find(|(_, v)| *v < 0.0) {
            return Err(ConfigError::NegativeLimit { field, value });
        }

        for (extruder, e) in self.extruders.iter().enumerate() {
            let fields = [
                ("retraction_length", e.retraction_length),
                ("retract_restart_extra", e.retract_restart_extra),
                ("retract_speed", e.retract_speed),
                ("deretract_speed", e.deretract_speed),
                ("retract_length_toolchange", e.retract_length_toolchange),
                ("retract_restart_extra_toolchange", e.retract_restart_extra_toolchange),
                ("z_hop", e.z_hop),
            ];
            if let Some(&(field, value)) = fields.iter().find(|(_, v)| *v < 0.0) {
                return Err(ConfigError::NegativeValue { extruder, field, value });
            }
            if !(0.0..=100.0).contains(&e.retract_before_wipe) {
                return Err(ConfigError::RetractBeforeWipeOutOfRange {
                    extruder,
                    value: e.retract_before_wipe,
                });
            }
        }
        Ok(())
    }
}
