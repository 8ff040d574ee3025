//! Extruder state
//!
//! Tracks the E axis of one extruder: the value written on the next line,
//! the total filament pushed, and the retraction still outstanding.

use crate::print_config::ExtruderConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Extruder {
    id: u32,
    config: ExtruderConfig,
    relative_e: bool,
    /// Value of E written on the next command
    e: f64,
    /// Total filament used, never reset
    absolute_e: f64,
    /// Outstanding retraction, always >= 0
    retracted: f64,
    /// Extra length to push on the next unretract
    restart_extra: f64,
}

impl Extruder {
    pub fn new(id: u32, config: ExtruderConfig, relative_e: bool) -> Self {
        Self {
            id,
            config,
            relative_e,
            e: 0.0,
            absolute_e: 0.0,
            retracted: 0.0,
            restart_extra: 0.0,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Value of the E axis to emit
    pub fn e(&self) -> f64 {
        self.e
    }

    pub fn retracted(&self) -> f64 {
        self.retracted
    }

    pub fn used_filament(&self) -> f64 {
        self.absolute_e
    }

    /// Push `de` mm of filament and return the delta to emit.
    ///
    /// A negative delta is treated as an extra retraction.
    pub fn extrude(&mut self, de: f64) -> f64 {
        if self.relative_e {
            self.e = 0.0;
        }
        self.e += de;
        self.absolute_e += de;
        if de < 0.0 {
            self.retracted -= de;
        }
        de
    }

    /// Retract up to `length` mm in total and remember `restart_extra` for
    /// the next unretract.
    ///
    /// Returns the amount actually retracted, zero when the filament is
    /// already retracted by at least `length`.
    pub fn retract(&mut self, length: f64, restart_extra: f64) -> f64 {
        debug_assert!(length >= 0.0, "negative retraction length {length}");
        if self.relative_e {
            self.e = 0.0;
        }
        let to_retract = (length - self.retracted).max(0.0);
        if to_retract > 0.0 {
            self.e -= to_retract;
            self.absolute_e -= to_retract;
            self.retracted += to_retract;
            self.restart_extra = restart_extra;
        }
        to_retract
    }

    /// Undo the outstanding retraction plus the restart extra.
    pub fn unretract(&mut self) -> f64 {
        let de = self.retracted + self.restart_extra;
        self.extrude(de);
        self.retracted = 0.0;
        self.restart_extra = 0.0;
        de
    }

    pub fn reset_e(&mut self) {
        self.e = 0.0;
    }

    pub fn retraction_length(&self) -> f64 {
        self.config.retraction_length
    }

    pub fn retract_restart_extra(&self) -> f64 {
        self.config.retract_restart_extra
    }

    pub fn retract_length_toolchange(&self) -> f64 {
        self.config.retract_length_toolchange
    }

    pub fn retract_restart_extra_toolchange(&self) -> f64 {
        self.config.retract_restart_extra_toolchange
    }

    /// mm/s
    pub fn retract_speed(&self) -> f64 {
        self.config.retract_speed
    }

    /// mm/s, the retract speed when no deretract speed is set
    pub fn deretract_speed(&self) -> f64 {
        if self.config.deretract_speed > 0.0 {
            self.config.deretract_speed
        } else {
            self.config.retract_speed
        }
    }

    /// Fraction (0..=1) of the retraction performed before a wipe
    pub fn retract_before_wipe(&self) -> f64 {
        self.config.retract_before_wipe / 100.0
    }

    pub fn z_hop(&self) -> f64 {
        self.config.z_hop
    }
}
