//! Stateful G-code writer
//!
//! Turns motion and machine intents into command lines. The writer owns the
//! last commanded position, the lift bookkeeping, the extruders and the
//! last values sent for settings that should not be repeated. Command
//! syntax comes from the [`Dialect`] chosen when the writer is created.

mod machine;
mod motion;

use std::f64::consts::PI;

use log::{debug, error};

use crate::extruder::Extruder;
use crate::flavor::{dialect_for, Dialect};
use crate::format::command_line;
use crate::geometry::{Vec2, Vec3};
use crate::print_config::PrintConfig;

/// Steepest slope (3 degrees, in radians) of an oblique lift
pub const SLOPE_THRESHOLD: f64 = 3.0 * PI / 180.0;

/// Distances below this are treated as zero
pub const EPSILON: f64 = 1e-4;

/// How a z-hop is performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftType {
    /// Vertical move right away
    Immediate,
    /// Folded into the next travel as a shallow slope
    Lazy,
    /// Folded into the next travel as a helical arc
    Spiral,
}

/// Lift bookkeeping. At most one of `lifted` and `to_lift` is non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LiftState {
    /// Height currently above the nominal layer Z
    pub lifted: f64,
    /// Height to gain on the next travel
    pub to_lift: f64,
    pub to_lift_type: Option<LiftType>,
}

#[derive(Debug)]
pub struct GCodeWriter {
    config: PrintConfig,
    dialect: Box<dyn Dialect>,
    /// Sorted by id
    extruders: Vec<Extruder>,
    active: Option<usize>,
    multiple_extruders: bool,
    pos: Vec3,
    /// Whether `pos` reflects where the head really is
    position_known: bool,
    lift: LiftState,
    xy_offset: Vec2,
    max_acceleration: u32,
    max_jerk: u32,
    last_acceleration: u32,
    last_jerk: u32,
    last_bed_temperature: u32,
    last_bed_temperature_reached: bool,
    last_speed: Option<f64>,
}

impl GCodeWriter {
    pub fn new(config: PrintConfig) -> Self {
        let dialect = dialect_for(&config);
        let (max_acceleration, max_jerk) = if dialect.honours_machine_limits() {
            (
                config.machine_max_acceleration_extruding.round() as u32,
                config
                    .machine_max_jerk_x
                    .min(config.machine_max_jerk_y)
                    .round() as u32,
            )
        } else {
            (0, 0)
        };
        debug!(
            "writer for {} (max acceleration {max_acceleration}, max jerk {max_jerk})",
            dialect.flavor()
        );

        Self {
            config,
            dialect,
            extruders: Vec::new(),
            active: None,
            multiple_extruders: false,
            pos: Vec3::default(),
            position_known: false,
            lift: LiftState::default(),
            xy_offset: Vec2::default(),
            max_acceleration,
            max_jerk,
            last_acceleration: 0,
            last_jerk: 0,
            last_bed_temperature: 0,
            last_bed_temperature_reached: true,
            last_speed: None,
        }
    }

    /// Create the extruders used by the job and select the lowest id.
    ///
    /// Tool commands are only emitted when an id above 0 is present, since
    /// a lone extruder 0 never needs selecting.
    pub fn set_extruders(&mut self, mut ids: Vec<u32>) {
        ids.sort_unstable();
        ids.dedup();
        self.multiple_extruders = ids.last().is_some_and(|&max| max > 0);
        self.extruders = ids
            .into_iter()
            .map(|id| {
                Extruder::new(
                    id,
                    self.config.extruder_config(id),
                    self.config.use_relative_e_distances,
                )
            })
            .collect();
        self.active = (!self.extruders.is_empty()).then_some(0);
        debug!(
            "extruders {:?}, multiple: {}",
            self.extruder_ids(),
            self.multiple_extruders
        );
    }

    pub fn extruders(&self) -> &[Extruder] {
        &self.extruders
    }

    pub fn extruder_ids(&self) -> Vec<u32> {
        self.extruders.iter().map(Extruder::id).collect()
    }

    /// The active extruder
    pub fn extruder(&self) -> Option<&Extruder> {
        self.active.map(|idx| &self.extruders[idx])
    }

    fn extruder_mut(&mut self) -> Option<&mut Extruder> {
        self.active.map(|idx| &mut self.extruders[idx])
    }

    pub fn multiple_extruders(&self) -> bool {
        self.multiple_extruders
    }

    pub fn config(&self) -> &PrintConfig {
        &self.config
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Last commanded position, lift included
    pub fn position(&self) -> Vec3 {
        self.pos
    }

    /// Declare the head position, e.g. after custom start G-code.
    pub fn set_position(&mut self, pos: Vec3) {
        self.pos = pos;
        self.position_known = true;
    }

    pub fn is_position_known(&self) -> bool {
        self.position_known
    }

    pub fn lift_state(&self) -> LiftState {
        self.lift
    }

    pub fn lifted(&self) -> f64 {
        self.lift.lifted
    }

    /// Plate origin subtracted from every emitted X and Y
    pub fn set_xy_offset(&mut self, x: f64, y: f64) {
        self.xy_offset = Vec2::new(x, y);
    }

    pub fn last_speed(&self) -> Option<f64> {
        self.last_speed
    }

    /// Command prefix selecting a tool
    pub fn toolchange_prefix(&self) -> &'static str {
        self.dialect.toolchange_prefix()
    }

    pub fn need_toolchange(&self, id: u32) -> bool {
        self.extruder().is_none_or(|e| e.id() != id)
    }

    /// Switch to extruder `id`, which must have been configured.
    pub fn toolchange(&mut self, id: u32) -> String {
        debug_assert!(
            self.extruders.iter().any(|e| e.id() == id),
            "toolchange to unknown extruder {id}"
        );
        let Ok(idx) = self.extruders.binary_search_by_key(&id, Extruder::id) else {
            error!("toolchange to unconfigured extruder {id} ignored");
            return String::new();
        };
        self.active = Some(idx);
        debug!("active extruder {id}");

        if !self.multiple_extruders {
            return String::new();
        }
        let mut gcode = command_line(
            &format!("{}{id}", self.dialect.toolchange_prefix()),
            self.comments(),
            "change extruder",
        );
        gcode.push_str(&self.reset_e(true));
        gcode
    }

    fn comments(&self) -> bool {
        self.config.gcode_comments
    }

    fn on_plate(&self, point: Vec2) -> Vec2 {
        point - self.xy_offset
    }

    fn travel_feedrate(&self) -> f64 {
        self.config.travel_speed * 60.0
    }
}
