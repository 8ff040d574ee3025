//! Travel, extrusion, retraction and lift
//!
//! Z bookkeeping: `pos.z` is the commanded height, lift included, and the
//! nominal layer height is `pos.z - lifted`. A travel down to a height
//! still inside the lifted envelope only shrinks `lifted`.

use log::{trace, warn};

use super::{EPSILON, GCodeWriter, LiftType, SLOPE_THRESHOLD};
use crate::format::{command_line, LineBuilder};
use crate::geometry::{Vec2, Vec3};

impl GCodeWriter {
    pub fn travel_to_xy(&mut self, point: Vec2, comment: &str) -> String {
        self.pos.x = point.x;
        self.pos.y = point.y;
        self.position_known = true;

        let mut w = LineBuilder::linear();
        w.emit_xy(self.on_plate(point));
        w.emit_f(self.travel_feedrate());
        w.emit_comment(self.comments(), comment);
        w.finish()
    }

    /// Travel in 3D, executing a pending lazy or spiral lift on the way.
    pub fn travel_to_xyz(&mut self, point: Vec3, comment: &str) -> String {
        if self.lift.to_lift.abs() > EPSILON {
            return self.travel_with_pending_lift(point, comment);
        }

        if !self.will_move_z(point.z) {
            self.lower_nominal_z(point.z);
            return self.travel_to_xy(point.xy(), comment);
        }

        self.lift.lifted = 0.0;
        self.pos = point;
        self.position_known = true;

        let mut w = LineBuilder::linear();
        w.emit_xyz(self.on_plate(point.xy()).with_z(point.z));
        w.emit_f(self.travel_feedrate());
        w.emit_comment(self.comments(), comment);
        w.finish()
    }

    fn travel_with_pending_lift(&mut self, point: Vec3, comment: &str) -> String {
        debug_assert!(self.lift.lifted.abs() < EPSILON);

        let mut dest = point;
        // Landing exactly where the head already is needs no lift.
        if (!self.position_known || self.pos != dest) && self.lift.to_lift + self.pos.z > point.z {
            self.lift.lifted = self.lift.to_lift + self.pos.z - point.z;
            dest.z = self.lift.to_lift + self.pos.z;
        }
        self.lift.to_lift = 0.0;
        let lift_type = self.lift.to_lift_type.take();

        let source = self.on_plate(self.pos.xy()).with_z(self.pos.z);
        let target = self.on_plate(dest.xy()).with_z(dest.z);
        let delta = target - source;
        let delta_xy = delta.xy();
        let horizontal = delta_xy.norm();

        let mut gcode = String::new();
        if self.position_known && delta.z > 0.0 && horizontal != 0.0 {
            match lift_type {
                Some(LiftType::Spiral) => {
                    let radius = delta.z / (2.0 * std::f64::consts::PI * SLOPE_THRESHOLD.atan());
                    let along = delta_xy.normalized() * radius;
                    let ij = Vec2::new(-along.y, along.x);
                    trace!("spiral lift by {:.3} with radius {radius:.3}", delta.z);
                    gcode.push_str(&self.spiral_travel_to_z(target.z, ij, "spiral lift Z"));
                }
                Some(LiftType::Lazy) if delta.z.atan2(horizontal) < SLOPE_THRESHOLD => {
                    let run = delta_xy.normalized() * (delta.z / SLOPE_THRESHOLD.tan());
                    let top = source + Vec3::new(run.x, run.y, delta.z);
                    trace!("lazy lift by {:.3} over {:.3}", delta.z, run.norm());
                    let mut w = LineBuilder::linear();
                    w.emit_xyz(top);
                    w.emit_f(self.travel_feedrate());
                    w.emit_comment(self.comments(), comment);
                    gcode.push_str(&w.finish());
                }
                Some(LiftType::Lazy) => {
                    // too steep for a slope, lift straight up first
                    gcode.push_str(&self.z_move(target.z, "lift Z"));
                }
                Some(LiftType::Immediate) | None => {}
            }
        }

        self.pos = dest;
        self.position_known = true;

        let mut w = LineBuilder::linear();
        w.emit_xyz(target);
        w.emit_f(self.travel_feedrate());
        w.emit_comment(self.comments(), comment);
        gcode.push_str(&w.finish());
        gcode
    }

    /// Move to height `z`, or only adjust the lift when `z` lies inside
    /// the lifted envelope.
    pub fn travel_to_z(&mut self, z: f64, comment: &str) -> String {
        if !self.will_move_z(z) {
            self.lower_nominal_z(z);
            return String::new();
        }
        self.lift.lifted = 0.0;
        self.z_move(z, comment)
    }

    /// Whether travelling to `z` produces a physical Z move
    pub fn will_move_z(&self, z: f64) -> bool {
        if self.lift.lifted > 0.0 {
            let nominal_z = self.pos.z - self.lift.lifted;
            if z >= nominal_z && z <= self.pos.z {
                return false;
            }
        } else if (self.pos.z - z).abs() < EPSILON {
            return false;
        }
        true
    }

    fn lower_nominal_z(&mut self, z: f64) {
        let nominal_z = self.pos.z - self.lift.lifted;
        self.lift.lifted -= z - nominal_z;
        // z_hop equal to the layer height leaves dust here
        if self.lift.lifted.abs() < EPSILON {
            self.lift.lifted = 0.0;
        }
    }

    fn z_feedrate(&self) -> f64 {
        self.config.z_travel_speed() * 60.0
    }

    fn z_move(&mut self, z: f64, comment: &str) -> String {
        self.pos.z = z;
        let mut w = LineBuilder::linear();
        w.emit_z(z);
        w.emit_f(self.z_feedrate());
        w.emit_comment(self.comments(), comment);
        w.finish()
    }

    fn spiral_travel_to_z(&mut self, z: f64, ij: Vec2, comment: &str) -> String {
        self.pos.z = z;
        let mut gcode = String::from("G17\n");
        let mut w = LineBuilder::arc(true);
        w.emit_z(z);
        w.emit_ij(ij);
        w.emit_param('P', 1);
        w.emit_f(self.z_feedrate());
        w.emit_comment(self.comments(), comment);
        gcode.push_str(&w.finish());
        gcode
    }

    /// Push `de` mm of filament while moving to `point`.
    ///
    /// The E word is left out when `force_no_extrusion` is set or `de` is
    /// negligible, which turns the line into a dry move (wipes).
    pub fn extrude_to_xy(
        &mut self,
        point: Vec2,
        de: f64,
        comment: &str,
        force_no_extrusion: bool,
    ) -> String {
        self.pos.x = point.x;
        self.pos.y = point.y;
        let e = self.extrude_e(de, force_no_extrusion);

        let mut w = LineBuilder::linear();
        w.emit_xy(self.on_plate(point));
        if let Some(e) = e {
            w.emit_e(e);
        }
        w.emit_comment(self.comments(), comment);
        w.finish()
    }

    pub fn extrude_to_xyz(
        &mut self,
        point: Vec3,
        de: f64,
        comment: &str,
        force_no_extrusion: bool,
    ) -> String {
        self.pos = point;
        self.lift.lifted = 0.0;
        let e = self.extrude_e(de, force_no_extrusion);

        let mut w = LineBuilder::linear();
        w.emit_xyz(self.on_plate(point.xy()).with_z(point.z));
        if let Some(e) = e {
            w.emit_e(e);
        }
        w.emit_comment(self.comments(), comment);
        w.finish()
    }

    /// Extruding arc to `point`; `center_offset` is relative to the start.
    pub fn extrude_arc_to_xy(
        &mut self,
        point: Vec2,
        center_offset: Vec2,
        de: f64,
        ccw: bool,
        comment: &str,
        force_no_extrusion: bool,
    ) -> String {
        self.pos.x = point.x;
        self.pos.y = point.y;
        let e = self.extrude_e(de, force_no_extrusion);

        let mut w = LineBuilder::arc(ccw);
        w.emit_xy(self.on_plate(point));
        w.emit_ij(center_offset);
        if let Some(e) = e {
            w.emit_e(e);
        }
        w.emit_comment(self.comments(), comment);
        w.finish()
    }

    /// E value to write for an extrusion of `de`, if any
    fn extrude_e(&mut self, de: f64, force_no_extrusion: bool) -> Option<f64> {
        if force_no_extrusion || de.abs() <= f64::EPSILON {
            return None;
        }
        let Some(extruder) = self.extruder_mut() else {
            warn!("extrusion requested without an active extruder");
            return None;
        };
        extruder.extrude(de);
        Some(extruder.e())
    }

    /// Regular retraction; `before_wipe` only performs the share configured
    /// to happen before a wipe move.
    pub fn retract(&mut self, before_wipe: bool) -> String {
        let Some((factor, length, restart_extra)) = self.extruder().map(|e| {
            (
                if before_wipe { e.retract_before_wipe() } else { 1.0 },
                e.retraction_length(),
                e.retract_restart_extra(),
            )
        }) else {
            return String::new();
        };
        debug_assert!((0.0..=1.0 + EPSILON).contains(&factor));
        self.retract_by(factor * length, factor * restart_extra, "retract")
    }

    pub fn retract_for_toolchange(&mut self, before_wipe: bool) -> String {
        let Some((factor, length, restart_extra)) = self.extruder().map(|e| {
            (
                if before_wipe { e.retract_before_wipe() } else { 1.0 },
                e.retract_length_toolchange(),
                e.retract_restart_extra_toolchange(),
            )
        }) else {
            return String::new();
        };
        debug_assert!((0.0..=1.0 + EPSILON).contains(&factor));
        self.retract_by(factor * length, factor * restart_extra, "retract for toolchange")
    }

    fn retract_by(&mut self, length: f64, restart_extra: f64, comment: &str) -> String {
        let firmware = self.config.use_firmware_retraction;
        // The firmware owns the length; any positive value keeps the
        // bookkeeping going even when the configured length is 0.
        let length = if firmware { 1.0 } else { length };
        let comments = self.comments();

        let mut gcode = String::new();
        if let Some(extruder) = self.active.map(|idx| &mut self.extruders[idx]) {
            if extruder.retract(length, restart_extra) != 0.0 {
                if firmware {
                    gcode = command_line(self.dialect.firmware_retract(), comments, comment);
                } else {
                    let mut w = LineBuilder::linear();
                    w.emit_e(extruder.e());
                    w.emit_f(extruder.retract_speed() * 60.0);
                    w.emit_comment(comments, comment);
                    gcode = w.finish();
                }
            }
        }

        if let Some(off) = self.dialect.extruder_off() {
            gcode.push_str(&command_line(off, comments, "extruder off"));
        }
        gcode
    }

    pub fn unretract(&mut self) -> String {
        let comments = self.comments();
        let mut gcode = String::new();
        if let Some(on) = self.dialect.extruder_on() {
            gcode.push_str(&command_line(on, comments, "extruder on"));
        }

        let Some(extruder) = self.active.map(|idx| &mut self.extruders[idx]) else {
            return gcode;
        };
        if extruder.unretract() == 0.0 {
            return gcode;
        }

        if self.config.use_firmware_retraction {
            gcode.push_str(&command_line(self.dialect.firmware_unretract(), comments, "unretract"));
            gcode.push_str(&self.reset_e(true));
        } else {
            // G1 rather than G0 so the restart is not blended into the travel
            let mut w = LineBuilder::linear();
            w.emit_e(extruder.e());
            w.emit_f(extruder.deretract_speed() * 60.0);
            w.emit_comment(comments, "unretract");
            gcode.push_str(&w.finish());
        }
        gcode
    }

    /// Raise the nozzle by the active extruder's z-hop.
    ///
    /// Does nothing while lifted or while a lift is pending, even if Z was
    /// lowered manually in between.
    pub fn lift(&mut self, lift_type: LiftType) -> String {
        let target = self.extruder().map_or(0.0, |e| e.z_hop());
        if self.lift.lifted != 0.0 || self.lift.to_lift != 0.0 || target <= 0.0 {
            return String::new();
        }

        match lift_type {
            LiftType::Lazy | LiftType::Spiral => {
                trace!("pending {lift_type:?} lift of {target}");
                self.lift.to_lift = target;
                self.lift.to_lift_type = Some(lift_type);
                String::new()
            }
            LiftType::Immediate => {
                self.lift.lifted = target;
                self.z_move(self.pos.z + target, "lift Z")
            }
        }
    }

    /// Return to the nominal layer height and drop any pending lift.
    pub fn unlift(&mut self) -> String {
        let mut gcode = String::new();
        if self.lift.lifted > 0.0 {
            gcode = self.z_move(self.pos.z - self.lift.lifted, "restore layer Z");
            self.lift.lifted = 0.0;
        }
        self.lift.to_lift = 0.0;
        self.lift.to_lift_type = None;
        gcode
    }
}
