//! Program frame, temperatures, motion limits, fans and progress

use super::GCodeWriter;
use crate::format::{command_line, FixedDecimal, LineBuilder};

impl GCodeWriter {
    /// Units and extrusion mode set-up written before any motion.
    pub fn preamble(&mut self) -> String {
        let comments = self.comments();
        let mut gcode = String::new();
        if self.dialect.sets_units() {
            gcode.push_str(&command_line("G90", comments, "use absolute coordinates"));
            gcode.push_str(&command_line("G21", comments, "set units to millimeters"));
        }
        if self.dialect.declares_extrusion_mode() {
            if self.config.use_relative_e_distances {
                gcode.push_str(&command_line(
                    "M83",
                    comments,
                    "use relative distances for extrusion",
                ));
            } else {
                gcode.push_str(&command_line(
                    "M82",
                    comments,
                    "use absolute distances for extrusion",
                ));
            }
            gcode.push_str(&self.reset_e(true));
        }
        gcode
    }

    pub fn postamble(&self) -> String {
        self.dialect.postamble(self.comments())
    }

    /// Zero the E axis of the active extruder.
    ///
    /// Nothing is written when E is already zero (unless `force`), in
    /// relative mode, or when the firmware has no E reset.
    pub fn reset_e(&mut self, force: bool) -> String {
        if !self.dialect.supports_e_reset() {
            return String::new();
        }
        if let Some(extruder) = self.extruder_mut() {
            if extruder.e() == 0.0 && !force {
                return String::new();
            }
            extruder.reset_e();
        }
        if self.config.use_relative_e_distances {
            String::new()
        } else {
            command_line("G92 E0", self.comments(), "reset extrusion distance")
        }
    }

    /// Nozzle temperature, always written.
    ///
    /// The tool is only named when several tools are configured or the
    /// firmware requires it.
    pub fn set_temperature(&self, temperature: u32, wait: bool, tool: Option<u32>) -> String {
        let multiple_tools = self.multiple_extruders && !self.config.single_extruder_multi_material;
        let tool = tool.filter(|_| multiple_tools || self.dialect.always_addresses_tool());
        self.dialect
            .set_temperature(temperature, wait, tool, self.comments())
    }

    /// Bed temperature, skipped when it would repeat the last command.
    pub fn set_bed_temperature(&mut self, temperature: u32, wait: bool) -> String {
        if temperature == self.last_bed_temperature
            && (!wait || self.last_bed_temperature_reached)
        {
            return String::new();
        }
        self.last_bed_temperature = temperature;
        self.last_bed_temperature_reached = wait;

        let (code, comment) = if wait {
            ("M190", "set bed temperature and wait for it to be reached")
        } else {
            ("M140", "set bed temperature")
        };
        command_line(&format!("{code} S{temperature}"), self.comments(), comment)
    }

    /// mm/s², clamped to the machine limit and skipped when unchanged.
    pub fn set_acceleration(&mut self, acceleration: u32) -> String {
        let acceleration = if self.max_acceleration > 0 {
            acceleration.min(self.max_acceleration)
        } else {
            acceleration
        };
        if acceleration == 0 || acceleration == self.last_acceleration {
            return String::new();
        }
        self.last_acceleration = acceleration;
        self.dialect.set_acceleration(acceleration, self.comments())
    }

    /// mm/s, clamped to the machine limit and skipped when unchanged.
    pub fn set_jerk_xy(&mut self, jerk: u32) -> String {
        let jerk = if self.max_jerk > 0 { jerk.min(self.max_jerk) } else { jerk };
        if jerk < 1 || jerk == self.last_jerk {
            return String::new();
        }
        self.last_jerk = jerk;
        self.dialect.set_jerk_xy(jerk, self.comments())
    }

    pub fn set_pressure_advance(&self, advance: f64) -> String {
        if advance < 0.0 {
            return String::new();
        }
        if self.config.bbl_printer {
            // linear advance model
            return command_line(
                &format!("M900 K{} L1000 M10", FixedDecimal::significant(advance, 4)),
                self.comments(),
                "override pressure advance value",
            );
        }
        self.dialect.set_pressure_advance(advance, self.comments())
    }

    /// Feedrate in mm/min; `cooling_marker` is appended verbatim for the
    /// cooling post-processor.
    pub fn set_speed(&mut self, feedrate: f64, comment: &str, cooling_marker: &str) -> String {
        debug_assert!(feedrate > 0.0 && feedrate < 100_000.0, "feedrate {feedrate} out of range");
        self.last_speed = Some(feedrate);

        let mut w = LineBuilder::linear();
        w.emit_f(feedrate);
        w.emit_comment(self.comments(), comment);
        w.emit_string(cooling_marker);
        w.finish()
    }

    /// Part cooling fan, `speed` in percent.
    pub fn set_fan(&self, speed: u32) -> String {
        self.dialect.set_fan(speed.min(100), self.comments())
    }

    /// Auxiliary fan on output P2, `speed` in percent.
    pub fn set_additional_fan(&self, speed: u32) -> String {
        let pwm = 255 * speed.min(100) / 100;
        let comment = if speed == 0 {
            "disable additional fan"
        } else {
            "enable additional fan"
        };
        command_line(&format!("M106 P2 S{pwm}"), self.comments(), comment)
    }

    /// `M73` progress report for firmwares that display it.
    pub fn update_progress(&self, num: u32, total: u32, allow_100: bool) -> String {
        if !self.dialect.reports_progress() || total == 0 {
            return String::new();
        }
        let mut percent = (100.0 * f64::from(num) / f64::from(total)).round() as u32;
        if !allow_100 {
            percent = percent.min(99);
        }
        command_line(&format!("M73 P{percent}"), self.comments(), "update progress")
    }
}

#[cfg(test)]
mod tests {
    use crate::flavor::GCodeFlavor;
    use crate::print_config::{ExtruderConfig, PrintConfig};
    use crate::writer::GCodeWriter;

    fn writer(flavor: GCodeFlavor) -> GCodeWriter {
        let mut w = GCodeWriter::new(PrintConfig {
            gcode_flavor: flavor,
            gcode_comments: false,
            extruders: vec![ExtruderConfig::default(); 2],
            ..PrintConfig::default()
        });
        w.set_extruders(vec![0]);
        w
    }

    #[test]
    fn preamble_per_flavor() {
        assert_eq!(writer(GCodeFlavor::MarlinFirmware).preamble(), "G90\nG21\nM82\nG92 E0\n");
        assert_eq!(writer(GCodeFlavor::MakerWare).preamble(), "");
        assert_eq!(writer(GCodeFlavor::Mach3).preamble(), "G90\nG21\n");

        let mut w = GCodeWriter::new(PrintConfig {
            gcode_flavor: GCodeFlavor::Klipper,
            use_relative_e_distances: true,
            gcode_comments: true,
            ..PrintConfig::default()
        });
        w.set_extruders(vec![0]);
        assert_eq!(
            w.preamble(),
            "G90 ; use absolute coordinates\nG21 ; set units to millimeters\n\
             M83 ; use relative distances for extrusion\n"
        );
    }

    #[test]
    fn postamble_only_for_machinekit() {
        assert_eq!(writer(GCodeFlavor::Machinekit).postamble(), "M2\n");
        assert_eq!(writer(GCodeFlavor::MarlinFirmware).postamble(), "");
    }

    #[test]
    fn reset_e_skips_zero_unless_forced() {
        let mut w = writer(GCodeFlavor::MarlinFirmware);
        assert_eq!(w.reset_e(false), "");
        assert_eq!(w.reset_e(true), "G92 E0\n");
        assert_eq!(writer(GCodeFlavor::Mach3).reset_e(true), "");
    }

    #[test]
    fn temperature_names_tool_only_with_several_tools() {
        let w = writer(GCodeFlavor::MarlinFirmware);
        assert_eq!(w.set_temperature(215, false, Some(0)), "M104 S215\n");

        let mut w = writer(GCodeFlavor::MarlinFirmware);
        w.set_extruders(vec![0, 1]);
        assert_eq!(w.set_temperature(215, true, Some(1)), "M109 S215 T1\n");

        // MakerWare always names the tool
        let w = writer(GCodeFlavor::MakerWare);
        assert_eq!(w.set_temperature(215, false, Some(0)), "M104 S215 T0\n");
    }

    #[test]
    fn bed_temperature_is_not_repeated() {
        let mut w = writer(GCodeFlavor::MarlinFirmware);
        assert_eq!(w.set_bed_temperature(0, false), "");
        assert_eq!(w.set_bed_temperature(60, false), "M140 S60\n");
        assert_eq!(w.set_bed_temperature(60, false), "");
        // waiting at the same temperature still needs the blocking command
        assert_eq!(w.set_bed_temperature(60, true), "M190 S60\n");
        assert_eq!(w.set_bed_temperature(60, true), "");
    }

    #[test]
    fn jerk_is_clamped_and_deduplicated() {
        let mut w = GCodeWriter::new(PrintConfig {
            gcode_flavor: GCodeFlavor::Klipper,
            gcode_comments: false,
            machine_max_jerk_x: 8.0,
            machine_max_jerk_y: 10.0,
            ..PrintConfig::default()
        });
        assert_eq!(w.set_jerk_xy(0), "");
        assert_eq!(w.set_jerk_xy(20), "SET_VELOCITY_LIMIT SQUARE_CORNER_VELOCITY=8\n");
        assert_eq!(w.set_jerk_xy(9), "");
    }

    #[test]
    fn pressure_advance_for_bbl_printers() {
        let w = GCodeWriter::new(PrintConfig {
            gcode_flavor: GCodeFlavor::Generic,
            bbl_printer: true,
            gcode_comments: false,
            ..PrintConfig::default()
        });
        assert_eq!(w.set_pressure_advance(0.02), "M900 K0.02 L1000 M10\n");
        assert_eq!(w.set_pressure_advance(-1.0), "");
    }

    #[test]
    fn speed_with_cooling_marker() {
        let mut w = writer(GCodeFlavor::MarlinFirmware);
        assert_eq!(w.set_speed(1800.0, "", ";_EXTRUDE_SET_SPEED"), "G1 F1800;_EXTRUDE_SET_SPEED\n");
        assert_eq!(w.last_speed(), Some(1800.0));
    }

    #[test]
    fn fans() {
        let w = writer(GCodeFlavor::MarlinFirmware);
        assert_eq!(w.set_fan(100), "M106 S255\n");
        assert_eq!(w.set_fan(0), "M106 S0\n");
        assert_eq!(w.set_additional_fan(50), "M106 P2 S127\n");
    }

    #[test]
    fn progress_only_for_makerbot() {
        let w = writer(GCodeFlavor::Sailfish);
        assert_eq!(w.update_progress(1, 3, false), "M73 P33\n");
        assert_eq!(w.update_progress(3, 3, false), "M73 P99\n");
        assert_eq!(w.update_progress(3, 3, true), "M73 P100\n");
        assert_eq!(writer(GCodeFlavor::MarlinFirmware).update_progress(1, 2, true), "");
    }
}
