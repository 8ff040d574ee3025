//! Per-flavor command strategies
//!
//! Each firmware family implements [`Dialect`]; the default methods produce
//! the Marlin-style commands most firmwares accept, so a family only
//! overrides what it does differently. The strategy is selected once, when
//! the writer is created.

use std::fmt;

use super::GCodeFlavor;
use crate::format::{command_line, FixedDecimal};
use crate::print_config::PrintConfig;

/// Capability set of one firmware dialect
pub trait Dialect: fmt::Debug {
    fn flavor(&self) -> GCodeFlavor;

    /// Whether the program starts with `G90` / `G21`
    fn sets_units(&self) -> bool {
        true
    }

    /// Whether the preamble declares the extrusion mode with `M82` / `M83`
    fn declares_extrusion_mode(&self) -> bool {
        false
    }

    /// Whether `G92 E0` is understood
    fn supports_e_reset(&self) -> bool {
        true
    }

    /// Whether the profile's machine limits clamp acceleration and jerk
    fn honours_machine_limits(&self) -> bool {
        false
    }

    /// Whether temperature commands always name the tool
    fn always_addresses_tool(&self) -> bool {
        false
    }

    /// Whether `M73` progress reports are emitted
    fn reports_progress(&self) -> bool {
        false
    }

    fn set_temperature(
        &self,
        temperature: u32,
        wait: bool,
        tool: Option<u32>,
        comments: bool,
    ) -> String {
        let (code, comment) = if wait {
            ("M109", "set nozzle temperature and wait for it to be reached")
        } else {
            ("M104", "set nozzle temperature")
        };
        temperature_line(code, 'S', temperature, tool.map(|t| ('T', t)), comments, comment)
    }

    fn set_acceleration(&self, acceleration: u32, comments: bool) -> String {
        command_line(&format!("M204 S{acceleration}"), comments, "adjust acceleration")
    }

    fn set_jerk_xy(&self, jerk: u32, comments: bool) -> String {
        command_line(&format!("M205 X{jerk} Y{jerk}"), comments, "adjust jerk")
    }

    fn set_pressure_advance(&self, advance: f64, comments: bool) -> String {
        command_line(
            &format!("M900 K{}", FixedDecimal::significant(advance, 4)),
            comments,
            "override pressure advance value",
        )
    }

    fn firmware_retract(&self) -> &'static str {
        "G10"
    }

    fn firmware_unretract(&self) -> &'static str {
        "G11"
    }

    /// Command switching the extruder motor on before printing resumes
    fn extruder_on(&self) -> Option<&'static str> {
        None
    }

    /// Command switching the extruder motor off after a retraction
    fn extruder_off(&self) -> Option<&'static str> {
        None
    }

    fn toolchange_prefix(&self) -> &'static str {
        "T"
    }

    /// Part cooling fan, `speed` in percent
    fn set_fan(&self, speed: u32, comments: bool) -> String {
        if speed == 0 {
            command_line("M106 S0", comments, "disable fan")
        } else {
            command_line(&format!("M106 S{}", fan_pwm(speed)), comments, "enable fan")
        }
    }

    fn postamble(&self, _comments: bool) -> String {
        String::new()
    }
}

/// Build the strategy for the configured flavor.
pub fn dialect_for(config: &PrintConfig) -> Box<dyn Dialect> {
    match config.gcode_flavor {
        GCodeFlavor::MarlinLegacy => Box::new(Marlin { firmware: false }),
        GCodeFlavor::MarlinFirmware => Box::new(Marlin { firmware: true }),
        GCodeFlavor::RepRapSprinter => Box::new(Sprinter),
        GCodeFlavor::Smoothie => Box::new(Smoothie),
        GCodeFlavor::Repetier => Box::new(Repetier),
        GCodeFlavor::Teacup => Box::new(Teacup),
        GCodeFlavor::Klipper => Box::new(Klipper {
            adjust_accel_to_decel: config.adjust_accel_to_decel,
        }),
        GCodeFlavor::MakerWare => Box::new(MakerBot { sailfish: false }),
        GCodeFlavor::Sailfish => Box::new(MakerBot { sailfish: true }),
        GCodeFlavor::Mach3 => Box::new(LinuxCnc { machinekit: false }),
        GCodeFlavor::Machinekit => Box::new(LinuxCnc { machinekit: true }),
        GCodeFlavor::RepRapFirmware => Box::new(RepRapFirmware),
        flavor @ (GCodeFlavor::Generic | GCodeFlavor::NoExtrusion) => Box::new(Generic { flavor }),
    }
}

fn fan_pwm(speed: u32) -> FixedDecimal {
    FixedDecimal::new(255.0 * f64::from(speed) / 100.0, 3)
}

fn temperature_line(
    code: &str,
    param: char,
    temperature: u32,
    tool: Option<(char, u32)>,
    comments: bool,
    comment: &str,
) -> String {
    let mut body = format!("{code} {param}{temperature}");
    if let Some((letter, id)) = tool {
        body.push_str(&format!(" {letter}{id}"));
    }
    command_line(&body, comments, comment)
}

const WAIT_M116: &str = "wait for temperature to be reached";

#[derive(Debug)]
struct Marlin {
    firmware: bool,
}

impl Dialect for Marlin {
    fn flavor(&self) -> GCodeFlavor {
        if self.firmware {
            GCodeFlavor::MarlinFirmware
        } else {
            GCodeFlavor::MarlinLegacy
        }
    }

    fn declares_extrusion_mode(&self) -> bool {
        true
    }

    fn honours_machine_limits(&self) -> bool {
        true
    }

    fn set_acceleration(&self, acceleration: u32, comments: bool) -> String {
        // Marlin 2 keeps print and travel acceleration apart; M204 S would set both.
        let param = if self.firmware { 'P' } else { 'S' };
        command_line(&format!("M204 {param}{acceleration}"), comments, "adjust acceleration")
    }
}

#[derive(Debug)]
struct Sprinter;

impl Dialect for Sprinter {
    fn flavor(&self) -> GCodeFlavor {
        GCodeFlavor::RepRapSprinter
    }

    fn declares_extrusion_mode(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct Smoothie;

impl Dialect for Smoothie {
    fn flavor(&self) -> GCodeFlavor {
        GCodeFlavor::Smoothie
    }

    fn declares_extrusion_mode(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct Repetier;

impl Dialect for Repetier {
    fn flavor(&self) -> GCodeFlavor {
        GCodeFlavor::Repetier
    }

    fn declares_extrusion_mode(&self) -> bool {
        true
    }

    fn set_acceleration(&self, acceleration: u32, comments: bool) -> String {
        // M201 printing, M202 travel
        let mut gcode = command_line(
            &format!("M201 X{acceleration} Y{acceleration}"),
            comments,
            "adjust acceleration",
        );
        gcode.push_str(&command_line(
            &format!("M202 X{acceleration} Y{acceleration}"),
            comments,
            "adjust acceleration",
        ));
        gcode
    }
}

#[derive(Debug)]
struct Teacup;

impl Dialect for Teacup {
    fn flavor(&self) -> GCodeFlavor {
        GCodeFlavor::Teacup
    }

    fn declares_extrusion_mode(&self) -> bool {
        true
    }

    fn set_temperature(
        &self,
        temperature: u32,
        wait: bool,
        tool: Option<u32>,
        comments: bool,
    ) -> String {
        let mut gcode = temperature_line(
            "M104",
            'S',
            temperature,
            tool.map(|t| ('T', t)),
            comments,
            "set nozzle temperature",
        );
        if wait {
            gcode.push_str(&command_line("M116", comments, WAIT_M116));
        }
        gcode
    }
}

#[derive(Debug)]
struct Klipper {
    adjust_accel_to_decel: bool,
}

impl Dialect for Klipper {
    fn flavor(&self) -> GCodeFlavor {
        GCodeFlavor::Klipper
    }

    fn declares_extrusion_mode(&self) -> bool {
        true
    }

    fn honours_machine_limits(&self) -> bool {
        true
    }

    fn set_acceleration(&self, acceleration: u32, comments: bool) -> String {
        let mut gcode = String::new();
        if self.adjust_accel_to_decel {
            let accel_to_decel = FixedDecimal::new(f64::from(acceleration) * 0.5, 3);
            gcode.push_str(&command_line(
                &format!("SET_VELOCITY_LIMIT ACCEL_TO_DECEL={accel_to_decel}"),
                comments,
                "adjust max_accel_to_decel to 0.5 of new accel value",
            ));
        }
        gcode.push_str(&command_line(
            &format!("M204 S{acceleration}"),
            comments,
            "adjust acceleration",
        ));
        gcode
    }

    fn set_jerk_xy(&self, jerk: u32, comments: bool) -> String {
        command_line(
            &format!("SET_VELOCITY_LIMIT SQUARE_CORNER_VELOCITY={jerk}"),
            comments,
            "adjust jerk",
        )
    }

    fn set_pressure_advance(&self, advance: f64, comments: bool) -> String {
        command_line(
            &format!("SET_PRESSURE_ADVANCE ADVANCE={}", FixedDecimal::significant(advance, 4)),
            comments,
            "override pressure advance value",
        )
    }
}

/// MakerWare and Sailfish (MakerBot firmwares)
#[derive(Debug)]
struct MakerBot {
    sailfish: bool,
}

impl Dialect for MakerBot {
    fn flavor(&self) -> GCodeFlavor {
        if self.sailfish {
            GCodeFlavor::Sailfish
        } else {
            GCodeFlavor::MakerWare
        }
    }

    fn sets_units(&self) -> bool {
        // Sailfish still expects them; MakerWare does not.
        self.sailfish
    }

    fn supports_e_reset(&self) -> bool {
        false
    }

    fn always_addresses_tool(&self) -> bool {
        true
    }

    fn reports_progress(&self) -> bool {
        true
    }

    fn set_temperature(
        &self,
        temperature: u32,
        wait: bool,
        tool: Option<u32>,
        comments: bool,
    ) -> String {
        // No blocking heat-up command; the bot waits on its own.
        if wait {
            return String::new();
        }
        temperature_line(
            "M104",
            'S',
            temperature,
            tool.map(|t| ('T', t)),
            comments,
            "set nozzle temperature",
        )
    }

    fn extruder_on(&self) -> Option<&'static str> {
        (!self.sailfish).then_some("M101")
    }

    fn extruder_off(&self) -> Option<&'static str> {
        (!self.sailfish).then_some("M103")
    }

    fn toolchange_prefix(&self) -> &'static str {
        if self.sailfish { "M108 T" } else { "M135 T" }
    }

    fn set_fan(&self, speed: u32, comments: bool) -> String {
        if speed == 0 {
            command_line("M127", comments, "disable fan")
        } else {
            command_line("M126", comments, "enable fan")
        }
    }
}

/// Mach3 and Machinekit (LinuxCNC derived)
#[derive(Debug)]
struct LinuxCnc {
    machinekit: bool,
}

impl Dialect for LinuxCnc {
    fn flavor(&self) -> GCodeFlavor {
        if self.machinekit {
            GCodeFlavor::Machinekit
        } else {
            GCodeFlavor::Mach3
        }
    }

    fn supports_e_reset(&self) -> bool {
        self.machinekit
    }

    fn set_temperature(
        &self,
        temperature: u32,
        wait: bool,
        tool: Option<u32>,
        comments: bool,
    ) -> String {
        let (code, comment) = if wait {
            ("M109", "set nozzle temperature and wait for it to be reached")
        } else {
            ("M104", "set nozzle temperature")
        };
        temperature_line(code, 'P', temperature, tool.map(|t| ('T', t)), comments, comment)
    }

    fn firmware_retract(&self) -> &'static str {
        if self.machinekit { "G22" } else { "G10" }
    }

    fn firmware_unretract(&self) -> &'static str {
        if self.machinekit { "G23" } else { "G11" }
    }

    fn set_fan(&self, speed: u32, comments: bool) -> String {
        if speed == 0 {
            command_line("M106 S0", comments, "disable fan")
        } else {
            command_line(&format!("M106 P{}", fan_pwm(speed)), comments, "enable fan")
        }
    }

    fn postamble(&self, comments: bool) -> String {
        if self.machinekit {
            command_line("M2", comments, "end of program")
        } else {
            String::new()
        }
    }
}

#[derive(Debug)]
struct RepRapFirmware;

impl Dialect for RepRapFirmware {
    fn flavor(&self) -> GCodeFlavor {
        GCodeFlavor::RepRapFirmware
    }

    fn declares_extrusion_mode(&self) -> bool {
        true
    }

    fn honours_machine_limits(&self) -> bool {
        true
    }

    fn set_temperature(
        &self,
        temperature: u32,
        wait: bool,
        tool: Option<u32>,
        comments: bool,
    ) -> String {
        // M104 is deprecated on RepRapFirmware; heating is awaited with M116.
        let mut gcode = temperature_line(
            "G10",
            'S',
            temperature,
            tool.map(|t| ('P', t)),
            comments,
            "set nozzle temperature",
        );
        if wait {
            gcode.push_str(&command_line("M116", comments, WAIT_M116));
        }
        gcode
    }

    fn set_acceleration(&self, acceleration: u32, comments: bool) -> String {
        command_line(&format!("M204 P{acceleration}"), comments, "adjust acceleration")
    }

    fn set_pressure_advance(&self, advance: f64, comments: bool) -> String {
        command_line(
            &format!("M572 D0 S{}", FixedDecimal::significant(advance, 4)),
            comments,
            "override pressure advance value",
        )
    }
}

#[derive(Debug)]
struct Generic {
    flavor: GCodeFlavor,
}

impl Dialect for Generic {
    fn flavor(&self) -> GCodeFlavor {
        self.flavor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect(flavor: GCodeFlavor) -> Box<dyn Dialect> {
        let config = PrintConfig {
            gcode_flavor: flavor,
            ..PrintConfig::default()
        };
        dialect_for(&config)
    }

    #[test]
    fn every_flavor_builds_its_own_strategy() {
        for flavor in GCodeFlavor::ALL {
            assert_eq!(dialect(flavor).flavor(), flavor);
        }
    }

    #[test]
    fn temperature_syntax_per_flavor() {
        assert_eq!(
            dialect(GCodeFlavor::MarlinFirmware).set_temperature(210, true, None, false),
            "M109 S210\n"
        );
        assert_eq!(
            dialect(GCodeFlavor::Mach3).set_temperature(210, false, Some(1), false),
            "M104 P210 T1\n"
        );
        assert_eq!(
            dialect(GCodeFlavor::RepRapFirmware).set_temperature(210, true, Some(1), false),
            "G10 S210 P1\nM116\n"
        );
        assert_eq!(
            dialect(GCodeFlavor::Teacup).set_temperature(200, true, None, false),
            "M104 S200\nM116\n"
        );
        assert_eq!(dialect(GCodeFlavor::Sailfish).set_temperature(200, true, Some(0), false), "");
    }

    #[test]
    fn acceleration_syntax_per_flavor() {
        assert_eq!(
            dialect(GCodeFlavor::MarlinLegacy).set_acceleration(1500, false),
            "M204 S1500\n"
        );
        assert_eq!(
            dialect(GCodeFlavor::MarlinFirmware).set_acceleration(1500, false),
            "M204 P1500\n"
        );
        assert_eq!(
            dialect(GCodeFlavor::Repetier).set_acceleration(1500, false),
            "M201 X1500 Y1500\nM202 X1500 Y1500\n"
        );
        assert_eq!(dialect(GCodeFlavor::Klipper).set_acceleration(1500, false), "M204 S1500\n");

        let klipper = dialect_for(&PrintConfig {
            gcode_flavor: GCodeFlavor::Klipper,
            adjust_accel_to_decel: true,
            ..PrintConfig::default()
        });
        assert_eq!(
            klipper.set_acceleration(1501, false),
            "SET_VELOCITY_LIMIT ACCEL_TO_DECEL=750.5\nM204 S1501\n"
        );
    }

    #[test]
    fn fan_syntax_per_flavor() {
        assert_eq!(
            dialect(GCodeFlavor::MarlinFirmware).set_fan(50, true),
            "M106 S127.5 ; enable fan\n"
        );
        assert_eq!(dialect(GCodeFlavor::MarlinFirmware).set_fan(0, false), "M106 S0\n");
        assert_eq!(dialect(GCodeFlavor::Machinekit).set_fan(100, false), "M106 P255\n");
        assert_eq!(dialect(GCodeFlavor::MakerWare).set_fan(30, false), "M126\n");
        assert_eq!(dialect(GCodeFlavor::Sailfish).set_fan(0, false), "M127\n");
    }

    #[test]
    fn firmware_retraction_mnemonics() {
        let machinekit = dialect(GCodeFlavor::Machinekit);
        assert_eq!(
            (machinekit.firmware_retract(), machinekit.firmware_unretract()),
            ("G22", "G23")
        );
        let marlin = dialect(GCodeFlavor::MarlinFirmware);
        assert_eq!((marlin.firmware_retract(), marlin.firmware_unretract()), ("G10", "G11"));
    }

    #[test]
    fn pressure_advance_syntax() {
        assert_eq!(
            dialect(GCodeFlavor::Klipper).set_pressure_advance(0.045, false),
            "SET_PRESSURE_ADVANCE ADVANCE=0.045\n"
        );
        assert_eq!(
            dialect(GCodeFlavor::RepRapFirmware).set_pressure_advance(0.05, false),
            "M572 D0 S0.05\n"
        );
        assert_eq!(
            dialect(GCodeFlavor::Generic).set_pressure_advance(0.02, false),
            "M900 K0.02\n"
        );
        // four significant digits, not four decimals
        assert_eq!(
            dialect(GCodeFlavor::Klipper).set_pressure_advance(0.03125, false),
            "SET_PRESSURE_ADVANCE ADVANCE=0.03125\n"
        );
    }
}
