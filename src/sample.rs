//! Sample program: a single-wall cylinder
//!
//! Drives the writer the way a slicer would, one closed loop per layer,
//! optionally through the spiral-vase post-processor.

use std::f64::consts::PI;

use log::info;

use crate::format::FixedDecimal;
use crate::geometry::Vec2;
use crate::print_config::PrintConfig;
use crate::spiral_vase::SpiralVase;
use crate::writer::{GCodeWriter, LiftType};

#[derive(Debug, Clone, PartialEq)]
pub struct SampleOptions {
    pub layers: usize,
    /// mm
    pub radius: f64,
    /// mm
    pub layer_height: f64,
    /// Straight segments per loop
    pub segments: usize,
    /// Post-process every layer above the first into a helix
    pub spiral: bool,
    pub center: Vec2,
    pub line_width: f64,
    pub filament_diameter: f64,
    /// mm/s
    pub print_speed: f64,
    pub nozzle_temperature: u32,
    pub bed_temperature: u32,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            layers: 20,
            radius: 15.0,
            layer_height: 0.2,
            segments: 64,
            spiral: false,
            center: Vec2::new(100.0, 100.0),
            line_width: 0.45,
            filament_diameter: 1.75,
            print_speed: 40.0,
            nozzle_temperature: 210,
            bed_temperature: 60,
        }
    }
}

impl SampleOptions {
    /// Filament length per mm of wall
    fn extrusion_per_mm(&self) -> f64 {
        let filament_area = PI * (self.filament_diameter / 2.0).powi(2);
        self.line_width * self.layer_height / filament_area
    }

    fn loop_point(&self, index: usize) -> Vec2 {
        let angle = 2.0 * PI * index as f64 / self.segments as f64;
        self.center + Vec2::new(angle.cos(), angle.sin()) * self.radius
    }
}

/// Render the whole cylinder program.
pub fn cylinder(config: &PrintConfig, opts: &SampleOptions) -> String {
    let mut writer = GCodeWriter::new(config.clone());
    writer.set_extruders(vec![0]);
    let mut vase = SpiralVase::new(config);
    let segments = opts.segments.max(3);
    let opts = SampleOptions {
        segments,
        ..opts.clone()
    };
    let e_per_mm = opts.extrusion_per_mm();
    let start = opts.loop_point(0);

    let mut out = String::new();
    out.push_str(&writer.preamble());
    out.push_str(&writer.set_bed_temperature(opts.bed_temperature, true));
    out.push_str(&writer.set_temperature(opts.nozzle_temperature, true, Some(0)));
    out.push_str(&writer.set_fan(0));
    out.push_str(&writer.set_acceleration(1000));
    out.push_str(&writer.set_jerk_xy(8));

    // prime and approach the start point with a hop
    out.push_str(&writer.travel_to_z(opts.layer_height, "move to first layer"));
    out.push_str(&writer.retract(false));
    out.push_str(&writer.lift(LiftType::Lazy));
    out.push_str(&writer.travel_to_xyz(start.with_z(opts.layer_height), "move to start"));
    out.push_str(&writer.unlift());
    out.push_str(&writer.unretract());

    // the post-processor has to see where the head starts
    let mut out = vase.process_layer(&out, false);

    for layer in 0..opts.layers {
        let z = (layer + 1) as f64 * opts.layer_height;
        let mut gcode = String::from(";LAYER_CHANGE\n");
        gcode.push_str(&format!(";Z:{}\n", FixedDecimal::new(z, 3)));
        gcode.push_str(&writer.travel_to_z(z, "move to next layer"));
        gcode.push_str(&writer.set_speed(opts.print_speed * 60.0, "", ""));
        if layer == 1 {
            gcode.push_str(&writer.set_fan(100));
        }

        let mut previous = writer.position().xy();
        for index in 1..=segments {
            let point = opts.loop_point(index % segments);
            let de = previous.distance_to(point) * e_per_mm;
            gcode.push_str(&writer.extrude_to_xy(point, de, "perimeter", false));
            previous = point;
        }
        gcode.push_str(&writer.update_progress(layer as u32 + 1, opts.layers as u32, false));

        if opts.spiral {
            vase.enable(layer >= 1);
            gcode = vase.process_layer(&gcode, layer + 1 == opts.layers);
        }
        out.push_str(&gcode);
    }

    out.push_str(&writer.retract(false));
    out.push_str(&writer.lift(LiftType::Immediate));
    out.push_str(&writer.set_fan(0));
    out.push_str(&writer.set_temperature(0, false, Some(0)));
    out.push_str(&writer.set_bed_temperature(0, false));
    out.push_str(&writer.postamble());

    info!(
        "sample cylinder: {} layers, {:.2} mm of filament",
        opts.layers,
        writer.extruder().map_or(0.0, |e| e.used_filament())
    );
    out
}
