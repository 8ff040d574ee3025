//! Spiral-vase post-processor
//!
//! Rewrites each layer of a single-wall print so Z rises continuously along
//! the perimeter instead of stepping once per layer. Layers must be fed in
//! order, every one of them, so the reader keeps track of the position even
//! while the processor is disabled.
//!
//! Assumptions about each layer:
//! - it starts with its single Z move
//! - it is one closed loop of extrusion moves
//! - the loop was not clipped

pub mod smoothing;

use log::{debug, trace};

use crate::format::{FixedDecimal, E_DIGITS};
use crate::geometry::Vec2;
use crate::parser::{GCodeLine, GCodeReader};
use crate::print_config::PrintConfig;
use smoothing::{nearest_point_on_polyline, LayerBuffers};

#[derive(Debug, Clone)]
pub struct SpiralVase {
    enabled: bool,
    /// The next processed layer is the first spiral one
    transition_layer: bool,
    smooth: bool,
    relative_e: bool,
    max_xy_smoothing: f64,
    reader: GCodeReader,
    layers: LayerBuffers,
}

impl SpiralVase {
    pub fn new(config: &PrintConfig) -> Self {
        Self {
            enabled: false,
            transition_layer: false,
            smooth: config.spiral_vase.smooth,
            relative_e: config.use_relative_e_distances,
            max_xy_smoothing: config.spiral_vase.max_xy_smoothing,
            reader: GCodeReader::new(config.use_relative_e_distances),
            layers: LayerBuffers::default(),
        }
    }

    /// Switch processing on or off before a layer. Switching on marks that
    /// layer as the transition-in layer.
    pub fn enable(&mut self, enable: bool) {
        self.transition_layer = enable && !self.enabled;
        self.enabled = enable;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn reader(&self) -> &GCodeReader {
        &self.reader
    }

    /// Rewrite one layer. `last_layer` adds the ramp-down tail.
    ///
    /// Extrusion ramps (in and out) need relative E; with absolute E the
    /// layer is only turned into a helix.
    pub fn process_layer(&mut self, gcode: &str, last_layer: bool) -> String {
        if !self.enabled {
            self.reader.parse_buffer(gcode, |_, _| {});
            return gcode.to_string();
        }

        let mut total_layer_length = 0.0;
        let mut layer_height = 0.0;
        let mut z = 0.0;
        {
            let mut scan = self.reader.clone();
            let mut set_z = false;
            scan.parse_buffer(gcode, |reader, line| {
                if !line.cmd_is("G1") {
                    return;
                }
                if line.extruding(reader) {
                    total_layer_length += line.dist_xy(reader);
                } else if line.has('Z') {
                    layer_height += line.dist_z(reader);
                    if !set_z {
                        z = line.new_z(reader);
                        set_z = true;
                    }
                }
            });
        }
        // start from the previous layer's top
        z -= layer_height;

        let transition_in = self.transition_layer && self.relative_e;
        let transition_out = last_layer && self.relative_e;
        let smooth = self.smooth;
        let max_xy_smoothing = self.max_xy_smoothing;
        debug!(
            "spiral layer: base z {z:.3}, height {layer_height:.3}, \
             length {total_layer_length:.3}{}{}",
            if transition_in { ", ramp in" } else { "" },
            if transition_out { ", ramp out" } else { "" },
        );

        let (previous, current) = self.layers.split_mut();
        let mut last_point = previous.last().copied().unwrap_or_default();
        let mut len = 0.0;
        let mut new_gcode = String::with_capacity(gcode.len() + gcode.len() / 8);
        let mut transition_gcode = String::new();
        // written minus source E while smoothing under absolute extrusion
        let mut e_shift = 0.0;

        self.reader.parse_buffer(gcode, |reader, line| {
            if line.cmd_is("G1") {
                if line.has('Z') {
                    // the layer change collapses onto the previous layer's top
                    let mut line = line.clone();
                    line.set('Z', z);
                    push_line(&mut new_gcode, line.raw());
                    return;
                }

                let dist_xy = line.dist_xy(reader);
                if dist_xy > 0.0 {
                    // Travels are dropped: they would leave a seam, and the
                    // helix already ends where the next layer starts.
                    if !line.extruding(reader) {
                        trace!("dropping travel: {}", line.raw());
                        return;
                    }

                    let mut line = line.clone();
                    len += dist_xy;
                    let factor = if total_layer_length > 0.0 {
                        len / total_layer_length
                    } else {
                        1.0
                    };
                    let e = line.e().unwrap_or(0.0);
                    if transition_in {
                        line.set('E', e * factor);
                    } else if transition_out {
                        // same path at constant Z with fading extrusion
                        let mut tail = line.clone();
                        tail.set('E', e * (1.0 - factor));
                        push_line(&mut transition_gcode, tail.raw());
                    }
                    line.set('Z', z + factor * layer_height);

                    if smooth {
                        let p = Vec2::new(
                            line.x().unwrap_or(reader.x()),
                            line.y().unwrap_or(reader.y()),
                        );
                        current.push(p);
                        match nearest_point_on_polyline(p, previous) {
                            Some((nearest, dist)) if dist < max_xy_smoothing => {
                                let target = nearest * (1.0 - factor) + p * factor;
                                line.set('X', target.x);
                                line.set('Y', target.y);
                                // keep the flow per mm on the moved segment
                                let scale = last_point.distance_to(target) / dist_xy;
                                let de = line.dist_e(reader);
                                if reader.relative_e() {
                                    line.set('E', de * scale);
                                } else {
                                    e_shift += de * (scale - 1.0);
                                }
                                last_point = target;
                            }
                            _ => last_point = p,
                        }
                    }

                    shift_absolute_e(&mut line, reader, e_shift);
                    push_line(&mut new_gcode, line.raw());
                    return;
                }
            }

            if line.cmd_is("G92") && (line.has('E') || line.params().is_empty()) {
                e_shift = 0.0;
            } else if e_shift != 0.0 && line.is_move() && line.has('E') && !reader.relative_e() {
                let mut line = line.clone();
                shift_absolute_e(&mut line, reader, e_shift);
                push_line(&mut new_gcode, line.raw());
                return;
            }

            push_line(&mut new_gcode, line.raw());
            if transition_out {
                push_line(&mut transition_gcode, line.raw());
            }
        });

        if e_shift != 0.0 {
            // back onto the E axis of the source program
            trace!("absolute E shifted by {e_shift:.5}, resetting");
            push_line(
                &mut new_gcode,
                &format!("G92 E{}", FixedDecimal::new(self.reader.e(), E_DIGITS)),
            );
        }

        self.layers.swap();
        self.transition_layer = false;

        new_gcode.push_str(&transition_gcode);
        new_gcode
    }
}

/// Move an absolute E word by the extrusion added or removed so far.
fn shift_absolute_e(line: &mut GCodeLine, reader: &GCodeReader, e_shift: f64) {
    if e_shift == 0.0 || reader.relative_e() {
        return;
    }
    if let Some(e) = line.e() {
        line.set('E', e + e_shift);
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::GCodeLine;
    use approx::assert_relative_eq;

    fn vase(relative_e: bool, smooth: bool) -> SpiralVase {
        let mut config = PrintConfig {
            use_relative_e_distances: relative_e,
            ..PrintConfig::default()
        };
        config.spiral_vase.smooth = smooth;
        SpiralVase::new(&config)
    }

    fn square_layer(z: f64, e: f64) -> String {
        format!(
            ";LAYER_CHANGE\nG1 Z{z}\nG1 X0 Y0 F3000\n\
             G1 X10 Y0 E{e}\nG1 X10 Y10 E{e}\nG1 X0 Y10 E{e}\nG1 X0 Y0 E{e}\n"
        )
    }

    fn parse(gcode: &str) -> Vec<GCodeLine> {
        gcode.lines().map(GCodeLine::parse).collect()
    }

    #[test]
    fn disabled_layers_pass_through() {
        let mut sv = vase(true, false);
        let layer = square_layer(0.2, 0.5);
        assert_eq!(sv.process_layer(&layer, false), layer);
        assert_eq!(sv.reader().z(), 0.2);
    }

    #[test]
    fn layer_becomes_a_ramp() {
        let mut sv = vase(true, false);
        sv.process_layer(&square_layer(0.2, 0.5), false);
        sv.enable(true);
        sv.process_layer(&square_layer(0.4, 0.5), false);

        let out = sv.process_layer(&square_layer(0.6, 0.5), false);
        let lines = parse(&out);
        assert_eq!(lines.len(), 7);
        // the layer change collapses onto the previous top
        assert_eq!(lines[1].raw(), "G1 Z0.4");
        // a travel that does not move is kept
        assert_eq!(lines[2].raw(), "G1 X0 Y0 F3000");

        let zs: Vec<f64> = lines.iter().skip(2).filter_map(GCodeLine::z).collect();
        assert_eq!(zs, vec![0.45, 0.5, 0.55, 0.6]);
        let total_e: f64 = lines.iter().filter_map(GCodeLine::e).sum();
        assert_relative_eq!(total_e, 2.0);
    }

    #[test]
    fn transition_in_ramps_extrusion() {
        let mut sv = vase(true, false);
        sv.process_layer(&square_layer(0.2, 0.5), false);
        sv.enable(true);
        let out = sv.process_layer(&square_layer(0.4, 0.5), false);
        let es: Vec<f64> = parse(&out).iter().filter_map(GCodeLine::e).collect();
        assert_eq!(es, vec![0.125, 0.25, 0.375, 0.5]);

        // only the first spiral layer ramps in
        sv.enable(true);
        let out = sv.process_layer(&square_layer(0.6, 0.5), false);
        let es: Vec<f64> = parse(&out).iter().filter_map(GCodeLine::e).collect();
        assert_eq!(es, vec![0.5; 4]);
    }

    #[test]
    fn transition_out_appends_fading_tail() {
        let mut sv = vase(true, false);
        sv.process_layer(&square_layer(0.2, 0.5), false);
        sv.enable(true);
        sv.process_layer(&square_layer(0.4, 0.5), false);
        let out = sv.process_layer(&square_layer(0.6, 0.5), true);
        let lines = parse(&out);

        // main layer (7 lines), then the comment, the travel and 4 fading moves
        assert_eq!(lines.len(), 13);
        let tail: Vec<f64> = lines[7..].iter().filter_map(GCodeLine::e).collect();
        assert_eq!(tail, vec![0.375, 0.25, 0.125, 0.0]);
        assert!(lines[7..].iter().all(|l| l.z().is_none()));
    }

    #[test]
    fn travels_are_dropped() {
        let mut sv = vase(true, false);
        sv.enable(true);
        let out = sv.process_layer("G1 Z0.2\nG1 X5 Y5 F3000\nG1 X10 Y5 E0.5\n", false);
        assert_eq!(out, "G1 Z0\nG1 X10 Y5 Z0.2 E0.5\n");
    }

    #[test]
    fn absolute_extrusion_has_no_ramps() {
        let mut sv = vase(false, false);
        sv.process_layer("G1 Z0.2\nG1 X0 Y0\n", false);
        sv.enable(true);
        let out = sv.process_layer(
            "G1 Z0.4\nG1 X10 Y0 E1\nG1 X10 Y10 E2\nG1 X0 Y10 E3\nG1 X0 Y0 E4\n",
            true,
        );
        let lines = parse(&out);
        assert_eq!(lines.len(), 5);
        let es: Vec<f64> = lines.iter().filter_map(GCodeLine::e).collect();
        assert_eq!(es, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(lines[4].z(), Some(0.4));
    }

    #[test]
    fn retractions_pass_through() {
        let mut sv = vase(true, false);
        sv.enable(true);
        let out = sv.process_layer("G1 Z0.2\nG1 X10 E1\nG1 E-0.8 F2400\nM106 S255\n", false);
        assert!(out.contains("G1 E-0.8 F2400\n"));
        assert!(out.contains("M106 S255\n"));
    }

    #[test]
    fn smoothing_pulls_toward_previous_layer() {
        let mut sv = vase(true, true);
        sv.process_layer(&square_layer(0.2, 0.5), false);
        sv.enable(true);
        sv.process_layer(&square_layer(0.4, 0.5), false);

        // shifted by 0.4 mm in X, within the smoothing distance
        let shifted = "G1 Z0.6\nG1 X10.4 Y0 E0.5\nG1 X10.4 Y10 E0.5\n\
                       G1 X0.4 Y10 E0.5\nG1 X0.4 Y0 E0.5\n";
        let lines = parse(&sv.process_layer(shifted, false));
        // first point: factor 10.4 / 40.4, nearest previous point is (10, 0)
        assert_eq!(lines[1].x(), Some(10.103));
        // last point: factor 1 keeps the new position
        assert_eq!(lines[4].x(), Some(0.4));
    }

    #[test]
    fn smoothing_keeps_flow_with_absolute_extrusion() {
        let mut sv = vase(false, true);
        let square = |z: f64, e: f64| {
            format!(
                "G1 Z{z}\nG1 X10 Y0 E{}\nG1 X10 Y10 E{}\nG1 X0 Y10 E{}\nG1 X0 Y0 E{}\n",
                e + 1.0,
                e + 2.0,
                e + 3.0,
                e + 4.0
            )
        };
        sv.process_layer(&square(0.2, 0.0), false);
        sv.enable(true);
        sv.process_layer(&square(0.4, 4.0), false);

        // shifted by 0.4 mm in X, 0.1 mm of filament per mm of wall
        let shifted = "\
G1 Z0.6
G1 X10.4 Y0 E9.04
G1 X10.4 Y10 E10.04
G1 X0.4 Y10 E11.04
G1 X0.4 Y0 E12.04
G1 E11.24 F2400
";
        let out = sv.process_layer(shifted, false);
        let lines = parse(&out);
        assert_eq!(lines[1].x(), Some(10.103));

        let mut from = (Vec2::default(), 8.0);
        for line in &lines[1..5] {
            let to = Vec2::new(line.x().unwrap(), line.y().unwrap());
            let e = line.e().unwrap();
            assert_relative_eq!(e - from.1, from.0.distance_to(to) * 0.1, epsilon = 2e-4);
            from = (to, e);
        }
        // the retraction keeps its length, then E is put back in step
        assert_relative_eq!(from.1 - lines[5].e().unwrap(), 0.8, epsilon = 2e-5);
        assert_eq!(lines[6].raw(), "G92 E11.24");
    }
}
