//! Whole-program flows: sample generation, splitting and spiralizing files
use std::fs;

use approx::assert_relative_eq;
use gcode_writer::layers::{EmbeddedSettings, LayerSplitter};
use gcode_writer::sample::{cylinder, SampleOptions};
use gcode_writer::{GCodeFlavor, GCodeLine, PrintConfig};
use tempfile::TempDir;

fn quiet(flavor: GCodeFlavor) -> PrintConfig {
    PrintConfig {
        gcode_flavor: flavor,
        gcode_comments: false,
        ..PrintConfig::default()
    }
}

/// Z of every line that both extrudes and moves Z
fn extrusion_heights(program: &str) -> Vec<f64> {
    program
        .lines()
        .map(GCodeLine::parse)
        .filter(|line| line.e().is_some() && line.x().is_some())
        .filter_map(|line| line.z())
        .collect()
}

#[test]
fn test_sample_splits_into_its_layers() {
    let opts = SampleOptions {
        layers: 4,
        segments: 12,
        ..SampleOptions::default()
    };
    let program = cylinder(&quiet(GCodeFlavor::MarlinFirmware), &opts);
    let sliced = LayerSplitter::new(None).unwrap().split(&program);

    assert_eq!(sliced.layers.len(), 4);
    assert!(sliced.header.starts_with("G90\nG21\n"));
    // plain layers extrude at constant height
    assert!(extrusion_heights(&program).is_empty());
}

#[test]
fn test_spiral_sample_climbs_to_the_top() {
    let opts = SampleOptions {
        layers: 5,
        segments: 16,
        spiral: true,
        ..SampleOptions::default()
    };
    let program = cylinder(&quiet(GCodeFlavor::MarlinFirmware), &opts);

    let zs = extrusion_heights(&program);
    // every layer above the first is a helix turn
    assert_eq!(zs.len(), 4 * 16);
    assert!(zs.windows(2).all(|pair| pair[0] <= pair[1]), "{zs:?}");
    assert_relative_eq!(zs[0], 0.2125, epsilon = 1e-3);
    assert_relative_eq!(zs[zs.len() - 1], 1.0, epsilon = 1e-9);
}

#[test]
fn test_sample_speaks_the_configured_flavor() {
    let opts = SampleOptions {
        layers: 2,
        segments: 8,
        ..SampleOptions::default()
    };

    let klipper = cylinder(&quiet(GCodeFlavor::Klipper), &opts);
    assert!(klipper.contains("SET_VELOCITY_LIMIT SQUARE_CORNER_VELOCITY=8\n"));
    assert!(klipper.contains("M204 S1000\n"));

    let makerware = cylinder(&quiet(GCodeFlavor::MakerWare), &opts);
    assert!(makerware.contains("M73 P50\n"));
    assert!(!makerware.contains("G92 E0"));

    let machinekit = cylinder(&quiet(GCodeFlavor::Machinekit), &opts);
    assert!(machinekit.contains("M109 P210\n"));
    assert!(machinekit.ends_with("M2\n"));
}

#[test]
fn test_spiralize_file_with_embedded_settings() {
    let dir = TempDir::new().expect("create temp dir");
    let input = dir.path().join("vase.gcode");
    let output = dir.path().join("vase-spiral.gcode");

    let mut source = String::from("M83\nG28\n");
    for layer in 1..=3 {
        source.push_str(&format!(
            ";LAYER_CHANGE\nG1 Z{:.1} F600\n\
             G1 X10 Y0 E0.5\nG1 X10 Y10 E0.5\nG1 X0 Y10 E0.5\nG1 X0 Y0 E0.5\n",
            0.2 * layer as f64
        ));
    }
    source.push_str("; filament used [mm] = 6\n; use_relative_e_distances = 1\n");
    fs::write(&input, &source).expect("write input");

    let content = fs::read_to_string(&input).expect("read input");
    let mut config = quiet(GCodeFlavor::MarlinFirmware);
    EmbeddedSettings::detect(&content).apply(&mut config);
    assert!(config.use_relative_e_distances);

    let sliced = LayerSplitter::new(None).unwrap().split(&content);
    fs::write(&output, sliced.spiralize(&config, 1)).expect("write output");
    let result = fs::read_to_string(&output).expect("read output");

    assert!(result.starts_with("M83\nG28\n;LAYER_CHANGE\nG1 Z0.2 F600\n"));
    assert!(result.ends_with("; use_relative_e_distances = 1\n"));
    // second layer ramps in from the first layer's top
    assert!(result.contains(";LAYER_CHANGE\nG1 Z0.2 F600\nG1 X10 Y0 Z0.25 E0.125\n"));
    assert_eq!(extrusion_heights(&result).last().copied(), Some(0.6));
}

#[test]
fn test_end_gcode_stays_out_of_the_spiral() {
    let mut source = String::from("M83\nG28\n");
    for layer in 1..=3 {
        source.push_str(&format!(
            ";LAYER_CHANGE\nG1 Z{:.1} F600\n\
             G1 X10 Y0 E0.5\nG1 X10 Y10 E0.5\nG1 X0 Y10 E0.5\nG1 X0 Y0 E0.5\n",
            0.2 * layer as f64
        ));
    }
    let ending = "\
G1 E-0.8 F2100
M104 S0
G1 Z30.4 F720 ; Move print head up
G1 X0 Y200 F3600 ; park
M84
; filament used [mm] = 6
";
    source.push_str(ending);

    let config = PrintConfig {
        use_relative_e_distances: true,
        ..quiet(GCodeFlavor::MarlinFirmware)
    };
    let sliced = LayerSplitter::new(None)
        .unwrap()
        .with_relative_e(true)
        .split(&source);
    assert_eq!(sliced.layers.len(), 3);
    assert_eq!(sliced.footer, ending);

    let result = sliced.spiralize(&config, 1);
    assert!(result.ends_with(ending));

    let zs = extrusion_heights(&result);
    assert!(zs.iter().all(|&z| (0.2..=0.6).contains(&z)), "{zs:?}");
    assert_eq!(zs.last().copied(), Some(0.6));
}
