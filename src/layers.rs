//! Sliced program layout
//!
//! Splits an already sliced program into its header, layers and footer,
//! reads the settings the slicer embedded in it, and runs the spiral-vase
//! post-processor over the layers.

use anyhow::{Context, Result};
use log::{debug, info};
use regex::Regex;

use crate::flavor::{detect_embedded_flavor, GCodeFlavor};
use crate::parser::{GCodeLine, GCodeReader};
use crate::print_config::PrintConfig;
use crate::spiral_vase::SpiralVase;

/// Comment starting every layer
pub const LAYER_MARKER: &str = r"(?m)^;\s*(?:LAYER_CHANGE|CHANGE_LAYER)\b";

/// Comment starting the end of the program
pub const DEFAULT_FOOTER_MARKER: &str =
    r"(?m)^;\s*(?:END_GCODE|EXECUTABLE_BLOCK_END|filament used)";

/// Comment some slicers write right before the machine end G-code
pub const MACHINE_END_MARKER: &str = r"(?m)^;\s*MACHINE_END_GCODE_START";

/// A sliced program cut into pieces borrowing from the source text
#[derive(Debug, Clone, PartialEq)]
pub struct SlicedProgram<'a> {
    pub header: &'a str,
    pub layers: Vec<&'a str>,
    pub footer: &'a str,
}

#[derive(Debug, Clone)]
pub struct LayerSplitter {
    layer_marker: Regex,
    footer_marker: Regex,
    machine_end_marker: Regex,
    relative_e: bool,
}

impl LayerSplitter {
    /// Splitter with a custom footer pattern; `None` uses
    /// [`DEFAULT_FOOTER_MARKER`].
    pub fn new(footer_marker: Option<&str>) -> Result<Self> {
        let footer = footer_marker.unwrap_or(DEFAULT_FOOTER_MARKER);
        Ok(Self {
            layer_marker: Regex::new(LAYER_MARKER).context("Invalid layer marker")?,
            footer_marker: Regex::new(footer)
                .with_context(|| format!("Invalid footer marker: {footer}"))?,
            machine_end_marker: Regex::new(MACHINE_END_MARKER)
                .context("Invalid machine end marker")?,
            relative_e: false,
        })
    }

    /// Extrusion mode assumed until the program sets one with `M82`/`M83`
    pub fn with_relative_e(mut self, relative_e: bool) -> Self {
        self.relative_e = relative_e;
        self
    }

    /// Cut `content` into header, layers and footer.
    ///
    /// The last layer ends after its last extruding move, so the end
    /// G-code that follows it lands in the footer.
    pub fn split<'a>(&self, content: &'a str) -> SlicedProgram<'a> {
        let starts: Vec<usize> = self
            .layer_marker
            .find_iter(content)
            .map(|m| m.start())
            .collect();

        let Some(&last_start) = starts.last() else {
            return SlicedProgram {
                header: content,
                layers: Vec::new(),
                footer: "",
            };
        };

        let marked_end = [&self.footer_marker, &self.machine_end_marker]
            .iter()
            .filter_map(|marker| marker.find_at(content, last_start))
            .map(|m| m.start())
            .min()
            .unwrap_or(content.len());
        let footer_start = self
            .last_extrusion_end(content, last_start, marked_end)
            .unwrap_or(marked_end);
        debug!(
            "{} layers, footer of {} bytes",
            starts.len(),
            content.len() - footer_start
        );

        let layers = starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = starts.get(i + 1).copied().unwrap_or(footer_start);
                &content[start..end]
            })
            .collect();

        SlicedProgram {
            header: &content[..starts[0]],
            layers,
            footer: &content[footer_start..],
        }
    }

    /// Byte offset just past the last extruding move in
    /// `content[start..end]`
    fn last_extrusion_end(&self, content: &str, start: usize, end: usize) -> Option<usize> {
        let mut reader = GCodeReader::new(self.relative_e);
        reader.parse_buffer(&content[..start], |_, _| {});

        let mut offset = start;
        let mut last = None;
        for raw in content[start..end].split_inclusive('\n') {
            let mut extruding = false;
            reader.parse_line(raw, &mut |reader: &GCodeReader, line: &GCodeLine| {
                extruding = line.extruding(reader) && line.dist_xy(reader) > 0.0;
            });
            offset += raw.len();
            if extruding {
                last = Some(offset);
            }
        }
        last
    }
}

/// Settings a slicer wrote as `; key = value` comments
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmbeddedSettings {
    pub gcode_flavor: Option<GCodeFlavor>,
    pub use_relative_e_distances: Option<bool>,
}

impl EmbeddedSettings {
    pub fn detect(content: &str) -> Self {
        // literal pattern
        let relative_e = Regex::new(r"(?m)^;\s*use_relative_e_distances\s*=\s*([01])\s*$")
            .ok()
            .and_then(|re| re.captures_iter(content).last())
            .map(|caps| &caps[1] == "1");

        Self {
            gcode_flavor: detect_embedded_flavor(content),
            use_relative_e_distances: relative_e,
        }
    }

    /// Override `config` with whatever the file declares.
    pub fn apply(&self, config: &mut PrintConfig) {
        if let Some(flavor) = self.gcode_flavor {
            debug!("file declares flavor {flavor}");
            config.gcode_flavor = flavor;
        }
        if let Some(relative) = self.use_relative_e_distances {
            debug!("file declares relative E: {relative}");
            config.use_relative_e_distances = relative;
        }
    }
}

impl SlicedProgram<'_> {
    /// Run the spiral-vase post-processor, enabled from layer index
    /// `start_layer` on, and reassemble the program.
    pub fn spiralize(&self, config: &PrintConfig, start_layer: usize) -> String {
        let mut vase = SpiralVase::new(config);
        let body: usize = self.layers.iter().map(|l| l.len()).sum();
        let mut out = String::with_capacity(self.header.len() + body + self.footer.len());

        // the header sets the extrusion mode and start position
        out.push_str(&vase.process_layer(self.header, false));

        let count = self.layers.len();
        for (index, layer) in self.layers.iter().enumerate() {
            vase.enable(index >= start_layer);
            out.push_str(&vase.process_layer(layer, index + 1 == count));
        }
        out.push_str(self.footer);

        info!(
            "spiralized {} of {count} layers",
            count.saturating_sub(start_layer)
        );
        out
    }
}
