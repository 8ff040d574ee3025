//! Configuration management for the gcode-writer command line.
//!
//! Handles:
//! - Command-line argument parsing
//! - Locating and loading the printer settings file
//! - Precedence between settings file, settings embedded in a sliced
//!   program, and command-line overrides

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::path::PathBuf;

use crate::flavor::GCodeFlavor;
use crate::layers::EmbeddedSettings;
use crate::print_config::PrintConfig;
use crate::sample::SampleOptions;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "gcode-writer")]
#[command(about = "Stateful G-code writer and spiral-vase post-processor")]
#[command(version)]
pub struct Args {
    /// Printer settings file
    #[arg(long, global = true, help = "Printer settings TOML file")]
    pub config: Option<PathBuf>,

    /// Explicitly specify the G-code flavor to use
    #[arg(long, global = true, help = "G-code flavor (e.g., 'marlin2', 'klipper')")]
    pub flavor: Option<String>,

    #[arg(
        long,
        global = true,
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Turn the layers of a sliced program into a continuous spiral
    Spiralize {
        input: PathBuf,
        output: PathBuf,
        /// First layer (0-based) printed as a spiral
        #[arg(long, default_value_t = 1)]
        start_layer: usize,
        /// Also smooth XY toward the previous layer
        #[arg(long)]
        smooth: bool,
        /// Regex matching the first line of the end G-code
        #[arg(long)]
        footer_marker: Option<String>,
    },
    /// Write a sample single-wall cylinder program
    Sample {
        /// Output file, standard output when omitted
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 20)]
        layers: usize,
        #[arg(long, default_value_t = 15.0)]
        radius: f64,
        #[arg(long, default_value_t = 0.2)]
        layer_height: f64,
        #[arg(long, default_value_t = 64)]
        segments: usize,
        /// Post-process the layers into a spiral
        #[arg(long)]
        spiral: bool,
    },
}

impl Command {
    /// Cylinder options of the `sample` subcommand
    pub fn sample_options(&self) -> Option<SampleOptions> {
        match *self {
            Command::Sample {
                layers,
                radius,
                layer_height,
                segments,
                spiral,
                ..
            } => Some(SampleOptions {
                layers,
                radius,
                layer_height,
                segments,
                spiral,
                ..SampleOptions::default()
            }),
            Command::Spiralize { .. } => None,
        }
    }
}

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    /// Printer settings after file loading and overrides
    pub print: PrintConfig,
    /// Settings file that was loaded, if any
    pub config_path: Option<PathBuf>,
    /// Flavor explicitly set on the command line
    pub cli_flavor: Option<GCodeFlavor>,
    pub log_level: String,
    pub command: Command,
}

/// Default settings location: `<config dir>/gcode-writer/printer.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gcode-writer").join("printer.toml"))
}

impl Config {
    /// Create configuration from parsed command-line arguments
    pub fn from_args(args: Args) -> Result<Self> {
        // An explicit file must exist; the default one is optional.
        let config_path = match args.config {
            Some(path) => Some(path),
            None => default_config_path().filter(|path| path.is_file()),
        };

        let mut print = match &config_path {
            Some(path) => {
                info!("Loading printer settings from {}", path.display());
                PrintConfig::load(path)?
            }
            None => {
                debug!("No printer settings file, using defaults");
                PrintConfig::default()
            }
        };

        let cli_flavor = args
            .flavor
            .as_deref()
            .map(str::parse::<GCodeFlavor>)
            .transpose()
            .context("Invalid --flavor")?;
        if let Some(flavor) = cli_flavor {
            print.gcode_flavor = flavor;
        }
        if let Command::Spiralize { smooth: true, .. } = args.command {
            print.spiral_vase.smooth = true;
        }
        print.validate()?;

        Ok(Config {
            print,
            config_path,
            cli_flavor,
            log_level: args.log_level,
            command: args.command,
        })
    }

    /// Printer settings for a sliced program: what the program declares
    /// overrides the settings file, the command line overrides both.
    pub fn print_config_for(&self, embedded: &EmbeddedSettings) -> PrintConfig {
        let mut print = self.print.clone();
        embedded.apply(&mut print);
        if let Some(flavor) = self.cli_flavor {
            print.gcode_flavor = flavor;
        }
        print
    }
}
