use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use gcode_writer::config::{Args, Command, Config};
use gcode_writer::layers::{EmbeddedSettings, LayerSplitter};
use gcode_writer::sample::cylinder;

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level.as_str())).init();

    // Parse configuration from command line and settings file
    let config = Config::from_args(args)?;

    match &config.command {
        Command::Spiralize {
            input,
            output,
            start_layer,
            footer_marker,
            ..
        } => spiralize(&config, input, output, *start_layer, footer_marker.as_deref()),
        Command::Sample { output, .. } => {
            let opts = config.command.sample_options().unwrap_or_default();
            let program = cylinder(&config.print, &opts);
            match output {
                Some(path) => write_output(path, &program),
                None => io::stdout()
                    .lock()
                    .write_all(program.as_bytes())
                    .context("Failed to write to stdout"),
            }
        }
    }
}

fn spiralize(
    config: &Config,
    input: &Path,
    output: &Path,
    start_layer: usize,
    footer_marker: Option<&str>,
) -> Result<()> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let print = config.print_config_for(&EmbeddedSettings::detect(&content));
    info!(
        "{}: flavor {}, {} E",
        input.display(),
        print.gcode_flavor,
        if print.use_relative_e_distances { "relative" } else { "absolute" }
    );
    if !print.use_relative_e_distances {
        warn!("absolute E: layers are turned into a helix without extrusion ramps");
    }

    let program = LayerSplitter::new(footer_marker)?
        .with_relative_e(print.use_relative_e_distances)
        .split(&content);
    if program.layers.is_empty() {
        warn!("no layer markers found in {}, output is unchanged", input.display());
    }

    write_output(output, &program.spiralize(&print, start_layer))
}

fn write_output(path: &Path, program: &str) -> Result<()> {
    fs::write(path, program).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("wrote {} bytes to {}", program.len(), path.display());
    Ok(())
}
