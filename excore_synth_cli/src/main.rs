//! # excore_synth_cli
//!
//! Part of the excore_synth crate family.
//!
//! Command line application which merges an MPACT output file and a Shift vessel tally
//! file into a single HDF5 file with accumulated vessel fluence.
//!
//! ## Use
//!
//! ```bash
//! excore_synth_cli --mpact-file cycle1.h5 --shift-file cycle1_shift.h5 --output-file cycle1_excore
//! ```
//!
//! or, with a configuration file,
//!
//! ```bash
//! excore_synth_cli new --path config.yml
//! excore_synth_cli --config config.yml
//! ```
//!
//! The `.h5` extension is appended to the output file if it is omitted. The application
//! logs to the terminal and to `excore_synth.log` in the working directory.
use clap::{Arg, ArgMatches, Command};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{mpsc, Arc};

use libexcore_synth::config::Config;
use libexcore_synth::process::process;
use libexcore_synth::worker_status::{SynthesisStage, WorkerStatus};

const LOG_FILE: &str = "./excore_synth.log";

fn make_template_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config)?;
    let mut file = File::create(path)?;
    file.write_all(yaml_str.as_bytes())?;
    Ok(())
}

/// Log to the terminal (the default sinks) and to a log file
fn init_logging() -> Result<(), spdlog::Error> {
    let file_sink: Arc<dyn spdlog::sink::Sink> = Arc::new(
        spdlog::sink::FileSink::builder()
            .path(PathBuf::from(LOG_FILE))
            .formatter(*Box::new(spdlog::formatter::PatternFormatter::new(
                spdlog::formatter::pattern!(
                    "[{date_short} {time_short}] - [thread: {tid}] - [{^{level}}] - {payload}{eol}"
                ),
            )))
            .truncate(true)
            .build()?,
    );
    let mut sinks = spdlog::default_logger().sinks().to_owned();
    sinks.push(file_sink);
    let logger = Arc::new(
        spdlog::Logger::builder()
            .flush_level_filter(spdlog::LevelFilter::All)
            .sinks(sinks)
            .build()?,
    );
    spdlog::set_default_logger(logger);
    Ok(())
}

/// Build the config from either a config file or the individual file arguments
fn config_from_args(matches: &ArgMatches) -> Option<Config> {
    if let Some(config_path) = matches.get_one::<String>("config") {
        spdlog::info!("Loading config from {}...", config_path);
        return match Config::read_config_file(Path::new(config_path)) {
            Ok(c) => Some(c),
            Err(e) => {
                spdlog::error!("{e}");
                None
            }
        };
    }

    let mpact = matches.get_one::<String>("mpact-file");
    let shift = matches.get_one::<String>("shift-file");
    let output = matches.get_one::<String>("output-file");
    match (mpact, shift, output) {
        (Some(mpact), Some(shift), Some(output)) => Some(Config::new(
            Path::new(mpact),
            Path::new(shift),
            Path::new(output),
        )),
        _ => {
            spdlog::error!(
                "Either --config or all of --mpact-file, --shift-file, and --output-file are required"
            );
            None
        }
    }
}

fn main() -> ExitCode {
    // Create a cli
    let matches = Command::new("excore_synth_cli")
        .about("Merge MPACT and Shift output, accumulating the vessel fluence")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("new")
                .about("Make a template configuration yaml file")
                .arg(
                    Arg::new("path")
                        .short('p')
                        .long("path")
                        .required(true)
                        .help("Path to the template file"),
                ),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Path to a configuration yaml file")
                .conflicts_with_all(["mpact-file", "shift-file", "output-file"]),
        )
        .arg(
            Arg::new("mpact-file")
                .long("mpact-file")
                .help("Path to the MPACT (primary) file"),
        )
        .arg(
            Arg::new("shift-file")
                .long("shift-file")
                .help("Path to the Shift (tally) file"),
        )
        .arg(
            Arg::new("output-file")
                .long("output-file")
                .help("Path to the merged output file"),
        )
        .get_matches();

    // Initialize feedback
    if let Err(e) = init_logging() {
        eprintln!("Could not create log file {LOG_FILE}: {e}");
    }

    if let Some(("new", sub_matches)) = matches.subcommand() {
        let path = PathBuf::from(
            sub_matches
                .get_one::<String>("path")
                .expect("clap enforces required args"),
        );
        spdlog::info!("Making a template config at {}...", path.to_string_lossy());
        return match make_template_config(&path) {
            Ok(()) => {
                spdlog::info!("Done.");
                ExitCode::SUCCESS
            }
            Err(e) => {
                spdlog::error!("Failed to write template config: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let Some(config) = config_from_args(&matches) else {
        return ExitCode::FAILURE;
    };
    if let Err(e) = config.inputs_exist() {
        spdlog::error!("{e}");
        return ExitCode::FAILURE;
    }
    spdlog::info!("MPACT Path: {}", config.mpact_path.to_string_lossy());
    spdlog::info!("Shift Path: {}", config.shift_path.to_string_lossy());
    spdlog::info!(
        "Output Path: {}",
        config.get_output_file_name().to_string_lossy()
    );
    spdlog::info!(
        "Water gap: {} cm to {} cm",
        config.water_gap.barrel_outer_cm,
        config.water_gap.liner_inner_cm
    );

    // Setup the progress bar
    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}") {
        pb.set_style(style);
    }

    // Spawn the task!
    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    let handle = std::thread::spawn(move || process(&config, &tx));

    // The channel closes when the worker finishes
    for status in rx.iter() {
        pb.set_position((status.progress * 100.0) as u64);
        match status.stage {
            SynthesisStage::Prologue => pb.set_message("Copying CORE data"),
            SynthesisStage::States => pb.set_message(format!(
                "State {}/{}",
                status.state_index, status.n_states
            )),
            SynthesisStage::Finished => pb.set_message("Done"),
        }
    }
    pb.finish();

    match handle.join() {
        Ok(Ok(summary)) => {
            spdlog::info!(
                "Successfully merged {} states ({} with a carried-forward tally) into {}",
                summary.n_states,
                summary.n_stale_states,
                summary.output_path.to_string_lossy()
            );
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            spdlog::error!("Synthesis failed with error: {e}");
            ExitCode::FAILURE
        }
        Err(_) => {
            spdlog::error!("Failed to join synthesis task!");
            ExitCode::FAILURE
        }
    }
}
