//! Reduce full landmark Parquet tables to the curated face and pose columns.

use clap::Parser;
use log::{error, info, warn};
use signchat::core::column_filter::filter_landmark_file;
use signchat::core::config::{Config, StorageConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Full landmark tables (.parquet) to filter
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for filtered output (default: storage.filtered_dir, else next to each input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Suffix appended to the input file stem (default: storage.filtered_suffix)
    #[arg(short, long)]
    suffix: Option<String>,

    /// Settings file (default: ~/.signchat/config/settings.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.verbose {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    let mut storage = load_storage(args.config.as_ref())?;
    if let Some(dir) = args.output_dir {
        storage.filtered_dir = Some(dir);
    }
    if let Some(suffix) = args.suffix {
        storage.filtered_suffix = suffix;
    }
    if let Some(dir) = &storage.filtered_dir {
        std::fs::create_dir_all(dir)?;
    }

    let mut failures = 0;
    for input in &args.inputs {
        let output_dir = storage.filtered_output_dir(input);
        match filter_landmark_file(input, &output_dir, &storage.filtered_suffix) {
            Ok(output) => info!("Wrote {}", output.display()),
            Err(e) => {
                error!("Failed to filter {}: {}", input.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(format!("{} of {} files failed", failures, args.inputs.len()).into());
    }

    Ok(())
}

/// Storage settings from an explicit file, or the user settings when usable
fn load_storage(path: Option<&PathBuf>) -> Result<StorageConfig, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(Config::load_from(path)?.storage);
    }

    match Config::load() {
        Ok(config) => Ok(config.storage),
        Err(e) => {
            warn!("Using default storage settings: {}", e);
            Ok(StorageConfig::default())
        }
    }
}
