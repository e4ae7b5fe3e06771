//! Training-data generation CLI.
//!
//! Usage:
//!   augment --input-dir /path/to/logs --output-dir /path/to/training_data \
//!           [--file-filter 2018] [--overwrite] [--threads 8]
//!   augment --config augment.toml [overrides]

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use hoju::augment::{self, AugmentConfig};

#[derive(Parser, Debug)]
#[command(
    name = "augment",
    about = "Replay Tenhou mjlogs into deal-in training data"
)]
struct Args {
    /// TOML file with `AugmentConfig` fields. Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory containing mjlog files, plain or gzipped.
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Directory the training-data files are written to.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Only process logs whose file name contains this string.
    #[arg(long)]
    file_filter: Option<String>,

    /// Regenerate outputs that already exist.
    #[arg(long)]
    overwrite: bool,

    /// Number of rayon threads (0 = auto).
    #[arg(long)]
    threads: Option<usize>,
}

impl Args {
    fn into_config(self) -> Result<AugmentConfig> {
        let mut config = match &self.config {
            Some(path) => AugmentConfig::from_toml_file(path)?,
            None => AugmentConfig::default(),
        };
        if let Some(v) = self.input_dir {
            config.input_dir = v;
        }
        if let Some(v) = self.output_dir {
            config.output_dir = v;
        }
        if let Some(v) = self.file_filter {
            config.file_filter = v;
        }
        if let Some(v) = self.threads {
            config.threads = v;
        }
        config.overwrite |= self.overwrite;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config()?;
    log::info!(
        "input: {}, output: {}, filter: {:?}, overwrite: {}, threads: {}",
        config.input_dir.display(),
        config.output_dir.display(),
        config.file_filter,
        config.overwrite,
        config.threads,
    );

    let start = Instant::now();
    let report = augment::process_dir(&config)?;
    let elapsed = start.elapsed();

    eprintln!();
    eprintln!("=== Summary ===");
    eprintln!("Logs processed:   {}", report.processed);
    eprintln!("Logs skipped:     {}", report.skipped);
    eprintln!("Logs failed:      {}", report.failed);
    eprintln!("Lines written:    {}", report.lines);
    eprintln!(
        "Positive lines:   {} ({:.2}%)",
        report.positives,
        report.positives as f64 / report.lines.max(1) as f64 * 100.0,
    );
    eprintln!("Total time:       {:.1}s", elapsed.as_secs_f64());

    Ok(())
}
