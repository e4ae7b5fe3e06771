//! Turns mjlog files into training-data files.
//!
//! Each log becomes one text file holding the concatenated lines of a full
//! replay. Batches run over a directory, one file per rayon task.

use crate::event::Event;
use crate::features::TrainingSample;
use crate::mjlog;
use crate::replay::Replayer;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const OUTPUT_EXT: &str = "txt";

/// Batch settings, usually read from a TOML file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AugmentConfig {
    /// Directory scanned (non-recursively) for logs.
    pub input_dir: PathBuf,

    pub output_dir: PathBuf,

    /// Only file names containing this substring are processed, e.g. a
    /// year. Empty matches everything.
    pub file_filter: String,

    /// Regenerate outputs that already exist.
    pub overwrite: bool,

    /// Number of rayon threads (0 = auto).
    pub threads: usize,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("logs"),
            output_dir: PathBuf::from("training_data"),
            file_filter: String::new(),
            overwrite: false,
            threads: 0,
        }
    }
}

impl AugmentConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AugmentSummary {
    pub lines: usize,
    pub positives: usize,
}

impl AugmentSummary {
    /// Counts the samples in `data`, decoding every line.
    fn of(data: &str) -> Result<Self> {
        let mut ret = Self::default();
        for (i, line) in data.lines().enumerate() {
            let sample = TrainingSample::from_line(line).with_context(|| format!("bad sample on line {}", i + 1))?;
            ret.lines += 1;
            if sample.label == 1 {
                ret.positives += 1;
            }
        }
        Ok(ret)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub lines: usize,
    pub positives: usize,
}

/// Replays every event and concatenates all outputs.
pub fn augment_events(events: Vec<Event>) -> Result<String> {
    Replayer::new(events).replay_all().context("replay failed")
}

pub fn augment_file(log_path: &Path, out_path: &Path) -> Result<AugmentSummary> {
    let events = mjlog::read_log(log_path)?;
    let data = augment_events(events).with_context(|| format!("failed to augment {}", log_path.display()))?;
    let summary = AugmentSummary::of(&data)?;

    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(out_path, &data).with_context(|| format!("failed to write {}", out_path.display()))?;

    Ok(summary)
}

/// `2018_log_0001.mjlog.gz` -> `2018_training_data_0001.txt`.
#[must_use]
pub fn output_file_name(log_name: &str) -> String {
    let stem = log_name.split('.').next().unwrap_or(log_name);
    if stem.contains("log") {
        format!("{}.{OUTPUT_EXT}", stem.replace("log", "training_data"))
    } else {
        format!("{stem}_training_data.{OUTPUT_EXT}")
    }
}

/// Log files directly under `dir` whose name contains `filter`, sorted.
pub fn discover_logs(dir: &Path, filter: &str) -> Result<Vec<PathBuf>> {
    let mut logs = fs::read_dir(dir)
        .with_context(|| format!("reading log dir {}", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(filter))
        })
        .collect::<Vec<_>>();
    logs.sort();
    Ok(logs)
}

/// Augments every matching log of `config.input_dir` in parallel.
///
/// A file that fails is logged and counted, the rest of the batch goes on.
pub fn process_dir(config: &AugmentConfig) -> Result<BatchReport> {
    let logs = discover_logs(&config.input_dir, &config.file_filter)?;
    let mut report = BatchReport::default();

    let mut jobs = Vec::with_capacity(logs.len());
    for log_path in logs {
        let Some(name) = log_path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let out_path = config.output_dir.join(output_file_name(name));
        if !config.overwrite && out_path.exists() {
            log::debug!("skipping {}, {} exists", log_path.display(), out_path.display());
            report.skipped += 1;
            continue;
        }
        jobs.push((log_path, out_path));
    }
    log::info!(
        "{} logs to augment, {} already done",
        jobs.len(),
        report.skipped,
    );

    let total = jobs.len();
    let done = AtomicUsize::new(0);
    let run = || {
        jobs.par_iter()
            .map(|(log_path, out_path)| {
                let ret = augment_file(log_path, out_path);
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                match &ret {
                    Ok(summary) => log::info!(
                        "[{n}/{total}] {}: {} lines, {} positive",
                        log_path.display(),
                        summary.lines,
                        summary.positives,
                    ),
                    Err(err) => log::warn!("[{n}/{total}] skipping {}: {err:#}", log_path.display()),
                }
                ret.ok()
            })
            .collect::<Vec<_>>()
    };
    let outcomes = if config.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
            .context("failed to build rayon thread pool")?
            .install(run)
    } else {
        run()
    };

    for outcome in outcomes {
        match outcome {
            Some(summary) => {
                report.processed += 1;
                report.lines += summary.lines;
                report.positives += summary.positives;
            }
            None => report.failed += 1,
        }
    }
    Ok(report)
}
