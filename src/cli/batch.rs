//! Batch command - score every spectrum matching a glob.
//!
//! A spectrum that cannot be read or evaluated is logged and counted; the
//! remaining files are still processed.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{error, info};

use raman_qc::config::Config;
use raman_qc::types::Decision;

use super::Engine;

/// Per-decision counts of one batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub green: usize,
    pub amber: usize,
    pub red: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn record(&mut self, decision: Decision) {
        match decision {
            Decision::Green => self.green += 1,
            Decision::Amber => self.amber += 1,
            Decision::Red => self.red += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.green + self.amber + self.red + self.failed
    }
}

/// Run the batch command.
pub fn run(config: &Config, recipe: &str, pattern: &str) -> Result<()> {
    let engine = Engine::load(config, recipe)?;

    let files = matching_files(pattern)?;
    if files.is_empty() {
        println!("No files match {}", pattern);
        return Ok(());
    }

    info!(
        recipe = %engine.recipe.name,
        files = files.len(),
        classifier = %engine.classifier.method(),
        "Starting batch evaluation"
    );

    let mut summary = BatchSummary::default();
    for path in &files {
        match engine.evaluate_file(path) {
            Ok(result) => {
                println!("{:<6} {}", result.decision.to_string(), path.display());
                for reason in &result.reasons {
                    println!("         {}", reason);
                }
                summary.record(result.decision);
            }
            Err(e) => {
                error!(path = %path.display(), error = %format!("{:#}", e), "Spectrum evaluation failed");
                println!("{:<6} {} ({:#})", "FAILED", path.display(), e);
                summary.failed += 1;
            }
        }
    }

    info!(
        green = summary.green,
        amber = summary.amber,
        red = summary.red,
        failed = summary.failed,
        "Batch evaluation complete"
    );

    println!();
    println!(
        "{} spectra: {} GREEN, {} AMBER, {} RED, {} failed",
        summary.total(),
        summary.green,
        summary.amber,
        summary.red,
        summary.failed
    );

    Ok(())
}

/// Files matching `pattern`, sorted. Unreadable entries are skipped.
fn matching_files(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = glob::glob(pattern)
        .with_context(|| format!("Invalid glob pattern: {}", pattern))?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}
