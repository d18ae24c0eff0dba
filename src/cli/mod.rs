//! CLI command definitions and handlers.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

use raman_qc::config::Config;
use raman_qc::recipe::{self, RecipeLoader};
use raman_qc::spectrum::Spectrum;
use raman_qc::types::{EvaluationReport, Recipe, SampleResult};
use raman_qc::{pipeline, Classifier};

pub mod batch;
pub mod config;
pub mod evaluate;
pub mod recipes;

/// Version of the JSON report layout.
pub const REPORT_SCHEMA_VERSION: &str = "1";

/// Raman QC - edge quality control for Raman spectra.
#[derive(Parser, Debug)]
#[command(name = "rqc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level (default: `[agent] log_level` from the config file)
    #[arg(long, env = "RQC_LOG_LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Path to config file
    #[arg(long = "config", env = "RQC_CONFIG")]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate one spectrum against a recipe
    Evaluate {
        /// Recipe name from the index, or a recipe file
        #[arg(long, short)]
        recipe: String,

        /// Spectrum CSV (wavenumber, intensity)
        spectrum: PathBuf,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate every spectrum matching a glob pattern
    Batch {
        /// Recipe name from the index, or a recipe file
        #[arg(long, short)]
        recipe: String,

        /// Glob pattern, e.g. "spectra/*.csv"
        pattern: String,
    },

    /// Inspect recipes
    Recipe {
        #[command(subcommand)]
        action: RecipeAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug)]
pub enum RecipeAction {
    /// List recipes in the index
    List,

    /// Show one recipe
    Show {
        /// Recipe name or file
        name: String,
    },

    /// Load and validate every recipe in the index
    Validate,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate configuration file
    Validate,

    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

/// Everything needed to evaluate spectra with one recipe.
pub struct Engine {
    pub recipe: Recipe,
    pub recipe_path: PathBuf,
    pub recipe_hash: Option<String>,
    pub classifier: Classifier,
    pub station: Option<String>,
}

impl Engine {
    /// Resolve the recipe and build the configured classifier.
    ///
    /// Fails before any spectrum is read if the classifier is misconfigured.
    pub fn load(config: &Config, recipe_ref: &str) -> Result<Self> {
        let loader = RecipeLoader::new(config.recipes.validate)?;
        let recipe_path = loader
            .resolve(recipe_ref, &config.index_path())
            .with_context(|| format!("Failed to resolve recipe '{}'", recipe_ref))?;
        let recipe = loader
            .load(&recipe_path)
            .with_context(|| format!("Failed to load recipe {}", recipe_path.display()))?;

        let recipe_hash = match recipe::hash_file(&recipe_path) {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!(error = %e, "Could not hash recipe file");
                None
            }
        };

        let classifier = Classifier::from_config(&config.classifier)
            .context("Failed to configure classifier")?;

        Ok(Self {
            recipe,
            recipe_path,
            recipe_hash,
            classifier,
            station: config.agent.station.clone(),
        })
    }

    /// Read and evaluate one spectrum file.
    pub fn evaluate_file(&self, path: &Path) -> Result<SampleResult> {
        let spectrum = Spectrum::from_csv_path(path)
            .with_context(|| format!("Failed to read spectrum {}", path.display()))?;
        let result = pipeline::evaluate_spectrum(&spectrum, &self.recipe, &self.classifier)
            .with_context(|| format!("Failed to evaluate {}", path.display()))?;
        Ok(result)
    }

    /// Wrap a result in a report envelope.
    pub fn report(&self, spectrum_path: &Path, result: SampleResult) -> EvaluationReport {
        EvaluationReport {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            report_id: Uuid::new_v4(),
            evaluated_at: Utc::now(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            station: self
                .station
                .clone()
                .or_else(|| Some(self.recipe.station.clone())),
            classifier: self.classifier.method().to_string(),
            spectrum_path: spectrum_path.to_path_buf(),
            recipe_hash: self.recipe_hash.clone(),
            result,
        }
    }
}
