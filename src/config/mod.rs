//! Configuration management for the Raman QC engine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::classifier::ClassifierMethod;

pub mod paths;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path to the config file (set after loading)
    #[serde(skip)]
    pub path: PathBuf,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub recipes: RecipesConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl Config {
    /// Load configuration from the default path or environment.
    pub fn load() -> Result<Self> {
        let config_path = paths::config_file();
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.path = path.to_path_buf();
        config.validate()?;

        Ok(config)
    }

    /// Load the config file if present, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(paths::config_file);
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self {
                path,
                ..Self::default()
            })
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.classifier
            .method
            .parse::<ClassifierMethod>()
            .context("Invalid [classifier] method")?;

        if self.classifier.timeout_seconds == 0 {
            anyhow::bail!("classifier.timeout_seconds must be positive");
        }
        if let Some(endpoint) = &self.classifier.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                anyhow::bail!("classifier.endpoint must be an http(s) URL: {}", endpoint);
            }
        }
        if !LOG_LEVELS.contains(&self.agent.log_level.to_lowercase().as_str()) {
            anyhow::bail!(
                "agent.log_level must be one of {}: {}",
                LOG_LEVELS.join(", "),
                self.agent.log_level
            );
        }
        if self.recipes.index.trim().is_empty() {
            anyhow::bail!("recipes.index is empty");
        }

        Ok(())
    }

    /// Directory holding recipe files and the index.
    pub fn recipes_dir(&self) -> PathBuf {
        self.recipes.dir.clone().unwrap_or_else(paths::recipes_dir)
    }

    /// Full path of the recipe index file.
    pub fn index_path(&self) -> PathBuf {
        self.recipes_dir().join(&self.recipes.index)
    }
}

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Agent-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Log level, used when `--log-level` is not given
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Station identifier echoed in reports
    #[serde(default)]
    pub station: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            station: None,
        }
    }
}

/// Where recipes live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipesConfig {
    /// Recipe directory (default: `<data_dir>/recipes`)
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Index file name, relative to the recipe directory
    #[serde(default = "default_index")]
    pub index: String,

    /// Run numeric sanity checks when loading
    #[serde(default = "default_true")]
    pub validate: bool,
}

fn default_index() -> String {
    "index.jsonc".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for RecipesConfig {
    fn default() -> Self {
        Self {
            dir: None,
            index: default_index(),
            validate: true,
        }
    }
}

/// Classifier backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// heuristic | similarity | remote (and their aliases)
    #[serde(default = "default_method")]
    pub method: String,

    /// Trained model file for the similarity backend
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Model identifier for the remote backend
    #[serde(default)]
    pub model_id: Option<String>,

    /// Remote inference service URL
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token for the remote service
    #[serde(default)]
    pub api_token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_method() -> String {
    "heuristic".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            model_path: None,
            model_id: None,
            endpoint: None,
            api_token: None,
            timeout_seconds: default_timeout(),
        }
    }
}
