//! Standard locations for configuration, logs and recipes.

use std::path::PathBuf;

/// Base data directory.
///
/// Linux: `~/.local/share/raman-qc`, with the platform equivalent elsewhere.
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("fi", "qRaman-Batt", "raman-qc")
        .map(|p| p.data_dir().to_path_buf())
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".local")
                .join("share")
                .join("raman-qc")
        })
}

/// Configuration file path. `RQC_CONFIG` overrides the default.
pub fn config_file() -> PathBuf {
    if let Ok(path) = std::env::var("RQC_CONFIG") {
        return PathBuf::from(path);
    }

    data_dir().join("config.toml")
}

/// Log directory, created on demand.
pub fn log_dir() -> std::io::Result<PathBuf> {
    let path = data_dir().join("logs");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

/// Default recipe directory.
pub fn recipes_dir() -> PathBuf {
    data_dir().join("recipes")
}
