//! Error types for the Raman QC engine.

use thiserror::Error;

/// Main error type for the engine and its loaders.
#[derive(Error, Debug)]
pub enum QcError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Remote backend error: {0}")]
    RemoteBackend(#[from] RemoteBackendError),

    #[error("Recipe error: {0}")]
    Recipe(#[from] RecipeError),

    #[error("Spectrum error: {0}")]
    Spectrum(#[from] SpectrumError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raised before any spectrum is processed.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Unsupported classifier backend: {0} (expected heuristic, similarity or remote)")]
    UnsupportedBackend(String),

    #[error("{backend} classifier requires a {collaborator}")]
    MissingCollaborator {
        backend: &'static str,
        collaborator: &'static str,
    },

    #[error("Similarity model exposes neither a probability nor a decision-margin query")]
    UnsupportedModel,

    #[error("Failed to load similarity model from {path}: {message}")]
    ModelLoad { path: String, message: String },

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),
}

/// Raised by a remote classifier client during prediction. Never caught locally.
#[derive(Error, Debug)]
pub enum RemoteBackendError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Remote backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum RecipeError {
    #[error("Recipe file not found: {0}")]
    NotFound(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Recipe '{recipe}' is invalid: {reason}")]
    Invalid { recipe: String, reason: String },

    #[error("Unknown band role '{role}' in band {band}")]
    UnknownRole { band: String, role: String },

    #[error("Recipe '{0}' is not listed in the index")]
    UnknownRecipe(String),

    #[error("Invalid comment pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Error, Debug)]
pub enum SpectrumError {
    #[error("Failed to read spectrum {path}: {message}")]
    Read { path: String, message: String },

    #[error("Spectrum {0} contains no numeric rows")]
    Empty(String),

    #[error("Wavenumber and intensity arrays differ in length ({wavenumbers} vs {intensities})")]
    LengthMismatch {
        wavenumbers: usize,
        intensities: usize,
    },
}

/// Result type alias for engine operations.
pub type QcResult<T> = Result<T, QcError>;
