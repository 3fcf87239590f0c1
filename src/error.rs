use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Periphery
#[derive(Error, Debug)]
pub enum PeripheryError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// Project not found
    #[error("Project not found: {id}")]
    ProjectNotFound { id: String },

    /// Manifest text is not a JSON document
    #[error("Invalid manifest '{name}': {source}")]
    InvalidManifest {
        name: String,
        source: serde_json::Error,
    },

    /// A scrape run already holds the project's lock
    #[error("A scrape is already running for project {project_id}")]
    ScrapeInProgress { project_id: String },

    /// No unfinished scrape exists to resume
    #[error("Nothing to resume for project {project_id}")]
    NothingToResume { project_id: String },

    /// Scoring model call failed
    #[error("Scoring error: {0}")]
    Scoring(String),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for Periphery operations
pub type Result<T> = std::result::Result<T, PeripheryError>;
