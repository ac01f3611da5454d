use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created.")]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Collaborator errors
    #[error("Failed to probe duration of {path}: {reason}")]
    ProbeFailed { path: PathBuf, reason: String },

    #[error("Player bus request failed: {reason}")]
    Bus { reason: String },

    #[error("Player bus request timed out after {timeout_ms}ms")]
    BusTimeout { timeout_ms: u64 },

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
