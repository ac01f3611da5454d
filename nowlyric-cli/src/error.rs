use nowlyric_mpris::MprisError;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that end the process
#[derive(Debug, Error)]
pub enum AppError {
    #[error("MPRIS error: {0}")]
    Mpris(#[from] MprisError),

    #[error("Shared buffer {path}: {source}")]
    SharedBuffer {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
