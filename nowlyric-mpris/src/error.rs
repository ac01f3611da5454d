use nowlyric_core::CoreError;
use thiserror::Error;

/// Errors raised while talking to players over the session bus.
#[derive(Debug, Error)]
pub enum MprisError {
    /// Connection or method call failure reported by zbus.
    #[error("D-Bus error: {0}")]
    Zbus(#[from] zbus::Error),

    /// A reply or signal carried a value of an unexpected type.
    #[error("D-Bus value error: {0}")]
    Variant(#[from] zbus::zvariant::Error),

    /// The player did not answer in time.
    #[error("D-Bus call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// A reply had the right type but unusable content.
    #[error("Malformed reply: {reason}")]
    MalformedReply { reason: String },

    /// The signal stream closed.
    #[error("D-Bus signal stream ended")]
    StreamEnded,
}

/// Convenience type alias for Results with `MprisError`.
pub type Result<T> = std::result::Result<T, MprisError>;

impl From<MprisError> for CoreError {
    fn from(err: MprisError) -> Self {
        match err {
            MprisError::Timeout { timeout_ms } => Self::BusTimeout { timeout_ms },
            other => Self::Bus {
                reason: other.to_string(),
            },
        }
    }
}
