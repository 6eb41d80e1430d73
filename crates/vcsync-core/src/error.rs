//! Common error types for the remote vehicle API boundary

use thiserror::Error;

/// Result type for remote API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur talking to the vendor cloud service
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Network-level failure or timeout reaching the cloud service.
    /// Never retried synchronously; the next scheduled tick retries.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Session/token rejected. Surfaced immediately; session renewal is
    /// owned by the collaborator that created the connection, not by
    /// this engine.
    #[error("Authorization error: {0}")]
    Auth(String),

    /// The service answered but with a malformed or unexpected payload
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The VIN is not known to the remote account
    #[error("Vehicle not found: {0}")]
    VehicleNotFound(String),
}

impl ApiError {
    /// Whether this error is transient and worth retrying on a later tick
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}
