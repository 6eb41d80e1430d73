//! Engine-level error types

use thiserror::Error;
use vcsync_core::ApiError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the engine itself.
///
/// Command failures are not errors here: they are values of
/// `CommandOutcome`, since a rejected or failed command is a normal
/// result the caller must handle.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Remote API failure during engine startup
    #[error(transparent)]
    Api(#[from] ApiError),
}
