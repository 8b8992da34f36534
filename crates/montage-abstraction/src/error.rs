//! Error types for engine operations.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Exceptional conditions raised by an engine.
///
/// Ordinary generation failures are not errors: engines report them as a
/// non-successful [`GenerationResult`](crate::GenerationResult).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The caller cancelled the in-flight call.
    #[error("generation cancelled")]
    Cancelled,

    /// The request violates the engine contract.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The engine cannot be used right now.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// The engine could not be constructed from its configuration.
    #[error("invalid engine configuration: {0}")]
    Configuration(String),

    /// Unexpected internal failure.
    #[error("internal engine error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Returns true for the cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
