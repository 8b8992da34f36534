//! Error types for orchestration.

use crate::config::ConfigError;
use montage_abstraction::EngineKind;
use thiserror::Error;

/// Result type for orchestration operations.
pub type Result<T> = std::result::Result<T, OrchestrationError>;

/// Orchestration errors.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// None of the caller's preferred engines could be constructed.
    #[error("no usable engine among preferred: {0}")]
    NoPreferredEngine(String),

    /// Routing found no engine able to take the request.
    #[error("no engine available")]
    NoEngineAvailable,

    /// The caller cancelled the call.
    #[error("generation cancelled")]
    Cancelled,

    /// The request is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No constructor is registered for the engine.
    #[error("unknown engine: {0}")]
    UnknownEngine(EngineKind),

    /// The engine constructor rejected its configuration.
    #[error("failed to construct engine {kind}: {reason}")]
    Construction {
        /// Engine that failed.
        kind: EngineKind,
        /// Constructor error message.
        reason: String,
    },

    /// A routing strategy name did not parse.
    #[error("unknown routing strategy: {0}")]
    UnknownStrategy(String),

    /// The orchestrator no longer admits work.
    #[error("orchestrator is shut down")]
    ShutDown,

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
