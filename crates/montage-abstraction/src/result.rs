//! Generation outcomes.

use crate::kind::EngineKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Why a generation did not produce an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The engine ran and reported failure.
    Engine,
    /// No engine could be admitted for the call.
    Admission,
    /// Every allowed attempt failed.
    RetriesExhausted,
    /// The caller cancelled the call.
    Cancelled,
}

/// The single outcome of one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Whether an artifact was produced.
    pub success: bool,

    /// Path of the produced video, if any.
    pub artifact_path: Option<PathBuf>,

    /// Human-readable error message for failures.
    pub error: Option<String>,

    /// Failure classification, `None` on success.
    pub failure: Option<FailureKind>,

    /// Engine that produced this result.
    pub engine: Option<EngineKind>,

    /// Wall-clock generation time.
    pub generation_time: Duration,

    /// Monetary cost (0 for free engines).
    pub cost: f64,

    /// Duration of the produced clip in seconds.
    pub duration_secs: f64,

    /// Frame rate actually produced.
    pub fps: u32,

    /// Resolution actually produced.
    pub resolution: Option<(u32, u32)>,

    /// Artifact size in bytes.
    pub file_size: u64,

    /// Free-form descriptive metadata.
    pub metadata: HashMap<String, serde_json::Value>,
}

impl GenerationResult {
    fn empty(success: bool) -> Self {
        Self {
            success,
            artifact_path: None,
            error: None,
            failure: None,
            engine: None,
            generation_time: Duration::ZERO,
            cost: 0.0,
            duration_secs: 0.0,
            fps: 0,
            resolution: None,
            file_size: 0,
            metadata: HashMap::new(),
        }
    }

    /// A successful result pointing at `artifact`.
    pub fn success(artifact: impl Into<PathBuf>) -> Self {
        Self { artifact_path: Some(artifact.into()), ..Self::empty(true) }
    }

    /// A failed result reported by an engine.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::failed(FailureKind::Engine, message)
    }

    /// A failed result with an explicit classification.
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { error: Some(message.into()), failure: Some(kind), ..Self::empty(false) }
    }

    /// Sets the producing engine.
    #[must_use]
    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Sets the generation time.
    #[must_use]
    pub fn with_generation_time(mut self, elapsed: Duration) -> Self {
        self.generation_time = elapsed;
        self
    }

    /// Sets the cost.
    #[must_use]
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Records the produced clip's shape.
    #[must_use]
    pub fn with_media(mut self, duration_secs: f64, fps: u32, resolution: (u32, u32)) -> Self {
        self.duration_secs = duration_secs;
        self.fps = fps;
        self.resolution = Some(resolution);
        self
    }

    /// Sets the artifact size.
    #[must_use]
    pub fn with_file_size(mut self, bytes: u64) -> Self {
        self.file_size = bytes;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Error message, or an empty string for successes.
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }

    /// Whether the call ended because the caller cancelled it.
    pub fn is_cancelled(&self) -> bool {
        self.failure == Some(FailureKind::Cancelled)
    }
}
