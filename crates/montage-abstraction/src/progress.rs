//! Progress reporting for long-running generations.

use crate::kind::EngineKind;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    /// Engine producing the update, if known.
    pub engine: Option<EngineKind>,
    /// Human-readable status line.
    pub message: String,
    /// Completion fraction in `[0, 1]`, when the engine can estimate it.
    pub fraction: Option<f32>,
}

type Callback = Arc<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// Cheaply cloneable handle to an optional progress callback.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    callback: Option<Callback>,
    engine: Option<EngineKind>,
}

impl ProgressReporter {
    /// Wraps a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&ProgressUpdate) + Send + Sync + 'static,
    {
        Self { callback: Some(Arc::new(callback)), engine: None }
    }

    /// A reporter that drops every update.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Returns a reporter that tags updates with `engine`.
    #[must_use]
    pub fn for_engine(&self, engine: EngineKind) -> Self {
        Self { callback: self.callback.clone(), engine: Some(engine) }
    }

    /// Sends a status line.
    pub fn report(&self, message: impl Into<String>) {
        self.emit(message.into(), None);
    }

    /// Sends a status line with a completion fraction.
    pub fn report_fraction(&self, message: impl Into<String>, fraction: f32) {
        self.emit(message.into(), Some(fraction.clamp(0.0, 1.0)));
    }

    fn emit(&self, message: String, fraction: Option<f32>) {
        if let Some(callback) = &self.callback {
            callback(&ProgressUpdate { engine: self.engine, message, fraction });
        }
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("engine", &self.engine)
            .field("silent", &self.callback.is_none())
            .finish()
    }
}
