//! The engine contract.

use crate::error::Result;
use crate::info::EngineInfo;
use crate::kind::EngineKind;
use crate::progress::ProgressReporter;
use crate::request::GenerationRequest;
use crate::result::GenerationResult;
use crate::state::{EngineState, EngineStatistics, EngineStatus};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A video generation backend.
///
/// Implementations must be safe for concurrent use: the orchestrator may run
/// several `generate` calls against one instance, up to
/// [`EngineInfo::max_concurrent_tasks`].
#[async_trait]
pub trait VideoEngine: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> EngineKind;

    /// Embedded status and counters.
    fn state(&self) -> &EngineState;

    /// Static capability description.
    fn describe(&self) -> EngineInfo;

    /// Performs one-time setup. Sets the status to `Idle` on success and
    /// `Error` on failure. Safe to call again after an error.
    async fn initialize(&self) -> bool;

    /// Runs one generation attempt.
    ///
    /// Ordinary failures are reported as a non-successful result. An `Err`
    /// is reserved for cancellation and contract violations.
    ///
    /// # Arguments
    /// * `request` - What to generate
    /// * `progress` - Receives status updates
    /// * `cancel` - Aborts the attempt when triggered
    async fn generate(
        &self,
        request: &GenerationRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult>;

    /// Lightweight reachability and credential check.
    async fn test_connection(&self) -> bool;

    /// Releases resources. The default marks the engine offline.
    async fn shutdown(&self) {
        self.state().set_status(EngineStatus::Offline);
    }

    /// Current status.
    fn status(&self) -> EngineStatus {
        self.state().status()
    }

    /// Generations currently in flight.
    fn running_tasks(&self) -> u32 {
        self.state().in_flight()
    }

    /// Whether another generation fits under the concurrency cap.
    fn has_capacity(&self) -> bool {
        self.running_tasks() < self.describe().max_concurrent_tasks
    }

    /// Lifetime counters.
    fn statistics(&self) -> EngineStatistics {
        self.state().snapshot()
    }
}

/// Builds an engine from its opaque configuration blob.
pub type EngineConstructor =
    Arc<dyn Fn(&serde_json::Value) -> Result<Arc<dyn VideoEngine>> + Send + Sync>;
