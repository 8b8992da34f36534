//! Global and per-engine admission.
//!
//! Both slots are RAII guards, so every exit path of an orchestration call
//! (success, failure, cancellation, panic) gives them back.

use crate::error::{OrchestrationError, Result};
use montage_abstraction::{EngineKind, VideoEngine};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Bounds the number of orchestration calls in flight.
#[derive(Debug)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl AdmissionGate {
    /// Creates a gate admitting at most `limit` calls at once.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self { semaphore: Arc::new(Semaphore::new(limit)), limit }
    }

    /// Waits for a free slot.
    ///
    /// # Errors
    /// Returns `Cancelled` if `cancel` fires first, `ShutDown` once the gate
    /// is closed.
    pub async fn admit(&self, cancel: &CancellationToken) -> Result<OwnedSemaphorePermit> {
        let permit = tokio::select! {
            () = cancel.cancelled() => return Err(OrchestrationError::Cancelled),
            permit = Arc::clone(&self.semaphore).acquire_owned() => {
                permit.map_err(|_| OrchestrationError::ShutDown)?
            }
        };
        debug!(active_tasks = self.active(), limit = self.limit, "Admitted generation");
        Ok(permit)
    }

    /// Calls currently holding a slot.
    pub fn active(&self) -> usize {
        self.limit.saturating_sub(self.semaphore.available_permits())
    }

    /// Configured limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Stops admitting new calls. Calls already admitted run to completion.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

/// A per-engine concurrency slot. Dropping it releases the slot.
pub struct EngineLease {
    engine: Arc<dyn VideoEngine>,
}

impl EngineLease {
    /// Takes a slot if the engine accepts work and has spare capacity.
    pub fn try_acquire(engine: Arc<dyn VideoEngine>) -> Option<Self> {
        let max = engine.describe().max_concurrent_tasks;
        engine.state().try_acquire(max).then(|| Self { engine })
    }

    /// Takes a slot regardless of status or capacity.
    pub fn force(engine: Arc<dyn VideoEngine>) -> Self {
        engine.state().acquire();
        Self { engine }
    }

    /// The leased engine.
    pub fn engine(&self) -> &Arc<dyn VideoEngine> {
        &self.engine
    }

    /// The leased engine's kind.
    pub fn kind(&self) -> EngineKind {
        self.engine.kind()
    }
}

impl Drop for EngineLease {
    fn drop(&mut self) {
        self.engine.state().release();
    }
}

impl std::fmt::Debug for EngineLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineLease").field("engine", &self.engine.kind()).finish()
    }
}
