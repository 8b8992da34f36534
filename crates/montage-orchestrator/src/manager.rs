//! The orchestrator: engine selection, admission, retries and bookkeeping.

use crate::admission::{AdmissionGate, EngineLease};
use crate::config::OrchestratorConfig;
use crate::error::{OrchestrationError, Result};
use crate::registry::EngineRegistry;
use crate::retry::RetryPolicy;
use crate::routing::{self, Candidate, RoutingStrategy};
use crate::tracker::{EnginePerformanceStats, PerformanceTracker};
use futures::FutureExt;
use montage_abstraction::{
    EngineKind, EngineStatistics, EngineStatus, FailureKind, GenerationRequest,
    GenerationResult, ProgressReporter,
};
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::{PoisonError, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Snapshot returned by [`EngineManager::statistics`].
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatistics {
    /// Orchestration calls currently admitted.
    pub active_tasks: usize,
    /// Global concurrency limit.
    pub concurrency_limit: usize,
    /// Current routing strategy.
    pub routing_strategy: RoutingStrategy,
    /// Lifetime counters of every live engine.
    pub engines: BTreeMap<EngineKind, EngineStatistics>,
    /// Rolling performance statistics per engine kind.
    pub performance: BTreeMap<EngineKind, EnginePerformanceStats>,
}

/// Multi-engine orchestrator.
///
/// Construct one per process and share it by reference or `Arc`.
#[derive(Debug)]
pub struct EngineManager {
    registry: EngineRegistry,
    tracker: PerformanceTracker,
    gate: AdmissionGate,
    retry: RetryPolicy,
    priority: Vec<EngineKind>,
    strategy: RwLock<RoutingStrategy>,
}

impl EngineManager {
    /// Creates an orchestrator over `registry`.
    pub fn new(config: &OrchestratorConfig, registry: EngineRegistry) -> Self {
        info!(
            concurrency_limit = config.concurrency_limit,
            strategy = %config.routing_strategy,
            engines = registry.known_kinds().len(),
            "Engine manager created"
        );
        Self {
            registry,
            tracker: PerformanceTracker::new(),
            gate: AdmissionGate::new(config.concurrency_limit),
            retry: config.retry.clone(),
            priority: config.priority.clone(),
            strategy: RwLock::new(config.routing_strategy),
        }
    }

    /// The engine registry.
    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    /// The performance tracker.
    pub fn tracker(&self) -> &PerformanceTracker {
        &self.tracker
    }

    /// Orchestration calls currently admitted.
    pub fn active_tasks(&self) -> usize {
        self.gate.active()
    }

    /// Current routing strategy.
    pub fn routing_strategy(&self) -> RoutingStrategy {
        *self.strategy.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switches the routing strategy for subsequent calls.
    pub fn set_routing_strategy(&self, strategy: RoutingStrategy) {
        *self.strategy.write().unwrap_or_else(PoisonError::into_inner) = strategy;
        info!(strategy = %strategy, "Routing strategy changed");
    }

    /// Runs one generation.
    ///
    /// Exactly one result comes back per call. Engine failures are returned
    /// as a non-successful result; `Err` is reserved for admission failures,
    /// invalid requests and cancellation.
    ///
    /// # Arguments
    /// * `request` - What to generate
    /// * `preferred` - Engines to use, in order; empty means routed selection
    /// * `progress` - Receives status updates
    /// * `cancel` - Stops the call at the next suspension point
    pub async fn run_generation(
        &self,
        request: &GenerationRequest,
        preferred: &[EngineKind],
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult> {
        request.validate().map_err(|e| OrchestrationError::InvalidRequest(e.to_string()))?;

        let _permit = self.gate.admit(cancel).await?;

        // Selection may wait on slow engine initialization.
        let selection = async {
            if preferred.is_empty() {
                self.select_routed(request).await
            } else {
                self.select_preferred(preferred).await
            }
        };
        let lease = tokio::select! {
            () = cancel.cancelled() => {
                info!("Generation cancelled during engine selection");
                return Err(OrchestrationError::Cancelled);
            }
            lease = selection => lease?,
        };
        let kind = lease.kind();
        info!(engine = %kind, active_tasks = self.gate.active(), "Engine selected");
        progress.report(format!("using {}", kind.display_name()));

        let started = Instant::now();
        let outcome = self.run_attempts(&lease, request, &progress.for_engine(kind), cancel).await;
        let elapsed = started.elapsed();
        let engine_success_rate = lease.engine().statistics().success_rate;
        drop(lease);

        match outcome {
            Ok(result) => {
                self.tracker.record(kind, result.success, elapsed, engine_success_rate);
                Ok(result.with_engine(kind).with_generation_time(elapsed))
            }
            Err(e) => {
                info!(engine = %kind, "Generation cancelled");
                Err(e)
            }
        }
    }

    /// Uses the first preferred kind that can be constructed, whatever its
    /// status or load.
    async fn select_preferred(&self, preferred: &[EngineKind]) -> Result<EngineLease> {
        for &kind in preferred {
            match self.registry.get_or_create(kind).await {
                Ok(engine) => {
                    let status = engine.status();
                    if status != EngineStatus::Idle || !engine.has_capacity() {
                        warn!(
                            engine = %kind,
                            status = %status,
                            running = engine.running_tasks(),
                            "Using preferred engine despite its state"
                        );
                    }
                    return Ok(EngineLease::force(engine));
                }
                Err(e) => warn!(engine = %kind, error = %e, "Preferred engine unusable"),
            }
        }
        let names: Vec<&str> = preferred.iter().map(|k| k.as_str()).collect();
        Err(OrchestrationError::NoPreferredEngine(names.join(", ")))
    }

    /// Ranks available engines and leases the best one with a free slot.
    async fn select_routed(&self, request: &GenerationRequest) -> Result<EngineLease> {
        let has_image = request.has_image();
        let available = self
            .registry
            .list_available_matching(|info| info.supports_input(has_image))
            .await;

        let candidates: Vec<Candidate> = available
            .iter()
            .filter_map(|&kind| {
                self.registry.cached(kind).map(|engine| Candidate { kind, info: engine.describe() })
            })
            .collect();
        let strategy = self.routing_strategy();
        let ranking = routing::rank(strategy, &candidates, &self.priority, &self.tracker.snapshot());
        debug!(strategy = %strategy, ?ranking, "Ranked engines");

        for kind in ranking {
            let Some(engine) = self.registry.cached(kind) else { continue };
            if let Some(lease) = EngineLease::try_acquire(engine) {
                return Ok(lease);
            }
            debug!(engine = %kind, "Engine filled up before admission, trying next");
        }
        Err(OrchestrationError::NoEngineAvailable)
    }

    /// The retry loop. Returns `Err(Cancelled)` only; every other outcome is
    /// a result.
    async fn run_attempts(
        &self,
        lease: &EngineLease,
        request: &GenerationRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult> {
        let engine = lease.engine();
        let kind = lease.kind();
        let max_attempts = self.retry.max_attempts();
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.retry.delay_for(attempt - 2);
                debug!(engine = %kind, attempt, delay_ms = delay.as_millis() as u64, "Retrying after backoff");
                progress.report(format!("retrying ({}/{})", attempt, max_attempts));
                tokio::select! {
                    () = cancel.cancelled() => return Err(OrchestrationError::Cancelled),
                    () = tokio::time::sleep(delay) => {}
                }
            }
            if cancel.is_cancelled() {
                return Err(OrchestrationError::Cancelled);
            }

            // Engines observe the token themselves so they can abandon remote work.
            let outcome = AssertUnwindSafe(engine.generate(request, progress, cancel))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(result)) if result.success => {
                    info!(engine = %kind, attempt, "Generation succeeded");
                    return Ok(result);
                }
                Ok(Ok(result)) => {
                    if cancel.is_cancelled() {
                        return Err(OrchestrationError::Cancelled);
                    }
                    last_error = match result.error {
                        Some(message) if !message.is_empty() => message,
                        _ => "unknown error".to_string(),
                    };
                    warn!(engine = %kind, attempt, max_attempts, error = %last_error, "Generation attempt failed");
                }
                Ok(Err(e)) if e.is_cancelled() => return Err(OrchestrationError::Cancelled),
                Ok(Err(e)) => {
                    last_error = e.to_string();
                    warn!(engine = %kind, attempt, max_attempts, error = %last_error, "Generation attempt raised");
                }
                Err(panic) => {
                    last_error = format!("engine panicked: {}", panic_message(panic.as_ref()));
                    error!(engine = %kind, attempt, max_attempts, error = %last_error, "Generation attempt panicked");
                }
            }
        }

        Ok(GenerationResult::failed(
            FailureKind::RetriesExhausted,
            format!("generation failed after {} attempts: {}", max_attempts, last_error),
        ))
    }

    /// Current counters and statistics.
    pub fn statistics(&self) -> OrchestratorStatistics {
        OrchestratorStatistics {
            active_tasks: self.gate.active(),
            concurrency_limit: self.gate.limit(),
            routing_strategy: self.routing_strategy(),
            engines: self.registry.engine_statistics(),
            performance: self.tracker.snapshot().into_iter().collect(),
        }
    }

    /// Clears rolling statistics and the engines' lifetime counters.
    pub fn reset_statistics(&self) {
        self.tracker.reset();
        self.registry.reset_engine_statistics();
        info!("Statistics reset");
    }

    /// Stops admitting work and shuts every engine down.
    pub async fn shutdown(&self) {
        self.gate.close();
        self.registry.shutdown_all().await;
        info!("Engine manager shut down");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
