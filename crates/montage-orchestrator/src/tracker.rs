//! Rolling per-engine performance statistics.

use chrono::{DateTime, Utc};
use montage_abstraction::EngineKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

/// Rolling statistics for one engine kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnginePerformanceStats {
    /// Orchestration calls that reached this engine.
    pub total_requests: u64,
    /// Calls that ended in success.
    pub successes: u64,
    /// Calls that ended in failure after exhausting retries.
    pub failures: u64,
    /// Moving average of successful generation time, in seconds.
    pub avg_generation_secs: f64,
    /// Accumulated generation time of all calls, in seconds.
    pub total_generation_secs: f64,
    /// The engine's own lifetime success rate, as a percentage.
    pub success_rate: f64,
    /// When the engine was last used.
    pub last_used: Option<DateTime<Utc>>,
}

/// Process-lifetime performance bookkeeping used for routing.
#[derive(Debug, Default)]
pub struct PerformanceTracker {
    stats: RwLock<HashMap<EngineKind, EnginePerformanceStats>>,
}

impl PerformanceTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a finished orchestration call.
    ///
    /// # Arguments
    /// * `kind` - Engine that served the call
    /// * `success` - Final outcome
    /// * `elapsed` - Wall-clock time of the call
    /// * `engine_success_rate` - The engine's own lifetime success rate
    pub fn record(&self, kind: EngineKind, success: bool, elapsed: Duration, engine_success_rate: f64) {
        self.record_at(kind, success, elapsed, engine_success_rate, Utc::now());
    }

    /// Like [`record`](Self::record) with an explicit timestamp.
    pub fn record_at(
        &self,
        kind: EngineKind,
        success: bool,
        elapsed: Duration,
        engine_success_rate: f64,
        now: DateTime<Utc>,
    ) {
        let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        let entry = stats.entry(kind).or_default();
        let secs = elapsed.as_secs_f64();

        entry.total_requests += 1;
        entry.total_generation_secs += secs;
        if success {
            entry.successes += 1;
            entry.avg_generation_secs = if entry.avg_generation_secs == 0.0 {
                secs
            } else {
                (entry.avg_generation_secs + secs) / 2.0
            };
        } else {
            entry.failures += 1;
        }
        entry.success_rate = engine_success_rate;
        entry.last_used = Some(now);

        debug!(
            engine = %kind,
            success,
            elapsed_ms = elapsed.as_millis() as u64,
            avg_secs = entry.avg_generation_secs,
            "Recorded engine performance"
        );
    }

    /// Statistics for one engine.
    pub fn get(&self, kind: EngineKind) -> Option<EnginePerformanceStats> {
        self.stats.read().unwrap_or_else(PoisonError::into_inner).get(&kind).cloned()
    }

    /// Copy of all statistics.
    pub fn snapshot(&self) -> HashMap<EngineKind, EnginePerformanceStats> {
        self.stats.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Forgets everything.
    pub fn reset(&self) {
        self.stats.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
