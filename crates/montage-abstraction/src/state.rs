//! Engine status and per-instance bookkeeping.
//!
//! Every engine embeds one [`EngineState`]. The orchestrator drives the
//! in-flight counter through it; the engine itself drives status transitions
//! on initialization and fatal failures and records lifetime counters.

use crate::result::GenerationResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Lifecycle status of an engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    /// Not initialized, or shut down.
    Offline,
    /// Ready with no work in flight.
    Idle,
    /// At least one generation in flight.
    Busy,
    /// Initialization or a fatal failure left the engine unusable.
    Error,
    /// Administratively disabled.
    Maintenance,
}

impl EngineStatus {
    /// Whether routed work may be sent to an engine in this status.
    pub const fn accepts_work(self) -> bool {
        matches!(self, Self::Idle | Self::Busy)
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineStatus::Offline => write!(f, "offline"),
            EngineStatus::Idle => write!(f, "idle"),
            EngineStatus::Busy => write!(f, "busy"),
            EngineStatus::Error => write!(f, "error"),
            EngineStatus::Maintenance => write!(f, "maintenance"),
        }
    }
}

/// Point-in-time copy of an engine's counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatistics {
    /// Current status.
    pub status: EngineStatus,
    /// Generations currently in flight.
    pub running_tasks: u32,
    /// Completed generation attempts.
    pub request_count: u64,
    /// Successful attempts.
    pub success_count: u64,
    /// Failed attempts.
    pub error_count: u64,
    /// Successful attempts as a percentage of all attempts.
    pub success_rate: f64,
    /// Accumulated cost of successful attempts.
    pub total_cost: f64,
    /// Most recent failure message.
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct Inner {
    status: EngineStatus,
    in_flight: u32,
    request_count: u64,
    success_count: u64,
    error_count: u64,
    total_cost: f64,
    last_error: Option<String>,
}

/// Thread-safe status, in-flight counter and lifetime counters.
///
/// The lock is held only for the duration of each method call.
#[derive(Debug)]
pub struct EngineState {
    inner: Mutex<Inner>,
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineState {
    /// Creates an offline state with zeroed counters.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                status: EngineStatus::Offline,
                in_flight: 0,
                request_count: 0,
                success_count: 0,
                error_count: 0,
                total_cost: 0.0,
                last_error: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current status.
    pub fn status(&self) -> EngineStatus {
        self.lock().status
    }

    /// Number of generations in flight.
    pub fn in_flight(&self) -> u32 {
        self.lock().in_flight
    }

    /// Overrides the status, e.g. for maintenance or shutdown.
    pub fn set_status(&self, status: EngineStatus) {
        self.lock().status = status;
    }

    /// Marks a successful initialization.
    pub fn mark_ready(&self) {
        let mut inner = self.lock();
        inner.status = if inner.in_flight > 0 { EngineStatus::Busy } else { EngineStatus::Idle };
    }

    /// Marks a fatal failure.
    pub fn mark_error(&self, message: impl Into<String>) {
        let mut inner = self.lock();
        inner.status = EngineStatus::Error;
        inner.last_error = Some(message.into());
    }

    /// Takes a concurrency slot if the engine accepts work and fewer than
    /// `max_concurrent` generations are in flight.
    pub fn try_acquire(&self, max_concurrent: u32) -> bool {
        let mut inner = self.lock();
        if !inner.status.accepts_work() || inner.in_flight >= max_concurrent {
            return false;
        }
        Self::take_slot(&mut inner);
        true
    }

    /// Takes a concurrency slot regardless of status or capacity.
    pub fn acquire(&self) {
        Self::take_slot(&mut self.lock());
    }

    fn take_slot(inner: &mut Inner) {
        inner.in_flight += 1;
        if inner.status == EngineStatus::Idle {
            inner.status = EngineStatus::Busy;
        }
        debug!(in_flight = inner.in_flight, status = %inner.status, "Acquired engine slot");
    }

    /// Returns a concurrency slot. `Busy` falls back to `Idle` only once the
    /// last in-flight generation has finished.
    pub fn release(&self) {
        let mut inner = self.lock();
        if inner.in_flight == 0 {
            warn!("Attempted to release an engine slot below zero");
            return;
        }
        inner.in_flight -= 1;
        if inner.in_flight == 0 && inner.status == EngineStatus::Busy {
            inner.status = EngineStatus::Idle;
        }
        debug!(in_flight = inner.in_flight, status = %inner.status, "Released engine slot");
    }

    /// Counts one completed attempt.
    pub fn record_result(&self, result: &GenerationResult) {
        let mut inner = self.lock();
        inner.request_count += 1;
        if result.success {
            inner.success_count += 1;
            inner.total_cost += result.cost;
        } else {
            inner.error_count += 1;
            inner.last_error = result.error.clone();
        }
    }

    /// Clears lifetime counters, keeping status and in-flight count.
    pub fn reset_counters(&self) {
        let mut inner = self.lock();
        inner.request_count = 0;
        inner.success_count = 0;
        inner.error_count = 0;
        inner.total_cost = 0.0;
        inner.last_error = None;
    }

    /// Takes a snapshot of the counters.
    pub fn snapshot(&self) -> EngineStatistics {
        let inner = self.lock();
        let success_rate = if inner.request_count == 0 {
            0.0
        } else {
            (inner.success_count as f64 / inner.request_count as f64) * 100.0
        };
        EngineStatistics {
            status: inner.status,
            running_tasks: inner.in_flight,
            request_count: inner.request_count,
            success_count: inner.success_count,
            error_count: inner.error_count,
            success_rate,
            total_cost: inner.total_cost,
            last_error: inner.last_error.clone(),
        }
    }
}
