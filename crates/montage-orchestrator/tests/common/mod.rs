//! Shared test engine for orchestrator integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use montage_abstraction::{
    EngineConstructor, EngineError, EngineInfo, EngineKind, EngineState, EngineStatus, GenerationRequest,
    GenerationResult, ProgressReporter, VideoEngine,
};
use montage_orchestrator::{EngineManager, EngineRegistry, OrchestratorConfig, RetryPolicy};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Tracks current and peak concurrency.
#[derive(Debug, Default)]
pub struct Gauge {
    current: AtomicU32,
    peak: AtomicU32,
}

impl Gauge {
    pub fn peak(&self) -> u32 {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> u32 {
        self.current.load(Ordering::SeqCst)
    }

    fn enter(self: &Arc<Self>) -> GaugeGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard(Arc::clone(self))
    }
}

struct GaugeGuard(Arc<Gauge>);

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// How a mock engine behaves. Counters are shared by every instance built
/// from the same constructor.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub latency: Duration,
    /// How long each initialize call takes.
    pub init_latency: Duration,
    /// The first `fail_attempts` generate calls fail.
    pub fail_attempts: u32,
    /// The first `init_failures` initialize calls fail.
    pub init_failures: u32,
    /// The first generate call panics.
    pub panic_first: bool,
    pub cost_per_second: f64,
    pub max_concurrent: u32,
    pub image_input: bool,
    pub text_input: bool,
    pub reachable: bool,
    pub global: Option<Arc<Gauge>>,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            latency: Duration::from_secs(1),
            init_latency: Duration::ZERO,
            fail_attempts: 0,
            init_failures: 0,
            panic_first: false,
            cost_per_second: 0.0,
            max_concurrent: 3,
            image_input: true,
            text_input: true,
            reachable: true,
            global: None,
        }
    }
}

impl MockBehavior {
    pub fn always_failing() -> Self {
        Self { fail_attempts: u32::MAX, ..Self::default() }
    }

    pub fn paid(cost_per_second: f64) -> Self {
        Self { cost_per_second, ..Self::default() }
    }
}

/// Observations shared across instances of one kind.
#[derive(Debug, Default)]
pub struct Probe {
    pub constructions: AtomicU32,
    pub init_calls: AtomicU32,
    pub generate_calls: AtomicU32,
    pub shutdowns: AtomicU32,
    pub gauge: Arc<Gauge>,
}

impl Probe {
    pub fn generate_calls(&self) -> u32 {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn constructions(&self) -> u32 {
        self.constructions.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> u32 {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

pub struct MockEngine {
    info: EngineInfo,
    state: EngineState,
    behavior: MockBehavior,
    probe: Arc<Probe>,
}

#[async_trait]
impl VideoEngine for MockEngine {
    fn kind(&self) -> EngineKind {
        self.info.kind
    }

    fn state(&self) -> &EngineState {
        &self.state
    }

    fn describe(&self) -> EngineInfo {
        self.info.clone()
    }

    async fn initialize(&self) -> bool {
        let call = self.probe.init_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.behavior.init_latency.is_zero() {
            tokio::time::sleep(self.behavior.init_latency).await;
        }
        if call <= self.behavior.init_failures {
            self.state.mark_error("mock init failure");
            false
        } else {
            self.state.mark_ready();
            true
        }
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        _progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> montage_abstraction::Result<GenerationResult> {
        let call = self.probe.generate_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let _engine_slot = self.probe.gauge.enter();
        let _global_slot = self.behavior.global.as_ref().map(|g| g.enter());

        if self.behavior.panic_first && call == 1 {
            panic!("mock engine exploded");
        }

        tokio::select! {
            () = cancel.cancelled() => return Err(EngineError::Cancelled),
            () = tokio::time::sleep(self.behavior.latency) => {}
        }

        let result = if call <= self.behavior.fail_attempts {
            GenerationResult::failure(format!("mock failure {}", call))
        } else {
            GenerationResult::success(request.output_dir.join(format!("{}-{}.mp4", self.info.kind, call)))
                .with_cost(self.behavior.cost_per_second * request.duration_secs)
        };
        self.state.record_result(&result);
        Ok(result)
    }

    async fn test_connection(&self) -> bool {
        self.behavior.reachable
    }

    async fn shutdown(&self) {
        self.probe.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.state.set_status(EngineStatus::Offline);
    }
}

pub fn mock_constructor(kind: EngineKind, behavior: MockBehavior) -> (EngineConstructor, Arc<Probe>) {
    let probe = Arc::new(Probe::default());
    let shared = Arc::clone(&probe);
    let constructor: EngineConstructor = Arc::new(move |_params| {
        shared.constructions.fetch_add(1, Ordering::SeqCst);
        let info = EngineInfo::new(kind)
            .with_cost_per_second(behavior.cost_per_second)
            .with_inputs(behavior.image_input, behavior.text_input)
            .with_max_concurrent_tasks(behavior.max_concurrent);
        Ok(Arc::new(MockEngine {
            info,
            state: EngineState::new(),
            behavior: behavior.clone(),
            probe: Arc::clone(&shared),
        }) as Arc<dyn VideoEngine>)
    });
    (constructor, probe)
}

pub fn failing_constructor() -> EngineConstructor {
    Arc::new(|_params| Err(EngineError::Configuration("missing optional dependency".to_string())))
}

pub fn config(concurrency_limit: usize, max_retries: u32) -> OrchestratorConfig {
    OrchestratorConfig {
        concurrency_limit,
        retry: RetryPolicy { max_retries, ..RetryPolicy::default() },
        ..OrchestratorConfig::default()
    }
}

pub fn registry(engines: Vec<(EngineKind, MockBehavior)>) -> (EngineRegistry, HashMap<EngineKind, Arc<Probe>>) {
    let mut registry = EngineRegistry::new();
    let mut probes = HashMap::new();
    for (kind, behavior) in engines {
        let (constructor, probe) = mock_constructor(kind, behavior);
        registry.register(kind, constructor);
        probes.insert(kind, probe);
    }
    (registry, probes)
}

pub fn manager(
    config: &OrchestratorConfig,
    engines: Vec<(EngineKind, MockBehavior)>,
) -> (Arc<EngineManager>, HashMap<EngineKind, Arc<Probe>>) {
    let (registry, probes) = registry(engines);
    (Arc::new(EngineManager::new(config, registry)), probes)
}
