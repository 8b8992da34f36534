//! An engine that fakes generation locally.

use crate::catalog::default_info;
use async_trait::async_trait;
use montage_abstraction::{
    EngineError, EngineInfo, EngineKind, EngineState, GenerationRequest, GenerationResult,
    ProgressReporter, Result, VideoEngine,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Behaviour knobs, read from the engine's configuration blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatedSettings {
    /// Simulated render time per attempt.
    pub latency_ms: u64,

    /// Number of initial `generate` calls that report failure.
    pub fail_first: u32,

    /// Whether those failures are fatal (flip the engine to `Error`).
    pub fatal_failures: bool,

    /// Number of initial `initialize` calls that fail.
    pub init_failures: u32,

    /// Result of `test_connection`.
    pub reachable: bool,

    /// Write a placeholder file for every produced clip.
    pub write_artifact: bool,

    /// Overrides the profile's cost per second.
    pub cost_per_second: Option<f64>,

    /// Overrides the profile's concurrency cap.
    pub max_concurrent_tasks: Option<u32>,
}

impl Default for SimulatedSettings {
    fn default() -> Self {
        Self {
            latency_ms: 200,
            fail_first: 0,
            fatal_failures: false,
            init_failures: 0,
            reachable: true,
            write_artifact: false,
            cost_per_second: None,
            max_concurrent_tasks: None,
        }
    }
}

/// Local stand-in for a remote provider.
#[derive(Debug)]
pub struct SimulatedEngine {
    info: EngineInfo,
    settings: SimulatedSettings,
    state: EngineState,
    generate_calls: AtomicU32,
    initialize_calls: AtomicU32,
}

impl SimulatedEngine {
    /// Creates an engine with default settings.
    pub fn new(kind: EngineKind) -> Self {
        Self::with_settings(kind, SimulatedSettings::default())
    }

    /// Creates an engine with explicit settings.
    pub fn with_settings(kind: EngineKind, settings: SimulatedSettings) -> Self {
        let mut info = default_info(kind);
        if let Some(cost) = settings.cost_per_second {
            info = info.with_cost_per_second(cost);
        }
        if let Some(max) = settings.max_concurrent_tasks {
            info = info.with_max_concurrent_tasks(max);
        }
        Self {
            info,
            settings,
            state: EngineState::new(),
            generate_calls: AtomicU32::new(0),
            initialize_calls: AtomicU32::new(0),
        }
    }

    /// Builds an engine from a JSON configuration blob. `null` means defaults.
    ///
    /// # Errors
    /// Returns `EngineError::Configuration` when the blob does not describe
    /// [`SimulatedSettings`].
    pub fn from_config(kind: EngineKind, params: &serde_json::Value) -> Result<Self> {
        let settings = if params.is_null() {
            SimulatedSettings::default()
        } else {
            serde_json::from_value(params.clone())
                .map_err(|e| EngineError::Configuration(format!("{}: {}", kind, e)))?
        };
        Ok(Self::with_settings(kind, settings))
    }

    /// How many times `generate` has been called.
    pub fn generate_calls(&self) -> u32 {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// How many times `initialize` has been called.
    pub fn initialize_calls(&self) -> u32 {
        self.initialize_calls.load(Ordering::SeqCst)
    }

    async fn write_placeholder(&self, path: &std::path::Path, request: &GenerationRequest) -> std::io::Result<u64> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = format!(
            "montage simulated clip\nengine={}\nprompt={}\n",
            self.info.kind, request.prompt
        );
        tokio::fs::write(path, body.as_bytes()).await?;
        Ok(body.len() as u64)
    }
}

#[async_trait]
impl VideoEngine for SimulatedEngine {
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
        let call = self.initialize_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.settings.init_failures {
            warn!(engine = %self.info.kind, call, "Simulated initialization failure");
            self.state.mark_error("simulated initialization failure");
            return false;
        }
        self.state.mark_ready();
        info!(engine = %self.info.kind, "Engine initialized");
        true
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult> {
        let attempt = self.generate_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let kind = self.info.kind;
        let start = Instant::now();

        if !self.info.supports_input(request.has_image()) {
            let result = GenerationResult::failure(format!("{} does not support this input mode", kind))
                .with_engine(kind);
            self.state.record_result(&result);
            return Ok(result);
        }

        progress.report_fraction(format!("{} rendering", self.info.name), 0.0);
        tokio::select! {
            () = cancel.cancelled() => {
                debug!(engine = %kind, attempt, "Simulated generation cancelled");
                return Err(EngineError::Cancelled);
            }
            () = tokio::time::sleep(Duration::from_millis(self.settings.latency_ms)) => {}
        }

        if attempt <= self.settings.fail_first {
            let message = format!("simulated failure on attempt {}", attempt);
            if self.settings.fatal_failures {
                self.state.mark_error(message.clone());
            }
            let result = GenerationResult::failure(message)
                .with_engine(kind)
                .with_generation_time(start.elapsed());
            self.state.record_result(&result);
            return Ok(result);
        }

        let duration = request.duration_secs.min(self.info.max_duration_secs);
        let path = request.output_dir.join(format!(
            "{}_{}.{}",
            kind,
            uuid::Uuid::new_v4().simple(),
            request.output_format
        ));

        let file_size = if self.settings.write_artifact {
            match self.write_placeholder(&path, request).await {
                Ok(size) => size,
                Err(e) => {
                    let result = GenerationResult::failure(format!("failed to write {}: {}", path.display(), e))
                        .with_engine(kind)
                        .with_generation_time(start.elapsed());
                    self.state.record_result(&result);
                    return Ok(result);
                }
            }
        } else {
            0
        };

        progress.report_fraction(format!("{} finished", self.info.name), 1.0);
        let result = GenerationResult::success(path)
            .with_engine(kind)
            .with_generation_time(start.elapsed())
            .with_cost(self.info.cost_per_second * duration)
            .with_media(duration, request.fps, (request.width, request.height))
            .with_file_size(file_size)
            .with_metadata("attempt", json!(attempt))
            .with_metadata("simulated", json!(true));
        self.state.record_result(&result);
        Ok(result)
    }

    async fn test_connection(&self) -> bool {
        self.settings.reachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use montage_abstraction::EngineStatus;

    fn fast(settings: SimulatedSettings) -> SimulatedSettings {
        SimulatedSettings { latency_ms: 1, ..settings }
    }

    #[tokio::test]
    async fn test_initialize_failures_then_ready() {
        let engine = SimulatedEngine::with_settings(
            EngineKind::Vheer,
            fast(SimulatedSettings { init_failures: 1, ..Default::default() }),
        );
        assert!(!engine.initialize().await);
        assert_eq!(engine.status(), EngineStatus::Error);
        assert!(engine.initialize().await);
        assert_eq!(engine.status(), EngineStatus::Idle);
    }

    #[tokio::test]
    async fn test_generate_success_records_cost() {
        let engine = SimulatedEngine::with_settings(EngineKind::DoubaoSeedanceLite, fast(Default::default()));
        engine.initialize().await;

        let request = GenerationRequest::new("city at night").with_duration(4.0);
        let result = engine
            .generate(&request, &ProgressReporter::silent(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.engine, Some(EngineKind::DoubaoSeedanceLite));
        assert!((result.cost - 0.052).abs() < 1e-9);
        assert_eq!(engine.statistics().success_count, 1);
    }

    #[tokio::test]
    async fn test_fatal_failure_flips_status() {
        let engine = SimulatedEngine::with_settings(
            EngineKind::Haiper,
            fast(SimulatedSettings { fail_first: 1, fatal_failures: true, ..Default::default() }),
        );
        engine.initialize().await;

        let result = engine
            .generate(&GenerationRequest::new("x"), &ProgressReporter::silent(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(engine.status(), EngineStatus::Error);
    }

    #[tokio::test]
    async fn test_rejects_unsupported_input() {
        let engine = SimulatedEngine::with_settings(EngineKind::Vheer, fast(Default::default()));
        engine.initialize().await;

        let result = engine
            .generate(&GenerationRequest::new("text only"), &ProgressReporter::silent(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_cancel_returns_error() {
        let engine = SimulatedEngine::with_settings(
            EngineKind::Haiper,
            SimulatedSettings { latency_ms: 60_000, ..Default::default() },
        );
        engine.initialize().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = engine
            .generate(&GenerationRequest::new("x"), &ProgressReporter::silent(), &cancel)
            .await;
        assert_eq!(outcome, Err(EngineError::Cancelled));
        assert_eq!(engine.statistics().request_count, 0);
    }

    #[tokio::test]
    async fn test_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let engine = SimulatedEngine::with_settings(
            EngineKind::PixVerse,
            fast(SimulatedSettings { write_artifact: true, ..Default::default() }),
        );
        engine.initialize().await;

        let request = GenerationRequest::new("fog").with_output_dir(dir.path());
        let result = engine
            .generate(&request, &ProgressReporter::silent(), &CancellationToken::new())
            .await
            .unwrap();

        let path = result.artifact_path.unwrap();
        assert!(path.exists());
        assert!(result.file_size > 0);
    }
}
