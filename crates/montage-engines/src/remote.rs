//! Generic engine for providers that expose an asynchronous job API.

use crate::job::{JobMachine, JobState, PollSettings, Step};
use async_trait::async_trait;
use montage_abstraction::{
    EngineError, EngineInfo, EngineKind, EngineState, GenerationRequest, GenerationResult,
    ProgressReporter, Result, VideoEngine,
};
use serde_json::{Value, json};
use std::path::PathBuf;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Provider call failure, classified by whether it should take the engine
/// out of rotation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// Timeouts, network errors, rate limits, server errors.
    #[error("transient provider error: {0}")]
    Transient(String),
    /// Bad credentials, rejected input, unknown responses.
    #[error("fatal provider error: {0}")]
    Fatal(String),
}

/// Provider-reported job status.
#[derive(Debug, Clone, PartialEq)]
pub enum JobPhase {
    /// Accepted, waiting for capacity.
    Queued,
    /// Rendering, with an optional completion fraction.
    Running {
        /// Completion fraction in `[0, 1]`.
        progress: Option<f32>,
    },
    /// Finished with an artifact.
    Succeeded,
    /// Finished without an artifact.
    Failed(String),
}

/// A fetched artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct JobArtifact {
    /// Local path of the downloaded clip.
    pub path: PathBuf,
    /// Clip length in seconds.
    pub duration_secs: f64,
    /// Frame rate.
    pub fps: u32,
    /// Resolution.
    pub resolution: (u32, u32),
    /// Size in bytes.
    pub file_size: u64,
}

/// The provider-specific half of a remote engine.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Verifies that credentials are present and accepted.
    async fn check_credentials(&self) -> std::result::Result<(), JobError>;

    /// Submits a job and returns its provider identifier.
    async fn submit(&self, params: &Value) -> std::result::Result<String, JobError>;

    /// Reads the job's current phase.
    async fn poll(&self, job_id: &str) -> std::result::Result<JobPhase, JobError>;

    /// Downloads the finished artifact.
    async fn fetch(
        &self,
        job_id: &str,
        request: &GenerationRequest,
    ) -> std::result::Result<JobArtifact, JobError>;

    /// Best-effort cancellation of a job the engine no longer waits for.
    async fn abandon(&self, job_id: &str);
}

/// Engine that submits a job, polls it to completion and fetches the result.
pub struct RemoteJobEngine<B> {
    info: EngineInfo,
    backend: B,
    poll: PollSettings,
    state: EngineState,
}

impl<B: JobBackend> RemoteJobEngine<B> {
    /// Creates an engine with default polling limits.
    pub fn new(info: EngineInfo, backend: B) -> Self {
        Self::with_poll_settings(info, backend, PollSettings::default())
    }

    /// Creates an engine with explicit polling limits.
    pub fn with_poll_settings(info: EngineInfo, backend: B, poll: PollSettings) -> Self {
        Self { info, backend, poll, state: EngineState::new() }
    }

    /// The provider backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn finish(&self, result: GenerationResult, start: Instant) -> GenerationResult {
        let result = result.with_engine(self.info.kind).with_generation_time(start.elapsed());
        self.state.record_result(&result);
        result
    }

    fn provider_failure(&self, stage: &str, err: &JobError, start: Instant) -> GenerationResult {
        match err {
            JobError::Transient(message) => {
                warn!(engine = %self.info.kind, stage, error = %message, "Transient provider error");
            }
            JobError::Fatal(message) => {
                error!(engine = %self.info.kind, stage, error = %message, "Fatal provider error");
                self.state.mark_error(message.clone());
            }
        }
        self.finish(GenerationResult::failure(format!("{} failed: {}", stage, err)), start)
    }

    /// Drives the job to a terminal state. Returns `None` on cancellation.
    async fn await_job(
        &self,
        job_id: &str,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
        submitted: Instant,
    ) -> Option<JobState> {
        let mut machine = JobMachine::new(self.poll.clone());
        let mut wait = machine.first_wait();
        loop {
            tokio::select! {
                () = cancel.cancelled() => return None,
                () = tokio::time::sleep(wait) => {}
            }
            let outcome = tokio::select! {
                () = cancel.cancelled() => return None,
                outcome = self.backend.poll(job_id) => outcome,
            };
            if let Ok(JobPhase::Running { progress: Some(fraction) }) = &outcome {
                progress.report_fraction(format!("{} rendering", self.info.name), *fraction);
            }
            match machine.observe(outcome, submitted.elapsed()) {
                Step::Wait(next) => {
                    debug!(engine = %self.info.kind, job_id, state = ?machine.state(), wait_ms = next.as_millis() as u64, "Job still pending");
                    wait = next;
                }
                Step::Finished => return Some(machine.state().clone()),
            }
        }
    }
}

#[async_trait]
impl<B: JobBackend> VideoEngine for RemoteJobEngine<B> {
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
        match self.backend.check_credentials().await {
            Ok(()) => {
                self.state.mark_ready();
                info!(engine = %self.info.kind, "Engine initialized");
                true
            }
            Err(e) => {
                error!(engine = %self.info.kind, error = %e, "Engine initialization failed");
                self.state.mark_error(e.to_string());
                false
            }
        }
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult> {
        let start = Instant::now();
        let kind = self.info.kind;
        if !self.info.supports_input(request.has_image()) {
            let mode = if request.has_image() { "image-to-video" } else { "text-to-video" };
            return Ok(self.finish(GenerationResult::failure(format!("{} does not support {}", kind, mode)), start));
        }

        let params = request.engine_params();
        progress.report_fraction(format!("submitting job to {}", self.info.name), 0.0);
        let job_id = tokio::select! {
            () = cancel.cancelled() => return Err(EngineError::Cancelled),
            submitted = self.backend.submit(&params) => match submitted {
                Ok(id) => id,
                Err(e) => return Ok(self.provider_failure("submit", &e, start)),
            },
        };
        info!(engine = %kind, job_id = %job_id, "Job submitted");

        let Some(outcome) = self.await_job(&job_id, progress, cancel, start).await else {
            debug!(engine = %kind, job_id = %job_id, "Abandoning job after cancellation");
            self.backend.abandon(&job_id).await;
            return Err(EngineError::Cancelled);
        };

        match outcome {
            JobState::Succeeded => {}
            JobState::Failed { message, fatal } => {
                let err = if fatal { JobError::Fatal(message) } else { JobError::Transient(message) };
                return Ok(self.provider_failure("job", &err, start));
            }
            JobState::TimedOut => {
                self.backend.abandon(&job_id).await;
                let message = format!("job {} did not finish within {}s", job_id, self.poll.deadline.as_secs());
                warn!(engine = %kind, job_id = %job_id, "Job timed out");
                return Ok(self.finish(GenerationResult::failure(message), start));
            }
            JobState::Submitted | JobState::Running => {
                return Err(EngineError::Internal(format!("job {} stopped before a terminal state", job_id)));
            }
        }

        let artifact = tokio::select! {
            () = cancel.cancelled() => return Err(EngineError::Cancelled),
            fetched = self.backend.fetch(&job_id, request) => match fetched {
                Ok(artifact) => artifact,
                Err(e) => return Ok(self.provider_failure("download", &e, start)),
            },
        };

        progress.report_fraction(format!("{} finished", self.info.name), 1.0);
        let result = GenerationResult::success(artifact.path)
            .with_cost(self.info.cost_per_second * artifact.duration_secs)
            .with_media(artifact.duration_secs, artifact.fps, artifact.resolution)
            .with_file_size(artifact.file_size)
            .with_metadata("job_id", json!(job_id));
        Ok(self.finish(result, start))
    }

    async fn test_connection(&self) -> bool {
        self.backend.check_credentials().await.is_ok()
    }
}

impl<B> std::fmt::Debug for RemoteJobEngine<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteJobEngine")
            .field("kind", &self.info.kind)
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_info;
    use montage_abstraction::EngineStatus;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn quick_poll() -> PollSettings {
        PollSettings::default()
            .with_poll_interval(Duration::from_secs(1))
            .with_deadline(Duration::from_secs(30))
    }

    struct ScriptedBackend {
        credentials: std::result::Result<(), JobError>,
        submit: std::result::Result<String, JobError>,
        phases: Mutex<VecDeque<std::result::Result<JobPhase, JobError>>>,
        abandoned: AtomicBool,
    }

    impl ScriptedBackend {
        fn new(phases: Vec<std::result::Result<JobPhase, JobError>>) -> Self {
            Self {
                credentials: Ok(()),
                submit: Ok("job-1".into()),
                phases: Mutex::new(phases.into()),
                abandoned: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl JobBackend for ScriptedBackend {
        async fn check_credentials(&self) -> std::result::Result<(), JobError> {
            self.credentials.clone()
        }

        async fn submit(&self, _params: &Value) -> std::result::Result<String, JobError> {
            self.submit.clone()
        }

        async fn poll(&self, _job_id: &str) -> std::result::Result<JobPhase, JobError> {
            self.phases
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(JobPhase::Running { progress: None }))
        }

        async fn fetch(
            &self,
            job_id: &str,
            request: &GenerationRequest,
        ) -> std::result::Result<JobArtifact, JobError> {
            Ok(JobArtifact {
                path: request.output_dir.join(format!("{job_id}.mp4")),
                duration_secs: 5.0,
                fps: 24,
                resolution: (1080, 1080),
                file_size: 1024,
            })
        }

        async fn abandon(&self, _job_id: &str) {
            self.abandoned.store(true, Ordering::SeqCst);
        }
    }

    fn engine(backend: ScriptedBackend) -> RemoteJobEngine<ScriptedBackend> {
        RemoteJobEngine::with_poll_settings(default_info(EngineKind::DoubaoSeedanceLite), backend, quick_poll())
    }

    async fn run(engine: &RemoteJobEngine<ScriptedBackend>, cancel: &CancellationToken) -> Result<GenerationResult> {
        engine.generate(&GenerationRequest::new("koi pond"), &ProgressReporter::silent(), cancel).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_succeeds_after_polling() {
        let engine = engine(ScriptedBackend::new(vec![
            Ok(JobPhase::Queued),
            Ok(JobPhase::Running { progress: Some(0.4) }),
            Err(JobError::Transient("gateway timeout".into())),
            Ok(JobPhase::Succeeded),
        ]));
        assert!(engine.initialize().await);

        let result = run(&engine, &CancellationToken::new()).await.unwrap();
        assert!(result.success);
        assert!((result.cost - 0.065).abs() < 1e-9);
        assert_eq!(result.metadata["job_id"], "job-1");
        assert_eq!(engine.status(), EngineStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_failure_keeps_engine_idle() {
        let engine = engine(ScriptedBackend::new(vec![Ok(JobPhase::Failed("content rejected".into()))]));
        engine.initialize().await;

        let result = run(&engine, &CancellationToken::new()).await.unwrap();
        assert!(!result.success);
        assert!(result.error_message().contains("content rejected"));
        assert_eq!(engine.status(), EngineStatus::Idle);
        assert_eq!(engine.statistics().error_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_submit_flips_to_error() {
        let mut backend = ScriptedBackend::new(Vec::new());
        backend.submit = Err(JobError::Fatal("invalid api key".into()));
        let engine = engine(backend);
        engine.initialize().await;

        let result = run(&engine, &CancellationToken::new()).await.unwrap();
        assert!(!result.success);
        assert_eq!(engine.status(), EngineStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_abandons_job() {
        let engine = engine(ScriptedBackend::new(Vec::new()));
        engine.initialize().await;

        let result = run(&engine, &CancellationToken::new()).await.unwrap();
        assert!(!result.success);
        assert!(result.error_message().contains("did not finish"));
        assert!(engine.backend().abandoned.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_abandons_job() {
        let engine = engine(ScriptedBackend::new(Vec::new()));
        engine.initialize().await;
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        assert_eq!(run(&engine, &cancel).await, Err(EngineError::Cancelled));
        assert!(engine.backend().abandoned.load(Ordering::SeqCst));
        assert_eq!(engine.statistics().request_count, 0);
    }

    #[tokio::test]
    async fn test_bad_credentials_fail_initialize() {
        let mut backend = ScriptedBackend::new(Vec::new());
        backend.credentials = Err(JobError::Fatal("missing key".into()));
        let engine = engine(backend);

        assert!(!engine.initialize().await);
        assert!(!engine.test_connection().await);
        assert_eq!(engine.status(), EngineStatus::Error);
    }

    #[tokio::test]
    async fn test_image_only_engine_rejects_text() {
        let engine = RemoteJobEngine::new(default_info(EngineKind::DoubaoSeedancePro), ScriptedBackend::new(Vec::new()));
        engine.initialize().await;

        let result = run_plain(&engine).await;
        assert!(!result.success);
        assert!(result.error_message().contains("text-to-video"));
    }

    async fn run_plain(engine: &RemoteJobEngine<ScriptedBackend>) -> GenerationResult {
        engine
            .generate(&GenerationRequest::new("text only"), &ProgressReporter::silent(), &CancellationToken::new())
            .await
            .unwrap()
    }
}
