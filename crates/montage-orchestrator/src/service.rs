//! Caller-facing facade over the orchestrator.

use crate::config::OrchestratorConfig;
use crate::error::{OrchestrationError, Result};
use crate::manager::{EngineManager, OrchestratorStatistics};
use crate::registry::EngineRegistry;
use crate::routing::RoutingStrategy;
use montage_abstraction::{
    EngineConstructor, EngineInfo, EngineKind, FailureKind, GenerationRequest, GenerationResult,
    ProgressReporter,
};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Optional knobs for [`VideoGenerationService::generate`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    /// Source image for image-to-video.
    pub image_path: Option<PathBuf>,
    /// Clip length in seconds.
    pub duration_secs: f64,
    /// Frame rate.
    pub fps: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Motion strength in `[0, 1]`.
    pub motion_intensity: f64,
    /// Output container tag.
    pub output_format: String,
    /// Random seed.
    pub seed: Option<u64>,
    /// Engine names to force, in order. Unknown names are skipped.
    pub preferred_engines: Vec<String>,
    /// Engine-specific parameters.
    pub params: HashMap<String, serde_json::Value>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        let request = GenerationRequest::default();
        Self {
            image_path: None,
            duration_secs: request.duration_secs,
            fps: request.fps,
            width: request.width,
            height: request.height,
            motion_intensity: request.motion_intensity,
            output_format: request.output_format,
            seed: None,
            preferred_engines: Vec::new(),
            params: HashMap::new(),
        }
    }
}

impl GenerateOptions {
    /// Sets the source image.
    #[must_use]
    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    /// Sets the clip duration.
    #[must_use]
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = secs;
        self
    }

    /// Forces an engine by name. May be called repeatedly.
    #[must_use]
    pub fn with_preferred_engine(mut self, name: impl Into<String>) -> Self {
        self.preferred_engines.push(name.into());
        self
    }
}

/// Simplified entry point for generating videos.
#[derive(Debug)]
pub struct VideoGenerationService {
    manager: EngineManager,
    output_dir: PathBuf,
}

impl VideoGenerationService {
    /// Creates a service over an explicit registry.
    pub fn new(config: &OrchestratorConfig, registry: EngineRegistry) -> Self {
        Self { manager: EngineManager::new(config, registry), output_dir: config.output_dir.clone() }
    }

    /// Creates a service, registering `constructors` for every enabled kind.
    pub fn from_config<I>(config: &OrchestratorConfig, constructors: I) -> Self
    where
        I: IntoIterator<Item = (EngineKind, EngineConstructor)>,
    {
        Self::new(config, EngineRegistry::from_config(config, constructors))
    }

    /// The underlying orchestrator.
    pub fn manager(&self) -> &EngineManager {
        &self.manager
    }

    /// Builds a request from a prompt and options.
    pub fn build_request(&self, prompt: &str, options: &GenerateOptions) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.to_string(),
            image_path: options.image_path.clone(),
            duration_secs: options.duration_secs,
            fps: options.fps,
            width: options.width,
            height: options.height,
            motion_intensity: options.motion_intensity,
            seed: options.seed,
            output_format: options.output_format.clone(),
            output_dir: self.output_dir.clone(),
            params: options.params.clone(),
        }
    }

    /// Generates one video.
    ///
    /// # Errors
    /// Only a malformed request is an error. Every other outcome, including
    /// having no usable engine, is a result with `success == false`.
    pub async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
        progress: &ProgressReporter,
    ) -> Result<GenerationResult> {
        self.generate_with_cancel(prompt, options, progress, &CancellationToken::new()).await
    }

    /// Like [`generate`](Self::generate), cancellable through `cancel`.
    pub async fn generate_with_cancel(
        &self,
        prompt: &str,
        options: &GenerateOptions,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult> {
        let request = self.build_request(prompt, options);
        let preferred = parse_engine_names(&options.preferred_engines);
        self.generate_request(&request, &preferred, progress, cancel).await
    }

    /// Generates a prebuilt request.
    pub async fn generate_request(
        &self,
        request: &GenerationRequest,
        preferred: &[EngineKind],
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult> {
        match self.manager.run_generation(request, preferred, progress, cancel).await {
            Ok(result) => Ok(result),
            Err(e @ OrchestrationError::InvalidRequest(_)) => Err(e),
            Err(OrchestrationError::Cancelled) => {
                Ok(GenerationResult::failed(FailureKind::Cancelled, "generation cancelled"))
            }
            Err(e) => {
                warn!(error = %e, "Generation could not be admitted");
                Ok(GenerationResult::failed(FailureKind::Admission, e.to_string()))
            }
        }
    }

    /// Generates several requests one after another.
    ///
    /// Returns one result per request, in order. Malformed requests and
    /// requests left over after cancellation produce failed results.
    pub async fn batch_generate(
        &self,
        requests: &[GenerationRequest],
        preferred: &[EngineKind],
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Vec<GenerationResult> {
        let total = requests.len();
        let mut results = Vec::with_capacity(total);
        for (index, request) in requests.iter().enumerate() {
            progress.report_fraction(format!("{}/{}", index + 1, total), index as f32 / total as f32);
            let result = match self.generate_request(request, preferred, progress, cancel).await {
                Ok(result) => result,
                Err(e) => GenerationResult::failed(FailureKind::Admission, e.to_string()),
            };
            results.push(result);
        }
        let succeeded = results.iter().filter(|r| r.success).count();
        info!(total, succeeded, "Batch finished");
        results
    }

    /// Kinds that can take routed work right now.
    pub async fn list_available_engines(&self) -> Vec<EngineKind> {
        self.manager.registry().list_available().await
    }

    /// Kinds with a registered constructor.
    pub fn registered_engines(&self) -> Vec<EngineKind> {
        self.manager.registry().known_kinds()
    }

    /// Capability description of `kind`, or `None` if it cannot be built.
    pub async fn get_engine_info(&self, kind: EngineKind) -> Option<EngineInfo> {
        match self.manager.registry().get_or_create(kind).await {
            Ok(engine) => Some(engine.describe()),
            Err(e) => {
                warn!(engine = %kind, error = %e, "Engine info unavailable");
                None
            }
        }
    }

    /// Connectivity test for one engine.
    pub async fn test_engine(&self, kind: EngineKind) -> bool {
        match self.manager.registry().get_or_create(kind).await {
            Ok(engine) => engine.test_connection().await,
            Err(_) => false,
        }
    }

    /// Connectivity test for every registered engine.
    pub async fn test_all_engines(&self) -> BTreeMap<EngineKind, bool> {
        let mut results = BTreeMap::new();
        for kind in self.registered_engines() {
            if self.manager.registry().get_or_create(kind).await.is_err() {
                results.insert(kind, false);
            }
        }
        results.extend(self.manager.registry().test_all().await);
        results
    }

    /// Orchestrator counters and statistics.
    pub fn statistics(&self) -> OrchestratorStatistics {
        self.manager.statistics()
    }

    /// Switches the routing strategy.
    pub fn set_routing_strategy(&self, strategy: RoutingStrategy) {
        self.manager.set_routing_strategy(strategy);
    }

    /// Switches the routing strategy by name.
    ///
    /// # Errors
    /// Returns `UnknownStrategy` if `name` is not a strategy.
    pub fn set_routing_strategy_name(&self, name: &str) -> Result<()> {
        let strategy = name.parse::<RoutingStrategy>().map_err(OrchestrationError::UnknownStrategy)?;
        self.set_routing_strategy(strategy);
        Ok(())
    }

    /// Clears rolling statistics.
    pub fn reset_statistics(&self) {
        self.manager.reset_statistics();
    }

    /// Shuts every engine down.
    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
    }
}

/// Parses engine names, dropping the ones that name no engine.
pub fn parse_engine_names(names: &[String]) -> Vec<EngineKind> {
    names
        .iter()
        .filter_map(|name| match name.parse::<EngineKind>() {
            Ok(kind) => Some(kind),
            Err(e) => {
                warn!(error = %e, "Ignoring unknown preferred engine");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_engine_names_skips_unknown() {
        let names = vec!["vheer".to_string(), "sora".to_string(), "Haiper".to_string()];
        assert_eq!(parse_engine_names(&names), vec![EngineKind::Vheer, EngineKind::Haiper]);
    }

    #[test]
    fn test_build_request_uses_defaults() {
        let config = OrchestratorConfig { output_dir: PathBuf::from("/tmp/clips"), ..Default::default() };
        let service = VideoGenerationService::new(&config, EngineRegistry::new());
        let request = service.build_request("lanterns", &GenerateOptions::default().with_duration(3.0));

        assert_eq!(request.prompt, "lanterns");
        assert_eq!(request.fps, 24);
        assert!((request.duration_secs - 3.0).abs() < f64::EPSILON);
        assert_eq!(request.output_dir, PathBuf::from("/tmp/clips"));
    }
}
