//! Multi-engine video generation orchestration for Montage.
//!
//! The [`VideoGenerationService`] facade builds requests and delegates to the
//! [`EngineManager`], which selects an engine per the configured
//! [`RoutingStrategy`], bounds concurrency globally and per engine, retries
//! failed attempts with backoff and feeds the [`PerformanceTracker`]. Engines
//! are constructed lazily and cached by the [`EngineRegistry`].
//!
//! # Example
//!
//! ```rust,no_run
//! use montage_abstraction::{EngineConstructor, EngineKind, ProgressReporter};
//! use montage_orchestrator::{GenerateOptions, OrchestratorConfig, VideoGenerationService};
//!
//! # async fn example(constructors: Vec<(EngineKind, EngineConstructor)>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = OrchestratorConfig::default();
//! let service = VideoGenerationService::from_config(&config, constructors);
//!
//! let progress = ProgressReporter::new(|update| println!("{}", update.message));
//! let result = service.generate("a lighthouse in a storm", &GenerateOptions::default(), &progress).await?;
//! if result.success {
//!     println!("saved to {:?}", result.artifact_path);
//! }
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod admission;
pub mod config;
mod error;
mod manager;
mod registry;
mod retry;
pub mod routing;
mod service;
mod tracker;

pub use admission::{AdmissionGate, EngineLease};
pub use config::{ConfigError, EngineSettings, OrchestratorConfig};
pub use error::{OrchestrationError, Result};
pub use manager::{EngineManager, OrchestratorStatistics};
pub use registry::EngineRegistry;
pub use retry::RetryPolicy;
pub use routing::{Candidate, RoutingStrategy};
pub use service::{GenerateOptions, VideoGenerationService, parse_engine_names};
pub use tracker::{EnginePerformanceStats, PerformanceTracker};
