//! Command implementations for the Montage CLI.

pub mod engines;
pub mod generate;
pub mod stats;
pub mod types;

pub use types::{EnginesCommand, GenerateArgs};

use montage_abstraction::EngineKind;
use montage_engines::catalog::writing_simulated_constructor;
use montage_orchestrator::{OrchestratorConfig, VideoGenerationService};

/// Builds the facade with a simulated engine behind every kind. Each clip
/// is written as a placeholder file under the output directory.
pub fn build_service(config: &OrchestratorConfig) -> VideoGenerationService {
    let constructors = EngineKind::ALL.iter().map(|&kind| (kind, writing_simulated_constructor(kind)));
    VideoGenerationService::from_config(config, constructors)
}
