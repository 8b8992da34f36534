//! Engine abstraction layer for Montage.
//!
//! This crate defines the contract every video generation backend implements
//! and the value types that flow between the orchestrator and its engines.
//!
//! # Example
//!
//! ```rust,no_run
//! use montage_abstraction::{GenerationRequest, ProgressReporter, VideoEngine};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(engine: &dyn VideoEngine) -> Result<(), Box<dyn std::error::Error>> {
//! if engine.initialize().await {
//!     let request = GenerationRequest::new("a paper boat drifting down a gutter");
//!     let progress = ProgressReporter::new(|update| println!("{}", update.message));
//!     let result = engine.generate(&request, &progress, &CancellationToken::new()).await?;
//!     println!("success: {}", result.success);
//! }
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod info;
mod kind;
mod progress;
mod request;
mod result;
mod state;

pub use engine::{EngineConstructor, VideoEngine};
pub use error::{EngineError, Result};
pub use info::EngineInfo;
pub use kind::{EngineKind, ParseEngineKindError};
pub use progress::{ProgressReporter, ProgressUpdate};
pub use request::GenerationRequest;
pub use result::{FailureKind, GenerationResult};
pub use state::{EngineState, EngineStatistics, EngineStatus};
