//! Reference engine implementations for Montage.
//!
//! - [`SimulatedEngine`] produces placeholder clips after a configurable delay.
//!   It backs the command-line demo and exercises every orchestrator path.
//! - [`RemoteJobEngine`] drives any submit/poll/fetch provider through a
//!   bounded polling state machine. Providers plug in via [`JobBackend`].
//! - [`catalog`] holds the default capability profile of every engine kind.

pub mod catalog;
mod job;
mod remote;
mod simulated;

pub use job::{JobMachine, JobState, PollSettings, Step};
pub use remote::{JobArtifact, JobBackend, JobError, JobPhase, RemoteJobEngine};
pub use simulated::{SimulatedEngine, SimulatedSettings};
