//! Bounded polling state machine for remote generation jobs.
//!
//! The machine is a pure transition function: it is fed poll outcomes and
//! the elapsed wall-clock time, and answers how long to wait before the next
//! poll or that the job has reached a terminal state. It never sleeps.

use crate::remote::{JobError, JobPhase};
use std::time::Duration;

/// Polling limits for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSettings {
    /// Delay between polls while the job is healthy.
    pub poll_interval: Duration,
    /// Wall-clock budget measured from submission.
    pub deadline: Duration,
    /// Transient poll errors tolerated in a row.
    pub max_consecutive_errors: u32,
    /// Growth factor applied to the poll interval after each transient error.
    pub error_backoff_factor: f64,
    /// Upper bound for the error backoff.
    pub max_error_backoff: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            deadline: Duration::from_secs(1800),
            max_consecutive_errors: 8,
            error_backoff_factor: 1.5,
            max_error_backoff: Duration::from_secs(120),
        }
    }
}

impl PollSettings {
    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Sets the transient error budget.
    #[must_use]
    pub fn with_max_consecutive_errors(mut self, max: u32) -> Self {
        self.max_consecutive_errors = max;
        self
    }

    /// Backoff after `errors` consecutive transient failures.
    pub fn error_backoff(&self, errors: u32) -> Duration {
        let factor = self.error_backoff_factor.powi(errors as i32);
        let secs = self.poll_interval.as_secs_f64() * factor;
        Duration::from_secs_f64(secs.min(self.max_error_backoff.as_secs_f64()))
    }
}

/// Where a remote job stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Accepted by the provider, not yet started.
    Submitted,
    /// Being rendered.
    Running,
    /// Finished with an artifact ready to fetch.
    Succeeded,
    /// Finished without an artifact.
    Failed {
        /// Provider or polling error message.
        message: String,
        /// Whether the engine should flip to `Error`.
        fatal: bool,
    },
    /// The deadline passed before the job finished.
    TimedOut,
}

impl JobState {
    /// Whether no further polls are needed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. } | Self::TimedOut)
    }
}

/// What the driver should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Poll again after the given delay.
    Wait(Duration),
    /// The job reached a terminal state.
    Finished,
}

/// Submitted → Running → Succeeded | Failed | TimedOut.
#[derive(Debug, Clone)]
pub struct JobMachine {
    settings: PollSettings,
    state: JobState,
    consecutive_errors: u32,
    polls: u32,
}

impl JobMachine {
    /// Starts a machine for a freshly submitted job.
    pub fn new(settings: PollSettings) -> Self {
        Self { settings, state: JobState::Submitted, consecutive_errors: 0, polls: 0 }
    }

    /// Current state.
    pub fn state(&self) -> &JobState {
        &self.state
    }

    /// Polls observed so far.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Delay before the first poll.
    pub fn first_wait(&self) -> Duration {
        self.settings.poll_interval
    }

    /// Feeds one poll outcome observed `elapsed` after submission.
    pub fn observe(&mut self, outcome: Result<JobPhase, JobError>, elapsed: Duration) -> Step {
        if self.state.is_terminal() {
            return Step::Finished;
        }
        self.polls += 1;

        let wait = match outcome {
            Ok(JobPhase::Queued) => {
                self.consecutive_errors = 0;
                self.settings.poll_interval
            }
            Ok(JobPhase::Running { .. }) => {
                self.consecutive_errors = 0;
                self.state = JobState::Running;
                self.settings.poll_interval
            }
            Ok(JobPhase::Succeeded) => {
                self.state = JobState::Succeeded;
                return Step::Finished;
            }
            Ok(JobPhase::Failed(message)) => {
                self.state = JobState::Failed { message, fatal: false };
                return Step::Finished;
            }
            Err(JobError::Fatal(message)) => {
                self.state = JobState::Failed { message, fatal: true };
                return Step::Finished;
            }
            Err(JobError::Transient(message)) => {
                self.consecutive_errors += 1;
                if self.consecutive_errors >= self.settings.max_consecutive_errors {
                    self.state = JobState::Failed {
                        message: format!(
                            "status polling failed {} times in a row: {}",
                            self.consecutive_errors, message
                        ),
                        fatal: false,
                    };
                    return Step::Finished;
                }
                self.settings.error_backoff(self.consecutive_errors)
            }
        };

        if elapsed >= self.settings.deadline {
            self.state = JobState::TimedOut;
            return Step::Finished;
        }
        Step::Wait(wait.min(self.settings.deadline.saturating_sub(elapsed)))
    }
}
