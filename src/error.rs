//! Error types for barrier waits and runs.
//!
//! Barrier failures are modelled as a tagged result ([`BarrierResult`]) so a task can
//! propagate them with `?`. Run-level failures are only reported after every participant
//! thread has been joined.

use std::time::Duration;

use crate::outcome::{FailureKind, RunReport, TaskFailure};

/// Errors returned by [`Barrier::wait`](crate::Barrier::wait).
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BarrierError {
    /// This party's wait exceeded its bound. The caller that observes the timeout is the one
    /// that breaks the barrier.
    TimedOut { timeout: Duration, generation: u64 },

    /// Another party already broke the barrier, in this generation or an earlier one.
    Broken { generation: u64 },
}

impl BarrierError {
    /// The generation in which the wait failed.
    pub fn generation(&self) -> u64 {
        match self {
            BarrierError::TimedOut { generation, .. } | BarrierError::Broken { generation } => {
                *generation
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BarrierError::TimedOut { .. })
    }

    pub fn is_broken(&self) -> bool {
        matches!(self, BarrierError::Broken { .. })
    }
}

impl std::fmt::Display for BarrierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BarrierError::TimedOut {
                timeout,
                generation,
            } => write!(
                f,
                "barrier wait timed out after {:?} in generation {}; \
                 not every party arrived and the barrier is now broken",
                timeout, generation
            ),
            BarrierError::Broken { generation } => write!(
                f,
                "barrier is broken (generation {}): another party timed out or was abandoned",
                generation
            ),
        }
    }
}

impl std::error::Error for BarrierError {}

/// Result of a barrier wait.
pub type BarrierResult<T> = Result<T, BarrierError>;

/// Why a participant (or one of its iterations) failed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FailureCause {
    /// A barrier wait failed, either inside the task or in the runner's own per-iteration wait.
    Barrier(BarrierError),

    /// The task returned an error unrelated to the barrier.
    Error(String),

    /// The task panicked.
    Panicked(String),
}

impl FailureCause {
    pub fn kind(&self) -> FailureKind {
        match self {
            FailureCause::Barrier(BarrierError::TimedOut { .. }) => FailureKind::TimedOut,
            FailureCause::Barrier(BarrierError::Broken { .. }) => FailureKind::Broken,
            FailureCause::Error(_) => FailureKind::Task,
            FailureCause::Panicked(_) => FailureKind::Panicked,
        }
    }

    /// Classify an error returned by a task body.
    ///
    /// A [`BarrierError`] that reached the task's return value through `?` keeps its barrier
    /// classification; anything else is a task error.
    pub(crate) fn from_error(err: crate::task::BoxError) -> Self {
        match err.downcast::<BarrierError>() {
            Ok(barrier) => FailureCause::Barrier(*barrier),
            Err(other) => FailureCause::Error(other.to_string()),
        }
    }
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureCause::Barrier(err) => write!(f, "{}", err),
            FailureCause::Error(message) => write!(f, "task returned an error: {}", message),
            FailureCause::Panicked(message) => write!(f, "task panicked: {}", message),
        }
    }
}

impl From<BarrierError> for FailureCause {
    fn from(err: BarrierError) -> Self {
        FailureCause::Barrier(err)
    }
}

/// Errors returned by a run, after every started thread has been joined.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum RunError {
    /// A run needs at least one task.
    NoTasks,

    /// The OS refused to start a participant thread. Participants already started were
    /// released by breaking the barrier and have been joined.
    Spawn { participant: usize, message: String },

    /// At least one participant failed. The report holds every participant's outcome.
    TasksFailed(RunReport),
}

impl RunError {
    /// Failed participants, in participant order. Empty unless the run got as far as joining
    /// its threads.
    pub fn failures(&self) -> Vec<&TaskFailure> {
        match self {
            RunError::TasksFailed(report) => report.failures().collect(),
            RunError::NoTasks | RunError::Spawn { .. } => Vec::new(),
        }
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunError::TasksFailed(report) => Some(report),
            RunError::NoTasks | RunError::Spawn { .. } => None,
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::NoTasks => write!(f, "cannot run without any tasks"),
            RunError::Spawn {
                participant,
                message,
            } => write!(
                f,
                "failed to spawn thread for participant #{}: {}",
                participant, message
            ),
            RunError::TasksFailed(report) => {
                let failures: Vec<_> = report.failures().collect();
                write!(
                    f,
                    "{} of {} participants failed",
                    failures.len(),
                    report.participant_count()
                )?;
                if let Some(generation) = report.broken_generation() {
                    write!(f, "; barrier broke in generation {}", generation)?;
                }
                for failure in failures {
                    write!(f, "\n  {}", failure)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for RunError {}

/// Result type for runs.
pub type RunResult<T> = Result<T, RunError>;
