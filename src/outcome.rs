//! Per-participant outcomes and the aggregate run report.

use std::time::Duration;

use crate::error::{FailureCause, RunError, RunResult};

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The participant's own barrier wait timed out.
    TimedOut,
    /// The participant found the barrier broken by someone else.
    Broken,
    /// The task returned an error.
    Task,
    /// The task panicked.
    Panicked,
}

/// A failure attributed to one participant, and to one iteration in iterated mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub participant: usize,
    pub iteration: Option<usize>,
    pub cause: FailureCause,
}

impl TaskFailure {
    pub fn new(participant: usize, iteration: Option<usize>, cause: FailureCause) -> Self {
        Self {
            participant,
            iteration,
            cause,
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.cause.kind()
    }
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.iteration {
            Some(iteration) => write!(
                f,
                "participant #{} (iteration {}): {}",
                self.participant, iteration, self.cause
            ),
            None => write!(f, "participant #{}: {}", self.participant, self.cause),
        }
    }
}

/// How one participant's thread ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed(TaskFailure),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        match self {
            Outcome::Completed => None,
            Outcome::Failed(failure) => Some(failure),
        }
    }
}

/// Everything the runner learned about one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantReport {
    pub participant: usize,
    pub outcome: Outcome,
    /// Task invocations that ran to completion, successfully or not.
    pub iterations: usize,
    /// Errors accepted as expected conflicts (iterated mode).
    pub conflicts: usize,
    /// Failures recorded and tolerated under [`ErrorPolicy::Record`](crate::ErrorPolicy::Record).
    pub recorded: Vec<TaskFailure>,
}

impl ParticipantReport {
    pub(crate) fn new(participant: usize) -> Self {
        Self {
            participant,
            outcome: Outcome::Completed,
            iterations: 0,
            conflicts: 0,
            recorded: Vec::new(),
        }
    }

    pub(crate) fn fail(&mut self, iteration: Option<usize>, cause: FailureCause) {
        self.outcome = Outcome::Failed(TaskFailure::new(self.participant, iteration, cause));
    }
}

/// The aggregate result of a run, available once every participant has been joined.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    participants: Vec<ParticipantReport>,
    elapsed: Duration,
    broken: Option<u64>,
}

impl RunReport {
    pub(crate) fn new(participants: Vec<ParticipantReport>, elapsed: Duration) -> Self {
        Self {
            participants,
            elapsed,
            broken: None,
        }
    }

    pub(crate) fn with_broken_barrier(mut self, generation: Option<u64>) -> Self {
        self.broken = generation;
        self
    }

    /// `true` if no participant failed and the barrier never broke. Recorded iteration
    /// failures do not count.
    pub fn is_success(&self) -> bool {
        self.broken.is_none() && self.participants.iter().all(|p| p.outcome.is_completed())
    }

    /// The generation in which the run's barrier broke, if it did.
    ///
    /// Set even when every task swallowed its barrier error, in which case
    /// [`failures`](RunReport::failures) can be empty while the run still failed.
    pub fn broken_generation(&self) -> Option<u64> {
        self.broken
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn participants(&self) -> &[ParticipantReport] {
        &self.participants
    }

    pub fn participant(&self, index: usize) -> Option<&ParticipantReport> {
        self.participants.get(index)
    }

    pub fn outcome(&self, index: usize) -> Option<&Outcome> {
        self.participant(index).map(|p| &p.outcome)
    }

    /// Failed participants in participant order.
    pub fn failures(&self) -> impl Iterator<Item = &TaskFailure> {
        self.participants.iter().filter_map(|p| p.outcome.failure())
    }

    /// Tolerated iteration failures of all participants.
    pub fn recorded(&self) -> impl Iterator<Item = &TaskFailure> {
        self.participants.iter().flat_map(|p| p.recorded.iter())
    }

    pub fn conflicts(&self) -> usize {
        self.participants.iter().map(|p| p.conflicts).sum()
    }

    /// Wall-clock time from the first spawn to the last join.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub(crate) fn into_result(self) -> RunResult<RunReport> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(RunError::TasksFailed(self))
        }
    }
}
