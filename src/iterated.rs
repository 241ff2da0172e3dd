//! Iterated runner: the same rendezvous point, `count` times over.
//!
//! Every participant thread loops `count` times. Each iteration first waits on the shared
//! barrier, then invokes the task with `(participant, iteration)`, so all participants start
//! iteration `i` together. This is how a test forces many repeated conflicting attempts, e.g.
//! several threads creating the same database partition at once.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::{error, info, warn};

use crate::barrier::Barrier;
use crate::error::{FailureCause, RunResult};
use crate::outcome::{ParticipantReport, RunReport, TaskFailure};
use crate::runner::{execute, Participant, DEFAULT_THREAD_NAME};
use crate::task::{iteration_fn, panic_message, IteratedTask, IterationBody, TaskOutput};

/// Default bound on each barrier wait in iterated mode.
pub const DEFAULT_ITERATED_TIMEOUT: Duration = Duration::from_secs(1);

/// What a failed iteration does to its participant.
///
/// Barrier failures in the runner's own per-iteration wait always end the participant's loop
/// and fail the run; the policy only governs errors and panics from the task body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Log the failure, record it in the participant's report and keep iterating.
    /// The run still succeeds.
    #[default]
    Record,
    /// Stop this participant at its first failed iteration and fail the run.
    /// Peers that are still iterating will time out at their next wait.
    Propagate,
}

type ConflictFn = dyn Fn(&(dyn std::error::Error + Send + Sync + 'static)) -> bool + Send + Sync;

/// Run each task `count` times in lockstep, with barrier waits bounded by `timeout`.
///
/// Uses [`ErrorPolicy::Record`]: task errors are logged and recorded, never fatal.
///
/// # Examples
///
/// ```
/// use konkurrensy::{iteration_fn, run_iterated};
/// use std::time::Duration;
///
/// let tasks = (0..3).map(|_| iteration_fn(|participant, iteration| {
///     println!("participant {} iteration {}", participant, iteration);
/// }));
///
/// let report = run_iterated(5, Duration::from_secs(5), tasks).unwrap();
/// assert!(report.participants().iter().all(|p| p.iterations == 5));
/// ```
pub fn run_iterated<I>(count: usize, timeout: Duration, tasks: I) -> RunResult<RunReport>
where
    I: IntoIterator<Item = IteratedTask>,
{
    let mut runner = SyncRunner::with_timeout(timeout);
    runner.tasks.extend(tasks);
    runner.run(count)
}

/// Builder for an iterated run.
///
/// # Examples
///
/// ```
/// use konkurrensy::{ErrorPolicy, SyncRunner};
/// use std::time::Duration;
///
/// let mut runner = SyncRunner::with_timeout(Duration::from_secs(5))
///     .error_policy(ErrorPolicy::Record)
///     .expect_conflict(|err| err.to_string().contains("already exists"));
///
/// for _ in 0..2 {
///     runner.add_task(|participant, _iteration| -> Result<(), String> {
///         if participant == 0 {
///             Ok(())
///         } else {
///             Err("partition already exists".to_string())
///         }
///     });
/// }
///
/// let report = runner.run(3).unwrap();
/// assert_eq!(report.conflicts(), 3);
/// ```
pub struct SyncRunner {
    tasks: Vec<IteratedTask>,
    timeout: Duration,
    thread_name: String,
    policy: ErrorPolicy,
    expected: Option<Arc<ConflictFn>>,
}

impl Default for SyncRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncRunner {
    /// A runner whose barrier waits are bounded by [`DEFAULT_ITERATED_TIMEOUT`].
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_ITERATED_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            tasks: Vec::new(),
            timeout,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            policy: ErrorPolicy::default(),
            expected: None,
        }
    }

    /// Prefix for participant thread names; the participant index is appended.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Treat task errors matching `predicate` as expected conflicts.
    ///
    /// Expected conflicts are logged at info level and counted in
    /// [`ParticipantReport::conflicts`]; they are never failures, whatever the policy. Panics
    /// are never conflicts.
    pub fn expect_conflict<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&(dyn std::error::Error + Send + Sync + 'static)) -> bool + Send + Sync + 'static,
    {
        self.expected = Some(Arc::new(predicate));
        self
    }

    /// Add a task. It receives `(participant, iteration)`, both zero-based.
    pub fn add_task<F, R>(&mut self, task: F) -> &mut Self
    where
        F: FnMut(usize, usize) -> R + Send + 'static,
        R: TaskOutput,
    {
        self.tasks.push(iteration_fn(task));
        self
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Run every task `count` times, waiting on the barrier before each invocation.
    ///
    /// # Errors
    ///
    /// - [`RunError::NoTasks`](crate::RunError::NoTasks) if no task was added.
    /// - [`RunError::Spawn`](crate::RunError::Spawn) if a participant thread could not be
    ///   started.
    /// - [`RunError::TasksFailed`](crate::RunError::TasksFailed) if a barrier wait failed, or
    ///   a task failed under [`ErrorPolicy::Propagate`].
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            skip(self),
            fields(tasks = self.tasks.len(), timeout = ?self.timeout, policy = ?self.policy)
        )
    )]
    pub fn run(self, count: usize) -> RunResult<RunReport> {
        let policy = self.policy;
        let participants = self
            .tasks
            .into_iter()
            .enumerate()
            .map(|(index, IteratedTask(task))| -> Participant {
                let expected = self.expected.clone();
                Box::new(move |barrier: &Barrier| {
                    iterate(index, count, barrier, task, policy, expected.as_deref())
                })
            })
            .collect();

        execute(participants, self.timeout, &self.thread_name)
    }
}

fn iterate(
    index: usize,
    count: usize,
    barrier: &Barrier,
    mut task: IterationBody,
    policy: ErrorPolicy,
    expected: Option<&ConflictFn>,
) -> ParticipantReport {
    let mut report = ParticipantReport::new(index);

    for iteration in 0..count {
        if let Err(err) = barrier.wait() {
            #[cfg(feature = "tracing")]
            warn!(participant = index, iteration, %err, "barrier wait failed, stopping");

            report.fail(Some(iteration), FailureCause::Barrier(err));
            return report;
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| task(index, iteration)));
        report.iterations += 1;

        let cause = match result {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => {
                if expected.is_some_and(|is_expected| is_expected(&*err)) {
                    #[cfg(feature = "tracing")]
                    info!(participant = index, iteration, %err, "expected conflict");

                    report.conflicts += 1;
                    continue;
                }
                FailureCause::from_error(err)
            }
            Err(payload) => FailureCause::Panicked(panic_message(&*payload)),
        };

        #[cfg(feature = "tracing")]
        error!(participant = index, iteration, %cause, ?policy, "iteration failed");

        match policy {
            ErrorPolicy::Record => {
                report
                    .recorded
                    .push(TaskFailure::new(index, Some(iteration), cause));
            }
            ErrorPolicy::Propagate => {
                report.fail(Some(iteration), cause);
                return report;
            }
        }
    }

    report
}
