//! One-shot runner and the thread-per-participant execution core.
//!
//! [`RaceRunner`] starts every task on its own named thread, hands each one the shared
//! [`Barrier`], and joins all of them before reporting. Tasks choose where, and how often, they
//! wait on the barrier.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::{debug, error, info, trace};

use crate::barrier::Barrier;
use crate::error::{FailureCause, RunError, RunResult};
use crate::outcome::{ParticipantReport, RunReport};
use crate::task::{panic_message, task_fn, OneShotTask, TaskOutput};

/// Default bound on each barrier wait in one-shot mode.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default prefix for participant thread names (`konkurrensy-0`, `konkurrensy-1`, ...).
pub const DEFAULT_THREAD_NAME: &str = "konkurrensy";

/// Body of one participant thread.
pub(crate) type Participant = Box<dyn FnOnce(&Barrier) -> ParticipantReport + Send>;

/// Run `tasks` in parallel, each on its own thread, sharing one barrier bounded by `timeout`.
///
/// Blocks until every thread has finished.
///
/// # Errors
///
/// [`RunError::TasksFailed`] if any task returned an error, panicked, or failed a barrier
/// wait, or if the barrier broke at all; the report names every failed participant.
///
/// # Examples
///
/// ```
/// use konkurrensy::{run_one_shot, task_fn, Barrier};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let arrived = Arc::new(AtomicUsize::new(0));
/// let tasks = (0..4)
///     .map(|_| {
///         let arrived = Arc::clone(&arrived);
///         task_fn(move |barrier: &Barrier| {
///             arrived.fetch_add(1, Ordering::SeqCst);
///             barrier.wait()?;
///             assert_eq!(arrived.load(Ordering::SeqCst), 4);
///             Ok::<_, konkurrensy::BarrierError>(())
///         })
///     })
///     .collect::<Vec<_>>();
///
/// run_one_shot(Duration::from_secs(5), tasks).unwrap();
/// ```
pub fn run_one_shot<I>(timeout: Duration, tasks: I) -> RunResult<RunReport>
where
    I: IntoIterator<Item = OneShotTask>,
{
    let mut runner = RaceRunner::with_timeout(timeout);
    runner.tasks.extend(tasks);
    runner.run()
}

/// Builder for a one-shot run.
///
/// # Examples
///
/// ```
/// use konkurrensy::{Barrier, RaceRunner};
/// use std::time::Duration;
///
/// let mut runner = RaceRunner::with_timeout(Duration::from_secs(5));
/// runner
///     .add_task(|barrier: &Barrier| {
///         println!("a1");
///         barrier.wait().map(drop)
///     })
///     .add_task(|barrier: &Barrier| {
///         println!("b1");
///         barrier.wait().map(drop)
///     });
///
/// let report = runner.run().unwrap();
/// assert_eq!(report.participant_count(), 2);
/// ```
pub struct RaceRunner {
    tasks: Vec<OneShotTask>,
    timeout: Duration,
    thread_name: String,
}

impl Default for RaceRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl RaceRunner {
    /// A runner whose barrier waits are bounded by [`DEFAULT_TIMEOUT`].
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            tasks: Vec::new(),
            timeout,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }

    /// Prefix for participant thread names; the participant index is appended.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Add a task. Participants are numbered in the order tasks are added.
    pub fn add_task<F, R>(&mut self, task: F) -> &mut Self
    where
        F: FnOnce(&Barrier) -> R + Send + 'static,
        R: TaskOutput,
    {
        self.tasks.push(task_fn(task));
        self
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Start all tasks, wait for every one of them to finish, then report.
    ///
    /// # Errors
    ///
    /// - [`RunError::NoTasks`] if no task was added.
    /// - [`RunError::Spawn`] if a participant thread could not be started.
    /// - [`RunError::TasksFailed`] if any participant failed, or the barrier broke even though
    ///   every task swallowed its barrier error.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self), fields(tasks = self.tasks.len(), timeout = ?self.timeout))
    )]
    pub fn run(self) -> RunResult<RunReport> {
        let participants = self
            .tasks
            .into_iter()
            .enumerate()
            .map(|(index, OneShotTask(task))| -> Participant {
                Box::new(move |barrier: &Barrier| {
                    let mut report = ParticipantReport::new(index);
                    let result = task(barrier);
                    report.iterations = 1;
                    if let Err(err) = result {
                        let cause = FailureCause::from_error(err);

                        #[cfg(feature = "tracing")]
                        error!(participant = index, %cause, "task failed");

                        report.fail(None, cause);
                    }
                    report
                })
            })
            .collect();

        execute(participants, self.timeout, &self.thread_name)
    }
}

/// Spawn one thread per participant around a shared barrier, join them all, and build the report.
pub(crate) fn execute(
    participants: Vec<Participant>,
    timeout: Duration,
    thread_name: &str,
) -> RunResult<RunReport> {
    if participants.is_empty() {
        return Err(RunError::NoTasks);
    }

    let parties = participants.len();
    let barrier = Arc::new(Barrier::new(parties, timeout));

    #[cfg(feature = "tracing")]
    info!(parties, ?timeout, "starting run");

    let started = Instant::now();
    let mut handles: Vec<JoinHandle<ParticipantReport>> = Vec::with_capacity(parties);
    let mut spawn_error = None;

    for (index, participant) in participants.into_iter().enumerate() {
        let shared = Arc::clone(&barrier);
        let spawned = thread::Builder::new()
            .name(format!("{}-{}", thread_name, index))
            .spawn(move || participant(&shared));

        match spawned {
            Ok(handle) => {
                #[cfg(feature = "tracing")]
                trace!(participant = index, "spawned participant thread");

                handles.push(handle);
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                error!(participant = index, %err, "failed to spawn participant thread");

                // Peers already blocked would otherwise wait out their full timeout.
                barrier.abandon();
                spawn_error = Some(RunError::Spawn {
                    participant: index,
                    message: err.to_string(),
                });
                break;
            }
        }
    }

    let reports: Vec<ParticipantReport> = handles
        .into_iter()
        .enumerate()
        .map(|(index, handle)| {
            handle.join().unwrap_or_else(|payload| {
                let message = panic_message(&*payload);

                #[cfg(feature = "tracing")]
                error!(participant = index, panic_message = %message, "task panicked");

                let mut report = ParticipantReport::new(index);
                report.fail(None, FailureCause::Panicked(message));
                report
            })
        })
        .collect();

    if let Some(err) = spawn_error {
        return Err(err);
    }

    // A task may swallow its own barrier error; the broken barrier still fails the run.
    let report =
        RunReport::new(reports, started.elapsed()).with_broken_barrier(barrier.broken_generation());

    #[cfg(feature = "tracing")]
    {
        let failed = report.failures().count();
        if failed == 0 {
            info!(elapsed = ?report.elapsed(), "run completed");
        } else {
            debug!(failed, elapsed = ?report.elapsed(), "run failed");
        }
    }

    report.into_result()
}
