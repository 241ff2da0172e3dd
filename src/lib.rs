//! Deterministic Thread Rendezvous for Race Reproduction
//!
//! `konkurrensy` runs several tasks on separate OS threads and makes them meet at explicit
//! synchronization points, so that an interleaving which is rare in production (two writers
//! creating the same partition, a global mock leaking into another thread) happens on every
//! test run.
//!
//! # Features
//!
//! - **Bounded barrier**: [`Barrier::wait`] blocks until every party arrives, but never longer
//!   than a timeout. A timeout breaks the barrier and releases every other waiter at once, so a
//!   crashed task cannot hang the test suite.
//! - **Tagged results**: barrier failures are [`BarrierError::TimedOut`] or
//!   [`BarrierError::Broken`], returned as a `Result` so tasks can use `?`.
//! - **One-shot mode**: [`RaceRunner`] / [`run_one_shot`]. Each task runs once and waits
//!   wherever it likes, as many times as it likes.
//! - **Iterated mode**: [`SyncRunner`] / [`run_iterated`]. The runner waits on the barrier
//!   before each of `count` invocations, keeping all participants in lockstep.
//! - **Nothing is lost**: returned errors and panics are captured per participant and reported
//!   after every thread has been joined.
//! - **Optional tracing**: enable the `tracing` feature for structured events.
//!
//! # Quick Start
//!
//! ```
//! use konkurrensy::{Barrier, RaceRunner};
//! use std::sync::{Arc, Mutex};
//! use std::time::Duration;
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let mut runner = RaceRunner::with_timeout(Duration::from_secs(5));
//!
//! for name in ["a", "b"] {
//!     let log = Arc::clone(&log);
//!     runner.add_task(move |barrier: &Barrier| {
//!         log.lock().unwrap().push(format!("{}1", name));
//!         barrier.wait()?;
//!         log.lock().unwrap().push(format!("{}2", name));
//!         Ok::<_, konkurrensy::BarrierError>(())
//!     });
//! }
//!
//! runner.run().unwrap();
//!
//! // Both "1" events happen before either "2" event.
//! let log = log.lock().unwrap();
//! assert!(log[..2].iter().all(|e| e.ends_with('1')));
//! assert!(log[2..].iter().all(|e| e.ends_with('2')));
//! ```
//!
//! # Failure Reporting
//!
//! A run only reports once every thread has finished. If anything failed, the error carries
//! the whole [`RunReport`]:
//!
//! ```
//! use konkurrensy::{Barrier, FailureKind, RaceRunner, RunError};
//! use std::time::Duration;
//!
//! let mut runner = RaceRunner::with_timeout(Duration::from_millis(50));
//! runner
//!     .add_task(|barrier: &Barrier| barrier.wait().map(drop))
//!     .add_task(|_: &Barrier| -> Result<(), String> { Err("oops".into()) });
//!
//! let err = runner.run().unwrap_err();
//! let kinds: Vec<_> = err.failures().iter().map(|f| (f.participant, f.kind())).collect();
//! assert_eq!(kinds, [(0, FailureKind::TimedOut), (1, FailureKind::Task)]);
//! assert!(matches!(err, RunError::TasksFailed(_)));
//! ```
//!
//! # Implementation Notes
//!
//! - One thread per task, no pool. This is meant for a handful to a few dozen participants.
//! - The barrier is the only ordering guarantee. State shared between tasks needs its own
//!   synchronization.
//! - A task that fails before reaching a wait is not announced to its peers: they time out.
//!   That delay is observable, and intended.
//! - Joining has no timeout: a task spinning forever outside of a wait stalls the run.

pub mod barrier;
pub mod error;
pub mod iterated;
pub mod outcome;
pub mod runner;
pub mod task;

pub use barrier::{Arrival, Barrier};
pub use error::{BarrierError, BarrierResult, FailureCause, RunError, RunResult};
pub use iterated::{run_iterated, ErrorPolicy, SyncRunner, DEFAULT_ITERATED_TIMEOUT};
pub use outcome::{FailureKind, Outcome, ParticipantReport, RunReport, TaskFailure};
pub use runner::{run_one_shot, RaceRunner, DEFAULT_THREAD_NAME, DEFAULT_TIMEOUT};
pub use task::{iteration_fn, task_fn, BoxError, IteratedTask, OneShotTask, TaskOutput};
