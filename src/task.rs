//! Task adapters.
//!
//! Tasks are plain closures. Their return value goes through [`TaskOutput`], so a task may
//! return `()` or any `Result<(), E>` whose error converts into [`BoxError`], which covers
//! [`BarrierError`](crate::BarrierError), `std::io::Error`, `String` and most error crates.

use std::any::Any;

use crate::barrier::Barrier;

/// Boxed error returned by a task body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Return types accepted from task closures.
pub trait TaskOutput {
    fn into_result(self) -> Result<(), BoxError>;
}

impl TaskOutput for () {
    fn into_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E> TaskOutput for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

/// A type-erased one-shot task, created with [`task_fn`].
pub struct OneShotTask(pub(crate) Box<dyn FnOnce(&Barrier) -> Result<(), BoxError> + Send>);

pub(crate) type IterationBody = Box<dyn FnMut(usize, usize) -> Result<(), BoxError> + Send>;

/// A type-erased iterated task, created with [`iteration_fn`].
pub struct IteratedTask(pub(crate) IterationBody);

/// Box a closure for [`run_one_shot`](crate::run_one_shot).
///
/// Closures of different types can then share one `Vec`.
///
/// # Examples
///
/// ```
/// use konkurrensy::{run_one_shot, task_fn, Barrier, BarrierError};
/// use std::time::Duration;
///
/// let report = run_one_shot(
///     Duration::from_secs(5),
///     vec![
///         task_fn(|barrier: &Barrier| barrier.wait().map(drop)),
///         task_fn(|barrier: &Barrier| -> Result<(), BarrierError> {
///             barrier.wait()?;
///             Ok(())
///         }),
///     ],
/// )
/// .unwrap();
///
/// assert!(report.is_success());
/// ```
pub fn task_fn<F, R>(f: F) -> OneShotTask
where
    F: FnOnce(&Barrier) -> R + Send + 'static,
    R: TaskOutput,
{
    OneShotTask(Box::new(move |barrier: &Barrier| f(barrier).into_result()))
}

/// Box a closure for [`run_iterated`](crate::run_iterated).
///
/// The closure receives `(participant, iteration)`, both zero-based.
pub fn iteration_fn<F, R>(mut f: F) -> IteratedTask
where
    F: FnMut(usize, usize) -> R + Send + 'static,
    R: TaskOutput,
{
    IteratedTask(Box::new(move |participant, iteration| {
        f(participant, iteration).into_result()
    }))
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
