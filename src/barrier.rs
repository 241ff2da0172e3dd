//! Bounded, breakable rendezvous point for a fixed number of parties.
//!
//! Unlike [`std::sync::Barrier`], every wait is bounded. The first party whose bound elapses
//! gets [`BarrierError::TimedOut`] and breaks the barrier, which releases every other waiter of
//! that generation with [`BarrierError::Broken`]. A broken barrier stays broken: there is no
//! reset, a run that broke its barrier has failed.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[cfg(feature = "tracing")]
use tracing::{debug, trace, warn};

use crate::error::{BarrierError, BarrierResult};

/// A successful return from [`Barrier::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    /// Zero-based arrival order within the generation.
    pub index: usize,
    /// The generation that tripped.
    pub generation: u64,
    parties: usize,
}

impl Arrival {
    /// `true` for the last party to arrive, the one that tripped the barrier.
    pub fn is_leader(&self) -> bool {
        self.index + 1 == self.parties
    }
}

#[derive(Debug)]
struct State {
    generation: u64,
    waiting: usize,
    // Generation in which the barrier broke, if it has.
    broken: Option<u64>,
}

/// A reusable rendezvous point with a per-wait timeout.
///
/// Parties block in [`wait`](Barrier::wait) until the last of `parties` calls arrives in the
/// same generation, then all are released together and the generation advances. The barrier
/// is `Sync`; share it by reference or through an `Arc`.
///
/// # Examples
///
/// ```
/// use konkurrensy::Barrier;
/// use std::sync::Arc;
/// use std::thread;
/// use std::time::Duration;
///
/// let barrier = Arc::new(Barrier::new(2, Duration::from_secs(5)));
/// let peer = {
///     let barrier = Arc::clone(&barrier);
///     thread::spawn(move || barrier.wait().is_ok())
/// };
///
/// assert!(barrier.wait().is_ok());
/// assert!(peer.join().unwrap());
/// assert_eq!(barrier.generation(), 1);
/// ```
#[derive(Debug)]
pub struct Barrier {
    parties: usize,
    timeout: Duration,
    state: Mutex<State>,
    cvar: Condvar,
}

impl Barrier {
    /// Create a barrier for `parties` participants whose [`wait`](Barrier::wait) is bounded by
    /// `timeout`.
    ///
    /// # Panics
    ///
    /// Panics if `parties` is zero.
    pub fn new(parties: usize, timeout: Duration) -> Self {
        assert!(parties > 0, "a barrier needs at least one party");
        Self {
            parties,
            timeout,
            state: Mutex::new(State {
                generation: 0,
                waiting: 0,
                broken: None,
            }),
            cvar: Condvar::new(),
        }
    }

    /// Number of parties needed to trip the barrier.
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// The bound used by [`wait`](Barrier::wait).
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of trips and breaks so far.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Parties currently blocked in the open generation.
    pub fn waiting(&self) -> usize {
        self.state.lock().waiting
    }

    /// `true` once a timeout or abandonment broke the barrier. It stays broken.
    pub fn is_broken(&self) -> bool {
        self.state.lock().broken.is_some()
    }

    /// The generation in which the barrier broke, if it has.
    pub fn broken_generation(&self) -> Option<u64> {
        self.state.lock().broken
    }

    /// Block until all parties arrive, bounded by the barrier's configured timeout.
    pub fn wait(&self) -> BarrierResult<Arrival> {
        self.wait_timeout(self.timeout)
    }

    /// Block until all parties arrive, bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// - [`BarrierError::TimedOut`] if `timeout` elapsed first. The barrier is broken.
    /// - [`BarrierError::Broken`] if some other party broke the barrier, before or during
    ///   this wait.
    ///
    /// Each party must call this at most once per generation; a second call from the same
    /// thread counts as another party.
    pub fn wait_timeout(&self, timeout: Duration) -> BarrierResult<Arrival> {
        // Overflowing deadlines wait without bound.
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();

        if let Some(generation) = state.broken {
            #[cfg(feature = "tracing")]
            debug!(generation, "wait on broken barrier");
            return Err(BarrierError::Broken { generation });
        }

        let generation = state.generation;
        let index = state.waiting;
        state.waiting += 1;

        if state.waiting == self.parties {
            state.waiting = 0;
            state.generation += 1;
            self.cvar.notify_all();

            #[cfg(feature = "tracing")]
            trace!(generation, parties = self.parties, "barrier tripped");

            return Ok(Arrival {
                index,
                generation,
                parties: self.parties,
            });
        }

        loop {
            let timed_out = match deadline {
                Some(deadline) => self.cvar.wait_until(&mut state, deadline).timed_out(),
                None => {
                    self.cvar.wait(&mut state);
                    false
                }
            };

            if state.broken == Some(generation) {
                #[cfg(feature = "tracing")]
                debug!(generation, "released by broken barrier");
                return Err(BarrierError::Broken { generation });
            }

            if state.generation != generation {
                return Ok(Arrival {
                    index,
                    generation,
                    parties: self.parties,
                });
            }

            if timed_out {
                #[cfg(feature = "tracing")]
                warn!(
                    generation,
                    ?timeout,
                    waiting = state.waiting,
                    parties = self.parties,
                    "barrier wait timed out, breaking barrier"
                );

                Self::break_locked(&mut state);
                self.cvar.notify_all();
                return Err(BarrierError::TimedOut {
                    timeout,
                    generation,
                });
            }
        }
    }

    /// Break the barrier without waiting, releasing every current waiter with `Broken`.
    ///
    /// Used by the runner when it cannot start every participant.
    pub(crate) fn abandon(&self) {
        let mut state = self.state.lock();
        if state.broken.is_none() {
            Self::break_locked(&mut state);
            self.cvar.notify_all();
        }
    }

    fn break_locked(state: &mut State) {
        state.broken = Some(state.generation);
        state.generation += 1;
        state.waiting = 0;
    }
}
