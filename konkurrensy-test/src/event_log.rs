use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;

/// One recorded event.
#[derive(Debug, Clone)]
pub struct Event {
    pub label: String,
    pub thread: Option<String>,
    pub at: Instant,
}

/// Thread-tagged, totally ordered record of events from several threads.
///
/// The log's own lock orders the events; its only purpose is to let a test assert on the
/// interleaving afterwards.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `label`, tagged with the current thread's name.
    pub fn record(&self, label: impl Into<String>) {
        let event = Event {
            label: label.into(),
            thread: thread::current().name().map(str::to_string),
            at: Instant::now(),
        };
        self.events.lock().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.label.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Position of the first event with `label`.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.events.lock().iter().position(|e| e.label == label)
    }

    /// Panics unless every label in `before` was recorded, and before every label in `after`.
    pub fn assert_all_before(&self, before: &[&str], after: &[&str]) {
        let labels = self.labels();
        let find = |label: &str| {
            labels
                .iter()
                .position(|l| l == label)
                .unwrap_or_else(|| panic!("event {:?} was never recorded in {:?}", label, labels))
        };

        for b in before {
            for a in after {
                assert!(
                    find(b) < find(a),
                    "expected {:?} before {:?}, log was {:?}",
                    b,
                    a,
                    labels
                );
            }
        }
    }
}
