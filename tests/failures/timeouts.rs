//! Timeout bounds and broken-barrier release

use crate::common::{init_tracing, EPSILON, PATIENT};
use konkurrensy::{Barrier, BarrierError, FailureCause, FailureKind, RaceRunner, RunError};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use test_case::test_case;

#[test_case(2 ; "one peer")]
#[test_case(4 ; "three peers")]
fn test_missing_party_times_out_peers(parties: usize) {
    init_tracing();
    let timeout = Duration::from_millis(200);
    let released = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let mut runner = RaceRunner::with_timeout(timeout);
    let started = Instant::now();

    // Participant 0 fails instead of waiting
    runner.add_task(|_: &Barrier| -> Result<(), String> { Err("never arrives".into()) });
    for _ in 1..parties {
        let released = Arc::clone(&released);
        runner.add_task(move |barrier: &Barrier| {
            let result = barrier.wait();
            released.lock().push(started.elapsed());
            result.map(drop)
        });
    }

    let err = runner.run().unwrap_err();

    // Every peer was released no earlier than the timeout, and not much later
    let released = released.lock();
    assert_eq!(released.len(), parties - 1);
    for elapsed in released.iter() {
        assert!(*elapsed >= timeout, "released early after {:?}", elapsed);
        assert!(*elapsed <= timeout + EPSILON, "released late after {:?}", elapsed);
    }

    let failures = err.failures();
    assert_eq!(failures.len(), parties);
    assert_eq!(failures[0].kind(), FailureKind::Task);

    // Exactly one peer observed the timeout itself, the rest found the barrier broken
    let peer_kinds: Vec<_> = failures[1..].iter().map(|f| f.kind()).collect();
    assert_eq!(
        peer_kinds
            .iter()
            .filter(|k| **k == FailureKind::TimedOut)
            .count(),
        1
    );
    assert!(peer_kinds
        .iter()
        .all(|k| matches!(k, FailureKind::TimedOut | FailureKind::Broken)));
}

#[test]
fn test_timeout_releases_blocked_peer_promptly() {
    init_tracing();
    let barrier_timeout = Duration::from_secs(30);
    let short = Duration::from_millis(100);
    let blocked = Arc::new(AtomicUsize::new(0));
    let mut runner = RaceRunner::with_timeout(barrier_timeout);

    {
        let blocked = Arc::clone(&blocked);
        runner.add_task(move |barrier: &Barrier| {
            blocked.fetch_add(1, Ordering::SeqCst);
            let start = Instant::now();
            let result = barrier.wait();
            // Released by the break, long before its own 30s bound
            assert!(start.elapsed() < short + EPSILON);
            result.map(drop)
        });
    }
    {
        let blocked = Arc::clone(&blocked);
        runner.add_task(move |barrier: &Barrier| {
            while blocked.load(Ordering::SeqCst) == 0 || barrier.waiting() == 0 {
                thread::yield_now();
            }
            barrier.wait_timeout(short).map(drop)
        });
    }
    // Third party never waits, so the barrier cannot trip
    runner.add_task(|_: &Barrier| {});

    let start = Instant::now();
    let err = runner.run().unwrap_err();
    assert!(start.elapsed() < barrier_timeout);

    let kinds: Vec<_> = err.failures().iter().map(|f| (f.participant, f.kind())).collect();
    assert_eq!(
        kinds,
        vec![(0, FailureKind::Broken), (1, FailureKind::TimedOut)]
    );
}

#[test]
fn test_broken_barrier_fails_later_waits_immediately() {
    let mut runner = RaceRunner::with_timeout(Duration::from_millis(50));
    let second_wait = Arc::new(parking_lot::Mutex::new(None));

    {
        let second_wait = Arc::clone(&second_wait);
        runner.add_task(move |barrier: &Barrier| {
            let first = barrier.wait();
            let start = Instant::now();
            let second = barrier.wait_timeout(PATIENT);
            *second_wait.lock() = Some((first, second, start.elapsed()));
        });
    }
    runner.add_task(|_: &Barrier| {});

    // Task 0 swallowed its barrier errors, but the broken barrier still fails the run
    match runner.run() {
        Err(RunError::TasksFailed(report)) => {
            assert_eq!(report.failures().count(), 0);
            assert_eq!(report.broken_generation(), Some(0));
            assert!(!report.is_success());
        }
        other => panic!("expected TasksFailed, got {:?}", other),
    }

    let (first, second, elapsed) = second_wait.lock().take().unwrap();
    assert!(first.unwrap_err().is_timeout());
    assert_eq!(second, Err(BarrierError::Broken { generation: 0 }));
    assert!(elapsed < EPSILON);
}

#[test]
fn test_one_thread_blows_up_another_times_out() {
    init_tracing();
    let mut runner = RaceRunner::with_timeout(Duration::from_millis(200));
    runner
        .add_task(|barrier: &Barrier| {
            barrier.wait()?;
            barrier.wait()?;
            Ok::<_, BarrierError>(())
        })
        .add_task::<_, ()>(|barrier: &Barrier| {
            barrier.wait().unwrap();
            panic!("Oops");
        });

    let err = runner.run().unwrap_err();

    let kinds: Vec<_> = err.failures().iter().map(|f| (f.participant, f.kind())).collect();
    assert_eq!(
        kinds,
        vec![(0, FailureKind::TimedOut), (1, FailureKind::Panicked)]
    );
    // The first rendezvous still happened
    let report = err.report().unwrap();
    let first = report.failures().next().unwrap();
    match &first.cause {
        FailureCause::Barrier(e) => assert_eq!(e.generation(), 1),
        other => panic!("unexpected cause {:?}", other),
    }
    assert_eq!(report.broken_generation(), Some(1));
}
