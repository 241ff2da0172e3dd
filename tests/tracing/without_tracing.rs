//! Tests that work with or without the tracing feature

use konkurrensy::{iteration_fn, run_iterated, run_one_shot, task_fn, Barrier};

use std::time::Duration;

#[test]
fn test_runs_without_subscriber() {
    // No subscriber installed: events, if compiled in, go nowhere
    let report = run_one_shot(
        Duration::from_secs(5),
        vec![
            task_fn(|barrier: &Barrier| barrier.wait().map(drop)),
            task_fn(|barrier: &Barrier| barrier.wait().map(drop)),
        ],
    )
    .unwrap();
    assert!(report.is_success());

    let report = run_iterated(
        3,
        Duration::from_secs(5),
        (0..2).map(|_| iteration_fn(|_, _| {})),
    )
    .unwrap();
    assert!(report.is_success());
}
