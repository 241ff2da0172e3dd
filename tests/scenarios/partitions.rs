//! Many threads racing to create the same partition

use crate::common::{init_tracing, PATIENT};
use konkurrensy::{BoxError, ErrorPolicy, SyncRunner};
use konkurrensy_test::{AlreadyExists, IdempotentStore};

fn create_partition_runner(store: &IdempotentStore, threads: usize) -> SyncRunner {
    let mut runner = SyncRunner::with_timeout(PATIENT)
        .thread_name("partition")
        .expect_conflict(|err| err.is::<AlreadyExists>());

    for _ in 0..threads {
        let store = store.clone();
        runner.add_task(move |participant, iteration| {
            store.create(format!("partitions_sample_{}", iteration), participant)
        });
    }
    runner
}

#[test]
fn test_fifty_threads_one_creator() {
    init_tracing();
    let store = IdempotentStore::new();

    let report = create_partition_runner(&store, 50).run(1).unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.attempts(), 50);
    assert!(store.owner("partitions_sample_0").is_some());
    // Everyone else saw "already exists" and carried on
    assert_eq!(report.conflicts(), 49);
    assert_eq!(report.recorded().count(), 0);
    assert!(report.participants().iter().all(|p| p.iterations == 1));
}

#[test]
fn test_one_creator_per_key_per_iteration() {
    let store = IdempotentStore::new();

    let report = create_partition_runner(&store, 8).run(10).unwrap();

    assert_eq!(store.len(), 10);
    assert_eq!(store.attempts(), 80);
    for iteration in 0..10 {
        assert!(store
            .owner(&format!("partitions_sample_{}", iteration))
            .is_some());
    }
    assert_eq!(report.conflicts(), 70);
}

#[test]
fn test_conflicts_without_predicate_are_recorded() {
    let store = IdempotentStore::new();
    let mut runner = SyncRunner::with_timeout(PATIENT);
    for _ in 0..4 {
        let store = store.clone();
        runner.add_task(move |participant, _| store.create("partitions_sample_0", participant));
    }

    let report = runner.run(3).unwrap();

    // 1 success out of 12 attempts; the 11 "already exists" are logged, not fatal
    assert_eq!(store.attempts(), 12);
    assert_eq!(report.recorded().count(), 11);
    assert_eq!(report.conflicts(), 0);
}

#[test]
fn test_unexpected_errors_are_told_apart_from_conflicts() {
    init_tracing();
    let store = IdempotentStore::new();
    let mut runner = SyncRunner::with_timeout(PATIENT)
        .error_policy(ErrorPolicy::Record)
        .expect_conflict(|err| err.is::<AlreadyExists>());

    for _ in 0..5 {
        let store = store.clone();
        runner.add_task(move |participant, iteration| -> Result<(), BoxError> {
            if participant == 4 && iteration == 1 {
                return Err("connection reset by peer".into());
            }
            store.create(format!("partitions_sample_{}", iteration), participant)?;
            Ok(())
        });
    }

    let report = runner.run(3).unwrap();

    // Iteration 1 has one fewer attempt
    assert_eq!(store.attempts(), 14);
    assert_eq!(report.conflicts(), 14 - 3);
    let recorded: Vec<_> = report.recorded().collect();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].participant, 4);
    assert_eq!(recorded[0].iteration, Some(1));
}
