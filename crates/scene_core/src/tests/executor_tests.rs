use std::{sync::mpsc, time::Duration};

use shared::domain::DateRange;
use storage::queries;

use super::*;
use crate::test_support::{date, run_inline, seeded_database};

fn ranges() -> Vec<DateRange> {
    (1..=8)
        .map(|week| {
            let start = date(2022, 1, 1) + chrono::Duration::weeks(week - 1);
            DateRange::new(start, start + chrono::Duration::days(6)).expect("range")
        })
        .collect()
}

#[test]
fn concurrent_results_match_sequential_results() {
    let (_dir, database) = seeded_database();
    let executor = AsyncExecutor::start(ExecutorConfig {
        workers: 4,
        queue_capacity: 16,
    })
    .expect("executor");

    let sequential: Vec<_> = ranges()
        .into_iter()
        .map(|range| run_inline(queries::borough_totals(&database, range)).expect("sequential"))
        .collect();

    let handles: Vec<_> = ranges()
        .into_iter()
        .map(|range| {
            executor
                .handle()
                .submit(queries::borough_totals(&database, range))
                .expect("submit")
        })
        .collect();
    let concurrent: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.get().expect("concurrent"))
        .collect();

    assert_eq!(sequential, concurrent);
    executor.shutdown();
    assert_eq!(database.connection_stats().open_now(), 0);
}

#[test]
fn unconsumed_handle_still_releases_its_connection_once() {
    let (_dir, database) = seeded_database();
    let before = database.connection_stats();
    let executor = AsyncExecutor::start(ExecutorConfig {
        workers: 1,
        queue_capacity: 4,
    })
    .expect("executor");

    let range = DateRange::new(date(2022, 1, 1), date(2022, 1, 31)).expect("range");
    let handle = executor
        .handle()
        .submit(queries::period_deaths(&database, range))
        .expect("submit");
    drop(handle);
    executor.shutdown();

    let after = database.connection_stats();
    assert_eq!(after.opened - before.opened, 1);
    assert_eq!(after.closed - before.closed, 1);
}

#[test]
fn full_queue_rejects_with_pool_exhausted() {
    let executor = AsyncExecutor::start(ExecutorConfig {
        workers: 1,
        queue_capacity: 1,
    })
    .expect("executor");
    let handle = executor.handle();

    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    let blocker = handle
        .spawn_job(async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
            Ok(1)
        })
        .expect("blocker accepted");
    started_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("blocker running");

    let queued = handle.spawn_job(async { Ok(2) }).expect("fills the queue");
    assert_eq!(handle.pending(), 1);

    let err = handle
        .spawn_job(async { Ok(3) })
        .err()
        .expect("queue is full");
    assert_eq!(err, LoadError::PoolExhausted { capacity: 1 });
    assert!(err.is_fatal());

    release_tx.send(()).expect("release blocker");
    assert_eq!(blocker.get(), Ok(1));
    assert_eq!(queued.get(), Ok(2));
    executor.shutdown();
}

#[test]
fn panicking_job_yields_worker_lost_and_worker_survives() {
    let executor = AsyncExecutor::start(ExecutorConfig {
        workers: 1,
        queue_capacity: 4,
    })
    .expect("executor");
    let handle = executor.handle();

    let lost = handle
        .spawn_job(async {
            let missing: Option<u8> = None;
            Ok(missing.expect("deliberate panic in job"))
        })
        .expect("submit");
    assert_eq!(lost.get(), Err(LoadError::WorkerLost));

    let next = handle.spawn_job(async { Ok(7u8) }).expect("submit after panic");
    assert_eq!(next.get(), Ok(7));
    executor.shutdown();
}

#[test]
fn submit_after_shutdown_is_rejected() {
    let (_dir, database) = seeded_database();
    let executor = AsyncExecutor::start(ExecutorConfig::default()).expect("executor");
    let handle = executor.handle();
    executor.shutdown();

    let err = handle
        .submit(queries::available_dates(&database))
        .err()
        .expect("executor closed");
    assert_eq!(err, LoadError::ExecutorShutdown);
    assert!(handle.is_closed());
}

#[test]
fn try_get_is_empty_until_the_job_completes() {
    let executor = AsyncExecutor::start(ExecutorConfig::default()).expect("executor");
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    let mut pending = executor
        .handle()
        .spawn_job(async move {
            let _ = release_rx.await;
            Ok("done")
        })
        .expect("submit");

    assert!(pending.try_get().is_none());
    release_tx.send(()).expect("release");

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    let result = loop {
        if let Some(result) = pending.try_get() {
            break result;
        }
        assert!(std::time::Instant::now() < deadline, "job never finished");
        std::thread::sleep(Duration::from_millis(5));
    };
    assert_eq!(result, Ok("done"));
    executor.shutdown();
}

#[test]
fn failed_query_propagates_through_handle() {
    let (_dir, database) = seeded_database();
    let executor = AsyncExecutor::start(ExecutorConfig::default()).expect("executor");

    let task = QueryTask::new(&database, "SELECT nope FROM covid_london").expect("task");
    let err = executor
        .handle()
        .submit(task)
        .expect("submit")
        .get()
        .expect_err("bad column");
    assert!(matches!(err, LoadError::Query { .. }), "{err}");
    executor.shutdown();
    assert_eq!(database.connection_stats().open_now(), 0);
}
