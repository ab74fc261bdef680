use std::time::Duration;

use super::*;
use crate::test_support::date;

fn listener_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

#[test]
fn starts_unset_and_waits_once_armed() {
    let gate = DateRangeGate::new();
    assert_eq!(gate.state(), GateState::Unset);
    let _listener = gate.arm();
    assert_eq!(gate.state(), GateState::WaitingForCommit);
    assert_eq!(gate.current(), None);
}

#[test]
fn equal_start_and_end_commit() {
    let gate = DateRangeGate::new();
    let _listener = gate.arm();

    assert_eq!(gate.select_start(Some(date(2022, 1, 1))), GateTransition::Waiting);
    let transition = gate.select_end(Some(date(2022, 1, 1)));

    let GateTransition::Committed(committed) = transition else {
        panic!("expected a commit, got {transition:?}");
    };
    assert_eq!(committed.range.start(), date(2022, 1, 1));
    assert_eq!(committed.range.end(), date(2022, 1, 1));
    assert_eq!(gate.state(), GateState::Committed);
    assert!(gate.is_current(committed.generation));
}

#[test]
fn inverted_selection_keeps_waiting() {
    let gate = DateRangeGate::new();
    let _listener = gate.arm();

    let transition = gate.select(Some(date(2022, 2, 1)), Some(date(2022, 1, 1)));
    assert_eq!(transition, GateTransition::Waiting);
    assert_eq!(gate.current(), None);
    assert_eq!(gate.state(), GateState::WaitingForCommit);
}

#[test]
fn invalid_selection_after_commit_publishes_no_range() {
    let gate = DateRangeGate::new();
    let _listener = gate.arm();
    gate.select(Some(date(2022, 1, 1)), Some(date(2022, 1, 31)));

    assert_eq!(gate.select_end(None), GateTransition::Waiting);
    assert_eq!(gate.current(), None);
    assert_eq!(gate.state(), GateState::WaitingForCommit);
}

#[test]
fn reselecting_the_committed_pair_is_unchanged() {
    let gate = DateRangeGate::new();
    let _listener = gate.arm();
    let first = gate.select(Some(date(2022, 1, 1)), Some(date(2022, 1, 31)));
    let again = gate.select(Some(date(2022, 1, 1)), Some(date(2022, 1, 31)));

    assert!(matches!(first, GateTransition::Committed(_)));
    assert_eq!(again, GateTransition::Unchanged);
    assert_eq!(gate.current().map(|committed| committed.generation), Some(1));
}

#[test]
fn generations_increase_per_commit() {
    let gate = DateRangeGate::new();
    let _listener = gate.arm();
    gate.select(Some(date(2022, 1, 1)), Some(date(2022, 1, 31)));
    let GateTransition::Committed(second) = gate.select_end(Some(date(2022, 2, 28))) else {
        panic!("expected second commit");
    };

    assert_eq!(second.generation, 2);
    assert!(!gate.is_current(1));
    assert!(gate.is_current(2));
}

#[test]
fn listener_receives_commit_made_before_it_waited() {
    let gate = DateRangeGate::new();
    let mut listener = gate.arm();
    gate.select(Some(date(2022, 1, 1)), Some(date(2022, 1, 10)));

    let committed = listener_runtime()
        .block_on(async {
            tokio::time::timeout(Duration::from_secs(5), listener.next_commit()).await
        })
        .expect("commit delivered");
    assert_eq!(committed.map(|committed| committed.generation), Some(1));
}

#[test]
fn listener_skips_superseded_commits() {
    let gate = DateRangeGate::new();
    let mut listener = gate.arm();
    gate.select(Some(date(2022, 1, 1)), Some(date(2022, 1, 10)));
    gate.select_end(Some(date(2022, 1, 20)));

    let runtime = listener_runtime();
    let latest = runtime
        .block_on(listener.next_commit())
        .expect("latest commit");
    assert_eq!(latest.generation, 2);
    assert_eq!(latest.range.end(), date(2022, 1, 20));

    let nothing_new = runtime.block_on(async {
        tokio::time::timeout(Duration::from_millis(50), listener.next_commit()).await
    });
    assert!(nothing_new.is_err(), "no further commit should be delivered");
}

#[test]
fn listener_ends_when_gate_is_dropped() {
    let gate = DateRangeGate::new();
    let mut listener = gate.arm();
    drop(gate);

    assert_eq!(listener_runtime().block_on(listener.next_commit()), None);
}

#[test]
fn clearing_the_selection_does_not_make_the_last_commit_stale() {
    let gate = DateRangeGate::new();
    let _listener = gate.arm();
    gate.select(Some(date(2022, 1, 1)), Some(date(2022, 1, 31)));
    gate.select_start(None);

    assert_eq!(gate.current(), None);
    assert!(gate.is_current(1));
    assert!(!gate.is_current(0));
}
