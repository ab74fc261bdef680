//! Date-range gate: holds date-dependent scene construction until a valid,
//! ordered start/end pair has been selected.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use serde::Serialize;
use shared::domain::DateRange;
use tokio::sync::watch;
use tracing::{debug, info};

/// Generations increase by one per commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommittedRange {
    pub range: DateRange,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Unset,
    WaitingForCommit,
    Committed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTransition {
    Committed(CommittedRange),
    Unchanged,
    Waiting,
}

#[derive(Debug, Default)]
struct Selection {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    armed: bool,
    generation: u64,
}

pub struct DateRangeGate {
    selection: Mutex<Selection>,
    published: watch::Sender<Option<CommittedRange>>,
}

impl Default for DateRangeGate {
    fn default() -> Self {
        Self::new()
    }
}

impl DateRangeGate {
    pub fn new() -> Self {
        let (published, _) = watch::channel(None);
        Self {
            selection: Mutex::new(Selection::default()),
            published,
        }
    }

    /// Starts waiting for commits. A range committed before arming is still
    /// delivered by the returned listener.
    pub fn arm(&self) -> GateListener {
        self.lock().armed = true;
        GateListener {
            published: self.published.subscribe(),
            delivered: 0,
        }
    }

    pub fn select_start(&self, start: Option<NaiveDate>) -> GateTransition {
        self.update(|selection| selection.start = start)
    }

    pub fn select_end(&self, end: Option<NaiveDate>) -> GateTransition {
        self.update(|selection| selection.end = end)
    }

    pub fn select(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> GateTransition {
        self.update(|selection| {
            selection.start = start;
            selection.end = end;
        })
    }

    pub fn current(&self) -> Option<CommittedRange> {
        *self.published.borrow()
    }

    pub fn state(&self) -> GateState {
        if self.current().is_some() {
            GateState::Committed
        } else if self.lock().armed {
            GateState::WaitingForCommit
        } else {
            GateState::Unset
        }
    }

    /// Whether `generation` is the latest commit. Only a newer commit makes
    /// it stale; clearing the selection does not.
    pub fn is_current(&self, generation: u64) -> bool {
        generation != 0 && self.lock().generation == generation
    }

    fn update(&self, apply: impl FnOnce(&mut Selection)) -> GateTransition {
        let mut selection = self.lock();
        apply(&mut selection);

        let current = self.current();
        let Some(range) = DateRange::from_selection(selection.start, selection.end) else {
            if current.is_some() {
                self.published.send_replace(None);
            }
            debug!(
                start = ?selection.start,
                end = ?selection.end,
                "date selection incomplete or inverted; waiting"
            );
            return GateTransition::Waiting;
        };

        if current.is_some_and(|committed| committed.range == range) {
            return GateTransition::Unchanged;
        }

        selection.generation += 1;
        let committed = CommittedRange {
            range,
            generation: selection.generation,
        };
        self.published.send_replace(Some(committed));
        info!(%range, generation = committed.generation, "date range committed");
        GateTransition::Committed(committed)
    }

    fn lock(&self) -> MutexGuard<'_, Selection> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct GateListener {
    published: watch::Receiver<Option<CommittedRange>>,
    delivered: u64,
}

impl GateListener {
    /// Superseded commits are skipped. `None` once the gate is gone.
    pub async fn next_commit(&mut self) -> Option<CommittedRange> {
        let delivered = self.delivered;
        let committed = {
            let latest = self
                .published
                .wait_for(|value| value.is_some_and(|committed| committed.generation > delivered))
                .await
                .ok()?;
            (*latest)?
        };
        self.delivered = committed.generation;
        Some(committed)
    }
}

#[cfg(test)]
#[path = "tests/gate_tests.rs"]
mod tests;
