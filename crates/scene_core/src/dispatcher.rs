//! Delivery of background results onto the single UI thread.
//! Callbacks only run inside [`UiQueue::pump`] / [`UiQueue::run_until`].

use std::{
    future::Future,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use shared::error::LoadError;
use storage::{QueryTask, ResultSet};
use tracing::debug;

use crate::executor::ExecutorHandle;

pub type UiCallback<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

pub fn ui_channel<S: 'static>(executor: ExecutorHandle) -> (UiDispatcher<S>, UiQueue<S>) {
    let (callbacks_tx, callbacks_rx) = crossbeam_channel::unbounded();
    (
        UiDispatcher {
            callbacks: callbacks_tx,
            executor,
        },
        UiQueue {
            callbacks: callbacks_rx,
        },
    )
}

pub struct UiDispatcher<S> {
    callbacks: Sender<UiCallback<S>>,
    executor: ExecutorHandle,
}

impl<S> Clone for UiDispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            callbacks: self.callbacks.clone(),
            executor: self.executor.clone(),
        }
    }
}

impl<S: 'static> UiDispatcher<S> {
    pub fn executor(&self) -> &ExecutorHandle {
        &self.executor
    }

    pub fn run_on_ui_thread<F>(&self, callback: F)
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        if self.callbacks.send(Box::new(callback)).is_err() {
            debug!("ui queue dropped; discarding callback");
        }
    }

    /// Awaits `work` off the UI thread, then hands its result to `on_done` on
    /// the UI thread.
    pub fn dispatch_when_ready<T, W, F>(&self, work: W, on_done: F)
    where
        T: Send + 'static,
        W: Future<Output = Result<T, LoadError>> + Send + 'static,
        F: FnOnce(&mut S, Result<T, LoadError>) + Send + 'static,
    {
        let dispatcher = self.clone();
        let spawned = self.executor.spawn_detached(async move {
            let result = work.await;
            dispatcher.run_on_ui_thread(move |state| on_done(state, result));
        });
        if !spawned {
            debug!("executor closed; result watcher not started");
        }
    }

    /// Submits `task` and dispatches its result. A rejected submission is
    /// delivered to `on_done` as an error like any other failure.
    pub fn run_background_then_dispatch<F>(&self, task: QueryTask, on_done: F)
    where
        F: FnOnce(&mut S, Result<ResultSet, LoadError>) + Send + 'static,
    {
        match self.executor.submit(task) {
            Ok(handle) => self.dispatch_when_ready(handle, on_done),
            Err(err) => self.run_on_ui_thread(move |state| on_done(state, Err(err))),
        }
    }
}

pub struct UiQueue<S> {
    callbacks: Receiver<UiCallback<S>>,
}

impl<S> UiQueue<S> {
    pub fn pump(&self, state: &mut S) -> usize {
        let mut ran = 0;
        while let Ok(callback) = self.callbacks.try_recv() {
            callback(state);
            ran += 1;
        }
        ran
    }

    /// Runs callbacks as they arrive until `done` holds or `timeout` elapses.
    /// Returns whether `done` held.
    pub fn run_until<P>(&self, state: &mut S, timeout: Duration, mut done: P) -> bool
    where
        P: FnMut(&S) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump(state);
            if done(state) {
                return true;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }

            match self.callbacks.recv_timeout(remaining) {
                Ok(callback) => callback(state),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return done(state);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
