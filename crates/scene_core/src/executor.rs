//! Bounded worker pool for database queries.

use std::{
    future::Future,
    io,
    panic::AssertUnwindSafe,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    task::{Context, Poll},
    time::Duration,
};

use futures::{future::BoxFuture, FutureExt};
use shared::error::LoadError;
use storage::{QueryTask, ResultSet};
use tokio::{
    runtime::{Handle, Runtime},
    sync::{
        mpsc::{self, error::TrySendError},
        oneshot, watch, Mutex,
    },
    task::JoinHandle,
};
use tracing::{debug, error, warn};

type Job = BoxFuture<'static, ()>;

const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 64,
        }
    }
}

/// Owns the worker runtime. Must be shut down (or dropped) outside any
/// tokio runtime.
pub struct AsyncExecutor {
    runtime: Option<Runtime>,
    handle: ExecutorHandle,
    stop_tx: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl AsyncExecutor {
    pub fn start(config: ExecutorConfig) -> io::Result<Self> {
        let workers = config.workers.max(1);
        let capacity = config.queue_capacity.max(1);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name("query-worker")
            .enable_all()
            .build()?;

        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>(capacity);
        let jobs_rx = Arc::new(Mutex::new(jobs_rx));
        let (stop_tx, stop_rx) = watch::channel(false);

        let worker_handles = (0..workers)
            .map(|id| {
                runtime.spawn(worker_loop(id, Arc::clone(&jobs_rx), stop_rx.clone()))
            })
            .collect();

        debug!(workers, capacity, "query executor started");

        Ok(Self {
            handle: ExecutorHandle {
                jobs: jobs_tx,
                runtime: runtime.handle().clone(),
                closed: Arc::new(AtomicBool::new(false)),
                capacity,
            },
            runtime: Some(runtime),
            stop_tx,
            workers: worker_handles,
        })
    }

    pub fn handle(&self) -> ExecutorHandle {
        self.handle.clone()
    }

    /// Stops accepting work, lets the workers drain what is already queued,
    /// then tears the runtime down. Watcher tasks still waiting on results are
    /// dropped with it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };

        self.handle.closed.store(true, Ordering::SeqCst);
        self.stop_tx.send_replace(true);

        let workers = std::mem::take(&mut self.workers);
        runtime.block_on(async move {
            for worker in workers {
                if let Err(err) = worker.await {
                    warn!("query worker ended abnormally: {err}");
                }
            }
        });
        runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
        debug!("query executor stopped");
    }
}

impl Drop for AsyncExecutor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn worker_loop(
    id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        let next = {
            let mut queue = jobs.lock().await;
            if *stop.borrow() {
                queue.try_recv().ok()
            } else {
                tokio::select! {
                    job = queue.recv() => job,
                    _ = stop.changed() => queue.try_recv().ok(),
                }
            }
        };

        let Some(job) = next else {
            break;
        };

        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
            warn!(worker = id, "query job panicked; its result is lost");
        }
    }
    debug!(worker = id, "query worker exiting");
}

#[derive(Clone)]
pub struct ExecutorHandle {
    jobs: mpsc::Sender<Job>,
    runtime: Handle,
    closed: Arc<AtomicBool>,
    capacity: usize,
}

impl ExecutorHandle {
    pub fn submit(&self, task: QueryTask) -> Result<AsyncHandle<ResultSet>, LoadError> {
        self.spawn_job(task.run())
    }

    /// Queues an arbitrary job. Fails immediately with
    /// [`LoadError::PoolExhausted`] when the queue is full.
    pub fn spawn_job<T, F>(&self, job: F) -> Result<AsyncHandle<T>, LoadError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, LoadError>> + Send + 'static,
    {
        if self.is_closed() {
            return Err(LoadError::ExecutorShutdown);
        }

        let (result_tx, result_rx) = oneshot::channel();
        let wrapped: Job = Box::pin(async move {
            let result = job.await;
            if result_tx.send(result).is_err() {
                debug!("query result discarded; handle was dropped");
            }
        });

        match self.jobs.try_send(wrapped) {
            Ok(()) => {
                debug!(pending = self.pending(), "queued query job");
                Ok(AsyncHandle { result: result_rx })
            }
            Err(TrySendError::Full(_)) => {
                error!(capacity = self.capacity, "query queue full");
                Err(LoadError::PoolExhausted {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Closed(_)) => Err(LoadError::ExecutorShutdown),
        }
    }

    /// Runs `future` on the executor runtime outside the bounded queue. Used
    /// for short waits (result watchers, the gate listener) that must never
    /// occupy a worker slot.
    pub(crate) fn spawn_detached<F>(&self, future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_closed() {
            debug!("executor closed; detached task dropped");
            return false;
        }
        self.runtime.spawn(future);
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn pending(&self) -> usize {
        self.capacity.saturating_sub(self.jobs.capacity())
    }
}

#[must_use = "dropping the handle discards the query result"]
pub struct AsyncHandle<T> {
    result: oneshot::Receiver<Result<T, LoadError>>,
}

impl<T> AsyncHandle<T> {
    /// Blocks the calling thread until the job finishes. Must not be called
    /// from async code.
    pub fn get(self) -> Result<T, LoadError> {
        self.result
            .blocking_recv()
            .unwrap_or(Err(LoadError::WorkerLost))
    }

    pub fn try_get(&mut self) -> Option<Result<T, LoadError>> {
        match self.result.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(LoadError::WorkerLost)),
        }
    }
}

impl<T> Future for AsyncHandle<T> {
    type Output = Result<T, LoadError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.result)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(LoadError::WorkerLost)))
    }
}

#[cfg(test)]
#[path = "tests/executor_tests.rs"]
mod tests;
