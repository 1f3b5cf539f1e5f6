//! Per-owner work queues.
//!
//! Each owner gets one queue and one worker task, so at most one mutation per
//! owner is in flight and requests run in the order they were queued. The
//! handlers are blocking, so the worker runs each on the blocking pool.
//!
//! A worker that sees no work for the configured idle timeout closes its
//! queue, drains what is already buffered and removes itself. The next
//! request for that owner starts a new worker, which first waits for the old
//! one to finish.

use crate::error::{ServiceError, ServiceResult};
use crate::handlers::{ActionHandlers, Request};
use givetrack_store::OwnerId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Work item on an owner's queue.
enum Job {
    /// Run a request.
    Run(Request),
    /// Signal once every earlier job has finished.
    Flush(oneshot::Sender<()>),
}

/// Counters shared by all workers.
#[derive(Debug, Default)]
struct Counters {
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Snapshot of dispatcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Requests that finished successfully.
    pub completed: u64,
    /// Requests that returned an error or panicked.
    pub failed: u64,
    /// Owners with a live worker.
    pub workers: usize,
}

type Workers = Arc<Mutex<HashMap<OwnerId, Worker>>>;

struct Worker {
    sender: mpsc::Sender<Job>,
    handle: JoinHandle<()>,
}

/// Routes requests to one serial worker per owner.
///
/// Dispatch is fire-and-forget: failures are logged and counted, never
/// returned to the caller. Callers observe completion by re-reading the
/// local store, or by awaiting [`Dispatcher::flush`].
///
/// Must be used from within a tokio runtime.
pub struct Dispatcher {
    handlers: Arc<ActionHandlers>,
    capacity: usize,
    idle_timeout: Duration,
    workers: Workers,
    counters: Arc<Counters>,
}

impl Dispatcher {
    /// Creates a dispatcher over shared handlers.
    pub fn new(handlers: Arc<ActionHandlers>) -> Self {
        let capacity = handlers.config().queue_capacity.max(1);
        let idle_timeout = handlers.config().worker_idle_timeout;
        Self {
            handlers,
            capacity,
            idle_timeout,
            workers: Arc::new(Mutex::new(HashMap::new())),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Gets the handlers.
    pub fn handlers(&self) -> &ActionHandlers {
        &self.handlers
    }

    /// Queues a request on its owner's worker, waiting if the queue is full.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::WorkerClosed` if the worker has stopped.
    pub async fn dispatch(&self, request: Request) -> ServiceResult<()> {
        debug!(request = %request, "queueing request");
        let owner = request.owner.clone();
        self.enqueue(&owner, Job::Run(request)).await
    }

    /// Waits until every request queued for `owner` so far has finished.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::WorkerClosed` if the worker has stopped.
    pub async fn flush(&self, owner: &OwnerId) -> ServiceResult<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.enqueue(owner, Job::Flush(done_tx)).await?;
        done_rx.await.map_err(|_| ServiceError::WorkerClosed)
    }

    /// Returns the current counters.
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            workers: self
                .workers
                .lock()
                .values()
                .filter(|worker| !worker.sender.is_closed())
                .count(),
        }
    }

    /// Closes every queue and waits for the workers to drain them.
    pub async fn shutdown(&self) {
        let workers: Vec<(OwnerId, Worker)> = self.workers.lock().drain().collect();
        for (owner, worker) in workers {
            drop(worker.sender);
            if let Err(e) = worker.handle.await {
                error!(owner = %owner, error = %e, "worker task failed");
            }
        }
        info!("dispatcher shut down");
    }

    /// Sends a job, retrying once on a fresh worker if the current one
    /// stopped between lookup and send.
    async fn enqueue(&self, owner: &OwnerId, job: Job) -> ServiceResult<()> {
        let job = match self.sender(owner).send(job).await {
            Ok(()) => return Ok(()),
            Err(mpsc::error::SendError(job)) => job,
        };
        debug!(owner = %owner, "worker stopped, retrying on a new one");
        self.sender(owner)
            .send(job)
            .await
            .map_err(|_| ServiceError::WorkerClosed)
    }

    fn sender(&self, owner: &OwnerId) -> mpsc::Sender<Job> {
        let mut workers = self.workers.lock();
        let previous = match workers.remove(owner) {
            Some(worker) if !worker.sender.is_closed() => {
                let sender = worker.sender.clone();
                workers.insert(owner.clone(), worker);
                return sender;
            }
            Some(worker) => Some(worker.handle),
            None => None,
        };

        let (sender, receiver) = mpsc::channel(self.capacity);
        let handle = tokio::spawn(run_worker(
            owner.clone(),
            receiver,
            previous,
            self.idle_timeout,
            Arc::clone(&self.handlers),
            WorkerShared {
                workers: Arc::clone(&self.workers),
                counters: Arc::clone(&self.counters),
            },
        ));
        debug!(owner = %owner, capacity = self.capacity, "started worker");
        workers.insert(
            owner.clone(),
            Worker {
                sender: sender.clone(),
                handle,
            },
        );
        sender
    }
}

/// State a worker shares with its dispatcher.
struct WorkerShared {
    workers: Workers,
    counters: Arc<Counters>,
}

async fn run_worker(
    owner: OwnerId,
    mut receiver: mpsc::Receiver<Job>,
    previous: Option<JoinHandle<()>>,
    idle_timeout: Duration,
    handlers: Arc<ActionHandlers>,
    shared: WorkerShared,
) {
    // Jobs for one owner stay serial across a worker restart.
    if let Some(previous) = previous {
        if let Err(e) = previous.await {
            error!(owner = %owner, error = %e, "worker task failed");
        }
    }

    loop {
        match tokio::time::timeout(idle_timeout, receiver.recv()).await {
            Ok(Some(job)) => run_job(job, &handlers, &shared.counters).await,
            Ok(None) => break,
            Err(_) => {
                debug!(owner = %owner, idle = ?idle_timeout, "worker idle, stopping");
                receiver.close();
                while let Some(job) = receiver.recv().await {
                    run_job(job, &handlers, &shared.counters).await;
                }
                break;
            }
        }
    }

    // A replacement worker owns the entry once it exists; only a stale entry
    // is removed here.
    let mut workers = shared.workers.lock();
    if workers
        .get(&owner)
        .is_some_and(|worker| worker.sender.is_closed())
    {
        workers.remove(&owner);
    }
    drop(workers);
    debug!(owner = %owner, "worker stopped");
}

async fn run_job(job: Job, handlers: &Arc<ActionHandlers>, counters: &Counters) {
    match job {
        Job::Run(request) => {
            let handlers = Arc::clone(handlers);
            let label = request.to_string();
            let outcome = tokio::task::spawn_blocking(move || handlers.handle(&request)).await;
            match outcome {
                Ok(Ok(())) => {
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                    debug!(request = %label, "request completed");
                }
                Ok(Err(e)) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(request = %label, error = %e, retryable = e.is_retryable(), "request failed");
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    error!(request = %label, error = %e, "request panicked");
                }
            }
        }
        Job::Flush(done) => {
            let _ = done.send(());
        }
    }
}
