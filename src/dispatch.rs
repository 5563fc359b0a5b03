//! Dispatcher Module
//!
//! Bounded worker pool that runs blocking store operations off the
//! request-handling threads.
//!
//! ## Flow
//! ```text
//!  request thread                     worker threads (N)
//!  ──────────────                     ──────────────────
//!  run(op) ──send──▶ [bounded queue] ──recv──▶ op()
//!     │                                         │
//!     └──────────recv◀── reply channel ◀──send──┘
//! ```
//! - At most N operations touch backing stores at once
//! - A full queue blocks the submitter (backpressure)
//! - The submitter blocks until the reply arrives or its deadline passes;
//!   on timeout the operation is abandoned, not interrupted

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use parking_lot::Mutex;

use crate::error::{GridError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of worker threads fed by a bounded queue
pub struct Dispatcher {
    /// Job queue; `None` once shut down
    sender: Mutex<Option<Sender<Job>>>,

    /// Joined on shutdown
    workers: Mutex<Vec<JoinHandle<()>>>,

    worker_count: usize,
}

impl Dispatcher {
    /// Spawn `worker_count` workers behind a queue of `queue_capacity` jobs
    pub fn new(worker_count: usize, queue_capacity: usize) -> Result<Self> {
        if worker_count == 0 {
            return Err(GridError::Config("dispatcher needs at least one worker".to_string()));
        }

        let (sender, receiver) = channel::bounded::<Job>(queue_capacity);

        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let receiver = receiver.clone();
            let worker = thread::Builder::new()
                .name(format!("gridstore-worker-{}", id))
                .spawn(move || worker_loop(receiver))?;
            workers.push(worker);
        }

        tracing::debug!(
            "Dispatcher started: {} workers, queue capacity {}",
            worker_count,
            queue_capacity
        );

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            worker_count,
        })
    }

    /// Run `op` on a worker and wait for its result.
    ///
    /// With a deadline, the wait for a queue slot and for the result share
    /// the same budget; exceeding it yields `GridError::Timeout` while the
    /// operation itself keeps running to completion on its worker.
    pub fn run<T, F>(&self, deadline: Option<Duration>, op: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.sender.lock().clone().ok_or_else(shut_down)?;

        let (reply_tx, reply_rx) = channel::bounded::<Result<T>>(1);
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(op)).unwrap_or_else(|_| {
                tracing::error!("Store operation panicked on {:?}", thread::current().name());
                Err(GridError::Dispatcher("operation panicked".to_string()))
            });
            // The submitter is gone if it timed out
            let _ = reply_tx.send(outcome);
        });

        // A budget too large to add to `now` waits without a deadline
        let deadline = deadline.and_then(|budget| {
            Instant::now().checked_add(budget).map(|expires| (budget, expires))
        });

        match deadline {
            None => {
                sender.send(job).map_err(|_| shut_down())?;
                reply_rx.recv().map_err(|_| lost())?
            }
            Some((budget, expires)) => {
                sender.send_timeout(job, budget).map_err(|e| match e {
                    SendTimeoutError::Timeout(_) => GridError::Timeout(budget),
                    SendTimeoutError::Disconnected(_) => shut_down(),
                })?;

                let remaining = expires.saturating_duration_since(Instant::now());
                match reply_rx.recv_timeout(remaining) {
                    Ok(outcome) => outcome,
                    Err(RecvTimeoutError::Timeout) => Err(GridError::Timeout(budget)),
                    Err(RecvTimeoutError::Disconnected) => Err(lost()),
                }
            }
        }
    }

    /// Number of worker threads
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Jobs waiting for a free worker
    pub fn queued(&self) -> usize {
        self.sender.lock().as_ref().map(|s| s.len()).unwrap_or(0)
    }

    /// Stop accepting work, let queued jobs finish, join the workers
    pub fn shutdown(&self) {
        // Dropping the last sender ends every worker loop once the queue drains
        let sender = self.sender.lock().take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if worker.join().is_err() {
                tracing::warn!("Dispatcher worker exited abnormally");
            }
        }
        tracing::debug!("Dispatcher stopped");
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(receiver: Receiver<Job>) {
    for job in receiver.iter() {
        job();
    }
}

fn shut_down() -> GridError {
    GridError::Dispatcher("dispatcher is shut down".to_string())
}

fn lost() -> GridError {
    GridError::Dispatcher("worker dropped the operation".to_string())
}
