//! Refresh Pool
//!
//! Bounded queue of background refresh jobs drained by a fixed set of Tokio
//! workers. Each job runs on Tokio's blocking pool since value computation is
//! synchronous.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A unit of background work.
pub type RefreshJob = Box<dyn FnOnce() + Send + 'static>;

// == Submit Error ==
/// Why a job was turned away. The rejected job is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// Queue is at capacity
    Full,
    /// Pool has been shut down
    Closed,
}

// == Refresh Pool ==
#[derive(Debug)]
pub struct RefreshPool {
    sender: mpsc::Sender<RefreshJob>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl RefreshPool {
    /// Spawns `workers` tasks on `runtime` sharing a queue of `queue_capacity` jobs.
    ///
    /// # Arguments
    /// * `runtime` - Handle of the Tokio runtime hosting the workers
    /// * `workers` - Number of jobs that may run at once
    /// * `queue_capacity` - Jobs accepted while all workers are busy
    pub fn start(runtime: &Handle, workers: usize, queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<RefreshJob>(queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|id| runtime.spawn(run_worker(id, Arc::clone(&receiver))))
            .collect();

        info!(
            "Started refresh pool with {} workers and queue capacity {}",
            workers, queue_capacity
        );

        Self {
            sender,
            workers: Mutex::new(handles),
        }
    }

    // == Try Submit ==
    /// Queues a job without waiting.
    pub fn try_submit(&self, job: RefreshJob) -> Result<(), SubmitError> {
        self.sender.try_send(job).map_err(|err| match err {
            TrySendError::Full(_) => SubmitError::Full,
            TrySendError::Closed(_) => SubmitError::Closed,
        })
    }

    /// Number of jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    // == Shutdown ==
    /// Aborts every worker. Queued jobs are dropped and running ones finish on
    /// the blocking pool.
    pub fn shutdown(&self) {
        let workers = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            return;
        }
        for handle in &workers {
            handle.abort();
        }
        warn!("Refresh pool shut down, {} workers aborted", workers.len());
    }
}

async fn run_worker(id: usize, receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<RefreshJob>>>) {
    debug!(worker = id, "Refresh worker started");

    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(job) = job else {
            break;
        };

        if let Err(err) = tokio::task::spawn_blocking(job).await {
            warn!(worker = id, error = %err, "Refresh job did not complete");
        }
    }

    debug!(worker = id, "Refresh worker stopped, queue closed");
}
