//! ジョブキュー
//!
//! A fixed set of worker tasks pulls boxed futures from one unbounded
//! channel. The first failing job cancels the rest: jobs still queued are
//! drained without running, and [`JobQueue::wait`] reports that failure.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{
    AtomicBool,
    Ordering,
};
use std::sync::{
    Arc,
    PoisonError,
};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{
    Mutex,
    mpsc,
    watch,
};
use tokio::task::JoinHandle;

use crate::error::BuildError;

/// A unit of work.
pub type Job = BoxFuture<'static, Result<(), BuildError>>;

/// State shared by the queue handle and its workers.
#[derive(Debug)]
struct Shared {
    /// Jobs submitted but not yet finished.
    outstanding: watch::Sender<usize>,
    /// Set by the first failure or by [`JobQueue::cancel`].
    cancelled: AtomicBool,
    /// First failure, reported by [`JobQueue::wait`].
    first_error: std::sync::Mutex<Option<BuildError>>,
}

impl Shared {
    /// Keeps the first error and cancels the remaining jobs.
    fn record_failure(&self, error: BuildError) {
        tracing::error!(%error, "Job failed; cancelling remaining jobs");
        let mut slot = self.first_error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(error);
        }
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Marks one job as finished.
    fn finish_one(&self) {
        self.outstanding.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Worker pool with completion tracking.
#[derive(Debug)]
pub struct JobQueue {
    /// Dropped on shutdown so the workers stop.
    sender: Option<mpsc::UnboundedSender<Job>>,
    /// State shared with the workers.
    shared: Arc<Shared>,
    /// Worker tasks.
    workers: Vec<JoinHandle<()>>,
}

impl JobQueue {
    /// Spawns `workers` worker tasks; `0` means one per CPU.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(workers: usize) -> Self {
        let workers = if workers == 0 { num_cpus::get() } else { workers };
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let (outstanding, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            outstanding,
            cancelled: AtomicBool::new(false),
            first_error: std::sync::Mutex::new(None),
        });

        tracing::debug!(workers, "Starting job queue");
        let workers = (0..workers)
            .map(|id| tokio::spawn(run_worker(id, Arc::clone(&receiver), Arc::clone(&shared))))
            .collect();
        Self { sender: Some(sender), shared, workers }
    }

    /// Queues a job. Never blocks.
    ///
    /// # Errors
    /// Returns [`BuildError::QueueClosed`] after [`JobQueue::shutdown`].
    pub fn submit<F>(&self, job: F) -> Result<(), BuildError>
    where
        F: Future<Output = Result<(), BuildError>> + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(BuildError::QueueClosed)?;
        self.shared.outstanding.send_modify(|n| *n += 1);
        if sender.send(job.boxed()).is_err() {
            self.shared.finish_one();
            return Err(BuildError::QueueClosed);
        }
        Ok(())
    }

    /// Stops running queued jobs; they are drained as if finished.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
    }

    /// Jobs submitted and not yet finished.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        *self.shared.outstanding.borrow()
    }

    /// Waits until every submitted job has finished.
    ///
    /// # Errors
    /// Returns the first job failure, if any.
    pub async fn wait(&self) -> Result<(), BuildError> {
        tracing::info!(outstanding = self.outstanding(), "Waiting for queued jobs to finish");
        let mut outstanding = self.shared.outstanding.subscribe();
        if outstanding.wait_for(|n| *n == 0).await.is_err() {
            return Err(BuildError::QueueClosed);
        }
        self.shared
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map_or(Ok(()), Err)
    }

    /// Closes the queue and waits for the workers to exit.
    ///
    /// # Errors
    /// Returns the first job failure, if any.
    pub async fn shutdown(mut self) -> Result<(), BuildError> {
        let result = self.wait().await;
        self.sender = None;
        for worker in self.workers.drain(..) {
            if let Err(err) = worker.await {
                tracing::warn!(%err, "Worker task ended abnormally");
            }
        }
        result
    }
}

/// Runs jobs until the channel closes.
async fn run_worker(
    id: usize,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>,
    shared: Arc<Shared>,
) {
    loop {
        // 受信中のみロックを保持する
        let Some(job) = receiver.lock().await.recv().await else {
            break;
        };

        if !shared.cancelled.load(Ordering::SeqCst) {
            match AssertUnwindSafe(job).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => shared.record_failure(error),
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_default();
                    shared.record_failure(BuildError::JobPanicked(message));
                }
            }
        }
        shared.finish_one();
    }
    tracing::trace!(worker = id, "Worker stopped");
}
