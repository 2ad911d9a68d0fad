//! Fixed-size worker pool running one job per ticket.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use thiserror::Error;

use super::paths::{validate_job_id, PathError};
use super::status::StatusRecord;
use super::store::{StatusStore, StoreError};

/// A job waiting for a worker.
#[derive(Debug, Clone, PartialEq)]
pub struct JobTicket {
    pub job_id: String,
    pub video: PathBuf,
}

impl JobTicket {
    pub fn new(job_id: impl Into<String>, video: impl Into<PathBuf>) -> Self {
        Self {
            job_id: job_id.into(),
            video: video.into(),
        }
    }
}

/// Runs a dispatched job to a terminal state.
pub trait JobHandler: Send + Sync {
    fn handle(&self, ticket: &JobTicket);
}

#[derive(Error, Debug)]
pub enum PoolError {
    #[error(transparent)]
    InvalidJobId(#[from] PathError),

    #[error("Job {0} was already submitted")]
    Duplicate(String),

    #[error("Worker pool is shut down")]
    ShutDown,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to start worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Text of a panic payload (`&str` or `String`), or a placeholder.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// `std::thread` workers pulling tickets from one shared channel.
///
/// Phases of one job run sequentially on one worker; distinct jobs run
/// concurrently. There is no cancellation: a dispatched job always runs to
/// a terminal state.
pub struct WorkerPool {
    sender: Option<mpsc::Sender<JobTicket>>,
    workers: Vec<JoinHandle<()>>,
    store: Arc<dyn StatusStore>,
}

impl WorkerPool {
    /// Start `count` workers (at least one).
    pub fn new(
        count: usize,
        handler: Arc<dyn JobHandler>,
        store: Arc<dyn StatusStore>,
    ) -> Result<Self, PoolError> {
        let (sender, receiver) = mpsc::channel::<JobTicket>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(count.max(1));
        for index in 0..count.max(1) {
            let receiver = Arc::clone(&receiver);
            let handler = Arc::clone(&handler);
            let store = Arc::clone(&store);
            let worker = thread::Builder::new()
                .name(format!("vidoc-worker-{}", index))
                .spawn(move || worker_loop(index, &receiver, handler.as_ref(), store.as_ref()))
                .map_err(PoolError::Spawn)?;
            workers.push(worker);
        }
        tracing::info!("[WorkerPool] Started {} worker(s)", workers.len());

        Ok(Self {
            sender: Some(sender),
            workers,
            store,
        })
    }

    /// Write the `Queued` record, then dispatch.
    pub fn submit(&self, ticket: JobTicket) -> Result<(), PoolError> {
        validate_job_id(&ticket.job_id)?;
        let sender = self.sender.as_ref().ok_or(PoolError::ShutDown)?;
        if self.store.get(&ticket.job_id)?.is_some() {
            return Err(PoolError::Duplicate(ticket.job_id));
        }

        self.store
            .put(&ticket.job_id, &StatusRecord::queued(&ticket.job_id))?;
        tracing::debug!("[WorkerPool] Queued job {}", ticket.job_id);
        sender.send(ticket).map_err(|_| PoolError::ShutDown)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop accepting work, let the queue drain and join every worker.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("[WorkerPool] A worker thread panicked outside a job");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    index: usize,
    receiver: &Mutex<mpsc::Receiver<JobTicket>>,
    handler: &dyn JobHandler,
    store: &dyn StatusStore,
) {
    loop {
        let ticket = {
            let guard = receiver.lock();
            guard.recv()
        };
        let Ok(ticket) = ticket else {
            tracing::debug!("[WorkerPool] Worker {} exiting", index);
            break;
        };

        tracing::debug!("[WorkerPool] Worker {} took job {}", index, ticket.job_id);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&ticket)));
        if let Err(payload) = outcome {
            let message = panic_message(&*payload);
            tracing::error!("[WorkerPool] Job {} panicked: {}", ticket.job_id, message);
            fail_after_panic(store, &ticket.job_id, &message);
        }
    }
}

fn fail_after_panic(store: &dyn StatusStore, job_id: &str, message: &str) {
    let current = match store.get(job_id) {
        Ok(Some(record)) => record,
        Ok(None) => StatusRecord::queued(job_id),
        Err(e) => {
            tracing::error!("[WorkerPool] Cannot read status of {}: {}", job_id, e);
            return;
        }
    };
    if current.is_terminal() {
        return;
    }
    let trace = format!(
        "panic: {}\n{}",
        message,
        std::backtrace::Backtrace::force_capture()
    );
    match current.failed(&format!("Job panicked: {}", message), Some(trace)) {
        Ok(record) => {
            if let Err(e) = store.put(job_id, &record) {
                tracing::error!("[WorkerPool] Cannot record panic of {}: {}", job_id, e);
            }
        }
        Err(e) => tracing::error!("[WorkerPool] {}", e),
    }
}
