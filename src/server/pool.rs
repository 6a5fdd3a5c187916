//! Fixed-size worker pool.
//!
//! # Responsibilities
//! - Spawn N named worker threads at construction
//! - Each worker: pop one item, process it to completion, repeat
//! - Exit when the queue reports shutdown-and-empty
//!
//! # Design Decisions
//! - No resizing and no work stealing; workers keep no state between items
//! - Joining is the only way to observe that every worker has exited

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::net::queue::ConnectionQueue;

/// Handles of the running worker threads.
#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `size` workers that feed every popped item to `work`.
    ///
    /// If a thread cannot be spawned, the workers already running are shut
    /// down and joined before the error is returned.
    pub fn spawn<T, F>(size: usize, queue: Arc<ConnectionQueue<T>>, work: F) -> io::Result<Self>
    where
        T: Send + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let work = Arc::new(work);
        let mut workers = Vec::with_capacity(size);

        for index in 0..size {
            let queue_for_worker = Arc::clone(&queue);
            let work = Arc::clone(&work);

            let spawned = thread::Builder::new()
                .name(format!("worker-{index}"))
                .spawn(move || worker_loop(&queue_for_worker, work.as_ref()));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    tracing::error!(worker = index, error = %e, "Failed to spawn worker");
                    queue.request_shutdown();
                    WorkerPool { workers }.join();
                    return Err(e);
                }
            }
        }

        tracing::debug!(workers = size, "Worker pool started");
        Ok(Self { workers })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Wait for every worker to exit.
    pub fn join(self) {
        for handle in self.workers {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                tracing::error!(worker = %name, "Worker panicked");
            }
        }
    }
}

fn worker_loop<T, F: Fn(T) + ?Sized>(queue: &ConnectionQueue<T>, work: &F) {
    while let Some(item) = queue.pop_blocking() {
        work(item);
    }
    tracing::debug!("Worker exiting");
}
