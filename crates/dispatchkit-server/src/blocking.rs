//! Bounded pool for blocking handler work.
//!
//! Handlers run on the async scheduler. Work that blocks (file IO, CPU-heavy
//! transforms, synchronous clients) is handed to [`BlockingPool::run`], which
//! waits for a permit, runs the closure on tokio's blocking threads and
//! delivers the result back to the awaiting handler.

use std::sync::Arc;
use tokio::sync::Semaphore;

use dispatchkit_core::error::HandlerError;

use crate::context::CancellationToken;

/// A semaphore-bounded front for `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl BlockingPool {
    /// Create a pool running at most `workers` tasks at once (minimum 1).
    #[must_use]
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Pool size.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Permits currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `f` on a worker and await its result.
    ///
    /// Returns [`HandlerError::Cancelled`] if `cancel` fires while waiting
    /// for a permit. Once started, the closure runs to completion.
    pub async fn run<F, T>(&self, cancel: &CancellationToken, f: F) -> Result<T, HandlerError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(HandlerError::Cancelled),
            permit = Arc::clone(&self.permits).acquire_owned() => permit.map_err(|_| {
                HandlerError::Blocking {
                    message: "pool is closed".to_string(),
                }
            })?,
        };

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await
        .map_err(|err| HandlerError::Blocking {
            message: if err.is_panic() {
                "task panicked".to_string()
            } else {
                err.to_string()
            },
        })
    }
}

impl Default for BlockingPool {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_BLOCKING_WORKERS)
    }
}
