//! Request context passed to handlers.
//!
//! Every dispatched request gets its own [`Context`]. It provides:
//!
//! - **Identity**: the request ID
//! - **Elicitation**: pause and ask the caller for input
//! - **Blocking work**: hand closures to the bounded worker pool
//! - **Cancellation**: check whether the caller gave up
//!
//! # Example
//!
//! ```rust
//! use dispatchkit_server::Context;
//! use dispatchkit_core::protocol::RequestId;
//!
//! let ctx = Context::detached(RequestId::Number(1));
//! assert!(!ctx.is_cancelled());
//! assert_eq!(ctx.request_id(), &RequestId::Number(1));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

use dispatchkit_core::error::HandlerError;
use dispatchkit_core::protocol::RequestId;
use dispatchkit_core::schema::ParamType;
use dispatchkit_core::types::{ElicitationOutcome, ElicitationRequest};

use crate::blocking::BlockingPool;
use crate::config::DEFAULT_ELICITATION_TIMEOUT_MS;
use crate::elicitation::{ElicitationChannel, Elicitor, NoElicitation};

/// A cancellation token for request handling.
///
/// Cloning shares the underlying flag. Cancellation is one-way.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    /// Create a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Request cancellation, waking every waiter.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Wait for cancellation.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Request context passed to handler functions.
///
/// The context is owned by the handler invocation and dropped when the
/// handler returns, so elicitation sessions never outlive their request.
pub struct Context {
    request_id: RequestId,
    elicitor: Elicitor,
    cancel: CancellationToken,
    pool: BlockingPool,
}

impl Context {
    /// Create a context bound to a request's elicitation channel.
    #[must_use]
    pub fn new(
        request_id: RequestId,
        channel: Arc<dyn ElicitationChannel>,
        cancel: CancellationToken,
        pool: BlockingPool,
        elicitation_timeout: Duration,
    ) -> Self {
        let elicitor = Elicitor::new(
            request_id.clone(),
            channel,
            cancel.clone(),
            elicitation_timeout,
        );
        Self {
            request_id,
            elicitor,
            cancel,
            pool,
        }
    }

    /// A context with no caller attached: elicitations resolve `Cancelled`.
    ///
    /// Useful for calling handlers directly in tests.
    #[must_use]
    pub fn detached(request_id: RequestId) -> Self {
        Self::new(
            request_id,
            Arc::new(NoElicitation),
            CancellationToken::new(),
            BlockingPool::new(1),
            Duration::from_millis(DEFAULT_ELICITATION_TIMEOUT_MS),
        )
    }

    /// The ID of the request being handled.
    #[must_use]
    pub const fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Check if the request has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Get the cancellation token for this context.
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Ask the caller for input and suspend until it resolves.
    ///
    /// Taking `&mut self` keeps the elicitations of one request strictly
    /// sequential.
    pub async fn elicit(
        &mut self,
        prompt: impl Into<String>,
        expected_shape: Option<ParamType>,
    ) -> ElicitationOutcome {
        self.elicitor
            .elicit(ElicitationRequest::new(prompt, expected_shape))
            .await
    }

    /// [`elicit`](Self::elicit) with a prebuilt request.
    pub async fn elicit_request(&mut self, request: ElicitationRequest) -> ElicitationOutcome {
        self.elicitor.elicit(request).await
    }

    /// Run blocking work on the worker pool and await its result.
    pub async fn run_blocking<F, T>(&self, f: F) -> Result<T, HandlerError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.pool.run(&self.cancel, f).await
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("is_cancelled", &self.is_cancelled())
            .field("blocking_workers", &self.pool.workers())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_wakes_waiters() {
        let token = CancellationToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        tokio::task::yield_now().await;
        token.cancel();
        waiter.await.unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_already_cancelled_returns_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancelled().await;
    }

    #[tokio::test]
    async fn test_detached_elicitation_cancels() {
        let mut ctx = Context::detached(RequestId::Number(1));
        let outcome = ctx.elicit("Proceed?", None).await;
        assert_eq!(outcome, ElicitationOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_run_blocking() {
        let ctx = Context::detached(RequestId::from("job"));
        let sum = ctx.run_blocking(|| (1..=10).sum::<u32>()).await.unwrap();
        assert_eq!(sum, 55);
    }
}
