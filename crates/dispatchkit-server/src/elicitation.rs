//! Elicitation sessions.
//!
//! A session is a small state machine owned by one handler invocation:
//!
//! ```text
//! Idle --open--> AwaitingResponse --resolve--> Resolved(outcome)
//! ```
//!
//! The transport side is abstracted by [`ElicitationChannel`]. The
//! [`Elicitor`] drives one session at a time, racing the caller's answer
//! against request cancellation and the configured deadline. Whatever wins
//! becomes the single terminal outcome.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use dispatchkit_core::protocol::RequestId;
use dispatchkit_core::schema::ParamType;
use dispatchkit_core::types::{ElicitationOutcome, ElicitationRequest, ElicitationResponse};

use crate::context::CancellationToken;

/// The caller's side of the connection went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("elicitation channel closed")]
pub struct ChannelClosed;

/// Transport boundary for elicitation round trips.
///
/// Implementations deliver the request to the caller and complete with the
/// caller's answer, or with [`ChannelClosed`] if the caller disconnects.
/// Dropping the returned future abandons the round trip.
pub trait ElicitationChannel: Send + Sync {
    /// Send `request` on behalf of request `id` and await the answer.
    fn request(
        &self,
        id: RequestId,
        request: ElicitationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ElicitationResponse, ChannelClosed>> + Send + '_>>;
}

/// A channel with no caller behind it. Every elicitation resolves
/// `Cancelled`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoElicitation;

impl ElicitationChannel for NoElicitation {
    fn request(
        &self,
        _id: RequestId,
        _request: ElicitationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ElicitationResponse, ChannelClosed>> + Send + '_>> {
        Box::pin(async { Err(ChannelClosed) })
    }
}

/// State of one elicitation session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No request sent yet.
    Idle,
    /// The request is with the caller; the handler is suspended.
    AwaitingResponse,
    /// Terminal.
    Resolved(ElicitationOutcome),
}

/// What ended an awaiting session.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The caller answered.
    Response(ElicitationResponse),
    /// The connection closed.
    ChannelClosed,
    /// The deadline elapsed.
    TimedOut,
    /// The request was cancelled.
    Cancelled,
}

/// An invalid session transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// `open` on a session that already left `Idle`.
    #[error("session is not idle")]
    NotIdle,
    /// `resolve` on a session that was never opened.
    #[error("session is not awaiting a response")]
    NotAwaiting,
    /// `resolve` on a session that already has an outcome.
    #[error("session is already resolved")]
    AlreadyResolved,
}

/// One elicitation round trip.
#[derive(Debug, Clone)]
pub struct ElicitationSession {
    state: SessionState,
    expected_shape: Option<ParamType>,
}

impl Default for ElicitationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ElicitationSession {
    /// A fresh, idle session.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SessionState::Idle,
            expected_shape: None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// `Idle -> AwaitingResponse`.
    pub fn open(&mut self, request: &ElicitationRequest) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::NotIdle);
        }
        self.expected_shape.clone_from(&request.expected_shape);
        self.state = SessionState::AwaitingResponse;
        Ok(())
    }

    /// `AwaitingResponse -> Resolved(outcome)`.
    ///
    /// A response is validated against the expected shape; every other
    /// resolution yields `Cancelled`.
    pub fn resolve(&mut self, resolution: Resolution) -> Result<ElicitationOutcome, SessionError> {
        match self.state {
            SessionState::Idle => return Err(SessionError::NotAwaiting),
            SessionState::Resolved(_) => return Err(SessionError::AlreadyResolved),
            SessionState::AwaitingResponse => {}
        }
        let outcome = match resolution {
            Resolution::Response(response) => response.into_outcome(self.expected_shape.as_ref()),
            Resolution::ChannelClosed | Resolution::TimedOut | Resolution::Cancelled => {
                ElicitationOutcome::Cancelled
            }
        };
        self.state = SessionState::Resolved(outcome.clone());
        Ok(outcome)
    }
}

/// Drives elicitation sessions for one request.
pub struct Elicitor {
    request_id: RequestId,
    channel: Arc<dyn ElicitationChannel>,
    cancel: CancellationToken,
    timeout: Duration,
}

impl Elicitor {
    /// Bind an elicitor to a request.
    #[must_use]
    pub fn new(
        request_id: RequestId,
        channel: Arc<dyn ElicitationChannel>,
        cancel: CancellationToken,
        timeout: Duration,
    ) -> Self {
        Self {
            request_id,
            channel,
            cancel,
            timeout,
        }
    }

    /// Run one session to its outcome. Never fails and never hangs past the
    /// deadline.
    pub async fn elicit(&mut self, request: ElicitationRequest) -> ElicitationOutcome {
        let mut session = ElicitationSession::new();
        if session.open(&request).is_err() {
            return ElicitationOutcome::Cancelled;
        }
        tracing::debug!(id = %self.request_id, prompt = %request.prompt, "Elicitation opened");

        let resolution = if self.cancel.is_cancelled() {
            Resolution::Cancelled
        } else {
            let answer = tokio::time::timeout(
                self.timeout,
                self.channel.request(self.request_id.clone(), request),
            );
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => Resolution::Cancelled,
                answer = answer => match answer {
                    Ok(Ok(response)) => Resolution::Response(response),
                    Ok(Err(ChannelClosed)) => Resolution::ChannelClosed,
                    Err(_) => Resolution::TimedOut,
                },
            }
        };

        let reason = match &resolution {
            Resolution::Response(_) => "response",
            Resolution::ChannelClosed => "channel_closed",
            Resolution::TimedOut => "timed_out",
            Resolution::Cancelled => "cancelled",
        };
        let outcome = session
            .resolve(resolution)
            .unwrap_or(ElicitationOutcome::Cancelled);
        tracing::debug!(id = %self.request_id, reason, outcome = ?outcome, "Elicitation resolved");
        outcome
    }
}

impl std::fmt::Debug for Elicitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Elicitor")
            .field("request_id", &self.request_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::Mutex;

    /// Answers every request with a scripted response.
    struct Scripted {
        answers: Mutex<Vec<ElicitationResponse>>,
    }

    impl ElicitationChannel for Scripted {
        fn request(
            &self,
            _id: RequestId,
            _request: ElicitationRequest,
        ) -> Pin<Box<dyn Future<Output = Result<ElicitationResponse, ChannelClosed>> + Send + '_>>
        {
            Box::pin(async move {
                let mut answers = self.answers.lock().await;
                if answers.is_empty() {
                    Err(ChannelClosed)
                } else {
                    Ok(answers.remove(0))
                }
            })
        }
    }

    /// Never answers.
    struct Silent;

    impl ElicitationChannel for Silent {
        fn request(
            &self,
            _id: RequestId,
            _request: ElicitationRequest,
        ) -> Pin<Box<dyn Future<Output = Result<ElicitationResponse, ChannelClosed>> + Send + '_>>
        {
            Box::pin(futures::future::pending())
        }
    }

    fn elicitor(channel: Arc<dyn ElicitationChannel>, cancel: CancellationToken) -> Elicitor {
        Elicitor::new(RequestId::Number(1), channel, cancel, Duration::from_secs(5))
    }

    #[test]
    fn test_session_transitions() {
        let mut session = ElicitationSession::new();
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(
            session.resolve(Resolution::TimedOut),
            Err(SessionError::NotAwaiting)
        );

        session.open(&ElicitationRequest::text("Name?")).unwrap();
        assert_eq!(session.state(), &SessionState::AwaitingResponse);
        assert_eq!(
            session.open(&ElicitationRequest::text("Again?")),
            Err(SessionError::NotIdle)
        );

        let outcome = session
            .resolve(Resolution::Response(ElicitationResponse::accept(json!("Ada"))))
            .unwrap();
        assert_eq!(outcome, ElicitationOutcome::Accepted { data: json!("Ada") });
        assert_eq!(
            session.resolve(Resolution::ChannelClosed),
            Err(SessionError::AlreadyResolved)
        );
        assert_eq!(session.state(), &SessionState::Resolved(outcome));
    }

    #[tokio::test]
    async fn test_sequential_sessions() {
        let channel = Arc::new(Scripted {
            answers: Mutex::new(vec![
                ElicitationResponse::accept(serde_json::Value::Null),
                ElicitationResponse::decline(),
            ]),
        });
        let mut elicitor = elicitor(channel, CancellationToken::new());

        let first = elicitor.elicit(ElicitationRequest::confirm("Continue?")).await;
        assert!(first.is_accepted());
        let second = elicitor.elicit(ElicitationRequest::text("Name?")).await;
        assert_eq!(second, ElicitationOutcome::Declined);
        let third = elicitor.elicit(ElicitationRequest::text("Still there?")).await;
        assert_eq!(third, ElicitationOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_resolves_cancelled() {
        let mut elicitor = elicitor(Arc::new(Silent), CancellationToken::new());
        let outcome = elicitor.elicit(ElicitationRequest::text("Name?")).await;
        assert_eq!(outcome, ElicitationOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_cancellation_resolves_cancelled() {
        let token = CancellationToken::new();
        let mut elicitor = elicitor(Arc::new(Silent), token.clone());
        let canceller = tokio::spawn(async move {
            tokio::task::yield_now().await;
            token.cancel();
        });
        let outcome = elicitor.elicit(ElicitationRequest::confirm("Proceed?")).await;
        canceller.await.unwrap();
        assert_eq!(outcome, ElicitationOutcome::Cancelled);
    }
}
