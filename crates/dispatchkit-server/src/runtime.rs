//! Line-delimited JSON connection runtime.
//!
//! [`serve`] reads [`ClientMessage`]s from any `AsyncBufRead`, runs each
//! request on its own task and writes [`ServerMessage`]s to any `AsyncWrite`,
//! one JSON object per line. Responses are written as they complete, so they
//! may arrive out of order.
//!
//! Elicitation requests are routed back through the same connection: a
//! handler's `elicitation_request` carries its request ID, and the caller's
//! `elicitation_response` with that ID resumes it.
//!
//! On end of input every in-flight request is cancelled, pending elicitations
//! resolve `Cancelled`, and `serve` returns once all handlers have finished.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

use dispatchkit_core::error::{DispatchError, ErrorBody};
use dispatchkit_core::protocol::{ClientMessage, RequestId, ResponseBody, ServerMessage};
use dispatchkit_core::types::{ElicitationRequest, ElicitationResponse};

use crate::context::CancellationToken;
use crate::dispatcher::Dispatcher;
use crate::elicitation::{ChannelClosed, ElicitationChannel};

type Pending = HashMap<RequestId, oneshot::Sender<ElicitationResponse>>;

/// The elicitation side of one connection.
///
/// Outbound requests go to the writer task; inbound answers are matched to
/// the waiting handler by request ID.
#[derive(Debug)]
pub struct ConnectionChannel {
    outbound: mpsc::UnboundedSender<ServerMessage>,
    pending: Mutex<Pending>,
    closed: AtomicBool,
    max_bytes: usize,
}

impl ConnectionChannel {
    /// Create a channel writing to `outbound`.
    #[must_use]
    pub fn new(outbound: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            max_bytes: usize::MAX,
        }
    }

    /// Refuse elicitation requests whose encoded line exceeds `max_bytes`.
    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Hand a caller answer to the handler awaiting it.
    ///
    /// Returns `false` if no elicitation is pending for `id`.
    pub fn deliver(&self, id: &RequestId, response: ElicitationResponse) -> bool {
        let waiter = self.lock().remove(id);
        waiter.is_some_and(|tx| tx.send(response).is_ok())
    }

    /// Close the channel. Pending and future elicitations fail with
    /// [`ChannelClosed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.lock().clear();
    }

    /// Number of elicitations awaiting an answer.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes a pending entry when its round trip ends or is abandoned.
struct PendingGuard<'a> {
    channel: &'a ConnectionChannel,
    id: RequestId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.channel.lock().remove(&self.id);
    }
}

impl ElicitationChannel for ConnectionChannel {
    fn request(
        &self,
        id: RequestId,
        request: ElicitationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ElicitationResponse, ChannelClosed>> + Send + '_>> {
        Box::pin(async move {
            let message = ServerMessage::ElicitationRequest {
                id: id.clone(),
                prompt: request.prompt,
                expected_shape: request.expected_shape,
            };
            // Oversized requests resolve as cancelled instead of reaching the writer.
            let size = serde_json::to_string(&message).map_or(usize::MAX, |json| json.len());
            if size > self.max_bytes {
                tracing::warn!(size, max = self.max_bytes, "Elicitation request too large");
                return Err(ChannelClosed);
            }

            let (tx, rx) = oneshot::channel();
            {
                let mut pending = self.lock();
                if self.closed.load(Ordering::SeqCst) {
                    return Err(ChannelClosed);
                }
                pending.insert(id.clone(), tx);
            }
            let _guard = PendingGuard {
                channel: self,
                id: id.clone(),
            };

            self.outbound.send(message).map_err(|_| ChannelClosed)?;

            rx.await.map_err(|_| ChannelClosed)
        })
    }
}

/// Serve one connection until end of input.
///
/// Returns an error only if reading fails; write failures are logged and end
/// output, and malformed lines are logged and skipped.
pub async fn serve<R, W>(dispatcher: Arc<Dispatcher>, reader: R, writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let max_bytes = dispatcher.config().max_message_bytes;
    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let writer_task = tokio::spawn(write_loop(writer, outbound_rx, max_bytes));

    let channel = Arc::new(ConnectionChannel::new(outbound.clone()).with_max_bytes(max_bytes));
    let in_flight: Arc<Mutex<HashMap<RequestId, CancellationToken>>> = Arc::default();
    let mut tasks = JoinSet::new();
    let mut lines = reader.lines();

    tracing::info!("Connection opened");
    let result = loop {
        tokio::select! {
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break Ok(()),
                    Err(err) => {
                        tracing::error!(error = %err, "Read error");
                        break Err(err);
                    }
                };
                if line.len() > max_bytes {
                    tracing::warn!(size = line.len(), max = max_bytes, "Skipping oversized message");
                    continue;
                }
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let message: ClientMessage = match serde_json::from_str(trimmed) {
                    Ok(message) => message,
                    Err(err) => {
                        tracing::warn!(error = %err, "Skipping unparseable message");
                        continue;
                    }
                };

                match message.into_request() {
                    Ok((id, request)) => {
                        let token = CancellationToken::new();
                        let duplicate = {
                            let mut in_flight = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
                            if in_flight.contains_key(&id) {
                                true
                            } else {
                                in_flight.insert(id.clone(), token.clone());
                                false
                            }
                        };
                        if duplicate {
                            tracing::warn!(id = %id, "Rejecting duplicate request id");
                            let err = DispatchError::invalid_request(format!(
                                "request id {id} is already in flight"
                            ));
                            let _ = outbound.send(ServerMessage::Response {
                                id,
                                body: ResponseBody::from(err),
                            });
                            continue;
                        }

                        let dispatcher = Arc::clone(&dispatcher);
                        let channel: Arc<dyn ElicitationChannel> = channel.clone();
                        let in_flight = Arc::clone(&in_flight);
                        let outbound = outbound.clone();
                        tasks.spawn(async move {
                            let body = dispatcher.handle(id.clone(), request, channel, token).await;
                            in_flight
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .remove(&id);
                            if outbound.send(ServerMessage::Response { id, body }).is_err() {
                                tracing::debug!("Response dropped, writer is gone");
                            }
                        });
                    }
                    Err(ClientMessage::ElicitationResponse { id, outcome, data }) => {
                        if !channel.deliver(&id, ElicitationResponse { outcome, data }) {
                            tracing::warn!(id = %id, "No pending elicitation for response");
                        }
                    }
                    Err(ClientMessage::Cancel { id }) => {
                        let token = in_flight
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .get(&id)
                            .cloned();
                        match token {
                            Some(token) => {
                                tracing::debug!(id = %id, "Cancelling request");
                                token.cancel();
                            }
                            None => tracing::debug!(id = %id, "Cancel for unknown request"),
                        }
                    }
                    Err(other) => {
                        tracing::warn!(id = %other.id(), "Unexpected message");
                    }
                }
            }
        }
    };

    // Drain: cancel everything still running and wait for it.
    let remaining: Vec<CancellationToken> = in_flight
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .values()
        .cloned()
        .collect();
    for token in remaining {
        token.cancel();
    }
    channel.close();
    while tasks.join_next().await.is_some() {}

    drop(channel);
    drop(outbound);
    if let Err(err) = writer_task.await {
        tracing::error!(error = %err, "Writer task failed");
    }
    tracing::info!("Connection closed");
    result
}

/// Serve the process's stdin/stdout.
pub async fn serve_stdio(dispatcher: Arc<Dispatcher>) -> io::Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    serve(dispatcher, stdin, tokio::io::stdout()).await
}

async fn write_loop<W>(
    mut writer: W,
    mut outbound: mpsc::UnboundedReceiver<ServerMessage>,
    max_bytes: usize,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outbound.recv().await {
        let json = match encode(&message, max_bytes) {
            Ok(json) => json,
            Err(err) => {
                tracing::error!(error = %err, "Failed to encode outbound message");
                continue;
            }
        };
        let written = async {
            writer.write_all(json.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;
        if let Err(err) = written {
            tracing::error!(error = %err, "Write error, closing output");
            return;
        }
    }
    let _ = writer.shutdown().await;
}

/// Serialize a message, replacing an oversized response with an error.
///
/// Elicitation requests are size-checked by [`ConnectionChannel`] before they
/// are queued and pass through unchanged.
fn encode(message: &ServerMessage, max_bytes: usize) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(message)?;
    let ServerMessage::Response { id, .. } = message else {
        return Ok(json);
    };
    if json.len() <= max_bytes {
        return Ok(json);
    }
    tracing::warn!(size = json.len(), max = max_bytes, "Outbound message too large");
    let id = id.clone();
    let err = DispatchError::internal(format!(
        "response of {} bytes exceeds the {max_bytes} byte limit",
        json.len()
    ));
    serde_json::to_string(&ServerMessage::Response {
        id,
        body: ResponseBody::Error(ErrorBody::from(&err)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatchkit_core::types::ElicitAction;
    use serde_json::json;

    #[tokio::test]
    async fn test_deliver_to_pending() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let channel = Arc::new(ConnectionChannel::new(tx).with_max_bytes(1024));

        let waiter = {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move {
                channel
                    .request(RequestId::Number(9), ElicitationRequest::text("Name?"))
                    .await
            })
        };

        let sent = rx.recv().await.unwrap();
        assert!(matches!(sent, ServerMessage::ElicitationRequest { ref id, .. } if *id == RequestId::Number(9)));
        assert_eq!(channel.pending(), 1);

        assert!(channel.deliver(&RequestId::Number(9), ElicitationResponse::accept(json!("Ada"))));
        let response = waiter.await.unwrap().unwrap();
        assert_eq!(response.outcome, ElicitAction::Accept);
        assert_eq!(channel.pending(), 0);
        assert!(!channel.deliver(&RequestId::Number(9), ElicitationResponse::decline()));
    }

    #[tokio::test]
    async fn test_close_fails_pending() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let channel = Arc::new(ConnectionChannel::new(tx));

        let waiter = {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move {
                channel
                    .request(RequestId::Number(1), ElicitationRequest::confirm("Ok?"))
                    .await
            })
        };
        rx.recv().await.unwrap();
        channel.close();
        assert_eq!(waiter.await.unwrap(), Err(ChannelClosed));

        let after = channel
            .request(RequestId::Number(2), ElicitationRequest::confirm("Ok?"))
            .await;
        assert_eq!(after, Err(ChannelClosed));
    }

    #[tokio::test]
    async fn test_oversized_elicitation_resolves_closed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let channel = ConnectionChannel::new(tx).with_max_bytes(64);

        let result = channel
            .request(RequestId::Number(3), ElicitationRequest::text("x".repeat(200)))
            .await;
        assert_eq!(result, Err(ChannelClosed));
        assert_eq!(channel.pending(), 0);
        // Nothing reaches the writer, so request 3 still gets exactly one response.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_oversized_response_replaced() {
        let message = ServerMessage::Response {
            id: RequestId::Number(1),
            body: ResponseBody::Result(json!("x".repeat(200))),
        };
        let json = encode(&message, 100).unwrap();
        let decoded: ServerMessage = serde_json::from_str(&json).unwrap();
        match decoded {
            ServerMessage::Response { body, .. } => {
                assert_eq!(body.error().unwrap().kind, "internal");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
