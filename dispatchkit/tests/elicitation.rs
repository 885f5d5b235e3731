//! Elicitation sessions driven through the dispatcher.

use dispatchkit::prelude::*;
use dispatchkit::server::ChannelClosed;
use pretty_assertions::assert_eq;
use serde_json::{Map, Value, json};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Plays back canned answers and records what was asked.
#[derive(Default)]
struct Scripted {
    answers: Mutex<Vec<ElicitationResponse>>,
    asked: Mutex<Vec<(RequestId, ElicitationRequest)>>,
}

impl Scripted {
    fn new(answers: Vec<ElicitationResponse>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers),
            asked: Mutex::default(),
        })
    }

    fn asked(&self) -> Vec<(RequestId, ElicitationRequest)> {
        self.asked.lock().unwrap().clone()
    }
}

impl ElicitationChannel for Scripted {
    fn request(
        &self,
        id: RequestId,
        request: ElicitationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ElicitationResponse, ChannelClosed>> + Send + '_>> {
        self.asked.lock().unwrap().push((id, request));
        let mut answers = self.answers.lock().unwrap();
        let answer = if answers.is_empty() {
            Err(ChannelClosed)
        } else {
            Ok(answers.remove(0))
        };
        Box::pin(async move { answer })
    }
}

/// Never answers.
struct Silent;

impl ElicitationChannel for Silent {
    fn request(
        &self,
        _id: RequestId,
        _request: ElicitationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ElicitationResponse, ChannelClosed>> + Send + '_>> {
        Box::pin(futures::future::pending())
    }
}

/// Answers after a short delay.
struct Slow(Duration);

impl ElicitationChannel for Slow {
    fn request(
        &self,
        _id: RequestId,
        _request: ElicitationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ElicitationResponse, ChannelClosed>> + Send + '_>> {
        let delay = self.0;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(ElicitationResponse::accept(json!("Ada")))
        })
    }
}

async fn ask_name(_args: Arguments, mut ctx: Context) -> Result<ElicitationOutcome, HandlerError> {
    Ok(ctx.elicit("What is your name?", Some(ParamType::String)).await)
}

async fn confirm_then_name(_args: Arguments, mut ctx: Context) -> Result<Value, HandlerError> {
    let confirmed = ctx
        .elicit_request(ElicitationRequest::confirm("Proceed?"))
        .await
        .into_result()?;
    if confirmed != json!(true) {
        return Ok(json!({ "status": "skipped" }));
    }
    let name = ctx
        .elicit_request(ElicitationRequest::text("Name?"))
        .await
        .into_result()?;
    Ok(json!({ "status": "done", "name": name }))
}

fn dispatcher(config: DispatcherConfig) -> Result<Arc<Dispatcher>, RegistryError> {
    let mut registry = Registry::new();
    registry.register_tool(ToolDefinition::new("ask_name"), ask_name)?;
    registry.register_tool(ToolDefinition::new("confirm_then_name"), confirm_then_name)?;
    Ok(Arc::new(Dispatcher::with_config(registry, config)))
}

async fn call(
    dispatcher: &Dispatcher,
    name: &str,
    channel: Arc<dyn ElicitationChannel>,
    cancel: CancellationToken,
) -> ResponseBody {
    dispatcher
        .handle(
            RequestId::from("req-1"),
            Request::CallTool {
                name: name.to_string(),
                arguments: Map::new(),
            },
            channel,
            cancel,
        )
        .await
}

#[tokio::test]
async fn test_accept_with_expected_shape() -> Result<(), Box<dyn std::error::Error>> {
    let d = dispatcher(DispatcherConfig::default())?;
    let channel = Scripted::new(vec![ElicitationResponse::accept(json!("Ada"))]);

    let body = call(&d, "ask_name", channel.clone(), CancellationToken::new()).await;
    assert_eq!(
        body.result(),
        Some(&json!({ "outcome": "accepted", "data": "Ada" }))
    );

    let asked = channel.asked();
    assert_eq!(asked.len(), 1);
    assert_eq!(asked[0].0, RequestId::from("req-1"));
    assert_eq!(asked[0].1.prompt, "What is your name?");
    assert_eq!(asked[0].1.expected_shape, Some(ParamType::String));
    Ok(())
}

#[tokio::test]
async fn test_shape_mismatch_resolves_cancelled() -> Result<(), Box<dyn std::error::Error>> {
    let d = dispatcher(DispatcherConfig::default())?;
    let channel = Scripted::new(vec![ElicitationResponse::accept(json!(42))]);

    let body = call(&d, "ask_name", channel, CancellationToken::new()).await;
    assert_eq!(body.result(), Some(&json!({ "outcome": "cancelled" })));
    Ok(())
}

#[tokio::test]
async fn test_decline_is_an_ordinary_outcome() -> Result<(), Box<dyn std::error::Error>> {
    let d = dispatcher(DispatcherConfig::default())?;
    let channel = Scripted::new(vec![ElicitationResponse::decline()]);

    let body = call(&d, "ask_name", channel, CancellationToken::new()).await;
    assert_eq!(body.result(), Some(&json!({ "outcome": "declined" })));
    Ok(())
}

#[tokio::test]
async fn test_closed_channel_resolves_cancelled() -> Result<(), Box<dyn std::error::Error>> {
    let d = dispatcher(DispatcherConfig::default())?;

    let body = call(&d, "ask_name", Arc::new(NoElicitation), CancellationToken::new()).await;
    assert_eq!(body.result(), Some(&json!({ "outcome": "cancelled" })));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_deadline_resolves_cancelled() -> Result<(), Box<dyn std::error::Error>> {
    let config = DispatcherConfig::default().with_elicitation_timeout(Duration::from_secs(2));
    let d = dispatcher(config)?;

    let started = tokio::time::Instant::now();
    let body = call(&d, "ask_name", Arc::new(Silent), CancellationToken::new()).await;
    assert_eq!(body.result(), Some(&json!({ "outcome": "cancelled" })));
    assert!(started.elapsed() >= Duration::from_secs(2));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_sub_second_deadline_allows_prompt_answer() -> Result<(), Box<dyn std::error::Error>> {
    let config = DispatcherConfig::default().with_elicitation_timeout(Duration::from_millis(500));
    let d = dispatcher(config)?;

    let channel = Arc::new(Slow(Duration::from_millis(10)));
    let body = call(&d, "ask_name", channel, CancellationToken::new()).await;
    assert_eq!(
        body.result(),
        Some(&json!({ "outcome": "accepted", "data": "Ada" }))
    );
    Ok(())
}

#[tokio::test]
async fn test_cancellation_resolves_awaiting_session() -> Result<(), Box<dyn std::error::Error>> {
    let d = dispatcher(DispatcherConfig::default())?;
    let cancel = CancellationToken::new();

    let task = {
        let d = Arc::clone(&d);
        let cancel = cancel.clone();
        tokio::spawn(async move { call(&d, "ask_name", Arc::new(Silent), cancel).await })
    };
    tokio::task::yield_now().await;
    cancel.cancel();

    let body = task.await?;
    assert_eq!(body.result(), Some(&json!({ "outcome": "cancelled" })));
    Ok(())
}

#[tokio::test]
async fn test_sequential_sessions() -> Result<(), Box<dyn std::error::Error>> {
    let d = dispatcher(DispatcherConfig::default())?;
    let channel = Scripted::new(vec![
        ElicitationResponse::accept(json!({ "value": true })),
        ElicitationResponse::accept(json!("Grace")),
    ]);

    let body = call(&d, "confirm_then_name", channel.clone(), CancellationToken::new()).await;
    assert_eq!(
        body.result(),
        Some(&json!({ "status": "done", "name": "Grace" }))
    );

    let prompts: Vec<String> = channel.asked().into_iter().map(|(_, r)| r.prompt).collect();
    assert_eq!(prompts, vec!["Proceed?", "Name?"]);
    Ok(())
}

#[tokio::test]
async fn test_propagated_decline_ends_request() -> Result<(), Box<dyn std::error::Error>> {
    let d = dispatcher(DispatcherConfig::default())?;
    let channel = Scripted::new(vec![ElicitationResponse::decline()]);

    let body = call(&d, "confirm_then_name", channel.clone(), CancellationToken::new()).await;
    let err = body.error().ok_or("expected an error body")?;
    assert_eq!(err.kind, "declined");

    // The second session never opened.
    assert_eq!(channel.asked().len(), 1);
    Ok(())
}
