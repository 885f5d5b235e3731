//! Request dispatcher.
//!
//! [`Dispatcher::handle`] runs one request end to end:
//!
//! 1. resolve the definition (by name, or by URI for resources);
//! 2. coerce the raw arguments against its parameter specs;
//! 3. invoke the handler with the typed arguments and a fresh [`Context`];
//! 4. turn the result, or any error, into a [`ResponseBody`].
//!
//! Every failure, including a handler panic, is caught here and reported
//! to the caller. Nothing escapes to affect other requests.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Instrument;

use dispatchkit_core::coerce::{coerce, coerce_value};
use dispatchkit_core::error::{DispatchError, DispatchResultExt};
use dispatchkit_core::protocol::{Request, RequestId, ResponseBody};
use dispatchkit_core::types::Namespace;

use crate::blocking::BlockingPool;
use crate::config::DispatcherConfig;
use crate::context::{CancellationToken, Context};
use crate::elicitation::ElicitationChannel;
use crate::handler::Arguments;
use crate::registry::{Definition, Registry};

/// Dispatches requests against a shared, read-only registry.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    config: DispatcherConfig,
    pool: BlockingPool,
}

impl Dispatcher {
    /// Create a dispatcher with default configuration.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self::with_config(registry, DispatcherConfig::default())
    }

    /// Create a dispatcher with the given configuration.
    #[must_use]
    pub fn with_config(registry: Registry, config: DispatcherConfig) -> Self {
        let pool = BlockingPool::new(config.effective_workers());
        Self {
            registry: Arc::new(registry),
            config,
            pool,
        }
    }

    /// The registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Handle one request and produce its response body.
    ///
    /// `channel` carries this request's elicitations; `cancel` is fired by
    /// the transport when the caller cancels or disconnects.
    pub async fn handle(
        &self,
        id: RequestId,
        request: Request,
        channel: Arc<dyn ElicitationChannel>,
        cancel: CancellationToken,
    ) -> ResponseBody {
        let span = tracing::info_span!("request", id = %id, method = request.method());
        async move {
            tracing::debug!(target_name = request.target(), "Processing");

            let outcome = AssertUnwindSafe(self.dispatch(id, request, channel, cancel))
                .catch_unwind()
                .await;
            let body = match outcome {
                Ok(Ok(body)) => body,
                Ok(Err(err)) => {
                    if err.is_cancelled() {
                        tracing::debug!(error = %err, "Request cancelled");
                    } else {
                        tracing::warn!(kind = err.kind(), code = err.code(), error = %err, "Request failed");
                    }
                    ResponseBody::from(err)
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::warn!(panic = %message, "Handler panicked");
                    ResponseBody::from(DispatchError::internal(format!(
                        "handler panicked: {message}"
                    )))
                }
            };

            tracing::debug!(is_error = body.is_error(), "Completed");
            body
        }
        .instrument(span)
        .await
    }

    async fn dispatch(
        &self,
        id: RequestId,
        request: Request,
        channel: Arc<dyn ElicitationChannel>,
        cancel: CancellationToken,
    ) -> Result<ResponseBody, DispatchError> {
        match request {
            Request::CallTool { name, arguments } => {
                let Definition::Tool(entry) = self.registry.resolve_by_name(Namespace::Tool, &name)?
                else {
                    return Err(DispatchError::internal(format!(
                        "'{name}' did not resolve to a tool"
                    )));
                };
                let args = coerce(&arguments, &entry.definition.params)
                    .with_context(|| format!("tool '{name}'"))?;

                let ctx = self.context(id, channel, cancel);
                let value = (entry.handler)(Arguments::new(args), ctx).await?;

                let value = match &entry.definition.return_type {
                    Some(return_type) => coerce_value("result", return_type, &value).map_err(|err| {
                        DispatchError::internal_with_source(
                            format!("tool '{name}' returned a value that is not a {return_type}"),
                            err,
                        )
                    })?,
                    None => value,
                };
                Ok(ResponseBody::Result(value))
            }
            Request::ReadResource { uri } => {
                let (entry, matched) = self.registry.resolve_by_uri(&uri)?;
                let raw = matched.into_arguments();
                let args = coerce(&raw, &entry.params)
                    .with_context(|| format!("resource '{}'", entry.definition.name))?;

                let ctx = self.context(id, channel, cancel);
                let value = (entry.handler)(Arguments::new(args), ctx).await?;
                Ok(ResponseBody::Result(value))
            }
            Request::GetPrompt { name, arguments } => {
                let Definition::Prompt(entry) =
                    self.registry.resolve_by_name(Namespace::Prompt, &name)?
                else {
                    return Err(DispatchError::internal(format!(
                        "'{name}' did not resolve to a prompt"
                    )));
                };
                let args = coerce(&arguments, &entry.definition.params)
                    .with_context(|| format!("prompt '{name}'"))?;

                let ctx = self.context(id, channel, cancel);
                let messages = (entry.handler)(Arguments::new(args), ctx).await?;
                if messages.is_empty() {
                    return Err(DispatchError::internal(format!(
                        "prompt '{name}' returned no messages"
                    )));
                }
                Ok(ResponseBody::Messages(messages))
            }
            Request::ListDefinitions => Ok(ResponseBody::Result(self.registry.catalog())),
        }
    }

    fn context(
        &self,
        id: RequestId,
        channel: Arc<dyn ElicitationChannel>,
        cancel: CancellationToken,
    ) -> Context {
        Context::new(
            id,
            channel,
            cancel,
            self.pool.clone(),
            self.config.elicitation_timeout(),
        )
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elicitation::NoElicitation;
    use dispatchkit_core::error::{HandlerError, codes};
    use dispatchkit_core::schema::{ParamType, ParameterSpec};
    use dispatchkit_core::types::{Message, PromptDefinition, ResourceDefinition, ToolDefinition};
    use serde_json::{Map, Value, json};

    fn dispatcher() -> Dispatcher {
        let mut registry = Registry::new();
        registry
            .register_tool(
                ToolDefinition::new("resize")
                    .param(ParameterSpec::integer("width").ge(1.0).le(2000.0).default_value(800)),
                |args: Arguments, _ctx: Context| async move {
                    let width: i64 = args.get("width")?;
                    Ok(json!({ "width": width }))
                },
            )
            .unwrap();
        registry
            .register_tool(
                ToolDefinition::new("explode"),
                |_args: Arguments, _ctx: Context| async move {
                    if true {
                        panic!("kaboom");
                    }
                    Ok(Value::Null)
                },
            )
            .unwrap();
        registry
            .register_tool(
                ToolDefinition::new("liar").returns(ParamType::Integer),
                |_args: Arguments, _ctx: Context| async move { Ok("not a number") },
            )
            .unwrap();
        registry
            .register_tool(
                ToolDefinition::new("fails"),
                |_args: Arguments, _ctx: Context| async move {
                    Err::<Value, _>(HandlerError::failed("upstream unavailable"))
                },
            )
            .unwrap();
        registry
            .register_resource(
                ResourceDefinition::new("user_profile", "users://{user_id}/profile")
                    .param(ParameterSpec::integer("user_id")),
                |args: Arguments, _ctx: Context| async move {
                    let id: i64 = args.get("user_id")?;
                    Ok(json!({ "id": id }))
                },
            )
            .unwrap();
        registry
            .register_prompt(
                PromptDefinition::new("greeting").param(ParameterSpec::string("name")),
                |args: Arguments, _ctx: Context| async move {
                    let name: String = args.get("name")?;
                    Ok(Message::user(format!("Say hello to {name}")))
                },
            )
            .unwrap();
        registry
            .register_prompt(
                PromptDefinition::new("silent"),
                |_args: Arguments, _ctx: Context| async move { Ok(Vec::<Message>::new()) },
            )
            .unwrap();
        Dispatcher::new(registry)
    }

    async fn call(dispatcher: &Dispatcher, request: Request) -> ResponseBody {
        dispatcher
            .handle(
                RequestId::Number(1),
                request,
                Arc::new(NoElicitation),
                CancellationToken::new(),
            )
            .await
    }

    fn tool(name: &str, arguments: Value) -> Request {
        Request::CallTool {
            name: name.into(),
            arguments: arguments.as_object().cloned().unwrap_or_else(Map::new),
        }
    }

    #[tokio::test]
    async fn test_default_and_constraint() {
        let d = dispatcher();
        let body = call(&d, tool("resize", json!({}))).await;
        assert_eq!(body.result(), Some(&json!({ "width": 800 })));

        let body = call(&d, tool("resize", json!({ "width": 3000 }))).await;
        let err = body.error().unwrap();
        assert_eq!(err.kind, "constraint_violation");
        assert_eq!(err.code, codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let d = dispatcher();
        let body = call(&d, tool("nope", json!({}))).await;
        assert_eq!(body.error().unwrap().kind, "not_found");
    }

    #[tokio::test]
    async fn test_panic_becomes_internal() {
        let d = dispatcher();
        let body = call(&d, tool("explode", json!({}))).await;
        let err = body.error().unwrap();
        assert_eq!(err.kind, "internal");
        assert!(err.message.contains("kaboom"));

        // The dispatcher keeps serving.
        let body = call(&d, tool("resize", json!({ "width": 10 }))).await;
        assert!(!body.is_error());
    }

    #[tokio::test]
    async fn test_return_type_mismatch_is_internal() {
        let d = dispatcher();
        let body = call(&d, tool("liar", json!({}))).await;
        assert_eq!(body.error().unwrap().kind, "internal");
    }

    #[tokio::test]
    async fn test_handler_error() {
        let d = dispatcher();
        let body = call(&d, tool("fails", json!({}))).await;
        let err = body.error().unwrap();
        assert_eq!(err.kind, "handler_error");
        assert!(err.message.contains("upstream unavailable"));
    }

    #[tokio::test]
    async fn test_resource_path_coercion() {
        let d = dispatcher();
        let body = call(
            &d,
            Request::ReadResource {
                uri: "users://42/profile".into(),
            },
        )
        .await;
        assert_eq!(body.result(), Some(&json!({ "id": 42 })));

        let body = call(
            &d,
            Request::ReadResource {
                uri: "users://abc/profile".into(),
            },
        )
        .await;
        assert_eq!(body.error().unwrap().kind, "type_mismatch");

        let body = call(
            &d,
            Request::ReadResource {
                uri: "groups://1".into(),
            },
        )
        .await;
        assert_eq!(body.error().unwrap().kind, "no_match");
    }

    fn prompt(name: &str, arguments: Value) -> Request {
        Request::GetPrompt {
            name: name.into(),
            arguments: arguments.as_object().cloned().unwrap_or_else(Map::new),
        }
    }

    #[tokio::test]
    async fn test_prompt_lookup() {
        let d = dispatcher();
        let body = call(&d, prompt("greeting", json!({ "name": "Ada" }))).await;
        assert_eq!(
            body,
            ResponseBody::Messages(vec![Message::user("Say hello to Ada")])
        );

        let body = call(&d, prompt("nope", json!({}))).await;
        let err = body.error().unwrap();
        assert_eq!(err.kind, "not_found");
        assert!(err.message.contains("nope"));

        // Names are looked up per namespace.
        let body = call(&d, prompt("resize", json!({}))).await;
        assert_eq!(body.error().unwrap().kind, "not_found");
    }

    #[tokio::test]
    async fn test_empty_prompt_is_internal() {
        let d = dispatcher();
        let body = call(&d, prompt("silent", json!({}))).await;
        let err = body.error().unwrap();
        assert_eq!(err.kind, "internal");
        assert!(err.message.contains("no messages"));
    }

    #[tokio::test]
    async fn test_list_definitions() {
        let d = dispatcher();
        let body = call(&d, Request::ListDefinitions).await;
        let catalog = body.result().unwrap();
        assert_eq!(catalog["tools"].as_array().unwrap().len(), 4);
        assert_eq!(catalog["resources"][0]["name"], "user_profile");
    }
}
