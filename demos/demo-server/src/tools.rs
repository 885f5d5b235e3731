//! Demo tools.

use dispatchkit::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

/// How long the simulated profile lookup blocks its worker.
const PROFILE_LOOKUP_DELAY: Duration = Duration::from_millis(500);

/// A user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub age: i64,
    pub email: String,
}

/// Arguments of `process_image`.
#[derive(Debug, Deserialize)]
struct ProcessImage {
    image_url: String,
    resize: bool,
    width: u32,
    format: String,
}

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_tool(
        ToolDefinition::new("get_person_profile")
            .description("Get a user's profile information.")
            .param(ParameterSpec::string("user_id"))
            .returns(ParamType::record(vec![
                ParameterSpec::string("name"),
                ParameterSpec::integer("age"),
                ParameterSpec::string("email"),
            ]))
            .annotations(
                ToolAnnotations::read_only()
                    .with_title("person profile retrieval")
                    .with_destructive(false)
                    .with_idempotent(false)
                    .with_open_world(false),
            ),
        get_person_profile,
    )?;

    registry.register_tool(
        ToolDefinition::new("greet")
            .param(ParameterSpec::string("name"))
            .returns(ParamType::String),
        greet,
    )?;

    registry.register_tool(
        ToolDefinition::new("process_image")
            .description("Process an image with optional resizing.")
            .param(ParameterSpec::string("image_url").description("URL of the image to process"))
            .param(
                ParameterSpec::boolean("resize")
                    .description("Whether to resize the image")
                    .default_value(false),
            )
            .param(
                ParameterSpec::integer("width")
                    .description("Target width in pixels")
                    .ge(1.0)
                    .le(2000.0)
                    .default_value(800),
            )
            .param(
                ParameterSpec::string("format")
                    .description("Output image format")
                    .allowed_values(["jpeg", "png", "webp"])
                    .default_value("jpeg"),
            ),
        process_image,
    )?;

    registry.register_tool(
        ToolDefinition::new("pattern_example")
            .description("Ask for approval, then for a response.")
            .returns(ParamType::String),
        pattern_example,
    )?;

    Ok(())
}

async fn get_person_profile(args: Arguments, ctx: Context) -> Result<Person, HandlerError> {
    let user_id: String = args.get("user_id")?;
    tracing::debug!(%user_id, "Looking up profile");

    ctx.run_blocking(|| {
        std::thread::sleep(PROFILE_LOOKUP_DELAY);
        for step in 0..5 {
            tracing::debug!(step, "Working");
        }
    })
    .await?;

    Ok(Person {
        name: "Alice".to_string(),
        age: 30,
        email: "alice@example.com".to_string(),
    })
}

async fn greet(args: Arguments, _ctx: Context) -> Result<String, HandlerError> {
    let name: String = args.get("name")?;
    Ok(format!("Hello, {name}!"))
}

async fn process_image(args: Arguments, _ctx: Context) -> Result<Value, HandlerError> {
    let ProcessImage {
        image_url,
        resize,
        width,
        format,
    } = args.parse()?;

    let target_width = if resize {
        width.to_string()
    } else {
        "original".to_string()
    };
    Ok(json!({
        "original_url": image_url,
        "processed_url": format!("{image_url}?format={format}&width={target_width}"),
        "resized": resize,
        "format": format,
    }))
}

async fn pattern_example(_args: Arguments, mut ctx: Context) -> Result<String, HandlerError> {
    let approval = ctx.elicit("Approve this action?", None).await;
    if approval == ElicitationOutcome::Declined {
        return Ok("Action not approved".to_string());
    }

    let reply = match ctx
        .elicit("Enter your response:", Some(ParamType::String))
        .await
    {
        ElicitationOutcome::Accepted { data } => {
            format!("Hello {}!", data.as_str().unwrap_or_default())
        }
        ElicitationOutcome::Declined => "No name provided".to_string(),
        ElicitationOutcome::Cancelled => "Operation cancelled".to_string(),
    };
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatchkit::server::ChannelClosed;
    use pretty_assertions::assert_eq;
    use serde_json::Map;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};

    struct Answers(Mutex<Vec<ElicitationResponse>>);

    impl ElicitationChannel for Answers {
        fn request(
            &self,
            _id: RequestId,
            _request: ElicitationRequest,
        ) -> Pin<Box<dyn Future<Output = Result<ElicitationResponse, ChannelClosed>> + Send + '_>>
        {
            let mut answers = self.0.lock().unwrap();
            let answer = if answers.is_empty() {
                Err(ChannelClosed)
            } else {
                Ok(answers.remove(0))
            };
            Box::pin(async move { answer })
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut registry = Registry::new();
        register(&mut registry).unwrap();
        Dispatcher::new(registry)
    }

    async fn call(name: &str, arguments: Value, answers: Vec<ElicitationResponse>) -> ResponseBody {
        dispatcher()
            .handle(
                RequestId::Number(1),
                Request::CallTool {
                    name: name.to_string(),
                    arguments: arguments.as_object().cloned().unwrap_or_else(Map::new),
                },
                Arc::new(Answers(Mutex::new(answers))),
                CancellationToken::new(),
            )
            .await
    }

    #[tokio::test]
    async fn test_process_image_defaults() {
        let body = call("process_image", json!({ "image_url": "http://x/cat.png" }), vec![]).await;
        assert_eq!(
            body.result().unwrap(),
            &json!({
                "original_url": "http://x/cat.png",
                "processed_url": "http://x/cat.png?format=jpeg&width=original",
                "resized": false,
                "format": "jpeg",
            })
        );
    }

    #[tokio::test]
    async fn test_process_image_rejects_unknown_format() {
        let body = call(
            "process_image",
            json!({ "image_url": "u", "format": "gif" }),
            vec![],
        )
        .await;
        assert_eq!(body.error().unwrap().kind, "constraint_violation");
    }

    #[tokio::test]
    async fn test_person_profile_runs_on_pool() {
        let body = call("get_person_profile", json!({ "user_id": "7" }), vec![]).await;
        assert_eq!(
            body.result().unwrap(),
            &json!({ "name": "Alice", "age": 30, "email": "alice@example.com" })
        );
    }

    #[tokio::test]
    async fn test_pattern_example_paths() {
        let body = call(
            "pattern_example",
            json!({}),
            vec![
                ElicitationResponse::accept(Value::Null),
                ElicitationResponse::accept(json!("Bob")),
            ],
        )
        .await;
        assert_eq!(body.result(), Some(&json!("Hello Bob!")));

        let body = call("pattern_example", json!({}), vec![ElicitationResponse::decline()]).await;
        assert_eq!(body.result(), Some(&json!("Action not approved")));

        let body = call(
            "pattern_example",
            json!({}),
            vec![ElicitationResponse::accept(Value::Null), ElicitationResponse::cancel()],
        )
        .await;
        assert_eq!(body.result(), Some(&json!("Operation cancelled")));
    }
}
