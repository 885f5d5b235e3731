//! Server side of dispatchkit.
//!
//! This crate turns the definitions and envelopes of `dispatchkit-core` into
//! a running dispatcher:
//!
//! 1. Populate a [`Registry`] with tools, resources and prompts at startup
//! 2. Wrap it in a [`Dispatcher`] with a [`DispatcherConfig`]
//! 3. Feed it requests, either directly with [`Dispatcher::handle`] or over a
//!    line-delimited connection with [`serve`]
//!
//! Handlers receive coerced [`Arguments`] and an owned [`Context`], through
//! which they can [elicit](Context::elicit) input from the caller or
//! [offload blocking work](Context::run_blocking).
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use dispatchkit_core::prelude::*;
//! use dispatchkit_server::{Arguments, CancellationToken, Context, Dispatcher, NoElicitation, Registry};
//!
//! # tokio_test_runtime();
//! # fn tokio_test_runtime() {
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let mut registry = Registry::new();
//! registry
//!     .register_tool(
//!         ToolDefinition::new("greet").param(ParameterSpec::string("name")),
//!         |args: Arguments, _ctx: Context| async move {
//!             let name: String = args.get("name")?;
//!             Ok(format!("Hello, {name}!"))
//!         },
//!     )
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::new(registry);
//! let body = dispatcher
//!     .handle(
//!         RequestId::Number(1),
//!         Request::CallTool {
//!             name: "greet".into(),
//!             arguments: serde_json::json!({ "name": "Ada" }).as_object().unwrap().clone(),
//!         },
//!         Arc::new(NoElicitation),
//!         CancellationToken::new(),
//!     )
//!     .await;
//! assert_eq!(body.result(), Some(&serde_json::json!("Hello, Ada!")));
//! # });
//! # }
//! ```

#![deny(missing_docs)]

pub mod blocking;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod elicitation;
pub mod handler;
pub mod registry;
pub mod runtime;

pub use blocking::BlockingPool;
pub use config::DispatcherConfig;
pub use context::{CancellationToken, Context};
pub use dispatcher::Dispatcher;
pub use elicitation::{
    ChannelClosed, ElicitationChannel, ElicitationSession, Elicitor, NoElicitation, Resolution,
    SessionError, SessionState,
};
pub use handler::{Arguments, BoxedHandler, BoxedPromptHandler};
pub use registry::{Definition, PromptEntry, Registry, ResourceEntry, ToolEntry};
pub use runtime::{ConnectionChannel, serve, serve_stdio};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        Arguments, CancellationToken, Context, Dispatcher, DispatcherConfig, ElicitationChannel,
        NoElicitation, Registry, serve, serve_stdio,
    };
}
