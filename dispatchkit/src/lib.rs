//! # dispatchkit
//!
//! Typed request dispatch for capability servers: register tools, URI
//! addressed resources and prompts; route and coerce incoming requests; let
//! handlers pause to ask the caller for input.
//!
//! ## Features
//!
//! - **URI templates** with path variables and a trailing query block,
//!   first-registered-wins resolution
//! - **Atomic coercion** of untyped input to declared parameter types,
//!   defaults and constraints
//! - **Elicitation** sessions with accept/decline/cancel outcomes, deadlines
//!   and cancellation
//! - **Bounded blocking pool** for handler work that must not stall the
//!   scheduler
//! - **Rich errors** with stable wire kinds and miette diagnostics
//!
//! ## Quick Start
//!
//! ```no_run
//! use dispatchkit::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let mut registry = Registry::new();
//!     registry
//!         .register_resource(
//!             ResourceDefinition::new("user_profile", "users://{user_id}/profile")
//!                 .param(ParameterSpec::integer("user_id")),
//!             |args: Arguments, _ctx: Context| async move {
//!                 let id: i64 = args.get("user_id")?;
//!                 Ok(serde_json::json!({ "id": id, "name": format!("User {id}") }))
//!             },
//!         )
//!         .expect("valid template");
//!
//!     serve_stdio(Arc::new(Dispatcher::new(registry))).await
//! }
//! ```
//!
//! ## Crate Organization
//!
//! - [`dispatchkit_core`] - Templates, coercion, definitions, envelopes and
//!   errors (no async runtime)
//! - [`dispatchkit_server`] - Registry, dispatcher, elicitation sessions and
//!   the connection runtime

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_name_repetitions)]

// Re-export all public items from core
pub use dispatchkit_core::*;

// Re-export server types
pub use dispatchkit_server::{
    Arguments, BlockingPool, CancellationToken, ConnectionChannel, Context, Dispatcher,
    DispatcherConfig, ElicitationChannel, ElicitationSession, NoElicitation, Registry, serve,
    serve_stdio,
};

/// Server internals, for implementing custom transports.
pub mod server {
    pub use dispatchkit_server::*;
}

pub mod prelude;
