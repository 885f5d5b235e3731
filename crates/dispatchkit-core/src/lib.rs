//! # dispatchkit-core
//!
//! Runtime-agnostic building blocks for a capability dispatch server:
//!
//! - **URI templates**: compile, match and expand resource templates
//! - **Parameter model**: declared parameter types, defaults and constraints
//! - **Coercion**: atomic conversion of untyped input to declared types
//! - **Definitions**: tool, resource and prompt metadata
//! - **Protocol**: request/response envelopes and the elicitation sub-protocol
//! - **Errors**: the startup and per-request error taxonomy
//!
//! This crate does not depend on any async runtime.
//!
//! # Example
//!
//! ```rust
//! use dispatchkit_core::prelude::*;
//!
//! let template = UriTemplate::compile("users://{user_id}/profile").unwrap();
//! let raw = template.matches("users://42/profile").unwrap().into_arguments();
//!
//! let args = coerce(&raw, &[ParameterSpec::integer("user_id")]).unwrap();
//! assert_eq!(args["user_id"], 42);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_name_repetitions)]

pub mod coerce;
pub mod error;
pub mod protocol;
pub mod schema;
pub mod template;
pub mod types;

pub use coerce::{coerce, coerce_value};
pub use error::{DispatchError, DispatchResultExt, ErrorBody, HandlerError};
pub use protocol::{ClientMessage, Request, RequestId, ResponseBody, ServerMessage};
pub use template::{TemplateMatch, UriTemplate};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use dispatchkit_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::coerce::{coerce, coerce_value};
    pub use crate::error::{
        CoercionError, Constraint, DispatchError, DispatchResultExt, ErrorBody, HandlerError,
        RegistryError, RoutingError, TemplateError,
    };
    pub use crate::protocol::{ClientMessage, Request, RequestId, ResponseBody, ServerMessage};
    pub use crate::schema::{ParamType, ParameterSpec};
    pub use crate::template::{TemplateMatch, UriTemplate};
    pub use crate::types::{
        ElicitAction, ElicitationOutcome, ElicitationRequest, ElicitationResponse, IntoMessages,
        Message, Namespace, PromptDefinition, ResourceDefinition, Role, ToolAnnotations,
        ToolDefinition,
    };
}
