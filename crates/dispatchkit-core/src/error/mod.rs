//! Error taxonomy for the dispatch core.
//!
//! Errors fall into two groups with different propagation rules:
//!
//! - **Startup errors** ([`TemplateError`], [`RegistryError`]) come out of
//!   registration. They are fatal: a server with a malformed template or a
//!   duplicated name must not start.
//! - **Per-request errors** ([`RoutingError`], [`CoercionError`],
//!   [`HandlerError`]) are gathered into [`DispatchError`] at the dispatcher
//!   boundary and turned into an [`ErrorBody`] for the caller. They never
//!   crash the process or affect other in-flight requests.
//!
//! Elicitation outcomes (`Declined`, `Cancelled`) are not errors. A handler
//! only produces [`HandlerError::Declined`] or [`HandlerError::Cancelled`]
//! when it chooses to propagate an outcome with `?`.
//!
//! All types derive [`miette::Diagnostic`] so startup failures render with
//! codes and help text.
//!
//! ```rust
//! use dispatchkit_core::error::{CoercionError, DispatchError, ErrorBody, codes};
//!
//! let err: DispatchError = CoercionError::MissingParameter { name: "user_id".into() }.into();
//! let body = ErrorBody::from(&err);
//! assert_eq!(body.kind, "missing_parameter");
//! assert_eq!(body.code, codes::INVALID_PARAMS);
//! ```

pub mod codes;
mod coercion;
mod context;
mod template;
mod types;
mod wire;

pub use coercion::{CoercionError, Constraint};
pub use context::DispatchResultExt;
pub use template::TemplateError;
pub use types::{BoxError, DispatchError, HandlerError, RegistryError, RoutingError};
pub use wire::ErrorBody;
