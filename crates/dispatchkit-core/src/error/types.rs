//! Registration, routing, handler and dispatch error types.

use miette::Diagnostic;
use thiserror::Error;

use super::codes;
use super::coercion::CoercionError;
use super::template::TemplateError;
use crate::types::Namespace;

/// Type alias for boxed errors that are Send + Sync.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A definition could not be registered.
///
/// Registration errors are fatal at startup.
#[derive(Error, Diagnostic, Debug)]
pub enum RegistryError {
    /// A definition with the same name already exists in its namespace.
    #[error("{namespace} '{name}' is already registered")]
    #[diagnostic(
        code(dispatch::registry::duplicate_name),
        help("names are unique per namespace; re-registration is not supported")
    )]
    DuplicateName {
        /// The namespace of the clash.
        namespace: Namespace,
        /// The duplicated name.
        name: String,
    },

    /// A resource template failed to compile.
    #[error("invalid resource template '{template}'")]
    #[diagnostic(code(dispatch::registry::template))]
    Template {
        /// The template text.
        template: String,
        /// The compile error.
        #[source]
        #[diagnostic_source]
        source: TemplateError,
    },

    /// Two parameters of one definition share a name.
    #[error("{namespace} '{definition}' declares parameter '{parameter}' twice")]
    #[diagnostic(code(dispatch::registry::duplicate_parameter))]
    DuplicateParameter {
        /// Namespace of the definition.
        namespace: Namespace,
        /// The definition name.
        definition: String,
        /// The repeated parameter.
        parameter: String,
    },

    /// A resource parameter names no variable of its template.
    #[error("resource '{definition}' declares parameter '{parameter}' not present in its template")]
    #[diagnostic(
        code(dispatch::registry::unbound_parameter),
        help("resource parameters are bound from the URI; add '{{{parameter}}}' or a query key to the template")
    )]
    UnboundParameter {
        /// The resource name.
        definition: String,
        /// The parameter with nothing to bind from.
        parameter: String,
    },
}

/// An incoming request did not resolve to a definition.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// No definition with that name in the namespace.
    #[error("unknown {namespace} '{name}'")]
    #[diagnostic(code(dispatch::routing::not_found))]
    NotFound {
        /// The namespace searched.
        namespace: Namespace,
        /// The requested name.
        name: String,
    },

    /// No resource template matched the URI.
    #[error("no resource matches '{uri}'")]
    #[diagnostic(
        code(dispatch::routing::no_match),
        help("verify the URI against the advertised resource templates")
    )]
    NoMatch {
        /// The requested URI.
        uri: String,
    },
}

/// A domain error raised by a handler body.
///
/// `Declined` and `Cancelled` exist so handlers can propagate an elicitation
/// outcome with `?`; handlers that want to continue simply match on the
/// outcome instead.
#[derive(Error, Diagnostic, Debug)]
pub enum HandlerError {
    /// The handler failed with a message and optional structured data.
    #[error("{message}")]
    #[diagnostic(code(dispatch::handler::failed))]
    Failed {
        /// Human-readable message.
        message: String,
        /// Additional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Coerced arguments could not be deserialized into the handler's type.
    #[error("invalid arguments: {0}")]
    #[diagnostic(code(dispatch::handler::invalid_arguments))]
    InvalidArguments(#[source] serde_json::Error),

    /// The caller declined a required elicitation.
    #[error("the caller declined the request for input")]
    #[diagnostic(code(dispatch::handler::declined))]
    Declined,

    /// The request was cancelled while the handler was running.
    #[error("request cancelled")]
    #[diagnostic(code(dispatch::handler::cancelled))]
    Cancelled,

    /// Work handed to the blocking pool failed to complete.
    #[error("blocking task failed: {message}")]
    #[diagnostic(code(dispatch::handler::blocking))]
    Blocking {
        /// Why the task failed (panic, pool shut down).
        message: String,
    },
}

impl HandlerError {
    /// Create a failure with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            data: None,
        }
    }

    /// Create a failure with a message and structured data.
    pub fn failed_with_data(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self::Failed {
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Per-request error caught at the dispatcher boundary.
///
/// Every variant is recoverable from the server's point of view: it is turned
/// into an error envelope for the caller and never affects other requests.
#[derive(Error, Diagnostic, Debug)]
pub enum DispatchError {
    /// The request did not resolve to a definition.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Routing(#[from] RoutingError),

    /// The arguments did not coerce.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Coercion(#[from] CoercionError),

    /// The handler reported a domain error.
    #[error("handler '{definition}' failed: {source}")]
    #[diagnostic(code(dispatch::handler::error))]
    Handler {
        /// The definition whose handler failed.
        definition: String,
        /// The handler error.
        #[source]
        source: HandlerError,
    },

    /// The envelope itself is unacceptable (for example a duplicate id).
    #[error("invalid request: {message}")]
    #[diagnostic(code(dispatch::protocol::invalid_request))]
    InvalidRequest {
        /// Human-readable message.
        message: String,
    },

    /// Internal failure (handler panic, unserializable result).
    #[error("internal error: {message}")]
    #[diagnostic(code(dispatch::internal), severity(error))]
    Internal {
        /// Human-readable message.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<BoxError>,
    },

    /// Error with additional context.
    #[error("{context}: {source}")]
    #[diagnostic(code(dispatch::context))]
    WithContext {
        /// Context message.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<DispatchError>,
    },
}

impl DispatchError {
    /// Create a handler error for a named definition.
    pub fn handler(definition: impl Into<String>, source: HandlerError) -> Self {
        Self::Handler {
            definition: definition.into(),
            source,
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error wrapping a source error.
    pub fn internal_with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The innermost error, looking through context wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Numeric wire code.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self.root() {
            Self::Routing(RoutingError::NotFound { .. }) => codes::METHOD_NOT_FOUND,
            Self::Routing(RoutingError::NoMatch { .. }) => codes::RESOURCE_NOT_FOUND,
            Self::Coercion(_) => codes::INVALID_PARAMS,
            Self::Handler {
                source: HandlerError::Cancelled | HandlerError::Declined,
                ..
            } => codes::REQUEST_CANCELLED,
            Self::Handler {
                source: HandlerError::InvalidArguments(_),
                ..
            } => codes::INVALID_PARAMS,
            Self::Handler { .. } => codes::HANDLER_ERROR,
            Self::InvalidRequest { .. } => codes::INVALID_REQUEST,
            Self::Internal { .. } | Self::WithContext { .. } => codes::INTERNAL_ERROR,
        }
    }

    /// Stable snake_case wire kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self.root() {
            Self::Routing(RoutingError::NotFound { .. }) => "not_found",
            Self::Routing(RoutingError::NoMatch { .. }) => "no_match",
            Self::Coercion(err) => err.kind(),
            Self::Handler { source, .. } => match source {
                HandlerError::Cancelled => "cancelled",
                HandlerError::Declined => "declined",
                HandlerError::InvalidArguments(_) => "invalid_arguments",
                HandlerError::Failed { .. } | HandlerError::Blocking { .. } => "handler_error",
            },
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Internal { .. } | Self::WithContext { .. } => "internal",
        }
    }

    /// Whether the request ended in a cancelled terminal status.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.root(),
            Self::Handler {
                source: HandlerError::Cancelled,
                ..
            }
        )
    }
}
