//! Message envelopes exchanged with the caller.
//!
//! The connection carries line-delimited JSON objects tagged by `type`.
//!
//! Inbound ([`ClientMessage`]): `call_tool`, `read_resource`, `get_prompt`,
//! `list_definitions`, `elicitation_response`, `cancel`.
//!
//! Outbound ([`ServerMessage`]): `response` and `elicitation_request`.
//!
//! # Example
//!
//! ```rust
//! use dispatchkit_core::protocol::{ClientMessage, Request, RequestId};
//!
//! let line = r#"{"type":"read_resource","id":7,"uri":"users://42/profile"}"#;
//! let msg: ClientMessage = serde_json::from_str(line).unwrap();
//! assert_eq!(msg.id(), &RequestId::Number(7));
//!
//! let (_, request) = msg.into_request().unwrap();
//! assert_eq!(request.method(), "read_resource");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DispatchError, ErrorBody};
use crate::schema::ParamType;
use crate::types::{ElicitAction, ElicitationResponse, Message};

/// A request ID.
///
/// Request IDs correlate requests with their responses and with the
/// elicitation round trips a request opens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(u64),
    /// String request ID.
    String(String),
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self::Number(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self::String(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::String(id.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// A dispatchable request, stripped of its envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Invoke a tool by name.
    CallTool {
        /// Tool name.
        name: String,
        /// Untyped arguments.
        arguments: Map<String, Value>,
    },
    /// Fetch a resource by URI.
    ReadResource {
        /// Concrete URI.
        uri: String,
    },
    /// Render a prompt by name.
    GetPrompt {
        /// Prompt name.
        name: String,
        /// Untyped arguments.
        arguments: Map<String, Value>,
    },
    /// Return the definition catalog.
    ListDefinitions,
}

impl Request {
    /// Method name used in logs.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::CallTool { .. } => "call_tool",
            Self::ReadResource { .. } => "read_resource",
            Self::GetPrompt { .. } => "get_prompt",
            Self::ListDefinitions => "list_definitions",
        }
    }

    /// The tool/prompt name or resource URI addressed.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::CallTool { name, .. } | Self::GetPrompt { name, .. } => name,
            Self::ReadResource { uri } => uri,
            Self::ListDefinitions => "",
        }
    }
}

/// A message from the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Invoke a tool.
    CallTool {
        /// Request ID.
        id: RequestId,
        /// Tool name.
        name: String,
        /// Untyped arguments.
        #[serde(default)]
        arguments: Map<String, Value>,
    },
    /// Fetch a resource.
    ReadResource {
        /// Request ID.
        id: RequestId,
        /// Concrete URI.
        uri: String,
    },
    /// Render a prompt.
    GetPrompt {
        /// Request ID.
        id: RequestId,
        /// Prompt name.
        name: String,
        /// Untyped arguments.
        #[serde(default)]
        arguments: Map<String, Value>,
    },
    /// Request the definition catalog.
    ListDefinitions {
        /// Request ID.
        id: RequestId,
    },
    /// Answer a pending elicitation.
    ElicitationResponse {
        /// ID of the request that opened the elicitation.
        id: RequestId,
        /// What the caller did.
        outcome: ElicitAction,
        /// Supplied data, for `accept`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    /// Cancel an in-flight request.
    Cancel {
        /// Request ID to cancel.
        id: RequestId,
    },
}

impl ClientMessage {
    /// The request ID this message refers to.
    #[must_use]
    pub const fn id(&self) -> &RequestId {
        match self {
            Self::CallTool { id, .. }
            | Self::ReadResource { id, .. }
            | Self::GetPrompt { id, .. }
            | Self::ListDefinitions { id }
            | Self::ElicitationResponse { id, .. }
            | Self::Cancel { id } => id,
        }
    }

    /// Split a dispatchable message into its ID and request.
    ///
    /// Returns the message unchanged when it is not a request.
    pub fn into_request(self) -> Result<(RequestId, Request), Self> {
        match self {
            Self::CallTool {
                id,
                name,
                arguments,
            } => Ok((id, Request::CallTool { name, arguments })),
            Self::ReadResource { id, uri } => Ok((id, Request::ReadResource { uri })),
            Self::GetPrompt {
                id,
                name,
                arguments,
            } => Ok((id, Request::GetPrompt { name, arguments })),
            Self::ListDefinitions { id } => Ok((id, Request::ListDefinitions)),
            other => Err(other),
        }
    }
}

impl ClientMessage {
    /// Build an elicitation answer message.
    #[must_use]
    pub fn elicitation_response(id: impl Into<RequestId>, response: ElicitationResponse) -> Self {
        Self::ElicitationResponse {
            id: id.into(),
            outcome: response.outcome,
            data: response.data,
        }
    }
}

/// A message to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Final response to a request.
    Response {
        /// Request ID.
        id: RequestId,
        /// Result, messages or error.
        body: ResponseBody,
    },
    /// A handler is waiting for caller input.
    ElicitationRequest {
        /// ID of the request whose handler is suspended.
        id: RequestId,
        /// What is being asked.
        prompt: String,
        /// Shape the accepted data must have.
        expected_shape: Option<ParamType>,
    },
}

/// Body of a response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseBody {
    /// Tool or resource result.
    Result(Value),
    /// Prompt messages.
    Messages(Vec<Message>),
    /// Any per-request failure.
    Error(ErrorBody),
}

impl ResponseBody {
    /// Whether this is an error body.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The error body, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&ErrorBody> {
        match self {
            Self::Error(err) => Some(err),
            Self::Result(_) | Self::Messages(_) => None,
        }
    }

    /// The result value, if any.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        match self {
            Self::Result(value) => Some(value),
            Self::Messages(_) | Self::Error(_) => None,
        }
    }
}

impl From<DispatchError> for ResponseBody {
    fn from(err: DispatchError) -> Self {
        Self::Error(ErrorBody::from(&err))
    }
}

impl From<&DispatchError> for ResponseBody {
    fn from(err: &DispatchError) -> Self {
        Self::Error(ErrorBody::from(err))
    }
}
