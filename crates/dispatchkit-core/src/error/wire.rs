//! Wire error object and conversions from [`DispatchError`].

use serde::{Deserialize, Serialize};

use super::coercion::CoercionError;
use super::types::{DispatchError, HandlerError, RoutingError};

/// The `error` member of a response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable snake_case classification (`not_found`, `type_mismatch`, ...).
    pub kind: String,
    /// Numeric code, see [`codes`](super::codes).
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Additional structured data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Create an error body from its parts.
    pub fn new(kind: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<&DispatchError> for ErrorBody {
    fn from(err: &DispatchError) -> Self {
        let data = match err.root() {
            DispatchError::Routing(RoutingError::NotFound { namespace, name }) => {
                Some(serde_json::json!({ "namespace": namespace, "name": name }))
            }
            DispatchError::Routing(RoutingError::NoMatch { uri }) => {
                Some(serde_json::json!({ "uri": uri }))
            }
            DispatchError::Coercion(coercion) => Some(match coercion {
                CoercionError::MissingParameter { name } => {
                    serde_json::json!({ "parameter": name })
                }
                CoercionError::TypeMismatch {
                    name,
                    expected,
                    got,
                } => serde_json::json!({
                    "parameter": name,
                    "expected": expected,
                    "got": got,
                }),
                CoercionError::ConstraintViolation { name, constraint } => serde_json::json!({
                    "parameter": name,
                    "constraint": constraint,
                }),
            }),
            DispatchError::Handler {
                definition,
                source: HandlerError::Failed { data, .. },
            } => data
                .clone()
                .or_else(|| Some(serde_json::json!({ "definition": definition }))),
            DispatchError::Handler { definition, .. } => {
                Some(serde_json::json!({ "definition": definition }))
            }
            _ => None,
        };

        Self {
            kind: err.kind().to_string(),
            code: err.code(),
            message: err.to_string(),
            data,
        }
    }
}

impl From<DispatchError> for ErrorBody {
    fn from(err: DispatchError) -> Self {
        Self::from(&err)
    }
}
