//! Elicitation types.
//!
//! Elicitation lets a handler pause and ask the caller for more input. The
//! handler sends an [`ElicitationRequest`], the caller answers with an
//! [`ElicitationResponse`], and the handler resumes with exactly one
//! [`ElicitationOutcome`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce::coerce_value;
use crate::error::HandlerError;
use crate::schema::ParamType;

/// A request for caller input, created by a handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElicitationRequest {
    /// Message explaining what is needed.
    pub prompt: String,
    /// Shape the accepted data must have, if any.
    pub expected_shape: Option<ParamType>,
}

impl ElicitationRequest {
    /// Create a request with the given shape.
    #[must_use]
    pub fn new(prompt: impl Into<String>, expected_shape: Option<ParamType>) -> Self {
        Self {
            prompt: prompt.into(),
            expected_shape,
        }
    }

    /// A confirmation: accepting carries no data.
    #[must_use]
    pub fn confirm(prompt: impl Into<String>) -> Self {
        Self::new(prompt, None)
    }

    /// A free-text question.
    #[must_use]
    pub fn text(prompt: impl Into<String>) -> Self {
        Self::new(prompt, Some(ParamType::String))
    }
}

/// The action the caller took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElicitAction {
    /// The caller supplied the requested input.
    Accept,
    /// The caller explicitly refused.
    Decline,
    /// The caller abandoned the request.
    Cancel,
}

/// The caller's raw answer, before shape validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElicitationResponse {
    /// What the caller did.
    pub outcome: ElicitAction,
    /// The supplied data, for `accept`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ElicitationResponse {
    /// An accept carrying `data`.
    #[must_use]
    pub fn accept(data: Value) -> Self {
        Self {
            outcome: ElicitAction::Accept,
            data: Some(data),
        }
    }

    /// A decline.
    #[must_use]
    pub const fn decline() -> Self {
        Self {
            outcome: ElicitAction::Decline,
            data: None,
        }
    }

    /// A cancel.
    #[must_use]
    pub const fn cancel() -> Self {
        Self {
            outcome: ElicitAction::Cancel,
            data: None,
        }
    }

    /// Validate against the expected shape and produce the outcome.
    ///
    /// With no shape, an accept resolves to its data (or `null`). With a
    /// shape, the data is converted like a parameter; missing or mismatching
    /// data degrades to [`ElicitationOutcome::Cancelled`]. A scalar shape
    /// also accepts the data wrapped as `{"value": x}`.
    #[must_use]
    pub fn into_outcome(self, expected_shape: Option<&ParamType>) -> ElicitationOutcome {
        match self.outcome {
            ElicitAction::Decline => ElicitationOutcome::Declined,
            ElicitAction::Cancel => ElicitationOutcome::Cancelled,
            ElicitAction::Accept => {
                let Some(shape) = expected_shape else {
                    return ElicitationOutcome::Accepted {
                        data: self.data.unwrap_or(Value::Null),
                    };
                };
                let Some(data) = self.data.filter(|d| !d.is_null()) else {
                    return ElicitationOutcome::Cancelled;
                };
                let data = match data {
                    Value::Object(mut map)
                        if !matches!(shape, ParamType::Map { .. } | ParamType::Record { .. })
                            && map.len() == 1
                            && map.contains_key("value") =>
                    {
                        map.remove("value").unwrap_or(Value::Null)
                    }
                    other => other,
                };
                match coerce_value("data", shape, &data) {
                    Ok(data) => ElicitationOutcome::Accepted { data },
                    Err(_) => ElicitationOutcome::Cancelled,
                }
            }
        }
    }
}

/// The resolved result of one elicitation.
///
/// `Declined` and `Cancelled` are ordinary outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ElicitationOutcome {
    /// The caller supplied data of the expected shape.
    Accepted {
        /// The validated data.
        data: Value,
    },
    /// The caller declined.
    Declined,
    /// The caller cancelled, the channel closed, or the deadline passed.
    Cancelled,
}

impl ElicitationOutcome {
    /// Whether the caller accepted.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// The accepted data, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        match self {
            Self::Accepted { data } => Some(data),
            Self::Declined | Self::Cancelled => None,
        }
    }

    /// Convert into a `Result` for handlers that want to propagate with `?`.
    pub fn into_result(self) -> Result<Value, HandlerError> {
        match self {
            Self::Accepted { data } => Ok(data),
            Self::Declined => Err(HandlerError::Declined),
            Self::Cancelled => Err(HandlerError::Cancelled),
        }
    }
}
