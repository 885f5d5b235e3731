//! Errors produced by the schema coercer.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single violated constraint, reported by [`CoercionError::ConstraintViolation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "constraint", content = "limit", rename_all = "snake_case")]
pub enum Constraint {
    /// Value must be `>=` the limit.
    Ge(f64),
    /// Value must be `<=` the limit.
    Le(f64),
    /// Value must be `>` the limit.
    Gt(f64),
    /// Value must be `<` the limit.
    Lt(f64),
    /// String or array length must be at least the limit.
    MinLength(usize),
    /// String or array length must be at most the limit.
    MaxLength(usize),
    /// Value must be one of the enumerated values.
    AllowedValues(Vec<serde_json::Value>),
}

impl Constraint {
    /// Short constraint name (`ge`, `le`, `allowed_values`, ...).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ge(_) => "ge",
            Self::Le(_) => "le",
            Self::Gt(_) => "gt",
            Self::Lt(_) => "lt",
            Self::MinLength(_) => "min_length",
            Self::MaxLength(_) => "max_length",
            Self::AllowedValues(_) => "allowed_values",
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ge(v) | Self::Le(v) | Self::Gt(v) | Self::Lt(v) => {
                write!(f, "{}={v}", self.name())
            }
            Self::MinLength(n) | Self::MaxLength(n) => write!(f, "{}={n}", self.name()),
            Self::AllowedValues(values) => {
                let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "allowed_values=[{}]", rendered.join(", "))
            }
        }
    }
}

/// Failure to coerce raw arguments against a parameter list.
///
/// Coercion is atomic: the first failing parameter (in declaration order)
/// is reported and no partial output is produced.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum CoercionError {
    /// A required parameter without a default was not supplied.
    #[error("missing required parameter '{name}'")]
    #[diagnostic(code(dispatch::coercion::missing_parameter))]
    MissingParameter {
        /// Parameter name (dotted path for nested records).
        name: String,
    },

    /// The supplied value could not be converted to the declared type.
    #[error("parameter '{name}' expected {expected}, got {got}")]
    #[diagnostic(code(dispatch::coercion::type_mismatch))]
    TypeMismatch {
        /// Parameter name (dotted/indexed path for nested values).
        name: String,
        /// The declared type.
        expected: String,
        /// A short description of what was received.
        got: String,
    },

    /// The converted value violates a declared constraint.
    #[error("parameter '{name}' violates {constraint}")]
    #[diagnostic(code(dispatch::coercion::constraint_violation))]
    ConstraintViolation {
        /// Parameter name.
        name: String,
        /// The violated constraint.
        constraint: Constraint,
    },
}

impl CoercionError {
    /// The parameter the error refers to.
    #[must_use]
    pub fn parameter(&self) -> &str {
        match self {
            Self::MissingParameter { name }
            | Self::TypeMismatch { name, .. }
            | Self::ConstraintViolation { name, .. } => name,
        }
    }

    /// Stable wire kind for this failure.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingParameter { .. } => "missing_parameter",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::ConstraintViolation { .. } => "constraint_violation",
        }
    }
}
