//! Parameter declarations for tools, resources and prompts.
//!
//! A definition declares its parameters as an ordered list of
//! [`ParameterSpec`]s. The [coercer](crate::coerce) converts untyped input
//! against that list, and [`input_schema`] renders it as JSON Schema for
//! capability discovery.
//!
//! # Example
//!
//! ```rust
//! use dispatchkit_core::schema::{ParamType, ParameterSpec};
//!
//! let width = ParameterSpec::new("width", ParamType::Integer)
//!     .description("Target width in pixels")
//!     .ge(1.0)
//!     .le(2000.0)
//!     .default_value(800);
//!
//! assert!(!width.required);
//! assert_eq!(width.default, Some(serde_json::json!(800)));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Declared type of a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamType {
    /// A string. Only JSON strings are accepted.
    String,
    /// A 64-bit signed integer. Accepts integral numbers and numeric strings.
    Integer,
    /// A floating-point number. Accepts numbers and numeric strings.
    Number,
    /// A boolean. Accepts booleans and the strings `"true"` / `"false"`.
    Boolean,
    /// A homogeneous list.
    Array {
        /// Element type.
        items: Box<ParamType>,
    },
    /// A string-keyed map with homogeneous values.
    Map {
        /// Value type.
        values: Box<ParamType>,
    },
    /// A nested record with its own ordered fields.
    Record {
        /// Record fields, coerced recursively.
        fields: Vec<ParameterSpec>,
    },
    /// Any JSON value, passed through unchanged.
    Any,
}

impl ParamType {
    /// A list of `items`.
    #[must_use]
    pub fn array(items: ParamType) -> Self {
        Self::Array {
            items: Box::new(items),
        }
    }

    /// A map with `values`.
    #[must_use]
    pub fn map(values: ParamType) -> Self {
        Self::Map {
            values: Box::new(values),
        }
    }

    /// A record with the given fields.
    #[must_use]
    pub fn record(fields: Vec<ParameterSpec>) -> Self {
        Self::Record { fields }
    }

    /// Whether values of this type are JSON containers.
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::Array { .. } | Self::Map { .. } | Self::Record { .. })
    }

    /// Render as a JSON Schema fragment.
    #[must_use]
    pub fn json_schema(&self) -> Value {
        match self {
            Self::String => serde_json::json!({ "type": "string" }),
            Self::Integer => serde_json::json!({ "type": "integer" }),
            Self::Number => serde_json::json!({ "type": "number" }),
            Self::Boolean => serde_json::json!({ "type": "boolean" }),
            Self::Array { items } => serde_json::json!({
                "type": "array",
                "items": items.json_schema(),
            }),
            Self::Map { values } => serde_json::json!({
                "type": "object",
                "additionalProperties": values.json_schema(),
            }),
            Self::Record { fields } => input_schema(fields),
            Self::Any => serde_json::json!({}),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Array { items } => write!(f, "array<{items}>"),
            Self::Map { values } => write!(f, "map<{values}>"),
            Self::Record { .. } => write!(f, "record"),
            Self::Any => write!(f, "any"),
        }
    }
}

/// Constraints applied after type conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Inclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ge: Option<f64>,
    /// Inclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub le: Option<f64>,
    /// Exclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    /// Exclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    /// Minimum length of a string (in chars) or array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum length of a string (in chars) or array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Enumerated allowed values (compared after conversion).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,
}

impl Constraints {
    /// Whether no constraint is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// One declared parameter. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub declared_type: ParamType,
    /// Whether the caller must supply it (false when a default exists).
    pub required: bool,
    /// Value used when the caller omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Post-conversion constraints.
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParameterSpec {
    /// A required parameter of the given type.
    pub fn new(name: impl Into<String>, declared_type: ParamType) -> Self {
        Self {
            name: name.into(),
            declared_type,
            required: true,
            default: None,
            constraints: Constraints::default(),
            description: None,
        }
    }

    /// Required string parameter.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::String)
    }

    /// Required integer parameter.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Integer)
    }

    /// Required number parameter.
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Number)
    }

    /// Required boolean parameter.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Boolean)
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set a default value. The parameter becomes optional.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    /// Mark optional with no default: absent values are simply left out.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Inclusive lower bound.
    pub fn ge(mut self, limit: f64) -> Self {
        self.constraints.ge = Some(limit);
        self
    }

    /// Inclusive upper bound.
    pub fn le(mut self, limit: f64) -> Self {
        self.constraints.le = Some(limit);
        self
    }

    /// Exclusive lower bound.
    pub fn gt(mut self, limit: f64) -> Self {
        self.constraints.gt = Some(limit);
        self
    }

    /// Exclusive upper bound.
    pub fn lt(mut self, limit: f64) -> Self {
        self.constraints.lt = Some(limit);
        self
    }

    /// Minimum length.
    pub fn min_length(mut self, len: usize) -> Self {
        self.constraints.min_length = Some(len);
        self
    }

    /// Maximum length.
    pub fn max_length(mut self, len: usize) -> Self {
        self.constraints.max_length = Some(len);
        self
    }

    /// Restrict to an enumerated set of values.
    pub fn allowed_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.constraints.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Render this parameter as a JSON Schema property.
    #[must_use]
    pub fn json_schema(&self) -> Value {
        let mut schema = self.declared_type.json_schema();
        let Some(obj) = schema.as_object_mut() else {
            return schema;
        };
        if let Some(description) = &self.description {
            obj.insert("description".into(), Value::String(description.clone()));
        }
        if let Some(default) = &self.default {
            obj.insert("default".into(), default.clone());
        }
        let c = &self.constraints;
        let numeric = [
            ("minimum", c.ge),
            ("maximum", c.le),
            ("exclusiveMinimum", c.gt),
            ("exclusiveMaximum", c.lt),
        ];
        for (key, limit) in numeric {
            if let Some(limit) = limit {
                obj.insert(key.into(), serde_json::json!(limit));
            }
        }
        let (min_key, max_key) = if matches!(self.declared_type, ParamType::Array { .. }) {
            ("minItems", "maxItems")
        } else {
            ("minLength", "maxLength")
        };
        if let Some(min) = c.min_length {
            obj.insert(min_key.into(), serde_json::json!(min));
        }
        if let Some(max) = c.max_length {
            obj.insert(max_key.into(), serde_json::json!(max));
        }
        if let Some(values) = &c.allowed_values {
            obj.insert("enum".into(), Value::Array(values.clone()));
        }
        schema
    }
}

/// Render an ordered parameter list as an object JSON Schema.
#[must_use]
pub fn input_schema(params: &[ParameterSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for param in params {
        properties.insert(param.name.clone(), param.json_schema());
        if param.required {
            required.push(Value::String(param.name.clone()));
        }
    }
    let mut schema = serde_json::json!({
        "type": "object",
        "properties": properties,
    });
    if !required.is_empty() {
        schema["required"] = Value::Array(required);
    }
    schema
}
