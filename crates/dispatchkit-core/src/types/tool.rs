//! Tool definitions.
//!
//! Tools are named operations invoked with an argument mapping. Each tool
//! declares an ordered parameter list, an optional return type, and
//! behavioral hints for the caller.

use serde::{Deserialize, Serialize};

use crate::schema::{ParamType, ParameterSpec, input_schema};

/// A tool definition exposed by the server.
///
/// # Example
///
/// ```rust
/// use dispatchkit_core::schema::ParameterSpec;
/// use dispatchkit_core::types::{ToolAnnotations, ToolDefinition};
///
/// let tool = ToolDefinition::new("greet")
///     .description("Greet someone by name")
///     .param(ParameterSpec::string("name"))
///     .annotations(ToolAnnotations::read_only());
///
/// assert!(tool.is_read_only());
/// assert_eq!(tool.input_schema()["required"][0], "name");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared parameters, in coercion order.
    #[serde(default)]
    pub params: Vec<ParameterSpec>,
    /// Declared result type, checked after the handler returns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<ParamType>,
    /// Behavioral hints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

impl ToolDefinition {
    /// Create a new tool with the given name and no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            params: Vec::new(),
            return_type: None,
            annotations: None,
        }
    }

    /// Set the tool's description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a parameter.
    #[must_use]
    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Declare the result type.
    #[must_use]
    pub fn returns(mut self, return_type: ParamType) -> Self {
        self.return_type = Some(return_type);
        self
    }

    /// Set the tool's annotations.
    #[must_use]
    pub fn annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = Some(annotations);
        self
    }

    /// Check if this tool is marked as read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.annotations
            .as_ref()
            .and_then(|a| a.read_only_hint)
            .unwrap_or(false)
    }

    /// Check if this tool is marked as destructive.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        self.annotations
            .as_ref()
            .and_then(|a| a.destructive_hint)
            .unwrap_or(false)
    }

    /// JSON Schema for the tool's arguments.
    #[must_use]
    pub fn input_schema(&self) -> serde_json::Value {
        input_schema(&self.params)
    }

    /// Discovery entry: the definition plus its input schema.
    #[must_use]
    pub fn metadata(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert("input_schema".into(), self.input_schema());
        }
        value
    }
}

/// Annotations providing hints about tool behavior.
///
/// Hints are advisory. The core never enforces them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolAnnotations {
    /// Human-readable title for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The tool only reads data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    /// The tool may perform destructive updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    /// Repeated calls with the same input have no additional effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    /// The tool interacts with entities outside the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

impl ToolAnnotations {
    /// Create annotations for a read-only tool.
    #[must_use]
    pub fn read_only() -> Self {
        Self {
            read_only_hint: Some(true),
            ..Default::default()
        }
    }

    /// Create annotations for a destructive tool.
    #[must_use]
    pub fn destructive() -> Self {
        Self {
            destructive_hint: Some(true),
            ..Default::default()
        }
    }

    /// Set the display title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Mark this tool as read-only.
    #[must_use]
    pub const fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only_hint = Some(read_only);
        self
    }

    /// Mark this tool as destructive.
    #[must_use]
    pub const fn with_destructive(mut self, destructive: bool) -> Self {
        self.destructive_hint = Some(destructive);
        self
    }

    /// Mark this tool as idempotent.
    #[must_use]
    pub const fn with_idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent_hint = Some(idempotent);
        self
    }

    /// Mark this tool as open-world.
    #[must_use]
    pub const fn with_open_world(mut self, open_world: bool) -> Self {
        self.open_world_hint = Some(open_world);
        self
    }
}
