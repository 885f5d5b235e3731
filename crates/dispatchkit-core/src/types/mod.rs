//! Definition metadata, messages and elicitation types.
//!
//! - **Tools**: named operations with typed parameters and an optional
//!   declared return type
//! - **Resources**: URI-addressed operations parameterized by a template
//! - **Prompts**: named operations returning conversational messages
//! - **Elicitation**: mid-handler requests for caller input

pub mod elicitation;
pub mod prompt;
pub mod resource;
pub mod tool;

pub use elicitation::*;
pub use prompt::*;
pub use resource::*;
pub use tool::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The namespace a definition lives in. Names are unique per namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Tools.
    Tool,
    /// Resources and resource templates.
    Resource,
    /// Prompts.
    Prompt,
}

impl Namespace {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Resource => "resource",
            Self::Prompt => "prompt",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reject a parameter list that declares the same name twice.
pub fn ensure_unique_params(
    namespace: Namespace,
    definition: &str,
    params: &[crate::schema::ParameterSpec],
) -> Result<(), crate::error::RegistryError> {
    let mut seen = std::collections::HashSet::new();
    for param in params {
        if !seen.insert(param.name.as_str()) {
            return Err(crate::error::RegistryError::DuplicateParameter {
                namespace,
                definition: definition.to_string(),
                parameter: param.name.clone(),
            });
        }
    }
    Ok(())
}
