//! Resource definitions.
//!
//! A resource is addressed by URI. Its parameter surface is the set of
//! variables in its [`UriTemplate`]; explicit [`ParameterSpec`]s refine the
//! type, default and constraints of individual variables.

use serde::{Deserialize, Serialize};

use super::{Namespace, ensure_unique_params};
use crate::error::RegistryError;
use crate::schema::{ParamType, ParameterSpec};
use crate::template::UriTemplate;

/// A resource or resource template exposed by the server.
///
/// # Example
///
/// ```rust
/// use dispatchkit_core::schema::ParameterSpec;
/// use dispatchkit_core::types::ResourceDefinition;
///
/// let users = ResourceDefinition::new("user_profile", "users://{user_id}/profile")
///     .param(ParameterSpec::integer("user_id"));
///
/// let compiled = users.compile().unwrap();
/// assert_eq!(compiled.params[0].name, "user_id");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    /// Unique name of the resource.
    pub name: String,
    /// Template text, e.g. `users://{user_id}/profile`.
    pub uri_template: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Explicit parameter specs for template variables.
    #[serde(default)]
    pub params: Vec<ParameterSpec>,
}

/// A resource definition with its template compiled and parameters resolved.
#[derive(Debug, Clone)]
pub struct CompiledResource {
    /// The compiled matcher, with query defaults seeded from the specs.
    pub template: UriTemplate,
    /// One spec per template variable: path variables first, then query
    /// variables, each in template order.
    pub params: Vec<ParameterSpec>,
}

impl ResourceDefinition {
    /// Create a resource for the given template.
    #[must_use]
    pub fn new(name: impl Into<String>, uri_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri_template: uri_template.into(),
            description: None,
            mime_type: None,
            params: Vec::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the MIME type.
    #[must_use]
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Declare the spec of one template variable.
    #[must_use]
    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Compile the template and resolve the parameter list.
    ///
    /// Variables without an explicit spec become strings: required for path
    /// variables, optional for query variables. Spec defaults on query
    /// variables become the matcher's defaults.
    pub fn compile(&self) -> Result<CompiledResource, RegistryError> {
        ensure_unique_params(Namespace::Resource, &self.name, &self.params)?;

        let mut template =
            UriTemplate::compile(&self.uri_template).map_err(|source| RegistryError::Template {
                template: self.uri_template.clone(),
                source,
            })?;

        if let Some(unbound) = self.params.iter().find(|p| !template.has_variable(&p.name)) {
            return Err(RegistryError::UnboundParameter {
                definition: self.name.clone(),
                parameter: unbound.name.clone(),
            });
        }

        let explicit = |name: &str| self.params.iter().find(|p| p.name == name).cloned();

        let mut params: Vec<ParameterSpec> = template
            .path_variables()
            .map(|name| explicit(name).unwrap_or_else(|| ParameterSpec::new(name, ParamType::String)))
            .collect();

        let query: Vec<ParameterSpec> = template
            .query_variables()
            .map(|name| {
                explicit(name)
                    .unwrap_or_else(|| ParameterSpec::new(name, ParamType::String).optional())
            })
            .collect();
        for spec in &query {
            if let Some(default) = &spec.default {
                template.set_query_default(&spec.name, default.clone());
            }
        }
        params.extend(query);

        Ok(CompiledResource { template, params })
    }

    /// Discovery entry for this resource, given its compiled form.
    #[must_use]
    pub fn metadata_with(
        &self,
        template: &UriTemplate,
        params: &[ParameterSpec],
    ) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "uri_template": self.uri_template,
            "description": self.description,
            "mime_type": self.mime_type,
            "path_vars": template.path_variables().collect::<Vec<_>>(),
            "query_vars": template.query_variables().collect::<Vec<_>>(),
            "params": params,
        })
    }
}
