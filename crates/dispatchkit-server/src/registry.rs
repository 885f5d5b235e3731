//! Definition registry.
//!
//! The registry holds every tool, resource and prompt together with its
//! handler. It is populated once at startup and then shared read-only (behind
//! an `Arc`) by all in-flight requests.
//!
//! # Resolution
//!
//! - Tools and prompts resolve by name.
//! - Resources resolve by URI: templates are tried in registration order and
//!   the first match wins. Overlapping templates are allowed; registering a
//!   template whose skeleton is identical to an earlier one logs a warning,
//!   since the later one can never match.
//!
//! # Example
//!
//! ```rust
//! use dispatchkit_server::{Arguments, Context, Registry};
//! use dispatchkit_core::prelude::*;
//!
//! let mut registry = Registry::new();
//! registry
//!     .register_resource(
//!         ResourceDefinition::new("user_profile", "users://{user_id}/profile")
//!             .param(ParameterSpec::integer("user_id")),
//!         |args: Arguments, _ctx: Context| async move {
//!             let id: i64 = args.get("user_id")?;
//!             Ok(serde_json::json!({ "id": id }))
//!         },
//!     )
//!     .unwrap();
//!
//! let (entry, matched) = registry.resolve_by_uri("users://42/profile").unwrap();
//! assert_eq!(entry.definition.name, "user_profile");
//! assert_eq!(matched.path_vars["user_id"], "42");
//! ```

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use dispatchkit_core::error::{DispatchError, HandlerError, RegistryError, RoutingError};
use dispatchkit_core::schema::ParameterSpec;
use dispatchkit_core::template::{TemplateMatch, UriTemplate};
use dispatchkit_core::types::{
    IntoMessages, Namespace, PromptDefinition, ResourceDefinition, ToolDefinition,
    ensure_unique_params,
};

use crate::context::Context;
use crate::handler::{Arguments, BoxedHandler, BoxedPromptHandler};

/// A registered tool.
pub struct ToolEntry {
    /// The tool's metadata.
    pub definition: ToolDefinition,
    pub(crate) handler: BoxedHandler,
}

/// A registered resource.
pub struct ResourceEntry {
    /// The resource's metadata.
    pub definition: ResourceDefinition,
    /// Compiled matcher with query defaults seeded.
    pub template: UriTemplate,
    /// One spec per template variable.
    pub params: Vec<ParameterSpec>,
    pub(crate) handler: BoxedHandler,
}

impl std::fmt::Debug for ResourceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceEntry")
            .field("definition", &self.definition)
            .field("template", &self.template)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A registered prompt.
pub struct PromptEntry {
    /// The prompt's metadata.
    pub definition: PromptDefinition,
    pub(crate) handler: BoxedPromptHandler,
}

/// A definition found by name.
#[derive(Clone, Copy)]
pub enum Definition<'a> {
    /// A tool.
    Tool(&'a ToolEntry),
    /// A resource.
    Resource(&'a ResourceEntry),
    /// A prompt.
    Prompt(&'a PromptEntry),
}

impl Definition<'_> {
    /// Name of the definition.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Tool(entry) => &entry.definition.name,
            Self::Resource(entry) => &entry.definition.name,
            Self::Prompt(entry) => &entry.definition.name,
        }
    }

    /// Declared parameters.
    #[must_use]
    pub fn params(&self) -> &[ParameterSpec] {
        match self {
            Self::Tool(entry) => &entry.definition.params,
            Self::Resource(entry) => &entry.params,
            Self::Prompt(entry) => &entry.definition.params,
        }
    }
}

/// Registry of tools, resources and prompts.
#[derive(Default)]
pub struct Registry {
    tools: Vec<ToolEntry>,
    tool_index: HashMap<String, usize>,
    resources: Vec<ResourceEntry>,
    resource_index: HashMap<String, usize>,
    prompts: Vec<PromptEntry>,
    prompt_index: HashMap<String, usize>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// The handler may return any serializable value.
    pub fn register_tool<F, Fut, T>(
        &mut self,
        definition: ToolDefinition,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Arguments, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, HandlerError>> + Send + 'static,
        T: Serialize + 'static,
    {
        check_name(&self.tool_index, Namespace::Tool, &definition.name)?;
        ensure_unique_params(Namespace::Tool, &definition.name, &definition.params)?;

        let handler = box_handler(definition.name.clone(), handler);
        self.tool_index
            .insert(definition.name.clone(), self.tools.len());
        tracing::debug!(name = %definition.name, "Registered tool");
        self.tools.push(ToolEntry {
            definition,
            handler,
        });
        Ok(())
    }

    /// Register a resource or resource template.
    pub fn register_resource<F, Fut, T>(
        &mut self,
        definition: ResourceDefinition,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Arguments, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, HandlerError>> + Send + 'static,
        T: Serialize + 'static,
    {
        check_name(&self.resource_index, Namespace::Resource, &definition.name)?;
        let compiled = definition.compile()?;

        let skeleton = compiled.template.skeleton();
        if let Some(earlier) = self
            .resources
            .iter()
            .find(|entry| entry.template.skeleton() == skeleton)
        {
            tracing::warn!(
                name = %definition.name,
                template = %definition.uri_template,
                shadowed_by = %earlier.definition.name,
                "Resource template is shadowed by an earlier registration and will never match"
            );
        }

        let handler = box_handler(definition.name.clone(), handler);
        self.resource_index
            .insert(definition.name.clone(), self.resources.len());
        tracing::debug!(name = %definition.name, template = %definition.uri_template, "Registered resource");
        self.resources.push(ResourceEntry {
            definition,
            template: compiled.template,
            params: compiled.params,
            handler,
        });
        Ok(())
    }

    /// Register a prompt.
    ///
    /// The handler may return a `String`, a [`Message`](dispatchkit_core::types::Message)
    /// or a `Vec<Message>`.
    pub fn register_prompt<F, Fut, M>(
        &mut self,
        definition: PromptDefinition,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Arguments, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M, HandlerError>> + Send + 'static,
        M: IntoMessages + 'static,
    {
        check_name(&self.prompt_index, Namespace::Prompt, &definition.name)?;
        ensure_unique_params(Namespace::Prompt, &definition.name, &definition.params)?;

        let name = definition.name.clone();
        let handler: BoxedPromptHandler = Arc::new(move |args, ctx| {
            let name = name.clone();
            handler(args, ctx)
                .map(move |result| {
                    result
                        .map(IntoMessages::into_messages)
                        .map_err(|err| DispatchError::handler(name, err))
                })
                .boxed()
        });
        self.prompt_index
            .insert(definition.name.clone(), self.prompts.len());
        tracing::debug!(name = %definition.name, "Registered prompt");
        self.prompts.push(PromptEntry {
            definition,
            handler,
        });
        Ok(())
    }

    /// Find a definition by namespace and name.
    pub fn resolve_by_name(
        &self,
        namespace: Namespace,
        name: &str,
    ) -> Result<Definition<'_>, RoutingError> {
        let found = match namespace {
            Namespace::Tool => self.tool(name).map(Definition::Tool),
            Namespace::Resource => self
                .resource_index
                .get(name)
                .map(|&i| Definition::Resource(&self.resources[i])),
            Namespace::Prompt => self.prompt(name).map(Definition::Prompt),
        };
        found.ok_or_else(|| RoutingError::NotFound {
            namespace,
            name: name.to_string(),
        })
    }

    /// Find the first resource (in registration order) whose template
    /// matches `uri`.
    pub fn resolve_by_uri(&self, uri: &str) -> Result<(&ResourceEntry, TemplateMatch), RoutingError> {
        self.resources
            .iter()
            .find_map(|entry| entry.template.matches(uri).map(|m| (entry, m)))
            .ok_or_else(|| RoutingError::NoMatch {
                uri: uri.to_string(),
            })
    }

    /// Look up a tool.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&ToolEntry> {
        self.tool_index.get(name).map(|&i| &self.tools[i])
    }

    /// Look up a prompt.
    #[must_use]
    pub fn prompt(&self, name: &str) -> Option<&PromptEntry> {
        self.prompt_index.get(name).map(|&i| &self.prompts[i])
    }

    /// Tools in registration order.
    pub fn tools(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter().map(|entry| &entry.definition)
    }

    /// Resources in registration (resolution) order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceDefinition> {
        self.resources.iter().map(|entry| &entry.definition)
    }

    /// Prompts in registration order.
    pub fn prompts(&self) -> impl Iterator<Item = &PromptDefinition> {
        self.prompts.iter().map(|entry| &entry.definition)
    }

    /// Total number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len() + self.resources.len() + self.prompts.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discovery catalog of every definition.
    #[must_use]
    pub fn catalog(&self) -> Value {
        serde_json::json!({
            "tools": self.tools.iter().map(|e| e.definition.metadata()).collect::<Vec<_>>(),
            "resources": self
                .resources
                .iter()
                .map(|e| {
                    let mut meta = e.definition.metadata_with(&e.template, &e.params);
                    if let Some(obj) = meta.as_object_mut() {
                        obj.insert("static".into(), Value::Bool(e.template.is_static()));
                    }
                    meta
                })
                .collect::<Vec<_>>(),
            "prompts": self.prompts.iter().map(|e| e.definition.metadata()).collect::<Vec<_>>(),
        })
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("tools", &self.tools().map(|d| &d.name).collect::<Vec<_>>())
            .field(
                "resources",
                &self.resources().map(|d| &d.uri_template).collect::<Vec<_>>(),
            )
            .field("prompts", &self.prompts().map(|d| &d.name).collect::<Vec<_>>())
            .finish()
    }
}

fn check_name(
    index: &HashMap<String, usize>,
    namespace: Namespace,
    name: &str,
) -> Result<(), RegistryError> {
    if index.contains_key(name) {
        return Err(RegistryError::DuplicateName {
            namespace,
            name: name.to_string(),
        });
    }
    Ok(())
}

fn box_handler<F, Fut, T>(name: String, handler: F) -> BoxedHandler
where
    F: Fn(Arguments, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, HandlerError>> + Send + 'static,
    T: Serialize + 'static,
{
    Arc::new(move |args, ctx| {
        let name = name.clone();
        handler(args, ctx)
            .map(move |result| {
                let value = result.map_err(|err| DispatchError::handler(name.clone(), err))?;
                serde_json::to_value(value).map_err(|err| {
                    DispatchError::internal_with_source(
                        format!("result of '{name}' could not be serialized"),
                        err,
                    )
                })
            })
            .boxed()
    })
}
