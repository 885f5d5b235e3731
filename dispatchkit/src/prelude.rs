//! Prelude module for convenient imports.
//!
//! ```rust
//! use dispatchkit::prelude::*;
//!
//! let tool = ToolDefinition::new("greet").param(ParameterSpec::string("name"));
//! let mut registry = Registry::new();
//! assert!(registry.is_empty());
//! # let _ = (tool, &mut registry);
//! ```

// Core types
pub use dispatchkit_core::prelude::*;

// Server types
pub use dispatchkit_server::prelude::*;
