//! Handler function types and typed argument access.
//!
//! Handlers are async closures `Fn(Arguments, Context) -> Future` registered
//! next to their definitions. The registry erases their concrete types into
//! [`BoxedHandler`] / [`BoxedPromptHandler`], which already attribute
//! handler errors to their definition.

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

use dispatchkit_core::error::{DispatchError, HandlerError};
use dispatchkit_core::types::Message;

use crate::context::Context;

/// A type-erased tool or resource handler.
pub type BoxedHandler = Arc<
    dyn Fn(Arguments, Context) -> BoxFuture<'static, Result<Value, DispatchError>> + Send + Sync,
>;

/// A type-erased prompt handler.
pub type BoxedPromptHandler = Arc<
    dyn Fn(Arguments, Context) -> BoxFuture<'static, Result<Vec<Message>, DispatchError>>
        + Send
        + Sync,
>;

/// Coerced arguments handed to a handler.
///
/// Values already match their declared types; the accessors deserialize them
/// into Rust types.
///
/// ```rust
/// use dispatchkit_server::Arguments;
///
/// let args = Arguments::from(serde_json::json!({ "name": "Ada", "width": 800 }));
/// let name: String = args.get("name").unwrap();
/// let width: u32 = args.get("width").unwrap();
/// assert_eq!((name.as_str(), width), ("Ada", 800));
/// assert!(args.get_opt::<String>("format").unwrap().is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// Wrap a coerced map.
    #[must_use]
    pub const fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Deserialize a required argument.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, HandlerError> {
        let value = self.0.get(name).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(HandlerError::InvalidArguments)
    }

    /// Deserialize an argument that may be absent.
    pub fn get_opt<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, HandlerError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(HandlerError::InvalidArguments),
        }
    }

    /// Deserialize the whole argument map into a struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        serde_json::from_value(Value::Object(self.0.clone())).map_err(HandlerError::InvalidArguments)
    }

    /// The raw value of an argument.
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Borrow the underlying map.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Take the underlying map.
    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Value> for Arguments {
    /// Non-object values produce empty arguments.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct ImageArgs {
        image_url: String,
        resize: bool,
        width: u32,
    }

    #[test]
    fn test_parse_struct() {
        let args = Arguments::from(json!({
            "image_url": "https://example.com/a.png",
            "resize": true,
            "width": 1024,
        }));
        let parsed: ImageArgs = args.parse().unwrap();
        assert_eq!(
            parsed,
            ImageArgs {
                image_url: "https://example.com/a.png".into(),
                resize: true,
                width: 1024,
            }
        );
    }

    #[test]
    fn test_missing_required_is_invalid_arguments() {
        let args = Arguments::default();
        let err = args.get::<String>("name").unwrap_err();
        assert!(matches!(err, HandlerError::InvalidArguments(_)));
    }

    #[test]
    fn test_nested_values() {
        let args = Arguments::from(json!({ "numbers": [1.0, 2.5] }));
        let numbers: Vec<f64> = args.get("numbers").unwrap();
        assert_eq!(numbers, vec![1.0, 2.5]);
        assert_eq!(args.raw("numbers"), Some(&json!([1.0, 2.5])));
    }
}
