//! Context extension trait for error handling.
//!
//! This module provides `anyhow`-style context methods while
//! preserving the typed error system.

use super::types::DispatchError;

/// Extension trait for adding context to `Result` types.
///
/// # Example
///
/// ```rust
/// use dispatchkit_core::error::{DispatchError, DispatchResultExt};
///
/// fn load() -> Result<(), DispatchError> {
///     let result: Result<(), DispatchError> = Err(DispatchError::internal("oops"));
///     result.context("Failed to load catalog")?;
///     Ok(())
/// }
///
/// assert!(load().unwrap_err().to_string().contains("Failed to load catalog"));
/// ```
pub trait DispatchResultExt<T> {
    /// Add context to an error.
    fn context<C: Into<String>>(self, context: C) -> Result<T, DispatchError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<C, F>(self, f: F) -> Result<T, DispatchError>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E> DispatchResultExt<T> for Result<T, E>
where
    E: Into<DispatchError>,
{
    fn context<C: Into<String>>(self, context: C) -> Result<T, DispatchError> {
        self.map_err(|e| DispatchError::WithContext {
            context: context.into(),
            source: Box::new(e.into()),
        })
    }

    fn with_context<C, F>(self, f: F) -> Result<T, DispatchError>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| DispatchError::WithContext {
            context: f().into(),
            source: Box::new(e.into()),
        })
    }
}
