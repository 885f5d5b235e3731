//! Numeric error codes carried on the wire next to the error kind.
//!
//! The JSON-RPC 2.0 reserved codes are reused where the meaning lines up,
//! so callers that already speak JSON-RPC can classify errors without
//! parsing the `kind` string.

/// The request envelope was malformed or conflicts with another request.
pub const INVALID_REQUEST: i32 = -32600;

/// No tool or prompt is registered under the requested name.
pub const METHOD_NOT_FOUND: i32 = -32601;

/// Arguments failed coercion against the declared parameters.
pub const INVALID_PARAMS: i32 = -32602;

/// Internal error (handler panic, serialization failure, bad return type).
pub const INTERNAL_ERROR: i32 = -32603;

/// Server error range start.
pub const SERVER_ERROR_START: i32 = -32000;

/// A handler body reported a domain error.
pub const HANDLER_ERROR: i32 = SERVER_ERROR_START - 1;

/// No resource template matched the requested URI.
pub const RESOURCE_NOT_FOUND: i32 = -32002;

/// The request was cancelled (caller cancel, disconnect, declined input).
pub const REQUEST_CANCELLED: i32 = -32800;
