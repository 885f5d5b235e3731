//! Errors raised while compiling or expanding a URI template.

use miette::Diagnostic;
use thiserror::Error;

/// A malformed URI template, or a variable set that cannot be expanded.
///
/// Compilation errors are startup-fatal: they surface from resource
/// registration and abort server construction.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A `{` without a matching `}`, a nested `{`, or a stray `}`.
    #[error("unbalanced brace at byte {position}")]
    #[diagnostic(
        code(dispatch::template::unbalanced),
        help("every '{{' must be closed by '}}' before the next '{{'")
    )]
    Unbalanced {
        /// Byte offset of the offending brace.
        position: usize,
    },

    /// An expression with no variable name (`{}` or `{?}`).
    #[error("empty variable expression at byte {position}")]
    #[diagnostic(code(dispatch::template::empty_variable))]
    EmptyVariable {
        /// Byte offset of the opening brace.
        position: usize,
    },

    /// A variable name containing characters outside `[A-Za-z0-9_]`.
    #[error("invalid variable name '{name}'")]
    #[diagnostic(
        code(dispatch::template::invalid_name),
        help("variable names may only contain ASCII letters, digits and '_'")
    )]
    InvalidVariableName {
        /// The rejected name.
        name: String,
    },

    /// The same variable appears twice (path or query).
    #[error("duplicate variable '{name}'")]
    #[diagnostic(code(dispatch::template::duplicate_variable))]
    DuplicateVariable {
        /// The repeated name.
        name: String,
    },

    /// A `{?...}` block that is not the final element, or a second one.
    #[error("query expansion block must be the last element of the template")]
    #[diagnostic(code(dispatch::template::query_not_last))]
    QueryNotLast,

    /// An RFC 6570 operator other than `?` (`{+x}`, `{#x}`, `{/x}`, ...).
    #[error("unsupported expression operator '{operator}'")]
    #[diagnostic(
        code(dispatch::template::unsupported_operator),
        help("only simple '{{name}}' path variables and a trailing '{{?a,b}}' block are supported")
    )]
    UnsupportedOperator {
        /// The operator character.
        operator: char,
    },

    /// Two variables in one segment with no literal between them.
    #[error("variables '{first}' and '{second}' are adjacent with no separating literal")]
    #[diagnostic(code(dispatch::template::adjacent_variables))]
    AdjacentVariables {
        /// The first variable.
        first: String,
        /// The variable immediately following it.
        second: String,
    },

    /// Expansion was asked for a template whose path variable has no value.
    #[error("no value supplied for path variable '{name}'")]
    #[diagnostic(code(dispatch::template::missing_variable))]
    MissingVariable {
        /// The unbound variable.
        name: String,
    },

    /// Expansion was given a value that would not match back.
    #[error("value for '{name}' cannot be expanded: {reason}")]
    #[diagnostic(code(dispatch::template::invalid_value))]
    InvalidValue {
        /// The variable.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
}
