//! URI templates for resource routing.
//!
//! A template is a literal skeleton interleaved with path variables
//! (`{name}`) and at most one trailing query-expansion block
//! (`{?a,b,c}`), a small subset of RFC 6570.
//!
//! - A path variable binds a non-empty run of characters within one
//!   `/`-separated segment. A segment may mix literals and variables
//!   (`file://{stem}.txt`) as long as two variables are separated by a
//!   literal.
//! - The query block lists the recognized query keys. Recognized keys that
//!   are present bind their (form-decoded) value; absent ones bind their
//!   default when one is set. Unrecognized keys are ignored.
//!
//! Path values are always strings at this layer. Typed conversion happens in
//! the [coercer](crate::coerce).
//!
//! # Example
//!
//! ```rust
//! use dispatchkit_core::template::UriTemplate;
//!
//! let template = UriTemplate::compile("api://{endpoint}{?version,limit,offset}")
//!     .unwrap()
//!     .with_query_default("version", 1)
//!     .with_query_default("limit", 10)
//!     .with_query_default("offset", 0);
//!
//! let m = template.matches("api://users?version=2&limit=50").unwrap();
//! assert_eq!(m.path_vars["endpoint"], "users");
//! assert_eq!(m.query_vars["version"], "2");
//! assert_eq!(m.query_vars["offset"], 0);
//! ```

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use url::form_urlencoded;

use crate::error::TemplateError;

/// Characters that may not appear in a path variable value.
const PATH_RESERVED: [char; 3] = ['/', '?', '#'];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Var(String),
}

#[derive(Debug, Clone)]
struct QueryVar {
    name: String,
    default: Option<Value>,
}

/// Variables extracted from a matching URI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateMatch {
    /// Path variables, always strings.
    pub path_vars: BTreeMap<String, String>,
    /// Query variables: raw strings for keys present in the URI, declared
    /// defaults for the rest.
    pub query_vars: Map<String, Value>,
}

impl TemplateMatch {
    /// Merge path and query variables into one argument map.
    #[must_use]
    pub fn into_arguments(self) -> Map<String, Value> {
        let mut args: Map<String, Value> = self
            .path_vars
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        args.extend(self.query_vars);
        args
    }
}

/// A compiled URI template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    source: String,
    segments: Vec<Vec<Part>>,
    query: Vec<QueryVar>,
}

impl UriTemplate {
    /// Compile a template string.
    pub fn compile(template: &str) -> Result<Self, TemplateError> {
        let tokens = tokenize(template)?;

        let mut seen = HashSet::new();
        let mut segments: Vec<Vec<Part>> = vec![Vec::new()];
        let mut query = Vec::new();

        for token in tokens {
            match token {
                Token::Literal(text) => {
                    let mut pieces = text.split('/');
                    if let Some(first) = pieces.next() {
                        push_literal(segments.last_mut(), first);
                    }
                    for piece in pieces {
                        segments.push(Vec::new());
                        push_literal(segments.last_mut(), piece);
                    }
                }
                Token::Var(name) => {
                    if !seen.insert(name.clone()) {
                        return Err(TemplateError::DuplicateVariable { name });
                    }
                    if let Some(segment) = segments.last_mut() {
                        if let Some(Part::Var(prev)) = segment.last() {
                            return Err(TemplateError::AdjacentVariables {
                                first: prev.clone(),
                                second: name,
                            });
                        }
                        segment.push(Part::Var(name));
                    }
                }
                Token::Query(names) => {
                    for name in names {
                        if !seen.insert(name.clone()) {
                            return Err(TemplateError::DuplicateVariable { name });
                        }
                        query.push(QueryVar {
                            name,
                            default: None,
                        });
                    }
                }
            }
        }

        Ok(Self {
            source: template.to_string(),
            segments,
            query,
        })
    }

    /// Set the value bound to an absent query key.
    ///
    /// Names that are not query variables of this template are ignored.
    #[must_use]
    pub fn with_query_default(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_query_default(name, value);
        self
    }

    /// Set the value bound to an absent query key.
    ///
    /// Returns `false` if `name` is not a query variable of this template.
    pub fn set_query_default(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match self.query.iter_mut().find(|q| q.name == name) {
            Some(var) => {
                var.default = Some(value.into());
                true
            }
            None => false,
        }
    }

    /// The original template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Path variable names in template order.
    pub fn path_variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().flatten().filter_map(|part| match part {
            Part::Var(name) => Some(name.as_str()),
            Part::Literal(_) => None,
        })
    }

    /// Query variable names in template order.
    pub fn query_variables(&self) -> impl Iterator<Item = &str> {
        self.query.iter().map(|q| q.name.as_str())
    }

    /// Declared default for a query variable.
    #[must_use]
    pub fn query_default(&self, name: &str) -> Option<&Value> {
        self.query
            .iter()
            .find(|q| q.name == name)
            .and_then(|q| q.default.as_ref())
    }

    /// Whether `name` is a path or query variable.
    #[must_use]
    pub fn has_variable(&self, name: &str) -> bool {
        self.path_variables().any(|v| v == name) || self.query_variables().any(|v| v == name)
    }

    /// Whether the template has no variables at all (a fixed URI).
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.query.is_empty() && self.path_variables().next().is_none()
    }

    /// The path skeleton with variable names erased, e.g. `users://{}/profile`.
    ///
    /// Two templates with the same skeleton match exactly the same paths.
    #[must_use]
    pub fn skeleton(&self) -> String {
        self.segments
            .iter()
            .map(|segment| {
                segment
                    .iter()
                    .map(|part| match part {
                        Part::Literal(text) => text.as_str(),
                        Part::Var(_) => "{}",
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Match a concrete URI, extracting variables.
    #[must_use]
    pub fn matches(&self, uri: &str) -> Option<TemplateMatch> {
        let uri = uri.split_once('#').map_or(uri, |(before, _)| before);
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (uri, None),
        };

        let values: Vec<&str> = path.split('/').collect();
        if values.len() != self.segments.len() {
            return None;
        }

        let mut result = TemplateMatch::default();
        for (parts, value) in self.segments.iter().zip(values) {
            match_segment(parts, value, &mut result.path_vars)?;
        }

        if let Some(query) = query {
            for (key, value) in form_urlencoded::parse(query.as_bytes()) {
                if self.query.iter().any(|q| q.name == key)
                    && !result.query_vars.contains_key(key.as_ref())
                {
                    result
                        .query_vars
                        .insert(key.into_owned(), Value::String(value.into_owned()));
                }
            }
        }
        for var in &self.query {
            if let Some(default) = &var.default {
                if !result.query_vars.contains_key(&var.name) {
                    result.query_vars.insert(var.name.clone(), default.clone());
                }
            }
        }

        Some(result)
    }

    /// Expand the template into a concrete URI.
    ///
    /// Every path variable must be supplied. Query variables are emitted in
    /// template order when supplied and omitted otherwise. Scalar values are
    /// rendered as text; strings are used verbatim.
    pub fn expand(&self, vars: &Map<String, Value>) -> Result<String, TemplateError> {
        let mut segments = Vec::with_capacity(self.segments.len());
        for parts in &self.segments {
            let mut out = String::new();
            for (i, part) in parts.iter().enumerate() {
                match part {
                    Part::Literal(text) => out.push_str(text),
                    Part::Var(name) => {
                        let value = vars
                            .get(name)
                            .filter(|v| !v.is_null())
                            .ok_or_else(|| TemplateError::MissingVariable { name: name.clone() })?;
                        let text = render(name, value)?;
                        let invalid = |reason: &str| TemplateError::InvalidValue {
                            name: name.clone(),
                            reason: reason.to_string(),
                        };
                        if text.is_empty() {
                            return Err(invalid("path values must be non-empty"));
                        }
                        if text.contains(PATH_RESERVED) {
                            return Err(invalid("path values may not contain '/', '?' or '#'"));
                        }
                        if let Some(Part::Literal(next)) = parts.get(i + 1) {
                            if text.contains(next.as_str()) {
                                return Err(invalid("value contains the literal that follows it"));
                            }
                        }
                        out.push_str(&text);
                    }
                }
            }
            segments.push(out);
        }
        let mut uri = segments.join("/");

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        let mut any = false;
        for var in &self.query {
            if let Some(value) = vars.get(&var.name).filter(|v| !v.is_null()) {
                serializer.append_pair(&var.name, &render(&var.name, value)?);
                any = true;
            }
        }
        if any {
            uri.push('?');
            uri.push_str(&serializer.finish());
        }
        Ok(uri)
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for UriTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

enum Token {
    Literal(String),
    Var(String),
    Query(Vec<String>),
}

fn tokenize(template: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut query_seen = false;
    let mut chars = template.char_indices();

    while let Some((pos, c)) = chars.next() {
        match c {
            '}' => return Err(TemplateError::Unbalanced { position: pos }),
            '{' => {
                let mut expr = String::new();
                let mut closed = false;
                for (inner_pos, inner) in chars.by_ref() {
                    match inner {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => return Err(TemplateError::Unbalanced { position: inner_pos }),
                        other => expr.push(other),
                    }
                }
                if !closed {
                    return Err(TemplateError::Unbalanced { position: pos });
                }
                if query_seen {
                    return Err(TemplateError::QueryNotLast);
                }
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(parse_expression(&expr, pos)?);
                query_seen = matches!(tokens.last(), Some(Token::Query(_)));
            }
            other => {
                if query_seen {
                    return Err(TemplateError::QueryNotLast);
                }
                literal.push(other);
            }
        }
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}

fn parse_expression(expr: &str, position: usize) -> Result<Token, TemplateError> {
    let Some(first) = expr.chars().next() else {
        return Err(TemplateError::EmptyVariable { position });
    };
    if first == '?' {
        let names = expr[1..]
            .split(',')
            .map(|name| validate_name(name.trim(), position))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Token::Query(names));
    }
    if "+#./;&=,!@|".contains(first) {
        return Err(TemplateError::UnsupportedOperator { operator: first });
    }
    validate_name(expr, position).map(Token::Var)
}

fn validate_name(name: &str, position: usize) -> Result<String, TemplateError> {
    if name.is_empty() {
        return Err(TemplateError::EmptyVariable { position });
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(TemplateError::InvalidVariableName {
            name: name.to_string(),
        });
    }
    Ok(name.to_string())
}

fn push_literal(segment: Option<&mut Vec<Part>>, text: &str) {
    let Some(segment) = segment else { return };
    if text.is_empty() {
        return;
    }
    match segment.last_mut() {
        Some(Part::Literal(existing)) => existing.push_str(text),
        _ => segment.push(Part::Literal(text.to_string())),
    }
}

fn match_segment(
    parts: &[Part],
    value: &str,
    bound: &mut BTreeMap<String, String>,
) -> Option<()> {
    let mut rest = value;
    for (i, part) in parts.iter().enumerate() {
        match part {
            Part::Literal(text) => {
                rest = rest.strip_prefix(text.as_str())?;
            }
            Part::Var(name) => {
                let end = match parts.get(i + 1) {
                    // A trailing literal anchors at the end of the segment.
                    Some(Part::Literal(next)) if i + 2 == parts.len() => {
                        rest.strip_suffix(next.as_str())?.len()
                    }
                    Some(Part::Literal(next)) => rest.find(next.as_str())?,
                    _ => rest.len(),
                };
                let captured = &rest[..end];
                if captured.is_empty() {
                    return None;
                }
                bound.insert(name.clone(), captured.to_string());
                rest = &rest[end..];
            }
        }
    }
    rest.is_empty().then_some(())
}

fn render(name: &str, value: &Value) -> Result<String, TemplateError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(TemplateError::InvalidValue {
            name: name.to_string(),
            reason: "only scalar values can be expanded".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_path_variable_match() {
        let t = UriTemplate::compile("users://{user_id}/profile").unwrap();
        let m = t.matches("users://42/profile").unwrap();
        assert_eq!(m.path_vars["user_id"], "42");
        assert!(m.query_vars.is_empty());

        assert!(t.matches("users://42/settings").is_none());
        assert!(t.matches("users://42/profile/extra").is_none());
        assert!(t.matches("users:///profile").is_none());
    }

    #[test]
    fn test_query_block_with_defaults() {
        let t = UriTemplate::compile("api://{endpoint}{?version,limit,offset}")
            .unwrap()
            .with_query_default("version", 1)
            .with_query_default("limit", 10)
            .with_query_default("offset", 0);

        let m = t.matches("api://users?version=2&limit=50").unwrap();
        assert_eq!(m.path_vars["endpoint"], "users");
        assert_eq!(m.query_vars["version"], "2");
        assert_eq!(m.query_vars["limit"], "50");
        assert_eq!(m.query_vars["offset"], 0);

        let m = t.matches("api://orders").unwrap();
        assert_eq!(m.query_vars["version"], 1);
        assert_eq!(m.query_vars["limit"], 10);
    }

    #[test]
    fn test_unrecognized_query_keys_ignored() {
        let t = UriTemplate::compile("api://{endpoint}{?limit}").unwrap();
        let m = t.matches("api://users?debug=1&limit=5&trace").unwrap();
        assert_eq!(m.query_vars.len(), 1);
        assert_eq!(m.query_vars["limit"], "5");
    }

    #[test]
    fn test_query_values_are_decoded_first_wins() {
        let t = UriTemplate::compile("search://{index}{?q}").unwrap();
        let m = t.matches("search://docs?q=hello%20world&q=ignored").unwrap();
        assert_eq!(m.query_vars["q"], "hello world");
    }

    #[test]
    fn test_template_without_query_block_ignores_query() {
        let t = UriTemplate::compile("data://config").unwrap();
        assert!(t.is_static());
        assert!(t.matches("data://config").is_some());
        assert!(t.matches("data://config?x=1").is_some());
        assert!(t.matches("data://configs").is_none());
    }

    #[test]
    fn test_mixed_segment() {
        let t = UriTemplate::compile("file:///{dir}/{stem}.{ext}").unwrap();
        let m = t.matches("file:///docs/report.final.pdf").unwrap();
        assert_eq!(m.path_vars["dir"], "docs");
        assert_eq!(m.path_vars["stem"], "report");
        assert_eq!(m.path_vars["ext"], "final.pdf");

        let t = UriTemplate::compile("file:///{name}.txt").unwrap();
        let m = t.matches("file:///a.b.txt").unwrap();
        assert_eq!(m.path_vars["name"], "a.b");
        assert!(t.matches("file:///.txt").is_none());
    }

    #[test]
    fn test_compile_errors() {
        assert_eq!(
            UriTemplate::compile("users://{id/profile").unwrap_err(),
            TemplateError::Unbalanced { position: 8 }
        );
        assert!(matches!(
            UriTemplate::compile("users://id}/profile").unwrap_err(),
            TemplateError::Unbalanced { .. }
        ));
        assert!(matches!(
            UriTemplate::compile("users://{a{b}}").unwrap_err(),
            TemplateError::Unbalanced { .. }
        ));
        assert_eq!(
            UriTemplate::compile("x://{a}/{a}").unwrap_err(),
            TemplateError::DuplicateVariable { name: "a".into() }
        );
        assert_eq!(
            UriTemplate::compile("x://{a}{?a}").unwrap_err(),
            TemplateError::DuplicateVariable { name: "a".into() }
        );
        assert_eq!(
            UriTemplate::compile("x://{?q}/{a}").unwrap_err(),
            TemplateError::QueryNotLast
        );
        assert_eq!(
            UriTemplate::compile("x://{a}{?q}{?r}").unwrap_err(),
            TemplateError::QueryNotLast
        );
        assert!(matches!(
            UriTemplate::compile("x://{}").unwrap_err(),
            TemplateError::EmptyVariable { .. }
        ));
        assert!(matches!(
            UriTemplate::compile("x://{a}{?}").unwrap_err(),
            TemplateError::EmptyVariable { .. }
        ));
        assert_eq!(
            UriTemplate::compile("x://{+path}").unwrap_err(),
            TemplateError::UnsupportedOperator { operator: '+' }
        );
        assert!(matches!(
            UriTemplate::compile("x://{a-b}").unwrap_err(),
            TemplateError::InvalidVariableName { .. }
        ));
        assert!(matches!(
            UriTemplate::compile("x://{a}{b}").unwrap_err(),
            TemplateError::AdjacentVariables { .. }
        ));
    }

    #[test]
    fn test_variable_listing() {
        let t = UriTemplate::compile("api://{endpoint}/{id}{?version,limit}").unwrap();
        assert_eq!(t.path_variables().collect::<Vec<_>>(), vec!["endpoint", "id"]);
        assert_eq!(t.query_variables().collect::<Vec<_>>(), vec!["version", "limit"]);
        assert!(t.has_variable("limit"));
        assert!(!t.has_variable("offset"));
        assert_eq!(t.skeleton(), "api://{}/{}");
        assert_eq!(t.to_string(), "api://{endpoint}/{id}{?version,limit}");
    }

    #[test]
    fn test_expand_round_trip() {
        let t = UriTemplate::compile("api://{endpoint}/{id}{?version,limit}").unwrap();
        let vars = json!({ "endpoint": "users", "id": 7, "limit": "a b&c" });
        let vars = vars.as_object().unwrap();

        let uri = t.expand(vars).unwrap();
        assert_eq!(uri, "api://users/7?limit=a+b%26c");

        let m = t.matches(&uri).unwrap();
        assert_eq!(m.path_vars["endpoint"], "users");
        assert_eq!(m.path_vars["id"], "7");
        assert_eq!(m.query_vars["limit"], "a b&c");
        assert!(!m.query_vars.contains_key("version"));
    }

    #[test]
    fn test_expand_rejects_unmatchable_values() {
        let t = UriTemplate::compile("users://{user_id}/profile").unwrap();
        assert_eq!(
            t.expand(&Map::new()).unwrap_err(),
            TemplateError::MissingVariable {
                name: "user_id".into()
            }
        );
        let vars = json!({ "user_id": "a/b" });
        assert!(matches!(
            t.expand(vars.as_object().unwrap()).unwrap_err(),
            TemplateError::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_into_arguments() {
        let t = UriTemplate::compile("api://{endpoint}{?limit}")
            .unwrap()
            .with_query_default("limit", 10);
        let args = t.matches("api://users").unwrap().into_arguments();
        assert_eq!(args["endpoint"], "users");
        assert_eq!(args["limit"], 10);
    }
}
