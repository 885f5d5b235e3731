//! Schema coercion of untyped arguments.
//!
//! [`coerce`] turns a loosely typed argument map (JSON from a tool call,
//! strings extracted from a URI, string-valued prompt arguments) into values
//! matching an ordered [`ParameterSpec`] list.
//!
//! Per parameter, in declaration order:
//!
//! 1. absent (or `null`) with a default: the default is used as-is;
//! 2. absent, required, no default: [`CoercionError::MissingParameter`];
//! 3. present: structural conversion to the declared type, or
//!    [`CoercionError::TypeMismatch`];
//! 4. constraints, or [`CoercionError::ConstraintViolation`].
//!
//! The function is pure: the input is never modified, and the first failing
//! parameter in declaration order is reported. Keys in the input that no
//! parameter declares are dropped.

use serde_json::{Map, Number, Value};

use crate::error::{CoercionError, Constraint};
use crate::schema::{Constraints, ParamType, ParameterSpec};

/// Coerce `raw` against `specs`, producing a new map with typed values.
///
/// # Example
///
/// ```rust
/// use dispatchkit_core::coerce::coerce;
/// use dispatchkit_core::schema::ParameterSpec;
///
/// let specs = vec![ParameterSpec::integer("user_id")];
/// let raw = serde_json::json!({ "user_id": "42" });
/// let typed = coerce(raw.as_object().unwrap(), &specs).unwrap();
/// assert_eq!(typed["user_id"], 42);
/// ```
pub fn coerce(
    raw: &Map<String, Value>,
    specs: &[ParameterSpec],
) -> Result<Map<String, Value>, CoercionError> {
    coerce_fields(raw, specs, None)
}

/// Convert a single value to `ty` and return it, with no constraint checks.
///
/// `name` only labels the error.
pub fn coerce_value(name: &str, ty: &ParamType, value: &Value) -> Result<Value, CoercionError> {
    convert(name, ty, value)
}

fn coerce_fields(
    raw: &Map<String, Value>,
    specs: &[ParameterSpec],
    prefix: Option<&str>,
) -> Result<Map<String, Value>, CoercionError> {
    let mut out = Map::new();
    for spec in specs {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{}", spec.name),
            None => spec.name.clone(),
        };
        match raw.get(&spec.name).filter(|v| !v.is_null()) {
            Some(value) => {
                let converted = convert(&path, &spec.declared_type, value)?;
                check_constraints(&path, &spec.constraints, &converted)?;
                out.insert(spec.name.clone(), converted);
            }
            None => {
                if let Some(default) = &spec.default {
                    out.insert(spec.name.clone(), default.clone());
                } else if spec.required {
                    return Err(CoercionError::MissingParameter { name: path });
                }
            }
        }
    }
    Ok(out)
}

fn convert(path: &str, ty: &ParamType, value: &Value) -> Result<Value, CoercionError> {
    let mismatch = || CoercionError::TypeMismatch {
        name: path.to_string(),
        expected: ty.to_string(),
        got: describe(value),
    };

    match ty {
        ParamType::Any => Ok(value.clone()),
        ParamType::String => match value {
            Value::String(_) => Ok(value.clone()),
            _ => Err(mismatch()),
        },
        ParamType::Integer => match value {
            Value::Number(n) => integral(n).map(Value::from).ok_or_else(mismatch),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        ParamType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        ParamType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) if s == "true" => Ok(Value::Bool(true)),
            Value::String(s) if s == "false" => Ok(Value::Bool(false)),
            _ => Err(mismatch()),
        },
        ParamType::Array { items } => {
            let parsed;
            let value = match value {
                Value::String(s) => {
                    parsed = parse_embedded(s).ok_or_else(mismatch)?;
                    &parsed
                }
                other => other,
            };
            let Value::Array(elements) = value else {
                return Err(mismatch());
            };
            elements
                .iter()
                .enumerate()
                .map(|(i, element)| convert(&format!("{path}[{i}]"), items, element))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        ParamType::Map { values } => {
            let parsed;
            let value = match value {
                Value::String(s) => {
                    parsed = parse_embedded(s).ok_or_else(mismatch)?;
                    &parsed
                }
                other => other,
            };
            let Value::Object(entries) = value else {
                return Err(mismatch());
            };
            let mut out = Map::new();
            for (key, entry) in entries {
                out.insert(key.clone(), convert(&format!("{path}.{key}"), values, entry)?);
            }
            Ok(Value::Object(out))
        }
        ParamType::Record { fields } => {
            let parsed;
            let value = match value {
                Value::String(s) => {
                    parsed = parse_embedded(s).ok_or_else(mismatch)?;
                    &parsed
                }
                other => other,
            };
            let Value::Object(entries) = value else {
                return Err(mismatch());
            };
            coerce_fields(entries, fields, Some(path)).map(Value::Object)
        }
    }
}

/// Integers arrive as JSON integers or as floats with no fractional part.
fn integral(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive.
    let f = n.as_f64()?;
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

/// Structured values may be sent JSON-encoded inside a string.
fn parse_embedded(s: &str) -> Option<Value> {
    serde_json::from_str(s).ok()
}

fn check_constraints(
    path: &str,
    constraints: &Constraints,
    value: &Value,
) -> Result<(), CoercionError> {
    let violation = |constraint| CoercionError::ConstraintViolation {
        name: path.to_string(),
        constraint,
    };

    if let Some(n) = value.as_f64() {
        if let Some(limit) = constraints.ge.filter(|&limit| n < limit) {
            return Err(violation(Constraint::Ge(limit)));
        }
        if let Some(limit) = constraints.le.filter(|&limit| n > limit) {
            return Err(violation(Constraint::Le(limit)));
        }
        if let Some(limit) = constraints.gt.filter(|&limit| n <= limit) {
            return Err(violation(Constraint::Gt(limit)));
        }
        if let Some(limit) = constraints.lt.filter(|&limit| n >= limit) {
            return Err(violation(Constraint::Lt(limit)));
        }
    }

    let len = match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(a) => Some(a.len()),
        _ => None,
    };
    if let Some(len) = len {
        if let Some(min) = constraints.min_length.filter(|&min| len < min) {
            return Err(violation(Constraint::MinLength(min)));
        }
        if let Some(max) = constraints.max_length.filter(|&max| len > max) {
            return Err(violation(Constraint::MaxLength(max)));
        }
    }

    if let Some(allowed) = &constraints.allowed_values {
        if !allowed.iter().any(|candidate| same_value(candidate, value)) {
            return Err(violation(Constraint::AllowedValues(allowed.clone())));
        }
    }

    Ok(())
}

/// Equality that treats `2` and `2.0` as the same number.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y || x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Short description of a value for type-mismatch reports.
fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) if s.chars().count() > 32 => {
            let head: String = s.chars().take(32).collect();
            format!("string \"{head}...\"")
        }
        Value::String(s) => format!("string \"{s}\""),
        Value::Array(a) => format!("array of {}", a.len()),
        Value::Object(_) => "object".to_string(),
    }
}
