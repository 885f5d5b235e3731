//! Integration tests for argument coercion.

use dispatchkit::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::{Map, Value, json};

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn width() -> ParameterSpec {
    ParameterSpec::integer("width").ge(1.0).le(2000.0).default_value(800)
}

#[test]
fn test_default_applied() {
    let typed = coerce(&Map::new(), &[width()]).unwrap();
    assert_eq!(typed["width"], json!(800));
}

#[test]
fn test_upper_bound_violation() {
    let err = coerce(&object(json!({ "width": 3000 })), &[width()]).unwrap_err();
    assert_eq!(
        err,
        CoercionError::ConstraintViolation {
            name: "width".into(),
            constraint: Constraint::Le(2000.0),
        }
    );
}

#[test]
fn test_first_failure_in_declaration_order() {
    let specs = vec![
        ParameterSpec::string("image_url"),
        ParameterSpec::boolean("resize").default_value(false),
        width(),
        ParameterSpec::string("format").allowed_values(["jpeg", "png", "webp"]),
    ];
    // Insertion order of the raw map puts the bad format first; declaration
    // order decides which failure is reported.
    let raw = object(json!({ "format": "gif", "width": "wide" }));
    let err = coerce(&raw, &specs).unwrap_err();
    assert_eq!(
        err,
        CoercionError::MissingParameter {
            name: "image_url".into()
        }
    );

    let raw = object(json!({ "format": "gif", "width": "wide", "image_url": "u" }));
    let err = coerce(&raw, &specs).unwrap_err();
    assert_eq!(err.kind(), "type_mismatch");
    assert_eq!(err.parameter(), "width");
}

#[test]
fn test_input_is_untouched_on_failure() {
    let raw = object(json!({ "width": "3000" }));
    let before = raw.clone();
    assert!(coerce(&raw, &[width()]).is_err());
    assert_eq!(raw, before);
}

#[test]
fn test_prompt_style_string_arguments() {
    let specs = vec![
        ParameterSpec::new("numbers", ParamType::array(ParamType::Number)),
        ParameterSpec::new("metadata", ParamType::map(ParamType::String)),
    ];
    let raw = object(json!({
        "numbers": "[1, 2, 3.5]",
        "metadata": "{\"source\": \"sensor\"}",
    }));
    let typed = coerce(&raw, &specs).unwrap();
    assert_eq!(typed["numbers"], json!([1, 2, 3.5]));
    assert_eq!(typed["metadata"], json!({ "source": "sensor" }));
}

#[test]
fn test_nested_record_errors_report_path() {
    let person = ParamType::record(vec![
        ParameterSpec::string("name"),
        ParameterSpec::integer("age").ge(0.0),
    ]);
    let specs = vec![ParameterSpec::new("person", person)];

    let typed = coerce(&object(json!({ "person": { "name": "Ada", "age": "36" } })), &specs).unwrap();
    assert_eq!(typed["person"], json!({ "name": "Ada", "age": 36 }));

    let err = coerce(&object(json!({ "person": { "name": "Ada", "age": -1 } })), &specs).unwrap_err();
    assert_eq!(err.parameter(), "person.age");
}

#[test]
fn test_error_body_for_caller() {
    let err: DispatchError = coerce(&object(json!({ "width": 0 })), &[width()])
        .unwrap_err()
        .into();
    let body = ErrorBody::from(&err);
    assert_eq!(body.kind, "constraint_violation");
    assert_eq!(body.data.unwrap()["constraint"]["constraint"], "ge");
}
