//! End-to-end keyword semantics: numeric equality, annotation-driven
//! `unevaluated*`, combinators, conditionals, and format modes.

use json_schema_validation::{
    default_vocabularies_for, vocabulary, Dialect, Draft2019Dialect, SpecificationVersion,
    Validator,
};
use std::collections::HashSet;

fn check(schema: &str, instance: &str) -> bool {
    let mut validator = Validator::new();
    let uri = validator.register_schema(schema).unwrap();
    validator.validate(&uri, instance).unwrap().is_valid()
}

#[test]
fn numbers_compare_mathematically() {
    assert!(check(r#"{"const": 1}"#, "1.0"));
    assert!(check(r#"{"const": 1.0}"#, "1"));
    assert!(!check(r#"{"const": 1}"#, "1.5"));
    assert!(check(r#"{"enum": [1, "a"]}"#, "1.0"));
    assert!(!check(r#"{"uniqueItems": true}"#, "[1, 1.0]"));
    assert!(check(r#"{"uniqueItems": true}"#, "[1, 1.5]"));
}

#[test]
fn integer_type_accepts_integral_floats() {
    assert!(check(r#"{"type": "integer"}"#, "1.0"));
    assert!(!check(r#"{"type": "integer"}"#, "1.5"));
    assert!(check(r#"{"type": "number"}"#, "1"));
}

#[test]
fn unevaluated_properties_sees_sibling_applicators() {
    let schema = r#"{
        "allOf": [
            {"properties": {"a": {"type": "integer"}}}
        ],
        "properties": {"b": {"type": "integer"}},
        "unevaluatedProperties": false
    }"#;
    assert!(check(schema, r#"{"a": 1, "b": 2}"#));
    assert!(!check(schema, r#"{"a": 1, "b": 2, "c": 3}"#));
}

#[test]
fn unevaluated_properties_is_independent_of_source_order() {
    // The keyword runs last regardless of where it appears in the text.
    let first = r#"{
        "unevaluatedProperties": false,
        "properties": {"a": {"type": "integer"}}
    }"#;
    let second = r#"{
        "properties": {"a": {"type": "integer"}},
        "unevaluatedProperties": false
    }"#;
    for schema in [first, second] {
        assert!(check(schema, r#"{"a": 1}"#));
        assert!(!check(schema, r#"{"a": 1, "b": 2}"#));
    }
}

#[test]
fn failed_branches_do_not_contribute_evaluated_properties() {
    let schema = r#"{
        "anyOf": [
            {"properties": {"a": {"type": "string"}}, "required": ["a"]},
            {"properties": {"b": {"type": "integer"}}, "required": ["b"]}
        ],
        "unevaluatedProperties": false
    }"#;
    // Only the second branch passes; "b" is evaluated.
    assert!(check(schema, r#"{"b": 1}"#));
    // Both branches pass; both properties are evaluated.
    assert!(check(schema, r#"{"a": "x", "b": 1}"#));
    // The first branch fails on "a", so its contribution is retracted and
    // "a" remains unevaluated.
    assert!(!check(schema, r#"{"a": 1, "b": 1}"#));
}

#[test]
fn unevaluated_properties_sees_through_ref() {
    let schema = r##"{
        "$defs": {
            "base": {"properties": {"a": {"type": "integer"}}}
        },
        "$ref": "#/$defs/base",
        "unevaluatedProperties": false
    }"##;
    assert!(check(schema, r#"{"a": 1}"#));
    assert!(!check(schema, r#"{"a": 1, "b": 2}"#));
}

#[test]
fn unevaluated_items_with_prefix_items() {
    let schema = r#"{
        "prefixItems": [{"type": "string"}],
        "unevaluatedItems": false
    }"#;
    assert!(check(schema, r#"["a"]"#));
    assert!(!check(schema, r#"["a", 1]"#));
}

#[test]
fn contains_marks_items_evaluated() {
    let schema = r#"{
        "contains": {"type": "integer"},
        "unevaluatedItems": {"type": "string"}
    }"#;
    assert!(check(schema, r#"["a", 1]"#));
    assert!(!check(schema, r#"["a", 1, true]"#));
}

#[test]
fn contains_bounds() {
    let schema = r#"{"contains": {"type": "integer"}, "minContains": 2, "maxContains": 3}"#;
    assert!(!check(schema, r#"[1]"#));
    assert!(check(schema, r#"[1, "x", 2]"#));
    assert!(check(schema, r#"[1, 2, 3]"#));
    assert!(!check(schema, r#"[1, 2, 3, 4]"#));
}

#[test]
fn min_contains_zero_allows_empty_arrays() {
    let schema = r#"{"contains": {"type": "integer"}, "minContains": 0}"#;
    assert!(check(schema, "[]"));
    assert!(check(schema, r#"["a"]"#));
}

#[test]
fn one_of_requires_exactly_one_match() {
    let schema = r#"{"oneOf": [{"type": "integer"}, {"minimum": 10}]}"#;
    assert!(check(schema, "5"));
    assert!(check(schema, "10.5"));
    assert!(!check(schema, "15"));
    assert!(!check(schema, "9.5"));
}

#[test]
fn if_then_else() {
    let schema = r#"{
        "if": {"type": "string"},
        "then": {"minLength": 2},
        "else": {"minimum": 0}
    }"#;
    assert!(check(schema, r#""ab""#));
    assert!(!check(schema, r#""a""#));
    assert!(check(schema, "5"));
    assert!(!check(schema, "-1"));
}

#[test]
fn dependent_schemas_and_required() {
    let schema = r#"{
        "dependentSchemas": {"credit": {"required": ["billing"]}},
        "dependentRequired": {"shipping": ["address"]}
    }"#;
    assert!(check(schema, "{}"));
    assert!(check(schema, r#"{"credit": 1, "billing": 2}"#));
    assert!(!check(schema, r#"{"credit": 1}"#));
    assert!(check(schema, r#"{"shipping": 1, "address": 2}"#));
    assert!(!check(schema, r#"{"shipping": 1}"#));
}

#[test]
fn additional_properties_respects_siblings() {
    let schema = r#"{
        "properties": {"a": {}},
        "patternProperties": {"^x-": {"type": "integer"}},
        "additionalProperties": false
    }"#;
    assert!(check(schema, r#"{"a": 1, "x-b": 2}"#));
    assert!(!check(schema, r#"{"a": 1, "x-b": "s"}"#));
    assert!(!check(schema, r#"{"other": 1}"#));
}

#[test]
fn property_names() {
    let schema = r#"{"propertyNames": {"pattern": "^[a-z]+$"}}"#;
    assert!(check(schema, r#"{"abc": 1}"#));
    assert!(!check(schema, r#"{"Not Valid": 1}"#));
}

#[test]
fn boolean_schemas() {
    assert!(check("true", r#"{"anything": 1}"#));
    assert!(!check("false", "null"));
}

#[test]
fn format_is_an_annotation_by_default() {
    let mut validator = Validator::new();
    let uri = validator
        .register_schema(r#"{"format": "ipv4"}"#)
        .unwrap();
    let outcome = validator.validate(&uri, r#""999.9.9.9""#).unwrap();
    assert!(outcome.is_valid());
    assert!(outcome
        .annotations()
        .iter()
        .any(|annotation| annotation.keyword == "format"));
}

struct FormatAssertingDialect;

impl Dialect for FormatAssertingDialect {
    fn specification_version(&self) -> SpecificationVersion {
        SpecificationVersion::Draft2020_12
    }

    fn default_vocabularies(&self) -> HashSet<String> {
        let mut vocabularies = default_vocabularies_for(SpecificationVersion::Draft2020_12);
        vocabularies.insert(vocabulary::FORMAT_ASSERTION_2020.to_string());
        vocabularies
    }
}

#[test]
fn format_asserts_when_the_vocabulary_is_active() {
    let mut validator = Validator::builder()
        .with_dialect(FormatAssertingDialect)
        .build();
    let uri = validator
        .register_schema(r#"{"format": "ipv4"}"#)
        .unwrap();
    assert!(validator.validate(&uri, r#""127.0.0.1""#).unwrap().is_valid());
    assert!(!validator.validate(&uri, r#""999.9.9.9""#).unwrap().is_valid());
    // Non-strings are out of scope for format.
    assert!(validator.validate(&uri, "12").unwrap().is_valid());
}

#[test]
fn annotations_are_collected() {
    let mut validator = Validator::new();
    let uri = validator
        .register_schema(r#"{"title": "Thing", "x-internal": {"tag": 1}}"#)
        .unwrap();
    let outcome = validator.validate(&uri, "null").unwrap();
    assert!(outcome.is_valid());
    let keywords: Vec<&str> = outcome
        .annotations()
        .iter()
        .map(|annotation| annotation.keyword.as_str())
        .collect();
    assert!(keywords.contains(&"title"));
    assert!(keywords.contains(&"x-internal"));
}

#[test]
fn legacy_items_tuple_with_additional_items() {
    let mut validator = Validator::builder().with_dialect(Draft2019Dialect).build();
    let uri = validator
        .register_schema(
            r#"{
                "items": [{"type": "string"}, {"type": "integer"}],
                "additionalItems": {"type": "boolean"}
            }"#,
        )
        .unwrap();
    assert!(validator.validate(&uri, r#"["a", 1, true]"#).unwrap().is_valid());
    assert!(!validator.validate(&uri, r#"["a", 1, 5]"#).unwrap().is_valid());
    assert!(!validator.validate(&uri, r#"[1]"#).unwrap().is_valid());
}

#[test]
fn errors_carry_locations() {
    let mut validator = Validator::new();
    let uri = validator
        .register_schema(r#"{"properties": {"age": {"type": "integer"}}}"#)
        .unwrap();
    let outcome = validator.validate(&uri, r#"{"age": "old"}"#).unwrap();
    assert!(!outcome.is_valid());
    let error = outcome
        .errors()
        .iter()
        .find(|error| error.keyword.as_deref() == Some("type"))
        .expect("type error");
    assert_eq!(error.instance_location, "/age");
    assert!(error.schema_location.ends_with("/properties/age/type"));
    assert_eq!(error.evaluation_path, "/properties/age/type");
}
