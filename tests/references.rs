//! Reference resolution: pointers, anchors, embedded resources, dynamic
//! anchors, recursive references, cross-document prefetching, and loop
//! detection.

use json_schema_validation::{Draft2019Dialect, ResolutionResult, Validator};

#[test]
fn ref_to_defs_pointer() {
    let mut validator = Validator::new();
    let uri = validator
        .register_schema(r##"{"$defs": {"s": {"type": "string"}}, "$ref": "#/$defs/s"}"##)
        .unwrap();
    assert!(validator.validate(&uri, r#""abc""#).unwrap().is_valid());
    assert!(!validator.validate(&uri, "1").unwrap().is_valid());
}

#[test]
fn ref_to_plain_name_anchor() {
    let mut validator = Validator::new();
    let uri = validator
        .register_schema(
            r##"{"$defs": {"s": {"$anchor": "str", "type": "string"}}, "$ref": "#str"}"##,
        )
        .unwrap();
    assert!(validator.validate(&uri, r#""abc""#).unwrap().is_valid());
    assert!(!validator.validate(&uri, "1").unwrap().is_valid());
}

#[test]
fn embedded_id_is_addressable_under_both_bases() {
    let mut validator = Validator::new();
    validator
        .register_schema(
            r#"{"$id": "urn:outer", "$defs": {"inner": {"$id": "urn:inner", "type": "integer"}}}"#,
        )
        .unwrap();
    // By its own URI.
    assert!(validator.validate("urn:inner", "5").unwrap().is_valid());
    assert!(!validator.validate("urn:inner", r#""x""#).unwrap().is_valid());
    // By the full-document pointer under the outer base.
    assert!(validator
        .validate("urn:outer#/$defs/inner", "5")
        .unwrap()
        .is_valid());
}

#[test]
fn ref_across_embedded_resource_boundary() {
    let mut validator = Validator::new();
    let raw = r#"{
        "$id": "urn:outer",
        "$ref": "urn:inner",
        "$defs": {
            "inner": {
                "$id": "urn:inner",
                "type": "boolean"
            }
        }
    }"#;
    validator.register_schema(raw).unwrap();
    assert!(validator.validate("urn:outer", "true").unwrap().is_valid());
    assert!(!validator.validate("urn:outer", "1").unwrap().is_valid());
}

#[test]
fn dynamic_ref_resolves_through_the_dynamic_scope() {
    let mut validator = Validator::new();
    validator
        .register_schema(
            r##"{
                "$id": "urn:dyn-a",
                "$dynamicRef": "#meta",
                "$defs": {
                    "default": {"$dynamicAnchor": "meta", "type": "string"}
                }
            }"##,
        )
        .unwrap();
    validator
        .register_schema(
            r#"{
                "$id": "urn:dyn-b",
                "$ref": "urn:dyn-a",
                "$defs": {
                    "override": {"$dynamicAnchor": "meta", "type": "integer"}
                }
            }"#,
        )
        .unwrap();

    // Entered through B, the outermost redeclaration of the anchor wins.
    assert!(validator.validate("urn:dyn-b", "42").unwrap().is_valid());
    assert!(!validator.validate("urn:dyn-b", r#""x""#).unwrap().is_valid());
    // Entered through A alone, A's own anchor applies.
    assert!(!validator.validate("urn:dyn-a", "42").unwrap().is_valid());
    assert!(validator.validate("urn:dyn-a", r#""x""#).unwrap().is_valid());
}

#[test]
fn dynamic_ref_without_dynamic_anchor_behaves_like_ref() {
    let mut validator = Validator::new();
    let uri = validator
        .register_schema(
            r##"{"$defs": {"s": {"$anchor": "plain", "type": "string"}}, "$dynamicRef": "#plain"}"##,
        )
        .unwrap();
    assert!(validator.validate(&uri, r#""abc""#).unwrap().is_valid());
    assert!(!validator.validate(&uri, "1").unwrap().is_valid());
}

#[test]
fn recursive_ref_resolves_to_the_outermost_recursive_anchor() {
    let mut validator = Validator::builder().with_dialect(Draft2019Dialect).build();
    validator
        .register_schema(
            r##"{
                "$id": "urn:tree",
                "$recursiveAnchor": true,
                "type": "object",
                "properties": {
                    "child": {"$recursiveRef": "#"}
                }
            }"##,
        )
        .unwrap();
    validator
        .register_schema(
            r#"{
                "$id": "urn:xtree",
                "$recursiveAnchor": true,
                "$ref": "urn:tree",
                "properties": {
                    "name": {"type": "string"}
                }
            }"#,
        )
        .unwrap();

    assert!(validator
        .validate("urn:tree", r#"{"child": {"child": {}}}"#)
        .unwrap()
        .is_valid());
    assert!(!validator
        .validate("urn:tree", r#"{"child": 5}"#)
        .unwrap()
        .is_valid());
    // Through the extension, child nodes bounce back to the extended root,
    // so the extra "name" constraint applies at every depth.
    assert!(validator
        .validate("urn:xtree", r#"{"child": {"name": "n"}}"#)
        .unwrap()
        .is_valid());
    assert!(!validator
        .validate("urn:xtree", r#"{"child": {"name": 1}}"#)
        .unwrap()
        .is_valid());
}

#[test]
fn self_referential_schema_fails_with_loop_detection() {
    let mut validator = Validator::new();
    validator
        .register_schema(r#"{"$id": "x", "$ref": "x"}"#)
        .unwrap();
    let outcome = validator.validate("x", "1").unwrap();
    assert!(!outcome.is_valid());
    assert!(outcome
        .errors()
        .iter()
        .any(|error| error.message.contains("loop")));
}

#[test]
fn unresolved_ref_is_an_evaluation_failure() {
    let mut validator = Validator::new();
    let uri = validator
        .register_schema(r#"{"$ref": "urn:nowhere"}"#)
        .unwrap();
    let outcome = validator.validate(&uri, "1").unwrap();
    assert!(!outcome.is_valid());
    assert!(outcome
        .errors()
        .iter()
        .any(|error| error.message.contains("urn:nowhere")));
}

#[test]
fn external_refs_are_prefetched_through_the_resolver() {
    let resolver = |uri: &str| {
        if uri == "urn:remote" {
            ResolutionResult::from_string(r#"{"type": "string"}"#)
        } else {
            ResolutionResult::empty()
        }
    };
    let mut validator = Validator::builder().with_schema_resolver(resolver).build();
    let uri = validator
        .register_schema(r#"{"$ref": "urn:remote"}"#)
        .unwrap();
    assert!(validator.validate(&uri, r#""abc""#).unwrap().is_valid());
    assert!(!validator.validate(&uri, "1").unwrap().is_valid());
    // The prefetched document is registered under its own URI too.
    assert!(validator.validate("urn:remote", r#""abc""#).unwrap().is_valid());
}

#[test]
fn lazy_resolver_providers_are_materialized() {
    let resolver = |uri: &str| {
        if uri == "urn:lazy" {
            ResolutionResult::from_provider(|| {
                ResolutionResult::from_string(r#"{"type": "integer"}"#)
            })
        } else {
            ResolutionResult::empty()
        }
    };
    let mut validator = Validator::builder().with_schema_resolver(resolver).build();
    let uri = validator.register_schema(r#"{"$ref": "urn:lazy"}"#).unwrap();
    assert!(validator.validate(&uri, "3").unwrap().is_valid());
    assert!(!validator.validate(&uri, r#""x""#).unwrap().is_valid());
}

#[test]
fn mutually_recursive_documents_register_and_terminate() {
    let resolver = |uri: &str| match uri {
        "urn:ping" => ResolutionResult::from_string(
            r#"{"properties": {"pong": {"$ref": "urn:pong"}}}"#,
        ),
        "urn:pong" => ResolutionResult::from_string(
            r#"{"properties": {"ping": {"$ref": "urn:ping"}}}"#,
        ),
        _ => ResolutionResult::empty(),
    };
    let mut validator = Validator::builder().with_schema_resolver(resolver).build();
    let uri = validator.register_schema(r#"{"$ref": "urn:ping"}"#).unwrap();
    assert!(validator
        .validate(&uri, r#"{"pong": {"ping": {"pong": {}}}}"#)
        .unwrap()
        .is_valid());
}
