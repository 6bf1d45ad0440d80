//! Node factories: pluggable JSON parser backends.
//!
//! The default provider is backed by `serde_json`. Any other JSON library
//! can be plugged in by implementing [`JsonNodeFactory`]; the factory is
//! responsible for populating JSON Pointers so that navigating pointer `P`
//! from the root yields a node reporting `json_pointer() == P`.

use crate::node::{JsonNode, JsonNumber, NodeValue};
use crate::uri::escape_pointer_token;
use serde_json::Value;
use thiserror::Error;

/// A document that could not be parsed into a JSON tree.
#[derive(Debug, Error)]
#[error("failed to parse JSON document: {0}")]
pub struct JsonParseError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

/// Produces [`JsonNode`] trees from raw JSON text.
pub trait JsonNodeFactory: Send + Sync {
    fn create(&self, raw: &str) -> Result<JsonNode, JsonParseError>;
}

/// The default `serde_json`-backed node factory.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerdeNodeFactory;

impl JsonNodeFactory for SerdeNodeFactory {
    fn create(&self, raw: &str) -> Result<JsonNode, JsonParseError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| JsonParseError(Box::new(e)))?;
        Ok(node_from_value(&value))
    }
}

/// Convert a borrowed `serde_json` value into a node tree rooted at `""`.
pub fn node_from_value(value: &Value) -> JsonNode {
    convert(value, String::new())
}

fn convert(value: &Value, pointer: String) -> JsonNode {
    let node_value = match value {
        Value::Null => NodeValue::Null,
        Value::Bool(b) => NodeValue::Boolean(*b),
        Value::String(s) => NodeValue::String(s.clone()),
        Value::Number(n) => NodeValue::Number(match n.as_i64() {
            Some(i) => JsonNumber::Integer(i),
            None => JsonNumber::Double(n.as_f64().unwrap_or(f64::NAN)),
        }),
        Value::Array(items) => NodeValue::Array(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| convert(item, format!("{pointer}/{index}")))
                .collect(),
        ),
        Value::Object(members) => NodeValue::Object(
            members
                .iter()
                .map(|(key, member)| {
                    let child = convert(member, format!("{pointer}/{}", escape_pointer_token(key)));
                    (key.clone(), child)
                })
                .collect(),
        ),
    };
    JsonNode::new(node_value, pointer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pointers_match_navigation() {
        let factory = SerdeNodeFactory;
        let node = factory
            .create(r#"{"a": {"b": [10, {"c": null}]}}"#)
            .unwrap();
        for pointer in ["", "/a", "/a/b", "/a/b/0", "/a/b/1", "/a/b/1/c"] {
            let reached = node.at_pointer(pointer).unwrap();
            assert_eq!(reached.json_pointer(), pointer);
        }
    }

    #[test]
    fn test_escaped_member_pointers() {
        let node = node_from_value(&json!({"a/b": {"~": 1}}));
        let inner = node.at_pointer("/a~1b/~0").unwrap();
        assert_eq!(inner.json_pointer(), "/a~1b/~0");
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(SerdeNodeFactory.create("{").is_err());
    }

    #[test]
    fn test_member_order_is_preserved() {
        let node = SerdeNodeFactory.create(r#"{"z": 1, "a": 2}"#).unwrap();
        let keys: Vec<_> = node
            .as_object()
            .unwrap()
            .iter()
            .map(|(key, _)| key.as_str())
            .collect();
        assert_eq!(keys, ["z", "a"]);
    }
}
