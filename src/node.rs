//! Abstract JSON tree consumed by the parser and the evaluators.
//!
//! Nodes are owned values carrying the JSON Pointer of their location in the
//! source document. Object members keep their source order, which drives the
//! source order of evaluators within a single schema object.
//!
//! Numbers compare mathematically: `1` and `1.0` are equal, and an integral
//! float satisfies the integer type. Container equality is structural and
//! ignores pointers.

use serde_json::{Map, Value};

/// The JSON type of a node. Integral floats report `Integer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Null,
    Boolean,
    String,
    Integer,
    Number,
    Array,
    Object,
}

impl NodeType {
    pub fn name(&self) -> &'static str {
        match self {
            NodeType::Null => "null",
            NodeType::Boolean => "boolean",
            NodeType::String => "string",
            NodeType::Integer => "integer",
            NodeType::Number => "number",
            NodeType::Array => "array",
            NodeType::Object => "object",
        }
    }
}

/// A numeric value. `1` and `1.0` are the same number.
#[derive(Debug, Clone, Copy)]
pub enum JsonNumber {
    Integer(i64),
    Double(f64),
}

impl JsonNumber {
    pub fn as_f64(&self) -> f64 {
        match self {
            JsonNumber::Integer(i) => *i as f64,
            JsonNumber::Double(d) => *d,
        }
    }

    pub fn is_integral(&self) -> bool {
        match self {
            JsonNumber::Integer(_) => true,
            JsonNumber::Double(d) => d.is_finite() && d.fract() == 0.0,
        }
    }
}

impl PartialEq for JsonNumber {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsonNumber::Integer(a), JsonNumber::Integer(b)) => a == b,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeValue {
    Null,
    Boolean(bool),
    String(String),
    Number(JsonNumber),
    Array(Vec<JsonNode>),
    Object(Vec<(String, JsonNode)>),
}

/// A node in a parsed JSON document.
#[derive(Debug, Clone)]
pub struct JsonNode {
    pointer: String,
    value: NodeValue,
}

impl JsonNode {
    pub(crate) fn new(value: NodeValue, pointer: String) -> Self {
        Self { pointer, value }
    }

    pub(crate) fn string(value: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
            value: NodeValue::String(value.into()),
        }
    }

    /// JSON Pointer of this node within its source document.
    pub fn json_pointer(&self) -> &str {
        &self.pointer
    }

    pub fn node_type(&self) -> NodeType {
        match &self.value {
            NodeValue::Null => NodeType::Null,
            NodeValue::Boolean(_) => NodeType::Boolean,
            NodeValue::String(_) => NodeType::String,
            NodeValue::Number(n) if n.is_integral() => NodeType::Integer,
            NodeValue::Number(_) => NodeType::Number,
            NodeValue::Array(_) => NodeType::Array,
            NodeValue::Object(_) => NodeType::Object,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self.value, NodeValue::Object(_))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.value, NodeValue::Boolean(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.value {
            NodeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            NodeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<JsonNumber> {
        match &self.value {
            NodeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsonNode]> {
        match &self.value {
            NodeValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Object members in source order.
    pub fn as_object(&self) -> Option<&[(String, JsonNode)]> {
        match &self.value {
            NodeValue::Object(members) => Some(members),
            _ => None,
        }
    }

    pub fn member(&self, name: &str) -> Option<&JsonNode> {
        self.as_object()?
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Navigate a JSON Pointer relative to this node.
    pub fn at_pointer(&self, pointer: &str) -> Option<&JsonNode> {
        if pointer.is_empty() {
            return Some(self);
        }
        let rest = pointer.strip_prefix('/')?;
        let mut current = self;
        for token in rest.split('/') {
            let token = crate::uri::unescape_pointer_token(token);
            current = match &current.value {
                NodeValue::Object(members) => members
                    .iter()
                    .find(|(key, _)| *key == token)
                    .map(|(_, value)| value)?,
                NodeValue::Array(items) => {
                    let index: usize = token.parse().ok()?;
                    items.get(index)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Convert back into a `serde_json` value, losing pointer information.
    pub fn to_value(&self) -> Value {
        match &self.value {
            NodeValue::Null => Value::Null,
            NodeValue::Boolean(b) => Value::Bool(*b),
            NodeValue::String(s) => Value::String(s.clone()),
            NodeValue::Number(JsonNumber::Integer(i)) => Value::Number((*i).into()),
            NodeValue::Number(JsonNumber::Double(d)) => serde_json::Number::from_f64(*d)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            NodeValue::Array(items) => Value::Array(items.iter().map(JsonNode::to_value).collect()),
            NodeValue::Object(members) => {
                let mut map = Map::new();
                for (key, value) in members {
                    map.insert(key.clone(), value.to_value());
                }
                Value::Object(map)
            }
        }
    }
}

impl PartialEq for JsonNode {
    fn eq(&self, other: &Self) -> bool {
        match (&self.value, &other.value) {
            (NodeValue::Null, NodeValue::Null) => true,
            (NodeValue::Boolean(a), NodeValue::Boolean(b)) => a == b,
            (NodeValue::String(a), NodeValue::String(b)) => a == b,
            (NodeValue::Number(a), NodeValue::Number(b)) => a == b,
            (NodeValue::Array(a), NodeValue::Array(b)) => a == b,
            (NodeValue::Object(a), NodeValue::Object(b)) => {
                // Structural equality: member order does not matter.
                a.len() == b.len()
                    && a.iter().all(|(key, value)| {
                        b.iter().any(|(other_key, other_value)| {
                            key == other_key && value == other_value
                        })
                    })
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::node_from_value;
    use serde_json::json;

    #[test]
    fn test_number_equality_across_representations() {
        let one = node_from_value(&json!(1));
        let one_float = node_from_value(&json!(1.0));
        let two = node_from_value(&json!(2));
        assert_eq!(one, one_float);
        assert_ne!(one, two);
    }

    #[test]
    fn test_integral_float_reports_integer_type() {
        assert_eq!(node_from_value(&json!(1.0)).node_type(), NodeType::Integer);
        assert_eq!(node_from_value(&json!(1.5)).node_type(), NodeType::Number);
        assert_eq!(node_from_value(&json!(3)).node_type(), NodeType::Integer);
    }

    #[test]
    fn test_structural_equality_ignores_member_order() {
        let a = node_from_value(&json!({"x": 1, "y": [1, 2]}));
        let b = node_from_value(&json!({"y": [1, 2], "x": 1.0}));
        assert_eq!(a, b);
    }

    #[test]
    fn test_pointer_navigation() {
        let node = node_from_value(&json!({"a": {"b/c": [null, true]}}));
        let inner = node.at_pointer("/a/b~1c/1").unwrap();
        assert_eq!(inner.as_bool(), Some(true));
        assert_eq!(inner.json_pointer(), "/a/b~1c/1");
    }
}
