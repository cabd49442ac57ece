//! Schema-free result payload tree.
//!
//! The remote API embeds file descriptors at nesting levels that depend on
//! the kind of task, so the result body is decoded once into this minimal
//! tree and then walked structurally.

use std::collections::BTreeMap;

use serde_json::Value;

/// A leaf value in a payload tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// JSON `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number, kept in its wire form.
    Number(serde_json::Number),
    /// A string.
    Text(String),
}

/// One node of a decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadNode {
    /// A leaf value.
    Scalar(Scalar),
    /// An ordered sequence of nodes.
    Sequence(Vec<PayloadNode>),
    /// A string-keyed mapping of nodes.
    Mapping(BTreeMap<String, PayloadNode>),
}

impl PayloadNode {
    /// An empty mapping.
    pub fn empty() -> Self {
        PayloadNode::Mapping(BTreeMap::new())
    }

    /// Looks up a key if this node is a mapping.
    pub fn get(&self, key: &str) -> Option<&PayloadNode> {
        match self {
            PayloadNode::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    /// Returns the string value if this node is a text scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PayloadNode::Scalar(Scalar::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric value as `f64` if this node is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PayloadNode::Scalar(Scalar::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    /// Returns true if this node is a mapping.
    pub fn is_mapping(&self) -> bool {
        matches!(self, PayloadNode::Mapping(_))
    }

    /// Looks up `key` and returns it as a string, if present and textual.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PayloadNode::as_str)
    }
}

impl From<Value> for PayloadNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => PayloadNode::Scalar(Scalar::Null),
            Value::Bool(b) => PayloadNode::Scalar(Scalar::Bool(b)),
            Value::Number(n) => PayloadNode::Scalar(Scalar::Number(n)),
            Value::String(s) => PayloadNode::Scalar(Scalar::Text(s)),
            Value::Array(items) => {
                PayloadNode::Sequence(items.into_iter().map(PayloadNode::from).collect())
            }
            Value::Object(map) => PayloadNode::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, PayloadNode::from(v)))
                    .collect(),
            ),
        }
    }
}
