/* 📖 # Output formats

A finished document tree is format-agnostic. Before an encoder can write bytes, the tree is
normalized into plain `serde_json::Value` data following the conventions of the target format:

JSON keeps the root element as the single top-level member. Attributes become members with a
`_` prefix, and a value element that carries attributes becomes `{"_attr": .., "#text": ..}`.

XML has one root element with a name of its own, so the name moves into the encoder context
and the data is the root element's content. Attributes become `@name` members and attributed
text goes under `#`. A list whose items share its name becomes an array and the encoder repeats
the element for each item. Any other list becomes a wrapper element around its items, each
written under its own name.
Field-type hashes are spelled out as nested `<value key="...">` elements.

Both conventions copy the attributes of the root element into the encoder context, so the
encoder and the response can still see the media type after normalization.
*/

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::generator::MEDIA_TYPE_ATTRIBUTE;
use crate::node::{DocumentTree, NodeId, NodeKind, ScalarValue};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Xml,
}

impl OutputFormat {
    /// Suffix used in media types, e.g. `json` in `application/vnd.x.Foo+json`.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Xml => "xml",
        }
    }

    /// Canonical boolean; a missing value counts as `false`.
    pub fn serialize_bool(&self, value: Option<bool>) -> ScalarValue {
        let value = value.unwrap_or(false);
        match self {
            OutputFormat::Json => ScalarValue::Bool(value),
            OutputFormat::Xml => ScalarValue::String(value.to_string()),
        }
    }

    pub fn normalize_document(&self, tree: &DocumentTree) -> NormalizedDocument {
        let root = tree.root();
        let mut context = EncoderContext::default();
        let root_element = match tree.members(root) {
            [(name, id)] if matches!(tree.node(*id).kind(), NodeKind::Object { .. }) => {
                Some((name.clone(), *id))
            }
            _ => None,
        };
        if let Some((name, id)) = &root_element {
            context.root_element = Some(name.clone());
            for (key, value) in tree.node(*id).attributes() {
                context.root_attributes.insert(key.clone(), value.to_json());
            }
        }

        let data = match (self, root_element) {
            (OutputFormat::Json, _) => json_node(tree, root),
            (OutputFormat::Xml, Some((_, id))) => xml_node(tree, id),
            (OutputFormat::Xml, None) => xml_node(tree, root),
        };
        NormalizedDocument { data, context }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format-level metadata that does not fit into the normalized data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncoderContext {
    pub root_element: Option<String>,
    pub root_attributes: Map<String, Value>,
}

impl EncoderContext {
    /// Media type of the root element, if it has one.
    pub fn media_type(&self) -> Option<&str> {
        self.root_attributes
            .get(MEDIA_TYPE_ATTRIBUTE)
            .and_then(Value::as_str)
    }

    /// Takes over everything `other` knows that this context does not.
    pub fn merge(&mut self, other: EncoderContext) {
        if self.root_element.is_none() {
            self.root_element = other.root_element;
        }
        for (key, value) in other.root_attributes {
            self.root_attributes.entry(key).or_insert(value);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDocument {
    pub data: Value,
    pub context: EncoderContext,
}

fn json_node(tree: &DocumentTree, id: NodeId) -> Value {
    let node = tree.node(id);
    match node.kind() {
        NodeKind::Object {
            attributes,
            members,
        } => {
            let mut map = Map::new();
            for (key, value) in attributes {
                map.insert(format!("_{}", key), value.to_json());
            }
            for (name, child) in members {
                map.insert(name.clone(), json_node(tree, *child));
            }
            Value::Object(map)
        }
        NodeKind::List { items } => items.iter().map(|item| json_node(tree, *item)).collect(),
        NodeKind::Value { value, attributes } if attributes.is_empty() => value.to_json(),
        NodeKind::Value { value, attributes } => {
            let mut map = Map::new();
            for (key, attribute) in attributes {
                map.insert(format!("_{}", key), attribute.to_json());
            }
            map.insert("#text".to_string(), value.to_json());
            Value::Object(map)
        }
        NodeKind::Hash(hash) => hash.clone(),
    }
}

fn xml_node(tree: &DocumentTree, id: NodeId) -> Value {
    let node = tree.node(id);
    match node.kind() {
        NodeKind::Object {
            attributes,
            members,
        } => {
            let mut map = Map::new();
            for (key, value) in attributes {
                map.insert(format!("@{}", key), value.to_json());
            }
            for (name, child) in members {
                map.insert(name.clone(), xml_node(tree, *child));
            }
            Value::Object(map)
        }
        NodeKind::List { items } => xml_list(tree, node.name(), items),
        NodeKind::Value { value, attributes } if attributes.is_empty() => value.to_json(),
        NodeKind::Value { value, attributes } => {
            let mut map = Map::new();
            for (key, attribute) in attributes {
                map.insert(format!("@{}", key), attribute.to_json());
            }
            map.insert("#".to_string(), value.to_json());
            Value::Object(map)
        }
        NodeKind::Hash(hash) => xml_hash(hash),
    }
}

/// Items named like their list repeat the list element itself. Otherwise the list element wraps
/// its items, grouped by item name in order of first appearance.
fn xml_list(tree: &DocumentTree, name: &str, items: &[NodeId]) -> Value {
    if items.iter().all(|item| tree.node(*item).name() == name) {
        return items.iter().map(|item| xml_node(tree, *item)).collect();
    }
    let mut groups = Map::new();
    for item in items {
        let entry = groups
            .entry(tree.node(*item).name().to_string())
            .or_insert_with(|| Value::Array(vec![]));
        if let Value::Array(values) = entry {
            values.push(xml_node(tree, *item));
        }
    }
    Value::Object(groups)
}

/// Spells out free-form data as `value` elements keyed by member name or index.
fn xml_hash(value: &Value) -> Value {
    match value {
        Value::Object(map) => xml_hash_entries(
            map.iter()
                .map(|(key, value)| (Value::String(key.clone()), value)),
        ),
        Value::Array(items) => xml_hash_entries(
            items
                .iter()
                .enumerate()
                .map(|(index, value)| (Value::from(index), value)),
        ),
        Value::Bool(b) => Value::String(b.to_string()),
        other => other.clone(),
    }
}

fn xml_hash_entries<'a>(entries: impl Iterator<Item = (Value, &'a Value)>) -> Value {
    let values: Vec<Value> = entries
        .map(|(key, value)| {
            let mut entry = Map::new();
            entry.insert("@key".to_string(), key);
            match xml_hash(value) {
                Value::Object(inner) => entry.extend(inner),
                Value::Null => {}
                scalar => {
                    entry.insert("#".to_string(), scalar);
                }
            }
            Value::Object(entry)
        })
        .collect();
    let mut map = Map::new();
    map.insert("value".to_string(), Value::Array(values));
    Value::Object(map)
}
