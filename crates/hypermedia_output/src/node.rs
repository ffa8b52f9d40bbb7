/* 📖 # The document tree

The generator does not write bytes directly. It builds a format-agnostic tree first and the
output format turns that tree into normalized data for an encoder.

Nodes live in an arena owned by `DocumentTree` and refer to each other by `NodeId`. Every
node except the root knows its parent, which lets the generator walk back up when an element
is closed. A node is attached when it is created and stays attached until the tree is dropped.
Member names are unique within an object; attaching a second member under a taken name fails
instead of replacing the first one. List items carry no such restriction.
*/

use serde_json::{Number, Value};

use hypermedia_base::{HypermediaError, HypermediaResult};

/// Scalar content of value elements and attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ScalarValue {
    /// JSON representation; non-finite floats become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            ScalarValue::Null => Value::Null,
            ScalarValue::Bool(b) => Value::Bool(*b),
            ScalarValue::Integer(i) => Value::Number((*i).into()),
            ScalarValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            ScalarValue::String(s) => Value::String(s.clone()),
        }
    }

    /// Text representation, `None` for null.
    pub fn to_text(&self) -> Option<String> {
        match self {
            ScalarValue::Null => None,
            ScalarValue::Bool(b) => Some(b.to_string()),
            ScalarValue::Integer(i) => Some(i.to_string()),
            ScalarValue::Float(f) => Some(f.to_string()),
            ScalarValue::String(s) => Some(s.clone()),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Integer(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Integer(value.into())
    }
}

impl From<u32> for ScalarValue {
    fn from(value: u32) -> Self {
        ScalarValue::Integer(value.into())
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::String(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::String(value)
    }
}

impl From<&String> for ScalarValue {
    fn from(value: &String) -> Self {
        ScalarValue::String(value.clone())
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ScalarValue::Null, Into::into)
    }
}

/// Index of a node inside its [`DocumentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Named attribute list; setting an existing name replaces its value.
pub type Attributes = Vec<(String, ScalarValue)>;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Named members in insertion order, plus attributes.
    Object {
        attributes: Attributes,
        members: Vec<(String, NodeId)>,
    },
    /// Anonymous repeated children.
    List { items: Vec<NodeId> },
    /// A scalar with optional attributes (e.g. `languageCode`).
    Value {
        value: ScalarValue,
        attributes: Attributes,
    },
    /// Free-form nested data rendered without a dedicated visitor.
    Hash(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentNode {
    name: String,
    parent: Option<NodeId>,
    kind: NodeKind,
}

impl DocumentNode {
    /// Element name; empty for the document root.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn attributes(&self) -> &[(String, ScalarValue)] {
        match &self.kind {
            NodeKind::Object { attributes, .. } | NodeKind::Value { attributes, .. } => attributes,
            NodeKind::List { .. } | NodeKind::Hash(_) => &[],
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&ScalarValue> {
        self.attributes()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

/// The in-progress output document. Node 0 is always the root object.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTree {
    nodes: Vec<DocumentNode>,
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![DocumentNode {
                name: String::new(),
                parent: None,
                kind: NodeKind::Object {
                    attributes: vec![],
                    members: vec![],
                },
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &DocumentNode {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// True when nothing has been attached to the root.
    pub fn is_empty(&self) -> bool {
        self.members(self.root()).is_empty()
    }

    /// Named members of an object node; empty for other kinds.
    pub fn members(&self, id: NodeId) -> &[(String, NodeId)] {
        match &self.node(id).kind {
            NodeKind::Object { members, .. } => members,
            _ => &[],
        }
    }

    /// Items of a list node; empty for other kinds.
    pub fn items(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).kind {
            NodeKind::List { items } => items,
            _ => &[],
        }
    }

    /// Looks up a named member of an object node.
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.members(id)
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, child)| *child)
    }

    /// Follows a path of member names starting at the root.
    pub fn find(&self, path: &[&str]) -> Option<NodeId> {
        path.iter()
            .try_fold(self.root(), |current, name| self.child(current, name))
    }

    pub fn add_object(&mut self, parent: NodeId, name: &str) -> HypermediaResult<NodeId> {
        self.attach(
            parent,
            name,
            NodeKind::Object {
                attributes: vec![],
                members: vec![],
            },
        )
    }

    pub fn add_list(&mut self, parent: NodeId, name: &str) -> HypermediaResult<NodeId> {
        self.attach(parent, name, NodeKind::List { items: vec![] })
    }

    pub fn add_value(
        &mut self,
        parent: NodeId,
        name: &str,
        value: ScalarValue,
        attributes: Attributes,
    ) -> HypermediaResult<NodeId> {
        self.attach(parent, name, NodeKind::Value { value, attributes })
    }

    pub fn add_hash(&mut self, parent: NodeId, name: &str, hash: Value) -> HypermediaResult<NodeId> {
        self.attach(parent, name, NodeKind::Hash(hash))
    }

    /// Sets an attribute on an object node, replacing an earlier value of the same name.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: ScalarValue,
    ) -> HypermediaResult<()> {
        let node = &mut self.nodes[id.0];
        match &mut node.kind {
            NodeKind::Object { attributes, .. } => {
                upsert(attributes, name, value);
                Ok(())
            }
            _ => Err(HypermediaError::structure(format!(
                "Cannot set attribute {} on non-object node {}.",
                name, node.name
            ))
            .into()),
        }
    }

    fn attach(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> HypermediaResult<NodeId> {
        let id = NodeId(self.nodes.len());
        let parent_node = &mut self.nodes[parent.0];
        match &mut parent_node.kind {
            NodeKind::Object { members, .. } => {
                if members.iter().any(|(key, _)| key == name) {
                    return Err(
                        HypermediaError::duplicate_element(name, parent_node.name.as_str()).into(),
                    );
                }
                members.push((name.to_string(), id));
            }
            NodeKind::List { items } => items.push(id),
            NodeKind::Value { .. } | NodeKind::Hash(_) => {
                return Err(HypermediaError::structure(format!(
                    "Cannot attach {} below scalar node {}.",
                    name, parent_node.name
                ))
                .into());
            }
        }
        self.nodes.push(DocumentNode {
            name: name.to_string(),
            parent: Some(parent),
            kind,
        });
        Ok(id)
    }
}

fn upsert(attributes: &mut Attributes, name: &str, value: ScalarValue) {
    match attributes.iter_mut().find(|(key, _)| key == name) {
        Some(entry) => entry.1 = value,
        None => attributes.push((name.to_string(), value)),
    }
}
