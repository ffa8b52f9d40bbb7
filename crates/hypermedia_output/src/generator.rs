/* 📖 # Generator: the document state machine

Visitors never build output trees by hand. They call `start_*`/`end_*` pairs on a `Generator`
and the generator checks every call against a stack of open elements before touching the
document tree.

Each stack frame remembers the element kind, the name it was opened with, and the names of
object/hash children already written below it. A start call must be legal for the kind on top
of the stack:

| Child kind | Legal parents |
|---|---|
| document | none, only as the very first operation |
| objectElement | document, objectElement, hashElement, list |
| hashElement | document, objectElement, hashElement, list |
| list | objectElement, hashElement |
| valueElement | objectElement, hashElement, list |
| attribute | objectElement, hashElement |

An end call must match the kind and name on top of the stack. Object and hash names may occur
only once per parent, except below a list where repetition is the point. The document tree
applies the same rule to every named member of an object, so a list or value element cannot
take over a name already in use either.

Any violation is a bug in the calling visitor. The generator returns a structure error and the
document is not usable afterwards; callers do not try to recover.

Every object element automatically receives a `media-type` attribute of the form
`application/<vendor>.<Name>+<format>`.
*/

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use hypermedia_base::{HypermediaError, HypermediaResult};

use crate::format::OutputFormat;
use crate::node::{Attributes, DocumentTree, NodeId, ScalarValue};

/// Name of the attribute every object element carries.
pub const MEDIA_TYPE_ATTRIBUTE: &str = "media-type";

/// Kinds of elements a generator can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Document,
    ObjectElement,
    HashElement,
    List,
    ValueElement,
    Attribute,
}

impl ElementKind {
    pub const ALL: [ElementKind; 6] = [
        ElementKind::Document,
        ElementKind::ObjectElement,
        ElementKind::HashElement,
        ElementKind::List,
        ElementKind::ValueElement,
        ElementKind::Attribute,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Document => "document",
            ElementKind::ObjectElement => "objectElement",
            ElementKind::HashElement => "hashElement",
            ElementKind::List => "list",
            ElementKind::ValueElement => "valueElement",
            ElementKind::Attribute => "attribute",
        }
    }

    /// Kinds this element may be opened inside of.
    pub fn legal_parents(&self) -> &'static [ElementKind] {
        use ElementKind::*;
        match self {
            Document => &[],
            ObjectElement | HashElement => &[Document, ObjectElement, HashElement, List],
            List => &[ObjectElement, HashElement],
            ValueElement => &[ObjectElement, HashElement, List],
            Attribute => &[ObjectElement, HashElement],
        }
    }

    fn checks_duplicates(&self) -> bool {
        matches!(self, ElementKind::ObjectElement | ElementKind::HashElement)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Frame {
    kind: ElementKind,
    name: String,
    seen: HashSet<String>,
}

/// Builds one document per `start_document`/`end_document` cycle.
#[derive(Debug)]
pub struct Generator {
    format: OutputFormat,
    vendor: String,
    stack: Vec<Frame>,
    tree: DocumentTree,
    current: NodeId,
    is_empty: bool,
}

impl Generator {
    pub fn new(format: OutputFormat, vendor: impl Into<String>) -> Self {
        let tree = DocumentTree::new();
        let current = tree.root();
        Self {
            format,
            vendor: vendor.into(),
            stack: vec![],
            tree,
            current,
            is_empty: true,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Drops the stack and the document so the generator can start over.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.tree = DocumentTree::new();
        self.current = self.tree.root();
        self.is_empty = true;
    }

    /// True when nothing was written since the last reset or document start.
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    /// Number of open elements, the document included.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn document(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn into_document(self) -> DocumentTree {
        self.tree
    }

    /// `application/<vendor>.<name>+<format>`
    pub fn media_type(&self, name: &str) -> String {
        format!(
            "application/{}.{}+{}",
            self.vendor,
            name,
            self.format.as_str()
        )
    }

    pub fn serialize_bool(&self, value: Option<bool>) -> ScalarValue {
        self.format.serialize_bool(value)
    }

    pub fn start_document(&mut self, name: &str) -> HypermediaResult<()> {
        if !self.stack.is_empty() {
            return Err(HypermediaError::structure(
                "Starting a document may only be the very first operation.",
            )
            .into());
        }
        self.tree = DocumentTree::new();
        self.current = self.tree.root();
        self.is_empty = true;
        self.push(ElementKind::Document, name);
        Ok(())
    }

    pub fn end_document(&mut self, name: &str) -> HypermediaResult<()> {
        self.pop(ElementKind::Document, name)
    }

    /// Opens an object element and stamps its media type, derived from `media_type_name`
    /// when given and from `name` otherwise.
    pub fn start_object_element(
        &mut self,
        name: &str,
        media_type_name: Option<&str>,
    ) -> HypermediaResult<()> {
        self.check_start(ElementKind::ObjectElement, name)?;
        self.current = self.tree.add_object(self.current, name)?;
        self.push(ElementKind::ObjectElement, name);
        self.is_empty = false;

        let media_type = self.media_type(media_type_name.unwrap_or(name));
        self.attribute(MEDIA_TYPE_ATTRIBUTE, media_type)
    }

    pub fn end_object_element(&mut self, name: &str) -> HypermediaResult<()> {
        self.pop(ElementKind::ObjectElement, name)?;
        self.ascend();
        Ok(())
    }

    pub fn start_hash_element(&mut self, name: &str) -> HypermediaResult<()> {
        self.check_start(ElementKind::HashElement, name)?;
        self.current = self.tree.add_object(self.current, name)?;
        self.push(ElementKind::HashElement, name);
        self.is_empty = false;
        Ok(())
    }

    pub fn end_hash_element(&mut self, name: &str) -> HypermediaResult<()> {
        self.pop(ElementKind::HashElement, name)?;
        self.ascend();
        Ok(())
    }

    pub fn start_list(&mut self, name: &str) -> HypermediaResult<()> {
        self.check_start(ElementKind::List, name)?;
        self.current = self.tree.add_list(self.current, name)?;
        self.push(ElementKind::List, name);
        self.is_empty = false;
        Ok(())
    }

    pub fn end_list(&mut self, name: &str) -> HypermediaResult<()> {
        self.pop(ElementKind::List, name)?;
        self.ascend();
        Ok(())
    }

    pub fn start_value_element(
        &mut self,
        name: &str,
        value: impl Into<ScalarValue>,
        attributes: Attributes,
    ) -> HypermediaResult<()> {
        self.check_start(ElementKind::ValueElement, name)?;
        self.current = self
            .tree
            .add_value(self.current, name, value.into(), attributes)?;
        self.push(ElementKind::ValueElement, name);
        self.is_empty = false;
        Ok(())
    }

    pub fn end_value_element(&mut self, name: &str) -> HypermediaResult<()> {
        self.pop(ElementKind::ValueElement, name)?;
        self.ascend();
        Ok(())
    }

    pub fn value_element(&mut self, name: &str, value: impl Into<ScalarValue>) -> HypermediaResult<()> {
        self.start_value_element(name, value, vec![])?;
        self.end_value_element(name)
    }

    pub fn start_attribute(
        &mut self,
        name: &str,
        value: impl Into<ScalarValue>,
    ) -> HypermediaResult<()> {
        self.check_start(ElementKind::Attribute, name)?;
        self.tree.set_attribute(self.current, name, value.into())?;
        self.push(ElementKind::Attribute, name);
        Ok(())
    }

    pub fn end_attribute(&mut self, name: &str) -> HypermediaResult<()> {
        self.pop(ElementKind::Attribute, name)
    }

    pub fn attribute(&mut self, name: &str, value: impl Into<ScalarValue>) -> HypermediaResult<()> {
        self.start_attribute(name, value)?;
        self.end_attribute(name)
    }

    /// Writes arbitrary nested data below the current element without a dedicated visitor.
    ///
    /// Follows the placement and duplicate rules of a hash element.
    pub fn generate_field_type_hash(&mut self, name: &str, value: &Value) -> HypermediaResult<()> {
        self.check_start(ElementKind::HashElement, name)?;
        self.tree.add_hash(self.current, name, value.clone())?;
        self.is_empty = false;
        Ok(())
    }

    fn check_start(&mut self, kind: ElementKind, name: &str) -> HypermediaResult<()> {
        let Some(top) = self.stack.last_mut() else {
            return Err(HypermediaError::structure(format!(
                "Starting {} with data {}, but no previous element on stack.",
                kind, name
            ))
            .into());
        };
        let legal = kind.legal_parents();
        if !legal.contains(&top.kind) {
            let expected: Vec<&str> = legal.iter().map(ElementKind::as_str).collect();
            return Err(HypermediaError::structure(format!(
                "Unexpected {} ({}) inside {}, expected parent to be one of: {}.",
                kind,
                name,
                top.kind,
                expected.join(", ")
            ))
            .into());
        }
        if kind.checks_duplicates()
            && top.kind != ElementKind::List
            && !top.seen.insert(name.to_string())
        {
            return Err(HypermediaError::duplicate_element(name, top.kind.as_str()).into());
        }
        Ok(())
    }

    fn push(&mut self, kind: ElementKind, name: &str) {
        self.stack.push(Frame {
            kind,
            name: name.to_string(),
            seen: HashSet::new(),
        });
    }

    /// Pops the top frame if it matches; leaves the stack untouched otherwise.
    fn pop(&mut self, kind: ElementKind, name: &str) -> HypermediaResult<()> {
        let Some(top) = self.stack.last() else {
            return Err(HypermediaError::structure(format!(
                "Ending non-existing element {} ({}).",
                kind, name
            ))
            .into());
        };
        if top.kind != kind {
            return Err(HypermediaError::structure(format!(
                "Wrong closing tag {}, expected {}.",
                kind, top.kind
            ))
            .into());
        }
        if top.name != name {
            return Err(HypermediaError::structure(format!(
                "Wrong closing tag {} ({}), expected {} ({}).",
                kind, name, top.kind, top.name
            ))
            .into());
        }
        self.stack.pop();
        Ok(())
    }

    fn ascend(&mut self) {
        if let Some(parent) = self.tree.parent(self.current) {
            self.current = parent;
        }
    }
}
