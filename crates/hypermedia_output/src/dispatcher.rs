/* 📖 # Finding the visitor for a value object

The registry maps type tags to visitors. Lookups walk the declared type hierarchy, so a
derived type is rendered by the visitor of its closest registered ancestor. New types inherit
rendering from their parent until they register a more specific visitor.

Two consumers use the registry:
- the resolver only answers "which visitor, if any", and is used by the normalizer adapter
- the dispatcher renders nested value objects into an open document; it falls back to a
  generic normalizer and reports a miss as `NoVisitorFound` with every tag it tried
*/

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use hypermedia_base::{HypermediaError, HypermediaResult};

use crate::generator::Generator;
use crate::normalizer::{NormalizationContext, Normalizer};
use crate::value::{TypeHierarchy, ValueObject};
use crate::value_object_visitor::ValueObjectVisitor;
use crate::visitor::Visitor;

/// Visitors by type tag. Built once, then shared read-only.
#[derive(Debug, Default)]
pub struct VisitorRegistry {
    visitors: HashMap<String, Arc<dyn ValueObjectVisitor>>,
    hierarchy: TypeHierarchy,
}

impl VisitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `visitor` for `type_name`, replacing an earlier registration.
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        visitor: impl ValueObjectVisitor + 'static,
    ) -> &mut Self {
        self.visitors.insert(type_name.into(), Arc::new(visitor));
        self
    }

    pub fn declare_parent(&mut self, child: &str, parent: &str) -> HypermediaResult<&mut Self> {
        self.hierarchy.declare(child, parent)?;
        Ok(self)
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    pub fn len(&self) -> usize {
        self.visitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visitors.is_empty()
    }

    /// First visitor along the ancestry of `type_name`, or every tag tried.
    pub fn lookup(&self, type_name: &str) -> Result<Arc<dyn ValueObjectVisitor>, Vec<String>> {
        let ancestry = self.hierarchy.ancestry(type_name);
        for tag in &ancestry {
            if let Some(visitor) = self.visitors.get(tag) {
                return Ok(Arc::clone(visitor));
            }
        }
        Err(ancestry)
    }
}

/// Resolves visitors without rendering anything.
#[derive(Debug, Clone)]
pub struct ValueObjectVisitorResolver {
    registry: Arc<VisitorRegistry>,
}

impl ValueObjectVisitorResolver {
    pub fn new(registry: Arc<VisitorRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &VisitorRegistry {
        &self.registry
    }

    /// `None` when neither the type nor any ancestor has a visitor.
    pub fn resolve(&self, value: &dyn ValueObject) -> Option<Arc<dyn ValueObjectVisitor>> {
        self.registry.lookup(value.type_name()).ok()
    }
}

/// Renders nested value objects into the document currently being generated.
#[derive(Debug, Clone)]
pub struct ValueObjectVisitorDispatcher {
    registry: Arc<VisitorRegistry>,
    fallback: Option<Arc<dyn Normalizer>>,
}

impl ValueObjectVisitorDispatcher {
    pub fn new(registry: Arc<VisitorRegistry>) -> Self {
        Self {
            registry,
            fallback: None,
        }
    }

    /// Normalizer consulted for types that have no visitor.
    pub fn with_fallback(mut self, fallback: Arc<dyn Normalizer>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn registry(&self) -> &VisitorRegistry {
        &self.registry
    }

    pub fn visit(
        &self,
        visitor: &mut Visitor,
        generator: &mut Generator,
        value: &dyn ValueObject,
    ) -> HypermediaResult<()> {
        let type_name = value.type_name();
        if let Some(error) = value.as_internal_error() {
            warn!(type_name, %error, "Refusing to render internal error value");
            return Err(HypermediaError::internal_error_value(error.to_string()).into());
        }

        let tried = match self.registry.lookup(type_name) {
            Ok(value_visitor) => {
                debug!(type_name, "Dispatching to registered visitor");
                return value_visitor.visit(visitor, generator, value);
            }
            Err(tried) => tried,
        };

        let mut context = NormalizationContext::nested(generator.format());
        if let Some(fallback) = &self.fallback {
            if fallback.supports_normalization(value, &context) {
                debug!(type_name, "No visitor registered, using fallback normalizer");
                return match fallback.normalize(value, visitor, &mut context)? {
                    Value::Object(members) => {
                        for (name, member) in &members {
                            generator.generate_field_type_hash(name, member)?;
                        }
                        Ok(())
                    }
                    other => Err(HypermediaError::invalid_type("object", json_type(&other)).into()),
                };
            }
        }

        warn!(type_name, tried = ?tried, "No visitor found");
        Err(HypermediaError::no_visitor_found(tried).into())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
