/* 📖 # Normalizers

A normalizer turns a value object into plain `serde_json::Value` data that an encoder can
write. The response pipeline asks a `NormalizerChain` for the first normalizer that supports a
value. There are two:

- `VisitorAdapterNormalizer` runs the registered `ValueObjectVisitor` on a fresh `Generator`
  and normalizes the finished document tree
- `GenericNormalizer` takes the value object's own JSON form

The adapter only accepts top-level calls. Nested value objects inside a document are handled by
the dispatcher, which writes into the document already being generated. The adapter checks the
`depth` of the `NormalizationContext` for this instead of a marker entry in a context map.
*/

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use hypermedia_base::{HypermediaError, HypermediaResult, ResultExt};

use crate::dispatcher::ValueObjectVisitorResolver;
use crate::format::{EncoderContext, OutputFormat};
use crate::generator::Generator;
use crate::value::ValueObject;
use crate::visitor::Visitor;

/// Per-call state shared along one normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationContext {
    pub format: OutputFormat,
    /// 0 for the value being rendered as a response, greater inside a document.
    pub depth: usize,
    pub encoder_context: EncoderContext,
}

impl NormalizationContext {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            depth: 0,
            encoder_context: EncoderContext::default(),
        }
    }

    /// Context for values rendered inside an open document.
    pub fn nested(format: OutputFormat) -> Self {
        Self {
            depth: 1,
            ..Self::new(format)
        }
    }

    pub fn is_nested(&self) -> bool {
        self.depth > 0
    }
}

pub trait Normalizer: Send + Sync + fmt::Debug {
    fn supports_normalization(&self, value: &dyn ValueObject, context: &NormalizationContext)
    -> bool;

    fn normalize(
        &self,
        value: &dyn ValueObject,
        visitor: &mut Visitor,
        context: &mut NormalizationContext,
    ) -> HypermediaResult<Value>;
}

/// Renders value objects through their registered visitor.
#[derive(Debug, Clone)]
pub struct VisitorAdapterNormalizer {
    resolver: ValueObjectVisitorResolver,
    vendor: String,
}

impl VisitorAdapterNormalizer {
    pub fn new(resolver: ValueObjectVisitorResolver, vendor: impl Into<String>) -> Self {
        Self {
            resolver,
            vendor: vendor.into(),
        }
    }
}

impl Normalizer for VisitorAdapterNormalizer {
    fn supports_normalization(
        &self,
        value: &dyn ValueObject,
        context: &NormalizationContext,
    ) -> bool {
        !context.is_nested() && self.resolver.resolve(value).is_some()
    }

    #[instrument(skip_all, fields(type_name = value.type_name(), format = %context.format))]
    fn normalize(
        &self,
        value: &dyn ValueObject,
        visitor: &mut Visitor,
        context: &mut NormalizationContext,
    ) -> HypermediaResult<Value> {
        let type_name = value.type_name();
        let value_visitor = self.resolver.resolve(value).ok_or_else(|| {
            let tried = self.resolver.registry().hierarchy().ancestry(type_name);
            Box::new(HypermediaError::no_visitor_found(tried))
        })?;

        let mut generator = Generator::new(context.format, self.vendor.as_str());
        generator.reset();
        generator.start_document(type_name)?;
        context.depth += 1;
        let visited = value_visitor.visit(visitor, &mut generator, value);
        context.depth -= 1;
        visited.with_context(|| format!("rendering {}", type_name))?;
        generator.end_document(type_name)?;

        if generator.is_empty() {
            debug!("Visitor produced an empty document");
            return Ok(Value::Null);
        }
        let normalized = context.format.normalize_document(generator.document());
        context.encoder_context.merge(normalized.context);
        Ok(normalized.data)
    }
}

/// Uses the JSON form value objects provide for themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericNormalizer;

impl Normalizer for GenericNormalizer {
    fn supports_normalization(
        &self,
        value: &dyn ValueObject,
        _context: &NormalizationContext,
    ) -> bool {
        value.to_json_value().is_some()
    }

    fn normalize(
        &self,
        value: &dyn ValueObject,
        _visitor: &mut Visitor,
        _context: &mut NormalizationContext,
    ) -> HypermediaResult<Value> {
        value.to_json_value().ok_or_else(|| {
            Box::new(HypermediaError::no_visitor_found(vec![
                value.type_name().to_string(),
            ]))
        })
    }
}

/// Ordered normalizers; the first one supporting a value wins.
#[derive(Debug, Clone, Default)]
pub struct NormalizerChain {
    normalizers: Vec<Arc<dyn Normalizer>>,
}

impl NormalizerChain {
    pub fn new(normalizers: Vec<Arc<dyn Normalizer>>) -> Self {
        Self { normalizers }
    }

    pub fn push(&mut self, normalizer: Arc<dyn Normalizer>) {
        self.normalizers.push(normalizer);
    }

    pub fn len(&self) -> usize {
        self.normalizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normalizers.is_empty()
    }

    pub fn find(
        &self,
        value: &dyn ValueObject,
        context: &NormalizationContext,
    ) -> Option<&Arc<dyn Normalizer>> {
        self.normalizers
            .iter()
            .find(|normalizer| normalizer.supports_normalization(value, context))
    }
}

impl Normalizer for NormalizerChain {
    fn supports_normalization(
        &self,
        value: &dyn ValueObject,
        context: &NormalizationContext,
    ) -> bool {
        self.find(value, context).is_some()
    }

    fn normalize(
        &self,
        value: &dyn ValueObject,
        visitor: &mut Visitor,
        context: &mut NormalizationContext,
    ) -> HypermediaResult<Value> {
        match self.find(value, context) {
            Some(normalizer) => normalizer.normalize(value, visitor, context),
            None => Err(HypermediaError::no_visitor_found(vec![value.type_name().to_string()]).into()),
        }
    }
}
