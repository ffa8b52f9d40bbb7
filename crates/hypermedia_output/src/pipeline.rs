/* 📖 # Assembling the output pipeline

The pipeline is wired once at startup. The registry is frozen behind an `Arc` and shared by the
resolver and the dispatcher. The normalizer chain tries the visitor adapter first and the
generic normalizer second. The generic normalizer also serves as the dispatcher's fallback for
nested values without a visitor.

Response state is per request, so `visitor()` hands out a new `Visitor` each time. The shared
parts are only cloned as `Arc`s.
*/

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use hypermedia_base::{HttpResponse, HypermediaResult};

use crate::config::{OutputConfig, load_config};
use crate::dispatcher::{ValueObjectVisitorDispatcher, ValueObjectVisitorResolver, VisitorRegistry};
use crate::encoder::{Encoder, encoder_for};
use crate::normalizer::{GenericNormalizer, Normalizer, NormalizerChain, VisitorAdapterNormalizer};
use crate::value::ValueObject;
use crate::visitor::Visitor;

#[derive(Debug, Clone)]
pub struct OutputPipeline {
    config: OutputConfig,
    dispatcher: Arc<ValueObjectVisitorDispatcher>,
    normalizers: Arc<NormalizerChain>,
    encoder: Arc<dyn Encoder>,
}

impl OutputPipeline {
    pub fn new(config: OutputConfig, registry: VisitorRegistry) -> Self {
        debug!(
            vendor = %config.vendor,
            format = %config.format,
            visitors = registry.len(),
            "Assembling output pipeline"
        );
        let registry = Arc::new(registry);
        let generic: Arc<dyn Normalizer> = Arc::new(GenericNormalizer);
        let dispatcher = ValueObjectVisitorDispatcher::new(Arc::clone(&registry))
            .with_fallback(Arc::clone(&generic));
        let adapter: Arc<dyn Normalizer> = Arc::new(VisitorAdapterNormalizer::new(
            ValueObjectVisitorResolver::new(registry),
            config.vendor.as_str(),
        ));
        let normalizers = NormalizerChain::new(vec![adapter, generic]);
        let encoder = encoder_for(config.format);
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
            normalizers: Arc::new(normalizers),
            encoder,
        }
    }

    pub fn from_config_file(path: &Path, registry: VisitorRegistry) -> HypermediaResult<Self> {
        Ok(Self::new(load_config(path)?, registry))
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// A visitor with fresh response state.
    pub fn visitor(&self) -> Visitor {
        Visitor::new(
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.normalizers),
            Arc::clone(&self.encoder),
        )
    }

    /// Renders `value` with a fresh visitor.
    pub fn render(&self, value: &dyn ValueObject) -> HypermediaResult<HttpResponse> {
        self.visitor().visit(value)
    }
}
