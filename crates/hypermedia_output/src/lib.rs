/* 📖 # Hypermedia output

This crate turns domain value objects into hypermedia responses:

1. `Visitor::visit` picks a normalizer for the value object
2. the visitor adapter resolves the registered `ValueObjectVisitor` along the type hierarchy
3. the value object visitor drives a `Generator`, which checks every element it is asked to
   open or close and builds a `DocumentTree`
4. the output format normalizes the tree and an encoder writes JSON or XML
5. status, headers and body are wrapped into an `HttpResponse`
*/

pub mod config;
pub mod dispatcher;
pub mod encoder;
pub mod format;
pub mod generator;
pub mod node;
pub mod normalizer;
pub mod pipeline;
mod pipeline_tests;
pub mod value;
pub mod value_object_visitor;
pub mod visitor;

pub use config::{OutputConfig, load_config, parse_config};
pub use dispatcher::{ValueObjectVisitorDispatcher, ValueObjectVisitorResolver, VisitorRegistry};
pub use encoder::{Encoder, JsonEncoder, XmlEncoder, encoder_for};
pub use format::{EncoderContext, NormalizedDocument, OutputFormat};
pub use generator::{ElementKind, Generator, MEDIA_TYPE_ATTRIBUTE};
pub use node::{DocumentNode, DocumentTree, NodeId, NodeKind, ScalarValue};
pub use normalizer::{
    GenericNormalizer, NormalizationContext, Normalizer, NormalizerChain, VisitorAdapterNormalizer,
};
pub use pipeline::OutputPipeline;
pub use value::{TypeHierarchy, ValueObject, downcast};
pub use value_object_visitor::{Limitation, TranslatedValues, ValueObjectVisitor};
pub use visitor::Visitor;

#[doc(hidden)]
pub use serde_json as __serde_json;
