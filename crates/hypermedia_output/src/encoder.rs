/* 📖 # Encoders

Encoders are the last step of the pipeline: they turn normalized data into bytes. They know
nothing about visitors or generators; everything they need is in the data and in the
`EncoderContext` side channel (root element name and root attributes).
*/

use std::fmt;
use std::sync::Arc;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde_json::{Map, Value};

use hypermedia_base::{HypermediaError, HypermediaResult};

use crate::format::{EncoderContext, OutputFormat};

/// Root element name used when the document did not provide one.
pub const DEFAULT_XML_ROOT: &str = "response";

pub trait Encoder: Send + Sync + fmt::Debug {
    fn format(&self) -> OutputFormat;

    /// The root element's media type when known, `application/<format>` otherwise.
    fn content_type(&self, context: &EncoderContext) -> String {
        context
            .media_type()
            .map(str::to_string)
            .unwrap_or_else(|| format!("application/{}", self.format()))
    }

    fn encode(&self, data: &Value, context: &EncoderContext) -> HypermediaResult<Vec<u8>>;
}

/// Returns the encoder for `format`.
pub fn encoder_for(format: OutputFormat) -> Arc<dyn Encoder> {
    match format {
        OutputFormat::Json => Arc::new(JsonEncoder),
        OutputFormat::Xml => Arc::new(XmlEncoder),
    }
}

/// Compact JSON, member order preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn encode(&self, data: &Value, _context: &EncoderContext) -> HypermediaResult<Vec<u8>> {
        serde_json::to_vec(data)
            .map_err(|err| Box::new(HypermediaError::serialization(err.to_string())))
    }
}

/// XML with declaration. `@name` members become attributes, `#` is element text and arrays
/// repeat the element once per item. Names that are not valid XML names fail with a
/// serialization error.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlEncoder;

impl Encoder for XmlEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Xml
    }

    fn encode(&self, data: &Value, context: &EncoderContext) -> HypermediaResult<Vec<u8>> {
        let root = context.root_element.as_deref().unwrap_or(DEFAULT_XML_ROOT);
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(write_error)?;
        match data {
            Value::Array(items) => {
                let root = check_name(root)?;
                writer
                    .write_event(Event::Start(BytesStart::new(root)))
                    .map_err(write_error)?;
                for item in items {
                    write_element(&mut writer, "value", item)?;
                }
                writer
                    .write_event(Event::End(BytesEnd::new(root)))
                    .map_err(write_error)?;
            }
            _ => write_element(&mut writer, root, data)?,
        }
        Ok(writer.into_inner())
    }
}

fn write_error(err: impl fmt::Display) -> Box<HypermediaError> {
    Box::new(HypermediaError::serialization(err.to_string()))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Rejects names that cannot be written as XML element or attribute names.
fn check_name(name: &str) -> HypermediaResult<&str> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(name)
    } else {
        Err(HypermediaError::serialization(format!("Invalid XML name: {:?}", name)).into())
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> HypermediaResult<()> {
    let name = check_name(name)?;
    match value {
        Value::Array(items) => {
            for item in items {
                write_element(writer, name, item)?;
            }
            Ok(())
        }
        Value::Object(map) => write_object(writer, name, map),
        Value::Null => writer
            .write_event(Event::Empty(BytesStart::new(name)))
            .map_err(write_error),
        scalar => {
            let text = scalar_text(scalar).unwrap_or_default();
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(write_error)?;
            writer
                .write_event(Event::Text(BytesText::new(&text)))
                .map_err(write_error)?;
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(write_error)
        }
    }
}

fn write_object(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    map: &Map<String, Value>,
) -> HypermediaResult<()> {
    let name = check_name(name)?;
    let mut start = BytesStart::new(name);
    let mut text = None;
    let mut children = vec![];
    for (key, value) in map {
        if let Some(attribute) = key.strip_prefix('@') {
            if let Some(value) = scalar_text(value) {
                start.push_attribute((check_name(attribute)?, value.as_str()));
            }
        } else if key == "#" {
            text = scalar_text(value);
        } else if !matches!(value, Value::Array(items) if items.is_empty()) {
            children.push((key, value));
        }
    }

    if text.is_none() && children.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(write_error);
    }
    writer.write_event(Event::Start(start)).map_err(write_error)?;
    if let Some(text) = text {
        writer
            .write_event(Event::Text(BytesText::new(&text)))
            .map_err(write_error)?;
    }
    for (key, value) in children {
        write_element(writer, key, value)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(write_error)
}
