/* 📖 # ValueObjectVisitor

One implementation per resource type. A visitor downcasts the value object it receives and
drives the generator through the elements of that resource. Nested value objects go back
through `Visitor::visit_value_object`, which dispatches them to their own visitor.

The provided methods cover shapes that many resources share: translated names and
descriptions, and policy limitations.
*/

use std::collections::BTreeMap;
use std::fmt;

use hypermedia_base::HypermediaResult;

use crate::generator::Generator;
use crate::node::ScalarValue;
use crate::value::ValueObject;
use crate::visitor::Visitor;

/// Language code → translated text. Ordered, so output is stable.
pub type TranslatedValues = BTreeMap<String, String>;

/// A policy limitation: an identifier plus the resources it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limitation {
    pub identifier: String,
    /// `href`s of the referenced resources.
    pub values: Vec<String>,
}

pub trait ValueObjectVisitor: Send + Sync + fmt::Debug {
    fn visit(
        &self,
        visitor: &mut Visitor,
        generator: &mut Generator,
        value: &dyn ValueObject,
    ) -> HypermediaResult<()>;

    fn serialize_bool(&self, generator: &Generator, value: Option<bool>) -> ScalarValue {
        generator.serialize_bool(value)
    }

    /// Renders `values` as hash `list_name` › list `value` › one value element per language.
    fn visit_translated_list(
        &self,
        generator: &mut Generator,
        list_name: &str,
        values: &TranslatedValues,
    ) -> HypermediaResult<()> {
        generator.start_hash_element(list_name)?;
        generator.start_list("value")?;
        for (language_code, text) in values {
            generator.start_value_element(
                "value",
                text,
                vec![("languageCode".to_string(), language_code.into())],
            )?;
            generator.end_value_element("value")?;
        }
        generator.end_list("value")?;
        generator.end_hash_element(list_name)
    }

    fn visit_names_list(
        &self,
        generator: &mut Generator,
        names: &TranslatedValues,
    ) -> HypermediaResult<()> {
        self.visit_translated_list(generator, "names", names)
    }

    fn visit_descriptions_list(
        &self,
        generator: &mut Generator,
        descriptions: &TranslatedValues,
    ) -> HypermediaResult<()> {
        self.visit_translated_list(generator, "descriptions", descriptions)
    }

    /// Renders hash `limitation` (with `identifier`) › hash `values` › list `ref` of
    /// `ref` object elements carrying an `href`.
    fn visit_limitation(
        &self,
        generator: &mut Generator,
        limitation: &Limitation,
    ) -> HypermediaResult<()> {
        generator.start_hash_element("limitation")?;
        generator.attribute("identifier", limitation.identifier.as_str())?;
        generator.start_hash_element("values")?;
        generator.start_list("ref")?;
        for href in &limitation.values {
            generator.start_object_element("ref", None)?;
            generator.attribute("href", href.as_str())?;
            generator.end_object_element("ref")?;
        }
        generator.end_list("ref")?;
        generator.end_hash_element("values")?;
        generator.end_hash_element("limitation")
    }
}
