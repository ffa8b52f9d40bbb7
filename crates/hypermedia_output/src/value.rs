/* 📖 # Value objects and their type hierarchy

Domain services hand out plain value objects. The output layer only needs three things from
them: a stable type tag to find a visitor, a way to get at the concrete type inside a visitor,
and optionally a generic JSON form for types that have no visitor of their own.

Inheritance is modelled explicitly. A `TypeHierarchy` maps a type tag to its parent tag, so a
derived type without a visitor of its own is rendered by the closest ancestor that has one.
*/

use std::any::Any;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

use hypermedia_base::{HypermediaError, HypermediaResult};
use serde_json::Value;

pub trait ValueObject: Any + fmt::Debug {
    /// Stable, fully qualified tag used for visitor lookup.
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    /// Generic JSON form, if the type can be rendered without a visitor.
    fn to_json_value(&self) -> Option<Value> {
        None
    }

    /// `Some` for values that are internal errors and must never be rendered as content.
    fn as_internal_error(&self) -> Option<&(dyn StdError + 'static)> {
        None
    }
}

/// Implements [`ValueObject`] for a type under the given tag.
///
/// ```ignore
/// value_object!(Greeting, "greetings::Greeting");
/// value_object!(Section, "content::Section", serde);
/// ```
///
/// The `serde` form additionally provides `to_json_value` through `serde::Serialize`.
#[macro_export]
macro_rules! value_object {
    ($ty:ty, $tag:expr) => {
        impl $crate::ValueObject for $ty {
            fn type_name(&self) -> &'static str {
                $tag
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }
    };
    ($ty:ty, $tag:expr, serde) => {
        impl $crate::ValueObject for $ty {
            fn type_name(&self) -> &'static str {
                $tag
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn to_json_value(&self) -> Option<$crate::__serde_json::Value> {
                $crate::__serde_json::to_value(self).ok()
            }
        }
    };
}

/// Type tag of errors handed to the output layer.
pub const INTERNAL_ERROR_TYPE: &str = "hypermedia::HypermediaError";

impl ValueObject for HypermediaError {
    fn type_name(&self) -> &'static str {
        INTERNAL_ERROR_TYPE
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_internal_error(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self)
    }
}

/// Downcasts a value object, failing with an invalid type error on mismatch.
pub fn downcast<T: ValueObject>(value: &dyn ValueObject) -> HypermediaResult<&T> {
    value.as_any().downcast_ref::<T>().ok_or_else(|| {
        Box::new(HypermediaError::invalid_type(
            std::any::type_name::<T>(),
            value.type_name(),
        ))
    })
}

/// Single-parent type table: tag → parent tag.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    parents: HashMap<String, String>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `parent` as the direct parent of `child`.
    pub fn declare(&mut self, child: &str, parent: &str) -> HypermediaResult<()> {
        if let Some(existing) = self.parents.get(child) {
            if existing == parent {
                return Ok(());
            }
            return Err(HypermediaError::message(format!(
                "Type {} already extends {}, cannot also extend {}.",
                child, existing, parent
            ))
            .into());
        }
        if self.ancestry(parent).iter().any(|tag| tag == child) {
            return Err(HypermediaError::message(format!(
                "Declaring {} as parent of {} would create a cycle.",
                parent, child
            ))
            .into());
        }
        self.parents.insert(child.to_string(), parent.to_string());
        Ok(())
    }

    pub fn parent(&self, tag: &str) -> Option<&str> {
        self.parents.get(tag).map(String::as_str)
    }

    /// The tag itself followed by its parent, grandparent and so on.
    pub fn ancestry(&self, tag: &str) -> Vec<String> {
        let mut chain = vec![tag.to_string()];
        let mut current = tag;
        while let Some(parent) = self.parent(current) {
            chain.push(parent.to_string());
            current = parent;
        }
        chain
    }
}
