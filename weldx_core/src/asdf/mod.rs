// weldx_core/src/asdf/mod.rs

//! Conversion of entities to and from tagged YAML trees.

use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value};

use crate::annotations::Annotations;
use crate::asdf::tags::{format_tag, tag_str, WeldxTag};
use crate::error::{Result, WeldxError};

/// The contract for any type that can be written to and read from a tagged tree.
///
/// Implementations only deal with their own fields; tagging, annotations and
/// null removal are handled by [`to_tagged`] and [`from_tagged`].
pub trait TreeConverter: Sized {
    /// Tag name without base URI and version, e.g. `core/time_series`.
    const NAME: &'static str;
    const VERSION: &'static str;

    fn to_tree(&self) -> Result<Mapping>;

    fn from_tree(tree: Mapping) -> Result<Self>;

    /// Annotations written next to the own fields, if the type carries any.
    fn tree_annotations(&self) -> Option<&Annotations> {
        None
    }

    /// Receives the annotations found in the tree on load.
    fn restore_annotations(&mut self, _annotations: Annotations) {}

    fn tag() -> String {
        format_tag(Self::NAME, Self::VERSION)
    }
}

/// Converts `obj` to a tagged node, adding annotations and dropping nulls.
pub fn to_tagged<T: TreeConverter>(obj: &T) -> Result<Value> {
    let mut tree = obj.to_tree()?;
    if let Some(annotations) = obj.tree_annotations() {
        annotations.write_into(&mut tree);
    }
    let mut value = Value::Mapping(tree);
    tree::drop_nulls(&mut value);
    Ok(Value::Tagged(Box::new(TaggedValue {
        tag: Tag::new(T::tag()),
        value,
    })))
}

/// Reads a `T` from a tagged node, accepting any tag version with the same major.
pub fn from_tagged<T: TreeConverter>(value: Value) -> Result<T> {
    let Value::Tagged(tagged) = value else {
        return Err(WeldxError::UnknownTag {
            expected: T::tag(),
            found: "<untagged>".into(),
        });
    };
    let TaggedValue { tag, value } = *tagged;
    let found = tag_str(&tag);
    if !WeldxTag::parse(&found).is_some_and(|t| t.matches(T::NAME, T::VERSION)) {
        return Err(WeldxError::UnknownTag {
            expected: T::tag(),
            found,
        });
    }
    let mut tree = tree::as_mapping(value, "")?;
    let annotations = Annotations::take_from(&mut tree)?;
    let mut obj = T::from_tree(tree)?;
    if !annotations.is_empty() {
        obj.restore_annotations(annotations);
    }
    Ok(obj)
}

pub mod converters;
pub mod file;
pub mod tags;
pub(crate) mod tree;
pub mod validation;
