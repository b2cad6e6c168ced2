//! Classified prim properties.
//!
//! A crate fieldset describing a property collapses into one [Property]
//! variant: a declared-but-empty attribute, a value-carrying attribute, a
//! connection, or a relationship.

use indexmap::IndexMap;
use strum::EnumIs;

use crate::sdf::{self, Dictionary, Interpolation, ListEditQual, StringData, TimeSampleMap, Value, Variability};

/// Property name to classified property.
///
/// Iteration order is insertion order, but consumers must not rely on it.
pub type PropertyMap = IndexMap<String, Property>;

/// Attribute metadata.
///
/// `None` = not authored in the layer.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AttrMeta {
    pub interpolation: Option<Interpolation>,
    pub element_size: Option<u32>,
    pub hidden: Option<bool>,
    pub comment: Option<StringData>,
    pub custom_data: Option<Dictionary>,

    /// Metadata fields with no dedicated slot.
    pub extra: IndexMap<String, Value>,
}

impl AttrMeta {
    pub fn authored(&self) -> bool {
        self.interpolation.is_some()
            || self.element_size.is_some()
            || self.hidden.is_some()
            || self.comment.is_some()
            || self.custom_data.is_some()
            || !self.extra.is_empty()
    }
}

/// An attribute value: a scalar or a time-sample series.
#[derive(Debug, Clone, PartialEq, EnumIs)]
pub enum AttrValue {
    Scalar(Value),
    TimeSamples(TimeSampleMap),
}

/// A value-carrying attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Declared type name (`typeName` field), when authored.
    pub type_name: Option<String>,
    pub value: AttrValue,
    pub variability: Variability,
    pub custom: bool,
    pub meta: AttrMeta,
}

impl Attribute {
    /// The scalar payload, if this attribute is not time-sampled.
    #[inline]
    pub fn scalar(&self) -> Option<&Value> {
        match &self.value {
            AttrValue::Scalar(value) => Some(value),
            AttrValue::TimeSamples(_) => None,
        }
    }

    #[inline]
    pub fn time_samples(&self) -> Option<&TimeSampleMap> {
        match &self.value {
            AttrValue::Scalar(_) => None,
            AttrValue::TimeSamples(samples) => Some(samples),
        }
    }
}

/// Paths targeted by a connection or relationship.
#[derive(Debug, Default, Clone, PartialEq, EnumIs)]
pub enum RelationTarget {
    /// Declared with no target, e.g. `rel target`.
    #[default]
    Empty,
    Single(sdf::Path),
    Multi(Vec<sdf::Path>),
}

impl RelationTarget {
    /// All targeted paths in order.
    pub fn paths(&self) -> &[sdf::Path] {
        match self {
            RelationTarget::Empty => &[],
            RelationTarget::Single(path) => std::slice::from_ref(path),
            RelationTarget::Multi(paths) => paths,
        }
    }
}

/// A classified property.
#[derive(Debug, Clone, PartialEq, EnumIs)]
pub enum Property {
    /// Attribute declared without value, time samples or connection,
    /// e.g. `float outputs:rgb`.
    EmptyAttr {
        type_name: String,
        custom: bool,
        meta: AttrMeta,
    },

    /// Attribute with a scalar default or time samples.
    Attr(Attribute),

    /// Typed `.connect` property targeting one or more paths.
    Connection {
        target: RelationTarget,
        type_name: Option<String>,
        custom: bool,
        meta: AttrMeta,
    },

    /// Untyped `rel`, with a list-edit qualifier. An `Empty` target is the
    /// no-target form.
    Relationship {
        target: RelationTarget,
        qualifier: ListEditQual,
        custom: bool,
        meta: AttrMeta,
    },
}

impl Property {
    /// Declared type name, for the variants that carry one.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Property::EmptyAttr { type_name, .. } => Some(type_name),
            Property::Attr(attr) => attr.type_name.as_deref(),
            Property::Connection { type_name, .. } => type_name.as_deref(),
            Property::Relationship { .. } => None,
        }
    }

    #[inline]
    pub fn as_attr(&self) -> Option<&Attribute> {
        match self {
            Property::Attr(attr) => Some(attr),
            _ => None,
        }
    }

    /// The scalar payload of a plain attribute property.
    #[inline]
    pub fn scalar(&self) -> Option<&Value> {
        self.as_attr().and_then(Attribute::scalar)
    }

    pub fn custom(&self) -> bool {
        match self {
            Property::EmptyAttr { custom, .. }
            | Property::Connection { custom, .. }
            | Property::Relationship { custom, .. } => *custom,
            Property::Attr(attr) => attr.custom,
        }
    }
}

/// Remove and return a value-carrying attribute from the map.
///
/// Leaves the entry in place when it exists but is not a plain attribute,
/// so schemas keep unexpected classifications in their generic map.
pub(crate) fn take_attr(props: &mut PropertyMap, name: &str) -> Option<Attribute> {
    if props.get(name).is_some_and(Property::is_attr) {
        if let Some(Property::Attr(attr)) = props.shift_remove(name) {
            return Some(attr);
        }
    }

    None
}

/// Remove and return a relationship's targets from the map.
pub(crate) fn take_rel(props: &mut PropertyMap, name: &str) -> Option<RelationTarget> {
    if props.get(name).is_some_and(Property::is_relationship) {
        if let Some(Property::Relationship { target, .. }) = props.shift_remove(name) {
            return Some(target);
        }
    }

    None
}

/// Remove and return a connection's targets from the map.
pub(crate) fn take_connection(props: &mut PropertyMap, name: &str) -> Option<RelationTarget> {
    if props.get(name).is_some_and(Property::is_connection) {
        if let Some(Property::Connection { target, .. }) = props.shift_remove(name) {
            return Some(target);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdf::path;

    fn scalar_attr(value: Value) -> Property {
        Property::Attr(Attribute {
            type_name: None,
            value: AttrValue::Scalar(value),
            variability: Variability::Varying,
            custom: false,
            meta: AttrMeta::default(),
        })
    }

    #[test]
    fn property_accessors() {
        let prop = scalar_attr(Value::Int(7));
        assert!(prop.is_attr());
        assert_eq!(prop.scalar(), Some(&Value::Int(7)));
        assert!(!prop.custom());

        let empty = Property::EmptyAttr {
            type_name: "float".to_string(),
            custom: true,
            meta: AttrMeta::default(),
        };
        assert_eq!(empty.type_name(), Some("float"));
        assert!(empty.custom());
        assert!(empty.scalar().is_none());
    }

    #[test]
    fn relation_target_paths() {
        assert!(RelationTarget::Empty.paths().is_empty());

        let single = RelationTarget::Single(path("/Root/Material"));
        assert_eq!(single.paths().len(), 1);

        let multi = RelationTarget::Multi(vec![path("/A"), path("/B")]);
        assert_eq!(multi.paths().len(), 2);
    }

    #[test]
    fn attr_meta_authored() {
        let mut meta = AttrMeta::default();
        assert!(!meta.authored());

        meta.element_size = Some(4);
        assert!(meta.authored());
    }
}
