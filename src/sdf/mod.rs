//! Scene description foundations.
//!
//! Types in this module mirror the Sdf layer of USD: spec categories,
//! list-edit operators, paths and the variant value container. Everything
//! here is independent of the on-disk encoding.

use strum::{Display, EnumCount, EnumString, FromRepr};

mod list_op;
mod path;
mod value;

pub use list_op::{
    Int64ListOp, IntListOp, ListOp, PathListOp, PayloadListOp, ReferenceListOp, StringListOp, TokenListOp,
    Uint64ListOp, UintListOp,
};
pub use path::{path, Path};
pub use value::{role_base_type_name, upcast, Dictionary, TimeSampleMap, Value};

/// An enum that specifies the type of an object.
/// Objects are entities that have fields and are addressable by path.
///
/// The numeric values are stored in crate files directly and must match
/// `SdfSpecType` ordering.
#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, FromRepr, EnumCount, Display)]
pub enum SpecType {
    // The unknown type has a value of 0 so that SdfSpecType() is unknown.
    #[default]
    Unknown = 0,

    // Real concrete types
    Attribute = 1,
    Connection = 2,
    Expression = 3,
    Mapper = 4,
    MapperArg = 5,
    Prim = 6,
    PseudoRoot = 7,
    Relationship = 8,
    RelationshipTarget = 9,
    Variant = 10,
    VariantSet = 11,
    Invalid = 12,
}

/// Prim specifier (`def`, `over`, `class`).
#[repr(i32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, FromRepr, Display)]
pub enum Specifier {
    #[default]
    Def = 0,
    Over = 1,
    Class = 2,
}

/// Spec permission, stored as an enum value in crate files.
#[repr(i32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, FromRepr, Display)]
pub enum Permission {
    #[default]
    Public = 0,
    Private = 1,
}

/// Attribute variability. `uniform` qualifiers surface here.
#[repr(i32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, FromRepr, Display)]
pub enum Variability {
    #[default]
    Varying = 0,
    Uniform = 1,
    Config = 2,
}

/// List-edit qualifier carried by a decoded list-op bucket.
///
/// `ResetToExplicit` is the unqualified form.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display)]
pub enum ListEditQual {
    #[default]
    #[strum(serialize = "explicit")]
    ResetToExplicit,
    #[strum(serialize = "append")]
    Append,
    #[strum(serialize = "add")]
    Add,
    #[strum(serialize = "delete")]
    Delete,
    #[strum(serialize = "prepend")]
    Prepend,
    #[strum(serialize = "order")]
    Order,
}

/// Stage up axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Model kind metadatum.
///
/// `SceneLibrary` is a USDZ AR extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Kind {
    #[strum(serialize = "model")]
    Model,
    #[strum(serialize = "group")]
    Group,
    #[strum(serialize = "assembly")]
    Assembly,
    #[strum(serialize = "component")]
    Component,
    #[strum(serialize = "subcomponent")]
    Subcomponent,
    #[strum(serialize = "sceneLibrary")]
    SceneLibrary,
}

/// Attribute interpolation metadatum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Interpolation {
    #[strum(serialize = "constant")]
    Constant,
    #[strum(serialize = "uniform")]
    Uniform,
    #[strum(serialize = "varying")]
    Varying,
    #[strum(serialize = "vertex")]
    Vertex,
    #[strum(serialize = "faceVarying")]
    FaceVarying,
}

/// A string metadatum remembering how it was authored.
///
/// Triple-quoted iff the payload spans multiple lines.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StringData {
    pub value: String,
    pub is_triple_quoted: bool,
}

impl StringData {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let is_triple_quoted = value.contains('\n');
        Self { value, is_triple_quoted }
    }
}

impl From<&str> for StringData {
    fn from(value: &str) -> Self {
        StringData::new(value)
    }
}

/// Layer time offset and scale, applied to references and payloads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerOffset {
    pub offset: f64,
    pub scale: f64,
}

impl Default for LayerOffset {
    fn default() -> Self {
        Self { offset: 0.0, scale: 1.0 }
    }
}

/// A payload arc to an external layer.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Payload {
    pub asset_path: String,
    pub prim_path: Path,
    pub layer_offset: Option<LayerOffset>,
}

/// A reference arc to an external (or local) layer.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Reference {
    pub asset_path: String,
    pub prim_path: Path,
    pub layer_offset: LayerOffset,
    pub custom_data: Dictionary,
}
