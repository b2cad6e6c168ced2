use glam::{DMat2, DMat3, DMat4, DQuat, DVec2, DVec3, DVec4, IVec2, IVec3, IVec4, Quat, Vec2, Vec3, Vec4};
use half::f16;
use indexmap::IndexMap;
use strum::{EnumIs, EnumTryAs};

use super::*;

/// Nested string-keyed metadata dictionary (`customData`, `assetInfo`, ...).
pub type Dictionary = IndexMap<String, Value>;

/// Time-indexed samples. A sample value may be [Value::ValueBlock].
pub type TimeSampleMap = Vec<(f64, Value)>;

/// `Value` holds any data type loadable from a USD layer.
///
/// Suffixes:
/// - d: double
/// - f: float
/// - h: half
/// - i: int
///
/// Single vectors and quaternions use `glam` types (`[f16; N]` for halfs,
/// which glam does not cover); `*Vec` variants are the array counterparts.
#[derive(Debug, Clone, PartialEq, EnumIs, EnumTryAs)]
pub enum Value {
    Bool(bool),
    BoolVec(Vec<bool>),

    Uchar(u8),
    UcharVec(Vec<u8>),

    Int(i32),
    IntVec(Vec<i32>),

    Uint(u32),
    UintVec(Vec<u32>),

    Int64(i64),
    Int64Vec(Vec<i64>),

    Uint64(u64),
    Uint64Vec(Vec<u64>),

    Half(f16),
    HalfVec(Vec<f16>),

    Float(f32),
    FloatVec(Vec<f32>),

    Double(f64),
    DoubleVec(Vec<f64>),

    TimeCode(f64),
    TimeCodeVec(Vec<f64>),

    String(String),
    StringVec(Vec<String>),

    Token(String),
    TokenVec(Vec<String>),

    AssetPath(String),
    AssetPathVec(Vec<String>),

    Quath([f16; 4]),
    QuathVec(Vec<[f16; 4]>),
    Quatf(Quat),
    QuatfVec(Vec<Quat>),
    Quatd(DQuat),
    QuatdVec(Vec<DQuat>),

    Vec2h([f16; 2]),
    Vec2hVec(Vec<[f16; 2]>),
    Vec3h([f16; 3]),
    Vec3hVec(Vec<[f16; 3]>),
    Vec4h([f16; 4]),
    Vec4hVec(Vec<[f16; 4]>),

    Vec2f(Vec2),
    Vec2fVec(Vec<Vec2>),
    Vec3f(Vec3),
    Vec3fVec(Vec<Vec3>),
    Vec4f(Vec4),
    Vec4fVec(Vec<Vec4>),

    Vec2d(DVec2),
    Vec2dVec(Vec<DVec2>),
    Vec3d(DVec3),
    Vec3dVec(Vec<DVec3>),
    Vec4d(DVec4),
    Vec4dVec(Vec<DVec4>),

    Vec2i(IVec2),
    Vec2iVec(Vec<IVec2>),
    Vec3i(IVec3),
    Vec3iVec(Vec<IVec3>),
    Vec4i(IVec4),
    Vec4iVec(Vec<IVec4>),

    Matrix2d(DMat2),
    Matrix2dVec(Vec<DMat2>),
    Matrix3d(DMat3),
    Matrix3dVec(Vec<DMat3>),
    Matrix4d(DMat4),
    Matrix4dVec(Vec<DMat4>),

    Specifier(Specifier),
    Permission(Permission),
    Variability(Variability),

    Dictionary(Dictionary),

    TokenListOp(TokenListOp),
    StringListOp(StringListOp),
    PathListOp(PathListOp),
    ReferenceListOp(ReferenceListOp),
    IntListOp(IntListOp),
    Int64ListOp(Int64ListOp),
    UintListOp(UintListOp),
    Uint64ListOp(Uint64ListOp),
    PayloadListOp(PayloadListOp),

    Path(Path),
    PathVec(Vec<Path>),

    VariantSelectionMap(IndexMap<String, String>),
    TimeSamples(TimeSampleMap),

    Payload(Payload),
    Reference(Reference),

    LayerOffsetVec(Vec<LayerOffset>),

    /// Explicitly blocked value (`None` in usda).
    ValueBlock,
}

impl Value {
    /// USD type name of the held value. Arrays carry a `[]` suffix.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::BoolVec(_) => "bool[]",
            Value::Uchar(_) => "uchar",
            Value::UcharVec(_) => "uchar[]",
            Value::Int(_) => "int",
            Value::IntVec(_) => "int[]",
            Value::Uint(_) => "uint",
            Value::UintVec(_) => "uint[]",
            Value::Int64(_) => "int64",
            Value::Int64Vec(_) => "int64[]",
            Value::Uint64(_) => "uint64",
            Value::Uint64Vec(_) => "uint64[]",
            Value::Half(_) => "half",
            Value::HalfVec(_) => "half[]",
            Value::Float(_) => "float",
            Value::FloatVec(_) => "float[]",
            Value::Double(_) => "double",
            Value::DoubleVec(_) => "double[]",
            Value::TimeCode(_) => "timecode",
            Value::TimeCodeVec(_) => "timecode[]",
            Value::String(_) => "string",
            Value::StringVec(_) => "string[]",
            Value::Token(_) => "token",
            Value::TokenVec(_) => "token[]",
            Value::AssetPath(_) => "asset",
            Value::AssetPathVec(_) => "asset[]",
            Value::Quath(_) => "quath",
            Value::QuathVec(_) => "quath[]",
            Value::Quatf(_) => "quatf",
            Value::QuatfVec(_) => "quatf[]",
            Value::Quatd(_) => "quatd",
            Value::QuatdVec(_) => "quatd[]",
            Value::Vec2h(_) => "half2",
            Value::Vec2hVec(_) => "half2[]",
            Value::Vec3h(_) => "half3",
            Value::Vec3hVec(_) => "half3[]",
            Value::Vec4h(_) => "half4",
            Value::Vec4hVec(_) => "half4[]",
            Value::Vec2f(_) => "float2",
            Value::Vec2fVec(_) => "float2[]",
            Value::Vec3f(_) => "float3",
            Value::Vec3fVec(_) => "float3[]",
            Value::Vec4f(_) => "float4",
            Value::Vec4fVec(_) => "float4[]",
            Value::Vec2d(_) => "double2",
            Value::Vec2dVec(_) => "double2[]",
            Value::Vec3d(_) => "double3",
            Value::Vec3dVec(_) => "double3[]",
            Value::Vec4d(_) => "double4",
            Value::Vec4dVec(_) => "double4[]",
            Value::Vec2i(_) => "int2",
            Value::Vec2iVec(_) => "int2[]",
            Value::Vec3i(_) => "int3",
            Value::Vec3iVec(_) => "int3[]",
            Value::Vec4i(_) => "int4",
            Value::Vec4iVec(_) => "int4[]",
            Value::Matrix2d(_) => "matrix2d",
            Value::Matrix2dVec(_) => "matrix2d[]",
            Value::Matrix3d(_) => "matrix3d",
            Value::Matrix3dVec(_) => "matrix3d[]",
            Value::Matrix4d(_) => "matrix4d",
            Value::Matrix4dVec(_) => "matrix4d[]",
            Value::Specifier(_) => "specifier",
            Value::Permission(_) => "permission",
            Value::Variability(_) => "variability",
            Value::Dictionary(_) => "dictionary",
            Value::TokenListOp(_) => "ListOp[token]",
            Value::StringListOp(_) => "ListOp[string]",
            Value::PathListOp(_) => "ListOp[path]",
            Value::ReferenceListOp(_) => "ListOp[reference]",
            Value::IntListOp(_) => "ListOp[int]",
            Value::Int64ListOp(_) => "ListOp[int64]",
            Value::UintListOp(_) => "ListOp[uint]",
            Value::Uint64ListOp(_) => "ListOp[uint64]",
            Value::PayloadListOp(_) => "ListOp[payload]",
            Value::Path(_) => "path",
            Value::PathVec(_) => "path[]",
            Value::VariantSelectionMap(_) => "variants",
            Value::TimeSamples(_) => "TimeSamples",
            Value::Payload(_) => "payload",
            Value::Reference(_) => "reference",
            Value::LayerOffsetVec(_) => "LayerOffset[]",
            Value::ValueBlock => "None",
        }
    }
}

/// Resolve a role type name (e.g. `color3f`, `normal3f`, `texCoord2f`) to
/// its arithmetic base type name. Non-role names pass through.
pub fn role_base_type_name(name: &str) -> &str {
    match name {
        "color3h" | "point3h" | "normal3h" | "vector3h" | "texCoord3h" => "half3",
        "color3f" | "point3f" | "normal3f" | "vector3f" | "texCoord3f" => "float3",
        "color3d" | "point3d" | "normal3d" | "vector3d" | "texCoord3d" => "double3",
        "color4h" => "half4",
        "color4f" => "float4",
        "color4d" => "double4",
        "texCoord2h" => "half2",
        "texCoord2f" => "float2",
        "texCoord2d" => "double2",
        "frame4d" => "matrix4d",
        "timecode" => "double",
        other => other,
    }
}

#[inline]
fn widen2(v: [f16; 2]) -> Vec2 {
    Vec2::new(v[0].to_f32(), v[1].to_f32())
}

#[inline]
fn widen3(v: [f16; 3]) -> Vec3 {
    Vec3::new(v[0].to_f32(), v[1].to_f32(), v[2].to_f32())
}

#[inline]
fn widen4(v: [f16; 4]) -> Vec4 {
    Vec4::new(v[0].to_f32(), v[1].to_f32(), v[2].to_f32(), v[3].to_f32())
}

/// Widen a half-precision scalar, vector or quaternion to the float or
/// double counterpart demanded by `declared` (a possibly-role type name).
///
/// Inlined crate values may be stored with less accuracy (e.g. `half3`)
/// than the authored `typeName` (e.g. `float3`); the declared type wins.
/// Role information is not preserved. Returns `None` when no conversion
/// applies, in which case the value is kept as-is.
pub fn upcast(declared: &str, value: &Value) -> Option<Value> {
    let base = role_base_type_name(declared);

    let upcast = match (base, value) {
        ("float", Value::Half(v)) => Value::Float(v.to_f32()),
        ("float2", Value::Vec2h(v)) => Value::Vec2f(widen2(*v)),
        ("float3", Value::Vec3h(v)) => Value::Vec3f(widen3(*v)),
        ("float4", Value::Vec4h(v)) => Value::Vec4f(widen4(*v)),

        ("double", Value::Half(v)) => Value::Double(v.to_f64()),
        ("double2", Value::Vec2h(v)) => Value::Vec2d(widen2(*v).as_dvec2()),
        ("double3", Value::Vec3h(v)) => Value::Vec3d(widen3(*v).as_dvec3()),
        ("double4", Value::Vec4h(v)) => Value::Vec4d(widen4(*v).as_dvec4()),

        _ => return None,
    };

    Some(upcast)
}
