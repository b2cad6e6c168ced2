//! Geometry prim schemas.
//!
//! Every schema keeps the attributes it knows by name in typed slots and
//! the remainder (primvars, custom attributes, unrecognized metadata) in
//! its generic `props` map. Names are filled in by the reconstruction
//! driver after the schema-level reconstruct succeeds.

use anyhow::Result;

use crate::{
    prim::{PrimMeta, ReconstructPrim, ReferenceList},
    prop::{take_attr, take_rel, Attribute, PropertyMap, RelationTarget},
};

/// Untyped prim (`def "name"` with no schema, or explicit `Model`).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for Model {
    const TYPE_NAME: &'static str = "Model";

    fn reconstruct(properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(Model {
            props: properties,
            ..Default::default()
        })
    }
}

/// Grouping prim with no transform of its own.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Scope {
    pub name: String,
    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for Scope {
    const TYPE_NAME: &'static str = "Scope";

    fn reconstruct(properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(Scope {
            props: properties,
            ..Default::default()
        })
    }
}

/// Transform node. The op stack itself (`xformOp:*` attributes) stays in
/// `props`; evaluation is out of scope.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Xform {
    pub name: String,
    pub xform_op_order: Option<Attribute>,
    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for Xform {
    const TYPE_NAME: &'static str = "Xform";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(Xform {
            xform_op_order: take_attr(&mut properties, "xformOpOrder"),
            props: properties,
            ..Default::default()
        })
    }
}

/// Polygonal mesh.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GeomMesh {
    pub name: String,

    pub points: Option<Attribute>,
    pub normals: Option<Attribute>,
    pub face_vertex_counts: Option<Attribute>,
    pub face_vertex_indices: Option<Attribute>,
    pub extent: Option<Attribute>,
    pub double_sided: Option<Attribute>,
    pub subdivision_scheme: Option<Attribute>,

    /// `material:binding` relationship target.
    pub material_binding: Option<RelationTarget>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for GeomMesh {
    const TYPE_NAME: &'static str = "Mesh";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(GeomMesh {
            points: take_attr(&mut properties, "points"),
            normals: take_attr(&mut properties, "normals"),
            face_vertex_counts: take_attr(&mut properties, "faceVertexCounts"),
            face_vertex_indices: take_attr(&mut properties, "faceVertexIndices"),
            extent: take_attr(&mut properties, "extent"),
            double_sided: take_attr(&mut properties, "doubleSided"),
            subdivision_scheme: take_attr(&mut properties, "subdivisionScheme"),
            material_binding: take_rel(&mut properties, "material:binding"),
            props: properties,
            ..Default::default()
        })
    }
}

/// Point cloud.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GeomPoints {
    pub name: String,

    pub points: Option<Attribute>,
    pub normals: Option<Attribute>,
    pub widths: Option<Attribute>,
    pub ids: Option<Attribute>,
    pub extent: Option<Attribute>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for GeomPoints {
    const TYPE_NAME: &'static str = "Points";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(GeomPoints {
            points: take_attr(&mut properties, "points"),
            normals: take_attr(&mut properties, "normals"),
            widths: take_attr(&mut properties, "widths"),
            ids: take_attr(&mut properties, "ids"),
            extent: take_attr(&mut properties, "extent"),
            props: properties,
            ..Default::default()
        })
    }
}

/// Sphere gprim.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GeomSphere {
    pub name: String,

    pub radius: Option<Attribute>,
    pub extent: Option<Attribute>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for GeomSphere {
    const TYPE_NAME: &'static str = "Sphere";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(GeomSphere {
            radius: take_attr(&mut properties, "radius"),
            extent: take_attr(&mut properties, "extent"),
            props: properties,
            ..Default::default()
        })
    }
}

/// Cube gprim.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GeomCube {
    pub name: String,

    pub size: Option<Attribute>,
    pub extent: Option<Attribute>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for GeomCube {
    const TYPE_NAME: &'static str = "Cube";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(GeomCube {
            size: take_attr(&mut properties, "size"),
            extent: take_attr(&mut properties, "extent"),
            props: properties,
            ..Default::default()
        })
    }
}

/// Cone gprim.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GeomCone {
    pub name: String,

    pub radius: Option<Attribute>,
    pub height: Option<Attribute>,
    pub axis: Option<Attribute>,
    pub extent: Option<Attribute>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for GeomCone {
    const TYPE_NAME: &'static str = "Cone";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(GeomCone {
            radius: take_attr(&mut properties, "radius"),
            height: take_attr(&mut properties, "height"),
            axis: take_attr(&mut properties, "axis"),
            extent: take_attr(&mut properties, "extent"),
            props: properties,
            ..Default::default()
        })
    }
}

/// Cylinder gprim.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GeomCylinder {
    pub name: String,

    pub radius: Option<Attribute>,
    pub height: Option<Attribute>,
    pub axis: Option<Attribute>,
    pub extent: Option<Attribute>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for GeomCylinder {
    const TYPE_NAME: &'static str = "Cylinder";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(GeomCylinder {
            radius: take_attr(&mut properties, "radius"),
            height: take_attr(&mut properties, "height"),
            axis: take_attr(&mut properties, "axis"),
            extent: take_attr(&mut properties, "extent"),
            props: properties,
            ..Default::default()
        })
    }
}

/// Capsule gprim.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GeomCapsule {
    pub name: String,

    pub radius: Option<Attribute>,
    pub height: Option<Attribute>,
    pub axis: Option<Attribute>,
    pub extent: Option<Attribute>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for GeomCapsule {
    const TYPE_NAME: &'static str = "Capsule";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(GeomCapsule {
            radius: take_attr(&mut properties, "radius"),
            height: take_attr(&mut properties, "height"),
            axis: take_attr(&mut properties, "axis"),
            extent: take_attr(&mut properties, "extent"),
            props: properties,
            ..Default::default()
        })
    }
}

/// Batched curves with a common basis.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GeomBasisCurves {
    pub name: String,

    pub points: Option<Attribute>,
    pub curve_vertex_counts: Option<Attribute>,
    pub widths: Option<Attribute>,
    pub normals: Option<Attribute>,
    /// `type` token: `linear` or `cubic`.
    pub curve_type: Option<Attribute>,
    pub basis: Option<Attribute>,
    pub wrap: Option<Attribute>,
    pub extent: Option<Attribute>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for GeomBasisCurves {
    const TYPE_NAME: &'static str = "BasisCurves";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(GeomBasisCurves {
            points: take_attr(&mut properties, "points"),
            curve_vertex_counts: take_attr(&mut properties, "curveVertexCounts"),
            widths: take_attr(&mut properties, "widths"),
            normals: take_attr(&mut properties, "normals"),
            curve_type: take_attr(&mut properties, "type"),
            basis: take_attr(&mut properties, "basis"),
            wrap: take_attr(&mut properties, "wrap"),
            extent: take_attr(&mut properties, "extent"),
            props: properties,
            ..Default::default()
        })
    }
}

/// Camera.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GeomCamera {
    pub name: String,

    pub focal_length: Option<Attribute>,
    pub focus_distance: Option<Attribute>,
    pub horizontal_aperture: Option<Attribute>,
    pub vertical_aperture: Option<Attribute>,
    pub clipping_range: Option<Attribute>,
    pub projection: Option<Attribute>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for GeomCamera {
    const TYPE_NAME: &'static str = "Camera";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(GeomCamera {
            focal_length: take_attr(&mut properties, "focalLength"),
            focus_distance: take_attr(&mut properties, "focusDistance"),
            horizontal_aperture: take_attr(&mut properties, "horizontalAperture"),
            vertical_aperture: take_attr(&mut properties, "verticalAperture"),
            clipping_range: take_attr(&mut properties, "clippingRange"),
            projection: take_attr(&mut properties, "projection"),
            props: properties,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        prop::{AttrMeta, AttrValue, Property},
        sdf::{self, ListEditQual, Value, Variability},
    };
    use glam::Vec3;

    fn attr(value: Value) -> Property {
        Property::Attr(Attribute {
            type_name: None,
            value: AttrValue::Scalar(value),
            variability: Variability::Varying,
            custom: false,
            meta: AttrMeta::default(),
        })
    }

    #[test]
    fn mesh_extracts_known_attributes() {
        let mut props = PropertyMap::new();
        props.insert(
            "points".to_string(),
            attr(Value::Vec3fVec(vec![Vec3::ZERO, Vec3::ONE])),
        );
        props.insert("faceVertexCounts".to_string(), attr(Value::IntVec(vec![3])));
        props.insert("primvars:custom".to_string(), attr(Value::Float(1.0)));
        props.insert(
            "material:binding".to_string(),
            Property::Relationship {
                target: RelationTarget::Single(sdf::path("/Materials/Red")),
                qualifier: ListEditQual::ResetToExplicit,
                custom: false,
                meta: AttrMeta::default(),
            },
        );

        let mesh = GeomMesh::reconstruct(props, &Default::default()).unwrap();

        assert!(mesh.points.is_some());
        assert!(mesh.face_vertex_counts.is_some());
        assert!(mesh.normals.is_none());
        assert!(matches!(mesh.material_binding, Some(RelationTarget::Single(_))));

        // Unknown properties are preserved.
        assert!(mesh.props.contains_key("primvars:custom"));
        assert!(!mesh.props.contains_key("points"));
    }

    #[test]
    fn sphere_keeps_mismatched_classification_generic() {
        let mut props = PropertyMap::new();
        // `radius` authored as a relationship is nonsense and must not be
        // promoted into the typed slot.
        props.insert(
            "radius".to_string(),
            Property::Relationship {
                target: RelationTarget::Empty,
                qualifier: ListEditQual::ResetToExplicit,
                custom: false,
                meta: AttrMeta::default(),
            },
        );

        let sphere = GeomSphere::reconstruct(props, &Default::default()).unwrap();
        assert!(sphere.radius.is_none());
        assert!(sphere.props.contains_key("radius"));
    }
}
