//! Skeletal animation prim schemas.

use anyhow::Result;

use crate::{
    prim::{PrimMeta, ReconstructPrim, ReferenceList},
    prop::{take_attr, take_rel, Attribute, PropertyMap, RelationTarget},
};

/// Root of a skeletal hierarchy.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SkelRoot {
    pub name: String,

    /// `skel:skeleton` binding relationship.
    pub skeleton: Option<RelationTarget>,
    /// `skel:animationSource` binding relationship.
    pub animation_source: Option<RelationTarget>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for SkelRoot {
    const TYPE_NAME: &'static str = "SkelRoot";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(SkelRoot {
            skeleton: take_rel(&mut properties, "skel:skeleton"),
            animation_source: take_rel(&mut properties, "skel:animationSource"),
            props: properties,
            ..Default::default()
        })
    }
}

/// Joint hierarchy with bind and rest poses.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Skeleton {
    pub name: String,

    pub joints: Option<Attribute>,
    pub joint_names: Option<Attribute>,
    pub bind_transforms: Option<Attribute>,
    pub rest_transforms: Option<Attribute>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for Skeleton {
    const TYPE_NAME: &'static str = "Skeleton";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(Skeleton {
            joints: take_attr(&mut properties, "joints"),
            joint_names: take_attr(&mut properties, "jointNames"),
            bind_transforms: take_attr(&mut properties, "bindTransforms"),
            rest_transforms: take_attr(&mut properties, "restTransforms"),
            props: properties,
            ..Default::default()
        })
    }
}

/// Joint animation source. Transform attributes are typically
/// time-sampled.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SkelAnimation {
    pub name: String,

    pub joints: Option<Attribute>,
    pub translations: Option<Attribute>,
    pub rotations: Option<Attribute>,
    pub scales: Option<Attribute>,
    pub blend_shapes: Option<Attribute>,
    pub blend_shape_weights: Option<Attribute>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for SkelAnimation {
    const TYPE_NAME: &'static str = "SkelAnimation";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(SkelAnimation {
            joints: take_attr(&mut properties, "joints"),
            translations: take_attr(&mut properties, "translations"),
            rotations: take_attr(&mut properties, "rotations"),
            scales: take_attr(&mut properties, "scales"),
            blend_shapes: take_attr(&mut properties, "blendShapes"),
            blend_shape_weights: take_attr(&mut properties, "blendShapeWeights"),
            props: properties,
            ..Default::default()
        })
    }
}

/// Morph target deltas.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BlendShape {
    pub name: String,

    pub offsets: Option<Attribute>,
    pub normal_offsets: Option<Attribute>,
    pub point_indices: Option<Attribute>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for BlendShape {
    const TYPE_NAME: &'static str = "BlendShape";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(BlendShape {
            offsets: take_attr(&mut properties, "offsets"),
            normal_offsets: take_attr(&mut properties, "normalOffsets"),
            point_indices: take_attr(&mut properties, "pointIndices"),
            props: properties,
            ..Default::default()
        })
    }
}
