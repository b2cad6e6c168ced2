//! Shading prim schemas.

use anyhow::{bail, Result};

use crate::{
    prim::{PrimMeta, ReconstructPrim, ReferenceList},
    prop::{take_attr, take_connection, Attribute, PropertyMap, RelationTarget},
    sdf::Value,
};

/// Material, the binding point for shading networks.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Material {
    pub name: String,

    /// `outputs:surface` connection.
    pub surface: Option<RelationTarget>,
    /// `outputs:displacement` connection.
    pub displacement: Option<RelationTarget>,
    /// `outputs:volume` connection.
    pub volume: Option<RelationTarget>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for Material {
    const TYPE_NAME: &'static str = "Material";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(Material {
            surface: take_connection(&mut properties, "outputs:surface"),
            displacement: take_connection(&mut properties, "outputs:displacement"),
            volume: take_connection(&mut properties, "outputs:volume"),
            props: properties,
            ..Default::default()
        })
    }
}

/// Shader node in a shading network.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Shader {
    pub name: String,

    /// Shader implementation identifier, e.g. `UsdPreviewSurface`.
    pub info_id: Option<String>,

    pub meta: PrimMeta,
    /// `inputs:*` and `outputs:*` properties, including connections.
    pub props: PropertyMap,
}

impl ReconstructPrim for Shader {
    const TYPE_NAME: &'static str = "Shader";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        let info_id = match take_attr(&mut properties, "info:id") {
            Some(attr) => match attr.scalar() {
                Some(Value::Token(id)) => Some(id.clone()),
                Some(other) => bail!("`info:id` must be `token` type, but got `{}`", other.type_name()),
                None => bail!("`info:id` cannot be time-sampled"),
            },
            None => None,
        };

        Ok(Shader {
            info_id,
            props: properties,
            ..Default::default()
        })
    }
}
