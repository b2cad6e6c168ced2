//! Light prim schemas.
//!
//! Lights share a small set of common inputs (`inputs:color`,
//! `inputs:intensity`, ...); per-light shape attributes are extracted on
//! top of those.

use anyhow::Result;

use crate::{
    prim::{PrimMeta, ReconstructPrim, ReferenceList},
    prop::{take_attr, Attribute, PropertyMap},
};

/// Inputs common to every light schema.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LightCommon {
    pub color: Option<Attribute>,
    pub intensity: Option<Attribute>,
    pub exposure: Option<Attribute>,
    pub diffuse: Option<Attribute>,
    pub specular: Option<Attribute>,
}

impl LightCommon {
    fn take(props: &mut PropertyMap) -> Self {
        LightCommon {
            color: take_attr(props, "inputs:color"),
            intensity: take_attr(props, "inputs:intensity"),
            exposure: take_attr(props, "inputs:exposure"),
            diffuse: take_attr(props, "inputs:diffuse"),
            specular: take_attr(props, "inputs:specular"),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SphereLight {
    pub name: String,

    pub light: LightCommon,
    pub radius: Option<Attribute>,
    pub treat_as_point: Option<Attribute>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for SphereLight {
    const TYPE_NAME: &'static str = "SphereLight";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(SphereLight {
            light: LightCommon::take(&mut properties),
            radius: take_attr(&mut properties, "inputs:radius"),
            treat_as_point: take_attr(&mut properties, "treatAsPoint"),
            props: properties,
            ..Default::default()
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DomeLight {
    pub name: String,

    pub light: LightCommon,
    /// Environment texture (`inputs:texture:file` asset path).
    pub texture_file: Option<Attribute>,
    pub texture_format: Option<Attribute>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for DomeLight {
    const TYPE_NAME: &'static str = "DomeLight";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(DomeLight {
            light: LightCommon::take(&mut properties),
            texture_file: take_attr(&mut properties, "inputs:texture:file"),
            texture_format: take_attr(&mut properties, "inputs:texture:format"),
            props: properties,
            ..Default::default()
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DiskLight {
    pub name: String,

    pub light: LightCommon,
    pub radius: Option<Attribute>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for DiskLight {
    const TYPE_NAME: &'static str = "DiskLight";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(DiskLight {
            light: LightCommon::take(&mut properties),
            radius: take_attr(&mut properties, "inputs:radius"),
            props: properties,
            ..Default::default()
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DistantLight {
    pub name: String,

    pub light: LightCommon,
    /// Angular size of the light, in degrees.
    pub angle: Option<Attribute>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for DistantLight {
    const TYPE_NAME: &'static str = "DistantLight";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(DistantLight {
            light: LightCommon::take(&mut properties),
            angle: take_attr(&mut properties, "inputs:angle"),
            props: properties,
            ..Default::default()
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CylinderLight {
    pub name: String,

    pub light: LightCommon,
    pub length: Option<Attribute>,
    pub radius: Option<Attribute>,

    pub meta: PrimMeta,
    pub props: PropertyMap,
}

impl ReconstructPrim for CylinderLight {
    const TYPE_NAME: &'static str = "CylinderLight";

    fn reconstruct(mut properties: PropertyMap, _references: &ReferenceList) -> Result<Self> {
        Ok(CylinderLight {
            light: LightCommon::take(&mut properties),
            length: take_attr(&mut properties, "inputs:length"),
            radius: take_attr(&mut properties, "inputs:radius"),
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
        sdf::{Value, Variability},
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
    fn sphere_light_splits_common_inputs() {
        let mut props = PropertyMap::new();
        props.insert("inputs:color".to_string(), attr(Value::Vec3f(Vec3::ONE)));
        props.insert("inputs:intensity".to_string(), attr(Value::Float(1000.0)));
        props.insert("inputs:radius".to_string(), attr(Value::Float(0.5)));
        props.insert("inputs:shaping:cone:angle".to_string(), attr(Value::Float(45.0)));

        let light = SphereLight::reconstruct(props, &Default::default()).unwrap();

        assert!(light.light.color.is_some());
        assert!(light.light.intensity.is_some());
        assert!(light.radius.is_some());
        assert!(light.props.contains_key("inputs:shaping:cone:angle"));
    }
}
