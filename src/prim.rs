//! Typed scene objects.

use anyhow::Result;
use indexmap::IndexMap;
use strum::{Display, EnumString};

use crate::{
    geom::{
        GeomBasisCurves, GeomCamera, GeomCapsule, GeomCone, GeomCube, GeomCylinder, GeomMesh, GeomPoints, GeomSphere,
        Model, Scope, Xform,
    },
    lux::{CylinderLight, DiskLight, DistantLight, DomeLight, SphereLight},
    prop::PropertyMap,
    sdf::{self, Dictionary, Kind, ListEditQual, StringData, Value},
    shade::{Material, Shader},
    skel::{BlendShape, SkelAnimation, SkelRoot, Skeleton},
};

/// References decoded from prim metadata: one list-edit qualifier applied
/// to an ordered reference list.
pub type ReferenceList = (ListEditQual, Vec<sdf::Reference>);

/// API schema names recognized by the reader. A closed set; anything else
/// fails validation.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum ApiName {
    MaterialBindingAPI,
    SkelBindingAPI,
    // USDZ AR extensions
    Preliminary_AnchoringAPI,
    Preliminary_PhysicsColliderAPI,
    Preliminary_PhysicsMaterialAPI,
    Preliminary_PhysicsRigidBodyAPI,
}

/// Validated `apiSchemas` metadata: a single qualifier over recognized
/// schema names with optional multi-apply instance names.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ApiSchemas {
    pub qualifier: ListEditQual,
    /// Schema name and instance name (empty unless multi-apply).
    pub names: Vec<(ApiName, String)>,
}

/// Prim metadata. `None` = not authored.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PrimMeta {
    pub active: Option<bool>,
    pub hidden: Option<bool>,
    pub kind: Option<Kind>,
    pub asset_info: Option<Dictionary>,
    pub custom_data: Option<Dictionary>,
    pub doc: Option<StringData>,
    pub comment: Option<StringData>,
    pub api_schemas: Option<ApiSchemas>,

    // Composition arcs are recorded but not evaluated.
    pub references: Option<(ListEditQual, Vec<sdf::Reference>)>,
    pub payload: Option<(ListEditQual, Vec<sdf::Payload>)>,
    pub inherits: Option<(ListEditQual, Vec<sdf::Path>)>,
    pub specializes: Option<(ListEditQual, Vec<sdf::Path>)>,
    pub variant_sets: Option<(ListEditQual, Vec<String>)>,
    pub variants: Option<IndexMap<String, String>>,

    // USDZ extensions
    pub scene_name: Option<String>,
    pub display_name: Option<String>,

    /// Metadata fields with no dedicated slot.
    pub extra: IndexMap<String, Value>,
}

impl PrimMeta {
    pub fn authored(&self) -> bool {
        self.active.is_some()
            || self.hidden.is_some()
            || self.kind.is_some()
            || self.asset_info.is_some()
            || self.custom_data.is_some()
            || self.doc.is_some()
            || self.comment.is_some()
            || self.api_schemas.is_some()
            || self.references.is_some()
            || self.payload.is_some()
            || self.inherits.is_some()
            || self.specializes.is_some()
            || self.variant_sets.is_some()
            || self.variants.is_some()
            || self.scene_name.is_some()
            || self.display_name.is_some()
            || !self.extra.is_empty()
    }
}

/// Reconstruction contract implemented by every concrete schema: convert a
/// classified property map into the typed form. The prim name is filled in
/// by the caller afterward.
pub trait ReconstructPrim: Sized {
    const TYPE_NAME: &'static str;

    fn reconstruct(properties: PropertyMap, references: &ReferenceList) -> Result<Self>;
}

macro_rules! typed_prim {
    ($($variant:ident),+ $(,)?) => {
        /// Tagged union over the closed set of concrete prim schemas.
        ///
        /// Adding a schema means extending this enum and the dispatch in
        /// [crate::usdc].
        #[derive(Debug, Clone, PartialEq)]
        pub enum TypedPrim {
            $($variant($variant),)+
        }

        impl TypedPrim {
            /// Schema type name, e.g. `Xform`.
            pub fn type_name(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => $variant::TYPE_NAME,)+
                }
            }

            pub fn name(&self) -> &str {
                match self {
                    $(Self::$variant(prim) => &prim.name,)+
                }
            }

            pub fn set_name(&mut self, name: impl Into<String>) {
                let name = name.into();
                match self {
                    $(Self::$variant(prim) => prim.name = name,)+
                }
            }

            pub fn meta(&self) -> &PrimMeta {
                match self {
                    $(Self::$variant(prim) => &prim.meta,)+
                }
            }

            pub fn meta_mut(&mut self) -> &mut PrimMeta {
                match self {
                    $(Self::$variant(prim) => &mut prim.meta,)+
                }
            }

            /// Generic view of the schema's property map.
            pub fn properties(&self) -> &PropertyMap {
                match self {
                    $(Self::$variant(prim) => &prim.props,)+
                }
            }
        }

        $(
            impl From<$variant> for TypedPrim {
                fn from(prim: $variant) -> Self {
                    Self::$variant(prim)
                }
            }
        )+
    };
}

typed_prim! {
    Model,
    Scope,
    Xform,
    GeomMesh,
    GeomPoints,
    GeomSphere,
    GeomCube,
    GeomCone,
    GeomCylinder,
    GeomCapsule,
    GeomBasisCurves,
    GeomCamera,
    Material,
    Shader,
    SkelRoot,
    Skeleton,
    SkelAnimation,
    BlendShape,
    SphereLight,
    DomeLight,
    DiskLight,
    DistantLight,
    CylinderLight,
}

/// A vertex of the reconstructed scene tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Prim {
    /// Path of the element this prim was reconstructed from.
    pub element_path: sdf::Path,
    pub specifier: sdf::Specifier,
    pub data: TypedPrim,
    pub children: Vec<Prim>,
}

impl Prim {
    pub fn new(element_path: sdf::Path, specifier: sdf::Specifier, data: impl Into<TypedPrim>) -> Self {
        Prim {
            element_path,
            specifier,
            data: data.into(),
            children: Vec::new(),
        }
    }

    /// Prim name, carried inside the concrete value.
    #[inline]
    pub fn name(&self) -> &str {
        self.data.name()
    }

    /// Rename the prim, keeping the element path in sync.
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        self.element_path = self.element_path.parent_prim_path();
        if let Some((parent, _)) = self.element_path.prim_part().rsplit_once('/') {
            let parent = if parent.is_empty() { "/" } else { parent };
            self.element_path = sdf::Path::new(parent, "").append_element(name)?;
        }
        self.data.set_name(name);

        Ok(())
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.data.type_name()
    }

    #[inline]
    pub fn meta(&self) -> &PrimMeta {
        self.data.meta()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn api_name_round_trip() {
        for token in [
            "MaterialBindingAPI",
            "SkelBindingAPI",
            "Preliminary_AnchoringAPI",
            "Preliminary_PhysicsColliderAPI",
            "Preliminary_PhysicsMaterialAPI",
            "Preliminary_PhysicsRigidBodyAPI",
        ] {
            let name = ApiName::from_str(token).unwrap();
            assert_eq!(name.to_string(), token);
        }

        assert!(ApiName::from_str("MadeUpAPI").is_err());
    }

    #[test]
    fn typed_prim_accessors() {
        let mut xform = Xform::default();
        xform.name = "root".to_string();

        let mut typed = TypedPrim::from(xform);
        assert_eq!(typed.type_name(), "Xform");
        assert_eq!(typed.name(), "root");

        typed.set_name("renamed");
        assert_eq!(typed.name(), "renamed");
    }

    #[test]
    fn prim_rename_keeps_path_in_sync() {
        let path = sdf::path("/World/old");
        let mut prim = Prim::new(path, sdf::Specifier::Def, Scope::default());

        prim.set_name("new").unwrap();
        assert_eq!(prim.name(), "new");
        assert_eq!(prim.element_path.full_path(), "/World/new");
    }

    #[test]
    fn prim_meta_authored() {
        let mut meta = PrimMeta::default();
        assert!(!meta.authored());

        meta.kind = Some(Kind::Component);
        assert!(meta.authored());
    }
}
