//! The reconstructed scene: stage metadata plus the root prim forest.

use crate::{
    prim::Prim,
    sdf::{Axis, Dictionary, StringData},
};

/// Stage (top-level layer) metadata, parsed from the pseudo-root fieldset.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StageMetas {
    pub up_axis: Option<Axis>,
    pub meters_per_unit: Option<f64>,
    pub time_codes_per_second: Option<f64>,
    pub start_time_code: Option<f64>,
    pub end_time_code: Option<f64>,
    pub default_prim: Option<String>,
    pub custom_layer_data: Option<Dictionary>,
    pub doc: Option<StringData>,
    pub comment: Option<StringData>,
}

/// A reconstructed stage.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Stage {
    pub metas: StageMetas,
    pub root_prims: Vec<Prim>,
}

impl Stage {
    /// Look up a prim by its absolute prim path, e.g. `/World/Mesh`.
    pub fn find_prim_at_path(&self, path: &str) -> Option<&Prim> {
        let mut components = path.strip_prefix('/')?.split('/');

        let first = components.next()?;
        let mut current = self.root_prims.iter().find(|prim| prim.name() == first)?;

        for component in components {
            current = current.children.iter().find(|prim| prim.name() == component)?;
        }

        Some(current)
    }

    /// Depth-first iteration over every prim in the stage.
    pub fn visit_prims<'a>(&'a self, visitor: &mut impl FnMut(&'a Prim)) {
        fn walk<'a>(prim: &'a Prim, visitor: &mut impl FnMut(&'a Prim)) {
            visitor(prim);
            for child in &prim.children {
                walk(child, visitor);
            }
        }

        for prim in &self.root_prims {
            walk(prim, visitor);
        }
    }
}
