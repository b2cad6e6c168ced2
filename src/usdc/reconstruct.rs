//! Stage reconstruction from decoded crate tables.
//!
//! The builder walks the node hierarchy depth first, classifies each
//! spec, and assembles typed prims bottom-up: stage metadata at the
//! pseudo-root, prim fields and property maps everywhere else.

use std::collections::{HashMap, HashSet};

use crate::{
    geom::{
        GeomBasisCurves, GeomCamera, GeomCapsule, GeomCone, GeomCube, GeomCylinder, GeomMesh, GeomPoints, GeomSphere,
        Model, Scope, Xform,
    },
    lux::{CylinderLight, DiskLight, DistantLight, DomeLight, SphereLight},
    prim::{Prim, PrimMeta, ReconstructPrim, ReferenceList, TypedPrim},
    prop::PropertyMap,
    sdf,
    shade::{Material, Shader},
    skel::{BlendShape, SkelAnimation, SkelRoot, Skeleton},
    stage::{Stage, StageMetas},
};

use super::{DecodedTables, Diagnostics, Error, FieldValues, ReaderConfig, Result, Spec};

/// `path index -> spec index`, derived from the spec table.
pub(super) type PathToSpecMap = HashMap<u32, u32>;

/// One-shot builder translating [DecodedTables] into a [Stage].
pub(super) struct StageBuilder<'a> {
    pub(super) tables: &'a DecodedTables,
    pub(super) config: &'a ReaderConfig,
    pub(super) diag: &'a mut Diagnostics,

    /// Node indices established as prims (the pseudo-root included), so
    /// their property children are not re-processed as siblings.
    prim_table: HashSet<usize>,
}

impl<'a> StageBuilder<'a> {
    pub(super) fn new(tables: &'a DecodedTables, config: &'a ReaderConfig, diag: &'a mut Diagnostics) -> Self {
        StageBuilder {
            tables,
            config,
            diag,
            prim_table: HashSet::new(),
        }
    }

    /// Reconstruct the prim tree, seeding the recursion at node 0.
    pub(super) fn reconstruct(&mut self, stage: &mut Stage) -> Result<()> {
        if self.tables.nodes.is_empty() {
            self.diag.warn("Empty scene.");
            return Ok(());
        }

        let path_to_spec = self.build_path_to_spec_map()?;

        stage.root_prims.clear();

        self.reconstruct_recursively(None, 0, None, 0, &path_to_spec, stage)
    }

    fn build_path_to_spec_map(&mut self) -> Result<PathToSpecMap> {
        let mut map = PathToSpecMap::with_capacity(self.tables.specs.len());

        for (spec_index, spec) in self.tables.specs.iter().enumerate() {
            if spec.path_index == Spec::INVALID_INDEX {
                continue;
            }

            // A path may be claimed by at most one spec.
            if map.insert(spec.path_index, spec_index as u32).is_some() {
                return Err(Error::DuplicatePathIndex(spec.path_index));
            }
        }

        Ok(map)
    }

    fn reconstruct_recursively(
        &mut self,
        parent: Option<usize>,
        current: usize,
        parent_prim: Option<&mut Prim>,
        depth: u32,
        path_to_spec: &PathToSpecMap,
        stage: &mut Stage,
    ) -> Result<()> {
        if depth > self.config.max_prim_nest_level {
            return Err(Error::DepthExceeded(self.config.max_prim_nest_level));
        }

        let tables = self.tables;
        if current >= tables.nodes.len() {
            return Err(Error::TableBounds {
                what: "node",
                index: current,
                size: tables.nodes.len(),
            });
        }

        let mut prim = self.reconstruct_node(parent, current, path_to_spec, stage)?;

        for &child in &tables.nodes[current].children {
            self.reconstruct_recursively(Some(current), child, prim.as_mut(), depth + 1, path_to_spec, stage)?;
        }

        if parent == Some(0) {
            // Child of the pseudo-root.
            if let Some(prim) = prim {
                stage.root_prims.push(prim);
            }
        } else if let (Some(prim), Some(parent_prim)) = (prim, parent_prim) {
            parent_prim.children.push(prim);
        }

        Ok(())
    }

    /// Process a single node. Returns the reconstructed prim, or `None`
    /// for non-prim specs (stage metadata, properties, skipped
    /// subtrees).
    fn reconstruct_node(
        &mut self,
        parent: Option<usize>,
        current: usize,
        path_to_spec: &PathToSpecMap,
        stage: &mut Stage,
    ) -> Result<Option<Prim>> {
        let tables = self.tables;

        let Some(&spec_index) = path_to_spec.get(&(current as u32)) else {
            // A node without a spec is transparent; keep walking.
            log::debug!("No spec assigned to node {current}");
            return Ok(None);
        };

        let spec = tables
            .specs
            .get(spec_index as usize)
            .ok_or(Error::TableBounds {
                what: "spec",
                index: spec_index as usize,
                size: tables.specs.len(),
            })?;

        if matches!(spec.spec_type, sdf::SpecType::Attribute | sdf::SpecType::Relationship)
            && parent.is_some_and(|parent| self.prim_table.contains(&parent))
        {
            // A property node of a reconstructed prim; already consumed by
            // the property map pass.
            return Ok(None);
        }

        let fvs = tables
            .live_fieldsets
            .get(&spec.fieldset_index)
            .ok_or(Error::MissingFieldSet(spec.fieldset_index))?;

        if fvs.len() > self.config.max_fieldvalue_pairs {
            return Err(Error::OversizedFieldSet(self.config.max_fieldvalue_pairs));
        }

        if current == 0 {
            if tables.element_path(0).is_none() {
                return Err(Error::Internal("Root element path not found".to_string()));
            }

            // The root layer carries stage metadata as PseudoRoot.
            if spec.spec_type != sdf::SpecType::PseudoRoot {
                return Err(Error::Internal(format!(
                    "PseudoRoot spec expected for the root node, got `{}`",
                    spec.spec_type
                )));
            }

            self.parse_stage_metas(fvs, &mut stage.metas)?;
            self.prim_table.insert(current);

            return Ok(None);
        }

        match spec.spec_type {
            sdf::SpecType::Prim => {
                let (type_name, specifier, _properties, meta) = self.parse_prim_fields(fvs)?;

                let element_path = tables
                    .element_path(current as u32)
                    .cloned()
                    .ok_or_else(|| Error::Internal(format!("Element path not found for node {current}")))?;

                let specifier = specifier.ok_or(Error::MissingSpecifier)?;
                match specifier {
                    sdf::Specifier::Def => {}
                    sdf::Specifier::Class => {
                        self.diag
                            .warn(format!("`class` specifier is not supported, skipping subtree at {element_path}"));
                        return Ok(None);
                    }
                    sdf::Specifier::Over => {
                        self.diag
                            .warn(format!("`over` specifier is not supported, skipping subtree at {element_path}"));
                        return Ok(None);
                    }
                }

                let type_name = type_name.unwrap_or_else(|| {
                    self.diag.warn(format!(
                        "Prim at {element_path} has no `typeName`, treating as Model"
                    ));
                    Model::TYPE_NAME.to_string()
                });

                let prim_name = element_path.prim_part().to_string();
                if !sdf::Path::is_valid_identifier(&prim_name) {
                    return Err(Error::InvalidEnumToken {
                        what: "prim name",
                        token: prim_name,
                    });
                }

                let prim =
                    self.reconstruct_prim_by_type(&type_name, &prim_name, element_path, specifier, current, path_to_spec, meta)?;

                self.prim_table.insert(current);

                Ok(prim)
            }

            // Open questions: variant subtrees are acknowledged, not merged.
            sdf::SpecType::VariantSet => {
                self.diag.warn(format!(
                    "variantSet specs are not supported yet (node {current})"
                ));
                Ok(None)
            }
            sdf::SpecType::Variant => {
                self.diag
                    .warn(format!("variant specs are not supported yet (node {current})"));
                Ok(None)
            }

            // Attribute under a non-prim parent, e.g. inside a skipped
            // `class`/`over` subtree.
            sdf::SpecType::Attribute => {
                self.diag.warn(format!(
                    "Attribute spec outside a reconstructed prim is ignored (node {current})"
                ));
                Ok(None)
            }

            other => Err(Error::UnsupportedSpecType(other)),
        }
    }

    /// Resolve a prim type name against the closed schema set and run the
    /// schema's reconstruct. Unknown type names produce no prim.
    #[allow(clippy::too_many_arguments)]
    fn reconstruct_prim_by_type(
        &mut self,
        type_name: &str,
        prim_name: &str,
        element_path: sdf::Path,
        specifier: sdf::Specifier,
        node_index: usize,
        path_to_spec: &PathToSpecMap,
        meta: PrimMeta,
    ) -> Result<Option<Prim>> {
        let references: ReferenceList = meta.references.clone().unwrap_or_default();

        macro_rules! reconstruct {
            ($schema:ty) => {{
                let properties = self.build_property_map(node_index, path_to_spec)?;

                let mut typed = <$schema>::reconstruct(properties, &references).map_err(|err| Error::Schema {
                    type_name: type_name.to_string(),
                    message: format!("{err:#}"),
                })?;

                typed.name = prim_name.to_string();
                typed.meta = meta;

                TypedPrim::from(typed)
            }};
        }

        let data = match type_name {
            Model::TYPE_NAME => reconstruct!(Model),
            Scope::TYPE_NAME => reconstruct!(Scope),
            Xform::TYPE_NAME => reconstruct!(Xform),
            GeomMesh::TYPE_NAME => reconstruct!(GeomMesh),
            GeomPoints::TYPE_NAME => reconstruct!(GeomPoints),
            GeomSphere::TYPE_NAME => reconstruct!(GeomSphere),
            GeomCube::TYPE_NAME => reconstruct!(GeomCube),
            GeomCone::TYPE_NAME => reconstruct!(GeomCone),
            GeomCylinder::TYPE_NAME => reconstruct!(GeomCylinder),
            GeomCapsule::TYPE_NAME => reconstruct!(GeomCapsule),
            GeomBasisCurves::TYPE_NAME => reconstruct!(GeomBasisCurves),
            GeomCamera::TYPE_NAME => reconstruct!(GeomCamera),
            Material::TYPE_NAME => reconstruct!(Material),
            Shader::TYPE_NAME => reconstruct!(Shader),
            SkelRoot::TYPE_NAME => reconstruct!(SkelRoot),
            Skeleton::TYPE_NAME => reconstruct!(Skeleton),
            SkelAnimation::TYPE_NAME => reconstruct!(SkelAnimation),
            BlendShape::TYPE_NAME => reconstruct!(BlendShape),
            SphereLight::TYPE_NAME => reconstruct!(SphereLight),
            DomeLight::TYPE_NAME => reconstruct!(DomeLight),
            DiskLight::TYPE_NAME => reconstruct!(DiskLight),
            DistantLight::TYPE_NAME => reconstruct!(DistantLight),
            CylinderLight::TYPE_NAME => reconstruct!(CylinderLight),

            unknown => {
                self.diag
                    .warn(format!("Unknown or unsupported prim type `{unknown}`, skipping"));
                return Ok(None);
            }
        };

        Ok(Some(Prim::new(element_path, specifier, data)))
    }

    /// Assemble the property map of a prim node from its Attribute and
    /// Relationship spec children. Prim children are handled by the tree
    /// walk; other spec types are skipped here.
    pub(super) fn build_property_map(&mut self, node_index: usize, path_to_spec: &PathToSpecMap) -> Result<PropertyMap> {
        let tables = self.tables;

        let mut properties = PropertyMap::new();

        for &child in &tables.nodes[node_index].children {
            if child >= tables.nodes.len() {
                return Err(Error::TableBounds {
                    what: "node",
                    index: child,
                    size: tables.nodes.len(),
                });
            }

            let Some(&spec_index) = path_to_spec.get(&(child as u32)) else {
                // No spec assigned to this child node.
                continue;
            };

            let spec = tables
                .specs
                .get(spec_index as usize)
                .ok_or(Error::TableBounds {
                    what: "spec",
                    index: spec_index as usize,
                    size: tables.specs.len(),
                })?;

            // Connection specs are folded into the Attribute spec type by
            // the wire format.
            if !matches!(spec.spec_type, sdf::SpecType::Attribute | sdf::SpecType::Relationship) {
                continue;
            }

            let path = tables
                .path(spec.path_index)
                .ok_or_else(|| Error::Internal(format!("Invalid path index {}", spec.path_index)))?;

            let name = path.prop_part().to_string();
            if name.is_empty() {
                return Err(Error::Internal(format!(
                    "Property spec at `{path}` has an empty property part"
                )));
            }

            let fvs = tables
                .live_fieldsets
                .get(&spec.fieldset_index)
                .ok_or(Error::MissingFieldSet(spec.fieldset_index))?;

            let property = self.parse_property(spec.spec_type, fvs)?;

            if properties.contains_key(&name) {
                self.diag
                    .warn(format!("Duplicate property `{name}`, keeping the later one"));
            }
            properties.insert(name, property);
        }

        Ok(properties)
    }

    /// Parse the pseudo-root fieldset into stage metadata.
    pub(super) fn parse_stage_metas(&mut self, fvs: &FieldValues, metas: &mut StageMetas) -> Result<()> {
        use sdf::Value;

        for (name, value) in fvs {
            match name.as_str() {
                "upAxis" => {
                    let Value::Token(token) = value else {
                        return Err(Error::FieldTypeMismatch {
                            field: "upAxis",
                            expected: "token",
                            got: value.type_name(),
                        });
                    };

                    // Case sensitive by contract.
                    metas.up_axis = Some(token.parse::<sdf::Axis>().map_err(|_| Error::InvalidEnumToken {
                        what: "upAxis",
                        token: token.clone(),
                    })?);
                }

                "metersPerUnit" => metas.meters_per_unit = Some(double_field("metersPerUnit", value)?),
                "timeCodesPerSecond" => metas.time_codes_per_second = Some(double_field("timeCodesPerSecond", value)?),
                "startTimeCode" => metas.start_time_code = Some(double_field("startTimeCode", value)?),
                "endTimeCode" => metas.end_time_code = Some(double_field("endTimeCode", value)?),

                "defaultPrim" => {
                    let Value::Token(token) = value else {
                        return Err(Error::FieldTypeMismatch {
                            field: "defaultPrim",
                            expected: "token",
                            got: value.type_name(),
                        });
                    };
                    metas.default_prim = Some(token.clone());
                }

                "customLayerData" => {
                    let Value::Dictionary(dict) = value else {
                        return Err(Error::FieldTypeMismatch {
                            field: "customLayerData",
                            expected: "dictionary",
                            got: value.type_name(),
                        });
                    };
                    metas.custom_layer_data = Some(dict.clone());
                }

                // Advisory list of root prims; only appears in crate files.
                "primChildren" => {
                    if !value.is_token_vec() {
                        return Err(Error::FieldTypeMismatch {
                            field: "primChildren",
                            expected: "token[]",
                            got: value.type_name(),
                        });
                    }
                }

                "documentation" => metas.doc = Some(string_field("documentation", value)?),
                "comment" => metas.comment = Some(string_field("comment", value)?),

                other => self.diag.warn(format!("Unknown stage metadata field `{other}`")),
            }
        }

        Ok(())
    }

    /// Parse a Prim spec fieldset: type name, specifier, authored property
    /// names, and prim metadata.
    pub(super) fn parse_prim_fields(
        &mut self,
        fvs: &FieldValues,
    ) -> Result<(Option<String>, Option<sdf::Specifier>, Vec<String>, PrimMeta)> {
        use sdf::Value;

        let mut type_name = None;
        let mut specifier = None;
        let mut properties = Vec::new();
        let mut meta = PrimMeta::default();

        for (name, value) in fvs {
            match name.as_str() {
                "typeName" => match value {
                    Value::Token(token) => type_name = Some(token.clone()),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "typeName",
                            expected: "token",
                            got: other.type_name(),
                        })
                    }
                },

                "specifier" => match value {
                    Value::Specifier(value) => specifier = Some(*value),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "specifier",
                            expected: "specifier",
                            got: other.type_name(),
                        })
                    }
                },

                "properties" => match value {
                    Value::TokenVec(tokens) => properties = tokens.clone(),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "properties",
                            expected: "token[]",
                            got: other.type_name(),
                        })
                    }
                },

                // Advisory only; the hierarchy is rebuilt from nodes.
                "primChildren" => {
                    if !value.is_token_vec() {
                        return Err(Error::FieldTypeMismatch {
                            field: "primChildren",
                            expected: "token[]",
                            got: value.type_name(),
                        });
                    }
                }

                "active" => match value {
                    Value::Bool(value) => meta.active = Some(*value),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "active",
                            expected: "bool",
                            got: other.type_name(),
                        })
                    }
                },

                "hidden" => match value {
                    Value::Bool(value) => meta.hidden = Some(*value),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "hidden",
                            expected: "bool",
                            got: other.type_name(),
                        })
                    }
                },

                "kind" => match value {
                    Value::Token(token) => {
                        meta.kind = Some(token.parse::<sdf::Kind>().map_err(|_| Error::InvalidEnumToken {
                            what: "kind",
                            token: token.clone(),
                        })?);
                    }
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "kind",
                            expected: "token",
                            got: other.type_name(),
                        })
                    }
                },

                "apiSchemas" => match value {
                    Value::TokenListOp(list_op) => meta.api_schemas = Some(self.to_api_schemas(list_op)?),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "apiSchemas",
                            expected: "ListOp[token]",
                            got: other.type_name(),
                        })
                    }
                },

                "assetInfo" => match value {
                    Value::Dictionary(dict) => meta.asset_info = Some(dict.clone()),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "assetInfo",
                            expected: "dictionary",
                            got: other.type_name(),
                        })
                    }
                },

                "customData" => match value {
                    Value::Dictionary(dict) => meta.custom_data = Some(dict.clone()),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "customData",
                            expected: "dictionary",
                            got: other.type_name(),
                        })
                    }
                },

                "documentation" => meta.doc = Some(string_field("documentation", value)?),
                "comment" => meta.comment = Some(string_field("comment", value)?),

                "references" => match value {
                    Value::ReferenceListOp(list_op) => {
                        meta.references = self.single_bucket("references", list_op);
                    }
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "references",
                            expected: "ListOp[reference]",
                            got: other.type_name(),
                        })
                    }
                },

                "payload" => match value {
                    Value::PayloadListOp(list_op) => {
                        meta.payload = self.single_bucket("payload", list_op);
                    }
                    Value::Payload(payload) => {
                        meta.payload = Some((sdf::ListEditQual::ResetToExplicit, vec![payload.clone()]));
                    }
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "payload",
                            expected: "ListOp[payload]",
                            got: other.type_name(),
                        })
                    }
                },

                "inheritPaths" => match value {
                    Value::PathListOp(list_op) => {
                        meta.inherits = self.single_bucket("inheritPaths", list_op);
                    }
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "inheritPaths",
                            expected: "ListOp[path]",
                            got: other.type_name(),
                        })
                    }
                },

                "specializes" => match value {
                    Value::PathListOp(list_op) => {
                        meta.specializes = self.single_bucket("specializes", list_op);
                    }
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "specializes",
                            expected: "ListOp[path]",
                            got: other.type_name(),
                        })
                    }
                },

                "variantSetNames" => match value {
                    Value::TokenListOp(list_op) | Value::StringListOp(list_op) => {
                        meta.variant_sets = self.single_bucket("variantSetNames", list_op);
                    }
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "variantSetNames",
                            expected: "ListOp[token]",
                            got: other.type_name(),
                        })
                    }
                },

                "variantSelection" => match value {
                    Value::VariantSelectionMap(map) => meta.variants = Some(map.clone()),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "variantSelection",
                            expected: "variants",
                            got: other.type_name(),
                        })
                    }
                },

                "sceneName" => match value {
                    Value::String(value) => meta.scene_name = Some(value.clone()),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "sceneName",
                            expected: "string",
                            got: other.type_name(),
                        })
                    }
                },

                "displayName" => match value {
                    Value::String(value) => meta.display_name = Some(value.clone()),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "displayName",
                            expected: "string",
                            got: other.type_name(),
                        })
                    }
                },

                other => {
                    self.diag.warn(format!("Unknown prim metadata field `{other}`"));
                    meta.extra.insert(other.to_string(), value.clone());
                }
            }
        }

        Ok((type_name, specifier, properties, meta))
    }

    /// Collapse a list-op into its first non-empty bucket, warning when
    /// more than one bucket is authored.
    pub(super) fn single_bucket<T: Clone>(
        &mut self,
        field: &str,
        list_op: &sdf::ListOp<T>,
    ) -> Option<(sdf::ListEditQual, Vec<T>)> {
        let decoded = list_op.decode();

        let (qualifier, items) = decoded.first()?;
        if decoded.len() > 1 {
            self.diag.warn(format!(
                "`{field}` list-op with multiple qualifiers is not supported, using `{qualifier}`"
            ));
        }

        Some((*qualifier, items.to_vec()))
    }
}

pub(super) fn double_field(field: &'static str, value: &sdf::Value) -> Result<f64> {
    // Floats promote to double.
    match value {
        sdf::Value::Double(value) => Ok(*value),
        sdf::Value::Float(value) => Ok(*value as f64),
        other => Err(Error::FieldTypeMismatch {
            field,
            expected: "double or float",
            got: other.type_name(),
        }),
    }
}

pub(super) fn string_field(field: &'static str, value: &sdf::Value) -> Result<sdf::StringData> {
    match value {
        sdf::Value::String(value) => Ok(sdf::StringData::new(value.clone())),
        other => Err(Error::FieldTypeMismatch {
            field,
            expected: "string",
            got: other.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sdf::{PathListOp, TokenListOp, Value},
        usdc::{FieldValuePair, Node},
    };

    fn node(full_path: &str, children: &[usize]) -> Node {
        let path = sdf::path(full_path);

        let element_path = if path.is_root() {
            sdf::Path::abs_root()
        } else if path.is_property_path() {
            sdf::Path::new("", path.prop_part())
        } else {
            sdf::Path::new(path.element_name(), "")
        };

        Node {
            path,
            element_path,
            parent: None,
            children: children.to_vec(),
        }
    }

    fn spec(path_index: u32, fieldset_index: u32, spec_type: sdf::SpecType) -> Spec {
        Spec {
            path_index,
            fieldset_index,
            spec_type,
        }
    }

    fn tables(nodes: Vec<Node>, specs: Vec<Spec>, fieldsets: Vec<(u32, Vec<FieldValuePair>)>) -> DecodedTables {
        DecodedTables {
            nodes,
            specs,
            live_fieldsets: fieldsets.into_iter().collect(),
            ..Default::default()
        }
    }

    fn run(tables: &DecodedTables) -> (Stage, Result<()>, Diagnostics) {
        run_with(tables, ReaderConfig::default())
    }

    fn run_with(tables: &DecodedTables, config: ReaderConfig) -> (Stage, Result<()>, Diagnostics) {
        let mut diag = Diagnostics::default();
        let mut stage = Stage::default();

        let result = StageBuilder::new(tables, &config, &mut diag).reconstruct(&mut stage);

        (stage, result, diag)
    }

    fn token(value: &str) -> Value {
        Value::Token(value.to_string())
    }

    fn def_prim_fields(type_name: &str) -> Vec<FieldValuePair> {
        vec![
            ("specifier".to_string(), Value::Specifier(sdf::Specifier::Def)),
            ("typeName".to_string(), token(type_name)),
        ]
    }

    #[test]
    fn empty_scene_warns_and_succeeds() {
        let tables = DecodedTables::default();

        let (stage, result, diag) = run(&tables);
        assert!(result.is_ok());
        assert!(stage.root_prims.is_empty());
        assert!(diag.warning_string().contains("Empty scene"));
    }

    #[test]
    fn empty_root_parses_stage_metas() {
        let tables = tables(
            vec![node("/", &[])],
            vec![spec(0, 0, sdf::SpecType::PseudoRoot)],
            vec![(
                0,
                vec![
                    ("upAxis".to_string(), token("Y")),
                    ("metersPerUnit".to_string(), Value::Double(0.01)),
                ],
            )],
        );

        let (stage, result, diag) = run(&tables);
        assert!(result.is_ok(), "{result:?}");

        assert_eq!(stage.metas.up_axis, Some(sdf::Axis::Y));
        assert_eq!(stage.metas.meters_per_unit, Some(0.01));
        assert!(stage.root_prims.is_empty());
        assert!(diag.error_string().is_empty());
        assert!(diag.warning_string().is_empty());
    }

    #[test]
    fn stage_metas_reject_bad_up_axis() {
        let tables = tables(
            vec![node("/", &[])],
            vec![spec(0, 0, sdf::SpecType::PseudoRoot)],
            vec![(0, vec![("upAxis".to_string(), token("y"))])],
        );

        let (_, result, _) = run(&tables);
        assert!(matches!(result, Err(Error::InvalidEnumToken { what: "upAxis", .. })));
    }

    #[test]
    fn stage_metas_promote_float_to_double() {
        let tables = tables(
            vec![node("/", &[])],
            vec![spec(0, 0, sdf::SpecType::PseudoRoot)],
            vec![(
                0,
                vec![
                    ("timeCodesPerSecond".to_string(), Value::Float(24.0)),
                    ("startTimeCode".to_string(), Value::Double(1.0)),
                    ("defaultPrim".to_string(), token("World")),
                    ("documentation".to_string(), Value::String("a\nb".to_string())),
                ],
            )],
        );

        let (stage, result, _) = run(&tables);
        assert!(result.is_ok());

        assert_eq!(stage.metas.time_codes_per_second, Some(24.0));
        assert_eq!(stage.metas.start_time_code, Some(1.0));
        assert_eq!(stage.metas.default_prim.as_deref(), Some("World"));
        assert!(stage.metas.doc.as_ref().unwrap().is_triple_quoted);
    }

    #[test]
    fn single_xform_with_property() {
        let tables = tables(
            vec![
                node("/", &[1]),
                node("/World", &[2]),
                node("/World.xformOpOrder", &[]),
            ],
            vec![
                spec(0, 0, sdf::SpecType::PseudoRoot),
                spec(1, 1, sdf::SpecType::Prim),
                spec(2, 2, sdf::SpecType::Attribute),
            ],
            vec![
                (0, Vec::new()),
                (1, def_prim_fields("Xform")),
                (
                    2,
                    vec![
                        ("typeName".to_string(), token("token[]")),
                        (
                            "default".to_string(),
                            Value::TokenVec(vec!["xformOp:translate".to_string()]),
                        ),
                    ],
                ),
            ],
        );

        let (stage, result, diag) = run(&tables);
        assert!(result.is_ok(), "{result:?}");
        assert!(diag.warning_string().is_empty());

        assert_eq!(stage.root_prims.len(), 1);
        let prim = &stage.root_prims[0];
        assert_eq!(prim.type_name(), "Xform");
        assert_eq!(prim.name(), "World");

        let TypedPrim::Xform(xform) = &prim.data else {
            panic!("expected an Xform");
        };
        let order = xform.xform_op_order.as_ref().unwrap();
        assert_eq!(
            order.scalar(),
            Some(&Value::TokenVec(vec!["xformOp:translate".to_string()]))
        );
    }

    #[test]
    fn nested_prims_attach_to_parents() {
        let tables = tables(
            vec![
                node("/", &[1]),
                node("/World", &[2, 3]),
                node("/World/Geom", &[]),
                node("/World/Light", &[]),
            ],
            vec![
                spec(0, 0, sdf::SpecType::PseudoRoot),
                spec(1, 1, sdf::SpecType::Prim),
                spec(2, 2, sdf::SpecType::Prim),
                spec(3, 3, sdf::SpecType::Prim),
            ],
            vec![
                (0, Vec::new()),
                (1, def_prim_fields("Xform")),
                (2, def_prim_fields("Scope")),
                (3, def_prim_fields("SphereLight")),
            ],
        );

        let (stage, result, _) = run(&tables);
        assert!(result.is_ok(), "{result:?}");

        assert_eq!(stage.root_prims.len(), 1);
        let world = &stage.root_prims[0];
        assert_eq!(world.children.len(), 2);
        // Node order is preserved.
        assert_eq!(world.children[0].name(), "Geom");
        assert_eq!(world.children[1].name(), "Light");

        assert!(stage.find_prim_at_path("/World/Light").is_some());
    }

    #[test]
    fn over_specifier_skips_subtree() {
        let tables = tables(
            vec![node("/", &[1]), node("/World", &[])],
            vec![
                spec(0, 0, sdf::SpecType::PseudoRoot),
                spec(1, 1, sdf::SpecType::Prim),
            ],
            vec![
                (0, Vec::new()),
                (
                    1,
                    vec![
                        ("specifier".to_string(), Value::Specifier(sdf::Specifier::Over)),
                        ("typeName".to_string(), token("Xform")),
                    ],
                ),
            ],
        );

        let (stage, result, diag) = run(&tables);
        assert!(result.is_ok());
        assert!(stage.root_prims.is_empty());
        assert!(diag.warning_string().contains("`over` specifier"));
    }

    #[test]
    fn class_specifier_skips_subtree() {
        let tables = tables(
            vec![node("/", &[1]), node("/Proto", &[])],
            vec![
                spec(0, 0, sdf::SpecType::PseudoRoot),
                spec(1, 1, sdf::SpecType::Prim),
            ],
            vec![
                (0, Vec::new()),
                (
                    1,
                    vec![("specifier".to_string(), Value::Specifier(sdf::Specifier::Class))],
                ),
            ],
        );

        let (stage, result, diag) = run(&tables);
        assert!(result.is_ok());
        assert!(stage.root_prims.is_empty());
        assert!(diag.warning_string().contains("`class` specifier"));
    }

    #[test]
    fn missing_specifier_is_fatal() {
        let tables = tables(
            vec![node("/", &[1]), node("/World", &[])],
            vec![
                spec(0, 0, sdf::SpecType::PseudoRoot),
                spec(1, 1, sdf::SpecType::Prim),
            ],
            vec![(0, Vec::new()), (1, vec![("typeName".to_string(), token("Xform"))])],
        );

        let (_, result, _) = run(&tables);
        assert_eq!(result, Err(Error::MissingSpecifier));
    }

    #[test]
    fn missing_type_name_defaults_to_model() {
        let tables = tables(
            vec![node("/", &[1]), node("/Thing", &[])],
            vec![
                spec(0, 0, sdf::SpecType::PseudoRoot),
                spec(1, 1, sdf::SpecType::Prim),
            ],
            vec![
                (0, Vec::new()),
                (
                    1,
                    vec![("specifier".to_string(), Value::Specifier(sdf::Specifier::Def))],
                ),
            ],
        );

        let (stage, result, diag) = run(&tables);
        assert!(result.is_ok());
        assert_eq!(stage.root_prims[0].type_name(), "Model");
        assert!(diag.warning_string().contains("treating as Model"));
    }

    #[test]
    fn unknown_prim_type_warns_and_produces_nothing() {
        let tables = tables(
            vec![node("/", &[1]), node("/Gizmo", &[])],
            vec![
                spec(0, 0, sdf::SpecType::PseudoRoot),
                spec(1, 1, sdf::SpecType::Prim),
            ],
            vec![(0, Vec::new()), (1, def_prim_fields("Widget"))],
        );

        let (stage, result, diag) = run(&tables);
        assert!(result.is_ok());
        assert!(stage.root_prims.is_empty());
        assert!(diag.warning_string().contains("Widget"));
    }

    #[test]
    fn duplicate_path_index_is_fatal() {
        let tables = tables(
            vec![node("/", &[])],
            vec![
                spec(0, 0, sdf::SpecType::PseudoRoot),
                spec(5, 0, sdf::SpecType::Prim),
                spec(5, 0, sdf::SpecType::Prim),
            ],
            vec![(0, Vec::new())],
        );

        let (_, result, _) = run(&tables);
        assert_eq!(result, Err(Error::DuplicatePathIndex(5)));
    }

    #[test]
    fn sentinel_path_index_is_skipped() {
        let tables = tables(
            vec![node("/", &[])],
            vec![
                spec(0, 0, sdf::SpecType::PseudoRoot),
                spec(Spec::INVALID_INDEX, 0, sdf::SpecType::Prim),
                spec(Spec::INVALID_INDEX, 0, sdf::SpecType::Prim),
            ],
            vec![(0, Vec::new())],
        );

        let (_, result, _) = run(&tables);
        assert!(result.is_ok());
    }

    #[test]
    fn depth_guard_trips() {
        let tables = tables(
            vec![
                node("/", &[1]),
                node("/A", &[2]),
                node("/A/B", &[3]),
                node("/A/B/C", &[]),
            ],
            vec![
                spec(0, 0, sdf::SpecType::PseudoRoot),
                spec(1, 1, sdf::SpecType::Prim),
                spec(2, 1, sdf::SpecType::Prim),
                spec(3, 1, sdf::SpecType::Prim),
            ],
            vec![(0, Vec::new()), (1, def_prim_fields("Scope"))],
        );

        let config = ReaderConfig {
            max_prim_nest_level: 2,
            ..Default::default()
        };
        let (_, result, _) = run_with(&tables, config);
        assert_eq!(result, Err(Error::DepthExceeded(2)));

        // One level deeper is fine with the default limit.
        let (_, result, _) = run(&tables);
        assert!(result.is_ok());
    }

    #[test]
    fn missing_fieldset_is_fatal() {
        let tables = tables(
            vec![node("/", &[])],
            vec![spec(0, 99, sdf::SpecType::PseudoRoot)],
            vec![(0, Vec::new())],
        );

        let (_, result, _) = run(&tables);
        assert_eq!(result, Err(Error::MissingFieldSet(99)));
    }

    #[test]
    fn root_spec_must_be_pseudo_root() {
        let tables = tables(
            vec![node("/", &[])],
            vec![spec(0, 0, sdf::SpecType::Prim)],
            vec![(0, Vec::new())],
        );

        let (_, result, _) = run(&tables);
        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[test]
    fn node_without_spec_is_transparent() {
        // /Group carries no spec; its prim child must still be reached,
        // but with no parent prim it dangles and is dropped.
        let tables = tables(
            vec![node("/", &[1]), node("/Group", &[2]), node("/Group/Mesh", &[])],
            vec![
                spec(0, 0, sdf::SpecType::PseudoRoot),
                spec(2, 1, sdf::SpecType::Prim),
            ],
            vec![(0, Vec::new()), (1, def_prim_fields("Mesh"))],
        );

        let (stage, result, _) = run(&tables);
        assert!(result.is_ok());
        assert!(stage.root_prims.is_empty());
    }

    #[test]
    fn relationship_multi_bucket_round_trip() {
        // targetPaths with both prepended and appended buckets: success
        // with a warning, first decoded bucket wins.
        let mut target_paths = PathListOp::default();
        target_paths.prepended_items = vec![sdf::path("/Materials/A")];
        target_paths.appended_items = vec![sdf::path("/Materials/B")];

        let tables = tables(
            vec![
                node("/", &[1]),
                node("/Mesh", &[2]),
                node("/Mesh.material:binding", &[]),
            ],
            vec![
                spec(0, 0, sdf::SpecType::PseudoRoot),
                spec(1, 1, sdf::SpecType::Prim),
                spec(2, 2, sdf::SpecType::Relationship),
            ],
            vec![
                (0, Vec::new()),
                (1, def_prim_fields("Mesh")),
                (2, vec![("targetPaths".to_string(), Value::PathListOp(target_paths))]),
            ],
        );

        let (stage, result, diag) = run(&tables);
        assert!(result.is_ok(), "{result:?}");
        assert!(diag.warning_string().contains("targetPaths"));

        let TypedPrim::GeomMesh(mesh) = &stage.root_prims[0].data else {
            panic!("expected a Mesh");
        };

        let binding = mesh.material_binding.as_ref().unwrap();
        assert_eq!(binding.paths(), [sdf::path("/Materials/B")]);
    }

    #[test]
    fn prim_meta_is_attached() {
        let mut api_schemas = TokenListOp::default();
        api_schemas.prepended_items = vec!["MaterialBindingAPI".to_string()];

        let tables = tables(
            vec![node("/", &[1]), node("/Mesh", &[])],
            vec![
                spec(0, 0, sdf::SpecType::PseudoRoot),
                spec(1, 1, sdf::SpecType::Prim),
            ],
            vec![
                (0, Vec::new()),
                (
                    1,
                    vec![
                        ("specifier".to_string(), Value::Specifier(sdf::Specifier::Def)),
                        ("typeName".to_string(), token("Mesh")),
                        ("active".to_string(), Value::Bool(false)),
                        ("kind".to_string(), token("component")),
                        ("apiSchemas".to_string(), Value::TokenListOp(api_schemas)),
                        ("documentation".to_string(), Value::String("docs".to_string())),
                    ],
                ),
            ],
        );

        let (stage, result, _) = run(&tables);
        assert!(result.is_ok(), "{result:?}");

        let meta = stage.root_prims[0].meta();
        assert_eq!(meta.active, Some(false));
        assert_eq!(meta.kind, Some(sdf::Kind::Component));
        assert_eq!(meta.doc.as_ref().unwrap().value, "docs");

        let schemas = meta.api_schemas.as_ref().unwrap();
        assert_eq!(schemas.qualifier, sdf::ListEditQual::Prepend);
        assert_eq!(schemas.names.len(), 1);
    }

    #[test]
    fn invalid_kind_token_is_fatal() {
        let tables = tables(
            vec![node("/", &[1]), node("/Mesh", &[])],
            vec![
                spec(0, 0, sdf::SpecType::PseudoRoot),
                spec(1, 1, sdf::SpecType::Prim),
            ],
            vec![
                (0, Vec::new()),
                (
                    1,
                    vec![
                        ("specifier".to_string(), Value::Specifier(sdf::Specifier::Def)),
                        ("kind".to_string(), token("gadget")),
                    ],
                ),
            ],
        );

        let (_, result, _) = run(&tables);
        assert!(matches!(result, Err(Error::InvalidEnumToken { what: "kind", .. })));
    }

    #[test]
    fn variant_specs_warn_only() {
        let tables = tables(
            vec![node("/", &[1]), node("/Asset", &[])],
            vec![
                spec(0, 0, sdf::SpecType::PseudoRoot),
                spec(1, 1, sdf::SpecType::VariantSet),
            ],
            vec![(0, Vec::new()), (1, Vec::new())],
        );

        let (_, result, diag) = run(&tables);
        assert!(result.is_ok());
        assert!(diag.warning_string().contains("variantSet"));
    }

    #[test]
    fn material_network_connection() {
        let connection = PathListOp::explicit(vec![sdf::path("/Mat/PBR.outputs:surface")]);

        let tables = tables(
            vec![
                node("/", &[1]),
                node("/Mat", &[2, 3]),
                node("/Mat.outputs:surface", &[]),
                node("/Mat/PBR", &[4]),
                node("/Mat/PBR.info:id", &[]),
            ],
            vec![
                spec(0, 0, sdf::SpecType::PseudoRoot),
                spec(1, 1, sdf::SpecType::Prim),
                spec(2, 2, sdf::SpecType::Attribute),
                spec(3, 3, sdf::SpecType::Prim),
                spec(4, 4, sdf::SpecType::Attribute),
            ],
            vec![
                (0, Vec::new()),
                (1, def_prim_fields("Material")),
                (
                    2,
                    vec![
                        ("typeName".to_string(), token("token")),
                        ("connectionPaths".to_string(), Value::PathListOp(connection)),
                    ],
                ),
                (3, def_prim_fields("Shader")),
                (
                    4,
                    vec![
                        ("typeName".to_string(), token("token")),
                        ("default".to_string(), token("UsdPreviewSurface")),
                        ("variability".to_string(), Value::Variability(sdf::Variability::Uniform)),
                    ],
                ),
            ],
        );

        let (stage, result, diag) = run(&tables);
        assert!(result.is_ok(), "{result:?}");
        assert!(diag.warning_string().is_empty());

        let TypedPrim::Material(material) = &stage.root_prims[0].data else {
            panic!("expected a Material");
        };
        let surface = material.surface.as_ref().unwrap();
        assert_eq!(surface.paths(), [sdf::path("/Mat/PBR.outputs:surface")]);

        let shader = &stage.root_prims[0].children[0];
        let TypedPrim::Shader(shader) = &shader.data else {
            panic!("expected a Shader");
        };
        assert_eq!(shader.info_id.as_deref(), Some("UsdPreviewSurface"));
    }
}
