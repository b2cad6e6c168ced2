//! Property classification.
//!
//! A property spec's fieldset collapses into one [Property] variant. The
//! parser walks the fields in order, accumulates state, and classifies at
//! the end: a value or time samples make an attribute, `connectionPaths`
//! a connection, `targetPaths` a relationship, a bare `typeName` an empty
//! attribute. A relationship spec with none of those is the no-target
//! form.

use std::str::FromStr;

use crate::{
    prim::{ApiName, ApiSchemas},
    prop::{AttrMeta, AttrValue, Attribute, Property, RelationTarget},
    sdf::{self, ListEditQual, Value},
};

use super::{reconstruct::StageBuilder, Error, FieldValues, Result};

impl StageBuilder<'_> {
    /// Classify one property fieldset, given the declared spec type.
    pub(super) fn parse_property(&mut self, spec_type: sdf::SpecType, fvs: &FieldValues) -> Result<Property> {
        if fvs.len() > self.config.max_fieldvalue_pairs {
            return Err(Error::OversizedFieldSet(self.config.max_fieldvalue_pairs));
        }

        let mut custom = false;
        let mut variability = sdf::Variability::default();
        let mut type_name: Option<String> = None;
        let mut attr_value: Option<AttrValue> = None;
        let mut connection: Option<RelationTarget> = None;
        let mut relationship: Option<(RelationTarget, ListEditQual)> = None;
        let mut meta = AttrMeta::default();

        for (name, field_value) in fvs {
            log::debug!("property field `{name}` (type = {})", field_value.type_name());

            match name.as_str() {
                "custom" => match field_value {
                    Value::Bool(value) => custom = *value,
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "custom",
                            expected: "bool",
                            got: other.type_name(),
                        })
                    }
                },

                "variability" => match field_value {
                    Value::Variability(value) => variability = *value,
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "variability",
                            expected: "variability",
                            got: other.type_name(),
                        })
                    }
                },

                "typeName" => match field_value {
                    Value::Token(token) => type_name = Some(token.clone()),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "typeName",
                            expected: "token",
                            got: other.type_name(),
                        })
                    }
                },

                // The fallback value. Any type is accepted here; type
                // agreement with `typeName` is reconciled by the up-cast.
                "default" => attr_value = Some(AttrValue::Scalar(field_value.clone())),

                "timeSamples" => match field_value {
                    Value::TimeSamples(samples) => attr_value = Some(AttrValue::TimeSamples(samples.clone())),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "timeSamples",
                            expected: "TimeSamples",
                            got: other.type_name(),
                        })
                    }
                },

                "interpolation" => match field_value {
                    Value::Token(token) => {
                        meta.interpolation =
                            Some(
                                sdf::Interpolation::from_str(token).map_err(|_| Error::InvalidEnumToken {
                                    what: "interpolation",
                                    token: token.clone(),
                                })?,
                            );
                    }
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "interpolation",
                            expected: "token",
                            got: other.type_name(),
                        })
                    }
                },

                "elementSize" => match field_value {
                    Value::Int(value) => {
                        let max = self.config.max_element_size;
                        if *value < 1 || *value as i64 > max as i64 {
                            return Err(Error::OutOfRange {
                                what: "elementSize",
                                min: 1,
                                max: max as i64,
                                value: *value as i64,
                            });
                        }
                        meta.element_size = Some(*value as u32);
                    }
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "elementSize",
                            expected: "int",
                            got: other.type_name(),
                        })
                    }
                },

                "hidden" => match field_value {
                    Value::Bool(value) => meta.hidden = Some(*value),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "hidden",
                            expected: "bool",
                            got: other.type_name(),
                        })
                    }
                },

                // `.connect`
                "connectionPaths" => match field_value {
                    Value::PathListOp(list_op) => connection = Some(Self::connection_targets(list_op)?),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "connectionPaths",
                            expected: "ListOp[path]",
                            got: other.type_name(),
                        })
                    }
                },

                // `rel`
                "targetPaths" => match field_value {
                    Value::PathListOp(list_op) => relationship = Some(self.relationship_targets(list_op)?),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "targetPaths",
                            expected: "ListOp[path]",
                            got: other.type_name(),
                        })
                    }
                },

                // Optionally present to validate target paths; presence
                // only, the paths are not resolved here.
                "targetChildren" | "connectionChildren" => {
                    if !field_value.is_path_vec() {
                        return Err(Error::FieldTypeMismatch {
                            field: if name == "targetChildren" {
                                "targetChildren"
                            } else {
                                "connectionChildren"
                            },
                            expected: "path[]",
                            got: field_value.type_name(),
                        });
                    }
                }

                "customData" => match field_value {
                    Value::Dictionary(dict) => meta.custom_data = Some(dict.clone()),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "customData",
                            expected: "dictionary",
                            got: other.type_name(),
                        })
                    }
                },

                "comment" => match field_value {
                    Value::String(value) => meta.comment = Some(sdf::StringData::new(value.clone())),
                    other => {
                        return Err(Error::FieldTypeMismatch {
                            field: "comment",
                            expected: "string",
                            got: other.type_name(),
                        })
                    }
                },

                other => {
                    self.diag.warn(format!("Unknown property field `{other}`"));
                    meta.extra.insert(other.to_string(), field_value.clone());
                }
            }
        }

        // Classification outcome, in priority order.
        if let Some(mut attr_value) = attr_value {
            // Inlined values may be stored with less accuracy (e.g.
            // `half3`) than the declared type (e.g. `float3`); widen
            // before storing.
            if let (Some(declared), AttrValue::Scalar(scalar)) = (&type_name, &mut attr_value) {
                if declared != scalar.type_name() {
                    if let Some(widened) = sdf::upcast(declared, scalar) {
                        log::debug!("Upcast default value from {} to {declared}", scalar.type_name());
                        *scalar = widened;
                    }
                }
            }

            return Ok(Property::Attr(Attribute {
                type_name,
                value: attr_value,
                variability,
                custom,
                meta,
            }));
        }

        if let Some(target) = connection {
            return Ok(Property::Connection {
                target,
                type_name,
                custom,
                meta,
            });
        }

        if let Some((target, qualifier)) = relationship {
            return Ok(Property::Relationship {
                target,
                qualifier,
                custom,
                meta,
            });
        }

        if let Some(type_name) = type_name {
            return Ok(Property::EmptyAttr {
                type_name,
                custom,
                meta,
            });
        }

        if spec_type == sdf::SpecType::Relationship {
            // `rel` with no target, e.g. `rel target`.
            return Ok(Property::Relationship {
                target: RelationTarget::Empty,
                qualifier: ListEditQual::ResetToExplicit,
                custom,
                meta,
            });
        }

        Err(Error::MissingTypeName)
    }

    /// `connectionPaths` must be explicit with at least one target.
    fn connection_targets(list_op: &sdf::PathListOp) -> Result<RelationTarget> {
        if !list_op.explicit {
            return Err(Error::ListOpUnsupported(
                "`connectionPaths` must be composed of explicit items".to_string(),
            ));
        }

        match list_op.explicit_items.as_slice() {
            [] => Err(Error::ListOpUnsupported(
                "`connectionPaths` has empty explicit items".to_string(),
            )),
            [single] => Ok(RelationTarget::Single(single.clone())),
            many => Ok(RelationTarget::Multi(many.to_vec())),
        }
    }

    /// `targetPaths` takes the first non-empty bucket as the qualifier; a
    /// multi-bucket op warns, an empty one errors.
    fn relationship_targets(&mut self, list_op: &sdf::PathListOp) -> Result<(RelationTarget, ListEditQual)> {
        let Some((qualifier, items)) = self.single_bucket("targetPaths", list_op) else {
            return Err(Error::Internal("`targetPaths` has no items".to_string()));
        };

        let target = match items.as_slice() {
            [] => return Err(Error::Internal("`targetPaths` has no items".to_string())),
            [single] => RelationTarget::Single(single.clone()),
            many => RelationTarget::Multi(many.to_vec()),
        };

        Ok((target, qualifier))
    }

    /// Validate and collapse an `apiSchemas` list-op into a single
    /// qualified list of recognized schema names.
    pub(super) fn to_api_schemas(&mut self, list_op: &sdf::TokenListOp) -> Result<ApiSchemas> {
        let resolve = |tokens: &[String]| -> Result<Vec<(ApiName, String)>> {
            tokens
                .iter()
                .map(|token| {
                    let name = ApiName::from_str(token).map_err(|_| Error::InvalidEnumToken {
                        what: "apiSchemas",
                        token: token.clone(),
                    })?;

                    // Instance names only appear on multi-apply schemas,
                    // which none of the recognized ones are.
                    Ok((name, String::new()))
                })
                .collect()
        };

        if list_op.explicit {
            return Ok(ApiSchemas {
                qualifier: ListEditQual::ResetToExplicit,
                names: resolve(&list_op.explicit_items)?,
            });
        }

        let decoded = list_op.decode();
        match decoded.as_slice() {
            [] => Err(Error::Internal("`apiSchemas` list-op has no items".to_string())),
            [(ListEditQual::Order, _)] => Err(Error::ListOpUnsupported(
                "ordered `apiSchemas` items".to_string(),
            )),
            [(qualifier, items)] => Ok(ApiSchemas {
                qualifier: *qualifier,
                names: resolve(items)?,
            }),
            _ => Err(Error::ListOpMultiQualifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sdf::{PathListOp, TokenListOp},
        usdc::{DecodedTables, Diagnostics, ReaderConfig},
    };
    use glam::Vec3;
    use half::f16;

    fn with_builder<T>(f: impl FnOnce(&mut StageBuilder) -> T) -> (T, Diagnostics) {
        let tables = DecodedTables::default();
        let config = ReaderConfig::default();
        let mut diag = Diagnostics::default();

        let out = {
            let mut builder = StageBuilder::new(&tables, &config, &mut diag);
            f(&mut builder)
        };

        (out, diag)
    }

    fn parse(spec_type: sdf::SpecType, fvs: FieldValues) -> (Result<Property>, Diagnostics) {
        with_builder(|builder| builder.parse_property(spec_type, &fvs))
    }

    fn token(value: &str) -> Value {
        Value::Token(value.to_string())
    }

    #[test]
    fn scalar_attribute() {
        let fvs = vec![
            ("custom".to_string(), Value::Bool(true)),
            ("variability".to_string(), Value::Variability(sdf::Variability::Uniform)),
            ("typeName".to_string(), token("float")),
            ("default".to_string(), Value::Float(2.5)),
        ];

        let (result, diag) = parse(sdf::SpecType::Attribute, fvs);
        let property = result.unwrap();
        assert!(diag.warning_string().is_empty());

        let attr = property.as_attr().unwrap();
        assert_eq!(attr.scalar(), Some(&Value::Float(2.5)));
        assert_eq!(attr.type_name.as_deref(), Some("float"));
        assert_eq!(attr.variability, sdf::Variability::Uniform);
        assert!(attr.custom);
    }

    #[test]
    fn half_default_upcasts_to_declared_float3() {
        let stored = Value::Vec3h([f16::from_f32(1.0), f16::from_f32(2.0), f16::from_f32(3.0)]);
        let fvs = vec![
            ("typeName".to_string(), token("float3")),
            ("default".to_string(), stored),
        ];

        let (result, _) = parse(sdf::SpecType::Attribute, fvs);
        let property = result.unwrap();

        assert_eq!(property.scalar(), Some(&Value::Vec3f(Vec3::new(1.0, 2.0, 3.0))));
    }

    #[test]
    fn matching_type_is_left_alone() {
        let fvs = vec![
            ("typeName".to_string(), token("double")),
            ("default".to_string(), Value::Double(4.0)),
        ];

        let (result, _) = parse(sdf::SpecType::Attribute, fvs);
        assert_eq!(result.unwrap().scalar(), Some(&Value::Double(4.0)));
    }

    #[test]
    fn time_sampled_attribute() {
        let samples = vec![(4.0, Value::Double(40.0)), (5.0, Value::ValueBlock)];
        let fvs = vec![
            ("typeName".to_string(), token("double")),
            ("timeSamples".to_string(), Value::TimeSamples(samples)),
        ];

        let (result, _) = parse(sdf::SpecType::Attribute, fvs);
        let property = result.unwrap();

        let attr = property.as_attr().unwrap();
        let samples = attr.time_samples().unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].0, 4.0);
        assert!(samples[1].1.is_value_block());
    }

    #[test]
    fn connection_single_and_multi() {
        let single = PathListOp::explicit(vec![sdf::path("/Mat.outputs:rgb")]);
        let fvs = vec![
            ("typeName".to_string(), token("float3")),
            ("connectionPaths".to_string(), Value::PathListOp(single)),
        ];

        let (result, _) = parse(sdf::SpecType::Attribute, fvs);
        let Property::Connection { target, type_name, .. } = result.unwrap() else {
            panic!("expected a connection");
        };
        assert!(target.is_single());
        assert_eq!(type_name.as_deref(), Some("float3"));

        let multi = PathListOp::explicit(vec![sdf::path("/A"), sdf::path("/B")]);
        let fvs = vec![("connectionPaths".to_string(), Value::PathListOp(multi))];

        let (result, _) = parse(sdf::SpecType::Attribute, fvs);
        let Property::Connection { target, .. } = result.unwrap() else {
            panic!("expected a connection");
        };
        assert_eq!(target.paths().len(), 2);
    }

    #[test]
    fn connection_must_be_explicit_and_non_empty() {
        let mut op = PathListOp::default();
        op.appended_items = vec![sdf::path("/A")];
        let fvs = vec![("connectionPaths".to_string(), Value::PathListOp(op))];

        let (result, _) = parse(sdf::SpecType::Attribute, fvs);
        assert!(matches!(result, Err(Error::ListOpUnsupported(_))));

        let empty = PathListOp {
            explicit: true,
            ..Default::default()
        };
        let fvs = vec![("connectionPaths".to_string(), Value::PathListOp(empty))];

        let (result, _) = parse(sdf::SpecType::Attribute, fvs);
        assert!(matches!(result, Err(Error::ListOpUnsupported(_))));
    }

    #[test]
    fn relationship_takes_bucket_qualifier() {
        let mut op = PathListOp::default();
        op.prepended_items = vec![sdf::path("/Skel")];
        let fvs = vec![("targetPaths".to_string(), Value::PathListOp(op))];

        let (result, diag) = parse(sdf::SpecType::Relationship, fvs);
        let Property::Relationship { target, qualifier, .. } = result.unwrap() else {
            panic!("expected a relationship");
        };

        assert!(target.is_single());
        assert_eq!(qualifier, ListEditQual::Prepend);
        assert!(diag.warning_string().is_empty());
    }

    #[test]
    fn relationship_multi_bucket_warns_and_uses_first() {
        let mut op = PathListOp::default();
        op.prepended_items = vec![sdf::path("/P")];
        op.appended_items = vec![sdf::path("/A"), sdf::path("/B")];
        let fvs = vec![("targetPaths".to_string(), Value::PathListOp(op))];

        let (result, diag) = parse(sdf::SpecType::Relationship, fvs);
        let Property::Relationship { target, qualifier, .. } = result.unwrap() else {
            panic!("expected a relationship");
        };

        // Buckets decode in the fixed order explicit, add, append, delete,
        // prepend; append is the first non-empty one here.
        assert_eq!(qualifier, ListEditQual::Append);
        assert_eq!(target.paths().len(), 2);
        assert!(diag.warning_string().contains("targetPaths"));
    }

    #[test]
    fn relationship_empty_target_paths_is_an_error() {
        let fvs = vec![("targetPaths".to_string(), Value::PathListOp(PathListOp::default()))];

        let (result, _) = parse(sdf::SpecType::Relationship, fvs);
        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[test]
    fn declared_only_attribute_is_empty() {
        let fvs = vec![("typeName".to_string(), token("float3"))];

        let (result, _) = parse(sdf::SpecType::Attribute, fvs);
        let Property::EmptyAttr { type_name, custom, .. } = result.unwrap() else {
            panic!("expected an empty attribute");
        };

        assert_eq!(type_name, "float3");
        assert!(!custom);
    }

    #[test]
    fn bare_relationship_spec_has_no_target() {
        let (result, _) = parse(sdf::SpecType::Relationship, Vec::new());

        let Property::Relationship { target, qualifier, .. } = result.unwrap() else {
            panic!("expected a relationship");
        };
        assert!(target.is_empty());
        assert_eq!(qualifier, ListEditQual::ResetToExplicit);
    }

    #[test]
    fn bare_attribute_spec_is_missing_type_name() {
        let (result, _) = parse(sdf::SpecType::Attribute, Vec::new());
        assert_eq!(result, Err(Error::MissingTypeName));
    }

    #[test]
    fn element_size_bounds() {
        for bad in [0, -4, 1 << 21] {
            let fvs = vec![
                ("typeName".to_string(), token("float")),
                ("default".to_string(), Value::Float(0.0)),
                ("elementSize".to_string(), Value::Int(bad)),
            ];

            let (result, _) = parse(sdf::SpecType::Attribute, fvs);
            assert!(matches!(result, Err(Error::OutOfRange { what: "elementSize", .. })), "elementSize {bad}");
        }

        let fvs = vec![
            ("typeName".to_string(), token("float")),
            ("default".to_string(), Value::Float(0.0)),
            ("elementSize".to_string(), Value::Int(4)),
        ];

        let (result, _) = parse(sdf::SpecType::Attribute, fvs);
        let property = result.unwrap();
        assert_eq!(property.as_attr().unwrap().meta.element_size, Some(4));
    }

    #[test]
    fn attribute_metas() {
        let fvs = vec![
            ("typeName".to_string(), token("float3[]")),
            ("default".to_string(), Value::Vec3fVec(vec![Vec3::ZERO])),
            ("interpolation".to_string(), token("faceVarying")),
            ("comment".to_string(), Value::String("two\nlines".to_string())),
        ];

        let (result, _) = parse(sdf::SpecType::Attribute, fvs);
        let property = result.unwrap();

        let meta = &property.as_attr().unwrap().meta;
        assert_eq!(meta.interpolation, Some(sdf::Interpolation::FaceVarying));
        assert!(meta.comment.as_ref().unwrap().is_triple_quoted);
    }

    #[test]
    fn invalid_interpolation_token() {
        let fvs = vec![
            ("default".to_string(), Value::Float(0.0)),
            ("interpolation".to_string(), token("sideways")),
        ];

        let (result, _) = parse(sdf::SpecType::Attribute, fvs);
        assert!(matches!(result, Err(Error::InvalidEnumToken { what: "interpolation", .. })));
    }

    #[test]
    fn field_type_mismatch() {
        let fvs = vec![("custom".to_string(), token("yes"))];

        let (result, _) = parse(sdf::SpecType::Attribute, fvs);
        assert_eq!(
            result,
            Err(Error::FieldTypeMismatch {
                field: "custom",
                expected: "bool",
                got: "token",
            })
        );
    }

    #[test]
    fn unknown_field_warns_and_is_kept() {
        let fvs = vec![
            ("typeName".to_string(), token("float")),
            ("default".to_string(), Value::Float(0.0)),
            ("glowIntensity".to_string(), Value::Float(11.0)),
        ];

        let (result, diag) = parse(sdf::SpecType::Attribute, fvs);
        let property = result.unwrap();

        assert!(diag.warning_string().contains("glowIntensity"));
        assert_eq!(
            property.as_attr().unwrap().meta.extra.get("glowIntensity"),
            Some(&Value::Float(11.0))
        );
    }

    #[test]
    fn oversized_fieldset() {
        let tables = DecodedTables::default();
        let config = ReaderConfig {
            max_fieldvalue_pairs: 2,
            ..Default::default()
        };
        let mut diag = Diagnostics::default();

        let fvs = vec![
            ("typeName".to_string(), token("float")),
            ("default".to_string(), Value::Float(0.0)),
            ("custom".to_string(), Value::Bool(false)),
        ];

        let result = StageBuilder::new(&tables, &config, &mut diag).parse_property(sdf::SpecType::Attribute, &fvs);
        assert_eq!(result, Err(Error::OversizedFieldSet(2)));
    }

    #[test]
    fn api_schemas_explicit() {
        let op = TokenListOp::explicit(vec!["MaterialBindingAPI".to_string(), "SkelBindingAPI".to_string()]);

        let (result, _) = with_builder(|builder| builder.to_api_schemas(&op));
        let schemas = result.unwrap();

        assert_eq!(schemas.qualifier, ListEditQual::ResetToExplicit);
        assert_eq!(
            schemas.names,
            vec![
                (ApiName::MaterialBindingAPI, String::new()),
                (ApiName::SkelBindingAPI, String::new())
            ]
        );
    }

    #[test]
    fn api_schemas_single_bucket() {
        let mut op = TokenListOp::default();
        op.prepended_items = vec!["SkelBindingAPI".to_string()];

        let (result, _) = with_builder(|builder| builder.to_api_schemas(&op));
        let schemas = result.unwrap();
        assert_eq!(schemas.qualifier, ListEditQual::Prepend);
    }

    #[test]
    fn api_schemas_rejects_unknown_name() {
        let op = TokenListOp::explicit(vec!["HomemadeAPI".to_string()]);

        let (result, _) = with_builder(|builder| builder.to_api_schemas(&op));
        assert!(matches!(result, Err(Error::InvalidEnumToken { what: "apiSchemas", .. })));
    }

    #[test]
    fn api_schemas_rejects_multiple_buckets() {
        let mut op = TokenListOp::default();
        op.added_items = vec!["MaterialBindingAPI".to_string()];
        op.appended_items = vec!["SkelBindingAPI".to_string()];

        let (result, _) = with_builder(|builder| builder.to_api_schemas(&op));
        assert_eq!(result, Err(Error::ListOpMultiQualifier));
    }

    #[test]
    fn api_schemas_rejects_ordered_bucket() {
        let mut op = TokenListOp::default();
        op.ordered_items = vec!["MaterialBindingAPI".to_string()];

        let (result, _) = with_builder(|builder| builder.to_api_schemas(&op));
        assert!(matches!(result, Err(Error::ListOpUnsupported(_))));
    }
}
