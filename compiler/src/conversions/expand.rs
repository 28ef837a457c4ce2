//! Fills in the same-name/same-value fallbacks a protocol author left
//! implicit: an enum conversion need not repeat identically-named
//! variants, a struct conversion need not repeat identically-named fields,
//! and a variant conversion need not repeat identically-typed members.
//! Each fallback still requires *some* match on the other side -- silence
//! is sugar for "same as before", not for "drop this".
//!
//! Runs directly on the lowered [`RootConversion`] list, after
//! [`crate::conversions::lower`] and before
//! [`crate::conversions::resolve`].

use std::collections::HashSet;

use crate::conversions::mir::{
    Conversion, EnumValue, EnumValueMapping, FieldConversion, RootConversion, VariantValue,
    VariantValueMapping,
};
use crate::error::CompileError;
use crate::qname::QName;
use crate::types::lir::{ProtocolTypes, Type};

pub fn expand(
    conversions: Vec<RootConversion>,
    types: &ProtocolTypes,
) -> Result<Vec<RootConversion>, Vec<CompileError>> {
    let mut out = Vec::with_capacity(conversions.len());
    let mut errors = Vec::new();
    for rc in conversions {
        match expand_one(rc, types) {
            Ok(rc) => out.push(rc),
            Err(e) => errors.push(e),
        }
    }
    if errors.is_empty() { Ok(out) } else { Err(errors) }
}

fn expand_one(rc: RootConversion, types: &ProtocolTypes) -> Result<RootConversion, CompileError> {
    match rc {
        RootConversion::Enum { protocol, src, target, mapping } => {
            let mapping = expand_enum(&src, &target, mapping, types)?;
            Ok(RootConversion::Enum { protocol, src, target, mapping })
        }
        RootConversion::Struct { protocol, src, target, mapping } => {
            let mapping = expand_struct(&src, &target, mapping, types)?;
            Ok(RootConversion::Struct { protocol, src, target, mapping })
        }
        RootConversion::Variant { protocol, src, target, mapping } => {
            let mapping = expand_variant(&src, &target, mapping, types)?;
            Ok(RootConversion::Variant { protocol, src, target, mapping })
        }
    }
}

fn expand_enum(
    src: &QName,
    target: &QName,
    mut mapping: Vec<EnumValueMapping>,
    types: &ProtocolTypes,
) -> Result<Vec<EnumValueMapping>, CompileError> {
    let src_enum = crate::conversions::lower::lookup_enum(types, src)?;
    let target_enum = crate::conversions::lower::lookup_enum(types, target)?;
    let already_mapped: HashSet<&str> = mapping.iter().map(|m| m.src.name.as_str()).collect();
    for (name, value) in &src_enum.variants {
        if already_mapped.contains(name.as_str()) {
            continue;
        }
        let Some(target_value) = target_enum.variants.get(name) else {
            return Err(CompileError::UnmappedEnumVariant {
                src: src.clone(),
                target: target.clone(),
                variant: name.clone(),
            });
        };
        mapping.push(EnumValueMapping {
            src: EnumValue { name: name.clone(), value: *value },
            target: Some(EnumValue { name: name.clone(), value: *target_value }),
        });
    }
    Ok(mapping)
}

fn expand_struct(
    src: &QName,
    target: &QName,
    mut mapping: indexmap::IndexMap<String, FieldConversion>,
    types: &ProtocolTypes,
) -> Result<indexmap::IndexMap<String, FieldConversion>, CompileError> {
    let src_struct = crate::conversions::lower::lookup_struct(types, src)?;
    let target_struct = crate::conversions::lower::lookup_struct(types, target)?;
    for (field_name, field) in &target_struct.fields {
        if mapping.contains_key(field_name) {
            continue;
        }
        let Some(src_field) = src_struct.fields.get(field_name) else {
            return Err(CompileError::UnmappedStructField {
                src: src.clone(),
                target: target.clone(),
                field: field_name.clone(),
            });
        };
        mapping.insert(
            field_name.clone(),
            FieldConversion::Transform {
                src_field: field_name.clone(),
                conversion: Conversion::Unresolved {
                    src: src_field.type_.clone(),
                    target: field.type_.clone(),
                },
            },
        );
    }
    Ok(mapping)
}

fn expand_variant(
    src: &QName,
    target: &QName,
    mut mapping: Vec<VariantValueMapping>,
    types: &ProtocolTypes,
) -> Result<Vec<VariantValueMapping>, CompileError> {
    let src_variant = crate::conversions::lower::lookup_variant(types, src)?;
    let target_variant = crate::conversions::lower::lookup_variant(types, target)?;
    let already_mapped: HashSet<&QName> = mapping.iter().map(|m| &m.src.struct_name).collect();
    for (member, src_tag) in &src_variant.tags {
        if already_mapped.contains(member) {
            continue;
        }
        // Same-named member in the target variant first; otherwise
        // whichever target member currently holds the same tag value.
        let target_member = if target_variant.tags.contains_key(member) {
            Some(member.clone())
        } else {
            target_variant.tags.iter().find(|(_, tag)| **tag == *src_tag).map(|(m, _)| m.clone())
        };
        let Some(target_member) = target_member else {
            return Err(CompileError::UnmappedVariantMember {
                src: src.clone(),
                target: target.clone(),
                member: member.clone(),
            });
        };
        let target_tag = target_variant.tags[&target_member];
        let src_struct = crate::conversions::lower::lookup_struct(types, member)?;
        let target_struct = crate::conversions::lower::lookup_struct(types, &target_member)?;
        mapping.push(VariantValueMapping {
            src: VariantValue { struct_name: member.clone(), tag: *src_tag },
            target: Some((
                VariantValue { struct_name: target_member, tag: target_tag },
                Conversion::Unresolved {
                    src: struct_as_type(src_struct),
                    target: struct_as_type(target_struct),
                },
            )),
        });
    }
    Ok(mapping)
}

fn struct_as_type(s: &crate::types::lir::Struct) -> Type {
    Type::Struct(Box::new(s.clone()))
}

#[cfg(test)]
mod tests {
    use protocol_schema::{Endianness, Int, Sign};

    use super::*;
    use crate::size::{Offset, Size};
    use crate::types::lir::{self, Digest, Enum, Field, RootType, Struct, Variant};
    use indexmap::IndexMap;
    use std::collections::HashSet as Set;

    fn u_int(width: u8) -> Int {
        Int { width, sign: Sign::Unsigned, endianness: Endianness::Little }
    }

    fn test_enum(name: &str, variants: &[(&str, i64)]) -> Enum {
        Enum {
            name: QName::from_dotted(name),
            digest: Digest { repr_str: name.to_string(), repr_hash: name.to_string() },
            underlying_type: u_int(4),
            variants: variants.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
            valid_ranges: Vec::new(),
        }
    }

    fn test_struct(name: &str, field_names: &[&str]) -> Struct {
        let mut fields = IndexMap::new();
        for n in field_names {
            fields.insert(
                n.to_string(),
                Field { type_: lir::Type::Int(u_int(4)), offset: Offset::zero(), master_field: None },
            );
        }
        Struct {
            name: QName::from_dotted(name),
            digest: Digest { repr_str: name.to_string(), repr_hash: name.to_string() },
            size: Size::Constant(4 * field_names.len() as u64),
            trivial: true,
            fields,
            tail_offset: Offset::zero(),
        }
    }

    fn test_variant(name: &str, members: &[(&str, i64)]) -> Variant {
        Variant {
            name: QName::from_dotted(name),
            digest: Digest { repr_str: name.to_string(), repr_hash: name.to_string() },
            size: Size::Constant(4),
            tag_type: u_int(4),
            tags: members.iter().map(|(m, t)| (QName::from_dotted(m), *t)).collect(),
        }
    }

    fn types_with(roots: Vec<RootType>) -> ProtocolTypes {
        let mut types = IndexMap::new();
        for r in &roots {
            types.insert(r.name().clone(), r.clone());
        }
        ProtocolTypes { types, own: roots.iter().map(|r| r.name().clone()).collect(), external_protocols: Set::new() }
    }

    #[test]
    fn enum_fills_in_identically_named_unmentioned_variants() {
        let src = test_enum("p1.E", &[("A", 0), ("B", 1)]);
        let target = test_enum("p2.E", &[("A", 0), ("B", 5)]);
        let types = types_with(vec![RootType::Enum(src.clone()), RootType::Enum(target.clone())]);
        let mapping = expand_enum(&src.name, &target.name, Vec::new(), &types).unwrap();
        assert_eq!(mapping.len(), 2);
        let b = mapping.iter().find(|m| m.src.name == "B").unwrap();
        assert_eq!(b.target.as_ref().unwrap().value, 5);
    }

    #[test]
    fn enum_variant_with_no_same_named_target_is_an_error() {
        let src = test_enum("p1.E", &[("A", 0), ("Only", 1)]);
        let target = test_enum("p2.E", &[("A", 0)]);
        let types = types_with(vec![RootType::Enum(src.clone()), RootType::Enum(target.clone())]);
        let err = expand_enum(&src.name, &target.name, Vec::new(), &types).unwrap_err();
        assert!(matches!(err, CompileError::UnmappedEnumVariant { variant, .. } if variant == "Only"));
    }

    #[test]
    fn struct_fills_in_identically_named_unmentioned_fields_as_transforms() {
        let src = test_struct("p1.S", &["x", "y"]);
        let target = test_struct("p2.S", &["x", "y"]);
        let types = types_with(vec![RootType::Struct(src.clone()), RootType::Struct(target.clone())]);
        let mapping = expand_struct(&src.name, &target.name, IndexMap::new(), &types).unwrap();
        assert_eq!(mapping.len(), 2);
        assert!(matches!(
            mapping.get("y"),
            Some(FieldConversion::Transform { src_field, .. }) if src_field == "y"
        ));
    }

    #[test]
    fn struct_field_with_no_same_named_source_is_an_error() {
        let src = test_struct("p1.S", &["x"]);
        let target = test_struct("p2.S", &["x", "new"]);
        let types = types_with(vec![RootType::Struct(src.clone()), RootType::Struct(target.clone())]);
        let err = expand_struct(&src.name, &target.name, IndexMap::new(), &types).unwrap_err();
        assert!(matches!(err, CompileError::UnmappedStructField { field, .. } if field == "new"));
    }

    #[test]
    fn variant_falls_back_to_matching_tag_value_when_no_same_named_member_exists() {
        let src_member = test_struct("p1.A", &["x"]);
        let target_member = test_struct("p2.Renamed", &["x"]);
        let src = test_variant("p1.V", &[("p1.A", 0)]);
        let target = test_variant("p2.V", &[("p2.Renamed", 0)]);
        let types = types_with(vec![
            RootType::Struct(src_member),
            RootType::Struct(target_member),
            RootType::Variant(src.clone()),
            RootType::Variant(target.clone()),
        ]);
        let mapping = expand_variant(&src.name, &target.name, Vec::new(), &types).unwrap();
        assert_eq!(mapping.len(), 1);
        let (target_value, _) = mapping[0].target.as_ref().unwrap();
        assert_eq!(target_value.struct_name, QName::from_dotted("p2.Renamed"));
    }

    #[test]
    fn variant_member_with_no_name_or_tag_match_is_an_error() {
        let src_member = test_struct("p1.A", &["x"]);
        let target_member = test_struct("p2.B", &["x"]);
        let src = test_variant("p1.V", &[("p1.A", 0)]);
        let target = test_variant("p2.V", &[("p2.B", 9)]);
        let types = types_with(vec![
            RootType::Struct(src_member),
            RootType::Struct(target_member),
            RootType::Variant(src.clone()),
            RootType::Variant(target.clone()),
        ]);
        let err = expand_variant(&src.name, &target.name, Vec::new(), &types).unwrap_err();
        assert!(matches!(err, CompileError::UnmappedVariantMember { .. }));
    }
}
