//! Turns name-resolved conversion declarations into conversion MIR,
//! looking up source/target shapes in the already-fused type table so that
//! later passes work with concrete fields and variants instead of names.

use indexmap::IndexMap;

use crate::conversions::mir::{
    Conversion, EnumValue, EnumValueMapping, FieldConversion, RootConversion, VariantValue,
    VariantValueMapping,
};
use crate::error::CompileError;
use crate::qname::QName;
use crate::types::lir::{ProtocolTypes, RootType};

pub fn lower(
    protocol: &QName,
    specs: &[crate::conversions::mir::ResolvedConversionSpec],
    types: &ProtocolTypes,
) -> Result<Vec<RootConversion>, Vec<CompileError>> {
    let mut out = Vec::new();
    let mut errors = Vec::new();
    for spec in specs {
        match lower_one(protocol, spec, types) {
            Ok(Some(rc)) => out.push(rc),
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
    }
    if errors.is_empty() {
        Ok(out)
    } else {
        Err(errors)
    }
}

fn lower_one(
    protocol: &QName,
    spec: &crate::conversions::mir::ResolvedConversionSpec,
    types: &ProtocolTypes,
) -> Result<Option<RootConversion>, CompileError> {
    use crate::conversions::mir::ResolvedConversionSpec as R;
    match spec {
        R::NoConversion { .. } => Ok(None),
        R::Enum(e) => {
            let src = lookup_enum(types, &e.src)?;
            let target = lookup_enum(types, &e.target)?;
            let mut mapping = Vec::new();
            for (src_name, target_name) in &e.mapping {
                let src_value = *src
                    .variants
                    .get(src_name)
                    .ok_or_else(|| CompileError::UnknownFieldReference {
                        field: src_name.clone(),
                        context: e.src.to_string(),
                    })?;
                let target_ev = match target_name {
                    Some(tn) => {
                        let tv = *target.variants.get(tn).ok_or_else(|| {
                            CompileError::UnknownFieldReference {
                                field: tn.clone(),
                                context: e.target.to_string(),
                            }
                        })?;
                        Some(EnumValue { name: tn.clone(), value: tv })
                    }
                    None => None,
                };
                mapping.push(EnumValueMapping {
                    src: EnumValue { name: src_name.clone(), value: src_value },
                    target: target_ev,
                });
            }
            Ok(Some(RootConversion::Enum {
                protocol: protocol.clone(),
                src: e.src.clone(),
                target: e.target.clone(),
                mapping,
            }))
        }
        R::Struct(s) => {
            let src = lookup_struct(types, &s.src)?;
            let target = lookup_struct(types, &s.target)?;
            let mut mapping = IndexMap::new();
            for (field_name, m) in &s.mapping {
                let target_field =
                    target.fields.get(field_name).ok_or_else(|| CompileError::UnknownFieldReference {
                        field: field_name.clone(),
                        context: s.target.to_string(),
                    })?;
                let fc = match m {
                    crate::conversions::mir::ResolvedFieldMapping::IntDefault(v) => {
                        let int_type = match &target_field.type_ {
                            crate::types::lir::Type::Int(i) => *i,
                            _ => {
                                return Err(CompileError::Other(format!(
                                    "field {field_name} is not an integer"
                                )))
                            }
                        };
                        FieldConversion::IntDefault { type_: int_type, value: *v }
                    }
                    crate::conversions::mir::ResolvedFieldMapping::EnumDefault {
                        enum_name,
                        variant_name,
                    } => {
                        let e = lookup_enum(types, enum_name)?;
                        let value = *e.variants.get(variant_name).ok_or_else(|| {
                            CompileError::UnknownFieldReference {
                                field: variant_name.clone(),
                                context: enum_name.to_string(),
                            }
                        })?;
                        FieldConversion::EnumDefault {
                            type_: enum_name.clone(),
                            value: EnumValue { name: variant_name.clone(), value },
                        }
                    }
                    crate::conversions::mir::ResolvedFieldMapping::FromField(src_field) => {
                        let src_field_ty = &src
                            .fields
                            .get(src_field)
                            .ok_or_else(|| CompileError::UnknownFieldReference {
                                field: src_field.clone(),
                                context: s.src.to_string(),
                            })?
                            .type_;
                        FieldConversion::Transform {
                            src_field: src_field.clone(),
                            conversion: Conversion::Unresolved {
                                src: src_field_ty.clone(),
                                target: target_field.type_.clone(),
                            },
                        }
                    }
                };
                mapping.insert(field_name.clone(), fc);
            }
            Ok(Some(RootConversion::Struct {
                protocol: protocol.clone(),
                src: s.src.clone(),
                target: s.target.clone(),
                mapping,
            }))
        }
        R::Variant(v) => {
            let src = lookup_variant(types, &v.src)?;
            let target = lookup_variant(types, &v.target)?;
            let mut mapping = Vec::new();
            for (member, target_member) in &v.mapping {
                let src_tag = *src
                    .tags
                    .get(member)
                    .ok_or_else(|| CompileError::UnknownType(member.clone()))?;
                let target_value = match target_member {
                    Some(tm) => {
                        let target_tag = *target
                            .tags
                            .get(tm)
                            .ok_or_else(|| CompileError::UnknownType(tm.clone()))?;
                        let src_struct = lookup_struct(types, member)?;
                        let target_struct = lookup_struct(types, tm)?;
                        Some((
                            VariantValue { struct_name: tm.clone(), tag: target_tag },
                            Conversion::Unresolved {
                                src: crate::types::lir::Type::Struct(Box::new(src_struct.clone())),
                                target: crate::types::lir::Type::Struct(Box::new(
                                    target_struct.clone(),
                                )),
                            },
                        ))
                    }
                    None => None,
                };
                mapping.push(VariantValueMapping {
                    src: VariantValue { struct_name: member.clone(), tag: src_tag },
                    target: target_value,
                });
            }
            Ok(Some(RootConversion::Variant {
                protocol: protocol.clone(),
                src: v.src.clone(),
                target: v.target.clone(),
                mapping,
            }))
        }
    }
}

pub(crate) fn lookup_enum<'a>(types: &'a ProtocolTypes, name: &QName) -> Result<&'a crate::types::lir::Enum, CompileError> {
    match types.get(name) {
        Some(RootType::Enum(e)) => Ok(e),
        _ => Err(CompileError::UnknownType(name.clone())),
    }
}

pub(crate) fn lookup_struct<'a>(
    types: &'a ProtocolTypes,
    name: &QName,
) -> Result<&'a crate::types::lir::Struct, CompileError> {
    match types.get(name) {
        Some(RootType::Struct(s)) => Ok(s),
        _ => Err(CompileError::UnknownType(name.clone())),
    }
}

pub(crate) fn lookup_variant<'a>(
    types: &'a ProtocolTypes,
    name: &QName,
) -> Result<&'a crate::types::lir::Variant, CompileError> {
    match types.get(name) {
        Some(RootType::Variant(v)) => Ok(v),
        _ => Err(CompileError::UnknownType(name.clone())),
    }
}
