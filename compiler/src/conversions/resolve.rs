//! Replaces every [`Conversion::Unresolved`] left after
//! [`crate::conversions::expand`] with either an [`Conversion::Identity`]
//! (the two shapes are structurally identical) or a [`Conversion::Ref`]
//! pointing at another root conversion in this same batch.
//!
//! A `DetachedVariant` on both sides is not itself comparable against the
//! graph (it isn't a root type) -- its *inner* variant is, so resolution
//! recurses into that instead of failing outright.

use std::collections::HashSet;

use crate::conversions::mir::{Conversion, FieldConversion, RootConversion, VariantValueMapping};
use crate::error::CompileError;
use crate::qname::QName;
use crate::types::lir::Type;

pub fn resolve(conversions: Vec<RootConversion>) -> Result<Vec<RootConversion>, Vec<CompileError>> {
    let available: HashSet<(QName, QName)> =
        conversions.iter().map(|rc| (rc.src().clone(), rc.target().clone())).collect();

    let mut out = Vec::with_capacity(conversions.len());
    let mut errors = Vec::new();
    for rc in conversions {
        match resolve_one(rc, &available) {
            Ok(rc) => out.push(rc),
            Err(e) => errors.push(e),
        }
    }
    if errors.is_empty() { Ok(out) } else { Err(errors) }
}

fn resolve_one(rc: RootConversion, available: &HashSet<(QName, QName)>) -> Result<RootConversion, CompileError> {
    match rc {
        RootConversion::Enum { .. } => Ok(rc),
        RootConversion::Struct { protocol, src, target, mapping } => {
            let mut resolved = indexmap::IndexMap::new();
            for (field_name, fc) in mapping {
                resolved.insert(field_name, resolve_field_conversion(fc, available)?);
            }
            Ok(RootConversion::Struct { protocol, src, target, mapping: resolved })
        }
        RootConversion::Variant { protocol, src, target, mapping } => {
            let mut resolved = Vec::with_capacity(mapping.len());
            for m in mapping {
                resolved.push(resolve_variant_value_mapping(m, available)?);
            }
            Ok(RootConversion::Variant { protocol, src, target, mapping: resolved })
        }
    }
}

fn resolve_field_conversion(
    fc: FieldConversion,
    available: &HashSet<(QName, QName)>,
) -> Result<FieldConversion, CompileError> {
    Ok(match fc {
        FieldConversion::IntDefault { .. } | FieldConversion::EnumDefault { .. } => fc,
        FieldConversion::Transform { src_field, conversion } => {
            FieldConversion::Transform { src_field, conversion: resolve_conversion(conversion, available)? }
        }
    })
}

fn resolve_variant_value_mapping(
    m: VariantValueMapping,
    available: &HashSet<(QName, QName)>,
) -> Result<VariantValueMapping, CompileError> {
    let target = match m.target {
        None => None,
        Some((value, conversion)) => Some((value, resolve_conversion(conversion, available)?)),
    };
    Ok(VariantValueMapping { src: m.src, target })
}

fn resolve_conversion(
    conversion: Conversion,
    available: &HashSet<(QName, QName)>,
) -> Result<Conversion, CompileError> {
    match conversion {
        Conversion::Identity | Conversion::Ref { .. } => Ok(conversion),
        Conversion::Unresolved { src, target } => resolve_type_pair(&src, &target, available),
    }
}

fn resolve_type_pair(
    src: &Type,
    target: &Type,
    available: &HashSet<(QName, QName)>,
) -> Result<Conversion, CompileError> {
    if src == target {
        return Ok(Conversion::Identity);
    }
    if let (Some(sn), Some(tn)) = (root_name(src), root_name(target)) {
        if same_kind(src, target) {
            return if available.contains(&(sn.clone(), tn.clone())) {
                Ok(Conversion::Ref { src: sn.clone(), target: tn.clone() })
            } else {
                Err(CompileError::NoConversionFound { src: sn.clone(), target: tn.clone() })
            };
        }
    }
    if let (Type::DetachedVariant { variant: va, .. }, Type::DetachedVariant { variant: vb, .. }) =
        (src, target)
    {
        return resolve_type_pair(&Type::Variant(va.clone()), &Type::Variant(vb.clone()), available);
    }
    Err(CompileError::UnresolvedConversion { src: describe(src), target: describe(target) })
}

fn root_name(t: &Type) -> Option<&QName> {
    match t {
        Type::Struct(s) => Some(&s.name),
        Type::Variant(v) => Some(&v.name),
        Type::Enum(e) => Some(&e.name),
        _ => None,
    }
}

fn same_kind(a: &Type, b: &Type) -> bool {
    matches!(
        (a, b),
        (Type::Struct(_), Type::Struct(_))
            | (Type::Variant(_), Type::Variant(_))
            | (Type::Enum(_), Type::Enum(_))
    )
}

fn describe(t: &Type) -> String {
    match t {
        Type::Int(_) => "Int".to_string(),
        Type::Float(_) => "Float".to_string(),
        Type::Array { .. } => "Array".to_string(),
        Type::Vector { .. } => "Vector".to_string(),
        Type::List { .. } => "List".to_string(),
        Type::DetachedVariant { .. } => "DetachedVariant".to_string(),
        Type::Virtual { .. } => "Virtual".to_string(),
        Type::Struct(s) => format!("Struct({})", s.name),
        Type::Variant(v) => format!("Variant({})", v.name),
        Type::Enum(e) => format!("Enum({})", e.name),
    }
}
