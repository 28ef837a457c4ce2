//! Canonical textual rendering of a root type's shape (`repr_str`) and the
//! hash of that rendering (`repr_hash`). The rendering includes the type's
//! own declared name, so renaming a type (e.g. via namespace prefixing)
//! does change its digest; what it does *not* depend on is field
//! declaration order of anything but the type itself, or which protocol a
//! referenced type happens to live in. The digest is what a hash variant's
//! tag values are derived from.
//!
//! Rendered over [`mir`], not [`crate::types::lir`]: the grammar is
//! deliberately pre-seq-reduce (only `Seq` ever appears, never
//! `Array`/`Vector`/`List`) and pre-hash-expand (a `HashVariant` cannot be
//! rendered at all -- it must already have been turned into a
//! `FixedVariant` by the time anything asks for its digest).

use indexmap::IndexMap;
use sha2::{Digest as _, Sha256};

use crate::error::InternalError;
use crate::qname::QName;
use crate::types::mir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub repr_str: String,
    pub repr_hash: String,
}

pub fn digest_of(
    name: &QName,
    types: &IndexMap<QName, mir::RootType>,
) -> Result<Digest, InternalError> {
    digest_of_root(lookup(name, types)?, types)
}

/// Same as [`digest_of`], but for a root type value that may not (yet) be
/// present in `types` under its own name -- used by hash-expand to digest
/// the `FixedVariant` it has just synthesized from a `HashVariant`, before
/// that replacement is written back into the type map.
pub fn digest_of_root(
    root: &mir::RootType,
    types: &IndexMap<QName, mir::RootType>,
) -> Result<Digest, InternalError> {
    let repr_str = repr_root_value(root, types)?;
    let mut hasher = Sha256::new();
    hasher.update(repr_str.as_bytes());
    let repr_hash = format!("{:x}", hasher.finalize());
    Ok(Digest { repr_str, repr_hash })
}

fn lookup<'a>(
    name: &QName,
    types: &'a IndexMap<QName, mir::RootType>,
) -> Result<&'a mir::RootType, InternalError> {
    types.get(name).ok_or_else(|| InternalError::new(format!("unknown type in digest: {name}")))
}

fn repr_root(name: &QName, types: &IndexMap<QName, mir::RootType>) -> Result<String, InternalError> {
    repr_root_value(lookup(name, types)?, types)
}

fn repr_root_value(root: &mir::RootType, types: &IndexMap<QName, mir::RootType>) -> Result<String, InternalError> {
    match root {
        mir::RootType::Struct(s) => repr_struct(s, types),
        mir::RootType::Enum(e) => Ok(repr_enum(e)),
        mir::RootType::Variant(mir::Variant::Fixed(v)) => repr_fixed_variant(v, types),
        mir::RootType::Variant(mir::Variant::Hash(_)) => {
            Err(InternalError::new("hash variant must be expanded before a digest can be computed"))
        }
    }
}

fn repr_struct(s: &mir::Struct, types: &IndexMap<QName, mir::RootType>) -> Result<String, InternalError> {
    let mut fields = Vec::with_capacity(s.fields.len());
    for (name, ftype) in &s.fields {
        fields.push(format!("{name}={}", repr_type(ftype, types)?));
    }
    Ok(format!("Struct(name={},fields={{{}}})", s.name, fields.join(",")))
}

fn repr_fixed_variant(
    v: &mir::FixedVariant,
    types: &IndexMap<QName, mir::RootType>,
) -> Result<String, InternalError> {
    // Sort by tag (then by member name for ties) so declaration order of
    // the tag map never affects the digest.
    let mut pairs: Vec<(i64, &mir::StructRef)> = v.tags.iter().map(|(sr, tag)| (*tag, sr)).collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.0.cmp(&b.1.0)));
    let mut parts = Vec::with_capacity(pairs.len());
    for (tag, sr) in pairs {
        parts.push(format!("{tag}={}", repr_root(&sr.0, types)?));
    }
    Ok(format!(
        "Variant(name={},tag_type={},variants={{{}}})",
        v.name,
        repr_type(&mir::Type::Int(v.tag_type), types)?,
        parts.join(","),
    ))
}

fn repr_enum(e: &mir::Enum) -> String {
    let mut pairs: Vec<(i64, &str)> = e.variants.iter().map(|(name, value)| (*value, name.as_str())).collect();
    pairs.sort();
    let variants = pairs.iter().map(|(value, name)| format!("{value}={name}")).collect::<Vec<_>>().join(",");
    format!(
        "Enum(name={},underlying={},variants={{{}}})",
        e.name,
        repr_int(&e.underlying_type),
        variants,
    )
}

fn repr_field_ref(fr: &mir::FieldReference) -> String {
    format!("FieldReference(name={})", fr.0)
}

fn repr_int(i: &protocol_schema::Int) -> String {
    format!(
        "Int(width={},sign={},endianness={})",
        i.width,
        sign_name(i.sign),
        endianness_name(i.endianness),
    )
}

fn sign_name(s: protocol_schema::Sign) -> &'static str {
    match s {
        protocol_schema::Sign::Signed => "SIGNED",
        protocol_schema::Sign::Unsigned => "UNSIGNED",
    }
}

fn endianness_name(e: protocol_schema::Endianness) -> &'static str {
    match e {
        protocol_schema::Endianness::Big => "BIG",
        protocol_schema::Endianness::Little => "LITTLE",
    }
}

fn repr_type(t: &mir::Type, types: &IndexMap<QName, mir::RootType>) -> Result<String, InternalError> {
    match t {
        mir::Type::Int(i) => Ok(repr_int(i)),
        mir::Type::Float(f) => {
            Ok(format!("Float(width={},endianness={})", f.width, endianness_name(f.endianness)))
        }
        mir::Type::Seq { inner, length } => {
            let length = match length {
                mir::Length::Fixed(n) => n.to_string(),
                mir::Length::Variable(fr) => repr_field_ref(fr),
            };
            Ok(format!("Seq(inner={},length={length})", repr_type(inner, types)?))
        }
        mir::Type::UnboundSeq { .. } => {
            Err(InternalError::new("unbound sequence must be expanded before a digest can be computed"))
        }
        mir::Type::Array { .. } | mir::Type::Vector { .. } | mir::Type::List { .. } => Err(
            InternalError::new("a digest must be computed before seq-reduce rewrites Seq into Array/Vector/List"),
        ),
        mir::Type::DetachedVariant { variant, tag } => {
            let variant_repr = repr_root(&variant.0, types)?;
            Ok(format!("DetachedVariant(variant={variant_repr},tag={})", repr_field_ref(tag)))
        }
        mir::Type::Virtual(inner) => Ok(format!("Virtual(inner={})", repr_type(inner, types)?)),
        mir::Type::StructRef(r) => repr_root(&r.0, types),
        mir::Type::EnumRef(r) => repr_root(&r.0, types),
        mir::Type::VariantRef(r) => repr_root(&r.0, types),
    }
}
