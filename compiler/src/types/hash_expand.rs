//! Computes each root type's digest and, along the way, eliminates
//! `HashVariant` by turning it into an equivalent `FixedVariant` whose tags
//! are the truncated digest of each member.
//!
//! Must run after [`crate::types::expand`] (so there is no `VariantRef`
//! left to digest -- every variant reference in a struct is by then a
//! `DetachedVariant`) and before [`crate::types::size`] (whose output is
//! part of what later passes rely on the digest, not the other way
//! around; the digest itself only ever depends on shape).

use indexmap::IndexMap;

use crate::digest::{digest_of, digest_of_root, Digest};
use crate::error::CompileError;
use crate::qname::QName;
use crate::types::mir;

pub fn run(
    types: &mut IndexMap<QName, mir::RootType>,
    type_order: &[QName],
) -> Result<IndexMap<QName, Digest>, Vec<CompileError>> {
    let mut digests = IndexMap::new();
    for name in type_order {
        match &types[name] {
            mir::RootType::Struct(_) | mir::RootType::Enum(_) | mir::RootType::Variant(mir::Variant::Fixed(_)) => {
                let d = digest_of(name, types).map_err(|e| vec![CompileError::Other(e.0)])?;
                digests.insert(name.clone(), d);
            }
            mir::RootType::Variant(mir::Variant::Hash(hv)) => {
                let fixed = expand_hash_variant(hv, types)?;
                let replacement = mir::RootType::Variant(mir::Variant::Fixed(fixed));
                let d = digest_of_root(&replacement, types).map_err(|e| vec![CompileError::Other(e.0)])?;
                digests.insert(name.clone(), d);
                types.insert(name.clone(), replacement);
            }
        }
    }
    Ok(digests)
}

fn expand_hash_variant(
    hv: &mir::HashVariant,
    types: &IndexMap<QName, mir::RootType>,
) -> Result<mir::FixedVariant, Vec<CompileError>> {
    // The width is in bytes; each byte is two hex digits.
    let tag_hex_digits = hv.tag_type.width as usize * 2;
    let mut tags: IndexMap<mir::StructRef, i64> = IndexMap::new();
    let mut seen: IndexMap<i64, mir::StructRef> = IndexMap::new();
    for member in hv.hash_types.iter().cloned() {
        let digest = digest_of(&member.0, types).map_err(|e| vec![CompileError::Other(e.0)])?;
        let truncated = &digest.repr_hash[..tag_hex_digits];
        // Parsed as u64 and reinterpreted as i64 bit-for-bit: a tag_type
        // width of 8 yields a full 64-bit truncated digest, which overflows
        // `i64::MAX` about half the time if parsed directly as i64.
        let short = u64::from_str_radix(truncated, 16)
            .map_err(|e| vec![CompileError::Other(format!("could not parse truncated digest {truncated}: {e}"))])?
            as i64;
        if let Some(existing) = seen.get(&short) {
            return Err(vec![CompileError::HashCollision {
                short_hash: short as u64,
                a: existing.0.clone(),
                b: member.0.clone(),
            }]);
        }
        seen.insert(short, member.clone());
        tags.insert(member, short);
    }
    Ok(mir::FixedVariant { name: hv.name.clone(), tag_type: hv.tag_type, tags })
}

#[cfg(test)]
mod tests {
    use indexmap::IndexSet;
    use protocol_schema::{Endianness, Int, Sign};

    use super::*;

    fn u_int(width: u8) -> Int {
        Int { width, sign: Sign::Unsigned, endianness: Endianness::Little }
    }

    fn empty_struct(name: &str) -> (QName, mir::RootType) {
        let qn = QName::from_dotted(name);
        (qn.clone(), mir::RootType::Struct(mir::Struct { name: qn, fields: IndexMap::new() }))
    }

    #[test]
    fn hash_variant_becomes_fixed_variant_with_digest_derived_tags() {
        let (a_name, a) = empty_struct("p.A");
        let variant_name = QName::from_dotted("p.V");
        let mut hash_types = IndexSet::new();
        hash_types.insert(mir::StructRef(a_name.clone()));
        let variant = mir::RootType::Variant(mir::Variant::Hash(mir::HashVariant {
            name: variant_name.clone(),
            tag_type: u_int(4),
            hash_types,
        }));

        let mut types = IndexMap::new();
        types.insert(a_name.clone(), a);
        types.insert(variant_name.clone(), variant);

        let digests = run(&mut types, &[a_name.clone(), variant_name.clone()]).unwrap();
        assert!(digests.contains_key(&variant_name));
        match &types[&variant_name] {
            mir::RootType::Variant(mir::Variant::Fixed(fv)) => {
                assert_eq!(fv.tags.len(), 1);
            }
            other => panic!("expected FixedVariant, got {other:?}"),
        }
    }

    #[test]
    fn distinct_members_get_distinct_tags() {
        let (a_name, a) = empty_struct("p.A");
        let (b_name, b) = empty_struct("p.B");
        let variant_name = QName::from_dotted("p.V");
        let mut hash_types = IndexSet::new();
        hash_types.insert(mir::StructRef(a_name.clone()));
        hash_types.insert(mir::StructRef(b_name.clone()));
        let variant = mir::RootType::Variant(mir::Variant::Hash(mir::HashVariant {
            name: variant_name.clone(),
            tag_type: u_int(4),
            hash_types,
        }));

        let mut types = IndexMap::new();
        types.insert(a_name.clone(), a);
        types.insert(b_name.clone(), b);
        types.insert(variant_name.clone(), variant);

        let order = vec![a_name.clone(), b_name.clone(), variant_name.clone()];
        let result = run(&mut types, &order);
        assert!(result.is_ok());
        match &types[&variant_name] {
            mir::RootType::Variant(mir::Variant::Fixed(fv)) => {
                let tags: Vec<i64> = fv.tags.values().copied().collect();
                assert_eq!(tags.len(), 2);
                assert_ne!(tags[0], tags[1]);
            }
            other => panic!("expected FixedVariant, got {other:?}"),
        }
    }
}
