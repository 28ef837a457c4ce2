//! Ties together every earlier type-pipeline pass into the final
//! [`lir::ProtocolTypes`]: every `StructRef`/`VariantRef`/`EnumRef` is
//! inlined into the `Struct`/`Variant`/`Enum` it names, and every node is
//! annotated with its size and triviality.
//!
//! Must run last, after [`crate::types::seq_reduce`] (so only
//! `Array`/`Vector`/`List` remain, never `Seq`), and needs `type_order`
//! (leaves first) so that by the time a reference is inlined, the type it
//! names has already been fused and cached.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::digest::Digest as MirDigest;
use crate::qname::QName;
use crate::ranges::Range;
use crate::types::lir;
use crate::types::master_fields::{KeyProperty, MasterField};
use crate::types::mir;
use crate::types::size_pass::{self, RootSizeResult};

pub fn run(
    types: &IndexMap<QName, mir::RootType>,
    type_order: &[QName],
    master_field_map: &IndexMap<QName, IndexMap<String, MasterField>>,
    digest_map: &IndexMap<QName, MirDigest>,
    size_map: &IndexMap<QName, RootSizeResult>,
    enum_ranges: &IndexMap<QName, Vec<Range>>,
    own: Vec<QName>,
    external_protocols: HashSet<QName>,
) -> lir::ProtocolTypes {
    let tmap = compute_trivial(types, type_order);
    let mut cache: IndexMap<QName, lir::RootType> = IndexMap::new();
    for name in type_order {
        let fused = fuse_root(name, types, master_field_map, digest_map, size_map, enum_ranges, &tmap, &cache);
        cache.insert(name.clone(), fused);
    }
    lir::ProtocolTypes { types: cache, own, external_protocols }
}

fn to_lir_digest(d: &MirDigest) -> lir::Digest {
    lir::Digest { repr_str: d.repr_str.clone(), repr_hash: d.repr_hash.clone() }
}

fn to_lir_key_property(k: KeyProperty) -> lir::KeyProperty {
    match k {
        KeyProperty::VariantTag => lir::KeyProperty::VariantTag,
        KeyProperty::SeqLength => lir::KeyProperty::SeqLength,
    }
}

fn fuse_root(
    name: &QName,
    types: &IndexMap<QName, mir::RootType>,
    master_field_map: &IndexMap<QName, IndexMap<String, MasterField>>,
    digest_map: &IndexMap<QName, MirDigest>,
    size_map: &IndexMap<QName, RootSizeResult>,
    enum_ranges: &IndexMap<QName, Vec<Range>>,
    tmap: &IndexMap<QName, bool>,
    cache: &IndexMap<QName, lir::RootType>,
) -> lir::RootType {
    match &types[name] {
        mir::RootType::Struct(s) => {
            let empty_masters = IndexMap::new();
            let masters = master_field_map.get(name).unwrap_or(&empty_masters);
            let offset = size_map[name].offset.as_ref().expect("struct must have an offset result");
            let mut fields = IndexMap::new();
            for (fname, ftype) in &s.fields {
                let master_field = masters.get(fname).map(|mf| lir::MasterField {
                    master_field: mf.master_field.clone(),
                    type_: fuse_type(&s.fields[&mf.master_field], types, size_map, tmap, cache),
                    key_property: to_lir_key_property(mf.key_property),
                });
                fields.insert(
                    fname.clone(),
                    lir::Field {
                        type_: fuse_type(ftype, types, size_map, tmap, cache),
                        offset: offset.offset_map[fname].clone(),
                        master_field,
                    },
                );
            }
            lir::RootType::Struct(lir::Struct {
                name: s.name.clone(),
                digest: to_lir_digest(&digest_map[name]),
                size: size_map[name].size,
                trivial: tmap[name],
                fields,
                tail_offset: offset.tail_offset.clone(),
            })
        }
        mir::RootType::Variant(mir::Variant::Fixed(v)) => {
            let tag_type = v.tag_type;
            let tags = v
                .tags
                .iter()
                .map(|(sr, value)| (sr.0.clone(), *value))
                .collect();
            lir::RootType::Variant(lir::Variant {
                name: v.name.clone(),
                digest: to_lir_digest(&digest_map[name]),
                size: size_map[name].size,
                tag_type,
                tags,
            })
        }
        mir::RootType::Variant(mir::Variant::Hash(_)) => {
            unreachable!("hash variants must be expanded into fixed variants before fuse runs")
        }
        mir::RootType::Enum(e) => lir::RootType::Enum(lir::Enum {
            name: e.name.clone(),
            digest: to_lir_digest(&digest_map[name]),
            underlying_type: e.underlying_type,
            variants: e.variants.clone(),
            valid_ranges: enum_ranges[name].clone(),
        }),
    }
}

fn fuse_type(
    t: &mir::Type,
    types: &IndexMap<QName, mir::RootType>,
    size_map: &IndexMap<QName, RootSizeResult>,
    tmap: &IndexMap<QName, bool>,
    cache: &IndexMap<QName, lir::RootType>,
) -> lir::Type {
    match t {
        mir::Type::Int(i) => lir::Type::Int(*i),
        mir::Type::Float(f) => lir::Type::Float(*f),
        mir::Type::Array { inner, length } => lir::Type::Array {
            size: size_pass::size_type(t, size_map),
            inner: Box::new(fuse_type(inner, types, size_map, tmap, cache)),
            length: *length,
        },
        mir::Type::Vector { inner, length } => lir::Type::Vector {
            size: size_pass::size_type(t, size_map),
            inner: Box::new(fuse_type(inner, types, size_map, tmap, cache)),
            length: lir::FieldReference(length.0.clone()),
        },
        mir::Type::List { inner, length } => lir::Type::List {
            size: size_pass::size_type(t, size_map),
            inner: Box::new(fuse_type(inner, types, size_map, tmap, cache)),
            length: to_lir_length(length),
        },
        mir::Type::DetachedVariant { variant, tag } => {
            let lir::RootType::Variant(v) = cache[&variant.0].clone() else {
                unreachable!("DetachedVariant must reference an already-fused Variant")
            };
            lir::Type::DetachedVariant {
                size: size_pass::size_type(t, size_map),
                variant: Box::new(v),
                tag: lir::FieldReference(tag.0.clone()),
            }
        }
        mir::Type::Virtual(inner) => {
            lir::Type::Virtual { inner: Box::new(fuse_type(inner, types, size_map, tmap, cache)) }
        }
        mir::Type::StructRef(r) => {
            let lir::RootType::Struct(s) = cache[&r.0].clone() else {
                unreachable!("StructRef must reference an already-fused Struct")
            };
            lir::Type::Struct(Box::new(s))
        }
        mir::Type::VariantRef(r) => {
            let lir::RootType::Variant(v) = cache[&r.0].clone() else {
                unreachable!("VariantRef must reference an already-fused Variant")
            };
            lir::Type::Variant(Box::new(v))
        }
        mir::Type::EnumRef(r) => {
            let lir::RootType::Enum(e) = cache[&r.0].clone() else {
                unreachable!("EnumRef must reference an already-fused Enum")
            };
            lir::Type::Enum(Box::new(e))
        }
        mir::Type::Seq { .. } | mir::Type::UnboundSeq { .. } => {
            unreachable!("Seq/UnboundSeq must be eliminated before fuse runs")
        }
    }
}

fn to_lir_length(l: &mir::Length) -> lir::Length {
    match l {
        mir::Length::Fixed(n) => lir::Length::Fixed(*n),
        mir::Length::Variable(fr) => lir::Length::Variable(lir::FieldReference(fr.0.clone())),
    }
}

fn compute_trivial(types: &IndexMap<QName, mir::RootType>, type_order: &[QName]) -> IndexMap<QName, bool> {
    let mut tmap = IndexMap::new();
    for name in type_order {
        let trivial = match &types[name] {
            mir::RootType::Struct(s) => s.fields.values().all(|ftype| trivial_field(ftype, &tmap)),
            mir::RootType::Variant(_) | mir::RootType::Enum(_) => false,
        };
        tmap.insert(name.clone(), trivial);
    }
    tmap
}

fn trivial_field(t: &mir::Type, tmap: &IndexMap<QName, bool>) -> bool {
    match t {
        mir::Type::Int(_) | mir::Type::Float(_) => true,
        mir::Type::Array { inner, .. } => trivial_field(inner, tmap),
        mir::Type::Vector { .. }
        | mir::Type::List { .. }
        | mir::Type::DetachedVariant { .. }
        | mir::Type::Virtual(_) => false,
        mir::Type::StructRef(r) => tmap[&r.0],
        mir::Type::VariantRef(r) => tmap[&r.0],
        mir::Type::EnumRef(r) => tmap[&r.0],
        mir::Type::Seq { .. } | mir::Type::UnboundSeq { .. } => {
            unreachable!("Seq/UnboundSeq must be eliminated before triviality is computed")
        }
    }
}

#[cfg(test)]
mod tests {
    use protocol_schema::{Endianness, Int, Sign};

    use super::*;
    use crate::types::{enum_range, hash_expand, master_fields, seq_reduce, size_pass};

    fn u_int(width: u8) -> Int {
        Int { width, sign: Sign::Unsigned, endianness: Endianness::Little }
    }

    #[test]
    fn simple_struct_fuses_with_correct_size_and_offsets() {
        let name = QName::from_dotted("p.S");
        let mut fields = IndexMap::new();
        fields.insert("a".to_string(), mir::Type::Int(u_int(1)));
        fields.insert("b".to_string(), mir::Type::Int(u_int(4)));
        let mut types = IndexMap::new();
        types.insert(name.clone(), mir::RootType::Struct(mir::Struct { name: name.clone(), fields }));
        let order = vec![name.clone()];

        let master_field_map = master_fields::run(&types, &order).unwrap();
        let digest_map = hash_expand::run(&mut types, &order).unwrap();
        let size_map = size_pass::run(&types, &order);
        let enum_ranges = enum_range::run(&types, &order);
        seq_reduce::run(&mut types, &order, &size_map);
        let (own, external) = crate::types::own::run(&QName::from_dotted("p"), &order);

        let protocol = run(&types, &order, &master_field_map, &digest_map, &size_map, &enum_ranges, own, external);
        match protocol.types.get(&name).unwrap() {
            lir::RootType::Struct(s) => {
                assert!(s.trivial);
                assert_eq!(s.size, crate::size::Size::Constant(5));
            }
            other => panic!("expected struct, got {other:?}"),
        }
    }

    #[test]
    fn variable_length_field_makes_struct_non_trivial() {
        let name = QName::from_dotted("p.S");
        let mut fields = IndexMap::new();
        fields.insert("len".to_string(), mir::Type::Int(u_int(1)));
        fields.insert(
            "data".to_string(),
            mir::Type::Seq {
                inner: Box::new(mir::Type::Int(u_int(1))),
                length: mir::Length::Variable(mir::FieldReference("len".to_string())),
            },
        );
        let mut types = IndexMap::new();
        types.insert(name.clone(), mir::RootType::Struct(mir::Struct { name: name.clone(), fields }));
        let order = vec![name.clone()];

        let master_field_map = master_fields::run(&types, &order).unwrap();
        let digest_map = hash_expand::run(&mut types, &order).unwrap();
        let size_map = size_pass::run(&types, &order);
        let enum_ranges = enum_range::run(&types, &order);
        seq_reduce::run(&mut types, &order, &size_map);
        let (own, external) = crate::types::own::run(&QName::from_dotted("p"), &order);

        let protocol = run(&types, &order, &master_field_map, &digest_map, &size_map, &enum_ranges, own, external);
        match protocol.types.get(&name).unwrap() {
            lir::RootType::Struct(s) => {
                assert!(!s.trivial);
                assert_eq!(s.fields["data"].master_field.as_ref().unwrap().master_field, "len");
            }
            other => panic!("expected struct, got {other:?}"),
        }
    }
}
