//! Computes the on-wire size of every root type, and the byte offset of
//! every field within each struct. Operates purely on MIR: `Array` /
//! `Vector` / `List` are sized here too (by degrading to the equivalent
//! `Seq` shape) so that [`crate::types::fuse`] can reuse this pass's
//! results after seq-reduce has already rewritten the tree.

use indexmap::IndexMap;

use crate::qname::QName;
use crate::size::{Offset, Size};
use crate::types::mir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetResult {
    pub offset_map: IndexMap<String, Offset>,
    pub tail_offset: Offset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootSizeResult {
    pub size: Size,
    pub offset: Option<OffsetResult>,
}

pub fn run(types: &IndexMap<QName, mir::RootType>, type_order: &[QName]) -> IndexMap<QName, RootSizeResult> {
    let mut result: IndexMap<QName, RootSizeResult> = IndexMap::new();
    for name in type_order {
        let r = size_root(&types[name], &result);
        result.insert(name.clone(), r);
    }
    result
}

fn size_root(root: &mir::RootType, size_map: &IndexMap<QName, RootSizeResult>) -> RootSizeResult {
    match root {
        mir::RootType::Struct(s) => {
            let mut offset = Offset::zero();
            let mut offset_map = IndexMap::new();
            for (fname, ftype) in &s.fields {
                offset_map.insert(fname.clone(), offset.clone());
                let fsize = size_type(ftype, size_map);
                offset = offset.add(fname, fsize);
            }
            RootSizeResult { size: offset.as_size(), offset: Some(OffsetResult { offset_map, tail_offset: offset }) }
        }
        mir::RootType::Variant(v) => {
            let mut target: Option<u64> = None;
            for sr in v.types() {
                match size_map[&sr.0].size {
                    Size::Dynamic => return RootSizeResult { size: Size::Dynamic, offset: None },
                    Size::Constant(n) => match target {
                        None => target = Some(n),
                        Some(t) if t != n => return RootSizeResult { size: Size::Dynamic, offset: None },
                        Some(_) => {}
                    },
                }
            }
            // No members means a 0-size variant.
            RootSizeResult { size: Size::Constant(target.unwrap_or(0)), offset: None }
        }
        mir::RootType::Enum(e) => RootSizeResult { size: Size::Constant(e.underlying_type.width as u64), offset: None },
    }
}

/// The size of a single field type, given the already-computed sizes of
/// every root type it might refer to. Also handles `Array`/`Vector`/`List`
/// so it can be reused after [`crate::types::seq_reduce`] has rewritten
/// `Seq` away.
pub fn size_type(t: &mir::Type, size_map: &IndexMap<QName, RootSizeResult>) -> Size {
    match t {
        mir::Type::Int(i) => Size::Constant(i.width as u64),
        mir::Type::Float(f) => Size::Constant(f.width as u64),
        mir::Type::Seq { inner, length } => {
            let inner_size = size_type(inner, size_map);
            match (inner_size, length) {
                (Size::Constant(n), mir::Length::Fixed(count)) => Size::Constant(n * count),
                _ => Size::Dynamic,
            }
        }
        mir::Type::UnboundSeq { .. } => {
            unreachable!("unbound sequences are eliminated before size is computed")
        }
        // These only appear after seq-reduce; size is computed by degrading
        // back to the equivalent Seq shape, matching the pre-reduce rule.
        mir::Type::Array { inner, length } => size_type(
            &mir::Type::Seq { inner: inner.clone(), length: mir::Length::Fixed(*length) },
            size_map,
        ),
        mir::Type::Vector { inner, length } => size_type(
            &mir::Type::Seq { inner: inner.clone(), length: mir::Length::Variable(length.clone()) },
            size_map,
        ),
        mir::Type::List { inner, length } => {
            size_type(&mir::Type::Seq { inner: inner.clone(), length: length.clone() }, size_map)
        }
        mir::Type::DetachedVariant { variant, .. } => size_map[&variant.0].size,
        // Takes no space in the parent struct; its own fields are still
        // sized independently so the enclosing struct's offsets work out.
        mir::Type::Virtual(_) => Size::Constant(0),
        mir::Type::StructRef(r) => size_map[&r.0].size,
        mir::Type::VariantRef(r) => size_map[&r.0].size,
        mir::Type::EnumRef(r) => size_map[&r.0].size,
    }
}

#[cfg(test)]
mod tests {
    use protocol_schema::{Endianness, Int, Sign};

    use super::*;

    fn u_int(width: u8) -> Int {
        Int { width, sign: Sign::Unsigned, endianness: Endianness::Little }
    }

    #[test]
    fn struct_of_constant_fields_has_constant_size_and_offsets() {
        let name = QName::from_dotted("p.S");
        let mut fields = IndexMap::new();
        fields.insert("a".to_string(), mir::Type::Int(u_int(1)));
        fields.insert("b".to_string(), mir::Type::Int(u_int(4)));
        let mut types = IndexMap::new();
        types.insert(name.clone(), mir::RootType::Struct(mir::Struct { name: name.clone(), fields }));

        let result = run(&types, &[name.clone()]);
        let r = &result[&name];
        assert_eq!(r.size, Size::Constant(5));
        let offsets = &r.offset.as_ref().unwrap().offset_map;
        assert_eq!(offsets["a"], Offset::Constant(0));
        assert_eq!(offsets["b"], Offset::Constant(1));
    }

    #[test]
    fn variable_length_field_makes_size_dynamic_and_trails_following_offsets() {
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
        fields.insert("trailer".to_string(), mir::Type::Int(u_int(2)));
        let mut types = IndexMap::new();
        types.insert(name.clone(), mir::RootType::Struct(mir::Struct { name: name.clone(), fields }));

        let result = run(&types, &[name.clone()]);
        let r = &result[&name];
        assert_eq!(r.size, Size::Dynamic);
        let offsets = &r.offset.as_ref().unwrap().offset_map;
        assert_eq!(offsets["len"], Offset::Constant(0));
        assert_eq!(offsets["data"], Offset::Constant(1));
        assert_eq!(offsets["trailer"], Offset::Dynamic { after: "data".to_string(), base: 0 });
    }

    #[test]
    fn variant_with_uniformly_sized_members_has_that_constant_size() {
        let a_name = QName::from_dotted("p.A");
        let b_name = QName::from_dotted("p.B");
        let variant_name = QName::from_dotted("p.V");

        let mut a_fields = IndexMap::new();
        a_fields.insert("x".to_string(), mir::Type::Int(u_int(4)));
        let mut b_fields = IndexMap::new();
        b_fields.insert("y".to_string(), mir::Type::Int(u_int(4)));

        let mut types = IndexMap::new();
        types.insert(a_name.clone(), mir::RootType::Struct(mir::Struct { name: a_name.clone(), fields: a_fields }));
        types.insert(b_name.clone(), mir::RootType::Struct(mir::Struct { name: b_name.clone(), fields: b_fields }));
        let mut tags = IndexMap::new();
        tags.insert(mir::StructRef(a_name.clone()), 0);
        tags.insert(mir::StructRef(b_name.clone()), 1);
        types.insert(
            variant_name.clone(),
            mir::RootType::Variant(mir::Variant::Fixed(mir::FixedVariant {
                name: variant_name.clone(),
                tag_type: u_int(1),
                tags,
            })),
        );

        let order = vec![a_name, b_name, variant_name.clone()];
        let result = run(&types, &order);
        assert_eq!(result[&variant_name].size, Size::Constant(4));
    }
}
