//! Rewrites every `Seq` field into one of `Array`, `Vector`, or `List`: a
//! `Seq` whose element is constant-sized becomes an `Array` (fixed count)
//! or `Vector` (count carried in a sibling field) depending on its length
//! kind; once the element itself is dynamically sized, the length kind no
//! longer matters and it becomes a `List`.
//!
//! Needs the per-type size map from [`crate::types::size_pass`], since
//! "does this element have constant size" can require looking through a
//! `StructRef`/`VariantRef`/`EnumRef` to a type sized earlier in
//! `type_order`.

use indexmap::IndexMap;

use crate::qname::QName;
use crate::size::Size;
use crate::types::mir;
use crate::types::size_pass::{self, RootSizeResult};

pub fn run(types: &mut IndexMap<QName, mir::RootType>, type_order: &[QName], size_map: &IndexMap<QName, RootSizeResult>) {
    for name in type_order {
        if let mir::RootType::Struct(s) = &types[name] {
            let reduced = reduce_struct(s, size_map);
            types.insert(name.clone(), mir::RootType::Struct(reduced));
        }
    }
}

fn reduce_struct(s: &mir::Struct, size_map: &IndexMap<QName, RootSizeResult>) -> mir::Struct {
    let mut fields = IndexMap::new();
    for (fname, ftype) in &s.fields {
        fields.insert(fname.clone(), reduce_field(ftype, size_map));
    }
    mir::Struct { name: s.name.clone(), fields }
}

fn reduce_field(t: &mir::Type, size_map: &IndexMap<QName, RootSizeResult>) -> mir::Type {
    match t {
        mir::Type::Int(_) | mir::Type::Float(_) | mir::Type::DetachedVariant { .. } => t.clone(),
        mir::Type::Seq { inner, length } => {
            let inner_reduced = reduce_field(inner, size_map);
            let inner_size = size_pass::size_type(inner, size_map);
            match inner_size {
                Size::Dynamic => mir::Type::List { inner: Box::new(inner_reduced), length: length.clone() },
                Size::Constant(_) => match length {
                    mir::Length::Fixed(n) => mir::Type::Array { inner: Box::new(inner_reduced), length: *n },
                    mir::Length::Variable(fr) => {
                        mir::Type::Vector { inner: Box::new(inner_reduced), length: fr.clone() }
                    }
                },
            }
        }
        mir::Type::UnboundSeq { .. } => unreachable!("unbound sequences are eliminated before seq-reduce runs"),
        mir::Type::Virtual(inner) => mir::Type::Virtual(Box::new(reduce_field(inner, size_map))),
        mir::Type::Array { .. } | mir::Type::Vector { .. } | mir::Type::List { .. } => t.clone(),
        mir::Type::StructRef(_) | mir::Type::VariantRef(_) | mir::Type::EnumRef(_) => t.clone(),
    }
}

#[cfg(test)]
mod tests {
    use protocol_schema::{Endianness, Int, Sign};

    use super::*;
    use crate::types::size_pass;

    fn u_int(width: u8) -> Int {
        Int { width, sign: Sign::Unsigned, endianness: Endianness::Little }
    }

    #[test]
    fn constant_sized_element_with_fixed_length_becomes_array() {
        let name = QName::from_dotted("p.S");
        let mut fields = IndexMap::new();
        fields.insert(
            "data".to_string(),
            mir::Type::Seq { inner: Box::new(mir::Type::Int(u_int(2))), length: mir::Length::Fixed(3) },
        );
        let mut types = IndexMap::new();
        types.insert(name.clone(), mir::RootType::Struct(mir::Struct { name: name.clone(), fields }));

        let size_map = size_pass::run(&types, &[name.clone()]);
        run(&mut types, &[name.clone()], &size_map);

        let mir::RootType::Struct(s) = &types[&name] else { panic!("expected struct") };
        assert!(matches!(s.fields["data"], mir::Type::Array { length: 3, .. }));
    }

    #[test]
    fn constant_sized_element_with_variable_length_becomes_vector() {
        let name = QName::from_dotted("p.S");
        let mut fields = IndexMap::new();
        fields.insert("len".to_string(), mir::Type::Int(u_int(1)));
        fields.insert(
            "data".to_string(),
            mir::Type::Seq {
                inner: Box::new(mir::Type::Int(u_int(2))),
                length: mir::Length::Variable(mir::FieldReference("len".to_string())),
            },
        );
        let mut types = IndexMap::new();
        types.insert(name.clone(), mir::RootType::Struct(mir::Struct { name: name.clone(), fields }));

        let size_map = size_pass::run(&types, &[name.clone()]);
        run(&mut types, &[name.clone()], &size_map);

        let mir::RootType::Struct(s) = &types[&name] else { panic!("expected struct") };
        assert!(matches!(s.fields["data"], mir::Type::Vector { .. }));
    }

    #[test]
    fn dynamically_sized_element_becomes_list_regardless_of_length_kind() {
        let inner_name = QName::from_dotted("p.Inner");
        let outer_name = QName::from_dotted("p.Outer");

        let mut inner_fields = IndexMap::new();
        inner_fields.insert("len".to_string(), mir::Type::Int(u_int(1)));
        inner_fields.insert(
            "bytes".to_string(),
            mir::Type::Seq {
                inner: Box::new(mir::Type::Int(u_int(1))),
                length: mir::Length::Variable(mir::FieldReference("len".to_string())),
            },
        );

        let mut outer_fields = IndexMap::new();
        outer_fields.insert(
            "items".to_string(),
            mir::Type::Seq {
                inner: Box::new(mir::Type::StructRef(mir::StructRef(inner_name.clone()))),
                length: mir::Length::Fixed(2),
            },
        );

        let mut types = IndexMap::new();
        types.insert(inner_name.clone(), mir::RootType::Struct(mir::Struct { name: inner_name.clone(), fields: inner_fields }));
        types.insert(outer_name.clone(), mir::RootType::Struct(mir::Struct { name: outer_name.clone(), fields: outer_fields }));

        let order = vec![inner_name.clone(), outer_name.clone()];
        let size_map = size_pass::run(&types, &order);
        run(&mut types, &order, &size_map);

        let mir::RootType::Struct(s) = &types[&outer_name] else { panic!("expected struct") };
        assert!(matches!(s.fields["items"], mir::Type::List { .. }));
    }
}
