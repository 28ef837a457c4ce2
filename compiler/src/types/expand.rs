//! Desugaring passes that turn schema-level shorthand into the fully
//! explicit shapes the rest of the pipeline understands: an inline variant
//! field becomes a separately-tagged field pair, and an unbound sequence
//! becomes a separately-lengthed field pair. Only struct fields are
//! rewritten -- variants and enums have no field list to expand.

use indexmap::IndexMap;

use crate::qname::QName;
use crate::types::mir;

/// Replace every top-level `VariantRef` field with an injected tag field
/// plus a `DetachedVariant` referencing it.
pub fn variant_expand(types: &mut IndexMap<QName, mir::RootType>, type_order: &[QName]) {
    for name in type_order {
        if let mir::RootType::Struct(s) = &types[name] {
            let expanded = expand_variant_fields(s, types);
            types.insert(name.clone(), mir::RootType::Struct(expanded));
        }
    }
}

fn expand_variant_fields(s: &mir::Struct, types: &IndexMap<QName, mir::RootType>) -> mir::Struct {
    let mut new_fields = IndexMap::new();
    for (fname, ftype) in &s.fields {
        if let mir::Type::VariantRef(vref) = ftype {
            let mir::RootType::Variant(v) = &types[&vref.0] else {
                panic!("VariantRef must resolve to a Variant");
            };
            let tag_type = *v.tag_type();
            let injected_name = format!("{fname}_injected_key_");
            new_fields.insert(injected_name.clone(), mir::Type::Int(tag_type));
            new_fields.insert(
                fname.clone(),
                mir::Type::DetachedVariant {
                    variant: vref.clone(),
                    tag: mir::FieldReference(injected_name),
                },
            );
        } else {
            new_fields.insert(fname.clone(), ftype.clone());
        }
    }
    mir::Struct { name: s.name.clone(), fields: new_fields }
}

/// Replace every top-level `UnboundSeq` field with an injected length field
/// plus a length-bound `Seq`.
pub fn seq_expand(types: &mut IndexMap<QName, mir::RootType>, type_order: &[QName]) {
    for name in type_order {
        if let mir::RootType::Struct(s) = &types[name] {
            let expanded = expand_seq_fields(s);
            types.insert(name.clone(), mir::RootType::Struct(expanded));
        }
    }
}

fn expand_seq_fields(s: &mir::Struct) -> mir::Struct {
    let mut new_fields = IndexMap::new();
    for (fname, ftype) in &s.fields {
        if let mir::Type::UnboundSeq { inner, length_type } = ftype {
            let injected_name = format!("{fname}_injected_len_");
            new_fields.insert(injected_name.clone(), mir::Type::Int(*length_type));
            new_fields.insert(
                fname.clone(),
                mir::Type::Seq {
                    inner: inner.clone(),
                    length: mir::Length::Variable(mir::FieldReference(injected_name)),
                },
            );
        } else {
            new_fields.insert(fname.clone(), ftype.clone());
        }
    }
    mir::Struct { name: s.name.clone(), fields: new_fields }
}

#[cfg(test)]
mod tests {
    use protocol_schema::{Endianness, Int, Sign};

    use super::*;

    fn u_int(width: u8) -> Int {
        Int { width, sign: Sign::Unsigned, endianness: Endianness::Little }
    }

    #[test]
    fn variant_ref_field_is_split_into_tag_and_detached_variant() {
        let variant_name = QName::from_dotted("p.V");
        let struct_name = QName::from_dotted("p.S");

        let mut fields = IndexMap::new();
        fields.insert("payload".to_string(), mir::Type::VariantRef(mir::VariantRef(variant_name.clone())));

        let mut types = IndexMap::new();
        types.insert(
            variant_name.clone(),
            mir::RootType::Variant(mir::Variant::Fixed(mir::FixedVariant {
                name: variant_name.clone(),
                tag_type: u_int(2),
                tags: IndexMap::new(),
            })),
        );
        types.insert(struct_name.clone(), mir::RootType::Struct(mir::Struct { name: struct_name.clone(), fields }));

        variant_expand(&mut types, &[variant_name.clone(), struct_name.clone()]);

        let mir::RootType::Struct(s) = &types[&struct_name] else { panic!("expected struct") };
        let keys: Vec<&str> = s.fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["payload_injected_key_", "payload"]);
        assert_eq!(s.fields["payload_injected_key_"], mir::Type::Int(u_int(2)));
        assert!(matches!(s.fields["payload"], mir::Type::DetachedVariant { .. }));
    }

    #[test]
    fn unbound_seq_field_is_split_into_length_and_bound_seq() {
        let struct_name = QName::from_dotted("p.S");
        let mut fields = IndexMap::new();
        fields.insert(
            "data".to_string(),
            mir::Type::UnboundSeq { inner: Box::new(mir::Type::Int(u_int(1))), length_type: u_int(4) },
        );
        let mut types = IndexMap::new();
        types.insert(struct_name.clone(), mir::RootType::Struct(mir::Struct { name: struct_name.clone(), fields }));

        seq_expand(&mut types, &[struct_name.clone()]);

        let mir::RootType::Struct(s) = &types[&struct_name] else { panic!("expected struct") };
        let keys: Vec<&str> = s.fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["data_injected_len_", "data"]);
        assert_eq!(s.fields["data_injected_len_"], mir::Type::Int(u_int(4)));
        match &s.fields["data"] {
            mir::Type::Seq { length: mir::Length::Variable(fr), .. } => assert_eq!(fr.0, "data_injected_len_"),
            other => panic!("expected bound Seq, got {other:?}"),
        }
    }

    #[test]
    fn non_variant_ref_fields_pass_through_unchanged() {
        let struct_name = QName::from_dotted("p.S");
        let mut fields = IndexMap::new();
        fields.insert("x".to_string(), mir::Type::Int(u_int(1)));
        let mut types = IndexMap::new();
        types.insert(struct_name.clone(), mir::RootType::Struct(mir::Struct { name: struct_name.clone(), fields }));

        variant_expand(&mut types, &[struct_name.clone()]);
        seq_expand(&mut types, &[struct_name.clone()]);

        let mir::RootType::Struct(s) = &types[&struct_name] else { panic!("expected struct") };
        assert_eq!(s.fields.keys().collect::<Vec<_>>(), vec!["x"]);
    }
}
