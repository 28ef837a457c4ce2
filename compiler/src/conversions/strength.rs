//! Classifies each resolved root conversion into the strength lattice
//! (`Partial < Total < Compatible < Substitutable`, see
//! [`crate::conversions::lir::ConversionStrength`]).
//!
//! Each tier is computed by a predicate that presupposes the weaker ones
//! rather than re-deriving them, mirroring how the tiers are defined: a
//! conversion can only be `Compatible` if it is already `Total`, and only
//! `Substitutable` if it is already `Compatible`. Conversions are visited in
//! dependency order so that a `Ref`'s strength is always already known by
//! the time something that points at it is classified.

use std::collections::HashMap;

use crate::conversions::deps::ConversionKey;
use crate::conversions::lir::ConversionStrength;
use crate::conversions::mir::{Conversion, FieldConversion, RootConversion, VariantValueMapping};
use crate::conversions::lower::{lookup_enum, lookup_struct, lookup_variant};
use crate::types::lir::ProtocolTypes;

pub type StrengthTable = HashMap<ConversionKey, ConversionStrength>;

pub fn classify(
    conversions: &[RootConversion],
    order: &[ConversionKey],
    types: &ProtocolTypes,
) -> StrengthTable {
    let by_key: HashMap<ConversionKey, &RootConversion> = conversions
        .iter()
        .map(|rc| ((rc.src().clone(), rc.target().clone()), rc))
        .collect();

    let mut table = StrengthTable::new();
    for key in order {
        let Some(rc) = by_key.get(key) else { continue };
        let strength = classify_one(rc, &table, types);
        table.insert(key.clone(), strength);
    }
    table
}

fn classify_one(rc: &RootConversion, table: &StrengthTable, types: &ProtocolTypes) -> ConversionStrength {
    match rc {
        RootConversion::Enum { src, target, mapping, .. } => {
            let total = mapping.iter().all(|m| m.target.is_some());
            if !total {
                return ConversionStrength::Partial;
            }
            // Enums have no standalone "compatible" tier: a conversion is either
            // a pure relabeling (substitutable) or merely total, never something
            // in between, so compatible is defined to coincide with substitutable.
            let substitutable = total
                && lookup_enum(types, src)
                    .ok()
                    .zip(lookup_enum(types, target).ok())
                    .is_some_and(|(s, t)| {
                        s.underlying_type == t.underlying_type
                            && mapping.len() == s.variants.len()
                            && mapping.iter().all(|m| {
                                let t = m.target.as_ref().expect("checked total above");
                                t.name == m.src.name && t.value == m.src.value
                            })
                    });
            let compatible = substitutable;
            pick(total, compatible, substitutable)
        }
        RootConversion::Struct { src, target, mapping, .. } => {
            let Ok(src_struct) = lookup_struct(types, src) else {
                return ConversionStrength::Partial;
            };
            let Ok(target_struct) = lookup_struct(types, target) else {
                return ConversionStrength::Partial;
            };
            let total = target_struct.fields.keys().all(|name| {
                mapping.get(name).is_some_and(|fc| field_strength(fc, table) != ConversionStrength::Partial)
            });
            if !total {
                return ConversionStrength::Partial;
            }
            let src_order: Vec<&str> = src_struct.fields.keys().map(String::as_str).collect();
            let target_order: Vec<&str> = target_struct.fields.keys().map(String::as_str).collect();
            let n = target_order.len();
            // Every target field must sit at the same position as the source
            // field it is transformed from -- a rename is fine, a reorder or
            // a defaulted (non-`Transform`) field is not.
            let positionally_aligned = src_order.len() >= n
                && target_order.iter().enumerate().all(|(i, name)| {
                    matches!(
                        mapping.get(*name),
                        Some(FieldConversion::Transform { src_field, .. })
                            if src_order.get(i) == Some(&src_field.as_str())
                    )
                });
            // Every field but the last needs full substitutability; the last
            // target field only needs to be at least compatible, since it is
            // the one allowed to absorb a trailing truncation of the source.
            let compatible = positionally_aligned
                && target_order.iter().enumerate().all(|(i, name)| {
                    let Some(FieldConversion::Transform { conversion, .. }) = mapping.get(*name) else {
                        return false;
                    };
                    let strength = conversion_strength(conversion, table);
                    if i + 1 == n {
                        strength >= ConversionStrength::Compatible
                    } else {
                        strength == ConversionStrength::Substitutable
                    }
                });
            let substitutable = compatible
                && src_order.len() == n
                && target_order.iter().all(|name| {
                    matches!(
                        mapping.get(*name),
                        Some(FieldConversion::Transform { conversion, .. })
                            if conversion_strength(conversion, table) == ConversionStrength::Substitutable
                    )
                });
            pick(total, compatible, substitutable)
        }
        RootConversion::Variant { src, target, mapping, .. } => {
            let Ok(src_variant) = lookup_variant(types, src) else {
                return ConversionStrength::Partial;
            };
            let Ok(target_variant) = lookup_variant(types, target) else {
                return ConversionStrength::Partial;
            };
            let total = mapping.iter().all(|m| m.target.is_some());
            if !total {
                return ConversionStrength::Partial;
            }
            let compatible = total
                && mapping.iter().all(|m| member_strength(m, table) >= ConversionStrength::Compatible);
            let substitutable = compatible
                && src_variant.tag_type == target_variant.tag_type
                && mapping.len() == src_variant.tags.len()
                && mapping.iter().all(|m| {
                    let (target_value, _) = m.target.as_ref().expect("checked total above");
                    target_value.tag == m.src.tag && member_strength(m, table) == ConversionStrength::Substitutable
                });
            pick(total, compatible, substitutable)
        }
    }
}

fn field_strength(fc: &FieldConversion, table: &StrengthTable) -> ConversionStrength {
    match fc {
        FieldConversion::IntDefault { .. } | FieldConversion::EnumDefault { .. } => ConversionStrength::Total,
        FieldConversion::Transform { conversion, .. } => conversion_strength(conversion, table),
    }
}

fn member_strength(m: &VariantValueMapping, table: &StrengthTable) -> ConversionStrength {
    match &m.target {
        None => ConversionStrength::Partial,
        Some((_, conversion)) => conversion_strength(conversion, table),
    }
}

fn conversion_strength(c: &Conversion, table: &StrengthTable) -> ConversionStrength {
    match c {
        Conversion::Identity => ConversionStrength::Substitutable,
        Conversion::Ref { src, target } => table
            .get(&(src.clone(), target.clone()))
            .copied()
            .unwrap_or(ConversionStrength::Partial),
        Conversion::Unresolved { .. } => {
            unreachable!("strength is computed after conversions::resolve eliminates Unresolved")
        }
    }
}

fn pick(total: bool, compatible: bool, substitutable: bool) -> ConversionStrength {
    if substitutable {
        ConversionStrength::Substitutable
    } else if compatible {
        ConversionStrength::Compatible
    } else if total {
        ConversionStrength::Total
    } else {
        ConversionStrength::Partial
    }
}

#[cfg(test)]
mod tests {
    use protocol_schema::{Endianness, Int, Sign};

    use super::*;
    use crate::qname::QName;
    use crate::size::{Offset, Size};
    use crate::types::lir::{self, Digest, Field, RootType, Struct};
    use indexmap::IndexMap;

    fn u_int(width: u8) -> Int {
        Int { width, sign: Sign::Unsigned, endianness: Endianness::Little }
    }

    fn struct_with_fields(name: &str, field_names: &[&str]) -> Struct {
        let mut fields = IndexMap::new();
        for n in field_names {
            fields.insert(
                n.to_string(),
                Field {
                    type_: lir::Type::Int(u_int(4)),
                    offset: Offset::zero(),
                    master_field: None,
                },
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

    fn types_with(structs: Vec<Struct>) -> ProtocolTypes {
        let mut types = IndexMap::new();
        for s in &structs {
            types.insert(s.name.clone(), RootType::Struct(s.clone()));
        }
        ProtocolTypes { types, own: structs.iter().map(|s| s.name.clone()).collect(), external_protocols: Default::default() }
    }

    fn transform(src_field: &str, conversion: Conversion) -> FieldConversion {
        FieldConversion::Transform { src_field: src_field.to_string(), conversion }
    }

    #[test]
    fn identical_struct_renaming_is_substitutable() {
        let a = struct_with_fields("p1.A", &["x", "y"]);
        let b = struct_with_fields("p2.A", &["x", "y"]);
        let types = types_with(vec![a.clone(), b.clone()]);
        let mut mapping = IndexMap::new();
        mapping.insert("x".to_string(), transform("x", Conversion::Identity));
        mapping.insert("y".to_string(), transform("y", Conversion::Identity));
        let rc = RootConversion::Struct {
            protocol: QName::from_dotted("p2"),
            src: a.name.clone(),
            target: b.name.clone(),
            mapping,
        };
        let table = StrengthTable::new();
        assert_eq!(classify_one(&rc, &table, &types), ConversionStrength::Substitutable);
    }

    #[test]
    fn dropped_trailing_field_is_compatible_not_substitutable() {
        let a = struct_with_fields("p1.A", &["x", "y"]);
        let b = struct_with_fields("p2.A", &["x"]);
        let types = types_with(vec![a.clone(), b.clone()]);
        let mut mapping = IndexMap::new();
        mapping.insert("x".to_string(), transform("x", Conversion::Identity));
        let rc = RootConversion::Struct {
            protocol: QName::from_dotted("p2"),
            src: a.name.clone(),
            target: b.name.clone(),
            mapping,
        };
        let table = StrengthTable::new();
        assert_eq!(classify_one(&rc, &table, &types), ConversionStrength::Compatible);
    }

    #[test]
    fn unmapped_required_field_is_partial() {
        let a = struct_with_fields("p1.A", &["x"]);
        let b = struct_with_fields("p2.A", &["x", "y"]);
        let types = types_with(vec![a.clone(), b.clone()]);
        let mut mapping = IndexMap::new();
        mapping.insert("x".to_string(), transform("x", Conversion::Identity));
        let rc = RootConversion::Struct {
            protocol: QName::from_dotted("p2"),
            src: a.name.clone(),
            target: b.name.clone(),
            mapping,
        };
        let table = StrengthTable::new();
        assert_eq!(classify_one(&rc, &table, &types), ConversionStrength::Partial);
    }
}
