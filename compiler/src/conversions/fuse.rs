//! Ties the resolved conversion MIR together with its computed strengths
//! into the final [`lir::ProtocolConversions`]: every [`mir::Conversion`]
//! becomes a [`lir::Conversion`] carrying its proven strength, and the
//! per-(src, target) table becomes the public lookup graph.

use indexmap::IndexMap;

use crate::conversions::deps::ConversionKey;
use crate::conversions::lir::{self, ConversionStrength};
use crate::conversions::mir::{self, FieldConversion, RootConversion, VariantValueMapping};
use crate::conversions::strength::StrengthTable;
use crate::graph::Graph;
use crate::qname::QName;

pub fn run(
    conversions: Vec<RootConversion>,
    order: &[ConversionKey],
    strengths: &StrengthTable,
    proto_name: &QName,
) -> lir::ProtocolConversions {
    let mut by_key: IndexMap<ConversionKey, RootConversion> = conversions
        .into_iter()
        .map(|rc| ((rc.src().clone(), rc.target().clone()), rc))
        .collect();

    let mut graph: Graph<QName, lir::RootConversion> = Graph::new();
    let mut own = Vec::new();
    for key in order {
        let Some(rc) = by_key.shift_remove(key) else { continue };
        let strength = *strengths.get(key).unwrap_or(&ConversionStrength::Partial);
        let is_own = rc.protocol() == proto_name;
        let target = rc.target().clone();
        let fused = fuse_one(rc, strength, strengths);
        graph.add_edge(key.0.clone(), key.1.clone(), fused);
        if is_own {
            own.push(target);
        }
    }

    lir::ProtocolConversions { conversions: graph, own }
}

fn fuse_one(rc: RootConversion, strength: ConversionStrength, strengths: &StrengthTable) -> lir::RootConversion {
    match rc {
        RootConversion::Enum { protocol, src, target, mapping } => {
            lir::RootConversion::Enum { strength, protocol, src, target, mapping }
        }
        RootConversion::Struct { protocol, src, target, mapping } => {
            let mapping = mapping
                .into_iter()
                .map(|(name, fc)| (name, fuse_field_conversion(fc, strengths)))
                .collect();
            lir::RootConversion::Struct { strength, protocol, src, target, mapping }
        }
        RootConversion::Variant { protocol, src, target, mapping } => {
            let mapping = mapping.into_iter().map(|m| fuse_variant_mapping(m, strengths)).collect();
            lir::RootConversion::Variant { strength, protocol, src, target, mapping }
        }
    }
}

fn fuse_field_conversion(fc: FieldConversion, strengths: &StrengthTable) -> lir::FieldConversion {
    match fc {
        FieldConversion::IntDefault { type_, value } => lir::FieldConversion::IntDefault { type_, value },
        FieldConversion::EnumDefault { type_, value } => lir::FieldConversion::EnumDefault { type_, value },
        FieldConversion::Transform { src_field, conversion } => {
            lir::FieldConversion::Transform { src_field, conversion: fuse_conversion(conversion, strengths) }
        }
    }
}

fn fuse_variant_mapping(m: VariantValueMapping, strengths: &StrengthTable) -> lir::VariantValueMapping {
    lir::VariantValueMapping {
        src: m.src,
        target: m.target.map(|(v, c)| (v, fuse_conversion(c, strengths))),
    }
}

fn fuse_conversion(c: mir::Conversion, strengths: &StrengthTable) -> lir::Conversion {
    match c {
        mir::Conversion::Identity => lir::Conversion::Identity { strength: ConversionStrength::Substitutable },
        mir::Conversion::Ref { src, target } => {
            let strength =
                *strengths.get(&(src.clone(), target.clone())).unwrap_or(&ConversionStrength::Partial);
            lir::Conversion::Ref { strength, src, target }
        }
        mir::Conversion::Unresolved { .. } => {
            unreachable!("fuse runs after conversions::resolve eliminates Unresolved")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversions::mir::Conversion;

    #[test]
    fn own_conversion_is_listed_and_identity_is_substitutable() {
        let src = QName::from_dotted("p1.A");
        let target = QName::from_dotted("p2.A");
        let mut mapping = indexmap::IndexMap::new();
        mapping.insert(
            "x".to_string(),
            FieldConversion::Transform { src_field: "x".to_string(), conversion: Conversion::Identity },
        );
        let rc = RootConversion::Struct {
            protocol: target.namespace(),
            src: src.clone(),
            target: target.clone(),
            mapping,
        };
        let order = vec![(src.clone(), target.clone())];
        let strengths = StrengthTable::new();
        let result = run(vec![rc], &order, &strengths, &target.namespace());

        assert_eq!(result.own, vec![target.clone()]);
        let fused = result.conversions.get(&src, &target).unwrap();
        match fused {
            lir::RootConversion::Struct { mapping, .. } => match &mapping["x"] {
                lir::FieldConversion::Transform { conversion, .. } => {
                    assert_eq!(conversion.strength(), ConversionStrength::Substitutable);
                }
                other => panic!("expected Transform, got {other:?}"),
            },
            other => panic!("expected Struct, got {other:?}"),
        }
    }
}
