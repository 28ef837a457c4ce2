//! Orders resolved root conversions so that anything a conversion's body
//! references (via [`Conversion::Ref`]) comes before it. Needed twice: the
//! strength pass must compute a referenced conversion's strength before the
//! conversion that looks it up, and the final `own` list must present
//! dependencies before dependents for the same reason code generators will
//! have.
//!
//! `(src, target)` uniquely identifies a root conversion -- ingestion
//! already rejects duplicate conversions for the same pair -- so the
//! dependency graph is keyed on that pair rather than on a separate handle
//! type.

use crate::conversions::mir::{Conversion, FieldConversion, RootConversion};
use crate::error::CompileError;
use crate::graph::Graph;
use crate::qname::QName;

pub type ConversionKey = (QName, QName);

/// Conversions in dependency order: the conversion a `Ref` points at always
/// appears before the conversion containing that `Ref`.
pub fn dependency_order(conversions: &[RootConversion]) -> Result<Vec<ConversionKey>, CompileError> {
    let mut graph: Graph<ConversionKey, ()> = Graph::new();
    for rc in conversions {
        let key = (rc.src().clone(), rc.target().clone());
        graph.add_vertex(key.clone());
        for dep in refs_of(rc) {
            graph.add_edge(key.clone(), dep, ());
        }
    }
    // `toposort` puts a vertex before everything it points at, i.e. before
    // everything it depends on; reverse that to get dependencies first.
    let mut order = graph.toposort().map_err(|cycle| {
        let mut vertices: Vec<String> =
            cycle.vertices.iter().map(|(s, t)| format!("{s} -> {t}")).collect();
        vertices.sort();
        CompileError::ConversionCycle(vertices)
    })?;
    order.reverse();
    Ok(order)
}

fn refs_of(rc: &RootConversion) -> Vec<ConversionKey> {
    match rc {
        RootConversion::Enum { .. } => Vec::new(),
        RootConversion::Struct { mapping, .. } => {
            mapping.values().filter_map(field_conversion_ref).collect()
        }
        RootConversion::Variant { mapping, .. } => mapping
            .iter()
            .filter_map(|m| m.target.as_ref().and_then(|(_, c)| conversion_ref(c)))
            .collect(),
    }
}

fn field_conversion_ref(fc: &FieldConversion) -> Option<ConversionKey> {
    match fc {
        FieldConversion::Transform { conversion, .. } => conversion_ref(conversion),
        _ => None,
    }
}

fn conversion_ref(c: &Conversion) -> Option<ConversionKey> {
    match c {
        Conversion::Ref { src, target } => Some((src.clone(), target.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enum_rc(src: &str, target: &str) -> RootConversion {
        RootConversion::Enum {
            protocol: QName::from_dotted(target).namespace(),
            src: QName::from_dotted(src),
            target: QName::from_dotted(target),
            mapping: Vec::new(),
        }
    }

    fn struct_rc_referencing(src: &str, target: &str, dep_src: &str, dep_target: &str) -> RootConversion {
        let mut mapping = indexmap::IndexMap::new();
        mapping.insert(
            "x".to_string(),
            FieldConversion::Transform {
                src_field: "x".to_string(),
                conversion: Conversion::Ref {
                    src: QName::from_dotted(dep_src),
                    target: QName::from_dotted(dep_target),
                },
            },
        );
        RootConversion::Struct {
            protocol: QName::from_dotted(target).namespace(),
            src: QName::from_dotted(src),
            target: QName::from_dotted(target),
            mapping,
        }
    }

    #[test]
    fn dependency_appears_before_dependent() {
        let dep = enum_rc("p1.E", "p2.E");
        let dependent = struct_rc_referencing("p1.S", "p2.S", "p1.E", "p2.E");
        let order = dependency_order(&[dependent, dep]).unwrap();
        let dep_pos = order.iter().position(|k| *k == (QName::from_dotted("p1.E"), QName::from_dotted("p2.E"))).unwrap();
        let dependent_pos =
            order.iter().position(|k| *k == (QName::from_dotted("p1.S"), QName::from_dotted("p2.S"))).unwrap();
        assert!(dep_pos < dependent_pos);
    }

    #[test]
    fn cycle_is_reported() {
        let a = struct_rc_referencing("p1.A", "p2.A", "p1.B", "p2.B");
        let b = struct_rc_referencing("p1.B", "p2.B", "p1.A", "p2.A");
        assert!(dependency_order(&[a, b]).is_err());
    }
}
