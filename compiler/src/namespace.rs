//! The final pipeline stage: rewrites every root-type QName appearing
//! anywhere in a compiled [`crate::protocol::Protocol`] by prefixing it with
//! a caller-supplied namespace. External protocol names are prefixed too,
//! since a downstream generator mounting this protocol under a namespace
//! needs every reference it emits to resolve the same way.
//!
//! Structural digests (`repr_str`/`repr_hash`) are deliberately left
//! untouched: they were already computed by the type pipeline's fuse step
//! and describe wire shape, not naming, so two structurally identical types
//! compare equal by digest regardless of which namespace either one is
//! mounted under.
//!
//! A namespace of `None` is a no-op -- there is no public way to construct
//! a genuinely empty [`QName`] (its constructor asserts a nonempty part
//! list), so "no namespace" is modeled as the absence of one rather than as
//! an empty one.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::conversions::lir::{
    Conversion as ConvConversion, FieldConversion as ConvFieldConversion, ProtocolConversions,
    RootConversion, VariantValueMapping,
};
use crate::graph::Graph;
use crate::protocol::Protocol;
use crate::qname::QName;
use crate::types::lir::{Enum, Field, MasterField, ProtocolTypes, RootType, Struct, Type, Variant};

pub fn apply(mut protocol: Protocol, namespace: Option<&QName>) -> Protocol {
    let Some(ns) = namespace else { return protocol };

    protocol.name = protocol.name.prefix(ns);
    protocol.types = rename_types(protocol.types, ns);
    protocol.constants =
        protocol.constants.into_iter().map(|(name, c)| (name.prefix(ns), c)).collect();
    protocol.conversions = rename_conversions(protocol.conversions, ns);
    protocol
}

fn rename_types(types: ProtocolTypes, ns: &QName) -> ProtocolTypes {
    let renamed: IndexMap<QName, RootType> = types
        .types
        .into_iter()
        .map(|(name, root)| (name.prefix(ns), rename_root_type(root, ns)))
        .collect();
    let own = types.own.into_iter().map(|n| n.prefix(ns)).collect();
    let external_protocols: HashSet<QName> =
        types.external_protocols.into_iter().map(|n| n.prefix(ns)).collect();
    ProtocolTypes { types: renamed, own, external_protocols }
}

fn rename_root_type(root: RootType, ns: &QName) -> RootType {
    match root {
        RootType::Struct(s) => RootType::Struct(rename_struct(s, ns)),
        RootType::Variant(v) => RootType::Variant(rename_variant(v, ns)),
        RootType::Enum(e) => RootType::Enum(rename_enum(e, ns)),
    }
}

fn rename_struct(mut s: Struct, ns: &QName) -> Struct {
    s.name = s.name.prefix(ns);
    for field in s.fields.values_mut() {
        rename_field(field, ns);
    }
    s
}

fn rename_field(field: &mut Field, ns: &QName) {
    rename_type(&mut field.type_, ns);
    if let Some(mf) = &mut field.master_field {
        rename_master_field(mf, ns);
    }
}

fn rename_master_field(mf: &mut MasterField, ns: &QName) {
    rename_type(&mut mf.type_, ns);
}

fn rename_variant(mut v: Variant, ns: &QName) -> Variant {
    v.name = v.name.prefix(ns);
    v.tags = v.tags.into_iter().map(|(member, tag)| (member.prefix(ns), tag)).collect();
    v
}

fn rename_enum(mut e: Enum, ns: &QName) -> Enum {
    e.name = e.name.prefix(ns);
    e
}

fn rename_type(t: &mut Type, ns: &QName) {
    match t {
        Type::Int(_) | Type::Float(_) => {}
        Type::Array { inner, .. } | Type::Vector { inner, .. } | Type::List { inner, .. } => {
            rename_type(inner, ns)
        }
        Type::DetachedVariant { variant, .. } => {
            **variant = rename_variant((**variant).clone(), ns);
        }
        Type::Virtual { inner } => rename_type(inner, ns),
        Type::Struct(s) => {
            **s = rename_struct((**s).clone(), ns);
        }
        Type::Variant(v) => {
            **v = rename_variant((**v).clone(), ns);
        }
        Type::Enum(e) => {
            **e = rename_enum((**e).clone(), ns);
        }
    }
}

fn rename_conversions(conversions: ProtocolConversions, ns: &QName) -> ProtocolConversions {
    let triples: Vec<(QName, QName, RootConversion)> = conversions
        .conversions
        .vertices()
        .flat_map(|from| {
            conversions
                .conversions
                .edges_from(from)
                .map(move |(to, label)| (from.clone(), to.clone(), label.clone()))
        })
        .collect();

    let mut graph: Graph<QName, RootConversion> = Graph::new();
    for v in conversions.conversions.vertices() {
        graph.add_vertex(v.clone().prefix(ns));
    }
    for (from, to, rc) in triples {
        graph.add_edge(from.prefix(ns), to.prefix(ns), rename_root_conversion(rc, ns));
    }

    let own = conversions.own.into_iter().map(|n| n.prefix(ns)).collect();
    ProtocolConversions { conversions: graph, own }
}

fn rename_root_conversion(rc: RootConversion, ns: &QName) -> RootConversion {
    match rc {
        RootConversion::Enum { strength, protocol, src, target, mapping } => RootConversion::Enum {
            strength,
            protocol: protocol.prefix(ns),
            src: src.prefix(ns),
            target: target.prefix(ns),
            mapping,
        },
        RootConversion::Struct { strength, protocol, src, target, mapping } => {
            let mapping = mapping
                .into_iter()
                .map(|(name, fc)| (name, rename_field_conversion(fc, ns)))
                .collect();
            RootConversion::Struct {
                strength,
                protocol: protocol.prefix(ns),
                src: src.prefix(ns),
                target: target.prefix(ns),
                mapping,
            }
        }
        RootConversion::Variant { strength, protocol, src, target, mapping } => {
            let mapping = mapping.into_iter().map(|m| rename_variant_mapping(m, ns)).collect();
            RootConversion::Variant {
                strength,
                protocol: protocol.prefix(ns),
                src: src.prefix(ns),
                target: target.prefix(ns),
                mapping,
            }
        }
    }
}

fn rename_field_conversion(fc: ConvFieldConversion, ns: &QName) -> ConvFieldConversion {
    match fc {
        ConvFieldConversion::IntDefault { type_, value } => {
            ConvFieldConversion::IntDefault { type_, value }
        }
        ConvFieldConversion::EnumDefault { type_, value } => {
            ConvFieldConversion::EnumDefault { type_: type_.prefix(ns), value }
        }
        ConvFieldConversion::Transform { src_field, conversion } => {
            ConvFieldConversion::Transform { src_field, conversion: rename_conversion(conversion, ns) }
        }
    }
}

fn rename_variant_mapping(m: VariantValueMapping, ns: &QName) -> VariantValueMapping {
    VariantValueMapping {
        src: crate::conversions::lir::VariantValue { struct_name: m.src.struct_name.prefix(ns), tag: m.src.tag },
        target: m.target.map(|(v, c)| {
            (
                crate::conversions::lir::VariantValue { struct_name: v.struct_name.prefix(ns), tag: v.tag },
                rename_conversion(c, ns),
            )
        }),
    }
}

fn rename_conversion(c: ConvConversion, ns: &QName) -> ConvConversion {
    match c {
        ConvConversion::Identity { strength } => ConvConversion::Identity { strength },
        ConvConversion::Ref { strength, src, target } => {
            ConvConversion::Ref { strength, src: src.prefix(ns), target: target.prefix(ns) }
        }
    }
}
