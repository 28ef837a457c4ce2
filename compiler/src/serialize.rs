//! Renders a compiled [`Protocol`] as a plain `serde_json::Value` document,
//! for generators that would rather consume a structured document than walk
//! Rust types directly.
//!
//! The shapes here are deliberately not the `#[derive(Serialize)]` output of
//! the PIR types themselves -- `Size`/`Offset` in particular have a
//! specific wire shape (`{kind, value}` / `{base, offset}`) that differs
//! from their natural enum-tagged Rust serialization.

use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::conversions::lir::{
    Conversion, ConversionStrength, FieldConversion, ProtocolConversions, RootConversion,
};
use crate::protocol::Protocol;
use crate::qname::QName;
use crate::size::{Offset, Size};
use crate::types::lir::{Digest, Field, ProtocolTypes, RootType, Type};

pub fn to_json(protocol: &Protocol) -> Value {
    json!({
        "name": protocol.name.to_string(),
        "types": types_to_json(&protocol.types),
        "constants": constants_to_json(&protocol.constants),
        "conversions": conversions_to_json(&protocol.conversions),
    })
}

fn size_to_json(size: Size) -> Value {
    match size {
        Size::Constant(value) => json!({ "kind": "Constant", "value": value }),
        Size::Dynamic => json!({ "kind": "Dynamic" }),
    }
}

fn offset_to_json(offset: &Offset) -> Value {
    match offset {
        Offset::Constant(n) => json!({ "base": Value::Null, "offset": n }),
        Offset::Dynamic { after, base } => json!({ "base": after, "offset": base }),
    }
}

fn digest_to_json(digest: &Digest) -> Value {
    json!({ "repr_str": digest.repr_str, "repr_hash": digest.repr_hash })
}

fn types_to_json(types: &ProtocolTypes) -> Value {
    let mut out = serde_json::Map::new();
    for (name, root) in &types.types {
        out.insert(name.to_string(), root_type_to_json(root));
    }
    json!({
        "types": Value::Object(out),
        "own": types.own.iter().map(QName::to_string).collect::<Vec<_>>(),
        "external_protocols": types.external_protocols.iter().map(QName::to_string).collect::<Vec<_>>(),
    })
}

fn root_type_to_json(root: &RootType) -> Value {
    match root {
        RootType::Struct(s) => {
            let mut fields = serde_json::Map::new();
            for (name, field) in &s.fields {
                fields.insert(name.clone(), field_to_json(field));
            }
            json!({
                "kind": "Struct",
                "size": size_to_json(s.size),
                "trivial": s.trivial,
                "digest": digest_to_json(&s.digest),
                "fields": Value::Object(fields),
                "tail_offset": offset_to_json(&s.tail_offset),
            })
        }
        RootType::Variant(v) => {
            let mut tags = serde_json::Map::new();
            for (member, tag) in &v.tags {
                tags.insert(member.to_string(), json!(tag));
            }
            json!({
                "kind": "Variant",
                "size": size_to_json(v.size),
                "trivial": false,
                "digest": digest_to_json(&v.digest),
                "tag_type": int_to_json(v.tag_type),
                "tags": Value::Object(tags),
            })
        }
        RootType::Enum(e) => {
            let mut variants = serde_json::Map::new();
            for (name, value) in &e.variants {
                variants.insert(name.clone(), json!(value));
            }
            json!({
                "kind": "Enum",
                "size": size_to_json(e.size()),
                "trivial": false,
                "digest": digest_to_json(&e.digest),
                "underlying_type": int_to_json(e.underlying_type),
                "variants": Value::Object(variants),
                "valid_ranges": e.valid_ranges.iter().map(|r| json!({ "start": r.start, "end": r.end })).collect::<Vec<_>>(),
            })
        }
    }
}

fn field_to_json(field: &Field) -> Value {
    json!({
        "type": type_to_json(&field.type_),
        "offset": offset_to_json(&field.offset),
        "master_field": field.master_field.as_ref().map(|mf| json!({
            "master_field": mf.master_field,
            "key_property": match mf.key_property {
                crate::types::lir::KeyProperty::VariantTag => "VariantTag",
                crate::types::lir::KeyProperty::SeqLength => "SeqLength",
            },
        })),
    })
}

fn type_to_json(t: &Type) -> Value {
    match t {
        Type::Int(i) => json!({ "kind": "Int", "int": int_to_json(*i) }),
        Type::Float(f) => json!({ "kind": "Float", "width": f.width, "endianness": format!("{:?}", f.endianness) }),
        Type::Array { inner, length, size } => json!({
            "kind": "Array",
            "inner": type_to_json(inner),
            "length": length,
            "size": size_to_json(*size),
        }),
        Type::Vector { inner, length, size } => json!({
            "kind": "Vector",
            "inner": type_to_json(inner),
            "length": length.0,
            "size": size_to_json(*size),
        }),
        Type::List { inner, length, size } => json!({
            "kind": "List",
            "inner": type_to_json(inner),
            "length": length_to_json(length),
            "size": size_to_json(*size),
        }),
        Type::DetachedVariant { variant, tag, size } => json!({
            "kind": "DetachedVariant",
            "variant": root_type_to_json(&RootType::Variant((**variant).clone())),
            "tag": tag.0,
            "size": size_to_json(*size),
        }),
        Type::Virtual { inner } => json!({ "kind": "Virtual", "inner": type_to_json(inner) }),
        Type::Struct(s) => root_type_to_json(&RootType::Struct((**s).clone())),
        Type::Variant(v) => root_type_to_json(&RootType::Variant((**v).clone())),
        Type::Enum(e) => root_type_to_json(&RootType::Enum((**e).clone())),
    }
}

fn length_to_json(length: &crate::types::lir::Length) -> Value {
    match length {
        crate::types::lir::Length::Fixed(n) => json!({ "kind": "Fixed", "value": n }),
        crate::types::lir::Length::Variable(fr) => json!({ "kind": "Variable", "field": fr.0 }),
    }
}

fn int_to_json(i: protocol_schema::Int) -> Value {
    json!({
        "width": i.width,
        "sign": format!("{:?}", i.sign),
        "endianness": format!("{:?}", i.endianness),
    })
}

fn constants_to_json(constants: &IndexMap<QName, crate::constants::Constant>) -> Value {
    let mut out = serde_json::Map::new();
    for (name, constant) in constants {
        let value = match constant {
            crate::constants::Constant::Int { type_, value, size, trivial } => json!({
                "kind": "Int",
                "type": int_to_json(*type_),
                "value": value,
                "size": size_to_json(*size),
                "trivial": trivial,
            }),
            crate::constants::Constant::String { value } => json!({
                "kind": "String",
                "value": value,
            }),
        };
        out.insert(name.to_string(), value);
    }
    Value::Object(out)
}

fn conversions_to_json(conversions: &ProtocolConversions) -> Value {
    let mut entries = Vec::new();
    for src in conversions.conversions.vertices() {
        for (target, rc) in conversions.conversions.edges_from(src) {
            entries.push(json!({
                "src": src.to_string(),
                "target": target.to_string(),
                "conversion": root_conversion_to_json(rc),
            }));
        }
    }
    json!({
        "conversions": entries,
        "own": conversions.own.iter().map(QName::to_string).collect::<Vec<_>>(),
    })
}

fn strength_to_json(strength: ConversionStrength) -> Value {
    let name = match strength {
        ConversionStrength::Partial => "PARTIAL",
        ConversionStrength::Total => "TOTAL",
        ConversionStrength::Compatible => "COMPATIBLE",
        ConversionStrength::Substitutable => "SUBSTITUTABLE",
    };
    json!(name)
}

fn root_conversion_to_json(rc: &RootConversion) -> Value {
    match rc {
        RootConversion::Enum { strength, mapping, .. } => json!({
            "kind": "Enum",
            "strength": strength_to_json(*strength),
            "mapping": mapping.iter().map(|m| json!({
                "src": { "name": m.src.name, "value": m.src.value },
                "target": m.target.as_ref().map(|t| json!({ "name": t.name, "value": t.value })),
            })).collect::<Vec<_>>(),
        }),
        RootConversion::Struct { strength, mapping, .. } => {
            let mut fields = serde_json::Map::new();
            for (name, fc) in mapping {
                fields.insert(name.clone(), field_conversion_to_json(fc));
            }
            json!({
                "kind": "Struct",
                "strength": strength_to_json(*strength),
                "mapping": Value::Object(fields),
            })
        }
        RootConversion::Variant { strength, mapping, .. } => json!({
            "kind": "Variant",
            "strength": strength_to_json(*strength),
            "mapping": mapping.iter().map(|m| json!({
                "src": { "struct_name": m.src.struct_name.to_string(), "tag": m.src.tag },
                "target": m.target.as_ref().map(|(v, c)| json!({
                    "struct_name": v.struct_name.to_string(),
                    "tag": v.tag,
                    "conversion": conversion_to_json(c),
                })),
            })).collect::<Vec<_>>(),
        }),
    }
}

fn field_conversion_to_json(fc: &FieldConversion) -> Value {
    match fc {
        FieldConversion::IntDefault { type_, value } => json!({
            "kind": "IntDefault",
            "type": int_to_json(*type_),
            "value": value,
        }),
        FieldConversion::EnumDefault { type_, value } => json!({
            "kind": "EnumDefault",
            "type": type_.to_string(),
            "value": { "name": value.name, "value": value.value },
        }),
        FieldConversion::Transform { src_field, conversion } => json!({
            "kind": "Transform",
            "src_field": src_field,
            "conversion": conversion_to_json(conversion),
        }),
    }
}

fn conversion_to_json(c: &Conversion) -> Value {
    match c {
        Conversion::Identity { strength } => json!({
            "kind": "Identity",
            "strength": strength_to_json(*strength),
        }),
        Conversion::Ref { strength, src, target } => json!({
            "kind": "Ref",
            "strength": strength_to_json(*strength),
            "src": src.to_string(),
            "target": target.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap as Map;
    use std::collections::HashSet;

    #[test]
    fn empty_protocol_serializes_with_expected_top_level_shape() {
        let protocol = Protocol {
            name: QName::from_dotted("p"),
            types: ProtocolTypes { types: Map::new(), own: Vec::new(), external_protocols: HashSet::new() },
            constants: Map::new(),
            conversions: ProtocolConversions { conversions: crate::graph::Graph::new(), own: Vec::new() },
        };
        let value = to_json(&protocol);
        assert_eq!(value["name"], json!("p"));
        assert_eq!(value["types"]["types"], json!({}));
        assert_eq!(value["constants"], json!({}));
    }

    #[test]
    fn constant_size_renders_as_kind_and_value() {
        assert_eq!(size_to_json(Size::Constant(4)), json!({ "kind": "Constant", "value": 4 }));
        assert_eq!(size_to_json(Size::Dynamic), json!({ "kind": "Dynamic" }));
    }

    #[test]
    fn dynamic_offset_renders_field_name_as_base() {
        let offset = Offset::Dynamic { after: "len".to_string(), base: 2 };
        assert_eq!(offset_to_json(&offset), json!({ "base": "len", "offset": 2 }));
        assert_eq!(offset_to_json(&Offset::Constant(0)), json!({ "base": Value::Null, "offset": 0 }));
    }
}
