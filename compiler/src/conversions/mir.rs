//! Conversion declarations after name resolution (every `src`/`target` is a
//! [`QName`]) but before the conversion pipeline's own lowering against the
//! fused type table. This is the ingestion->conversion-pipeline boundary.

use crate::qname::QName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedFieldMapping {
    IntDefault(i64),
    EnumDefault { enum_name: QName, variant_name: String },
    FromField(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEnumConversion {
    pub src: QName,
    pub target: QName,
    pub mapping: Vec<(String, Option<String>)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStructConversion {
    pub src: QName,
    pub target: QName,
    pub mapping: Vec<(String, ResolvedFieldMapping)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVariantConversion {
    pub src: QName,
    pub target: QName,
    pub mapping: Vec<(QName, Option<QName>)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedConversionSpec {
    NoConversion { src: QName, target: QName },
    Enum(ResolvedEnumConversion),
    Struct(ResolvedStructConversion),
    Variant(ResolvedVariantConversion),
}

impl ResolvedConversionSpec {
    pub fn src(&self) -> &QName {
        match self {
            ResolvedConversionSpec::NoConversion { src, .. } => src,
            ResolvedConversionSpec::Enum(c) => &c.src,
            ResolvedConversionSpec::Struct(c) => &c.src,
            ResolvedConversionSpec::Variant(c) => &c.src,
        }
    }

    pub fn target(&self) -> &QName {
        match self {
            ResolvedConversionSpec::NoConversion { target, .. } => target,
            ResolvedConversionSpec::Enum(c) => &c.target,
            ResolvedConversionSpec::Struct(c) => &c.target,
            ResolvedConversionSpec::Variant(c) => &c.target,
        }
    }
}

/// A single value-to-value mapping inside an [`crate::conversions::lir::EnumConversion`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValueMapping {
    pub src: EnumValue,
    pub target: Option<EnumValue>,
}

/// A conversion between two specific [`crate::types::lir::Type`]s, before
/// cross-root-type references have been resolved against the dependency
/// graph.
#[derive(Debug, Clone)]
pub enum Conversion {
    Identity,
    /// Not yet known how `src` converts to `target`; resolved away by the
    /// conversions::resolve pass.
    Unresolved { src: crate::types::lir::Type, target: crate::types::lir::Type },
    /// A reference to another root type's conversion, looked up by name in
    /// the dependency graph at fuse time.
    Ref { src: QName, target: QName },
}

#[derive(Debug, Clone)]
pub enum FieldConversion {
    IntDefault { type_: protocol_schema::Int, value: i64 },
    EnumDefault { type_: QName, value: EnumValue },
    Transform { src_field: String, conversion: Conversion },
}

#[derive(Debug, Clone)]
pub struct VariantValue {
    pub struct_name: QName,
    pub tag: i64,
}

#[derive(Debug, Clone)]
pub struct VariantValueMapping {
    pub src: VariantValue,
    pub target: Option<(VariantValue, Conversion)>,
}

#[derive(Debug, Clone)]
pub enum RootConversion {
    Enum { protocol: QName, src: QName, target: QName, mapping: Vec<EnumValueMapping> },
    Struct {
        protocol: QName,
        src: QName,
        target: QName,
        mapping: indexmap::IndexMap<String, FieldConversion>,
    },
    Variant { protocol: QName, src: QName, target: QName, mapping: Vec<VariantValueMapping> },
}

impl RootConversion {
    pub fn src(&self) -> &QName {
        match self {
            RootConversion::Enum { src, .. }
            | RootConversion::Struct { src, .. }
            | RootConversion::Variant { src, .. } => src,
        }
    }

    pub fn target(&self) -> &QName {
        match self {
            RootConversion::Enum { target, .. }
            | RootConversion::Struct { target, .. }
            | RootConversion::Variant { target, .. } => target,
        }
    }

    pub fn protocol(&self) -> &QName {
        match self {
            RootConversion::Enum { protocol, .. }
            | RootConversion::Struct { protocol, .. }
            | RootConversion::Variant { protocol, .. } => protocol,
        }
    }
}
