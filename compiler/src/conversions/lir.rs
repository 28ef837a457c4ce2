//! Fully-resolved conversions: every reference between root conversions has
//! been followed, and every conversion carries the strength it was proven
//! to have.

use indexmap::IndexMap;

use crate::graph::Graph;
use crate::qname::QName;

pub use crate::conversions::mir::{EnumValue, EnumValueMapping, VariantValue};

/// How much of the source value a conversion preserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConversionStrength {
    /// Some source values have no corresponding target value.
    Partial = 1,
    /// Every source value maps to some target value.
    Total = 2,
    /// Total, and the target can losslessly round-trip every field the
    /// source had except possibly information past the end of a struct
    /// whose target is a prefix of the source.
    Compatible = 3,
    /// Total, and conversion is a pure relabeling: identical shape, values,
    /// and field order.
    Substitutable = 4,
}

#[derive(Debug, Clone)]
pub enum Conversion {
    Identity { strength: ConversionStrength },
    Ref { strength: ConversionStrength, src: QName, target: QName },
}

impl Conversion {
    pub fn strength(&self) -> ConversionStrength {
        match self {
            Conversion::Identity { strength } | Conversion::Ref { strength, .. } => *strength,
        }
    }
}

#[derive(Debug, Clone)]
pub enum FieldConversion {
    IntDefault { type_: protocol_schema::Int, value: i64 },
    EnumDefault { type_: QName, value: EnumValue },
    Transform { src_field: String, conversion: Conversion },
}

#[derive(Debug, Clone)]
pub struct VariantValueMapping {
    pub src: VariantValue,
    pub target: Option<(VariantValue, Conversion)>,
}

#[derive(Debug, Clone)]
pub enum RootConversion {
    Enum {
        strength: ConversionStrength,
        protocol: QName,
        src: QName,
        target: QName,
        mapping: Vec<EnumValueMapping>,
    },
    Struct {
        strength: ConversionStrength,
        protocol: QName,
        src: QName,
        target: QName,
        mapping: IndexMap<String, FieldConversion>,
    },
    Variant {
        strength: ConversionStrength,
        protocol: QName,
        src: QName,
        target: QName,
        mapping: Vec<VariantValueMapping>,
    },
}

impl RootConversion {
    pub fn strength(&self) -> ConversionStrength {
        match self {
            RootConversion::Enum { strength, .. }
            | RootConversion::Struct { strength, .. }
            | RootConversion::Variant { strength, .. } => *strength,
        }
    }

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
}

/// A `(src type, target type) -> conversion` table keyed by qualified name,
/// plus the subset of conversions declared directly by this protocol.
#[derive(Debug, Clone)]
pub struct ProtocolConversions {
    pub conversions: Graph<QName, RootConversion>,
    pub own: Vec<QName>,
}

impl ProtocolConversions {
    pub fn get(&self, src: &QName, target: &QName) -> Option<&RootConversion> {
        self.conversions.get(src, target)
    }
}
