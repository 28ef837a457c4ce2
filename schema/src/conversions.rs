use serde_derive::{Deserialize, Serialize};

/// How a single target struct field is populated by a [`StructConversion`].
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub enum FieldMapping {
    /// Fill the field with a literal integer.
    IntDefault(i64),
    /// Fill the field with a named variant of an enum type.
    EnumDefault { enum_name: String, variant_name: String },
    /// Copy (recursively converting) the named field of the source struct.
    FromField(String),
}

/// A conversion between two enum types, mapping each source variant to an
/// optional target variant. A variant left unmapped is resolved implicitly
/// against a same-named target variant during ingestion; omit a mapping
/// rather than pointing `target` at `None` to opt into that.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct EnumConversion {
    pub src: String,
    pub target: String,
    pub mapping: Vec<(String, Option<String>)>,
}

/// A conversion between two struct types, keyed by target field name.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct StructConversion {
    pub src: String,
    pub target: String,
    pub mapping: Vec<(String, FieldMapping)>,
}

/// A conversion between two variant types, keyed by source member struct
/// qualified name.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct VariantConversion {
    pub src: String,
    pub target: String,
    pub mapping: Vec<(String, Option<String>)>,
}

/// An explicitly-declared conversion between two versions of a root type, or
/// an explicit declaration that none exists.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionSpec {
    NoConversion { src: String, target: String },
    Enum(EnumConversion),
    Struct(StructConversion),
    Variant(VariantConversion),
}

impl ConversionSpec {
    pub fn src(&self) -> &str {
        match self {
            ConversionSpec::NoConversion { src, .. } => src,
            ConversionSpec::Enum(c) => &c.src,
            ConversionSpec::Struct(c) => &c.src,
            ConversionSpec::Variant(c) => &c.src,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            ConversionSpec::NoConversion { target, .. } => target,
            ConversionSpec::Enum(c) => &c.target,
            ConversionSpec::Struct(c) => &c.target,
            ConversionSpec::Variant(c) => &c.target,
        }
    }
}

/// Shorthand for "convert from every type in `prior_protocol` that shares a
/// name with a type in this protocol", with `overrides` replacing the
/// synthesized conversion for any pair named in it.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct ConversionsFromPrior {
    pub prior_protocol: String,
    pub overrides: Vec<ConversionSpec>,
}

/// One entry of a protocol's conversions list.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionDecl {
    Direct(ConversionSpec),
    FromPrior(ConversionsFromPrior),
}
