use serde_derive::{Deserialize, Serialize};

/// Signedness of an integral type.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum Sign {
    Unsigned,
    Signed,
}

/// Byte order of a multi-byte scalar on the wire.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum Endianness {
    Big,
    Little,
}

/// A fixed-width integer. `width` is in bytes and must be one of 1, 2, 4, 8.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub struct Int {
    pub width: u8,
    pub sign: Sign,
    pub endianness: Endianness,
}

/// An IEEE-754 floating point type. `width` must be one of 4 or 8.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub struct Float {
    pub width: u8,
    pub endianness: Endianness,
}

/// A reference to a previously-declared field on the same struct, used by
/// variable-length sequences and detached variants to name the field that
/// carries their length or tag.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct FieldPath(pub String);

/// How many elements a [`Type::Seq`] carries.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub enum SeqLength {
    /// A compile-time-known element count.
    Fixed(u64),
    /// The count is read from an already-declared sibling field.
    FieldRef(FieldPath),
    /// The count is itself encoded on the wire immediately before the
    /// sequence, as an integer of the given type; ingestion synthesizes the
    /// carrier field.
    Prefixed(Int),
}

/// A reference to a variant-shaped root type, disambiguating the two variant
/// flavors since only a plain [`VariantDef`] (not a hash variant) may back a
/// [`Type::DetachedVariant`] in most protocols, but both are legal targets
/// for a tagged field.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub enum VariantRef {
    Variant(String),
    HashVariant(String),
}

/// The type of a struct field, or of the element type of a sequence.
///
/// References to other root type definitions (struct/enum/variant/hash
/// variant) are carried by name; ingestion resolves them against the
/// protocol under compilation and its transitive dependencies.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub enum Type {
    Int(Int),
    Float(Float),
    Seq {
        inner: Box<Type>,
        length: SeqLength,
    },
    /// A field whose on-the-wire shape is chosen by a tag carried in an
    /// earlier field.
    DetachedVariant {
        variant: VariantRef,
        tag: FieldPath,
    },
    /// A field present in the in-memory representation but absent from the
    /// wire encoding (e.g. a cached derived value).
    Virtual {
        inner: Box<Type>,
    },
    StructRef(String),
    EnumRef(String),
    VariantRef(String),
    HashVariantRef(String),
}

/// One field of a [`StructDef`], in declaration order.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct StructField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: Type,
}

/// A fixed-layout aggregate, the most common root type.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<StructField>,
}

/// A named integral domain: a fixed underlying width plus a closed set of
/// legal values.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct EnumDef {
    pub name: String,
    pub underlying: Int,
    pub variants: Vec<(String, i64)>,
}

/// A tagged union over a fixed, explicitly-assigned set of member structs.
/// `variants` maps each member struct's qualified name to its wire tag.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct VariantDef {
    pub name: String,
    pub tag_type: Int,
    pub variants: Vec<(String, i64)>,
}

/// A tagged union whose tags are derived from a content digest of each
/// member struct rather than assigned explicitly.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct HashVariantDef {
    pub name: String,
    pub tag_type: Int,
    pub hash_types: Vec<String>,
}

/// The closed set of things that can be the top-level subject of a type
/// definition in a protocol.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub enum RootTypeDef {
    Struct(StructDef),
    Enum(EnumDef),
    Variant(VariantDef),
    HashVariant(HashVariantDef),
}

impl RootTypeDef {
    pub fn name(&self) -> &str {
        match self {
            RootTypeDef::Struct(d) => &d.name,
            RootTypeDef::Enum(d) => &d.name,
            RootTypeDef::Variant(d) => &d.name,
            RootTypeDef::HashVariant(d) => &d.name,
        }
    }
}
