//! The mid-level IR: a schema lowered into a single normalized shape, before
//! any of the type-pipeline analysis passes have run. Every schema-level
//! sugar (unbound sequences, inline variant fields) is still present here;
//! the passes in [`crate::types`] progressively rewrite it away.

use indexmap::{IndexMap, IndexSet};
pub use protocol_schema::{Int, Float};

use crate::qname::QName;

/// A reference to a struct definition, by qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructRef(pub QName);

/// A reference to a variant definition (fixed or hash), by qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantRef(pub QName);

/// A reference to an enum definition, by qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumRef(pub QName);

/// A named field on the same struct, referenced by a later field in that
/// struct (for a sequence's length or a detached variant's tag).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldReference(pub String);

/// How many elements a sequence carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Length {
    Fixed(u64),
    Variable(FieldReference),
}

/// A type appearing in field position (or nested inside another such
/// type). Distinct from [`RootType`]: a `Type` is what a field *is*, a
/// `RootType` is what a top-level declaration defines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int(Int),
    Float(Float),
    /// A sequence whose element count is not yet resolved to a concrete
    /// shape; eliminated by the seq-reduce pass into `Array`/`Vector`/`List`.
    Seq { inner: Box<Type>, length: Length },
    /// A sequence whose count is itself encoded on the wire, immediately
    /// preceding it, as `length_type`; eliminated by the seq-expand pass.
    UnboundSeq { inner: Box<Type>, length_type: Int },
    /// A fixed-length sequence with a compile-time-known element count.
    Array { inner: Box<Type>, length: u64 },
    /// A variable-length sequence whose count lives in a constant-size
    /// sibling field.
    Vector { inner: Box<Type>, length: FieldReference },
    /// A variable-length sequence whose count is itself dynamically sized,
    /// or whose inner element is dynamically sized.
    List { inner: Box<Type>, length: Length },
    DetachedVariant { variant: VariantRef, tag: FieldReference },
    Virtual(Box<Type>),
    StructRef(StructRef),
    VariantRef(VariantRef),
    EnumRef(EnumRef),
}

/// A fixed-layout aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Struct {
    pub name: QName,
    pub fields: IndexMap<String, Type>,
}

/// A variant whose members each carry an explicit, author-assigned tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedVariant {
    pub name: QName,
    pub tag_type: Int,
    pub tags: IndexMap<StructRef, i64>,
}

/// A variant whose tags are derived from a digest of each member's shape.
/// Eliminated by the hash-expand pass, which rewrites it into an equivalent
/// [`FixedVariant`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashVariant {
    pub name: QName,
    pub tag_type: Int,
    pub hash_types: IndexSet<StructRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    Fixed(FixedVariant),
    Hash(HashVariant),
}

impl Variant {
    pub fn name(&self) -> &QName {
        match self {
            Variant::Fixed(v) => &v.name,
            Variant::Hash(v) => &v.name,
        }
    }

    pub fn tag_type(&self) -> &Int {
        match self {
            Variant::Fixed(v) => &v.tag_type,
            Variant::Hash(v) => &v.tag_type,
        }
    }

    /// The member structs of this variant, in declaration order.
    pub fn types(&self) -> Vec<StructRef> {
        match self {
            Variant::Fixed(v) => v.tags.keys().cloned().collect(),
            Variant::Hash(v) => v.hash_types.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enum {
    pub name: QName,
    pub underlying_type: Int,
    pub variants: IndexMap<String, i64>,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootType {
    Struct(Struct),
    Variant(Variant),
    Enum(Enum),
}

impl RootType {
    pub fn name(&self) -> &QName {
        match self {
            RootType::Struct(s) => &s.name,
            RootType::Variant(v) => v.name(),
            RootType::Enum(e) => &e.name,
        }
    }
}
