//! The protocol IR: the fully-resolved, fully-annotated output of the type
//! pipeline. Every type here carries its size and triviality, and every
//! root type carries a content digest. This is what codegen (and the
//! IR-as-data serializer) consumes.

use std::collections::HashSet;

use indexmap::IndexMap;
pub use protocol_schema::{Int, Float};

use crate::qname::QName;
use crate::ranges::Range;
use crate::size::{Offset, Size};

/// A canonical textual rendering of a root type's shape, and the hash of
/// that rendering. Two root types with the same digest are
/// wire-compatible regardless of their declared name.
#[derive(Debug, Clone, PartialEq, Eq, serde_derive::Serialize)]
pub struct Digest {
    pub repr_str: String,
    pub repr_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Length {
    Fixed(u64),
    Variable(FieldReference),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldReference(pub String);

/// A type in field position, annotated with its size and whether it is
/// trivially copyable (no pointer indirection, no length dependent on
/// runtime content).
///
/// `PartialEq`/`Eq` are structural on *shape*, not on the cached `size`
/// field within each variant: `Struct`/`Variant`/`Enum` already exclude
/// their derived fields (size, offsets, tags, ranges) from equality, and
/// size elsewhere is a pure function of shape, so comparing it adds
/// nothing but never disagrees with it either. The conversion resolver's
/// `src == target` identity check relies on this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int(Int),
    Float(Float),
    Array { inner: Box<Type>, length: u64, size: Size },
    Vector { inner: Box<Type>, length: FieldReference, size: Size },
    List { inner: Box<Type>, length: Length, size: Size },
    DetachedVariant { variant: Box<Variant>, tag: FieldReference, size: Size },
    Virtual { inner: Box<Type> },
    Struct(Box<Struct>),
    Variant(Box<Variant>),
    Enum(Box<Enum>),
}

impl Type {
    pub fn size(&self) -> Size {
        match self {
            Type::Int(i) => Size::Constant(i.width as u64),
            Type::Float(f) => Size::Constant(f.width as u64),
            Type::Array { size, .. }
            | Type::Vector { size, .. }
            | Type::List { size, .. }
            | Type::DetachedVariant { size, .. } => *size,
            Type::Virtual { .. } => Size::Constant(0),
            Type::Struct(s) => s.size,
            Type::Variant(v) => v.size,
            Type::Enum(e) => e.size(),
        }
    }

    pub fn trivial(&self) -> bool {
        match self {
            Type::Int(_) | Type::Float(_) => true,
            Type::Array { inner, .. } => inner.trivial(),
            Type::Vector { .. }
            | Type::List { .. }
            | Type::DetachedVariant { .. }
            | Type::Virtual { .. } => false,
            Type::Struct(s) => s.trivial,
            Type::Variant(_) | Type::Enum(_) => false,
        }
    }
}

/// Which property of a sibling field a "master" field determines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyProperty {
    VariantTag,
    SeqLength,
}

/// A field that is not itself written to the wire independently, but whose
/// value is fully determined by another field (a sequence's length, or a
/// detached variant's tag).
#[derive(Debug, Clone)]
pub struct MasterField {
    pub master_field: String,
    pub type_: Type,
    pub key_property: KeyProperty,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub type_: Type,
    pub offset: Offset,
    pub master_field: Option<MasterField>,
}

#[derive(Debug, Clone)]
pub struct Struct {
    pub name: QName,
    pub digest: Digest,
    pub size: Size,
    pub trivial: bool,
    pub fields: IndexMap<String, Field>,
    pub tail_offset: Offset,
}

impl Struct {
    /// Fields present on the wire, i.e. not `Virtual`.
    pub fn get_non_virtual(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields
            .iter()
            .filter(|(_, f)| !matches!(f.type_, Type::Virtual { .. }))
            .map(|(n, f)| (n.as_str(), f))
    }

    /// Non-virtual fields whose size is not known at compile time.
    pub fn get_non_virtual_dynamic(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.get_non_virtual()
            .filter(|(_, f)| !f.type_.size().is_constant())
    }

    /// Fields that are not a master of any other field -- the fields a
    /// caller actually supplies, as opposed to ones the encoder derives.
    pub fn get_owned(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f)).filter(|(name, _)| {
            !self.fields.values().any(|f| {
                f.master_field.as_ref().is_some_and(|mf| mf.master_field == *name)
            })
        })
    }
}

impl PartialEq for Struct {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.digest == other.digest && self.trivial == other.trivial
    }
}
impl Eq for Struct {}

#[derive(Debug, Clone)]
pub struct Variant {
    pub name: QName,
    pub digest: Digest,
    pub size: Size,
    pub tag_type: Int,
    pub tags: IndexMap<QName, i64>,
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.digest == other.digest
    }
}
impl Eq for Variant {}

#[derive(Debug, Clone)]
pub struct Enum {
    pub name: QName,
    pub digest: Digest,
    pub underlying_type: Int,
    pub variants: IndexMap<String, i64>,
    pub valid_ranges: Vec<Range>,
}

impl Enum {
    pub fn size(&self) -> Size {
        Size::Constant(self.underlying_type.width as u64)
    }
}

impl PartialEq for Enum {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.digest == other.digest
    }
}
impl Eq for Enum {}

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
            RootType::Variant(v) => &v.name,
            RootType::Enum(e) => &e.name,
        }
    }

    pub fn digest(&self) -> &Digest {
        match self {
            RootType::Struct(s) => &s.digest,
            RootType::Variant(v) => &v.digest,
            RootType::Enum(e) => &e.digest,
        }
    }

    pub fn size(&self) -> Size {
        match self {
            RootType::Struct(s) => s.size,
            RootType::Variant(v) => v.size,
            RootType::Enum(e) => e.size(),
        }
    }

    pub fn trivial(&self) -> bool {
        match self {
            RootType::Struct(s) => s.trivial,
            RootType::Variant(_) | RootType::Enum(_) => false,
        }
    }
}

/// The fully-compiled set of types belonging to a single protocol
/// compilation, plus which of them are "owned" by this protocol versus
/// merely referenced from an external one.
#[derive(Debug, Clone)]
pub struct ProtocolTypes {
    pub types: IndexMap<QName, RootType>,
    pub own: Vec<QName>,
    pub external_protocols: HashSet<QName>,
}

impl ProtocolTypes {
    pub fn get(&self, name: &QName) -> Option<&RootType> {
        self.types.get(name)
    }
}
