use serde_derive::{Deserialize, Serialize};

/// The size, in bytes, of a type: either known at compile time or dependent
/// on runtime content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Size {
    Constant(u64),
    Dynamic,
}

impl Size {
    pub fn is_constant(&self) -> bool {
        matches!(self, Size::Constant(_))
    }

    pub fn as_constant(&self) -> Option<u64> {
        match self {
            Size::Constant(n) => Some(*n),
            Size::Dynamic => None,
        }
    }
}

/// The byte offset of a field within a struct. Once any preceding field has
/// a dynamic size, every following offset is itself dynamic and is instead
/// described relative to the name of the field that broke constant-folding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Offset {
    /// A compile-time-known byte offset from the start of the struct.
    Constant(u64),
    /// Unknown at compile time: `base` bytes past the end of field `after`.
    Dynamic { after: String, base: u64 },
}

impl Offset {
    pub fn zero() -> Self {
        Offset::Constant(0)
    }

    /// Advance this offset past a field named `field_name` of size
    /// `field_size`, producing the offset of the *next* field.
    pub fn add(&self, field_name: &str, field_size: Size) -> Offset {
        match (self, field_size) {
            (Offset::Constant(base), Size::Constant(sz)) => Offset::Constant(base + sz),
            (Offset::Constant(_), Size::Dynamic) => {
                Offset::Dynamic { after: field_name.to_string(), base: 0 }
            }
            (Offset::Dynamic { after, base }, Size::Constant(sz)) => {
                Offset::Dynamic { after: after.clone(), base: base + sz }
            }
            (Offset::Dynamic { .. }, Size::Dynamic) => {
                Offset::Dynamic { after: field_name.to_string(), base: 0 }
            }
        }
    }

    pub fn as_size(&self) -> Size {
        match self {
            Offset::Constant(n) => Size::Constant(*n),
            Offset::Dynamic { .. } => Size::Dynamic,
        }
    }
}

/// An accumulating sum of field sizes that, unlike [`Offset`], never
/// collapses back to a single dynamic marker: every field that contributed a
/// dynamic size is recorded by name, since digest/size computations for a
/// variant's tail need to know exactly which fields to sum at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SizeSum {
    pub base: u64,
    pub dynamic_fields: Vec<String>,
}

impl SizeSum {
    pub fn add(&mut self, field_name: &str, field_size: Size) {
        match field_size {
            Size::Constant(sz) => self.base += sz,
            Size::Dynamic => self.dynamic_fields.push(field_name.to_string()),
        }
    }

    pub fn as_size(&self) -> Size {
        if self.dynamic_fields.is_empty() {
            Size::Constant(self.base)
        } else {
            Size::Dynamic
        }
    }
}
