//! For each struct, finds the "master" field that determines another
//! field's value on the wire: the field carrying a detached variant's tag,
//! or the field carrying a sequence's length. Used by downstream code
//! generation to decide which fields a builder should accept directly and
//! which it should compute.
//!
//! Each field's type names at most one master (its own length or tag
//! reference), so a field cannot end up with two masters by construction.
//! Two different fields are free to share the same master (two sequences
//! reading the same length field).

use indexmap::IndexMap;

use crate::error::CompileError;
use crate::qname::QName;
use crate::types::mir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyProperty {
    VariantTag,
    SeqLength,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterField {
    pub master_field: String,
    pub key_property: KeyProperty,
}

pub fn run(
    types: &IndexMap<QName, mir::RootType>,
    type_order: &[QName],
) -> Result<IndexMap<QName, IndexMap<String, MasterField>>, Vec<CompileError>> {
    let mut result = IndexMap::new();
    let mut errors = Vec::new();
    for name in type_order {
        if let mir::RootType::Struct(s) = &types[name] {
            match master_fields(s) {
                Ok(m) => {
                    result.insert(name.clone(), m);
                }
                Err(mut e) => errors.append(&mut e),
            }
        }
    }
    if errors.is_empty() { Ok(result) } else { Err(errors) }
}

/// Map from a slave field's name (a `Vector`/`List`-carrying sequence field,
/// or a `DetachedVariant` field) to the master field that determines its
/// length or tag.
pub fn master_fields(s: &mir::Struct) -> Result<IndexMap<String, MasterField>, Vec<CompileError>> {
    let mut field_to_master: IndexMap<String, MasterField> = IndexMap::new();
    let mut errors = Vec::new();
    for (fname, ftype) in &s.fields {
        if let mir::Type::Seq { inner, .. } = ftype {
            if seq_inner_determines_a_field(inner) {
                errors.push(CompileError::SeqInnerDeterminesField {
                    context: format!("{}::{fname}", s.name),
                });
                continue;
            }
        }
        let Some(master) = references_master(ftype) else { continue };
        let entry = MasterField { master_field: master.master_field, key_property: master.key_property };
        field_to_master.insert(fname.clone(), entry);
    }
    if errors.is_empty() { Ok(field_to_master) } else { Err(errors) }
}

/// Would `t`, if it appeared as a sequence's element type, itself determine
/// the value of some sibling field (a detached variant's tag, or a nested
/// sequence's length)? A sequence has many elements, so none of its elements
/// can be the sole determiner of a single sibling field's value.
fn seq_inner_determines_a_field(t: &mir::Type) -> bool {
    match t {
        mir::Type::DetachedVariant { .. } => true,
        mir::Type::Seq { inner, length } => {
            matches!(length, mir::Length::Variable(_)) || seq_inner_determines_a_field(inner)
        }
        mir::Type::Virtual(inner) => seq_inner_determines_a_field(inner),
        _ => false,
    }
}

struct References {
    master_field: String,
    key_property: KeyProperty,
}

/// Which sibling field, if any, determines `t` (a struct field's own type,
/// at the top level) -- the field whose value `t`'s owning field is a slave
/// of.
fn references_master(t: &mir::Type) -> Option<References> {
    match t {
        mir::Type::Seq { length, .. } => match length {
            mir::Length::Fixed(_) => None,
            mir::Length::Variable(fr) => {
                Some(References { master_field: fr.0.clone(), key_property: KeyProperty::SeqLength })
            }
        },
        mir::Type::DetachedVariant { tag, .. } => {
            Some(References { master_field: tag.0.clone(), key_property: KeyProperty::VariantTag })
        }
        _ => None,
    }
}
