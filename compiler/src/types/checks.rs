//! Semantic checks over the lowered (but not yet variant/seq-expanded) MIR:
//! integer and float widths, array lengths, the field a variable-length
//! sequence or a detached variant's tag points at, virtual-in-virtual
//! nesting, and range checks on enum/fixed-variant tag values.
//!
//! Runs before [`crate::types::expand`], so a plain `VariantRef` field is
//! still a `VariantRef` here (its synthesized `DetachedVariant` form
//! doesn't need checking -- it is correct by construction).

use indexmap::IndexMap;

use crate::error::CompileError;
use crate::int_model::{representable_range, VALID_FLOAT_WIDTHS, VALID_INT_WIDTHS};
use crate::qname::QName;
use crate::types::mir;

pub fn check(types: &IndexMap<QName, mir::RootType>, type_order: &[QName]) -> Vec<CompileError> {
    let mut errors = Vec::new();
    for name in type_order {
        check_root(&types[name], types, &mut errors);
    }
    errors
}

fn check_root(root: &mir::RootType, types: &IndexMap<QName, mir::RootType>, errors: &mut Vec<CompileError>) {
    match root {
        mir::RootType::Struct(s) => {
            let mut defined_fields: IndexMap<&str, &mir::Type> = IndexMap::new();
            for (fname, ftype) in &s.fields {
                check_type(ftype, &s.name, types, &defined_fields, errors);
                defined_fields.insert(fname.as_str(), ftype);
            }
        }
        mir::RootType::Variant(v) => {
            if v.types().is_empty() {
                errors.push(CompileError::EmptyVariant(v.name().clone()));
            }
            if let mir::Variant::Fixed(fv) = v {
                for (sr, value) in &fv.tags {
                    check_range(*value, &fv.tag_type, format!("{}::{}", fv.name, sr.0), errors);
                }
            }
        }
        mir::RootType::Enum(e) => {
            for (name, value) in &e.variants {
                check_range(*value, &e.underlying_type, format!("{}::{name}", e.name), errors);
            }
        }
    }
}

fn check_type(
    t: &mir::Type,
    context: &QName,
    types: &IndexMap<QName, mir::RootType>,
    defined_fields: &IndexMap<&str, &mir::Type>,
    errors: &mut Vec<CompileError>,
) {
    match t {
        mir::Type::Int(i) => {
            if !VALID_INT_WIDTHS.contains(&i.width) {
                errors.push(CompileError::InvalidIntWidth { width: i.width, context: context.to_string() });
            }
        }
        mir::Type::Float(f) => {
            if !VALID_FLOAT_WIDTHS.contains(&f.width) {
                errors.push(CompileError::InvalidFloatWidth { width: f.width, context: context.to_string() });
            }
        }
        mir::Type::Seq { inner, length } => {
            check_type(inner, context, types, defined_fields, errors);
            match length {
                mir::Length::Fixed(n) => {
                    if *n == 0 {
                        errors.push(CompileError::NonPositiveLength {
                            length: 0,
                            context: context.to_string(),
                        });
                    }
                }
                mir::Length::Variable(fr) => check_length_field(fr, context, defined_fields, errors),
            }
        }
        mir::Type::UnboundSeq { inner, .. } => check_type(inner, context, types, defined_fields, errors),
        mir::Type::Array { .. } | mir::Type::Vector { .. } | mir::Type::List { .. } => {
            // Unreachable: these checks run before seq-reduce ever produces
            // these shapes.
        }
        mir::Type::DetachedVariant { variant, tag } => {
            match defined_fields.get(tag.0.as_str()) {
                None => {
                    errors.push(CompileError::UnknownFieldReference {
                        field: tag.0.clone(),
                        context: context.to_string(),
                    });
                }
                Some(mir::Type::Int(found)) => {
                    if let Some(mir::RootType::Variant(v)) = types.get(&variant.0) {
                        let expected = v.tag_type();
                        if found != expected {
                            errors.push(CompileError::DetachedVariantTagTypeMismatch {
                                field: tag.0.clone(),
                                context: context.to_string(),
                                expected: type_label(&mir::Type::Int(*expected)),
                                found: type_label(&mir::Type::Int(*found)),
                            });
                        }
                    }
                }
                Some(other) => {
                    errors.push(CompileError::FieldReferenceNotInt {
                        field: tag.0.clone(),
                        context: context.to_string(),
                        found: type_label(other),
                    });
                }
            }
        }
        mir::Type::Virtual(inner) => {
            check_type(inner, context, types, defined_fields, errors);
            if matches!(inner.as_ref(), mir::Type::Virtual(_)) {
                errors.push(CompileError::NestedVirtual { context: context.to_string() });
            }
        }
        mir::Type::StructRef(_) | mir::Type::EnumRef(_) | mir::Type::VariantRef(_) => {}
    }
}

fn check_length_field(
    fr: &mir::FieldReference,
    context: &QName,
    defined_fields: &IndexMap<&str, &mir::Type>,
    errors: &mut Vec<CompileError>,
) {
    match defined_fields.get(fr.0.as_str()) {
        None => {
            errors.push(CompileError::UnknownFieldReference { field: fr.0.clone(), context: context.to_string() });
        }
        Some(mir::Type::Int(_)) => {}
        Some(other) => {
            errors.push(CompileError::FieldReferenceNotInt {
                field: fr.0.clone(),
                context: context.to_string(),
                found: type_label(other),
            });
        }
    }
}

fn check_range(value: i64, int_type: &protocol_schema::Int, context: String, errors: &mut Vec<CompileError>) {
    let (lo, hi) = representable_range(int_type.width, int_type.sign);
    let value_wide = value as i128;
    if value_wide < lo || value_wide > hi {
        errors.push(CompileError::OutOfRange { value, context });
    }
}

fn type_label(t: &mir::Type) -> String {
    match t {
        mir::Type::Int(_) => "Int".to_string(),
        mir::Type::Float(_) => "Float".to_string(),
        mir::Type::Seq { .. } => "Seq".to_string(),
        mir::Type::UnboundSeq { .. } => "UnboundSeq".to_string(),
        mir::Type::Array { .. } => "Array".to_string(),
        mir::Type::Vector { .. } => "Vector".to_string(),
        mir::Type::List { .. } => "List".to_string(),
        mir::Type::DetachedVariant { .. } => "DetachedVariant".to_string(),
        mir::Type::Virtual(_) => "Virtual".to_string(),
        mir::Type::StructRef(r) => format!("StructRef({})", r.0),
        mir::Type::EnumRef(r) => format!("EnumRef({})", r.0),
        mir::Type::VariantRef(r) => format!("VariantRef({})", r.0),
    }
}

#[cfg(test)]
mod tests {
    use protocol_schema::{Endianness, Int, Sign};

    use super::*;

    fn u_int(width: u8) -> Int {
        Int { width, sign: Sign::Unsigned, endianness: Endianness::Little }
    }

    fn single_struct(fields: Vec<(&str, mir::Type)>) -> (QName, IndexMap<QName, mir::RootType>, Vec<QName>) {
        let name = QName::from_dotted("p.S");
        let mut f = IndexMap::new();
        for (n, t) in fields {
            f.insert(n.to_string(), t);
        }
        let mut types = IndexMap::new();
        types.insert(name.clone(), mir::RootType::Struct(mir::Struct { name: name.clone(), fields: f }));
        (name.clone(), types, vec![name])
    }

    #[test]
    fn bad_int_width_is_rejected() {
        let (_, types, order) = single_struct(vec![("x", mir::Type::Int(u_int(3)))]);
        let errors = check(&types, &order);
        assert_eq!(errors, vec![CompileError::InvalidIntWidth { width: 3, context: "p.S".to_string() }]);
    }

    #[test]
    fn zero_length_array_is_rejected() {
        let (_, types, order) = single_struct(vec![(
            "x",
            mir::Type::Seq { inner: Box::new(mir::Type::Int(u_int(1))), length: mir::Length::Fixed(0) },
        )]);
        let errors = check(&types, &order);
        assert_eq!(errors, vec![CompileError::NonPositiveLength { length: 0, context: "p.S".to_string() }]);
    }

    #[test]
    fn variable_length_must_reference_earlier_int_field() {
        let (_, types, order) = single_struct(vec![(
            "data",
            mir::Type::Seq {
                inner: Box::new(mir::Type::Int(u_int(1))),
                length: mir::Length::Variable(mir::FieldReference("len".to_string())),
            },
        )]);
        let errors = check(&types, &order);
        assert_eq!(
            errors,
            vec![CompileError::UnknownFieldReference { field: "len".to_string(), context: "p.S".to_string() }]
        );
    }

    #[test]
    fn virtual_of_virtual_is_rejected() {
        let (_, types, order) =
            single_struct(vec![("x", mir::Type::Virtual(Box::new(mir::Type::Virtual(Box::new(mir::Type::Int(u_int(1)))))))]);
        let errors = check(&types, &order);
        assert_eq!(errors, vec![CompileError::NestedVirtual { context: "p.S".to_string() }]);
    }

    #[test]
    fn empty_variant_is_rejected() {
        let name = QName::from_dotted("p.V");
        let mut types = IndexMap::new();
        types.insert(
            name.clone(),
            mir::RootType::Variant(mir::Variant::Fixed(mir::FixedVariant {
                name: name.clone(),
                tag_type: u_int(1),
                tags: IndexMap::new(),
            })),
        );
        let errors = check(&types, &[name.clone()]);
        assert_eq!(errors, vec![CompileError::EmptyVariant(name)]);
    }
}
