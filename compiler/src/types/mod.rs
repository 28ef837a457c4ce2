//! The type-compilation pipeline: lowers a schema's root types into
//! [`lir::ProtocolTypes`], running every analysis and desugaring pass in
//! the order each one depends on.
//!
//! `type_order` is expected topologically sorted, leaves first -- the
//! order in which [`crate::ingest`] resolves type references.

pub mod checks;
pub mod enum_range;
pub mod expand;
pub mod fuse;
pub mod hash_expand;
pub mod lir;
pub mod master_fields;
pub mod mir;
pub mod own;
pub mod seq_reduce;
pub mod size_pass;

use indexmap::IndexMap;

use crate::error::CompileError;
use crate::qname::QName;

pub fn compile(
    proto_name: &QName,
    types: IndexMap<QName, mir::RootType>,
    type_order: &[QName],
) -> Result<lir::ProtocolTypes, Vec<CompileError>> {
    let mut types = types;

    let errors = checks::check(&types, type_order);
    if !errors.is_empty() {
        return Err(errors);
    }

    expand::variant_expand(&mut types, type_order);
    expand::seq_expand(&mut types, type_order);

    let master_field_map = master_fields::run(&types, type_order)?;
    let digest_map = hash_expand::run(&mut types, type_order)?;
    let size_map = size_pass::run(&types, type_order);
    let enum_ranges = enum_range::run(&types, type_order);
    seq_reduce::run(&mut types, type_order, &size_map);
    let (own, external_protocols) = own::run(proto_name, type_order);

    Ok(fuse::run(
        &types,
        type_order,
        &master_field_map,
        &digest_map,
        &size_map,
        &enum_ranges,
        own,
        external_protocols,
    ))
}
