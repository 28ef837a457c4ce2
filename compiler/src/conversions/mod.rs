//! The conversion-compilation pipeline: turns the conversions a protocol
//! declares (already name-resolved by [`crate::ingest`]) into
//! [`lir::ProtocolConversions`], in the order lower -> expand -> resolve ->
//! order dependencies -> classify strength -> fuse.

pub mod deps;
pub mod expand;
pub mod fuse;
pub mod lir;
pub mod lower;
pub mod mir;
pub mod resolve;
pub mod strength;

use crate::error::CompileError;
use crate::qname::QName;
use crate::types::lir::ProtocolTypes;

pub fn compile(
    proto_name: &QName,
    specs: &[mir::ResolvedConversionSpec],
    types: &ProtocolTypes,
) -> Result<lir::ProtocolConversions, Vec<CompileError>> {
    let lowered = lower::lower(proto_name, specs, types)?;
    let expanded = expand::expand(lowered, types)?;
    let resolved = resolve::resolve(expanded)?;

    let order = deps::dependency_order(&resolved).map_err(|e| vec![e])?;
    let strengths = strength::classify(&resolved, &order, types);

    Ok(fuse::run(resolved, &order, &strengths, proto_name))
}
