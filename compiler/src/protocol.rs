//! The consumer contract: what a code generator actually receives from a
//! successful compilation.

use indexmap::IndexMap;

use crate::constants::Constant;
use crate::conversions::lir::ProtocolConversions;
use crate::qname::QName;
use crate::types::lir::ProtocolTypes;

/// A fully-compiled protocol: every type fused and sized, every constant
/// range-checked, every declared conversion resolved and classified.
#[derive(Debug, Clone)]
pub struct Protocol {
    pub name: QName,
    pub types: ProtocolTypes,
    pub constants: IndexMap<QName, Constant>,
    pub conversions: ProtocolConversions,
}
