//! Constant compiler: lowers a protocol's [`RootConstant`]s to the PIR
//! shape code generators consume.
//!
//! String constants pass through verbatim. Integer constants carry their
//! declared [`Int`] type plus a `Constant(width)` size and `trivial = true`
//! flag, and are range-checked against that type so an out-of-range literal
//! is rejected at compile time rather than silently truncated downstream.

use indexmap::IndexMap;
use protocol_schema::{Int, RootConstant};

use crate::error::CompileError;
use crate::int_model::representable_range;
use crate::qname::QName;
use crate::size::Size;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    Int { type_: Int, value: i64, size: Size, trivial: bool },
    String { value: String },
}

pub fn compile(
    protocol_name: &QName,
    constants: &[(QName, RootConstant)],
) -> Result<IndexMap<QName, Constant>, Vec<CompileError>> {
    let mut out = IndexMap::new();
    let mut errors = Vec::new();
    for (qname, constant) in constants {
        match constant {
            RootConstant::Int { type_, value, .. } => {
                let (lo, hi) = representable_range(type_.width, type_.sign);
                let wide = *value as i128;
                if wide < lo || wide > hi {
                    errors.push(CompileError::OutOfRange {
                        value: *value,
                        context: format!("constant {qname}"),
                    });
                    continue;
                }
                out.insert(
                    qname.clone(),
                    Constant::Int {
                        type_: *type_,
                        value: *value,
                        size: Size::Constant(type_.width as u64),
                        trivial: true,
                    },
                );
            }
            RootConstant::String { value, .. } => {
                out.insert(qname.clone(), Constant::String { value: value.clone() });
            }
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }
    // Constants declared directly by this protocol; the caller's map only
    // ever contains those anyway (external protocols' constants are never
    // threaded through by `ingest`), but this mirrors the type pipeline's
    // own/external split for anyone reading the two compilers side by side.
    let _ = protocol_name;
    Ok(out)
}
