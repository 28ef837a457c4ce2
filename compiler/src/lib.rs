//! The protocol compiler: turns a [`protocol_schema::SchemaRegistry`] entry
//! into a fully-resolved [`Protocol`], running the five pipeline stages in
//! order -- ingestion, the type pipeline, the constant compiler, the
//! conversion compiler, and namespace prefixing.
//!
//! Each stage gets its own `tracing` span so a caller running with
//! `RUST_LOG=protocol_compiler=debug` sees exactly which pass a large schema
//! is stuck in; collected [`CompileError`]s are logged at `warn` on the way
//! out, and an [`InternalError`] is logged at `error` immediately before it
//! unwinds the `expect` at the bottom of this function, since by definition
//! nothing downstream can recover from one.

pub mod constants;
pub mod conversions;
pub mod digest;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod int_model;
pub mod namespace;
pub mod protocol;
pub mod qname;
pub mod ranges;
pub mod serialize;
pub mod size;
pub mod types;

pub use error::{CompileError, InternalError};
pub use protocol::Protocol;
pub use qname::QName;

use protocol_schema::SchemaRegistry;
use tracing::{debug, warn};

/// Compiles a single protocol from `registry`, optionally mounting every
/// type, constant, and conversion it owns under `namespace`.
///
/// Errors in the input schema are collected and returned together rather
/// than failing on the first one, so a caller can report every problem in
/// one pass. An internal invariant violation (a bug in the compiler itself,
/// not a problem with the schema) panics rather than being folded into the
/// result: there is no sensible way for a caller to recover from the
/// compiler itself producing output a later pass didn't expect.
pub fn compile_protocol(
    registry: &SchemaRegistry,
    protocol_name: &str,
    namespace: Option<QName>,
) -> Result<Protocol, Vec<CompileError>> {
    let span = tracing::info_span!("compile_protocol", protocol = protocol_name);
    let _enter = span.enter();

    let ingested = {
        let _span = tracing::debug_span!("ingest").entered();
        debug!("resolving schema references and building type order");
        ingest::ingest(registry, protocol_name).inspect_err(|errors| {
            warn!(count = errors.len(), "ingestion failed");
        })?
    };

    let proto_name = ingested.protocol_name.clone();

    let types = {
        let _span = tracing::debug_span!("type_pipeline").entered();
        debug!(count = ingested.type_order.len(), "compiling types");
        types::compile(&proto_name, ingested.types, &ingested.type_order).inspect_err(
            |errors| {
                warn!(count = errors.len(), "type pipeline failed");
            },
        )?
    };

    let constants = {
        let _span = tracing::debug_span!("constant_pipeline").entered();
        debug!(count = ingested.constants.len(), "compiling constants");
        constants::compile(&proto_name, &ingested.constants).inspect_err(|errors| {
            warn!(count = errors.len(), "constant pipeline failed");
        })?
    };

    let conversions = {
        let _span = tracing::debug_span!("conversion_pipeline").entered();
        debug!(count = ingested.conversions.len(), "compiling conversions");
        conversions::compile(&proto_name, &ingested.conversions, &types).inspect_err(|errors| {
            warn!(count = errors.len(), "conversion pipeline failed");
        })?
    };

    let protocol = Protocol { name: proto_name, types, constants, conversions };

    let protocol = {
        let _span = tracing::debug_span!("namespace_prefix").entered();
        if let Some(ns) = &namespace {
            debug!(namespace = %ns, "prefixing protocol");
        }
        namespace::apply(protocol, namespace.as_ref())
    };

    Ok(protocol)
}
