//! Schema producer contract.
//!
//! This crate contains the pure data structures a schema producer builds to
//! describe a wire-format protocol: primitive types, aggregate type
//! definitions, constants, and cross-version conversions. It contains no
//! parsing, no file I/O, and no code generation logic -- it is the object
//! graph the compiler crate ingests.

pub mod constants;
pub mod conversions;
pub mod protocol;
pub mod types;

pub use constants::*;
pub use conversions::*;
pub use protocol::*;
pub use types::*;
