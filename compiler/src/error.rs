use thiserror::Error;

use crate::qname::QName;

/// A problem with the schema itself: something a protocol author wrote that
/// cannot be compiled. Carries enough context to point a user at the
/// offending declaration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("type {0} defined more than once")]
    DuplicateType(QName),

    #[error("protocol {0} defined more than once")]
    DuplicateProtocol(QName),

    #[error("constant {0} defined more than once")]
    DuplicateConstant(QName),

    #[error("type used before definition: {0}")]
    UsedBeforeDefinition(QName),

    #[error("unknown type: {0}")]
    UnknownType(QName),

    #[error("unknown protocol: {0}")]
    UnknownProtocol(QName),

    #[error("cycle detected involving type {0}")]
    TypeCycle(QName),

    #[error("cycle detected involving protocol {0}")]
    ProtocolCycle(QName),

    #[error("integer width {width} is not one of 1, 2, 4, 8 (in {context})")]
    InvalidIntWidth { width: u8, context: String },

    #[error("float width {width} is not one of 4, 8 (in {context})")]
    InvalidFloatWidth { width: u8, context: String },

    #[error("fixed length {length} must be positive (in {context})")]
    NonPositiveLength { length: i64, context: String },

    #[error("field {field} referenced by {context} is not yet defined")]
    UnknownFieldReference { field: String, context: String },

    #[error("field {field} referenced by {context} must be an integer, found {found}")]
    FieldReferenceNotInt { field: String, context: String, found: String },

    #[error("tag field {field} of detached variant {context} has type {found}, expected {expected}")]
    DetachedVariantTagTypeMismatch { field: String, context: String, expected: String, found: String },

    #[error("virtual type cannot contain another virtual type (in {context})")]
    NestedVirtual { context: String },

    #[error("variant {0} has no values")]
    EmptyVariant(QName),

    #[error("value {value} is out of range for {context}")]
    OutOfRange { value: i64, context: String },

    #[error("hash collision on tag {short_hash:#x} between {a} and {b}")]
    HashCollision { short_hash: u64, a: QName, b: QName },

    #[error("no conversion found from {src} -> {target}")]
    NoConversionFound { src: QName, target: QName },

    #[error("identity conversion not permitted: {src} -> {target}")]
    IdentityConversionDisallowed { src: QName, target: QName },

    #[error("multiple definitions of conversion {src} -> {target}")]
    DuplicateConversion { src: QName, target: QName },

    #[error("conversion {src} -> {target} may not be defined in {protocol}")]
    ConversionWrongProtocol { src: QName, target: QName, protocol: QName },

    #[error("cycle in conversion dependency graph involving: {0:?}")]
    ConversionCycle(Vec<String>),

    #[error("enum conversion {src} -> {target} leaves variant {variant} unmapped with no same-named target variant")]
    UnmappedEnumVariant { src: QName, target: QName, variant: String },

    #[error("struct conversion {src} -> {target} leaves field {field} unmapped with no same-named source field")]
    UnmappedStructField { src: QName, target: QName, field: String },

    #[error("variant conversion {src} -> {target} leaves member {member} unmapped with no matching target member")]
    UnmappedVariantMember { src: QName, target: QName, member: QName },

    #[error("no conversion resolves {src} -> {target}")]
    UnresolvedConversion { src: String, target: String },

    #[error("inner part of sequence cannot determine any fields (in {context})")]
    SeqInnerDeterminesField { context: String },

    #[error("{0}")]
    Other(String),
}

/// A violation of an invariant the compiler itself is supposed to maintain
/// by construction: reaching one of these means an earlier pass produced
/// output a later pass did not expect, not that the input schema was
/// invalid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("internal compiler error: {0}")]
pub struct InternalError(pub String);

impl InternalError {
    pub fn new(msg: impl Into<String>) -> Self {
        InternalError(msg.into())
    }
}

pub type CompileErrors = Vec<CompileError>;
