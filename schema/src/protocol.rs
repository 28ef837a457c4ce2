use std::collections::HashMap;

use serde_derive::{Deserialize, Serialize};

use crate::constants::RootConstant;
use crate::conversions::ConversionDecl;
use crate::types::RootTypeDef;

/// An opaque pointer back to wherever a schema producer thinks a declaration
/// "came from" (a source file and position, a generator invocation, etc).
/// The compiler never interprets this beyond echoing it in diagnostics.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct SourceLocation(pub String);

/// A declaration paired with where it came from, if the producer tracked
/// that.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Located<T> {
    pub value: T,
    pub source: Option<SourceLocation>,
}

impl<T> Located<T> {
    pub fn new(value: T) -> Self {
        Located { value, source: None }
    }

    pub fn at(value: T, source: SourceLocation) -> Self {
        Located { value, source: Some(source) }
    }
}

/// One protocol as handed to the compiler: a name plus its locally-declared
/// types, constants, and conversions. Types declared in other protocols are
/// referenced by qualified name and resolved against a [`SchemaRegistry`].
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct ProtocolSchema {
    pub name: String,
    pub types: Vec<Located<RootTypeDef>>,
    pub constants: Vec<Located<RootConstant>>,
    pub conversions: Vec<Located<ConversionDecl>>,
}

impl ProtocolSchema {
    pub fn new(name: impl Into<String>) -> Self {
        ProtocolSchema {
            name: name.into(),
            types: Vec::new(),
            constants: Vec::new(),
            conversions: Vec::new(),
        }
    }
}

/// The full set of protocols visible to a compilation: the protocol under
/// compilation plus every protocol it transitively depends on.
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    protocols: HashMap<String, ProtocolSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        SchemaRegistry::default()
    }

    pub fn insert(&mut self, schema: ProtocolSchema) {
        self.protocols.insert(schema.name.clone(), schema);
    }

    pub fn get(&self, protocol_name: &str) -> Option<&ProtocolSchema> {
        self.protocols.get(protocol_name)
    }

    pub fn protocols(&self) -> impl Iterator<Item = &ProtocolSchema> {
        self.protocols.values()
    }
}
