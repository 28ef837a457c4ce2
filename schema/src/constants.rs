use serde_derive::{Deserialize, Serialize};

use crate::types::Int;

/// A named, protocol-level constant value, independent of any struct field.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub enum RootConstant {
    Int {
        name: String,
        #[serde(rename = "type")]
        type_: Int,
        value: i64,
    },
    String {
        name: String,
        value: String,
    },
}

impl RootConstant {
    pub fn name(&self) -> &str {
        match self {
            RootConstant::Int { name, .. } => name,
            RootConstant::String { name, .. } => name,
        }
    }
}
