use std::fmt;

use serde_derive::{Deserialize, Serialize};

/// A dotted, fully-qualified name: a protocol name followed by zero or more
/// path segments down to the declared name of a type, constant, or
/// conversion. Two qnames are the same identity iff their parts are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    parts: Vec<String>,
}

impl QName {
    pub fn new(parts: Vec<String>) -> Self {
        assert!(!parts.is_empty(), "QName must have at least one part");
        QName { parts }
    }

    pub fn single(part: impl Into<String>) -> Self {
        QName { parts: vec![part.into()] }
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// The last path segment, e.g. the bare type name.
    pub fn name(&self) -> &str {
        self.parts.last().expect("QName is never empty")
    }

    /// Everything but the last segment, as a fresh qname. Panics if this
    /// qname has only one part (the namespace would be empty).
    pub fn namespace(&self) -> QName {
        assert!(self.parts.len() > 1, "QName has no namespace: {self}");
        QName::new(self.parts[..self.parts.len() - 1].to_vec())
    }

    /// Append `other`'s parts after this qname's parts.
    pub fn append(&self, other: &QName) -> QName {
        let mut parts = self.parts.clone();
        parts.extend(other.parts.iter().cloned());
        QName::new(parts)
    }

    /// Prepend `self` in front of `other` -- `other.prefix(self)` reads as
    /// "other, prefixed by self".
    pub fn prefix(&self, other: &QName) -> QName {
        other.append(self)
    }

    pub fn with_name(&self, name: impl Into<String>) -> QName {
        let mut parts = self.parts.clone();
        *parts.last_mut().expect("QName is never empty") = name.into();
        QName::new(parts)
    }

    pub fn from_dotted(s: &str) -> QName {
        QName::new(s.split('.').map(|p| p.to_string()).collect())
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join("."))
    }
}
