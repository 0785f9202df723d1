//! Namespace-qualified type names

use serde::{Deserialize, Serialize};
use std::fmt;

/// The key every registry lookup goes through: `{namespace, name}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier {
    pub namespace: String,
    pub name: String,
}

impl Identifier {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Split a (possibly qualified) type name at its last dot.
    ///
    /// `com.example.Fortune` becomes `{com.example, Fortune}`; a bare `Fortune`
    /// gets an empty namespace that is filled in later by inheritance.
    pub fn parse(reference: &str) -> Self {
        match reference.rsplit_once('.') {
            Some((namespace, name)) => Self::new(namespace, name),
            None => Self::new("", reference),
        }
    }

    /// `namespace.name`, used in diagnostics and cycle chains
    pub fn qualified_classpath(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Package path of generated code for this type (`com/example`)
    pub fn package_path(&self) -> String {
        self.namespace.replace('.', "/")
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.namespace, self.name)
        }
    }
}
