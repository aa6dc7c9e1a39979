//! Namespace-qualified element names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A namespace URI paired with a local name.
///
/// Two names refer to the same element type iff both fields match exactly.
/// Ordering compares the namespace first, then the local name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    namespace: String,
    local_name: String,
}

impl QualifiedName {
    /// Create a qualified name.
    ///
    /// # Examples
    /// ```
    /// use stackbind::QualifiedName;
    ///
    /// let name = QualifiedName::new("urn:tests", "int");
    /// assert_eq!(name.namespace(), "urn:tests");
    /// assert_eq!(name.local_name(), "int");
    /// assert_eq!(name.to_string(), "{urn:tests}int");
    /// ```
    #[must_use]
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    /// The namespace URI. Empty for elements in no namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The local part of the name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }
}

/// Formats the name in Clark notation (`{namespace}local`).
impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_equality_requires_both_fields() {
        let a = QualifiedName::new("urn:a", "x");
        assert_eq!(a, QualifiedName::new("urn:a", "x"));
        assert_ne!(a, QualifiedName::new("urn:b", "x"));
        assert_ne!(a, QualifiedName::new("urn:a", "y"));
    }

    #[test]
    fn test_ordering_namespace_first() {
        let names: BTreeSet<_> = [
            QualifiedName::new("urn:b", "a"),
            QualifiedName::new("urn:a", "z"),
            QualifiedName::new("urn:a", "b"),
        ]
        .into_iter()
        .collect();

        let ordered: Vec<String> = names.iter().map(ToString::to_string).collect();
        assert_eq!(ordered, vec!["{urn:a}b", "{urn:a}z", "{urn:b}a"]);
    }

    #[test]
    fn test_display_without_namespace() {
        assert_eq!(QualifiedName::new("", "root").to_string(), "root");
    }
}
