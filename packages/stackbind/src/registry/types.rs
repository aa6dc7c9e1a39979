//! Types handed to element handlers during a parse.

use std::fmt;

use crate::config::{UNKNOWN_COLUMN, UNKNOWN_LINE};
use crate::diagnostics::LexicalPosition;
use crate::name::QualifiedName;

/// Context passed to every handler callback and factory.
///
/// Tracks the source identifier and the most recent position reported by the
/// event source.
pub struct ParseContext {
    source_id: String,
    line: i64,
    column: i64,
}

impl ParseContext {
    /// Create a context for the given source identifier, at an unknown position.
    #[must_use]
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            line: UNKNOWN_LINE,
            column: UNKNOWN_COLUMN,
        }
    }

    /// The identifier of the document being parsed.
    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// The current line, or `-1` if unknown.
    #[must_use]
    pub fn line(&self) -> i64 {
        self.line
    }

    /// The current column, or `-1` if unknown.
    #[must_use]
    pub fn column(&self) -> i64 {
        self.column
    }

    /// The current position, including the source identifier.
    #[must_use]
    pub fn position(&self) -> LexicalPosition {
        LexicalPosition::new(self.line, self.column).with_source(self.source_id.clone())
    }

    pub(crate) fn set_position(&mut self, line: i64, column: i64) {
        self.line = line;
        self.column = column;
    }
}

impl fmt::Debug for ParseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseContext")
            .field("source_id", &self.source_id)
            .field("line", &self.line)
            .field("column", &self.column)
            .finish()
    }
}

/// A single attribute of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The qualified attribute name. Unprefixed attributes have no namespace.
    pub name: QualifiedName,
    /// The unescaped value.
    pub value: String,
}

/// The attributes of an element, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<Attribute>,
}

impl Attributes {
    /// Create an empty attribute set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute.
    pub fn push(&mut self, name: QualifiedName, value: impl Into<String>) {
        self.entries.push(Attribute {
            name,
            value: value.into(),
        });
    }

    /// Add an attribute, builder style.
    #[must_use]
    pub fn with(mut self, name: QualifiedName, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// Look up an attribute value by namespace and local name.
    ///
    /// # Examples
    /// ```
    /// use stackbind::{Attributes, QualifiedName};
    ///
    /// let attributes = Attributes::new().with(QualifiedName::new("", "value"), "23");
    /// assert_eq!(attributes.get_value("", "value"), Some("23"));
    /// assert_eq!(attributes.get_value("urn:x", "value"), None);
    /// ```
    #[must_use]
    pub fn get_value(&self, namespace: &str, local_name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|a| a.name.namespace() == namespace && a.name.local_name() == local_name)
            .map(|a| a.value.as_str())
    }

    /// Look up an attribute value by qualified name.
    #[must_use]
    pub fn get(&self, name: &QualifiedName) -> Option<&str> {
        self.entries
            .iter()
            .find(|a| &a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Iterate over the attributes in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.entries.iter()
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(QualifiedName, String)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (QualifiedName, String)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, value)| Attribute { name, value })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_context_new() {
        let ctx = ParseContext::new("urn:doc");
        assert_eq!(ctx.source_id(), "urn:doc");
        assert_eq!(ctx.line(), -1);
        assert!(!ctx.position().is_known());
    }

    #[test]
    fn test_parse_context_position() {
        let mut ctx = ParseContext::new("urn:doc");
        ctx.set_position(3, 14);
        let position = ctx.position();
        assert_eq!(position.line(), 3);
        assert_eq!(position.column(), 14);
        assert_eq!(position.source(), Some("urn:doc"));
    }

    #[test]
    fn test_attributes_lookup_is_namespace_aware() {
        let attributes: Attributes = [
            (QualifiedName::new("", "id"), "plain".to_string()),
            (QualifiedName::new("urn:x", "id"), "qualified".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes.get_value("", "id"), Some("plain"));
        assert_eq!(attributes.get(&QualifiedName::new("urn:x", "id")), Some("qualified"));
        assert_eq!(attributes.get_value("", "missing"), None);
    }
}
