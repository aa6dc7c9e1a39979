//! Error types for stackbind.
//!
//! Handlers raise [`HandlerError`], event sources raise [`EventSourceError`],
//! the handler stack raises [`StackError`], and a whole parse that produced no
//! value ends in a [`ParseFailure`] carrying every diagnostic collected.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::diagnostics::{LexicalPosition, ParseError};
use crate::name::QualifiedName;

/// Boxed error used as the optional source of handler errors.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Shared error used as the cause of diagnostics, which may be cloned.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Error raised by an element handler callback or factory.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl HandlerError {
    /// Create an error with a message and no underlying cause.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an error with a message and an underlying cause.
    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Wrap an arbitrary error, reusing its message.
    ///
    /// Convenient with `map_err` when parsing text:
    ///
    /// ```
    /// use stackbind::HandlerError;
    ///
    /// let err = "x".parse::<u8>().map_err(HandlerError::from_error).unwrap_err();
    /// assert_eq!(err.to_string(), "invalid digit found in string");
    /// ```
    #[must_use]
    pub fn from_error<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error reported by (or raised through) an XML event source.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EventSourceError {
    message: String,
    position: Option<LexicalPosition>,
    #[source]
    source: Option<SharedError>,
}

impl EventSourceError {
    /// Create an error with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
            source: None,
        }
    }

    /// Create an error wrapping an underlying cause, reusing its message.
    #[must_use]
    pub fn from_error<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: error.to_string(),
            position: None,
            source: Some(Arc::new(error)),
        }
    }

    /// Attach the line and column at which the error occurred.
    #[must_use]
    pub fn at(mut self, line: i64, column: i64) -> Self {
        self.position = Some(LexicalPosition::new(line, column));
        self
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The position reported by the source, if any.
    #[must_use]
    pub fn position(&self) -> Option<&LexicalPosition> {
        self.position.as_ref()
    }
}

/// Invalid event source configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid source configuration: {0}")]
pub struct ConfigError(pub String);

impl From<ConfigError> for EventSourceError {
    fn from(error: ConfigError) -> Self {
        EventSourceError::from_error(error)
    }
}

/// Structural or handler error detected by the handler stack.
#[derive(Debug, Error)]
pub enum StackError {
    /// The document root has no entry in the root handler table.
    #[error("Root element {name} is not allowed here")]
    RootNotAllowed { name: QualifiedName },

    /// A handler neither accepts nor ignores a child element.
    #[error("Handler {handler} does not recognize element {name}; expected one of: {expected}")]
    UnrecognizedElement {
        handler: String,
        name: QualifiedName,
        expected: String,
    },

    /// An event arrived that requires an open element but none was open.
    #[error("Handler stack cannot be empty when receiving {event}")]
    EmptyStack { event: &'static str },

    /// A handler callback or factory failed.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl StackError {
    /// Stable error code recorded in diagnostics.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::RootNotAllowed { .. } => "error-root-element-not-allowed",
            Self::UnrecognizedElement { .. } => "error-unrecognized-element",
            Self::EmptyStack { .. } => "error-empty-stack",
            Self::Handler(_) => "error-handler",
        }
    }
}

/// Error returned when asking a document handler for a value it did not produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// Parsing failed or never finished the root element.
    #[error("Parse did not complete")]
    DidNotComplete,
}

/// Terminal failure of a parse: no value, plus every diagnostic collected.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseFailure {
    message: String,
    #[source]
    cause: Option<SharedError>,
    errors: Vec<ParseError>,
}

impl ParseFailure {
    /// Create a failure from its parts.
    #[must_use]
    pub fn new(message: impl Into<String>, cause: Option<SharedError>, errors: Vec<ParseError>) -> Self {
        Self {
            message: message.into(),
            cause,
            errors,
        }
    }

    /// The primary error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The first underlying error, if any diagnostic carried one.
    #[must_use]
    pub fn cause(&self) -> Option<&SharedError> {
        self.cause.as_ref()
    }

    /// All diagnostics, in the order they were raised.
    #[must_use]
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Take ownership of the diagnostics.
    #[must_use]
    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }
}

/// Result type alias for whole-document parses.
pub type Result<T> = std::result::Result<T, ParseFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_keeps_source() {
        let parse_err = "abc".parse::<i32>().unwrap_err();
        let err = HandlerError::with_source("bad number", parse_err);
        assert_eq!(err.to_string(), "bad number");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_root_not_allowed_display() {
        let err = StackError::RootNotAllowed {
            name: QualifiedName::new("urn:x", "doc"),
        };
        assert_eq!(err.to_string(), "Root element {urn:x}doc is not allowed here");
        assert_eq!(err.code(), "error-root-element-not-allowed");
    }

    #[test]
    fn test_unrecognized_element_display() {
        let err = StackError::UnrecognizedElement {
            handler: "Choice".to_string(),
            name: QualifiedName::new("urn:x", "b"),
            expected: "a".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Handler Choice does not recognize element {urn:x}b; expected one of: a"
        );
    }

    #[test]
    fn test_handler_variant_is_transparent() {
        let err = StackError::from(HandlerError::new("boom"));
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.code(), "error-handler");
    }

    #[test]
    fn test_event_source_error_position() {
        let err = EventSourceError::new("unexpected end").at(3, 7);
        let position = err.position().unwrap();
        assert_eq!((position.line(), position.column()), (3, 7));
    }
}
