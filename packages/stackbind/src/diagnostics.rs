//! Structured parse diagnostics.
//!
//! Every problem noticed during a parse becomes a [`ParseError`] tagged with a
//! [`Severity`] and a [`LexicalPosition`]. Diagnostics are handed to a caller
//! supplied sink as they occur; a single `Error` fails the parse, `Warning`s
//! never do.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::config::{UNKNOWN_COLUMN, UNKNOWN_LINE};
use crate::error::SharedError;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Recorded, does not fail the parse.
    Warning,
    /// Fails the parse.
    Error,
}

impl Severity {
    /// Get the string value used in reports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line/column position, optionally within a named source.
///
/// Lines and columns are 1-based. The `-1, -1` pair means "unknown".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LexicalPosition {
    line: i64,
    column: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl LexicalPosition {
    /// Create a position with no source identifier.
    #[must_use]
    pub fn new(line: i64, column: i64) -> Self {
        Self {
            line,
            column,
            source: None,
        }
    }

    /// The "unknown" sentinel position.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_LINE, UNKNOWN_COLUMN)
    }

    /// Attach a source identifier.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The 1-based line, or `-1` if unknown.
    #[must_use]
    pub fn line(&self) -> i64 {
        self.line
    }

    /// The 1-based column, or `-1` if unknown.
    #[must_use]
    pub fn column(&self) -> i64 {
        self.column
    }

    /// The source identifier, if any.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Whether this is a real position rather than the sentinel.
    #[must_use]
    pub fn is_known(&self) -> bool {
        self.line != UNKNOWN_LINE || self.column != UNKNOWN_COLUMN
    }
}

impl fmt::Display for LexicalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}:{}:{}", source, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// A single diagnostic raised during a parse.
#[derive(Debug, Clone, Serialize)]
pub struct ParseError {
    severity: Severity,
    position: LexicalPosition,
    error_code: String,
    message: String,
    attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remediating_action: Option<String>,
    #[serde(
        serialize_with = "serialize_cause",
        skip_serializing_if = "Option::is_none"
    )]
    cause: Option<SharedError>,
}

fn serialize_cause<S>(cause: &Option<SharedError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match cause {
        Some(cause) => serializer.serialize_some(&cause.to_string()),
        None => serializer.serialize_none(),
    }
}

impl ParseError {
    /// Start building a diagnostic.
    #[must_use]
    pub fn builder(severity: Severity, message: impl Into<String>) -> ParseErrorBuilder {
        ParseErrorBuilder {
            error: ParseError {
                severity,
                position: LexicalPosition::unknown(),
                error_code: String::new(),
                message: message.into(),
                attributes: BTreeMap::new(),
                remediating_action: None,
                cause: None,
            },
        }
    }

    /// The severity.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Where the problem was noticed.
    #[must_use]
    pub fn position(&self) -> &LexicalPosition {
        &self.position
    }

    /// A stable, machine-readable code such as `error-unrecognized-element`.
    #[must_use]
    pub fn error_code(&self) -> &str {
        &self.error_code
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured details (element names, handler names, ...).
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// A suggestion for fixing the problem, if one is known.
    #[must_use]
    pub fn remediating_action(&self) -> Option<&str> {
        self.remediating_action.as_deref()
    }

    /// The underlying error, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&SharedError> {
        self.cause.as_ref()
    }

    /// Whether this diagnostic fails the parse.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.position, self.message)
    }
}

/// Builder for [`ParseError`].
#[derive(Debug)]
pub struct ParseErrorBuilder {
    error: ParseError,
}

impl ParseErrorBuilder {
    /// Set the position.
    #[must_use]
    pub fn position(mut self, position: LexicalPosition) -> Self {
        self.error.position = position;
        self
    }

    /// Set the error code.
    #[must_use]
    pub fn error_code(mut self, code: impl Into<String>) -> Self {
        self.error.error_code = code.into();
        self
    }

    /// Add a structured attribute.
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.error.attributes.insert(key.into(), value.into());
        self
    }

    /// Set a remediation hint.
    #[must_use]
    pub fn remediating_action(mut self, action: impl Into<String>) -> Self {
        self.error.remediating_action = Some(action.into());
        self
    }

    /// Set the underlying cause.
    #[must_use]
    pub fn cause(mut self, cause: SharedError) -> Self {
        self.error.cause = Some(cause);
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> ParseError {
        self.error
    }
}
