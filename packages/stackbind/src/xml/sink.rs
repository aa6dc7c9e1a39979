//! Callbacks between an XML event source and its consumer.

use std::io::BufRead;

use crate::error::EventSourceError;
use crate::name::QualifiedName;
use crate::registry::Attributes;

/// Receiver of the events of one document, in document order.
///
/// Content callbacks return `Err` to abort the parse; the source stops and
/// returns that error. The side-channel `warning` and `error` callbacks only
/// record problems. `fatal_error` is called once, right before the source
/// gives up.
pub trait ContentSink {
    /// The document started.
    fn document_started(&mut self) -> Result<(), EventSourceError> {
        Ok(())
    }

    /// A namespace declaration (`xmlns` or `xmlns:prefix`) is in scope.
    ///
    /// Called before the `element_started` of the element carrying the
    /// declaration. `prefix` is empty for the default namespace.
    fn namespace_prefix_mapped(&mut self, _prefix: &str, _uri: &str) -> Result<(), EventSourceError> {
        Ok(())
    }

    /// An element started.
    fn element_started(
        &mut self,
        name: &QualifiedName,
        attributes: &Attributes,
    ) -> Result<(), EventSourceError>;

    /// A chunk of text arrived inside the current element.
    fn characters(&mut self, text: &str) -> Result<(), EventSourceError>;

    /// The current element finished.
    fn element_finished(&mut self, name: &QualifiedName) -> Result<(), EventSourceError>;

    /// The document finished.
    fn document_finished(&mut self) -> Result<(), EventSourceError> {
        Ok(())
    }

    /// The source moved to a new line and column (both 1-based).
    fn position_changed(&mut self, _line: i64, _column: i64) {}

    /// A recoverable problem that does not affect the result.
    fn warning(&mut self, error: EventSourceError);

    /// A problem that invalidates the result. The source continues.
    fn error(&mut self, error: EventSourceError);

    /// An unrecoverable problem. The source stops after this call.
    ///
    /// # Errors
    /// Returns the error that the source should report.
    fn fatal_error(&mut self, error: EventSourceError) -> Result<(), EventSourceError>;
}

/// A producer of XML events.
pub trait EventSource {
    /// Read `input` to the end, delivering its events to `sink`.
    ///
    /// `source_id` names the document in diagnostics; it is never resolved.
    ///
    /// # Errors
    /// Returns an error if the document is malformed or `sink` aborted.
    fn parse(
        &mut self,
        source_id: &str,
        input: &mut dyn BufRead,
        sink: &mut dyn ContentSink,
    ) -> Result<(), EventSourceError>;
}
