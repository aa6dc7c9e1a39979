//! Document-level parsing.
//!
//! A [`DocumentHandler`] connects an [`EventSource`] to a [`ParseEngine`] and
//! turns every problem into a [`ParseError`] delivered to a caller-supplied
//! sink. [`parse`] and [`parse_with`] run a whole document and return either
//! the root value or a [`ParseFailure`] holding every diagnostic.

use std::io::BufRead;
use std::sync::Arc;

use crate::config::INITIAL_ERROR_CAPACITY;
use crate::diagnostics::{LexicalPosition, ParseError, Severity};
use crate::error::{
    DocumentError, EventSourceError, ParseFailure, Result, SharedError, StackError,
};
use crate::name::QualifiedName;
use crate::registry::{Attributes, ElementRegistry, HandlerFactory, ParseEngine};
use crate::xml::{ContentSink, EventSource, QuickXmlSource};

/// Records diagnostics and the failed flag on behalf of a content sink.
pub(crate) struct Recorder<E> {
    source_id: String,
    sink: E,
    failed: bool,
}

impl<E: FnMut(ParseError)> Recorder<E> {
    pub(crate) fn new(source_id: impl Into<String>, sink: E) -> Self {
        Self {
            source_id: source_id.into(),
            sink,
            failed: false,
        }
    }

    pub(crate) fn failed(&self) -> bool {
        self.failed
    }

    pub(crate) fn record(&mut self, error: ParseError) {
        if error.is_error() {
            self.failed = true;
        }
        (self.sink)(error);
    }

    /// Position reported by a source error, falling back to `current`.
    fn source_position(&self, error: &EventSourceError, current: LexicalPosition) -> LexicalPosition {
        match error.position() {
            Some(position) => position.clone().with_source(self.source_id.clone()),
            None => current,
        }
    }

    pub(crate) fn source_problem(
        &mut self,
        severity: Severity,
        error: EventSourceError,
        current: LexicalPosition,
    ) {
        let code = match severity {
            Severity::Warning => "warning-source",
            Severity::Error => "error-source",
        };
        let position = self.source_position(&error, current);
        let diagnostic = ParseError::builder(severity, error.message())
            .position(position)
            .error_code(code)
            .cause(Arc::new(error))
            .build();
        self.record(diagnostic);
    }

    /// Record an engine error. Only a broken event sequence aborts the source.
    pub(crate) fn stack_error(
        &mut self,
        error: StackError,
        element: Option<&QualifiedName>,
        position: LexicalPosition,
    ) -> std::result::Result<(), EventSourceError> {
        let message = error.to_string();
        let mut builder = ParseError::builder(Severity::Error, message.as_str())
            .position(position)
            .error_code(error.code());
        if let Some(element) = element {
            builder = builder.attribute("element", element.to_string());
        }

        let abort = match error {
            StackError::RootNotAllowed { .. } => {
                builder = builder.remediating_action(
                    "Check that the document root element and its namespace are supported",
                );
                false
            }
            StackError::UnrecognizedElement {
                handler, expected, ..
            } => {
                builder = builder
                    .remediating_action(format!("Use one of the expected elements: {expected}"))
                    .attribute("handler", handler)
                    .attribute("expected", expected);
                false
            }
            StackError::EmptyStack { event } => {
                builder = builder.attribute("event", event);
                true
            }
            StackError::Handler(error) => {
                builder = builder.cause(Arc::new(error));
                false
            }
        };

        self.record(builder.build());
        if abort {
            Err(EventSourceError::new(message))
        } else {
            Ok(())
        }
    }
}

/// Content sink parsing a document through a flat table of root handlers.
///
/// Diagnostics are handed to the sink closure as they occur. A document
/// handler is good for one document.
pub struct DocumentHandler<T, E> {
    engine: ParseEngine<T>,
    recorder: Recorder<E>,
}

impl<T: 'static> DocumentHandler<T, fn(ParseError)> {
    /// Start building a document handler.
    #[must_use]
    pub fn builder() -> DocumentHandlerBuilder<T> {
        DocumentHandlerBuilder::new()
    }
}

impl<T: 'static, E: FnMut(ParseError)> DocumentHandler<T, E> {
    /// Create a document handler.
    ///
    /// # Arguments
    /// * `source_id` - Identifier of the document, used in diagnostics only
    /// * `root_handlers` - Factories for the element names allowed as the root
    /// * `sink` - Receiver of diagnostics
    pub fn new(source_id: impl Into<String>, root_handlers: ElementRegistry<T>, sink: E) -> Self {
        let source_id = source_id.into();
        Self {
            engine: ParseEngine::new(source_id.clone(), root_handlers),
            recorder: Recorder::new(source_id, sink),
        }
    }

    /// The value of the root element.
    ///
    /// # Errors
    /// Returns [`DocumentError::DidNotComplete`] if any error was recorded or
    /// the root element never finished.
    pub fn result(&self) -> std::result::Result<&T, DocumentError> {
        if self.failed() {
            return Err(DocumentError::DidNotComplete);
        }
        self.engine.result().ok_or(DocumentError::DidNotComplete)
    }

    /// Consume the handler, returning the root value if parsing succeeded.
    #[must_use]
    pub fn into_result(self) -> Option<T> {
        if self.failed() {
            return None;
        }
        self.engine.into_result()
    }

    /// Whether any error was recorded.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.recorder.failed() || self.engine.failed()
    }

    /// The last position reported by the event source.
    #[must_use]
    pub fn position(&self) -> LexicalPosition {
        self.engine.context().position()
    }
}

impl<T: 'static, E: FnMut(ParseError)> ContentSink for DocumentHandler<T, E> {
    fn element_started(
        &mut self,
        name: &QualifiedName,
        attributes: &Attributes,
    ) -> std::result::Result<(), EventSourceError> {
        match self.engine.element_started(name, attributes) {
            Ok(()) => Ok(()),
            Err(err) => {
                let position = self.position();
                self.recorder.stack_error(err, Some(name), position)
            }
        }
    }

    fn characters(&mut self, text: &str) -> std::result::Result<(), EventSourceError> {
        match self.engine.characters(text) {
            Ok(()) => Ok(()),
            Err(err) => {
                let position = self.position();
                self.recorder.stack_error(err, None, position)
            }
        }
    }

    fn element_finished(&mut self, name: &QualifiedName) -> std::result::Result<(), EventSourceError> {
        match self.engine.element_finished(name) {
            Ok(()) => Ok(()),
            Err(err) => {
                let position = self.position();
                self.recorder.stack_error(err, Some(name), position)
            }
        }
    }

    fn position_changed(&mut self, line: i64, column: i64) {
        self.engine.set_position(line, column);
    }

    fn warning(&mut self, error: EventSourceError) {
        tracing::warn!(error = %error, "Warning from XML source");
        let position = self.position();
        self.recorder.source_problem(Severity::Warning, error, position);
    }

    fn error(&mut self, error: EventSourceError) {
        let position = self.position();
        self.recorder.source_problem(Severity::Error, error, position);
    }

    fn fatal_error(&mut self, error: EventSourceError) -> std::result::Result<(), EventSourceError> {
        let position = self.position();
        self.recorder.source_problem(Severity::Error, error.clone(), position);
        Err(error)
    }
}

/// Builder for [`DocumentHandler`].
pub struct DocumentHandlerBuilder<T> {
    handlers: ElementRegistry<T>,
}

impl<T: 'static> DocumentHandlerBuilder<T> {
    /// Create a builder with no root handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: ElementRegistry::new(),
        }
    }

    /// Allow `name` as the root element, handled by `factory`.
    #[must_use]
    pub fn add_handler(mut self, name: QualifiedName, factory: HandlerFactory<T>) -> Self {
        self.handlers.register(name, factory);
        self
    }

    /// Disallow `name` as the root element.
    #[must_use]
    pub fn remove_handler(mut self, name: &QualifiedName) -> Self {
        self.handlers.remove(name);
        self
    }

    /// Build a handler for one document.
    pub fn build<E: FnMut(ParseError)>(
        &self,
        source_id: impl Into<String>,
        sink: E,
    ) -> DocumentHandler<T, E> {
        DocumentHandler::new(source_id, self.handlers.clone(), sink)
    }
}

impl<T: 'static> Default for DocumentHandlerBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a document with [`QuickXmlSource`] and the default configuration.
///
/// # Errors
/// Returns a [`ParseFailure`] holding every diagnostic if the document did
/// not produce a value.
pub fn parse<T: 'static>(
    source_id: &str,
    input: impl BufRead,
    root_handlers: ElementRegistry<T>,
) -> Result<T> {
    parse_with(source_id, input, || Ok(QuickXmlSource::new()), root_handlers)
}

/// Parse a document held in memory.
///
/// # Errors
/// See [`parse`].
pub fn parse_str<T: 'static>(
    source_id: &str,
    document: &str,
    root_handlers: ElementRegistry<T>,
) -> Result<T> {
    parse(source_id, document.as_bytes(), root_handlers)
}

/// Parse a document with an event source obtained from `source_factory`.
///
/// # Arguments
/// * `source_id` - Identifier of the document, used in diagnostics only
/// * `input` - The document bytes
/// * `source_factory` - Creates the event source for this parse
/// * `root_handlers` - Factories for the element names allowed as the root
///
/// # Errors
/// Returns a [`ParseFailure`] holding every diagnostic, in the order raised,
/// if any error was recorded or no root value was produced.
pub fn parse_with<T, S, F>(
    source_id: &str,
    mut input: impl BufRead,
    source_factory: F,
    root_handlers: ElementRegistry<T>,
) -> Result<T>
where
    T: 'static,
    S: EventSource,
    F: FnOnce() -> std::result::Result<S, EventSourceError>,
{
    let mut errors = Vec::with_capacity(INITIAL_ERROR_CAPACITY);
    let mut handler = DocumentHandler::new(source_id, root_handlers, |e| errors.push(e));
    let outcome = source_factory()
        .and_then(|mut source| source.parse(source_id, &mut input, &mut handler));
    let position = handler.position();
    let value = handler.into_result();
    conclude(source_id, outcome, position, value, errors)
}

/// Turn the end state of a parse into its result.
pub(crate) fn conclude<T>(
    source_id: &str,
    outcome: std::result::Result<(), EventSourceError>,
    last_position: LexicalPosition,
    value: Option<T>,
    mut errors: Vec<ParseError>,
) -> Result<T> {
    if let Err(err) = outcome {
        tracing::error!(source = source_id, error = %err, "Error encountered during parsing");
        let position = match err.position() {
            Some(position) => position.clone().with_source(source_id),
            None => last_position,
        };
        let message = err.message().to_string();
        let cause: SharedError = Arc::new(err);
        errors.push(
            ParseError::builder(Severity::Error, message)
                .position(position)
                .error_code("error-source")
                .cause(Arc::clone(&cause))
                .build(),
        );
        return Err(failure(errors, Some(cause)));
    }

    match value {
        Some(value) => {
            tracing::debug!(source = source_id, warnings = errors.len(), "Parse completed");
            Ok(value)
        }
        None => {
            if !errors.iter().any(ParseError::is_error) {
                errors.push(
                    ParseError::builder(Severity::Error, DocumentError::DidNotComplete.to_string())
                        .position(last_position)
                        .error_code("error-did-not-complete")
                        .build(),
                );
            }
            tracing::error!(source = source_id, errors = errors.len(), "Parse failed");
            let cause = errors
                .iter()
                .find(|e| e.is_error())
                .and_then(|e| e.cause().cloned());
            Err(failure(errors, cause))
        }
    }
}

/// Build the failure; `cause` is the error that stopped the parse.
fn failure(errors: Vec<ParseError>, cause: Option<SharedError>) -> ParseFailure {
    let message = errors
        .iter()
        .find(|e| e.is_error())
        .map_or_else(|| DocumentError::DidNotComplete.to_string(), |e| e.message().to_string());
    ParseFailure::new(message, cause, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::builders::for_scalar_from_string;
    use crate::error::HandlerError;

    const NS: &str = "urn:tests";

    fn qn(local: &str) -> QualifiedName {
        QualifiedName::new(NS, local)
    }

    fn int_roots() -> ElementRegistry<i32> {
        ElementRegistry::new().with(qn("int"), for_scalar_from_string(qn("int"), str::parse::<i32>))
    }

    #[test]
    fn test_document_handler_success() {
        let mut errors = Vec::new();
        let mut handler = DocumentHandler::new("urn:doc", int_roots(), |e| errors.push(e));
        handler.position_changed(1, 5);
        handler.element_started(&qn("int"), &Attributes::new()).unwrap();
        handler.characters("23").unwrap();
        handler.element_finished(&qn("int")).unwrap();

        assert!(!handler.failed());
        assert_eq!(handler.result(), Ok(&23));
        assert_eq!(handler.into_result(), Some(23));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_document_handler_records_root_rejection() {
        let mut errors = Vec::new();
        let mut handler = DocumentHandler::new("urn:doc", int_roots(), |e| errors.push(e));
        handler.position_changed(1, 10);
        handler.element_started(&qn("byte"), &Attributes::new()).unwrap();

        assert!(handler.failed());
        assert_eq!(handler.result(), Err(DocumentError::DidNotComplete));
        drop(handler);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_code(), "error-root-element-not-allowed");
        assert_eq!(errors[0].position().line(), 1);
        assert_eq!(errors[0].position().column(), 10);
        assert_eq!(errors[0].position().source(), Some("urn:doc"));
        assert_eq!(errors[0].attributes()["element"], "{urn:tests}byte");
    }

    #[test]
    fn test_document_handler_empty_stack_aborts() {
        let mut errors = Vec::new();
        let mut handler = DocumentHandler::new("urn:doc", int_roots(), |e| errors.push(e));
        assert!(handler.characters("stray").is_err());
        drop(handler);
        assert_eq!(errors[0].error_code(), "error-empty-stack");
    }

    #[test]
    fn test_document_handler_source_problems() {
        let mut errors = Vec::new();
        let mut handler = DocumentHandler::new("urn:doc", int_roots(), |e| errors.push(e));
        handler.warning(EventSourceError::new("odd"));
        assert!(!handler.failed());
        handler.error(EventSourceError::new("bad").at(3, 4));
        assert!(handler.failed());
        assert!(handler.fatal_error(EventSourceError::new("worse")).is_err());
        drop(handler);

        let summary: Vec<(Severity, &str)> = errors
            .iter()
            .map(|e| (e.severity(), e.message()))
            .collect();
        assert_eq!(
            summary,
            vec![(Severity::Warning, "odd"), (Severity::Error, "bad"), (Severity::Error, "worse")]
        );
        assert_eq!(errors[1].position().line(), 3);
        assert_eq!(errors[2].position().line(), -1);
    }

    #[test]
    fn test_builder_add_and_remove() {
        let builder = DocumentHandler::<i32, _>::builder()
            .add_handler(qn("int"), for_scalar_from_string(qn("int"), str::parse::<i32>))
            .add_handler(qn("other"), for_scalar_from_string(qn("other"), str::parse::<i32>))
            .remove_handler(&qn("other"));

        let mut errors = Vec::new();
        let mut handler = builder.build("urn:doc", |e| errors.push(e));
        handler.element_started(&qn("other"), &Attributes::new()).unwrap();
        assert!(handler.failed());
    }

    #[test]
    fn test_conclude_without_errors_or_value() {
        let failure = conclude::<i32>("urn:doc", Ok(()), LexicalPosition::unknown(), None, Vec::new())
            .unwrap_err();
        assert_eq!(failure.message(), "Parse did not complete");
        assert_eq!(failure.errors().len(), 1);
        assert_eq!(failure.errors()[0].error_code(), "error-did-not-complete");
        assert!(!failure.errors()[0].position().is_known());
    }

    #[test]
    fn test_conclude_fatal_appends_diagnostic() {
        let recorded = ParseError::builder(Severity::Error, "first").build();
        let failure = conclude::<i32>(
            "urn:doc",
            Err(EventSourceError::new("fatal").at(2, 7)),
            LexicalPosition::unknown(),
            None,
            vec![recorded],
        )
        .unwrap_err();

        assert_eq!(failure.errors().len(), 2);
        assert_eq!(failure.message(), "first");
        assert_eq!(failure.errors()[1].position().line(), 2);
        assert_eq!(failure.cause().map(ToString::to_string), Some("fatal".to_string()));
    }

    #[test]
    fn test_conclude_cause_ignores_warnings() {
        let warning = ParseError::builder(Severity::Warning, "odd")
            .cause(Arc::new(EventSourceError::new("odd")))
            .build();
        let error = ParseError::builder(Severity::Error, "bad value")
            .cause(Arc::new(HandlerError::new("not a number")))
            .build();
        let failure = conclude::<i32>(
            "urn:doc",
            Ok(()),
            LexicalPosition::unknown(),
            None,
            vec![warning, error],
        )
        .unwrap_err();

        assert_eq!(failure.message(), "bad value");
        assert_eq!(failure.cause().map(ToString::to_string), Some("not a number".to_string()));
    }

    #[test]
    fn test_fatal_error_is_cause_after_warning() {
        let xml = "<!DOCTYPE int>\n<int xmlns='urn:tests'>1";
        let failure = parse_str("urn:doc", xml, int_roots()).unwrap_err();

        assert_eq!(failure.errors()[0].severity(), Severity::Warning);
        let cause = failure.cause().map(ToString::to_string);
        assert_eq!(cause.as_deref(), Some(failure.message()));
        assert!(failure.message().contains("still open"));
    }

    #[test]
    fn test_source_factory_failure() {
        let failure = parse_with(
            "urn:doc",
            "<int xmlns='urn:tests'>1</int>".as_bytes(),
            || Err::<QuickXmlSource, _>(EventSourceError::new("no parser available")),
            int_roots(),
        )
        .unwrap_err();
        assert_eq!(failure.message(), "no parser available");
        assert_eq!(failure.errors().len(), 1);
        assert_eq!(failure.errors()[0].position().line(), -1);
    }
}
