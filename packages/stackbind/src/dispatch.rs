//! Parsing documents whose schema is chosen by namespace.
//!
//! Several versions of a format usually live in different namespaces. A
//! [`NamespaceDispatcher`] holds one root handler table per namespace and
//! picks the table for the namespace of the root element. That namespace must
//! have been declared by the document.

use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;

use crate::config::{INITIAL_ERROR_CAPACITY, UNKNOWN_COLUMN, UNKNOWN_LINE};
use crate::diagnostics::{LexicalPosition, ParseError, Severity};
use crate::driver::{conclude, Recorder};
use crate::error::{DocumentError, EventSourceError, Result};
use crate::name::QualifiedName;
use crate::registry::{Attributes, ElementRegistry, ParseEngine};
use crate::xml::{ContentSink, EventSource, QuickXmlSource};

/// Content sink selecting a root handler table by namespace.
pub struct NamespaceDispatcher<T, E> {
    source_id: String,
    dispatchers: BTreeMap<String, ElementRegistry<T>>,
    declared: BTreeSet<String>,
    engine: Option<ParseEngine<T>>,
    recorder: Recorder<E>,
    no_namespace_reported: bool,
    line: i64,
    column: i64,
}

impl<T: 'static> NamespaceDispatcher<T, fn(ParseError)> {
    /// Start building a dispatcher.
    #[must_use]
    pub fn builder() -> NamespaceDispatcherBuilder<T> {
        NamespaceDispatcherBuilder::new()
    }
}

impl<T: 'static, E: FnMut(ParseError)> NamespaceDispatcher<T, E> {
    fn new(
        source_id: impl Into<String>,
        dispatchers: BTreeMap<String, ElementRegistry<T>>,
        sink: E,
    ) -> Self {
        let source_id = source_id.into();
        Self {
            recorder: Recorder::new(source_id.clone(), sink),
            source_id,
            dispatchers,
            declared: BTreeSet::new(),
            engine: None,
            no_namespace_reported: false,
            line: UNKNOWN_LINE,
            column: UNKNOWN_COLUMN,
        }
    }

    /// Whether a root handler table has been chosen for the document.
    #[must_use]
    pub fn selected(&self) -> bool {
        self.engine.is_some()
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
        self.engine
            .as_ref()
            .and_then(ParseEngine::result)
            .ok_or(DocumentError::DidNotComplete)
    }

    /// Consume the dispatcher, returning the root value if parsing succeeded.
    #[must_use]
    pub fn into_result(self) -> Option<T> {
        if self.failed() {
            return None;
        }
        self.engine.and_then(ParseEngine::into_result)
    }

    /// Whether any error was recorded.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.recorder.failed() || self.engine.as_ref().is_some_and(ParseEngine::failed)
    }

    /// The last position reported by the event source.
    #[must_use]
    pub fn position(&self) -> LexicalPosition {
        LexicalPosition::new(self.line, self.column).with_source(self.source_id.clone())
    }

    /// Choose the root table for the namespace of `root`.
    fn select(&mut self, root: &QualifiedName) -> bool {
        let namespace = root.namespace();
        if !self.declared.contains(namespace) {
            return false;
        }
        let Some(roots) = self.dispatchers.get(namespace) else {
            return false;
        };
        tracing::debug!(namespace, "Selected handlers for namespace");
        let mut engine = ParseEngine::new(self.source_id.clone(), roots.clone());
        engine.set_position(self.line, self.column);
        self.engine = Some(engine);
        true
    }

    fn start_in_engine(
        &mut self,
        name: &QualifiedName,
        attributes: &Attributes,
        position: LexicalPosition,
    ) -> std::result::Result<(), EventSourceError> {
        let Some(engine) = self.active_engine() else {
            return Ok(());
        };
        match engine.element_started(name, attributes) {
            Ok(()) => Ok(()),
            Err(err) => self.recorder.stack_error(err, Some(name), position),
        }
    }

    fn active_engine(&mut self) -> Option<&mut ParseEngine<T>> {
        if self.recorder.failed() {
            return None;
        }
        self.engine.as_mut()
    }
}

impl<T: 'static, E: FnMut(ParseError)> ContentSink for NamespaceDispatcher<T, E> {
    fn namespace_prefix_mapped(&mut self, prefix: &str, uri: &str) -> std::result::Result<(), EventSourceError> {
        tracing::trace!(prefix, uri, "Namespace declared");

        if !self.dispatchers.contains_key(uri) {
            let position = self.position();
            self.recorder.record(
                ParseError::builder(Severity::Error, format!("Unrecognized namespace: {uri}"))
                    .position(position)
                    .error_code("error-unrecognized-namespace")
                    .attribute("namespace", uri)
                    .attribute("prefix", prefix)
                    .remediating_action(format!(
                        "Use one of the supported namespaces: {}",
                        self.dispatchers.keys().cloned().collect::<Vec<_>>().join(", ")
                    ))
                    .build(),
            );
            return Ok(());
        }

        self.declared.insert(uri.to_string());
        Ok(())
    }

    fn element_started(
        &mut self,
        name: &QualifiedName,
        attributes: &Attributes,
    ) -> std::result::Result<(), EventSourceError> {
        let position = self.position();
        if self.engine.is_none() {
            if self.no_namespace_reported {
                return Ok(());
            }
            if !self.select(name) {
                self.no_namespace_reported = true;
                self.recorder.record(
                    ParseError::builder(Severity::Error, "No usable namespace")
                        .position(position)
                        .error_code("error-no-usable-namespace")
                        .attribute("element", name.to_string())
                        .remediating_action(
                            "Put the root element in a declared, supported namespace",
                        )
                        .build(),
                );
                return Ok(());
            }
        }
        self.start_in_engine(name, attributes, position)
    }

    fn characters(&mut self, text: &str) -> std::result::Result<(), EventSourceError> {
        let position = self.position();
        let Some(engine) = self.active_engine() else {
            return Ok(());
        };
        match engine.characters(text) {
            Ok(()) => Ok(()),
            Err(err) => self.recorder.stack_error(err, None, position),
        }
    }

    fn element_finished(&mut self, name: &QualifiedName) -> std::result::Result<(), EventSourceError> {
        let position = self.position();
        let Some(engine) = self.active_engine() else {
            return Ok(());
        };
        match engine.element_finished(name) {
            Ok(()) => Ok(()),
            Err(err) => self.recorder.stack_error(err, Some(name), position),
        }
    }

    fn position_changed(&mut self, line: i64, column: i64) {
        self.line = line;
        self.column = column;
        if let Some(engine) = self.engine.as_mut() {
            engine.set_position(line, column);
        }
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
        self.recorder
            .source_problem(Severity::Error, error.clone(), position);
        Err(error)
    }
}

/// Builder for [`NamespaceDispatcher`].
pub struct NamespaceDispatcherBuilder<T> {
    handlers: BTreeMap<String, ElementRegistry<T>>,
}

impl<T: 'static> NamespaceDispatcherBuilder<T> {
    /// Create a builder with no namespaces.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Use `root_handlers` for documents declaring `namespace`.
    #[must_use]
    pub fn add_handler(mut self, namespace: impl Into<String>, root_handlers: ElementRegistry<T>) -> Self {
        self.handlers.insert(namespace.into(), root_handlers);
        self
    }

    /// Stop accepting documents declaring `namespace`.
    #[must_use]
    pub fn remove_handler(mut self, namespace: &str) -> Self {
        self.handlers.remove(namespace);
        self
    }

    /// Registered namespaces, in order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Build a dispatcher for one document.
    pub fn build<E: FnMut(ParseError)>(
        &self,
        source_id: impl Into<String>,
        sink: E,
    ) -> NamespaceDispatcher<T, E> {
        NamespaceDispatcher::new(source_id, self.handlers.clone(), sink)
    }
}

impl<T: 'static> Default for NamespaceDispatcherBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a document with [`QuickXmlSource`], selecting root handlers by the
/// namespace the document declares.
///
/// # Errors
/// Returns a [`ParseFailure`](crate::ParseFailure) holding every diagnostic
/// if the document did not produce a value.
pub fn parse_dispatching<T: 'static>(
    source_id: &str,
    mut input: impl BufRead,
    dispatch: &NamespaceDispatcherBuilder<T>,
) -> Result<T> {
    let mut errors = Vec::with_capacity(INITIAL_ERROR_CAPACITY);
    let mut dispatcher = dispatch.build(source_id, |e| errors.push(e));
    let outcome = QuickXmlSource::new().parse(source_id, &mut input, &mut dispatcher);
    let position = dispatcher.position();
    let value = dispatcher.into_result();
    conclude(source_id, outcome, position, value, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::builders::for_scalar_from_string;

    fn roots(namespace: &str) -> ElementRegistry<i64> {
        let name = QualifiedName::new(namespace, "int");
        ElementRegistry::new().with(name.clone(), for_scalar_from_string(name, str::parse::<i64>))
    }

    fn builder() -> NamespaceDispatcherBuilder<i64> {
        let v2 = QualifiedName::new("urn:v2", "int");
        let doubled = for_scalar_from_string(v2.clone(), str::parse::<i64>).map(|n| n * 2);
        NamespaceDispatcher::builder()
            .add_handler("urn:v1", roots("urn:v1"))
            .add_handler("urn:v2", ElementRegistry::new().with(v2, doubled))
    }

    #[test]
    fn test_selects_registry_by_namespace() {
        let builder = builder();
        assert_eq!(parse_dispatching("urn:a", r#"<int xmlns="urn:v1">21</int>"#.as_bytes(), &builder).unwrap(), 21);
        assert_eq!(parse_dispatching("urn:b", r#"<int xmlns="urn:v2">21</int>"#.as_bytes(), &builder).unwrap(), 42);
    }

    #[test]
    fn test_root_namespace_selects_registry() {
        let builder = builder();
        let xml = r#"<a:int xmlns:a="urn:v1" xmlns:b="urn:v2">5</a:int>"#;
        assert_eq!(parse_dispatching("urn:doc", xml.as_bytes(), &builder).unwrap(), 5);
        let xml = r#"<b:int xmlns:a="urn:v1" xmlns:b="urn:v2">5</b:int>"#;
        assert_eq!(parse_dispatching("urn:doc", xml.as_bytes(), &builder).unwrap(), 10);
    }

    #[test]
    fn test_no_namespace() {
        let failure = parse_dispatching("urn:doc", "<int>1</int>".as_bytes(), &builder()).unwrap_err();
        assert_eq!(failure.errors().len(), 1);
        assert_eq!(failure.errors()[0].error_code(), "error-no-usable-namespace");
        assert!(failure.message().starts_with("No usable namespace"));
    }

    #[test]
    fn test_unknown_namespace() {
        let xml = r#"<int xmlns="urn:v3">1</int>"#;
        let failure = parse_dispatching("urn:doc", xml.as_bytes(), &builder()).unwrap_err();
        let codes: Vec<&str> = failure.errors().iter().map(ParseError::error_code).collect();
        assert_eq!(codes, vec!["error-unrecognized-namespace", "error-no-usable-namespace"]);
        assert!(failure.message().starts_with("Unrecognized namespace"));
    }

    #[test]
    fn test_root_in_later_declared_namespace() {
        let xml = r#"<x:int xmlns="urn:v1" xmlns:x="urn:v2">1</x:int>"#;
        assert_eq!(parse_dispatching("urn:doc", xml.as_bytes(), &builder()).unwrap(), 2);
    }

    #[test]
    fn test_root_in_no_namespace() {
        let xml = r#"<int xmlns:x="urn:v1">1</int>"#;
        let failure = parse_dispatching("urn:doc", xml.as_bytes(), &builder()).unwrap_err();
        let codes: Vec<&str> = failure.errors().iter().map(ParseError::error_code).collect();
        assert_eq!(codes, vec!["error-no-usable-namespace"]);
        assert_eq!(failure.errors()[0].attributes()["element"], "int");
    }

    #[test]
    fn test_root_in_registered_but_undeclared_namespace() {
        let mut errors = Vec::new();
        let mut dispatcher = builder().build("urn:doc", |e| errors.push(e));
        dispatcher.namespace_prefix_mapped("", "urn:v1").unwrap();
        let name = QualifiedName::new("urn:v2", "int");
        dispatcher.element_started(&name, &Attributes::new()).unwrap();
        dispatcher.element_started(&name, &Attributes::new()).unwrap();

        assert!(!dispatcher.selected());
        assert!(dispatcher.failed());
        drop(dispatcher);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_code(), "error-no-usable-namespace");
    }

    #[test]
    fn test_removed_namespace_is_unrecognized() {
        let builder = builder().remove_handler("urn:v2");
        assert_eq!(builder.namespaces().collect::<Vec<_>>(), vec!["urn:v1"]);
        let xml = r#"<int xmlns="urn:v2">1</int>"#;
        assert!(parse_dispatching("urn:doc", xml.as_bytes(), &builder).is_err());
    }

    #[test]
    fn test_dispatcher_result_and_failed() {
        let mut errors = Vec::new();
        let mut dispatcher = builder().build("urn:doc", |e| errors.push(e));
        dispatcher.namespace_prefix_mapped("", "urn:v1").unwrap();
        assert!(!dispatcher.selected());
        let name = QualifiedName::new("urn:v1", "int");
        dispatcher.element_started(&name, &Attributes::new()).unwrap();
        assert!(dispatcher.selected());
        dispatcher.characters("7").unwrap();
        dispatcher.element_finished(&name).unwrap();

        assert!(!dispatcher.failed());
        assert_eq!(dispatcher.result(), Ok(&7));
    }
}
