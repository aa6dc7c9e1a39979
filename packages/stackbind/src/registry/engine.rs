//! Handler stack engine.
//!
//! The engine owns one frame per open element. Each frame pairs the element
//! name with the handler created for it, or with nothing when the element lies
//! in a subtree that is being skipped. There is no other state: whether the
//! engine is at the root, inside a handled element or inside an ignored
//! subtree follows from the stack contents.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::core::{AnyHandler, CreateFn, ElementRegistry};
use super::handler::IgnorePolicy;
use super::types::{Attributes, ParseContext};
use crate::error::{HandlerError, StackError};
use crate::name::QualifiedName;

struct Frame {
    name: QualifiedName,
    handler: Option<Box<dyn AnyHandler>>,
}

/// Stack-based dispatcher that routes XML events to element handlers.
///
/// Events are fed in document order through [`element_started`],
/// [`characters`] and [`element_finished`]. The first error puts the engine
/// into a failed state in which every later event is ignored; frames still
/// open at that point are dropped without calling `finish`.
///
/// [`element_started`]: ParseEngine::element_started
/// [`characters`]: ParseEngine::characters
/// [`element_finished`]: ParseEngine::element_finished
pub struct ParseEngine<T> {
    stack: Vec<Frame>,
    context: ParseContext,
    root_handlers: BTreeMap<QualifiedName, Arc<CreateFn>>,
    failed: bool,
    result: Option<T>,
}

impl<T: 'static> ParseEngine<T> {
    /// Create a new engine for one document.
    ///
    /// # Arguments
    /// * `source_id` - Identifier of the document, used in diagnostics only
    /// * `root_handlers` - Factories for the element names allowed as the root
    #[must_use]
    pub fn new(source_id: impl Into<String>, root_handlers: ElementRegistry<T>) -> Self {
        Self {
            stack: Vec::new(),
            context: ParseContext::new(source_id),
            root_handlers: root_handlers.into_erased(),
            failed: false,
            result: None,
        }
    }

    /// The context handed to handlers.
    #[must_use]
    pub fn context(&self) -> &ParseContext {
        &self.context
    }

    /// Record the current position of the event source.
    pub fn set_position(&mut self, line: i64, column: i64) {
        self.context.set_position(line, column);
    }

    /// Whether an error has been raised.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Number of open elements.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The value produced by the root handler, once the root has finished.
    #[must_use]
    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    /// Consume the engine, returning the root value if one was produced.
    #[must_use]
    pub fn into_result(self) -> Option<T> {
        self.result
    }

    /// An element started.
    ///
    /// # Errors
    /// Returns an error if the element is not allowed at this point, or if the
    /// handler factory or the new handler's `on_start` fails. The engine is
    /// failed afterwards.
    pub fn element_started(
        &mut self,
        name: &QualifiedName,
        attributes: &Attributes,
    ) -> Result<(), StackError> {
        if self.failed {
            return Ok(());
        }
        let outcome = self.start(name, attributes);
        self.failed = outcome.is_err();
        outcome
    }

    /// A chunk of text arrived inside the current element.
    ///
    /// # Errors
    /// Returns an error if no element is open or the handler rejects the text.
    pub fn characters(&mut self, text: &str) -> Result<(), StackError> {
        if self.failed {
            return Ok(());
        }
        let outcome = self.text(text);
        self.failed = outcome.is_err();
        outcome
    }

    /// The current element finished.
    ///
    /// # Errors
    /// Returns an error if no element is open, or if the handler's `finish` or
    /// the parent's `on_child_result` fails.
    pub fn element_finished(&mut self, name: &QualifiedName) -> Result<(), StackError> {
        if self.failed {
            return Ok(());
        }
        let outcome = self.finish(name);
        self.failed = outcome.is_err();
        outcome
    }

    fn start(&mut self, name: &QualifiedName, attributes: &Attributes) -> Result<(), StackError> {
        let Some(parent) = self.stack.last() else {
            let create = self
                .root_handlers
                .get(name)
                .ok_or_else(|| StackError::RootNotAllowed { name: name.clone() })?;
            let handler = create(&self.context)?;
            return self.push(name, handler, attributes);
        };

        let Some(parent_handler) = parent.handler.as_ref() else {
            self.push_ignored(name);
            return Ok(());
        };

        let wanted = parent_handler.wanted_child_handlers(&self.context);
        if let Some(create) = wanted.get(name) {
            let handler = create(&self.context)?;
            return self.push(name, handler, attributes);
        }

        match parent_handler.ignore_policy(&self.context) {
            IgnorePolicy::IgnoreUnrecognized => {
                tracing::trace!(
                    element = %name,
                    handler = %parent_handler.name(),
                    "Skipping unrecognized element"
                );
                self.push_ignored(name);
                Ok(())
            }
            IgnorePolicy::DoNotIgnoreUnrecognized => Err(StackError::UnrecognizedElement {
                handler: parent_handler.name(),
                name: name.clone(),
                expected: wanted
                    .keys()
                    .map(QualifiedName::local_name)
                    .collect::<Vec<_>>()
                    .join("|"),
            }),
        }
    }

    fn push(
        &mut self,
        name: &QualifiedName,
        handler: Box<dyn AnyHandler>,
        attributes: &Attributes,
    ) -> Result<(), StackError> {
        tracing::trace!(
            element = name.local_name(),
            handler = %handler.name(),
            depth = self.stack.len() + 1,
            "push"
        );
        self.stack.push(Frame {
            name: name.clone(),
            handler: Some(handler),
        });
        if let Some(handler) = self.stack.last_mut().and_then(|f| f.handler.as_mut()) {
            handler.on_start(&self.context, attributes)?;
        }
        Ok(())
    }

    fn push_ignored(&mut self, name: &QualifiedName) {
        tracing::trace!(
            element = name.local_name(),
            depth = self.stack.len() + 1,
            "push (ignored)"
        );
        self.stack.push(Frame {
            name: name.clone(),
            handler: None,
        });
    }

    fn text(&mut self, text: &str) -> Result<(), StackError> {
        let frame = self
            .stack
            .last_mut()
            .ok_or(StackError::EmptyStack { event: "characters" })?;
        if let Some(handler) = frame.handler.as_mut() {
            handler.on_characters(&self.context, text)?;
        }
        Ok(())
    }

    fn finish(&mut self, name: &QualifiedName) -> Result<(), StackError> {
        let frame = self
            .stack
            .pop()
            .ok_or(StackError::EmptyStack { event: "element end" })?;
        tracing::trace!(
            element = frame.name.local_name(),
            closing = name.local_name(),
            depth = self.stack.len(),
            "pop"
        );

        let Some(mut handler) = frame.handler else {
            return Ok(());
        };
        let value = handler.finish(&self.context)?;

        match self.stack.last_mut() {
            None => {
                let value = value.downcast::<T>().map_err(|_| {
                    HandlerError::new(format!(
                        "Root handler {} produced a value of an unexpected type",
                        handler.name()
                    ))
                })?;
                self.result = Some(*value);
            }
            Some(parent) => {
                if let Some(parent_handler) = parent.handler.as_mut() {
                    parent_handler.on_child_result(&self.context, value)?;
                }
            }
        }
        Ok(())
    }
}
