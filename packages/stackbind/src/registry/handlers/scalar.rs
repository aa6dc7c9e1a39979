//! Leaf handlers producing a single value from text or attributes.
//!
//! Neither handler accepts child elements.

use std::sync::Arc;

use crate::error::HandlerError;
use crate::name::QualifiedName;
use crate::registry::handler::{ElementHandler, NoChildren};
use crate::registry::types::{Attributes, ParseContext};

/// Function parsing the complete text of an element.
pub type TextParser<S> = dyn Fn(&ParseContext, &str) -> Result<S, HandlerError> + Send + Sync;

/// Function computing a value from an element's attributes.
pub type AttributeParser<S> =
    dyn Fn(&ParseContext, &Attributes) -> Result<S, HandlerError> + Send + Sync;

/// Handler for elements whose text content is parsed into a value.
///
/// Text chunks are buffered and parsed once, when the element finishes. An
/// element without text is parsed as the empty string.
pub struct ScalarElementHandler<S> {
    name: QualifiedName,
    parser: Arc<TextParser<S>>,
    text: String,
}

impl<S> ScalarElementHandler<S> {
    /// Create a handler for the element `name`.
    #[must_use]
    pub fn new(name: QualifiedName, parser: Arc<TextParser<S>>) -> Self {
        Self {
            name,
            parser,
            text: String::new(),
        }
    }
}

impl<S> ElementHandler<NoChildren, S> for ScalarElementHandler<S> {
    fn name(&self) -> String {
        self.name.local_name().to_string()
    }

    fn on_characters(&mut self, _context: &ParseContext, text: &str) -> Result<(), HandlerError> {
        self.text.push_str(text);
        Ok(())
    }

    fn finish(&mut self, context: &ParseContext) -> Result<S, HandlerError> {
        let text = std::mem::take(&mut self.text);
        (self.parser)(context, &text)
    }
}

/// Handler for elements whose value is computed from their attributes.
///
/// The value is computed when the element starts; text content is ignored.
pub struct ScalarAttributeHandler<S> {
    name: QualifiedName,
    parser: Arc<AttributeParser<S>>,
    result: Option<S>,
}

impl<S> ScalarAttributeHandler<S> {
    /// Create a handler for the element `name`.
    #[must_use]
    pub fn new(name: QualifiedName, parser: Arc<AttributeParser<S>>) -> Self {
        Self {
            name,
            parser,
            result: None,
        }
    }
}

impl<S> ElementHandler<NoChildren, S> for ScalarAttributeHandler<S> {
    fn name(&self) -> String {
        self.name.local_name().to_string()
    }

    fn on_start(
        &mut self,
        context: &ParseContext,
        attributes: &Attributes,
    ) -> Result<(), HandlerError> {
        self.result = Some((self.parser)(context, attributes)?);
        Ok(())
    }

    fn finish(&mut self, _context: &ParseContext) -> Result<S, HandlerError> {
        self.result.take().ok_or_else(|| {
            HandlerError::new(format!("Element {} finished before it started", self.name))
        })
    }
}
