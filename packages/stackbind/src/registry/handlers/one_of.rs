//! Handler accepting exactly one child out of a set of alternatives.

use crate::error::HandlerError;
use crate::name::QualifiedName;
use crate::registry::core::ElementRegistry;
use crate::registry::handler::ElementHandler;
use crate::registry::types::ParseContext;

/// Handler whose value is the value of its single child element.
///
/// The element must contain exactly one of the alternatives. A second child
/// or no child at all is an error.
pub struct OneOfHandler<S> {
    alternatives: ElementRegistry<S>,
    value: Option<S>,
}

impl<S> OneOfHandler<S> {
    /// Create a handler accepting any one of `alternatives`.
    #[must_use]
    pub fn new(alternatives: ElementRegistry<S>) -> Self {
        Self {
            alternatives,
            value: None,
        }
    }
}

impl<S> ElementHandler<S, S> for OneOfHandler<S> {
    fn name(&self) -> String {
        "[OneOf]".to_string()
    }

    fn wanted_child_handlers(&self, _context: &ParseContext) -> ElementRegistry<S> {
        self.alternatives.clone()
    }

    fn on_child_result(&mut self, _context: &ParseContext, value: S) -> Result<(), HandlerError> {
        if self.value.is_some() {
            return Err(HandlerError::new(
                "Expected exactly one child element, but received more than one",
            ));
        }
        self.value = Some(value);
        Ok(())
    }

    fn finish(&mut self, _context: &ParseContext) -> Result<S, HandlerError> {
        self.value.take().ok_or_else(|| {
            let expected: Vec<&str> = self
                .alternatives
                .registered_names()
                .map(QualifiedName::local_name)
                .collect();
            HandlerError::new(format!(
                "Expected exactly one child element of: {}",
                expected.join("|")
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_of_single_child() {
        let context = ParseContext::new("urn:test");
        let mut handler = OneOfHandler::new(ElementRegistry::<i32>::new());
        handler.on_child_result(&context, 23).unwrap();
        assert_eq!(handler.finish(&context).unwrap(), 23);
        assert_eq!(handler.name(), "[OneOf]");
    }

    #[test]
    fn test_one_of_rejects_second_child() {
        let context = ParseContext::new("urn:test");
        let mut handler = OneOfHandler::new(ElementRegistry::<i32>::new());
        handler.on_child_result(&context, 1).unwrap();
        assert!(handler.on_child_result(&context, 2).is_err());
    }

    #[test]
    fn test_one_of_requires_a_child() {
        let context = ParseContext::new("urn:test");
        let mut handler = OneOfHandler::new(ElementRegistry::<i32>::new());
        let err = handler.finish(&context).unwrap_err();
        assert!(err.message().starts_with("Expected exactly one child element"));
    }
}
