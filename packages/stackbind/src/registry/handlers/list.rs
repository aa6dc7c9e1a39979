//! Handlers collecting child values into a list, in document order.

use crate::error::HandlerError;
use crate::name::QualifiedName;
use crate::registry::core::{ElementRegistry, HandlerFactory};
use crate::registry::handler::{ElementHandler, IgnorePolicy};
use crate::registry::types::ParseContext;

/// Handler for a list element whose items all share one element name.
pub struct ListMonoHandler<S> {
    name: QualifiedName,
    item_name: QualifiedName,
    item: HandlerFactory<S>,
    policy: IgnorePolicy,
    items: Vec<S>,
}

impl<S> ListMonoHandler<S> {
    /// Create a handler for the list element `name` with items named `item_name`.
    #[must_use]
    pub fn new(
        name: QualifiedName,
        item_name: QualifiedName,
        item: HandlerFactory<S>,
        policy: IgnorePolicy,
    ) -> Self {
        Self {
            name,
            item_name,
            item,
            policy,
            items: Vec::new(),
        }
    }
}

impl<S> ElementHandler<S, Vec<S>> for ListMonoHandler<S> {
    fn name(&self) -> String {
        self.name.local_name().to_string()
    }

    fn wanted_child_handlers(&self, _context: &ParseContext) -> ElementRegistry<S> {
        ElementRegistry::new().with(self.item_name.clone(), self.item.clone())
    }

    fn ignore_policy(&self, _context: &ParseContext) -> IgnorePolicy {
        self.policy
    }

    fn on_child_result(&mut self, _context: &ParseContext, value: S) -> Result<(), HandlerError> {
        self.items.push(value);
        Ok(())
    }

    fn finish(&mut self, _context: &ParseContext) -> Result<Vec<S>, HandlerError> {
        Ok(std::mem::take(&mut self.items))
    }
}

/// Handler for a list element whose items may be any of several elements.
///
/// All item factories produce the same type `S`; use
/// [`HandlerFactory::widen`] or [`HandlerFactory::map`] to bring differently
/// typed items under one type.
pub struct ListPolyHandler<S> {
    name: QualifiedName,
    items_wanted: ElementRegistry<S>,
    policy: IgnorePolicy,
    items: Vec<S>,
}

impl<S> ListPolyHandler<S> {
    /// Create a handler for the list element `name`.
    #[must_use]
    pub fn new(name: QualifiedName, items: ElementRegistry<S>, policy: IgnorePolicy) -> Self {
        Self {
            name,
            items_wanted: items,
            policy,
            items: Vec::new(),
        }
    }
}

impl<S> ElementHandler<S, Vec<S>> for ListPolyHandler<S> {
    fn name(&self) -> String {
        self.name.local_name().to_string()
    }

    fn wanted_child_handlers(&self, _context: &ParseContext) -> ElementRegistry<S> {
        self.items_wanted.clone()
    }

    fn ignore_policy(&self, _context: &ParseContext) -> IgnorePolicy {
        self.policy
    }

    fn on_child_result(&mut self, _context: &ParseContext, value: S) -> Result<(), HandlerError> {
        self.items.push(value);
        Ok(())
    }

    fn finish(&mut self, _context: &ParseContext) -> Result<Vec<S>, HandlerError> {
        Ok(std::mem::take(&mut self.items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::handler::NoChildren;

    struct Unit;

    impl ElementHandler<NoChildren, u8> for Unit {
        fn finish(&mut self, _context: &ParseContext) -> Result<u8, HandlerError> {
            Ok(1)
        }
    }

    #[test]
    fn test_list_mono_wants_only_its_item() {
        let context = ParseContext::new("urn:test");
        let handler = ListMonoHandler::new(
            QualifiedName::new("urn:test", "bytes"),
            QualifiedName::new("urn:test", "byte"),
            HandlerFactory::new(|_| Unit),
            IgnorePolicy::IgnoreUnrecognized,
        );

        let wanted = handler.wanted_child_handlers(&context);
        assert_eq!(wanted.len(), 1);
        assert!(wanted.has_handler(&QualifiedName::new("urn:test", "byte")));
        assert_eq!(handler.ignore_policy(&context), IgnorePolicy::IgnoreUnrecognized);
        assert_eq!(handler.name(), "bytes");
    }

    #[test]
    fn test_list_poly_preserves_order() {
        let context = ParseContext::new("urn:test");
        let mut handler = ListPolyHandler::new(
            QualifiedName::new("urn:test", "numbers"),
            ElementRegistry::new(),
            IgnorePolicy::DoNotIgnoreUnrecognized,
        );
        for value in [3, 1, 2] {
            handler.on_child_result(&context, value).unwrap();
        }
        assert_eq!(handler.finish(&context).unwrap(), vec![3, 1, 2]);
    }
}
