//! Element handler trait definition.

use std::convert::Infallible;
use std::marker::PhantomData;

use super::core::ElementRegistry;
use super::types::{Attributes, ParseContext};
use crate::error::HandlerError;

/// Child value type of handlers that accept no child elements.
pub type NoChildren = Infallible;

/// What a handler wants done with child elements it has no factory for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IgnorePolicy {
    /// Skip the unrecognized element and its whole subtree.
    IgnoreUnrecognized,
    /// Fail the parse.
    #[default]
    DoNotIgnoreUnrecognized,
}

/// Trait for element handlers.
///
/// One handler instance exists per XML element instance. It is created by a
/// [`HandlerFactory`](super::HandlerFactory) when the element starts, receives
/// the element's attributes, text and child values, and produces a single
/// value of type `R` when the element finishes. `C` is the type of value its
/// accepted children produce.
///
/// Every callback except [`finish`](Self::finish) has a default, so a text
/// leaf only implements `on_characters` + `finish`, and a container only
/// implements `wanted_child_handlers` + `on_child_result` + `finish`.
pub trait ElementHandler<C, R> {
    /// Name used in logs and diagnostics.
    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Factories for the child elements this handler accepts.
    ///
    /// Default implementation accepts no children.
    fn wanted_child_handlers(&self, _context: &ParseContext) -> ElementRegistry<C> {
        ElementRegistry::new()
    }

    /// Policy for children that have no factory.
    fn ignore_policy(&self, _context: &ParseContext) -> IgnorePolicy {
        IgnorePolicy::DoNotIgnoreUnrecognized
    }

    /// The element started.
    fn on_start(
        &mut self,
        _context: &ParseContext,
        _attributes: &Attributes,
    ) -> Result<(), HandlerError> {
        Ok(())
    }

    /// An accepted child element finished and produced `value`.
    ///
    /// Called once per child, in document order.
    fn on_child_result(&mut self, _context: &ParseContext, _value: C) -> Result<(), HandlerError> {
        Ok(())
    }

    /// A chunk of text arrived.
    ///
    /// Text may be split across any number of calls; handlers that need the
    /// complete text must buffer it until [`finish`](Self::finish).
    fn on_characters(&mut self, _context: &ParseContext, _text: &str) -> Result<(), HandlerError> {
        Ok(())
    }

    /// The element finished. Called at most once, after all children.
    fn finish(&mut self, context: &ParseContext) -> Result<R, HandlerError>;

    /// Transform the value produced by [`finish`](Self::finish).
    ///
    /// All other callbacks are forwarded unchanged.
    fn map<X, F>(self, function: F) -> Mapped<Self, F, R>
    where
        Self: Sized,
        F: FnMut(R) -> X,
    {
        Mapped {
            inner: self,
            function,
            _result: PhantomData,
        }
    }
}

impl<C, R, H> ElementHandler<C, R> for Box<H>
where
    H: ElementHandler<C, R> + ?Sized,
{
    fn name(&self) -> String {
        (**self).name()
    }

    fn wanted_child_handlers(&self, context: &ParseContext) -> ElementRegistry<C> {
        (**self).wanted_child_handlers(context)
    }

    fn ignore_policy(&self, context: &ParseContext) -> IgnorePolicy {
        (**self).ignore_policy(context)
    }

    fn on_start(
        &mut self,
        context: &ParseContext,
        attributes: &Attributes,
    ) -> Result<(), HandlerError> {
        (**self).on_start(context, attributes)
    }

    fn on_child_result(&mut self, context: &ParseContext, value: C) -> Result<(), HandlerError> {
        (**self).on_child_result(context, value)
    }

    fn on_characters(&mut self, context: &ParseContext, text: &str) -> Result<(), HandlerError> {
        (**self).on_characters(context, text)
    }

    fn finish(&mut self, context: &ParseContext) -> Result<R, HandlerError> {
        (**self).finish(context)
    }
}

/// Handler returned by [`ElementHandler::map`].
pub struct Mapped<H, F, R> {
    inner: H,
    function: F,
    _result: PhantomData<fn(R)>,
}

impl<C, R, X, H, F> ElementHandler<C, X> for Mapped<H, F, R>
where
    H: ElementHandler<C, R>,
    F: FnMut(R) -> X,
{
    fn name(&self) -> String {
        format!("[map {}]", self.inner.name())
    }

    fn wanted_child_handlers(&self, context: &ParseContext) -> ElementRegistry<C> {
        self.inner.wanted_child_handlers(context)
    }

    fn ignore_policy(&self, context: &ParseContext) -> IgnorePolicy {
        self.inner.ignore_policy(context)
    }

    fn on_start(
        &mut self,
        context: &ParseContext,
        attributes: &Attributes,
    ) -> Result<(), HandlerError> {
        self.inner.on_start(context, attributes)
    }

    fn on_child_result(&mut self, context: &ParseContext, value: C) -> Result<(), HandlerError> {
        self.inner.on_child_result(context, value)
    }

    fn on_characters(&mut self, context: &ParseContext, text: &str) -> Result<(), HandlerError> {
        self.inner.on_characters(context, text)
    }

    fn finish(&mut self, context: &ParseContext) -> Result<X, HandlerError> {
        self.inner.finish(context).map(&mut self.function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct TextLength {
        length: usize,
    }

    impl ElementHandler<NoChildren, usize> for TextLength {
        fn ignore_policy(&self, _context: &ParseContext) -> IgnorePolicy {
            IgnorePolicy::IgnoreUnrecognized
        }

        fn on_characters(&mut self, _context: &ParseContext, text: &str) -> Result<(), HandlerError> {
            self.length += text.len();
            Ok(())
        }

        fn finish(&mut self, _context: &ParseContext) -> Result<usize, HandlerError> {
            Ok(self.length)
        }
    }

    fn feed<H: ElementHandler<NoChildren, X>, X>(mut handler: H, chunks: &[&str]) -> X {
        let context = ParseContext::new("urn:test");
        handler.on_start(&context, &Attributes::new()).unwrap();
        for chunk in chunks {
            handler.on_characters(&context, chunk).unwrap();
        }
        handler.finish(&context).unwrap()
    }

    #[test]
    fn test_handler_defaults() {
        let handler = TextLength::default();
        let context = ParseContext::new("urn:test");
        assert!(handler.wanted_child_handlers(&context).is_empty());
        assert!(handler.name().ends_with("TextLength"));
        assert_eq!(IgnorePolicy::default(), IgnorePolicy::DoNotIgnoreUnrecognized);
    }

    #[test]
    fn test_map_transforms_only_the_result() {
        let context = ParseContext::new("urn:test");
        let mapped = TextLength::default().map(|n| n * 2);
        assert_eq!(mapped.ignore_policy(&context), IgnorePolicy::IgnoreUnrecognized);
        assert!(mapped.name().starts_with("[map "));
        assert_eq!(feed(mapped, &["ab", "cd"]), 8);
    }

    #[test]
    fn test_map_composes() {
        let f = |n: usize| n + 1;
        let g = |n: usize| format!("<{n}>");

        let chained = feed(TextLength::default().map(f).map(g), &["abc"]);
        let composed = feed(TextLength::default().map(move |n| g(f(n))), &["abc"]);
        assert_eq!(chained, composed);
        assert_eq!(chained, "<4>");
    }

    #[test]
    fn test_boxed_handler_forwards() {
        let boxed: Box<dyn ElementHandler<NoChildren, usize>> = Box::new(TextLength::default());
        assert_eq!(feed(boxed.map(|n| n + 10), &["x"]), 11);
    }
}
