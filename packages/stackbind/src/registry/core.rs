//! Handler factories and the factory tables keyed by element name.
//!
//! Handlers are generic over the value types they consume and produce, but the
//! engine keeps one stack for the whole document. The typed API in this module
//! is erased to [`AnyHandler`] at the point a factory is constructed; values
//! cross the erased boundary as `Box<dyn Any>` and are downcast back to the
//! type the receiving handler declared.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::handler::{ElementHandler, IgnorePolicy};
use super::types::{Attributes, ParseContext};
use crate::error::HandlerError;
use crate::name::QualifiedName;

/// A value produced by an erased handler.
pub(crate) type AnyValue = Box<dyn Any>;

pub(crate) type CreateFn = dyn Fn(&ParseContext) -> Result<Box<dyn AnyHandler>, HandlerError> + Send + Sync;

/// Object-safe view of an [`ElementHandler`] used by the engine.
pub(crate) trait AnyHandler {
    fn name(&self) -> String;
    fn wanted_child_handlers(&self, context: &ParseContext) -> BTreeMap<QualifiedName, Arc<CreateFn>>;
    fn ignore_policy(&self, context: &ParseContext) -> IgnorePolicy;
    fn on_start(&mut self, context: &ParseContext, attributes: &Attributes)
        -> Result<(), HandlerError>;
    fn on_child_result(&mut self, context: &ParseContext, value: AnyValue)
        -> Result<(), HandlerError>;
    fn on_characters(&mut self, context: &ParseContext, text: &str) -> Result<(), HandlerError>;
    fn finish(&mut self, context: &ParseContext) -> Result<AnyValue, HandlerError>;
}

/// Adapter from a typed handler to [`AnyHandler`].
struct Typed<H, C, R> {
    inner: H,
    _types: PhantomData<fn(C) -> R>,
}

impl<H, C, R> AnyHandler for Typed<H, C, R>
where
    H: ElementHandler<C, R>,
    C: 'static,
    R: 'static,
{
    fn name(&self) -> String {
        self.inner.name()
    }

    fn wanted_child_handlers(&self, context: &ParseContext) -> BTreeMap<QualifiedName, Arc<CreateFn>> {
        self.inner.wanted_child_handlers(context).into_erased()
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

    fn on_child_result(&mut self, context: &ParseContext, value: AnyValue) -> Result<(), HandlerError> {
        let value = value.downcast::<C>().map_err(|_| {
            HandlerError::new(format!(
                "Handler {} received a child value of an unexpected type",
                self.inner.name()
            ))
        })?;
        self.inner.on_child_result(context, *value)
    }

    fn on_characters(&mut self, context: &ParseContext, text: &str) -> Result<(), HandlerError> {
        self.inner.on_characters(context, text)
    }

    fn finish(&mut self, context: &ParseContext) -> Result<AnyValue, HandlerError> {
        let value = self.inner.finish(context)?;
        Ok(Box::new(value))
    }
}

/// Erased handler whose result is passed through a function.
struct MappedAny<R, X> {
    inner: Box<dyn AnyHandler>,
    function: Arc<dyn Fn(R) -> X + Send + Sync>,
}

impl<R: 'static, X: 'static> AnyHandler for MappedAny<R, X> {
    fn name(&self) -> String {
        format!("[map {}]", self.inner.name())
    }

    fn wanted_child_handlers(&self, context: &ParseContext) -> BTreeMap<QualifiedName, Arc<CreateFn>> {
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

    fn on_child_result(&mut self, context: &ParseContext, value: AnyValue) -> Result<(), HandlerError> {
        self.inner.on_child_result(context, value)
    }

    fn on_characters(&mut self, context: &ParseContext, text: &str) -> Result<(), HandlerError> {
        self.inner.on_characters(context, text)
    }

    fn finish(&mut self, context: &ParseContext) -> Result<AnyValue, HandlerError> {
        let value = self.inner.finish(context)?.downcast::<R>().map_err(|_| {
            HandlerError::new(format!(
                "Handler {} produced a value of an unexpected type",
                self.inner.name()
            ))
        })?;
        Ok(Box::new((self.function)(*value)))
    }
}

/// Creates a fresh handler producing `R` for each element instance.
///
/// Factories are cheap to clone and may be shared between threads; the
/// handlers they create are owned by a single parse.
pub struct HandlerFactory<R> {
    create: Arc<CreateFn>,
    _result: PhantomData<fn() -> R>,
}

impl<R: 'static> HandlerFactory<R> {
    /// Create a factory from a function that builds a handler.
    ///
    /// # Examples
    /// ```
    /// use stackbind::{ElementHandler, HandlerError, HandlerFactory, NoChildren, ParseContext};
    ///
    /// struct Flag;
    ///
    /// impl ElementHandler<NoChildren, bool> for Flag {
    ///     fn finish(&mut self, _context: &ParseContext) -> Result<bool, HandlerError> {
    ///         Ok(true)
    ///     }
    /// }
    ///
    /// let factory: HandlerFactory<bool> = HandlerFactory::new(|_context| Flag);
    /// ```
    pub fn new<H, C, F>(factory: F) -> Self
    where
        F: Fn(&ParseContext) -> H + Send + Sync + 'static,
        H: ElementHandler<C, R> + 'static,
        C: 'static,
    {
        Self::try_new(move |context| Ok(factory(context)))
    }

    /// Create a factory from a function that may refuse to build a handler.
    pub fn try_new<H, C, F>(factory: F) -> Self
    where
        F: Fn(&ParseContext) -> Result<H, HandlerError> + Send + Sync + 'static,
        H: ElementHandler<C, R> + 'static,
        C: 'static,
    {
        Self::from_erased(Arc::new(move |context: &ParseContext| {
            let handler = factory(context)?;
            Ok(Box::new(Typed {
                inner: handler,
                _types: PhantomData,
            }) as Box<dyn AnyHandler>)
        }))
    }

    fn from_erased(create: Arc<CreateFn>) -> Self {
        Self {
            create,
            _result: PhantomData,
        }
    }

    #[cfg(test)]
    pub(crate) fn create(&self, context: &ParseContext) -> Result<Box<dyn AnyHandler>, HandlerError> {
        (self.create)(context)
    }

    /// A factory whose handlers pass their result through `function`.
    #[must_use]
    pub fn map<X, G>(self, function: G) -> HandlerFactory<X>
    where
        X: 'static,
        G: Fn(R) -> X + Send + Sync + 'static,
    {
        let inner = self.create;
        let function: Arc<dyn Fn(R) -> X + Send + Sync> = Arc::new(function);
        HandlerFactory::from_erased(Arc::new(move |context: &ParseContext| {
            let handler = inner(context)?;
            Ok(Box::new(MappedAny {
                inner: handler,
                function: Arc::clone(&function),
            }) as Box<dyn AnyHandler>)
        }))
    }

    /// A factory producing a more general value type.
    ///
    /// Used to put factories for different result types into one table, for
    /// example several number types under a shared enum.
    #[must_use]
    pub fn widen<X>(self) -> HandlerFactory<X>
    where
        R: Into<X>,
        X: 'static,
    {
        self.map(<R as Into<X>>::into)
    }
}

impl<R> Clone for HandlerFactory<R> {
    fn clone(&self) -> Self {
        Self {
            create: Arc::clone(&self.create),
            _result: PhantomData,
        }
    }
}

impl<R> fmt::Debug for HandlerFactory<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFactory")
            .field("result", &std::any::type_name::<R>())
            .finish()
    }
}

/// Table of handler factories keyed by qualified element name.
///
/// Used both as the root handler table of a parse and as the set of children
/// a handler accepts.
pub struct ElementRegistry<R> {
    factories: BTreeMap<QualifiedName, HandlerFactory<R>>,
}

impl<R> ElementRegistry<R> {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register a factory for an element name, replacing any previous one.
    pub fn register(&mut self, name: QualifiedName, factory: HandlerFactory<R>) {
        self.factories.insert(name, factory);
    }

    /// Register a factory, builder style.
    #[must_use]
    pub fn with(mut self, name: QualifiedName, factory: HandlerFactory<R>) -> Self {
        self.register(name, factory);
        self
    }

    /// Remove the factory for an element name.
    pub fn remove(&mut self, name: &QualifiedName) -> Option<HandlerFactory<R>> {
        self.factories.remove(name)
    }

    /// Get the factory for an element name.
    #[must_use]
    pub fn get(&self, name: &QualifiedName) -> Option<&HandlerFactory<R>> {
        self.factories.get(name)
    }

    /// Check if a factory is registered for an element name.
    #[must_use]
    pub fn has_handler(&self, name: &QualifiedName) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered element names, in order.
    pub fn registered_names(&self) -> impl Iterator<Item = &QualifiedName> {
        self.factories.keys()
    }

    /// Number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether no factories are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub(crate) fn into_erased(self) -> BTreeMap<QualifiedName, Arc<CreateFn>> {
        self.factories
            .into_iter()
            .map(|(name, factory)| (name, factory.create))
            .collect()
    }
}

impl<R> Default for ElementRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for ElementRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            factories: self.factories.clone(),
        }
    }
}

impl<R> fmt::Debug for ElementRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl<R> FromIterator<(QualifiedName, HandlerFactory<R>)> for ElementRegistry<R> {
    fn from_iter<I: IntoIterator<Item = (QualifiedName, HandlerFactory<R>)>>(iter: I) -> Self {
        Self {
            factories: iter.into_iter().collect(),
        }
    }
}

impl<R> Extend<(QualifiedName, HandlerFactory<R>)> for ElementRegistry<R> {
    fn extend<I: IntoIterator<Item = (QualifiedName, HandlerFactory<R>)>>(&mut self, iter: I) {
        self.factories.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::handler::NoChildren;

    struct Constant(u8);

    impl ElementHandler<NoChildren, u8> for Constant {
        fn finish(&mut self, _context: &ParseContext) -> Result<u8, HandlerError> {
            Ok(self.0)
        }
    }

    fn run<R: 'static>(factory: &HandlerFactory<R>) -> AnyValue {
        let context = ParseContext::new("urn:test");
        let mut handler = factory.create(&context).unwrap();
        handler.on_start(&context, &Attributes::new()).unwrap();
        handler.finish(&context).unwrap()
    }

    #[test]
    fn test_registry_register_and_get() {
        let name = QualifiedName::new("urn:test", "byte");
        let mut registry = ElementRegistry::new();
        registry.register(name.clone(), HandlerFactory::new(|_| Constant(1)));

        assert!(registry.has_handler(&name));
        assert!(!registry.has_handler(&QualifiedName::new("urn:other", "byte")));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&name).is_some());
    }

    #[test]
    fn test_registry_remove() {
        let name = QualifiedName::new("urn:test", "byte");
        let mut registry = ElementRegistry::new().with(name.clone(), HandlerFactory::new(|_| Constant(1)));
        assert!(registry.remove(&name).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registered_names_are_ordered() {
        let registry: ElementRegistry<u8> = ["c", "a", "b"]
            .into_iter()
            .map(|local| (QualifiedName::new("urn:test", local), HandlerFactory::new(|_| Constant(0))))
            .collect();
        let names: Vec<&str> = registry.registered_names().map(QualifiedName::local_name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_factory_creates_fresh_handlers() {
        let factory = HandlerFactory::new(|_| Constant(7));
        let first = run(&factory).downcast::<u8>().unwrap();
        let second = run(&factory.clone()).downcast::<u8>().unwrap();
        assert_eq!((*first, *second), (7, 7));
    }

    #[test]
    fn test_try_new_propagates_refusal() {
        let factory: HandlerFactory<u8> =
            HandlerFactory::try_new(|_| Err::<Constant, _>(HandlerError::new("refused")));
        let context = ParseContext::new("urn:test");
        let err = factory.create(&context).err().unwrap();
        assert_eq!(err.message(), "refused");
    }

    #[test]
    fn test_factory_map_and_widen() {
        let mapped = HandlerFactory::new(|_| Constant(20)).map(|n| format!("n={n}"));
        assert_eq!(*run(&mapped).downcast::<String>().unwrap(), "n=20");

        let widened: HandlerFactory<i64> = HandlerFactory::new(|_| Constant(9)).widen();
        assert_eq!(*run(&widened).downcast::<i64>().unwrap(), 9);
    }

    #[test]
    fn test_mapped_factory_keeps_handler_name() {
        let factory = HandlerFactory::new(|_| Constant(0)).map(u32::from);
        let context = ParseContext::new("urn:test");
        let handler = factory.create(&context).unwrap();
        assert!(handler.name().starts_with("[map "));
        assert!(handler.name().contains("Constant"));
    }

    #[test]
    fn test_child_value_type_mismatch_is_an_error() {
        struct Sum(u32);
        impl ElementHandler<u32, u32> for Sum {
            fn on_child_result(&mut self, _c: &ParseContext, v: u32) -> Result<(), HandlerError> {
                self.0 += v;
                Ok(())
            }
            fn finish(&mut self, _context: &ParseContext) -> Result<u32, HandlerError> {
                Ok(self.0)
            }
        }

        let context = ParseContext::new("urn:test");
        let mut handler = HandlerFactory::new(|_| Sum(0)).create(&context).unwrap();
        handler.on_child_result(&context, Box::new(2u32)).unwrap();
        assert!(handler.on_child_result(&context, Box::new("two")).is_err());
        assert_eq!(*handler.finish(&context).unwrap().downcast::<u32>().unwrap(), 2);
    }
}
