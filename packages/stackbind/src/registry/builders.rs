//! Constructors for factories of the reusable handlers.
//!
//! These cover the common shapes of an XML schema: text leaves, attribute
//! leaves, lists and choices. Anything else is written as a custom
//! [`ElementHandler`](super::ElementHandler).

use std::error::Error as StdError;
use std::sync::Arc;

use super::core::{ElementRegistry, HandlerFactory};
use super::handler::IgnorePolicy;
use super::handlers::{
    AttributeParser, ListMonoHandler, ListPolyHandler, OneOfHandler, ScalarAttributeHandler,
    ScalarElementHandler, TextParser,
};
use super::types::{Attributes, ParseContext};
use crate::error::HandlerError;
use crate::name::QualifiedName;

/// Factory for an element whose complete text is parsed by `parser`.
///
/// # Examples
/// ```
/// use stackbind::{for_scalar, HandlerError, QualifiedName};
///
/// let int = for_scalar(QualifiedName::new("urn:tests", "int"), |_context, text| {
///     text.trim().parse::<i64>().map_err(HandlerError::from_error)
/// });
/// ```
pub fn for_scalar<S, F>(name: QualifiedName, parser: F) -> HandlerFactory<S>
where
    S: 'static,
    F: Fn(&ParseContext, &str) -> Result<S, HandlerError> + Send + Sync + 'static,
{
    let parser: Arc<TextParser<S>> = Arc::new(parser);
    HandlerFactory::new(move |_context| ScalarElementHandler::new(name.clone(), Arc::clone(&parser)))
}

/// Factory for an element whose value is its text, unchanged.
#[must_use]
pub fn for_scalar_string(name: QualifiedName) -> HandlerFactory<String> {
    for_scalar(name, |_context, text| Ok(text.to_string()))
}

/// Factory for an element whose text is converted by a context-free function.
///
/// Conversion errors are kept as the source of the resulting handler error.
pub fn for_scalar_from_string<S, E, F>(name: QualifiedName, convert: F) -> HandlerFactory<S>
where
    S: 'static,
    E: StdError + Send + Sync + 'static,
    F: Fn(&str) -> Result<S, E> + Send + Sync + 'static,
{
    for_scalar(name, move |_context, text| {
        convert(text).map_err(HandlerError::from_error)
    })
}

/// Factory for an element whose value is computed from its attributes.
pub fn for_scalar_attribute<S, F>(name: QualifiedName, parser: F) -> HandlerFactory<S>
where
    S: 'static,
    F: Fn(&ParseContext, &Attributes) -> Result<S, HandlerError> + Send + Sync + 'static,
{
    let parser: Arc<AttributeParser<S>> = Arc::new(parser);
    HandlerFactory::new(move |_context| {
        ScalarAttributeHandler::new(name.clone(), Arc::clone(&parser))
    })
}

/// Factory for a list element containing items named `item_name`.
#[must_use]
pub fn for_list_mono<S: 'static>(
    name: QualifiedName,
    item_name: QualifiedName,
    item: HandlerFactory<S>,
    policy: IgnorePolicy,
) -> HandlerFactory<Vec<S>> {
    HandlerFactory::new(move |_context| {
        ListMonoHandler::new(name.clone(), item_name.clone(), item.clone(), policy)
    })
}

/// Factory for a list element containing items of any of the given elements.
#[must_use]
pub fn for_list_poly<S: 'static>(
    name: QualifiedName,
    items: ElementRegistry<S>,
    policy: IgnorePolicy,
) -> HandlerFactory<Vec<S>> {
    HandlerFactory::new(move |_context| ListPolyHandler::new(name.clone(), items.clone(), policy))
}

/// Factory for an element containing exactly one of the given elements.
#[must_use]
pub fn for_one_of<S: 'static>(alternatives: ElementRegistry<S>) -> HandlerFactory<S> {
    HandlerFactory::new(move |_context| OneOfHandler::new(alternatives.clone()))
}

/// Map the result of every handler created by `factory`.
#[must_use]
pub fn map_factory<R, X, G>(factory: HandlerFactory<R>, function: G) -> HandlerFactory<X>
where
    R: 'static,
    X: 'static,
    G: Fn(R) -> X + Send + Sync + 'static,
{
    factory.map(function)
}

/// Convert a factory's result into a more general type.
#[must_use]
pub fn widen_factory<R, X>(factory: HandlerFactory<R>) -> HandlerFactory<X>
where
    R: Into<X> + 'static,
    X: 'static,
{
    factory.widen()
}
