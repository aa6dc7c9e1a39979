//! Element registry system for stack-based XML parsing.
//!
//! Handlers are registered per qualified element name through
//! [`HandlerFactory`] values. The [`ParseEngine`] creates one handler per
//! element instance, routes events to the handler of the innermost open
//! element and hands each finished value to the parent handler.

pub mod builders;
mod core;
mod engine;
mod handler;
pub mod handlers;
mod types;

pub use self::core::{ElementRegistry, HandlerFactory};
pub use engine::ParseEngine;
pub use handler::{ElementHandler, IgnorePolicy, Mapped, NoChildren};
pub use types::{Attribute, Attributes, ParseContext};
