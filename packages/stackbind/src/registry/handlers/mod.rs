//! Reusable element handlers.

mod list;
mod one_of;
mod scalar;

pub use list::{ListMonoHandler, ListPolyHandler};
pub use one_of::OneOfHandler;
pub use scalar::{AttributeParser, ScalarAttributeHandler, ScalarElementHandler, TextParser};
