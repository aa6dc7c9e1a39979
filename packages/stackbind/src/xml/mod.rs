//! XML event sources.
//!
//! An [`EventSource`] turns a byte stream into the events of a
//! [`ContentSink`]. [`QuickXmlSource`] is the implementation used by
//! [`parse`](crate::parse); other sources can be supplied through
//! [`parse_with`](crate::parse_with).

mod position;
mod sink;
mod source;

pub use sink::{ContentSink, EventSource};
pub use source::QuickXmlSource;
