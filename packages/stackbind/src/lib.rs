//! Stackbind - Streaming binding of namespace-qualified XML to Rust values.
//!
//! Documents are read as a stream of events. Each element gets its own
//! [`ElementHandler`], chosen by qualified name from the handlers its parent
//! accepts, and every handler turns its element into one typed value. Nothing
//! is materialized as a tree.
//!
//! # Example
//!
//! ```
//! use stackbind::{for_scalar_from_string, parse_str, ElementRegistry, QualifiedName};
//!
//! let count = QualifiedName::new("urn:example", "count");
//! let roots = ElementRegistry::new()
//!     .with(count.clone(), for_scalar_from_string(count, str::parse::<u32>));
//!
//! let value = parse_str("urn:doc", r#"<count xmlns="urn:example">42</count>"#, roots).unwrap();
//! assert_eq!(value, 42);
//! ```
//!
//! # Architecture
//!
//! - [`name`]: Qualified element names
//! - [`registry`]: Handler contract, factories, the stack engine and reusable handlers
//! - [`xml`]: Event source seam and the `quick-xml` based source
//! - [`driver`]: Whole-document parsing with a flat root handler table
//! - [`dispatch`]: Whole-document parsing with root handlers chosen by namespace
//! - [`diagnostics`]: Structured parse errors
//! - [`error`]: Error types and Result alias
//! - [`config`]: Configuration constants and source settings

pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod name;
pub mod registry;
pub mod xml;

// Re-export commonly used items
pub use diagnostics::{LexicalPosition, ParseError, ParseErrorBuilder, Severity};
pub use dispatch::{parse_dispatching, NamespaceDispatcher, NamespaceDispatcherBuilder};
pub use driver::{parse, parse_str, parse_with, DocumentHandler, DocumentHandlerBuilder};
pub use error::{
    DocumentError, EventSourceError, HandlerError, ParseFailure, Result, StackError,
};
pub use name::QualifiedName;
pub use registry::builders::{
    for_list_mono, for_list_poly, for_one_of, for_scalar, for_scalar_attribute,
    for_scalar_from_string, for_scalar_string, map_factory, widen_factory,
};
pub use registry::{
    Attribute, Attributes, ElementHandler, ElementRegistry, HandlerFactory, IgnorePolicy,
    NoChildren, ParseContext, ParseEngine,
};
pub use xml::{ContentSink, EventSource, QuickXmlSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
