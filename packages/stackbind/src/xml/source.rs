//! Event source built on `quick-xml`'s namespace-aware reader.

use std::io::BufRead;

use quick_xml::events::attributes::Attribute as XmlAttribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, ResolveResult};
use quick_xml::NsReader;

use super::position::PositionTracking;
use super::sink::{ContentSink, EventSource};
use crate::config::SourceConfig;
use crate::error::{ConfigError, EventSourceError};
use crate::name::QualifiedName;
use crate::registry::Attributes;

type Reader<'a> = NsReader<PositionTracking<&'a mut dyn BufRead>>;

/// Owned form of one reader event.
enum Parsed {
    Start {
        name: QualifiedName,
        attributes: Attributes,
    },
    Empty {
        name: QualifiedName,
        attributes: Attributes,
    },
    End {
        name: QualifiedName,
    },
    Text {
        text: String,
        outside_root: bool,
    },
    DocType,
    Eof,
    Skip,
}

/// A namespace declaration or an attribute that could not be resolved.
enum Side {
    Mapping { prefix: String, uri: String },
    UnboundAttribute(String),
}

/// [`EventSource`] reading well-formed, namespace-qualified XML.
///
/// Empty elements are delivered as a start and a finish event. Comments,
/// processing instructions, the XML declaration and the doctype are
/// skipped; entities declared in a doctype are never expanded.
#[derive(Debug, Clone, Default)]
pub struct QuickXmlSource {
    config: SourceConfig,
}

impl QuickXmlSource {
    /// Create a source with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source with the given configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn with_config(config: SourceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }
}

impl EventSource for QuickXmlSource {
    fn parse(
        &mut self,
        source_id: &str,
        input: &mut dyn BufRead,
        sink: &mut dyn ContentSink,
    ) -> Result<(), EventSourceError> {
        let mut reader = NsReader::from_reader(PositionTracking::new(input));
        let reader_config = reader.config_mut();
        reader_config.trim_text(self.config.trim_text);
        reader_config.check_end_names = self.config.check_end_names;
        reader_config.check_comments = self.config.check_comments;
        reader_config.expand_empty_elements = false;

        tracing::debug!(source = source_id, "Reading XML document");
        sink.document_started()?;

        let mut buf = Vec::new();
        let mut depth = 0usize;
        let mut seen_root = false;

        loop {
            buf.clear();
            let mut side = Vec::new();
            let parsed = read_event(&mut reader, &mut buf, depth, &mut side);
            let (line, column) = reader.get_ref().position();
            sink.position_changed(line, column);

            let parsed = match parsed {
                Ok(parsed) => parsed,
                Err(err) => return Err(fatal(sink, err.at(line, column))),
            };

            for entry in side {
                match entry {
                    Side::Mapping { prefix, uri } => sink.namespace_prefix_mapped(&prefix, &uri)?,
                    Side::UnboundAttribute(name) => sink.error(
                        EventSourceError::new(format!("Unbound namespace prefix on attribute {name}"))
                            .at(line, column),
                    ),
                }
            }

            match parsed {
                Parsed::Start { .. } | Parsed::Empty { .. } if depth == 0 && seen_root => {
                    let err = EventSourceError::new("Only one root element is allowed");
                    return Err(fatal(sink, err.at(line, column)));
                }
                Parsed::Start { name, attributes } => {
                    if depth >= self.config.max_depth {
                        let err = too_deep(self.config.max_depth);
                        return Err(fatal(sink, err.at(line, column)));
                    }
                    seen_root = true;
                    depth += 1;
                    sink.element_started(&name, &attributes)?;
                }
                Parsed::Empty { name, attributes } => {
                    if depth >= self.config.max_depth {
                        let err = too_deep(self.config.max_depth);
                        return Err(fatal(sink, err.at(line, column)));
                    }
                    seen_root = true;
                    sink.element_started(&name, &attributes)?;
                    sink.element_finished(&name)?;
                }
                Parsed::End { name } => {
                    depth = depth.saturating_sub(1);
                    sink.element_finished(&name)?;
                }
                Parsed::Text { text, outside_root } => {
                    if outside_root {
                        let err = EventSourceError::new("Content is not allowed outside the root element");
                        return Err(fatal(sink, err.at(line, column)));
                    }
                    if !text.is_empty() {
                        sink.characters(&text)?;
                    }
                }
                Parsed::DocType => {
                    sink.warning(
                        EventSourceError::new("Document type declaration ignored").at(line, column),
                    );
                }
                Parsed::Eof => {
                    if depth > 0 {
                        let err = EventSourceError::new(format!(
                            "Unexpected end of document with {depth} element(s) still open"
                        ));
                        return Err(fatal(sink, err.at(line, column)));
                    }
                    if !seen_root {
                        let err = EventSourceError::new("Premature end of document: no root element");
                        return Err(fatal(sink, err.at(line, column)));
                    }
                    break;
                }
                Parsed::Skip => {}
            }
        }

        sink.document_finished()
    }
}

/// Report a fatal error to `sink` and return the error to raise.
fn fatal(sink: &mut dyn ContentSink, error: EventSourceError) -> EventSourceError {
    match sink.fatal_error(error.clone()) {
        Ok(()) => error,
        Err(raised) => raised,
    }
}

fn too_deep(max_depth: usize) -> EventSourceError {
    EventSourceError::new(format!(
        "Element nesting exceeds the maximum depth of {max_depth}"
    ))
}

/// Read one event and convert it to owned data.
fn read_event(
    reader: &mut Reader<'_>,
    buf: &mut Vec<u8>,
    depth: usize,
    side: &mut Vec<Side>,
) -> Result<Parsed, EventSourceError> {
    let (resolved, event) = reader
        .read_resolved_event_into(buf)
        .map_err(EventSourceError::from_error)?;
    let namespace = owned_namespace(resolved);

    match event {
        Event::Start(start) => Ok(Parsed::Start {
            name: QualifiedName::new(namespace?, local_name(&start)?),
            attributes: read_attributes(reader, &start, side)?,
        }),
        Event::Empty(start) => Ok(Parsed::Empty {
            name: QualifiedName::new(namespace?, local_name(&start)?),
            attributes: read_attributes(reader, &start, side)?,
        }),
        Event::End(end) => Ok(Parsed::End {
            name: QualifiedName::new(namespace?, utf8(end.local_name().as_ref())?),
        }),
        Event::Text(text) if depth == 0 => Ok(Parsed::Text {
            outside_root: !text.iter().all(u8::is_ascii_whitespace),
            text: String::new(),
        }),
        Event::Text(text) => Ok(Parsed::Text {
            text: text
                .unescape()
                .map_err(EventSourceError::from_error)?
                .into_owned(),
            outside_root: false,
        }),
        Event::CData(data) => Ok(Parsed::Text {
            text: reader
                .decoder()
                .decode(&data)
                .map_err(EventSourceError::from_error)?
                .into_owned(),
            outside_root: depth == 0,
        }),
        Event::DocType(_) => Ok(Parsed::DocType),
        Event::Eof => Ok(Parsed::Eof),
        _ => Ok(Parsed::Skip),
    }
}

fn owned_namespace(resolved: ResolveResult<'_>) -> Result<String, EventSourceError> {
    match resolved {
        ResolveResult::Bound(namespace) => utf8(namespace.as_ref()),
        ResolveResult::Unbound => Ok(String::new()),
        ResolveResult::Unknown(prefix) => Err(EventSourceError::new(format!(
            "Unbound namespace prefix {}",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn local_name(start: &BytesStart<'_>) -> Result<String, EventSourceError> {
    utf8(start.local_name().as_ref())
}

fn utf8(bytes: &[u8]) -> Result<String, EventSourceError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(EventSourceError::from_error)
}

/// Split the attributes of `start` into namespace declarations and
/// resolved attributes.
fn read_attributes(
    reader: &Reader<'_>,
    start: &BytesStart<'_>,
    side: &mut Vec<Side>,
) -> Result<Attributes, EventSourceError> {
    let mut attributes = Attributes::new();
    for attribute in start.attributes() {
        let attribute: XmlAttribute<'_> = attribute.map_err(EventSourceError::from_error)?;
        let value = attribute
            .unescape_value()
            .map_err(EventSourceError::from_error)?
            .into_owned();

        if let Some(binding) = attribute.key.as_namespace_binding() {
            let prefix = match binding {
                PrefixDeclaration::Default => String::new(),
                PrefixDeclaration::Named(prefix) => utf8(prefix)?,
            };
            side.push(Side::Mapping { prefix, uri: value });
            continue;
        }

        let (resolved, local) = reader.resolve_attribute(attribute.key);
        match owned_namespace(resolved) {
            Ok(namespace) => {
                attributes.push(QualifiedName::new(namespace, utf8(local.as_ref())?), value);
            }
            Err(_) => side.push(Side::UnboundAttribute(utf8(attribute.key.as_ref())?)),
        }
    }
    Ok(attributes)
}
