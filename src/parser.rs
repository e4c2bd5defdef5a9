//! Streaming XML driver feeding an [`XmlHandler`]
//!
//! Wraps quick-xml's namespace-aware reader and turns its event stream into
//! SAX callbacks. The locator is installed before any content event and moved
//! to the end of each event as it is delivered. External references (DOCTYPE
//! external ids and `xsi:schemaLocation` hints) go through
//! `XmlHandler::resolve_entity` before the referencing element is reported.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, QName, ResolveResult};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::{ResolverError, Result};
use crate::handler::{DocumentLocator, SaxParseError, XmlHandler};

/// Namespace of `xsi:schemaLocation` and `xsi:noNamespaceSchemaLocation`
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Namespace of XML Schema documents
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Cached regex for DOCTYPE external identifiers
static DOCTYPE_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_doctype_regex() -> &'static Regex {
    DOCTYPE_REGEX.get_or_init(|| {
        Regex::new(
            r#"^\s*\S+\s+(?:SYSTEM\s+(?:"([^"]*)"|'([^']*)')|PUBLIC\s+(?:"([^"]*)"|'([^']*)')\s+(?:"([^"]*)"|'([^']*)'))"#,
        )
        .expect("Failed to compile DOCTYPE regex")
    })
}

/// Parse an XML boolean: `true` or `1`, ignoring case and surrounding blanks
pub fn parse_boolean(value: Option<&str>) -> bool {
    matches!(
        value.unwrap_or_default().trim().to_lowercase().as_str(),
        "true" | "1"
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Resolve `xsi:schemaLocation` and `xsi:noNamespaceSchemaLocation` hints
    pub resolve_schema_locations: bool,
    /// Report whitespace-only text through `ignorable_whitespace`
    pub report_ignorable_whitespace: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            resolve_schema_locations: true,
            report_ignorable_whitespace: true,
        }
    }
}

/// Kind of external reference met while parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Doctype,
    Schema,
}

/// External reference that a handler resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEntity {
    pub kind: EntityKind,
    pub public_id: Option<String>,
    pub system_id: String,
    pub resource_name: String,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseOutcome {
    pub elements: usize,
    pub warnings: usize,
    pub resolved: Vec<ResolvedEntity>,
}

/// Maps byte offsets to 1-based line and column numbers; columns count characters
struct LineIndex<'a> {
    content: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(content: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            content,
            line_starts,
        }
    }

    fn position(&self, offset: u64) -> (u64, u64) {
        let offset = (offset as usize).min(self.content.len());
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let start = *self.line_starts.get(line.saturating_sub(1)).unwrap_or(&0);
        let column = self
            .content
            .get(start..offset)
            .map_or(offset - start, |text| text.chars().count())
            + 1;
        (line as u64, column as u64)
    }
}

fn is_bound_to(ns: &ResolveResult<'_>, uri: &str) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(bound)) if *bound == uri.as_bytes())
}

/// Check that resolved content is a well-formed XML Schema document: its root
/// element must be `schema` in the XML Schema namespace
fn is_schema_document(data: &[u8]) -> bool {
    let Ok(content) = std::str::from_utf8(data) else {
        return false;
    };

    let mut reader = NsReader::from_str(content);
    let mut root = None;
    let mut depth = 0usize;
    loop {
        let event = reader.read_event();
        if let Ok(Event::Start(e) | Event::Empty(e)) = &event {
            if root.is_none() {
                let (ns, local) = reader.resolve_element(e.name());
                root = Some(is_bound_to(&ns, XSD_NAMESPACE) && local.as_ref() == b"schema");
            }
        }
        match event {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => return depth == 0 && root.unwrap_or(false),
            Ok(_) => {}
            Err(_) => return false,
        }
    }
}

/// Split a DOCTYPE body into `(public_id, system_id)`
fn doctype_external_id(body: &str) -> Option<(Option<String>, String)> {
    let caps = get_doctype_regex().captures(body)?;
    let group = |a: usize, b: usize| caps.get(a).or_else(|| caps.get(b)).map(|m| m.as_str().to_string());

    if let Some(system_id) = group(1, 2) {
        return Some((None, system_id));
    }
    let public_id = group(3, 4);
    let system_id = group(5, 6)?;
    Some((public_id, system_id))
}

/// Schema-location hint carried by an `xsi:` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchemaHint {
    /// Namespace and location pairs
    SchemaLocation,
    /// A single location
    NoNamespaceSchemaLocation,
}

impl SchemaHint {
    /// Classify an attribute by its resolved namespace and local name
    fn of<R>(reader: &NsReader<R>, key: QName<'_>) -> Option<Self> {
        let (ns, local) = reader.resolve_attribute(key);
        if !is_bound_to(&ns, XSI_NAMESPACE) {
            return None;
        }
        match local.as_ref() {
            b"schemaLocation" => Some(Self::SchemaLocation),
            b"noNamespaceSchemaLocation" => Some(Self::NoNamespaceSchemaLocation),
            _ => None,
        }
    }

    fn locations(self, value: &str) -> Vec<String> {
        match self {
            Self::SchemaLocation => value
                .split_whitespace()
                .skip(1)
                .step_by(2)
                .map(str::to_string)
                .collect(),
            Self::NoNamespaceSchemaLocation => value
                .split_whitespace()
                .next()
                .map(str::to_string)
                .into_iter()
                .collect(),
        }
    }
}

/// Event-driven XML parser
#[derive(Debug, Clone, Default)]
pub struct SaxParser {
    options: ParserOptions,
}

struct Session<'h, H: XmlHandler + ?Sized> {
    options: ParserOptions,
    handler: &'h mut H,
    locator: DocumentLocator,
    outcome: ParseOutcome,
}

impl<H: XmlHandler + ?Sized> Session<'_, H> {
    fn fatal(&mut self, message: impl Into<String>) -> ResolverError {
        let ex = SaxParseError::at(message, &self.locator);
        if let Err(e) = self.handler.fatal_error(&ex) {
            return e;
        }
        ResolverError::Xml {
            line: ex.line_number,
            column: ex.column_number,
            details: ex.message,
        }
    }

    fn resolve(&mut self, kind: EntityKind, public_id: Option<String>, system_id: String) -> Result<()> {
        debug!("Resolving {:?} entity {}", kind, system_id);
        let resolved = self
            .handler
            .resolve_entity(public_id.as_deref(), Some(system_id.as_str()))?;

        let Some(mut resolved) = resolved else {
            self.outcome.warnings += 1;
            let ex = SaxParseError::at(format!("External entity {system_id} not resolved"), &self.locator);
            return self.handler.warning(&ex);
        };

        let mut data = Vec::new();
        resolved.stream.read_to_end(&mut data)?;
        drop(resolved.stream);

        if kind == EntityKind::Schema && !is_schema_document(&data) {
            let ex = SaxParseError::at(
                format!("Resource {} is not an XML Schema", resolved.resource_name),
                &self.locator,
            );
            self.handler.error(&ex)?;
        }

        self.outcome.resolved.push(ResolvedEntity {
            kind,
            public_id,
            system_id,
            resource_name: resolved.resource_name,
            size_bytes: data.len(),
        });
        Ok(())
    }

    fn text(&mut self, text: &str, depth: usize) -> Result<()> {
        if depth == 0 || text.is_empty() {
            return Ok(());
        }
        let ch: Vec<char> = text.chars().collect();
        if text.trim().is_empty() {
            if self.options.report_ignorable_whitespace {
                self.handler.ignorable_whitespace(&ch, 0, ch.len())?;
            }
            Ok(())
        } else {
            self.handler.characters(&ch, 0, ch.len())
        }
    }

    fn start<R>(&mut self, reader: &NsReader<R>, e: &BytesStart<'_>) -> Result<String> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();

        let mut attributes = Vec::new();
        let mut locations = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| self.fatal(err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| self.fatal(err.to_string()))?
                .into_owned();
            if self.options.resolve_schema_locations {
                if let Some(hint) = SchemaHint::of(reader, attr.key) {
                    locations.extend(hint.locations(&value));
                }
            }
            attributes.push((key, value));
        }

        for location in locations {
            self.resolve(EntityKind::Schema, None, location)?;
        }

        self.outcome.elements += 1;
        self.handler.start_element(&name, &attributes)?;
        Ok(name)
    }
}

impl SaxParser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ParserOptions {
        self.options
    }

    /// Parse a document held in memory
    pub fn parse_str<H>(&self, content: &str, system_id: Option<&str>, handler: &mut H) -> Result<ParseOutcome>
    where
        H: XmlHandler + ?Sized,
    {
        let locator = DocumentLocator::new(None, system_id.map(str::to_owned));
        handler.set_document_locator(locator.clone());

        let mut session = Session {
            options: self.options,
            handler,
            locator,
            outcome: ParseOutcome::default(),
        };

        let index = LineIndex::new(content);
        let mut reader = NsReader::from_str(content);
        reader.config_mut().trim_text(false);
        reader.config_mut().expand_empty_elements = true;

        let mut stack: Vec<String> = Vec::new();
        let mut seen_root = false;

        loop {
            let event = reader.read_event();
            let (line, column) = index.position(reader.buffer_position());
            session.locator.set_position(line, column);

            match event {
                Ok(Event::Start(e)) => {
                    if seen_root && stack.is_empty() {
                        return Err(session.fatal("Content is not allowed after the root element"));
                    }
                    seen_root = true;
                    let name = session.start(&reader, &e)?;
                    stack.push(name);
                }
                Ok(Event::End(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    stack.pop();
                    session.handler.end_element(&name)?;
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|err| session.fatal(err.to_string()))?;
                    if stack.is_empty() && !text.trim().is_empty() {
                        return Err(session.fatal("Content is not allowed outside the root element"));
                    }
                    session.text(&text, stack.len())?;
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    let ch: Vec<char> = text.chars().collect();
                    if !stack.is_empty() {
                        session.handler.characters(&ch, 0, ch.len())?;
                    }
                }
                Ok(Event::DocType(e)) => {
                    let body = String::from_utf8_lossy(&e).into_owned();
                    if let Some((public_id, system_id)) = doctype_external_id(&body) {
                        session.resolve(EntityKind::Doctype, public_id, system_id)?;
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(session.fatal(e.to_string())),
            }
        }

        if !stack.is_empty() {
            return Err(session.fatal(format!(
                "Element {} is not closed before the end of the document",
                stack.last().map(String::as_str).unwrap_or_default()
            )));
        }
        if !seen_root {
            return Err(session.fatal("Premature end of file"));
        }

        Ok(session.outcome)
    }

    /// Parse a document from any reader; input must be UTF-8
    pub fn parse_reader<R, H>(&self, mut input: R, system_id: Option<&str>, handler: &mut H) -> Result<ParseOutcome>
    where
        R: Read,
        H: XmlHandler + ?Sized,
    {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;

        match String::from_utf8(data) {
            Ok(content) => self.parse_str(&content, system_id, handler),
            Err(e) => {
                let locator = DocumentLocator::new(None, system_id.map(str::to_owned));
                handler.set_document_locator(locator.clone());
                let ex = SaxParseError::at(format!("Invalid UTF-8 input: {e}"), &locator);
                handler.fatal_error(&ex)?;
                Err(ResolverError::Xml {
                    line: ex.line_number,
                    column: ex.column_number,
                    details: ex.message,
                })
            }
        }
    }

    /// Parse a file; its path becomes the document's system id
    pub fn parse_file<H>(&self, path: &Path, handler: &mut H) -> Result<ParseOutcome>
    where
        H: XmlHandler + ?Sized,
    {
        let file = fs::File::open(path)?;
        let system_id = path.display().to_string();
        self.parse_reader(file, Some(&system_id), handler)
    }
}
