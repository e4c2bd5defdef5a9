//! SAX-style handler with content collection and delegated entity resolution
//!
//! [`XmlHandler`] exposes the callbacks a streaming parser invokes. Concrete
//! handlers embed a [`HandlerBase`] and get content collection, locator
//! tracking, entity delegation and diagnostic classification for free; they
//! only override the element hooks they care about.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::error::{CollectionStateError, ResolverError, Result, display_id};
use crate::schema::{EntityResolver, ResolvedResource};

/// Position handle shared between a parser and its handler.
///
/// The parser keeps a clone and moves it forward; the handler only reads it.
#[derive(Clone, Default)]
pub struct DocumentLocator {
    inner: Rc<LocatorState>,
}

#[derive(Default)]
struct LocatorState {
    public_id: RefCell<Option<String>>,
    system_id: RefCell<Option<String>>,
    line: Cell<u64>,
    column: Cell<u64>,
}

impl DocumentLocator {
    pub fn new(public_id: Option<String>, system_id: Option<String>) -> Self {
        let locator = Self::default();
        *locator.inner.public_id.borrow_mut() = public_id;
        *locator.inner.system_id.borrow_mut() = system_id;
        locator.set_position(1, 1);
        locator
    }

    pub fn public_id(&self) -> Option<String> {
        self.inner.public_id.borrow().clone()
    }

    pub fn system_id(&self) -> Option<String> {
        self.inner.system_id.borrow().clone()
    }

    pub fn line_number(&self) -> u64 {
        self.inner.line.get()
    }

    pub fn column_number(&self) -> u64 {
        self.inner.column.get()
    }

    pub fn set_position(&self, line: u64, column: u64) {
        self.inner.line.set(line);
        self.inner.column.set(column);
    }

    pub fn set_ids(&self, public_id: Option<String>, system_id: Option<String>) {
        *self.inner.public_id.borrow_mut() = public_id;
        *self.inner.system_id.borrow_mut() = system_id;
    }
}

impl fmt::Debug for DocumentLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentLocator")
            .field("public_id", &self.public_id())
            .field("system_id", &self.system_id())
            .field("line", &self.line_number())
            .field("column", &self.column_number())
            .finish()
    }
}

/// Positioned diagnostic reported by a parser
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error(
    "{message} [publicId={}, systemId={}, lineNumber={line_number}, columnNumber={column_number}]",
    display_id(.public_id),
    display_id(.system_id)
)]
pub struct SaxParseError {
    pub message: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
    pub line_number: u64,
    pub column_number: u64,
}

impl SaxParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            public_id: None,
            system_id: None,
            line_number: 0,
            column_number: 0,
        }
    }

    /// Stamp the diagnostic with the locator's current position
    pub fn at(message: impl Into<String>, locator: &DocumentLocator) -> Self {
        Self {
            message: message.into(),
            public_id: locator.public_id(),
            system_id: locator.system_id(),
            line_number: locator.line_number(),
            column_number: locator.column_number(),
        }
    }
}

/// Whether character data is currently being buffered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContentCollection {
    #[default]
    Inactive,
    Collecting(String),
}

impl ContentCollection {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Collecting(_))
    }

    pub fn start(&mut self) -> std::result::Result<(), CollectionStateError> {
        if self.is_active() {
            return Err(CollectionStateError::AlreadyActive);
        }
        *self = Self::Collecting(String::new());
        Ok(())
    }

    pub fn stop(&mut self) -> Option<String> {
        match std::mem::take(self) {
            Self::Collecting(text) => Some(text),
            Self::Inactive => None,
        }
    }

    /// Append `ch[start..start + length]`, clamped to the slice bounds
    pub fn append(&mut self, ch: &[char], start: usize, length: usize) {
        if let Self::Collecting(buffer) = self {
            let start = start.min(ch.len());
            let end = start.saturating_add(length).min(ch.len());
            buffer.extend(&ch[start..end]);
        }
    }
}

/// State shared by every handler
#[derive(Default)]
pub struct HandlerBase {
    locator: Option<DocumentLocator>,
    entity_resolver: Option<Arc<dyn EntityResolver>>,
    collection: ContentCollection,
}

impl HandlerBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity_resolver(entity_resolver: Arc<dyn EntityResolver>) -> Self {
        Self {
            entity_resolver: Some(entity_resolver),
            ..Self::default()
        }
    }

    pub fn collection(&self) -> &ContentCollection {
        &self.collection
    }
}

impl fmt::Debug for HandlerBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBase")
            .field("locator", &self.locator)
            .field("entity_resolver", &self.entity_resolver.is_some())
            .field("collection", &self.collection)
            .finish()
    }
}

/// Callbacks a streaming XML parser invokes, in document order
pub trait XmlHandler {
    fn base(&self) -> &HandlerBase;

    fn base_mut(&mut self) -> &mut HandlerBase;

    fn set_document_locator(&mut self, locator: DocumentLocator) {
        self.base_mut().locator = Some(locator);
    }

    fn document_locator(&self) -> Option<&DocumentLocator> {
        self.base().locator.as_ref()
    }

    fn characters(&mut self, ch: &[char], start: usize, length: usize) -> Result<()> {
        self.base_mut().collection.append(ch, start, length);
        Ok(())
    }

    fn ignorable_whitespace(&mut self, ch: &[char], start: usize, length: usize) -> Result<()> {
        self.characters(ch, start, length)
    }

    fn start_collecting(&mut self) -> std::result::Result<(), CollectionStateError> {
        self.base_mut().collection.start()
    }

    /// `None` if collection was never started
    fn stop_collecting(&mut self) -> Option<String> {
        self.base_mut().collection.stop()
    }

    fn set_entity_resolver(&mut self, entity_resolver: Option<Arc<dyn EntityResolver>>) {
        self.base_mut().entity_resolver = entity_resolver;
    }

    fn entity_resolver(&self) -> Option<&Arc<dyn EntityResolver>> {
        self.base().entity_resolver.as_ref()
    }

    fn resolve_entity(
        &mut self,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<Option<ResolvedResource>> {
        match self.entity_resolver() {
            Some(resolver) => resolver.resolve_entity(public_id, system_id),
            None => Ok(None),
        }
    }

    fn start_element(&mut self, _name: &str, _attributes: &[(String, String)]) -> Result<()> {
        Ok(())
    }

    fn end_element(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    /// The parser stops on its own after a fatal error, so this only logs.
    fn fatal_error(&mut self, ex: &SaxParseError) -> Result<()> {
        error!("{}", ex);
        Ok(())
    }

    fn error(&mut self, ex: &SaxParseError) -> Result<()> {
        Err(ResolverError::Build {
            message: ex.to_string(),
        })
    }

    fn warning(&mut self, ex: &SaxParseError) -> Result<()> {
        warn!("{}", ex);
        Ok(())
    }
}

impl XmlHandler for HandlerBase {
    fn base(&self) -> &HandlerBase {
        self
    }

    fn base_mut(&mut self) -> &mut HandlerBase {
        self
    }
}

/// Text of one collected element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectedText {
    pub element: String,
    pub line: u64,
    pub text: String,
}

/// Collects the text content of every element with one of the given local names.
///
/// Text of nested elements is included; a matching element nested inside
/// another match is part of the outer span.
#[derive(Debug, Default)]
pub struct ElementTextCollector {
    base: HandlerBase,
    names: HashSet<String>,
    depth: usize,
    open: Option<(String, usize, u64)>,
    collected: Vec<CollectedText>,
}

impl ElementTextCollector {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn collected(&self) -> &[CollectedText] {
        &self.collected
    }

    pub fn into_collected(self) -> Vec<CollectedText> {
        self.collected
    }
}

fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

impl XmlHandler for ElementTextCollector {
    fn base(&self) -> &HandlerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut HandlerBase {
        &mut self.base
    }

    fn start_element(&mut self, name: &str, _attributes: &[(String, String)]) -> Result<()> {
        self.depth += 1;
        if self.open.is_none() && self.names.contains(local_name(name)) {
            self.start_collecting()?;
            let line = self.document_locator().map_or(0, DocumentLocator::line_number);
            self.open = Some((local_name(name).to_string(), self.depth, line));
        }
        Ok(())
    }

    fn end_element(&mut self, _name: &str) -> Result<()> {
        if let Some((element, depth, line)) = self.open.take() {
            if depth == self.depth {
                let text = self.stop_collecting().unwrap_or_default();
                self.collected.push(CollectedText { element, line, text });
            } else {
                self.open = Some((element, depth, line));
            }
        }
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }
}
