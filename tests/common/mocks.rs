use std::io::{self, Cursor};
use std::sync::{Arc, Mutex};

use xsd_resolve::{
    HandlerBase, ResourceProvider, ResourceStream, Result, SaxParseError, XmlHandler,
};

/// Provider that serves fixed content and records every lookup
pub struct RecordingProvider {
    label: String,
    resources: Vec<(String, String)>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl RecordingProvider {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            resources: Vec::new(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_resource(mut self, name: &str, content: &str) -> Self {
        self.resources.push((name.to_string(), content.to_string()));
        self
    }

    /// Shared handle on the lookup log, usable after the provider is moved into a chain
    pub fn request_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.requests)
    }
}

impl ResourceProvider for RecordingProvider {
    fn describe(&self) -> String {
        format!("recording {}", self.label)
    }

    fn open(&self, name: &str) -> io::Result<Option<ResourceStream>> {
        self.requests.lock().unwrap().push(name.to_string());
        Ok(self
            .resources
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, content)| Box::new(Cursor::new(content.clone().into_bytes())) as ResourceStream))
    }
}

/// Provider whose backing store is unusable
pub struct UnavailableProvider;

impl ResourceProvider for UnavailableProvider {
    fn describe(&self) -> String {
        "unavailable".to_string()
    }

    fn open(&self, _name: &str) -> io::Result<Option<ResourceStream>> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "access denied"))
    }
}

/// Diagnostic received by a [`RecordingHandler`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Warning(String),
    Error(String),
    Fatal(String),
}

/// Handler that keeps element names and diagnostics while delegating the rest to its base
#[derive(Debug, Default)]
pub struct RecordingHandler {
    base: HandlerBase,
    pub elements: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RecordingHandler {
    pub fn new(base: HandlerBase) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }
}

impl XmlHandler for RecordingHandler {
    fn base(&self) -> &HandlerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut HandlerBase {
        &mut self.base
    }

    fn start_element(&mut self, name: &str, _attributes: &[(String, String)]) -> Result<()> {
        self.elements.push(name.to_string());
        Ok(())
    }

    fn fatal_error(&mut self, ex: &SaxParseError) -> Result<()> {
        self.diagnostics.push(Diagnostic::Fatal(ex.message.clone()));
        Ok(())
    }

    fn error(&mut self, ex: &SaxParseError) -> Result<()> {
        self.diagnostics.push(Diagnostic::Error(ex.message.clone()));
        Ok(())
    }

    fn warning(&mut self, ex: &SaxParseError) -> Result<()> {
        self.diagnostics.push(Diagnostic::Warning(ex.message.clone()));
        Ok(())
    }
}
