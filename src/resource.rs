//! Resource lookup across an ordered chain of providers
//!
//! A resource name is a plain slash-separated path such as
//! `it/scoppelletti/myschema/1.xsd`. Lookup tries, in order, the providers
//! installed on the calling thread, the providers that define the library's
//! own resources, and the system-wide search path. The first provider that
//! opens the resource wins.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{ConfigurationError, ConfigurationResult};

/// Environment variable holding the system search path
pub const SEARCH_PATH_ENV: &str = "XSD_RESOLVE_PATH";

/// An open, readable resource; dropping it closes the underlying handle.
pub type ResourceStream = Box<dyn Read + Send>;

/// A place resources can be looked up
#[cfg_attr(test, mockall::automock)]
pub trait ResourceProvider: Send + Sync {
    /// Human-readable label used in diagnostics
    fn describe(&self) -> String;

    /// Open the named resource.
    ///
    /// `Ok(None)` means the resource is absent from this provider. An `Err`
    /// means the provider itself is unusable; callers skip it.
    fn open(&self, name: &str) -> io::Result<Option<ResourceStream>>;
}

/// Provider backed by a directory on the filesystem
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    root: PathBuf,
}

impl DirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a resource name below the root, refusing anything that escapes it
    fn resolve_path(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let mut path = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(path)
    }
}

impl ResourceProvider for DirectoryProvider {
    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }

    fn open(&self, name: &str) -> io::Result<Option<ResourceStream>> {
        if !self.root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("resource root {} is not a directory", self.root.display()),
            ));
        }

        let Some(path) = self.resolve_path(name) else {
            return Ok(None);
        };

        match File::open(&path) {
            Ok(file) if path.is_file() => Ok(Some(Box::new(file))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Provider holding resources in memory
#[derive(Debug, Clone, Default)]
pub struct EmbeddedProvider {
    label: String,
    resources: HashMap<String, Arc<[u8]>>,
}

impl EmbeddedProvider {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            resources: HashMap::new(),
        }
    }

    /// Register a resource, replacing any previous content under the same name
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.resources
            .insert(name.into(), Arc::from(data.into().into_boxed_slice()));
    }

    pub fn with_resource(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(name, data);
        self
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Cursor over shared bytes so the provider keeps a single copy
struct SharedBytes(Arc<[u8]>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl ResourceProvider for EmbeddedProvider {
    fn describe(&self) -> String {
        format!("embedded {}", self.label)
    }

    fn open(&self, name: &str) -> io::Result<Option<ResourceStream>> {
        Ok(self
            .resources
            .get(name)
            .map(|data| Box::new(Cursor::new(SharedBytes(Arc::clone(data)))) as ResourceStream))
    }
}

thread_local! {
    static THREAD_PROVIDERS: RefCell<Vec<(u64, Arc<dyn ResourceProvider>)>> = const { RefCell::new(Vec::new()) };
    static NEXT_PROVIDER_ID: Cell<u64> = const { Cell::new(0) };
}

/// Install a provider for the calling thread until the guard drops.
///
/// The most recently installed provider is consulted first. Guards may be
/// dropped in any order; each removes only the provider it installed.
pub fn push_thread_provider(provider: Arc<dyn ResourceProvider>) -> ThreadProviderGuard {
    let id = NEXT_PROVIDER_ID.with(|next| {
        let id = next.get();
        next.set(id.wrapping_add(1));
        id
    });
    THREAD_PROVIDERS.with(|providers| providers.borrow_mut().push((id, provider)));
    ThreadProviderGuard {
        id,
        _not_send: std::marker::PhantomData,
    }
}

/// Removes the provider installed by [`push_thread_provider`] on drop
#[must_use = "the provider is removed as soon as the guard is dropped"]
pub struct ThreadProviderGuard {
    id: u64,
    // Must drop on the thread that pushed.
    _not_send: std::marker::PhantomData<*const ()>,
}

impl Drop for ThreadProviderGuard {
    fn drop(&mut self) {
        THREAD_PROVIDERS.with(|providers| {
            providers.borrow_mut().retain(|(id, _)| *id != self.id);
        });
    }
}

/// Provider that reads the calling thread's installed providers
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadContextProvider;

impl ResourceProvider for ThreadContextProvider {
    fn describe(&self) -> String {
        "thread context".to_string()
    }

    fn open(&self, name: &str) -> io::Result<Option<ResourceStream>> {
        let providers: Vec<Arc<dyn ResourceProvider>> = THREAD_PROVIDERS.with(|providers| {
            providers
                .borrow()
                .iter()
                .rev()
                .map(|(_, provider)| Arc::clone(provider))
                .collect()
        });

        if providers.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "no provider installed on the current thread",
            ));
        }

        for provider in providers {
            match provider.open(name) {
                Ok(Some(stream)) => return Ok(Some(stream)),
                Ok(None) => {}
                Err(e) => debug!("Skipping {}: {}", provider.describe(), e),
            }
        }
        Ok(None)
    }
}

/// Several directories searched in order, like a class path
#[derive(Debug, Clone, Default)]
pub struct SearchPath {
    label: String,
    dirs: Vec<DirectoryProvider>,
}

impl SearchPath {
    pub fn new(label: impl Into<String>, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            label: label.into(),
            dirs: dirs.into_iter().map(DirectoryProvider::new).collect(),
        }
    }

    /// Parse a platform path list such as the value of [`SEARCH_PATH_ENV`]
    pub fn from_path_list(label: impl Into<String>, list: &str) -> Self {
        Self::new(
            label,
            std::env::split_paths(list).filter(|p| !p.as_os_str().is_empty()),
        )
    }

    pub fn dirs(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(DirectoryProvider::root)
    }
}

impl ResourceProvider for SearchPath {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn open(&self, name: &str) -> io::Result<Option<ResourceStream>> {
        if self.dirs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is empty", self.label),
            ));
        }

        for dir in &self.dirs {
            match dir.open(name) {
                Ok(Some(stream)) => return Ok(Some(stream)),
                Ok(None) => {}
                Err(e) => debug!("Skipping {}: {}", dir.describe(), e),
            }
        }
        Ok(None)
    }
}

/// Ordered list of providers
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn ResourceProvider>>,
}

impl ProviderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Thread context, then the library's defining roots, then the system search path
    pub fn standard(defining_roots: Vec<PathBuf>, system: SearchPath) -> Self {
        Self::new()
            .with(Arc::new(ThreadContextProvider))
            .with(Arc::new(SearchPath::new("defining roots", defining_roots)))
            .with(Arc::new(system))
    }

    pub fn with(mut self, provider: Arc<dyn ResourceProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn push(&mut self, provider: Arc<dyn ResourceProvider>) {
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Return the stream from the first provider holding `name`
    pub fn find(&self, name: &str) -> Option<ResourceStream> {
        for provider in &self.providers {
            match provider.open(name) {
                Ok(Some(stream)) => {
                    debug!("Resource {} found by {}.", name, provider.describe());
                    return Some(stream);
                }
                Ok(None) => {}
                Err(e) => debug!("Provider {} unavailable: {}", provider.describe(), e),
            }
        }

        debug!("Resource {} not found.", name);
        None
    }
}

impl fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.describe()))
            .finish()
    }
}

/// Looks a single, fixed resource name up across a provider chain
#[derive(Debug, Clone)]
pub struct ResourceLocator {
    name: String,
    chain: ProviderChain,
}

impl ResourceLocator {
    pub fn new(name: impl Into<String>, chain: ProviderChain) -> ConfigurationResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigurationError::BlankArgument { argument: "name" });
        }
        Ok(Self { name, chain })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absence is not an error: `None` just means no provider holds the resource.
    pub fn locate(&self) -> Option<ResourceStream> {
        self.chain.find(&self.name)
    }
}
