//! # xsd-resolve Library
//!
//! Resolves versioned XML schema URIs to packaged resources, locates those
//! resources through an ordered provider chain, and drives SAX-style handlers
//! that can collect the text content of selected elements.

pub mod cli;
pub mod config;
pub mod error;
pub mod error_reporter;
pub mod handler;
pub mod output;
pub mod parser;
pub mod resource;
pub mod schema;

pub use cli::{Cli, Command, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager};
pub use error::{
    CollectionStateError, ConfigurationError, ResolverError, Result, SchemaResolutionError,
};
pub use error_reporter::ErrorReporter;
pub use handler::{
    CollectedText, ContentCollection, DocumentLocator, ElementTextCollector, HandlerBase,
    SaxParseError, XmlHandler,
};
pub use output::{Output, ParseReport, ResolutionReport};
pub use parser::{
    EntityKind, ParseOutcome, ParserOptions, ResolvedEntity, SaxParser, parse_boolean,
};
pub use resource::{
    DirectoryProvider, EmbeddedProvider, ProviderChain, ResourceLocator, ResourceProvider,
    ResourceStream, SearchPath, ThreadContextProvider, ThreadProviderGuard, push_thread_provider,
};
pub use schema::{
    EntityResolver, RESOURCE_PREFIX, ResolvedResource, ResolverConfig, SCHEMA_EXT,
    SchemaEntityResolver, URI_PREFIX,
};
