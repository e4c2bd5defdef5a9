use thiserror::Error;

/// Main library error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Schema resolution error: {0}")]
    SchemaResolution(#[from] SchemaResolutionError),

    #[error("Collection state error: {0}")]
    CollectionState(#[from] CollectionStateError),

    /// Raised by a handler that turns a recoverable parser error into a hard failure.
    #[error("Build error: {message}")]
    Build { message: String },

    #[error("XML parsing error at line {line}, column {column}: {details}")]
    Xml {
        line: u64,
        column: u64,
        details: String,
    },
}

/// Construction-time errors raised before any I/O happens
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Argument {argument} is blank")]
    BlankArgument { argument: &'static str },

    #[error("Argument versionMax must be >= 1, found {value}")]
    VersionMaxTooLow { value: i32 },

    #[error("Argument versionMin must be in [1, {version_max}], found {value}")]
    VersionMinOutOfRange { value: i32, version_max: i32 },
}

/// Failures while mapping a schema reference to a packaged resource
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaResolutionError {
    #[error("Bad schema (publicId={}, systemId={})", display_id(.public_id), display_id(.system_id))]
    BadSchema {
        public_id: Option<String>,
        system_id: Option<String>,
    },

    #[error("Resource name {name} not found")]
    ResourceNotFound { name: String },
}

/// Misuse of the content-collection state machine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionStateError {
    #[error("The collection is already activated")]
    AlreadyActive,
}

/// Renders an optional identifier the way parser diagnostics print absent values.
pub(crate) fn display_id(id: &Option<String>) -> &str {
    id.as_deref().unwrap_or("null")
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ResolverError>;

/// Configuration result type alias
pub type ConfigurationResult<T> = std::result::Result<T, ConfigurationError>;

/// Schema resolution result type alias
pub type SchemaResult<T> = std::result::Result<T, SchemaResolutionError>;
