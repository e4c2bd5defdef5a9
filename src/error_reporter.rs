use crate::cli::VerbosityLevel;
use crate::config::ConfigError;
use crate::error::{ResolverError, SchemaResolutionError};

/// Error reporter with configurable verbosity
pub struct ErrorReporter {
    verbosity: VerbosityLevel,
}

impl ErrorReporter {
    /// Create a new error reporter with specified verbosity
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self { verbosity }
    }

    /// Report a resolver error with appropriate verbosity
    pub fn report_error(&self, error: &ResolverError) {
        eprintln!("{}", self.format_error(error));
    }

    /// Report a configuration error
    pub fn report_config_error(&self, error: &ConfigError) {
        eprintln!("{}", self.format_config_error(error));
    }

    pub fn format_error(&self, error: &ResolverError) -> String {
        match self.verbosity {
            VerbosityLevel::Quiet => self.format_error_brief(error),
            VerbosityLevel::Normal => format!("Error: {}", error),
            VerbosityLevel::Verbose => self.format_error_verbose(error),
        }
    }

    pub fn format_config_error(&self, error: &ConfigError) -> String {
        match self.verbosity {
            VerbosityLevel::Quiet => format!("Config error: {}", error),
            VerbosityLevel::Normal | VerbosityLevel::Verbose => {
                format!("Configuration Error: {}\n{}", error, self.get_config_help(error))
            }
        }
    }

    /// Format error for brief output (quiet mode)
    fn format_error_brief(&self, error: &ResolverError) -> String {
        match error {
            ResolverError::SchemaResolution(SchemaResolutionError::BadSchema { system_id, .. }) => {
                format!("BAD SCHEMA: {}", system_id.as_deref().unwrap_or("null"))
            }
            ResolverError::SchemaResolution(SchemaResolutionError::ResourceNotFound { name }) => {
                format!("RESOURCE NOT FOUND: {}", name)
            }
            _ => format!("ERROR: {}", error),
        }
    }

    /// Format error for verbose output
    fn format_error_verbose(&self, error: &ResolverError) -> String {
        let mut output = format!("Error: {}", error);

        match error {
            ResolverError::SchemaResolution(SchemaResolutionError::BadSchema { .. }) => {
                output.push_str(
                    "\nSuggestion: Check the schema path and the supported version range",
                );
            }
            ResolverError::SchemaResolution(SchemaResolutionError::ResourceNotFound { .. }) => {
                output.push_str(
                    "\nSuggestion: Add the directory holding the schema with --resource-root",
                );
            }
            ResolverError::Xml { line, column, .. } => {
                output.push_str(&format!("\nLocation: line {}, column {}", line, column));
                output.push_str("\nSuggestion: Check the XML syntax");
            }
            _ => {}
        }

        output.push_str("\nError Chain:");
        let mut current_error: &dyn std::error::Error = error;
        let mut level = 0;
        while let Some(source) = current_error.source() {
            output.push_str(&format!("\n  {}: {}", level + 1, source));
            current_error = source;
            level += 1;
        }

        output
    }

    /// Get helpful suggestions for configuration errors
    fn get_config_help(&self, error: &ConfigError) -> String {
        match error {
            ConfigError::Io(_) => "Check that the configuration file exists and is readable".to_string(),
            ConfigError::TomlParsing(_) | ConfigError::JsonParsing(_) => {
                "Check the configuration file syntax (TOML/JSON format expected)".to_string()
            }
            ConfigError::Validation(_) => {
                "Set [resolver] path, version_min and version_max with 1 <= version_min <= version_max"
                    .to_string()
            }
            ConfigError::Environment(_) => {
                "Fix or unset the XSD_RESOLVE_* environment variable".to_string()
            }
            ConfigError::UnsupportedFormat(_) => {
                "Use a .toml or .json configuration file".to_string()
            }
        }
    }
}
