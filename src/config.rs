use crate::cli::{Cli, OutputFormat};
use crate::error::ConfigurationError;
use crate::resource::{ProviderChain, SEARCH_PATH_ENV, SearchPath};
use crate::schema::{ResolverConfig, SchemaEntityResolver};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

impl From<ConfigurationError> for ConfigError {
    fn from(err: ConfigurationError) -> Self {
        ConfigError::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub resolver: ResolverSection,
    pub resources: ResourceSection,
    pub output: OutputConfig,
}

/// Schema family served by the resolver
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverSection {
    /// Schema path, e.g. `myschema/`
    pub path: String,
    /// Lowest supported schema version
    pub version_min: i32,
    /// Highest supported schema version
    pub version_max: i32,
}

/// Where packaged resources are looked up
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ResourceSection {
    /// Directories holding the library's own resources, searched in order
    pub roots: Vec<PathBuf>,
    /// System search path, platform path-list syntax
    pub search_path: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormatConfig,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (errors only)
    pub quiet: bool,
}

/// Output format configuration (serializable version of CLI OutputFormat)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    Human,
    Json,
}

impl From<OutputFormat> for OutputFormatConfig {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputFormatConfig::Human,
            OutputFormat::Json => OutputFormatConfig::Json,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
        }
    }
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            path: String::new(),
            version_min: 1,
            version_max: 1,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormatConfig::Human,
            verbose: false,
            quiet: false,
        }
    }
}

impl ResolverSection {
    /// Validated resolver settings
    pub fn to_resolver_config(&self) -> std::result::Result<ResolverConfig, ConfigurationError> {
        ResolverConfig::new(self.path.clone(), self.version_min, self.version_max)
    }
}

impl Config {
    /// Provider chain: thread context, configured roots, then the search path
    pub fn provider_chain(&self) -> ProviderChain {
        let system = self
            .resources
            .search_path
            .as_deref()
            .map(|list| SearchPath::from_path_list("system search path", list))
            .unwrap_or_else(|| SearchPath::new("system search path", Vec::new()));
        ProviderChain::standard(self.resources.roots.clone(), system)
    }

    /// Build the schema resolver described by this configuration
    pub fn schema_resolver(&self) -> Result<SchemaEntityResolver> {
        let config = self.resolver.to_resolver_config()?;
        Ok(SchemaEntityResolver::new(config, self.provider_chain()))
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides(config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "xsd-resolve.toml",
            "xsd-resolve.json",
            ".xsd-resolve.toml",
            ".xsd-resolve.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("xsd-resolve");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        // Resolver settings
        if let Some(path) = env.get("XSD_RESOLVE_SCHEMA_PATH") {
            config.resolver.path = path;
        }

        if let Some(version_min) = env.get("XSD_RESOLVE_VERSION_MIN") {
            config.resolver.version_min = version_min.trim().parse().map_err(|_| {
                ConfigError::Environment(format!(
                    "Invalid XSD_RESOLVE_VERSION_MIN value: {}",
                    version_min
                ))
            })?;
        }

        if let Some(version_max) = env.get("XSD_RESOLVE_VERSION_MAX") {
            config.resolver.version_max = version_max.trim().parse().map_err(|_| {
                ConfigError::Environment(format!(
                    "Invalid XSD_RESOLVE_VERSION_MAX value: {}",
                    version_max
                ))
            })?;
        }

        // Resource settings
        if let Some(roots) = env.get("XSD_RESOLVE_ROOTS") {
            config.resources.roots = std::env::split_paths(&roots)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }

        if let Some(search_path) = env.get(SEARCH_PATH_ENV) {
            config.resources.search_path = Some(search_path);
        }

        // Output settings
        if let Some(verbose) = env.get("XSD_RESOLVE_VERBOSE") {
            config.output.verbose = verbose.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid XSD_RESOLVE_VERBOSE value: {}", verbose))
            })?;
        }

        if let Some(quiet) = env.get("XSD_RESOLVE_QUIET") {
            config.output.quiet = quiet.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid XSD_RESOLVE_QUIET value: {}", quiet))
            })?;
        }

        if let Some(format) = env.get("XSD_RESOLVE_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormatConfig::Human,
                "json" => OutputFormatConfig::Json,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid XSD_RESOLVE_FORMAT value: {}",
                        format
                    )));
                }
            };
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(path) = &cli.path {
            config.resolver.path = path.clone();
        }
        if let Some(version_min) = cli.version_min {
            config.resolver.version_min = version_min;
        }
        if let Some(version_max) = cli.version_max {
            config.resolver.version_max = version_max;
        }

        if !cli.resource_roots.is_empty() {
            config.resources.roots = cli.resource_roots.clone();
        }

        if let Some(format) = cli.format {
            config.output.format = format.into();
        }
        config.output.verbose |= cli.verbose;
        config.output.quiet |= cli.quiet;

        config
    }

    /// Merge two configurations (second takes precedence for set values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        if !override_config.resolver.path.is_empty() {
            base.resolver.path = override_config.resolver.path;
        }
        base.resolver.version_min = override_config.resolver.version_min;
        base.resolver.version_max = override_config.resolver.version_max;

        if !override_config.resources.roots.is_empty() {
            base.resources.roots = override_config.resources.roots;
        }
        if override_config.resources.search_path.is_some() {
            base.resources.search_path = override_config.resources.search_path;
        }

        base.output.format = override_config.output.format;
        base.output.verbose = override_config.output.verbose;
        base.output.quiet = override_config.output.quiet;

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        config.resolver.to_resolver_config()?;

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        for root in &config.resources.roots {
            if root.as_os_str().is_empty() {
                return Err(ConfigError::Validation(
                    "Resource roots cannot be empty paths".to_string(),
                ));
            }
        }

        Ok(())
    }
}
