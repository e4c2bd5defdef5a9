//! Versioned XML schema resolution
//!
//! Maps external schema URIs of the form
//! `http://www.scoppelletti.it/res/<path><version>.xsd` to packaged resources
//! `it/scoppelletti/<path><version>.xsd`, accepting only versions inside a
//! configured range. Rejection happens before any I/O.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, ConfigurationResult, SchemaResolutionError, SchemaResult};
use crate::resource::{ProviderChain, ResourceLocator, ResourceStream};

/// XML schema file extension
pub const SCHEMA_EXT: &str = ".xsd";

/// Prefix recognising the URIs of resolvable schemas
pub const URI_PREFIX: &str = "http://www.scoppelletti.it/res/";

/// Prefix of the resources holding the schemas
pub const RESOURCE_PREFIX: &str = "it/scoppelletti/";

/// Something that maps an external reference to content.
///
/// `Ok(None)` asks the parser to fall back to its own strategy.
pub trait EntityResolver {
    fn resolve_entity(
        &self,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> crate::Result<Option<ResolvedResource>>;
}

/// Schema family and supported version range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawResolverConfig")]
pub struct ResolverConfig {
    path: String,
    version_min: i32,
    version_max: i32,
}

#[derive(Deserialize)]
struct RawResolverConfig {
    path: String,
    version_min: i32,
    version_max: i32,
}

impl TryFrom<RawResolverConfig> for ResolverConfig {
    type Error = ConfigurationError;

    fn try_from(raw: RawResolverConfig) -> ConfigurationResult<Self> {
        Self::new(raw.path, raw.version_min, raw.version_max)
    }
}

impl ResolverConfig {
    pub fn new(path: impl Into<String>, version_min: i32, version_max: i32) -> ConfigurationResult<Self> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(ConfigurationError::BlankArgument { argument: "path" });
        }
        if version_max < 1 {
            return Err(ConfigurationError::VersionMaxTooLow { value: version_max });
        }
        if version_min < 1 || version_min > version_max {
            return Err(ConfigurationError::VersionMinOutOfRange {
                value: version_min,
                version_max,
            });
        }

        Ok(Self {
            path,
            version_min,
            version_max,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version_min(&self) -> i32 {
        self.version_min
    }

    pub fn version_max(&self) -> i32 {
        self.version_max
    }

    /// Map a system id to a resource name, or `None` when it is not ours
    pub fn to_resource_name(&self, system_id: Option<&str>) -> Option<String> {
        let system_id = system_id?;

        let version = system_id
            .strip_prefix(URI_PREFIX)?
            .strip_prefix(self.path.as_str())?
            .strip_suffix(SCHEMA_EXT)?
            .parse::<i32>()
            .ok()?;

        if !(self.version_min..=self.version_max).contains(&version) {
            return None;
        }

        Some(format!("{RESOURCE_PREFIX}{}{version}{SCHEMA_EXT}", self.path))
    }

    /// External URI for a version, the inverse of [`Self::to_resource_name`]
    pub fn schema_uri(&self, version: i32) -> String {
        format!("{URI_PREFIX}{}{version}{SCHEMA_EXT}", self.path)
    }
}

impl fmt::Display for ResolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}[{}..{}]{}",
            URI_PREFIX, self.path, self.version_min, self.version_max, SCHEMA_EXT
        )
    }
}

/// Resource opened for one external reference
pub struct ResolvedResource {
    pub resource_name: String,
    pub stream: ResourceStream,
}

impl fmt::Debug for ResolvedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedResource")
            .field("resource_name", &self.resource_name)
            .finish_non_exhaustive()
    }
}

/// Entity resolver for one schema family
#[derive(Debug, Clone)]
pub struct SchemaEntityResolver {
    config: ResolverConfig,
    providers: ProviderChain,
}

impl SchemaEntityResolver {
    pub fn new(config: ResolverConfig, providers: ProviderChain) -> Self {
        Self { config, providers }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn resolve(&self, public_id: Option<&str>, system_id: Option<&str>) -> SchemaResult<ResolvedResource> {
        let name = self.config.to_resource_name(system_id).ok_or_else(|| {
            SchemaResolutionError::BadSchema {
                public_id: public_id.map(str::to_owned),
                system_id: system_id.map(str::to_owned),
            }
        })?;

        let locator = ResourceLocator::new(name.as_str(), self.providers.clone())
            .map_err(|_| SchemaResolutionError::ResourceNotFound { name: name.clone() })?;
        let stream = locator
            .locate()
            .ok_or_else(|| SchemaResolutionError::ResourceNotFound { name: name.clone() })?;

        Ok(ResolvedResource {
            resource_name: name,
            stream,
        })
    }
}

impl EntityResolver for SchemaEntityResolver {
    fn resolve_entity(
        &self,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> crate::Result<Option<ResolvedResource>> {
        Ok(Some(self.resolve(public_id, system_id)?))
    }
}
