//! Schema resolver tests
//!
//! URI-to-resource mapping, version bounds and lookup through providers.

use std::sync::Arc;

use crate::common::mocks::RecordingProvider;
use crate::common::test_helpers::{read_all, schema_body, schema_uri};
use xsd_resolve::{
    ConfigurationError, EmbeddedProvider, EntityResolver, ProviderChain, ResolverConfig,
    ResolverError, SchemaEntityResolver, SchemaResolutionError,
};

fn resolver(chain: ProviderChain) -> SchemaEntityResolver {
    SchemaEntityResolver::new(ResolverConfig::new("myschema/", 1, 2).unwrap(), chain)
}

#[test]
fn test_construction_accepts_exactly_the_valid_bounds() {
    for version_max in -2..=5 {
        for version_min in -2..=5 {
            let result = ResolverConfig::new("myschema/", version_min, version_max);
            let valid = 1 <= version_min && version_min <= version_max;
            assert_eq!(
                result.is_ok(),
                valid,
                "version_min={version_min}, version_max={version_max}"
            );
        }
    }
}

#[test]
fn test_blank_path_is_rejected() {
    for path in ["", " ", "\t\n"] {
        assert_eq!(
            ResolverConfig::new(path, 1, 1),
            Err(ConfigurationError::BlankArgument { argument: "path" })
        );
    }
}

#[test]
fn test_every_supported_version_maps_to_its_resource() {
    let config = ResolverConfig::new("cfg/deep/", 3, 7).unwrap();
    for version in 3..=7 {
        let system_id = format!("http://www.scoppelletti.it/res/cfg/deep/{version}.xsd");
        assert_eq!(
            config.to_resource_name(Some(&system_id)),
            Some(format!("it/scoppelletti/cfg/deep/{version}.xsd"))
        );
    }
}

#[test]
fn test_unmatched_system_ids_are_rejected() {
    let config = ResolverConfig::new("myschema/", 1, 2).unwrap();
    let rejected = [
        "https://www.scoppelletti.it/res/myschema/1.xsd",
        "http://www.scoppelletti.it/res/other/1.xsd",
        "http://www.scoppelletti.it/res/myschema/1.dtd",
        "http://www.scoppelletti.it/res/myschema/.xsd",
        "http://www.scoppelletti.it/res/myschema/one.xsd",
        "http://www.scoppelletti.it/res/myschema/1.5.xsd",
        "http://www.scoppelletti.it/res/myschema/0.xsd",
        "http://www.scoppelletti.it/res/myschema/3.xsd",
        "http://www.scoppelletti.it/res/myschema/99999999999.xsd",
        "",
    ];
    for system_id in rejected {
        assert_eq!(config.to_resource_name(Some(system_id)), None, "{system_id}");
    }
    assert_eq!(config.to_resource_name(None), None);
}

#[test]
fn test_end_to_end_example() {
    let chain = ProviderChain::new().with(Arc::new(
        EmbeddedProvider::new("bundle")
            .with_resource("it/scoppelletti/myschema/1.xsd", schema_body("v1"))
            .with_resource("it/scoppelletti/myschema/2.xsd", schema_body("v2")),
    ));
    let resolver = resolver(chain);

    let resolved = resolver.resolve(None, Some(&schema_uri("2"))).unwrap();
    assert_eq!(resolved.resource_name, "it/scoppelletti/myschema/2.xsd");
    assert!(read_all(resolved.stream).contains("v2"));

    let err = resolver.resolve(None, Some(&schema_uri("3"))).unwrap_err();
    assert_eq!(
        err,
        SchemaResolutionError::BadSchema {
            public_id: None,
            system_id: Some(schema_uri("3")),
        }
    );
}

#[test]
fn test_rejection_happens_before_any_lookup() {
    let provider = RecordingProvider::new("spy");
    let log = provider.request_log();
    let resolver = resolver(ProviderChain::new().with(Arc::new(provider)));

    assert!(resolver.resolve(Some("-//pub"), Some(&schema_uri("9"))).is_err());
    assert!(log.lock().unwrap().is_empty());

    assert!(resolver.resolve(None, Some(&schema_uri("1"))).is_err());
    assert_eq!(*log.lock().unwrap(), vec!["it/scoppelletti/myschema/1.xsd"]);
}

#[test]
fn test_missing_resource_is_reported_by_name() {
    let resolver = resolver(ProviderChain::new());

    let err = resolver.resolve(None, Some(&schema_uri("1"))).unwrap_err();
    assert_eq!(
        err,
        SchemaResolutionError::ResourceNotFound {
            name: "it/scoppelletti/myschema/1.xsd".to_string()
        }
    );
}

#[test]
fn test_entity_resolver_wraps_failures() {
    let resolver = resolver(ProviderChain::new());

    let err = resolver
        .resolve_entity(Some("-//pub"), Some(&schema_uri("5")))
        .unwrap_err();
    assert!(matches!(
        err,
        ResolverError::SchemaResolution(SchemaResolutionError::BadSchema { .. })
    ));
    assert!(err.to_string().contains("publicId=-//pub"));
}
