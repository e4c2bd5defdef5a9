//! Resource lookup tests
//!
//! Provider order, thread-local providers and filesystem roots.

use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use crate::common::mocks::{RecordingProvider, UnavailableProvider};
use crate::common::test_helpers::{TestFixtures, read_all, write_resource};
use xsd_resolve::{
    ConfigurationError, DirectoryProvider, EmbeddedProvider, ProviderChain, ResourceLocator,
    ResourceProvider, SearchPath, push_thread_provider,
};

const NAME: &str = "it/scoppelletti/myschema/1.xsd";

#[test]
fn test_blank_name_is_rejected() {
    for name in ["", "   "] {
        let err = ResourceLocator::new(name, ProviderChain::new()).unwrap_err();
        assert_eq!(err, ConfigurationError::BlankArgument { argument: "name" });
    }
}

#[test]
fn test_first_provider_wins() {
    let first = RecordingProvider::new("first").with_resource(NAME, "first");
    let second = RecordingProvider::new("second").with_resource(NAME, "second");
    let second_log = second.request_log();

    let chain = ProviderChain::new()
        .with(Arc::new(first))
        .with(Arc::new(second));
    let stream = ResourceLocator::new(NAME, chain).unwrap().locate().unwrap();

    assert_eq!(read_all(stream), "first");
    assert!(second_log.lock().unwrap().is_empty());
}

#[test]
fn test_fallback_skips_absent_and_unavailable_providers() {
    let empty = RecordingProvider::new("empty");
    let empty_log = empty.request_log();

    let chain = ProviderChain::new()
        .with(Arc::new(UnavailableProvider))
        .with(Arc::new(empty))
        .with(Arc::new(EmbeddedProvider::new("last").with_resource(NAME, "last")));

    let stream = ResourceLocator::new(NAME, chain).unwrap().locate().unwrap();
    assert_eq!(read_all(stream), "last");
    assert_eq!(*empty_log.lock().unwrap(), vec![NAME]);
}

#[test]
fn test_absence_is_not_an_error() {
    let chain = ProviderChain::new().with(Arc::new(UnavailableProvider));
    let locator = ResourceLocator::new(NAME, chain).unwrap();
    assert!(locator.locate().is_none());
}

#[test]
fn test_thread_provider_comes_first_in_standard_chain() {
    let fixtures = TestFixtures::new();
    let chain = ProviderChain::standard(
        vec![fixtures.resources_dir()],
        SearchPath::new("system", Vec::new()),
    );
    let locator = ResourceLocator::new(NAME, chain).unwrap();

    assert!(read_all(locator.locate().unwrap()).contains("myschema/1"));

    {
        let _guard = push_thread_provider(Arc::new(
            EmbeddedProvider::new("override").with_resource(NAME, "override"),
        ));
        assert_eq!(read_all(locator.locate().unwrap()), "override");
    }

    assert!(read_all(locator.locate().unwrap()).contains("myschema/1"));
}

#[test]
fn test_thread_provider_is_invisible_to_other_threads() {
    let _guard = push_thread_provider(Arc::new(
        EmbeddedProvider::new("local").with_resource(NAME, "local"),
    ));
    let chain = ProviderChain::standard(Vec::new(), SearchPath::new("system", Vec::new()));

    let here = ResourceLocator::new(NAME, chain.clone()).unwrap();
    assert!(here.locate().is_some());

    let found_elsewhere = thread::spawn(move || {
        ResourceLocator::new(NAME, chain)
            .unwrap()
            .locate()
            .is_some()
    })
    .join()
    .unwrap();
    assert!(!found_elsewhere);
}

#[test]
fn test_search_path_order() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    write_resource(b.path(), NAME, "from b");

    let list = std::env::join_paths([a.path(), b.path()]).unwrap();
    let search = SearchPath::from_path_list("system", list.to_str().unwrap());
    assert_eq!(search.dirs().count(), 2);
    assert_eq!(read_all(search.open(NAME).unwrap().unwrap()), "from b");

    write_resource(a.path(), NAME, "from a");
    assert_eq!(read_all(search.open(NAME).unwrap().unwrap()), "from a");
}

#[test]
fn test_directory_provider_stays_under_its_root() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("root");
    write_resource(&root, "inside.xsd", "inside");
    write_resource(temp_dir.path(), "outside.xsd", "outside");

    let provider = DirectoryProvider::new(&root);
    assert!(provider.open("inside.xsd").unwrap().is_some());
    assert!(provider.open("../outside.xsd").unwrap().is_none());
    assert!(provider.open("/etc/passwd").unwrap().is_none());
    assert!(provider.open(".").unwrap().is_none());
}

#[test]
fn test_missing_directory_is_unavailable() {
    let provider = DirectoryProvider::new("/nonexistent/resource/root");
    assert!(provider.open(NAME).is_err());
}
