use std::sync::Arc;

use crate::common::mocks::{Diagnostic, RecordingHandler};
use crate::common::test_helpers::schema_body;
use xsd_resolve::{
    CollectionStateError, ContentCollection, EmbeddedProvider, HandlerBase, ProviderChain,
    ResolverConfig, ResolverError, SaxParseError, SaxParser, SchemaEntityResolver, XmlHandler,
};

fn chars(text: &str) -> Vec<char> {
    text.chars().collect()
}

#[test]
fn test_stop_right_after_start_returns_empty_text() {
    let mut handler = HandlerBase::new();
    handler.start_collecting().unwrap();
    assert_eq!(handler.stop_collecting(), Some(String::new()));
}

#[test]
fn test_characters_are_appended_in_call_order() {
    let mut handler = HandlerBase::new();
    handler.start_collecting().unwrap();
    handler.characters(&chars("ab"), 0, 2).unwrap();
    handler.characters(&chars("cd"), 0, 2).unwrap();
    assert_eq!(handler.stop_collecting().as_deref(), Some("abcd"));
}

#[test]
fn test_double_start_fails_and_keeps_buffer() {
    let mut handler = HandlerBase::new();
    handler.start_collecting().unwrap();
    handler.characters(&chars("kept"), 0, 4).unwrap();

    assert_eq!(
        handler.start_collecting(),
        Err(CollectionStateError::AlreadyActive)
    );
    assert_eq!(handler.stop_collecting().as_deref(), Some("kept"));
}

#[test]
fn test_stop_without_start_collects_nothing() {
    let mut handler = HandlerBase::new();
    assert_eq!(handler.stop_collecting(), None);
    assert_eq!(handler.base().collection(), &ContentCollection::Inactive);
}

#[test]
fn test_collection_can_restart_after_stop() {
    let mut handler = HandlerBase::new();
    handler.start_collecting().unwrap();
    handler.characters(&chars("first"), 0, 5).unwrap();
    handler.stop_collecting();

    handler.start_collecting().unwrap();
    handler.characters(&chars("second"), 0, 6).unwrap();
    assert_eq!(handler.stop_collecting().as_deref(), Some("second"));
}

#[test]
fn test_error_becomes_build_failure() {
    let mut handler = HandlerBase::new();
    let err = handler
        .error(&SaxParseError::new("element not allowed"))
        .unwrap_err();

    match err {
        ResolverError::Build { message } => assert_eq!(
            message,
            "element not allowed [publicId=null, systemId=null, lineNumber=0, columnNumber=0]"
        ),
        other => panic!("Expected Build error, got {other:?}"),
    }
    assert!(handler.warning(&SaxParseError::new("ignored")).is_ok());
    assert!(handler.fatal_error(&SaxParseError::new("logged")).is_ok());
}

#[test]
fn test_doctype_outside_schema_family_aborts_parse() {
    let resolver = SchemaEntityResolver::new(
        ResolverConfig::new("myschema/", 1, 1).unwrap(),
        ProviderChain::new().with(Arc::new(
            EmbeddedProvider::new("bundle")
                .with_resource("it/scoppelletti/myschema/1.xsd", "<not-a-schema/>"),
        )),
    );
    let mut handler = RecordingHandler::new(HandlerBase::with_entity_resolver(Arc::new(resolver)));

    let xml = r#"<!DOCTYPE doc SYSTEM "local.dtd">
<doc xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
     xsi:noNamespaceSchemaLocation="http://www.scoppelletti.it/res/myschema/1.xsd"><item/></doc>"#;
    let err = SaxParser::default().parse_str(xml, None, &mut handler).unwrap_err();

    // A schema resolver never defers, so the DTD id is a bad schema.
    assert!(matches!(err, ResolverError::SchemaResolution(_)));
    assert!(handler.elements.is_empty());
}

#[test]
fn test_recording_handler_sees_error_then_continues() {
    let resolver = SchemaEntityResolver::new(
        ResolverConfig::new("myschema/", 1, 1).unwrap(),
        ProviderChain::new().with(Arc::new(
            EmbeddedProvider::new("bundle")
                .with_resource("it/scoppelletti/myschema/1.xsd", "<not-a-schema/>"),
        )),
    );
    let mut handler = RecordingHandler::new(HandlerBase::with_entity_resolver(Arc::new(resolver)));

    let xml = r#"<doc xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
     xsi:noNamespaceSchemaLocation="http://www.scoppelletti.it/res/myschema/1.xsd"><item/></doc>"#;
    let outcome = SaxParser::default().parse_str(xml, None, &mut handler).unwrap();

    assert_eq!(outcome.resolved.len(), 1);
    assert_eq!(handler.elements, vec!["doc", "item"]);
    assert_eq!(handler.diagnostics.len(), 1);
    assert!(matches!(
        &handler.diagnostics[0],
        Diagnostic::Error(message) if message.contains("is not an XML Schema")
    ));
}

#[test]
fn test_valid_schema_produces_no_diagnostics() {
    let resolver = SchemaEntityResolver::new(
        ResolverConfig::new("myschema/", 1, 1).unwrap(),
        ProviderChain::new().with(Arc::new(
            EmbeddedProvider::new("bundle")
                .with_resource("it/scoppelletti/myschema/1.xsd", schema_body("v1")),
        )),
    );
    let mut handler = RecordingHandler::new(HandlerBase::with_entity_resolver(Arc::new(resolver)));

    let xml = r#"<doc xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
     xsi:noNamespaceSchemaLocation="http://www.scoppelletti.it/res/myschema/1.xsd"/>"#;
    SaxParser::default().parse_str(xml, None, &mut handler).unwrap();

    assert!(handler.diagnostics.is_empty());
}
