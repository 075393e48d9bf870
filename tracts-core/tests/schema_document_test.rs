use tracts_core::Error;
use tracts_core::codec::{JsonCodec, MessageCodec};
use tracts_core::message_types::{error_message, error_message_from, void_message};
use tracts_core::schema::{FieldKind, Registry, SchemaDocument};

mod common;

#[test]
fn test_introspection() {
    let registry = common::registry();

    let messages: Vec<_> = registry.all_messages().map(|m| m.full_name().to_string()).collect();
    assert_eq!(messages, ["zoo.Animal", "zoo.Owner", "zoo.Simple", "zoo.Record"]);

    let owner = registry.get_message_by_name("zoo.Owner").unwrap();
    assert_eq!(owner.package_name(), "zoo");
    assert!(owner.enclosing_type().is_none());

    let animals = owner.get_field_by_name("animals").unwrap();
    assert!(animals.is_repeated());
    assert_eq!(animals.kind(), FieldKind::Message);
    assert_eq!(animals.target_name().as_deref(), Some("Animal"));
    assert_eq!(animals.message_type().unwrap().full_name(), "zoo.Animal");
}

#[test]
fn test_document_survives_serde() {
    let document = SchemaDocument::from_json(common::ZOO_SCHEMA).unwrap();
    let text = serde_json::to_string(&document).unwrap();
    assert_eq!(SchemaDocument::from_json(&text).unwrap(), document);

    let registry = document.build().unwrap();
    assert_eq!(registry.all_enums().len(), 1);
}

#[test]
fn test_definition_errors() {
    let cases = [
        // Duplicate enum numbers
        r#"{"enums": [{"name": "E", "values": [{"name": "A", "number": 1}, {"name": "B", "number": 1}]}]}"#,
        // Required and repeated
        r#"{"messages": [{"name": "M", "fields": [{"name": "f", "type": "string", "required": true, "repeated": true}]}]}"#,
        // Variant not allowed for the kind
        r#"{"messages": [{"name": "M", "fields": [{"name": "f", "type": "string", "variant": "INT32"}]}]}"#,
        // Duplicate field names
        r#"{"messages": [{"name": "M", "fields": [{"name": "f", "type": "string"}, {"name": "f", "type": "integer"}]}]}"#,
        // Enum default outside the enum
        r#"{"enums": [{"name": "E", "values": [{"name": "A", "number": 1}]}],
            "messages": [{"name": "M", "fields": [{"name": "e", "type": "enum", "target": "E", "default": "B"}]}]}"#,
    ];
    for text in cases {
        assert!(
            matches!(Registry::from_schema_json(text), Err(Error::Definition(_))),
            "{text}"
        );
    }
}

#[test]
fn test_builtin_message_types() {
    assert_eq!(void_message().unwrap().name(), "VoidMessage");

    let error = Registry::from_schema_json("{").unwrap_err();
    let message = error_message_from(&error).unwrap();
    assert_eq!(message.message_type(), &error_message().unwrap());

    let json: serde_json::Value =
        serde_json::from_str(&JsonCodec::new().encode_message(&message).unwrap()).unwrap();
    assert_eq!(json["title"], "Invalid Input");
}
