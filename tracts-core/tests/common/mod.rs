#![allow(dead_code)]

use tracts_core::schema::{MessageType, Registry};

pub const ZOO_SCHEMA: &str = r#"{
    "package": "zoo",
    "enums": [
        {"name": "Diet", "values": [
            {"name": "HERBIVORE", "number": 1},
            {"name": "CARNIVORE", "number": 2},
            {"name": "OMNIVORE", "number": 3}
        ]}
    ],
    "messages": [
        {
            "name": "Animal",
            "fields": [
                {"name": "name", "type": "string", "required": true},
                {"name": "size", "type": "integer", "variant": "INT32"},
                {"name": "diet", "type": "enum", "target": "Diet", "default": "HERBIVORE"}
            ]
        },
        {
            "name": "Owner",
            "fields": [
                {"name": "number", "type": "integer"},
                {"name": "animals", "type": "message", "target": "Animal", "repeated": true},
                {"name": "sub_message", "type": "message", "target": "Animal"},
                {"name": "nicknames", "type": "string", "repeated": true},
                {"name": "weight", "type": "float"}
            ]
        },
        {
            "name": "Simple",
            "fields": [
                {"name": "known_int", "type": "integer"}
            ]
        },
        {
            "name": "Record",
            "fields": [
                {"name": "flag", "type": "boolean"},
                {"name": "ratio", "type": "float"},
                {"name": "blob", "type": "bytes"},
                {"name": "at", "type": "datetime"},
                {"name": "at_ms", "type": "datetime_ms"},
                {"name": "id", "type": "uuid"},
                {"name": "meta", "type": "dict"},
                {"name": "anything", "type": "untyped"},
                {"name": "counts", "type": "integer", "repeated": true},
                {"name": "diets", "type": "enum", "target": "Diet", "repeated": true}
            ]
        }
    ]
}"#;

pub fn registry() -> Registry {
    Registry::from_schema_json(ZOO_SCHEMA).expect("Failed to load zoo schema")
}

pub fn message_type(name: &str) -> MessageType {
    registry()
        .get_message_by_name(&format!("zoo.{name}"))
        .expect("Message not found")
}
