//! # Schema documents
//!
//! A JSON description of a registry, convenient for tools that receive schemas at
//! runtime:
//!
//! ```json
//! {
//!   "package": "zoo",
//!   "enums": [{ "name": "Diet", "values": [{ "name": "HERBIVORE", "number": 1 }] }],
//!   "messages": [{
//!     "name": "Animal",
//!     "fields": [
//!       { "name": "name", "type": "string", "required": true },
//!       { "name": "diet", "type": "enum", "target": "Diet", "default": "HERBIVORE" },
//!       { "name": "friends", "type": "message", "target": "Animal", "repeated": true }
//!     ]
//!   }]
//! }
//! ```
use super::enums::EnumDefinition;
use super::field::{FieldDefinition, FieldKind, TypeTarget};
use super::registry::{MessageDefinition, Registry, RegistryBuilder};
use crate::error::{DefinitionError, FieldDefinitionError, Result};
use crate::message::Value;
use crate::timestamp::Timestamp;
use crate::tree::Tree;
use crate::variant::Variant;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    /// Package prefixed to every top-level definition.
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub messages: Vec<MessageDocument>,
    #[serde(default)]
    pub enums: Vec<EnumDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageDocument {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDocument>,
    #[serde(default)]
    pub messages: Vec<MessageDocument>,
    #[serde(default)]
    pub enums: Vec<EnumDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDocument {
    pub name: String,
    #[serde(default)]
    pub wire_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub repeated: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub variant: Option<Variant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumDocument {
    pub name: String,
    #[serde(default)]
    pub values: Vec<EnumValueDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumValueDocument {
    pub name: String,
    pub number: i64,
}

impl SchemaDocument {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Translates the document into builder calls.
    pub fn into_builder(self) -> Result<RegistryBuilder, DefinitionError> {
        let SchemaDocument {
            package,
            messages,
            enums,
        } = self;
        let qualify = |name: String| match package.as_deref() {
            Some(package) if !package.is_empty() => format!("{package}.{name}"),
            _ => name,
        };

        let mut builder = RegistryBuilder::new();
        for enumeration in enums {
            let name = qualify(enumeration.name.clone());
            builder.add_enumeration(enumeration.into_definition(name));
        }
        for message in messages {
            let name = qualify(message.name.clone());
            builder.add_message(message.into_definition(name)?);
        }
        Ok(builder)
    }

    pub fn build(self) -> Result<Registry, DefinitionError> {
        self.into_builder()?.build()
    }
}

impl MessageDocument {
    fn into_definition(self, name: String) -> Result<MessageDefinition, DefinitionError> {
        let mut definition = MessageDefinition::new(name.clone());
        for field in self.fields {
            let field_name = field.name.clone();
            let field = field.into_definition().map_err(|source| DefinitionError::Field {
                message: name.clone(),
                field: field_name,
                source,
            })?;
            definition = definition.field(field);
        }
        for enumeration in self.enums {
            let nested_name = enumeration.name.clone();
            definition = definition.enumeration(enumeration.into_definition(nested_name));
        }
        for message in self.messages {
            let nested_name = message.name.clone();
            definition = definition.message(message.into_definition(nested_name)?);
        }
        Ok(definition)
    }
}

impl EnumDocument {
    fn into_definition(self, name: String) -> EnumDefinition {
        self.values
            .into_iter()
            .fold(EnumDefinition::new(name), |definition, value| {
                definition.value(value.name, value.number)
            })
    }
}

impl FieldDocument {
    fn into_definition(self) -> Result<FieldDefinition, FieldDefinitionError> {
        let target = match (self.kind, self.target) {
            (FieldKind::Enum | FieldKind::Message, None) => {
                return Err(FieldDefinitionError::InvalidTarget(String::new()));
            }
            (FieldKind::Enum | FieldKind::Message, Some(target)) => Some(TypeTarget::Named(target)),
            (_, _) => None,
        };

        let mut field = FieldDefinition::new(self.name, self.kind, target);
        if let Some(wire_name) = self.wire_name {
            field = field.wire_name(wire_name);
        }
        if self.required {
            field = field.required();
        }
        if self.repeated {
            field = field.repeated();
        }
        if let Some(variant) = self.variant {
            field = field.variant(variant);
        }
        match self.default {
            None | Some(serde_json::Value::Null) => {}
            Some(json) => {
                let value = default_value(self.kind, json).map_err(FieldDefinitionError::InvalidDefault)?;
                field = field.default(value);
            }
        }
        Ok(field)
    }
}

fn default_value(kind: FieldKind, json: serde_json::Value) -> Result<Value, String> {
    use serde_json::Value as Json;

    let mismatch = |json: &Json| format!("{json} is not a valid {kind} default");
    match (kind, json) {
        (FieldKind::Integer | FieldKind::Enum, Json::Number(n)) if n.is_i64() => {
            n.as_i64().map(Value::Int).ok_or_else(|| n.to_string())
        }
        (FieldKind::Float, Json::Number(n)) => n.as_f64().map(Value::Float).ok_or_else(|| n.to_string()),
        (FieldKind::Boolean, Json::Bool(b)) => Ok(Value::Bool(b)),
        (FieldKind::String, Json::String(s)) => Ok(Value::String(s)),
        (FieldKind::Bytes, Json::String(s)) => STANDARD
            .decode(s.as_bytes())
            .map(Value::Bytes)
            .map_err(|err| format!("Base64 decoding error: {err}")),
        (FieldKind::Enum, Json::String(s)) => Ok(Value::String(s)),
        (FieldKind::DateTimeIso8601 | FieldKind::DateTimeMs, Json::String(s)) => Timestamp::parse_iso8601(&s)
            .map(Value::DateTime)
            .map_err(|err| err.to_string()),
        (FieldKind::DateTimeIso8601 | FieldKind::DateTimeMs, Json::Number(n)) if n.is_i64() => n
            .as_i64()
            .and_then(Timestamp::from_millis)
            .map(Value::DateTime)
            .ok_or_else(|| format!("{n} is out of range")),
        (FieldKind::Uuid, Json::String(s)) => Uuid::parse_str(&s).map(Value::Uuid).map_err(|err| err.to_string()),
        (FieldKind::Dict, Json::Object(map)) => Ok(Value::Dict(
            map.into_iter().map(|(k, v)| (k, Tree::from(v))).collect(),
        )),
        (FieldKind::Untyped, json) => Ok(Value::Untyped(Tree::from(json))),
        (_, json) => Err(mismatch(&json)),
    }
}

impl Registry {
    /// Parses a [`SchemaDocument`] and builds it.
    pub fn from_schema_json(text: &str) -> Result<Registry> {
        Ok(SchemaDocument::from_json(text)?.build()?)
    }
}
