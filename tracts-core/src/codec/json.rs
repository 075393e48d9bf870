//! # JSON codec
//!
//! Messages as JSON text. On top of the nested-map rules:
//!
//! * bytes travel as base64 text,
//! * ISO-8601 date-time fields as ISO-8601 text and millisecond fields as integers,
//! * UUIDs as their hyphenated text form,
//! * date/time leaves inside dict fields are stringified.
//!
//! Decoding an empty (or whitespace-only) document yields a message with nothing
//! assigned.
use super::map::{MapTransform, decode_enum};
use super::{FieldTransform, MessageCodec, decode_tree, encode_tree};
use crate::error::{DecodeError, Result};
use crate::message::{Message, Value};
use crate::schema::{FieldDescriptor, FieldKind, MessageType};
use crate::timestamp::Timestamp;
use crate::tree::Tree;
use base64::{Engine, engine::general_purpose::STANDARD};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub const CONTENT_TYPE: &str = "application/json";

/// Media types also understood as JSON.
pub const ALTERNATIVE_CONTENT_TYPES: [&str; 5] = [
    "application/x-javascript",
    "text/javascript",
    "text/x-javascript",
    "text/x-json",
    "text/json",
];

static DEFAULT_CODEC: Lazy<RwLock<JsonCodec>> = Lazy::new(|| RwLock::new(JsonCodec::new()));

/// Scalar rules of the JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTransform;

impl FieldTransform for JsonTransform {
    fn encode_scalar(&self, field: &FieldDescriptor, value: &Value) -> Result<Tree> {
        match (field.kind(), value) {
            (FieldKind::Bytes, Value::Bytes(bytes)) => Ok(Tree::String(STANDARD.encode(bytes))),
            (FieldKind::DateTimeIso8601, Value::DateTime(ts)) => Ok(Tree::String(ts.to_iso8601())),
            (FieldKind::DateTimeMs, Value::DateTime(ts)) => Ok(Tree::Int(ts.to_millis())),
            (FieldKind::Uuid, Value::Uuid(uuid)) => Ok(Tree::String(uuid.hyphenated().to_string())),
            (_, value) => MapTransform.encode_scalar(field, value),
        }
    }

    fn decode_scalar(&self, field: &FieldDescriptor, value: &Tree) -> Result<Value> {
        match (field.kind(), value) {
            (FieldKind::Enum, value) => decode_enum(field, value),
            (FieldKind::Bytes, Tree::String(text)) => STANDARD
                .decode(text.as_bytes())
                .map(Value::Bytes)
                .map_err(|err| DecodeError::new(format!("Base64 decoding error: {err}")).into()),
            (FieldKind::DateTimeIso8601, Tree::String(text)) => Timestamp::parse_iso8601(text)
                .map(Value::DateTime)
                .map_err(|err| DecodeError::new(format!("iso8601 decoding error: {err}")).into()),
            (FieldKind::DateTimeMs, Tree::Int(millis)) => millis_to_value(*millis),
            (FieldKind::DateTimeMs, Tree::Float(millis)) if millis.is_finite() => millis_to_value(*millis as i64),
            (FieldKind::DateTimeMs, other) => Err(DecodeError::new(format!(
                "datetime decoding error: expected milliseconds, found {}",
                other.type_name()
            ))
            .into()),
            (FieldKind::Uuid, Tree::String(text)) => Uuid::parse_str(text)
                .map(Value::Uuid)
                .map_err(|err| DecodeError::new(format!("uuid decoding error: {err}")).into()),
            (_, value) => MapTransform.decode_scalar(field, value),
        }
    }
}

fn millis_to_value(millis: i64) -> Result<Value> {
    Timestamp::from_millis(millis)
        .map(Value::DateTime)
        .ok_or_else(|| DecodeError::new(format!("datetime decoding error: {millis} is out of range")).into())
}

/// Encodes messages as JSON text.
#[derive(Clone)]
pub struct JsonCodec {
    transform: Arc<dyn FieldTransform>,
    pretty: bool,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::with_transform(Arc::new(JsonTransform))
    }

    /// A codec applying custom scalar rules.
    ///
    /// # Arguments
    ///
    /// * `transform` - Used for every non-message field, in both directions.
    pub fn with_transform(transform: Arc<dyn FieldTransform>) -> Self {
        Self {
            transform,
            pretty: false,
        }
    }

    /// Whether to indent the encoded text.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// The process-wide default codec.
    pub fn get_default() -> JsonCodec {
        DEFAULT_CODEC.read().clone()
    }

    /// Replaces the process-wide default codec. Meant to be called during start-up.
    pub fn set_default(codec: JsonCodec) {
        *DEFAULT_CODEC.write() = codec;
    }

    /// The message as a JSON value, without checking required fields.
    pub fn to_json_value(&self, message: &Message) -> Result<serde_json::Value> {
        Tree::Map(encode_tree(message, self.transform.as_ref())?).to_json()
    }

    pub fn from_json_value(&self, message_type: &MessageType, value: serde_json::Value) -> Result<Message> {
        decode_tree(message_type, &Tree::from(value), self.transform.as_ref())
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JsonCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCodec").field("pretty", &self.pretty).finish()
    }
}

impl MessageCodec for JsonCodec {
    type Input = str;
    type Output = String;

    fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    fn encode_message(&self, message: &Message) -> Result<String> {
        message.check_initialized()?;
        let json = self.to_json_value(message)?;
        let text = if self.pretty {
            serde_json::to_string_pretty(&json)?
        } else {
            serde_json::to_string(&json)?
        };
        Ok(text)
    }

    fn decode_message(&self, message_type: &MessageType, input: &str) -> Result<Message> {
        if input.trim().is_empty() {
            return Ok(message_type.new_message());
        }

        let json: serde_json::Value = serde_json::from_str(input)?;
        let message = self.from_json_value(message_type, json)?;
        message.check_initialized()?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDefinition, MessageDefinition, RegistryBuilder};

    fn record() -> MessageType {
        RegistryBuilder::new()
            .message(
                MessageDefinition::new("Record")
                    .field(FieldDefinition::bytes("blob"))
                    .field(FieldDefinition::datetime("at"))
                    .field(FieldDefinition::datetime_ms("at_ms"))
                    .field(FieldDefinition::uuid("id")),
            )
            .build()
            .unwrap()
            .get_message_by_name("Record")
            .unwrap()
    }

    #[test]
    fn test_scalar_representations() {
        let record = record();
        let text = r#"{"blob": "AAE=", "at": "2012-09-30T15:31:50.262", "at_ms": 1349019110262,
                       "id": "67e55044-10b1-426f-9247-bb680e5fe0c8"}"#;
        let message = JsonCodec::new().decode_message(&record, text).unwrap();
        assert_eq!(message.get("blob").unwrap().unwrap().as_bytes(), Some(&[0u8, 1][..]));
        assert_eq!(message.get("at").unwrap(), message.get("at_ms").unwrap());

        let json: serde_json::Value = serde_json::from_str(&JsonCodec::new().encode_message(&message).unwrap()).unwrap();
        assert_eq!(json["at"], "2012-09-30T15:31:50.262000");
        assert_eq!(json["at_ms"], 1349019110262i64);
        assert_eq!(json["id"], "67e55044-10b1-426f-9247-bb680e5fe0c8");
    }

    #[test]
    fn test_decode_errors() {
        let record = record();
        let codec = JsonCodec::new();
        for text in [r#"{"blob": "!!"}"#, r#"{"at": "yesterday"}"#, r#"{"id": "nope"}"#] {
            assert!(matches!(
                codec.decode_message(&record, text),
                Err(crate::Error::Decode(_))
            ));
        }
    }

    #[test]
    fn test_blank_input_is_an_empty_message() {
        let message = JsonCodec::new().decode_message(&record(), "  \n").unwrap();
        assert_eq!(message.assigned_fields().count(), 0);
    }
}
