//! # Codecs
//!
//! Converters between [`Message`] instances and external representations.
//!
//! * **[`MapCodec`]:** messages as nested [`Tree`] maps.
//! * **[`JsonCodec`]:** messages as JSON text, with bytes, date-times and UUIDs mapped to
//!   JSON-friendly forms.
//! * **[`QueryCodec`]:** messages as flat `key=value` query strings with dotted, indexed
//!   paths for nested and repeated fields.
//!
//! The map and JSON codecs share one tree walker; what differs is the [`FieldTransform`]
//! applied to scalar fields, which callers can also replace with their own.
mod json;
mod map;
mod query;

pub use json::{ALTERNATIVE_CONTENT_TYPES, CONTENT_TYPE, JsonCodec, JsonTransform};
pub use map::{MapCodec, MapTransform};
pub use query::{PathSegment, QueryBuilder, QueryCodec};

use crate::error::{Error, Result, ValidationError};
use crate::message::{AssignedValue, FieldValue, Message, UnrecognizedKey, Value, infer_variant};
use crate::schema::{FieldDescriptor, FieldKind, MessageType};
use crate::tree::Tree;
use std::collections::BTreeMap;

/// A two-way mapping between messages and an external representation.
pub trait MessageCodec {
    /// What `decode_message` reads.
    type Input: ?Sized;
    /// What `encode_message` produces.
    type Output;

    /// Media type of the encoded form.
    fn content_type(&self) -> &'static str;

    fn encode_message(&self, message: &Message) -> Result<Self::Output>;

    fn decode_message(&self, message_type: &MessageType, input: &Self::Input) -> Result<Message>;
}

/// Per-field conversion of scalar values.
///
/// Message fields never reach a transform: nested records are walked by the codec itself.
/// Enum, date-time, UUID, bytes and dict values do, so a transform decides how each is
/// represented.
pub trait FieldTransform: Send + Sync {
    fn encode_scalar(&self, field: &FieldDescriptor, value: &Value) -> Result<Tree>;

    fn decode_scalar(&self, field: &FieldDescriptor, value: &Tree) -> Result<Value>;
}

/// Encodes the assigned fields of `message`, followed by its unrecognized values under
/// their original keys.
pub(crate) fn encode_tree(message: &Message, transform: &dyn FieldTransform) -> Result<BTreeMap<String, Tree>> {
    let mut map = BTreeMap::new();
    for (field, assigned) in message.assigned_fields() {
        let tree = match assigned {
            AssignedValue::Null => Tree::Null,
            AssignedValue::Single(value) => encode_value(&field, value, transform)?,
            AssignedValue::List(list) => Tree::List(
                list.iter()
                    .map(|value| encode_value(&field, value, transform))
                    .collect::<Result<_>>()?,
            ),
        };
        map.insert(field.name().to_string(), tree);
    }

    for (key, value) in message.unrecognized_entries() {
        map.insert(key.to_string(), value.clone());
    }
    Ok(map)
}

fn encode_value(field: &FieldDescriptor, value: &Value, transform: &dyn FieldTransform) -> Result<Tree> {
    match value {
        Value::Message(child) => Ok(Tree::Map(encode_tree(child, transform)?)),
        other => transform.encode_scalar(field, other),
    }
}

/// Builds a message of `message_type` from a map.
///
/// Keys that name no field go to the unrecognized ledger when a variant can be inferred
/// for their value, and are dropped otherwise.
pub(crate) fn decode_tree(message_type: &MessageType, tree: &Tree, transform: &dyn FieldTransform) -> Result<Message> {
    let map = tree.as_map().ok_or_else(|| {
        Error::InvalidInput(format!("Decoded value must be a map, found {}", tree.type_name()))
    })?;

    let mut message = message_type.new_message();
    for (key, raw) in map {
        let Some(field) = message_type.get_field_by_name(key) else {
            match infer_variant(raw) {
                Some(variant) => message.set_unrecognized_field(UnrecognizedKey::from_wire(key), raw.clone(), variant),
                None => tracing::warn!("No variant found for unrecognized field: {key}"),
            }
            continue;
        };

        let value = decode_field(&field, raw, transform)?;
        message.set_field(&field, value)?;
    }
    Ok(message)
}

fn decode_field(field: &FieldDescriptor, raw: &Tree, transform: &dyn FieldTransform) -> Result<FieldValue> {
    if field.kind() == FieldKind::Untyped {
        return decode_untyped(field, raw);
    }

    let items = match raw {
        Tree::List(items) => items.as_slice(),
        single => std::slice::from_ref(single),
    };
    let mut decoded = items
        .iter()
        .map(|item| decode_element(field, item, transform))
        .collect::<Result<Vec<_>>>()?;

    if field.is_repeated() {
        let values = decoded
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ValidationError::for_field(field.name(), "Repeated values may not be None"))?;
        return Ok(FieldValue::List(values));
    }

    match decoded.pop() {
        Some(last) => Ok(FieldValue::from(last)),
        None => Err(ValidationError::for_field(
            field.name(),
            format!("Field {} is not repeated. Found: []", field.name()),
        )
        .into()),
    }
}

fn decode_element(field: &FieldDescriptor, item: &Tree, transform: &dyn FieldTransform) -> Result<Option<Value>> {
    match (field.kind(), item) {
        (_, Tree::Null) => Ok(None),
        (FieldKind::Message, item) => Ok(Some(Value::Message(decode_tree(&field.message_type()?, item, transform)?))),
        (_, item) => transform.decode_scalar(field, item).map(Some),
    }
}

/// Untyped fields take the raw value as it is.
fn decode_untyped(field: &FieldDescriptor, raw: &Tree) -> Result<FieldValue> {
    match (raw, field.is_repeated()) {
        (Tree::Null, _) => Ok(FieldValue::Null),
        (Tree::List(items), true) => Ok(FieldValue::List(items.iter().cloned().map(Value::Untyped).collect())),
        (other, _) => Ok(FieldValue::Single(Value::Untyped(other.clone()))),
    }
}
