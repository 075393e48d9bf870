//! # Nested-map codec
//!
//! Messages as [`Tree`] maps. Values keep their native shape: enums become their
//! member name, date-times and UUIDs stay typed leaves and nested records become nested
//! maps.
use super::{FieldTransform, MessageCodec, decode_tree, encode_tree};
use crate::error::{DecodeError, Result};
use crate::message::{Message, Value};
use crate::schema::{FieldDescriptor, FieldKind, MessageType};
use crate::tree::Tree;

/// Scalar rules of the nested-map codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapTransform;

impl FieldTransform for MapTransform {
    fn encode_scalar(&self, _field: &FieldDescriptor, value: &Value) -> Result<Tree> {
        Ok(match value {
            Value::Bool(b) => Tree::Bool(*b),
            Value::Int(i) => Tree::Int(*i),
            Value::Float(f) => Tree::Float(*f),
            Value::String(s) => Tree::String(s.clone()),
            Value::Bytes(bytes) => Tree::Bytes(bytes.clone()),
            Value::Enum(member) => Tree::String(member.name().to_string()),
            Value::DateTime(ts) => Tree::DateTime(*ts),
            Value::Uuid(uuid) => Tree::Uuid(*uuid),
            Value::Dict(map) => Tree::Map(map.clone()),
            Value::Untyped(tree) => tree.clone(),
            Value::Message(message) => Tree::Map(encode_tree(message, self)?),
        })
    }

    fn decode_scalar(&self, field: &FieldDescriptor, value: &Tree) -> Result<Value> {
        match (field.kind(), value) {
            (FieldKind::Enum, value) => decode_enum(field, value),
            (FieldKind::Float, Tree::Int(i)) => Ok(Value::Float(*i as f64)),
            (FieldKind::Float, Tree::String(s)) => Ok(s
                .trim()
                .parse()
                .map(Value::Float)
                .unwrap_or_else(|_| Value::String(s.clone()))),
            (FieldKind::Integer, Tree::String(s)) => Ok(s
                .trim()
                .parse()
                .map(Value::Int)
                .unwrap_or_else(|_| Value::String(s.clone()))),
            (_, value) => Ok(native_value(value)),
        }
    }
}

/// Enum members by name or number.
pub(crate) fn decode_enum(field: &FieldDescriptor, value: &Tree) -> Result<Value> {
    let enum_type = field.enum_type()?;
    let member = match value {
        Tree::String(name) => enum_type.by_name(name).ok(),
        Tree::Int(number) => enum_type.by_number(*number).ok(),
        _ => None,
    };
    member
        .map(Value::Enum)
        .ok_or_else(|| DecodeError::new(format!("Invalid enum value \"{}\"", value.to_text().unwrap_or_default())).into())
}

/// The value a tree leaf stands for without any conversion. Shapes no field kind
/// accepts end up untyped and fail validation on assignment.
fn native_value(value: &Tree) -> Value {
    match value {
        Tree::Bool(b) => Value::Bool(*b),
        Tree::Int(i) => Value::Int(*i),
        Tree::Float(f) => Value::Float(*f),
        Tree::String(s) => Value::String(s.clone()),
        Tree::Bytes(bytes) => Value::Bytes(bytes.clone()),
        Tree::DateTime(ts) => Value::DateTime(*ts),
        Tree::Uuid(uuid) => Value::Uuid(*uuid),
        Tree::Map(map) => Value::Dict(map.clone()),
        other => Value::Untyped(other.clone()),
    }
}

/// Encodes messages as nested maps.
///
/// ```
/// use tracts_core::codec::{MapCodec, MessageCodec};
/// use tracts_core::schema::{FieldDefinition, MessageDefinition, RegistryBuilder};
/// use tracts_core::Tree;
///
/// let registry = RegistryBuilder::new()
///     .message(MessageDefinition::new("Point").field(FieldDefinition::integer("x")))
///     .build()
///     .unwrap();
/// let point = registry.get_message_by_name("Point").unwrap();
///
/// let mut message = point.new_message();
/// message.set("x", 3).unwrap();
/// let tree = MapCodec.encode_message(&message).unwrap();
/// assert_eq!(tree.as_map().unwrap()["x"], Tree::Int(3));
/// assert_eq!(MapCodec.decode_message(&point, &tree).unwrap(), message);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MapCodec;

impl MessageCodec for MapCodec {
    type Input = Tree;
    type Output = Tree;

    fn content_type(&self) -> &'static str {
        "application/x-tracts-map"
    }

    fn encode_message(&self, message: &Message) -> Result<Tree> {
        message.check_initialized()?;
        Ok(Tree::Map(encode_tree(message, &MapTransform)?))
    }

    fn decode_message(&self, message_type: &MessageType, input: &Tree) -> Result<Message> {
        decode_tree(message_type, input, &MapTransform)
    }
}
