use super::{FieldList, Message};
use crate::schema::EnumValue;
use crate::timestamp::Timestamp;
use crate::tree::Tree;
use std::collections::BTreeMap;
use uuid::Uuid;

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Enum(EnumValue),
    Message(Message),
    DateTime(Timestamp),
    Uuid(Uuid),
    Dict(BTreeMap<String, Tree>),
    Untyped(Tree),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Enum(_) => "enum",
            Value::Message(_) => "message",
            Value::DateTime(_) => "datetime",
            Value::Uuid(_) => "uuid",
            Value::Dict(_) => "dict",
            Value::Untyped(_) => "untyped",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            Value::Enum(member) => Some(member),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Value::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_message_mut(&mut self) -> Option<&mut Message> {
        match self {
            Value::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&Timestamp> {
        match self {
            Value::DateTime(ts) => Some(ts),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<&Uuid> {
        match self {
            Value::Uuid(uuid) => Some(uuid),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<String, Tree>> {
        match self {
            Value::Dict(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_untyped(&self) -> Option<&Tree> {
        match self {
            Value::Untyped(tree) => Some(tree),
            _ => None,
        }
    }
}

/// What can be assigned to a field: nothing, one value, or a list of values.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Single(Value),
    List(Vec<Value>),
}

/// A borrowed view of an assigned field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssignedValue<'a> {
    Null,
    Single(&'a Value),
    List(&'a FieldList),
}

macro_rules! impl_from_scalar {
    ($($ty:ty => |$v:ident| $conv:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $conv
                }
            }

            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::Single(Value::from(value))
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => |v| Value::Bool(v),
    i32 => |v| Value::Int(v as i64),
    i64 => |v| Value::Int(v),
    u32 => |v| Value::Int(v as i64),
    f32 => |v| Value::Float(v as f64),
    f64 => |v| Value::Float(v),
    &str => |v| Value::String(v.to_string()),
    String => |v| Value::String(v),
    &[u8] => |v| Value::Bytes(v.to_vec()),
    EnumValue => |v| Value::Enum(v),
    Message => |v| Value::Message(v),
    Timestamp => |v| Value::DateTime(v),
    Uuid => |v| Value::Uuid(v),
    BTreeMap<String, Tree> => |v| Value::Dict(v),
    Tree => |v| Value::Untyped(v),
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Single(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        FieldValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, |v| FieldValue::Single(v.into()))
    }
}

impl From<FieldList> for FieldValue {
    fn from(list: FieldList) -> Self {
        FieldValue::List(list.into_vec())
    }
}

impl From<AssignedValue<'_>> for FieldValue {
    fn from(value: AssignedValue<'_>) -> Self {
        match value {
            AssignedValue::Null => FieldValue::Null,
            AssignedValue::Single(value) => FieldValue::Single(value.clone()),
            AssignedValue::List(list) => FieldValue::List(list.to_vec()),
        }
    }
}
