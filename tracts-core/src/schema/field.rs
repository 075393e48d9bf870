//! # Fields
//!
//! [`FieldDefinition`] is the declarative description of one attribute of a record type.
//! Once a registry is built each definition is reachable through a [`FieldDescriptor`],
//! which validates and coerces values and lazily resolves the types that message and
//! enum fields point to.
use super::enums::{EnumType, EnumValue};
use super::registry::{Definition, DefinitionIndex, MessageType};
use crate::error::{Error, FieldDefinitionError, Result, ValidationError};
use crate::message::{FieldValue, Value};
use crate::timestamp::Timestamp;
use crate::tree::Tree;
use crate::variant::Variant;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The kind of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Integer,
    Float,
    Boolean,
    Bytes,
    String,
    Enum,
    Message,
    /// A date-time exchanged as ISO-8601 text.
    #[serde(rename = "datetime")]
    DateTimeIso8601,
    /// A date-time exchanged as milliseconds since the Unix epoch.
    #[serde(rename = "datetime_ms")]
    DateTimeMs,
    Uuid,
    /// A string-keyed map of arbitrary nested values.
    Dict,
    /// Any JSON-like value, stored as given.
    Untyped,
}

impl FieldKind {
    pub fn default_variant(self) -> Variant {
        match self {
            FieldKind::Integer | FieldKind::DateTimeMs => Variant::Int64,
            FieldKind::Float => Variant::Double,
            FieldKind::Boolean => Variant::Bool,
            FieldKind::Bytes => Variant::Bytes,
            FieldKind::String | FieldKind::DateTimeIso8601 | FieldKind::Uuid => Variant::String,
            FieldKind::Enum => Variant::Enum,
            FieldKind::Message | FieldKind::Dict => Variant::Message,
            FieldKind::Untyped => Variant::Untyped,
        }
    }

    pub fn allowed_variants(self) -> &'static [Variant] {
        match self {
            FieldKind::Integer => &[
                Variant::Int32,
                Variant::Int64,
                Variant::Uint32,
                Variant::Uint64,
                Variant::Sint32,
                Variant::Sint64,
            ],
            FieldKind::Float => &[Variant::Double, Variant::Float],
            FieldKind::Boolean => &[Variant::Bool],
            FieldKind::Bytes => &[Variant::Bytes],
            FieldKind::String | FieldKind::DateTimeIso8601 | FieldKind::Uuid => &[Variant::String],
            FieldKind::Enum => &[Variant::Enum],
            FieldKind::Message | FieldKind::Dict => &[Variant::Message],
            FieldKind::DateTimeMs => &[Variant::Int64],
            FieldKind::Untyped => &[Variant::Untyped],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::Bytes => "bytes",
            FieldKind::String => "string",
            FieldKind::Enum => "enum",
            FieldKind::Message => "message",
            FieldKind::DateTimeIso8601 => "datetime",
            FieldKind::DateTimeMs => "datetime_ms",
            FieldKind::Uuid => "uuid",
            FieldKind::Dict => "dict",
            FieldKind::Untyped => "untyped",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a message or enum field points to: a name still to be resolved, or a handle.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeTarget {
    Named(String),
    Message(MessageType),
    Enum(EnumType),
}

impl From<&str> for TypeTarget {
    fn from(value: &str) -> Self {
        TypeTarget::Named(value.to_string())
    }
}

impl From<String> for TypeTarget {
    fn from(value: String) -> Self {
        TypeTarget::Named(value)
    }
}

impl From<MessageType> for TypeTarget {
    fn from(value: MessageType) -> Self {
        TypeTarget::Message(value)
    }
}

impl From<&MessageType> for TypeTarget {
    fn from(value: &MessageType) -> Self {
        TypeTarget::Message(value.clone())
    }
}

impl From<EnumType> for TypeTarget {
    fn from(value: EnumType) -> Self {
        TypeTarget::Enum(value)
    }
}

impl From<&EnumType> for TypeTarget {
    fn from(value: &EnumType) -> Self {
        TypeTarget::Enum(value.clone())
    }
}

/// Declarative description of a field.
///
/// ```
/// use tracts_core::schema::FieldDefinition;
/// use tracts_core::Variant;
///
/// let field = FieldDefinition::integer("count").variant(Variant::Int32).default(7);
/// assert!(field.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    attribute: String,
    wire_name: Option<String>,
    kind: FieldKind,
    target: Option<TypeTarget>,
    required: bool,
    repeated: bool,
    variant: Option<Variant>,
    default: Option<Value>,
}

macro_rules! scalar_constructors {
    ($($(#[$meta:meta])* $fn_name:ident => $kind:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $fn_name(attribute: impl Into<String>) -> Self {
                Self::new(attribute, FieldKind::$kind, None)
            }
        )*
    };
}

impl FieldDefinition {
    pub(crate) fn new(attribute: impl Into<String>, kind: FieldKind, target: Option<TypeTarget>) -> Self {
        Self {
            attribute: attribute.into(),
            wire_name: None,
            kind,
            target,
            required: false,
            repeated: false,
            variant: None,
            default: None,
        }
    }

    scalar_constructors! {
        integer => Integer,
        float => Float,
        boolean => Boolean,
        bytes => Bytes,
        string => String,
        /// A date-time exchanged as ISO-8601 text.
        datetime => DateTimeIso8601,
        /// A date-time exchanged as integer milliseconds since the epoch.
        datetime_ms => DateTimeMs,
        uuid => Uuid,
        dict => Dict,
        untyped => Untyped,
    }

    pub fn enumeration(attribute: impl Into<String>, target: impl Into<TypeTarget>) -> Self {
        Self::new(attribute, FieldKind::Enum, Some(target.into()))
    }

    pub fn message(attribute: impl Into<String>, target: impl Into<TypeTarget>) -> Self {
        Self::new(attribute, FieldKind::Message, Some(target.into()))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    pub fn variant(mut self, variant: Variant) -> Self {
        self.variant = Some(variant);
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the external name used by codecs, which otherwise is the attribute name.
    pub fn wire_name(mut self, name: impl Into<String>) -> Self {
        self.wire_name = Some(name.into());
        self
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn name(&self) -> &str {
        self.wire_name.as_deref().unwrap_or(&self.attribute)
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Checks the declaration on its own, without any registry.
    pub fn validate(&self) -> Result<(), FieldDefinitionError> {
        if !super::is_identifier(&self.attribute) {
            return Err(FieldDefinitionError::InvalidName(self.attribute.clone()));
        }
        if self.wire_name.as_deref() == Some("") {
            return Err(FieldDefinitionError::InvalidName(String::new()));
        }
        if self.required && self.repeated {
            return Err(FieldDefinitionError::RequiredAndRepeated);
        }
        if self.repeated && self.default.is_some() {
            return Err(FieldDefinitionError::RepeatedDefault);
        }
        if let Some(variant) = self.variant {
            if !self.kind.allowed_variants().contains(&variant) {
                return Err(FieldDefinitionError::InvalidVariant {
                    kind: self.kind.name(),
                    variant,
                });
            }
        }

        match (self.kind, &self.target) {
            (FieldKind::Enum, Some(TypeTarget::Message(target))) => {
                return Err(FieldDefinitionError::InvalidTarget(target.full_name().to_string()));
            }
            (FieldKind::Message, Some(TypeTarget::Enum(target))) => {
                return Err(FieldDefinitionError::InvalidTarget(target.full_name().to_string()));
            }
            (FieldKind::Enum | FieldKind::Message, Some(TypeTarget::Named(name))) if name.is_empty() => {
                return Err(FieldDefinitionError::InvalidTarget(String::new()));
            }
            _ => {}
        }

        if let Some(default) = &self.default {
            self.check_default(default)?;
        }
        Ok(())
    }

    fn check_default(&self, default: &Value) -> Result<(), FieldDefinitionError> {
        match self.kind {
            FieldKind::Message => Err(FieldDefinitionError::InvalidDefault(
                "message fields can not have defaults".to_string(),
            )),
            FieldKind::Enum => match (default, &self.target) {
                (Value::Enum(member), Some(TypeTarget::Enum(target))) if member.enum_type() != target => {
                    Err(FieldDefinitionError::InvalidDefault(format!(
                        "{member:?} is not a member of {}",
                        target.full_name()
                    )))
                }
                (Value::Enum(_) | Value::String(_) | Value::Int(_), _) => Ok(()),
                (other, _) => Err(FieldDefinitionError::InvalidDefault(format!(
                    "{} is not an enum member, name or number",
                    other.type_name()
                ))),
            },
            kind => check_scalar(kind, self.effective_variant(), self.name(), default)
                .map_err(FieldDefinitionError::InvalidDefault),
        }
    }

    fn effective_variant(&self) -> Variant {
        self.variant.unwrap_or_else(|| self.kind.default_variant())
    }

    pub(crate) fn into_inner(self) -> FieldInner {
        let variant = self.effective_variant();
        let default = self.default.map(|value| match (self.kind, value) {
            (FieldKind::Enum, Value::String(name)) => DefaultValue::EnumName(name),
            (FieldKind::Enum, Value::Int(number)) => DefaultValue::EnumNumber(number),
            (FieldKind::Enum, Value::Enum(member)) => DefaultValue::EnumMember(member),
            (_, value) => DefaultValue::Value(value),
        });

        FieldInner {
            name: self.wire_name.unwrap_or_else(|| self.attribute.clone()),
            attribute: self.attribute,
            kind: self.kind,
            target: self.target.map(|target| TypeReference {
                target,
                resolved: OnceCell::new(),
            }),
            required: self.required,
            repeated: self.repeated,
            variant,
            default,
        }
    }
}

#[derive(Debug)]
pub(crate) enum DefaultValue {
    Value(Value),
    EnumName(String),
    EnumNumber(i64),
    EnumMember(EnumValue),
}

#[derive(Debug)]
pub(crate) struct TypeReference {
    target: TypeTarget,
    resolved: OnceCell<DefinitionIndex>,
}

#[derive(Debug)]
pub(crate) struct FieldInner {
    pub(crate) attribute: String,
    pub(crate) name: String,
    pub(crate) kind: FieldKind,
    target: Option<TypeReference>,
    pub(crate) required: bool,
    pub(crate) repeated: bool,
    pub(crate) variant: Variant,
    default: Option<DefaultValue>,
}

/// A handle to a field of a [`MessageType`].
#[derive(Clone, PartialEq)]
pub struct FieldDescriptor {
    message: MessageType,
    index: usize,
}

impl FieldDescriptor {
    pub(crate) fn new(message: MessageType, index: usize) -> Self {
        Self { message, index }
    }

    fn inner(&self) -> &FieldInner {
        &self.message.inner().fields[self.index]
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// The wire name used by codecs.
    pub fn name(&self) -> &str {
        &self.inner().name
    }

    /// The attribute name used in code.
    pub fn attribute(&self) -> &str {
        &self.inner().attribute
    }

    pub fn kind(&self) -> FieldKind {
        self.inner().kind
    }

    pub fn variant(&self) -> Variant {
        self.inner().variant
    }

    pub fn is_required(&self) -> bool {
        self.inner().required
    }

    pub fn is_repeated(&self) -> bool {
        self.inner().repeated
    }

    pub fn has_default(&self) -> bool {
        self.inner().default.is_some()
    }

    /// The record type declaring this field.
    pub fn containing_type(&self) -> &MessageType {
        &self.message
    }

    /// The target as written in the declaration, for message and enum fields.
    pub fn target_name(&self) -> Option<String> {
        self.inner().target.as_ref().map(|reference| match &reference.target {
            TypeTarget::Named(name) => name.clone(),
            TypeTarget::Message(message) => message.full_name().to_string(),
            TypeTarget::Enum(enumeration) => enumeration.full_name().to_string(),
        })
    }

    fn target(&self) -> Result<Definition> {
        let reference = self
            .inner()
            .target
            .as_ref()
            .ok_or_else(|| Error::WrongDefinitionKind {
                name: self.name().to_string(),
                expected: "a message or enum field",
            })?;

        match &reference.target {
            TypeTarget::Message(message) => Ok(Definition::Message(message.clone())),
            TypeTarget::Enum(enumeration) => Ok(Definition::Enum(enumeration.clone())),
            TypeTarget::Named(name) => {
                let registry = self.message.registry();
                let index = reference.resolved.get_or_try_init(|| {
                    registry
                        .find_definition(name, Some(self.message.full_name()))
                        .map(|definition| definition.index())
                })?;
                Ok(Definition::from_index(registry.clone(), *index))
            }
        }
    }

    /// Resolves the record type of a message field.
    pub fn message_type(&self) -> Result<MessageType> {
        match self.target()? {
            Definition::Message(message) if self.kind() == FieldKind::Message => Ok(message),
            other => Err(Error::WrongDefinitionKind {
                name: other.full_name().to_string(),
                expected: "a message",
            }),
        }
    }

    /// Resolves the enum type of an enum field.
    pub fn enum_type(&self) -> Result<EnumType> {
        match self.target()? {
            Definition::Enum(enumeration) if self.kind() == FieldKind::Enum => Ok(enumeration),
            other => Err(Error::WrongDefinitionKind {
                name: other.full_name().to_string(),
                expected: "an enum",
            }),
        }
    }

    /// The declared default, with enum defaults resolved to members.
    pub fn default_value(&self) -> Result<Option<Value>> {
        let Some(default) = &self.inner().default else {
            return Ok(None);
        };

        let value = match default {
            DefaultValue::Value(value) => value.clone(),
            DefaultValue::EnumName(name) => Value::Enum(self.enum_type()?.by_name(name)?),
            DefaultValue::EnumNumber(number) => Value::Enum(self.enum_type()?.by_number(*number)?),
            DefaultValue::EnumMember(member) => Value::Enum(self.enum_type()?.lookup(member)?),
        };
        Ok(Some(value))
    }

    /// Verifies an enum default against its target when the target already resolves.
    pub(crate) fn check_resolvable_default(&self) -> Result<(), FieldDefinitionError> {
        if self.kind() != FieldKind::Enum || !self.has_default() {
            return Ok(());
        }
        if self.enum_type().is_err() {
            return Ok(());
        }
        self.default_value()
            .map(|_| ())
            .map_err(|err| FieldDefinitionError::InvalidDefault(err.to_string()))
    }

    /// Checks a whole field value: its shape must match the cardinality, and every
    /// element must be acceptable.
    pub fn validate(&self, value: &FieldValue) -> Result<()> {
        match (value, self.is_repeated()) {
            (FieldValue::Null, false) if self.is_required() => Err(ValidationError::for_field(
                self.name(),
                format!("Required field {} is missing", self.name()),
            )
            .into()),
            (FieldValue::Null, _) => Ok(()),
            (FieldValue::Single(value), false) => self.validate_element(value),
            (FieldValue::List(values), true) => values.iter().try_for_each(|v| self.validate_element(v)),
            (FieldValue::Single(value), true) => Err(ValidationError::for_field(
                self.name(),
                format!("Field {} is repeated. Found: {value:?}", self.name()),
            )
            .into()),
            (FieldValue::List(values), false) => Err(ValidationError::for_field(
                self.name(),
                format!("Field {} is not repeated. Found: {values:?}", self.name()),
            )
            .into()),
        }
    }

    /// Checks a single value against the field's kind, ignoring cardinality.
    pub fn validate_element(&self, value: &Value) -> Result<()> {
        match self.kind() {
            FieldKind::Enum => {
                let expected = self.enum_type()?;
                match value {
                    Value::Enum(member) if member.enum_type() == &expected => Ok(()),
                    other => Err(self.type_mismatch(expected.full_name(), other)),
                }
            }
            FieldKind::Message => {
                let expected = self.message_type()?;
                match value {
                    Value::Message(message) if message.message_type() == &expected => Ok(()),
                    other => Err(self.type_mismatch(expected.full_name(), other)),
                }
            }
            kind => check_scalar(kind, self.variant(), self.name(), value)
                .map_err(|message| ValidationError::for_field(self.name(), message).into()),
        }
    }

    fn type_mismatch(&self, expected: &str, found: &Value) -> Error {
        ValidationError::for_field(
            self.name(),
            format!(
                "Expected type {expected} for field {}, found {found:?} (type {})",
                self.name(),
                found.type_name()
            ),
        )
        .into()
    }

    /// Converts a loosely typed value into the canonical representation of the field.
    ///
    /// Null passes through untouched; lists are converted element by element.
    pub fn coerce(&self, value: FieldValue) -> Result<FieldValue> {
        Ok(match value {
            FieldValue::Null => FieldValue::Null,
            FieldValue::Single(value) => FieldValue::Single(self.coerce_element(value)?),
            FieldValue::List(values) => FieldValue::List(
                values
                    .into_iter()
                    .map(|value| self.coerce_element(value))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    pub fn coerce_element(&self, value: Value) -> Result<Value> {
        let fail = |reason: String| Error::Coerce {
            field: self.name().to_string(),
            reason,
        };

        let coerced = match (self.kind(), value) {
            (FieldKind::Integer, Value::Int(i)) => Value::Int(i),
            (FieldKind::Integer, Value::Float(f)) if f.is_finite() => Value::Int(f.trunc() as i64),
            (FieldKind::Integer, Value::String(s)) => {
                Value::Int(s.trim().parse().map_err(|_| fail(format!("'{s}' is not an integer")))?)
            }
            (FieldKind::Float, Value::Float(f)) => Value::Float(f),
            (FieldKind::Float, Value::Int(i)) => Value::Float(i as f64),
            (FieldKind::Float, Value::String(s)) => {
                Value::Float(s.trim().parse().map_err(|_| fail(format!("'{s}' is not a number")))?)
            }
            (FieldKind::Boolean, Value::Bool(b)) => Value::Bool(b),
            (FieldKind::Boolean, Value::Int(0)) => Value::Bool(false),
            (FieldKind::Boolean, Value::Int(1)) => Value::Bool(true),
            (FieldKind::Boolean, Value::String(s)) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
            (FieldKind::Boolean, Value::String(s)) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
            (FieldKind::String, Value::String(s)) => Value::String(s),
            (FieldKind::String, Value::Int(i)) => Value::String(i.to_string()),
            (FieldKind::String, Value::Float(f)) => Value::String(f.to_string()),
            (FieldKind::String, Value::Bool(b)) => Value::String(b.to_string()),
            (FieldKind::String, Value::Enum(member)) => Value::String(member.name().to_string()),
            (FieldKind::String, Value::Uuid(uuid)) => Value::String(uuid.hyphenated().to_string()),
            (FieldKind::String, Value::DateTime(ts)) => Value::String(ts.to_iso8601()),
            (FieldKind::Bytes, Value::Bytes(bytes)) => Value::Bytes(bytes),
            (FieldKind::Bytes, Value::String(s)) => Value::Bytes(s.into_bytes()),
            (FieldKind::Enum, Value::Enum(member)) => Value::Enum(self.enum_type()?.lookup(&member)?),
            (FieldKind::Enum, Value::String(name)) => Value::Enum(self.enum_type()?.by_name(&name)?),
            (FieldKind::Enum, Value::Int(number)) => Value::Enum(self.enum_type()?.by_number(number)?),
            (FieldKind::Message, Value::Message(message)) => Value::Message(message),
            (FieldKind::DateTimeIso8601 | FieldKind::DateTimeMs, Value::DateTime(ts)) => Value::DateTime(ts),
            (FieldKind::DateTimeIso8601 | FieldKind::DateTimeMs, Value::String(s)) => Value::DateTime(
                Timestamp::from_str(&s).map_err(|err| fail(err.to_string()))?,
            ),
            (FieldKind::DateTimeIso8601 | FieldKind::DateTimeMs, Value::Int(ms)) => Value::DateTime(
                Timestamp::from_millis(ms).ok_or_else(|| fail(format!("{ms} is out of range")))?,
            ),
            (FieldKind::Uuid, Value::Uuid(uuid)) => Value::Uuid(uuid),
            (FieldKind::Uuid, Value::String(s)) => {
                Value::Uuid(Uuid::parse_str(&s).map_err(|err| fail(err.to_string()))?)
            }
            (FieldKind::Dict, Value::Dict(map)) => Value::Dict(map),
            (FieldKind::Dict, Value::Untyped(Tree::Map(map))) => Value::Dict(map),
            (FieldKind::Untyped, Value::Untyped(tree)) => Value::Untyped(tree),
            (FieldKind::Untyped, Value::Bool(b)) => Value::Untyped(Tree::Bool(b)),
            (FieldKind::Untyped, Value::Int(i)) => Value::Untyped(Tree::Int(i)),
            (FieldKind::Untyped, Value::Float(f)) => Value::Untyped(Tree::Float(f)),
            (FieldKind::Untyped, Value::String(s)) => Value::Untyped(Tree::String(s)),
            (FieldKind::Untyped, Value::Dict(map)) => Value::Untyped(Tree::Map(map)),
            (kind, other) => {
                return Err(fail(format!(
                    "{} can not be converted to {kind}",
                    other.type_name()
                )));
            }
        };

        self.validate_element(&coerced)?;
        Ok(coerced)
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("message", &self.message.full_name())
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("repeated", &self.is_repeated())
            .field("required", &self.is_required())
            .finish()
    }
}

/// Kind check shared by declaration-time default checks and runtime validation.
pub(crate) fn check_scalar(
    kind: FieldKind,
    variant: Variant,
    field_name: &str,
    value: &Value,
) -> Result<(), String> {
    match (kind, value) {
        (FieldKind::Integer, Value::Int(i)) => match variant.integer_bounds() {
            Some((low, high)) if (*i as i128) < low || (*i as i128) > high => Err(format!(
                "Value {i} is out of range for {variant} field {field_name}"
            )),
            _ => Ok(()),
        },
        (FieldKind::Float, Value::Float(_))
        | (FieldKind::Boolean, Value::Bool(_))
        | (FieldKind::Bytes, Value::Bytes(_))
        | (FieldKind::String, Value::String(_))
        | (FieldKind::DateTimeIso8601 | FieldKind::DateTimeMs, Value::DateTime(_))
        | (FieldKind::Uuid, Value::Uuid(_))
        | (FieldKind::Dict, Value::Dict(_))
        | (
            FieldKind::Untyped,
            Value::Untyped(_)
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::String(_)
            | Value::Dict(_),
        ) => Ok(()),
        (kind, other) => Err(format!(
            "Expected type {kind} for field {field_name}, found {other:?} (type {})",
            other.type_name()
        )),
    }
}
