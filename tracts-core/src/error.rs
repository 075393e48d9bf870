//! # Errors
//!
//! Every fallible operation of the crate reports one of the enums below. The narrow
//! enums are returned where only one concern can fail (building a registry, looking up
//! an enum member, ...) and all of them convert into the crate-wide [`Error`].
use crate::variant::Variant;

/// A record or enum declaration is malformed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DefinitionError {
    #[error("'{0}' is not a valid definition name")]
    InvalidName(String),
    #[error("Definition '{0}' is declared more than once")]
    DuplicateDefinition(String),
    #[error("Field '{field}' is declared more than once in '{message}'")]
    DuplicateField { message: String, field: String },
    #[error("Field '{field}' of '{message}' clashes with a nested definition of the same name")]
    NameClash { message: String, field: String },
    #[error("Enum '{enumeration}' declares '{name}' more than once")]
    DuplicateEnumName { enumeration: String, name: String },
    #[error("Enum '{enumeration}' declares number {number} more than once")]
    DuplicateEnumNumber { enumeration: String, number: i64 },
    #[error("Enum '{enumeration}' value '{name}' has out of range number {number}")]
    EnumNumberOutOfRange {
        enumeration: String,
        name: String,
        number: i64,
    },
    #[error("Invalid field '{field}' in '{message}': {source}")]
    Field {
        message: String,
        field: String,
        #[source]
        source: FieldDefinitionError,
    },
}

/// A single field declaration is malformed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldDefinitionError {
    #[error("'{0}' is not a valid field name")]
    InvalidName(String),
    #[error("Repeated fields can not be required")]
    RequiredAndRepeated,
    #[error("Repeated fields may not have defaults")]
    RepeatedDefault,
    #[error("Invalid default value: {0}")]
    InvalidDefault(String),
    #[error("Invalid variant {variant} for {kind} field")]
    InvalidVariant { kind: &'static str, variant: Variant },
    #[error("Field target '{0}' is not of the expected kind")]
    InvalidTarget(String),
}

/// A value does not satisfy its field's constraints.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    /// Wire name of the offending field, when one is known.
    pub field_name: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field_name: None,
        }
    }

    pub fn for_field(field_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field_name: Some(field_name.into()),
        }
    }
}

/// A codec could not turn its input into field values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct DecodeError(pub String);

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failed enum member lookups.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnumError {
    #[error("No member named '{name}' in enum '{enumeration}'")]
    NameNotFound { enumeration: String, name: String },
    #[error("No member numbered {number} in enum '{enumeration}'")]
    NumberNotFound { enumeration: String, number: i64 },
    #[error("Member of '{found}' can not be converted to enum '{expected}'")]
    Mismatch { expected: String, found: String },
    #[error("No such value {value} for enum '{enumeration}'")]
    NoSuchValue { enumeration: String, value: String },
}

/// Crate-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    FieldDefinition(#[from] FieldDefinitionError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Enum(#[from] EnumError),
    #[error("Could not find definition for '{0}'")]
    DefinitionNotFound(String),
    #[error("Definition '{name}' is not {expected}")]
    WrongDefinitionKind { name: String, expected: &'static str },
    #[error("Message type '{message_type}' has no field named '{name}'")]
    UnknownField { message_type: String, name: String },
    #[error("Field '{0}' has no assigned value")]
    NotAssigned(String),
    #[error("Field '{0}' is repeated")]
    Repeated(String),
    #[error("Field '{0}' is not repeated")]
    NotRepeated(String),
    #[error("Field '{0}' is not a message field")]
    NotAMessage(String),
    #[error("Can not coerce value for field '{field}': {reason}")]
    Coerce { field: String, reason: String },
    #[error("Invalid input: '{0}'")]
    InvalidInput(String),
    #[error("Malformed JSON: '{0}'")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// A short human readable title describing the error category.
    pub fn title(&self) -> &'static str {
        match self {
            Error::Definition(_) | Error::FieldDefinition(_) => "Definition Error",
            Error::Validation(_) => "Validation Error",
            Error::Decode(_) => "Decode Error",
            Error::Enum(_) => "Enum Error",
            Error::DefinitionNotFound(_) | Error::WrongDefinitionKind { .. } => "Resolution Error",
            Error::UnknownField { .. } => "Unknown Field",
            Error::NotAssigned(_) => "Not Assigned",
            Error::Repeated(_) | Error::NotRepeated(_) | Error::NotAMessage(_) => "Field Kind Error",
            Error::Coerce { .. } => "Coercion Error",
            Error::InvalidInput(_) | Error::Json(_) => "Invalid Input",
        }
    }
}

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
