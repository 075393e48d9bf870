//! # Schema
//!
//! Runtime definitions of record types and enums.
//!
//! Definitions are declared with [`MessageDefinition`], [`FieldDefinition`] and
//! [`EnumDefinition`], collected by a [`RegistryBuilder`] (or loaded from a
//! [`SchemaDocument`]) and frozen into a [`Registry`]. The registry hands out
//! [`MessageType`], [`EnumType`] and [`FieldDescriptor`] handles used by messages and
//! codecs.
mod document;
mod enums;
mod field;
mod registry;

pub use document::{EnumDocument, EnumValueDocument, FieldDocument, MessageDocument, SchemaDocument};
pub use enums::{EnumDefinition, EnumLookup, EnumType, EnumValue, MAX_ENUM_NUMBER};
pub use field::{FieldDefinition, FieldDescriptor, FieldKind, TypeTarget};
pub use registry::{Definition, MessageDefinition, MessageType, Registry, RegistryBuilder};

/// ASCII identifier: a letter or underscore followed by letters, digits or underscores.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
