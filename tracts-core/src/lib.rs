//! # Tracts Core
//!
//! `tracts-core` is a runtime data-contract engine: record types and enums are declared
//! (in code or as a JSON schema document) while the program runs, and their instances
//! can be validated, introspected and moved across JSON, nested maps and URL query
//! strings.
//!
//! ## Key Components
//!
//! * **[`schema::Registry`]:** The frozen set of record types and enums. Built with a
//!   [`schema::RegistryBuilder`] or loaded with [`schema::Registry::from_schema_json`], it
//!   hands out [`schema::MessageType`] and [`schema::EnumType`] handles. Fields may refer
//!   to types by name before those types are declared; such references resolve on first
//!   use.
//! * **[`Message`]:** An instance of a record type. It validates every assignment,
//!   remembers which fields were explicitly assigned, falls back to declared defaults on
//!   read, and keeps values received for undeclared keys so they survive a round trip.
//! * **[`codec`]:** The nested-map, JSON and query-string codecs, all implementing
//!   [`codec::MessageCodec`].
//! * **[`message_types`]:** Built-in `VoidMessage` and `ErrorMessage` records.
//!
//! ## Example
//!
//! ```
//! use tracts_core::codec::{JsonCodec, MessageCodec, QueryCodec};
//! use tracts_core::schema::Registry;
//!
//! let registry = Registry::from_schema_json(r#"{
//!     "package": "zoo",
//!     "messages": [{
//!         "name": "Animal",
//!         "fields": [
//!             {"name": "name", "type": "string", "required": true},
//!             {"name": "legs", "type": "integer", "default": 4}
//!         ]
//!     }]
//! }"#).unwrap();
//! let animal = registry.get_message_by_name("zoo.Animal").unwrap();
//!
//! let message = JsonCodec::new().decode_message(&animal, r#"{"name": "dog"}"#).unwrap();
//! assert_eq!(QueryCodec::new().encode_message(&message).unwrap(), "name=dog");
//! ```
pub mod codec;
pub mod message;
pub mod message_types;
pub mod schema;

mod error;
mod timestamp;
mod tree;
mod variant;

pub use error::{
    DecodeError, DefinitionError, EnumError, Error, FieldDefinitionError, Result, ValidationError,
};
pub use message::{AssignedValue, FieldList, FieldValue, Message, UnrecognizedKey, Value};
pub use timestamp::{Timestamp, TimestampParseError};
pub use tree::Tree;
pub use variant::Variant;
