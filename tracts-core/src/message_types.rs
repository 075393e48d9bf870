//! # Built-in message types
//!
//! Record types every service tends to need, declared in the `tracts` package.
use crate::error::{Error, Result};
use crate::message::Message;
use crate::schema::{FieldDefinition, MessageDefinition, MessageType, Registry, RegistryBuilder};
use once_cell::sync::Lazy;

static BUILTINS: Lazy<Registry> = Lazy::new(|| {
    RegistryBuilder::new()
        .message(MessageDefinition::new("tracts.VoidMessage"))
        .message(
            MessageDefinition::new("tracts.ErrorMessage")
                .field(FieldDefinition::string("title"))
                .field(FieldDefinition::string("message"))
                .field(FieldDefinition::string("explanation")),
        )
        .build()
        .expect("Built-in message types are well formed")
});

/// The registry holding the built-in types.
pub fn builtins() -> &'static Registry {
    &BUILTINS
}

fn builtin(name: &str) -> Result<MessageType> {
    BUILTINS
        .get_message_by_name(name)
        .ok_or_else(|| Error::DefinitionNotFound(name.to_string()))
}

/// A record with no fields.
pub fn void_message() -> Result<MessageType> {
    builtin("tracts.VoidMessage")
}

/// A record describing a failure: `title`, `message` and an optional `explanation`.
pub fn error_message() -> Result<MessageType> {
    builtin("tracts.ErrorMessage")
}

/// Describes `error` as an `ErrorMessage`.
pub fn error_message_from(error: &Error) -> Result<Message> {
    let mut message = error_message()?.new_message();
    message.set("title", error.title())?;
    message.set("message", error.to_string())?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{JsonCodec, MessageCodec};
    use crate::error::DecodeError;

    #[test]
    fn test_void_message_has_no_fields() {
        let void = void_message().unwrap();
        assert_eq!(void.full_name(), "tracts.VoidMessage");
        assert_eq!(void.fields().len(), 0);
        assert_eq!(JsonCodec::new().encode_message(&void.new_message()).unwrap(), "{}");
    }

    #[test]
    fn test_error_message_from_error() {
        let error = Error::from(DecodeError::new("Base64 decoding error: bad"));
        let message = error_message_from(&error).unwrap();
        assert_eq!(message.get("title").unwrap().unwrap().as_str(), Some("Decode Error"));
        assert_eq!(
            message.get("message").unwrap().unwrap().as_str(),
            Some("Base64 decoding error: bad")
        );
        assert!(!message.has_value_assigned("explanation"));
    }
}
