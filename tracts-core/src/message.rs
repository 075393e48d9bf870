//! # Messages
//!
//! A [`Message`] is an instance of a record type. It remembers which fields were
//! explicitly assigned (even when assigned nothing), falls back to declared defaults on
//! read, validates every assignment, and keeps a ledger of values received for keys the
//! record type does not declare.
//!
//! ```
//! use tracts_core::schema::{FieldDefinition, MessageDefinition, RegistryBuilder};
//! use tracts_core::Value;
//!
//! let registry = RegistryBuilder::new()
//!     .message(
//!         MessageDefinition::new("Pet")
//!             .field(FieldDefinition::string("name"))
//!             .field(FieldDefinition::integer("age").default(1)),
//!     )
//!     .build()
//!     .unwrap();
//! let pet_type = registry.get_message_by_name("Pet").unwrap();
//!
//! let mut pet = pet_type.new_message();
//! pet.set("name", "Rex").unwrap();
//! assert_eq!(pet.get("age").unwrap().as_deref(), Some(&Value::Int(1)));
//! assert!(pet.has_value_assigned("name"));
//! assert!(!pet.has_value_assigned("age"));
//! ```
mod field_list;
mod unrecognized;
mod value;

pub use field_list::FieldList;
pub use unrecognized::{UnrecognizedKey, infer_variant};
pub use value::{AssignedValue, FieldValue, Value};

use crate::error::{Error, Result, ValidationError};
use crate::schema::{FieldDescriptor, FieldKind, MessageType};
use crate::tree::Tree;
use crate::variant::Variant;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use unrecognized::UnrecognizedField;

#[derive(Debug, Clone)]
enum Slot {
    Null,
    Single(Value),
    List(FieldList),
}

/// An instance of a [`MessageType`].
#[derive(Clone)]
pub struct Message {
    message_type: MessageType,
    values: BTreeMap<usize, Slot>,
    unrecognized: Vec<UnrecognizedField>,
}

impl Message {
    pub fn new(message_type: &MessageType) -> Self {
        Self {
            message_type: message_type.clone(),
            values: BTreeMap::new(),
            unrecognized: Vec::new(),
        }
    }

    pub fn message_type(&self) -> &MessageType {
        &self.message_type
    }

    /// Resolves an attribute name or a wire name.
    fn lookup(&self, name: &str) -> Result<FieldDescriptor> {
        self.message_type
            .find_field(name)
            .ok_or_else(|| self.unknown_field(name))
    }

    fn unknown_field(&self, name: &str) -> Error {
        Error::UnknownField {
            message_type: self.message_type.full_name().to_string(),
            name: name.to_string(),
        }
    }

    fn check_owner(&self, field: &FieldDescriptor) -> Result<()> {
        if field.containing_type() == &self.message_type {
            Ok(())
        } else {
            Err(self.unknown_field(field.name()))
        }
    }

    /// Looks a field up by wire name.
    pub fn field_by_name(&self, name: &str) -> Result<FieldDescriptor> {
        self.message_type
            .get_field_by_name(name)
            .ok_or_else(|| self.unknown_field(name))
    }

    /// All declared fields, in declaration order.
    pub fn all_fields(&self) -> impl ExactSizeIterator<Item = FieldDescriptor> + '_ {
        self.message_type.fields()
    }

    /// Assigns a field by attribute or wire name.
    ///
    /// Assigning [`FieldValue::Null`] always succeeds and marks the field as assigned;
    /// repeated fields then hold an empty list. Anything else must pass validation
    /// unchanged, no conversion is attempted.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<()> {
        let field = self.lookup(name)?;
        self.set_field(&field, value.into())
    }

    pub fn set_field(&mut self, field: &FieldDescriptor, value: FieldValue) -> Result<()> {
        self.check_owner(field)?;
        if value != FieldValue::Null {
            field.validate(&value)?;
        }

        let slot = match value {
            FieldValue::Null if field.is_repeated() => Slot::List(FieldList::new(field.clone())),
            FieldValue::Null => Slot::Null,
            FieldValue::Single(value) => Slot::Single(value),
            FieldValue::List(values) => Slot::List(FieldList::from_validated(field.clone(), values)),
        };
        self.values.insert(field.index(), slot);
        Ok(())
    }

    /// Reads a non-repeated field, substituting the default when nothing (or null) is
    /// assigned.
    pub fn get(&self, name: &str) -> Result<Option<Cow<'_, Value>>> {
        let field = self.lookup(name)?;
        self.get_field(&field)
    }

    pub fn get_field(&self, field: &FieldDescriptor) -> Result<Option<Cow<'_, Value>>> {
        self.check_owner(field)?;
        if field.is_repeated() {
            return Err(Error::Repeated(field.name().to_string()));
        }
        match self.values.get(&field.index()) {
            Some(Slot::Single(value)) => Ok(Some(Cow::Borrowed(value))),
            _ => Ok(field.default_value()?.map(Cow::Owned)),
        }
    }

    /// Reads a repeated field. Unassigned fields read as an empty list.
    pub fn get_list(&self, name: &str) -> Result<Cow<'_, FieldList>> {
        let field = self.lookup(name)?;
        self.get_list_field(&field)
    }

    pub fn get_list_field(&self, field: &FieldDescriptor) -> Result<Cow<'_, FieldList>> {
        self.check_owner(field)?;
        if !field.is_repeated() {
            return Err(Error::NotRepeated(field.name().to_string()));
        }
        match self.values.get(&field.index()) {
            Some(Slot::List(list)) => Ok(Cow::Borrowed(list)),
            _ => Ok(Cow::Owned(FieldList::new(field.clone()))),
        }
    }

    /// Mutable access to a repeated field's list, marking the field as assigned.
    pub fn list_mut(&mut self, name: &str) -> Result<&mut FieldList> {
        let field = self.lookup(name)?;
        if !field.is_repeated() {
            return Err(Error::NotRepeated(field.name().to_string()));
        }

        let slot = self
            .values
            .entry(field.index())
            .or_insert_with(|| Slot::List(FieldList::new(field.clone())));
        match slot {
            Slot::List(list) => Ok(list),
            _ => Err(Error::NotRepeated(field.name().to_string())),
        }
    }

    /// Mutable access to a non-repeated message field, assigning a fresh instance of the
    /// field's record type when nothing is assigned yet.
    pub fn message_mut(&mut self, name: &str) -> Result<&mut Message> {
        let field = self.lookup(name)?;
        if field.is_repeated() {
            return Err(Error::Repeated(field.name().to_string()));
        }
        if field.kind() != FieldKind::Message {
            return Err(Error::NotAMessage(field.name().to_string()));
        }

        if !matches!(
            self.values.get(&field.index()),
            Some(Slot::Single(Value::Message(_)))
        ) {
            let child = field.message_type()?.new_message();
            self.values.insert(field.index(), Slot::Single(Value::Message(child)));
        }

        match self.values.get_mut(&field.index()) {
            Some(Slot::Single(Value::Message(child))) => Ok(child),
            _ => Err(Error::NotAMessage(field.name().to_string())),
        }
    }

    /// Whether the field with this wire name was explicitly assigned. Unknown names are
    /// simply not assigned.
    pub fn has_value_assigned(&self, name: &str) -> bool {
        self.message_type
            .get_field_by_name(name)
            .is_some_and(|field| self.values.contains_key(&field.index()))
    }

    /// The stored value of the field with this wire name, without default substitution.
    pub fn get_assigned_value(&self, name: &str) -> Result<AssignedValue<'_>> {
        let field = self.field_by_name(name)?;
        self.assigned(&field)
            .ok_or_else(|| Error::NotAssigned(field.name().to_string()))
    }

    pub(crate) fn assigned(&self, field: &FieldDescriptor) -> Option<AssignedValue<'_>> {
        self.values.get(&field.index()).map(|slot| match slot {
            Slot::Null => AssignedValue::Null,
            Slot::Single(value) => AssignedValue::Single(value),
            Slot::List(list) => AssignedValue::List(list),
        })
    }

    /// Assigned fields with their stored values, in declaration order.
    pub fn assigned_fields(&self) -> impl Iterator<Item = (FieldDescriptor, AssignedValue<'_>)> + '_ {
        self.message_type
            .fields()
            .filter_map(move |field| self.assigned(&field).map(|value| (field, value)))
    }

    /// Removes any assignment, so the field reads as its default again.
    pub fn unset(&mut self, name: &str) -> Result<()> {
        let field = self.lookup(name)?;
        self.values.remove(&field.index());
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.check_initialized().is_ok()
    }

    /// Verifies that every required field has an effective value, recursing into
    /// assigned message fields and message list elements.
    pub fn check_initialized(&self) -> Result<()> {
        for field in self.message_type.fields() {
            match self.values.get(&field.index()) {
                Some(Slot::Single(Value::Message(child))) => child.check_initialized()?,
                Some(Slot::List(list)) => {
                    for child in list.iter().filter_map(Value::as_message) {
                        child.check_initialized()?;
                    }
                }
                Some(Slot::Single(_)) => {}
                Some(Slot::Null) | None => {
                    if field.is_required() && field.default_value()?.is_none() {
                        return Err(ValidationError::for_field(
                            field.name(),
                            format!(
                                "Message {} is missing required field {}",
                                self.message_type.name(),
                                field.name()
                            ),
                        )
                        .into());
                    }
                }
            }
        }
        Ok(())
    }

    /// Records a value for a key this record type does not declare, replacing any
    /// earlier value for the same key.
    pub fn set_unrecognized_field(&mut self, key: impl Into<UnrecognizedKey>, value: Tree, variant: Variant) {
        let key = key.into();
        match self.unrecognized.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => {
                entry.value = value;
                entry.variant = variant;
            }
            None => self.unrecognized.push(UnrecognizedField { key, value, variant }),
        }
    }

    /// Keys of unrecognized values, in insertion order.
    pub fn all_unrecognized_fields(&self) -> impl ExactSizeIterator<Item = &UnrecognizedKey> {
        self.unrecognized.iter().map(|entry| &entry.key)
    }

    pub fn get_unrecognized_field_info(&self, key: impl Into<UnrecognizedKey>) -> Option<(&Tree, Variant)> {
        let key = key.into();
        self.unrecognized
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| (&entry.value, entry.variant))
    }

    /// Like [`Message::get_unrecognized_field_info`], falling back to the given defaults
    /// for keys that were never recorded.
    pub fn get_unrecognized_field_info_or(
        &self,
        key: impl Into<UnrecognizedKey>,
        value_default: Tree,
        variant_default: Option<Variant>,
    ) -> (Tree, Option<Variant>) {
        match self.get_unrecognized_field_info(key) {
            Some((value, variant)) => (value.clone(), Some(variant)),
            None => (value_default, variant_default),
        }
    }

    pub(crate) fn unrecognized_entries(&self) -> impl Iterator<Item = (&UnrecognizedKey, &Tree)> {
        self.unrecognized.iter().map(|entry| (&entry.key, &entry.value))
    }

    pub fn strip_unrecognized_fields(&mut self) {
        self.unrecognized.clear();
    }
}

impl Message {
    /// What a field reads as. Null and unassigned scalars read as the default, and a
    /// repeated field reads as its elements whether or not a list was ever assigned.
    fn effective_values(&self, field: &FieldDescriptor) -> Vec<Cow<'_, Value>> {
        match self.values.get(&field.index()) {
            Some(Slot::Single(value)) => vec![Cow::Borrowed(value)],
            Some(Slot::List(list)) => list.iter().map(Cow::Borrowed).collect(),
            _ if field.is_repeated() => Vec::new(),
            _ => field.default_value().ok().flatten().map(Cow::Owned).into_iter().collect(),
        }
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.message_type == other.message_type
            && self
                .message_type
                .fields()
                .all(|field| self.effective_values(&field) == other.effective_values(&field))
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct(self.message_type.name());
        for (field, value) in self.assigned_fields() {
            match value {
                AssignedValue::Null => out.field(field.name(), &Option::<()>::None),
                AssignedValue::Single(value) => out.field(field.name(), value),
                AssignedValue::List(list) => out.field(field.name(), list),
            };
        }
        if !self.unrecognized.is_empty() {
            out.field("unrecognized", &self.unrecognized);
        }
        out.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumDefinition, FieldDefinition, MessageDefinition, Registry, RegistryBuilder};

    fn registry() -> Registry {
        RegistryBuilder::new()
            .enumeration(EnumDefinition::new("Color").value("RED", 20).value("GREEN", 1))
            .message(
                MessageDefinition::new("Simple")
                    .field(FieldDefinition::integer("count").default(10))
                    .field(FieldDefinition::string("label").required())
                    .field(FieldDefinition::string("tags").repeated().wire_name("t"))
                    .field(FieldDefinition::enumeration("color", "Color").default("RED"))
                    .field(FieldDefinition::message("child", "Simple")),
            )
            .build()
            .unwrap()
    }

    fn simple(registry: &Registry) -> MessageType {
        registry.get_message_by_name("Simple").unwrap()
    }

    #[test]
    fn test_defaults_are_not_assigned() {
        let registry = registry();
        let message = simple(&registry).new_message();
        assert_eq!(message.get("count").unwrap().as_deref(), Some(&Value::Int(10)));
        assert!(!message.has_value_assigned("count"));
        assert!(matches!(
            message.get_assigned_value("count"),
            Err(Error::NotAssigned(_))
        ));

        let color = message.get("color").unwrap().unwrap();
        assert_eq!(color.as_enum().unwrap().name(), "RED");
    }

    #[test]
    fn test_assigning_null_counts_as_assigned() {
        let registry = registry();
        let mut message = simple(&registry).new_message();
        message.set("count", FieldValue::Null).unwrap();
        assert!(message.has_value_assigned("count"));
        assert_eq!(message.get_assigned_value("count").unwrap(), AssignedValue::Null);
        assert_eq!(message.get("count").unwrap().as_deref(), Some(&Value::Int(10)));

        message.set("tags", FieldValue::Null).unwrap();
        assert!(message.has_value_assigned("t"));
        assert!(message.get_list("tags").unwrap().is_empty());
    }

    #[test]
    fn test_validation_does_not_coerce() {
        let registry = registry();
        let mut message = simple(&registry).new_message();
        assert!(matches!(message.set("count", "10"), Err(Error::Validation(_))));
        assert!(matches!(message.set("count", 1.0), Err(Error::Validation(_))));
        assert!(matches!(message.set("tags", "a"), Err(Error::Validation(_))));
        assert!(matches!(message.set("label", vec!["a"]), Err(Error::Validation(_))));
        assert!(!message.has_value_assigned("count"));
    }

    #[test]
    fn test_wire_names_and_attributes() {
        let registry = registry();
        let mut message = simple(&registry).new_message();
        message.set("tags", vec!["a", "b"]).unwrap();
        assert!(message.has_value_assigned("t"));
        assert!(!message.has_value_assigned("tags"));
        assert!(message.field_by_name("tags").is_err());
        assert_eq!(message.field_by_name("t").unwrap().attribute(), "tags");
        assert!(matches!(
            message.set("nope", 1),
            Err(Error::UnknownField { .. })
        ));
    }

    #[test]
    fn test_list_mut_marks_assigned_and_validates() {
        let registry = registry();
        let mut message = simple(&registry).new_message();
        let list = message.list_mut("tags").unwrap();
        list.push("x").unwrap();
        assert!(list.push(3).is_err());
        assert_eq!(message.get_list("t").unwrap().len(), 1);
        assert!(matches!(message.list_mut("count"), Err(Error::NotRepeated(_))));
    }

    #[test]
    fn test_check_initialized_recurses() {
        let registry = registry();
        let mut message = simple(&registry).new_message();
        assert!(!message.is_initialized());
        message.set("label", "top").unwrap();
        assert!(message.is_initialized());

        message.message_mut("child").unwrap();
        assert!(!message.is_initialized());
        message.message_mut("child").unwrap().set("label", "inner").unwrap();
        message.check_initialized().unwrap();
    }

    #[test]
    fn test_equality_ignores_unrecognized_fields() {
        let registry = registry();
        let mut a = simple(&registry).new_message();
        let mut b = simple(&registry).new_message();
        a.set("count", 12).unwrap();
        assert_ne!(a, b);
        b.set("count", 12).unwrap();
        b.set_unrecognized_field("extra", Tree::Int(1), Variant::Int64);
        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_compares_effective_values() {
        let registry = registry();
        let unset = simple(&registry).new_message();

        let mut null = simple(&registry).new_message();
        null.set("label", FieldValue::Null).unwrap();
        assert_eq!(null, unset);

        // count defaults to 10
        let mut defaulted = simple(&registry).new_message();
        defaulted.set("count", FieldValue::Null).unwrap();
        assert_eq!(defaulted, unset);
        defaulted.set("count", 10).unwrap();
        assert_eq!(defaulted, unset);

        let mut empty = simple(&registry).new_message();
        empty.set("tags", Vec::<Value>::new()).unwrap();
        assert_eq!(empty, unset);

        empty.list_mut("tags").unwrap().push("x").unwrap();
        assert_ne!(empty, unset);

        let mut overridden = simple(&registry).new_message();
        overridden.set("count", 11).unwrap();
        assert_ne!(overridden, unset);
    }

    #[test]
    fn test_unrecognized_ledger() {
        let registry = registry();
        let mut message = simple(&registry).new_message();
        message.set_unrecognized_field("b", Tree::from("x"), Variant::String);
        message.set_unrecognized_field(7, Tree::Int(1), Variant::Int64);
        message.set_unrecognized_field("b", Tree::from("y"), Variant::String);

        let keys: Vec<_> = message.all_unrecognized_fields().cloned().collect();
        assert_eq!(keys, [UnrecognizedKey::from("b"), UnrecognizedKey::Numbered(7)]);
        assert_eq!(
            message.get_unrecognized_field_info("b"),
            Some((&Tree::from("y"), Variant::String))
        );
        assert_eq!(
            message.get_unrecognized_field_info_or("c", Tree::Null, None),
            (Tree::Null, None)
        );

        message.strip_unrecognized_fields();
        assert_eq!(message.all_unrecognized_fields().len(), 0);
    }

    #[test]
    fn test_unset_restores_default() {
        let registry = registry();
        let mut message = simple(&registry).new_message();
        message.set("count", 3).unwrap();
        message.unset("count").unwrap();
        assert!(!message.has_value_assigned("count"));
        assert_eq!(message.get("count").unwrap().as_deref(), Some(&Value::Int(10)));
    }

    #[test]
    fn test_constructor_rejects_unknown_keys() {
        let registry = registry();
        let simple = simple(&registry);
        let message = simple
            .new_message_with([("label", FieldValue::from("x")), ("count", FieldValue::from(2))])
            .unwrap();
        assert_eq!(message.get("count").unwrap().as_deref(), Some(&Value::Int(2)));

        let err = simple.new_message_with([("bogus", 1)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Message type 'Simple' has no field named 'bogus'"
        );
    }

    #[test]
    fn test_copies_are_independent() {
        let registry = registry();
        let mut original = simple(&registry).new_message();
        original.set("tags", vec!["a"]).unwrap();
        let copy = original.clone();
        original.list_mut("tags").unwrap().push("b").unwrap();
        assert_eq!(copy.get_list("tags").unwrap().len(), 1);
        assert_eq!(original.get_list("tags").unwrap().len(), 2);
    }
}
