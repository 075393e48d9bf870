//! # Registry
//!
//! A [`Registry`] is an immutable pool of record and enum definitions, produced by a
//! [`RegistryBuilder`] after the definition-time checks pass. Everything handed out by
//! the registry ([`MessageType`], [`EnumType`], [`FieldDescriptor`]) is a cheap handle
//! that keeps the pool alive.
//!
//! ## Naming
//!
//! Top-level definitions are named with their package, as in `zoo.Animal`. Nested
//! definitions take a simple name and live under their parent (`zoo.Animal.Size`).
//!
//! ## Resolution
//!
//! Message and enum fields may point to their target by name. Names starting with a dot
//! are absolute; any other name is searched for in the scope of the declaring record,
//! then in each enclosing scope up to the root.
use super::enums::{EnumDefinition, EnumInner, EnumType};
use super::field::{FieldDefinition, FieldDescriptor, FieldInner};
use crate::error::{DefinitionError, Error, Result};
use crate::message::{FieldValue, Message};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DefinitionIndex {
    Message(usize),
    Enum(usize),
}

pub(crate) struct RegistryInner {
    pub(crate) messages: Vec<MessageInner>,
    pub(crate) enums: Vec<EnumInner>,
    names: HashMap<String, DefinitionIndex>,
}

#[derive(Debug)]
pub(crate) struct MessageInner {
    name: String,
    full_name: String,
    package: String,
    parent: Option<usize>,
    pub(crate) fields: Vec<FieldInner>,
    by_wire_name: HashMap<String, usize>,
    by_attribute: HashMap<String, usize>,
    nested_messages: Vec<usize>,
    nested_enums: Vec<usize>,
}

/// An immutable, shareable pool of definitions.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

/// A resolved definition: either a record type or an enum.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Message(MessageType),
    Enum(EnumType),
}

impl Definition {
    pub(crate) fn from_index(registry: Registry, index: DefinitionIndex) -> Self {
        match index {
            DefinitionIndex::Message(i) => Definition::Message(MessageType::new(registry, i)),
            DefinitionIndex::Enum(i) => Definition::Enum(EnumType::new(registry, i)),
        }
    }

    pub(crate) fn index(&self) -> DefinitionIndex {
        match self {
            Definition::Message(message) => DefinitionIndex::Message(message.index),
            Definition::Enum(enumeration) => DefinitionIndex::Enum(enumeration.index()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Definition::Message(message) => message.name(),
            Definition::Enum(enumeration) => enumeration.name(),
        }
    }

    pub fn full_name(&self) -> &str {
        match self {
            Definition::Message(message) => message.full_name(),
            Definition::Enum(enumeration) => enumeration.full_name(),
        }
    }

    pub fn package_name(&self) -> &str {
        match self {
            Definition::Message(message) => message.package_name(),
            Definition::Enum(enumeration) => enumeration.package_name(),
        }
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub(crate) fn inner(&self) -> &RegistryInner {
        &self.inner
    }

    pub(crate) fn arc(&self) -> &Arc<RegistryInner> {
        &self.inner
    }

    pub(crate) fn ptr_eq(&self, other: &Registry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Looks up a definition by its exact full name.
    pub fn get_definition(&self, full_name: &str) -> Option<Definition> {
        let full_name = full_name.strip_prefix('.').unwrap_or(full_name);
        self.inner
            .names
            .get(full_name)
            .map(|index| Definition::from_index(self.clone(), *index))
    }

    pub fn get_message_by_name(&self, full_name: &str) -> Option<MessageType> {
        match self.get_definition(full_name) {
            Some(Definition::Message(message)) => Some(message),
            _ => None,
        }
    }

    pub fn get_enum_by_name(&self, full_name: &str) -> Option<EnumType> {
        match self.get_definition(full_name) {
            Some(Definition::Enum(enumeration)) => Some(enumeration),
            _ => None,
        }
    }

    /// Finds a definition by name, searching outwards from `relative_to`.
    ///
    /// For a name `Child` relative to `a.b.Parent`, the candidates are `a.b.Parent.Child`,
    /// `a.b.Child`, `a.Child` and `Child`, in that order. A leading dot makes the name
    /// absolute and skips the search.
    pub fn find_definition(&self, name: &str, relative_to: Option<&str>) -> Result<Definition> {
        if name.starts_with('.') {
            return self
                .get_definition(name)
                .ok_or_else(|| Error::DefinitionNotFound(name.to_string()));
        }

        let mut scope = relative_to.unwrap_or_default();
        loop {
            let candidate = if scope.is_empty() {
                name.to_string()
            } else {
                format!("{scope}.{name}")
            };
            if let Some(definition) = self.get_definition(&candidate) {
                return Ok(definition);
            }
            if scope.is_empty() {
                return Err(Error::DefinitionNotFound(name.to_string()));
            }
            scope = scope.rsplit_once('.').map(|(parent, _)| parent).unwrap_or_default();
        }
    }

    /// All record types, in definition order.
    pub fn all_messages(&self) -> impl ExactSizeIterator<Item = MessageType> + '_ {
        (0..self.inner.messages.len()).map(move |index| MessageType::new(self.clone(), index))
    }

    /// All enums, in definition order.
    pub fn all_enums(&self) -> impl ExactSizeIterator<Item = EnumType> + '_ {
        (0..self.inner.enums.len()).map(move |index| EnumType::new(self.clone(), index))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.inner.names.keys().collect();
        names.sort();
        f.debug_struct("Registry").field("definitions", &names).finish()
    }
}

/// A handle to a record type.
#[derive(Clone)]
pub struct MessageType {
    registry: Registry,
    index: usize,
}

impl MessageType {
    pub(crate) fn new(registry: Registry, index: usize) -> Self {
        Self { registry, index }
    }

    pub(crate) fn inner(&self) -> &MessageInner {
        &self.registry.inner.messages[self.index]
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn name(&self) -> &str {
        &self.inner().name
    }

    pub fn full_name(&self) -> &str {
        &self.inner().full_name
    }

    pub fn package_name(&self) -> &str {
        &self.inner().package
    }

    /// The record type this one is nested in, if any.
    pub fn enclosing_type(&self) -> Option<MessageType> {
        self.inner()
            .parent
            .map(|parent| MessageType::new(self.registry.clone(), parent))
    }

    /// Nested record types, sorted by name.
    pub fn nested_messages(&self) -> Vec<MessageType> {
        self.inner()
            .nested_messages
            .iter()
            .map(|&index| MessageType::new(self.registry.clone(), index))
            .collect()
    }

    /// Nested enums, sorted by name.
    pub fn nested_enums(&self) -> Vec<EnumType> {
        self.inner()
            .nested_enums
            .iter()
            .map(|&index| EnumType::new(self.registry.clone(), index))
            .collect()
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = FieldDescriptor> + '_ {
        (0..self.inner().fields.len()).map(move |index| FieldDescriptor::new(self.clone(), index))
    }

    /// Looks a field up by its wire name.
    pub fn get_field_by_name(&self, name: &str) -> Option<FieldDescriptor> {
        self.inner()
            .by_wire_name
            .get(name)
            .map(|&index| FieldDescriptor::new(self.clone(), index))
    }

    /// Looks a field up by its attribute name.
    pub fn get_field_by_attribute(&self, attribute: &str) -> Option<FieldDescriptor> {
        self.inner()
            .by_attribute
            .get(attribute)
            .map(|&index| FieldDescriptor::new(self.clone(), index))
    }

    /// Looks a field up by attribute name first, then by wire name.
    pub fn find_field(&self, name: &str) -> Option<FieldDescriptor> {
        self.get_field_by_attribute(name)
            .or_else(|| self.get_field_by_name(name))
    }

    /// Resolves a name the way fields declared in this record resolve their targets.
    pub fn find_definition(&self, name: &str) -> Result<Definition> {
        self.registry.find_definition(name, Some(self.full_name()))
    }

    /// A fresh instance with nothing assigned.
    pub fn new_message(&self) -> Message {
        Message::new(self)
    }

    /// A fresh instance with the given fields assigned, keyed by attribute or wire name.
    pub fn new_message_with<'a, I, V>(&self, fields: I) -> Result<Message>
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Into<FieldValue>,
    {
        let mut message = self.new_message();
        for (name, value) in fields {
            message.set(name, value)?;
        }
        Ok(message)
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.registry.ptr_eq(&other.registry)
    }
}

impl Eq for MessageType {}

impl Hash for MessageType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.registry.inner) as usize).hash(state);
        self.index.hash(state);
    }
}

impl fmt::Debug for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageType").field(&self.full_name()).finish()
    }
}

/// Declaration of a record type, consumed by [`RegistryBuilder`].
#[derive(Debug, Clone)]
pub struct MessageDefinition {
    name: String,
    fields: Vec<FieldDefinition>,
    messages: Vec<MessageDefinition>,
    enums: Vec<EnumDefinition>,
}

impl MessageDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            messages: Vec::new(),
            enums: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a nested record type.
    pub fn message(mut self, message: MessageDefinition) -> Self {
        self.messages.push(message);
        self
    }

    /// Adds a nested enum.
    pub fn enumeration(mut self, enumeration: EnumDefinition) -> Self {
        self.enums.push(enumeration);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Collects definitions and turns them into a [`Registry`].
///
/// ```
/// use tracts_core::schema::{FieldDefinition, MessageDefinition, RegistryBuilder};
///
/// let registry = RegistryBuilder::new()
///     .message(
///         MessageDefinition::new("zoo.Animal")
///             .field(FieldDefinition::string("name").required())
///             .field(FieldDefinition::message("friends", "Animal").repeated()),
///     )
///     .build()
///     .unwrap();
///
/// let animal = registry.get_message_by_name("zoo.Animal").unwrap();
/// assert_eq!(animal.fields().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    messages: Vec<MessageDefinition>,
    enums: Vec<EnumDefinition>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: MessageDefinition) -> Self {
        self.messages.push(message);
        self
    }

    pub fn enumeration(mut self, enumeration: EnumDefinition) -> Self {
        self.enums.push(enumeration);
        self
    }

    pub fn add_message(&mut self, message: MessageDefinition) -> &mut Self {
        self.messages.push(message);
        self
    }

    pub fn add_enumeration(&mut self, enumeration: EnumDefinition) -> &mut Self {
        self.enums.push(enumeration);
        self
    }

    /// Runs the definition-time checks and produces the registry.
    pub fn build(self) -> Result<Registry, DefinitionError> {
        let mut state = BuildState::default();

        for enumeration in self.enums {
            let (package, full_name) = split_top_level(&enumeration.name)?;
            state.add_enum(enumeration, full_name, package, None)?;
        }
        for message in self.messages {
            let (package, full_name) = split_top_level(&message.name)?;
            state.add_message(message, full_name, package, None)?;
        }

        let registry = Registry {
            inner: Arc::new(RegistryInner {
                messages: state.messages,
                enums: state.enums,
                names: state.names,
            }),
        };

        for message in registry.all_messages() {
            for field in message.fields() {
                field
                    .check_resolvable_default()
                    .map_err(|source| DefinitionError::Field {
                        message: message.full_name().to_string(),
                        field: field.name().to_string(),
                        source,
                    })?;
            }
        }

        Ok(registry)
    }
}

#[derive(Default)]
struct BuildState {
    messages: Vec<MessageInner>,
    enums: Vec<EnumInner>,
    names: HashMap<String, DefinitionIndex>,
}

impl BuildState {
    fn register(&mut self, full_name: &str, index: DefinitionIndex) -> Result<(), DefinitionError> {
        if self.names.insert(full_name.to_string(), index).is_some() {
            return Err(DefinitionError::DuplicateDefinition(full_name.to_string()));
        }
        Ok(())
    }

    fn add_enum(
        &mut self,
        definition: EnumDefinition,
        full_name: String,
        package: String,
        parent: Option<usize>,
    ) -> Result<usize, DefinitionError> {
        let index = self.enums.len();
        self.register(&full_name, DefinitionIndex::Enum(index))?;
        let inner = EnumInner::build(definition, full_name, package, parent)?;
        self.enums.push(inner);
        Ok(index)
    }

    fn add_message(
        &mut self,
        definition: MessageDefinition,
        full_name: String,
        package: String,
        parent: Option<usize>,
    ) -> Result<usize, DefinitionError> {
        let index = self.messages.len();
        self.register(&full_name, DefinitionIndex::Message(index))?;
        self.messages.push(MessageInner {
            name: simple_name(&full_name).to_string(),
            full_name: full_name.clone(),
            package: package.clone(),
            parent,
            fields: Vec::new(),
            by_wire_name: HashMap::new(),
            by_attribute: HashMap::new(),
            nested_messages: Vec::new(),
            nested_enums: Vec::new(),
        });

        let mut fields = Vec::with_capacity(definition.fields.len());
        let mut by_wire_name = HashMap::new();
        let mut by_attribute = HashMap::new();
        for (position, field) in definition.fields.into_iter().enumerate() {
            field.validate().map_err(|source| DefinitionError::Field {
                message: full_name.clone(),
                field: field.name().to_string(),
                source,
            })?;
            let duplicate = |field: &str| DefinitionError::DuplicateField {
                message: full_name.clone(),
                field: field.to_string(),
            };
            if by_attribute.insert(field.attribute().to_string(), position).is_some() {
                return Err(duplicate(field.attribute()));
            }
            if by_wire_name.insert(field.name().to_string(), position).is_some() {
                return Err(duplicate(field.name()));
            }
            fields.push(field.into_inner());
        }

        let mut nested_names = Vec::new();
        let mut nested_enums = Vec::new();
        for enumeration in definition.enums {
            check_simple_name(&enumeration.name)?;
            nested_names.push(enumeration.name.clone());
            let child_name = format!("{full_name}.{}", enumeration.name);
            let child = self.add_enum(enumeration, child_name, package.clone(), Some(index))?;
            nested_enums.push(child);
        }
        let mut nested_messages = Vec::new();
        for message in definition.messages {
            check_simple_name(&message.name)?;
            nested_names.push(message.name.clone());
            let child_name = format!("{full_name}.{}", message.name);
            let child = self.add_message(message, child_name, package.clone(), Some(index))?;
            nested_messages.push(child);
        }

        if let Some(clash) = nested_names.iter().find(|name| by_attribute.contains_key(*name)) {
            return Err(DefinitionError::NameClash {
                message: full_name,
                field: clash.clone(),
            });
        }

        nested_enums.sort_by(|a, b| self.enums[*a].name.cmp(&self.enums[*b].name));
        nested_messages.sort_by(|a, b| self.messages[*a].name.cmp(&self.messages[*b].name));

        let inner = &mut self.messages[index];
        inner.fields = fields;
        inner.by_wire_name = by_wire_name;
        inner.by_attribute = by_attribute;
        inner.nested_messages = nested_messages;
        inner.nested_enums = nested_enums;
        Ok(index)
    }
}

fn simple_name(full_name: &str) -> &str {
    full_name.rsplit_once('.').map(|(_, name)| name).unwrap_or(full_name)
}

fn check_simple_name(name: &str) -> Result<(), DefinitionError> {
    if super::is_identifier(name) {
        Ok(())
    } else {
        Err(DefinitionError::InvalidName(name.to_string()))
    }
}

/// Splits `pkg.sub.Name` into its package and its full name, validating every segment.
fn split_top_level(name: &str) -> Result<(String, String), DefinitionError> {
    if name.is_empty() || !name.split('.').all(super::is_identifier) {
        return Err(DefinitionError::InvalidName(name.to_string()));
    }
    let package = name.rsplit_once('.').map(|(package, _)| package).unwrap_or_default();
    Ok((package.to_string(), name.to_string()))
}
