//! # Enumerated types
//!
//! An [`EnumType`] is a closed, ordered table of named integer members. Members are
//! handed out as [`EnumValue`] handles; two handles are equal only when they denote the
//! same member of the same enum definition.
use super::registry::{MessageType, Registry, RegistryBuilder};
use crate::error::{DefinitionError, EnumError};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Member numbers must stay below this bound.
pub const MAX_ENUM_NUMBER: i64 = (1 << 29) - 1;

/// Declaration of an enum, consumed by [`RegistryBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDefinition {
    pub(crate) name: String,
    pub(crate) values: Vec<(String, i64)>,
}

impl EnumDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    pub fn value(mut self, name: impl Into<String>, number: i64) -> Self {
        self.values.push((name.into(), number));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug)]
pub(crate) struct EnumInner {
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) package: String,
    pub(crate) parent: Option<usize>,
    pub(crate) values: Vec<(String, i32)>,
    pub(crate) by_name: HashMap<String, usize>,
    pub(crate) by_number: HashMap<i32, usize>,
}

impl EnumInner {
    pub(crate) fn build(
        definition: EnumDefinition,
        full_name: String,
        package: String,
        parent: Option<usize>,
    ) -> Result<Self, DefinitionError> {
        let mut values = Vec::with_capacity(definition.values.len());
        let mut by_name = HashMap::new();
        let mut by_number = HashMap::new();

        for (index, (name, number)) in definition.values.into_iter().enumerate() {
            if !super::is_identifier(&name) {
                return Err(DefinitionError::InvalidName(name));
            }
            if !(0..=MAX_ENUM_NUMBER).contains(&number) {
                return Err(DefinitionError::EnumNumberOutOfRange {
                    enumeration: full_name,
                    name,
                    number,
                });
            }
            let number = number as i32;
            if by_name.insert(name.clone(), index).is_some() {
                return Err(DefinitionError::DuplicateEnumName {
                    enumeration: full_name,
                    name,
                });
            }
            if by_number.insert(number, index).is_some() {
                return Err(DefinitionError::DuplicateEnumNumber {
                    enumeration: full_name,
                    number: number as i64,
                });
            }
            values.push((name, number));
        }

        let name = full_name
            .rsplit_once('.')
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| full_name.clone());

        Ok(Self {
            name,
            full_name,
            package,
            parent,
            values,
            by_name,
            by_number,
        })
    }
}

/// A handle to an enum definition inside a [`Registry`].
#[derive(Clone)]
pub struct EnumType {
    registry: Registry,
    index: usize,
}

/// The accepted inputs when converting something into a member of an enum.
#[derive(Debug, Clone, Copy)]
pub enum EnumLookup<'a> {
    Name(&'a str),
    Number(i64),
    Member(&'a EnumValue),
}

impl<'a> From<&'a str> for EnumLookup<'a> {
    fn from(value: &'a str) -> Self {
        EnumLookup::Name(value)
    }
}

impl From<i64> for EnumLookup<'_> {
    fn from(value: i64) -> Self {
        EnumLookup::Number(value)
    }
}

impl From<i32> for EnumLookup<'_> {
    fn from(value: i32) -> Self {
        EnumLookup::Number(value as i64)
    }
}

impl<'a> From<&'a EnumValue> for EnumLookup<'a> {
    fn from(value: &'a EnumValue) -> Self {
        EnumLookup::Member(value)
    }
}

impl EnumType {
    pub(crate) fn new(registry: Registry, index: usize) -> Self {
        Self { registry, index }
    }

    /// Defines a standalone enum from a name-to-number table.
    ///
    /// The name may carry a dotted package prefix, as with top-level definitions
    /// handed to a [`RegistryBuilder`].
    pub fn from_table(name: &str, table: &[(&str, i64)]) -> Result<EnumType, DefinitionError> {
        let definition = table
            .iter()
            .fold(EnumDefinition::new(name), |def, (value_name, number)| {
                def.value(*value_name, *number)
            });

        let registry = RegistryBuilder::new().enumeration(definition).build()?;
        registry
            .get_enum_by_name(name)
            .ok_or_else(|| DefinitionError::InvalidName(name.to_string()))
    }

    fn inner(&self) -> &EnumInner {
        &self.registry.inner().enums[self.index]
    }

    pub(crate) fn index(&self) -> usize {
        self.index
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

    /// The record type this enum is nested in, if any.
    pub fn enclosing_type(&self) -> Option<MessageType> {
        self.inner()
            .parent
            .map(|parent| MessageType::new(self.registry.clone(), parent))
    }

    /// Members in declaration order.
    pub fn values(&self) -> impl ExactSizeIterator<Item = EnumValue> + '_ {
        (0..self.inner().values.len()).map(move |index| EnumValue {
            enum_type: self.clone(),
            index,
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner().values.iter().map(|(name, _)| name.as_str())
    }

    pub fn numbers(&self) -> impl Iterator<Item = i32> + '_ {
        self.inner().values.iter().map(|(_, number)| *number)
    }

    pub fn len(&self) -> usize {
        self.inner().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner().values.is_empty()
    }

    pub fn by_name(&self, name: &str) -> Result<EnumValue, EnumError> {
        self.inner()
            .by_name
            .get(name)
            .map(|&index| EnumValue {
                enum_type: self.clone(),
                index,
            })
            .ok_or_else(|| EnumError::NameNotFound {
                enumeration: self.full_name().to_string(),
                name: name.to_string(),
            })
    }

    pub fn by_number(&self, number: i64) -> Result<EnumValue, EnumError> {
        i32::try_from(number)
            .ok()
            .and_then(|n| self.inner().by_number.get(&n))
            .map(|&index| EnumValue {
                enum_type: self.clone(),
                index,
            })
            .ok_or_else(|| EnumError::NumberNotFound {
                enumeration: self.full_name().to_string(),
                number,
            })
    }

    /// Converts a name, a number or a member into a member of this enum.
    ///
    /// Unlike [`EnumType::by_name`] and [`EnumType::by_number`], a name or number with no
    /// member is a conversion failure ([`EnumError::NoSuchValue`]), not a missing key. A
    /// member of another enum is a mismatch even when its name and number exist here.
    pub fn lookup<'a>(&self, input: impl Into<EnumLookup<'a>>) -> Result<EnumValue, EnumError> {
        let no_such_value = |value: String| EnumError::NoSuchValue {
            enumeration: self.full_name().to_string(),
            value,
        };

        match input.into() {
            EnumLookup::Name(name) => self.by_name(name).map_err(|_| no_such_value(format!("'{name}'"))),
            EnumLookup::Number(number) => self.by_number(number).map_err(|_| no_such_value(number.to_string())),
            EnumLookup::Member(member) if member.enum_type() == self => Ok(member.clone()),
            EnumLookup::Member(member) => Err(EnumError::Mismatch {
                expected: self.full_name().to_string(),
                found: member.enum_type().full_name().to_string(),
            }),
        }
    }
}

impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.registry.ptr_eq(&other.registry)
    }
}

impl Eq for EnumType {}

impl Hash for EnumType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(self.registry.arc()) as usize).hash(state);
        self.index.hash(state);
    }
}

impl fmt::Debug for EnumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumType")
            .field("full_name", &self.full_name())
            .field("values", &self.inner().values)
            .finish()
    }
}

/// A member of an [`EnumType`].
#[derive(Clone)]
pub struct EnumValue {
    enum_type: EnumType,
    index: usize,
}

impl EnumValue {
    pub fn name(&self) -> &str {
        &self.enum_type.inner().values[self.index].0
    }

    pub fn number(&self) -> i32 {
        self.enum_type.inner().values[self.index].1
    }

    pub fn enum_type(&self) -> &EnumType {
        &self.enum_type
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.enum_type == other.enum_type
    }
}

impl Eq for EnumValue {}

impl Hash for EnumValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.enum_type.hash(state);
        self.index.hash(state);
    }
}

impl Ord for EnumValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number()
            .cmp(&other.number())
            .then_with(|| self.enum_type.full_name().cmp(other.enum_type.full_name()))
            .then_with(|| {
                let lhs = Arc::as_ptr(self.enum_type.registry.arc()) as usize;
                let rhs = Arc::as_ptr(other.enum_type.registry.arc()) as usize;
                lhs.cmp(&rhs)
            })
            .then_with(|| self.enum_type.index.cmp(&other.enum_type.index))
    }
}

impl PartialOrd for EnumValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({})",
            self.enum_type.name(),
            self.name(),
            self.number()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color() -> EnumType {
        EnumType::from_table("paint.Color", &[("RED", 20), ("ORANGE", 2), ("YELLOW", 40)])
            .unwrap()
    }

    #[test]
    fn test_lookup_by_name_and_number() {
        let color = color();
        let red = color.by_name("RED").unwrap();
        assert_eq!(red.number(), 20);
        assert_eq!(color.by_number(20).unwrap(), red);
        assert_eq!(color.lookup("RED").unwrap(), red);
        assert_eq!(color.lookup(20).unwrap(), red);
        assert_eq!(color.lookup(&red).unwrap(), red);
    }

    #[test]
    fn test_missing_members() {
        let color = color();
        assert!(matches!(
            color.by_name("PURPLE"),
            Err(EnumError::NameNotFound { .. })
        ));
        assert!(matches!(
            color.by_number(3),
            Err(EnumError::NumberNotFound { number: 3, .. })
        ));
    }

    #[test]
    fn test_conversion_failures_differ_from_missing_keys() {
        let color = color();

        let by_number = color.by_number(100).unwrap_err();
        let converted = color.lookup(100).unwrap_err();
        assert!(matches!(by_number, EnumError::NumberNotFound { number: 100, .. }));
        assert!(matches!(converted, EnumError::NoSuchValue { .. }));
        assert_ne!(by_number, converted);

        assert!(matches!(color.by_name("PURPLE"), Err(EnumError::NameNotFound { .. })));
        assert_eq!(
            color.lookup("PURPLE").unwrap_err().to_string(),
            "No such value 'PURPLE' for enum 'paint.Color'"
        );
    }

    #[test]
    fn test_member_of_other_enum_is_a_mismatch() {
        let color = color();
        let other = EnumType::from_table("paint.Color", &[("RED", 20)]).unwrap();
        let other_red = other.by_name("RED").unwrap();
        assert_ne!(other_red, color.by_name("RED").unwrap());
        assert!(matches!(
            color.lookup(&other_red),
            Err(EnumError::Mismatch { .. })
        ));
    }

    #[test]
    fn test_values_keep_declaration_order_and_sort_by_number() {
        let color = color();
        let names: Vec<_> = color.names().collect();
        assert_eq!(names, ["RED", "ORANGE", "YELLOW"]);

        let mut sorted: Vec<_> = color.values().collect();
        sorted.sort();
        let sorted_names: Vec<_> = sorted.iter().map(EnumValue::name).collect();
        assert_eq!(sorted_names, ["ORANGE", "RED", "YELLOW"]);
    }

    #[test]
    fn test_naming() {
        let color = color();
        assert_eq!(color.name(), "Color");
        assert_eq!(color.full_name(), "paint.Color");
        assert_eq!(color.package_name(), "paint");
        assert!(color.enclosing_type().is_none());
        assert_eq!(format!("{}", color.by_number(2).unwrap()), "ORANGE");
    }

    #[test]
    fn test_invalid_tables() {
        assert!(matches!(
            EnumType::from_table("E", &[("A", 1), ("A", 2)]),
            Err(DefinitionError::DuplicateEnumName { .. })
        ));
        assert!(matches!(
            EnumType::from_table("E", &[("A", 1), ("B", 1)]),
            Err(DefinitionError::DuplicateEnumNumber { number: 1, .. })
        ));
        assert!(matches!(
            EnumType::from_table("E", &[("A", -1)]),
            Err(DefinitionError::EnumNumberOutOfRange { .. })
        ));
        assert!(matches!(
            EnumType::from_table("E", &[("A", 1 << 29)]),
            Err(DefinitionError::EnumNumberOutOfRange { .. })
        ));
        assert!(EnumType::from_table("E", &[("A", MAX_ENUM_NUMBER)]).is_ok());
    }
}
