use super::{Message, Value};
use crate::error::{Error, Result};
use crate::schema::FieldDescriptor;
use std::fmt;
use std::ops::{Bound, Deref, RangeBounds};

/// The list held by a repeated field.
///
/// Every mutation validates the incoming elements against the owning field first and
/// leaves the list untouched when any of them is rejected. Read access goes through
/// `Deref<Target = [Value]>`.
#[derive(Clone)]
pub struct FieldList {
    field: FieldDescriptor,
    items: Vec<Value>,
}

impl FieldList {
    pub(crate) fn new(field: FieldDescriptor) -> Self {
        Self {
            field,
            items: Vec::new(),
        }
    }

    pub(crate) fn from_validated(field: FieldDescriptor, items: Vec<Value>) -> Self {
        Self { field, items }
    }

    /// Builds a list for a repeated field, validating every value.
    pub fn with_values(field: FieldDescriptor, values: Vec<Value>) -> Result<Self> {
        if !field.is_repeated() {
            return Err(Error::NotRepeated(field.name().to_string()));
        }
        for value in &values {
            field.validate_element(value)?;
        }
        Ok(Self::from_validated(field, values))
    }

    pub fn field(&self) -> &FieldDescriptor {
        &self.field
    }

    pub fn push(&mut self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.field.validate_element(&value)?;
        self.items.push(value);
        Ok(())
    }

    /// Inserts at `index`, clamped to the end of the list.
    pub fn insert(&mut self, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.field.validate_element(&value)?;
        self.items.insert(index.min(self.items.len()), value);
        Ok(())
    }

    pub fn extend<I, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = self.validated(values)?;
        self.items.extend(values);
        Ok(())
    }

    /// Replaces the element at `index`.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.field.validate_element(&value)?;
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or_else(|| Error::InvalidInput(format!("index {index} out of range for list of {len}")))?;
        *slot = value;
        Ok(())
    }

    /// Replaces `range` with `values`, returning the removed elements.
    pub fn splice<R, I, V>(&mut self, range: R, values: I) -> Result<Vec<Value>>
    where
        R: RangeBounds<usize>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let len = self.items.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e + 1,
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        };
        if start > end || end > len {
            return Err(Error::InvalidInput(format!(
                "range {start}..{end} out of range for list of {len}"
            )));
        }

        let values = self.validated(values)?;
        Ok(self.items.splice(start..end, values).collect())
    }

    pub fn remove(&mut self, index: usize) -> Option<Value> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.items.pop()
    }

    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Mutable access to a message element, for filling nested records in place.
    pub fn message_at_mut(&mut self, index: usize) -> Option<&mut Message> {
        self.items.get_mut(index).and_then(Value::as_message_mut)
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.items
    }

    fn validated<I, V>(&self, values: I) -> Result<Vec<Value>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        values
            .into_iter()
            .map(|value| {
                let value = value.into();
                self.field.validate_element(&value).map(|_| value)
            })
            .collect()
    }
}

impl Deref for FieldList {
    type Target = [Value];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl<'a> IntoIterator for &'a FieldList {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl PartialEq for FieldList {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl PartialEq<[Value]> for FieldList {
    fn eq(&self, other: &[Value]) -> bool {
        self.items == other
    }
}

impl PartialEq<Vec<Value>> for FieldList {
    fn eq(&self, other: &Vec<Value>) -> bool {
        &self.items == other
    }
}

impl fmt::Debug for FieldList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}
