//! # Query-string codec
//!
//! Messages as flat `key=value` pairs. A key is a dotted path of wire names, where a
//! segment may carry a `-<index>` suffix addressing one element of a repeated field:
//!
//! ```text
//! animals-0.name=dog&animals-0.size=12&animals-1.name=cat&number=2
//! ```
//!
//! Repeated scalar fields may also leave the index out and repeat the key
//! (`tag=a&tag=b`). An assigned message without assigned fields is written as the bare
//! key with an empty value.
use super::MessageCodec;
use crate::error::{DecodeError, Error, Result};
use crate::message::{AssignedValue, FieldValue, Message, UnrecognizedKey, Value};
use crate::schema::{FieldDescriptor, FieldKind, MessageType};
use crate::timestamp::Timestamp;
use crate::tree::Tree;
use crate::variant::Variant;
use base64::{Engine, engine::general_purpose::STANDARD};
use std::collections::BTreeMap;
use std::fmt;
use url::{Url, form_urlencoded};
use uuid::Uuid;

/// One resolved segment of a query key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    /// Wire name of the addressed field.
    pub name: String,
    pub index: Option<usize>,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}-{index}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Splits `name-<digits>` into its name and index.
fn split_index(segment: &str) -> Option<(&str, usize)> {
    let (name, digits) = segment.rsplit_once('-')?;
    if name.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|index| (name, index))
}

/// Incrementally fills a message from query parameters.
pub struct QueryBuilder {
    message: Message,
    prefix: String,
}

impl QueryBuilder {
    pub fn new(message_type: &MessageType, prefix: impl Into<String>) -> Self {
        Self {
            message: message_type.new_message(),
            prefix: prefix.into(),
        }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn into_message(self) -> Message {
        self.message
    }

    /// Resolves a query key against the message type.
    ///
    /// Returns `None` when the key lacks the prefix or does not address a field: an
    /// unknown name, an index on a non-repeated field, a missing index on a repeated field
    /// that has to be traversed, or a traversal through a non-message field.
    pub fn make_path(&self, key: &str) -> Result<Option<Vec<PathSegment>>> {
        let Some(remainder) = key.strip_prefix(self.prefix.as_str()) else {
            return Ok(None);
        };

        let segments: Vec<&str> = remainder.split('.').collect();
        let mut current = self.message.message_type().clone();
        let mut path = Vec::with_capacity(segments.len());

        for (position, segment) in segments.iter().enumerate() {
            let is_last = position + 1 == segments.len();

            let (field, index) = match current.get_field_by_name(segment) {
                Some(field) => (field, None),
                None => match split_index(segment)
                    .and_then(|(name, index)| current.get_field_by_name(name).map(|field| (field, Some(index))))
                {
                    Some(found) => found,
                    None => return Ok(None),
                },
            };

            let is_message = field.kind() == FieldKind::Message;
            match (field.is_repeated(), index) {
                (false, Some(_)) => return Ok(None),
                (true, None) if !is_last || is_message => return Ok(None),
                _ => {}
            }

            if !is_last {
                if !is_message {
                    return Ok(None);
                }
                current = field.message_type()?;
            }

            path.push(PathSegment {
                name: field.name().to_string(),
                index,
            });
        }
        Ok(Some(path))
    }

    /// Admits the values given for one key.
    ///
    /// Returns `false` when the key does not resolve, or when an index skips ahead of the
    /// end of its list. Intermediate messages and list elements are created on the way.
    /// A non-repeated field given zero or several values is a decode error.
    pub fn add_parameter(&mut self, key: &str, values: &[String]) -> Result<bool> {
        let Some(path) = self.make_path(key)? else {
            return Ok(false);
        };
        if !self.indices_reachable(&path)? {
            return Ok(false);
        }
        let Some((last, parents)) = path.split_last() else {
            return Ok(false);
        };

        let mut message = &mut self.message;
        for segment in parents {
            let field = message.field_by_name(&segment.name)?;
            message = match segment.index {
                None => message.message_mut(field.attribute())?,
                Some(index) => element_mut(message, &field, index)?,
            };
        }

        let field = message.field_by_name(&last.name)?;
        match (field.kind(), last.index) {
            (FieldKind::Message, None) => {
                message.message_mut(field.attribute())?;
            }
            (FieldKind::Message, Some(index)) => {
                element_mut(message, &field, index)?;
            }
            (_, None) if field.is_repeated() => {
                let values = values
                    .iter()
                    .map(|value| decode_text(&field, value))
                    .collect::<Result<Vec<_>>>()?;
                message.set_field(&field, FieldValue::List(values))?;
            }
            (_, index) => {
                let value = match values {
                    [value] => decode_text(&field, value)?,
                    [] => {
                        return Err(DecodeError::new(format!("Found no values for field {}.", field.name())).into());
                    }
                    _ => {
                        return Err(
                            DecodeError::new(format!("Found repeated values for field {}.", field.name())).into(),
                        );
                    }
                };
                match index {
                    None => message.set_field(&field, FieldValue::Single(value))?,
                    Some(index) => {
                        let list = message.list_mut(field.attribute())?;
                        if index == list.len() {
                            list.push(value)?;
                        } else {
                            list.set(index, value)?;
                        }
                    }
                }
            }
        }
        Ok(true)
    }

    /// Every index on the path either addresses an existing element or the position just
    /// past the end of its list.
    fn indices_reachable(&self, path: &[PathSegment]) -> Result<bool> {
        let mut current = Some(&self.message);
        for (position, segment) in path.iter().enumerate() {
            let Some(message) = current else {
                // Lists below a message that does not exist yet start out empty.
                return Ok(path[position..].iter().all(|s| s.index.unwrap_or(0) == 0));
            };
            let field = message.field_by_name(&segment.name)?;
            current = match (segment.index, message.assigned(&field)) {
                (Some(index), Some(AssignedValue::List(list))) => {
                    if index > list.len() {
                        return Ok(false);
                    }
                    list.get(index).and_then(Value::as_message)
                }
                (Some(index), _) => {
                    if index > 0 {
                        return Ok(false);
                    }
                    None
                }
                (None, Some(AssignedValue::Single(Value::Message(child)))) => Some(child),
                (None, _) => None,
            };
        }
        Ok(true)
    }

    /// Keeps a key that names no field in the unrecognized ledger, as a list of its raw
    /// strings. Only undotted keys carrying the prefix qualify.
    fn record_unknown(&mut self, key: &str, values: &[String]) -> bool {
        let Some(name) = key.strip_prefix(self.prefix.as_str()) else {
            return false;
        };
        let message_type = self.message.message_type();
        let names_field = message_type.get_field_by_name(name).is_some()
            || split_index(name).is_some_and(|(base, _)| message_type.get_field_by_name(base).is_some());
        if name.is_empty() || name.contains('.') || names_field {
            return false;
        }

        let raw = Tree::List(values.iter().map(|value| Tree::String(value.clone())).collect());
        self.message
            .set_unrecognized_field(UnrecognizedKey::Named(name.to_string()), raw, Variant::String);
        true
    }
}

/// The message at `index` of a repeated message field, appended when `index` is one past
/// the end.
fn element_mut<'a>(message: &'a mut Message, field: &FieldDescriptor, index: usize) -> Result<&'a mut Message> {
    let list = message.list_mut(field.attribute())?;
    if index == list.len() {
        list.push(field.message_type()?.new_message())?;
    }
    list.message_at_mut(index)
        .ok_or_else(|| Error::NotAMessage(field.name().to_string()))
}

/// Converts one raw query value for `field`.
fn decode_text(field: &FieldDescriptor, text: &str) -> Result<Value> {
    let invalid = |what: &str| -> Error {
        DecodeError::new(format!("Invalid {what} \"{text}\" for field {}", field.name())).into()
    };

    match field.kind() {
        FieldKind::Integer => text.trim().parse().map(Value::Int).map_err(|_| invalid("integer")),
        FieldKind::Float => text.trim().parse().map(Value::Float).map_err(|_| invalid("number")),
        FieldKind::Boolean => Ok(Value::Bool(text.eq_ignore_ascii_case("true"))),
        FieldKind::String => Ok(Value::String(text.to_string())),
        FieldKind::Bytes => STANDARD
            .decode(text.as_bytes())
            .map(Value::Bytes)
            .map_err(|err| DecodeError::new(format!("Base64 decoding error: {err}")).into()),
        FieldKind::Enum => {
            let enum_type = field.enum_type()?;
            let member = match text.parse::<i64>() {
                Ok(number) => enum_type.by_number(number),
                Err(_) => enum_type.by_name(text),
            };
            member.map(Value::Enum).map_err(|_| invalid("enum value"))
        }
        FieldKind::DateTimeIso8601 => Timestamp::parse_iso8601(text)
            .map(Value::DateTime)
            .map_err(|err| DecodeError::new(format!("iso8601 decoding error: {err}")).into()),
        FieldKind::DateTimeMs => text
            .trim()
            .parse()
            .ok()
            .and_then(Timestamp::from_millis)
            .map(Value::DateTime)
            .ok_or_else(|| invalid("millisecond timestamp")),
        FieldKind::Uuid => Uuid::parse_str(text)
            .map(Value::Uuid)
            .map_err(|err| DecodeError::new(format!("uuid decoding error: {err}")).into()),
        FieldKind::Dict => match serde_json::from_str(text) {
            Ok(serde_json::Value::Object(map)) => Ok(Value::Dict(
                map.into_iter().map(|(k, v)| (k, Tree::from(v))).collect(),
            )),
            _ => Err(invalid("JSON object")),
        },
        FieldKind::Untyped => Ok(Value::Untyped(
            serde_json::from_str::<serde_json::Value>(text)
                .map(Tree::from)
                .unwrap_or_else(|_| Tree::String(text.to_string())),
        )),
        FieldKind::Message => Err(Error::NotAMessage(field.name().to_string())),
    }
}

/// Untyped values travel as JSON text. Strings that would not parse as JSON are left
/// bare so hand-written queries stay readable.
fn untyped_text(tree: &Tree) -> Result<String> {
    match tree {
        Tree::String(s) if serde_json::from_str::<serde_json::Value>(s).is_err() => Ok(s.clone()),
        other => Ok(other.to_json()?.to_string()),
    }
}

/// Renders one scalar value as query text.
fn encode_text(field: &FieldDescriptor, value: &Value) -> Result<String> {
    Ok(match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => s.clone(),
        Value::Bytes(bytes) => STANDARD.encode(bytes),
        Value::Enum(member) => member.name().to_string(),
        Value::DateTime(ts) if field.kind() == FieldKind::DateTimeMs => ts.to_millis().to_string(),
        Value::DateTime(ts) => ts.to_iso8601(),
        Value::Uuid(uuid) => uuid.hyphenated().to_string(),
        Value::Dict(map) => Tree::Map(map.clone()).to_json()?.to_string(),
        Value::Untyped(tree) => untyped_text(tree)?,
        Value::Message(_) => return Err(Error::NotAMessage(field.name().to_string())),
    })
}

fn encode_pairs(message: &Message, path: &str, pairs: &mut Vec<(String, String)>) -> Result<()> {
    for (field, assigned) in message.assigned_fields() {
        let key = format!("{path}{}", field.name());
        match assigned {
            AssignedValue::Null => {}
            AssignedValue::Single(Value::Message(child)) => encode_child(child, &key, pairs)?,
            AssignedValue::Single(value) => pairs.push((key, encode_text(&field, value)?)),
            AssignedValue::List(list) if field.kind() == FieldKind::Message => {
                for (index, child) in list.iter().filter_map(Value::as_message).enumerate() {
                    encode_child(child, &format!("{key}-{index}"), pairs)?;
                }
            }
            AssignedValue::List(list) => {
                for value in list {
                    pairs.push((key.clone(), encode_text(&field, value)?));
                }
            }
        }
    }
    Ok(())
}

fn encode_child(child: &Message, key: &str, pairs: &mut Vec<(String, String)>) -> Result<()> {
    let before = pairs.len();
    encode_pairs(child, &format!("{key}."), pairs)?;
    if pairs.len() == before {
        pairs.push((key.to_string(), String::new()));
    }
    Ok(())
}

/// The query component of a bare URL, a `path?query` string or a plain query.
fn query_component(input: &str) -> Result<String> {
    if input.contains("://") {
        let url = Url::parse(input).map_err(|err| Error::InvalidInput(format!("{input}: {err}")))?;
        return Ok(url.query().unwrap_or_default().to_string());
    }
    if let Some(query) = input.strip_prefix('?') {
        return Ok(query.to_string());
    }
    match input.split_once('?') {
        Some((path, query)) if !path.contains(['=', '&']) => Ok(query.to_string()),
        _ => Ok(input.to_string()),
    }
}

/// Orders keys so parents precede children and list indices ascend numerically.
fn path_order(key: &str) -> Vec<(&str, Option<usize>)> {
    key.split('.')
        .map(|segment| match split_index(segment) {
            Some((name, index)) => (name, Some(index)),
            None => (segment, None),
        })
        .collect()
}

/// Encodes messages as URL query strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryCodec {
    prefix: String,
}

impl QueryCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// A codec that prepends `prefix` to every key it writes and requires it on every key
    /// it reads.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl MessageCodec for QueryCodec {
    type Input = str;
    type Output = String;

    fn content_type(&self) -> &'static str {
        "application/x-www-form-urlencoded"
    }

    fn encode_message(&self, message: &Message) -> Result<String> {
        let mut pairs = Vec::new();
        encode_pairs(message, &self.prefix, &mut pairs)?;

        for (key, value) in message.unrecognized_entries() {
            let key = format!("{}{key}", self.prefix);
            match value {
                Tree::List(items) => {
                    for item in items {
                        pairs.push((key.clone(), item.to_text()?));
                    }
                }
                other => pairs.push((key, other.to_text()?)),
            }
        }

        Ok(form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish())
    }

    fn decode_message(&self, message_type: &MessageType, input: &str) -> Result<Message> {
        let query = query_component(input)?;

        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            grouped.entry(key.into_owned()).or_default().push(value.into_owned());
        }
        let mut parameters: Vec<_> = grouped.into_iter().collect();
        parameters.sort_by(|(a, _), (b, _)| path_order(a).cmp(&path_order(b)));

        let mut builder = QueryBuilder::new(message_type, self.prefix.clone());
        for (key, values) in &parameters {
            if builder.add_parameter(key, values)? || builder.record_unknown(key, values) {
                continue;
            }
            tracing::debug!("Skipping query parameter '{key}'");
        }

        let message = builder.into_message();
        message.check_initialized()?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDefinition, MessageDefinition, RegistryBuilder};

    fn owner() -> MessageType {
        RegistryBuilder::new()
            .message(
                MessageDefinition::new("Owner")
                    .field(FieldDefinition::integer("number"))
                    .field(FieldDefinition::message("animals", "Animal").repeated())
                    .field(FieldDefinition::message("sub_message", "Animal"))
                    .field(FieldDefinition::string("tags").repeated())
                    .message(
                        MessageDefinition::new("Animal")
                            .field(FieldDefinition::string("name"))
                            .field(FieldDefinition::integer("size")),
                    ),
            )
            .build()
            .unwrap()
            .get_message_by_name("Owner")
            .unwrap()
    }

    fn segment(name: &str, index: Option<usize>) -> PathSegment {
        PathSegment {
            name: name.to_string(),
            index,
        }
    }

    #[test]
    fn test_make_path() {
        let builder = QueryBuilder::new(&owner(), "");
        assert_eq!(
            builder.make_path("animals-2.name").unwrap(),
            Some(vec![segment("animals", Some(2)), segment("name", None)])
        );
        assert_eq!(builder.make_path("tags").unwrap(), Some(vec![segment("tags", None)]));
        assert_eq!(builder.make_path("tags-1").unwrap(), Some(vec![segment("tags", Some(1))]));
    }

    #[test]
    fn test_make_path_rejections() {
        let builder = QueryBuilder::new(&owner(), "");
        for key in [
            "sub_message-1.name",
            "animals.name",
            "animals",
            "number.x",
            "tags-0.x",
            "missing",
            "animals-0.missing",
        ] {
            assert_eq!(builder.make_path(key).unwrap(), None, "{key}");
        }
    }

    #[test]
    fn test_prefix_is_required() {
        let builder = QueryBuilder::new(&owner(), "q_");
        assert!(builder.make_path("number").unwrap().is_none());
        assert!(builder.make_path("q_number").unwrap().is_some());
    }

    #[test]
    fn test_add_parameter_grows_lists_one_step_at_a_time() {
        let mut builder = QueryBuilder::new(&owner(), "");
        assert!(!builder.add_parameter("animals-1.name", &["cat".into()]).unwrap());
        assert!(!builder.message().has_value_assigned("animals"));

        assert!(builder.add_parameter("animals-0.name", &["dog".into()]).unwrap());
        assert!(builder.add_parameter("animals-1.name", &["cat".into()]).unwrap());
        assert!(builder.add_parameter("animals-0.size", &["12".into()]).unwrap());

        let message = builder.into_message();
        let animals = message.get_list("animals").unwrap();
        assert_eq!(animals.len(), 2);
        let dog = animals[0].as_message().unwrap();
        assert_eq!(dog.get("size").unwrap().as_deref(), Some(&Value::Int(12)));
    }

    #[test]
    fn test_cardinality_errors_are_raised() {
        let mut builder = QueryBuilder::new(&owner(), "");
        assert!(matches!(
            builder.add_parameter("number", &["1".into(), "2".into()]),
            Err(Error::Decode(_))
        ));
        assert!(matches!(builder.add_parameter("number", &[]), Err(Error::Decode(_))));
        assert!(matches!(
            builder.add_parameter("number", &["one".into()]),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_query_component() {
        assert_eq!(query_component("http://h/p?a=1&b=2").unwrap(), "a=1&b=2");
        assert_eq!(query_component("/p?a=1").unwrap(), "a=1");
        assert_eq!(query_component("?a=1").unwrap(), "a=1");
        assert_eq!(query_component("a=what?").unwrap(), "a=what?");
    }

    #[test]
    fn test_path_order() {
        let mut keys = vec!["animals-10.name", "number", "animals-2.name", "animals-2"];
        keys.sort_by(|a, b| path_order(a).cmp(&path_order(b)));
        assert_eq!(keys, ["animals-2", "animals-2.name", "animals-10.name", "number"]);
    }
}
