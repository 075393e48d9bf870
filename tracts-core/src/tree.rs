//! # Keyed trees
//!
//! [`Tree`] is the generic nested document exchanged by the nested-map codec and stored
//! in the unrecognized-field ledger. It is a superset of JSON: besides the JSON shapes it
//! carries bytes, date/time leaves and UUIDs, which are stringified when the tree is
//! rendered as JSON.
use crate::error::{Error, Result};
use crate::timestamp::{Timestamp, format_date, format_time};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{NaiveDate, NaiveTime};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Tree {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    DateTime(Timestamp),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(Uuid),
    List(Vec<Tree>),
    Map(BTreeMap<String, Tree>),
}

impl Tree {
    pub fn is_null(&self) -> bool {
        matches!(self, Tree::Null)
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Tree>> {
        match self {
            Tree::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Tree]> {
        match self {
            Tree::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tree::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the shape, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Tree::Null => "null",
            Tree::Bool(_) => "bool",
            Tree::Int(_) => "integer",
            Tree::Float(_) => "float",
            Tree::String(_) => "string",
            Tree::Bytes(_) => "bytes",
            Tree::DateTime(_) => "datetime",
            Tree::Date(_) => "date",
            Tree::Time(_) => "time",
            Tree::Uuid(_) => "uuid",
            Tree::List(_) => "list",
            Tree::Map(_) => "map",
        }
    }

    /// Renders the tree as JSON.
    ///
    /// Date/time leaves become ISO-8601 strings, bytes become base64 and UUIDs their
    /// hyphenated form. Non-finite floats have no JSON representation and are rejected.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        use serde_json::Value as Json;

        Ok(match self {
            Tree::Null => Json::Null,
            Tree::Bool(b) => Json::Bool(*b),
            Tree::Int(i) => Json::from(*i),
            Tree::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .ok_or_else(|| Error::InvalidInput(format!("{f} can not be represented in JSON")))?,
            Tree::String(s) => Json::String(s.clone()),
            Tree::Bytes(bytes) => Json::String(STANDARD.encode(bytes)),
            Tree::DateTime(ts) => Json::String(ts.to_iso8601()),
            Tree::Date(date) => Json::String(format_date(date)),
            Tree::Time(time) => Json::String(format_time(time)),
            Tree::Uuid(uuid) => Json::String(uuid.hyphenated().to_string()),
            Tree::List(items) => Json::Array(items.iter().map(Tree::to_json).collect::<Result<_>>()?),
            Tree::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), v.to_json()?)))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    /// Plain text rendering: strings verbatim, scalars via their display form and
    /// composite values as JSON text.
    pub fn to_text(&self) -> Result<String> {
        Ok(match self {
            Tree::String(s) => s.clone(),
            Tree::Bool(b) => b.to_string(),
            Tree::Int(i) => i.to_string(),
            Tree::Float(f) => f.to_string(),
            Tree::Null => String::new(),
            other => match other.to_json()? {
                serde_json::Value::String(s) => s,
                json => json.to_string(),
            },
        })
    }
}

impl From<serde_json::Value> for Tree {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => Tree::Null,
            Json::Bool(b) => Tree::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Tree::Int(i),
                None => Tree::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Tree::String(s),
            Json::Array(items) => Tree::List(items.into_iter().map(Tree::from).collect()),
            Json::Object(map) => Tree::Map(map.into_iter().map(|(k, v)| (k, Tree::from(v))).collect()),
        }
    }
}

impl From<bool> for Tree {
    fn from(value: bool) -> Self {
        Tree::Bool(value)
    }
}

impl From<i64> for Tree {
    fn from(value: i64) -> Self {
        Tree::Int(value)
    }
}

impl From<f64> for Tree {
    fn from(value: f64) -> Self {
        Tree::Float(value)
    }
}

impl From<&str> for Tree {
    fn from(value: &str) -> Self {
        Tree::String(value.to_string())
    }
}

impl From<String> for Tree {
    fn from(value: String) -> Self {
        Tree::String(value)
    }
}

impl<T: Into<Tree>> From<Vec<T>> for Tree {
    fn from(value: Vec<T>) -> Self {
        Tree::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Tree>> for Tree {
    fn from(value: BTreeMap<String, Tree>) -> Self {
        Tree::Map(value)
    }
}
