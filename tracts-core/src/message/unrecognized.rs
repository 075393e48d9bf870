//! Ledger of values that arrived for keys a record type does not declare.
use crate::tree::Tree;
use crate::variant::Variant;
use std::fmt;

/// Key of an unrecognized value. Keys made only of ASCII digits that fit in an `i64`
/// are numbered; everything else is named.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnrecognizedKey {
    Named(String),
    Numbered(i64),
}

impl UnrecognizedKey {
    /// Interprets a key as read from an encoded document.
    pub fn from_wire(key: &str) -> Self {
        if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(number) = key.parse() {
                return UnrecognizedKey::Numbered(number);
            }
        }
        UnrecognizedKey::Named(key.to_string())
    }
}

impl From<&str> for UnrecognizedKey {
    fn from(value: &str) -> Self {
        UnrecognizedKey::Named(value.to_string())
    }
}

impl From<String> for UnrecognizedKey {
    fn from(value: String) -> Self {
        UnrecognizedKey::Named(value)
    }
}

impl From<i64> for UnrecognizedKey {
    fn from(value: i64) -> Self {
        UnrecognizedKey::Numbered(value)
    }
}

impl fmt::Display for UnrecognizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnrecognizedKey::Named(name) => f.write_str(name),
            UnrecognizedKey::Numbered(number) => write!(f, "{number}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UnrecognizedField {
    pub(crate) key: UnrecognizedKey,
    pub(crate) value: Tree,
    pub(crate) variant: Variant,
}

/// Infers the wire variant of an unrecognized value.
///
/// Scalars map directly. A non-empty list takes the widest variant of its elements,
/// inferred recursively and widening `BOOL < INT64 < DOUBLE < STRING`. Anything else,
/// or a list holding anything else, has no variant.
pub fn infer_variant(value: &Tree) -> Option<Variant> {
    match value {
        Tree::List(items) if !items.is_empty() => items
            .iter()
            .map(infer_variant)
            .try_fold(Variant::Bool, |widest, variant| {
                variant.map(|v| if rank(v) > rank(widest) { v } else { widest })
            }),
        other => scalar_variant(other),
    }
}

fn scalar_variant(value: &Tree) -> Option<Variant> {
    match value {
        Tree::Bool(_) => Some(Variant::Bool),
        Tree::Int(_) => Some(Variant::Int64),
        Tree::Float(_) => Some(Variant::Double),
        Tree::String(_) => Some(Variant::String),
        _ => None,
    }
}

fn rank(variant: Variant) -> u8 {
    match variant {
        Variant::Bool => 0,
        Variant::Int64 => 1,
        Variant::Double => 2,
        _ => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_keys() {
        assert_eq!(UnrecognizedKey::from_wire("1001"), UnrecognizedKey::Numbered(1001));
        assert_eq!(
            UnrecognizedKey::from_wire("-123"),
            UnrecognizedKey::Named("-123".to_string())
        );
        assert_eq!(
            UnrecognizedKey::from_wire("456_mixed"),
            UnrecognizedKey::Named("456_mixed".to_string())
        );
        assert_eq!(
            UnrecognizedKey::from_wire("99999999999999999999"),
            UnrecognizedKey::Named("99999999999999999999".to_string())
        );
    }

    #[test]
    fn test_scalar_inference() {
        assert_eq!(infer_variant(&Tree::Bool(true)), Some(Variant::Bool));
        assert_eq!(infer_variant(&Tree::Int(1)), Some(Variant::Int64));
        assert_eq!(infer_variant(&Tree::Float(1.5)), Some(Variant::Double));
        assert_eq!(infer_variant(&Tree::from("x")), Some(Variant::String));
        assert_eq!(infer_variant(&Tree::Null), None);
    }

    #[test]
    fn test_list_inference_widens() {
        let bools = Tree::from(vec![true, false]);
        assert_eq!(infer_variant(&bools), Some(Variant::Bool));

        let mixed = Tree::List(vec![Tree::Bool(true), Tree::Int(3)]);
        assert_eq!(infer_variant(&mixed), Some(Variant::Int64));

        let numbers = Tree::List(vec![Tree::Int(3), Tree::Float(1.5)]);
        assert_eq!(infer_variant(&numbers), Some(Variant::Double));

        let strings = Tree::List(vec![Tree::Int(3), Tree::from("x")]);
        assert_eq!(infer_variant(&strings), Some(Variant::String));
    }

    #[test]
    fn test_nested_list_inference() {
        let ints = Tree::List(vec![
            Tree::List(vec![Tree::Int(1), Tree::Int(2)]),
            Tree::List(vec![Tree::Int(3)]),
        ]);
        assert_eq!(infer_variant(&ints), Some(Variant::Int64));

        let widened = Tree::List(vec![
            Tree::List(vec![Tree::Bool(true)]),
            Tree::List(vec![Tree::Int(1), Tree::Float(0.5)]),
        ]);
        assert_eq!(infer_variant(&widened), Some(Variant::Double));

        let with_null = Tree::List(vec![Tree::List(vec![Tree::Int(1), Tree::Null])]);
        assert_eq!(infer_variant(&with_null), None);
    }

    #[test]
    fn test_lists_without_variant() {
        assert_eq!(infer_variant(&Tree::List(vec![])), None);
        let nested = Tree::List(vec![Tree::Int(1), Tree::List(vec![])]);
        assert_eq!(infer_variant(&nested), None);
        assert_eq!(infer_variant(&Tree::Map(Default::default())), None);
    }
}
