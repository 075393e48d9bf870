//! # Wire variants
//!
//! A [`Variant`] names the wire-level representation of a field. The numbering follows
//! the protocol-buffers scalar type codes, extended with [`Variant::Untyped`].
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Variant {
    Double = 1,
    Float = 2,
    Int64 = 3,
    Uint64 = 4,
    Int32 = 5,
    Bool = 8,
    String = 9,
    Message = 11,
    Bytes = 12,
    Uint32 = 13,
    Enum = 14,
    Sint32 = 17,
    Sint64 = 18,
    Untyped = 19,
}

impl Variant {
    pub const ALL: [Variant; 14] = [
        Variant::Double,
        Variant::Float,
        Variant::Int64,
        Variant::Uint64,
        Variant::Int32,
        Variant::Bool,
        Variant::String,
        Variant::Message,
        Variant::Bytes,
        Variant::Uint32,
        Variant::Enum,
        Variant::Sint32,
        Variant::Sint64,
        Variant::Untyped,
    ];

    pub fn number(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Variant::Double => "DOUBLE",
            Variant::Float => "FLOAT",
            Variant::Int64 => "INT64",
            Variant::Uint64 => "UINT64",
            Variant::Int32 => "INT32",
            Variant::Bool => "BOOL",
            Variant::String => "STRING",
            Variant::Message => "MESSAGE",
            Variant::Bytes => "BYTES",
            Variant::Uint32 => "UINT32",
            Variant::Enum => "ENUM",
            Variant::Sint32 => "SINT32",
            Variant::Sint64 => "SINT64",
            Variant::Untyped => "UNTYPED",
        }
    }

    /// Inclusive bounds for integer variants, `None` for every other variant.
    pub fn integer_bounds(self) -> Option<(i128, i128)> {
        match self {
            Variant::Int32 | Variant::Sint32 => Some((i32::MIN as i128, i32::MAX as i128)),
            Variant::Int64 | Variant::Sint64 => Some((i64::MIN as i128, i64::MAX as i128)),
            Variant::Uint32 => Some((0, u32::MAX as i128)),
            Variant::Uint64 => Some((0, u64::MAX as i128)),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|variant| variant.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown variant '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_follow_protobuf_codes() {
        assert_eq!(Variant::Double.number(), 1);
        assert_eq!(Variant::Bool.number(), 8);
        assert_eq!(Variant::Message.number(), 11);
        assert_eq!(Variant::Sint64.number(), 18);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("int32".parse::<Variant>(), Ok(Variant::Int32));
        assert_eq!("UNTYPED".parse::<Variant>(), Ok(Variant::Untyped));
        assert!("INT128".parse::<Variant>().is_err());
    }

    #[test]
    fn test_deserialize_from_upper_case_names() {
        let variant: Variant = serde_json::from_str("\"UINT64\"").unwrap();
        assert_eq!(variant, Variant::Uint64);
    }

    #[test]
    fn test_integer_bounds() {
        assert_eq!(Variant::Uint32.integer_bounds(), Some((0, 4_294_967_295)));
        assert_eq!(Variant::String.integer_bounds(), None);
    }
}
