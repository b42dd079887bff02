//! Typed configuration fields.
//!
//! A [`Field`] holds one steering value. Its payload kind is fixed when it is
//! created; retrieval goes through the [`FieldValue`] trait, which maps a Rust
//! type to exactly one [`FieldKind`] so that no implicit coercion can happen.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminator for the payload of a [`Field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    Double,
    String,
    BoolSeq,
    IntSeq,
    FloatSeq,
    DoubleSeq,
    StringSeq,
}

impl FieldKind {
    /// Steering-file spelling of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Double => "double",
            FieldKind::String => "string",
            FieldKind::BoolSeq => "sequence<bool>",
            FieldKind::IntSeq => "sequence<int>",
            FieldKind::FloatSeq => "sequence<float>",
            FieldKind::DoubleSeq => "sequence<double>",
            FieldKind::StringSeq => "sequence<string>",
        }
    }

    /// Parse a type token. `vector<T>` is accepted as a synonym of `sequence<T>`.
    pub fn parse(token: &str) -> Option<Self> {
        let kind = match token {
            "bool" => FieldKind::Bool,
            "int" => FieldKind::Int,
            "float" => FieldKind::Float,
            "double" => FieldKind::Double,
            "string" => FieldKind::String,
            _ => {
                let inner = token
                    .strip_prefix("sequence<")
                    .or_else(|| token.strip_prefix("vector<"))?
                    .strip_suffix('>')?
                    .trim();
                match inner {
                    "bool" => FieldKind::BoolSeq,
                    "int" => FieldKind::IntSeq,
                    "float" => FieldKind::FloatSeq,
                    "double" => FieldKind::DoubleSeq,
                    "string" => FieldKind::StringSeq,
                    _ => return None,
                }
            }
        };
        Some(kind)
    }

    pub fn is_sequence(&self) -> bool {
        matches!(
            self,
            FieldKind::BoolSeq
                | FieldKind::IntSeq
                | FieldKind::FloatSeq
                | FieldKind::DoubleSeq
                | FieldKind::StringSeq
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One typed configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Field {
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    String(String),
    BoolSeq(Vec<bool>),
    IntSeq(Vec<i32>),
    FloatSeq(Vec<f32>),
    DoubleSeq(Vec<f64>),
    StringSeq(Vec<String>),
}

impl Field {
    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Bool(_) => FieldKind::Bool,
            Field::Int(_) => FieldKind::Int,
            Field::Float(_) => FieldKind::Float,
            Field::Double(_) => FieldKind::Double,
            Field::String(_) => FieldKind::String,
            Field::BoolSeq(_) => FieldKind::BoolSeq,
            Field::IntSeq(_) => FieldKind::IntSeq,
            Field::FloatSeq(_) => FieldKind::FloatSeq,
            Field::DoubleSeq(_) => FieldKind::DoubleSeq,
            Field::StringSeq(_) => FieldKind::StringSeq,
        }
    }

    /// Build a field of `kind` from steering value tokens.
    ///
    /// Scalars take exactly one token; sequences take one or more, in order.
    pub fn from_tokens(kind: FieldKind, tokens: &[&str]) -> std::result::Result<Self, String> {
        if !kind.is_sequence() && tokens.len() != 1 {
            return Err(format!(
                "expected 1 value for {} but got {}",
                kind,
                tokens.len()
            ));
        }

        let field = match kind {
            FieldKind::Bool => Field::Bool(parse_bool(tokens[0])?),
            FieldKind::Int => Field::Int(parse_number(tokens[0], "int")?),
            FieldKind::Float => Field::Float(parse_number(tokens[0], "float")?),
            FieldKind::Double => Field::Double(parse_number(tokens[0], "double")?),
            FieldKind::String => Field::String(tokens[0].to_string()),
            FieldKind::BoolSeq => Field::BoolSeq(
                tokens
                    .iter()
                    .map(|t| parse_bool(t))
                    .collect::<std::result::Result<_, _>>()?,
            ),
            FieldKind::IntSeq => Field::IntSeq(
                tokens
                    .iter()
                    .map(|t| parse_number(t, "int"))
                    .collect::<std::result::Result<_, _>>()?,
            ),
            FieldKind::FloatSeq => Field::FloatSeq(
                tokens
                    .iter()
                    .map(|t| parse_number(t, "float"))
                    .collect::<std::result::Result<_, _>>()?,
            ),
            FieldKind::DoubleSeq => Field::DoubleSeq(
                tokens
                    .iter()
                    .map(|t| parse_number(t, "double"))
                    .collect::<std::result::Result<_, _>>()?,
            ),
            FieldKind::StringSeq => {
                Field::StringSeq(tokens.iter().map(|t| t.to_string()).collect())
            }
        };
        Ok(field)
    }
}

fn parse_bool(token: &str) -> std::result::Result<bool, String> {
    match token.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(format!("cannot convert '{}' to bool", token)),
    }
}

fn parse_number<T: std::str::FromStr>(token: &str, name: &str) -> std::result::Result<T, String> {
    token
        .parse::<T>()
        .map_err(|_| format!("cannot convert '{}' to {}", token, name))
}

mod sealed {
    pub trait Sealed {}
}

/// Rust types that can be stored in and retrieved from a [`Field`].
///
/// Each implementor maps to exactly one [`FieldKind`].
pub trait FieldValue: Clone + sealed::Sealed {
    const KIND: FieldKind;

    fn from_field(field: &Field) -> Option<&Self>;

    fn into_field(self) -> Field;
}

macro_rules! impl_field_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl FieldValue for $ty {
                const KIND: FieldKind = FieldKind::$variant;

                fn from_field(field: &Field) -> Option<&Self> {
                    match field {
                        Field::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn into_field(self) -> Field {
                    Field::$variant(self)
                }
            }
        )*
    };
}

impl_field_value! {
    bool => Bool,
    i32 => Int,
    f32 => Float,
    f64 => Double,
    String => String,
    Vec<bool> => BoolSeq,
    Vec<i32> => IntSeq,
    Vec<f32> => FloatSeq,
    Vec<f64> => DoubleSeq,
    Vec<String> => StringSeq,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!(FieldKind::parse("double"), Some(FieldKind::Double));
        assert_eq!(FieldKind::parse("sequence<int>"), Some(FieldKind::IntSeq));
        assert_eq!(FieldKind::parse("vector<string>"), Some(FieldKind::StringSeq));
        assert_eq!(FieldKind::parse("long"), None);
        assert_eq!(FieldKind::parse("sequence<long>"), None);
        assert_eq!(FieldKind::parse("sequence<int"), None);
    }

    #[test]
    fn test_scalar_requires_one_token() {
        let err = Field::from_tokens(FieldKind::Int, &["1", "2"]).unwrap_err();
        assert!(err.contains("expected 1 value"));
    }

    #[test]
    fn test_bool_spellings() {
        assert_eq!(Field::from_tokens(FieldKind::Bool, &["TRUE"]), Ok(Field::Bool(true)));
        assert_eq!(Field::from_tokens(FieldKind::Bool, &["0"]), Ok(Field::Bool(false)));
        assert!(Field::from_tokens(FieldKind::Bool, &["yes"]).is_err());
    }

    #[test]
    fn test_sequence_keeps_order() {
        let field = Field::from_tokens(FieldKind::DoubleSeq, &["3.5", "1", "-2e3"]).unwrap();
        assert_eq!(field, Field::DoubleSeq(vec![3.5, 1.0, -2000.0]));
    }

    #[test]
    fn test_from_field_is_exact() {
        let field = 5i32.into_field();
        assert_eq!(i32::from_field(&field), Some(&5));
        assert_eq!(f32::from_field(&field), None);
        assert_eq!(<Vec<i32>>::from_field(&field), None);
    }
}
