//! JSON value types.
//!
//! This module defines the [`Value`] enum, the tree produced by the decoder,
//! and [`Number`], which keeps the representation class a number literal was
//! read with instead of collapsing every number into `f64`.

use core::fmt;

use indexmap::IndexMap;
use serde::{Serialize, Serializer, ser::Error as _};

/// Object fields in insertion order. Inserting an existing key replaces the
/// value in place, so the last write wins and the first position is kept.
pub type Map = IndexMap<String, Value>;
/// Array elements in document order.
pub type Array = Vec<Value>;

/// A JSON number together with its representation class.
///
/// Decoding produces `Int`, `Long`, `BigInteger` or `BigDecimal`.
/// Arbitrary precision variants hold the literal text exactly as it appeared
/// in the input, so they round trip byte for byte.
#[derive(Clone, Debug, PartialEq)]
pub enum Number {
    /// An integer that fits in `i32`.
    Int(i32),
    /// An integer that fits in `i64` but not `i32`.
    Long(i64),
    /// An integer literal too large for `i64`, verbatim.
    BigInteger(String),
    /// Single precision. Only produced by applications, never by decoding.
    Float(f32),
    /// Double precision. Only produced by applications, never by decoding.
    Double(f64),
    /// A literal with a fraction or an exponent, verbatim.
    BigDecimal(String),
}

impl Number {
    /// Classifies a JSON number literal.
    ///
    /// Returns `None` if `literal` is not a valid JSON number.
    ///
    /// ```
    /// use jsonflow::Number;
    ///
    /// assert_eq!(Number::from_literal("123"), Some(Number::Int(123)));
    /// assert_eq!(Number::from_literal("1.50"), Some(Number::BigDecimal("1.50".into())));
    /// assert_eq!(Number::from_literal("01"), None);
    /// ```
    #[must_use]
    pub fn from_literal(literal: &str) -> Option<Self> {
        let kind = crate::tokenizer::NumberKind::classify(literal)?;
        Some(Self::from_kind(kind, literal.to_owned()))
    }

    pub(crate) fn from_kind(kind: crate::tokenizer::NumberKind, text: String) -> Self {
        use crate::tokenizer::NumberKind;

        match kind {
            NumberKind::Int => text.parse().map_or(Self::BigInteger(text), Self::Int),
            NumberKind::Long => text.parse().map_or(Self::BigInteger(text), Self::Long),
            NumberKind::BigInteger => Self::BigInteger(text),
            NumberKind::BigDecimal => Self::BigDecimal(text),
        }
    }

    /// Returns `true` for the arbitrary precision variants.
    #[must_use]
    pub fn is_arbitrary_precision(&self) -> bool {
        matches!(self, Self::BigInteger(_) | Self::BigDecimal(_))
    }

    /// Returns `true` for the integral variants.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Long(_) | Self::BigInteger(_))
    }

    /// Lossy conversion to `f64`.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(f64::from(*n)),
            Self::Long(n) => Some(*n as f64),
            Self::Float(n) => Some(f64::from(*n)),
            Self::Double(n) => Some(*n),
            Self::BigInteger(s) | Self::BigDecimal(s) => s.parse().ok(),
        }
    }

    /// Exact conversion to `i64`, if the number is integral and in range.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(i64::from(*n)),
            Self::Long(n) => Some(*n),
            Self::BigInteger(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{n}"),
            Number::Long(n) => write!(f, "{n}"),
            Number::BigInteger(s) | Number::BigDecimal(s) => f.write_str(s),
            // `{:?}` keeps a fractional part on integral floats ("1.0").
            Number::Float(n) if n.is_finite() => write!(f, "{n:?}"),
            Number::Double(n) if n.is_finite() => write!(f, "{n:?}"),
            Number::Float(_) | Number::Double(_) => f.write_str("null"),
        }
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Number::Int(n) => serializer.serialize_i32(*n),
            Number::Long(n) => serializer.serialize_i64(*n),
            Number::Float(n) => serializer.serialize_f32(*n),
            Number::Double(n) => serializer.serialize_f64(*n),
            // The literal goes out unchanged, exponent spelling included.
            Number::BigInteger(s) | Number::BigDecimal(s) => {
                serde_json::value::RawValue::from_string(s.clone())
                    .map_err(S::Error::custom)?
                    .serialize(serializer)
            }
        }
    }
}

/// A JSON value as defined by [RFC 8259].
///
/// # Examples
///
/// ```
/// use jsonflow::{Map, Value};
///
/// let mut map = Map::new();
/// map.insert("key".to_string(), Value::String("value".into()));
/// let v = Value::Object(map);
/// assert_eq!(v.to_string(), r#"{"key":"value"}"#);
/// ```
///
/// [RFC 8259]: https://datatracker.ietf.org/doc/html/rfc8259
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    /// `null`
    #[default]
    Null,
    /// `true` or `false`.
    Boolean(bool),
    /// Any number, with its representation class.
    Number(Number),
    /// A string, unescaped.
    String(String),
    /// An array.
    Array(Array),
    /// An object, in insertion order.
    Object(Map),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Number(Number::Int(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Number(Number::Long(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(Number::Double(v))
    }
}

impl From<Number> for Value {
    fn from(v: Number) -> Self {
        Self::Number(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<Array> for Value {
    fn from(v: Array) -> Self {
        Self::Array(v)
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Self::Object(v)
    }
}

impl Value {
    /// Returns `true` if the value is [`Null`].
    ///
    /// [`Null`]: Value::Null
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for numbers of any class.
    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(..))
    }

    /// Returns `true` for arrays.
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(..))
    }

    /// Returns `true` for objects.
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(..))
    }

    /// The number, if this is one.
    #[must_use]
    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Self::Number(n) => Some(n),
            _ => None,
        }
    }

    /// The string contents, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The elements, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The fields, if this is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(m) => Some(m),
            _ => None,
        }
    }

    /// Looks up `key` if this value is an object.
    ///
    /// ```
    /// use jsonflow::{Map, Value};
    ///
    /// let mut map = Map::new();
    /// map.insert("x".into(), Value::from(1));
    /// assert_eq!(Value::Object(map).get("x"), Some(&Value::from(1)));
    /// ```
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|m| m.get(key))
    }
}

/// Escapes a string for inclusion in a JSON string literal.
///
/// Quotes, backslashes and control characters are escaped; everything else,
/// including non-ASCII text, is written as is.
pub(crate) fn write_escaped_string<W: fmt::Write>(src: &str, f: &mut W) -> fmt::Result {
    for c in src.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c.is_control() && (c as u32) <= 0xFFFF => {
                write!(f, "\\u{:04X}", c as u32)?;
            }
            _ => f.write_char(c)?,
        }
    }
    Ok(())
}

struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        write_escaped_string(self.0, f)?;
        f.write_str("\"")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            Value::Number(n) => n.fmt(f),
            Value::String(s) => Escaped(s).fmt(f),
            Value::Array(arr) => {
                f.write_str("[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    v.fmt(f)?;
                }
                f.write_str("]")
            }
            Value::Object(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{v}", Escaped(k))?;
                }
                f.write_str("}")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(arr) => serializer.collect_seq(arr),
            Value::Object(map) => serializer.collect_map(map),
        }
    }
}
