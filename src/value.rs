//! scanf-style conversions and the typed values they produce.

use std::fmt;
use std::num::{IntErrorKind, ParseIntError};
use thiserror::Error;

/// Errors produced when a value part fails its declared conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvError {
    #[error("malformed value")]
    Syntax,

    #[error("value out of range")]
    Range,

    #[error("value does not fit the field type")]
    Mismatch,
}

impl From<ParseIntError> for ConvError {
    fn from(err: ParseIntError) -> Self {
        match err.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => ConvError::Range,
            _ => ConvError::Syntax,
        }
    }
}

/// A value produced by a conversion, or a fixed value from the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Uint(u64),
    Float(f64),
    Char(char),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Uint(u) => write!(f, "{}", u),
            Value::Float(x) => write!(f, "{}", x),
            Value::Char(c) => write!(f, "{}", c),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

/// A conversion directive taken from the part of a template after its
/// separator, e.g. `%u` in `uid=%u`.
///
/// Length modifiers (`h`, `hh`, `l`, `ll`, `j`, `z`, `t`, `L`, `q`) are
/// accepted and ignored: the width of the destination is decided by the
/// field type through [`FromValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// `%d`
    Signed,
    /// `%u`
    Unsigned,
    /// `%i`: decimal, `0x` hex or leading-zero octal
    Auto,
    /// `%x` / `%X`
    Hex,
    /// `%o`
    Octal,
    /// `%f`, `%e`, `%g` and friends
    Float,
    /// `%c`
    Char,
    /// `%s`: the remaining text, verbatim
    Str,
}

impl Conversion {
    /// Parse a directive such as `%lu`. Returns `None` for anything that is
    /// not a single supported conversion.
    ///
    /// Length modifiers are accepted and ignored. Field widths (`%50s`,
    /// `%3d`) and assignment suppression (`%*d`) are not supported and yield
    /// `None`, so a table row using them fails with `BadTemplate`.
    pub fn parse(spec: &str) -> Option<Conversion> {
        let body = spec.strip_prefix('%')?;
        let body =
            body.trim_start_matches(|c: char| matches!(c, 'h' | 'l' | 'j' | 'z' | 't' | 'L' | 'q'));
        let conv = match body {
            "d" => Conversion::Signed,
            "u" => Conversion::Unsigned,
            "i" => Conversion::Auto,
            "x" | "X" => Conversion::Hex,
            "o" => Conversion::Octal,
            "f" | "F" | "e" | "E" | "g" | "G" | "a" | "A" => Conversion::Float,
            "c" => Conversion::Char,
            "s" => Conversion::Str,
            _ => return None,
        };
        Some(conv)
    }

    /// Convert the whole of `text`. Trailing characters that the conversion
    /// does not consume are an error.
    pub fn convert(self, text: &str) -> Result<Value, ConvError> {
        match self {
            Conversion::Signed => Ok(Value::Int(text.parse::<i64>()?)),
            Conversion::Unsigned => Ok(Value::Uint(text.parse::<u64>()?)),
            Conversion::Auto => parse_auto(text).map(Value::Int),
            Conversion::Hex => {
                let digits = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"));
                Ok(Value::Uint(u64::from_str_radix(digits.unwrap_or(text), 16)?))
            }
            Conversion::Octal => Ok(Value::Uint(u64::from_str_radix(text, 8)?)),
            Conversion::Float => text
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| ConvError::Syntax),
            Conversion::Char => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err(ConvError::Syntax),
                }
            }
            Conversion::Str => Ok(Value::Str(text.to_owned())),
        }
    }
}

fn parse_auto(text: &str) -> Result<i64, ConvError> {
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let hex = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X"));
    let (radix, digits) = if let Some(hex) = hex {
        (16, hex)
    } else if rest.len() > 1 && rest.starts_with('0') {
        (8, &rest[1..])
    } else {
        (10, rest)
    };
    // A second sign after the prefix is not valid scanf input.
    if digits.starts_with(['+', '-']) {
        return Err(ConvError::Syntax);
    }
    let magnitude = i128::from_str_radix(digits, radix)?;
    let signed = if negative { -magnitude } else { magnitude };
    i64::try_from(signed).map_err(|_| ConvError::Range)
}

/// Types a [`Value`] can be stored into.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ConvError>;
}

macro_rules! from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, ConvError> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(i).map_err(|_| ConvError::Range),
                        Value::Uint(u) => <$ty>::try_from(u).map_err(|_| ConvError::Range),
                        _ => Err(ConvError::Mismatch),
                    }
                }
            }
        )*
    };
}

from_value_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ConvError> {
        match value {
            Value::Float(x) => Ok(x),
            Value::Int(i) => Ok(i as f64),
            Value::Uint(u) => Ok(u as f64),
            _ => Err(ConvError::Mismatch),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ConvError> {
        f64::from_value(value).map(|x| x as f32)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ConvError> {
        match value {
            Value::Int(i) => Ok(i != 0),
            Value::Uint(u) => Ok(u != 0),
            _ => Err(ConvError::Mismatch),
        }
    }
}

impl FromValue for char {
    fn from_value(value: Value) -> Result<Self, ConvError> {
        match value {
            Value::Char(c) => Ok(c),
            _ => Err(ConvError::Mismatch),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ConvError> {
        match value {
            Value::Str(s) => Ok(s),
            _ => Err(ConvError::Mismatch),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ConvError> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ConvError> {
        T::from_value(value).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directives() {
        assert_eq!(Conversion::parse("%d"), Some(Conversion::Signed));
        assert_eq!(Conversion::parse("%lu"), Some(Conversion::Unsigned));
        assert_eq!(Conversion::parse("%llx"), Some(Conversion::Hex));
        assert_eq!(Conversion::parse("%hhu"), Some(Conversion::Unsigned));
        assert_eq!(Conversion::parse("%lf"), Some(Conversion::Float));
        assert_eq!(Conversion::parse("%s"), Some(Conversion::Str));
        assert_eq!(Conversion::parse("%q"), None);
        assert_eq!(Conversion::parse("d"), None);
        assert_eq!(Conversion::parse("%d%d"), None);
    }

    #[test]
    fn test_field_widths_are_rejected() {
        assert_eq!(Conversion::parse("%50s"), None);
        assert_eq!(Conversion::parse("%3d"), None);
        assert_eq!(Conversion::parse("%*d"), None);
    }

    #[test]
    fn test_signed() {
        assert_eq!(Conversion::Signed.convert("42"), Ok(Value::Int(42)));
        assert_eq!(Conversion::Signed.convert("-7"), Ok(Value::Int(-7)));
        assert_eq!(Conversion::Signed.convert("+7"), Ok(Value::Int(7)));
        assert_eq!(Conversion::Signed.convert(""), Err(ConvError::Syntax));
        assert_eq!(Conversion::Signed.convert("1,5"), Err(ConvError::Syntax));
        assert_eq!(
            Conversion::Signed.convert("99999999999999999999"),
            Err(ConvError::Range)
        );
    }

    #[test]
    fn test_unsigned_rejects_negative() {
        assert_eq!(Conversion::Unsigned.convert("1000"), Ok(Value::Uint(1000)));
        assert_eq!(Conversion::Unsigned.convert("-1"), Err(ConvError::Syntax));
    }

    #[test]
    fn test_hex_and_octal() {
        assert_eq!(Conversion::Hex.convert("ff"), Ok(Value::Uint(255)));
        assert_eq!(Conversion::Hex.convert("0x1F"), Ok(Value::Uint(31)));
        assert_eq!(Conversion::Octal.convert("022"), Ok(Value::Uint(18)));
        assert_eq!(Conversion::Octal.convert("9"), Err(ConvError::Syntax));
    }

    #[test]
    fn test_auto_base() {
        assert_eq!(Conversion::Auto.convert("10"), Ok(Value::Int(10)));
        assert_eq!(Conversion::Auto.convert("0x10"), Ok(Value::Int(16)));
        assert_eq!(Conversion::Auto.convert("010"), Ok(Value::Int(8)));
        assert_eq!(Conversion::Auto.convert("-0x10"), Ok(Value::Int(-16)));
        assert_eq!(Conversion::Auto.convert("0"), Ok(Value::Int(0)));
        assert_eq!(Conversion::Auto.convert("0x-1"), Err(ConvError::Syntax));
    }

    #[test]
    fn test_char_and_float() {
        assert_eq!(Conversion::Char.convert("x"), Ok(Value::Char('x')));
        assert_eq!(Conversion::Char.convert("xy"), Err(ConvError::Syntax));
        assert_eq!(Conversion::Float.convert("1.5"), Ok(Value::Float(1.5)));
        assert_eq!(Conversion::Float.convert("abc"), Err(ConvError::Syntax));
    }

    #[test]
    fn test_from_value_narrowing() {
        assert_eq!(u16::from_value(Value::Uint(65535)), Ok(65535));
        assert_eq!(u16::from_value(Value::Uint(65536)), Err(ConvError::Range));
        assert_eq!(u32::from_value(Value::Int(-1)), Err(ConvError::Range));
        assert_eq!(i32::from_value(Value::Str("1".into())), Err(ConvError::Mismatch));
    }

    #[test]
    fn test_from_value_bool_and_option() {
        assert_eq!(bool::from_value(Value::Int(1)), Ok(true));
        assert_eq!(bool::from_value(Value::Int(0)), Ok(false));
        assert_eq!(
            Option::<String>::from_value(Value::Str("a".into())),
            Ok(Some("a".to_string()))
        );
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Str("hi".into()).to_string(), "hi");
        assert_eq!(Value::Char('c').to_string(), "c");
    }
}
