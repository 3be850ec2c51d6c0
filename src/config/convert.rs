//! Conversion of raw scalars into typed values.

use super::node::Scalar;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Primitive target of a scalar property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    String,
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Bool => "bool",
            ScalarType::I8 => "i8",
            ScalarType::I16 => "i16",
            ScalarType::I32 => "i32",
            ScalarType::I64 => "i64",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
            ScalarType::String => "string",
        };
        f.write_str(name)
    }
}

/// A converted scalar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
}

impl TypedValue {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            TypedValue::Bool(_) => ScalarType::Bool,
            TypedValue::I8(_) => ScalarType::I8,
            TypedValue::I16(_) => ScalarType::I16,
            TypedValue::I32(_) => ScalarType::I32,
            TypedValue::I64(_) => ScalarType::I64,
            TypedValue::F32(_) => ScalarType::F32,
            TypedValue::F64(_) => ScalarType::F64,
            TypedValue::String(_) => ScalarType::String,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Bool(v) => write!(f, "{}", v),
            TypedValue::I8(v) => write!(f, "{}", v),
            TypedValue::I16(v) => write!(f, "{}", v),
            TypedValue::I32(v) => write!(f, "{}", v),
            TypedValue::I64(v) => write!(f, "{}", v),
            TypedValue::F32(v) => write!(f, "{}", v),
            TypedValue::F64(v) => write!(f, "{}", v),
            TypedValue::String(v) => f.write_str(v),
        }
    }
}

/// A raw value could not be turned into the requested type.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("'{value}' is not a valid {target}: {reason}")]
pub struct ConversionError {
    pub value: String,
    pub target: ScalarType,
    pub reason: String,
}

impl ConversionError {
    fn new(value: impl fmt::Display, target: ScalarType, reason: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            target,
            reason: reason.into(),
        }
    }
}

/// Convert one raw scalar into `target`.
pub fn convert(raw: &Scalar, target: ScalarType) -> Result<TypedValue, ConversionError> {
    match target {
        ScalarType::Bool => to_bool(raw).map(TypedValue::Bool),
        ScalarType::I8 => narrow(raw, target).map(TypedValue::I8),
        ScalarType::I16 => narrow(raw, target).map(TypedValue::I16),
        ScalarType::I32 => narrow(raw, target).map(TypedValue::I32),
        ScalarType::I64 => to_i64(raw, target).map(TypedValue::I64),
        ScalarType::F32 => {
            let wide = to_f64(raw, target)?;
            let narrow = wide as f32;
            if wide.is_finite() && !narrow.is_finite() {
                return Err(ConversionError::new(raw, target, "out of range"));
            }
            Ok(TypedValue::F32(narrow))
        }
        ScalarType::F64 => to_f64(raw, target).map(TypedValue::F64),
        ScalarType::String => Ok(TypedValue::String(raw.to_string())),
    }
}

/// Convert the values of one leaf into a scalar target.
///
/// Only a leaf holding exactly one value converts.
pub fn convert_values(values: &[Scalar], target: ScalarType) -> Result<TypedValue, ConversionError> {
    match values {
        [single] => convert(single, target),
        _ => Err(ConversionError::new(
            values
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            target,
            format!("expected exactly one value, found {}", values.len()),
        )),
    }
}

fn to_bool(raw: &Scalar) -> Result<bool, ConversionError> {
    match raw {
        Scalar::Bool(b) => Ok(*b),
        Scalar::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => Ok(true),
            "false" | "no" | "off" => Ok(false),
            _ => Err(ConversionError::new(raw, ScalarType::Bool, "not a boolean literal")),
        },
        _ => Err(ConversionError::new(raw, ScalarType::Bool, "numbers are not booleans")),
    }
}

fn narrow<T: TryFrom<i64>>(raw: &Scalar, target: ScalarType) -> Result<T, ConversionError> {
    let wide = to_i64(raw, target)?;
    T::try_from(wide).map_err(|_| ConversionError::new(raw, target, "out of range"))
}

fn to_i64(raw: &Scalar, target: ScalarType) -> Result<i64, ConversionError> {
    match raw {
        Scalar::Integer(i) => Ok(*i),
        Scalar::Float(x) => {
            if x.is_finite() && x.fract() == 0.0 && *x >= i64::MIN as f64 && *x < i64::MAX as f64 {
                Ok(*x as i64)
            } else {
                Err(ConversionError::new(raw, target, "not an integral value"))
            }
        }
        Scalar::String(s) => {
            parse_integer(s).map_err(|reason| ConversionError::new(raw, target, reason))
        }
        Scalar::Bool(_) => Err(ConversionError::new(raw, target, "booleans are not numbers")),
    }
}

fn to_f64(raw: &Scalar, target: ScalarType) -> Result<f64, ConversionError> {
    match raw {
        Scalar::Integer(i) => Ok(*i as f64),
        Scalar::Float(x) => Ok(*x),
        Scalar::String(s) => s
            .trim()
            .parse::<f64>()
            .or_else(|_| parse_integer(s).map(|i| i as f64))
            .map_err(|_| ConversionError::new(raw, target, "not a number")),
        Scalar::Bool(_) => Err(ConversionError::new(raw, target, "booleans are not numbers")),
    }
}

/// Parse a decimal or `0x` hexadecimal integer literal with optional sign.
pub fn parse_integer(text: &str) -> Result<i64, &'static str> {
    let trimmed = text.trim();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let (digits, radix) = match unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (unsigned, 10),
    };
    if digits.is_empty() {
        return Err("no digits");
    }
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return Err("not an integer literal");
    }

    let magnitude = u64::from_str_radix(digits, radix).map_err(|_| "out of range")?;
    let signed = if negative {
        -i128::from(magnitude)
    } else {
        i128::from(magnitude)
    };
    i64::try_from(signed).map_err(|_| "out of range")
}

/// Rust types a typed value can be extracted into.
pub trait FromTypedValue: Sized {
    const SCALAR_TYPE: ScalarType;

    fn from_typed(value: TypedValue) -> Option<Self>;
}

macro_rules! impl_from_typed {
    ($ty:ty, $variant:ident) => {
        impl FromTypedValue for $ty {
            const SCALAR_TYPE: ScalarType = ScalarType::$variant;

            fn from_typed(value: TypedValue) -> Option<Self> {
                match value {
                    TypedValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_from_typed!(bool, Bool);
impl_from_typed!(i8, I8);
impl_from_typed!(i16, I16);
impl_from_typed!(i32, I32);
impl_from_typed!(i64, I64);
impl_from_typed!(f32, F32);
impl_from_typed!(f64, F64);
impl_from_typed!(String, String);
