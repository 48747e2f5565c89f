//! Scalar values and the simple-type allow-list
//!
//! `Value` is one cell read from a result cursor (or one bound parameter scalar).
//! `ValueType` is the declared type of a leaf property, and `LeafValue` is the
//! trait that decides which Rust field types count as leaf properties.
//!
//! # Supported leaf types
//!
//! - `i8`, `i16`, `i32`, `i64` - integers (NULL becomes `0`)
//! - `f32`, `f64` - floating point (NULL becomes `0.0`)
//! - `bool` - booleans (NULL becomes `false`)
//! - `Decimal` - exact decimals
//! - `String` - text
//! - `Vec<u8>` - byte sequences
//! - `NaiveDate`, `NaiveTime`, `NaiveDateTime` - temporal values
//! - `Option<T>` of any of the above (NULL becomes `None`)

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// One scalar value read from a result row or bound to a placeholder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
        }
    }

    /// Convert this value into the representation expected by a leaf of type `target`
    ///
    /// NULL passes through untouched; the leaf decides what an absent value becomes.
    /// Integer range checks happen when the leaf extracts its value, so an `Int`
    /// headed for an `i8` property is returned as-is here.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let v = Value::Decimal(Decimal::new(4299, 2)).coerce(ValueType::I32)?;
    /// assert_eq!(v, Value::Int(42));
    /// ```
    pub fn coerce(self, target: ValueType) -> Result<Value, ConversionError> {
        match (self, target) {
            (Value::Null, _) => Ok(Value::Null),

            (Value::Int(i), t) if t.is_integer() => Ok(Value::Int(i)),
            (Value::Int(i), ValueType::F32 | ValueType::F64) => Ok(Value::Float(i as f64)),
            (Value::Int(i), ValueType::Decimal) => Ok(Value::Decimal(Decimal::from(i))),

            (Value::Float(f), ValueType::F32 | ValueType::F64) => Ok(Value::Float(f)),
            (Value::Float(f), ValueType::Decimal) => Decimal::try_from(f)
                .map(Value::Decimal)
                .map_err(|_| ConversionError::OutOfRange {
                    value: f.to_string(),
                    target,
                }),

            (Value::Decimal(d), ValueType::Decimal) => Ok(Value::Decimal(d)),
            (Value::Decimal(d), t) if t.is_integer() => {
                d.trunc()
                    .to_i64()
                    .map(Value::Int)
                    .ok_or_else(|| ConversionError::OutOfRange {
                        value: d.to_string(),
                        target,
                    })
            }
            (Value::Decimal(d), ValueType::F32 | ValueType::F64) => {
                d.to_f64()
                    .map(Value::Float)
                    .ok_or_else(|| ConversionError::OutOfRange {
                        value: d.to_string(),
                        target,
                    })
            }

            (Value::Bool(b), ValueType::Bool) => Ok(Value::Bool(b)),
            (Value::Text(s), ValueType::String) => Ok(Value::Text(s)),
            (Value::Bytes(b), ValueType::Bytes) => Ok(Value::Bytes(b)),
            (Value::Time(t), ValueType::Time) => Ok(Value::Time(t)),

            (Value::Date(d), ValueType::Date) => Ok(Value::Date(d)),
            (Value::Date(d), ValueType::Timestamp) => Ok(Value::Timestamp(d.and_time(NaiveTime::MIN))),
            (Value::Date(d), ValueType::I64) => Ok(Value::Int(epoch_millis(d.and_time(NaiveTime::MIN)))),

            (Value::Timestamp(ts), ValueType::Timestamp) => Ok(Value::Timestamp(ts)),
            (Value::Timestamp(ts), ValueType::Date) => Ok(Value::Date(ts.date())),
            (Value::Timestamp(ts), ValueType::I64) => Ok(Value::Int(epoch_millis(ts))),

            (other, target) => Err(ConversionError::mismatch(&other, target)),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

value_from!(
    bool => |v| Value::Bool(v),
    i8 => |v| Value::Int(v as i64),
    i16 => |v| Value::Int(v as i64),
    i32 => |v| Value::Int(v as i64),
    i64 => |v| Value::Int(v),
    f32 => |v| Value::Float(v as f64),
    f64 => |v| Value::Float(v),
    Decimal => |v| Value::Decimal(v),
    String => |v| Value::Text(v),
    &str => |v| Value::Text(v.to_string()),
    Vec<u8> => |v| Value::Bytes(v),
    &[u8] => |v| Value::Bytes(v.to_vec()),
    NaiveDate => |v| Value::Date(v),
    NaiveTime => |v| Value::Time(v),
    NaiveDateTime => |v| Value::Timestamp(v),
);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Milliseconds since the Unix epoch, reading the timestamp as UTC
pub fn epoch_millis(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_millis()
}

/// Declared type of a leaf property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Decimal,
    String,
    Bytes,
    Date,
    Time,
    Timestamp,
}

impl ValueType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ValueType::I8 | ValueType::I16 | ValueType::I32 | ValueType::I64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ValueType::F32 | ValueType::F64)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::I8 => "i8",
            ValueType::I16 => "i16",
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
            ValueType::Decimal => "Decimal",
            ValueType::String => "String",
            ValueType::Bytes => "Vec<u8>",
            ValueType::Date => "NaiveDate",
            ValueType::Time => "NaiveTime",
            ValueType::Timestamp => "NaiveDateTime",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised while turning a `Value` into a property value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("value {value} does not fit in {target}")]
    OutOfRange { value: String, target: ValueType },

    #[error("cannot assign a {found} value to a {target} property")]
    TypeMismatch { found: &'static str, target: ValueType },

    #[error("NULL cannot be stored in a {target} property (declare it as Option<{target}>)")]
    NullNotRepresentable { target: ValueType },

    #[error("large character object is not valid UTF-8")]
    InvalidUtf8,

    #[error("property owner is not a `{expected}`")]
    OwnerMismatch { expected: &'static str },
}

impl ConversionError {
    pub fn mismatch(found: &Value, target: ValueType) -> Self {
        ConversionError::TypeMismatch {
            found: found.kind_name(),
            target,
        }
    }
}

/// A Rust type that can be populated directly from one result column
///
/// Implemented for the simple-type allow-list only. Any other field type must be
/// declared `nested`, `opaque` or `ignore` in the `entity!` macro.
pub trait LeafValue: Sized + 'static {
    /// Declared type reported to the plan builder
    const VALUE_TYPE: ValueType;

    /// Whether the type has an explicit absent value (`Option<T>`)
    const NULLABLE: bool = false;

    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

macro_rules! integer_leaf {
    ($($ty:ty => $vt:ident),* $(,)?) => {
        $(
            impl LeafValue for $ty {
                const VALUE_TYPE: ValueType = ValueType::$vt;

                fn from_value(value: Value) -> Result<Self, ConversionError> {
                    match value {
                        Value::Null => Ok(0),
                        Value::Int(i) => <$ty>::try_from(i).map_err(|_| ConversionError::OutOfRange {
                            value: i.to_string(),
                            target: Self::VALUE_TYPE,
                        }),
                        other => Err(ConversionError::mismatch(&other, Self::VALUE_TYPE)),
                    }
                }
            }
        )*
    };
}

integer_leaf!(i8 => I8, i16 => I16, i32 => I32, i64 => I64);

impl LeafValue for f64 {
    const VALUE_TYPE: ValueType = ValueType::F64;

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(0.0),
            Value::Float(f) => Ok(f),
            other => Err(ConversionError::mismatch(&other, Self::VALUE_TYPE)),
        }
    }
}

impl LeafValue for f32 {
    const VALUE_TYPE: ValueType = ValueType::F32;

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(0.0),
            Value::Float(f) => Ok(f as f32),
            other => Err(ConversionError::mismatch(&other, Self::VALUE_TYPE)),
        }
    }
}

impl LeafValue for bool {
    const VALUE_TYPE: ValueType = ValueType::Bool;

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(b),
            other => Err(ConversionError::mismatch(&other, Self::VALUE_TYPE)),
        }
    }
}

// Types with no zero value: NULL is only representable through Option<T>.
macro_rules! object_leaf {
    ($($ty:ty => $vt:ident / $variant:ident),* $(,)?) => {
        $(
            impl LeafValue for $ty {
                const VALUE_TYPE: ValueType = ValueType::$vt;

                fn from_value(value: Value) -> Result<Self, ConversionError> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        Value::Null => Err(ConversionError::NullNotRepresentable {
                            target: Self::VALUE_TYPE,
                        }),
                        other => Err(ConversionError::mismatch(&other, Self::VALUE_TYPE)),
                    }
                }
            }
        )*
    };
}

object_leaf!(
    String => String / Text,
    Vec<u8> => Bytes / Bytes,
    Decimal => Decimal / Decimal,
    NaiveDate => Date / Date,
    NaiveTime => Time / Time,
    NaiveDateTime => Timestamp / Timestamp,
);

impl<T: LeafValue> LeafValue for Option<T> {
    const VALUE_TYPE: ValueType = T::VALUE_TYPE;
    const NULLABLE: bool = true;

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
