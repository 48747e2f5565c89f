//! Column category to property type conversions
//!
//! | Column              | Property                      | Conversion          |
//! |---------------------|-------------------------------|---------------------|
//! | Char                | String                        | right-trim spaces   |
//! | VarChar/LongVarChar | String                        | none                |
//! | Clob                | String                        | UTF-8 decode        |
//! | Numeric             | Decimal                       | none                |
//! | Numeric             | integers, floats              | truncate / round    |
//! | TinyInt..BigInt     | integers                      | range-checked       |
//! | TinyInt..BigInt     | floats, Decimal               | widen               |
//! | Double              | f64 / f32, Decimal            | none / widen        |
//! | Date, Timestamp     | Date, Timestamp               | none / truncate     |
//! | Date, Timestamp     | i64                           | epoch milliseconds  |
//! | Binary/VarBinary    | Vec<u8>                       | none                |
//! | Blob                | Vec<u8>                       | none (streamed)     |

use serde::Serialize;

use crate::entity::{ConversionError, Value, ValueType};
use crate::source::ColumnType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Conversion {
    /// Cursor value is handed to the setter as read
    Direct,
    /// Fixed-width text, trailing spaces removed
    TrimTrailingSpaces,
    /// Numeric widening or narrowing through `Value::coerce`
    Numeric,
    /// Temporal value to another temporal type or to epoch milliseconds
    Temporal,
    /// Streamed character object decoded as UTF-8
    ClobText,
}

impl Conversion {
    /// Pick the conversion for a column/property pair, None when the pair is unsupported
    pub fn select(column_type: &ColumnType, target: ValueType) -> Option<Conversion> {
        use ValueType as V;

        let conversion = match (column_type, target) {
            (ColumnType::Char, V::String) => Conversion::TrimTrailingSpaces,
            (ColumnType::VarChar | ColumnType::LongVarChar, V::String) => Conversion::Direct,
            (ColumnType::Clob, V::String) => Conversion::ClobText,

            (ColumnType::Numeric, V::Decimal) => Conversion::Direct,
            (ColumnType::Numeric, t) if t.is_integer() || t.is_float() => Conversion::Numeric,

            (c, t) if c.is_integer() && t.is_integer() => Conversion::Direct,
            (c, t) if c.is_integer() && (t.is_float() || t == V::Decimal) => Conversion::Numeric,

            (ColumnType::Double, V::F64 | V::F32) => Conversion::Direct,
            (ColumnType::Double, V::Decimal) => Conversion::Numeric,

            (ColumnType::Boolean, V::Bool) => Conversion::Direct,
            (ColumnType::Time, V::Time) => Conversion::Direct,

            (ColumnType::Date, V::Date) => Conversion::Direct,
            (ColumnType::Date, V::Timestamp | V::I64) => Conversion::Temporal,
            (ColumnType::Timestamp, V::Timestamp) => Conversion::Direct,
            (ColumnType::Timestamp, V::Date | V::I64) => Conversion::Temporal,

            (ColumnType::Binary | ColumnType::VarBinary | ColumnType::Blob, V::Bytes) => {
                Conversion::Direct
            }

            _ => return None,
        };
        Some(conversion)
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, Conversion::Direct)
    }

    /// Convert one cursor value; NULL always passes through
    pub fn apply(&self, value: Value, target: ValueType) -> Result<Value, ConversionError> {
        if value.is_null() {
            return Ok(value);
        }

        match self {
            Conversion::Direct => Ok(value),
            Conversion::TrimTrailingSpaces => match value {
                Value::Text(mut text) => {
                    let trimmed = text.trim_end_matches(' ').len();
                    text.truncate(trimmed);
                    Ok(Value::Text(text))
                }
                other => Err(ConversionError::mismatch(&other, target)),
            },
            Conversion::Numeric | Conversion::Temporal => value.coerce(target),
            Conversion::ClobText => match value {
                Value::Bytes(bytes) => String::from_utf8(bytes)
                    .map(Value::Text)
                    .map_err(|_| ConversionError::InvalidUtf8),
                Value::Text(text) => Ok(Value::Text(text)),
                other => Err(ConversionError::mismatch(&other, target)),
            },
        }
    }
}

/// Best-effort conversion used when no plan has been built
///
/// Picks the matrix entry when there is one and otherwise falls back to `Value::coerce`.
pub fn convert_at_runtime(
    value: Value,
    column_type: &ColumnType,
    target: ValueType,
) -> Result<Value, ConversionError> {
    match Conversion::select(column_type, target) {
        Some(conversion) => conversion.apply(value, target),
        None => value.coerce(target),
    }
}
