//! Result column type categories
//!
//! The plan builder only needs to know which family a column belongs to, so
//! vendor types are folded into a small set of categories.
//!
//! # Categories
//!
//! - `Char` - fixed-width text (CHAR, NCHAR); right-trimmed when mapped
//! - `VarChar`, `LongVarChar` - variable-width text
//! - `Clob` - large character object, streamed
//! - `Numeric` - exact decimal (NUMERIC, DECIMAL, NUMBER)
//! - `Double` - floating point (FLOAT, REAL, DOUBLE)
//! - `TinyInt`, `SmallInt`, `Integer`, `BigInt` - integers
//! - `Boolean`, `Date`, `Time`, `Timestamp`
//! - `Binary`, `VarBinary` - byte sequences
//! - `Blob` - large binary object, streamed

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnType {
    Char,
    VarChar,
    LongVarChar,
    Clob,
    Numeric,
    Double,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Boolean,
    Date,
    Time,
    Timestamp,
    Binary,
    VarBinary,
    Blob,
    /// Anything the mapper has no conversion for
    Other(String),
}

impl ColumnType {
    /// Map a vendor type name to a category
    ///
    /// Case-insensitive; precision/length suffixes such as `(10,2)` are ignored.
    ///
    /// # Example
    ///
    /// ```ignore
    /// assert_eq!(ColumnType::from_name("CHAR(6)"), ColumnType::Char);
    /// assert_eq!(ColumnType::from_name("number(12,2)"), ColumnType::Numeric);
    /// assert_eq!(ColumnType::from_name("geometry"), ColumnType::Other("geometry".to_string()));
    /// ```
    pub fn from_name(type_name: &str) -> ColumnType {
        let normalized = type_name.trim().to_lowercase();
        let base = normalized
            .split('(')
            .next()
            .unwrap_or_default()
            .trim();

        match base {
            "char" | "nchar" | "character" | "bpchar" => ColumnType::Char,
            "varchar" | "varchar2" | "nvarchar" | "nvarchar2" | "character varying" | "string" => {
                ColumnType::VarChar
            }
            "text" | "longvarchar" | "long varchar" | "mediumtext" | "longtext" => {
                ColumnType::LongVarChar
            }
            "clob" | "nclob" => ColumnType::Clob,
            "numeric" | "decimal" | "number" | "dec" => ColumnType::Numeric,
            "float" | "real" | "double" | "double precision" | "float4" | "float8" => {
                ColumnType::Double
            }
            "tinyint" => ColumnType::TinyInt,
            "smallint" | "int2" => ColumnType::SmallInt,
            "integer" | "int" | "int4" | "mediumint" => ColumnType::Integer,
            "bigint" | "int8" => ColumnType::BigInt,
            "boolean" | "bool" | "bit" => ColumnType::Boolean,
            "date" => ColumnType::Date,
            "time" => ColumnType::Time,
            "timestamp" | "datetime" | "timestamp without time zone" => ColumnType::Timestamp,
            "binary" => ColumnType::Binary,
            "varbinary" | "bytea" | "raw" => ColumnType::VarBinary,
            "blob" | "longblob" | "long raw" => ColumnType::Blob,
            _ => ColumnType::Other(type_name.trim().to_string()),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self,
            ColumnType::Char | ColumnType::VarChar | ColumnType::LongVarChar
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::TinyInt | ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt
        )
    }

    /// Large objects are streamed through `ResultCursor::lob`
    pub fn is_lob(&self) -> bool {
        matches!(self, ColumnType::Clob | ColumnType::Blob)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::Char => "CHAR",
            ColumnType::VarChar => "VARCHAR",
            ColumnType::LongVarChar => "LONGVARCHAR",
            ColumnType::Clob => "CLOB",
            ColumnType::Numeric => "NUMERIC",
            ColumnType::Double => "DOUBLE",
            ColumnType::TinyInt => "TINYINT",
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Date => "DATE",
            ColumnType::Time => "TIME",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Binary => "BINARY",
            ColumnType::VarBinary => "VARBINARY",
            ColumnType::Blob => "BLOB",
            ColumnType::Other(name) => name,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
