use thiserror::Error;

use crate::entity::{ConversionError, ValueType};
use crate::source::{ColumnType, SourceError};

/// Errors raised while building a mapping plan
///
/// These mean the query and the target type are incompatible; they are never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingPlanError {
    #[error(
        "Column {column} of type {column_type} cannot be assigned to property {property} ({value_type})"
    )]
    UnsupportedConversion {
        property: String,
        column: String,
        column_type: ColumnType,
        value_type: ValueType,
    },

    #[error("Property {property} matched by column {column} is not writable")]
    NotWritable { property: String, column: String },
}

/// Errors raised while turning one row into an instance
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("Failed to advance the result cursor: {0}")]
    Cursor(#[from] SourceError),

    #[error("Failed to read column {column}: {source}")]
    Read {
        column: String,
        #[source]
        source: SourceError,
    },

    #[error("Failed to set property {property} from column {column}: {source}")]
    Setter {
        property: String,
        column: String,
        #[source]
        source: ConversionError,
    },

    #[error("Column {column} is declared NOT NULL but returned NULL")]
    UnexpectedNull { column: String },

    #[error("Large object in column {column} exceeds the {limit} byte limit")]
    LobTooLarge { column: String, limit: u64 },

    #[error("Failed to stream large object column {column}: {source}")]
    LobIo {
        column: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Nested property {path} could not be instantiated")]
    Guard { path: String },

    #[error("Mapping plan targets {expected}, not {found}")]
    WrongTarget {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Row hook failed: {0}")]
    Hook(#[source] SourceError),
}
