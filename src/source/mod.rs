//! Contracts with the data-access layer
//!
//! The mapper never executes statements itself. Whatever runs the query hands it
//! column metadata and a sequential cursor through the types in this module.

pub mod column_type;
pub mod memory;

use std::io::Read;

use thiserror::Error;

use crate::entity::Value;
pub use column_type::ColumnType;
pub use memory::MemoryResultSet;

/// Failure reported by the data-access layer
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SourceError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        SourceError {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SourceError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Metadata of one result column
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ColumnMeta {
    /// Display label (alias if the query gave one)
    pub label: String,
    /// Owning table, empty when the driver cannot tell
    pub table_name: String,
    /// Bare column name
    pub column_name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl ColumnMeta {
    /// Column whose label and bare name are the same and whose table is unknown
    pub fn new(label: impl Into<String>, column_type: ColumnType) -> Self {
        let label = label.into();
        ColumnMeta {
            column_name: label.clone(),
            label,
            table_name: String::new(),
            column_type,
            nullable: true,
        }
    }

    pub fn with_table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn with_column_name(mut self, column_name: impl Into<String>) -> Self {
        self.column_name = column_name.into();
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Sequential, single-consumer view over the rows of one executed query
pub trait ResultCursor {
    fn columns(&self) -> &[ColumnMeta];

    /// Move to the next row; false once the rows are exhausted
    fn advance(&mut self) -> Result<bool, SourceError>;

    /// Read column `index` (0-based) of the current row as `column_type`
    ///
    /// Absent values are returned as `Value::Null`.
    fn read(&mut self, index: usize, column_type: &ColumnType) -> Result<Value, SourceError>;

    /// Open a large object column for streaming; None when the value is NULL
    fn lob(&mut self, index: usize) -> Result<Option<Box<dyn Read + '_>>, SourceError>;
}
