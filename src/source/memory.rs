//! Vector-backed result cursor
//!
//! Useful for tests, tooling, and callers that already hold rows in memory.

use std::io::{Cursor, Read};

use super::{ColumnMeta, ColumnType, ResultCursor, SourceError};
use crate::entity::Value;

#[derive(Debug, Clone, Default)]
pub struct MemoryResultSet {
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<Value>>,
    /// Index of the current row; None before the first `advance`
    current: Option<usize>,
}

impl MemoryResultSet {
    pub fn new(columns: Vec<ColumnMeta>) -> Self {
        MemoryResultSet {
            columns,
            rows: Vec::new(),
            current: None,
        }
    }

    /// Append a row; it must have one value per column
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), SourceError> {
        if row.len() != self.columns.len() {
            return Err(SourceError::new(format!(
                "row has {} values but the result has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn with_row(mut self, row: Vec<Value>) -> Result<Self, SourceError> {
        self.push_row(row)?;
        Ok(self)
    }

    fn cell(&self, index: usize) -> Result<&Value, SourceError> {
        let row = self
            .current
            .and_then(|r| self.rows.get(r))
            .ok_or_else(|| SourceError::new("cursor is not positioned on a row"))?;
        row.get(index)
            .ok_or_else(|| SourceError::new(format!("column index {} out of range", index)))
    }
}

impl ResultCursor for MemoryResultSet {
    fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    fn advance(&mut self) -> Result<bool, SourceError> {
        let next = self.current.map_or(0, |r| r + 1);
        self.current = Some(next.min(self.rows.len()));
        Ok(next < self.rows.len())
    }

    fn read(&mut self, index: usize, _column_type: &ColumnType) -> Result<Value, SourceError> {
        self.cell(index).cloned()
    }

    fn lob(&mut self, index: usize) -> Result<Option<Box<dyn Read + '_>>, SourceError> {
        match self.cell(index)? {
            Value::Null => Ok(None),
            Value::Bytes(bytes) => Ok(Some(Box::new(Cursor::new(bytes.as_slice())))),
            Value::Text(text) => Ok(Some(Box::new(Cursor::new(text.as_bytes())))),
            other => Err(SourceError::new(format!(
                "column {} holds a {} value, not a large object",
                index,
                other.kind_name()
            ))),
        }
    }
}
