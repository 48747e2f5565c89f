//! Row materialization
//!
//! Executes a [`MappingPlan`] against the current row of a cursor: allocate the
//! root through `Default`, run the graph guards, then run the setters in column order.

use std::any::{type_name, Any, TypeId};
use std::io::Read;

use super::{GraphGuard, MappingPlan, MaterializeError, SetterInstruction};
use crate::entity::{Entity, Value};
use crate::matcher::PropertyNode;
use crate::source::{ColumnType, ResultCursor, SourceError};

impl MappingPlan {
    /// Map the cursor's current row onto a new `T`
    pub fn materialize<T, C>(&self, cursor: &mut C, lob_limit: u64) -> Result<T, MaterializeError>
    where
        T: Entity,
        C: ResultCursor + ?Sized,
    {
        if self.type_id != TypeId::of::<T>() {
            return Err(MaterializeError::WrongTarget {
                expected: self.type_name,
                found: type_name::<T>(),
            });
        }

        let mut instance = T::default();
        let root: &mut dyn Any = &mut instance;

        for guard in &self.guards {
            run_guard(root, guard)?;
        }
        for setter in &self.setters {
            run_setter(root, setter, cursor, lob_limit)?;
        }

        Ok(instance)
    }

    /// Map the current row, then hand the instance and the cursor to `hook`
    pub fn materialize_with<T, C, H>(
        &self,
        cursor: &mut C,
        lob_limit: u64,
        hook: &mut H,
    ) -> Result<T, MaterializeError>
    where
        T: Entity,
        C: ResultCursor + ?Sized,
        H: FnMut(&mut T, &mut C) -> Result<(), SourceError>,
    {
        let mut instance = self.materialize::<T, C>(cursor, lob_limit)?;
        hook(&mut instance, cursor).map_err(MaterializeError::Hook)?;
        Ok(instance)
    }
}

/// Walk `parents` from `root`, None when an intermediate object is missing
pub(crate) fn navigate<'a>(
    root: &'a mut dyn Any,
    parents: &[PropertyNode],
) -> Option<&'a mut dyn Any> {
    let mut current = root;
    for node in parents {
        current = node.access(current)?;
    }
    Some(current)
}

fn run_guard(root: &mut dyn Any, guard: &GraphGuard) -> Result<(), MaterializeError> {
    let nodes = guard.nodes();
    let Some((last, parents)) = nodes.split_last() else {
        return Ok(());
    };
    let owner = navigate(root, parents).ok_or_else(|| MaterializeError::Guard {
        path: guard.key().to_string(),
    })?;
    last.ensure(owner);
    Ok(())
}

fn run_setter<C>(
    root: &mut dyn Any,
    setter: &SetterInstruction,
    cursor: &mut C,
    lob_limit: u64,
) -> Result<(), MaterializeError>
where
    C: ResultCursor + ?Sized,
{
    let raw = read_value(
        cursor,
        setter.column_index,
        &setter.column_type,
        &setter.column_label,
        lob_limit,
    )?;

    if raw.is_null() && !setter.nullable {
        return Err(MaterializeError::UnexpectedNull {
            column: setter.column_label.clone(),
        });
    }

    let setter_error = |source| MaterializeError::Setter {
        property: setter.path.dotted_name(),
        column: setter.column_label.clone(),
        source,
    };

    let value = setter
        .conversion
        .apply(raw, setter.value_type)
        .map_err(setter_error)?;

    let owner = navigate(root, setter.path.parents()).ok_or_else(|| MaterializeError::Guard {
        path: setter.path.dotted_name(),
    })?;
    setter.path.leaf().set(owner, value).map_err(setter_error)
}

/// Read one cell, streaming large objects up to `lob_limit` bytes
pub(crate) fn read_value<C>(
    cursor: &mut C,
    index: usize,
    column_type: &ColumnType,
    column: &str,
    lob_limit: u64,
) -> Result<Value, MaterializeError>
where
    C: ResultCursor + ?Sized,
{
    if column_type.is_lob() {
        return read_lob(cursor, index, column, lob_limit);
    }
    cursor
        .read(index, column_type)
        .map_err(|source| MaterializeError::Read {
            column: column.to_string(),
            source,
        })
}

fn read_lob<C>(
    cursor: &mut C,
    index: usize,
    column: &str,
    limit: u64,
) -> Result<Value, MaterializeError>
where
    C: ResultCursor + ?Sized,
{
    let reader = cursor.lob(index).map_err(|source| MaterializeError::Read {
        column: column.to_string(),
        source,
    })?;
    let Some(reader) = reader else {
        return Ok(Value::Null);
    };

    // One byte past the limit is enough to tell an oversized object apart
    let mut buf = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|source| MaterializeError::LobIo {
            column: column.to_string(),
            source,
        })?;

    if buf.len() as u64 > limit {
        return Err(MaterializeError::LobTooLarge {
            column: column.to_string(),
            limit,
        });
    }
    Ok(Value::Bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::fixtures::{OrderLine, PartInformation, Supplier};
    use crate::entity::ConversionError;
    use crate::matcher::PropertyMatcher;
    use crate::source::{ColumnMeta, MemoryResultSet, SourceError};
    use rust_decimal::Decimal;

    const LIMIT: u64 = 1024;

    fn plan_and_rows(columns: Vec<ColumnMeta>, rows: Vec<Vec<Value>>) -> (MappingPlan, MemoryResultSet) {
        let matcher = PropertyMatcher::for_type::<OrderLine>();
        let plan = MappingPlan::build::<OrderLine>(&matcher, &columns).unwrap();
        let mut rs = MemoryResultSet::new(columns);
        for row in rows {
            rs.push_row(row).unwrap();
        }
        (plan, rs)
    }

    #[test]
    fn test_nested_objects_are_instantiated_before_setters() {
        let (plan, mut rs) = plan_and_rows(
            vec![
                ColumnMeta::new("LINE_NO", ColumnType::Integer),
                ColumnMeta::new("PART_DESCRIPTION", ColumnType::Char),
            ],
            vec![vec![Value::Int(3), Value::Text("FAB   ".to_string())]],
        );
        rs.advance().unwrap();

        let line: OrderLine = plan.materialize(&mut rs, LIMIT).unwrap();
        assert_eq!(line.line_no, 3);
        assert_eq!(
            line.part,
            Some(PartInformation {
                description: Some("FAB".to_string()),
                ..Default::default()
            })
        );
        assert_eq!(line.supplier, None);
    }

    #[test]
    fn test_guard_runs_even_when_value_is_null() {
        let (plan, mut rs) = plan_and_rows(
            vec![ColumnMeta::new("SUPPLIER_NAME", ColumnType::VarChar)],
            vec![vec![Value::Null]],
        );
        rs.advance().unwrap();

        let line: OrderLine = plan.materialize(&mut rs, LIMIT).unwrap();
        assert_eq!(line.supplier, Some(Supplier::default()));
    }

    #[test]
    fn test_nullable_numeric_null_becomes_zero_or_none() {
        let (plan, mut rs) = plan_and_rows(
            vec![
                ColumnMeta::new("LINE_NO", ColumnType::Numeric),
                ColumnMeta::new("QUANTITY", ColumnType::Numeric),
                ColumnMeta::new("RATING", ColumnType::Numeric),
            ],
            vec![vec![Value::Null, Value::Null, Value::Null]],
        );
        rs.advance().unwrap();

        let line: OrderLine = plan.materialize(&mut rs, LIMIT).unwrap();
        assert_eq!(line.line_no, 0);
        assert_eq!(line.quantity, None);
        assert_eq!(line.supplier.unwrap().rating, None);
    }

    #[test]
    fn test_numeric_values_are_converted() {
        let (plan, mut rs) = plan_and_rows(
            vec![
                ColumnMeta::new("LINE_NO", ColumnType::Numeric),
                ColumnMeta::new("QUANTITY", ColumnType::Numeric),
                ColumnMeta::new("PART_WEIGHT", ColumnType::Numeric),
            ],
            vec![vec![
                Value::Decimal(Decimal::new(70, 1)),
                Value::Decimal(Decimal::new(1250, 2)),
                Value::Decimal(Decimal::new(25, 1)),
            ]],
        );
        rs.advance().unwrap();

        let line: OrderLine = plan.materialize(&mut rs, LIMIT).unwrap();
        assert_eq!(line.line_no, 7);
        assert_eq!(line.quantity, Some(Decimal::new(1250, 2)));
        assert_eq!(line.part.unwrap().weight, 2.5);
    }

    #[test]
    fn test_not_null_column_returning_null_fails() {
        let (plan, mut rs) = plan_and_rows(
            vec![ColumnMeta::new("LINE_NO", ColumnType::Integer).not_null()],
            vec![vec![Value::Null]],
        );
        rs.advance().unwrap();

        let err = plan.materialize::<OrderLine, _>(&mut rs, LIMIT).unwrap_err();
        assert!(matches!(err, MaterializeError::UnexpectedNull { ref column } if column == "LINE_NO"));
    }

    #[test]
    fn test_setter_failure_names_property_and_column() {
        let (plan, mut rs) = plan_and_rows(
            vec![ColumnMeta::new("LINE_NO", ColumnType::BigInt)],
            vec![vec![Value::Int(i64::MAX)]],
        );
        rs.advance().unwrap();

        match plan.materialize::<OrderLine, _>(&mut rs, LIMIT) {
            Err(MaterializeError::Setter {
                property,
                column,
                source,
            }) => {
                assert_eq!(property, "line_no");
                assert_eq!(column, "LINE_NO");
                assert!(matches!(source, ConversionError::OutOfRange { .. }));
            }
            other => panic!("expected a setter error, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_target_type_is_rejected() {
        let (plan, mut rs) = plan_and_rows(
            vec![ColumnMeta::new("LINE_NO", ColumnType::Integer)],
            vec![vec![Value::Int(1)]],
        );
        rs.advance().unwrap();

        let err = plan.materialize::<Supplier, _>(&mut rs, LIMIT).unwrap_err();
        assert!(matches!(err, MaterializeError::WrongTarget { .. }));
    }

    #[test]
    fn test_lob_limit_is_enforced() {
        let columns = vec![ColumnMeta::new("DATA", ColumnType::Blob)];
        let mut rs = MemoryResultSet::new(columns.clone())
            .with_row(vec![Value::Bytes(vec![0; 16])])
            .unwrap();
        rs.advance().unwrap();

        assert_eq!(
            read_value(&mut rs, 0, &ColumnType::Blob, "DATA", 16).unwrap(),
            Value::Bytes(vec![0; 16])
        );
        let err = read_value(&mut rs, 0, &ColumnType::Blob, "DATA", 15).unwrap_err();
        assert!(matches!(err, MaterializeError::LobTooLarge { limit: 15, .. }));
    }

    #[test]
    fn test_hook_sees_populated_instance() {
        let (plan, mut rs) = plan_and_rows(
            vec![
                ColumnMeta::new("LINE_NO", ColumnType::Integer),
                ColumnMeta::new("EXTRA", ColumnType::VarChar),
            ],
            vec![vec![Value::Int(9), Value::Text("note".to_string())]],
        );
        rs.advance().unwrap();

        let mut hook = |line: &mut OrderLine, cursor: &mut MemoryResultSet| -> Result<(), SourceError> {
            assert_eq!(line.line_no, 9);
            if let Value::Text(extra) = cursor.read(1, &ColumnType::VarChar)? {
                line.description = Some(extra);
            }
            Ok(())
        };
        let line: OrderLine = plan.materialize_with(&mut rs, LIMIT, &mut hook).unwrap();
        assert_eq!(line.description.as_deref(), Some("note"));
    }
}
