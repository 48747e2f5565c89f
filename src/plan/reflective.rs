//! Uncompiled materializer
//!
//! Used for queries carrying the `/*-codeGen*/` marker. Columns are matched once per
//! call, but nothing is checked up front: every value is converted at runtime, and
//! a value that cannot be converted fails the row just as a compiled setter would.

use std::any::Any;

use super::conversion::convert_at_runtime;
use super::materializer::{navigate, read_value};
use super::MaterializeError;
use crate::entity::{Entity, ValueType};
use crate::matcher::{PropertyMatcher, PropertyPath};
use crate::source::{ColumnMeta, ResultCursor};

/// Marker comment that routes a query through [`ReflectiveMaterializer`]
pub const CODEGEN_MARKER: &str = "/*-codeGen*/";

pub fn has_codegen_marker(query_text: &str) -> bool {
    query_text.contains(CODEGEN_MARKER)
}

#[derive(Debug, Clone)]
struct Binding {
    column: ColumnMeta,
    index: usize,
    path: PropertyPath,
    value_type: ValueType,
}

#[derive(Debug, Clone)]
pub struct ReflectiveMaterializer {
    bindings: Vec<Binding>,
}

impl ReflectiveMaterializer {
    pub fn new(matcher: &PropertyMatcher, columns: &[ColumnMeta]) -> Self {
        let bindings = columns
            .iter()
            .enumerate()
            .filter_map(|(index, column)| {
                let path = matcher.match_meta(column)?;
                let value_type = path.value_type()?;
                Some(Binding {
                    column: column.clone(),
                    index,
                    path,
                    value_type,
                })
            })
            .collect();

        ReflectiveMaterializer { bindings }
    }

    /// Matched properties, in column order
    pub fn properties(&self) -> Vec<String> {
        self.bindings.iter().map(|b| b.path.dotted_name()).collect()
    }

    /// Map the cursor's current row onto a new `T`
    pub fn materialize<T, C>(&self, cursor: &mut C, lob_limit: u64) -> Result<T, MaterializeError>
    where
        T: Entity,
        C: ResultCursor + ?Sized,
    {
        let mut instance = T::default();
        let root: &mut dyn Any = &mut instance;

        for binding in &self.bindings {
            let raw = read_value(
                cursor,
                binding.index,
                &binding.column.column_type,
                &binding.column.label,
                lob_limit,
            )?;

            if raw.is_null() && !binding.column.nullable {
                return Err(MaterializeError::UnexpectedNull {
                    column: binding.column.label.clone(),
                });
            }

            let setter_error = |source| MaterializeError::Setter {
                property: binding.path.dotted_name(),
                column: binding.column.label.clone(),
                source,
            };

            let value = convert_at_runtime(raw, &binding.column.column_type, binding.value_type)
                .map_err(setter_error)?;

            let parents = binding.path.parents();
            for depth in 0..parents.len() {
                let owner = navigate(root, &parents[..depth]).ok_or_else(|| MaterializeError::Guard {
                    path: binding.path.dotted_name(),
                })?;
                parents[depth].ensure(owner);
            }
            let owner = navigate(root, parents).ok_or_else(|| MaterializeError::Guard {
                path: binding.path.dotted_name(),
            })?;

            binding.path.leaf().set(owner, value).map_err(setter_error)?;
        }

        Ok(instance)
    }
}
