//! Mapping plans
//!
//! A `MappingPlan` is built once per (query shape, target type) pair and then
//! executed for every row. It holds two ordered instruction lists:
//!
//! - **graph guards**: instantiate intermediate nested objects, shallowest first
//!   and lexicographic at equal depth, so a parent always exists before a child
//! - **setters**: one per matched column, in column order
//!
//! Columns that match no property are ignored. A matched column whose type cannot
//! be converted to the property type aborts the build.

pub mod conversion;
pub mod errors;
pub mod materializer;
pub mod reflective;

use std::any::{type_name, TypeId};
use std::collections::HashSet;

use serde::Serialize;

use crate::entity::{Entity, ValueType};
use crate::matcher::path::dotted;
use crate::matcher::{PropertyMatcher, PropertyNode, PropertyPath};
use crate::source::{ColumnMeta, ColumnType};
pub use conversion::Conversion;
pub use errors::{MappingPlanError, MaterializeError};
pub use reflective::ReflectiveMaterializer;

/// Instantiates one intermediate object on the way to a leaf
#[derive(Debug, Clone)]
pub struct GraphGuard {
    key: String,
    nodes: Vec<PropertyNode>,
}

impl GraphGuard {
    /// Dotted path of the nested property, e.g. `customer.billing_address`
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn depth(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn nodes(&self) -> &[PropertyNode] {
        &self.nodes
    }
}

/// Writes one column into one leaf property
#[derive(Debug, Clone)]
pub struct SetterInstruction {
    column_index: usize,
    column_label: String,
    column_type: ColumnType,
    nullable: bool,
    path: PropertyPath,
    value_type: ValueType,
    conversion: Conversion,
}

impl SetterInstruction {
    pub fn column_index(&self) -> usize {
        self.column_index
    }

    pub fn column_label(&self) -> &str {
        &self.column_label
    }

    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn conversion(&self) -> Conversion {
        self.conversion
    }
}

/// Compiled guards and setters for one (query, target type) pair
#[derive(Debug, Clone)]
pub struct MappingPlan {
    type_id: TypeId,
    type_name: &'static str,
    guards: Vec<GraphGuard>,
    setters: Vec<SetterInstruction>,
    ignored_columns: Vec<String>,
}

impl MappingPlan {
    /// Build the plan mapping `columns` onto `T`
    ///
    /// # Example
    ///
    /// ```ignore
    /// let matcher = PropertyMatcher::for_type::<OrderLine>();
    /// let plan = MappingPlan::build::<OrderLine>(&matcher, cursor.columns())?;
    /// let line: OrderLine = plan.materialize(&mut cursor, limit)?;
    /// ```
    pub fn build<T: Entity>(
        matcher: &PropertyMatcher,
        columns: &[ColumnMeta],
    ) -> Result<Self, MappingPlanError> {
        let mut guards = Vec::new();
        let mut guard_keys = HashSet::new();
        let mut setters = Vec::new();
        let mut ignored_columns = Vec::new();

        for (index, column) in columns.iter().enumerate() {
            let Some(path) = matcher.match_meta(column) else {
                ignored_columns.push(column.label.clone());
                continue;
            };

            let value_type = path.value_type().ok_or_else(|| MappingPlanError::NotWritable {
                property: path.dotted_name(),
                column: column.label.clone(),
            })?;

            let conversion = Conversion::select(&column.column_type, value_type).ok_or_else(|| {
                MappingPlanError::UnsupportedConversion {
                    property: path.dotted_name(),
                    column: column.label.clone(),
                    column_type: column.column_type.clone(),
                    value_type,
                }
            })?;

            for depth in 1..path.len() {
                let nodes = &path.nodes()[..depth];
                let key = dotted(nodes);
                if guard_keys.insert(key.clone()) {
                    guards.push(GraphGuard {
                        key,
                        nodes: nodes.to_vec(),
                    });
                }
            }

            if let Some(previous) = setters
                .iter()
                .find(|s: &&SetterInstruction| s.path == path)
            {
                log::debug!(
                    "Columns {} and {} both map to {}; the later column wins",
                    previous.column_label,
                    column.label,
                    path
                );
            }

            setters.push(SetterInstruction {
                column_index: index,
                column_label: column.label.clone(),
                column_type: column.column_type.clone(),
                nullable: column.nullable,
                path,
                value_type,
                conversion,
            });
        }

        guards.sort_by(|a, b| a.depth().cmp(&b.depth()).then_with(|| a.key.cmp(&b.key)));

        log::debug!(
            "Built mapping plan for {}: {} setters, {} guards, {} ignored columns",
            type_name::<T>(),
            setters.len(),
            guards.len(),
            ignored_columns.len()
        );
        if !ignored_columns.is_empty() {
            log::debug!("Unmatched columns for {}: {:?}", type_name::<T>(), ignored_columns);
        }

        Ok(MappingPlan {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            guards,
            setters,
            ignored_columns,
        })
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn guards(&self) -> &[GraphGuard] {
        &self.guards
    }

    pub fn setters(&self) -> &[SetterInstruction] {
        &self.setters
    }

    /// Labels of the columns no property matched
    pub fn ignored_columns(&self) -> &[String] {
        &self.ignored_columns
    }

    /// Serializable overview, used by logging and the CLI
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            target: self.type_name.to_string(),
            guards: self.guards.iter().map(|g| g.key.clone()).collect(),
            setters: self
                .setters
                .iter()
                .map(|s| SetterSummary {
                    column: s.column_label.clone(),
                    property: s.path.dotted_name(),
                    column_type: s.column_type.clone(),
                    value_type: s.value_type,
                    conversion: s.conversion,
                })
                .collect(),
            ignored_columns: self.ignored_columns.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub target: String,
    pub guards: Vec<String>,
    pub setters: Vec<SetterSummary>,
    pub ignored_columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetterSummary {
    pub column: String,
    pub property: String,
    pub column_type: ColumnType,
    pub value_type: ValueType,
    pub conversion: Conversion,
}
