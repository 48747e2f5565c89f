//! resultmap - Convention-based mapping of SQL query results onto Rust types
//!
//! This crate provides:
//! - Named parameter rewriting (`:name` to positional `?`, with list expansion)
//! - Column-to-property matching by naming convention, including nested properties
//! - Mapping plans that convert and assign each column, built once per query and type
//! - An LRU cache of mapping plans
//!
//! Statement execution is left to the caller; rows are read through the
//! [`source::ResultCursor`] trait.

pub mod cache;
pub mod config;
pub mod entity;
pub mod mapper;
pub mod matcher;
pub mod param_parser;
pub mod plan;
pub mod source;

pub use cache::{CacheMetrics, MapperCache, MapperCacheConfig, MapperCacheKey};
pub use config::{ConfigError, MapperConfig};
pub use entity::{Entity, LeafValue, TypeDescriptor, Value, ValueType};
pub use mapper::{MappingError, QueryMapper};
pub use matcher::{PropertyMatcher, PropertyPath};
pub use param_parser::{BatchStatement, ParamValue, ParameterParseError, ParsedQuery};
pub use plan::{MappingPlan, MappingPlanError, MaterializeError};
pub use source::{ColumnMeta, ColumnType, MemoryResultSet, ResultCursor, SourceError};
