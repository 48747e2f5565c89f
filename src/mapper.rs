//! Query mapper facade
//!
//! Ties the pieces together for callers that own a data-access layer:
//!
//! 1. `parse` rewrites named parameters before execution
//! 2. after execution, `map_rows` looks up (or builds and caches) the mapping plan
//!    for the query text and target type, then materializes every row
//!
//! One `QueryMapper` is meant to be created at startup and shared by reference.
//!
//! ```ignore
//! let mapper = QueryMapper::from_env()?;
//! let parsed = mapper.parse(sql, [("PART_LIST", ParamValue::list(["123456", "123789"]))])?;
//! let mut cursor = db.execute(parsed.sql(), &parsed.positional_values())?;
//! let lines: Vec<OrderLine> = mapper.map_rows(parsed.original(), &mut cursor)?;
//! ```

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use crate::cache::{MapperCache, MapperCacheKey};
use crate::config::{ConfigError, MapperConfig};
use crate::entity::Entity;
use crate::matcher::PropertyMatcher;
use crate::param_parser::{BatchStatement, ParamValue, ParameterParseError, ParsedQuery};
use crate::plan::reflective::has_codegen_marker;
use crate::plan::{MappingPlan, MappingPlanError, MaterializeError, ReflectiveMaterializer};
use crate::source::{ColumnMeta, ResultCursor, SourceError};

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Parameter error: {0}")]
    Parse(#[from] ParameterParseError),

    #[error("Mapping plan error: {0}")]
    Plan(#[from] MappingPlanError),

    #[error("Materialization error: {0}")]
    Materialize(#[from] MaterializeError),

    #[error("Data source error: {0}")]
    Source(#[from] SourceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub struct QueryMapper {
    config: MapperConfig,
    cache: MapperCache,
    matchers: RwLock<HashMap<TypeId, Arc<PropertyMatcher>>>,
}

impl QueryMapper {
    pub fn new(config: MapperConfig) -> Self {
        log::info!(
            "Query mapper ready (plan cache {}, {} entries max, LOB limit {} bytes)",
            if config.cache.enabled { "enabled" } else { "disabled" },
            config.cache.max_entries,
            config.lob_max_bytes
        );
        QueryMapper {
            cache: MapperCache::new(config.cache.clone()),
            config,
            matchers: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_env() -> Result<Self, MappingError> {
        Ok(Self::new(MapperConfig::from_env()?))
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn cache(&self) -> &MapperCache {
        &self.cache
    }

    /// Rewrite named parameters into positional placeholders
    pub fn parse<I, K, V>(&self, sql: &str, values: I) -> Result<ParsedQuery, MappingError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        Ok(ParsedQuery::parse(sql, values)?)
    }

    /// Parse a statement to be executed repeatedly with different values
    pub fn parse_template<I, K, V>(&self, sql: &str, values: I) -> Result<BatchStatement, MappingError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        Ok(BatchStatement::parse(sql, values)?)
    }

    /// Matcher for `T`, indexed on first use
    pub fn matcher<T: Entity>(&self) -> Arc<PropertyMatcher> {
        let type_id = TypeId::of::<T>();
        if let Some(matcher) = self
            .matchers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
        {
            return Arc::clone(matcher);
        }

        let matcher = Arc::new(PropertyMatcher::for_type::<T>());
        let mut matchers = self.matchers.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(matchers.entry(type_id).or_insert(matcher))
    }

    /// Cached plan mapping `columns` of `query_text` onto `T`
    ///
    /// The cache key is the query text exactly as given, so pass the same form
    /// (original or rewritten) every time.
    pub fn plan_for<T: Entity>(
        &self,
        query_text: &str,
        columns: &[ColumnMeta],
    ) -> Result<Arc<MappingPlan>, MappingError> {
        let key = MapperCacheKey::new::<T>(query_text);
        let plan = self.cache.get_or_build(key, || {
            let matcher = self.matcher::<T>();
            MappingPlan::build::<T>(&matcher, columns)
        })?;
        Ok(plan)
    }

    /// Materialize every remaining row of `cursor`
    pub fn map_rows<T, C>(&self, query_text: &str, cursor: &mut C) -> Result<Vec<T>, MappingError>
    where
        T: Entity,
        C: ResultCursor + ?Sized,
    {
        self.map_rows_with(query_text, cursor, |_: &mut T, _: &mut C| Ok(()))
    }

    /// Materialize every remaining row, passing each instance and the cursor to `hook`
    ///
    /// The hook runs after the plan's setters, so it can fill in properties the
    /// matcher cannot derive from column names.
    pub fn map_rows_with<T, C, H>(
        &self,
        query_text: &str,
        cursor: &mut C,
        hook: H,
    ) -> Result<Vec<T>, MappingError>
    where
        T: Entity,
        C: ResultCursor + ?Sized,
        H: FnMut(&mut T, &mut C) -> Result<(), SourceError>,
    {
        let mut rows = Vec::new();
        self.drive(query_text, cursor, hook, |row| rows.push(row))?;
        Ok(rows)
    }

    /// Stream rows into `sink` without collecting them; returns the row count
    pub fn for_each_row<T, C, S>(
        &self,
        query_text: &str,
        cursor: &mut C,
        sink: S,
    ) -> Result<usize, MappingError>
    where
        T: Entity,
        C: ResultCursor + ?Sized,
        S: FnMut(T),
    {
        self.drive(query_text, cursor, |_: &mut T, _: &mut C| Ok(()), sink)
    }

    fn drive<T, C, H, S>(
        &self,
        query_text: &str,
        cursor: &mut C,
        mut hook: H,
        mut sink: S,
    ) -> Result<usize, MappingError>
    where
        T: Entity,
        C: ResultCursor + ?Sized,
        H: FnMut(&mut T, &mut C) -> Result<(), SourceError>,
        S: FnMut(T),
    {
        let limit = self.config.lob_max_bytes;
        let mut count = 0;

        if has_codegen_marker(query_text) {
            log::debug!("Query carries the codeGen marker; mapping {} without a plan", type_name::<T>());
            let matcher = self.matcher::<T>();
            let materializer = ReflectiveMaterializer::new(&matcher, cursor.columns());

            while cursor.advance()? {
                let mut row = materializer.materialize::<T, C>(cursor, limit)?;
                hook(&mut row, cursor).map_err(MaterializeError::Hook)?;
                sink(row);
                count += 1;
            }
        } else {
            let plan = self.plan_for::<T>(query_text, cursor.columns())?;

            while cursor.advance()? {
                sink(plan.materialize_with(cursor, limit, &mut hook)?);
                count += 1;
            }
        }

        log::debug!("Mapped {} rows onto {}", count, type_name::<T>());
        Ok(count)
    }
}

impl Default for QueryMapper {
    fn default() -> Self {
        Self::new(MapperConfig::default())
    }
}
