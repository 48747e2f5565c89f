//! Named parameter parsing
//!
//! Rewrites `:name` references in query text into positional `?` placeholders and
//! records, for every named parameter, the placeholder positions it occupies.
//!
//! # Rules
//!
//! - A name is `[A-Za-z][A-Za-z0-9_]*`; lookup is case-insensitive
//! - A `:` not followed by a letter is copied literally (`::` casts included)
//! - Quoted literals and `/* ... */` comments are copied verbatim, and references
//!   inside them are ignored
//! - A list value of size N expands to N comma-separated placeholders at every
//!   reference; byte sequences are scalars
//!
//! # Example
//!
//! ```ignore
//! let parsed = ParsedQuery::parse(
//!     "SELECT * FROM part WHERE partno IN (:PART_LIST) ORDER BY partno",
//!     [("PART_LIST", ParamValue::list(["123456", "123789"]))],
//! )?;
//! assert_eq!(parsed.sql(), "SELECT * FROM part WHERE partno IN (?,?) ORDER BY partno");
//! assert_eq!(parsed.parameter("part_list").unwrap().positions(), &[1]);
//! ```

pub mod batch;
pub mod errors;
mod lexer;

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::entity::Value;
pub use batch::BatchStatement;
pub use errors::ParameterParseError;

/// Runtime value bound to a named parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(Value),
    List(Vec<Value>),
}

impl ParamValue {
    pub fn null() -> Self {
        ParamValue::Scalar(Value::Null)
    }

    /// Build a list value from anything convertible into scalars
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        ParamValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Number of positional placeholders one reference expands to
    pub fn replace_count(&self) -> usize {
        match self {
            ParamValue::Scalar(_) => 1,
            ParamValue::List(items) => items.len(),
        }
    }

    /// The scalars this value binds, in placeholder order
    pub fn scalars(&self) -> &[Value] {
        match self {
            ParamValue::Scalar(value) => std::slice::from_ref(value),
            ParamValue::List(items) => items,
        }
    }
}

macro_rules! scalar_param_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(value: $ty) -> Self {
                    ParamValue::Scalar(value.into())
                }
            }
        )*
    };
}

scalar_param_from!(
    Value,
    bool,
    i8,
    i16,
    i32,
    i64,
    f32,
    f64,
    Decimal,
    String,
    &str,
    Vec<u8>,
    &[u8],
    NaiveDate,
    NaiveTime,
    NaiveDateTime,
);

impl<T: Into<Value>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        ParamValue::Scalar(value.into())
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Array(items) => {
                ParamValue::List(items.into_iter().map(json_scalar).collect())
            }
            other => ParamValue::Scalar(json_scalar(other)),
        }
    }
}

fn json_scalar(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::Text(s),
        // Nested structures are bound as their JSON text
        other => Value::Text(other.to_string()),
    }
}

/// One named parameter and the placeholder positions assigned to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterValue {
    name: String,
    value: ParamValue,
    replace_count: usize,
    positions: Vec<usize>,
}

impl ParameterValue {
    fn new(name: String, value: ParamValue) -> Self {
        let replace_count = value.replace_count();
        ParameterValue {
            name,
            value,
            replace_count,
            positions: Vec::new(),
        }
    }

    /// Name as first supplied (or first referenced, for template placeholders)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &ParamValue {
        &self.value
    }

    pub fn replace_count(&self) -> usize {
        self.replace_count
    }

    /// 1-based index of the first placeholder of every reference, in text order
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }
}

/// Case-insensitive, insertion-ordered collection of parameter values
#[derive(Debug, Clone, Default)]
struct ParameterSet {
    values: Vec<ParameterValue>,
    index: HashMap<String, usize>,
}

impl ParameterSet {
    fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ParameterParseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        let mut set = ParameterSet::default();
        for (name, value) in pairs {
            let name = normalize_supplied_name(name.into())?;
            if set.lookup(&name).is_some() {
                return Err(ParameterParseError::DuplicateParameter { name });
            }
            set.register(name, value.into());
        }
        Ok(set)
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_ascii_lowercase()).copied()
    }

    fn register(&mut self, name: String, value: ParamValue) -> usize {
        let idx = self.values.len();
        self.index.insert(name.to_ascii_lowercase(), idx);
        self.values.push(ParameterValue::new(name, value));
        idx
    }
}

/// Accepts `name` or `:name`; rejects anything the lexer could never reference
fn normalize_supplied_name(name: String) -> Result<String, ParameterParseError> {
    let bare = name.strip_prefix(':').unwrap_or(&name);
    let mut chars = bare.chars();
    let valid = chars.next().is_some_and(lexer::is_name_start) && chars.all(lexer::is_name_part);
    if valid {
        Ok(bare.to_string())
    } else {
        Err(ParameterParseError::InvalidParameterName(name))
    }
}

/// Query text rewritten to positional placeholders, plus its parameter bindings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedQuery {
    original: String,
    sql: String,
    parameters: Vec<ParameterValue>,
    placeholder_count: usize,
}

impl ParsedQuery {
    /// Rewrite `sql`, failing on any reference without a supplied value
    pub fn parse<I, K, V>(sql: &str, values: I) -> Result<Self, ParameterParseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        Self::parse_with(sql, ParameterSet::from_pairs(values)?, false)
    }

    /// Rewrite `sql` as a reusable template
    ///
    /// References without a supplied value register a scalar placeholder bound to
    /// NULL, to be filled in later through [`BatchStatement::bind`].
    pub fn parse_template<I, K, V>(sql: &str, values: I) -> Result<Self, ParameterParseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        Self::parse_with(sql, ParameterSet::from_pairs(values)?, true)
    }

    fn parse_with(
        sql: &str,
        mut set: ParameterSet,
        allow_unbound: bool,
    ) -> Result<Self, ParameterParseError> {
        let (rewritten, placeholder_count) = lexer::rewrite(sql, |reference| {
            let idx = match set.lookup(reference.name) {
                Some(idx) => idx,
                None if allow_unbound => set.register(reference.name.to_string(), ParamValue::null()),
                None => {
                    return Err(ParameterParseError::MissingParameter {
                        name: reference.name.to_string(),
                        offset: reference.offset,
                    })
                }
            };

            let param = &mut set.values[idx];
            if param.replace_count == 0 {
                return Err(ParameterParseError::EmptyList {
                    name: param.name.clone(),
                });
            }
            param.positions.push(reference.position);
            Ok(param.replace_count)
        })?;

        for param in set.values.iter().filter(|p| p.positions.is_empty()) {
            log::debug!("Parameter {} is supplied but never referenced", param.name);
        }

        Ok(ParsedQuery {
            original: sql.to_string(),
            sql: rewritten,
            parameters: set.values,
            placeholder_count,
        })
    }

    /// Query text with positional placeholders
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Query text as supplied
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn parameters(&self) -> &[ParameterValue] {
        &self.parameters
    }

    /// Case-insensitive parameter lookup
    pub fn parameter(&self, name: &str) -> Option<&ParameterValue> {
        let name = name.strip_prefix(':').unwrap_or(name);
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholder_count
    }

    /// Scalars in placeholder order, ready for positional binding
    pub fn positional_values(&self) -> Vec<Value> {
        let mut values = vec![Value::Null; self.placeholder_count];
        for param in &self.parameters {
            for &position in &param.positions {
                for (i, scalar) in param.value.scalars().iter().enumerate() {
                    if let Some(slot) = values.get_mut(position - 1 + i) {
                        *slot = scalar.clone();
                    }
                }
            }
        }
        values
    }

    fn parameters_mut(&mut self) -> &mut [ParameterValue] {
        &mut self.parameters
    }
}
