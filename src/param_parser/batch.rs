//! Re-binding one parsed template across repeated executions
//!
//! Placeholder positions depend only on the query text, so a template is parsed
//! once and every iteration (for example each row of a bulk insert) only swaps
//! the bound values.

use super::{ParamValue, ParameterParseError, ParsedQuery};
use crate::entity::Value;

#[derive(Debug, Clone)]
pub struct BatchStatement {
    query: ParsedQuery,
}

impl BatchStatement {
    /// Parse `sql` as a template; `initial` fixes the replace count of list parameters
    pub fn parse<I, K, V>(sql: &str, initial: I) -> Result<Self, ParameterParseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        Ok(BatchStatement {
            query: ParsedQuery::parse_template(sql, initial)?,
        })
    }

    /// Bind the values of one iteration
    ///
    /// Names missing from `values` are bound to NULL. A list must keep the replace
    /// count the template was parsed with. On error the previous binding is kept.
    pub fn bind<I, K, V>(&mut self, values: I) -> Result<&ParsedQuery, ParameterParseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        let mut staged = Vec::new();
        for (name, value) in values {
            let name = name.into();
            let bare = name.strip_prefix(':').unwrap_or(&name);
            let value: ParamValue = value.into();

            let Some((idx, param)) = self
                .query
                .parameters()
                .iter()
                .enumerate()
                .find(|(_, p)| p.name.eq_ignore_ascii_case(bare))
            else {
                log::debug!("Batch value {} does not match any template parameter", name);
                continue;
            };

            if value.replace_count() != param.replace_count {
                return Err(ParameterParseError::ReplaceCountMismatch {
                    name: param.name.clone(),
                    expected: param.replace_count,
                    found: value.replace_count(),
                });
            }
            staged.push((idx, value));
        }

        let params = self.query.parameters_mut();
        for param in params.iter_mut() {
            param.value = null_like(param.replace_count);
        }
        for (idx, value) in staged {
            params[idx].value = value;
        }

        Ok(&self.query)
    }

    /// The template with the most recently bound values
    pub fn query(&self) -> &ParsedQuery {
        &self.query
    }

    pub fn sql(&self) -> &str {
        self.query.sql()
    }

    pub fn positional_values(&self) -> Vec<Value> {
        self.query.positional_values()
    }
}

fn null_like(replace_count: usize) -> ParamValue {
    if replace_count == 1 {
        ParamValue::null()
    } else {
        ParamValue::List(vec![Value::Null; replace_count])
    }
}
