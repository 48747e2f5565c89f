use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

use crate::cache::MapperCacheConfig;

/// Default ceiling for one large object column (64 MiB)
pub const DEFAULT_LOB_MAX_BYTES: u64 = 64 * 1024 * 1024;

pub const LOB_MAX_SIZE_VAR: &str = "RESULTMAP_LOB_MAX_SIZE";
pub const CACHE_ENABLED_VAR: &str = "RESULTMAP_MAPPER_CACHE_ENABLED";
pub const CACHE_MAX_ENTRIES_VAR: &str = "RESULTMAP_MAPPER_CACHE_MAX_ENTRIES";

lazy_static! {
    /// `<megabytes>m` or `<megabytes>M`
    static ref LOB_SIZE_PATTERN: Regex = Regex::new(r"^\s*(\d+)\s*[mM]\s*$").unwrap();
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Mapper configuration with validation
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Largest BLOB/CLOB value read into memory, in bytes
    #[validate(range(min = 1, message = "LOB size limit must be at least one byte"))]
    pub lob_max_bytes: u64,

    #[validate(nested)]
    pub cache: MapperCacheConfig,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            lob_max_bytes: DEFAULT_LOB_MAX_BYTES,
            cache: MapperCacheConfig::default(),
        }
    }
}

impl MapperConfig {
    /// Create configuration from environment variables with validation
    ///
    /// A malformed LOB size falls back to the default; malformed cache settings are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            lob_max_bytes: lob_max_bytes_from(lookup(LOB_MAX_SIZE_VAR).as_deref()),
            cache: MapperCacheConfig {
                enabled: parse_var(&lookup, CACHE_ENABLED_VAR, "true")?,
                max_entries: parse_var(&lookup, CACHE_MAX_ENTRIES_VAR, "1000")?,
            },
        };

        config.validate()?;
        Ok(config)
    }
}

/// Parse a `<int>m` / `<int>M` size into bytes
///
/// # Example
///
/// ```ignore
/// assert_eq!(parse_lob_size("16m"), Some(16 * 1024 * 1024));
/// assert_eq!(parse_lob_size("16k"), None);
/// ```
pub fn parse_lob_size(raw: &str) -> Option<u64> {
    let captures = LOB_SIZE_PATTERN.captures(raw)?;
    let megabytes: u64 = captures.get(1)?.as_str().parse().ok()?;
    megabytes.checked_mul(1024 * 1024).filter(|bytes| *bytes > 0)
}

/// Resolve the LOB ceiling from an optional raw setting
fn lob_max_bytes_from(raw: Option<&str>) -> u64 {
    let Some(raw) = raw else {
        return DEFAULT_LOB_MAX_BYTES;
    };
    match parse_lob_size(raw) {
        Some(bytes) => bytes,
        None => {
            log::warn!(
                "Ignoring malformed {}={:?}; expected <megabytes>m, using {} bytes",
                LOB_MAX_SIZE_VAR,
                raw,
                DEFAULT_LOB_MAX_BYTES
            );
            DEFAULT_LOB_MAX_BYTES
        }
    }
}

/// Parse an environment variable with a default value
fn parse_var<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = lookup(key).unwrap_or_else(|| default.to_string());
    value.trim().parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
