/// Mapper cache module for compiled mapping plans
///
/// Building a plan matches every column against the target type's property graph,
/// so plans are cached and reused for every later execution of the same query.
///
/// # Architecture
///
/// Cache Key: (query text, target type)
/// Cache Value: `Arc<MappingPlan>`, shared with every caller that hits the entry
///
/// Two textually different queries never share a plan, even when they only differ
/// in whitespace, and the same text mapped onto two types never collides.
///
/// # Concurrency
///
/// Plans are built outside the lock. Two callers missing on the same key may both
/// build; the later insert wins and both plans are equivalent.
///
/// # Configuration
///
/// Environment variables:
/// - `RESULTMAP_MAPPER_CACHE_ENABLED` (default: true)
/// - `RESULTMAP_MAPPER_CACHE_MAX_ENTRIES` (default: 1000)
use std::any::{type_name, TypeId};
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entity::Entity;
use crate::plan::MappingPlan;

/// Key for cache lookup
///
/// Equality uses the exact query text and the target's `TypeId`; the type name is
/// carried for diagnostics only.
#[derive(Debug, Clone)]
pub struct MapperCacheKey {
    pub query_text: String,
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl MapperCacheKey {
    pub fn new<T: Entity>(query_text: &str) -> Self {
        MapperCacheKey {
            query_text: query_text.to_string(),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }
}

impl PartialEq for MapperCacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.query_text == other.query_text
    }
}

impl Eq for MapperCacheKey {}

impl Hash for MapperCacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.query_text.hash(state);
        self.type_id.hash(state);
    }
}

/// Configuration for the mapper cache
#[derive(Debug, Clone, PartialEq, Validate, Serialize, Deserialize)]
pub struct MapperCacheConfig {
    /// Enable or disable caching
    pub enabled: bool,

    /// Maximum number of plans kept (LRU eviction)
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "Mapper cache size must be between 1 and 1000000"
    ))]
    pub max_entries: usize,
}

impl Default for MapperCacheConfig {
    fn default() -> Self {
        MapperCacheConfig {
            enabled: true,
            max_entries: 1000,
        }
    }
}

/// LRU cache of mapping plans
pub struct MapperCache {
    entries: Mutex<LruCache<MapperCacheKey, Arc<MappingPlan>>>,
    config: MapperCacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    builds: AtomicU64,
}

impl MapperCache {
    pub fn new(config: MapperCacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        MapperCache {
            entries: Mutex::new(LruCache::new(capacity)),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            builds: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(MapperCacheConfig::default())
    }

    pub fn config(&self) -> &MapperCacheConfig {
        &self.config
    }

    // A panic while holding the lock cannot leave a half-written entry behind
    fn entries(&self) -> MutexGuard<'_, LruCache<MapperCacheKey, Arc<MappingPlan>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a plan from the cache, marking it most recently used
    pub fn get(&self, key: &MapperCacheKey) -> Option<Arc<MappingPlan>> {
        if !self.config.enabled {
            return None;
        }

        let found = self.entries().get(key).cloned();
        match found {
            Some(plan) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                log::debug!("Mapper cache hit for {} ({})", key.type_name, key.query_text);
                Some(plan)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                log::debug!("Mapper cache miss for {} ({})", key.type_name, key.query_text);
                None
            }
        }
    }

    /// Insert a plan; replaces any plan already stored under the same key
    pub fn insert(&self, key: MapperCacheKey, plan: Arc<MappingPlan>) {
        if !self.config.enabled {
            return;
        }

        let replaced = self.entries().push(key.clone(), plan);
        if let Some((old_key, _)) = replaced {
            if old_key != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                log::debug!(
                    "Mapper cache evicted plan for {} ({})",
                    old_key.type_name,
                    old_key.query_text
                );
            }
        }
    }

    /// Return the cached plan for `key`, building and inserting it on a miss
    pub fn get_or_build<F, E>(&self, key: MapperCacheKey, build: F) -> Result<Arc<MappingPlan>, E>
    where
        F: FnOnce() -> Result<MappingPlan, E>,
    {
        if let Some(plan) = self.get(&key) {
            return Ok(plan);
        }

        let plan = Arc::new(build()?);
        self.builds.fetch_add(1, Ordering::Relaxed);
        self.insert(key, Arc::clone(&plan));
        Ok(plan)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear entire cache
    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Get cache metrics
    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            size: self.len(),
            max_entries: self.config.max_entries,
        }
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub builds: u64,
    pub size: usize,
    pub max_entries: usize,
}

impl CacheMetrics {
    /// Calculate cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Calculate entry utilization (0.0 to 1.0)
    pub fn entry_utilization(&self) -> f64 {
        if self.max_entries == 0 {
            0.0
        } else {
            self.size as f64 / self.max_entries as f64
        }
    }
}
