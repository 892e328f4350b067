use crate::{CacheKey, Key, KeySet, MultiKey};
use parking_lot::RwLock;
use std::{
    any::Any,
    collections::HashMap,
    fmt::{self, Debug},
    sync::Arc,
};

/// A cache entry: either a record or the knowledge that there is none.
#[derive(Clone)]
pub enum CachedValue {
    Null,
    Value(Arc<dyn Any + Send + Sync>),
}

impl CachedValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        CachedValue::Value(Arc::new(value))
    }

    pub fn from_option<T: Any + Send + Sync>(value: Option<T>) -> Self {
        value.map_or(CachedValue::Null, Self::new)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CachedValue::Null)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            CachedValue::Null => None,
            CachedValue::Value(v) => v.downcast_ref(),
        }
    }
}

impl Debug for CachedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachedValue::Null => f.write_str("CachedValue::Null"),
            CachedValue::Value(..) => f.write_str("CachedValue::Value(..)"),
        }
    }
}

/// One cache namespace.
///
/// Implementations must make `store` atomic with respect to `lookup`.
pub trait CacheBin: Send + Sync {
    fn lookup(&self, key: &CacheKey) -> Option<CachedValue>;
    /// Store `value`, returning the entry it replaced.
    fn store(&self, key: CacheKey, value: CachedValue) -> Option<CachedValue>;
    fn remove(&self, key: &CacheKey) -> Option<CachedValue>;
    fn enumerate_keys(&self) -> Vec<CacheKey>;
}

pub trait CacheAdapter: Send + Sync {
    fn get_cache(&self, cache_id: &str) -> Arc<dyn CacheBin>;
}

#[derive(Default)]
pub struct InMemoryCacheBin {
    entries: RwLock<HashMap<CacheKey, CachedValue>>,
}

impl CacheBin for InMemoryCacheBin {
    fn lookup(&self, key: &CacheKey) -> Option<CachedValue> {
        self.entries.read().get(key).cloned()
    }
    fn store(&self, key: CacheKey, value: CachedValue) -> Option<CachedValue> {
        self.entries.write().insert(key, value)
    }
    fn remove(&self, key: &CacheKey) -> Option<CachedValue> {
        self.entries.write().remove(key)
    }
    fn enumerate_keys(&self) -> Vec<CacheKey> {
        self.entries.read().keys().cloned().collect()
    }
}

/// Process local cache, one `HashMap` per namespace.
#[derive(Default)]
pub struct InMemoryCacheAdapter {
    bins: RwLock<HashMap<String, Arc<InMemoryCacheBin>>>,
}

impl InMemoryCacheAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheAdapter for InMemoryCacheAdapter {
    fn get_cache(&self, cache_id: &str) -> Arc<dyn CacheBin> {
        if let Some(bin) = self.bins.read().get(cache_id) {
            return bin.clone();
        }
        self.bins
            .write()
            .entry(cache_id.to_owned())
            .or_default()
            .clone()
    }
}

/// Told about entries leaving a namespace, to cascade the eviction to
/// dependent caches.
pub trait CacheListener: Send + Sync {
    fn entry_invalidated(&self, key: &CacheKey, previous: &CachedValue);
}

impl<F> CacheListener for F
where
    F: Fn(&CacheKey, &CachedValue) + Send + Sync,
{
    fn entry_invalidated(&self, key: &CacheKey, previous: &CachedValue) {
        self(key, previous)
    }
}

/// The cache as seen by queries and modifiers: adapter, listeners and the
/// switch disabling it altogether.
pub struct DepotCache {
    adapter: Option<Arc<dyn CacheAdapter>>,
    listeners: RwLock<HashMap<String, Vec<Arc<dyn CacheListener>>>>,
}

impl DepotCache {
    pub fn new(adapter: Option<Arc<dyn CacheAdapter>>) -> Self {
        Self {
            adapter,
            listeners: Default::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.adapter.is_some()
    }

    pub fn add_listener(&self, cache_id: impl Into<String>, listener: Arc<dyn CacheListener>) {
        self.listeners
            .write()
            .entry(cache_id.into())
            .or_default()
            .push(listener);
    }

    pub fn lookup(&self, key: &CacheKey) -> Option<CachedValue> {
        let value = self.adapter.as_ref()?.get_cache(&key.cache_id).lookup(key);
        log::trace!("Cache {} for {}", if value.is_some() { "hit" } else { "miss" }, key);
        value
    }

    /// Store an entry, listeners hear about the value it overwrites.
    pub fn store(&self, key: CacheKey, value: CachedValue) {
        let Some(adapter) = &self.adapter else {
            return;
        };
        let bin = adapter.get_cache(&key.cache_id);
        if let Some(previous) = bin.store(key.clone(), value) {
            self.notify(&key, &previous);
        }
    }

    pub fn invalidate(&self, key: &CacheKey) {
        let Some(adapter) = &self.adapter else {
            return;
        };
        if let Some(previous) = adapter.get_cache(&key.cache_id).remove(key) {
            log::trace!("Cache invalidate {}", key);
            self.notify(key, &previous);
        }
    }

    /// Visit every entry of a namespace.
    pub fn traverse(&self, cache_id: &str, mut visitor: impl FnMut(&CacheKey, &CachedValue)) {
        let Some(adapter) = &self.adapter else {
            return;
        };
        let bin = adapter.get_cache(cache_id);
        for key in bin.enumerate_keys() {
            // Entries may vanish while traversing
            if let Some(value) = bin.lookup(&key) {
                visitor(&key, &value);
            }
        }
    }

    /// Evict the entries of a namespace matching `filter`.
    pub fn evict_matching(&self, cache_id: &str, filter: impl Fn(&CacheKey, &CachedValue) -> bool) {
        let mut evicted = Vec::new();
        self.traverse(cache_id, |key, value| {
            if filter(key, value) {
                evicted.push(key.clone());
            }
        });
        for key in &evicted {
            self.invalidate(key);
        }
    }

    fn notify(&self, key: &CacheKey, previous: &CachedValue) {
        let listeners = self
            .listeners
            .read()
            .get(&*key.cache_id)
            .cloned()
            .unwrap_or_default();
        for listener in listeners {
            listener.entry_invalidated(key, previous);
        }
    }
}

impl Debug for DepotCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepotCache")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Evicts the entries a modifier is about to make stale.
pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, cache: &DepotCache);
}

impl CacheInvalidator for Key {
    fn invalidate(&self, cache: &DepotCache) {
        cache.invalidate(&self.cache_key());
    }
}

impl CacheInvalidator for KeySet {
    fn invalidate(&self, cache: &DepotCache) {
        for key in self.keys() {
            key.invalidate(cache);
        }
    }
}

/// Invalidates every row when the multi key spans the whole primary key,
/// otherwise nothing can be derived.
impl CacheInvalidator for MultiKey {
    fn invalidate(&self, cache: &DepotCache) {
        match self.keys() {
            Some(keys) => keys.iter().for_each(|k| k.invalidate(cache)),
            None => log::warn!(
                "Cannot invalidate {} from a multi key not covering the primary key",
                self.entity().name
            ),
        }
    }
}

/// Evicts the entries of a namespace matching a filter.
pub struct TraverseWithFilter<F> {
    pub cache_id: String,
    pub filter: F,
}

impl<F> TraverseWithFilter<F>
where
    F: Fn(&CacheKey, &CachedValue) -> bool + Send + Sync,
{
    pub fn new(cache_id: impl Into<String>, filter: F) -> Self {
        Self {
            cache_id: cache_id.into(),
            filter,
        }
    }
}

impl<F> CacheInvalidator for TraverseWithFilter<F>
where
    F: Fn(&CacheKey, &CachedValue) -> bool + Send + Sync,
{
    fn invalidate(&self, cache: &DepotCache) {
        cache.evict_matching(&self.cache_id, &self.filter);
    }
}
