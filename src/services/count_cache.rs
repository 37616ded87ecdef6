//! Process-local cache for landing-page aggregates.
//!
//! Entries never expire; writers that change what the landing page shows call
//! [`LandingCache::invalidate_all`]. The two new-listing counts are always
//! recomputed and stored together so readers never see one fresh and the
//! other stale. A reload only stores its result if no invalidation happened
//! while it was loading.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::services::listing_store::{ListingStore, NewListingCounts};

pub const NEW_LAST_WEEK_KEY: &str = "new_listings_last_week";
pub const NEW_LAST_MONTH_KEY: &str = "new_listings_last_month";
pub const PINNED_KEY: &str = "pinned_listings";

pub const ALL_KEYS: [&str; 3] = [NEW_LAST_WEEK_KEY, NEW_LAST_MONTH_KEY, PINNED_KEY];

/// Narrow key/value cache of serialized values. Multi-key operations are
/// atomic with respect to each other.
pub trait AggregateCache: Send + Sync {
    fn get_many(&self, keys: &[&str]) -> Vec<Option<String>>;

    /// Counter bumped by every `invalidate`.
    fn generation(&self) -> u64;

    /// Stores `entries` only while the cache is still at `generation`.
    /// Returns whether anything was written.
    fn set_many_if(&self, generation: u64, entries: Vec<(&str, String)>) -> bool;

    fn invalidate(&self, keys: &[&str]);
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, String>,
    generation: u64,
}

#[derive(Default)]
pub struct InMemoryAggregateCache {
    state: RwLock<CacheState>,
}

impl InMemoryAggregateCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AggregateCache for InMemoryAggregateCache {
    fn get_many(&self, keys: &[&str]) -> Vec<Option<String>> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        keys.iter().map(|k| state.entries.get(*k).cloned()).collect()
    }

    fn generation(&self) -> u64 {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .generation
    }

    fn set_many_if(&self, generation: u64, new_entries: Vec<(&str, String)>) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.generation != generation {
            return false;
        }
        for (key, value) in new_entries {
            state.entries.insert(key.to_string(), value);
        }
        true
    }

    fn invalidate(&self, keys: &[&str]) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.generation += 1;
        for key in keys {
            state.entries.remove(*key);
        }
    }
}

/// Never stores anything; every read is a miss.
pub struct NoopAggregateCache;

impl AggregateCache for NoopAggregateCache {
    fn get_many(&self, keys: &[&str]) -> Vec<Option<String>> {
        vec![None; keys.len()]
    }

    fn generation(&self) -> u64 {
        0
    }

    fn set_many_if(&self, _generation: u64, _entries: Vec<(&str, String)>) -> bool {
        false
    }

    fn invalidate(&self, _keys: &[&str]) {}
}

#[derive(Clone)]
pub struct LandingCache {
    cache: Arc<dyn AggregateCache>,
    store: Arc<dyn ListingStore>,
}

impl LandingCache {
    pub fn new(cache: Arc<dyn AggregateCache>, store: Arc<dyn ListingStore>) -> Self {
        Self { cache, store }
    }

    pub async fn new_listing_counts(&self, now: DateTime<Utc>) -> Result<NewListingCounts> {
        let generation = self.cache.generation();
        let cached = self.cache.get_many(&[NEW_LAST_WEEK_KEY, NEW_LAST_MONTH_KEY]);
        if let [Some(week), Some(month)] = cached.as_slice() {
            match (week.parse::<i64>(), month.parse::<i64>()) {
                (Ok(last_week), Ok(last_month)) => {
                    return Ok(NewListingCounts {
                        last_week,
                        last_month,
                    })
                }
                _ => warn!("discarding unreadable new listing counts"),
            }
        }

        info!("new listing counts cache miss, recomputing");
        let counts = self.store.new_listing_counts(now).await?;
        let stored = self.cache.set_many_if(
            generation,
            vec![
                (NEW_LAST_WEEK_KEY, counts.last_week.to_string()),
                (NEW_LAST_MONTH_KEY, counts.last_month.to_string()),
            ],
        );
        if !stored {
            debug!("cache invalidated during recompute, counts not stored");
        }
        Ok(counts)
    }

    /// Returns the value cached under `key`, or runs `load` and caches its
    /// result unless the cache was invalidated meanwhile.
    pub async fn get_or_load<T, F, Fut>(&self, key: &'static str, load: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let generation = self.cache.generation();
        if let Some(Some(raw)) = self.cache.get_many(&[key]).into_iter().next() {
            match serde_json::from_str::<T>(&raw) {
                Ok(value) => return Ok(value),
                Err(e) => warn!(key, error = %e, "discarding unreadable cache entry"),
            }
        }

        debug!(key, "cache miss");
        let value = load().await?;
        if !self
            .cache
            .set_many_if(generation, vec![(key, serde_json::to_string(&value)?)])
        {
            debug!(key, "cache invalidated during load, value not stored");
        }
        Ok(value)
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate(&ALL_KEYS);
    }
}
