use crate::chart::ChartConfig;
use crate::data::{Dataset, DatasetId};
use crate::record::PlottingRecord;
use crate::transform::transform;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    pub enabled: bool,
    pub max_entries: usize,
    /// Entries older than this many seconds count as absent. `None` keeps them
    /// until evicted.
    pub ttl_seconds: Option<u64>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 256,
            ttl_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    /// Percentage, rounded to two decimals.
    pub hit_rate: f64,
}

#[derive(Debug)]
struct CacheEntry {
    records: Arc<Vec<PlottingRecord>>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |at| now >= at)
    }
}

/// Memoizes engine output per (dataset identity, chart config).
///
/// Entries are evicted oldest-first once `max_entries` is reached.
#[derive(Debug, Default)]
pub struct TransformCache {
    options: CacheOptions,
    entries: IndexMap<(DatasetId, ChartConfig), CacheEntry>,
    hits: u64,
    misses: u64,
}

impl TransformCache {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn get_or_compute(&mut self, dataset: &Dataset, config: &ChartConfig) -> Arc<Vec<PlottingRecord>> {
        if !self.options.enabled || self.options.max_entries == 0 {
            self.misses += 1;
            return Arc::new(transform(&dataset.rows, config));
        }

        let key = (dataset.id(), config.clone());
        let now = Instant::now();
        match self.entries.get(&key) {
            Some(entry) if !entry.is_expired(now) => {
                self.hits += 1;
                return Arc::clone(&entry.records);
            }
            Some(_) => {
                self.entries.shift_remove(&key);
            }
            None => {}
        }

        self.misses += 1;
        let records = Arc::new(transform(&dataset.rows, config));
        while self.entries.len() >= self.options.max_entries {
            self.entries.shift_remove_index(0);
        }
        let expires_at = self.options.ttl_seconds.map(|secs| now + Duration::from_secs(secs));
        self.entries.insert(
            key,
            CacheEntry {
                records: Arc::clone(&records),
                expires_at,
            },
        );
        records
    }

    /// Drop every entry computed from the given dataset.
    pub fn invalidate(&mut self, dataset: DatasetId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(id, _), _| *id != dataset);
        let removed = before - self.entries.len();
        tracing::debug!(?dataset, removed, "invalidated cached results");
        removed
    }

    /// Drop entries past their time to live.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::debug!(removed, "expired cached results");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        let hit_rate = if total > 0 {
            (self.hits as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
        } else {
            0.0
        };
        CacheStats {
            size: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            hit_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartKind;

    fn dataset() -> Dataset {
        Dataset::from_json_str(r#"[{"k": "a", "v": 1}, {"k": "b", "v": 2}]"#).unwrap()
    }

    #[test]
    fn test_hit_after_miss() {
        let data = dataset();
        let config = ChartConfig::new(ChartKind::Bar).with_x("k").with_y("v");
        let mut cache = TransformCache::new(CacheOptions::default());

        let first = cache.get_or_compute(&data, &config);
        let second = cache.get_or_compute(&data, &config);
        assert!(Arc::ptr_eq(&first, &second));

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
        assert_eq!(stats.hit_rate, 50.0);
    }

    #[test]
    fn test_config_change_is_a_miss() {
        let data = dataset();
        let mut cache = TransformCache::default();
        let config = ChartConfig::new(ChartKind::Bar).with_x("k");
        cache.get_or_compute(&data, &config);
        cache.get_or_compute(&data, &config.clone().with_sort(crate::chart::SortOrder::Descending));
        assert_eq!(cache.stats().misses, 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_eviction_and_invalidate() {
        let data = dataset();
        let other = dataset();
        let mut cache = TransformCache::new(CacheOptions {
            max_entries: 2,
            ..Default::default()
        });
        let config = ChartConfig::new(ChartKind::Bar).with_x("k");
        cache.get_or_compute(&data, &config);
        cache.get_or_compute(&other, &config);
        cache.get_or_compute(&data, &config.clone().with_y("v"));
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.invalidate(data.id()), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_disabled_cache_always_computes() {
        let data = dataset();
        let mut cache = TransformCache::new(CacheOptions {
            enabled: false,
            max_entries: 10,
            ttl_seconds: None,
        });
        let config = ChartConfig::new(ChartKind::Pie).with_x("k");
        cache.get_or_compute(&data, &config);
        cache.get_or_compute(&data, &config);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let data = dataset();
        let config = ChartConfig::new(ChartKind::Bar).with_x("k");
        let mut cache = TransformCache::new(CacheOptions {
            ttl_seconds: Some(0),
            ..Default::default()
        });
        cache.get_or_compute(&data, &config);
        cache.get_or_compute(&data, &config);
        assert_eq!(cache.stats().misses, 2);
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.cleanup_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_live_entry_survives_cleanup() {
        let data = dataset();
        let config = ChartConfig::new(ChartKind::Bar).with_x("k");
        let mut cache = TransformCache::new(CacheOptions {
            ttl_seconds: Some(3600),
            ..Default::default()
        });
        cache.get_or_compute(&data, &config);
        assert_eq!(cache.cleanup_expired(), 0);
        cache.get_or_compute(&data, &config);
        assert_eq!(cache.stats().hits, 1);
    }
}
