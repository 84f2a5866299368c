//! Process-wide record of loaded image resources.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::domain::entities::ResourceKey;
use crate::domain::ports::LoadStateCache;

/// Shared, append-only set of resource keys that finished loading.
///
/// Cloning is cheap and every clone observes the same set, so one instance
/// can be handed to every loader of a page while tests build a fresh one.
#[derive(Clone, Default)]
pub struct LoadedResourceSet {
    keys: Arc<RwLock<HashSet<ResourceKey>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl LoadedResourceSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns lookup statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: self.len(),
        }
    }
}

impl std::fmt::Debug for LoadedResourceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedResourceSet")
            .field("size", &self.len())
            .finish_non_exhaustive()
    }
}

/// Statistics about loaded-set lookups.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Lookups that found the key.
    pub hits: u64,
    /// Lookups that did not.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Number of recorded resources.
    pub size: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Loaded set: {} resources, {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.hit_rate, self.hits, self.misses
        )
    }
}

impl LoadStateCache for LoadedResourceSet {
    fn has(&self, key: &ResourceKey) -> bool {
        let found = self.keys.read().contains(key);
        if found {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Loaded set hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Loaded set miss");
        }
        found
    }

    fn mark_loaded(&self, key: ResourceKey) {
        let mut keys = self.keys.write();
        if !keys.contains(&key) {
            debug!(key = %key, "Recording resource as loaded");
            keys.insert(key);
        }
    }

    fn len(&self) -> usize {
        self.keys.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_has() {
        let set = LoadedResourceSet::new();
        let key = ResourceKey::new("img-1");

        assert!(!set.has(&key));
        set.mark_loaded(key.clone());
        assert!(set.has(&key));
    }

    #[test]
    fn test_mark_is_idempotent() {
        let set = LoadedResourceSet::new();
        set.mark_loaded(ResourceKey::new("img-1"));
        set.mark_loaded(ResourceKey::new("img-1"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_clones_share_membership() {
        let set = LoadedResourceSet::new();
        let other = set.clone();
        other.mark_loaded(ResourceKey::new("img-2"));

        assert!(set.has(&ResourceKey::new("img-2")));
        assert!(!set.is_empty());
    }

    #[test]
    fn test_fresh_sets_are_isolated() {
        let a = LoadedResourceSet::new();
        let b = LoadedResourceSet::new();
        a.mark_loaded(ResourceKey::new("img-3"));
        assert!(!b.has(&ResourceKey::new("img-3")));
    }

    #[test]
    fn test_stats() {
        let set = LoadedResourceSet::new();
        set.mark_loaded(ResourceKey::new("img-1"));

        let _ = set.has(&ResourceKey::new("img-1"));
        let _ = set.has(&ResourceKey::new("missing"));

        let stats = set.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert!(stats.to_string().contains("50.0% hit rate"));
    }
}
