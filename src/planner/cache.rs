//! Bounded response cache with per-entry expiry.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;

use super::types::NlPlanResponse;

pub const DEFAULT_CAPACITY: usize = 500;
pub const LITE_TTL: Duration = Duration::from_secs(5 * 60);
pub const PRO_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CacheEntry {
    response: NlPlanResponse,
    expires_at: Instant,
}

/// Fingerprint-keyed LRU. Every operation is synchronous.
pub struct ResponseCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Fetch and touch a live entry. Expired entries are dropped on lookup.
    pub fn get(&self, key: &str) -> Option<NlPlanResponse> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            None => return None,
            Some(entry) if Instant::now() < entry.expires_at => {
                return Some(entry.response.clone());
            }
            Some(_) => {}
        }
        entries.pop(key);
        None
    }

    /// Insert or overwrite, evicting the least recently used entry when full.
    pub fn put(&self, key: impl Into<String>, response: NlPlanResponse, ttl: Duration) {
        let entry = CacheEntry {
            response,
            expires_at: Instant::now() + ttl,
        };
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.put(key.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::types::ActionPlan;

    fn response(tag: &str) -> NlPlanResponse {
        ActionPlan::blocked(tag).into()
    }

    #[test]
    fn hit_returns_stored_response() {
        let cache = ResponseCache::default();
        cache.put("k", response("a"), LITE_TTL);
        assert_eq!(cache.get("k"), Some(response("a")));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn expired_entry_is_removed_on_lookup() {
        let cache = ResponseCache::default();
        cache.put("k", response("a"), Duration::ZERO);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn overwrite_replaces_value() {
        let cache = ResponseCache::default();
        cache.put("k", response("a"), LITE_TTL);
        cache.put("k", response("b"), LITE_TTL);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), Some(response("b")));
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = ResponseCache::new(2);
        cache.put("a", response("a"), LITE_TTL);
        cache.put("b", response("b"), LITE_TTL);
        // Touch "a" so "b" becomes the eviction candidate.
        assert!(cache.get("a").is_some());
        cache.put("c", response("c"), LITE_TTL);

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let cache = ResponseCache::new(0);
        cache.put("a", response("a"), PRO_TTL);
        assert!(cache.get("a").is_some());
    }
}
