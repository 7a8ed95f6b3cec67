//! In-flight fetch key registry.
//!
//! Membership prevents a second fetch from being submitted for the same key
//! while one is outstanding. Concurrent requesters decline to submit and rely
//! on the next consumer refresh to re-check the cache. This also guarantees no
//! two jobs ever write the same cache file concurrently.

use crate::cache::{CacheKey, ImageCacheKey};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Key for one outstanding fetch, metadata or image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchKey {
    Meta(CacheKey),
    Image(ImageCacheKey),
}

#[derive(Default)]
pub struct FetchKeyRegistry {
    in_flight: Arc<Mutex<HashSet<FetchKey>>>,
}

impl FetchKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically check-and-insert. Returns a guard on success; the guard
    /// removes the key when dropped, so completion (success or failure)
    /// unconditionally clears the entry. Returns None if a fetch for this key
    /// is already outstanding.
    pub fn try_begin(&self, key: FetchKey) -> Option<InFlightGuard> {
        let mut set = self.in_flight.lock().expect("in-flight set poisoned");
        if !set.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            set: self.in_flight.clone(),
            key,
        })
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }
}

/// Removes its key from the in-flight set on drop.
pub struct InFlightGuard {
    set: Arc<Mutex<HashSet<FetchKey>>>,
    key: FetchKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta_key(item: &str) -> FetchKey {
        FetchKey::Meta(CacheKey::new(item, "ALL"))
    }

    #[test]
    fn second_begin_for_same_key_declines() {
        let registry = FetchKeyRegistry::new();
        let guard = registry.try_begin(meta_key("Lightning Bolt"));
        assert!(guard.is_some());
        assert!(registry.try_begin(meta_key("Lightning Bolt")).is_none());
        assert!(registry.try_begin(meta_key("Counterspell")).is_some());
    }

    #[test]
    fn drop_releases_the_key() {
        let registry = FetchKeyRegistry::new();
        {
            let _guard = registry.try_begin(meta_key("Lightning Bolt")).unwrap();
            assert_eq!(registry.len(), 1);
        }
        assert_eq!(registry.len(), 0);
        assert!(registry.try_begin(meta_key("Lightning Bolt")).is_some());
    }

    #[test]
    fn meta_and_image_keys_are_distinct() {
        use crate::models::ImageKind;
        let registry = FetchKeyRegistry::new();
        let meta = registry.try_begin(meta_key("Lightning Bolt"));
        let image = registry.try_begin(FetchKey::Image(ImageCacheKey::new(
            CacheKey::new("Lightning Bolt", "ALL"),
            ImageKind::Small,
            0,
        )));
        assert!(meta.is_some());
        assert!(image.is_some());
    }
}
