//! Process-wide cache of resolved fonts, keyed by (family, size).
//!
//! Bounded LRU. Entries are immutable, so two requests resolving the same key
//! at once may both insert; the second insert just replaces an equivalent
//! handle.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use super::FontHandle;

pub type FontKey = (String, u32);

pub struct FontCache {
    entries: Mutex<LruCache<FontKey, Arc<FontHandle>>>,
}

impl FontCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &FontKey) -> Option<Arc<FontHandle>> {
        self.lock("get").get(key).cloned()
    }

    pub fn insert(&self, key: FontKey, handle: Arc<FontHandle>) {
        // `push` also hands back the replaced entry when the key was present.
        let replaced = self.lock("insert").push(key.clone(), handle);
        if let Some((evicted, _)) = replaced.filter(|(old, _)| *old != key) {
            tracing::debug!(family = %evicted.0, size = evicted.1, "Evicted font from cache");
        }
    }

    pub fn len(&self) -> usize {
        self.lock("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self, op: &'static str) -> MutexGuard<'_, LruCache<FontKey, Arc<FontHandle>>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!(op, "Recovered from poisoned font cache lock");
                poisoned.into_inner()
            }
        }
    }
}
