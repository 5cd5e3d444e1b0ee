use std::time::Duration;

use moka::future::Cache;

/// Most index pages kept at once. `?page=` is user input, so the key space
/// is unbounded without it.
pub const INDEX_CACHE_CAPACITY: u64 = 256;

/// Short-lived store of rendered index pages, keyed by viewer and page.
///
/// Entries expire after `ttl`; a zero ttl disables caching entirely. Writers
/// of post data call [`PageCache::clear`] so new posts show up immediately.
#[derive(Clone)]
pub struct PageCache {
    pages: Option<Cache<String, String>>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, INDEX_CACHE_CAPACITY)
    }

    pub fn with_capacity(ttl: Duration, capacity: u64) -> Self {
        let pages = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build()
        });
        Self { pages }
    }

    pub fn is_enabled(&self) -> bool {
        self.pages.is_some()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let pages = self.pages.as_ref()?;
        let hit = pages.get(key).await;
        tracing::debug!(key, hit = hit.is_some(), "Index cache lookup");
        hit
    }

    pub async fn insert(&self, key: String, body: String) {
        if let Some(pages) = &self.pages {
            pages.insert(key, body).await;
        }
    }

    pub fn clear(&self) {
        if let Some(pages) = &self.pages {
            pages.invalidate_all();
            tracing::debug!("Index cache cleared");
        }
    }

    /// Approximate entry count; pending evictions are applied first.
    pub async fn entry_count(&self) -> u64 {
        match &self.pages {
            Some(pages) => {
                pages.run_pending_tasks().await;
                pages.entry_count()
            }
            None => 0,
        }
    }
}
