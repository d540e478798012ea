use crate::core::cache::{CachedSeries, SeriesCache, SeriesKey};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory series cache, lives as long as the session that owns it.
#[derive(Clone, Default)]
pub struct MemorySeriesCache {
    inner: Arc<Mutex<HashMap<SeriesKey, CachedSeries>>>,
}

impl MemorySeriesCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SeriesCache for MemorySeriesCache {
    async fn get(&self, key: &SeriesKey) -> Option<CachedSeries> {
        let cache = self.inner.lock().await;
        let value = cache.get(key).cloned();
        if value.is_some() {
            debug!("Cache HIT for key: {:?}", key);
        } else {
            debug!("Cache MISS for key: {:?}", key);
        }
        value
    }

    async fn put(&self, key: SeriesKey, entry: CachedSeries) {
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for key: {:?}", key);
        cache.insert(key, entry);
    }

    async fn remove(&self, key: &SeriesKey) {
        let mut cache = self.inner.lock().await;
        cache.remove(key);
        debug!("Cache REMOVE for key: {:?}", key);
    }

    async fn clear(&self) {
        let mut cache = self.inner.lock().await;
        cache.clear();
        debug!("Cache CLEAR");
    }
}
