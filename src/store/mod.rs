pub mod disk;
pub mod history;
pub mod memory;

use crate::core::cache::SeriesCache;
use disk::DiskSeriesCache;
use memory::MemorySeriesCache;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub use history::{HistoryStore, StoreError};

/// Opens the persistent series cache under `<data_dir>/cache`, falling back to
/// an in-memory cache when the directory cannot be used.
pub fn open_series_cache(data_dir: &Path) -> Arc<dyn SeriesCache> {
    let cache_dir = data_dir.join("cache");
    match DiskSeriesCache::open(&cache_dir) {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            debug!(
                "Could not open series cache at {}: {}. Using memory cache",
                cache_dir.display(),
                e
            );
            Arc::new(MemorySeriesCache::new())
        }
    }
}
