use crate::core::cache::{CachedSeries, SeriesCache, SeriesKey};
use anyhow::Result;
use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const PARTITION: &str = "series";

/// Series cache persisted in a fjall keyspace so fetched series outlive a
/// single invocation. Storage errors degrade to cache misses.
pub struct DiskSeriesCache {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskSeriesCache {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let keyspace = Config::new(path).open()?;
        let partition = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;
        Ok(Self {
            keyspace,
            partition,
        })
    }

    fn try_get(&self, key: &SeriesKey) -> Result<Option<CachedSeries>> {
        match self.partition.get(serde_json::to_vec(key)?)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn try_put(&self, key: &SeriesKey, entry: &CachedSeries) -> Result<()> {
        self.partition
            .insert(serde_json::to_vec(key)?, serde_json::to_vec(entry)?)?;
        self.keyspace.persist(PersistMode::Buffer)?;
        Ok(())
    }

    fn try_clear(&self) -> Result<()> {
        let keys = self
            .partition
            .keys()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for key in keys {
            self.partition.remove(key)?;
        }
        self.keyspace.persist(PersistMode::Buffer)?;
        Ok(())
    }
}

#[async_trait]
impl SeriesCache for DiskSeriesCache {
    async fn get(&self, key: &SeriesKey) -> Option<CachedSeries> {
        match self.try_get(key) {
            Ok(Some(entry)) => {
                debug!("Cache HIT for key: {:?}", key);
                Some(entry)
            }
            Ok(None) => {
                debug!("Cache MISS for key: {:?}", key);
                None
            }
            Err(e) => {
                debug!("DiskSeriesCache get error: {}", e);
                None
            }
        }
    }

    async fn put(&self, key: SeriesKey, entry: CachedSeries) {
        match self.try_put(&key, &entry) {
            Ok(()) => debug!("Cache PUT for key: {:?}", key),
            Err(e) => debug!("DiskSeriesCache put error: {}", e),
        }
    }

    async fn remove(&self, key: &SeriesKey) {
        let res: Result<()> = (|| Ok(self.partition.remove(serde_json::to_vec(key)?)?))();
        if let Err(e) = res {
            debug!("DiskSeriesCache remove error: {}", e);
        }
    }

    async fn clear(&self) {
        if let Err(e) = self.try_clear() {
            debug!("DiskSeriesCache clear error: {}", e)
        }
    }
}
