use super::series::{Lookback, PriceSeries, Ticker};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Validity window of a fetched series.
pub const SERIES_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub ticker: Ticker,
    pub lookback: Lookback,
}

impl SeriesKey {
    pub fn new(ticker: Ticker, lookback: Lookback) -> Self {
        Self { ticker, lookback }
    }
}

/// A series snapshot together with the time it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSeries {
    pub fetched_at: DateTime<Utc>,
    pub series: PriceSeries,
}

impl CachedSeries {
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age = now.signed_duration_since(self.fetched_at);
        match age.to_std() {
            Ok(age) => age < ttl,
            // Fetched "in the future" (clock moved back); treat as stale.
            Err(_) => false,
        }
    }
}

/// Storage for fetched series. Freshness is decided by the caller.
#[async_trait]
pub trait SeriesCache: Send + Sync {
    async fn get(&self, key: &SeriesKey) -> Option<CachedSeries>;
    async fn put(&self, key: SeriesKey, entry: CachedSeries);
    async fn remove(&self, key: &SeriesKey);
    async fn clear(&self);
}
