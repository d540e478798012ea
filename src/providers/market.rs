use crate::core::cache::{CachedSeries, SERIES_TTL, SeriesCache, SeriesKey};
use crate::core::quote::{DataUnavailable, QuoteSource, SeriesFetch};
use crate::core::series::{Lookback, PriceSeries, Ticker};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Loads normalized price series through a TTL cache. Never fails: anything
/// that prevents a series from loading becomes `SeriesFetch::Absent`.
pub struct MarketLoader {
    source: Arc<dyn QuoteSource>,
    cache: Arc<dyn SeriesCache>,
    ttl: Duration,
}

impl MarketLoader {
    pub fn new(source: Arc<dyn QuoteSource>, cache: Arc<dyn SeriesCache>) -> Self {
        Self {
            source,
            cache,
            ttl: SERIES_TTL,
        }
    }

    pub async fn load(&self, ticker: &Ticker, lookback: Lookback) -> SeriesFetch {
        self.load_at(ticker, lookback, Utc::now()).await
    }

    /// Same as `load` with an explicit notion of "now" for cache freshness.
    pub async fn load_at(
        &self,
        ticker: &Ticker,
        lookback: Lookback,
        now: DateTime<Utc>,
    ) -> SeriesFetch {
        let key = SeriesKey::new(ticker.clone(), lookback);
        if let Some(entry) = self.cache.get(&key).await {
            if entry.is_fresh(now, self.ttl) {
                debug!("Using cached series for {} ({})", ticker, lookback);
                return SeriesFetch::Available(entry.series);
            }
            debug!("Cached series for {} expired, refreshing", ticker);
        }

        let raw = match self.source.fetch_closes(ticker, lookback).await {
            Ok(raw) => raw,
            Err(reason) => {
                warn!(%ticker, error = %reason, "Series unavailable");
                return SeriesFetch::Absent(reason);
            }
        };

        let mut series = PriceSeries::from_raw(raw.pairs());
        if let Some(limit) = lookback.session_limit() {
            series = series.last_sessions(limit);
        }
        if series.is_empty() {
            warn!(%ticker, "Series has no usable closes");
            return SeriesFetch::Absent(DataUnavailable::Empty {
                ticker: ticker.to_string(),
            });
        }

        self.cache
            .put(
                key,
                CachedSeries {
                    fetched_at: now,
                    series: series.clone(),
                },
            )
            .await;
        SeriesFetch::Available(series)
    }

    /// Loads several tickers concurrently, preserving input order.
    pub async fn load_many<T: Clone>(
        &self,
        tickers: &[(T, Ticker)],
        lookback: Lookback,
    ) -> Vec<(T, SeriesFetch)> {
        let now = Utc::now();
        let futures = tickers.iter().map(|(tag, ticker)| async move {
            (tag.clone(), self.load_at(ticker, lookback, now).await)
        });
        join_all(futures).await
    }
}
