//! Quote source abstraction

use super::series::{Lookback, PriceSeries, Ticker};
use async_trait::async_trait;
use thiserror::Error;

/// Why a series could not be produced. Never fatal: callers degrade to a
/// neutral display instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataUnavailable {
    #[error("quote source unreachable for {ticker}: {reason}")]
    Transport { ticker: String, reason: String },
    #[error("no price data returned for {ticker}")]
    Empty { ticker: String },
    #[error("unexpected response for {ticker}: {reason}")]
    Malformed { ticker: String, reason: String },
}

/// Closing prices exactly as returned by the source: unsorted, possibly with gaps.
#[derive(Debug, Clone, Default)]
pub struct RawCloses {
    pub timestamps: Vec<i64>,
    pub closes: Vec<Option<f64>>,
}

impl RawCloses {
    pub fn pairs(self) -> impl Iterator<Item = (i64, Option<f64>)> {
        self.timestamps.into_iter().zip(self.closes)
    }
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_closes(
        &self,
        ticker: &Ticker,
        lookback: Lookback,
    ) -> Result<RawCloses, DataUnavailable>;
}

/// Outcome of loading one series.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesFetch {
    Available(PriceSeries),
    Absent(DataUnavailable),
}

impl SeriesFetch {
    pub fn series(&self) -> Option<&PriceSeries> {
        match self {
            SeriesFetch::Available(series) => Some(series),
            SeriesFetch::Absent(_) => None,
        }
    }

    pub fn unavailable(&self) -> Option<&DataUnavailable> {
        match self {
            SeriesFetch::Available(_) => None,
            SeriesFetch::Absent(reason) => Some(reason),
        }
    }
}
