//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod error;
pub mod history;
pub mod log;
pub mod notify;
pub mod quote;
pub mod recommendation;
pub mod series;

// Re-export main types for cleaner imports
pub use cache::{CachedSeries, SeriesCache, SeriesKey};
pub use error::InvalidArgument;
pub use history::{FundHistoryRecord, ManualEntry, MergeSummary};
pub use quote::{DataUnavailable, QuoteSource, RawCloses, SeriesFetch};
pub use recommendation::{FundTier, Rationale, Recommendation, Severity, recommend};
pub use series::{Instrument, Lookback, Period, PriceSeries, Ticker};
