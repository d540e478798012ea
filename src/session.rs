//! Per-invocation context shared by the commands.

use crate::core::cache::SeriesCache;
use crate::core::config::AppConfig;
use crate::core::history::{FundHistoryRecord, ManualEntry, MergeSummary};
use crate::core::notify::notify_alert;
use crate::core::quote::{QuoteSource, SeriesFetch};
use crate::core::recommendation::{FundTier, Recommendation, recommend};
use crate::core::series::Instrument;
use crate::ingest;
use crate::providers::{MarketLoader, SmtpNotifier, YahooQuoteSource};
use crate::store::{HistoryStore, open_series_cache};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Outcome of importing a fund export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportReport {
    pub rows: usize,
    pub label: FundTier,
    pub summary: MergeSummary,
}

/// Owns the market loader, the history store and the recommendation computed
/// for one command. Dropped when the command ends.
pub struct Session {
    config: AppConfig,
    loader: MarketLoader,
    store: HistoryStore,
    recommendation: OnceCell<Recommendation>,
}

impl Session {
    pub fn new(config: AppConfig) -> Result<Self> {
        let data_dir = config.default_data_path()?;
        debug!("Using data directory {}", data_dir.display());

        let source = Arc::new(YahooQuoteSource::new(config.yahoo_base_url())?);
        let cache = open_series_cache(&data_dir);
        let store = HistoryStore::in_dir(&data_dir);
        Ok(Self::with_parts(config, source, cache, store))
    }

    pub fn with_parts(
        config: AppConfig,
        source: Arc<dyn QuoteSource>,
        cache: Arc<dyn SeriesCache>,
        store: HistoryStore,
    ) -> Self {
        Self {
            config,
            loader: MarketLoader::new(source, cache),
            store,
            recommendation: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Evaluates the recommendation on first use and reuses it afterwards.
    pub async fn recommendation(&self) -> Recommendation {
        *self
            .recommendation
            .get_or_init(|| async {
                let instruments = &self.config.instruments;
                let tickers = [
                    (Instrument::UsdClp, instruments.currency.clone()),
                    (Instrument::Sp500, instruments.equity.clone()),
                ];
                let fetched = self.loader.load_many(&tickers, self.config.lookback).await;
                let series = |instrument: Instrument| {
                    fetched
                        .iter()
                        .find(|(tag, _)| *tag == instrument)
                        .and_then(|(_, fetch)| fetch.series())
                };

                let recommendation =
                    recommend(series(Instrument::UsdClp), series(Instrument::Sp500));
                info!(
                    label = %recommendation.label,
                    severity = %recommendation.severity,
                    "Computed recommendation"
                );
                recommendation
            })
            .await
    }

    /// Loads every tracked instrument concurrently, in display order.
    pub async fn market_snapshot(&self) -> Vec<(Instrument, SeriesFetch)> {
        let tickers: Vec<_> = Instrument::ALL
            .iter()
            .map(|&i| (i, self.config.instruments.ticker(i).clone()))
            .collect();
        self.loader.load_many(&tickers, self.config.lookback).await
    }

    /// Reads an export and merges it into the history, stamped with the
    /// current recommendation. A rejected upload leaves the store untouched.
    pub async fn import_upload(&self, path: &Path) -> Result<ImportReport> {
        let rows = ingest::read_upload(path, self.config.header_rows)?;
        let label = self.recommendation().await.label;

        let count = rows.len();
        let summary = self.store.ingest(ingest::stamp_rows(rows, label))?;
        Ok(ImportReport {
            rows: count,
            label,
            summary,
        })
    }

    /// Stores a manual entry, replacing any record for the same date.
    pub async fn record(&self, entry: ManualEntry) -> Result<MergeSummary> {
        let label = self.recommendation().await.label;
        Ok(self.store.ingest(vec![entry.into_record(label)])?)
    }

    pub fn history(&self) -> Result<Vec<FundHistoryRecord>> {
        Ok(self.store.load()?)
    }

    pub fn reset_history(&self) -> Result<bool> {
        Ok(self.store.reset()?)
    }

    /// Mails an alert when the recommendation calls for one. Returns whether
    /// a message was delivered; a missing or unusable mail setup is logged
    /// and never fails the command.
    pub async fn send_alert(&self, recommendation: &Recommendation) -> bool {
        let Some(smtp) = self.config.notifications.smtp.as_ref() else {
            warn!("Notifications are not configured: add a notifications.smtp section");
            return false;
        };
        match SmtpNotifier::from_config(smtp) {
            Ok(notifier) => notify_alert(&notifier, recommendation).await,
            Err(e) => {
                warn!(error = %e, "Cannot set up alert notifications");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SmtpConfig;
    use crate::core::quote::{DataUnavailable, RawCloses};
    use crate::core::recommendation::{Rationale, Severity};
    use crate::core::series::{Lookback, Ticker};
    use crate::ingest::UploadError;
    use crate::store::memory::MemorySeriesCache;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FixedQuotes {
        closes: HashMap<String, Vec<f64>>,
        calls: AtomicUsize,
    }

    impl FixedQuotes {
        fn new(currency: &[f64], equity: &[f64]) -> Arc<Self> {
            Arc::new(Self {
                closes: HashMap::from([
                    ("CLP=X".to_string(), currency.to_vec()),
                    ("^GSPC".to_string(), equity.to_vec()),
                ]),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl QuoteSource for FixedQuotes {
        async fn fetch_closes(
            &self,
            ticker: &Ticker,
            _lookback: Lookback,
        ) -> Result<RawCloses, DataUnavailable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let closes = self
                .closes
                .get(ticker.as_str())
                .ok_or_else(|| DataUnavailable::Empty {
                    ticker: ticker.to_string(),
                })?;
            Ok(RawCloses {
                timestamps: (0..closes.len() as i64).map(|i| 1_700_000_000 + i * 86_400).collect(),
                closes: closes.iter().copied().map(Some).collect(),
            })
        }
    }

    fn session(source: Arc<FixedQuotes>, dir: &TempDir) -> Session {
        let config = AppConfig {
            header_rows: 0,
            ..AppConfig::default()
        };
        Session::with_parts(
            config,
            source,
            Arc::new(MemorySeriesCache::new()),
            HistoryStore::in_dir(dir.path()),
        )
    }

    const FALLING: [f64; 6] = [106.0, 105.0, 104.0, 103.0, 102.0, 100.0];

    #[tokio::test]
    async fn test_recommendation_is_memoized() {
        let dir = TempDir::new().unwrap();
        let source = FixedQuotes::new(&FALLING, &FALLING);
        let session = session(source.clone(), &dir);

        let first = session.recommendation().await;
        let second = session.recommendation().await;

        assert_eq!(first, second);
        assert_eq!(first.label, FundTier::E);
        assert_eq!(first.severity, Severity::Alert);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_equity_is_insufficient() {
        let dir = TempDir::new().unwrap();
        let session = session(FixedQuotes::new(&FALLING, &[]), &dir);

        let rec = session.recommendation().await;
        assert_eq!(rec.label, FundTier::D);
        assert_eq!(
            rec.rationale,
            Rationale::InsufficientData {
                currency_points: 6,
                equity_points: 0
            }
        );
    }

    #[tokio::test]
    async fn test_market_snapshot_covers_every_instrument() {
        let dir = TempDir::new().unwrap();
        let session = session(FixedQuotes::new(&FALLING, &FALLING), &dir);

        let snapshot = session.market_snapshot().await;
        let instruments: Vec<Instrument> = snapshot.iter().map(|(i, _)| *i).collect();
        assert_eq!(instruments, Instrument::ALL.to_vec());
        assert!(snapshot[0].1.series().is_some());
        assert!(snapshot[2].1.unavailable().is_some());
    }

    #[tokio::test]
    async fn test_import_stamps_current_label() {
        let dir = TempDir::new().unwrap();
        let session = session(FixedQuotes::new(&FALLING, &FALLING), &dir);
        let upload = dir.path().join("export.csv");
        std::fs::write(
            &upload,
            "Fechas,Fondo C,Fondo D,Fondo E\n01/03/2024,1,2,3\n04/03/2024,1,2,\n",
        )
        .unwrap();

        let report = session.import_upload(&upload).await.unwrap();
        assert_eq!(report.rows, 1);
        assert_eq!(report.label, FundTier::E);
        assert_eq!(report.summary.added, 1);

        let history = session.history().unwrap();
        assert_eq!(history[0].recommendation, Some(FundTier::E));
        assert_eq!(history[0].position, None);
    }

    #[tokio::test]
    async fn test_rejected_upload_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let session = session(FixedQuotes::new(&FALLING, &FALLING), &dir);
        let upload = dir.path().join("export.csv");
        std::fs::write(&upload, "only,metadata\n").unwrap();

        let err = session.import_upload(&upload).await.unwrap_err();
        assert!(err.downcast_ref::<UploadError>().is_some());
        assert!(!session.store().exists());
    }

    #[tokio::test]
    async fn test_record_and_reset() {
        let dir = TempDir::new().unwrap();
        let session = session(FixedQuotes::new(&FALLING, &FALLING), &dir);
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        session
            .record(ManualEntry {
                date,
                fund: FundTier::D,
                unit_value: Some(30100.1),
            })
            .await
            .unwrap();
        let history = session.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].position, Some(FundTier::D));
        assert_eq!(history[0].unit_value(FundTier::D), Some(30100.1));

        assert!(session.reset_history().unwrap());
        assert!(session.history().unwrap().is_empty());
        assert!(!session.reset_history().unwrap());
    }

    #[tokio::test]
    async fn test_send_alert_without_smtp_config_is_skipped() {
        let dir = TempDir::new().unwrap();
        let session = session(FixedQuotes::new(&FALLING, &FALLING), &dir);
        let rec = session.recommendation().await;

        assert!(!session.send_alert(&rec).await);
    }

    #[tokio::test]
    async fn test_send_alert_with_unset_password_is_skipped() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.notifications.smtp = Some(SmtpConfig {
            host: "127.0.0.1".to_string(),
            port: 587,
            username: "me@example.com".to_string(),
            from: "me@example.com".to_string(),
            to: "me@example.com".to_string(),
            password_env: "PENSIONGUARD_SESSION_UNSET_PASSWORD".to_string(),
        });
        let session = Session::with_parts(
            config,
            FixedQuotes::new(&FALLING, &FALLING),
            Arc::new(MemorySeriesCache::new()),
            HistoryStore::in_dir(dir.path()),
        );
        let rec = session.recommendation().await;
        assert_eq!(rec.severity, Severity::Alert);

        assert!(!session.send_alert(&rec).await);
    }
}
