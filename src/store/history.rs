//! Flat CSV file holding the fund history, rewritten in full on every change.

use crate::core::history::{
    FundHistoryRecord, MergeSummary, format_date, is_canonical, merge, parse_date,
};
use crate::core::recommendation::FundTier;
use csv::StringRecord;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

pub const HISTORY_FILE: &str = "fund_history.csv";

const HEADER: [&str; 6] = [
    "date",
    "fund_c",
    "fund_d",
    "fund_e",
    "position",
    "recommendation",
];

/// The store could not be read or replaced. The previous file is left as is.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read history store {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("history store {} is corrupt at line {line}: {reason}", .path.display())]
    Corrupt {
        path: PathBuf,
        line: u64,
        reason: String,
    },
    #[error("failed to write history store {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },
}

/// Column positions in a store file. Older stores used `Fecha,C,D,E`.
struct Columns {
    date: usize,
    fund_c: Option<usize>,
    fund_d: Option<usize>,
    fund_e: Option<usize>,
    position: Option<usize>,
    recommendation: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Option<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        Some(Self {
            date: find(&["date", "Fecha"])?,
            fund_c: find(&["fund_c", "C"]),
            fund_d: find(&["fund_d", "D"]),
            fund_e: find(&["fund_e", "E"]),
            position: find(&["position", "Fondo"]),
            recommendation: find(&["recommendation", "Sugerencia"]),
        })
    }
}

pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Store file inside the application data directory.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(HISTORY_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads every record, sorted by date. A missing file is an empty store.
    pub fn load(&self) -> Result<Vec<FundHistoryRecord>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No history store at {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = reader.headers().map_err(|e| self.corrupt(1, e.to_string()))?;
        let columns = Columns::locate(headers)
            .ok_or_else(|| self.corrupt(1, "missing date column".to_string()))?;

        let mut records = Vec::new();
        for (idx, row) in reader.records().enumerate() {
            let line = idx as u64 + 2;
            let row = row.map_err(|e| self.corrupt(line, e.to_string()))?;
            if row.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            records.push(
                self.parse_row(&row, &columns)
                    .map_err(|reason| self.corrupt(line, reason))?,
            );
        }

        // Older stores may be unsorted or carry repeated dates.
        let (records, _) = merge(Vec::new(), records);
        debug!("Loaded {} history records", records.len());
        Ok(records)
    }

    /// Merges `incoming` into the store. Nothing is written unless the whole
    /// merged history was produced.
    pub fn ingest(&self, incoming: Vec<FundHistoryRecord>) -> Result<MergeSummary, StoreError> {
        let existing = self.load()?;
        let (merged, summary) = merge(existing, incoming);
        debug_assert!(is_canonical(&merged));

        self.write(&merged)?;
        info!(
            added = summary.added,
            replaced = summary.replaced,
            total = summary.total,
            "History store updated"
        );
        Ok(summary)
    }

    /// Deletes the store. Returns whether a file was removed.
    pub fn reset(&self) -> Result<bool, StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Deleted history store {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.write_error(e)),
        }
    }

    /// Writes to a temp file next to the store, then renames it over the store.
    fn write(&self, records: &[FundHistoryRecord]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        self.write_in(&dir, records)
    }

    fn write_in(&self, dir: &Path, records: &[FundHistoryRecord]) -> Result<(), StoreError> {
        fs::create_dir_all(dir).map_err(|e| self.write_error(e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.write_error(e))?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            writer
                .write_record(HEADER)
                .map_err(|e| self.write_error(e))?;
            for record in records {
                writer
                    .write_record(to_row(record))
                    .map_err(|e| self.write_error(e))?;
            }
            writer.flush().map_err(|e| self.write_error(e))?;
        }
        tmp.as_file().sync_all().map_err(|e| self.write_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.write_error(e.error))?;
        debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    fn parse_row(&self, row: &StringRecord, columns: &Columns) -> Result<FundHistoryRecord, String> {
        let text = |idx: Option<usize>| idx.and_then(|i| row.get(i)).filter(|s| !s.is_empty());

        let raw_date = text(Some(columns.date)).ok_or("empty date")?;
        let date = parse_date(raw_date).ok_or_else(|| format!("unparseable date '{raw_date}'"))?;

        let number = |idx: Option<usize>| -> Result<Option<f64>, String> {
            text(idx)
                .map(|s| {
                    s.parse::<f64>()
                        .map_err(|_| format!("unparseable value '{s}'"))
                })
                .transpose()
        };
        let tier = |idx: Option<usize>| -> Result<Option<FundTier>, String> {
            text(idx)
                .map(|s| s.parse::<FundTier>().map_err(|e| e.to_string()))
                .transpose()
        };

        Ok(FundHistoryRecord {
            date,
            fund_c: number(columns.fund_c)?,
            fund_d: number(columns.fund_d)?,
            fund_e: number(columns.fund_e)?,
            position: tier(columns.position)?,
            recommendation: tier(columns.recommendation)?,
        })
    }

    fn corrupt(&self, line: u64, reason: String) -> StoreError {
        StoreError::Corrupt {
            path: self.path.clone(),
            line,
            reason,
        }
    }

    fn write_error(&self, e: impl std::fmt::Display) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }
}

fn to_row(record: &FundHistoryRecord) -> [String; 6] {
    let number = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    let tier = |t: Option<FundTier>| t.map(|t| t.to_string()).unwrap_or_default();
    [
        format_date(record.date),
        number(record.fund_c),
        number(record.fund_d),
        number(record.fund_e),
        tier(record.position),
        tier(record.recommendation),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(d: NaiveDate, c: f64, stamp: FundTier) -> FundHistoryRecord {
        FundHistoryRecord {
            date: d,
            fund_c: Some(c),
            fund_d: Some(c / 2.0),
            fund_e: Some(c / 3.0),
            position: None,
            recommendation: Some(stamp),
        }
    }

    #[test]
    fn test_missing_store_is_empty() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::in_dir(dir.path());
        assert!(!store.exists());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_ingest_creates_sorted_store() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::in_dir(dir.path());

        let summary = store
            .ingest(vec![
                record(date(2024, 3, 2), 40123.45, FundTier::C),
                record(date(2024, 3, 1), 40100.0, FundTier::C),
            ])
            .unwrap();
        assert_eq!(summary.added, 2);

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].date, date(2024, 3, 1));
        assert_eq!(loaded[1].fund_c, Some(40123.45));
        assert_eq!(loaded[1].fund_e, Some(40123.45 / 3.0));

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with("date,fund_c,fund_d,fund_e,position,recommendation\n"));
        assert!(content.contains("2024-03-01,40100,20050,"));
    }

    #[test]
    fn test_reingest_is_byte_identical() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::in_dir(dir.path());
        let batch = vec![
            record(date(2024, 3, 1), 101.5, FundTier::D),
            record(date(2024, 3, 4), 102.25, FundTier::D),
        ];

        store.ingest(batch.clone()).unwrap();
        let first = fs::read(store.path()).unwrap();

        let summary = store.ingest(batch).unwrap();
        let second = fs::read(store.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(summary.added + summary.replaced, 0);
    }

    #[test]
    fn test_last_write_wins_on_disk() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::in_dir(dir.path());

        store
            .ingest(vec![record(date(2024, 3, 1), 100.0, FundTier::C)])
            .unwrap();
        store
            .ingest(vec![record(date(2024, 3, 1), 90.0, FundTier::E)])
            .unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].fund_c, Some(90.0));
        assert_eq!(loaded[0].recommendation, Some(FundTier::E));
    }

    #[test]
    fn test_reads_legacy_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE);
        fs::write(
            &path,
            "Fecha,C,D,E\n02/03/2024,102.5,52,31\n01/03/2024,101.5,51,30\n02/03/2024,103,53,32\n",
        )
        .unwrap();

        let store = HistoryStore::new(&path);
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].date, date(2024, 3, 1));
        assert_eq!(loaded[1].fund_c, Some(103.0));
        assert_eq!(loaded[1].recommendation, None);

        // Rewriting converts the store to the canonical layout.
        store.ingest(Vec::new()).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("2024-03-02,103,53,32,,"));
    }

    #[test]
    fn test_corrupt_store_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE);
        let original = "date,fund_c,fund_d,fund_e\n2024-03-01,abc,1,2\n";
        fs::write(&path, original).unwrap();

        let store = HistoryStore::new(&path);
        let err = store
            .ingest(vec![record(date(2024, 3, 5), 1.0, FundTier::D)])
            .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { line: 2, .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_failed_write_keeps_previous_store() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::in_dir(dir.path());
        store
            .ingest(vec![record(date(2024, 3, 1), 100.0, FundTier::C)])
            .unwrap();
        let before = fs::read(store.path()).unwrap();

        // A regular file where the staging directory should be.
        let blocked = dir.path().join("staging");
        fs::write(&blocked, "").unwrap();

        let err = store
            .write_in(&blocked, &[record(date(2024, 3, 4), 90.0, FundTier::E)])
            .unwrap_err();
        assert!(matches!(err, StoreError::Write { ref path, .. } if path == store.path()));
        assert_eq!(fs::read(store.path()).unwrap(), before);
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_reset() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::in_dir(dir.path());
        store
            .ingest(vec![record(date(2024, 3, 1), 1.0, FundTier::D)])
            .unwrap();

        assert!(store.reset().unwrap());
        assert!(!store.exists());
        assert!(!store.reset().unwrap());
    }
}
