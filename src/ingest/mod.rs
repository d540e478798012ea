//! Fund export ingestion: reading the uploaded sheet and turning its table
//! into history records.

pub mod parse;
pub mod sheet;

use crate::core::history::FundHistoryRecord;
use crate::core::recommendation::FundTier;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use parse::{UploadRow, parse_upload};
pub use sheet::Sheet;

/// A rejected upload. Nothing is written to the store when one is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UploadError {
    #[error("cannot read upload {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },
    #[error("unsupported upload format '{0}', expected .xlsx, .xls, .ods or .csv")]
    UnsupportedFormat(String),
    #[error("upload has no header row after skipping {skipped} metadata rows")]
    MissingHeader { skipped: usize },
    #[error("upload is missing column '{0}'")]
    MissingColumn(&'static str),
    #[error("row {row}: unparseable date '{value}'")]
    InvalidDate { row: usize, value: String },
    #[error("row {row}: unparseable '{column}' value '{value}'")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("upload has no complete data rows")]
    NoDataRows,
}

/// Reads and validates a fund export.
pub fn read_upload(path: &Path, header_rows: usize) -> Result<Vec<UploadRow>, UploadError> {
    let sheet = Sheet::read(path, header_rows)?;
    parse_upload(&sheet, header_rows)
}

/// Stamps every row with the recommendation computed at ingestion time.
pub fn stamp_rows(rows: Vec<UploadRow>, label: FundTier) -> Vec<FundHistoryRecord> {
    rows.into_iter().map(|row| row.stamp(label)).collect()
}
