//! Fund history records and the last-write-wins merge by date.

use super::recommendation::FundTier;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Textual form of dates in the persisted store.
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Accepted date spellings, canonical first. Day-first forms come from
/// exports and older stores.
const DATE_FORMATS: [&str; 5] = [
    CANONICAL_DATE_FORMAT,
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%Y/%m/%d",
    "%Y-%m-%d %H:%M:%S",
];

/// Parses a date written in any accepted form.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(text, fmt)
            .ok()
            .or_else(|| {
                chrono::NaiveDateTime::parse_from_str(text, fmt)
                    .ok()
                    .map(|dt| dt.date())
            })
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(CANONICAL_DATE_FORMAT).to_string()
}

/// One day of fund unit values.
#[derive(Debug, Clone, PartialEq)]
pub struct FundHistoryRecord {
    pub date: NaiveDate,
    pub fund_c: Option<f64>,
    pub fund_d: Option<f64>,
    pub fund_e: Option<f64>,
    /// Fund the user reported holding on this date.
    pub position: Option<FundTier>,
    /// Recommendation stamped when the record was ingested.
    pub recommendation: Option<FundTier>,
}

impl FundHistoryRecord {
    pub fn unit_value(&self, fund: FundTier) -> Option<f64> {
        match fund {
            FundTier::C => self.fund_c,
            FundTier::D => self.fund_d,
            FundTier::E => self.fund_e,
        }
    }

    fn set_unit_value(&mut self, fund: FundTier, value: Option<f64>) {
        match fund {
            FundTier::C => self.fund_c = value,
            FundTier::D => self.fund_d = value,
            FundTier::E => self.fund_e = value,
        }
    }
}

/// A single day entered by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualEntry {
    pub date: NaiveDate,
    pub fund: FundTier,
    pub unit_value: Option<f64>,
}

impl ManualEntry {
    pub fn into_record(self, stamp: FundTier) -> FundHistoryRecord {
        let mut record = FundHistoryRecord {
            date: self.date,
            fund_c: None,
            fund_d: None,
            fund_e: None,
            position: Some(self.fund),
            recommendation: Some(stamp),
        };
        record.set_unit_value(self.fund, self.unit_value);
        record
    }
}

/// Counts reported after a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeSummary {
    pub added: usize,
    pub replaced: usize,
    pub total: usize,
}

/// Concatenates `existing` and `incoming`, keeps the last record seen for each
/// date and returns them sorted by date.
pub fn merge(
    existing: Vec<FundHistoryRecord>,
    incoming: Vec<FundHistoryRecord>,
) -> (Vec<FundHistoryRecord>, MergeSummary) {
    let before: BTreeMap<NaiveDate, FundHistoryRecord> =
        existing.into_iter().map(|r| (r.date, r)).collect();

    let mut by_date = before.clone();
    for record in incoming {
        by_date.insert(record.date, record);
    }

    let summary = MergeSummary {
        added: by_date.keys().filter(|d| !before.contains_key(*d)).count(),
        replaced: before
            .iter()
            .filter(|&(d, r)| by_date.get(d) != Some(r))
            .count(),
        total: by_date.len(),
    };
    (by_date.into_values().collect(), summary)
}

/// True when dates are unique and strictly ascending.
pub fn is_canonical(records: &[FundHistoryRecord]) -> bool {
    records.windows(2).all(|w| w[0].date < w[1].date)
}
