//! Price series and the inputs used to request them

use super::error::InvalidArgument;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Period {
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    FiveYears,
}

impl Period {
    const ALL: [Period; 6] = [
        Period::FiveDays,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::FiveYears,
    ];

    pub fn to_duration(&self) -> Duration {
        match self {
            Period::FiveDays => Duration::days(5),
            Period::OneMonth => Duration::days(30),
            Period::ThreeMonths => Duration::days(91),
            Period::SixMonths => Duration::days(182),
            Period::OneYear => Duration::days(365),
            Period::FiveYears => Duration::days(365 * 5),
        }
    }

    /// Value of the `range` query parameter understood by the chart API.
    pub fn range(&self) -> &'static str {
        match self {
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::FiveYears => "5y",
        }
    }

    /// Smallest period spanning at least `days` calendar days.
    fn covering(days: i64) -> Period {
        Self::ALL
            .into_iter()
            .find(|p| p.to_duration().num_days() >= days)
            .unwrap_or(Period::FiveYears)
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Period::FiveDays => "5D",
                Period::OneMonth => "1M",
                Period::ThreeMonths => "3M",
                Period::SixMonths => "6M",
                Period::OneYear => "1Y",
                Period::FiveYears => "5Y",
            }
        )
    }
}

impl FromStr for Period {
    type Err = InvalidArgument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "5D" => Ok(Period::FiveDays),
            "1M" | "1MO" => Ok(Period::OneMonth),
            "3M" | "3MO" => Ok(Period::ThreeMonths),
            "6M" | "6MO" => Ok(Period::SixMonths),
            "1Y" => Ok(Period::OneYear),
            "5Y" => Ok(Period::FiveYears),
            _ => Err(InvalidArgument::new(format!("unknown period: {s}"))),
        }
    }
}

/// How far back a series reaches: a calendar period or a count of trading sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Lookback {
    Period(Period),
    Sessions(u32),
}

impl Lookback {
    pub fn sessions(n: u32) -> Result<Self, InvalidArgument> {
        if n == 0 {
            return Err(InvalidArgument::new("look-back must be positive"));
        }
        Ok(Lookback::Sessions(n))
    }

    /// Calendar period to request from the quote source.
    pub fn fetch_period(&self) -> Period {
        match self {
            Lookback::Period(p) => *p,
            // Five sessions a week plus a margin for holidays.
            Lookback::Sessions(n) => Period::covering(i64::from(*n) * 7 / 5 + 7),
        }
    }

    /// Number of most recent points to keep after fetching, if bounded.
    pub fn session_limit(&self) -> Option<usize> {
        match self {
            Lookback::Period(_) => None,
            Lookback::Sessions(n) => Some(*n as usize),
        }
    }
}

impl Default for Lookback {
    fn default() -> Self {
        Lookback::Period(Period::OneMonth)
    }
}

impl Display for Lookback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lookback::Period(p) => write!(f, "{p}"),
            Lookback::Sessions(n) => write!(f, "{n}S"),
        }
    }
}

impl FromStr for Lookback {
    type Err = InvalidArgument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        if let Some(count) = upper.strip_suffix('S') {
            let n: u32 = count
                .parse()
                .map_err(|_| InvalidArgument::new(format!("invalid look-back: {s}")))?;
            return Lookback::sessions(n);
        }
        Period::from_str(&upper).map(Lookback::Period)
    }
}

impl TryFrom<String> for Lookback {
    type Error = InvalidArgument;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Lookback> for String {
    fn from(value: Lookback) -> Self {
        value.to_string()
    }
}

/// A quote-source symbol such as `CLP=X` or `^GSPC`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(symbol: &str) -> Result<Self, InvalidArgument> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(InvalidArgument::new("ticker must not be empty"));
        }
        let valid = symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '^' | '=' | '.' | '-' | '_'));
        if !valid {
            return Err(InvalidArgument::new(format!("invalid ticker: {symbol}")));
        }
        Ok(Self(symbol.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Ticker {
    type Error = InvalidArgument;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ticker::parse(&value)
    }
}

impl From<Instrument> for Ticker {
    fn from(instrument: Instrument) -> Self {
        Self(instrument.default_symbol().to_string())
    }
}

impl From<Ticker> for String {
    fn from(value: Ticker) -> Self {
        value.0
    }
}

/// The market instruments the tool follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instrument {
    UsdClp,
    Sp500,
    Copper,
    Ipsa,
}

impl Instrument {
    pub const ALL: [Instrument; 4] = [
        Instrument::UsdClp,
        Instrument::Sp500,
        Instrument::Copper,
        Instrument::Ipsa,
    ];

    pub fn default_symbol(&self) -> &'static str {
        match self {
            Instrument::UsdClp => "CLP=X",
            Instrument::Sp500 => "^GSPC",
            Instrument::Copper => "HG=F",
            Instrument::Ipsa => "^IPSA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Instrument::UsdClp => "USD/CLP",
            Instrument::Sp500 => "S&P 500",
            Instrument::Copper => "Copper",
            Instrument::Ipsa => "IPSA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// Daily closes for one instrument, strictly increasing by timestamp.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series from raw `(unix seconds, close)` pairs. Null and
    /// non-finite closes are dropped, points are sorted and a repeated
    /// timestamp keeps its last value.
    pub fn from_raw(raw: impl IntoIterator<Item = (i64, Option<f64>)>) -> Self {
        let mut points: Vec<PricePoint> = raw
            .into_iter()
            .filter_map(|(ts, close)| {
                let close = close.filter(|c| c.is_finite())?;
                let timestamp = Utc.timestamp_opt(ts, 0).single()?;
                Some(PricePoint { timestamp, close })
            })
            .collect();

        // Stable sort keeps source order among equal timestamps.
        points.sort_by_key(|p| p.timestamp);
        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.timestamp == point.timestamp => *last = point,
                _ => deduped.push(point),
            }
        }
        Self { points: deduped }
    }

    /// Daily series starting 2024-01-01, for tests.
    #[cfg(test)]
    pub(crate) fn from_closes(closes: &[f64]) -> Self {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single();
        let points = closes
            .iter()
            .enumerate()
            .filter_map(|(i, close)| {
                let timestamp = start? + Duration::days(i as i64);
                Some(PricePoint {
                    timestamp,
                    close: *close,
                })
            })
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Close `sessions` points before the latest one.
    pub fn value_back(&self, sessions: usize) -> Option<f64> {
        let idx = self.points.len().checked_sub(sessions + 1)?;
        Some(self.points[idx].close)
    }

    /// Keeps only the most recent `n` points.
    pub fn last_sessions(mut self, n: usize) -> Self {
        if self.points.len() > n {
            self.points.drain(..self.points.len() - n);
        }
        self
    }
}
