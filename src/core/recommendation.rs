//! Two-factor momentum recommendation over the currency and equity series.

use super::error::InvalidArgument;
use super::series::PriceSeries;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Sessions between the latest close and the one it is compared against.
pub const TREND_OFFSET: usize = 5;

/// Minimum number of points needed to compare against `TREND_OFFSET`.
pub const MIN_OBSERVATIONS: usize = TREND_OFFSET + 1;

/// Pension fund risk tiers, C being the riskiest of the three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FundTier {
    C,
    D,
    E,
}

impl FundTier {
    pub const ALL: [FundTier; 3] = [FundTier::C, FundTier::D, FundTier::E];

    pub fn as_str(&self) -> &'static str {
        match self {
            FundTier::C => "C",
            FundTier::D => "D",
            FundTier::E => "E",
        }
    }
}

impl Display for FundTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FundTier {
    type Err = InvalidArgument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let tier = s
            .strip_prefix("Fondo ")
            .or_else(|| s.strip_prefix("fondo "))
            .unwrap_or(s);
        match tier.to_uppercase().as_str() {
            "C" => Ok(FundTier::C),
            "D" => Ok(FundTier::D),
            "E" => Ok(FundTier::E),
            _ => Err(InvalidArgument::new(format!("unknown fund: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Favorable,
    Neutral,
    Alert,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Favorable => "favorable",
            Severity::Neutral => "neutral",
            Severity::Alert => "alert",
        })
    }
}

/// Which case of the decision table produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rationale {
    BothRising,
    BothFalling,
    MixedSignal,
    InsufficientData {
        currency_points: usize,
        equity_points: usize,
    },
}

impl Display for Rationale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rationale::BothRising => write!(
                f,
                "favorable scenario: USD/CLP and S&P 500 both up over {TREND_OFFSET} sessions"
            ),
            Rationale::BothFalling => write!(
                f,
                "safe-haven alert: USD/CLP and S&P 500 both not rising over {TREND_OFFSET} sessions"
            ),
            Rationale::MixedSignal => write!(
                f,
                "mixed signal: USD/CLP and S&P 500 moved in different directions"
            ),
            Rationale::InsufficientData {
                currency_points,
                equity_points,
            } => write!(
                f,
                "insufficient data: need {MIN_OBSERVATIONS} sessions per series, \
                 have {currency_points} for USD/CLP and {equity_points} for S&P 500"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub label: FundTier,
    pub severity: Severity,
    pub rationale: Rationale,
}

impl Recommendation {
    pub fn headline(&self) -> String {
        format!("100% FONDO {}", self.label)
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self.rationale, Rationale::InsufficientData { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Rising,
    NotRising,
    Insufficient,
}

/// Compares the latest close with the one `TREND_OFFSET` sessions earlier.
pub fn trend(series: Option<&PriceSeries>) -> Trend {
    let Some(series) = series else {
        return Trend::Insufficient;
    };
    if series.len() < MIN_OBSERVATIONS {
        return Trend::Insufficient;
    }
    match (series.value_back(0), series.value_back(TREND_OFFSET)) {
        (Some(latest), Some(prior)) if latest > prior => Trend::Rising,
        (Some(_), Some(_)) => Trend::NotRising,
        _ => Trend::Insufficient,
    }
}

/// Evaluates the decision table. Pure: depends only on the two series.
pub fn recommend(currency: Option<&PriceSeries>, equity: Option<&PriceSeries>) -> Recommendation {
    let (label, severity, rationale) = match (trend(currency), trend(equity)) {
        (Trend::Insufficient, _) | (_, Trend::Insufficient) => (
            FundTier::D,
            Severity::Neutral,
            Rationale::InsufficientData {
                currency_points: currency.map_or(0, PriceSeries::len),
                equity_points: equity.map_or(0, PriceSeries::len),
            },
        ),
        (Trend::Rising, Trend::Rising) => (FundTier::C, Severity::Favorable, Rationale::BothRising),
        (Trend::NotRising, Trend::NotRising) => {
            (FundTier::E, Severity::Alert, Rationale::BothFalling)
        }
        _ => (FundTier::D, Severity::Neutral, Rationale::MixedSignal),
    };

    Recommendation {
        label,
        severity,
        rationale,
    }
}
