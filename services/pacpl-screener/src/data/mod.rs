//! Market data module.
//!
//! Provides the bar types shared by the level and signal calculations, the
//! provider abstraction, and the blacklist-aware `MarketDataSource`.
//!
//! # Data Sources
//! - **Yahoo chart API** (default): intraday bars per symbol/interval, the
//!   one-minute interval is limited by the provider to a short window.

mod provider;
mod rate_limiter;
mod source;
mod yahoo;

pub use provider::{BarProvider, ProviderError};
pub use rate_limiter::{RateLimiter, SharedRateLimiter};
pub use source::{BadSymbolSet, MarketDataSource};
pub use yahoo::YahooChartProvider;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

// ============================================================================
// Interval
// ============================================================================

/// Bar interval tag as understood by the data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "2m")]
    M2,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "60m")]
    M60,
    #[serde(rename = "90m")]
    M90,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "1d")]
    D1,
}

impl Interval {
    /// Provider tag (e.g., "1m", "15m", "1d")
    pub fn tag(&self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M2 => "2m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::M60 => "60m",
            Self::M90 => "90m",
            Self::H1 => "1h",
            Self::D1 => "1d",
        }
    }

    /// Whether this is the finest granularity the provider offers.
    pub fn is_finest(&self) -> bool {
        matches!(self, Self::M1)
    }

    /// Parse a comma separated list such as "1m,5m". Unknown tags are errors.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse())
            .collect()
    }
}

impl std::str::FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Ok(Self::M1),
            "2m" => Ok(Self::M2),
            "5m" => Ok(Self::M5),
            "15m" => Ok(Self::M15),
            "30m" => Ok(Self::M30),
            "60m" => Ok(Self::M60),
            "90m" => Ok(Self::M90),
            "1h" => Ok(Self::H1),
            "1d" => Ok(Self::D1),
            other => Err(format!("unsupported interval: {}", other)),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

// ============================================================================
// Lookback Window
// ============================================================================

/// History window requested from the provider for one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackWindow {
    /// Number of calendar days
    pub days: u32,
}

impl LookbackWindow {
    /// Provider cap for one-minute bars.
    pub const FINEST_INTERVAL_DAYS: u32 = 5;

    /// Window for an interval: the finest interval is capped by the provider,
    /// everything else uses the configured default.
    pub fn for_interval(interval: Interval, default_days: u32) -> Self {
        let days = if interval.is_finest() {
            Self::FINEST_INTERVAL_DAYS
        } else {
            default_days
        };
        Self { days }
    }

    /// Provider range string (e.g., "5d")
    pub fn range(&self) -> String {
        format!("{}d", self.days)
    }
}

// ============================================================================
// Bars
// ============================================================================

/// A single OHLCV bar, timestamped in exchange-local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time
    pub timestamp: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Exchange-local calendar date of this bar
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Bars for one symbol and interval, strictly ascending by timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Build a series, sorting by timestamp and dropping duplicate timestamps
    /// (the first occurrence wins).
    pub fn new(mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Self { bars }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Most recent bar
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Bars grouped by calendar date, oldest group first.
    pub fn date_groups(&self) -> Vec<&[Bar]> {
        self.bars
            .chunk_by(|a, b| a.date() == b.date())
            .collect()
    }

    /// Bars sharing the date of the last bar, in chronological order.
    pub fn today(&self) -> &[Bar] {
        match self.bars.last() {
            Some(last) => {
                let today = last.date();
                let start = self
                    .bars
                    .iter()
                    .rposition(|b| b.date() != today)
                    .map_or(0, |i| i + 1);
                &self.bars[start..]
            }
            None => &[],
        }
    }
}
