//! Symbol scanning.
//!
//! A scan runs every requested interval for a symbol, one after the other,
//! and folds the per-interval results into a [`ScanRecord`]. The
//! [`ScanOrchestrator`] fans symbols out over a bounded worker pool for a
//! batch scan; the [`ScanStreamer`] does the same but reports each completed
//! symbol as a [`ScanEvent`].

mod orchestrator;
mod streamer;

pub use orchestrator::ScanOrchestrator;
pub use streamer::{ScanEvent, ScanStreamer};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::time::Duration;

use pacpl_common::config::ScreenerConfig;

use crate::data::Interval;
use crate::levels::DailyLevels;
use crate::signal::{Signal, SignalParams};

/// Exchange suffixes stripped from display names.
const EXCHANGE_SUFFIXES: [&str; 2] = [".NS", ".BO"];

/// Tunables shared by batch and streaming scans.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub signal: SignalParams,
    pub orb_minutes: u32,
    pub default_interval_minutes: u32,
    pub batch_workers: usize,
    pub stream_workers: usize,
    /// Wait budget for one symbol in a streaming scan
    pub task_timeout: Duration,
}

impl From<&ScreenerConfig> for ScanSettings {
    fn from(config: &ScreenerConfig) -> Self {
        Self {
            signal: SignalParams::from(config),
            orb_minutes: config.orb_minutes,
            default_interval_minutes: config.default_interval_minutes,
            batch_workers: config.batch_workers.max(1),
            stream_workers: config.stream_workers.max(1),
            task_timeout: Duration::from_secs(config.task_timeout_secs),
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self::from(&ScreenerConfig::default())
    }
}

// ============================================================================
// Records
// ============================================================================

/// Reason an interval produced no evaluation.
pub const INSUFFICIENT_DATA: &str = "Insufficient data";
pub const NO_DAILY_LEVELS: &str = "Cannot calculate daily levels";

/// Result of scanning one symbol on one interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerIntervalRecord {
    #[serde(rename = "timeframe")]
    pub interval: Interval,
    /// Close of the last bar
    pub price: Option<f64>,
    pub has_signal: bool,
    pub gap_pct: Option<f64>,
    #[serde(flatten)]
    pub signal: Option<Signal>,
    #[serde(flatten)]
    pub daily: Option<DailyLevels>,
    /// Opening range high
    pub level_high: Option<f64>,
    /// Opening range low
    pub level_low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PerIntervalRecord {
    /// A record for an interval that could not be evaluated.
    pub fn failed(interval: Interval, reason: &str) -> Self {
        Self {
            interval,
            price: None,
            has_signal: false,
            gap_pct: None,
            signal: None,
            daily: None,
            level_high: None,
            level_low: None,
            error: Some(reason.to_string()),
        }
    }
}

/// Result of scanning one symbol across every requested interval.
///
/// The top-level signal fields are copied from the first interval, in the
/// requested order, that produced a signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanRecord {
    pub symbol: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "timeframes", serialize_with = "serialize_intervals")]
    pub intervals: Vec<PerIntervalRecord>,
    pub has_any_signal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(flatten)]
    pub signal: Option<Signal>,
}

impl ScanRecord {
    /// Fold per-interval results, keeping the caller's interval order.
    pub fn from_intervals(symbol: &str, intervals: Vec<PerIntervalRecord>) -> Self {
        let primary = intervals
            .iter()
            .find_map(|r| r.signal.map(|signal| (r.price, signal)));

        Self {
            symbol: symbol.to_string(),
            display_name: display_name(symbol),
            has_any_signal: primary.is_some(),
            price: primary.and_then(|(price, _)| price),
            signal: primary.map(|(_, signal)| signal),
            intervals,
        }
    }

    /// Per-interval result for a given interval tag.
    pub fn interval(&self, interval: Interval) -> Option<&PerIntervalRecord> {
        self.intervals.iter().find(|r| r.interval == interval)
    }
}

/// Symbol without its exchange suffix.
pub fn display_name(symbol: &str) -> String {
    EXCHANGE_SUFFIXES
        .iter()
        .find_map(|suffix| symbol.strip_suffix(suffix))
        .unwrap_or(symbol)
        .to_string()
}

/// Intervals as an object keyed by tag, in scan order.
fn serialize_intervals<S>(records: &[PerIntervalRecord], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(records.len()))?;
    for record in records {
        map.serialize_entry(record.interval.tag(), record)?;
    }
    map.end()
}
