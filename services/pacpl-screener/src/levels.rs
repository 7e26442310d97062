//! Previous-day and opening-range levels.
//!
//! Both calculations work on the exchange-local calendar date of each bar.
//! "Today" is always the date of the last bar in the series.

use serde::Serialize;

use crate::data::{Bar, BarSeries};

/// Previous-day close, high and low.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyLevels {
    #[serde(rename = "pdc")]
    pub previous_close: f64,
    #[serde(rename = "pdh")]
    pub previous_high: f64,
    #[serde(rename = "pdl")]
    pub previous_low: f64,
}

/// High and low over the first bars of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OpeningRangeLevels {
    pub high: f64,
    pub low: f64,
}

fn high_low(bars: &[Bar]) -> Option<(f64, f64)> {
    let first = bars.first()?;
    Some(bars.iter().fold((first.high, first.low), |(h, l), b| {
        (h.max(b.high), l.min(b.low))
    }))
}

/// Levels of the second most recent date in the series.
///
/// `None` unless the series spans at least two distinct dates.
pub fn daily_levels(series: &BarSeries) -> Option<DailyLevels> {
    let groups = series.date_groups();
    if groups.len() < 2 {
        return None;
    }

    let previous = groups[groups.len() - 2];
    let (previous_high, previous_low) = high_low(previous)?;

    Some(DailyLevels {
        previous_close: previous.last()?.close,
        previous_high,
        previous_low,
    })
}

/// Bar length in minutes, inferred from the first two bars of the full series.
///
/// Falls back to `default_minutes` when the series has fewer than two bars or
/// the delta truncates to zero minutes. The inference deliberately ignores the
/// requested interval; callers that know the interval should pass it through
/// [`opening_range_bar_count`] directly instead.
pub fn infer_interval_minutes(series: &BarSeries, default_minutes: u32) -> u32 {
    match series.bars() {
        [first, second, ..] => {
            let minutes = (second.timestamp - first.timestamp).num_seconds() / 60;
            u32::try_from(minutes)
                .ok()
                .filter(|m| *m > 0)
                .unwrap_or(default_minutes)
        }
        _ => default_minutes,
    }
}

/// Number of bars forming the opening range: `max(1, orb_minutes / interval)`.
pub fn opening_range_bar_count(orb_minutes: u32, interval_minutes: u32) -> usize {
    if interval_minutes == 0 {
        return 1;
    }
    ((orb_minutes / interval_minutes) as usize).max(1)
}

/// Opening range over the first bars of today's session.
pub fn opening_range(
    series: &BarSeries,
    orb_minutes: u32,
    default_interval_minutes: u32,
) -> Option<OpeningRangeLevels> {
    let today = series.today();
    if today.is_empty() {
        return None;
    }

    let interval = infer_interval_minutes(series, default_interval_minutes);
    let count = opening_range_bar_count(orb_minutes, interval).min(today.len());
    let (high, low) = high_low(&today[..count])?;

    Some(OpeningRangeLevels { high, low })
}
