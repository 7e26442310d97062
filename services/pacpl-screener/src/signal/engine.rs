//! Rule evaluation.

use chrono::{DateTime, FixedOffset, Timelike};
use tracing::debug;

use super::gap::{classify_gap, GapCategory};
use super::risk::{atr, RiskEnvelope};
use super::{Direction, Signal, SignalKind, SignalParams, SignalResult};
use crate::data::BarSeries;
use crate::levels::{DailyLevels, OpeningRangeLevels};

/// Bar length assumed by the sustain gate, whatever interval is scanned.
const SUSTAIN_BAR_MINUTES: u32 = 5;

/// Minutes since local midnight.
pub fn minutes_since_midnight(timestamp: &DateTime<FixedOffset>) -> u32 {
    timestamp.hour() * 60 + timestamp.minute()
}

/// Bars that must have elapsed today before Follow/Reversal can fire.
pub fn sustain_bar_count(sustain_minutes: u32) -> usize {
    ((sustain_minutes / SUSTAIN_BAR_MINUTES) as usize).max(1)
}

/// Evaluate every rule against the last bar of `series`.
///
/// Rules run in a fixed order and each one that matches replaces the previous
/// match, so the retest rules take priority over the gap rules. Rules that
/// need the opening range are skipped when `orb` is `None`.
pub fn evaluate(
    series: &BarSeries,
    daily: &DailyLevels,
    orb: Option<&OpeningRangeLevels>,
    params: &SignalParams,
) -> SignalResult {
    let today = series.today();
    let (Some(first), Some(current)) = (today.first(), today.last()) else {
        return SignalResult::None;
    };

    if minutes_since_midnight(&current.timestamp) < params.session_cutoff_minutes {
        return SignalResult::None;
    }

    let gap = classify_gap(first.open, Some(daily.previous_close), params.large_gap_pct);
    let sustained = today.len() >= sustain_bar_count(params.sustain_minutes);
    let close = current.close;

    let large_up = gap.category == GapCategory::LargeUp;
    let large_down = gap.category == GapCategory::LargeDown;
    let small = gap.category == GapCategory::Small;

    let mut fired: Option<(SignalKind, Direction)> = None;

    if let Some(orb) = orb {
        let above = close > orb.high;
        let below = close < orb.low;

        if large_up && sustained && above {
            fired = Some((SignalKind::Follow, Direction::Long));
        }
        if large_down && sustained && below {
            fired = Some((SignalKind::Follow, Direction::Short));
        }
        if small && gap.gap_pct > 0.0 && below {
            fired = Some((SignalKind::Fade, Direction::Short));
        }
        if small && gap.gap_pct < 0.0 && above {
            fired = Some((SignalKind::Fade, Direction::Long));
        }
        if large_down && sustained && above {
            fired = Some((SignalKind::Reversal, Direction::Long));
        }
        if large_up && sustained && below {
            fired = Some((SignalKind::Reversal, Direction::Short));
        }
        if small && gap.gap_pct > 0.0 && above {
            fired = Some((SignalKind::Trend, Direction::Long));
        }
        if small && gap.gap_pct < 0.0 && below {
            fired = Some((SignalKind::Trend, Direction::Short));
        }
    }

    let tolerance = params.retest_tolerance_pct / 100.0;
    let pdh = daily.previous_high;
    let pdl = daily.previous_low;

    let broke_pdh = today.iter().any(|b| b.close > pdh);
    if broke_pdh && current.low <= pdh * (1.0 + tolerance) && close > pdh {
        fired = Some((SignalKind::PdhRetest, Direction::Long));
    }

    let broke_pdl = today.iter().any(|b| b.close < pdl);
    if broke_pdl && current.high >= pdl * (1.0 - tolerance) && close < pdl {
        fired = Some((SignalKind::PdlRetest, Direction::Short));
    }

    let Some((kind, direction)) = fired else {
        return SignalResult::None;
    };

    let atr = atr(series.bars());
    let risk = RiskEnvelope::compute(direction, current.high, current.low, atr);

    debug!(
        kind = ?kind,
        direction = ?direction,
        gap_pct = gap.gap_pct,
        close,
        entry = risk.entry,
        "Signal rule matched"
    );

    SignalResult::Triggered(Signal {
        kind,
        direction,
        risk,
    })
}
