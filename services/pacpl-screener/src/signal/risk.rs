//! ATR and entry/stop/target sizing.

use serde::{Deserialize, Serialize};

use super::Direction;
use crate::data::Bar;

/// ATR lookback (Wilder smoothing factor is `1 / ATR_PERIOD`).
pub const ATR_PERIOD: usize = 14;

/// Distance beyond the signal bar extreme at which the entry is placed.
const ENTRY_BUFFER: f64 = 1.0;

/// Stop distance as a multiple of ATR.
const ATR_STOP_MULTIPLIER: f64 = 2.0;

/// Target distance as a multiple of the stop distance.
const REWARD_RATIO: f64 = 1.5;

/// Stop distance as a fraction of entry when ATR is unavailable.
const FALLBACK_RISK_FRACTION: f64 = 0.005;

/// Entry, stop-loss and take-profit for a fired signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskEnvelope {
    pub entry: f64,
    #[serde(rename = "sl")]
    pub stop_loss: f64,
    #[serde(rename = "tp")]
    pub take_profit: f64,
    pub risk: f64,
    pub atr: f64,
}

/// Round to cents, ties to even.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Wilder-smoothed ATR(14) over the whole series.
///
/// Returns 0 when the series has `ATR_PERIOD` bars or fewer. The first bar's
/// true range is its high-low span.
pub fn atr(bars: &[Bar]) -> f64 {
    if bars.len() <= ATR_PERIOD {
        return 0.0;
    }

    let alpha = 1.0 / ATR_PERIOD as f64;
    let mut smoothed = bars[0].high - bars[0].low;

    for pair in bars.windows(2) {
        let (prev, bar) = (&pair[0], &pair[1]);
        let true_range = (bar.high - bar.low)
            .max((bar.high - prev.close).abs())
            .max((bar.low - prev.close).abs());
        smoothed = alpha * true_range + (1.0 - alpha) * smoothed;
    }

    smoothed
}

impl RiskEnvelope {
    /// Size the envelope from the signal bar's extremes.
    pub fn compute(direction: Direction, current_high: f64, current_low: f64, atr: f64) -> Self {
        let entry = match direction {
            Direction::Long => current_high + ENTRY_BUFFER,
            Direction::Short => current_low - ENTRY_BUFFER,
        };

        let risk = if atr > 0.0 {
            atr * ATR_STOP_MULTIPLIER
        } else {
            entry * FALLBACK_RISK_FRACTION
        };

        let (stop_loss, take_profit) = match direction {
            Direction::Long => (entry - risk, entry + risk * REWARD_RATIO),
            Direction::Short => (entry + risk, entry - risk * REWARD_RATIO),
        };

        Self {
            entry: round2(entry),
            stop_loss: round2(stop_loss),
            take_profit: round2(take_profit),
            risk: round2(risk),
            atr: round2(atr),
        }
    }
}
