//! Signal detection.
//!
//! Classifies the day's gap against the previous close, evaluates the ten
//! breakout/retest rules on the current bar, and sizes an entry/stop/target
//! envelope from ATR(14) when a rule fires.
//!
//! # Signal families
//! - **Follow**: large gap, breakout in the gap direction after the sustain period
//! - **Fade**: small gap, breakout against the gap direction
//! - **Reversal**: large gap, breakout against the gap direction after the sustain period
//! - **Trend**: small gap, breakout in the gap direction
//! - **PDH/PDL retest**: price returns to a broken previous-day level and holds it

mod engine;
mod gap;
mod risk;

pub use engine::{evaluate, minutes_since_midnight, sustain_bar_count};
pub use gap::{classify_gap, GapCategory, GapClassification};
pub(crate) use risk::round2;
pub use risk::{atr, RiskEnvelope, ATR_PERIOD};

use serde::{Deserialize, Serialize};

use pacpl_common::config::ScreenerConfig;

/// Rule family that produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    Follow,
    Fade,
    Reversal,
    Trend,
    #[serde(rename = "PDH_Retest")]
    PdhRetest,
    #[serde(rename = "PDL_Retest")]
    PdlRetest,
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

/// A fired rule with its risk envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Signal {
    #[serde(rename = "signal_type")]
    pub kind: SignalKind,
    #[serde(rename = "signal_dir")]
    pub direction: Direction,
    #[serde(flatten)]
    pub risk: RiskEnvelope,
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalResult {
    None,
    Triggered(Signal),
}

impl SignalResult {
    pub fn is_signal(&self) -> bool {
        matches!(self, Self::Triggered(_))
    }

    pub fn signal(&self) -> Option<&Signal> {
        match self {
            Self::Triggered(signal) => Some(signal),
            Self::None => None,
        }
    }

    pub fn kind(&self) -> Option<SignalKind> {
        self.signal().map(|s| s.kind)
    }

    pub fn direction(&self) -> Option<Direction> {
        self.signal().map(|s| s.direction)
    }
}

/// Parameters consumed by [`evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub struct SignalParams {
    /// Gap (%) at or beyond which the gap is large
    pub large_gap_pct: f64,
    /// Sustain period for Follow/Reversal in minutes
    pub sustain_minutes: u32,
    /// Retest band around PDH/PDL, in percent
    pub retest_tolerance_pct: f64,
    /// Minutes since midnight before which nothing fires
    pub session_cutoff_minutes: u32,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self::from(&ScreenerConfig::default())
    }
}

impl From<&ScreenerConfig> for SignalParams {
    fn from(config: &ScreenerConfig) -> Self {
        Self {
            large_gap_pct: config.large_gap_pct,
            sustain_minutes: config.sustain_minutes,
            retest_tolerance_pct: config.retest_tolerance_pct,
            session_cutoff_minutes: config.session_cutoff_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_direction_wire_names() {
        assert_eq!(serde_json::to_string(&SignalKind::PdhRetest).unwrap(), "\"PDH_Retest\"");
        assert_eq!(serde_json::to_string(&SignalKind::Follow).unwrap(), "\"Follow\"");
        assert_eq!(serde_json::to_string(&Direction::Short).unwrap(), "\"SHORT\"");
    }

    #[test]
    fn test_signal_serializes_flat() {
        let signal = Signal {
            kind: SignalKind::Fade,
            direction: Direction::Long,
            risk: RiskEnvelope {
                entry: 101.0,
                stop_loss: 100.0,
                take_profit: 102.5,
                risk: 1.0,
                atr: 0.5,
            },
        };
        let json = serde_json::to_value(signal).unwrap();
        assert_eq!(json["signal_type"], "Fade");
        assert_eq!(json["signal_dir"], "LONG");
        assert_eq!(json["entry"], 101.0);
        assert_eq!(json["sl"], 100.0);
        assert_eq!(json["tp"], 102.5);
    }

    #[test]
    fn test_params_from_config() {
        let params = SignalParams::default();
        assert_eq!(params.large_gap_pct, 0.5);
        assert_eq!(params.sustain_minutes, 10);
        assert_eq!(params.session_cutoff_minutes, 558);
    }
}
