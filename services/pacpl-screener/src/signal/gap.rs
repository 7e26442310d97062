//! Opening gap classification.

use serde::Serialize;

/// Size bucket of the opening gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GapCategory {
    LargeUp,
    LargeDown,
    Small,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GapClassification {
    pub gap_pct: f64,
    pub category: GapCategory,
}

/// Classify today's open against the previous close.
///
/// A missing or zero previous close yields a zero, small gap.
pub fn classify_gap(
    today_open: f64,
    previous_close: Option<f64>,
    large_gap_pct: f64,
) -> GapClassification {
    let gap_pct = match previous_close {
        Some(pdc) if pdc != 0.0 => (today_open - pdc) / pdc * 100.0,
        _ => 0.0,
    };

    let category = if gap_pct >= large_gap_pct {
        GapCategory::LargeUp
    } else if gap_pct <= -large_gap_pct {
        GapCategory::LargeDown
    } else {
        GapCategory::Small
    };

    GapClassification { gap_pct, category }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gap_buckets() {
        assert_eq!(classify_gap(100.6, Some(100.0), 0.5).category, GapCategory::LargeUp);
        assert_eq!(classify_gap(99.4, Some(100.0), 0.5).category, GapCategory::LargeDown);
        assert_eq!(classify_gap(100.2, Some(100.0), 0.5).category, GapCategory::Small);
        assert_eq!(classify_gap(99.8, Some(100.0), 0.5).category, GapCategory::Small);
    }

    #[test]
    fn test_gap_threshold_is_inclusive() {
        let gap = classify_gap(150.0, Some(100.0), 50.0);
        assert_eq!(gap.gap_pct, 50.0);
        assert_eq!(gap.category, GapCategory::LargeUp);
        assert_eq!(classify_gap(50.0, Some(100.0), 50.0).category, GapCategory::LargeDown);
    }

    #[test]
    fn test_missing_previous_close_is_small() {
        let gap = classify_gap(100.0, Some(0.0), 0.5);
        assert_eq!(gap.gap_pct, 0.0);
        assert_eq!(gap.category, GapCategory::Small);
        assert_eq!(classify_gap(100.0, None, 0.5).category, GapCategory::Small);
    }

    #[test]
    fn test_partition_is_exhaustive_and_exclusive() {
        let threshold = 0.5;
        let mut pdc = 90.0;
        while pdc < 110.0 {
            let gap = classify_gap(100.0, Some(pdc), threshold);
            let up = gap.gap_pct >= threshold;
            let down = gap.gap_pct <= -threshold;
            let small = !up && !down;
            assert_eq!([up, down, small].iter().filter(|b| **b).count(), 1);
            let expected = if up {
                GapCategory::LargeUp
            } else if down {
                GapCategory::LargeDown
            } else {
                GapCategory::Small
            };
            assert_eq!(gap.category, expected);
            pdc += 0.137;
        }
    }
}
