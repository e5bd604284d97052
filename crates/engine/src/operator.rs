//! Per-pixel aggregation operators

use serde::{Deserialize, Serialize};

/// Sentinel "no information" value of visibility tiles.
pub const VISIBILITY_NODATA: i32 = i32::MIN;

/// How a ray's visibility verdict combines with the prior value of a
/// visibility cell.
///
/// A closed sum type rather than a callback: the driver needs to know
/// statically whether an operator is idempotent (safe under task retries
/// and duplicate packets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AggregationOperator {
    /// Visible from any ray pass (logical OR)
    #[default]
    Or,
    /// Visible only if every ray pass agrees (logical AND)
    And,
    /// Count of sighting passes
    Sum,
    /// Count of sweep passes regardless of verdict (diagnostics)
    Debug,
}

impl AggregationOperator {
    /// Combine a verdict into the current cell value.
    ///
    /// `VISIBILITY_NODATA` cells take the verdict directly; `intensity` is
    /// the ray's `v0` and only participates in `Sum`.
    pub fn apply(self, current: i32, visible: bool, intensity: f64) -> i32 {
        let verdict = visible as i32;
        match self {
            AggregationOperator::Or => {
                if current == VISIBILITY_NODATA {
                    verdict
                } else {
                    current.max(verdict)
                }
            }
            AggregationOperator::And => {
                if current == VISIBILITY_NODATA {
                    verdict
                } else {
                    current.min(verdict)
                }
            }
            AggregationOperator::Sum => {
                let base = if current == VISIBILITY_NODATA { 0 } else { current };
                if visible {
                    base + intensity.round() as i32
                } else {
                    base
                }
            }
            AggregationOperator::Debug => {
                let base = if current == VISIBILITY_NODATA { 0 } else { current };
                base + 1
            }
        }
    }

    /// Whether repeated application of the same verdict leaves the cell
    /// unchanged. Non-idempotent operators require exactly-once packet
    /// delivery, which the bus does not provide.
    pub fn is_idempotent(self) -> bool {
        matches!(self, AggregationOperator::Or | AggregationOperator::And)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_saturates() {
        let op = AggregationOperator::Or;
        assert_eq!(op.apply(VISIBILITY_NODATA, false, 1.0), 0);
        assert_eq!(op.apply(0, true, 1.0), 1);
        assert_eq!(op.apply(1, false, 1.0), 1);
        // idempotent under re-delivery
        assert_eq!(op.apply(1, true, 1.0), 1);
    }

    #[test]
    fn test_and_requires_agreement() {
        let op = AggregationOperator::And;
        assert_eq!(op.apply(VISIBILITY_NODATA, true, 1.0), 1);
        assert_eq!(op.apply(1, false, 1.0), 0);
        assert_eq!(op.apply(0, true, 1.0), 0);
    }

    #[test]
    fn test_sum_counts_sightings() {
        let op = AggregationOperator::Sum;
        let v = op.apply(VISIBILITY_NODATA, true, 1.0);
        let v = op.apply(v, true, 1.0);
        let v = op.apply(v, false, 1.0);
        assert_eq!(v, 2);
        assert!(!op.is_idempotent());
    }

    #[test]
    fn test_debug_counts_passes() {
        let op = AggregationOperator::Debug;
        let v = op.apply(VISIBILITY_NODATA, false, 1.0);
        let v = op.apply(v, false, 1.0);
        assert_eq!(v, 2);
    }
}
