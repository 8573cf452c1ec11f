use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A non-negative information-loss value.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InformationLoss(f64);

impl InformationLoss {
    pub const ZERO: InformationLoss = InformationLoss(0.0);

    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Rescales this value into [0, 1] against the given global bounds.
    ///
    /// A degenerate range maps every value to 0.
    pub fn relative_to(self, min: InformationLoss, max: InformationLoss) -> f64 {
        let range = max.0 - min.0;
        if range <= 0.0 || !range.is_finite() {
            return 0.0;
        }
        ((self.0 - min.0) / range).clamp(0.0, 1.0)
    }

    /// Total order used when comparing candidate optima.
    pub fn compare(self, other: InformationLoss) -> Ordering {
        self.0.total_cmp(&other.0)
    }

    pub fn min(self, other: InformationLoss) -> InformationLoss {
        if self.compare(other) == Ordering::Greater {
            other
        } else {
            self
        }
    }

    pub fn max(self, other: InformationLoss) -> InformationLoss {
        if self.compare(other) == Ordering::Less {
            other
        } else {
            self
        }
    }
}

impl From<f64> for InformationLoss {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl fmt::Display for InformationLoss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// A realized loss together with a lower bound that never exceeds it for
/// monotonic metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InformationLossWithBound {
    pub loss: InformationLoss,
    pub lower_bound: InformationLoss,
}

impl InformationLossWithBound {
    pub fn new(loss: impl Into<InformationLoss>, lower_bound: impl Into<InformationLoss>) -> Self {
        Self {
            loss: loss.into(),
            lower_bound: lower_bound.into(),
        }
    }

    /// Loss and bound coincide.
    pub fn exact(loss: impl Into<InformationLoss>) -> Self {
        let loss = loss.into();
        Self {
            loss,
            lower_bound: loss,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_rescales_into_unit_interval() {
        let min = InformationLoss::new(10.0);
        let max = InformationLoss::new(30.0);
        assert_eq!(InformationLoss::new(20.0).relative_to(min, max), 0.5);
        assert_eq!(InformationLoss::new(10.0).relative_to(min, max), 0.0);
        assert_eq!(InformationLoss::new(30.0).relative_to(min, max), 1.0);
    }

    #[test]
    fn degenerate_range_is_zero() {
        let bound = InformationLoss::new(4.0);
        assert_eq!(InformationLoss::new(4.0).relative_to(bound, bound), 0.0);
    }
}
