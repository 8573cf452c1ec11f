//! Privacy criteria and search configuration.

use serde::{Deserialize, Serialize};

use crate::data::RowSet;
use crate::error::{DeidError, Result};

/// A privacy model evaluated per equivalence class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrivacyCriterion {
    /// Every non-suppressed class holds at least `k` rows.
    KAnonymity { k: usize },
    /// The share of each class that belongs to the research subset lies
    /// within `[d_min, d_max]`.
    DPresence {
        d_min: f64,
        d_max: f64,
        subset: RowSet,
    },
}

impl PrivacyCriterion {
    /// Whether generalizing an anonymous transformation keeps it anonymous.
    pub fn is_monotonic(&self) -> bool {
        matches!(self, PrivacyCriterion::KAnonymity { .. })
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            PrivacyCriterion::KAnonymity { k } if *k == 0 => Err(DeidError::InvalidCriterion {
                message: "k must be at least 1".to_string(),
            }),
            PrivacyCriterion::DPresence { d_min, d_max, .. }
                if !(0.0..=1.0).contains(d_min)
                    || !(0.0..=1.0).contains(d_max)
                    || d_min > d_max =>
            {
                Err(DeidError::InvalidCriterion {
                    message: format!("d-presence bounds [{d_min}, {d_max}] must satisfy 0 <= min <= max <= 1"),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Settings consumed by metric initialization, class suppression and search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnonymizationConfig {
    /// Active privacy criteria; all must hold.
    pub criteria: Vec<PrivacyCriterion>,

    /// Fraction of rows that may be suppressed as outliers.
    pub max_outliers: f64,

    /// Keep a grouper snapshot when classes/rows stays at or below this ratio.
    pub snapshot_size_dataset: f64,

    /// Keep an incremental snapshot when its size relative to the source
    /// snapshot stays at or below this ratio.
    pub snapshot_size_snapshot: f64,

    /// Upper bound on retained snapshots.
    pub max_snapshots: usize,

    /// Stop the search after the level in which this many checks were made.
    pub max_checks: Option<usize>,
}

impl Default for AnonymizationConfig {
    fn default() -> Self {
        Self {
            criteria: Vec::new(),
            max_outliers: 0.0,
            snapshot_size_dataset: 0.2,
            snapshot_size_snapshot: 0.8,
            max_snapshots: 64,
            max_checks: None,
        }
    }
}

impl AnonymizationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_criterion(mut self, criterion: PrivacyCriterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    pub fn with_max_outliers(mut self, max_outliers: f64) -> Self {
        self.max_outliers = max_outliers;
        self
    }

    pub fn with_max_checks(mut self, max_checks: Option<usize>) -> Self {
        self.max_checks = max_checks;
        self
    }

    pub fn with_max_snapshots(mut self, max_snapshots: usize) -> Self {
        self.max_snapshots = max_snapshots;
        self
    }

    /// Largest `k` over all k-anonymity criteria.
    pub fn min_group_size(&self) -> Option<usize> {
        self.criteria
            .iter()
            .filter_map(|criterion| match criterion {
                PrivacyCriterion::KAnonymity { k } => Some(*k),
                PrivacyCriterion::DPresence { .. } => None,
            })
            .max()
    }

    /// The single d-presence criterion as `(d_min, d_max, subset)`.
    ///
    /// Configuring more than one is a usage error.
    pub fn d_presence(&self) -> Result<Option<(f64, f64, &RowSet)>> {
        let mut found = self.criteria.iter().filter_map(|criterion| match criterion {
            PrivacyCriterion::DPresence {
                d_min,
                d_max,
                subset,
            } => Some((*d_min, *d_max, subset)),
            PrivacyCriterion::KAnonymity { .. } => None,
        });
        let first = found.next();
        let extra = found.count();
        if extra > 0 {
            return Err(DeidError::MultipleResearchSubsets { count: extra + 1 });
        }
        Ok(first)
    }

    /// Rows counting toward frequency statistics, if restricted.
    pub fn research_subset(&self) -> Result<Option<&RowSet>> {
        Ok(self.d_presence()?.map(|(_, _, subset)| subset))
    }

    /// Whether anonymity is inherited by every generalization.
    pub fn is_monotonic(&self) -> bool {
        self.criteria.iter().all(PrivacyCriterion::is_monotonic)
    }

    /// Validates ranges against a dataset of `rows` rows.
    pub fn validate(&self, rows: usize) -> Result<()> {
        if !(0.0..=1.0).contains(&self.max_outliers) {
            return Err(DeidError::InvalidSuppressionLimit {
                value: self.max_outliers,
            });
        }
        for (name, ratio) in [
            ("snapshot_size_dataset", self.snapshot_size_dataset),
            ("snapshot_size_snapshot", self.snapshot_size_snapshot),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(DeidError::InvalidConfig {
                    message: format!("{name} must be within [0,1], got {ratio}"),
                });
            }
        }
        for criterion in &self.criteria {
            criterion.validate()?;
        }
        if let Some(subset) = self.research_subset()?
            && subset.universe() != rows
        {
            return Err(DeidError::SubsetOutOfRange {
                size: subset.universe(),
                rows,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subset() -> RowSet {
        RowSet::from_rows(4, [0, 2]).unwrap()
    }

    #[test]
    fn defaults() {
        let config = AnonymizationConfig::default();
        assert_eq!(config.max_outliers, 0.0);
        assert_eq!(config.snapshot_size_dataset, 0.2);
        assert!(config.is_monotonic());
        assert!(config.min_group_size().is_none());
    }

    #[test]
    fn at_most_one_research_subset() {
        let config = AnonymizationConfig::new()
            .with_criterion(PrivacyCriterion::DPresence {
                d_min: 0.0,
                d_max: 1.0,
                subset: subset(),
            })
            .with_criterion(PrivacyCriterion::DPresence {
                d_min: 0.1,
                d_max: 0.9,
                subset: subset(),
            });
        assert_eq!(
            config.research_subset().unwrap_err(),
            DeidError::MultipleResearchSubsets { count: 2 }
        );
        assert!(config.validate(4).is_err());
    }

    #[test]
    fn suppression_limit_is_a_fraction() {
        let config = AnonymizationConfig::new().with_max_outliers(1.5);
        assert!(matches!(
            config.validate(10),
            Err(DeidError::InvalidSuppressionLimit { .. })
        ));
    }

    #[test]
    fn d_presence_is_not_monotonic() {
        let config = AnonymizationConfig::new()
            .with_criterion(PrivacyCriterion::KAnonymity { k: 2 })
            .with_criterion(PrivacyCriterion::DPresence {
                d_min: 0.0,
                d_max: 0.5,
                subset: subset(),
            });
        assert!(!config.is_monotonic());
        assert_eq!(config.min_group_size(), Some(2));
        assert_eq!(config.research_subset().unwrap().map(RowSet::size), Some(2));
        assert!(config.validate(4).is_ok());
        assert!(config.validate(5).is_err());
    }

    #[test]
    fn zero_k_is_rejected() {
        assert!(PrivacyCriterion::KAnonymity { k: 0 }.validate().is_err());
    }
}
