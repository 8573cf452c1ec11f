//! Information-loss metrics.
//!
//! This module provides the [`Metric`] trait and the metric family used by the
//! search. A metric scores a lattice node either from the aggregated classes of
//! a [`Groupify`] or, for attribute-independent metrics, from the node's
//! transformation alone.
//!
//! # Monotonicity
//!
//! For a monotonic metric, generalizing a transformation never lowers its
//! loss, and the lower bound it reports never exceeds the true loss. The
//! search relies on both to prune branches without missing the optimum.
//!
//! # Example
//!
//! ```ignore
//! use deid_core::metric::{create_metric, MetricKind};
//!
//! let mut metric = create_metric(MetricKind::Entropy);
//! metric.initialize(&problem.dictionary, &problem.data, &problem.hierarchies, &problem.config)?;
//! let loss = metric.evaluate(node, &groupify)?;
//! ```

mod aecs;
mod discernability;
mod entropy;
mod height;
mod precision;

use std::fmt;

use serde::{Deserialize, Serialize};

use deid_model::{
    AnonymizationConfig, DataMatrix, Dictionary, GeneralizationHierarchy, InformationLoss,
    InformationLossWithBound, Node, Result,
};

use crate::groupify::Groupify;

pub use aecs::AverageClassSize;
pub use discernability::Discernability;
pub use entropy::NonUniformEntropy;
pub use height::Height;
pub use precision::Precision;

/// Scores lattice nodes.
///
/// Implementors must keep [`Metric::information_loss`] non-negative. When
/// [`Metric::is_monotonic`] holds, the reported lower bound must never exceed
/// the loss of the same node, and the loss of a node must never exceed the
/// loss of any of its generalizations.
pub trait Metric: Send {
    /// Human-readable name, used in logs and summaries.
    fn name(&self) -> &'static str;

    /// Whether generalizing never lowers the loss.
    fn is_monotonic(&self) -> bool;

    /// Whether the loss depends on the transformation only, not on the
    /// classes it produces.
    fn is_independent(&self) -> bool;

    /// One-time precomputation over the dataset and hierarchies.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is unusable for this metric,
    /// for example more than one research subset.
    fn initialize(
        &mut self,
        dictionary: &Dictionary,
        data: &DataMatrix,
        hierarchies: &[GeneralizationHierarchy],
        config: &AnonymizationConfig,
    ) -> Result<()>;

    /// Loss of `node` given its classes, together with a lower bound.
    fn information_loss(
        &mut self,
        node: &Node,
        groupify: &Groupify,
    ) -> Result<InformationLossWithBound>;

    /// Cheap pre-check without grouping. `None` means the bound is unknown.
    fn lower_bound(&mut self, node: &Node) -> Result<Option<InformationLoss>> {
        Ok(node.lower_bound())
    }

    /// Lower bound computed from already grouped classes.
    fn lower_bound_with_groupify(
        &mut self,
        node: &Node,
        _groupify: &Groupify,
    ) -> Result<Option<InformationLoss>> {
        Ok(node.lower_bound())
    }

    /// Loss computed without grouping, available for independent metrics.
    fn independent_information_loss(
        &mut self,
        _node: &Node,
    ) -> Result<Option<InformationLossWithBound>> {
        Ok(None)
    }

    /// Smallest loss this metric can report on the initialized dataset.
    fn min_information_loss(&self) -> Result<InformationLoss> {
        Ok(InformationLoss::ZERO)
    }

    /// Largest loss this metric can report on the initialized dataset.
    fn max_information_loss(&self) -> Result<InformationLoss> {
        Ok(InformationLoss::new(f64::MAX))
    }

    /// Computes the loss and stores loss and bound on the node.
    ///
    /// Values already present on the node are kept.
    fn evaluate(&mut self, node: &Node, groupify: &Groupify) -> Result<InformationLossWithBound> {
        let result = self.information_loss(node, groupify)?;
        node.set_information_loss(result.loss);
        node.set_lower_bound(result.lower_bound);
        Ok(result)
    }
}

/// Selects a metric by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Monotonic non-uniform entropy.
    #[default]
    Entropy,
    /// Non-monotonic discernability.
    Discernability,
    /// Sum of generalization levels.
    Height,
    /// Mean relative generalization level.
    Precision,
    /// Average equivalence class size.
    AverageClassSize,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Entropy,
        MetricKind::Discernability,
        MetricKind::Height,
        MetricKind::Precision,
        MetricKind::AverageClassSize,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Entropy => "entropy",
            MetricKind::Discernability => "discernability",
            MetricKind::Height => "height",
            MetricKind::Precision => "precision",
            MetricKind::AverageClassSize => "average_class_size",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Creates an uninitialized metric of the given kind.
pub fn create_metric(kind: MetricKind) -> Box<dyn Metric> {
    match kind {
        MetricKind::Entropy => Box::new(NonUniformEntropy::new()),
        MetricKind::Discernability => Box::new(Discernability::new()),
        MetricKind::Height => Box::new(Height::new()),
        MetricKind::Precision => Box::new(Precision::new()),
        MetricKind::AverageClassSize => Box::new(AverageClassSize::new()),
    }
}

/// Rows counting toward statistics: the research subset if one is configured,
/// otherwise every row.
pub(crate) fn counted_rows(data: &DataMatrix, config: &AnonymizationConfig) -> Result<usize> {
    Ok(config
        .research_subset()?
        .map_or(data.num_rows(), |subset| subset.size()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_round_trip_through_names() {
        for kind in MetricKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(serde_json::from_str::<MetricKind>(&json).unwrap(), kind);
        }
    }

    #[test]
    fn factory_reports_capabilities() {
        let monotonic: Vec<_> = MetricKind::ALL
            .into_iter()
            .map(|kind| create_metric(kind).is_monotonic())
            .collect();
        assert_eq!(monotonic, vec![true, false, true, true, false]);
        assert!(create_metric(MetricKind::Height).is_independent());
        assert!(!create_metric(MetricKind::Discernability).is_independent());
    }
}
