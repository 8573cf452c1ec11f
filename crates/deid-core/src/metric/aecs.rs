use deid_model::{
    AnonymizationConfig, DataMatrix, DeidError, Dictionary, GeneralizationHierarchy,
    InformationLoss, InformationLossWithBound, Node, Result,
};

use super::{Metric, counted_rows};
use crate::groupify::Groupify;

/// Average equivalence class size.
///
/// Suppressed rows are merged into a single class, so the loss is the counted
/// rows divided by the retained classes plus one for the suppressed ones.
/// The bound ignores suppression.
#[derive(Debug, Default)]
pub struct AverageClassSize {
    rows: Option<f64>,
}

impl AverageClassSize {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> Result<f64> {
        self.rows.ok_or(DeidError::MetricNotInitialized {
            metric: "average class size",
        })
    }
}

impl Metric for AverageClassSize {
    fn name(&self) -> &'static str {
        "Average equivalence class size"
    }

    fn is_monotonic(&self) -> bool {
        false
    }

    fn is_independent(&self) -> bool {
        false
    }

    fn initialize(
        &mut self,
        _dictionary: &Dictionary,
        data: &DataMatrix,
        _hierarchies: &[GeneralizationHierarchy],
        config: &AnonymizationConfig,
    ) -> Result<()> {
        self.rows = Some(counted_rows(data, config)? as f64);
        Ok(())
    }

    fn information_loss(
        &mut self,
        node: &Node,
        groupify: &Groupify,
    ) -> Result<InformationLossWithBound> {
        let rows = self.rows()?;
        let statistics = groupify.statistics();
        let mut classes = statistics.num_classes - statistics.num_suppressed_classes;
        if statistics.num_suppressed_classes > 0 {
            classes += 1;
        }
        let loss = if classes == 0 { 0.0 } else { rows / classes as f64 };
        let bound = self
            .lower_bound_with_groupify(node, groupify)?
            .unwrap_or(InformationLoss::ZERO);
        Ok(InformationLossWithBound::new(loss, bound))
    }

    fn lower_bound(&mut self, _node: &Node) -> Result<Option<InformationLoss>> {
        Ok(None)
    }

    fn lower_bound_with_groupify(
        &mut self,
        _node: &Node,
        groupify: &Groupify,
    ) -> Result<Option<InformationLoss>> {
        let rows = self.rows()?;
        let classes = groupify.statistics().num_classes;
        Ok(Some(InformationLoss::new(if classes == 0 {
            0.0
        } else {
            rows / classes as f64
        })))
    }

    fn min_information_loss(&self) -> Result<InformationLoss> {
        self.rows().map(|_| InformationLoss::new(1.0))
    }

    fn max_information_loss(&self) -> Result<InformationLoss> {
        self.rows().map(InformationLoss::new)
    }
}
