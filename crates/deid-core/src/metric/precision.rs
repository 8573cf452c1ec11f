use deid_model::{
    AnonymizationConfig, DataMatrix, DeidError, Dictionary, GeneralizationHierarchy,
    InformationLoss, InformationLossWithBound, Node, Result,
};

use super::Metric;
use crate::groupify::Groupify;

/// Mean of `level / max_level` over all attributes. Attributes without
/// generalization levels contribute zero.
#[derive(Debug, Default)]
pub struct Precision {
    max_levels: Option<Vec<u32>>,
}

impl Precision {
    pub fn new() -> Self {
        Self::default()
    }

    fn compute(&self, node: &Node) -> Result<InformationLossWithBound> {
        let max_levels = self
            .max_levels
            .as_ref()
            .ok_or(DeidError::MetricNotInitialized { metric: "precision" })?;
        let transformation = node.transformation();
        if transformation.dimensions() != max_levels.len() {
            return Err(DeidError::DimensionMismatch {
                expected: max_levels.len(),
                actual: transformation.dimensions(),
            });
        }
        if max_levels.is_empty() {
            return Ok(InformationLossWithBound::exact(0.0));
        }
        let total: f64 = transformation
            .iter()
            .zip(max_levels)
            .map(|(level, max)| {
                if *max == 0 {
                    0.0
                } else {
                    f64::from(level) / f64::from(*max)
                }
            })
            .sum();
        Ok(InformationLossWithBound::exact(total / max_levels.len() as f64))
    }
}

impl Metric for Precision {
    fn name(&self) -> &'static str {
        "Precision"
    }

    fn is_monotonic(&self) -> bool {
        true
    }

    fn is_independent(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        _dictionary: &Dictionary,
        _data: &DataMatrix,
        hierarchies: &[GeneralizationHierarchy],
        _config: &AnonymizationConfig,
    ) -> Result<()> {
        self.max_levels = Some(
            hierarchies
                .iter()
                .map(GeneralizationHierarchy::max_level)
                .collect(),
        );
        Ok(())
    }

    fn information_loss(
        &mut self,
        node: &Node,
        _groupify: &Groupify,
    ) -> Result<InformationLossWithBound> {
        self.compute(node)
    }

    fn lower_bound(&mut self, node: &Node) -> Result<Option<InformationLoss>> {
        self.compute(node).map(|loss| Some(loss.lower_bound))
    }

    fn independent_information_loss(
        &mut self,
        node: &Node,
    ) -> Result<Option<InformationLossWithBound>> {
        self.compute(node).map(Some)
    }

    fn max_information_loss(&self) -> Result<InformationLoss> {
        Ok(InformationLoss::new(1.0))
    }
}
