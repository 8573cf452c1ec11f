use deid_model::{
    AnonymizationConfig, DataMatrix, DeidError, Dictionary, GeneralizationHierarchy,
    InformationLoss, InformationLossWithBound, Node, Result,
};

use super::Metric;
use crate::groupify::Groupify;

/// Sum of the generalization levels of a transformation.
#[derive(Debug, Default)]
pub struct Height {
    max: Option<u32>,
}

impl Height {
    pub fn new() -> Self {
        Self::default()
    }

    fn loss(node: &Node) -> InformationLossWithBound {
        InformationLossWithBound::exact(f64::from(node.transformation().level()))
    }
}

impl Metric for Height {
    fn name(&self) -> &'static str {
        "Height"
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
        self.max = Some(hierarchies.iter().map(GeneralizationHierarchy::max_level).sum());
        Ok(())
    }

    fn information_loss(
        &mut self,
        node: &Node,
        _groupify: &Groupify,
    ) -> Result<InformationLossWithBound> {
        Ok(Self::loss(node))
    }

    fn lower_bound(&mut self, node: &Node) -> Result<Option<InformationLoss>> {
        Ok(Some(Self::loss(node).lower_bound))
    }

    fn independent_information_loss(
        &mut self,
        node: &Node,
    ) -> Result<Option<InformationLossWithBound>> {
        Ok(Some(Self::loss(node)))
    }

    fn max_information_loss(&self) -> Result<InformationLoss> {
        self.max
            .map(|max| InformationLoss::new(f64::from(max)))
            .ok_or(DeidError::MetricNotInitialized { metric: "height" })
    }
}

#[cfg(test)]
mod tests {
    use deid_model::{NodeId, Transformation};

    use super::*;

    #[test]
    fn loss_is_level_sum() {
        let mut metric = Height::new();
        let node = Node::new(NodeId(3), Transformation::new(vec![2, 0, 1]));
        let loss = metric.independent_information_loss(&node).unwrap().unwrap();
        assert_eq!(loss.loss.value(), 3.0);
        assert_eq!(metric.lower_bound(&node).unwrap(), Some(InformationLoss::new(3.0)));
        assert!(metric.max_information_loss().is_err());
    }
}
