use deid_model::{
    AnonymizationConfig, DataMatrix, DeidError, Dictionary, GeneralizationHierarchy,
    InformationLoss, InformationLossWithBound, Node, Result,
};

use super::{Metric, counted_rows};
use crate::groupify::Groupify;

/// Non-monotonic discernability.
///
/// A class of size `c` costs `c²`, or `rows * c` once it is suppressed. The
/// bound charges `c²` for every class regardless of suppression.
#[derive(Debug, Default)]
pub struct Discernability {
    rows: Option<f64>,
}

impl Discernability {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> Result<f64> {
        self.rows.ok_or(DeidError::MetricNotInitialized {
            metric: "discernability",
        })
    }
}

impl Metric for Discernability {
    fn name(&self) -> &'static str {
        "Non-monotonic discernability"
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
        _node: &Node,
        groupify: &Groupify,
    ) -> Result<InformationLossWithBound> {
        let rows = self.rows()?;
        let mut dm = 0.0;
        let mut dm_star = 0.0;
        for entry in groupify.iter().filter(|entry| entry.count > 0) {
            let count = entry.count as f64;
            let current = count * count;
            dm_star += current;
            dm += if entry.is_not_outlier {
                current
            } else {
                rows * count
            };
        }
        Ok(InformationLossWithBound::new(dm, dm_star))
    }

    fn lower_bound(&mut self, _node: &Node) -> Result<Option<InformationLoss>> {
        Ok(None)
    }

    fn lower_bound_with_groupify(
        &mut self,
        _node: &Node,
        groupify: &Groupify,
    ) -> Result<Option<InformationLoss>> {
        let bound = groupify
            .iter()
            .filter(|entry| entry.count > 0)
            .map(|entry| (entry.count as f64) * (entry.count as f64))
            .sum::<f64>();
        Ok(Some(InformationLoss::new(bound)))
    }

    fn min_information_loss(&self) -> Result<InformationLoss> {
        self.rows().map(InformationLoss::new)
    }

    fn max_information_loss(&self) -> Result<InformationLoss> {
        self.rows().map(|rows| InformationLoss::new(rows * rows))
    }
}

#[cfg(test)]
mod tests {
    use deid_model::{NodeId, PrivacyCriterion, Transformation};

    use super::*;

    fn fixture() -> (Dictionary, DataMatrix, Vec<GeneralizationHierarchy>) {
        let hierarchy =
            GeneralizationHierarchy::new("x", vec![vec![0, 3], vec![1, 3], vec![2, 3], vec![3, 3]])
                .unwrap();
        let rows = [0, 1, 1, 2, 2, 2].into_iter().map(|v| vec![v]).collect();
        let data = DataMatrix::from_rows(rows).unwrap();
        let dictionary = Dictionary::from_hierarchies(std::slice::from_ref(&hierarchy));
        (dictionary, data, vec![hierarchy])
    }

    #[test]
    fn bounds_require_initialization() {
        let metric = Discernability::new();
        assert_eq!(
            metric.min_information_loss().unwrap_err(),
            DeidError::MetricNotInitialized {
                metric: "discernability"
            }
        );
        assert!(metric.max_information_loss().is_err());
    }

    #[test]
    fn bounds_follow_row_count() {
        let (dictionary, data, hierarchies) = fixture();
        let mut metric = Discernability::new();
        metric
            .initialize(&dictionary, &data, &hierarchies, &AnonymizationConfig::default())
            .unwrap();
        assert_eq!(metric.min_information_loss().unwrap().value(), 6.0);
        assert_eq!(metric.max_information_loss().unwrap().value(), 36.0);
    }

    #[test]
    fn single_class_costs_rows_squared() {
        let (dictionary, data, hierarchies) = fixture();
        let mut metric = Discernability::new();
        let config = AnonymizationConfig::default();
        metric.initialize(&dictionary, &data, &hierarchies, &config).unwrap();
        let transformation = Transformation::new(vec![1]);
        let groupify = Groupify::build(&transformation, &data, &hierarchies, None).unwrap();
        let node = Node::new(NodeId(1), transformation);
        let result = metric.information_loss(&node, &groupify).unwrap();
        assert_eq!(result.loss.value(), 36.0);
        assert_eq!(result.lower_bound.value(), 36.0);
    }

    #[test]
    fn suppressed_classes_cost_rows_per_record() {
        let (dictionary, data, hierarchies) = fixture();
        let config = AnonymizationConfig::new()
            .with_criterion(PrivacyCriterion::KAnonymity { k: 2 })
            .with_max_outliers(0.5);
        let mut metric = Discernability::new();
        metric.initialize(&dictionary, &data, &hierarchies, &config).unwrap();

        let transformation = Transformation::new(vec![0]);
        let mut groupify = Groupify::build(&transformation, &data, &hierarchies, None).unwrap();
        assert!(groupify.evaluate(&config).unwrap().anonymous);
        let node = Node::new(NodeId(0), transformation);

        let result = metric.information_loss(&node, &groupify).unwrap();
        // Class sizes 1 (suppressed), 2, 3.
        assert_eq!(result.loss.value(), 6.0 + 4.0 + 9.0);
        assert_eq!(result.lower_bound.value(), 1.0 + 4.0 + 9.0);
        assert_eq!(metric.lower_bound(&node).unwrap(), None);
        assert_eq!(
            metric.lower_bound_with_groupify(&node, &groupify).unwrap(),
            Some(InformationLoss::new(14.0))
        );
    }
}
