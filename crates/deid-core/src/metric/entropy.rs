use deid_model::{
    AnonymizationConfig, DataMatrix, DeidError, Dictionary, GeneralizationHierarchy,
    InformationLoss, InformationLossWithBound, Node, Result,
};

use super::Metric;
use crate::groupify::Groupify;

/// Monotonic non-uniform entropy.
///
/// Per attribute and level the loss is `-sum(a * log2(a / b))` over input
/// values, where `a` is the frequency of a value and `b` the frequency of its
/// generalization at that level. Attribute losses add up. Loss and lower
/// bound coincide.
#[derive(Debug, Default)]
pub struct NonUniformEntropy {
    state: Option<EntropyState>,
}

#[derive(Debug)]
struct EntropyState {
    /// `[column][level]`, filled on first use.
    cache: Vec<Vec<Option<f64>>>,
    /// `[column][value][level]` roll-up frequencies.
    cardinalities: Vec<Vec<Vec<u64>>>,
    /// `[column][value][level]` generalization tables.
    hierarchies: Vec<Vec<Vec<u32>>>,
}

impl NonUniformEntropy {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&mut self) -> Result<&mut EntropyState> {
        self.state.as_mut().ok_or(DeidError::MetricNotInitialized {
            metric: "non-uniform entropy",
        })
    }

    fn compute(&mut self, node: &Node) -> Result<InformationLoss> {
        if let Some(bound) = node.lower_bound() {
            return Ok(bound);
        }
        let state = self.state()?;
        let transformation = node.transformation();
        if transformation.dimensions() != state.hierarchies.len() {
            return Err(DeidError::DimensionMismatch {
                expected: state.hierarchies.len(),
                actual: transformation.dimensions(),
            });
        }

        let mut result = 0.0;
        for (column, level) in transformation.iter().enumerate() {
            let level = level as usize;
            let cached = state.cache[column]
                .get(level)
                .copied()
                .ok_or(DeidError::LevelOutOfRange {
                    column,
                    level: level as u32,
                    height: state.cache[column].len() as u32,
                })?;
            let value = match cached {
                Some(value) => value,
                None => {
                    let cardinality = &state.cardinalities[column];
                    let mut value = 0.0;
                    for (input, row) in state.hierarchies[column].iter().enumerate() {
                        let a = cardinality[input][0] as f64;
                        if a != 0.0 {
                            let b = cardinality[row[level] as usize][level] as f64;
                            value += a * (a / b).log2();
                        }
                    }
                    state.cache[column][level] = Some(value);
                    value
                }
            };
            result += value;
        }
        Ok(InformationLoss::new(if result == 0.0 { 0.0 } else { -result }))
    }
}

impl Metric for NonUniformEntropy {
    fn name(&self) -> &'static str {
        "Monotonic non-uniform entropy"
    }

    fn is_monotonic(&self) -> bool {
        true
    }

    fn is_independent(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        dictionary: &Dictionary,
        data: &DataMatrix,
        hierarchies: &[GeneralizationHierarchy],
        config: &AnonymizationConfig,
    ) -> Result<()> {
        let subset = config.research_subset()?;

        let mut cardinalities: Vec<Vec<Vec<u64>>> = hierarchies
            .iter()
            .enumerate()
            .map(|(column, hierarchy)| {
                let values = dictionary.size(column).max(hierarchy.value_space());
                vec![vec![0; hierarchy.height()]; values]
            })
            .collect();

        for (row, values) in data.rows().enumerate() {
            if subset.is_some_and(|subset| !subset.contains(row)) {
                continue;
            }
            for (column, value) in values.iter().enumerate() {
                let counts = cardinalities
                    .get_mut(column)
                    .and_then(|counts| counts.get_mut(*value as usize))
                    .ok_or(DeidError::ValueOutOfDictionary {
                        row,
                        column,
                        value: *value,
                        size: dictionary.size(column),
                    })?;
                counts[0] += 1;
            }
        }

        // Roll level-0 counts up through each hierarchy.
        for (column, hierarchy) in hierarchies.iter().enumerate() {
            for (input, row) in hierarchy.array().iter().enumerate() {
                let count = cardinalities[column][input][0];
                for (level, output) in row.iter().enumerate().skip(1) {
                    cardinalities[column][*output as usize][level] += count;
                }
            }
        }

        self.state = Some(EntropyState {
            cache: hierarchies
                .iter()
                .map(|hierarchy| vec![None; hierarchy.height()])
                .collect(),
            cardinalities,
            hierarchies: hierarchies
                .iter()
                .map(|hierarchy| hierarchy.array().to_vec())
                .collect(),
        });
        Ok(())
    }

    fn information_loss(
        &mut self,
        node: &Node,
        _groupify: &Groupify,
    ) -> Result<InformationLossWithBound> {
        let loss = self.compute(node)?;
        Ok(InformationLossWithBound::exact(loss))
    }

    fn lower_bound(&mut self, node: &Node) -> Result<Option<InformationLoss>> {
        self.compute(node).map(Some)
    }

    fn lower_bound_with_groupify(
        &mut self,
        node: &Node,
        _groupify: &Groupify,
    ) -> Result<Option<InformationLoss>> {
        self.lower_bound(node)
    }

    fn independent_information_loss(
        &mut self,
        node: &Node,
    ) -> Result<Option<InformationLossWithBound>> {
        self.compute(node).map(|loss| Some(InformationLossWithBound::exact(loss)))
    }
}
