use serde::{Deserialize, Serialize};

use crate::config::AnonymizationConfig;
use crate::data::{DataMatrix, Dictionary};
use crate::error::Result;
use crate::hierarchy::GeneralizationHierarchy;
use crate::lattice::{Lattice, LatticeBuilder};

/// An already-encoded anonymization problem: data, hierarchies and settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub dictionary: Dictionary,
    pub data: DataMatrix,
    pub hierarchies: Vec<GeneralizationHierarchy>,
    #[serde(default)]
    pub config: AnonymizationConfig,
}

impl Problem {
    /// Builds a problem whose dictionary is derived from the hierarchies.
    pub fn new(
        data: DataMatrix,
        hierarchies: Vec<GeneralizationHierarchy>,
        config: AnonymizationConfig,
    ) -> Result<Self> {
        let problem = Self {
            dictionary: Dictionary::from_hierarchies(&hierarchies),
            data,
            hierarchies,
            config,
        };
        problem.validate()?;
        Ok(problem)
    }

    pub fn validate(&self) -> Result<()> {
        for hierarchy in &self.hierarchies {
            hierarchy.validate()?;
        }
        self.data.validate(&self.dictionary, &self.hierarchies)?;
        self.config.validate(self.data.num_rows())
    }

    /// Maximum generalization level per attribute.
    pub fn max_levels(&self) -> Vec<u32> {
        self.hierarchies
            .iter()
            .map(GeneralizationHierarchy::max_level)
            .collect()
    }

    pub fn build_lattice(&self) -> Result<Lattice> {
        LatticeBuilder::new(self.max_levels()).build()
    }
}
