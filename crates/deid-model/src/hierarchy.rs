use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{DeidError, Result};

/// Per-attribute generalization table: `[input value][level] -> output value`.
///
/// Values are dictionary codes. Level 0 maps every value to itself and every
/// step from level `L` to `L + 1` is a function of the level-`L` value, so
/// generalization never splits a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HierarchyRepr", into = "HierarchyRepr")]
pub struct GeneralizationHierarchy {
    name: String,
    map: Vec<Vec<u32>>,
}

#[derive(Serialize, Deserialize)]
struct HierarchyRepr {
    name: String,
    map: Vec<Vec<u32>>,
}

impl TryFrom<HierarchyRepr> for GeneralizationHierarchy {
    type Error = DeidError;

    fn try_from(repr: HierarchyRepr) -> Result<Self> {
        Self::new(repr.name, repr.map)
    }
}

impl From<GeneralizationHierarchy> for HierarchyRepr {
    fn from(hierarchy: GeneralizationHierarchy) -> Self {
        Self {
            name: hierarchy.name,
            map: hierarchy.map,
        }
    }
}

impl GeneralizationHierarchy {
    /// Builds and validates a hierarchy.
    pub fn new(name: impl Into<String>, map: Vec<Vec<u32>>) -> Result<Self> {
        let hierarchy = Self {
            name: name.into(),
            map,
        };
        hierarchy.validate()?;
        Ok(hierarchy)
    }

    pub fn validate(&self) -> Result<()> {
        let Some(first) = self.map.first() else {
            return Err(DeidError::InconsistentHierarchy {
                name: self.name.clone(),
                message: "hierarchy has no values".to_string(),
            });
        };
        let height = first.len();
        if height == 0 {
            return Err(DeidError::InconsistentHierarchy {
                name: self.name.clone(),
                message: "hierarchy has no levels".to_string(),
            });
        }

        for (value, row) in self.map.iter().enumerate() {
            if row.len() != height {
                return Err(DeidError::RaggedHierarchy {
                    name: self.name.clone(),
                    value,
                    expected: height,
                    actual: row.len(),
                });
            }
            if row[0] as usize != value {
                return Err(DeidError::InconsistentHierarchy {
                    name: self.name.clone(),
                    message: format!("value {value} maps to {} at level 0", row[0]),
                });
            }
        }

        for level in 0..height - 1 {
            let mut parents: HashMap<u32, u32> = HashMap::new();
            for row in &self.map {
                let parent = *parents.entry(row[level]).or_insert(row[level + 1]);
                if parent != row[level + 1] {
                    return Err(DeidError::InconsistentHierarchy {
                        name: self.name.clone(),
                        message: format!(
                            "value {} at level {level} generalizes to both {parent} and {}",
                            row[level],
                            row[level + 1]
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of levels, including level 0.
    pub fn height(&self) -> usize {
        self.map.first().map_or(0, Vec::len)
    }

    /// Highest generalization level.
    pub fn max_level(&self) -> u32 {
        self.height().saturating_sub(1) as u32
    }

    /// Number of input values covered.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// One past the largest code appearing at any level.
    pub fn value_space(&self) -> usize {
        self.map
            .iter()
            .flat_map(|row| row.iter())
            .max()
            .map_or(0, |max| *max as usize + 1)
    }

    pub fn generalize(&self, value: u32, level: u32) -> Option<u32> {
        self.map
            .get(value as usize)
            .and_then(|row| row.get(level as usize))
            .copied()
    }

    /// Raw table, indexed `[value][level]`.
    pub fn array(&self) -> &[Vec<u32>] {
        &self.map
    }

    /// Number of distinct outputs at `level`.
    pub fn distinct_values(&self, level: u32) -> usize {
        self.map
            .iter()
            .filter_map(|row| row.get(level as usize))
            .collect::<HashSet<_>>()
            .len()
    }
}
