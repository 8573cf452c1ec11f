use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

/// One generalization level per quasi-identifier.
///
/// Vectors are partially ordered componentwise: `a <= b` iff every level of
/// `a` is at most the corresponding level of `b`. Vectors of different length
/// are incomparable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transformation(Vec<u32>);

impl Transformation {
    pub fn new(levels: Vec<u32>) -> Self {
        Self(levels)
    }

    /// The all-zero transformation over `dimensions` attributes.
    pub fn bottom(dimensions: usize) -> Self {
        Self(vec![0; dimensions])
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// Generalization depth: the sum of all levels.
    pub fn level(&self) -> u32 {
        self.0.iter().sum()
    }

    pub fn get(&self, dimension: usize) -> Option<u32> {
        self.0.get(dimension).copied()
    }

    /// True if every level of `self` is at least the level in `other`.
    pub fn is_generalization_of(&self, other: &Transformation) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a >= b)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl PartialOrd for Transformation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            Some(Ordering::Equal)
        } else if self.is_generalization_of(other) {
            Some(Ordering::Greater)
        } else if other.is_generalization_of(self) {
            Some(Ordering::Less)
        } else {
            None
        }
    }
}

impl Borrow<[u32]> for Transformation {
    fn borrow(&self) -> &[u32] {
        &self.0
    }
}

impl Index<usize> for Transformation {
    type Output = u32;

    fn index(&self, dimension: usize) -> &u32 {
        &self.0[dimension]
    }
}

impl From<Vec<u32>> for Transformation {
    fn from(levels: Vec<u32>) -> Self {
        Self(levels)
    }
}

impl From<&[u32]> for Transformation {
    fn from(levels: &[u32]) -> Self {
        Self(levels.to_vec())
    }
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, level) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{level}")?;
        }
        f.write_str("]")
    }
}
