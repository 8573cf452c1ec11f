//! Dictionary-encoded input data.

use serde::{Deserialize, Serialize};

use crate::error::{DeidError, Result};
use crate::hierarchy::GeneralizationHierarchy;

/// Per-attribute names and number of distinct dictionary codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    pub attributes: Vec<String>,
    pub sizes: Vec<usize>,
}

impl Dictionary {
    pub fn new(attributes: Vec<String>, sizes: Vec<usize>) -> Result<Self> {
        if attributes.len() != sizes.len() {
            return Err(DeidError::DimensionMismatch {
                expected: attributes.len(),
                actual: sizes.len(),
            });
        }
        Ok(Self { attributes, sizes })
    }

    /// Sizes each attribute by the code space of its hierarchy.
    pub fn from_hierarchies(hierarchies: &[GeneralizationHierarchy]) -> Self {
        Self {
            attributes: hierarchies.iter().map(|h| h.name().to_string()).collect(),
            sizes: hierarchies
                .iter()
                .map(GeneralizationHierarchy::value_space)
                .collect(),
        }
    }

    pub fn num_attributes(&self) -> usize {
        self.sizes.len()
    }

    pub fn size(&self, column: usize) -> usize {
        self.sizes.get(column).copied().unwrap_or(0)
    }
}

/// Row-major matrix of dictionary codes, one column per quasi-identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u32>>", into = "Vec<Vec<u32>>")]
pub struct DataMatrix {
    columns: usize,
    values: Vec<u32>,
}

impl DataMatrix {
    /// Packs rows of equal width. At least one row and one column are required.
    pub fn from_rows(rows: Vec<Vec<u32>>) -> Result<Self> {
        let columns = rows.first().map_or(0, Vec::len);
        if columns == 0 {
            return Err(DeidError::EmptyData {
                rows: rows.len(),
                columns,
            });
        }
        let mut values = Vec::with_capacity(rows.len() * columns);
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != columns {
                return Err(DeidError::RowLengthMismatch {
                    row: index,
                    expected: columns,
                    actual: row.len(),
                });
            }
            values.extend(row);
        }
        Ok(Self { columns, values })
    }

    pub fn num_rows(&self) -> usize {
        if self.columns == 0 {
            0
        } else {
            self.values.len() / self.columns
        }
    }

    pub fn num_columns(&self) -> usize {
        self.columns
    }

    pub fn row(&self, row: usize) -> &[u32] {
        &self.values[row * self.columns..(row + 1) * self.columns]
    }

    pub fn value(&self, row: usize, column: usize) -> u32 {
        self.values[row * self.columns + column]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        self.values.chunks_exact(self.columns.max(1))
    }

    /// Checks every code against the dictionary and the hierarchies.
    pub fn validate(
        &self,
        dictionary: &Dictionary,
        hierarchies: &[GeneralizationHierarchy],
    ) -> Result<()> {
        if dictionary.num_attributes() != self.columns {
            return Err(DeidError::DimensionMismatch {
                expected: self.columns,
                actual: dictionary.num_attributes(),
            });
        }
        if hierarchies.len() != self.columns {
            return Err(DeidError::DimensionMismatch {
                expected: self.columns,
                actual: hierarchies.len(),
            });
        }
        for (row, values) in self.rows().enumerate() {
            for (column, value) in values.iter().enumerate() {
                let size = dictionary.size(column);
                if *value as usize >= size {
                    return Err(DeidError::ValueOutOfDictionary {
                        row,
                        column,
                        value: *value,
                        size,
                    });
                }
                let hierarchy = &hierarchies[column];
                if *value as usize >= hierarchy.len() {
                    return Err(DeidError::ValueNotInHierarchy {
                        column,
                        value: *value,
                        entries: hierarchy.len(),
                    });
                }
            }
        }
        for (column, hierarchy) in hierarchies.iter().enumerate() {
            if hierarchy.value_space() > dictionary.size(column) {
                return Err(DeidError::ValueOutOfDictionary {
                    row: 0,
                    column,
                    value: hierarchy.value_space() as u32 - 1,
                    size: dictionary.size(column),
                });
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<Vec<u32>>> for DataMatrix {
    type Error = DeidError;

    fn try_from(rows: Vec<Vec<u32>>) -> Result<Self> {
        Self::from_rows(rows)
    }
}

impl From<DataMatrix> for Vec<Vec<u32>> {
    fn from(matrix: DataMatrix) -> Self {
        matrix.rows().map(<[u32]>::to_vec).collect()
    }
}

/// Bit set of row indices, used as the research subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RowSetRepr", into = "RowSetRepr")]
pub struct RowSet {
    rows: usize,
    words: Vec<u64>,
}

#[derive(Serialize, Deserialize)]
struct RowSetRepr {
    rows: usize,
    members: Vec<usize>,
}

impl RowSet {
    /// An empty set over a dataset of `rows` rows.
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            words: vec![0; rows.div_ceil(64)],
        }
    }

    pub fn from_rows(rows: usize, members: impl IntoIterator<Item = usize>) -> Result<Self> {
        let mut set = Self::new(rows);
        for member in members {
            if member >= rows {
                return Err(DeidError::SubsetOutOfRange { size: member + 1, rows });
            }
            set.add(member);
        }
        Ok(set)
    }

    pub fn add(&mut self, row: usize) {
        if row < self.rows {
            self.words[row / 64] |= 1 << (row % 64);
        }
    }

    pub fn contains(&self, row: usize) -> bool {
        row < self.rows && self.words[row / 64] & (1 << (row % 64)) != 0
    }

    /// Number of member rows.
    pub fn size(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Number of rows of the dataset this set ranges over.
    pub fn universe(&self) -> usize {
        self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.rows).filter(|row| self.contains(*row))
    }
}

impl TryFrom<RowSetRepr> for RowSet {
    type Error = DeidError;

    fn try_from(repr: RowSetRepr) -> Result<Self> {
        Self::from_rows(repr.rows, repr.members)
    }
}

impl From<RowSet> for RowSetRepr {
    fn from(set: RowSet) -> Self {
        Self {
            rows: set.rows,
            members: set.iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_rejects_empty_data() {
        assert_eq!(
            DataMatrix::from_rows(Vec::new()).unwrap_err(),
            DeidError::EmptyData { rows: 0, columns: 0 }
        );
        assert_eq!(
            DataMatrix::from_rows(vec![Vec::new(), Vec::new()]).unwrap_err(),
            DeidError::EmptyData { rows: 2, columns: 0 }
        );
    }

    #[test]
    fn matrix_rejects_ragged_rows() {
        let error = DataMatrix::from_rows(vec![vec![0, 1], vec![1]]).unwrap_err();
        assert_eq!(
            error,
            DeidError::RowLengthMismatch {
                row: 1,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn matrix_accessors() {
        let matrix = DataMatrix::from_rows(vec![vec![0, 1], vec![2, 3], vec![4, 5]]).unwrap();
        assert_eq!(matrix.num_rows(), 3);
        assert_eq!(matrix.num_columns(), 2);
        assert_eq!(matrix.row(1), &[2, 3]);
        assert_eq!(matrix.value(2, 0), 4);
        assert_eq!(matrix.rows().count(), 3);
    }

    #[test]
    fn value_outside_hierarchy_fails_fast() {
        let hierarchy = GeneralizationHierarchy::new("a", vec![vec![0, 2], vec![1, 2]]).unwrap();
        let dictionary = Dictionary::new(vec!["a".into()], vec![5]).unwrap();
        let matrix = DataMatrix::from_rows(vec![vec![0], vec![3]]).unwrap();
        let error = matrix.validate(&dictionary, &[hierarchy]).unwrap_err();
        assert!(matches!(error, DeidError::ValueNotInHierarchy { value: 3, .. }));
    }

    #[test]
    fn row_set_membership() {
        let set = RowSet::from_rows(130, [0, 64, 129]).unwrap();
        assert!(set.contains(64));
        assert!(!set.contains(65));
        assert!(!set.contains(500));
        assert_eq!(set.size(), 3);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 64, 129]);
        assert!(RowSet::from_rows(3, [3]).is_err());
    }
}
