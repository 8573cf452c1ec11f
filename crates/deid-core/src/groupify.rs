//! Equivalence-class grouping for a single transformation.
//!
//! A [`Groupify`] partitions the rows of the input by their generalized
//! quasi-identifier tuple. Entries are kept in an arena in the order in which
//! their first row appears, which is the ordered traversal metrics consume.
//! For a fixed transformation and input the classes, their counts and their
//! order are identical across runs.
//!
//! Building from a [`Snapshot`] of a less generalized transformation merges
//! the snapshot's classes instead of rescanning every row; the result is
//! indistinguishable from a full build.

use std::collections::HashMap;

use tracing::trace;

use deid_model::{
    AnonymizationConfig, DataMatrix, DeidError, GeneralizationHierarchy, Result, RowSet,
    Transformation,
};

/// One equivalence class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupifyEntry {
    /// Generalized quasi-identifier values shared by the class.
    pub key: Vec<u32>,
    /// Rows counting toward statistics (research-subset members).
    pub count: usize,
    /// All rows of the class, subset or not.
    pub pcount: usize,
    /// Index of the first row of the class.
    pub representative: usize,
    /// False once the class violates a privacy criterion and is suppressed.
    pub is_not_outlier: bool,
}

/// Aggregates over all classes of a grouper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupStatistics {
    /// Rows counting toward statistics.
    pub num_rows: usize,
    /// All rows scanned.
    pub num_population_rows: usize,
    /// Classes with a positive count.
    pub num_classes: usize,
    /// Classes flagged as outliers.
    pub num_suppressed_classes: usize,
    /// Counted rows inside outlier classes.
    pub num_suppressed_rows: usize,
}

/// Outcome of evaluating the privacy criteria against the classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// All criteria hold once outliers are suppressed.
    pub anonymous: bool,
    /// The k-anonymity sub-criterion holds; `None` without one.
    pub k_anonymous: Option<bool>,
}

/// Compact retained form of a grouper, used to build generalizations of its
/// transformation without rescanning the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    transformation: Transformation,
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SnapshotEntry {
    representative: usize,
    count: usize,
    pcount: usize,
}

impl Snapshot {
    pub fn transformation(&self) -> &Transformation {
        &self.transformation
    }

    /// Number of classes captured.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Equivalence classes of one transformation.
#[derive(Debug, Clone)]
pub struct Groupify {
    transformation: Transformation,
    entries: Vec<GroupifyEntry>,
    index: HashMap<Vec<u32>, usize>,
    statistics: GroupStatistics,
}

impl Groupify {
    /// Scans every row of `data`.
    pub fn build(
        transformation: &Transformation,
        data: &DataMatrix,
        hierarchies: &[GeneralizationHierarchy],
        subset: Option<&RowSet>,
    ) -> Result<Self> {
        check_dimensions(transformation, data, hierarchies)?;
        let mut groupify = Self::empty(transformation.clone(), data.num_rows());
        let mut key = vec![0; transformation.dimensions()];
        for (row, values) in data.rows().enumerate() {
            generalize_into(&mut key, values, transformation, hierarchies)?;
            let counted = subset.is_none_or(|subset| subset.contains(row));
            groupify.add(&key, row, usize::from(counted), 1);
        }
        groupify.refresh_statistics();
        trace!(
            transformation = %transformation,
            classes = groupify.entries.len(),
            "grouped rows"
        );
        Ok(groupify)
    }

    /// Merges the classes of `snapshot`, which must belong to a transformation
    /// that `transformation` generalizes.
    pub fn from_snapshot(
        snapshot: &Snapshot,
        transformation: &Transformation,
        data: &DataMatrix,
        hierarchies: &[GeneralizationHierarchy],
    ) -> Result<Self> {
        check_dimensions(transformation, data, hierarchies)?;
        if !transformation.is_generalization_of(&snapshot.transformation) {
            return Err(DeidError::InvalidConfig {
                message: format!(
                    "snapshot of {} cannot seed {}",
                    snapshot.transformation, transformation
                ),
            });
        }
        let mut groupify = Self::empty(transformation.clone(), snapshot.entries.len());
        let mut key = vec![0; transformation.dimensions()];
        for entry in &snapshot.entries {
            generalize_into(
                &mut key,
                data.row(entry.representative),
                transformation,
                hierarchies,
            )?;
            groupify.add(&key, entry.representative, entry.count, entry.pcount);
        }
        groupify.refresh_statistics();
        trace!(
            transformation = %transformation,
            source = %snapshot.transformation,
            classes = groupify.entries.len(),
            "grouped from snapshot"
        );
        Ok(groupify)
    }

    fn empty(transformation: Transformation, capacity: usize) -> Self {
        Self {
            transformation,
            entries: Vec::new(),
            index: HashMap::with_capacity(capacity.min(1 << 16)),
            statistics: GroupStatistics::default(),
        }
    }

    fn add(&mut self, key: &[u32], representative: usize, count: usize, pcount: usize) {
        match self.index.get(key) {
            Some(&position) => {
                let entry = &mut self.entries[position];
                entry.count += count;
                entry.pcount += pcount;
            }
            None => {
                self.index.insert(key.to_vec(), self.entries.len());
                self.entries.push(GroupifyEntry {
                    key: key.to_vec(),
                    count,
                    pcount,
                    representative,
                    is_not_outlier: true,
                });
            }
        }
    }

    pub fn transformation(&self) -> &Transformation {
        &self.transformation
    }

    /// The first class of the ordered traversal.
    pub fn first_entry(&self) -> Option<&GroupifyEntry> {
        self.entries.first()
    }

    /// Classes in traversal order.
    pub fn entries(&self) -> &[GroupifyEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupifyEntry> {
        self.entries.iter()
    }

    /// The class holding the given generalized tuple.
    pub fn get(&self, key: &[u32]) -> Option<&GroupifyEntry> {
        self.index.get(key).map(|position| &self.entries[*position])
    }

    pub fn statistics(&self) -> GroupStatistics {
        self.statistics
    }

    /// Flags outlier classes and decides anonymity.
    ///
    /// Criteria are evaluated on the aggregated classes only. A class with a
    /// count of zero holds no research-subset rows and is never an outlier.
    pub fn evaluate(&mut self, config: &AnonymizationConfig) -> Result<Verdict> {
        let min_group_size = config.min_group_size();
        let d_presence = config.d_presence()?;

        let mut k_violations = 0;
        for entry in &mut self.entries {
            if entry.count == 0 {
                entry.is_not_outlier = true;
                continue;
            }
            let k_ok = min_group_size.is_none_or(|k| entry.count >= k);
            let d_ok = d_presence.is_none_or(|(d_min, d_max, _)| {
                let delta = entry.count as f64 / entry.pcount as f64;
                delta >= d_min && delta <= d_max
            });
            if !k_ok {
                k_violations += entry.count;
            }
            entry.is_not_outlier = k_ok && d_ok;
        }
        self.refresh_statistics();

        let limit = (config.max_outliers * self.statistics.num_rows as f64).floor() as usize;
        Ok(Verdict {
            anonymous: self.statistics.num_suppressed_rows <= limit,
            k_anonymous: min_group_size.map(|_| k_violations <= limit),
        })
    }

    /// Captures the classes for incremental builds.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            transformation: self.transformation.clone(),
            entries: self
                .entries
                .iter()
                .map(|entry| SnapshotEntry {
                    representative: entry.representative,
                    count: entry.count,
                    pcount: entry.pcount,
                })
                .collect(),
        }
    }

    fn refresh_statistics(&mut self) {
        let mut statistics = GroupStatistics::default();
        for entry in &self.entries {
            statistics.num_rows += entry.count;
            statistics.num_population_rows += entry.pcount;
            if entry.count > 0 {
                statistics.num_classes += 1;
                if !entry.is_not_outlier {
                    statistics.num_suppressed_classes += 1;
                    statistics.num_suppressed_rows += entry.count;
                }
            }
        }
        self.statistics = statistics;
    }
}

fn check_dimensions(
    transformation: &Transformation,
    data: &DataMatrix,
    hierarchies: &[GeneralizationHierarchy],
) -> Result<()> {
    if transformation.dimensions() != data.num_columns() {
        return Err(DeidError::DimensionMismatch {
            expected: data.num_columns(),
            actual: transformation.dimensions(),
        });
    }
    if hierarchies.len() != data.num_columns() {
        return Err(DeidError::DimensionMismatch {
            expected: data.num_columns(),
            actual: hierarchies.len(),
        });
    }
    for (column, (level, hierarchy)) in transformation.iter().zip(hierarchies).enumerate() {
        if level > hierarchy.max_level() {
            return Err(DeidError::LevelOutOfRange {
                column,
                level,
                height: hierarchy.height() as u32,
            });
        }
    }
    Ok(())
}

fn generalize_into(
    key: &mut [u32],
    values: &[u32],
    transformation: &Transformation,
    hierarchies: &[GeneralizationHierarchy],
) -> Result<()> {
    for (column, value) in values.iter().enumerate() {
        let hierarchy = &hierarchies[column];
        key[column] = hierarchy
            .generalize(*value, transformation[column])
            .ok_or(DeidError::ValueNotInHierarchy {
                column,
                value: *value,
                entries: hierarchy.len(),
            })?;
    }
    Ok(())
}
