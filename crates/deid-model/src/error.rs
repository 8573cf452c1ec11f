//! Error types for the anonymization model and engine.

use thiserror::Error;

/// Errors raised by the model and the engine built on top of it.
///
/// Usage errors indicate a caller defect and are never retried. Data
/// inconsistencies mean the input cannot be used for the requested
/// computation; they are reported instead of producing wrong counts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeidError {
    /// Sentinel bounds were requested before `initialize` observed the data.
    #[error("metric {metric} must be initialized first")]
    MetricNotInitialized { metric: &'static str },

    /// Relative information-loss thresholds must lie within [0, 1].
    #[error("information loss threshold must be relative [0,1], got [{min}, {max}]")]
    InvalidLossThreshold { min: f64, max: f64 },

    /// More than one research-subset (d-presence) criterion was configured.
    #[error("only one d-presence criterion supported, found {count}")]
    MultipleResearchSubsets { count: usize },

    /// The suppression limit is not a fraction.
    #[error("maximum outlier fraction must be within [0,1], got {value}")]
    InvalidSuppressionLimit { value: f64 },

    /// A privacy criterion carries invalid parameters.
    #[error("invalid privacy criterion: {message}")]
    InvalidCriterion { message: String },

    /// A configuration value is out of range.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Transformation and data disagree on the number of quasi-identifiers.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A node id does not belong to the lattice.
    #[error("node {id} is not part of the lattice")]
    UnknownNode { id: usize },

    /// A generalization level exceeds the hierarchy height.
    #[error("level {level} exceeds hierarchy height {height} for attribute {column}")]
    LevelOutOfRange {
        column: usize,
        level: u32,
        height: u32,
    },

    /// A row references a value the dictionary does not know.
    #[error("row {row}, column {column}: value {value} outside dictionary of size {size}")]
    ValueOutOfDictionary {
        row: usize,
        column: usize,
        value: u32,
        size: usize,
    },

    /// A dictionary value has no entry in the attribute's hierarchy.
    #[error("column {column}: value {value} missing from hierarchy with {entries} entries")]
    ValueNotInHierarchy {
        column: usize,
        value: u32,
        entries: usize,
    },

    /// Hierarchy rows have different numbers of levels.
    #[error("hierarchy {name}: value {value} has {actual} levels, expected {expected}")]
    RaggedHierarchy {
        name: String,
        value: usize,
        expected: usize,
        actual: usize,
    },

    /// A hierarchy violates the monotonic generalization property.
    #[error("hierarchy {name}: {message}")]
    InconsistentHierarchy { name: String, message: String },

    /// The dataset has no rows or no attributes.
    #[error("dataset is empty: {rows} rows, {columns} columns")]
    EmptyData { rows: usize, columns: usize },

    /// A search was started on a lattice that already carries search state.
    #[error("node {id} of the lattice already carries search state; build a new lattice")]
    LatticeInUse { id: usize },

    /// A data row does not have one value per attribute.
    #[error("row {row} has {actual} values, expected {expected}")]
    RowLengthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// A research subset references rows beyond the dataset.
    #[error("research subset of size {size} does not match dataset with {rows} rows")]
    SubsetOutOfRange { size: usize, rows: usize },
}

pub type Result<T> = std::result::Result<T, DeidError>;
