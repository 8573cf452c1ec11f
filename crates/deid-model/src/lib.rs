//! Data model for transformation-lattice anonymization.
//!
//! Everything the search engine consumes or annotates lives here: the
//! lattice arena and its nodes, generalization hierarchies, the
//! dictionary-encoded input matrix, privacy criteria and configuration.

pub mod config;
pub mod data;
pub mod error;
pub mod hierarchy;
pub mod lattice;
pub mod loss;
pub mod node;
pub mod problem;
pub mod properties;
pub mod transformation;

pub use config::{AnonymizationConfig, PrivacyCriterion};
pub use data::{DataMatrix, Dictionary, RowSet};
pub use error::{DeidError, Result};
pub use hierarchy::GeneralizationHierarchy;
pub use lattice::{Lattice, LatticeBuilder, MAX_LATTICE_SIZE};
pub use loss::{InformationLoss, InformationLossWithBound};
pub use node::{Node, NodeId};
pub use problem::Problem;
pub use properties::{NodeProperties, NodeProperty};
pub use transformation::Transformation;
