//! Anonymization engine over a transformation lattice.
//!
//! - [`groupify`]: equivalence classes of a transformation, with snapshots
//! - [`metric`]: information-loss metrics and their lower bounds
//! - [`search`]: bottom-up lattice search with tagging and pruning
//! - [`filter`]: bounded selection of nodes around the optimum

pub mod filter;
pub mod groupify;
pub mod metric;
pub mod search;

pub use filter::{Anonymity, FilterOptions, NodeFilter};
pub use groupify::{GroupStatistics, Groupify, GroupifyEntry, Snapshot, Verdict};
pub use metric::{Metric, MetricKind, create_metric};
pub use search::{SearchEngine, SearchListener, SearchResult};
