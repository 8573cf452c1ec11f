//! Selection of a bounded, informative subset of lattice nodes.
//!
//! A [`NodeFilter`] admits a node when its relative information loss overlaps
//! the allowed range, its anonymity classification is allowed, and each of its
//! generalization levels is allowed in its dimension. [`NodeFilter::initialize`]
//! grows the allowed levels outward from the optimum (or from the bottom node
//! when nothing is anonymous) until the node budget would be exceeded.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use deid_model::{DeidError, InformationLoss, Lattice, Node, NodeId, NodeProperty, Result};

/// Anonymity classification of a node, derived from its properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anonymity {
    Anonymous,
    NotAnonymous,
    /// Only the k-anonymity sub-criterion is known to hold.
    ProbablyAnonymous,
    /// Only the k-anonymity sub-criterion is known to fail.
    ProbablyNotAnonymous,
    Unknown,
}

impl Anonymity {
    pub fn of(node: &Node) -> Self {
        if node.has_property(NodeProperty::Anonymous) {
            Anonymity::Anonymous
        } else if node.has_property(NodeProperty::NotAnonymous) {
            Anonymity::NotAnonymous
        } else if node.has_property(NodeProperty::KAnonymous) {
            Anonymity::ProbablyAnonymous
        } else if node.has_property(NodeProperty::NotKAnonymous) {
            Anonymity::ProbablyNotAnonymous
        } else {
            Anonymity::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Anonymity::Anonymous => "anonymous",
            Anonymity::NotAnonymous => "not anonymous",
            Anonymity::ProbablyAnonymous => "probably anonymous",
            Anonymity::ProbablyNotAnonymous => "probably not anonymous",
            Anonymity::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Anonymity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for building a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Budget of nodes the initial expansion may make visible.
    pub max_visible_nodes: usize,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            max_visible_nodes: 100,
        }
    }
}

/// Visibility filter over the nodes of one lattice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFilter {
    anonymity: BTreeSet<Anonymity>,
    generalizations: Vec<BTreeSet<u32>>,
    max_num_nodes_initial: usize,
    min_information_loss: f64,
    max_information_loss: f64,
}

impl NodeFilter {
    /// An empty filter over `dimensions` attributes.
    pub fn new(dimensions: usize, max_num_nodes_initial: usize) -> Self {
        Self {
            anonymity: BTreeSet::new(),
            generalizations: vec![BTreeSet::new(); dimensions],
            max_num_nodes_initial,
            min_information_loss: 0.0,
            max_information_loss: 1.0,
        }
    }

    pub fn with_options(dimensions: usize, options: &FilterOptions) -> Self {
        Self::new(dimensions, options.max_visible_nodes)
    }

    pub fn allow_anonymous(&mut self) {
        self.anonymity.insert(Anonymity::Anonymous);
    }

    pub fn disallow_anonymous(&mut self) {
        self.anonymity.remove(&Anonymity::Anonymous);
    }

    pub fn allow_non_anonymous(&mut self) {
        self.anonymity.insert(Anonymity::NotAnonymous);
    }

    pub fn disallow_non_anonymous(&mut self) {
        self.anonymity.remove(&Anonymity::NotAnonymous);
    }

    /// Admits every classification that is not definite.
    pub fn allow_unknown(&mut self) {
        self.anonymity.extend([
            Anonymity::ProbablyAnonymous,
            Anonymity::ProbablyNotAnonymous,
            Anonymity::Unknown,
        ]);
    }

    pub fn disallow_unknown(&mut self) {
        for anonymity in [
            Anonymity::ProbablyAnonymous,
            Anonymity::ProbablyNotAnonymous,
            Anonymity::Unknown,
        ] {
            self.anonymity.remove(&anonymity);
        }
    }

    /// Admits `level` in `dimension`. Dimensions outside the filter are
    /// ignored.
    pub fn allow_generalization(&mut self, dimension: usize, level: u32) {
        if let Some(levels) = self.generalizations.get_mut(dimension) {
            levels.insert(level);
        }
    }

    pub fn disallow_generalization(&mut self, dimension: usize, level: u32) {
        if let Some(levels) = self.generalizations.get_mut(dimension) {
            levels.remove(&level);
        }
    }

    /// Restricts the relative loss range.
    ///
    /// # Errors
    ///
    /// Both bounds must lie within `[0, 1]`.
    pub fn allow_information_loss(&mut self, min: f64, max: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) {
            return Err(DeidError::InvalidLossThreshold { min, max });
        }
        self.min_information_loss = min;
        self.max_information_loss = max;
        Ok(())
    }

    pub fn allow_all_information_loss(&mut self) {
        self.min_information_loss = 0.0;
        self.max_information_loss = 1.0;
    }

    /// Admits nothing: clears anonymity and levels, resets the loss range.
    pub fn disallow_all(&mut self) {
        self.anonymity.clear();
        self.allow_all_information_loss();
        for levels in &mut self.generalizations {
            levels.clear();
        }
    }

    pub fn allowed_anonymity(&self) -> &BTreeSet<Anonymity> {
        &self.anonymity
    }

    pub fn allowed_generalizations(&self, dimension: usize) -> Option<&BTreeSet<u32>> {
        self.generalizations.get(dimension)
    }

    pub fn is_allowed_generalization(&self, dimension: usize, level: u32) -> bool {
        self.generalizations
            .get(dimension)
            .is_some_and(|levels| levels.contains(&level))
    }

    pub fn allowed_min_information_loss(&self) -> f64 {
        self.min_information_loss
    }

    pub fn allowed_max_information_loss(&self) -> f64 {
        self.max_information_loss
    }

    pub fn max_num_nodes_initial(&self) -> usize {
        self.max_num_nodes_initial
    }

    /// Whether `node` passes the loss, anonymity and level conditions.
    pub fn is_allowed(&self, lattice: &Lattice, node: &Node) -> bool {
        self.allows(node, lattice.loss_bounds())
    }

    fn allows(&self, node: &Node, bounds: (InformationLoss, InformationLoss)) -> bool {
        let (min, max) = bounds;
        let (lower, upper) = Lattice::loss_interval_within(node, bounds);
        if upper.relative_to(min, max) < self.min_information_loss
            || lower.relative_to(min, max) > self.max_information_loss
        {
            return false;
        }
        if !self.anonymity.contains(&Anonymity::of(node)) {
            return false;
        }
        node.transformation()
            .iter()
            .enumerate()
            .all(|(dimension, level)| self.is_allowed_generalization(dimension, level))
    }

    /// Nodes passing the filter, in lattice order.
    pub fn visible_nodes(&self, lattice: &Lattice) -> Vec<NodeId> {
        let bounds = lattice.loss_bounds();
        lattice
            .nodes()
            .iter()
            .filter(|node| self.allows(node, bounds))
            .map(Node::id)
            .collect()
    }

    /// Rebuilds the filter for a finished search.
    ///
    /// With an optimum, anonymous nodes are revealed around it, first less and
    /// then more generalized, by radius and then by dimension. Without one,
    /// non-anonymous nodes are revealed above the bottom node. The first level
    /// that would exceed the node budget is revoked and expansion stops there,
    /// keeping the levels admitted so far. Otherwise the allowed levels are
    /// trimmed to those of the visible nodes.
    ///
    /// # Errors
    ///
    /// Fails when the filter and lattice disagree on dimensions or the optimum
    /// is not a node of the lattice.
    pub fn initialize(mut self, lattice: &Lattice, optimum: Option<NodeId>) -> Result<Self> {
        if self.generalizations.len() != lattice.dimensions() {
            return Err(DeidError::DimensionMismatch {
                expected: lattice.dimensions(),
                actual: self.generalizations.len(),
            });
        }
        self.disallow_all();

        let (seed, anonymity, directions): (&Node, Anonymity, &[Expansion]) = match optimum {
            Some(id) => (
                lattice.node(id)?,
                Anonymity::Anonymous,
                &[Expansion::Specialize, Expansion::Generalize],
            ),
            None => (
                lattice.bottom(),
                Anonymity::NotAnonymous,
                &[Expansion::Generalize],
            ),
        };
        self.anonymity.insert(anonymity);
        for (dimension, level) in seed.transformation().iter().enumerate() {
            self.allow_generalization(dimension, level);
        }

        let bounds = lattice.loss_bounds();
        let mut visible = BTreeSet::from([seed.id()]);
        let mut hidden: Vec<NodeId> = lattice
            .nodes()
            .iter()
            .filter(|node| node.id() != seed.id() && Anonymity::of(node) == anonymity)
            .map(Node::id)
            .collect();

        let top = lattice.top().transformation();
        let max_generalization = top.iter().max().unwrap_or(0);
        for expansion in directions {
            for radius in 1..=max_generalization {
                for (dimension, origin) in seed.transformation().iter().enumerate() {
                    let level = match expansion {
                        Expansion::Specialize => origin.checked_sub(radius),
                        Expansion::Generalize => {
                            Some(origin + radius).filter(|level| *level <= top[dimension])
                        }
                    };
                    let Some(level) = level else {
                        continue;
                    };
                    self.allow_generalization(dimension, level);
                    hidden.retain(|id| {
                        if self.allows(&lattice[*id], bounds) {
                            visible.insert(*id);
                            false
                        } else {
                            true
                        }
                    });
                    if visible.len() > self.max_num_nodes_initial {
                        self.disallow_generalization(dimension, level);
                        debug!(
                            dimension,
                            level,
                            budget = self.max_num_nodes_initial,
                            "visible node budget exceeded"
                        );
                        return Ok(self);
                    }
                }
            }
        }

        self.clean(lattice, bounds, &mut visible);
        debug!(visible = visible.len(), "filter initialized");
        Ok(self)
    }

    /// Drops visible nodes that no longer pass and trims each dimension to the
    /// levels still present.
    fn clean(
        &mut self,
        lattice: &Lattice,
        bounds: (InformationLoss, InformationLoss),
        visible: &mut BTreeSet<NodeId>,
    ) {
        visible.retain(|id| self.allows(&lattice[*id], bounds));
        let mut required = vec![BTreeSet::new(); self.generalizations.len()];
        for id in visible.iter() {
            for (dimension, level) in lattice[*id].transformation().iter().enumerate() {
                required[dimension].insert(level);
            }
        }
        for (levels, required) in self.generalizations.iter_mut().zip(&required) {
            levels.retain(|level| required.contains(level));
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Expansion {
    Specialize,
    Generalize,
}

#[cfg(test)]
mod tests {
    use deid_model::LatticeBuilder;

    use super::*;

    fn all_anonymous(max_levels: Vec<u32>) -> Lattice {
        let lattice = LatticeBuilder::new(max_levels).build().unwrap();
        for node in lattice.nodes() {
            node.set_property(NodeProperty::Anonymous);
        }
        lattice
    }

    fn levels(filter: &NodeFilter, dimension: usize) -> Vec<u32> {
        filter
            .allowed_generalizations(dimension)
            .unwrap()
            .iter()
            .copied()
            .collect()
    }

    fn transformations(lattice: &Lattice, ids: &[NodeId]) -> Vec<Vec<u32>> {
        ids.iter()
            .map(|id| lattice[*id].transformation().as_slice().to_vec())
            .collect()
    }

    #[test]
    fn budget_of_one_shows_only_the_optimum() {
        let lattice = all_anonymous(vec![2, 2, 1]);
        let optimum = lattice.find(&[1, 2, 0]).unwrap().id();
        let filter = NodeFilter::new(3, 1)
            .initialize(&lattice, Some(optimum))
            .unwrap();
        assert_eq!(filter.visible_nodes(&lattice), vec![optimum]);
        assert_eq!(levels(&filter, 0), vec![1]);
        assert_eq!(levels(&filter, 1), vec![2]);
        assert_eq!(levels(&filter, 2), vec![0]);
    }

    #[test]
    fn overflow_stops_before_later_dimensions() {
        let lattice = all_anonymous(vec![2, 2]);
        let optimum = lattice.find(&[1, 1]).unwrap().id();
        let filter = NodeFilter::new(2, 2)
            .initialize(&lattice, Some(optimum))
            .unwrap();
        // Level 0 in dimension 0 reveals [0, 1]; level 0 in dimension 1 would
        // reveal two more and is revoked.
        assert_eq!(levels(&filter, 0), vec![0, 1]);
        assert_eq!(levels(&filter, 1), vec![1]);
        assert_eq!(
            transformations(&lattice, &filter.visible_nodes(&lattice)),
            vec![vec![0, 1], vec![1, 1]]
        );
    }

    #[test]
    fn large_budget_is_trimmed_to_visible_levels() {
        let lattice = LatticeBuilder::new(vec![2, 1]).build().unwrap();
        for node in lattice.nodes() {
            let anonymous = node.transformation()[0] >= 1;
            node.set_property(if anonymous {
                NodeProperty::Anonymous
            } else {
                NodeProperty::NotAnonymous
            });
        }
        let optimum = lattice.find(&[1, 0]).unwrap().id();
        let filter = NodeFilter::new(2, 100)
            .initialize(&lattice, Some(optimum))
            .unwrap();
        // Level 0 of dimension 0 holds no anonymous node and is dropped.
        assert_eq!(levels(&filter, 0), vec![1, 2]);
        assert_eq!(levels(&filter, 1), vec![0, 1]);
        assert_eq!(filter.visible_nodes(&lattice).len(), 4);
    }

    #[test]
    fn without_optimum_expands_above_bottom() {
        let lattice = LatticeBuilder::new(vec![1, 1]).build().unwrap();
        for node in lattice.nodes() {
            node.set_property(NodeProperty::NotAnonymous);
        }
        let filter = NodeFilter::new(2, 10).initialize(&lattice, None).unwrap();
        assert_eq!(
            filter.allowed_anonymity().iter().copied().collect::<Vec<_>>(),
            vec![Anonymity::NotAnonymous]
        );
        assert_eq!(filter.visible_nodes(&lattice).len(), 4);
    }

    #[test]
    fn loss_range_excludes_costly_nodes() {
        let lattice = all_anonymous(vec![1]);
        lattice.bottom().set_information_loss(InformationLoss::new(0.0));
        lattice.top().set_information_loss(InformationLoss::new(10.0));
        let mut filter = NodeFilter::new(1, 10);
        filter.allow_anonymous();
        filter.allow_generalization(0, 0);
        filter.allow_generalization(0, 1);
        filter.allow_information_loss(0.0, 0.5).unwrap();
        assert!(filter.is_allowed(&lattice, lattice.bottom()));
        assert!(!filter.is_allowed(&lattice, lattice.top()));
    }

    #[test]
    fn loss_threshold_must_be_relative() {
        let mut filter = NodeFilter::new(1, 10);
        assert_eq!(
            filter.allow_information_loss(0.2, 1.5).unwrap_err(),
            DeidError::InvalidLossThreshold { min: 0.2, max: 1.5 }
        );
        assert_eq!(filter.allowed_max_information_loss(), 1.0);
    }

    #[test]
    fn classification_follows_properties() {
        let lattice = LatticeBuilder::new(vec![1]).build().unwrap();
        assert_eq!(Anonymity::of(lattice.bottom()), Anonymity::Unknown);
        lattice.bottom().set_property(NodeProperty::KAnonymous);
        assert_eq!(Anonymity::of(lattice.bottom()), Anonymity::ProbablyAnonymous);
        lattice.bottom().set_property(NodeProperty::NotAnonymous);
        assert_eq!(Anonymity::of(lattice.bottom()), Anonymity::NotAnonymous);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let lattice = LatticeBuilder::new(vec![1, 1]).build().unwrap();
        assert!(NodeFilter::new(3, 10).initialize(&lattice, None).is_err());
    }
}
