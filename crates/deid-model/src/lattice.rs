//! The generalization lattice as an arena of nodes.
//!
//! Nodes live in a single vector and refer to each other through [`NodeId`]
//! indices. Edges connect transformations that differ by exactly one level in
//! exactly one dimension and are created once by [`LatticeBuilder`].

use std::ops::Index;

use crate::error::{DeidError, Result};
use crate::loss::InformationLoss;
use crate::node::{Node, NodeId};
use crate::transformation::Transformation;

/// Upper limit on the number of transformations a lattice may hold.
pub const MAX_LATTICE_SIZE: usize = 1 << 24;

/// Builds a [`Lattice`] from the maximum generalization level per dimension.
#[derive(Debug, Clone)]
pub struct LatticeBuilder {
    max_levels: Vec<u32>,
}

impl LatticeBuilder {
    pub fn new(max_levels: Vec<u32>) -> Self {
        Self { max_levels }
    }

    pub fn build(self) -> Result<Lattice> {
        if self.max_levels.is_empty() {
            return Err(DeidError::InvalidConfig {
                message: "lattice needs at least one dimension".to_string(),
            });
        }

        // Mixed-radix strides, last dimension varies fastest.
        let dimensions = self.max_levels.len();
        let mut strides = vec![1usize; dimensions];
        let mut size = 1usize;
        for dim in (0..dimensions).rev() {
            strides[dim] = size;
            size = size
                .checked_mul(self.max_levels[dim] as usize + 1)
                .filter(|size| *size <= MAX_LATTICE_SIZE)
                .ok_or_else(|| DeidError::InvalidConfig {
                    message: format!(
                        "lattice over levels {:?} exceeds {MAX_LATTICE_SIZE} nodes",
                        self.max_levels
                    ),
                })?;
        }

        let mut nodes = Vec::with_capacity(size);
        for index in 0..size {
            let levels = (0..dimensions)
                .map(|dim| ((index / strides[dim]) % (self.max_levels[dim] as usize + 1)) as u32)
                .collect::<Vec<_>>();
            nodes.push(Node::new(NodeId(index), Transformation::new(levels)));
        }

        let max_depth = self.max_levels.iter().sum::<u32>() as usize;
        let mut levels = vec![Vec::new(); max_depth + 1];
        for index in 0..size {
            let transformation = nodes[index].transformation().clone();
            levels[transformation.level() as usize].push(NodeId(index));
            for dim in 0..dimensions {
                if transformation[dim] < self.max_levels[dim] {
                    let successor = index + strides[dim];
                    nodes[index].push_successor(NodeId(successor));
                    nodes[successor].push_predecessor(NodeId(index));
                }
            }
        }

        Ok(Lattice {
            nodes,
            levels,
            strides,
            max_levels: self.max_levels,
        })
    }
}

/// All transformations of a problem, linked into a DAG.
#[derive(Debug)]
pub struct Lattice {
    nodes: Vec<Node>,
    levels: Vec<Vec<NodeId>>,
    strides: Vec<usize>,
    max_levels: Vec<u32>,
}

impl Lattice {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.max_levels.len()
    }

    pub fn max_levels(&self) -> &[u32] {
        &self.max_levels
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Looks up a node, reporting an unknown id as an error.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id).ok_or(DeidError::UnknownNode { id: id.0 })
    }

    /// Nodes grouped by generalization depth, bottom first.
    pub fn levels(&self) -> &[Vec<NodeId>] {
        &self.levels
    }

    pub fn bottom(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn top(&self) -> &Node {
        &self.nodes[self.nodes.len() - 1]
    }

    /// The node with the given transformation vector.
    pub fn find(&self, levels: &[u32]) -> Option<&Node> {
        if levels.len() != self.max_levels.len() {
            return None;
        }
        let mut index = 0;
        for (dim, level) in levels.iter().enumerate() {
            if *level > self.max_levels[dim] {
                return None;
            }
            index += *level as usize * self.strides[dim];
        }
        self.nodes.get(index)
    }

    /// Smallest known loss (or lower bound) over the lattice.
    pub fn minimum_information_loss(&self) -> Option<InformationLoss> {
        self.nodes
            .iter()
            .filter_map(|node| node.information_loss().or(node.lower_bound()))
            .reduce(InformationLoss::min)
    }

    /// Largest known loss over the lattice.
    pub fn maximum_information_loss(&self) -> Option<InformationLoss> {
        self.nodes
            .iter()
            .filter_map(Node::information_loss)
            .reduce(InformationLoss::max)
    }

    /// Global loss range used to rescale node losses: the smallest known loss
    /// or bound, and the largest known loss (never below the minimum).
    pub fn loss_bounds(&self) -> (InformationLoss, InformationLoss) {
        let min = self.minimum_information_loss().unwrap_or(InformationLoss::ZERO);
        let max = self.maximum_information_loss().unwrap_or(min).max(min);
        (min, max)
    }

    /// Loss interval of a node: exact when known, otherwise bounded by its
    /// lower bound (or the lattice minimum) and the lattice maximum.
    pub fn loss_interval(&self, node: &Node) -> (InformationLoss, InformationLoss) {
        Self::loss_interval_within(node, self.loss_bounds())
    }

    /// Like [`Lattice::loss_interval`] with precomputed [`Lattice::loss_bounds`].
    pub fn loss_interval_within(
        node: &Node,
        (min, max): (InformationLoss, InformationLoss),
    ) -> (InformationLoss, InformationLoss) {
        if let Some(loss) = node.information_loss() {
            return (loss, loss);
        }
        let lower = node.lower_bound().unwrap_or(min);
        (lower, max.max(lower))
    }

    /// Clears the properties of every node.
    pub fn reset_properties(&self) {
        for node in &self.nodes {
            node.properties().reset();
        }
    }
}

impl Index<NodeId> for Lattice {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerates_every_transformation() {
        let lattice = LatticeBuilder::new(vec![1, 2]).build().unwrap();
        assert_eq!(lattice.len(), 6);
        assert_eq!(lattice.bottom().transformation().as_slice(), &[0, 0]);
        assert_eq!(lattice.top().transformation().as_slice(), &[1, 2]);
        assert_eq!(lattice.levels().len(), 4);
        assert_eq!(lattice.levels()[1].len(), 2);
    }

    #[test]
    fn edges_differ_by_one_level_in_one_dimension() {
        let lattice = LatticeBuilder::new(vec![2, 1, 3]).build().unwrap();
        for node in lattice.nodes() {
            for successor in node.successors() {
                let successor = &lattice[*successor];
                assert_eq!(successor.level(), node.level() + 1);
                assert!(successor.transformation().is_generalization_of(node.transformation()));
                assert!(successor.predecessors().contains(&node.id()));
            }
        }
        assert!(lattice.bottom().predecessors().is_empty());
        assert!(lattice.top().successors().is_empty());
        assert_eq!(lattice.bottom().successors().len(), 3);
    }

    #[test]
    fn find_matches_transformation() {
        let lattice = LatticeBuilder::new(vec![2, 3]).build().unwrap();
        for node in lattice.nodes() {
            let found = lattice.find(node.transformation().as_slice()).unwrap();
            assert_eq!(found.id(), node.id());
        }
        assert!(lattice.find(&[3, 0]).is_none());
        assert!(lattice.find(&[0]).is_none());
    }

    #[test]
    fn empty_dimensions_are_rejected() {
        assert!(LatticeBuilder::new(Vec::new()).build().is_err());
    }

    #[test]
    fn loss_interval_falls_back_to_lattice_bounds() {
        let lattice = LatticeBuilder::new(vec![1]).build().unwrap();
        lattice.bottom().set_information_loss(InformationLoss::new(1.0));
        lattice.top().set_lower_bound(InformationLoss::new(2.0));
        let (min, max) = lattice.loss_interval(lattice.top());
        assert_eq!(min, InformationLoss::new(2.0));
        assert_eq!(max, InformationLoss::new(2.0));
        assert_eq!(lattice.minimum_information_loss(), Some(InformationLoss::new(1.0)));
    }
}
