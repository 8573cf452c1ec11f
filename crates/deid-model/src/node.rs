use std::any::Any;
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use serde::{Deserialize, Serialize};

use crate::loss::InformationLoss;
use crate::properties::{NodeProperties, NodeProperty};
use crate::transformation::Transformation;

/// Stable index of a node inside its lattice arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Payload = Arc<dyn Any + Send + Sync>;

/// A single transformation in the generalization lattice.
///
/// Identity (equality and hashing) is the transformation vector alone, so
/// nodes and bare vectors can be used interchangeably as keys. Edges are
/// fixed once the lattice is built. Loss and lower bound are write-once:
/// the first value stored wins and later writes are ignored.
pub struct Node {
    id: NodeId,
    transformation: Transformation,
    level: u32,
    predecessors: Vec<NodeId>,
    successors: Vec<NodeId>,
    information_loss: OnceLock<InformationLoss>,
    lower_bound: OnceLock<InformationLoss>,
    properties: NodeProperties,
    data: Mutex<Option<Payload>>,
}

impl Node {
    pub fn new(id: NodeId, transformation: Transformation) -> Self {
        let level = transformation.level();
        Self {
            id,
            transformation,
            level,
            predecessors: Vec::new(),
            successors: Vec::new(),
            information_loss: OnceLock::new(),
            lower_bound: OnceLock::new(),
            properties: NodeProperties::new(),
            data: Mutex::new(None),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn transformation(&self) -> &Transformation {
        &self.transformation
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Direct specializations (one level lower in exactly one dimension).
    pub fn predecessors(&self) -> &[NodeId] {
        &self.predecessors
    }

    /// Direct generalizations (one level higher in exactly one dimension).
    pub fn successors(&self) -> &[NodeId] {
        &self.successors
    }

    pub fn information_loss(&self) -> Option<InformationLoss> {
        self.information_loss.get().copied()
    }

    pub fn lower_bound(&self) -> Option<InformationLoss> {
        self.lower_bound.get().copied()
    }

    /// Stores the loss unless one is already present. Returns whether the
    /// value was stored.
    pub fn set_information_loss(&self, loss: InformationLoss) -> bool {
        self.information_loss.set(loss).is_ok()
    }

    /// Stores the lower bound unless one is already present. Returns whether
    /// the value was stored.
    pub fn set_lower_bound(&self, bound: InformationLoss) -> bool {
        self.lower_bound.set(bound).is_ok()
    }

    pub fn has_property(&self, property: NodeProperty) -> bool {
        self.properties.has(property)
    }

    pub fn set_property(&self, property: NodeProperty) {
        self.properties.set(property);
    }

    pub fn properties(&self) -> &NodeProperties {
        &self.properties
    }

    /// Attaches search-specific data, replacing any previous payload.
    pub fn set_data<T: Any + Send + Sync>(&self, value: T) {
        *self.data.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(value));
    }

    /// The payload, if one of type `T` is attached.
    pub fn data<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let payload = self
            .data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        payload.downcast::<T>().ok()
    }

    pub fn clear_data(&self) {
        *self.data.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub(crate) fn push_predecessor(&mut self, id: NodeId) {
        self.predecessors.push(id);
    }

    pub(crate) fn push_successor(&mut self, id: NodeId) {
        self.successors.push(id);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("transformation", &self.transformation)
            .field("level", &self.level)
            .field("information_loss", &self.information_loss())
            .field("lower_bound", &self.lower_bound())
            .field("properties", &self.properties.to_vec())
            .finish()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.transformation == other.transformation
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.transformation.hash(state);
    }
}

impl Borrow<[u32]> for Node {
    fn borrow(&self) -> &[u32] {
        self.transformation.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::hash::{BuildHasher, RandomState};

    use super::*;

    fn node(id: usize, levels: &[u32]) -> Node {
        Node::new(NodeId(id), Transformation::from(levels))
    }

    #[test]
    fn identity_is_the_transformation() {
        let a = node(1, &[1, 0, 2]);
        let b = node(7, &[1, 0, 2]);
        assert_eq!(a, b);
        let hasher = RandomState::new();
        assert_eq!(hasher.hash_one(&a), hasher.hash_one(&b));
        assert_ne!(a, node(1, &[0, 0, 2]));
    }

    #[test]
    fn nodes_are_looked_up_by_vector() {
        let mut set = HashSet::new();
        set.insert(node(3, &[2, 1]));
        let probe: &[u32] = &[2, 1];
        assert_eq!(set.get(probe).map(Node::id), Some(NodeId(3)));
    }

    #[test]
    fn loss_and_bound_are_write_once() {
        let n = node(0, &[0]);
        assert!(n.set_information_loss(InformationLoss::new(3.0)));
        assert!(!n.set_information_loss(InformationLoss::new(1.0)));
        assert_eq!(n.information_loss(), Some(InformationLoss::new(3.0)));

        assert!(n.set_lower_bound(InformationLoss::new(2.0)));
        assert!(!n.set_lower_bound(InformationLoss::new(5.0)));
        assert_eq!(n.lower_bound(), Some(InformationLoss::new(2.0)));
    }

    #[test]
    fn payload_downcasts_by_type() {
        let n = node(0, &[0]);
        assert!(n.data::<u32>().is_none());
        n.set_data(42u32);
        assert_eq!(n.data::<u32>().as_deref(), Some(&42));
        assert!(n.data::<String>().is_none());
        n.clear_data();
        assert!(n.data::<u32>().is_none());
    }
}
