//! Search-state flags attached to lattice nodes.
//!
//! Flags are independent and any combination is legal. They are only ever
//! OR-ed in; the sole way to clear them is [`NodeProperties::reset`], which
//! clears all flags at once.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// A single search-state property of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeProperty {
    /// All privacy criteria are fulfilled.
    Anonymous,
    /// Not all privacy criteria are fulfilled.
    NotAnonymous,
    /// The k-anonymity sub-criterion is fulfilled.
    KAnonymous,
    /// The k-anonymity sub-criterion is not fulfilled.
    NotKAnonymous,
    /// The transformation cannot beat the current optimum.
    InsufficientUtility,
    /// The privacy predicate was evaluated explicitly, not inferred.
    Checked,
    /// A grouper snapshot must be retained regardless of the size heuristic.
    ForceSnapshot,
    /// The second search phase already covered this node.
    Visited,
    /// The search guarantees no successor will ever be checked.
    SuccessorsPruned,
    /// A notification for this node has already been emitted.
    EventFired,
}

impl NodeProperty {
    pub const ALL: [NodeProperty; 10] = [
        NodeProperty::Anonymous,
        NodeProperty::NotAnonymous,
        NodeProperty::KAnonymous,
        NodeProperty::NotKAnonymous,
        NodeProperty::InsufficientUtility,
        NodeProperty::Checked,
        NodeProperty::ForceSnapshot,
        NodeProperty::Visited,
        NodeProperty::SuccessorsPruned,
        NodeProperty::EventFired,
    ];

    fn bit(self) -> u32 {
        1 << self as u32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeProperty::Anonymous => "anonymous",
            NodeProperty::NotAnonymous => "not-anonymous",
            NodeProperty::KAnonymous => "k-anonymous",
            NodeProperty::NotKAnonymous => "not-k-anonymous",
            NodeProperty::InsufficientUtility => "insufficient-utility",
            NodeProperty::Checked => "checked",
            NodeProperty::ForceSnapshot => "force-snapshot",
            NodeProperty::Visited => "visited",
            NodeProperty::SuccessorsPruned => "successors-pruned",
            NodeProperty::EventFired => "event-fired",
        }
    }
}

impl fmt::Display for NodeProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic set of [`NodeProperty`] flags.
///
/// Updates are atomic read-modify-write operations, so concurrent writers
/// never lose each other's flags.
#[derive(Debug, Default)]
pub struct NodeProperties(AtomicU32);

impl NodeProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, property: NodeProperty) -> bool {
        self.0.load(Ordering::Acquire) & property.bit() != 0
    }

    /// ORs `property` into the set. Idempotent.
    pub fn set(&self, property: NodeProperty) {
        self.0.fetch_or(property.bit(), Ordering::AcqRel);
    }

    /// Sets `property` and returns whether it was already present.
    pub fn test_and_set(&self, property: NodeProperty) -> bool {
        self.0.fetch_or(property.bit(), Ordering::AcqRel) & property.bit() != 0
    }

    /// Clears every flag.
    pub fn reset(&self) {
        self.0.store(0, Ordering::Release);
    }

    pub fn is_empty(&self) -> bool {
        self.0.load(Ordering::Acquire) == 0
    }

    /// The flags currently present, in declaration order.
    pub fn to_vec(&self) -> Vec<NodeProperty> {
        NodeProperty::ALL
            .into_iter()
            .filter(|property| self.has(*property))
            .collect()
    }
}

impl Clone for NodeProperties {
    fn clone(&self) -> Self {
        Self(AtomicU32::new(self.0.load(Ordering::Acquire)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_independent() {
        let properties = NodeProperties::new();
        properties.set(NodeProperty::Anonymous);
        properties.set(NodeProperty::Checked);
        assert!(properties.has(NodeProperty::Anonymous));
        assert!(properties.has(NodeProperty::Checked));
        assert!(!properties.has(NodeProperty::NotAnonymous));
        assert_eq!(
            properties.to_vec(),
            vec![NodeProperty::Anonymous, NodeProperty::Checked]
        );
    }

    #[test]
    fn test_and_set_reports_previous_state() {
        let properties = NodeProperties::new();
        assert!(!properties.test_and_set(NodeProperty::EventFired));
        assert!(properties.test_and_set(NodeProperty::EventFired));
    }

    #[test]
    fn reset_clears_everything() {
        let properties = NodeProperties::new();
        for property in NodeProperty::ALL {
            properties.set(property);
        }
        properties.reset();
        assert!(properties.is_empty());
    }

    #[test]
    fn concurrent_writers_keep_every_flag() {
        let properties = NodeProperties::new();
        std::thread::scope(|scope| {
            for property in NodeProperty::ALL {
                let properties = &properties;
                scope.spawn(move || {
                    for _ in 0..1000 {
                        properties.set(property);
                    }
                });
            }
        });
        assert_eq!(properties.to_vec(), NodeProperty::ALL.to_vec());
    }
}
