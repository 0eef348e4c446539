//! Core traits for SensorNet
//!
//! - [`LinkGraph`]: read-only view over the link graph, shared by the
//!   topology store, reference shortest-path computations and anything
//!   that needs to inspect connectivity without owning routing state

use std::collections::{BTreeSet, VecDeque};

use crate::identity::NodeId;

/// Abstraction over an undirected graph with non-negative link delays
pub trait LinkGraph {
    /// All nodes, in ascending id order
    fn node_ids(&self) -> Vec<NodeId>;

    /// Direct neighbors of a node with the delay of each link
    fn neighbors(&self, node: NodeId) -> Vec<(NodeId, f64)>;

    /// Delay of the link between `a` and `b`, if they are linked
    fn link_cost(&self, a: NodeId, b: NodeId) -> Option<f64>;

    /// Check if two nodes are directly linked
    fn are_linked(&self, a: NodeId, b: NodeId) -> bool {
        self.link_cost(a, b).is_some()
    }

    /// Nodes reachable from `start`, including `start`
    fn reachable_from(&self, start: NodeId) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for (next, _) in self.neighbors(node) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// Connected components, each sorted, ordered by their smallest id
    fn components(&self) -> Vec<BTreeSet<NodeId>> {
        let mut assigned = BTreeSet::new();
        let mut components = Vec::new();
        for node in self.node_ids() {
            if assigned.contains(&node) {
                continue;
            }
            let component = self.reachable_from(node);
            assigned.extend(component.iter().copied());
            components.push(component);
        }
        components
    }
}
