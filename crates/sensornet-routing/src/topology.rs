//! Link store for a sensor network
//!
//! [`Topology`] owns every [`SensorNode`] and the set of undirected links
//! between them. Adding or removing a link updates the link set and both
//! endpoints' neighbor maps together, so the three never disagree.
//!
//! Feasibility of a new link is geometric: the endpoints must lie within
//! each other's transmission range.

use std::collections::BTreeMap;

use sensornet_core::{LinkError, LinkGraph, LinkKey, MessageCounters, NodeId, ParameterError};
use tracing::trace;

use crate::node::SensorNode;

/// Exclusive upper bound on the delay of a feasible link
pub const MAX_LINK_DELAY: f64 = 1.0;

/// Nodes and the undirected, weighted links between them
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: BTreeMap<NodeId, SensorNode>,
    links: BTreeMap<LinkKey, f64>,
}

impl Topology {
    /// Create an empty topology
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unlinked node
    pub fn add_node(&mut self, node: SensorNode) -> Result<(), ParameterError> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return Err(ParameterError::DuplicateNode(id));
        }
        self.nodes.insert(id, node);
        Ok(())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&SensorNode> {
        self.nodes.get(&id)
    }

    /// Mutable access to a node's routing state and counters
    ///
    /// Neighbor maps cannot be changed through this handle.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SensorNode> {
        self.nodes.get_mut(&id)
    }

    /// All nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &SensorNode> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut SensorNode> {
        self.nodes.values_mut()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// All links with their delays, in key order
    pub fn links(&self) -> impl Iterator<Item = (LinkKey, f64)> + '_ {
        self.links.iter().map(|(k, d)| (*k, *d))
    }

    pub fn link_keys(&self) -> Vec<LinkKey> {
        self.links.keys().copied().collect()
    }

    pub fn has_link(&self, a: NodeId, b: NodeId) -> bool {
        self.links.contains_key(&LinkKey::new(a, b))
    }

    pub fn degree(&self, id: NodeId) -> usize {
        self.nodes.get(&id).map_or(0, SensorNode::degree)
    }

    /// Euclidean distance between two nodes
    pub fn distance(&self, a: NodeId, b: NodeId) -> Option<f64> {
        let (na, nb) = (self.nodes.get(&a)?, self.nodes.get(&b)?);
        Some(na.distance_to(nb))
    }

    /// Whether a link between `a` and `b` is physically possible
    pub fn is_feasible(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return false;
        }
        match (self.nodes.get(&a), self.nodes.get(&b)) {
            (Some(na), Some(nb)) => na.can_reach(nb) && nb.can_reach(na),
            _ => false,
        }
    }

    /// Add a link without checking transmission ranges
    pub fn add_link(&mut self, a: NodeId, b: NodeId, delay: f64) -> Result<(), LinkError> {
        self.check_new_link(a, b, delay)?;
        self.insert_link(a, b, delay);
        Ok(())
    }

    /// Add a link whose endpoints are within mutual range
    pub fn add_feasible_link(&mut self, a: NodeId, b: NodeId, delay: f64) -> Result<(), LinkError> {
        self.check_feasible_link(a, b, delay)?;
        self.insert_link(a, b, delay);
        Ok(())
    }

    /// Validate a prospective link without attaching it
    ///
    /// Feasible links also need a delay below [`MAX_LINK_DELAY`].
    pub fn check_feasible_link(&self, a: NodeId, b: NodeId, delay: f64) -> Result<(), LinkError> {
        self.check_new_link(a, b, delay)?;
        if delay >= MAX_LINK_DELAY {
            return Err(LinkError::InvalidDelay(delay));
        }
        if !self.is_feasible(a, b) {
            let distance = self.distance(a, b).unwrap_or(f64::INFINITY);
            return Err(LinkError::OutOfRange { a, b, distance });
        }
        Ok(())
    }

    /// Remove a link, returning its delay
    pub fn remove_link(&mut self, a: NodeId, b: NodeId) -> Result<f64, LinkError> {
        for id in [a, b] {
            if !self.nodes.contains_key(&id) {
                return Err(LinkError::UnknownNode(id));
            }
        }
        let delay = self
            .links
            .remove(&LinkKey::new(a, b))
            .ok_or(LinkError::NotLinked { a, b })?;
        if let Some(node) = self.nodes.get_mut(&a) {
            node.detach(b);
        }
        if let Some(node) = self.nodes.get_mut(&b) {
            node.detach(a);
        }
        trace!(%a, %b, delay, "link detached");
        Ok(delay)
    }

    fn check_new_link(&self, a: NodeId, b: NodeId, delay: f64) -> Result<(), LinkError> {
        for id in [a, b] {
            if !self.nodes.contains_key(&id) {
                return Err(LinkError::UnknownNode(id));
            }
        }
        if a == b {
            return Err(LinkError::SelfLoop(a));
        }
        if !delay.is_finite() || delay < 0.0 {
            return Err(LinkError::InvalidDelay(delay));
        }
        if self.has_link(a, b) {
            return Err(LinkError::AlreadyLinked { a, b });
        }
        Ok(())
    }

    fn insert_link(&mut self, a: NodeId, b: NodeId, delay: f64) {
        self.links.insert(LinkKey::new(a, b), delay);
        if let Some(node) = self.nodes.get_mut(&a) {
            node.attach(b, delay);
        }
        if let Some(node) = self.nodes.get_mut(&b) {
            node.attach(a, delay);
        }
        trace!(%a, %b, delay, "link attached");
    }

    /// Unlinked node pairs that are within mutual range
    pub fn feasible_non_edges(&self) -> Vec<LinkKey> {
        self.feasible_pairs()
            .filter(|key| !self.links.contains_key(key))
            .collect()
    }

    /// Number of node pairs within mutual range, linked or not
    pub fn feasible_pair_count(&self) -> usize {
        self.feasible_pairs().count()
    }

    fn feasible_pairs(&self) -> impl Iterator<Item = LinkKey> + '_ {
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        let mut pairs = Vec::new();
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                if self.is_feasible(a, b) {
                    pairs.push(LinkKey::new(a, b));
                }
            }
        }
        pairs.into_iter()
    }

    /// Closest node that `id` could link to, skipping current neighbors and `exclude`
    ///
    /// Ties are broken by the lower id.
    pub fn nearest_feasible_peer(&self, id: NodeId, exclude: &[NodeId]) -> Option<NodeId> {
        let node = self.nodes.get(&id)?;
        self.nodes
            .values()
            .filter(|other| {
                other.id() != id
                    && !exclude.contains(&other.id())
                    && !node.is_neighbor(other.id())
                    && self.is_feasible(id, other.id())
            })
            .map(|other| (node.distance_to(other), other.id()))
            .min_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)))
            .map(|(_, other)| other)
    }

    /// Nodes without any link
    pub fn isolated_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.degree() == 0)
            .map(SensorNode::id)
            .collect()
    }

    /// Whether every node can reach every other node
    pub fn is_connected(&self) -> bool {
        match self.nodes.keys().next() {
            Some(&first) => self.reachable_from(first).len() == self.nodes.len(),
            None => true,
        }
    }

    /// Message counters summed over all nodes
    pub fn total_counters(&self) -> MessageCounters {
        self.nodes.values().map(|n| *n.counters()).sum()
    }

    pub fn reset_counters(&mut self) {
        for node in self.nodes.values_mut() {
            node.reset_counters();
        }
    }

    /// Adjacency list rendering
    pub fn visualize(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Topology: {} nodes, {} links\n",
            self.node_count(),
            self.link_count()
        ));
        for node in self.nodes.values() {
            let neighbors: Vec<String> = node
                .neighbors()
                .iter()
                .map(|(id, delay)| format!("{id}({delay:.3})"))
                .collect();
            out.push_str(&format!(
                "  {:>3} at {} range {:.2}: {}\n",
                node.id(),
                node.position(),
                node.transmission_range(),
                if neighbors.is_empty() {
                    "-".to_string()
                } else {
                    neighbors.join(" ")
                }
            ));
        }
        out
    }
}

impl LinkGraph for Topology {
    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn neighbors(&self, node: NodeId) -> Vec<(NodeId, f64)> {
        self.nodes
            .get(&node)
            .map(|n| n.neighbors().iter().map(|(id, d)| (*id, *d)).collect())
            .unwrap_or_default()
    }

    fn link_cost(&self, a: NodeId, b: NodeId) -> Option<f64> {
        self.links.get(&LinkKey::new(a, b)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensornet_core::Position;

    fn line(n: u32) -> Topology {
        let mut topo = Topology::new();
        for i in 0..n {
            topo.add_node(SensorNode::new(NodeId(i), Position::new(i as f64, 0.0), 1.0))
                .unwrap();
        }
        for i in 1..n {
            topo.add_feasible_link(NodeId(i - 1), NodeId(i), 0.5).unwrap();
        }
        topo
    }

    #[test]
    fn test_links_are_symmetric() {
        let topo = line(3);
        assert_eq!(topo.link_count(), 2);
        assert_eq!(topo.node(NodeId(0)).unwrap().link_cost(NodeId(1)), Some(0.5));
        assert_eq!(topo.node(NodeId(1)).unwrap().link_cost(NodeId(0)), Some(0.5));
        assert_eq!(topo.link_cost(NodeId(1), NodeId(0)), Some(0.5));
        assert_eq!(topo.degree(NodeId(1)), 2);
    }

    #[test]
    fn test_rejects_self_loop_and_duplicate() {
        let mut topo = line(3);
        assert_eq!(
            topo.add_link(NodeId(1), NodeId(1), 0.1),
            Err(LinkError::SelfLoop(NodeId(1)))
        );
        assert!(matches!(
            topo.add_link(NodeId(1), NodeId(0), 0.1),
            Err(LinkError::AlreadyLinked { .. })
        ));
        assert!(matches!(
            topo.add_link(NodeId(0), NodeId(9), 0.1),
            Err(LinkError::UnknownNode(NodeId(9)))
        ));
        assert!(matches!(
            topo.add_link(NodeId(0), NodeId(2), -1.0),
            Err(LinkError::InvalidDelay(_))
        ));
        assert_eq!(topo.link_count(), 2);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut topo = line(3);
        let result = topo.add_feasible_link(NodeId(0), NodeId(2), 0.1);
        assert!(matches!(result, Err(LinkError::OutOfRange { .. })));
        assert!(!topo.has_link(NodeId(0), NodeId(2)));
    }

    #[test]
    fn test_feasible_link_delay_below_one() {
        let mut topo = line(3);
        topo.remove_link(NodeId(0), NodeId(1)).unwrap();
        for delay in [1.0, 5.0] {
            assert_eq!(
                topo.add_feasible_link(NodeId(0), NodeId(1), delay),
                Err(LinkError::InvalidDelay(delay))
            );
        }
        assert!(!topo.has_link(NodeId(0), NodeId(1)));
        assert!(topo.add_feasible_link(NodeId(0), NodeId(1), 0.999).is_ok());
    }

    #[test]
    fn test_remove_link() {
        let mut topo = line(3);
        assert_eq!(topo.remove_link(NodeId(1), NodeId(0)), Ok(0.5));
        assert!(!topo.node(NodeId(0)).unwrap().is_neighbor(NodeId(1)));
        assert!(!topo.node(NodeId(1)).unwrap().is_neighbor(NodeId(0)));
        assert_eq!(topo.isolated_nodes(), vec![NodeId(0)]);
        assert!(matches!(
            topo.remove_link(NodeId(0), NodeId(1)),
            Err(LinkError::NotLinked { .. })
        ));
        assert!(!topo.is_connected());
    }

    #[test]
    fn test_feasible_non_edges() {
        let mut topo = line(3);
        assert!(topo.feasible_non_edges().is_empty());
        assert_eq!(topo.feasible_pair_count(), 2);
        topo.remove_link(NodeId(0), NodeId(1)).unwrap();
        assert_eq!(topo.feasible_non_edges(), vec![LinkKey::new(NodeId(0), NodeId(1))]);
    }

    #[test]
    fn test_nearest_feasible_peer() {
        let mut topo = Topology::new();
        topo.add_node(SensorNode::new(NodeId(0), Position::new(0.0, 0.0), 3.0)).unwrap();
        topo.add_node(SensorNode::new(NodeId(1), Position::new(2.0, 0.0), 3.0)).unwrap();
        topo.add_node(SensorNode::new(NodeId(2), Position::new(1.0, 0.0), 3.0)).unwrap();
        topo.add_node(SensorNode::new(NodeId(3), Position::new(0.5, 0.0), 0.1)).unwrap();

        // Node 3 is closest but cannot reach back
        assert_eq!(topo.nearest_feasible_peer(NodeId(0), &[]), Some(NodeId(2)));
        assert_eq!(topo.nearest_feasible_peer(NodeId(0), &[NodeId(2)]), Some(NodeId(1)));
        topo.add_link(NodeId(0), NodeId(2), 0.1).unwrap();
        assert_eq!(topo.nearest_feasible_peer(NodeId(0), &[]), Some(NodeId(1)));
        assert_eq!(topo.nearest_feasible_peer(NodeId(3), &[]), None);
    }

    #[test]
    fn test_components() {
        let mut topo = line(4);
        topo.remove_link(NodeId(1), NodeId(2)).unwrap();
        let components = topo.components();
        assert_eq!(components.len(), 2);
        assert!(components[0].contains(&NodeId(1)));
        assert!(components[1].contains(&NodeId(3)));
    }

    #[test]
    fn test_duplicate_node() {
        let mut topo = line(2);
        let dup = SensorNode::new(NodeId(1), Position::new(0.0, 0.0), 1.0);
        assert_eq!(topo.add_node(dup), Err(ParameterError::DuplicateNode(NodeId(1))));
    }
}
