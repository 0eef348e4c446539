//! Per-node routing table
//!
//! The [`RoutingTable`] maps every known destination to the neighbor that
//! packets should be forwarded to and the advertised cost of that route.
//! An entry with no next hop and infinite cost marks an unreachable
//! destination.

use std::collections::BTreeMap;

use sensornet_core::{Cost, NodeId};
use serde::{Deserialize, Serialize};

/// A single routing decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Neighbor to forward to; `None` when unreachable
    pub next_hop: Option<NodeId>,
    /// Total cost to the destination
    pub cost: Cost,
}

impl RouteEntry {
    /// Route forwarded through `next_hop`
    pub fn via(next_hop: NodeId, cost: Cost) -> Self {
        Self {
            next_hop: Some(next_hop),
            cost,
        }
    }

    /// Route to yourself
    pub fn local(id: NodeId) -> Self {
        Self::via(id, Cost::ZERO)
    }

    /// No known route
    pub fn unreachable() -> Self {
        Self {
            next_hop: None,
            cost: Cost::Infinite,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.next_hop.is_some() && self.cost.is_finite()
    }
}

impl Default for RouteEntry {
    fn default() -> Self {
        Self::unreachable()
    }
}

/// Destination-indexed routing table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingTable {
    routes: BTreeMap<NodeId, RouteEntry>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the route to a destination
    pub fn insert(&mut self, destination: NodeId, entry: RouteEntry) {
        self.routes.insert(destination, entry);
    }

    /// Get the route to a destination
    pub fn get(&self, destination: NodeId) -> Option<&RouteEntry> {
        self.routes.get(&destination)
    }

    /// Next hop towards a destination, if reachable
    pub fn next_hop(&self, destination: NodeId) -> Option<NodeId> {
        self.routes
            .get(&destination)
            .filter(|entry| entry.is_reachable())
            .and_then(|entry| entry.next_hop)
    }

    /// Mark a destination unreachable, returning the previous entry
    pub fn invalidate(&mut self, destination: NodeId) -> Option<RouteEntry> {
        self.routes.insert(destination, RouteEntry::unreachable())
    }

    /// Destinations currently routed through `neighbor`
    pub fn destinations_via(&self, neighbor: NodeId) -> Vec<NodeId> {
        self.routes
            .iter()
            .filter(|(_, entry)| entry.next_hop == Some(neighbor))
            .map(|(dest, _)| *dest)
            .collect()
    }

    /// Iterate over all entries in destination order
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &RouteEntry)> {
        self.routes.iter()
    }

    /// Number of reachable destinations, including the owner itself
    pub fn reachable_count(&self) -> usize {
        self.routes.values().filter(|e| e.is_reachable()).count()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn clear(&mut self) {
        self.routes.clear();
    }

    /// Copy of the underlying map
    pub fn to_map(&self) -> BTreeMap<NodeId, RouteEntry> {
        self.routes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_next_hop() {
        let mut table = RoutingTable::new();
        table.insert(NodeId(0), RouteEntry::local(NodeId(0)));
        table.insert(NodeId(2), RouteEntry::via(NodeId(1), Cost::finite(0.8)));
        table.insert(NodeId(3), RouteEntry::unreachable());

        assert_eq!(table.next_hop(NodeId(0)), Some(NodeId(0)));
        assert_eq!(table.next_hop(NodeId(2)), Some(NodeId(1)));
        assert_eq!(table.next_hop(NodeId(3)), None);
        assert_eq!(table.next_hop(NodeId(9)), None);
        assert_eq!(table.reachable_count(), 2);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_invalidate() {
        let mut table = RoutingTable::new();
        table.insert(NodeId(2), RouteEntry::via(NodeId(1), Cost::finite(0.8)));
        let previous = table.invalidate(NodeId(2));
        assert_eq!(previous.and_then(|e| e.next_hop), Some(NodeId(1)));
        assert!(!table.get(NodeId(2)).is_some_and(|e| e.is_reachable()));
    }

    #[test]
    fn test_destinations_via() {
        let mut table = RoutingTable::new();
        table.insert(NodeId(2), RouteEntry::via(NodeId(1), Cost::finite(0.5)));
        table.insert(NodeId(3), RouteEntry::via(NodeId(1), Cost::finite(0.9)));
        table.insert(NodeId(4), RouteEntry::via(NodeId(5), Cost::finite(0.2)));
        assert_eq!(table.destinations_via(NodeId(1)), vec![NodeId(2), NodeId(3)]);
    }
}
