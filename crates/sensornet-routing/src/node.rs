//! Per-node protocol state
//!
//! A [`SensorNode`] owns its placement, its view of the adjacent links, its
//! distance vector, its routing table, the dirty flag that schedules the
//! next advertisement, and its message counters.
//!
//! Neighbor maps are only mutated through [`Topology`](crate::Topology),
//! which keeps both endpoints of a link in agreement.

use std::collections::BTreeMap;

use sensornet_core::{Cost, MessageCounters, MessageKind, NodeId, Position};
use serde::{Deserialize, Serialize};

use crate::table::{RouteEntry, RoutingTable};

/// Mapping from destination to the best known cost
pub type DistanceVector = BTreeMap<NodeId, Cost>;

/// A sensor node and its distance-vector state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorNode {
    id: NodeId,
    position: Position,
    transmission_range: f64,
    /// Adjacent nodes and link delays
    neighbors: BTreeMap<NodeId, f64>,
    distance_vector: DistanceVector,
    routing_table: RoutingTable,
    /// Set when the vector changed since the last advertisement
    dirty: bool,
    counters: MessageCounters,
}

impl SensorNode {
    /// Create an unlinked node that only knows a route to itself
    pub fn new(id: NodeId, position: Position, transmission_range: f64) -> Self {
        let mut node = Self {
            id,
            position,
            transmission_range,
            neighbors: BTreeMap::new(),
            distance_vector: BTreeMap::new(),
            routing_table: RoutingTable::new(),
            dirty: false,
            counters: MessageCounters::new(),
        };
        node.reset_routes(std::iter::empty());
        node
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn transmission_range(&self) -> f64 {
        self.transmission_range
    }

    /// Grow the transmission range to at least `range`
    pub fn extend_range(&mut self, range: f64) {
        if range > self.transmission_range {
            self.transmission_range = range;
        }
    }

    /// Euclidean distance to another node
    pub fn distance_to(&self, other: &SensorNode) -> f64 {
        self.position.distance_to(&other.position)
    }

    /// Whether `other` lies within this node's transmission range
    pub fn can_reach(&self, other: &SensorNode) -> bool {
        self.distance_to(other) <= self.transmission_range
    }

    // ---- neighbors ----

    pub fn neighbors(&self) -> &BTreeMap<NodeId, f64> {
        &self.neighbors
    }

    pub fn neighbor_ids(&self) -> Vec<NodeId> {
        self.neighbors.keys().copied().collect()
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_neighbor(&self, other: NodeId) -> bool {
        self.neighbors.contains_key(&other)
    }

    /// Delay of the link to a neighbor
    pub fn link_cost(&self, neighbor: NodeId) -> Option<f64> {
        self.neighbors.get(&neighbor).copied()
    }

    pub(crate) fn attach(&mut self, neighbor: NodeId, delay: f64) {
        self.neighbors.insert(neighbor, delay);
    }

    pub(crate) fn detach(&mut self, neighbor: NodeId) -> Option<f64> {
        self.neighbors.remove(&neighbor)
    }

    // ---- routing state ----

    pub fn distance_vector(&self) -> &DistanceVector {
        &self.distance_vector
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing_table
    }

    /// Best known cost to a destination; unknown destinations are infinite
    pub fn cost_to(&self, destination: NodeId) -> Cost {
        self.distance_vector
            .get(&destination)
            .copied()
            .unwrap_or(Cost::Infinite)
    }

    /// Next hop towards a destination, if reachable
    pub fn next_hop(&self, destination: NodeId) -> Option<NodeId> {
        self.routing_table.next_hop(destination)
    }

    /// Discard learned routes and seed from the direct links
    ///
    /// Every id in `known` gets an entry: zero for this node, the link
    /// delay for neighbors, infinite otherwise.
    pub fn reset_routes(&mut self, known: impl IntoIterator<Item = NodeId>) {
        self.distance_vector.clear();
        self.routing_table.clear();
        for destination in known {
            self.distance_vector.insert(destination, Cost::Infinite);
            self.routing_table.insert(destination, RouteEntry::unreachable());
        }
        for (&neighbor, &delay) in &self.neighbors {
            self.distance_vector.insert(neighbor, Cost::finite(delay));
            self.routing_table
                .insert(neighbor, RouteEntry::via(neighbor, Cost::finite(delay)));
        }
        self.distance_vector.insert(self.id, Cost::ZERO);
        self.routing_table.insert(self.id, RouteEntry::local(self.id));
    }

    /// Install a route, keeping the vector and the table in step
    pub fn set_route(&mut self, destination: NodeId, entry: RouteEntry) {
        self.distance_vector.insert(destination, entry.cost);
        self.routing_table.insert(destination, entry);
    }

    /// Mark a destination unreachable; returns whether it was reachable
    pub fn withdraw(&mut self, destination: NodeId) -> bool {
        if destination == self.id {
            return false;
        }
        let was_reachable = self.cost_to(destination).is_finite();
        self.distance_vector.insert(destination, Cost::Infinite);
        self.routing_table.invalidate(destination);
        was_reachable
    }

    /// Relax this node's routes against a neighbor's advertised vector
    ///
    /// Only strictly cheaper candidates replace an existing route. Returns
    /// the number of destinations whose route changed. Advertisements from
    /// a node that is not a current neighbor are ignored.
    pub fn relax_from(&mut self, sender: NodeId, advertised: &DistanceVector) -> usize {
        let Some(link) = self.link_cost(sender) else {
            return 0;
        };
        let mut changed = 0;
        for (&destination, &cost) in advertised {
            if destination == self.id || cost.is_infinite() {
                continue;
            }
            let candidate = cost + link;
            if candidate < self.cost_to(destination) {
                self.set_route(destination, RouteEntry::via(sender, candidate));
                changed += 1;
            }
        }
        changed
    }

    // ---- scheduling ----

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clear the dirty flag, returning its previous value
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    // ---- accounting ----

    pub fn counters(&self) -> &MessageCounters {
        &self.counters
    }

    /// Record transmissions originated by this node
    pub fn record(&mut self, kind: MessageKind, count: u64) {
        self.counters.record_many(kind, count);
    }

    pub fn reset_counters(&mut self) {
        self.counters.reset();
    }
}
