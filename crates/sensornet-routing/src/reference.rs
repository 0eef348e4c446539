//! Centralized shortest paths
//!
//! Dijkstra over any [`LinkGraph`]. Used to verify that converged distance
//! vectors are optimal and to report ideal path costs alongside protocol
//! results.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use sensornet_core::{Cost, LinkGraph, NodeId};

use crate::topology::Topology;

/// Best path from a fixed source to one destination
#[derive(Debug, Clone, PartialEq)]
pub struct ShortestPath {
    pub cost: f64,
    /// Source first, destination last
    pub path: Vec<NodeId>,
}

impl ShortestPath {
    /// First hop after the source; the source itself for a zero-length path
    pub fn next_hop(&self) -> Option<NodeId> {
        self.path.get(1).or_else(|| self.path.first()).copied()
    }

    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

#[derive(Debug)]
struct State {
    cost: f64,
    node: NodeId,
}

impl Eq for State {}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest paths from `source` to every reachable node
pub fn shortest_paths<G: LinkGraph>(graph: &G, source: NodeId) -> BTreeMap<NodeId, ShortestPath> {
    let mut distances: BTreeMap<NodeId, f64> = BTreeMap::new();
    let mut previous: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    let mut heap = BinaryHeap::new();

    distances.insert(source, 0.0);
    heap.push(State {
        cost: 0.0,
        node: source,
    });

    while let Some(State { cost, node }) = heap.pop() {
        // Skip if we've already found a better path
        if cost > distances.get(&node).copied().unwrap_or(f64::INFINITY) {
            continue;
        }
        for (neighbor, link) in graph.neighbors(node) {
            let candidate = cost + link;
            if candidate < distances.get(&neighbor).copied().unwrap_or(f64::INFINITY) {
                distances.insert(neighbor, candidate);
                previous.insert(neighbor, node);
                heap.push(State {
                    cost: candidate,
                    node: neighbor,
                });
            }
        }
    }

    distances
        .iter()
        .map(|(&destination, &cost)| {
            let mut path = vec![destination];
            let mut current = destination;
            while let Some(&prev) = previous.get(&current) {
                path.push(prev);
                current = prev;
            }
            path.reverse();
            (destination, ShortestPath { cost, path })
        })
        .collect()
}

/// Optimal cost between every ordered pair of nodes
pub fn all_pairs_costs<G: LinkGraph>(graph: &G) -> BTreeMap<(NodeId, NodeId), Cost> {
    let ids = graph.node_ids();
    let mut costs = BTreeMap::new();
    for &source in &ids {
        let paths = shortest_paths(graph, source);
        for &destination in &ids {
            let cost = paths
                .get(&destination)
                .map_or(Cost::Infinite, |p| Cost::finite(p.cost));
            costs.insert((source, destination), cost);
        }
    }
    costs
}

/// A converged cost that disagrees with the optimum
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMismatch {
    pub source: NodeId,
    pub destination: NodeId,
    pub protocol: Cost,
    pub optimal: Cost,
}

/// Compare every node's distance vector against centralized shortest paths
pub fn route_mismatches(topology: &Topology, epsilon: f64) -> Vec<RouteMismatch> {
    let optimal = all_pairs_costs(topology);
    let mut mismatches = Vec::new();
    for ((source, destination), best) in optimal {
        let protocol = topology
            .node(source)
            .map_or(Cost::Infinite, |n| n.cost_to(destination));
        if !protocol.approx_eq(&best, epsilon) {
            mismatches.push(RouteMismatch {
                source,
                destination,
                protocol,
                optimal: best,
            });
        }
    }
    mismatches
}
