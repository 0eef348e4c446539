//! Routing-state invariant checks
//!
//! [`check_invariants`] validates a quiescent topology: self entries,
//! link symmetry, next hops that are real neighbors, vector/table
//! agreement, and the Bellman condition that no neighbor offers a strictly
//! cheaper route.

use sensornet_core::{Cost, LinkGraph};

use crate::error::{RoutingError, RoutingResult};
use crate::topology::Topology;

/// Slack allowed when comparing accumulated float costs
const COST_EPSILON: f64 = 1e-9;

/// Validate the routing state of a converged topology
pub fn check_invariants(topology: &Topology) -> RoutingResult<()> {
    check_links(topology)?;

    for node in topology.nodes() {
        let id = node.id();
        let self_entry = node.routing_table().get(id).copied().unwrap_or_default();
        if self_entry.next_hop != Some(id) || self_entry.cost != Cost::ZERO {
            return Err(RoutingError::BadSelfEntry {
                node: id,
                next_hop: self_entry.next_hop,
                cost: self_entry.cost,
            });
        }
        if node.is_dirty() {
            return Err(RoutingError::DirtyAtQuiescence { node: id });
        }

        for (&destination, entry) in node.routing_table().iter() {
            let vector = node.cost_to(destination);
            if vector != entry.cost {
                return Err(RoutingError::TableMismatch {
                    node: id,
                    destination,
                    vector,
                    table: entry.cost,
                });
            }
            if destination == id || !entry.is_reachable() {
                continue;
            }
            match entry.next_hop {
                Some(next_hop) if !node.is_neighbor(next_hop) => {
                    return Err(RoutingError::NextHopNotNeighbor {
                        node: id,
                        destination,
                        next_hop,
                    });
                }
                _ => {}
            }
        }

        for (&neighbor, &link) in node.neighbors() {
            let Some(peer) = topology.node(neighbor) else {
                continue;
            };
            for (&destination, &offered) in peer.distance_vector() {
                if destination == id || offered.is_infinite() {
                    continue;
                }
                let through = offered + link;
                let cost = node.cost_to(destination);
                let relaxed = match (cost, through) {
                    (Cost::Finite(c), Cost::Finite(t)) => c <= t + COST_EPSILON,
                    (Cost::Infinite, Cost::Finite(_)) => false,
                    _ => true,
                };
                if !relaxed {
                    return Err(RoutingError::NotRelaxed {
                        node: id,
                        destination,
                        cost,
                        better: through,
                    });
                }
            }
        }
    }
    Ok(())
}

fn check_links(topology: &Topology) -> RoutingResult<()> {
    let mut endpoint_count = 0;
    for (key, delay) in topology.links() {
        let (a, b) = key.endpoints();
        let forward = topology.node(a).and_then(|n| n.link_cost(b));
        let backward = topology.node(b).and_then(|n| n.link_cost(a));
        if forward != Some(delay) || backward != Some(delay) {
            return Err(RoutingError::AsymmetricLink { a, b });
        }
        endpoint_count += 2;
    }
    let degree_sum: usize = topology.nodes().map(|n| n.degree()).sum();
    if degree_sum != endpoint_count {
        // Some neighbor entry has no backing link; find it for the report
        for node in topology.nodes() {
            for &neighbor in node.neighbors().keys() {
                if topology.link_cost(node.id(), neighbor).is_none() {
                    return Err(RoutingError::AsymmetricLink {
                        a: node.id(),
                        b: neighbor,
                    });
                }
            }
        }
    }
    Ok(())
}
