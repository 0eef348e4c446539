//! Data transmission over converged routing tables
//!
//! A packet follows next hops from the source. Only the source's data
//! counter moves, and only when the packet arrives.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use sensornet_core::{FailureReason, MessageKind, NodeId, TrafficOutcome, TrafficResult};
use sensornet_routing::Topology;

/// Walk the routing tables from `source` to `destination`
///
/// Callers reject `source == destination` before calling; if it happens
/// anyway the packet is delivered in zero hops.
pub fn transmit(topology: &mut Topology, source: NodeId, destination: NodeId) -> TrafficResult {
    let outcome = walk(topology, source, destination);

    if let TrafficOutcome::Delivered { .. } = outcome {
        if let Some(node) = topology.node_mut(source) {
            node.record(MessageKind::Data, 1);
        }
    }

    let result = TrafficResult {
        source,
        destination,
        outcome,
    };
    debug!(%result, "transmission finished");
    result
}

fn walk(topology: &Topology, source: NodeId, destination: NodeId) -> TrafficOutcome {
    let mut path = vec![source];
    let mut visited = BTreeSet::from([source]);
    let mut delay = 0.0;
    let mut current = source;

    while current != destination {
        let Some(node) = topology.node(current) else {
            return failed(FailureReason::NoRoute, path);
        };
        let entry = node.routing_table().get(destination).copied().unwrap_or_default();
        let next = match entry.next_hop {
            Some(next) if entry.is_reachable() => next,
            _ => return failed(FailureReason::NoRoute, path),
        };
        let Some(link) = node.link_cost(next) else {
            return failed(FailureReason::BrokenLink, path);
        };
        if !visited.insert(next) {
            return failed(FailureReason::Loop, path);
        }
        trace!(from = %current, to = %next, link, "hop");
        delay += link;
        path.push(next);
        current = next;
    }

    let hops = path.len() - 1;
    TrafficOutcome::Delivered { path, delay, hops }
}

fn failed(reason: FailureReason, partial_path: Vec<NodeId>) -> TrafficOutcome {
    TrafficOutcome::Failed {
        reason,
        partial_path,
    }
}
