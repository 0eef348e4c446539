//! Routing error types
//!
//! These describe broken protocol invariants. They indicate a logic fault,
//! never a runtime condition a caller is expected to recover from.

use sensornet_core::{Cost, NodeId};
use thiserror::Error;

/// Routing-state invariant violations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    #[error("node {node} has self entry ({next_hop:?}, {cost}) instead of (itself, 0)")]
    BadSelfEntry {
        node: NodeId,
        next_hop: Option<NodeId>,
        cost: Cost,
    },

    #[error("link {a}-{b} disagrees between the link set and the neighbor maps")]
    AsymmetricLink { a: NodeId, b: NodeId },

    #[error("node {node} is still dirty after convergence")]
    DirtyAtQuiescence { node: NodeId },

    #[error("node {node} routes to {destination} via {next_hop}, which is not a neighbor")]
    NextHopNotNeighbor {
        node: NodeId,
        destination: NodeId,
        next_hop: NodeId,
    },

    #[error("node {node} has cost {cost} to {destination} but a neighbor offers {better}")]
    NotRelaxed {
        node: NodeId,
        destination: NodeId,
        cost: Cost,
        better: Cost,
    },

    #[error("node {node}: vector cost {vector} to {destination} differs from table cost {table}")]
    TableMismatch {
        node: NodeId,
        destination: NodeId,
        vector: Cost,
        table: Cost,
    },
}

/// Result type for routing checks
pub type RoutingResult<T> = Result<T, RoutingError>;
