//! Topology and traffic events

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::NodeId;

/// Changes to the link graph reported by a step or a manual edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TopologyChange {
    /// A link failed or was removed by the caller
    LinkRemoved { a: NodeId, b: NodeId, delay: f64 },

    /// A new link was established
    LinkAdded { a: NodeId, b: NodeId, delay: f64 },

    /// An isolated node was reattached to its nearest feasible peer
    Reconnected { node: NodeId, peer: NodeId, delay: f64 },

    /// A removal left these nodes cut off from the rest of the network
    /// with no feasible reconnection
    DisconnectedPartition { nodes: Vec<NodeId> },
}

impl TopologyChange {
    /// Whether this change added a link
    pub fn is_addition(&self) -> bool {
        matches!(self, Self::LinkAdded { .. } | Self::Reconnected { .. })
    }
}

impl fmt::Display for TopologyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkRemoved { a, b, delay } => {
                write!(f, "link {a}-{b} removed (delay {delay:.3})")
            }
            Self::LinkAdded { a, b, delay } => write!(f, "link {a}-{b} added (delay {delay:.3})"),
            Self::Reconnected { node, peer, delay } => {
                write!(f, "node {node} reconnected to {peer} (delay {delay:.3})")
            }
            Self::DisconnectedPartition { nodes } => {
                let ids: Vec<String> = nodes.iter().map(|n| n.to_string()).collect();
                write!(f, "partition cut off: [{}]", ids.join(", "))
            }
        }
    }
}

/// A link mutation fed to a routing protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkChange {
    Removed { a: NodeId, b: NodeId },
    Added { a: NodeId, b: NodeId },
}

/// A caller-requested topology edit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LinkAction {
    /// Add a link; the delay is sampled when not given
    Add {
        a: NodeId,
        b: NodeId,
        delay: Option<f64>,
    },
    /// Remove an existing link
    Remove { a: NodeId, b: NodeId },
}

/// Why a data transmission did not arrive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// A node on the path had no route to the destination
    NoRoute,
    /// The walk revisited a node
    Loop,
    /// A routing entry pointed at a node that is not a current neighbor
    BrokenLink,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRoute => write!(f, "destination unreachable"),
            Self::Loop => write!(f, "routing loop"),
            Self::BrokenLink => write!(f, "next hop is not a neighbor"),
        }
    }
}

/// Outcome of a transmission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrafficOutcome {
    Delivered {
        path: Vec<NodeId>,
        delay: f64,
        hops: usize,
    },
    Failed {
        reason: FailureReason,
        /// Nodes visited before the walk stopped, source first
        partial_path: Vec<NodeId>,
    },
}

/// A single source-to-destination transmission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficResult {
    pub source: NodeId,
    pub destination: NodeId,
    pub outcome: TrafficOutcome,
}

impl TrafficResult {
    pub fn is_delivered(&self) -> bool {
        matches!(self.outcome, TrafficOutcome::Delivered { .. })
    }

    /// Path taken, source first (partial on failure)
    pub fn path(&self) -> &[NodeId] {
        match &self.outcome {
            TrafficOutcome::Delivered { path, .. } => path,
            TrafficOutcome::Failed { partial_path, .. } => partial_path,
        }
    }

    /// End-to-end delay when delivered
    pub fn delay(&self) -> Option<f64> {
        match &self.outcome {
            TrafficOutcome::Delivered { delay, .. } => Some(*delay),
            TrafficOutcome::Failed { .. } => None,
        }
    }

    /// Hop count when delivered
    pub fn hops(&self) -> Option<usize> {
        match &self.outcome {
            TrafficOutcome::Delivered { hops, .. } => Some(*hops),
            TrafficOutcome::Failed { .. } => None,
        }
    }
}

impl fmt::Display for TrafficResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path: Vec<String> = self.path().iter().map(|n| n.to_string()).collect();
        match &self.outcome {
            TrafficOutcome::Delivered { delay, hops, .. } => write!(
                f,
                "{} -> {} delivered via [{}] in {} hops, delay {:.3}",
                self.source,
                self.destination,
                path.join(" -> "),
                hops,
                delay
            ),
            TrafficOutcome::Failed { reason, .. } => write!(
                f,
                "{} -> {} failed ({}) after [{}]",
                self.source,
                self.destination,
                reason,
                path.join(" -> ")
            ),
        }
    }
}
