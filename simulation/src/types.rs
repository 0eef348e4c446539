//! Core types for the SensorNet simulation
//!
//! - [`StepParams`]: per-step event probabilities and the hello schedule
//! - [`StepEvents`]: everything one step changed
//! - [`TopologyUpdate`]: result of a manual link edit
//! - [`RoutingInfo`], [`NetworkSnapshot`]: read-only views for reports and renderers

use std::collections::BTreeMap;

use sensornet_core::{
    LinkKey, MessageCounters, NodeId, ParameterError, Position, TopologyChange, TrafficResult,
};
use sensornet_routing::{DistanceVector, RouteEntry, SensorNode};
use serde::{Deserialize, Serialize};

/// Probabilities and schedule for one simulation step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepParams {
    /// Probability that a data transmission is requested
    pub p_request: f64,
    /// Probability that one existing link fails
    pub p_fail: f64,
    /// Base probability that one new link appears
    pub p_new: f64,
    /// Hello phase runs every `hello_interval` steps; 0 disables it
    pub hello_interval: u64,
}

impl Default for StepParams {
    fn default() -> Self {
        Self {
            p_request: 0.5,
            p_fail: 0.1,
            p_new: 0.1,
            hello_interval: 1,
        }
    }
}

impl StepParams {
    /// Check every probability is within [0, 1]
    pub fn validate(&self) -> Result<(), ParameterError> {
        for (name, value) in [
            ("p_request", self.p_request),
            ("p_fail", self.p_fail),
            ("p_new", self.p_new),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ParameterError::ProbabilityOutOfRange { name, value });
            }
        }
        Ok(())
    }

    /// Whether the hello phase runs at the given zero-based step index
    pub fn hello_due(&self, step: u64) -> bool {
        self.hello_interval > 0 && step % self.hello_interval == 0
    }

    /// A step that only exchanges hellos
    pub fn quiet() -> Self {
        Self {
            p_request: 0.0,
            p_fail: 0.0,
            p_new: 0.0,
            hello_interval: 1,
        }
    }
}

/// How routing tables are repaired after a topology change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconvergenceMode {
    /// Withdraw affected routes and relax from the surviving ones
    #[default]
    Incremental,
    /// Reseed every node and converge from scratch
    Full,
}

/// Everything that happened during one step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepEvents {
    /// Zero-based index of the step
    pub step: u64,
    /// Hello messages sent during the hello phase
    pub hello_messages: u64,
    /// Link failures, additions, reconnections and partitions, in order
    pub topology_changes: Vec<TopologyChange>,
    /// Transmission requested during the traffic phase
    pub traffic: Option<TrafficResult>,
    /// Relaxation rounds spent reconverging after topology changes
    pub reconvergence_iterations: usize,
}

impl StepEvents {
    pub fn new(step: u64) -> Self {
        Self {
            step,
            ..Default::default()
        }
    }
}

/// Result of a manual link edit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyUpdate {
    pub changes: Vec<TopologyChange>,
    pub reconvergence_iterations: usize,
}

/// A node's routing state as seen from outside
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingInfo {
    pub routing_table: BTreeMap<NodeId, RouteEntry>,
    pub distance_vector: DistanceVector,
}

impl From<&SensorNode> for RoutingInfo {
    fn from(node: &SensorNode) -> Self {
        Self {
            routing_table: node.routing_table().to_map(),
            distance_vector: node.distance_vector().clone(),
        }
    }
}

/// Placement, links and counters of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub position: Position,
    pub transmission_range: f64,
    pub neighbors: Vec<NodeId>,
    pub counters: MessageCounters,
}

impl From<&SensorNode> for NodeSnapshot {
    fn from(node: &SensorNode) -> Self {
        Self {
            id: node.id(),
            position: node.position(),
            transmission_range: node.transmission_range(),
            neighbors: node.neighbor_ids(),
            counters: *node.counters(),
        }
    }
}

/// One undirected link
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkSnapshot {
    pub a: NodeId,
    pub b: NodeId,
    pub delay: f64,
}

impl From<(LinkKey, f64)> for LinkSnapshot {
    fn from((key, delay): (LinkKey, f64)) -> Self {
        Self {
            a: key.low,
            b: key.high,
            delay,
        }
    }
}

/// Full network view for external renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub epoch: u64,
    pub step: u64,
    pub nodes: Vec<NodeSnapshot>,
    pub links: Vec<LinkSnapshot>,
}
