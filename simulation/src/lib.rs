//! # SensorNet
//!
//! A wireless sensor network simulator with distance-vector routing over a
//! dynamic topology.
//!
//! ## Overview
//!
//! Nodes are scattered over a square area, each with its own transmission
//! range. Links join nodes within range and carry a delay that doubles as
//! the routing cost. Every node keeps a distance vector and a routing table
//! maintained by the distance-vector engine. Key features:
//!
//! - **Connectivity repair**: generated networks never start partitioned
//! - **Dynamic steps**: hello exchange, link failure, link addition and data
//!   traffic, each gated by its own probability
//! - **Incremental reconvergence**: only routes crossing a failed link are
//!   withdrawn and relearned
//! - **Message accounting**: hello, topology, route-discovery and data
//!   counters per node, giving the protocol efficiency
//! - **Evaluation**: repeated runs over random topologies, scored and ranked
//!
//! ## Architecture
//!
//! - **Types** (`types.rs`): step parameters, step events, read-only snapshots
//! - **Topology** (`topology.rs`): random geometric generation and repair
//! - **Simulation** (`simulation.rs`): the [`SensorNetwork`] step driver
//! - **Traffic** (`traffic.rs`): packet walks over routing tables
//! - **History** (`history.rs`): recorded steps with cursor navigation
//! - **Evaluation** (`evaluation.rs`): batch runs and topology scoring
//! - **Scenarios** (`scenarios.rs`): pre-built runs
//!
//! ## Example
//!
//! ```rust,ignore
//! use sensornet_simulation::*;
//!
//! let mut network = SensorNetwork::create(20, 10.0, Some(42))?;
//! let params = StepParams { p_request: 0.5, p_fail: 0.1, p_new: 0.1, hello_interval: 1 };
//! for _ in 0..100 {
//!     let events = network.step(&params)?;
//!     if let Some(traffic) = events.traffic {
//!         println!("{traffic}");
//!     }
//! }
//! println!("efficiency {:.4}", network.statistics().efficiency());
//! ```

pub mod config;
pub mod evaluation;
pub mod history;
pub mod scenarios;
pub mod simulation;
pub mod topology;
pub mod traffic;
pub mod types;

#[cfg(test)]
mod integration_scenarios;

// Re-export main types
pub use types::{
    LinkSnapshot,
    NetworkSnapshot,
    NodeSnapshot,
    ReconvergenceMode,
    RoutingInfo,
    StepEvents,
    StepParams,
    TopologyUpdate,
};

pub use config::{ConfigError, SimConfig};

pub use evaluation::{
    EvaluationConfig,
    EvaluationReport,
    IterationResult,
    ProbabilitySpec,
    Ranking,
    ScoreBreakdown,
    ScoreWeights,
    TopologySummary,
    rank_topologies,
    run_evaluation,
    topology_score,
};

pub use history::{History, StepOrigin, StepRecord};

pub use simulation::{SensorNetwork, Statistics};

pub use topology::{TopologyBuilder, from_layout, repair_connectivity};

// Re-export core types used throughout the public interface
pub use sensornet_core::{
    Cost,
    FailureReason,
    LinkAction,
    LinkError,
    MessageCounters,
    MessageKind,
    NodeId,
    ParameterError,
    Position,
    SensorNetError,
    SensorNetResult,
    TopologyChange,
    TrafficOutcome,
    TrafficResult,
};
pub use sensornet_routing::{ProtocolKind, RouteEntry, Topology};
