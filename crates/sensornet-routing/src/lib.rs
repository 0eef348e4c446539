//! # SensorNet Routing
//!
//! Proactive distance-vector routing for wireless sensor networks.
//!
//! ## Core Components
//!
//! - [`SensorNode`]: Per-node distance vector, routing table, dirty flag and message counters
//! - [`Topology`]: Link store that keeps both endpoints of every link in agreement
//! - [`DistanceVectorEngine`]: Distributed Bellman-Ford with incremental reconvergence
//! - [`RoutingProtocol`]: The seam the simulator drives; the engine is one implementation
//! - [`check_invariants`]: Validation of converged routing state
//! - [`reference`]: Centralized Dijkstra used to verify optimality
//!
//! ## Convergence
//!
//! After [`RoutingProtocol::initialize`], every node advertises its vector
//! to its neighbors. Receivers adopt strictly cheaper routes and advertise
//! in turn until no node is dirty. Link failures first withdraw every route
//! that depended on the failed link, then relaxation repairs the damaged
//! region from the surviving routes around it. Link additions seed the two
//! endpoints and let relaxation spread the improvement.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sensornet_routing::{DistanceVectorEngine, RoutingProtocol, Topology};
//!
//! let mut engine = DistanceVectorEngine::new();
//! engine.initialize(&mut topology);
//! let report = engine.converge(&mut topology);
//!
//! topology.remove_link(a, b)?;
//! let report = engine.reconverge(&mut topology, LinkChange::Removed { a, b });
//! ```

pub mod engine;
pub mod error;
pub mod invariants;
pub mod node;
pub mod protocol;
pub mod reference;
pub mod table;
pub mod topology;

// Re-export main types
pub use engine::DistanceVectorEngine;
pub use error::{RoutingError, RoutingResult};
pub use invariants::check_invariants;
pub use node::{DistanceVector, SensorNode};
pub use protocol::{ConvergenceReport, ProtocolKind, RoutingProtocol};
pub use reference::{RouteMismatch, ShortestPath, route_mismatches, shortest_paths};
pub use table::{RouteEntry, RoutingTable};
pub use topology::{MAX_LINK_DELAY, Topology};

// Re-export core types for convenience
pub use sensornet_core::{Cost, LinkChange, NodeId};
