//! # SensorNet Core
//!
//! Core types, traits, and errors shared by the SensorNet routing engine
//! and the network simulator.
//!
//! ## Key Traits
//!
//! - [`LinkGraph`]: Read-only view over an undirected, weighted link graph
//!
//! ## Key Types
//!
//! - [`NodeId`]: Identifier of a sensor node
//! - [`Cost`]: Path cost with a dedicated infinite sentinel
//! - [`MessageCounters`]: Per-type transmission accounting
//! - [`TopologyChange`]: Events emitted when links fail, appear or partition
//! - [`TrafficResult`]: Outcome of a single data transmission

pub mod cost;
pub mod counters;
pub mod error;
pub mod event;
pub mod identity;
pub mod traits;

// Re-export main types
pub use cost::*;
pub use counters::*;
pub use error::*;
pub use event::*;
pub use identity::*;
pub use traits::*;
