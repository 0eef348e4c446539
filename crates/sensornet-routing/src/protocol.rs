//! Routing protocol abstraction
//!
//! A [`RoutingProtocol`] computes routing tables over a [`Topology`] and
//! keeps them current as links fail or appear. The simulator drives it
//! through this trait only; the distance-vector engine is the one
//! implementation.

use std::fmt;
use std::ops::AddAssign;

use sensornet_core::{LinkChange, NodeId};
use serde::{Deserialize, Serialize};

use crate::engine::DistanceVectorEngine;
use crate::topology::Topology;

/// Work performed by one convergence run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    /// Synchronous rounds in which at least one node advertised
    pub rounds: usize,
    /// Vector advertisements sent (one per advertising node per round)
    pub disseminations: usize,
    /// Routing entries that changed
    pub route_updates: usize,
    /// Routes invalidated before relaxation started
    pub withdrawn_routes: usize,
}

impl AddAssign for ConvergenceReport {
    fn add_assign(&mut self, rhs: ConvergenceReport) {
        self.rounds += rhs.rounds;
        self.disseminations += rhs.disseminations;
        self.route_updates += rhs.route_updates;
        self.withdrawn_routes += rhs.withdrawn_routes;
    }
}

impl fmt::Display for ConvergenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rounds, {} advertisements, {} route updates, {} withdrawn",
            self.rounds, self.disseminations, self.route_updates, self.withdrawn_routes
        )
    }
}

/// Routing logic driven by the simulator
pub trait RoutingProtocol: Send + fmt::Debug {
    /// Short protocol name for logs and reports
    fn name(&self) -> &'static str;

    /// Discard all learned routes and seed every node from its direct links
    fn initialize(&mut self, topology: &mut Topology);

    /// Exchange state until no node has anything new to advertise
    fn converge(&mut self, topology: &mut Topology) -> ConvergenceReport;

    /// React to a link that has already been detached
    ///
    /// Returns the number of routes invalidated.
    fn link_removed(&mut self, topology: &mut Topology, a: NodeId, b: NodeId) -> usize;

    /// React to a link that has already been attached
    fn link_added(&mut self, topology: &mut Topology, a: NodeId, b: NodeId);

    /// Apply one link change and converge
    fn reconverge(&mut self, topology: &mut Topology, change: LinkChange) -> ConvergenceReport {
        let withdrawn = match change {
            LinkChange::Removed { a, b } => self.link_removed(topology, a, b),
            LinkChange::Added { a, b } => {
                self.link_added(topology, a, b);
                0
            }
        };
        let mut report = self.converge(topology);
        report.withdrawn_routes += withdrawn;
        report
    }

    /// Rebuild every table from scratch
    fn converge_full(&mut self, topology: &mut Topology) -> ConvergenceReport {
        self.initialize(topology);
        self.converge(topology)
    }
}

/// Available routing protocols
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolKind {
    #[default]
    DistanceVector,
}

impl ProtocolKind {
    /// Instantiate the protocol
    pub fn build(&self) -> Box<dyn RoutingProtocol> {
        match self {
            ProtocolKind::DistanceVector => Box::new(DistanceVectorEngine::new()),
        }
    }
}
