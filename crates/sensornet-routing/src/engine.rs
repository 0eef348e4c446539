//! Distributed Bellman-Ford over a [`Topology`]
//!
//! Convergence runs in barrier-synchronized rounds:
//! 1. Every dirty node snapshots its distance vector and clears its flag
//! 2. Each snapshot is advertised to all of the sender's neighbors (one
//!    route-discovery message at the sender)
//! 3. Receivers relax against every snapshot in ascending sender order;
//!    any receiver whose vector changed becomes dirty for the next round
//!
//! Link failures withdraw every route whose next-hop chain crossed the
//! failed link before relaxation resumes, so stale costs can never be
//! re-learned from a neighbor that itself depended on the failed link.

use std::collections::{BTreeSet, VecDeque};

use sensornet_core::{Cost, LinkGraph, MessageKind, NodeId};
use tracing::{debug, trace, warn};

use crate::invariants::check_invariants;
use crate::node::DistanceVector;
use crate::protocol::{ConvergenceReport, RoutingProtocol};
use crate::table::RouteEntry;
use crate::topology::Topology;

/// Proactive distance-vector routing
#[derive(Debug, Clone)]
pub struct DistanceVectorEngine {
    /// Validate routing invariants after every convergence
    verify: bool,
}

impl DistanceVectorEngine {
    /// Create an engine; invariant verification follows debug assertions
    pub fn new() -> Self {
        Self {
            verify: cfg!(debug_assertions),
        }
    }

    /// Force invariant verification on or off
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Upper bound on relaxation rounds before the run is declared broken
    fn round_limit(node_count: usize) -> usize {
        node_count * node_count + 1
    }
}

impl Default for DistanceVectorEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// One node's advertisement within a round
struct Advertisement {
    sender: NodeId,
    vector: DistanceVector,
    receivers: Vec<NodeId>,
}

impl RoutingProtocol for DistanceVectorEngine {
    fn name(&self) -> &'static str {
        "distance-vector"
    }

    fn initialize(&mut self, topology: &mut Topology) {
        let ids = topology.node_ids();
        for node in topology.nodes_mut() {
            node.reset_routes(ids.iter().copied());
            node.mark_dirty();
            node.record(MessageKind::Topology, 1);
        }
        debug!(nodes = ids.len(), "distance vectors seeded");
    }

    fn converge(&mut self, topology: &mut Topology) -> ConvergenceReport {
        let mut report = ConvergenceReport::default();
        let limit = Self::round_limit(topology.node_count());

        loop {
            let advertisements: Vec<Advertisement> = topology
                .nodes_mut()
                .filter_map(|node| {
                    // A dirty node with no links has nobody to tell
                    if !node.take_dirty() || node.degree() == 0 {
                        return None;
                    }
                    Some(Advertisement {
                        sender: node.id(),
                        vector: node.distance_vector().clone(),
                        receivers: node.neighbor_ids(),
                    })
                })
                .collect();

            if advertisements.is_empty() {
                break;
            }
            report.rounds += 1;
            assert!(
                report.rounds <= limit,
                "distance-vector relaxation exceeded {limit} rounds"
            );

            for ad in &advertisements {
                if let Some(node) = topology.node_mut(ad.sender) {
                    node.record(MessageKind::RouteDiscovery, 1);
                }
                report.disseminations += 1;
            }

            let mut round_updates = 0;
            for ad in &advertisements {
                for &receiver in &ad.receivers {
                    let Some(node) = topology.node_mut(receiver) else {
                        continue;
                    };
                    let changed = node.relax_from(ad.sender, &ad.vector);
                    if changed > 0 {
                        node.mark_dirty();
                        round_updates += changed;
                    }
                }
            }
            report.route_updates += round_updates;
            trace!(
                round = report.rounds,
                advertisements = advertisements.len(),
                updates = round_updates,
                "relaxation round complete"
            );
        }

        if self.verify {
            if let Err(violation) = check_invariants(topology) {
                panic!("routing invariant violated after convergence: {violation}");
            }
        }
        debug!(
            rounds = report.rounds,
            advertisements = report.disseminations,
            updates = report.route_updates,
            "distance vectors converged"
        );
        report
    }

    fn link_removed(&mut self, topology: &mut Topology, a: NodeId, b: NodeId) -> usize {
        if topology.has_link(a, b) {
            warn!(%a, %b, "link_removed called for a link that is still attached");
            return 0;
        }

        // (owner, destination) pairs that lost their route
        let mut withdrawn: BTreeSet<(NodeId, NodeId)> = BTreeSet::new();
        let mut queue = VecDeque::new();

        for (owner, lost) in [(a, b), (b, a)] {
            let Some(node) = topology.node_mut(owner) else {
                continue;
            };
            for destination in node.routing_table().destinations_via(lost) {
                if node.withdraw(destination) {
                    withdrawn.insert((owner, destination));
                    queue.push_back((owner, destination));
                }
            }
        }

        // Anyone forwarding to a withdrawn owner for the same destination
        // loses that route too
        while let Some((upstream, destination)) = queue.pop_front() {
            let neighbors = topology
                .node(upstream)
                .map(|n| n.neighbor_ids())
                .unwrap_or_default();
            for neighbor in neighbors {
                if withdrawn.contains(&(neighbor, destination)) {
                    continue;
                }
                let Some(node) = topology.node_mut(neighbor) else {
                    continue;
                };
                if node.next_hop(destination) == Some(upstream) && node.withdraw(destination) {
                    withdrawn.insert((neighbor, destination));
                    queue.push_back((neighbor, destination));
                }
            }
        }

        // Owners re-advertise their losses; their neighbors re-advertise
        // whatever surviving routes they hold
        let owners: BTreeSet<NodeId> = withdrawn.iter().map(|(owner, _)| *owner).collect();
        for &owner in &owners {
            let neighbors = match topology.node_mut(owner) {
                Some(node) => {
                    node.mark_dirty();
                    node.neighbor_ids()
                }
                None => continue,
            };
            for neighbor in neighbors {
                if let Some(node) = topology.node_mut(neighbor) {
                    node.mark_dirty();
                }
            }
        }

        debug!(
            %a, %b,
            withdrawn = withdrawn.len(),
            affected_nodes = owners.len(),
            "routes withdrawn after link failure"
        );
        withdrawn.len()
    }

    fn link_added(&mut self, topology: &mut Topology, a: NodeId, b: NodeId) {
        let Some(delay) = topology.link_cost(a, b) else {
            warn!(%a, %b, "link_added called for a link that is not attached");
            return;
        };
        let direct = Cost::finite(delay);
        for (owner, peer) in [(a, b), (b, a)] {
            if let Some(node) = topology.node_mut(owner) {
                if direct < node.cost_to(peer) {
                    node.set_route(peer, RouteEntry::via(peer, direct));
                }
                node.mark_dirty();
                node.record(MessageKind::Topology, 1);
            }
        }
        debug!(%a, %b, delay, "link seeded into distance vectors");
    }
}
