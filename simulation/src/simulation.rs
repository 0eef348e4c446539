//! Simulation engine for SensorNet
//!
//! Implements discrete-time simulation with:
//! - Periodic hello exchange between neighbors
//! - Random link failures, with reattachment of isolated nodes
//! - Random link additions biased towards poorly connected nodes
//! - Random data transmissions over the converged routing tables
//!
//! All randomness flows from one seeded [`ChaCha8Rng`], so two networks
//! created with the same seed and driven with the same calls produce the
//! same events.

use std::collections::BTreeMap;

use rand::distr::{Distribution, weighted::WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use sensornet_core::{
    LinkAction, LinkChange, LinkGraph, LinkKey, MessageCounters, MessageKind, NodeId,
    ParameterError, SensorNetResult, TopologyChange, TrafficResult,
};
use sensornet_routing::{RoutingProtocol, Topology};

use crate::config::SimConfig;
use crate::history::{History, StepOrigin};
use crate::topology::TopologyBuilder;
use crate::traffic;
use crate::types::*;

/// Simulation statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub links_added: u64,
    pub links_removed: u64,
    pub reconnections: u64,
    pub partitions: u64,
    /// Network-wide counters at the time the statistics were taken
    pub message_counts: MessageCounters,
    /// Sum of end-to-end delays of delivered packets
    pub cumulative_delay: f64,
    /// Sum of hop counts of delivered packets
    pub total_hops: u64,
    pub reconvergence_iterations: u64,
    pub steps: u64,
}

impl Statistics {
    /// Data messages over all messages
    pub fn efficiency(&self) -> f64 {
        self.message_counts.efficiency()
    }

    pub fn success_rate(&self) -> f64 {
        ratio(self.successes as f64, self.requests)
    }

    /// Mean delay of delivered packets
    pub fn average_delay(&self) -> f64 {
        ratio(self.cumulative_delay, self.successes)
    }

    /// Mean hop count of delivered packets
    pub fn average_hops(&self) -> f64 {
        ratio(self.total_hops as f64, self.successes)
    }
}

fn ratio(value: f64, count: u64) -> f64 {
    if count == 0 { 0.0 } else { value / count as f64 }
}

/// A simulated wireless sensor network
#[derive(Debug)]
pub struct SensorNetwork {
    topology: Topology,
    protocol: Box<dyn RoutingProtocol>,
    rng: ChaCha8Rng,
    seed: u64,
    /// Incremented every time the network is regenerated
    epoch: u64,
    /// Zero-based index of the next step
    step_index: u64,
    node_count: usize,
    config: SimConfig,
    stats: Statistics,
    history: History,
}

impl SensorNetwork {
    /// Generate a random network with default ranges
    pub fn create(node_count: usize, area_size: f64, seed: Option<u64>) -> SensorNetResult<Self> {
        let config = SimConfig {
            area_size,
            ..Default::default()
        };
        Self::with_config(node_count, seed, config)
    }

    /// Generate a random network with the given configuration
    pub fn with_config(
        node_count: usize,
        seed: Option<u64>,
        config: SimConfig,
    ) -> SensorNetResult<Self> {
        config.validate()?;
        let seed = seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let topology = generate(node_count, &config, &mut rng)?;
        Ok(Self::assemble(topology, rng, seed, config))
    }

    /// Wrap an existing topology
    pub fn from_topology(
        topology: Topology,
        seed: Option<u64>,
        config: SimConfig,
    ) -> SensorNetResult<Self> {
        config.validate()?;
        if topology.node_count() < 2 {
            return Err(ParameterError::TooFewNodes {
                count: topology.node_count(),
            }
            .into());
        }
        let seed = seed.unwrap_or_else(|| rand::rng().random());
        let rng = ChaCha8Rng::seed_from_u64(seed);
        Ok(Self::assemble(topology, rng, seed, config))
    }

    fn assemble(topology: Topology, rng: ChaCha8Rng, seed: u64, config: SimConfig) -> Self {
        let mut network = Self {
            node_count: topology.node_count(),
            topology,
            protocol: config.protocol.build(),
            rng,
            seed,
            epoch: 0,
            step_index: 0,
            config,
            stats: Statistics::default(),
            history: History::new(),
        };
        network.setup();
        network
    }

    /// Converge the initial routing tables
    fn setup(&mut self) {
        let report = self.protocol.converge_full(&mut self.topology);
        if self.config.reset_counters_after_setup {
            self.topology.reset_counters();
        }
        info!(
            seed = self.seed,
            epoch = self.epoch,
            nodes = self.topology.node_count(),
            links = self.topology.link_count(),
            protocol = self.protocol.name(),
            %report,
            "network initialized"
        );
    }

    /// Run a single simulation step
    pub fn step(&mut self, params: &StepParams) -> SensorNetResult<StepEvents> {
        params.validate()?;
        let mut events = StepEvents::new(self.step_index);
        trace!("=== Step {} ===", self.step_index);

        // 1. Hello exchange
        if params.hello_due(self.step_index) {
            events.hello_messages = self.exchange_hellos();
        }

        // 2. Random link failure
        if self.rng.random::<f64>() < params.p_fail {
            self.fail_random_link(&mut events);
        }

        // 3. Random link addition
        self.add_random_link(params.p_new, &mut events);

        // 4. Random data transmission
        if self.rng.random::<f64>() < params.p_request {
            let (source, destination) = self.random_pair();
            events.traffic = Some(self.transmit(source, destination));
        }

        self.step_index += 1;
        self.stats.steps += 1;
        self.stats.reconvergence_iterations += events.reconvergence_iterations as u64;
        self.record(
            StepOrigin::Automatic,
            events.topology_changes.clone(),
            events.traffic.clone(),
            events.reconvergence_iterations,
        );
        Ok(events)
    }

    /// Run `steps` steps with the same parameters
    pub fn run(&mut self, steps: u64, params: &StepParams) -> SensorNetResult<Vec<StepEvents>> {
        params.validate()?;
        (0..steps).map(|_| self.step(params)).collect()
    }

    fn exchange_hellos(&mut self) -> u64 {
        let mut sent = 0;
        for node in self.topology.nodes_mut() {
            let degree = node.degree() as u64;
            node.record(MessageKind::Hello, degree);
            sent += degree;
        }
        trace!(messages = sent, "hello phase");
        sent
    }

    fn fail_random_link(&mut self, events: &mut StepEvents) {
        let links = self.topology.link_keys();
        if links.is_empty() {
            return;
        }
        let key = links[self.rng.random_range(0..links.len())];
        match self.remove_link(key.low, key.high) {
            Ok(update) => {
                events.topology_changes.extend(update.changes);
                events.reconvergence_iterations += update.reconvergence_iterations;
            }
            Err(e) => warn!(%key, error = %e, "failed to remove sampled link"),
        }
    }

    fn add_random_link(&mut self, p_new: f64, events: &mut StepEvents) {
        let candidates = self.topology.feasible_non_edges();
        let pairs = self.topology.feasible_pair_count();
        let p_effective = if pairs == 0 {
            0.0
        } else {
            p_new * candidates.len() as f64 / pairs as f64
        };
        if self.rng.random::<f64>() >= p_effective || candidates.is_empty() {
            return;
        }

        let Some(key) = self.pick_candidate(&candidates) else {
            return;
        };
        let delay = self.rng.random_range(0.0..1.0);
        match self.attach(key.low, key.high, delay) {
            Ok(update) => {
                events.topology_changes.extend(update.changes);
                events.reconvergence_iterations += update.reconvergence_iterations;
            }
            Err(e) => warn!(%key, error = %e, "failed to add sampled link"),
        }
    }

    /// Weighted draw favouring links that touch low-degree nodes
    fn pick_candidate(&mut self, candidates: &[LinkKey]) -> Option<LinkKey> {
        let bias = self.config.isolation_bias;
        let weights: Vec<f64> = candidates
            .iter()
            .map(|key| {
                let degree = self
                    .topology
                    .degree(key.low)
                    .min(self.topology.degree(key.high));
                match degree {
                    0 => 1.0 + 2.0 * bias,
                    1 => 1.0 + bias,
                    _ => 1.0,
                }
            })
            .collect();
        let index = WeightedIndex::new(&weights).ok()?;
        Some(candidates[index.sample(&mut self.rng)])
    }

    /// Distinct source and destination, uniform without retrying
    fn random_pair(&mut self) -> (NodeId, NodeId) {
        let ids = self.topology.node_ids();
        let source = self.rng.random_range(0..ids.len());
        let mut destination = self.rng.random_range(0..ids.len() - 1);
        if destination >= source {
            destination += 1;
        }
        (ids[source], ids[destination])
    }

    fn transmit(&mut self, source: NodeId, destination: NodeId) -> TrafficResult {
        let result = traffic::transmit(&mut self.topology, source, destination);
        self.stats.requests += 1;
        match (result.delay(), result.hops()) {
            (Some(delay), Some(hops)) => {
                self.stats.successes += 1;
                self.stats.cumulative_delay += delay;
                self.stats.total_hops += hops as u64;
            }
            _ => self.stats.failures += 1,
        }
        result
    }

    /// Remove a link, reattach isolated endpoints and report partitions
    fn remove_link(&mut self, a: NodeId, b: NodeId) -> SensorNetResult<TopologyUpdate> {
        let delay = self.topology.remove_link(a, b)?;
        let mut update = TopologyUpdate::default();
        update.changes.push(TopologyChange::LinkRemoved { a, b, delay });
        self.stats.links_removed += 1;
        debug!(%a, %b, delay, "link removed");
        update.reconvergence_iterations += self.reconverge(LinkChange::Removed { a, b });

        if self.config.reconnect_isolated {
            for (node, lost) in [(a, b), (b, a)] {
                if self.topology.degree(node) > 0 {
                    continue;
                }
                let Some(peer) = self.topology.nearest_feasible_peer(node, &[lost]) else {
                    continue;
                };
                let delay = self.rng.random_range(0.0..1.0);
                self.topology.add_feasible_link(node, peer, delay)?;
                update
                    .changes
                    .push(TopologyChange::Reconnected { node, peer, delay });
                self.stats.reconnections += 1;
                debug!(%node, %peer, delay, "isolated node reconnected");
                update.reconvergence_iterations +=
                    self.reconverge(LinkChange::Added { a: node, b: peer });
            }
        }

        let side_a = self.topology.reachable_from(a);
        if !side_a.contains(&b) {
            let side_b = self.topology.reachable_from(b);
            let cut_off = if side_a.len() < side_b.len() { side_a } else { side_b };
            let nodes: Vec<NodeId> = cut_off.into_iter().collect();
            warn!(%a, %b, size = nodes.len(), "network partitioned");
            update
                .changes
                .push(TopologyChange::DisconnectedPartition { nodes });
            self.stats.partitions += 1;
        }
        Ok(update)
    }

    fn attach(&mut self, a: NodeId, b: NodeId, delay: f64) -> SensorNetResult<TopologyUpdate> {
        self.topology.add_feasible_link(a, b, delay)?;
        self.stats.links_added += 1;
        debug!(%a, %b, delay, "link added");
        Ok(TopologyUpdate {
            changes: vec![TopologyChange::LinkAdded { a, b, delay }],
            reconvergence_iterations: self.reconverge(LinkChange::Added { a, b }),
        })
    }

    fn reconverge(&mut self, change: LinkChange) -> usize {
        let report = match self.config.reconvergence {
            ReconvergenceMode::Incremental => self.protocol.reconverge(&mut self.topology, change),
            ReconvergenceMode::Full => self.protocol.converge_full(&mut self.topology),
        };
        debug!(?change, %report, "routes reconverged");
        report.rounds
    }

    /// Apply a caller-requested link edit
    ///
    /// Invalid edits return `InfeasibleLink` and change nothing.
    pub fn modify_topology(&mut self, action: LinkAction) -> SensorNetResult<TopologyUpdate> {
        let update = match action {
            LinkAction::Add { a, b, delay } => {
                let delay = match delay {
                    Some(delay) => {
                        self.topology.check_feasible_link(a, b, delay)?;
                        delay
                    }
                    None => {
                        self.topology.check_feasible_link(a, b, 0.0)?;
                        self.rng.random_range(0.0..1.0)
                    }
                };
                self.attach(a, b, delay)?
            }
            LinkAction::Remove { a, b } => self.remove_link(a, b)?,
        };
        self.stats.reconvergence_iterations += update.reconvergence_iterations as u64;
        self.record(
            StepOrigin::Manual,
            update.changes.clone(),
            None,
            update.reconvergence_iterations,
        );
        Ok(update)
    }

    /// Send one data packet between two nodes
    pub fn send(&mut self, source: NodeId, destination: NodeId) -> SensorNetResult<TrafficResult> {
        self.require_node(source)?;
        self.require_node(destination)?;
        if source == destination {
            return Err(ParameterError::SelfTransmission(source).into());
        }
        let result = self.transmit(source, destination);
        self.record(StepOrigin::Manual, Vec::new(), Some(result.clone()), 0);
        Ok(result)
    }

    fn require_node(&self, id: NodeId) -> SensorNetResult<()> {
        if self.topology.contains(id) {
            Ok(())
        } else {
            Err(ParameterError::UnknownNode(id).into())
        }
    }

    fn record(
        &mut self,
        origin: StepOrigin,
        changes: Vec<TopologyChange>,
        traffic: Option<TrafficResult>,
        reconvergence_iterations: usize,
    ) {
        if self.config.record_history {
            let counters = self.topology.total_counters();
            self.history
                .push(origin, changes, traffic, counters, reconvergence_iterations);
        }
    }

    /// Routing state of the given nodes; an empty list means every node
    pub fn routing_info(&self, ids: &[NodeId]) -> SensorNetResult<BTreeMap<NodeId, RoutingInfo>> {
        let ids = if ids.is_empty() {
            self.topology.node_ids()
        } else {
            ids.to_vec()
        };
        let mut info = BTreeMap::new();
        for id in ids {
            let node = self
                .topology
                .node(id)
                .ok_or(ParameterError::UnknownNode(id))?;
            info.insert(id, RoutingInfo::from(node));
        }
        Ok(info)
    }

    pub fn node_snapshot(&self, id: NodeId) -> SensorNetResult<NodeSnapshot> {
        let node = self
            .topology
            .node(id)
            .ok_or(ParameterError::UnknownNode(id))?;
        Ok(NodeSnapshot::from(node))
    }

    /// Full view of nodes and links
    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            epoch: self.epoch,
            step: self.step_index,
            nodes: self.topology.nodes().map(NodeSnapshot::from).collect(),
            links: self.topology.links().map(LinkSnapshot::from).collect(),
        }
    }

    /// Statistics since creation or the last reset
    pub fn statistics(&self) -> Statistics {
        Statistics {
            message_counts: self.topology.total_counters(),
            ..self.stats.clone()
        }
    }

    /// Zero message counters and statistics
    pub fn reset_counters(&mut self) {
        self.topology.reset_counters();
        self.stats = Statistics::default();
        debug!("counters reset");
    }

    /// Replace the network with a freshly generated one
    ///
    /// Starts a new epoch. The random stream continues, so the new layout
    /// differs from the previous one.
    pub fn regenerate(&mut self) -> SensorNetResult<()> {
        let topology = generate(self.node_count, &self.config, &mut self.rng)?;
        self.topology = topology;
        self.protocol = self.config.protocol.build();
        self.epoch += 1;
        self.step_index = 0;
        self.stats = Statistics::default();
        self.history.clear();
        self.setup();
        Ok(())
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Mutable access for cursor navigation
    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// Seed of the random stream, drawn at creation when none was given
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Zero-based index of the next step
    pub fn step_index(&self) -> u64 {
        self.step_index
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.topology.node_ids()
    }

    /// Get a summary of the current state
    pub fn state_summary(&self) -> String {
        let stats = self.statistics();
        format!(
            "Step {}: {} nodes, {} links, {}/{} delivered, efficiency {:.4}",
            self.step_index,
            self.topology.node_count(),
            self.topology.link_count(),
            stats.successes,
            stats.requests,
            stats.efficiency()
        )
    }
}

fn generate(
    node_count: usize,
    config: &SimConfig,
    rng: &mut ChaCha8Rng,
) -> SensorNetResult<Topology> {
    TopologyBuilder::new(node_count)
        .area_size(config.area_size)
        .ranges(config.min_range, config.max_range)
        .random_geometric(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::from_layout;
    use sensornet_core::{LinkError, SensorNetError};

    /// 0 - 1 - 2 - 3 with unit spacing, every link delay 0.5
    fn line_network(config: SimConfig) -> SensorNetwork {
        let topo = TopologyBuilder::new(4).line(1.0, 0.5).unwrap();
        SensorNetwork::from_topology(topo, Some(7), config).unwrap()
    }

    #[test]
    fn test_create_rejects_bad_parameters() {
        assert!(matches!(
            SensorNetwork::create(1, 10.0, Some(1)),
            Err(SensorNetError::InvalidParameter(ParameterError::TooFewNodes { count: 1 }))
        ));
        assert!(matches!(
            SensorNetwork::create(5, -1.0, Some(1)),
            Err(SensorNetError::InvalidParameter(ParameterError::NonPositive { .. }))
        ));
    }

    #[test]
    fn test_drawn_seed_is_reported() {
        let network = SensorNetwork::create(6, 10.0, None).unwrap();
        let replay = SensorNetwork::create(6, 10.0, Some(network.seed())).unwrap();
        assert_eq!(network.snapshot(), replay.snapshot());
    }

    #[test]
    fn test_hello_counts_degree() {
        let mut network = line_network(SimConfig {
            reset_counters_after_setup: true,
            ..Default::default()
        });
        let events = network.step(&StepParams::quiet()).unwrap();
        // degrees 1 + 2 + 2 + 1
        assert_eq!(events.hello_messages, 6);
        assert_eq!(network.statistics().message_counts.hello, 6);
    }

    #[test]
    fn test_send_validation() {
        let mut network = line_network(SimConfig::default());
        assert!(matches!(
            network.send(NodeId(1), NodeId(1)),
            Err(SensorNetError::InvalidParameter(ParameterError::SelfTransmission(_)))
        ));
        assert!(matches!(
            network.send(NodeId(0), NodeId(9)),
            Err(SensorNetError::InvalidParameter(ParameterError::UnknownNode(_)))
        ));
        assert_eq!(network.statistics().requests, 0);

        let result = network.send(NodeId(0), NodeId(3)).unwrap();
        assert_eq!(result.hops(), Some(3));
        let stats = network.statistics();
        assert_eq!(stats.successes, 1);
        assert!((stats.average_delay() - 1.5).abs() < 1e-9);
        assert_eq!(stats.average_hops(), 3.0);
    }

    #[test]
    fn test_out_of_range_add_is_rejected() {
        let mut network = line_network(SimConfig::default());
        let before = network.snapshot();
        let err = network
            .modify_topology(LinkAction::Add {
                a: NodeId(0),
                b: NodeId(3),
                delay: None,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            SensorNetError::InfeasibleLink(LinkError::OutOfRange { .. })
        ));
        assert_eq!(network.snapshot(), before);
    }

    #[test]
    fn test_removing_pendant_link_reconnects_when_possible() {
        // 2 reaches both 0 and 1; only 0-1 and 1-2 are linked
        let nodes = [(0.0, 0.0, 2.0), (1.0, 0.0, 2.0), (0.5, 0.5, 2.0)];
        let topo = from_layout(&nodes, &[(0, 1, 0.2), (1, 2, 0.3)]).unwrap();
        let mut network =
            SensorNetwork::from_topology(topo, Some(3), SimConfig::default()).unwrap();

        let update = network
            .modify_topology(LinkAction::Remove {
                a: NodeId(1),
                b: NodeId(2),
            })
            .unwrap();
        assert!(matches!(
            update.changes[1],
            TopologyChange::Reconnected {
                node: NodeId(2),
                peer: NodeId(0),
                ..
            }
        ));
        assert_eq!(update.changes.len(), 2);
        assert!(network.topology().is_connected());
        assert_eq!(network.statistics().reconnections, 1);
    }

    #[test]
    fn test_partition_reported_with_smaller_side() {
        let mut network = line_network(SimConfig::default());
        let update = network
            .modify_topology(LinkAction::Remove {
                a: NodeId(2),
                b: NodeId(3),
            })
            .unwrap();
        assert_eq!(
            update.changes.last(),
            Some(&TopologyChange::DisconnectedPartition {
                nodes: vec![NodeId(3)]
            })
        );
        assert_eq!(network.statistics().partitions, 1);
    }

    #[test]
    fn test_regenerate_starts_new_epoch() {
        let mut network = SensorNetwork::create(8, 10.0, Some(11)).unwrap();
        network.run(5, &StepParams::default()).unwrap();
        network.regenerate().unwrap();
        assert_eq!(network.epoch(), 1);
        assert_eq!(network.step_index(), 0);
        assert!(network.history().is_empty());
        assert_eq!(network.statistics().steps, 0);
        assert_eq!(network.topology().node_count(), 8);
    }
}
