//! Integration scenarios exercising the full SensorNet stack
//!
//! These scenarios drive the simulator through its public interface and
//! check the results against:
//! - sensornet-core types (counters, events, traffic outcomes)
//! - sensornet-routing (engine state, invariant checker, Dijkstra reference)

use sensornet_core::{
    Cost, FailureReason, LinkAction, LinkError, MessageCounters, NodeId, ParameterError,
    SensorNetError, TopologyChange, TrafficOutcome,
};
use sensornet_routing::{check_invariants, route_mismatches};

use crate::config::SimConfig;
use crate::history::StepOrigin;
use crate::simulation::SensorNetwork;
use crate::topology::{TopologyBuilder, from_layout};
use crate::types::{ReconvergenceMode, StepParams};

const EPSILON: f64 = 1e-9;

fn busy() -> StepParams {
    StepParams {
        p_request: 0.8,
        p_fail: 0.4,
        p_new: 0.4,
        hello_interval: 1,
    }
}

fn assert_optimal(network: &SensorNetwork) {
    let mismatches = route_mismatches(network.topology(), EPSILON);
    assert!(mismatches.is_empty(), "non-optimal routes: {mismatches:?}");
    check_invariants(network.topology()).unwrap();
}

/// Routes stay shortest after every step of a busy run
#[test]
fn test_routes_optimal_after_every_step() {
    for seed in 0..8 {
        let mut network = SensorNetwork::create(15, 10.0, Some(seed)).unwrap();
        assert_optimal(&network);
        for _ in 0..40 {
            network.step(&busy()).unwrap();
            assert_optimal(&network);
        }
    }
}

/// Equal seeds produce identical event sequences
#[test]
fn test_same_seed_same_events() {
    let run = |seed| {
        let mut network = SensorNetwork::create(12, 10.0, Some(seed)).unwrap();
        network.run(60, &busy()).unwrap()
    };
    assert_eq!(run(17), run(17));
    assert_ne!(run(17), run(18));
}

/// Hellos fire on steps 0, k, 2k, ... and never with interval 0
#[test]
fn test_hello_gating() {
    for (interval, expected_rounds) in [(0u64, 0u64), (1, 12), (4, 3)] {
        let mut network = SensorNetwork::with_config(
            10,
            Some(3),
            SimConfig {
                reset_counters_after_setup: true,
                ..Default::default()
            },
        )
        .unwrap();
        let degree_sum: u64 = network
            .topology()
            .nodes()
            .map(|n| n.degree() as u64)
            .sum();
        let params = StepParams {
            hello_interval: interval,
            ..StepParams::quiet()
        };
        let events = network.run(12, &params).unwrap();
        let rounds = events.iter().filter(|e| e.hello_messages > 0).count() as u64;
        assert_eq!(rounds, expected_rounds, "interval {interval}");
        assert_eq!(
            network.statistics().message_counts.hello,
            degree_sum * expected_rounds
        );
    }
}

/// Per-node counters add up to the reported totals
#[test]
fn test_counter_conservation() {
    let mut network = SensorNetwork::with_config(
        14,
        Some(21),
        SimConfig {
            reset_counters_after_setup: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(network.statistics().message_counts, MessageCounters::default());

    let events = network.run(50, &busy()).unwrap();
    let stats = network.statistics();

    let per_node: MessageCounters = network
        .topology()
        .nodes()
        .map(|n| *n.counters())
        .sum();
    assert_eq!(per_node, stats.message_counts);

    let hellos: u64 = events.iter().map(|e| e.hello_messages).sum();
    assert_eq!(stats.message_counts.hello, hellos);

    let delivered = events
        .iter()
        .filter(|e| e.traffic.as_ref().is_some_and(|t| t.is_delivered()))
        .count() as u64;
    assert_eq!(stats.message_counts.data, delivered);
    assert_eq!(stats.successes, delivered);
    assert_eq!(stats.requests, stats.successes + stats.failures);

    let rounds: usize = events.iter().map(|e| e.reconvergence_iterations).sum();
    assert_eq!(stats.reconvergence_iterations, rounds as u64);
}

/// Rejected parameters leave the network untouched
#[test]
fn test_invalid_parameters_change_nothing() {
    let mut network = SensorNetwork::create(10, 10.0, Some(9)).unwrap();
    let snapshot = network.snapshot();
    let stats = network.statistics();

    let bad = StepParams {
        p_request: 1.5,
        ..Default::default()
    };
    assert!(matches!(
        network.step(&bad),
        Err(SensorNetError::InvalidParameter(
            ParameterError::ProbabilityOutOfRange { name: "p_request", .. }
        ))
    ));
    assert_eq!(network.snapshot(), snapshot);
    assert_eq!(network.statistics(), stats);
    assert_eq!(network.step_index(), 0);

    // The random stream was not consumed either
    let mut twin = SensorNetwork::create(10, 10.0, Some(9)).unwrap();
    assert_eq!(
        network.step(&busy()).unwrap(),
        twin.step(&busy()).unwrap()
    );
}

/// Infeasible manual edits are rejected without side effects
#[test]
fn test_infeasible_edits_rejected() {
    let topology = TopologyBuilder::new(4).line(1.0, 0.5).unwrap();
    let mut network =
        SensorNetwork::from_topology(topology, Some(1), SimConfig::default()).unwrap();
    let links = network.topology().link_count();
    let history = network.history().len();

    let attempts = [
        (
            LinkAction::Add { a: NodeId(0), b: NodeId(2), delay: Some(0.1) },
            "out of range",
        ),
        (
            LinkAction::Add { a: NodeId(0), b: NodeId(1), delay: None },
            "duplicate",
        ),
        (
            LinkAction::Add { a: NodeId(2), b: NodeId(2), delay: None },
            "self loop",
        ),
        (
            LinkAction::Remove { a: NodeId(0), b: NodeId(3) },
            "missing",
        ),
        (
            LinkAction::Remove { a: NodeId(0), b: NodeId(7) },
            "unknown node",
        ),
    ];
    for (action, label) in attempts {
        assert!(
            matches!(network.modify_topology(action), Err(SensorNetError::InfeasibleLink(_))),
            "{label}"
        );
        assert_eq!(network.topology().link_count(), links, "{label}");
    }
    assert_eq!(network.history().len(), history);

    let negative = network.modify_topology(LinkAction::Add {
        a: NodeId(0),
        b: NodeId(1),
        delay: Some(-1.0),
    });
    assert!(matches!(
        negative,
        Err(SensorNetError::InfeasibleLink(LinkError::InvalidDelay(_)))
    ));
}

/// Manual additions need a delay in [0, 1)
#[test]
fn test_manual_delay_must_be_below_one() {
    let topology = TopologyBuilder::new(4).line(1.0, 0.5).unwrap();
    let mut network =
        SensorNetwork::from_topology(topology, Some(4), SimConfig::default()).unwrap();
    network
        .modify_topology(LinkAction::Remove { a: NodeId(1), b: NodeId(2) })
        .unwrap();
    let snapshot = network.snapshot();
    let stats = network.statistics();
    let history = network.history().len();

    for delay in [5.0, 1.0] {
        let result = network.modify_topology(LinkAction::Add {
            a: NodeId(1),
            b: NodeId(2),
            delay: Some(delay),
        });
        assert_eq!(
            result,
            Err(SensorNetError::InfeasibleLink(LinkError::InvalidDelay(delay)))
        );
    }
    assert!(!network.topology().has_link(NodeId(1), NodeId(2)));
    assert_eq!(network.snapshot(), snapshot);
    assert_eq!(network.statistics(), stats);
    assert_eq!(network.history().len(), history);

    network
        .modify_topology(LinkAction::Add { a: NodeId(1), b: NodeId(2), delay: Some(0.75) })
        .unwrap();
    assert!(network.topology().links().all(|(_, delay)| (0.0..1.0).contains(&delay)));
    assert_optimal(&network);
}

/// Removing the middle link of a line partitions it; re-adding restores it
#[test]
fn test_line_partition_and_repair() {
    let nodes = [
        (0.0, 0.0, 1.0),
        (1.0, 0.0, 1.0),
        (2.0, 0.0, 1.0),
        (3.0, 0.0, 1.0),
    ];
    let topology = from_layout(&nodes, &[(0, 1, 0.2), (1, 2, 0.5), (2, 3, 0.3)]).unwrap();
    let mut network =
        SensorNetwork::from_topology(topology, Some(0), SimConfig::default()).unwrap();
    let before = network.routing_info(&[]).unwrap();

    let update = network
        .modify_topology(LinkAction::Remove { a: NodeId(1), b: NodeId(2) })
        .unwrap();
    assert_eq!(
        update.changes,
        vec![
            TopologyChange::LinkRemoved { a: NodeId(1), b: NodeId(2), delay: 0.5 },
            TopologyChange::DisconnectedPartition { nodes: vec![NodeId(2), NodeId(3)] },
        ]
    );
    for (src, dst) in [(0, 2), (0, 3), (1, 2), (1, 3), (2, 0), (3, 1)] {
        let info = network.node_snapshot(NodeId(src)).unwrap();
        assert!(!info.neighbors.contains(&NodeId(dst)));
        let routes = network.routing_info(&[NodeId(src)]).unwrap();
        assert_eq!(routes[&NodeId(src)].distance_vector[&NodeId(dst)], Cost::Infinite);
    }
    let result = network.send(NodeId(0), NodeId(3)).unwrap();
    assert!(matches!(
        result.outcome,
        TrafficOutcome::Failed { reason: FailureReason::NoRoute, .. }
    ));

    network
        .modify_topology(LinkAction::Add { a: NodeId(1), b: NodeId(2), delay: Some(0.5) })
        .unwrap();
    let after = network.routing_info(&[]).unwrap();
    for (id, info) in &before {
        for (dst, cost) in &info.distance_vector {
            assert!(cost.approx_eq(&after[id].distance_vector[dst], EPSILON));
        }
    }
    assert_optimal(&network);
    let delivered = network.send(NodeId(0), NodeId(3)).unwrap();
    assert!((delivered.delay().unwrap() - 1.0).abs() < EPSILON);
}

/// Full and incremental reconvergence agree on every cost
#[test]
fn test_full_and_incremental_agree() {
    let config = |mode| SimConfig {
        reconvergence: mode,
        ..Default::default()
    };
    let mut incremental =
        SensorNetwork::with_config(12, Some(5), config(ReconvergenceMode::Incremental)).unwrap();
    let mut full =
        SensorNetwork::with_config(12, Some(5), config(ReconvergenceMode::Full)).unwrap();

    for _ in 0..30 {
        let a = incremental.step(&busy()).unwrap();
        let b = full.step(&busy()).unwrap();
        assert_eq!(a.topology_changes, b.topology_changes);

        let left = incremental.routing_info(&[]).unwrap();
        let right = full.routing_info(&[]).unwrap();
        for (id, info) in &left {
            for (dst, cost) in &info.distance_vector {
                assert!(cost.approx_eq(&right[id].distance_vector[dst], EPSILON));
            }
        }
    }
    assert_eq!(
        incremental.statistics().message_counts.data,
        full.statistics().message_counts.data
    );
}

/// Steps and manual edits land in the history in order
#[test]
fn test_history_records_steps_and_edits() {
    let topology = TopologyBuilder::new(4).line(1.0, 0.5).unwrap();
    let mut network =
        SensorNetwork::from_topology(topology, Some(2), SimConfig::default()).unwrap();

    network.step(&StepParams::quiet()).unwrap();
    network
        .modify_topology(LinkAction::Remove { a: NodeId(0), b: NodeId(1) })
        .unwrap();
    network.send(NodeId(2), NodeId(3)).unwrap();

    let history = network.history();
    assert_eq!(history.len(), 3);
    let origins: Vec<StepOrigin> = history.records().iter().map(|r| r.origin).collect();
    assert_eq!(
        origins,
        vec![StepOrigin::Automatic, StepOrigin::Manual, StepOrigin::Manual]
    );
    assert!(history.get(2).unwrap().traffic.as_ref().unwrap().is_delivered());
    // degrees 1 + 2 + 2 + 1
    assert_eq!(history.get(0).unwrap().counters.hello, 6);

    let unrecorded = SimConfig {
        record_history: false,
        ..Default::default()
    };
    let mut quiet = SensorNetwork::create(6, 10.0, Some(2)).unwrap();
    quiet.step(&busy()).unwrap();
    assert_eq!(quiet.history().len(), 1);
    let mut silent = SensorNetwork::with_config(6, Some(2), unrecorded).unwrap();
    silent.step(&busy()).unwrap();
    assert!(silent.history().is_empty());
}

/// Nodes that lose their last link are reattached when something is in range
#[test]
fn test_isolated_nodes_are_reconnected() {
    // 3 only links to 2 but can also reach 1
    let nodes = [
        (0.0, 0.0, 1.5),
        (1.0, 0.0, 1.5),
        (2.0, 0.0, 1.5),
        (1.5, 1.0, 1.5),
    ];
    let topology = from_layout(&nodes, &[(0, 1, 0.1), (1, 2, 0.1), (2, 3, 0.1)]).unwrap();
    let mut network =
        SensorNetwork::from_topology(topology, Some(8), SimConfig::default()).unwrap();

    let update = network
        .modify_topology(LinkAction::Remove { a: NodeId(2), b: NodeId(3) })
        .unwrap();
    assert!(update.changes.iter().any(|c| matches!(
        c,
        TopologyChange::Reconnected { node: NodeId(3), peer: NodeId(1), .. }
    )));
    assert!(network.topology().is_connected());
    assert_optimal(&network);

    let no_reconnect = SimConfig {
        reconnect_isolated: false,
        ..Default::default()
    };
    let topology = from_layout(&nodes, &[(0, 1, 0.1), (1, 2, 0.1), (2, 3, 0.1)]).unwrap();
    let mut network = SensorNetwork::from_topology(topology, Some(8), no_reconnect).unwrap();
    let update = network
        .modify_topology(LinkAction::Remove { a: NodeId(2), b: NodeId(3) })
        .unwrap();
    assert_eq!(
        update.changes.last(),
        Some(&TopologyChange::DisconnectedPartition { nodes: vec![NodeId(3)] })
    );
}
