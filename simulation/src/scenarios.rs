//! Pre-defined simulation scenarios for SensorNet
//!
//! Includes the dynamic random-network run used by the CLI and the
//! four-node line partition example.

use std::fmt::Write as _;

use tracing::info;

use sensornet_core::{LinkAction, NodeId, SensorNetResult};

use crate::config::SimConfig;
use crate::simulation::{SensorNetwork, Statistics};
use crate::topology::from_layout;
use crate::types::StepParams;

/// Scenario: random network driven through `steps` dynamic steps
pub fn run_dynamic_scenario(
    node_count: usize,
    steps: u64,
    seed: Option<u64>,
    params: &StepParams,
    config: SimConfig,
) -> SensorNetResult<SensorNetwork> {
    params.validate()?;
    let mut network = SensorNetwork::with_config(node_count, seed, config)?;
    info!(
        seed = network.seed(),
        nodes = node_count,
        steps,
        p_request = params.p_request,
        p_fail = params.p_fail,
        p_new = params.p_new,
        hello_interval = params.hello_interval,
        "=== Running Dynamic Scenario ==="
    );

    for _ in 0..steps {
        let events = network.step(params)?;
        for change in &events.topology_changes {
            info!(step = events.step, %change, "topology changed");
        }
        if let Some(traffic) = &events.traffic {
            info!(step = events.step, %traffic, "traffic");
        }
    }

    info!(summary = %network.state_summary(), "dynamic scenario complete");
    Ok(network)
}

/// Scenario: partition and repair of a four-node line
///
/// ```text
/// 0 --0.2-- 1 --0.5-- 2 --0.3-- 3
/// ```
///
/// Link 1-2 fails, leaving {0, 1} and {2, 3} unable to reach each other.
/// Re-adding it restores the original shortest paths.
pub fn run_partition_scenario() -> SensorNetResult<SensorNetwork> {
    info!("=== Running Partition Scenario ===");

    let nodes = [
        (0.0, 0.0, 1.0),
        (1.0, 0.0, 1.0),
        (2.0, 0.0, 1.0),
        (3.0, 0.0, 1.0),
    ];
    let topology = from_layout(&nodes, &[(0, 1, 0.2), (1, 2, 0.5), (2, 3, 0.3)])?;
    let mut network = SensorNetwork::from_topology(topology, Some(0), SimConfig::default())?;

    println!("{}", network.topology().visualize());
    println!("{}", routing_table_report(&network)?);

    println!("--- 0 sends to 3 (full connectivity) ---");
    println!("  {}", network.send(NodeId(0), NodeId(3))?);

    println!("\n--- Link 1-2 fails ---");
    let update = network.modify_topology(LinkAction::Remove {
        a: NodeId(1),
        b: NodeId(2),
    })?;
    for change in &update.changes {
        println!("  {change}");
    }
    println!("{}", routing_table_report(&network)?);

    println!("--- 0 tries to send to 3 (partitioned) ---");
    println!("  {}", network.send(NodeId(0), NodeId(3))?);

    println!("\n--- Link 1-2 restored ---");
    let update = network.modify_topology(LinkAction::Add {
        a: NodeId(1),
        b: NodeId(2),
        delay: Some(0.5),
    })?;
    for change in &update.changes {
        println!("  {change}");
    }
    println!("{}", routing_table_report(&network)?);

    println!("--- 0 sends to 3 again ---");
    println!("  {}", network.send(NodeId(0), NodeId(3))?);

    println!("\n=== Final Statistics ===");
    println!("{}", statistics_report(&network.statistics()));

    Ok(network)
}

/// Routing table of every node, one destination per line
pub fn routing_table_report(network: &SensorNetwork) -> SensorNetResult<String> {
    let mut out = String::new();
    for (id, info) in network.routing_info(&[])? {
        let _ = writeln!(out, "Node {id}:");
        for (destination, entry) in &info.routing_table {
            let next_hop = entry
                .next_hop
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(out, "  -> {destination:>3} via {next_hop:>3} cost {}", entry.cost);
        }
    }
    Ok(out)
}

/// Multi-line summary of run statistics
pub fn statistics_report(stats: &Statistics) -> String {
    let counts = &stats.message_counts;
    let mut out = String::new();
    let _ = writeln!(out, "  Steps: {}", stats.steps);
    let _ = writeln!(
        out,
        "  Requests: {} ({} delivered, {} failed, success rate {:.1}%)",
        stats.requests,
        stats.successes,
        stats.failures,
        stats.success_rate() * 100.0
    );
    let _ = writeln!(
        out,
        "  Links: {} added, {} removed, {} reconnections, {} partitions",
        stats.links_added, stats.links_removed, stats.reconnections, stats.partitions
    );
    let _ = writeln!(
        out,
        "  Messages: hello {}, topology {}, route-discovery {}, data {}",
        counts.hello, counts.topology, counts.route_discovery, counts.data
    );
    let _ = writeln!(
        out,
        "  Average delay {:.4}, average hops {:.2}, reconvergence rounds {}",
        stats.average_delay(),
        stats.average_hops(),
        stats.reconvergence_iterations
    );
    let _ = write!(out, "  Efficiency: {:.4}", stats.efficiency());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensornet_core::TopologyChange;

    #[test]
    fn test_partition_scenario_restores_delivery() {
        let network = run_partition_scenario().unwrap();
        let stats = network.statistics();
        assert_eq!(stats.requests, 3);
        assert_eq!(stats.successes, 2);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.partitions, 1);
        assert!(network.history().records().iter().any(|r| r
            .topology_changes
            .iter()
            .any(|c| matches!(c, TopologyChange::DisconnectedPartition { .. }))));
    }

    #[test]
    fn test_dynamic_scenario_runs_all_steps() {
        let network =
            run_dynamic_scenario(12, 30, Some(5), &StepParams::default(), SimConfig::default())
                .unwrap();
        assert_eq!(network.statistics().steps, 30);
        assert_eq!(network.step_index(), 30);
    }

    #[test]
    fn test_statistics_report_lists_counters() {
        let report = statistics_report(&Statistics::default());
        assert!(report.contains("route-discovery 0"));
        assert!(report.contains("Efficiency: 0.0000"));
    }
}
