//! SensorNet - Wireless Sensor Network Simulation
//!
//! Distance-vector routing over a dynamic wireless topology: random link
//! failures and additions, periodic hellos and random data traffic.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use sensornet_logging::{FileConfig, LogConfig, SensorNetSubscriberBuilder};
use sensornet_simulation::{
    EvaluationConfig, LinkAction, NodeId, ProbabilitySpec, ReconvergenceMode, SensorNetwork,
    SensorNetResult, SimConfig, StepRecord, TopologyUpdate, scenarios,
};

#[derive(Parser)]
#[command(
    name = "sensornet",
    about = "Wireless sensor network simulation with distance-vector routing",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Also write JSONL logs to daily files in this directory
    #[arg(long, global = true, value_name = "PATH")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a dynamic scenario on a random network
    Run {
        /// Number of nodes
        #[arg(short, long, default_value = "20")]
        nodes: usize,

        /// Number of steps to simulate
        #[arg(short, long, default_value = "100")]
        steps: u64,

        /// Random seed (drawn and reported when omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Side length of the deployment area
        #[arg(long)]
        area: Option<f64>,

        /// Probability of a data request per step
        #[arg(long)]
        p_request: Option<f64>,

        /// Probability of a link failure per step
        #[arg(long)]
        p_fail: Option<f64>,

        /// Base probability of a new link per step
        #[arg(long)]
        p_new: Option<f64>,

        /// Send hellos every N steps (0 disables them)
        #[arg(long)]
        hello_interval: Option<u64>,

        /// JSON configuration file; flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Rebuild all routing tables after every topology change
        #[arg(long)]
        full_reconvergence: bool,

        /// Zero the counters once initial convergence finishes
        #[arg(long)]
        reset_after_setup: bool,

        /// Print final statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate protocol efficiency over random topologies
    Evaluate {
        /// Number of random topologies
        #[arg(short, long, default_value = "1")]
        topologies: usize,

        /// Iterations per topology
        #[arg(short, long, default_value = "100")]
        iterations: usize,

        /// Upper bound for randomized p_fail and p_new
        #[arg(long, default_value = "0.3")]
        max_probability: f64,

        /// Number of nodes per topology
        #[arg(short, long, default_value = "20")]
        nodes: usize,

        /// Side length of the deployment area
        #[arg(long, default_value = "10.0")]
        area: f64,

        /// Probability of a data request per step
        #[arg(long, default_value = "0.5")]
        p_request: f64,

        /// Fixed failure probability (randomized when omitted)
        #[arg(long)]
        p_fail: Option<f64>,

        /// Fixed addition probability (randomized when omitted)
        #[arg(long)]
        p_new: Option<f64>,

        /// Steps per iteration
        #[arg(long, default_value = "5")]
        time_steps: u64,

        /// Base random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the four-node line partition scenario
    Partition,

    /// Generate a network and print its links and routing tables
    Topology {
        /// Number of nodes
        #[arg(short, long, default_value = "10")]
        nodes: usize,

        /// Side length of the deployment area
        #[arg(long, default_value = "10.0")]
        area: f64,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Also print every routing table
        #[arg(long)]
        routes: bool,
    },

    /// Interactive simulation mode
    Interactive {
        /// Number of nodes
        #[arg(short, long, default_value = "10")]
        nodes: usize,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let log_config = match cli.log_format {
        LogFormat::Pretty => LogConfig::interactive(level),
        LogFormat::Json => LogConfig {
            default_level: level.to_string(),
            ..Default::default()
        },
    };
    let mut builder = SensorNetSubscriberBuilder::new().with_config(log_config);
    if let Some(directory) = cli.log_dir {
        builder = builder.with_file_output(FileConfig {
            directory,
            ..Default::default()
        });
    }
    let _guard = builder.init();

    match cli.command {
        Commands::Run {
            nodes,
            steps,
            seed,
            area,
            p_request,
            p_fail,
            p_new,
            hello_interval,
            config,
            full_reconvergence,
            reset_after_setup,
            json,
        } => {
            let mut config = load_config(config)?;
            if let Some(area) = area {
                config.area_size = area;
            }
            if full_reconvergence {
                config.reconvergence = ReconvergenceMode::Full;
            }
            if reset_after_setup {
                config.reset_counters_after_setup = true;
            }
            let mut params = config.step_params;
            params.p_request = p_request.unwrap_or(params.p_request);
            params.p_fail = p_fail.unwrap_or(params.p_fail);
            params.p_new = p_new.unwrap_or(params.p_new);
            params.hello_interval = hello_interval.unwrap_or(params.hello_interval);

            let network = scenarios::run_dynamic_scenario(nodes, steps, seed, &params, config)?;
            let stats = network.statistics();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("\n=== Final Statistics (seed {}) ===", network.seed());
                println!("{}", scenarios::statistics_report(&stats));
            }
        }
        Commands::Evaluate {
            topologies,
            iterations,
            max_probability,
            nodes,
            area,
            p_request,
            p_fail,
            p_new,
            time_steps,
            seed,
            json,
        } => {
            let config = EvaluationConfig {
                topologies,
                iterations_per_topology: iterations,
                max_probability,
                node_count: nodes,
                area_size: area,
                p_request,
                p_fail: p_fail.map_or(ProbabilitySpec::Random, ProbabilitySpec::Fixed),
                p_new: p_new.map_or(ProbabilitySpec::Random, ProbabilitySpec::Fixed),
                time_steps,
                seed,
                ..Default::default()
            };
            let report = sensornet_simulation::run_evaluation(&config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_evaluation(&report);
            }
        }
        Commands::Partition => {
            scenarios::run_partition_scenario()?;
        }
        Commands::Topology {
            nodes,
            area,
            seed,
            routes,
        } => {
            let network = SensorNetwork::create(nodes, area, seed)?;
            println!("Seed: {}", network.seed());
            println!("{}", network.topology().visualize());
            if routes {
                println!("{}", scenarios::routing_table_report(&network)?);
            }
        }
        Commands::Interactive {
            nodes,
            seed,
            config,
        } => {
            let config = load_config(config)?;
            run_interactive(nodes, seed, config)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<SimConfig> {
    match path {
        Some(path) => SimConfig::from_json_file(&path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(SimConfig::default()),
    }
}

fn print_evaluation(report: &sensornet_simulation::EvaluationReport) {
    println!("\n{}", "=".repeat(70));
    println!("FINAL EVALUATION REPORT (base seed {})", report.base_seed);
    println!("{}", "=".repeat(70));
    println!("\nProtocol Evaluation Summary (Transposed):");
    println!("{}", report.transposed_table());
    println!("Overall average efficiency: {:.4}", report.overall_efficiency());

    if report.rankings.len() > 1 {
        println!("\nTopology Ranking (higher score is better):");
        for ranking in &report.rankings {
            println!(
                "Rank {}: Topology {} - Score: {:.4}",
                ranking.rank, ranking.topology, ranking.breakdown.score
            );
        }
    }
    if let Some(best) = report.best() {
        let b = &best.breakdown;
        println!("\nScoring components for topology {}:", best.topology);
        println!("  - Efficiency:        {:.4}", b.efficiency);
        println!("  - Resilience:        {:.4}", b.resilience);
        println!("  - Overhead:          {:.4}", b.overhead);
        println!("  - Routing Quality:   {:.4}", b.routing_quality);
        println!("  - Delay Factor:      {:.4}", b.delay_factor);
        println!("  - Traffic Balance:   {:.4}", b.traffic_balance);
        println!("  - Link Stability:    {:.4}", best.link_stability);
        println!("  - Messages per Link: {:.2}", best.messages_per_link);
    }
}

fn run_interactive(node_count: usize, seed: Option<u64>, config: SimConfig) -> anyhow::Result<()> {
    let params = config.step_params;
    let mut network = SensorNetwork::with_config(node_count, seed, config)?;
    println!("Seed: {}", network.seed());
    println!("{}", network.topology().visualize());

    println!("\nInteractive mode. Commands:");
    println!("  step [n]            - Run n dynamic steps (default 1)");
    println!("  send <a> <b>        - Send a packet from a to b");
    println!("  add <a> <b> [delay] - Add a link");
    println!("  remove <a> <b>      - Remove a link");
    println!("  routes [id...]      - Show routing tables");
    println!("  topology            - Show links");
    println!("  stats               - Show statistics");
    println!("  history [back|forward|latest|<n>] - Browse recorded steps");
    println!("  regenerate          - Start over with a new random network");
    println!("  quit                - Exit");
    println!();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = parts.first() else {
            continue;
        };

        match command {
            "step" => {
                let n: u64 = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(1);
                for _ in 0..n {
                    match network.step(&params) {
                        Ok(events) => {
                            for change in &events.topology_changes {
                                println!("  [{}] {change}", events.step);
                            }
                            if let Some(traffic) = &events.traffic {
                                println!("  [{}] {traffic}", events.step);
                            }
                        }
                        Err(e) => {
                            println!("  Error: {e}");
                            break;
                        }
                    }
                }
                println!("  {}", network.state_summary());
            }
            "send" => match parse_pair(&parts) {
                Some((a, b)) => match network.send(a, b) {
                    Ok(result) => println!("  {result}"),
                    Err(e) => println!("  Error: {e}"),
                },
                None => println!("  Usage: send <a> <b>"),
            },
            "add" => match parse_pair(&parts) {
                Some((a, b)) => {
                    let delay = parts.get(3).and_then(|s| s.parse().ok());
                    report_update(network.modify_topology(LinkAction::Add { a, b, delay }));
                }
                None => println!("  Usage: add <a> <b> [delay]"),
            },
            "remove" => match parse_pair(&parts) {
                Some((a, b)) => report_update(network.modify_topology(LinkAction::Remove { a, b })),
                None => println!("  Usage: remove <a> <b>"),
            },
            "routes" => {
                let ids: Vec<NodeId> = parts[1..]
                    .iter()
                    .filter_map(|s| s.parse().ok().map(NodeId))
                    .collect();
                match network.routing_info(&ids) {
                    Ok(info) => {
                        for (id, info) in info {
                            println!("  Node {id}:");
                            for (destination, entry) in &info.routing_table {
                                let next_hop = entry
                                    .next_hop
                                    .map(|n| n.to_string())
                                    .unwrap_or_else(|| "-".to_string());
                                println!(
                                    "    -> {destination:>3} via {next_hop:>3} cost {}",
                                    entry.cost
                                );
                            }
                        }
                    }
                    Err(e) => println!("  Error: {e}"),
                }
            }
            "topology" => println!("{}", network.topology().visualize()),
            "stats" => println!("{}", scenarios::statistics_report(&network.statistics())),
            "history" => {
                let history = network.history_mut();
                let record = match parts.get(1).copied() {
                    Some("back") => history.back(),
                    Some("forward") => history.forward(),
                    Some("latest") | None => history.latest(),
                    Some(index) => match index.parse() {
                        Ok(index) => history.jump(index),
                        Err(_) => None,
                    },
                };
                match record {
                    Some(record) => print_record(record),
                    None => println!("  No such history entry"),
                }
            }
            "regenerate" => match network.regenerate() {
                Ok(()) => println!("{}", network.topology().visualize()),
                Err(e) => println!("  Error: {e}"),
            },
            "quit" | "exit" | "q" => {
                println!("Goodbye!");
                break;
            }
            _ => println!("  Unknown command: {command}"),
        }
    }

    Ok(())
}

fn parse_pair(parts: &[&str]) -> Option<(NodeId, NodeId)> {
    let a = parts.get(1)?.parse().ok()?;
    let b = parts.get(2)?.parse().ok()?;
    Some((NodeId(a), NodeId(b)))
}

fn report_update(result: SensorNetResult<TopologyUpdate>) {
    match result {
        Ok(update) => {
            for change in &update.changes {
                println!("  {change}");
            }
            println!("  Reconverged in {} rounds", update.reconvergence_iterations);
        }
        Err(e) => println!("  Error: {e}"),
    }
}

fn print_record(record: &StepRecord) {
    println!("  Entry {} ({:?})", record.index, record.origin);
    for change in &record.topology_changes {
        println!("    {change}");
    }
    if let Some(traffic) = &record.traffic {
        println!("    {traffic}");
    }
    println!(
        "    Counters: hello {}, topology {}, route-discovery {}, data {}",
        record.counters.hello,
        record.counters.topology,
        record.counters.route_discovery,
        record.counters.data
    );
}
