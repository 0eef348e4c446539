//! Protocol evaluation over many randomized runs
//!
//! [`run_evaluation`] builds several random topologies, drives each one
//! through repeated batches of steps with fixed or randomized failure and
//! addition probabilities, and aggregates the results per topology.
//! Topologies are then scored and ranked.
//!
//! Only the public [`SensorNetwork`] interface is used here.

use std::fmt::Write as _;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sensornet_core::{ParameterError, SensorNetResult};

use crate::config::SimConfig;
use crate::simulation::SensorNetwork;
use crate::types::StepParams;

/// Lower bound for randomized probabilities
const MIN_RANDOM_PROBABILITY: f64 = 0.01;

/// A probability that is either fixed or drawn per iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProbabilitySpec {
    Fixed(f64),
    /// Uniform in [0.01, max_probability]
    Random,
}

impl ProbabilitySpec {
    fn sample<R: Rng + ?Sized>(&self, max_probability: f64, rng: &mut R) -> f64 {
        match *self {
            ProbabilitySpec::Fixed(p) => p,
            ProbabilitySpec::Random => rng.random_range(MIN_RANDOM_PROBABILITY..=max_probability),
        }
    }
}

/// Parameters of an evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub topologies: usize,
    pub iterations_per_topology: usize,
    /// Upper bound for randomized failure and addition probabilities
    pub max_probability: f64,
    pub node_count: usize,
    pub area_size: f64,
    pub p_request: f64,
    pub p_fail: ProbabilitySpec,
    pub p_new: ProbabilitySpec,
    /// Steps simulated per iteration
    pub time_steps: u64,
    pub hello_interval: u64,
    /// Base seed; drawn when absent
    pub seed: Option<u64>,
    /// Network configuration; `area_size` above takes precedence
    pub network: SimConfig,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            topologies: 1,
            iterations_per_topology: 100,
            max_probability: 0.3,
            node_count: 20,
            area_size: 10.0,
            p_request: 0.5,
            p_fail: ProbabilitySpec::Random,
            p_new: ProbabilitySpec::Random,
            time_steps: 5,
            hello_interval: 1,
            seed: None,
            network: SimConfig {
                record_history: false,
                ..Default::default()
            },
        }
    }
}

impl EvaluationConfig {
    pub fn validate(&self) -> Result<(), ParameterError> {
        for (name, value) in [
            ("topologies", self.topologies),
            ("iterations_per_topology", self.iterations_per_topology),
        ] {
            if value == 0 {
                return Err(ParameterError::NonPositive {
                    name,
                    value: value as f64,
                });
            }
        }
        if !(MIN_RANDOM_PROBABILITY..=1.0).contains(&self.max_probability) {
            return Err(ParameterError::ProbabilityOutOfRange {
                name: "max_probability",
                value: self.max_probability,
            });
        }
        let fixed = |spec: ProbabilitySpec| match spec {
            ProbabilitySpec::Fixed(p) => p,
            ProbabilitySpec::Random => self.max_probability,
        };
        StepParams {
            p_request: self.p_request,
            p_fail: fixed(self.p_fail),
            p_new: fixed(self.p_new),
            hello_interval: self.hello_interval,
        }
        .validate()
    }

    fn network_config(&self) -> SimConfig {
        SimConfig {
            area_size: self.area_size,
            ..self.network.clone()
        }
    }
}

/// Outcome of one batch of steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    /// One-based topology number
    pub topology: usize,
    /// One-based iteration number within the topology
    pub iteration: usize,
    pub p_request: f64,
    pub p_fail: f64,
    pub p_new: f64,
    pub data_packets: u64,
    pub total_packets: u64,
    pub efficiency: f64,
    pub requests: u64,
    pub reconnections: u64,
    pub links_removed: u64,
    pub links_added: u64,
    pub total_hops: u64,
    pub total_delay: f64,
    pub reconvergence_iterations: u64,
}

/// Aggregate over all iterations of one topology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologySummary {
    pub topology: usize,
    pub seed: u64,
    pub link_count: usize,
    pub avg_efficiency: f64,
    pub avg_p_request: f64,
    pub avg_p_fail: f64,
    pub avg_p_new: f64,
    pub avg_reconnections: f64,
    pub total_data_packets: u64,
    pub total_msg_packets: u64,
    pub total_links_removed: u64,
    pub total_links_added: u64,
    pub total_hops: u64,
    pub total_delay: f64,
    pub avg_hops_per_message: f64,
    pub avg_delay_per_message: f64,
}

impl TopologySummary {
    fn from_iterations(
        topology: usize,
        seed: u64,
        link_count: usize,
        results: &[IterationResult],
    ) -> Self {
        let count = results.len().max(1) as f64;
        let mean = |f: &dyn Fn(&IterationResult) -> f64| results.iter().map(f).sum::<f64>() / count;
        let total = |f: &dyn Fn(&IterationResult) -> u64| results.iter().map(f).sum::<u64>();

        let total_data_packets = total(&|r| r.data_packets);
        let total_hops = total(&|r| r.total_hops);
        let total_delay: f64 = results.iter().map(|r| r.total_delay).sum();
        let delivered = total_data_packets.max(1) as f64;

        Self {
            topology,
            seed,
            link_count,
            avg_efficiency: mean(&|r| r.efficiency),
            avg_p_request: mean(&|r| r.p_request),
            avg_p_fail: mean(&|r| r.p_fail),
            avg_p_new: mean(&|r| r.p_new),
            avg_reconnections: mean(&|r| r.reconnections as f64),
            total_data_packets,
            total_msg_packets: total(&|r| r.total_packets),
            total_links_removed: total(&|r| r.links_removed),
            total_links_added: total(&|r| r.links_added),
            total_hops,
            total_delay,
            avg_hops_per_message: total_hops as f64 / delivered,
            avg_delay_per_message: total_delay / delivered,
        }
    }

    fn link_events(&self) -> u64 {
        self.total_links_removed + self.total_links_added
    }

    /// Share of link events that were not removals; 1 without events
    pub fn link_stability(&self) -> f64 {
        match self.link_events() {
            0 => 1.0,
            events => 1.0 - self.total_links_removed as f64 / events as f64,
        }
    }

    /// Delivered packets per link event
    pub fn messages_per_link(&self) -> f64 {
        match self.link_events() {
            0 => self.total_data_packets as f64,
            events => self.total_data_packets as f64 / events as f64,
        }
    }
}

/// Weights of the score components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub efficiency: f64,
    pub resilience: f64,
    pub overhead: f64,
    pub routing_quality: f64,
    pub delay_factor: f64,
    pub traffic_balance: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            efficiency: 0.25,
            resilience: 0.20,
            overhead: 0.15,
            routing_quality: 0.20,
            delay_factor: 0.10,
            traffic_balance: 0.10,
        }
    }
}

/// Score components and their weighted sum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub efficiency: f64,
    pub resilience: f64,
    pub overhead: f64,
    pub routing_quality: f64,
    pub delay_factor: f64,
    pub traffic_balance: f64,
    pub score: f64,
}

/// Score a topology; higher is better
pub fn topology_score(summary: &TopologySummary, weights: &ScoreWeights) -> ScoreBreakdown {
    let efficiency = summary.avg_efficiency;

    let resilience_base = (1.0 - summary.avg_reconnections / 5.0).max(0.1);
    let failure_impact = (1.0 - (summary.total_links_removed as f64 + 1.0).ln() / 10.0).max(0.1);
    let resilience = (resilience_base + failure_impact) / 2.0;

    let data = summary.total_data_packets as f64;
    let total = summary.total_msg_packets as f64;
    let overhead = if summary.total_data_packets == 0 {
        0.0
    } else {
        let control_ratio = (total - data) / data.max(1.0);
        1.0 / (1.0 + control_ratio / 3.0)
    };

    let routing_quality = if summary.total_data_packets == 0
        || summary.avg_hops_per_message == 0.0
    {
        0.0
    } else {
        (1.0 - summary.avg_hops_per_message / 14.0).max(0.1)
    };

    let delay_factor = if summary.total_data_packets == 0 || summary.avg_delay_per_message == 0.0 {
        0.0
    } else {
        (1.0 - summary.avg_delay_per_message / 5.0).max(0.1)
    };

    let traffic_balance = if summary.total_data_packets == 0 {
        0.0
    } else {
        let traffic_ratio = data / total;
        1.0 / (1.0 + (-10.0 * (traffic_ratio - 0.1)).exp())
    };

    let score = weights.efficiency * efficiency
        + weights.resilience * resilience
        + weights.overhead * overhead
        + weights.routing_quality * routing_quality
        + weights.delay_factor * delay_factor
        + weights.traffic_balance * traffic_balance;

    ScoreBreakdown {
        efficiency,
        resilience,
        overhead,
        routing_quality,
        delay_factor,
        traffic_balance,
        score,
    }
}

/// Position of one topology in the ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    /// One-based rank, 1 is best
    pub rank: usize,
    pub topology: usize,
    pub breakdown: ScoreBreakdown,
    pub link_stability: f64,
    pub messages_per_link: f64,
}

/// Rank topologies by descending score; ties keep input order
pub fn rank_topologies(summaries: &[TopologySummary], weights: &ScoreWeights) -> Vec<Ranking> {
    let mut rankings: Vec<Ranking> = summaries
        .iter()
        .map(|summary| Ranking {
            rank: 0,
            topology: summary.topology,
            breakdown: topology_score(summary, weights),
            link_stability: summary.link_stability(),
            messages_per_link: summary.messages_per_link(),
        })
        .collect();
    rankings.sort_by(|a, b| b.breakdown.score.total_cmp(&a.breakdown.score));
    for (i, ranking) in rankings.iter_mut().enumerate() {
        ranking.rank = i + 1;
    }
    rankings
}

/// Everything an evaluation produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub base_seed: u64,
    pub iterations: Vec<IterationResult>,
    pub summaries: Vec<TopologySummary>,
    pub rankings: Vec<Ranking>,
}

impl EvaluationReport {
    /// Mean of the per-topology average efficiencies
    pub fn overall_efficiency(&self) -> f64 {
        if self.summaries.is_empty() {
            return 0.0;
        }
        self.summaries.iter().map(|s| s.avg_efficiency).sum::<f64>() / self.summaries.len() as f64
    }

    pub fn best(&self) -> Option<&Ranking> {
        self.rankings.first()
    }

    /// Summary table with one column per topology and one row per metric
    pub fn transposed_table(&self) -> String {
        let rows: [(&str, fn(&TopologySummary) -> String); 10] = [
            ("Mean Efficiency", |s| format!("{:.4}", s.avg_efficiency)),
            ("Mean p_request", |s| format!("{:.4}", s.avg_p_request)),
            ("Mean p_fail", |s| format!("{:.4}", s.avg_p_fail)),
            ("Mean p_new", |s| format!("{:.4}", s.avg_p_new)),
            ("Mean Reconnections", |s| format!("{:.2}", s.avg_reconnections)),
            ("Links Removed", |s| s.total_links_removed.to_string()),
            ("Links Added", |s| s.total_links_added.to_string()),
            ("Total Data Messages", |s| s.total_data_packets.to_string()),
            ("Avg Hops/Message", |s| format!("{:.2}", s.avg_hops_per_message)),
            ("Avg Delay/Message", |s| format!("{:.4}", s.avg_delay_per_message)),
        ];

        let mut out = format!("{:<20}", "Metric");
        for summary in &self.summaries {
            let _ = write!(out, " | {:>12}", format!("Topology {}", summary.topology));
        }
        let width = out.len();
        out.push('\n');
        out.push_str(&"-".repeat(width));
        out.push('\n');
        for (name, value) in rows {
            let _ = write!(out, "{name:<20}");
            for summary in &self.summaries {
                let _ = write!(out, " | {:>12}", value(summary));
            }
            out.push('\n');
        }
        out
    }
}

/// Run the evaluation described by `config`
pub fn run_evaluation(config: &EvaluationConfig) -> SensorNetResult<EvaluationReport> {
    config.validate()?;
    let base_seed = config.seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = ChaCha8Rng::seed_from_u64(base_seed);
    let network_config = config.network_config();

    info!(
        base_seed,
        topologies = config.topologies,
        iterations = config.iterations_per_topology,
        nodes = config.node_count,
        "starting evaluation"
    );

    let mut iterations = Vec::new();
    let mut summaries = Vec::new();

    for topology in 1..=config.topologies {
        let seed: u64 = rng.random();
        let mut network =
            SensorNetwork::with_config(config.node_count, Some(seed), network_config.clone())?;
        let link_count = network.topology().link_count();
        info!(topology, seed, links = link_count, "evaluating topology");

        let mut results = Vec::with_capacity(config.iterations_per_topology);
        for iteration in 1..=config.iterations_per_topology {
            let params = StepParams {
                p_request: config.p_request,
                p_fail: config.p_fail.sample(config.max_probability, &mut rng),
                p_new: config.p_new.sample(config.max_probability, &mut rng),
                hello_interval: config.hello_interval,
            };
            network.reset_counters();
            network.run(config.time_steps, &params)?;
            let stats = network.statistics();

            let result = IterationResult {
                topology,
                iteration,
                p_request: params.p_request,
                p_fail: params.p_fail,
                p_new: params.p_new,
                data_packets: stats.message_counts.data,
                total_packets: stats.message_counts.total(),
                efficiency: stats.efficiency(),
                requests: stats.requests,
                reconnections: stats.reconnections,
                links_removed: stats.links_removed,
                links_added: stats.links_added,
                total_hops: stats.total_hops,
                total_delay: stats.cumulative_delay,
                reconvergence_iterations: stats.reconvergence_iterations,
            };
            debug!(
                topology,
                iteration,
                efficiency = result.efficiency,
                data = result.data_packets,
                total = result.total_packets,
                "iteration finished"
            );
            results.push(result);
        }

        summaries.push(TopologySummary::from_iterations(topology, seed, link_count, &results));
        iterations.extend(results);
    }

    let rankings = rank_topologies(&summaries, &ScoreWeights::default());
    let report = EvaluationReport {
        base_seed,
        iterations,
        summaries,
        rankings,
    };
    info!(
        efficiency = report.overall_efficiency(),
        "evaluation complete"
    );
    Ok(report)
}
