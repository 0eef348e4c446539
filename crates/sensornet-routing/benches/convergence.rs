//! Distance-vector convergence benchmarks
//!
//! - Full convergence from freshly seeded vectors
//! - Incremental reconvergence after a single link failure
//!
//! Run with: cargo bench -p sensornet-routing

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use sensornet_core::{LinkChange, NodeId, Position};
use sensornet_routing::{DistanceVectorEngine, RoutingProtocol, SensorNode, Topology};

// ============================================================================
// Bench Topology
// ============================================================================

fn grid_topology(side: u32, seed: u64) -> Topology {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut topo = Topology::new();
    for y in 0..side {
        for x in 0..side {
            let id = NodeId(y * side + x);
            topo.add_node(SensorNode::new(id, Position::new(x as f64, y as f64), 1.0))
                .unwrap();
        }
    }
    for key in topo.feasible_non_edges() {
        topo.add_feasible_link(key.low, key.high, rng.random_range(0.0..1.0))
            .unwrap();
    }
    topo
}

fn bench_full_convergence(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_convergence");
    for side in [5u32, 10, 15] {
        let topo = grid_topology(side, 1);
        group.bench_with_input(
            BenchmarkId::from_parameter(side * side),
            &topo,
            |b, topo| {
                b.iter(|| {
                    let mut topo = topo.clone();
                    let mut engine = DistanceVectorEngine::new().with_verification(false);
                    black_box(engine.converge_full(&mut topo))
                })
            },
        );
    }
    group.finish();
}

fn bench_link_failure(c: &mut Criterion) {
    let mut group = c.benchmark_group("link_failure");
    for side in [5u32, 10, 15] {
        let mut converged = grid_topology(side, 2);
        let mut engine = DistanceVectorEngine::new().with_verification(false);
        engine.converge_full(&mut converged);
        let key = converged.link_keys()[converged.link_count() / 2];

        group.bench_with_input(
            BenchmarkId::from_parameter(side * side),
            &converged,
            |b, converged| {
                b.iter(|| {
                    let mut topo = converged.clone();
                    topo.remove_link(key.low, key.high).unwrap();
                    black_box(engine.reconverge(
                        &mut topo,
                        LinkChange::Removed {
                            a: key.low,
                            b: key.high,
                        },
                    ))
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_full_convergence, bench_link_failure);
criterion_main!(benches);
