//! Sensor network topology construction
//!
//! Provides functions to create network topologies:
//! - Random geometric: uniform placement, links between nodes in range,
//!   followed by connectivity repair
//! - Line: evenly spaced nodes, each linked to its successor
//! - Custom: explicit placements and link list
//!
//! Connectivity repair first attaches every isolated node to its nearest
//! linked node, then joins the remaining components through their closest
//! pair. Both endpoints of a repair link grow their transmission range to
//! cover it, so repair links are always mutually feasible.

use rand::Rng;
use tracing::debug;

use sensornet_core::{LinkGraph, NodeId, ParameterError, Position, SensorNetError};
use sensornet_routing::{SensorNode, Topology};

/// Repair links get this much range headroom over their length
const RANGE_SLACK: f64 = 1.1;

/// Builder for generated topologies
#[derive(Debug, Clone)]
pub struct TopologyBuilder {
    node_count: usize,
    area_size: f64,
    min_range: f64,
    max_range: f64,
    repair: bool,
}

impl TopologyBuilder {
    /// Nodes in a 10 x 10 area with transmission ranges in [1, 3]
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            area_size: 10.0,
            min_range: 1.0,
            max_range: 3.0,
            repair: true,
        }
    }

    /// Side length of the square deployment area
    pub fn area_size(mut self, area_size: f64) -> Self {
        self.area_size = area_size;
        self
    }

    /// Bounds of the uniformly drawn transmission ranges
    pub fn ranges(mut self, min_range: f64, max_range: f64) -> Self {
        self.min_range = min_range;
        self.max_range = max_range;
        self
    }

    /// Enable or disable connectivity repair
    pub fn repair(mut self, repair: bool) -> Self {
        self.repair = repair;
        self
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.node_count < 2 {
            return Err(ParameterError::TooFewNodes {
                count: self.node_count,
            });
        }
        for (name, value) in [
            ("area_size", self.area_size),
            ("min_range", self.min_range),
            ("max_range", self.max_range),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ParameterError::NonPositive { name, value });
            }
        }
        if self.min_range > self.max_range {
            return Err(ParameterError::InvertedRange {
                min: self.min_range,
                max: self.max_range,
            });
        }
        Ok(())
    }

    /// Random geometric topology
    ///
    /// Two nodes are linked when either lies within the other's range.
    /// Delays are drawn from [0, 1).
    pub fn random_geometric<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<Topology, SensorNetError> {
        self.validate()?;
        let mut topology = Topology::new();
        for id in NodeId::range(self.node_count) {
            let position = Position::new(
                rng.random_range(0.0..self.area_size),
                rng.random_range(0.0..self.area_size),
            );
            let range = if self.min_range < self.max_range {
                rng.random_range(self.min_range..self.max_range)
            } else {
                self.min_range
            };
            topology.add_node(SensorNode::new(id, position, range))?;
        }

        let ids = topology.node_ids();
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                if in_either_range(&topology, a, b) {
                    let delay = rng.random_range(0.0..1.0);
                    topology.add_link(a, b, delay)?;
                }
            }
        }

        if self.repair {
            let added = repair_connectivity(&mut topology, rng);
            if added > 0 {
                debug!(links = added, "connectivity repaired");
            }
        }
        debug!(
            nodes = topology.node_count(),
            links = topology.link_count(),
            "random geometric topology generated"
        );
        Ok(topology)
    }

    /// Nodes spaced `spacing` apart on a line, each linked to the next
    ///
    /// Ranges equal the spacing, so only adjacent nodes are feasible.
    pub fn line(&self, spacing: f64, delay: f64) -> Result<Topology, SensorNetError> {
        if self.node_count < 2 {
            return Err(ParameterError::TooFewNodes {
                count: self.node_count,
            }
            .into());
        }
        let nodes: Vec<(f64, f64, f64)> = (0..self.node_count)
            .map(|i| (i as f64 * spacing, 0.0, spacing))
            .collect();
        let links: Vec<(u32, u32, f64)> = (1..self.node_count as u32)
            .map(|i| (i - 1, i, delay))
            .collect();
        from_layout(&nodes, &links)
    }
}

fn in_either_range(topology: &Topology, a: NodeId, b: NodeId) -> bool {
    match (topology.node(a), topology.node(b)) {
        (Some(na), Some(nb)) => na.can_reach(nb) || nb.can_reach(na),
        _ => false,
    }
}

/// Build a topology from `(x, y, range)` placements and `(a, b, delay)` links
///
/// Node ids follow the order of `nodes`. Links are not range-checked.
pub fn from_layout(
    nodes: &[(f64, f64, f64)],
    links: &[(u32, u32, f64)],
) -> Result<Topology, SensorNetError> {
    let mut topology = Topology::new();
    for (i, &(x, y, range)) in nodes.iter().enumerate() {
        topology.add_node(SensorNode::new(NodeId(i as u32), Position::new(x, y), range))?;
    }
    for &(a, b, delay) in links {
        topology.add_link(NodeId(a), NodeId(b), delay)?;
    }
    Ok(topology)
}

/// Link every isolated node and join all components; returns links added
pub fn repair_connectivity<R: Rng + ?Sized>(topology: &mut Topology, rng: &mut R) -> usize {
    let mut added = 0;

    for node in topology.isolated_nodes() {
        if topology.degree(node) > 0 {
            continue;
        }
        let linked: Vec<NodeId> = topology
            .nodes()
            .filter(|n| n.id() != node && n.degree() > 0)
            .map(SensorNode::id)
            .collect();
        let candidates = if linked.is_empty() {
            topology.node_ids().into_iter().filter(|&n| n != node).collect()
        } else {
            linked
        };
        if let Some(peer) = closest(topology, node, &candidates) {
            attach_with_range(topology, node, peer, rng);
            added += 1;
        }
    }

    loop {
        let components = topology.components();
        if components.len() <= 1 {
            break;
        }
        let inside = &components[0];
        let outside: Vec<NodeId> = topology
            .node_ids()
            .into_iter()
            .filter(|n| !inside.contains(n))
            .collect();
        let best = inside
            .iter()
            .filter_map(|&a| {
                let b = closest(topology, a, &outside)?;
                Some((topology.distance(a, b)?, a, b))
            })
            .min_by(|x, y| x.0.total_cmp(&y.0).then((x.1, x.2).cmp(&(y.1, y.2))));
        match best {
            Some((_, a, b)) => {
                attach_with_range(topology, a, b, rng);
                added += 1;
            }
            None => break,
        }
    }
    added
}

/// Nearest candidate to `node`, ties broken by lower id
fn closest(topology: &Topology, node: NodeId, candidates: &[NodeId]) -> Option<NodeId> {
    candidates
        .iter()
        .filter_map(|&c| Some((topology.distance(node, c)?, c)))
        .min_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)))
        .map(|(_, c)| c)
}

fn attach_with_range<R: Rng + ?Sized>(topology: &mut Topology, a: NodeId, b: NodeId, rng: &mut R) {
    let Some(distance) = topology.distance(a, b) else {
        return;
    };
    for id in [a, b] {
        if let Some(node) = topology.node_mut(id) {
            node.extend_range(distance * RANGE_SLACK);
        }
    }
    let delay = rng.random_range(0.0..1.0);
    if topology.add_link(a, b, delay).is_ok() {
        debug!(%a, %b, distance, "repair link added");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_random_geometric_is_connected() {
        for seed in 0..25 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let topo = TopologyBuilder::new(20).random_geometric(&mut rng).unwrap();
            assert_eq!(topo.node_count(), 20);
            assert!(topo.isolated_nodes().is_empty(), "seed {seed}");
            assert!(topo.is_connected(), "seed {seed}");
        }
    }

    #[test]
    fn test_sparse_area_needs_repair() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let unrepaired = TopologyBuilder::new(10)
            .area_size(100.0)
            .repair(false)
            .random_geometric(&mut rng)
            .unwrap();
        assert!(!unrepaired.is_connected());

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let repaired = TopologyBuilder::new(10)
            .area_size(100.0)
            .random_geometric(&mut rng)
            .unwrap();
        assert!(repaired.is_connected());
        for (key, _) in repaired.links() {
            let (a, b) = key.endpoints();
            let na = repaired.node(a).unwrap();
            let nb = repaired.node(b).unwrap();
            assert!(na.can_reach(nb) || nb.can_reach(na));
        }
    }

    #[test]
    fn test_same_seed_same_topology() {
        let build = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            TopologyBuilder::new(15).random_geometric(&mut rng).unwrap()
        };
        let a: Vec<_> = build(9).links().collect();
        let b: Vec<_> = build(9).links().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_parameters() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(
            TopologyBuilder::new(1).random_geometric(&mut rng).unwrap_err(),
            SensorNetError::InvalidParameter(ParameterError::TooFewNodes { count: 1 })
        );
        assert!(matches!(
            TopologyBuilder::new(5).area_size(0.0).random_geometric(&mut rng),
            Err(SensorNetError::InvalidParameter(ParameterError::NonPositive { .. }))
        ));
        assert!(matches!(
            TopologyBuilder::new(5).ranges(3.0, 1.0).random_geometric(&mut rng),
            Err(SensorNetError::InvalidParameter(ParameterError::InvertedRange { .. }))
        ));
    }

    #[test]
    fn test_line_layout() {
        let topo = TopologyBuilder::new(4).line(1.0, 0.5).unwrap();
        assert_eq!(topo.link_count(), 3);
        assert!(topo.has_link(NodeId(2), NodeId(3)));
        assert!(topo.is_feasible(NodeId(1), NodeId(2)));
        assert!(!topo.is_feasible(NodeId(0), NodeId(2)));
    }

    #[test]
    fn test_from_layout_rejects_bad_links() {
        let nodes = [(0.0, 0.0, 1.0), (1.0, 0.0, 1.0)];
        assert!(matches!(
            from_layout(&nodes, &[(0, 0, 0.1)]),
            Err(SensorNetError::InfeasibleLink(_))
        ));
        assert!(from_layout(&nodes, &[(0, 1, 0.1)]).is_ok());
    }
}
