//! Node identity and placement
//!
//! - [`NodeId`]: dense integer identifier assigned at network creation
//! - [`Position`]: planar coordinates used only for range checks
//! - [`LinkKey`]: order-independent key for an undirected link

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Identifier of a sensor node
///
/// Ids are assigned densely from zero when a network is created and never
/// change for the lifetime of that network.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display("{_0}")]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a node id
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Generate the ids `0..count`
    pub fn range(count: usize) -> Vec<Self> {
        (0..count as u32).map(Self).collect()
    }

    /// Get the id as an index
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Planar position of a node
#[derive(Debug, Display, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[display("({x:.2}, {y:.2})")]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Normalized key for an undirected link (`low < high`)
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display("{low}-{high}")]
pub struct LinkKey {
    pub low: NodeId,
    pub high: NodeId,
}

impl LinkKey {
    /// Create a key from two endpoints in either order
    pub fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Both endpoints, lower id first
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.low, self.high)
    }

    /// Check whether the link touches the given node
    pub fn touches(&self, node: NodeId) -> bool {
        self.low == node || self.high == node
    }

    /// The endpoint opposite to `node`, if `node` is an endpoint
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if self.low == node {
            Some(self.high)
        } else if self.high == node {
            Some(self.low)
        } else {
            None
        }
    }
}
