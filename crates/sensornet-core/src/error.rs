//! Error types for SensorNet

use thiserror::Error;

use crate::identity::NodeId;

/// Top-level error type for SensorNet operations
///
/// Unreachable destinations and network partitions are not errors: they
/// are reported as traffic outcomes and topology events respectively.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorNetError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(#[from] ParameterError),

    #[error("Infeasible link: {0}")]
    InfeasibleLink(#[from] LinkError),
}

/// Rejected caller input; the operation did not touch any state
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("a network needs at least 2 nodes, got {count}")]
    TooFewNodes { count: usize },

    #[error("{name} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },

    #[error("{name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("transmission range bounds are inverted: min {min} > max {max}")]
    InvertedRange { min: f64, max: f64 },

    #[error("source and destination are both node {0}")]
    SelfTransmission(NodeId),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {0} already exists")]
    DuplicateNode(NodeId),
}

/// Why a link could not be added or removed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {0} cannot link to itself")]
    SelfLoop(NodeId),

    #[error("nodes {a} and {b} are already linked")]
    AlreadyLinked { a: NodeId, b: NodeId },

    #[error("nodes {a} and {b} are not linked")]
    NotLinked { a: NodeId, b: NodeId },

    #[error("nodes {a} and {b} are {distance:.3} apart, outside mutual transmission range")]
    OutOfRange { a: NodeId, b: NodeId, distance: f64 },

    #[error("link delay must be finite, non-negative and below 1 for feasible links, got {0}")]
    InvalidDelay(f64),
}

/// Result type for SensorNet operations
pub type SensorNetResult<T> = Result<T, SensorNetError>;
