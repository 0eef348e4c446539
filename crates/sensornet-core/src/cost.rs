//! Path cost with an explicit infinite sentinel
//!
//! Costs are additive link delays. Unreachable destinations carry
//! [`Cost::Infinite`] rather than a large finite number, so a path through
//! an unreachable hop can never look cheaper than a real one.

use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Accumulated path delay
///
/// `Infinite` compares greater than every finite cost and absorbs addition.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum Cost {
    Finite(f64),
    #[default]
    Infinite,
}

impl Cost {
    /// Cost of reaching yourself
    pub const ZERO: Cost = Cost::Finite(0.0);

    /// Create a finite cost
    ///
    /// Link delays are non-negative and finite; anything else is a logic
    /// error in the caller.
    pub fn finite(value: f64) -> Self {
        debug_assert!(
            value.is_finite() && value >= 0.0,
            "cost must be finite and non-negative, got {value}"
        );
        Cost::Finite(value)
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, Cost::Finite(_))
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Cost::Infinite)
    }

    /// The finite value, if any
    pub fn value(&self) -> Option<f64> {
        match self {
            Cost::Finite(v) => Some(*v),
            Cost::Infinite => None,
        }
    }

    /// Approximate equality for finite costs; two infinite costs are equal
    pub fn approx_eq(&self, other: &Cost, epsilon: f64) -> bool {
        match (self, other) {
            (Cost::Finite(a), Cost::Finite(b)) => (a - b).abs() <= epsilon,
            (Cost::Infinite, Cost::Infinite) => true,
            _ => false,
        }
    }
}

impl From<f64> for Cost {
    fn from(value: f64) -> Self {
        Cost::finite(value)
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        match (self, rhs) {
            (Cost::Finite(a), Cost::Finite(b)) => Cost::Finite(a + b),
            _ => Cost::Infinite,
        }
    }
}

impl Add<f64> for Cost {
    type Output = Cost;

    fn add(self, rhs: f64) -> Cost {
        self + Cost::finite(rhs)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cost::Finite(v) => write!(f, "{v:.3}"),
            Cost::Infinite => write!(f, "inf"),
        }
    }
}
