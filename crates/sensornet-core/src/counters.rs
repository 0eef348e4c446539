//! Message accounting
//!
//! Every simulated transmission increments exactly one counter, at the node
//! that originated it. Protocol efficiency is the share of data messages in
//! the total.

use std::fmt;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Type of a simulated transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Periodic neighbor liveness message
    Hello,
    /// Neighbor introduction during setup or link establishment
    Topology,
    /// Distance-vector dissemination
    RouteDiscovery,
    /// Delivered application payload
    Data,
}

impl MessageKind {
    /// All kinds in reporting order
    pub const ALL: [MessageKind; 4] = [
        MessageKind::Hello,
        MessageKind::Topology,
        MessageKind::RouteDiscovery,
        MessageKind::Data,
    ];

    /// Control traffic is everything except data
    pub fn is_control(&self) -> bool {
        !matches!(self, MessageKind::Data)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hello => write!(f, "hello"),
            Self::Topology => write!(f, "topology"),
            Self::RouteDiscovery => write!(f, "route-discovery"),
            Self::Data => write!(f, "data"),
        }
    }
}

/// Per-type transmission counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCounters {
    pub hello: u64,
    pub topology: u64,
    pub route_discovery: u64,
    pub data: u64,
}

impl MessageCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one transmission of the given kind
    pub fn record(&mut self, kind: MessageKind) {
        self.record_many(kind, 1);
    }

    /// Record `count` transmissions of the given kind
    pub fn record_many(&mut self, kind: MessageKind, count: u64) {
        match kind {
            MessageKind::Hello => self.hello += count,
            MessageKind::Topology => self.topology += count,
            MessageKind::RouteDiscovery => self.route_discovery += count,
            MessageKind::Data => self.data += count,
        }
    }

    pub fn get(&self, kind: MessageKind) -> u64 {
        match kind {
            MessageKind::Hello => self.hello,
            MessageKind::Topology => self.topology,
            MessageKind::RouteDiscovery => self.route_discovery,
            MessageKind::Data => self.data,
        }
    }

    pub fn total(&self) -> u64 {
        self.hello + self.topology + self.route_discovery + self.data
    }

    /// Hello + topology + route discovery
    pub fn control(&self) -> u64 {
        self.hello + self.topology + self.route_discovery
    }

    /// Share of data messages in all messages, 0 when nothing was sent
    pub fn efficiency(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.data as f64 / total as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Add for MessageCounters {
    type Output = MessageCounters;

    fn add(mut self, rhs: MessageCounters) -> MessageCounters {
        self += rhs;
        self
    }
}

impl AddAssign for MessageCounters {
    fn add_assign(&mut self, rhs: MessageCounters) {
        self.hello += rhs.hello;
        self.topology += rhs.topology;
        self.route_discovery += rhs.route_discovery;
        self.data += rhs.data;
    }
}

impl std::iter::Sum for MessageCounters {
    fn sum<I: Iterator<Item = MessageCounters>>(iter: I) -> Self {
        iter.fold(MessageCounters::default(), |acc, c| acc + c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_efficiency_worked_example() {
        let counters = MessageCounters {
            hello: 10,
            topology: 4,
            route_discovery: 6,
            data: 2,
        };
        assert_eq!(counters.total(), 22);
        assert!((counters.efficiency() - 2.0 / 22.0).abs() < 1e-12);
    }

    #[test]
    fn test_efficiency_empty() {
        assert_eq!(MessageCounters::new().efficiency(), 0.0);
    }

    #[test]
    fn test_record_and_sum() {
        let mut a = MessageCounters::new();
        a.record(MessageKind::Hello);
        a.record_many(MessageKind::RouteDiscovery, 3);
        let mut b = MessageCounters::new();
        b.record(MessageKind::Data);

        let sum: MessageCounters = [a, b].into_iter().sum();
        assert_eq!(sum.get(MessageKind::Hello), 1);
        assert_eq!(sum.get(MessageKind::RouteDiscovery), 3);
        assert_eq!(sum.get(MessageKind::Data), 1);
        assert_eq!(sum.control(), 4);
    }

    #[test]
    fn test_control_kinds() {
        assert!(MessageKind::Hello.is_control());
        assert!(!MessageKind::Data.is_control());
        assert_eq!(MessageKind::RouteDiscovery.to_string(), "route-discovery");
    }
}
