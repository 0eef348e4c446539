//! Step history with cursor navigation
//!
//! Every automatic step and manual edit can be recorded as a
//! [`StepRecord`]. The cursor lets a front end page back and forth
//! through past steps without touching the live network.

use serde::{Deserialize, Serialize};

use sensornet_core::{MessageCounters, TopologyChange, TrafficResult};

/// What produced a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOrigin {
    /// A driver step
    Automatic,
    /// A caller-requested link edit or transmission
    Manual,
}

/// One recorded step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Position in the history
    pub index: usize,
    pub origin: StepOrigin,
    pub topology_changes: Vec<TopologyChange>,
    pub traffic: Option<TrafficResult>,
    /// Network-wide counters after the step
    pub counters: MessageCounters,
    pub reconvergence_iterations: usize,
}

/// Recorded steps plus a cursor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    records: Vec<StepRecord>,
    cursor: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and move the cursor onto it
    pub fn push(
        &mut self,
        origin: StepOrigin,
        topology_changes: Vec<TopologyChange>,
        traffic: Option<TrafficResult>,
        counters: MessageCounters,
        reconvergence_iterations: usize,
    ) -> &StepRecord {
        let index = self.records.len();
        self.records.push(StepRecord {
            index,
            origin,
            topology_changes,
            traffic,
            counters,
            reconvergence_iterations,
        });
        self.cursor = Some(index);
        &self.records[index]
    }

    pub fn get(&self, index: usize) -> Option<&StepRecord> {
        self.records.get(index)
    }

    /// Record under the cursor
    pub fn current(&self) -> Option<&StepRecord> {
        self.cursor.and_then(|i| self.records.get(i))
    }

    /// Move the cursor one record back
    pub fn back(&mut self) -> Option<&StepRecord> {
        let index = self.cursor?.checked_sub(1)?;
        self.cursor = Some(index);
        self.records.get(index)
    }

    /// Move the cursor one record forward
    pub fn forward(&mut self) -> Option<&StepRecord> {
        let index = self.cursor? + 1;
        if index >= self.records.len() {
            return None;
        }
        self.cursor = Some(index);
        self.records.get(index)
    }

    /// Move the cursor to `index`; out-of-range indices leave it in place
    pub fn jump(&mut self, index: usize) -> Option<&StepRecord> {
        if index >= self.records.len() {
            return None;
        }
        self.cursor = Some(index);
        self.records.get(index)
    }

    /// Move the cursor to the newest record
    pub fn latest(&mut self) -> Option<&StepRecord> {
        let index = self.records.len().checked_sub(1)?;
        self.cursor = Some(index);
        self.records.get(index)
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(n: usize) -> History {
        let mut history = History::new();
        for i in 0..n {
            let mut counters = MessageCounters::new();
            counters.record_many(sensornet_core::MessageKind::Hello, i as u64);
            history.push(StepOrigin::Automatic, Vec::new(), None, counters, 0);
        }
        history
    }

    #[test]
    fn test_empty_history_navigation() {
        let mut history = History::new();
        assert!(history.is_empty());
        assert!(history.current().is_none());
        assert!(history.back().is_none());
        assert!(history.forward().is_none());
        assert!(history.latest().is_none());
        assert!(history.jump(0).is_none());
    }

    #[test]
    fn test_push_moves_cursor() {
        let history = filled(3);
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), Some(2));
        assert_eq!(history.current().unwrap().index, 2);
    }

    #[test]
    fn test_back_forward_jump() {
        let mut history = filled(4);
        assert_eq!(history.back().unwrap().index, 2);
        assert_eq!(history.back().unwrap().index, 1);
        assert_eq!(history.back().unwrap().index, 0);
        assert!(history.back().is_none());
        assert_eq!(history.cursor(), Some(0));

        assert_eq!(history.forward().unwrap().index, 1);
        assert_eq!(history.jump(3).unwrap().counters.hello, 3);
        assert!(history.forward().is_none());
        assert!(history.jump(9).is_none());
        assert_eq!(history.cursor(), Some(3));

        history.jump(0);
        assert_eq!(history.latest().unwrap().index, 3);
    }

    #[test]
    fn test_clear_resets_cursor() {
        let mut history = filled(2);
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.cursor(), None);
    }
}
