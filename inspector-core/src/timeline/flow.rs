//! Flow edge side channel
//!
//! Flow events link points in time across levels. They never occupy a level;
//! each begin opens a pending edge under its flow id, each step closes the
//! previous segment and opens the next one, and an end closes the edge and
//! forgets the id. Flows whose end never arrives stay open.

use super::event::{PhaseKind, TraceEvent};
use std::collections::HashMap;

/// A directed edge between two (time, level) points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowEdge {
    pub start_time: f64,
    pub start_level: usize,
    pub end_time: Option<f64>,
    pub end_level: Option<usize>,
}

impl FlowEdge {
    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Collects flow edges in arrival order
#[derive(Debug, Default)]
pub struct FlowTracker {
    edges: Vec<FlowEdge>,
    pending_by_id: HashMap<String, usize>,
}

impl FlowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one flow event seen at `level`; non-flow events are ignored
    pub fn record(&mut self, event: &TraceEvent, level: usize) {
        let Some(id) = event.id.as_deref() else {
            log::debug!("Flow event '{}' has no id, ignoring", event.name);
            return;
        };

        match event.kind() {
            PhaseKind::FlowBegin => {
                let index = self.open(event.start_time, level);
                self.pending_by_id.insert(id.to_string(), index);
            }
            PhaseKind::FlowStep => {
                self.close(id, event.start_time, level);
                let index = self.open(event.start_time, level);
                self.pending_by_id.insert(id.to_string(), index);
            }
            PhaseKind::FlowEnd => {
                self.close(id, event.start_time, level);
                self.pending_by_id.remove(id);
            }
            PhaseKind::Instant
            | PhaseKind::SyncSpan
            | PhaseKind::AsyncBegin
            | PhaseKind::AsyncStep
            | PhaseKind::AsyncEnd
            | PhaseKind::NestableAsync => {}
        }
    }

    fn open(&mut self, time: f64, level: usize) -> usize {
        self.edges.push(FlowEdge {
            start_time: time,
            start_level: level,
            end_time: None,
            end_level: None,
        });
        self.edges.len() - 1
    }

    fn close(&mut self, id: &str, time: f64, level: usize) {
        match self.pending_by_id.get(id) {
            Some(&index) => {
                let edge = &mut self.edges[index];
                edge.end_time = Some(time);
                edge.end_level = Some(level);
            }
            None => log::debug!("Flow '{}' continues without a begin, ignoring", id),
        }
    }

    /// Ids of flows still waiting for their next point
    pub fn pending_ids(&self) -> impl Iterator<Item = &str> {
        self.pending_by_id.keys().map(String::as_str)
    }

    pub fn edges(&self) -> &[FlowEdge] {
        &self.edges
    }

    pub fn into_edges(self) -> Vec<FlowEdge> {
        self.edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Phase;

    fn flow(phase: Phase, time: f64, id: &str) -> TraceEvent {
        TraceEvent::new("flow", phase, time, None).with_id(id)
    }

    #[test]
    fn test_begin_step_end() {
        let mut tracker = FlowTracker::new();
        tracker.record(&flow(Phase::FlowBegin, 1.0, "a"), 0);
        tracker.record(&flow(Phase::FlowStep, 2.0, "a"), 3);
        tracker.record(&flow(Phase::FlowEnd, 4.0, "a"), 1);

        let edges = tracker.edges();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0], FlowEdge { start_time: 1.0, start_level: 0, end_time: Some(2.0), end_level: Some(3) });
        assert_eq!(edges[1], FlowEdge { start_time: 2.0, start_level: 3, end_time: Some(4.0), end_level: Some(1) });
        assert_eq!(tracker.pending_ids().count(), 0);
    }

    #[test]
    fn test_unclosed_flow_dangles() {
        let mut tracker = FlowTracker::new();
        tracker.record(&flow(Phase::FlowBegin, 1.0, "a"), 0);
        tracker.record(&flow(Phase::FlowBegin, 2.0, "b"), 1);
        tracker.record(&flow(Phase::FlowEnd, 3.0, "b"), 2);

        assert!(!tracker.edges()[0].is_closed());
        assert!(tracker.edges()[1].is_closed());
        assert_eq!(tracker.pending_ids().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_end_without_begin_is_ignored() {
        let mut tracker = FlowTracker::new();
        tracker.record(&flow(Phase::FlowEnd, 3.0, "ghost"), 2);
        tracker.record(&TraceEvent::span("task", 0.0, 1.0).with_id("x"), 0);
        assert!(tracker.edges().is_empty());
    }
}
