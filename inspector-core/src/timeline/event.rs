//! Trace event types consumed by the timeline packer
//!
//! Events are produced by an upstream tracer and are read-only here. The wire
//! phase is kept as [`Phase`]; layout decisions go through the closed
//! [`PhaseKind`] categories instead of comparing phase codes.

use crate::types::{InspectorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trace event phase as written in trace files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "X")]
    Complete,
    #[serde(rename = "B")]
    Begin,
    #[serde(rename = "E")]
    End,
    #[serde(rename = "I", alias = "i")]
    Instant,
    #[serde(rename = "S")]
    AsyncBegin,
    #[serde(rename = "T")]
    AsyncStepInto,
    #[serde(rename = "p")]
    AsyncStepPast,
    #[serde(rename = "F")]
    AsyncEnd,
    #[serde(rename = "b")]
    NestableAsyncBegin,
    #[serde(rename = "e")]
    NestableAsyncEnd,
    #[serde(rename = "n")]
    NestableAsyncInstant,
    #[serde(rename = "s")]
    FlowBegin,
    #[serde(rename = "t")]
    FlowStep,
    #[serde(rename = "f")]
    FlowEnd,
}

/// Layout category of a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Instant,
    SyncSpan,
    AsyncBegin,
    AsyncStep,
    AsyncEnd,
    NestableAsync,
    FlowBegin,
    FlowStep,
    FlowEnd,
}

impl Phase {
    pub fn kind(self) -> PhaseKind {
        match self {
            Phase::Complete | Phase::Begin | Phase::End => PhaseKind::SyncSpan,
            Phase::Instant => PhaseKind::Instant,
            Phase::AsyncBegin => PhaseKind::AsyncBegin,
            Phase::AsyncStepInto | Phase::AsyncStepPast => PhaseKind::AsyncStep,
            Phase::AsyncEnd => PhaseKind::AsyncEnd,
            Phase::NestableAsyncBegin | Phase::NestableAsyncEnd | Phase::NestableAsyncInstant => {
                PhaseKind::NestableAsync
            }
            Phase::FlowBegin => PhaseKind::FlowBegin,
            Phase::FlowStep => PhaseKind::FlowStep,
            Phase::FlowEnd => PhaseKind::FlowEnd,
        }
    }

    /// Single-character phase code
    pub fn code(self) -> char {
        match self {
            Phase::Complete => 'X',
            Phase::Begin => 'B',
            Phase::End => 'E',
            Phase::Instant => 'I',
            Phase::AsyncBegin => 'S',
            Phase::AsyncStepInto => 'T',
            Phase::AsyncStepPast => 'p',
            Phase::AsyncEnd => 'F',
            Phase::NestableAsyncBegin => 'b',
            Phase::NestableAsyncEnd => 'e',
            Phase::NestableAsyncInstant => 'n',
            Phase::FlowBegin => 's',
            Phase::FlowStep => 't',
            Phase::FlowEnd => 'f',
        }
    }
}

impl PhaseKind {
    pub fn is_async(self) -> bool {
        matches!(
            self,
            PhaseKind::AsyncBegin | PhaseKind::AsyncStep | PhaseKind::AsyncEnd | PhaseKind::NestableAsync
        )
    }

    pub fn is_flow(self) -> bool {
        matches!(self, PhaseKind::FlowBegin | PhaseKind::FlowStep | PhaseKind::FlowEnd)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A single recorded trace event
///
/// Times are milliseconds on the recording clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEvent {
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub start_time: f64,
    #[serde(default)]
    pub end_time: Option<f64>,
    pub phase: Phase,
    /// Async or flow id; steps of one async chain share it
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
}

impl TraceEvent {
    pub fn new(name: impl Into<String>, phase: Phase, start_time: f64, end_time: Option<f64>) -> Self {
        Self {
            name: name.into(),
            category: String::new(),
            start_time,
            end_time,
            phase,
            id: None,
            args: serde_json::Map::new(),
        }
    }

    /// A complete span `[start, end)`
    pub fn span(name: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self::new(name, Phase::Complete, start_time, Some(end_time))
    }

    pub fn instant(name: impl Into<String>, start_time: f64) -> Self {
        Self::new(name, Phase::Instant, start_time, None)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.args.insert(key.into(), value);
        self
    }

    pub fn kind(&self) -> PhaseKind {
        self.phase.kind()
    }

    /// Duration, if the event has an end time
    pub fn duration(&self) -> Option<f64> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// The `step` argument of async step events
    pub fn step_name(&self) -> Option<&str> {
        self.args.get("step").and_then(|value| value.as_str())
    }
}

/// Per-frame record for the frame bar overlay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineFrame {
    pub start_time: f64,
    pub duration: f64,
}

/// Events of one logical thread
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadData {
    pub name: String,
    #[serde(default)]
    pub events: Vec<TraceEvent>,
    /// Async step chains; every group is non-empty and shares an id
    #[serde(default)]
    pub async_groups: Vec<Vec<TraceEvent>>,
}

impl ThreadData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Everything the flame chart provider reads from one recording
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineModel {
    #[serde(default)]
    pub minimum_record_time: f64,
    #[serde(default)]
    pub maximum_record_time: f64,
    #[serde(default)]
    pub main_thread: ThreadData,
    #[serde(default)]
    pub virtual_threads: Vec<ThreadData>,
    #[serde(default)]
    pub gpu_tasks: Vec<TraceEvent>,
    #[serde(default)]
    pub frames: Vec<TimelineFrame>,
}

impl TimelineModel {
    pub fn is_empty(&self) -> bool {
        self.main_thread.events.is_empty()
            && self.main_thread.async_groups.is_empty()
            && self.virtual_threads.is_empty()
            && self.gpu_tasks.is_empty()
            && self.frames.is_empty()
    }

    /// Reject events with non-finite times or an end before their start
    pub fn validate(&self) -> Result<()> {
        let threads = std::iter::once(&self.main_thread).chain(self.virtual_threads.iter());
        let thread_events = threads.flat_map(|thread| thread.events.iter().chain(thread.async_groups.iter().flatten()));
        for event in thread_events.chain(self.gpu_tasks.iter()) {
            if !event.start_time.is_finite() {
                return Err(InspectorError::InvalidTrace(format!(
                    "event '{}' has no valid start time",
                    event.name
                )));
            }
            if let Some(end) = event.end_time {
                if end.is_nan() || end < event.start_time {
                    return Err(InspectorError::InvalidTrace(format!(
                        "event '{}' ends at {} before its start {}",
                        event.name, end, event.start_time
                    )));
                }
            }
        }
        Ok(())
    }

    /// Fill in record time bounds from the contained events
    pub fn compute_bounds(&mut self) {
        let threads = std::iter::once(&self.main_thread).chain(self.virtual_threads.iter());
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for thread in threads {
            let events = thread.events.iter().chain(thread.async_groups.iter().flatten());
            for event in events {
                min = min.min(event.start_time);
                max = max.max(event.end_time.unwrap_or(event.start_time));
            }
        }
        for event in &self.gpu_tasks {
            min = min.min(event.start_time);
            max = max.max(event.end_time.unwrap_or(event.start_time));
        }
        for frame in &self.frames {
            min = min.min(frame.start_time);
            max = max.max(frame.start_time + frame.duration);
        }
        if min.is_finite() && max.is_finite() {
            self.minimum_record_time = min;
            self.maximum_record_time = max;
        }
    }
}
