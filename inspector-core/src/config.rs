//! Kernel configuration types
//!
//! This module defines the knobs the timeline provider and the promise
//! inspector read. Both structs deserialize from the `[timeline]` and
//! `[promises]` sections of the CLI config file.

use crate::promises::PromiseStatus;
use serde::{Deserialize, Serialize};

/// Visible width given to instant events that carry no duration.
///
/// Must stay below any real recorded duration so instants never look longer
/// than the spans around them.
pub const INSTANT_EVENT_VISIBLE_DURATION_MS: f64 = 0.001;

/// Largest instant width a config may ask for
pub const MAX_INSTANT_EVENT_VISIBLE_DURATION_MS: f64 = 0.1;

/// Configuration for the flame chart data provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Rendered duration for instant events without one
    #[serde(default = "default_instant_duration")]
    pub instant_visible_duration_ms: f64,

    /// Whether to collect flow edges between events
    #[serde(default)]
    pub flow_events: bool,

    /// Whether to append the GPU task region
    #[serde(default)]
    pub gpu_timeline: bool,

    /// Event names never shown on the chart
    #[serde(default)]
    pub hidden_events: Vec<String>,

    /// Event names that produce timeline markers
    #[serde(default = "default_marker_events")]
    pub marker_events: Vec<String>,
}

fn default_instant_duration() -> f64 {
    INSTANT_EVENT_VISIBLE_DURATION_MS
}

fn default_marker_events() -> Vec<String> {
    ["MarkDOMContent", "MarkLoad", "MarkFirstPaint", "TimeStamp"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            instant_visible_duration_ms: default_instant_duration(),
            flow_events: false,
            gpu_timeline: false,
            hidden_events: Vec::new(),
            marker_events: default_marker_events(),
        }
    }
}

impl TimelineConfig {
    /// Create a new timeline configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: enable or disable flow edge collection
    pub fn with_flow_events(mut self, enabled: bool) -> Self {
        self.flow_events = enabled;
        self
    }

    /// Builder method: enable or disable the GPU region
    pub fn with_gpu_timeline(mut self, enabled: bool) -> Self {
        self.gpu_timeline = enabled;
        self
    }

    /// Builder method: hide events with the given name
    pub fn hide_event(mut self, name: impl Into<String>) -> Self {
        self.hidden_events.push(name.into());
        self
    }

    /// Builder method: replace the marker event names
    pub fn with_marker_events(mut self, names: Vec<String>) -> Self {
        self.marker_events = names;
        self
    }

    /// Builder method: override the instant event width
    ///
    /// The value is stored as given; `instant_duration` clamps it.
    pub fn with_instant_duration(mut self, duration_ms: f64) -> Self {
        self.instant_visible_duration_ms = duration_ms;
        self
    }

    /// Instant event width actually used for layout.
    ///
    /// Non-positive or non-finite values fall back to the default, large
    /// ones are capped at `MAX_INSTANT_EVENT_VISIBLE_DURATION_MS`.
    pub fn instant_duration(&self) -> f64 {
        let duration = self.instant_visible_duration_ms;
        if duration.is_finite() && duration > 0.0 {
            duration.min(MAX_INSTANT_EVENT_VISIBLE_DURATION_MS)
        } else {
            INSTANT_EVENT_VISIBLE_DURATION_MS
        }
    }

    /// Check if an event name produces a marker
    pub fn is_marker_event(&self, name: &str) -> bool {
        self.marker_events.iter().any(|marker| marker == name)
    }
}

/// Status filter for the promise inspector
///
/// An empty list accepts every status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromiseFilterConfig {
    #[serde(default)]
    pub statuses: Vec<PromiseStatus>,
}

impl PromiseFilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: allow a status through the filter
    pub fn allow(mut self, status: PromiseStatus) -> Self {
        if !self.statuses.contains(&status) {
            self.statuses.push(status);
        }
        self
    }

    /// Check if a status passes the filter
    pub fn accept(&self, status: PromiseStatus) -> bool {
        self.statuses.is_empty() || self.statuses.contains(&status)
    }
}
