//! Timeline layout: trace events, level packing, flow edges and the flame
//! chart provider built on top of them.

pub mod event;
pub mod flame_chart;
pub mod flow;
pub mod packer;

// Re-export key types for convenience
pub use event::{Phase, PhaseKind, ThreadData, TimelineFrame, TimelineModel, TraceEvent};
pub use flame_chart::{
    EntrySource, EventFilter, ExclusiveNameFilter, FlameChartDataProvider, Marker, TimelineData,
};
pub use flow::{FlowEdge, FlowTracker};
pub use packer::{
    first_fit_track, pack_async_groups, pack_sync_events, AsyncPass, LevelAssignment, SyncPass,
};
