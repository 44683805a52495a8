//! Flame chart data provider
//!
//! Turns a [`TimelineModel`] into flat, index-aligned entry arrays (level,
//! start time, total time) plus markers and flow edges. Levels are laid out
//! top to bottom as:
//!
//! 1. one frame bar level
//! 2. the main thread: async tracks, then the sync stack
//! 3. GPU tasks, when enabled
//! 4. every virtual thread, like the main thread
//!
//! A thread that contributes anything gets a header entry on its own level
//! and one spacer level after it. The whole layout is computed lazily on the
//! first [`FlameChartDataProvider::timeline_data`] call and thrown away by
//! [`FlameChartDataProvider::reset`]; there is no incremental update.

use super::event::{Phase, PhaseKind, ThreadData, TimelineFrame, TimelineModel, TraceEvent};
use super::flow::{FlowEdge, FlowTracker};
use super::packer::{AsyncPass, SyncPass};
use crate::config::TimelineConfig;
use crate::format::millis_to_string;

/// Title used for the main thread when the model leaves it unnamed
pub const MAIN_THREAD_TITLE: &str = "Main Thread";

/// Visibility predicate applied to every event before layout
pub trait EventFilter {
    fn accept(&self, event: &TraceEvent) -> bool;
}

impl<F> EventFilter for F
where
    F: Fn(&TraceEvent) -> bool,
{
    fn accept(&self, event: &TraceEvent) -> bool {
        self(event)
    }
}

/// Rejects events whose name is in the list
#[derive(Debug, Clone, Default)]
pub struct ExclusiveNameFilter {
    excluded: Vec<String>,
}

impl ExclusiveNameFilter {
    pub fn new(excluded: Vec<String>) -> Self {
        Self { excluded }
    }
}

impl EventFilter for ExclusiveNameFilter {
    fn accept(&self, event: &TraceEvent) -> bool {
        !self.excluded.iter().any(|name| *name == event.name)
    }
}

/// What a chart entry was built from
#[derive(Debug, Clone, PartialEq)]
pub enum EntrySource {
    Event(TraceEvent),
    Header(String),
    Frame(TimelineFrame),
}

/// A vertical marker on the time axis
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub start_time: f64,
    /// Offset from the start of the recording
    pub start_offset: f64,
    pub label: String,
}

impl Marker {
    pub fn title(&self) -> String {
        format!("{} at {}", self.label, millis_to_string(self.start_offset, false))
    }
}

/// Index-aligned layout arrays
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineData {
    pub entry_levels: Vec<usize>,
    pub entry_start_times: Vec<f64>,
    pub entry_total_times: Vec<f64>,
    pub flows: Vec<FlowEdge>,
    pub markers: Vec<Marker>,
}

impl TimelineData {
    pub fn len(&self) -> usize {
        self.entry_levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_levels.is_empty()
    }
}

/// Result of one full layout pass
#[derive(Debug, Clone)]
struct FlameChart {
    data: TimelineData,
    entries: Vec<EntrySource>,
    max_stack_depth: usize,
    frame_bars_level: usize,
}

/// Lazily computed flame chart over an owned timeline model
pub struct FlameChartDataProvider {
    model: TimelineModel,
    config: TimelineConfig,
    filters: Vec<Box<dyn EventFilter>>,
    chart: Option<FlameChart>,
}

impl FlameChartDataProvider {
    /// Create a provider with the default hidden-name and `Program` filters
    pub fn new(model: TimelineModel, config: TimelineConfig) -> Self {
        let mut provider = Self {
            model,
            filters: Vec::new(),
            chart: None,
            config,
        };
        provider.add_filter(Box::new(ExclusiveNameFilter::new(provider.config.hidden_events.clone())));
        provider.add_filter(Box::new(ExclusiveNameFilter::new(vec!["Program".to_string()])));
        provider
    }

    pub fn add_filter(&mut self, filter: Box<dyn EventFilter>) {
        self.filters.push(filter);
        self.chart = None;
    }

    /// Replace the model; the next query re-packs everything
    pub fn set_model(&mut self, model: TimelineModel) {
        self.model = model;
        self.reset();
    }

    pub fn model(&self) -> &TimelineModel {
        &self.model
    }

    /// Discard the computed layout
    pub fn reset(&mut self) {
        self.chart = None;
    }

    /// Layout arrays, computing them if needed
    pub fn timeline_data(&mut self) -> &TimelineData {
        let chart = self
            .chart
            .get_or_insert_with(|| ChartBuilder::new(&self.model, &self.config, &self.filters).build());
        &chart.data
    }

    pub fn is_computed(&self) -> bool {
        self.chart.is_some()
    }

    /// Start of the recording
    pub fn minimum_boundary(&self) -> f64 {
        self.model.minimum_record_time
    }

    /// Length of the recording, 1000 ms for an empty model
    pub fn total_time(&self) -> f64 {
        time_span(&self.model)
    }

    /// Number of levels in the computed layout
    pub fn max_stack_depth(&self) -> usize {
        self.chart.as_ref().map_or(0, |chart| chart.max_stack_depth)
    }

    pub fn frame_bars_level(&self) -> Option<usize> {
        self.chart.as_ref().map(|chart| chart.frame_bars_level)
    }

    pub fn entry(&self, index: usize) -> Option<&EntrySource> {
        self.chart.as_ref()?.entries.get(index)
    }

    pub fn entry_title(&self, index: usize) -> Option<String> {
        let title = match self.entry(index)? {
            EntrySource::Event(event) if event.kind() == PhaseKind::AsyncStep => {
                format!("{}:{}", event.name, event.step_name().unwrap_or_default())
            }
            EntrySource::Event(event) => event.name.clone(),
            EntrySource::Header(title) => title.clone(),
            EntrySource::Frame(frame) => millis_to_string(frame.duration, true),
        };
        Some(title)
    }

    /// `(start, end)` of an entry
    pub fn highlight_time_range(&self, index: usize) -> Option<(f64, f64)> {
        let data = &self.chart.as_ref()?.data;
        let start = *data.entry_start_times.get(index)?;
        let total = *data.entry_total_times.get(index)?;
        Some((start, start + total))
    }

    /// First entry built from an event with this name and start time
    pub fn entry_index_for_event(&self, name: &str, start_time: f64) -> Option<usize> {
        self.chart.as_ref()?.entries.iter().position(|entry| match entry {
            EntrySource::Event(event) => event.name == name && event.start_time == start_time,
            _ => false,
        })
    }
}

fn time_span(model: &TimelineModel) -> f64 {
    if model.is_empty() {
        1000.0
    } else {
        model.maximum_record_time - model.minimum_record_time
    }
}

/// One layout pass; consumed by `build`
struct ChartBuilder<'a> {
    model: &'a TimelineModel,
    config: &'a TimelineConfig,
    filters: &'a [Box<dyn EventFilter>],
    data: TimelineData,
    entries: Vec<EntrySource>,
    flows: FlowTracker,
    current_level: usize,
    frame_bars_level: usize,
    minimum_boundary: f64,
    time_span: f64,
}

impl<'a> ChartBuilder<'a> {
    fn new(model: &'a TimelineModel, config: &'a TimelineConfig, filters: &'a [Box<dyn EventFilter>]) -> Self {
        Self {
            model,
            config,
            filters,
            data: TimelineData::default(),
            entries: Vec::new(),
            flows: FlowTracker::new(),
            current_level: 0,
            frame_bars_level: 0,
            minimum_boundary: model.minimum_record_time,
            time_span: time_span(model),
        }
    }

    fn build(mut self) -> FlameChart {
        log::debug!("Building flame chart layout");
        let model = self.model;

        self.append_frame_bars(&model.frames);

        let main_title = if model.main_thread.name.is_empty() {
            MAIN_THREAD_TITLE
        } else {
            model.main_thread.name.as_str()
        };
        self.append_thread(main_title, &model.main_thread);

        if self.config.gpu_timeline && self.append_sync_events(Some("GPU"), &model.gpu_tasks) {
            self.current_level += 1;
        }

        for thread in &model.virtual_threads {
            self.append_thread(&thread.name, thread);
        }

        // stable: equal start times keep discovery order
        self.data
            .markers
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        self.data.flows = self.flows.into_edges();

        log::debug!(
            "Flame chart layout: {} entries over {} levels",
            self.entries.len(),
            self.current_level
        );
        FlameChart {
            data: self.data,
            entries: self.entries,
            max_stack_depth: self.current_level,
            frame_bars_level: self.frame_bars_level,
        }
    }

    fn append_thread(&mut self, title: &str, thread: &ThreadData) {
        let mut level_count = self.append_async_events(title, &thread.async_groups);
        let sync_header = if level_count > 0 { None } else { Some(title) };
        if self.append_sync_events(sync_header, &thread.events) {
            level_count += 1;
        }
        if level_count > 0 {
            self.current_level += 1;
        }
    }

    /// Returns whether the region consumed any level
    fn append_sync_events(&mut self, header: Option<&str>, events: &[TraceEvent]) -> bool {
        for event in events {
            if self.config.is_marker_event(&event.name) {
                self.push_marker(event.start_time, &event.name);
            }
        }

        let filters = self.filters;
        let mut pass = SyncPass::new(events, |event: &TraceEvent| filters.iter().all(|f| f.accept(event)));
        let mut header_appended = false;
        for placement in pass.by_ref() {
            let event = &events[placement.index];
            if placement.is_flow {
                if self.config.flow_events {
                    self.flows.record(event, self.current_level + placement.depth);
                }
                continue;
            }
            if !header_appended {
                if let Some(title) = header {
                    self.append_header(title);
                }
                header_appended = true;
            }
            let level = self.current_level + placement.depth;
            self.append_event(event, level);
        }

        let max_depth = pass.max_depth();
        self.current_level += max_depth;
        max_depth > 0
    }

    /// Returns the number of tracks consumed
    fn append_async_events(&mut self, header: &str, groups: &[Vec<TraceEvent>]) -> usize {
        let filters = self.filters;
        let mut pass = AsyncPass::new(groups, |event: &TraceEvent| filters.iter().all(|f| f.accept(event)));
        let mut header_appended = false;
        for placement in pass.by_ref() {
            if !header_appended {
                self.append_header(header);
                header_appended = true;
            }
            let level = self.current_level + placement.track;
            let group = &groups[placement.group];
            match group.first() {
                Some(first) if first.kind() == PhaseKind::NestableAsync => self.append_event(first, level),
                _ => self.append_async_steps(group, level),
            }
        }

        let track_count = pass.track_count();
        self.current_level += track_count;
        track_count
    }

    fn append_frame_bars(&mut self, frames: &[TimelineFrame]) {
        self.frame_bars_level = self.current_level;
        self.current_level += 1;
        for frame in frames {
            self.push_marker(frame.start_time, "Frame");
            self.push_entry(EntrySource::Frame(*frame), self.frame_bars_level, frame.start_time, frame.duration);
        }
    }

    fn append_header(&mut self, title: &str) {
        let level = self.current_level;
        self.current_level += 1;
        self.push_entry(
            EntrySource::Header(title.to_string()),
            level,
            self.minimum_boundary,
            self.time_span,
        );
    }

    fn append_event(&mut self, event: &TraceEvent, level: usize) {
        let total = match event.duration() {
            Some(duration) if duration > 0.0 => duration,
            _ => self.config.instant_duration(),
        };
        self.push_entry(EntrySource::Event(event.clone()), level, event.start_time, total);
    }

    /// One entry per span between consecutive steps.
    ///
    /// With step-past chains each span is labelled by the step that ends it.
    fn append_async_steps(&mut self, steps: &[TraceEvent], level: usize) {
        if steps.len() < 2 {
            return;
        }
        let offset = usize::from(steps[1].phase == Phase::AsyncStepPast);
        for i in 0..steps.len() - 1 {
            let start = steps[i].start_time;
            let total = steps[i + 1].start_time - start;
            self.push_entry(EntrySource::Event(steps[i + offset].clone()), level, start, total);
        }
    }

    fn push_entry(&mut self, source: EntrySource, level: usize, start: f64, total: f64) {
        self.entries.push(source);
        self.data.entry_levels.push(level);
        self.data.entry_start_times.push(start);
        self.data.entry_total_times.push(total);
    }

    fn push_marker(&mut self, start_time: f64, label: &str) {
        self.data.markers.push(Marker {
            start_time,
            start_offset: start_time - self.model.minimum_record_time,
            label: label.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(model: TimelineModel) -> FlameChartDataProvider {
        FlameChartDataProvider::new(model, TimelineConfig::new())
    }

    #[test]
    fn test_empty_model_has_only_frame_bars() {
        let mut provider = provider(TimelineModel::default());
        assert!(provider.timeline_data().is_empty());
        assert_eq!(provider.max_stack_depth(), 1);
        assert_eq!(provider.total_time(), 1000.0);
    }

    #[test]
    fn test_main_thread_layout() {
        let mut model = TimelineModel::default();
        model.main_thread.events = vec![TraceEvent::span("outer", 0.0, 10.0), TraceEvent::span("inner", 2.0, 4.0)];
        model.compute_bounds();

        let mut provider = provider(model);
        let data = provider.timeline_data().clone();
        // header, outer, inner
        assert_eq!(data.entry_levels, vec![1, 2, 3]);
        assert_eq!(data.entry_start_times, vec![0.0, 0.0, 2.0]);
        assert_eq!(data.entry_total_times, vec![10.0, 10.0, 2.0]);
        assert_eq!(provider.entry_title(0).as_deref(), Some(MAIN_THREAD_TITLE));
        // frame bars + header + 2 stack levels + spacer
        assert_eq!(provider.max_stack_depth(), 5);
    }

    #[test]
    fn test_async_region_precedes_sync_region() {
        let mut model = TimelineModel::default();
        model.main_thread.async_groups = vec![vec![
            TraceEvent::new("load", Phase::AsyncBegin, 0.0, None),
            TraceEvent::new("load", Phase::AsyncStepInto, 3.0, None).with_arg("step", serde_json::json!("parse")),
            TraceEvent::new("load", Phase::AsyncEnd, 5.0, None),
        ]];
        model.main_thread.events = vec![TraceEvent::span("task", 1.0, 2.0)];
        model.compute_bounds();

        let mut provider = provider(model);
        let data = provider.timeline_data().clone();
        // header at 1, two step spans at 2, sync task at 3 without its own header
        assert_eq!(data.entry_levels, vec![1, 2, 2, 3]);
        assert_eq!(data.entry_total_times[1], 3.0);
        assert_eq!(data.entry_total_times[2], 2.0);
        assert_eq!(provider.entry_title(2).as_deref(), Some("load:parse"));
        assert_eq!(provider.max_stack_depth(), 5);
    }

    #[test]
    fn test_step_past_entries_use_following_step() {
        let mut model = TimelineModel::default();
        model.main_thread.async_groups = vec![vec![
            TraceEvent::new("fetch", Phase::AsyncBegin, 0.0, None),
            TraceEvent::new("fetch", Phase::AsyncStepPast, 2.0, None).with_arg("step", serde_json::json!("sent")),
            TraceEvent::new("fetch", Phase::AsyncEnd, 6.0, None),
        ]];
        let mut provider = provider(model);
        provider.timeline_data();
        assert_eq!(provider.entry_title(1).as_deref(), Some("fetch:sent"));
        match provider.entry(2) {
            Some(EntrySource::Event(event)) => assert_eq!(event.phase, Phase::AsyncEnd),
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_instant_gets_visible_duration() {
        let mut model = TimelineModel::default();
        model.main_thread.events = vec![TraceEvent::instant("tick", 1.0)];
        let mut provider = provider(model);
        let data = provider.timeline_data().clone();
        assert_eq!(data.entry_total_times[1], crate::config::INSTANT_EVENT_VISIBLE_DURATION_MS);
    }

    #[test]
    fn test_filters_hide_events() {
        let mut model = TimelineModel::default();
        model.main_thread.events = vec![TraceEvent::span("Program", 0.0, 10.0), TraceEvent::span("Layout", 1.0, 2.0)];
        let config = TimelineConfig::new().hide_event("Paint");
        let mut provider = FlameChartDataProvider::new(model, config);
        provider.add_filter(Box::new(|event: &TraceEvent| event.start_time >= 0.0));
        let data = provider.timeline_data().clone();
        assert_eq!(data.len(), 2);
        assert_eq!(data.entry_levels, vec![1, 2]);
    }

    #[test]
    fn test_frames_and_markers() {
        let mut model = TimelineModel::default();
        model.frames = vec![
            TimelineFrame { start_time: 16.0, duration: 16.0 },
            TimelineFrame { start_time: 0.0, duration: 16.0 },
        ];
        model.main_thread.events = vec![TraceEvent::instant("MarkLoad", 8.0)];
        model.compute_bounds();

        let mut provider = provider(model);
        let data = provider.timeline_data().clone();
        assert_eq!(provider.frame_bars_level(), Some(0));
        assert_eq!(&data.entry_levels[..2], &[0, 0]);
        let starts: Vec<f64> = data.markers.iter().map(|m| m.start_time).collect();
        assert_eq!(starts, vec![0.0, 8.0, 16.0]);
        assert_eq!(data.markers[1].label, "MarkLoad");
        assert_eq!(provider.entry_title(0).as_deref(), Some("16.000\u{2009}ms"));
    }

    #[test]
    fn test_flow_edges_collected_when_enabled() {
        let mut model = TimelineModel::default();
        model.main_thread.events = vec![
            TraceEvent::span("post", 0.0, 1.0),
            TraceEvent::new("flow", Phase::FlowBegin, 0.5, None).with_id("7"),
            TraceEvent::span("run", 5.0, 6.0),
            TraceEvent::new("flow", Phase::FlowEnd, 5.5, None).with_id("7"),
        ];
        let config = TimelineConfig::new().with_flow_events(true);
        let mut provider = FlameChartDataProvider::new(model.clone(), config);
        let data = provider.timeline_data().clone();
        assert_eq!(data.len(), 3);
        assert_eq!(data.flows.len(), 1);
        assert_eq!(data.flows[0].start_level, 3);
        assert_eq!(data.flows[0].end_time, Some(5.5));

        let mut disabled = FlameChartDataProvider::new(model, TimelineConfig::new());
        assert!(disabled.timeline_data().flows.is_empty());
    }

    #[test]
    fn test_gpu_and_virtual_threads() {
        let mut model = TimelineModel::default();
        model.gpu_tasks = vec![TraceEvent::span("GPUTask", 0.0, 1.0)];
        let mut worker = ThreadData::new("Worker");
        worker.events = vec![TraceEvent::span("job", 0.0, 1.0)];
        model.virtual_threads.push(worker);

        let config = TimelineConfig::new().with_gpu_timeline(true);
        let mut provider = FlameChartDataProvider::new(model, config);
        let data = provider.timeline_data().clone();
        // main thread is empty: GPU header 1, task 2, spacer, Worker header 4, job 5, spacer
        assert_eq!(data.entry_levels, vec![1, 2, 4, 5]);
        assert_eq!(provider.entry_title(2).as_deref(), Some("Worker"));
        assert_eq!(provider.max_stack_depth(), 7);
    }

    #[test]
    fn test_reset_and_queries() {
        let mut model = TimelineModel::default();
        model.main_thread.events = vec![TraceEvent::span("Layout", 3.0, 7.0), TraceEvent::span("Layout", 8.0, 9.0)];
        let mut provider = provider(model);
        assert!(!provider.is_computed());
        provider.timeline_data();
        assert_eq!(provider.entry_index_for_event("Layout", 3.0), Some(1));
        assert_eq!(provider.entry_index_for_event("Layout", 8.0), Some(2));
        assert_eq!(provider.entry_index_for_event("Paint", 3.0), None);
        assert_eq!(provider.highlight_time_range(1), Some((3.0, 7.0)));

        provider.reset();
        assert!(!provider.is_computed());
        assert_eq!(provider.entry(1), None);
    }
}
