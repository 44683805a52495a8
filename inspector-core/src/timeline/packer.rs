//! Level packing for timeline events
//!
//! Two passes share this module:
//! - [`SyncPass`] stacks nested synchronous events. An event's level is the
//!   depth of the open-event stack after every event that ended at or before
//!   its start has been popped.
//! - [`AsyncPass`] places whole async step chains on tracks by first fit
//!   against a per-track watermark.
//!
//! Both passes are iterators over placements so callers can interleave their
//! own bookkeeping (headers, flow edges, entries). The `pack_*` functions
//! collect a pass into a plain [`LevelAssignment`].

use super::event::{Phase, PhaseKind, TraceEvent};
use std::collections::BTreeMap;

/// Event index to level mapping plus the number of levels used
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelAssignment {
    pub levels: BTreeMap<usize, usize>,
    pub depth: usize,
}

impl LevelAssignment {
    pub fn level_of(&self, index: usize) -> Option<usize> {
        self.levels.get(&index).copied()
    }
}

/// Where the sync pass put one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPlacement {
    /// Index into the input slice
    pub index: usize,
    /// Stack depth relative to the region base
    pub depth: usize,
    /// Flow events report a depth but never occupy it
    pub is_flow: bool,
}

/// Input indices sorted by start time, ties kept in input order
fn chronological_order<T>(items: &[T], start_time: impl Fn(&T) -> f64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    // sort_by is stable
    order.sort_by(|&a, &b| start_time(&items[a]).total_cmp(&start_time(&items[b])));
    order
}

/// Stack-discipline pass over synchronous events
pub struct SyncPass<'a, F>
where
    F: FnMut(&TraceEvent) -> bool,
{
    events: &'a [TraceEvent],
    order: Vec<usize>,
    cursor: usize,
    open_end_times: Vec<f64>,
    max_depth: usize,
    visible: F,
}

impl<'a, F> SyncPass<'a, F>
where
    F: FnMut(&TraceEvent) -> bool,
{
    pub fn new(events: &'a [TraceEvent], visible: F) -> Self {
        Self {
            events,
            order: chronological_order(events, |event| event.start_time),
            cursor: 0,
            open_end_times: Vec::new(),
            max_depth: 0,
            visible,
        }
    }

    /// Levels consumed so far by this region
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn admits(&mut self, event: &TraceEvent) -> bool {
        let kind = event.kind();
        if kind.is_flow() {
            return true;
        }
        if event.end_time.is_none() && kind != PhaseKind::Instant {
            log::trace!("Skipping unterminated event '{}' at {}", event.name, event.start_time);
            return false;
        }
        if kind.is_async() {
            return false;
        }
        (self.visible)(event)
    }
}

impl<'a, F> Iterator for SyncPass<'a, F>
where
    F: FnMut(&TraceEvent) -> bool,
{
    type Item = SyncPlacement;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.order.len() {
            let index = self.order[self.cursor];
            self.cursor += 1;
            let events = self.events;
            let event = &events[index];
            if !self.admits(event) {
                continue;
            }

            while self
                .open_end_times
                .last()
                .is_some_and(|&end| end <= event.start_time)
            {
                self.open_end_times.pop();
            }
            let depth = self.open_end_times.len();

            if event.kind().is_flow() {
                return Some(SyncPlacement { index, depth, is_flow: true });
            }

            self.max_depth = self.max_depth.max(depth + 1);
            if let Some(end) = event.end_time {
                self.open_end_times.push(end);
            }
            return Some(SyncPlacement { index, depth, is_flow: false });
        }
        None
    }
}

/// Where the async pass put one group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsyncPlacement {
    /// Index into the group slice
    pub group: usize,
    /// Track relative to the region base
    pub track: usize,
}

/// Lowest track whose watermark is at or before `start_time`.
///
/// Returns `watermarks.len()` when every track is still busy, meaning a new
/// track is needed. First fit, not best fit: low tracks fill up first.
pub fn first_fit_track(watermarks: &[f64], start_time: f64) -> usize {
    watermarks
        .iter()
        .position(|&watermark| watermark <= start_time)
        .unwrap_or(watermarks.len())
}

/// Time until which a placed group keeps its track busy
pub fn group_watermark(group: &[TraceEvent]) -> f64 {
    let (Some(first), Some(last)) = (group.first(), group.last()) else {
        return f64::NEG_INFINITY;
    };
    match first.phase {
        Phase::AsyncBegin | Phase::NestableAsyncInstant => last.start_time,
        Phase::NestableAsyncBegin => first.end_time.unwrap_or(f64::INFINITY),
        _ => f64::INFINITY,
    }
}

/// First-fit pass over async step chains
pub struct AsyncPass<'a, F>
where
    F: FnMut(&TraceEvent) -> bool,
{
    groups: &'a [Vec<TraceEvent>],
    order: Vec<usize>,
    cursor: usize,
    watermarks: Vec<f64>,
    visible: F,
}

impl<'a, F> AsyncPass<'a, F>
where
    F: FnMut(&TraceEvent) -> bool,
{
    pub fn new(groups: &'a [Vec<TraceEvent>], visible: F) -> Self {
        let order = chronological_order(groups, |group| {
            group.first().map_or(f64::INFINITY, |event| event.start_time)
        });
        Self {
            groups,
            order,
            cursor: 0,
            watermarks: Vec::new(),
            visible,
        }
    }

    /// Tracks consumed so far by this region
    pub fn track_count(&self) -> usize {
        self.watermarks.len()
    }

    pub fn watermarks(&self) -> &[f64] {
        &self.watermarks
    }
}

impl<'a, F> Iterator for AsyncPass<'a, F>
where
    F: FnMut(&TraceEvent) -> bool,
{
    type Item = AsyncPlacement;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.order.len() {
            let group_index = self.order[self.cursor];
            self.cursor += 1;
            let groups = self.groups;
            let group = &groups[group_index];
            let Some(first) = group.first() else {
                continue;
            };
            if !(self.visible)(first) {
                continue;
            }

            let track = first_fit_track(&self.watermarks, first.start_time);
            let watermark = group_watermark(group);
            if track == self.watermarks.len() {
                self.watermarks.push(watermark);
            } else {
                self.watermarks[track] = watermark;
            }
            log::trace!("Async group '{}' placed on track {}", first.name, track);
            return Some(AsyncPlacement { group: group_index, track });
        }
        None
    }
}

/// Pack synchronous events starting at `base_level`.
///
/// Flow events and skipped events are absent from the result.
pub fn pack_sync_events<F>(events: &[TraceEvent], base_level: usize, visible: F) -> LevelAssignment
where
    F: FnMut(&TraceEvent) -> bool,
{
    let mut pass = SyncPass::new(events, visible);
    let mut levels = BTreeMap::new();
    for placement in pass.by_ref() {
        if !placement.is_flow {
            levels.insert(placement.index, base_level + placement.depth);
        }
    }
    LevelAssignment {
        levels,
        depth: pass.max_depth(),
    }
}

/// Pack async groups starting at `base_level`; keys are group indices.
pub fn pack_async_groups<F>(groups: &[Vec<TraceEvent>], base_level: usize, visible: F) -> LevelAssignment
where
    F: FnMut(&TraceEvent) -> bool,
{
    let mut pass = AsyncPass::new(groups, visible);
    let mut levels = BTreeMap::new();
    for placement in pass.by_ref() {
        levels.insert(placement.group, base_level + placement.track);
    }
    LevelAssignment {
        levels,
        depth: pass.track_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(_: &TraceEvent) -> bool {
        true
    }

    #[test]
    fn test_nested_events_stack() {
        let events = vec![
            TraceEvent::span("outer", 0.0, 10.0),
            TraceEvent::span("inner", 1.0, 5.0),
            TraceEvent::span("innermost", 2.0, 3.0),
            TraceEvent::span("sibling", 5.0, 8.0),
            TraceEvent::span("next", 10.0, 12.0),
        ];
        let packed = pack_sync_events(&events, 0, all);
        assert_eq!(packed.level_of(0), Some(0));
        assert_eq!(packed.level_of(1), Some(1));
        assert_eq!(packed.level_of(2), Some(2));
        assert_eq!(packed.level_of(3), Some(1));
        assert_eq!(packed.level_of(4), Some(0));
        assert_eq!(packed.depth, 3);
    }

    #[test]
    fn test_base_level_offsets() {
        let events = vec![TraceEvent::span("a", 0.0, 2.0), TraceEvent::span("b", 1.0, 2.0)];
        let packed = pack_sync_events(&events, 7, all);
        assert_eq!(packed.level_of(0), Some(7));
        assert_eq!(packed.level_of(1), Some(8));
        assert_eq!(packed.depth, 2);
    }

    #[test]
    fn test_unterminated_events_are_skipped() {
        let events = vec![
            TraceEvent::new("open", Phase::Begin, 0.0, None),
            TraceEvent::span("closed", 1.0, 2.0),
        ];
        let packed = pack_sync_events(&events, 0, all);
        assert_eq!(packed.level_of(0), None);
        assert_eq!(packed.level_of(1), Some(0));
        assert_eq!(packed.depth, 1);
    }

    #[test]
    fn test_instants_do_not_open_a_level() {
        let events = vec![
            TraceEvent::instant("tick", 1.0),
            TraceEvent::span("work", 1.0, 3.0),
            TraceEvent::instant("tock", 2.0),
        ];
        let packed = pack_sync_events(&events, 0, all);
        assert_eq!(packed.level_of(0), Some(0));
        assert_eq!(packed.level_of(1), Some(0));
        assert_eq!(packed.level_of(2), Some(1));
    }

    #[test]
    fn test_async_and_hidden_events_are_excluded() {
        let events = vec![
            TraceEvent::new("async", Phase::AsyncBegin, 0.0, Some(5.0)),
            TraceEvent::span("hidden", 0.0, 5.0),
            TraceEvent::span("shown", 1.0, 2.0),
        ];
        let packed = pack_sync_events(&events, 0, |event| event.name != "hidden");
        assert_eq!(packed.levels.len(), 1);
        assert_eq!(packed.level_of(2), Some(0));
    }

    #[test]
    fn test_unsorted_input_uses_start_order_with_stable_ties() {
        let events = vec![
            TraceEvent::span("late", 4.0, 6.0),
            TraceEvent::span("parent", 0.0, 5.0),
            TraceEvent::span("child", 0.0, 1.0),
        ];
        let packed = pack_sync_events(&events, 0, all);
        assert_eq!(packed.level_of(1), Some(0));
        assert_eq!(packed.level_of(2), Some(1));
        assert_eq!(packed.level_of(0), Some(1));
    }

    #[test]
    fn test_flow_events_report_depth_without_consuming() {
        let events = vec![
            TraceEvent::span("task", 0.0, 4.0),
            TraceEvent::new("flow", Phase::FlowBegin, 1.0, None).with_id("1"),
        ];
        let placements: Vec<_> = SyncPass::new(&events, all).collect();
        assert_eq!(placements.len(), 2);
        assert!(placements[1].is_flow);
        assert_eq!(placements[1].depth, 1);

        let packed = pack_sync_events(&events, 0, all);
        assert_eq!(packed.depth, 1);
        assert_eq!(packed.level_of(1), None);
    }

    #[test]
    fn test_first_fit_track() {
        assert_eq!(first_fit_track(&[10.0, 5.0, 20.0], 6.0), 1);
        assert_eq!(first_fit_track(&[10.0, 5.0, 20.0], 4.0), 3);
        assert_eq!(first_fit_track(&[], 0.0), 0);
        assert_eq!(first_fit_track(&[3.0], 3.0), 0);
    }

    #[test]
    fn test_group_watermarks() {
        let chain = vec![
            TraceEvent::new("req", Phase::AsyncBegin, 1.0, None),
            TraceEvent::new("req", Phase::AsyncEnd, 9.0, None),
        ];
        assert_eq!(group_watermark(&chain), 9.0);

        let nestable = vec![TraceEvent::new("n", Phase::NestableAsyncBegin, 1.0, Some(4.0))];
        assert_eq!(group_watermark(&nestable), 4.0);

        let unterminated = vec![TraceEvent::new("n", Phase::NestableAsyncBegin, 1.0, None)];
        assert_eq!(group_watermark(&unterminated), f64::INFINITY);
    }

    #[test]
    fn test_async_groups_first_fit() {
        let group = |start: f64, end: f64| {
            vec![
                TraceEvent::new("g", Phase::AsyncBegin, start, None),
                TraceEvent::new("g", Phase::AsyncEnd, end, None),
            ]
        };
        let groups = vec![group(0.0, 10.0), group(1.0, 5.0), group(2.0, 20.0), group(6.0, 7.0)];
        let packed = pack_async_groups(&groups, 0, all);
        assert_eq!(packed.level_of(0), Some(0));
        assert_eq!(packed.level_of(1), Some(1));
        assert_eq!(packed.level_of(2), Some(2));
        // watermarks are [10, 5, 20] here
        assert_eq!(packed.level_of(3), Some(1));
        assert_eq!(packed.depth, 3);
    }

    #[test]
    fn test_unterminated_group_blocks_track() {
        let groups = vec![
            vec![TraceEvent::new("open", Phase::NestableAsyncBegin, 0.0, None)],
            vec![TraceEvent::new("later", Phase::NestableAsyncBegin, 100.0, Some(101.0))],
        ];
        let packed = pack_async_groups(&groups, 2, all);
        assert_eq!(packed.level_of(0), Some(2));
        assert_eq!(packed.level_of(1), Some(3));
    }

    #[test]
    fn test_deterministic() {
        let events: Vec<_> = (0..20)
            .map(|i| TraceEvent::span(format!("e{i}"), (i % 7) as f64, (i % 7) as f64 + (i % 3) as f64 + 0.5))
            .collect();
        let first = pack_sync_events(&events, 0, all);
        let second = pack_sync_events(&events, 0, all);
        assert_eq!(first, second);
    }
}
