//! Promise inspector state
//!
//! Owns the per-target record store and the display tree for the target
//! currently being looked at. Every notification runs to completion before
//! the next one; a target switch or filter change rebuilds the tree from the
//! records, which is the only way stale layout is ever discarded.

use super::record::{PromiseEvent, PromiseStatus};
use super::store::{PromiseRecords, PromiseStore, TargetId};
use super::tree::DisplayTree;
use crate::config::PromiseFilterConfig;

#[derive(Debug, Default)]
pub struct PromiseInspector {
    store: PromiseStore,
    tree: DisplayTree,
    current_target: Option<TargetId>,
    filter: PromiseFilterConfig,
    hidden_by_filter_count: usize,
}

impl PromiseInspector {
    pub fn new(filter: PromiseFilterConfig) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Record a notification and, for the current target, update the tree
    pub fn on_promise_updated(&mut self, target: &TargetId, event: PromiseEvent) {
        let applied = self.store.apply(target, event);
        if self.current_target.as_ref() != Some(target) {
            return;
        }

        let filter = &self.filter;
        let is_visible = |status: PromiseStatus| filter.accept(status);
        if let Some(records) = self.store.records(target) {
            self.tree.attach(applied.id, records, &is_visible);
        }

        let was_visible = applied.previous_status.map_or(true, |status| filter.accept(status));
        let now_visible = filter.accept(applied.status);
        if was_visible && !now_visible {
            self.hidden_by_filter_count += 1;
        } else if !was_visible && now_visible {
            self.hidden_by_filter_count = self.hidden_by_filter_count.saturating_sub(1);
        }
    }

    /// Switch the inspected target and rebuild its tree
    pub fn set_current_target(&mut self, target: TargetId) {
        if self.current_target.as_ref() == Some(&target) {
            return;
        }
        log::info!("Inspecting promises of target {}", target);
        self.current_target = Some(target);
        self.refresh();
    }

    pub fn current_target(&self) -> Option<&TargetId> {
        self.current_target.as_ref()
    }

    pub fn target_removed(&mut self, target: &TargetId) {
        self.store.remove_target(target);
        if self.current_target.as_ref() == Some(target) {
            self.clear_tree();
            self.current_target = None;
        }
    }

    /// Navigation wipes the target's records
    pub fn main_frame_navigated(&mut self, target: &TargetId) {
        self.store.remove_target(target);
        if self.current_target.as_ref() == Some(target) {
            self.clear_tree();
        }
    }

    /// Drop the current target's records and empty the tree
    pub fn clear(&mut self) {
        self.clear_tree();
        if let Some(target) = &self.current_target {
            self.store.remove_target(target);
        }
    }

    pub fn set_status_filter(&mut self, filter: PromiseFilterConfig) {
        self.filter = filter;
        self.refresh();
    }

    pub fn reset_filters(&mut self) {
        self.set_status_filter(PromiseFilterConfig::default());
    }

    pub fn filter(&self) -> &PromiseFilterConfig {
        &self.filter
    }

    /// Rebuild the tree of the current target from its records
    pub fn refresh(&mut self) {
        self.clear_tree();
        let Some(target) = &self.current_target else {
            return;
        };
        let Some(records) = self.store.records(target) else {
            return;
        };
        let filter = &self.filter;
        let is_visible = |status: PromiseStatus| filter.accept(status);
        self.hidden_by_filter_count = self.tree.rebuild(records, &is_visible);
    }

    fn clear_tree(&mut self) {
        self.hidden_by_filter_count = 0;
        self.tree.clear();
    }

    pub fn tree(&self) -> &DisplayTree {
        &self.tree
    }

    pub fn records(&self) -> Option<&PromiseRecords> {
        self.store.records(self.current_target.as_ref()?)
    }

    pub fn store(&self) -> &PromiseStore {
        &self.store
    }

    pub fn hidden_by_filter_count(&self) -> usize {
        self.hidden_by_filter_count
    }

    /// Status line shown while filters hide anything
    pub fn filter_status(&self) -> Option<String> {
        match self.hidden_by_filter_count {
            0 => None,
            1 => Some("1 promise is hidden by filters.".to_string()),
            n => Some(format!("{} promises are hidden by filters.", n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promises::record::PromiseDetails;
    use crate::promises::tree::ParentRef;

    fn update(id: u64, parent: Option<u64>, status: PromiseStatus) -> PromiseEvent {
        PromiseEvent::update(PromiseDetails::new(id, parent, status))
    }

    fn page() -> TargetId {
        TargetId::new("page")
    }

    fn inspector() -> PromiseInspector {
        let mut inspector = PromiseInspector::new(PromiseFilterConfig::new());
        inspector.set_current_target(page());
        inspector
    }

    #[test]
    fn test_updates_build_tree() {
        let mut inspector = inspector();
        inspector.on_promise_updated(&page(), update(1, None, PromiseStatus::Pending));
        inspector.on_promise_updated(&page(), update(2, Some(1), PromiseStatus::Pending));
        inspector.on_promise_updated(&page(), update(3, Some(2), PromiseStatus::Pending));

        let tree = inspector.tree();
        assert_eq!(tree.roots(), &[1]);
        assert_eq!(tree.parent_of(3), Some(ParentRef::Promise(2)));
    }

    #[test]
    fn test_out_of_order_child_is_reparented() {
        let mut inspector = inspector();
        inspector.on_promise_updated(&page(), update(2, Some(1), PromiseStatus::Pending));
        assert_eq!(inspector.tree().parent_of(2), Some(ParentRef::Root));

        inspector.on_promise_updated(&page(), update(1, None, PromiseStatus::Pending));
        assert_eq!(inspector.tree().roots(), &[1]);
        assert_eq!(inspector.tree().parent_of(2), Some(ParentRef::Promise(1)));
    }

    #[test]
    fn test_hidden_counter_tracks_status_changes() {
        let filter = PromiseFilterConfig::new().allow(PromiseStatus::Pending);
        let mut inspector = PromiseInspector::new(filter);
        inspector.set_current_target(page());

        inspector.on_promise_updated(&page(), update(1, None, PromiseStatus::Pending));
        assert_eq!(inspector.filter_status(), None);

        inspector.on_promise_updated(&page(), update(1, None, PromiseStatus::Resolved));
        assert_eq!(inspector.hidden_by_filter_count(), 1);
        assert_eq!(inspector.filter_status().as_deref(), Some("1 promise is hidden by filters."));
        assert!(inspector.tree().is_empty());

        inspector.on_promise_updated(&page(), update(2, None, PromiseStatus::Rejected));
        assert_eq!(inspector.filter_status().as_deref(), Some("2 promises are hidden by filters."));

        inspector.reset_filters();
        assert_eq!(inspector.hidden_by_filter_count(), 0);
        assert_eq!(inspector.tree().len(), 2);
    }

    #[test]
    fn test_other_targets_do_not_touch_tree() {
        let mut inspector = inspector();
        let worker = TargetId::new("worker");
        inspector.on_promise_updated(&worker, update(1, None, PromiseStatus::Pending));
        assert!(inspector.tree().is_empty());

        inspector.set_current_target(worker.clone());
        assert_eq!(inspector.tree().len(), 1);
        assert_eq!(inspector.current_target(), Some(&worker));
    }

    #[test]
    fn test_navigation_and_clear_reset_state() {
        let mut inspector = inspector();
        inspector.on_promise_updated(&page(), update(1, None, PromiseStatus::Pending));
        inspector.main_frame_navigated(&page());
        assert!(inspector.tree().is_empty());
        assert!(inspector.records().is_none());

        inspector.on_promise_updated(&page(), update(7, None, PromiseStatus::Pending));
        inspector.clear();
        assert!(inspector.tree().is_empty());
        assert!(!inspector.store().contains_target(&page()));

        inspector.on_promise_updated(&page(), update(8, None, PromiseStatus::Pending));
        inspector.target_removed(&page());
        assert_eq!(inspector.current_target(), None);
        assert!(inspector.tree().is_empty());
    }
}
