//! Per-target promise record storage
//!
//! Records live in an insertion-ordered map per debugging target. Entries are
//! only added or updated; the only removal is dropping a whole target's map
//! (navigation, explicit clear, target removal).

use super::record::{PromiseEvent, PromiseEventKind, PromiseId, PromiseRecord, PromiseStatus};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;

/// Identifies one debugging target (page, worker, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        TargetId(id.into())
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Insertion-ordered records of one target
pub type PromiseRecords = IndexMap<PromiseId, PromiseRecord>;

/// Outcome of applying one notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedUpdate {
    pub id: PromiseId,
    /// Status before the update; `None` for a first sighting
    pub previous_status: Option<PromiseStatus>,
    pub status: PromiseStatus,
}

#[derive(Debug, Default)]
pub struct PromiseStore {
    by_target: HashMap<TargetId, PromiseRecords>,
}

impl PromiseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update the record named by `event`
    pub fn apply(&mut self, target: &TargetId, event: PromiseEvent) -> AppliedUpdate {
        let records = self.by_target.entry(target.clone()).or_default();
        let id = event.promise.id;
        let mut status = event.promise.status;
        let collected = event.event_type == PromiseEventKind::Gc;

        let previous_status = match records.get_mut(&id) {
            Some(record) => {
                let previous = record.status();
                if previous.is_settled() && previous != status {
                    log::warn!("Promise {} already {}, ignoring status {}", id, previous, status);
                    status = previous;
                }
                record.details = event.promise;
                record.details.status = status;
                record.is_garbage_collected |= collected;
                Some(previous)
            }
            None => {
                records.insert(
                    id,
                    PromiseRecord {
                        details: event.promise,
                        is_garbage_collected: collected,
                    },
                );
                None
            }
        };

        log::debug!("Promise {} on {}: {:?} -> {}", id, target, previous_status, status);
        AppliedUpdate {
            id,
            previous_status,
            status,
        }
    }

    pub fn records(&self, target: &TargetId) -> Option<&PromiseRecords> {
        self.by_target.get(target)
    }

    pub fn contains_target(&self, target: &TargetId) -> bool {
        self.by_target.contains_key(target)
    }

    /// Drop every record of a target
    pub fn remove_target(&mut self, target: &TargetId) -> bool {
        self.by_target.remove(target).is_some()
    }

    pub fn clear(&mut self) {
        self.by_target.clear();
    }
}
