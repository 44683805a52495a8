//! Promise inspection
//!
//! Records arrive as update or gc notifications per debugging target and are
//! shown as a tree that skips ancestors hidden by the status filter.

pub mod inspector;
pub mod record;
pub mod store;
pub mod tree;

pub use inspector::PromiseInspector;
pub use record::{CallFrame, PromiseDetails, PromiseEvent, PromiseEventKind, PromiseId, PromiseRecord, PromiseStatus};
pub use store::{AppliedUpdate, PromiseRecords, PromiseStore, TargetId};
pub use tree::{find_visible_ancestor, DisplayNode, DisplayRow, DisplayTree, ParentRef};
