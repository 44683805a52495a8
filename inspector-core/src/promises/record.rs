//! Promise lifecycle records as delivered by the debugger

use serde::{Deserialize, Serialize};
use std::fmt;

pub type PromiseId = u64;

/// Settlement state of a promise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromiseStatus {
    Pending,
    Resolved,
    Rejected,
}

impl PromiseStatus {
    /// Label shown in the status column
    pub fn title(self) -> &'static str {
        match self {
            PromiseStatus::Pending => "Pending",
            PromiseStatus::Resolved => "Fulfilled",
            PromiseStatus::Rejected => "Rejected",
        }
    }

    pub fn is_settled(self) -> bool {
        self != PromiseStatus::Pending
    }
}

impl fmt::Display for PromiseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromiseStatus::Pending => write!(f, "pending"),
            PromiseStatus::Resolved => write!(f, "resolved"),
            PromiseStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Source location of a stack frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    #[serde(default)]
    pub function_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub line_number: u32,
    #[serde(default)]
    pub column_number: u32,
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.url, self.line_number, self.column_number)
    }
}

/// One update notification payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromiseDetails {
    pub id: PromiseId,
    #[serde(default)]
    pub parent_id: Option<PromiseId>,
    pub status: PromiseStatus,
    #[serde(default)]
    pub call_frame: Option<CallFrame>,
    #[serde(default)]
    pub creation_stack: Vec<CallFrame>,
    #[serde(default)]
    pub settlement_stack: Vec<CallFrame>,
    #[serde(default)]
    pub creation_time: Option<f64>,
    #[serde(default)]
    pub settlement_time: Option<f64>,
}

impl PromiseDetails {
    pub fn new(id: PromiseId, parent_id: Option<PromiseId>, status: PromiseStatus) -> Self {
        Self {
            id,
            parent_id,
            status,
            call_frame: None,
            creation_stack: Vec::new(),
            settlement_stack: Vec::new(),
            creation_time: None,
            settlement_time: None,
        }
    }
}

/// Kind of promise notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromiseEventKind {
    Update,
    Gc,
}

/// A notification from the promise tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromiseEvent {
    #[serde(default = "default_kind")]
    pub event_type: PromiseEventKind,
    pub promise: PromiseDetails,
}

fn default_kind() -> PromiseEventKind {
    PromiseEventKind::Update
}

impl PromiseEvent {
    pub fn update(promise: PromiseDetails) -> Self {
        Self {
            event_type: PromiseEventKind::Update,
            promise,
        }
    }

    pub fn gc(promise: PromiseDetails) -> Self {
        Self {
            event_type: PromiseEventKind::Gc,
            promise,
        }
    }
}

/// Stored state of one promise
#[derive(Debug, Clone, PartialEq)]
pub struct PromiseRecord {
    pub details: PromiseDetails,
    /// Set once by a gc notification, never cleared
    pub is_garbage_collected: bool,
}

impl PromiseRecord {
    pub fn id(&self) -> PromiseId {
        self.details.id
    }

    pub fn parent_id(&self) -> Option<PromiseId> {
        self.details.parent_id
    }

    pub fn status(&self) -> PromiseStatus {
        self.details.status
    }

    /// Settlement time minus creation time, when both are known and ordered
    pub fn time_to_settle(&self) -> Option<f64> {
        match (self.details.creation_time, self.details.settlement_time) {
            (Some(created), Some(settled)) if settled >= created => Some(settled - created),
            _ => None,
        }
    }
}
