//! Display hierarchy for promise records
//!
//! Every visible record has one node; the node hangs under its nearest
//! visible ancestor, or under the root when the chain runs out. Parents are
//! stored as ids, so a reset can never leave a dangling reference.
//!
//! A visible ancestor that has no node yet is materialized on the spot. That
//! also covers children that arrive before their parent: they sit under the
//! root until the parent's first update, then move under it. The tree keeps
//! its own index of record parent links, so an update only touches the
//! records below the changed id. A parent loop is cut at the node that closes
//! it, which then hangs under the root.

use super::record::{PromiseId, PromiseRecord, PromiseStatus};
use super::store::PromiseRecords;
use crate::format::millis_to_string;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Where a node attaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParentRef {
    Root,
    Promise(PromiseId),
}

/// Nearest ancestor of `record` whose status passes `is_visible`.
///
/// The walk starts at the record's own parent. A missing parent id, or an id
/// with no record, ends the walk at the root.
pub fn find_visible_ancestor(
    record: &PromiseRecord,
    records: &PromiseRecords,
    is_visible: &dyn Fn(PromiseStatus) -> bool,
) -> ParentRef {
    let mut current = record;
    for _ in 0..=records.len() {
        let Some(parent_id) = current.parent_id() else {
            return ParentRef::Root;
        };
        let Some(parent) = records.get(&parent_id) else {
            return ParentRef::Root;
        };
        if is_visible(parent.status()) {
            return ParentRef::Promise(parent_id);
        }
        current = parent;
    }
    log::warn!("Parent chain of promise {} loops, attaching to root", record.id());
    ParentRef::Root
}

/// Text shown for one promise row
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    pub status: PromiseStatus,
    pub title: String,
    pub function: String,
    pub created: Option<String>,
    pub settled: Option<String>,
    pub time_to_settle: Option<String>,
    pub garbage_collected: bool,
}

impl DisplayRow {
    pub fn from_record(record: &PromiseRecord) -> Self {
        let details = &record.details;
        let mut title = details.status.title().to_string();
        if record.is_garbage_collected {
            title.push_str(" (garbage collected)");
        }

        let function = details
            .call_frame
            .as_ref()
            .map(|frame| frame.function_name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or("(anonymous function)")
            .to_string();

        Self {
            status: details.status,
            title,
            function,
            created: details.call_frame.as_ref().map(ToString::to_string),
            settled: details.settlement_stack.first().map(ToString::to_string),
            time_to_settle: record.time_to_settle().map(|ms| millis_to_string(ms, false)),
            garbage_collected: record.is_garbage_collected,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayNode {
    pub id: PromiseId,
    pub parent: ParentRef,
    pub children: Vec<PromiseId>,
    pub row: DisplayRow,
    pub expanded: bool,
}

#[derive(Debug, Default)]
pub struct DisplayTree {
    nodes: IndexMap<PromiseId, DisplayNode>,
    root_children: Vec<PromiseId>,
    /// Record parent of every record seen, visible or not
    record_parents: HashMap<PromiseId, Option<PromiseId>>,
    /// Record children keyed by parent id, including parents with no record
    record_children: HashMap<PromiseId, Vec<PromiseId>>,
}

/// How an update changed the record parent index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParentLink {
    Unchanged,
    New,
    Moved,
}

impl DisplayTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root_children.clear();
        self.record_parents.clear();
        self.record_children.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: PromiseId) -> Option<&DisplayNode> {
        self.nodes.get(&id)
    }

    pub fn parent_of(&self, id: PromiseId) -> Option<ParentRef> {
        self.nodes.get(&id).map(|node| node.parent)
    }

    pub fn roots(&self) -> &[PromiseId] {
        &self.root_children
    }

    pub fn children(&self, parent: ParentRef) -> &[PromiseId] {
        match parent {
            ParentRef::Root => &self.root_children,
            ParentRef::Promise(id) => match self.nodes.get(&id) {
                Some(node) => &node.children,
                None => &[],
            },
        }
    }

    /// Depth-first listing with nesting depth, roots first
    pub fn walk(&self) -> Vec<(usize, &DisplayNode)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, PromiseId)> = self.root_children.iter().rev().map(|&id| (0, id)).collect();
        while let Some((depth, id)) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            out.push((depth, node));
            stack.extend(node.children.iter().rev().map(|&child| (depth + 1, child)));
        }
        out
    }

    /// Re-resolve the node for `id` after its record changed.
    ///
    /// Hidden records lose their node and their children move up to the
    /// next visible ancestor. A record that just became visible adopts the
    /// visible records below it.
    pub fn attach(&mut self, id: PromiseId, records: &PromiseRecords, is_visible: &dyn Fn(PromiseStatus) -> bool) {
        let Some(record) = records.get(&id) else {
            return;
        };
        let link = self.index_record(id, record.parent_id());

        if is_visible(record.status()) {
            let existed = self.nodes.contains_key(&id);
            self.materialize(id, records, is_visible);
            if !existed {
                self.adopt_descendants(id, ParentRef::Promise(id), records, is_visible);
            }
            return;
        }

        let parent = find_visible_ancestor(record, records, is_visible);
        if let ParentRef::Promise(parent_id) = parent {
            if !self.nodes.contains_key(&parent_id) {
                self.materialize(parent_id, records, is_visible);
            }
        }
        match self.nodes.swap_remove(&id) {
            Some(node) => {
                if let Some(siblings) = self.children_mut(node.parent) {
                    siblings.retain(|&sibling| sibling != id);
                }
                log::debug!("Promise {} hidden, {} children move up", id, node.children.len());
                for child in node.children {
                    if parent == node.parent {
                        self.relink(child, parent);
                    } else {
                        self.set_parent(child, parent);
                    }
                }
            }
            // Records below a missing id already sit under the root
            None if link == ParentLink::New && parent == ParentRef::Root => {}
            None if link != ParentLink::Unchanged => self.adopt_descendants(id, parent, records, is_visible),
            None => {}
        }
    }

    /// Build the tree from scratch in record insertion order.
    ///
    /// Returns the number of records hidden by `is_visible`.
    pub fn rebuild(&mut self, records: &PromiseRecords, is_visible: &dyn Fn(PromiseStatus) -> bool) -> usize {
        self.clear();
        for (&id, record) in records {
            self.index_record(id, record.parent_id());
        }
        let mut hidden = 0;
        for (&id, record) in records {
            if is_visible(record.status()) {
                self.materialize(id, records, is_visible);
            } else {
                hidden += 1;
            }
        }
        for node in self.nodes.values_mut() {
            node.expanded = true;
        }
        log::debug!("Promise tree rebuilt: {} nodes, {} hidden", self.nodes.len(), hidden);
        hidden
    }

    /// Place `id` under its visible ancestor, building missing ancestors
    /// root first.
    fn materialize(&mut self, id: PromiseId, records: &PromiseRecords, is_visible: &dyn Fn(PromiseStatus) -> bool) {
        let mut chain: Vec<(PromiseId, ParentRef)> = Vec::new();
        let mut seen = HashSet::new();
        let mut current = id;
        while let Some(record) = records.get(&current) {
            seen.insert(current);
            match find_visible_ancestor(record, records, is_visible) {
                ParentRef::Promise(parent_id) if seen.contains(&parent_id) => {
                    log::warn!("Parent chain of promise {} loops, attaching to root", current);
                    chain.push((current, ParentRef::Root));
                    break;
                }
                ParentRef::Promise(parent_id) if !self.nodes.contains_key(&parent_id) => {
                    chain.push((current, ParentRef::Promise(parent_id)));
                    current = parent_id;
                }
                parent => {
                    chain.push((current, parent));
                    break;
                }
            }
        }
        if chain.len() > 1 {
            log::debug!("Materializing {} ancestors of promise {}", chain.len() - 1, id);
        }

        for (node_id, parent) in chain.into_iter().rev() {
            let Some(record) = records.get(&node_id) else {
                continue;
            };
            let row = DisplayRow::from_record(record);
            match self.nodes.get_mut(&node_id) {
                Some(node) => node.row = row,
                None => {
                    self.nodes.insert(
                        node_id,
                        DisplayNode {
                            id: node_id,
                            parent: ParentRef::Root,
                            children: Vec::new(),
                            row,
                            expanded: false,
                        },
                    );
                    self.root_children.push(node_id);
                }
            }
            self.set_parent(node_id, parent);
            if let ParentRef::Promise(parent_id) = parent {
                if let Some(parent_node) = self.nodes.get_mut(&parent_id) {
                    parent_node.expanded = true;
                }
            }
        }
    }

    /// Move the visible records reachable from `from` through hidden ones
    /// under `parent`
    fn adopt_descendants(
        &mut self,
        from: PromiseId,
        parent: ParentRef,
        records: &PromiseRecords,
        is_visible: &dyn Fn(PromiseStatus) -> bool,
    ) {
        let mut stack: Vec<PromiseId> = match self.record_children.get(&from) {
            Some(children) => children.iter().rev().copied().collect(),
            None => return,
        };
        let mut seen = HashSet::from([from]);
        while let Some(child) = stack.pop() {
            if !seen.insert(child) {
                continue;
            }
            if self.nodes.contains_key(&child) {
                self.set_parent(child, parent);
            } else if records.get(&child).is_some_and(|record| !is_visible(record.status())) {
                if let Some(grandchildren) = self.record_children.get(&child) {
                    stack.extend(grandchildren.iter().rev().copied());
                }
            }
        }
    }

    fn index_record(&mut self, id: PromiseId, parent: Option<PromiseId>) -> ParentLink {
        let link = match self.record_parents.insert(id, parent) {
            None => ParentLink::New,
            Some(old) if old == parent => return ParentLink::Unchanged,
            Some(old) => {
                if let Some(siblings) = old.and_then(|old_id| self.record_children.get_mut(&old_id)) {
                    siblings.retain(|&sibling| sibling != id);
                }
                ParentLink::Moved
            }
        };
        if let Some(parent_id) = parent {
            self.record_children.entry(parent_id).or_default().push(id);
        }
        link
    }

    /// Whether `id` sits on the display chain from `parent` up to the root
    fn is_above(&self, id: PromiseId, mut parent: ParentRef) -> bool {
        for _ in 0..=self.nodes.len() {
            match parent {
                ParentRef::Root => return false,
                ParentRef::Promise(current) if current == id => return true,
                ParentRef::Promise(current) => match self.nodes.get(&current) {
                    Some(node) => parent = node.parent,
                    None => return false,
                },
            }
        }
        true
    }

    /// Move `id` under `parent`, falling back to the root if that would
    /// close a loop
    fn set_parent(&mut self, id: PromiseId, mut parent: ParentRef) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if node.parent == parent {
            return;
        }
        // A node without children can only loop onto itself
        let may_loop = parent == ParentRef::Promise(id) || !node.children.is_empty();
        if may_loop && self.is_above(id, parent) {
            log::warn!("Promise {} would become its own ancestor, attaching to root", id);
            parent = ParentRef::Root;
        }
        self.relink(id, parent);
    }

    fn relink(&mut self, id: PromiseId, parent: ParentRef) {
        let Some(old) = self.nodes.get(&id).map(|node| node.parent) else {
            return;
        };
        let parent = match parent {
            ParentRef::Promise(parent_id) if !self.nodes.contains_key(&parent_id) => ParentRef::Root,
            parent => parent,
        };
        if old == parent {
            return;
        }
        if let Some(siblings) = self.children_mut(old) {
            siblings.retain(|&sibling| sibling != id);
        }
        if let Some(children) = self.children_mut(parent) {
            children.push(id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = parent;
        }
    }

    fn children_mut(&mut self, parent: ParentRef) -> Option<&mut Vec<PromiseId>> {
        match parent {
            ParentRef::Root => Some(&mut self.root_children),
            ParentRef::Promise(id) => self.nodes.get_mut(&id).map(|node| &mut node.children),
        }
    }
}
