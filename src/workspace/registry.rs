//! In-memory view of the store with a window -> workspace index.

use super::{StoreRoot, WindowId, WorkspaceId, WorkspaceRecord};
use std::collections::{HashMap, HashSet};

/// Manages the saved workspaces loaded from the store.
///
/// Alongside the primary `id -> record` map it keeps a secondary index from
/// bound window ids to workspace ids. [`WorkspaceRegistry::bind`] is the only
/// way to attach a window, and it evicts any previous holder so the index stays
/// one-to-one.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceRegistry {
    root: StoreRoot,
    by_window: HashMap<WindowId, WorkspaceId>,
}

impl WorkspaceRegistry {
    /// Build a registry from loaded data.
    ///
    /// Duplicate window bindings in stored data are tolerated: the index keeps
    /// the highest id and the conflict is logged.
    pub fn from_root(root: StoreRoot) -> Self {
        let mut by_window = HashMap::new();
        for record in root.workspaces.values() {
            if let Some(window_id) = record.window_id
                && let Some(previous) = by_window.insert(window_id, record.id)
            {
                log::warn!(
                    "Workspaces {} and {} are both bound to window {}",
                    previous,
                    record.id,
                    window_id
                );
            }
        }
        Self { root, by_window }
    }

    /// Give back the data to persist.
    pub fn into_root(self) -> StoreRoot {
        self.root
    }

    pub fn root(&self) -> &StoreRoot {
        &self.root
    }

    pub fn next_id(&self) -> WorkspaceId {
        self.root.next_id
    }

    pub fn len(&self) -> usize {
        self.root.workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.workspaces.is_empty()
    }

    pub fn get(&self, id: WorkspaceId) -> Option<&WorkspaceRecord> {
        self.root.workspaces.get(&id)
    }

    /// Mutable access to a record. Window bindings must go through
    /// [`bind`](Self::bind) / [`unbind_window`](Self::unbind_window).
    pub fn get_mut(&mut self, id: WorkspaceId) -> Option<&mut WorkspaceRecord> {
        self.root.workspaces.get_mut(&id)
    }

    /// Store a new workspace under the next id and bump the counter.
    ///
    /// `build` receives the allocated id. If the record comes back bound to a
    /// window, the binding goes through the same guard as [`bind`](Self::bind).
    pub fn insert_new(
        &mut self,
        build: impl FnOnce(WorkspaceId) -> WorkspaceRecord,
    ) -> &WorkspaceRecord {
        let id = self.root.next_id.max(self.root.min_next_id());
        let mut record = build(id);
        record.id = id;
        let window_id = record.window_id.take();

        self.root.workspaces.insert(id, record);
        self.root.next_id = id.saturating_add(1);
        if let Some(window_id) = window_id {
            self.bind(id, window_id);
        }
        &self.root.workspaces[&id]
    }

    /// Remove a workspace, dropping its window binding.
    pub fn remove(&mut self, id: WorkspaceId) -> Option<WorkspaceRecord> {
        let record = self.root.workspaces.remove(&id)?;
        if let Some(window_id) = record.window_id
            && self.by_window.get(&window_id) == Some(&id)
        {
            self.by_window.remove(&window_id);
        }
        Some(record)
    }

    /// Bind `window_id` to workspace `id`.
    ///
    /// Any other workspace holding the window is unbound first. Returns
    /// `false` if the workspace does not exist.
    pub fn bind(&mut self, id: WorkspaceId, window_id: WindowId) -> bool {
        if !self.root.workspaces.contains_key(&id) {
            return false;
        }

        for other in self.workspaces_bound_to(window_id) {
            if other != id {
                log::warn!(
                    "Window {} was bound to workspace {}; rebinding to {}",
                    window_id,
                    other,
                    id
                );
                if let Some(record) = self.root.workspaces.get_mut(&other) {
                    record.window_id = None;
                }
            }
        }

        let Some(record) = self.root.workspaces.get_mut(&id) else {
            return false;
        };
        if let Some(old) = record.window_id.replace(window_id)
            && old != window_id
            && self.by_window.get(&old) == Some(&id)
        {
            self.by_window.remove(&old);
        }
        self.by_window.insert(window_id, id);
        true
    }

    /// Clear the binding of every workspace attached to `window_id`.
    ///
    /// Returns the ids that were unbound.
    pub fn unbind_window(&mut self, window_id: WindowId) -> Vec<WorkspaceId> {
        let ids = self.workspaces_bound_to(window_id);
        for id in &ids {
            if let Some(record) = self.root.workspaces.get_mut(id) {
                record.window_id = None;
            }
        }
        self.by_window.remove(&window_id);
        ids
    }

    /// The workspace bound to `window_id`, if any.
    pub fn workspace_for_window(&self, window_id: WindowId) -> Option<WorkspaceId> {
        self.by_window.get(&window_id).copied()
    }

    pub fn is_window_bound(&self, window_id: WindowId) -> bool {
        self.by_window.contains_key(&window_id)
    }

    /// Every workspace whose record names `window_id`.
    ///
    /// Scans the records rather than the index so that inconsistent stored
    /// data is still caught.
    pub fn workspaces_bound_to(&self, window_id: WindowId) -> Vec<WorkspaceId> {
        self.root
            .workspaces
            .values()
            .filter(|record| record.window_id == Some(window_id))
            .map(|record| record.id)
            .collect()
    }

    /// Records in display order: by `order`, then by id.
    pub fn workspaces_in_order(&self) -> Vec<&WorkspaceRecord> {
        let mut records: Vec<&WorkspaceRecord> = self.root.workspaces.values().collect();
        records.sort_by_key(|record| (record.order, record.id));
        records
    }

    /// The `order` value that places a new workspace last.
    pub fn next_order(&self) -> i64 {
        self.root
            .workspaces
            .values()
            .map(|record| record.order)
            .max()
            .map(|max| max.saturating_add(1))
            .unwrap_or(0)
    }

    /// Overwrite every workspace's `order`.
    ///
    /// Listed ids get their list index; repeated and unknown ids are skipped.
    /// Unlisted workspaces follow the list, keeping their previous relative
    /// order.
    pub fn apply_order(&mut self, ids: &[WorkspaceId]) {
        let listed: HashSet<WorkspaceId> = ids.iter().copied().collect();
        let rest: Vec<WorkspaceId> = self
            .workspaces_in_order()
            .into_iter()
            .map(|record| record.id)
            .filter(|id| !listed.contains(id))
            .collect();

        let mut seen = HashSet::new();
        for (index, id) in ids.iter().enumerate() {
            if !seen.insert(*id) {
                continue;
            }
            if let Some(record) = self.root.workspaces.get_mut(id) {
                record.order = index as i64;
            }
        }

        for (offset, id) in rest.iter().enumerate() {
            if let Some(record) = self.root.workspaces.get_mut(id) {
                record.order = (ids.len() + offset) as i64;
            }
        }
    }
}
