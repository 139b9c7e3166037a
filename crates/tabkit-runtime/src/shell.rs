//! The shell: live panel tree, tab manager and persistence in one value.
//!
//! [`Shell`] is the operation surface a UI drives. Each method applies one
//! user-level action across the tree and the manager so that the indices
//! never disagree: a tab's `group_id`/`stack_id` mirror group and stack
//! membership, closed tabs vanish from every group, stack and history, and
//! panels that leave the tree take their stacks and history with them.
//!
//! Rejected operations (unknown ids, locked tabs, invalid splits) are logged
//! at `debug` and leave state untouched. Every accepted mutation schedules a
//! debounced write of both blobs.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use tabkit_layout::{
    GroupId, PanelId, PanelOperationError, PanelOperationOutcome, PanelTree, PanelTreeSnapshot,
    SplitDirection, StackId, Tab, TabId,
};
use tabkit_tabs::{
    GroupAssignment, LayoutId, PANEL_LAYOUT_KEY, StackAssignment, TAB_MANAGER_KEY, TabManager,
    TabSettings, WorkspaceLayout,
};

use crate::config::ShellConfig;
use crate::persist::PersistWorker;
use crate::store::BlobStore;

/// Application state: one panel tree, one tab manager.
#[derive(Debug)]
pub struct Shell {
    tree: PanelTree,
    manager: TabManager,
    persistence: Option<PersistWorker>,
}

impl Shell {
    /// Fresh in-memory shell with no persistence.
    #[must_use]
    pub fn new(config: &ShellConfig) -> Self {
        Self {
            tree: PanelTree::singleton(),
            manager: TabManager::with_history_limit(config.history_limit),
            persistence: None,
        }
    }

    /// Restore from `store` and, when `config.persist` is set, start the
    /// debounced writer.
    ///
    /// Never fails: unreadable or invalid blobs fall back to defaults.
    pub fn open(store: Arc<dyn BlobStore>, config: &ShellConfig) -> Self {
        let manager_blob = load_blob(store.as_ref(), TAB_MANAGER_KEY);
        let tree_blob = load_blob(store.as_ref(), PANEL_LAYOUT_KEY);
        let manager = TabManager::restore(manager_blob.as_deref(), config.history_limit);
        let tree = restore_tree(tree_blob.as_deref()).unwrap_or_else(|| {
            let (next_id, next_tab) = manager.id_floor();
            PanelTree::singleton_after(next_id, next_tab)
        });

        let persistence = if config.persist {
            match PersistWorker::start(Arc::clone(&store), config.debounce()) {
                Ok(worker) => Some(worker),
                Err(err) => {
                    tracing::warn!(error = %err, "persistence worker failed to start; changes will not be saved");
                    None
                }
            }
        } else {
            None
        };

        let mut shell = Self {
            tree,
            manager,
            persistence,
        };
        shell.reconcile();
        tracing::info!(
            store = store.name(),
            panels = shell.tree.leaf_count(),
            tabs = shell.tree.tab_count(),
            layouts = shell.manager.list_layouts().len(),
            "shell opened"
        );
        shell
    }

    #[must_use]
    pub fn tree(&self) -> &PanelTree {
        &self.tree
    }

    #[must_use]
    pub fn manager(&self) -> &TabManager {
        &self.manager
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.persistence.is_some()
    }

    /// Open a new tab at the end of `panel` and activate it.
    pub fn open_tab(&mut self, panel: PanelId, title: impl Into<String>) -> Option<TabId> {
        let tab = self.tree.new_tab(title);
        self.insert_tab(panel, tab)
    }

    /// Open a tab showing an external document.
    pub fn open_document(
        &mut self,
        panel: PanelId,
        title: impl Into<String>,
        document_id: impl Into<String>,
        file_path: Option<PathBuf>,
    ) -> Option<TabId> {
        let mut tab = self.tree.new_tab(title).with_document(document_id);
        tab.file_path = file_path;
        self.insert_tab(panel, tab)
    }

    fn insert_tab(&mut self, panel: PanelId, tab: Tab) -> Option<TabId> {
        let id = tab.id.clone();
        let result = self.tree.add_tab(panel, tab, None);
        self.settle("open_tab", result)?;
        self.manager.add_to_history(panel, &id);
        tracing::debug!(tab = %id, panel = %panel, "tab opened");
        self.persist();
        Some(id)
    }

    /// Activate a tab and record it in its panel's history.
    pub fn activate_tab(&mut self, tab: &TabId) -> bool {
        if !self.apply_activation(tab) {
            return false;
        }
        if let Some(panel) = self.tree.panel_for_tab(tab) {
            self.manager.add_to_history(panel, tab);
        }
        self.persist();
        true
    }

    /// Close a tab. Locked tabs are refused.
    pub fn close_tab(&mut self, tab: &TabId) -> bool {
        match self.tree.tab(tab) {
            None => {
                tracing::debug!(tab = %tab, "close of unknown tab ignored");
                return false;
            }
            Some(found) if found.is_locked => {
                tracing::debug!(tab = %tab, "locked tab cannot be closed");
                return false;
            }
            Some(_) => {}
        }
        let result = self.tree.remove_tab(tab);
        if self.settle("close_tab", result).is_none() {
            return false;
        }
        self.manager.forget_tab(tab);
        tracing::debug!(tab = %tab, "tab closed");
        self.persist();
        true
    }

    /// Move a tab to another leaf (or reposition it within its own).
    ///
    /// Crossing panels releases the tab from its stack; stacks are
    /// panel-local.
    pub fn move_tab(&mut self, tab: &TabId, target: PanelId, index: Option<usize>) -> bool {
        let source = self.tree.panel_for_tab(tab);
        let result = self.tree.move_tab(tab, target, index);
        if self.settle("move_tab", result).is_none() {
            return false;
        }
        if source != Some(target)
            && let Some(stack) = self.manager.stack_for_tab(tab).map(|s| s.id.clone())
        {
            let _ = self.manager.remove_tab_from_stack(&stack, tab);
        }
        self.manager.add_to_history(target, tab);
        self.persist();
        true
    }

    pub fn reorder_tab(&mut self, panel: PanelId, from: usize, to: usize) -> bool {
        let result = self.tree.reorder_tab(panel, from, to);
        self.settle_and_persist("reorder_tab", result)
    }

    pub fn rename_tab(&mut self, tab: &TabId, title: impl Into<String>) -> bool {
        let result = self.tree.rename_tab(tab, title);
        self.settle_and_persist("rename_tab", result)
    }

    pub fn toggle_tab_lock(&mut self, tab: &TabId) -> bool {
        let result = self.tree.toggle_tab_lock(tab);
        self.settle_and_persist("toggle_tab_lock", result)
    }

    pub fn set_tab_dirty(&mut self, tab: &TabId, dirty: bool) -> bool {
        let result = self.tree.set_tab_dirty(tab, dirty);
        self.settle_and_persist("set_tab_dirty", result)
    }

    /// Duplicate a tab next to the original; the copy becomes active.
    pub fn duplicate_tab(&mut self, tab: &TabId) -> Option<TabId> {
        let panel = self.tree.panel_for_tab(tab)?;
        let result = self.tree.duplicate_tab(tab);
        let created = self.settle("duplicate_tab", result)?.created_tab?;
        self.manager.add_to_history(panel, &created);
        self.persist();
        Some(created)
    }

    /// Split a leaf; the new leaf holds a duplicate of the active tab.
    ///
    /// Returns the new leaf's id.
    pub fn split_panel(&mut self, panel: PanelId, direction: SplitDirection) -> Option<PanelId> {
        let result = self.tree.split_panel(panel, direction);
        let outcome = self.settle("split_panel", result)?;
        let created = outcome.created_panel?;
        if let Some(tab) = outcome.created_tab {
            self.manager.add_to_history(created, &tab);
        }
        tracing::debug!(panel = %panel, created = %created, ?direction, "panel split");
        self.persist();
        Some(created)
    }

    /// Close a panel and every tab beneath it.
    ///
    /// Refused when any of those tabs is locked. Closing the root leaf
    /// leaves it with one blank tab.
    pub fn close_panel(&mut self, panel: PanelId) -> bool {
        if !self.tree.contains_panel(panel) {
            tracing::debug!(panel = %panel, "close of unknown panel ignored");
            return false;
        }
        let doomed = self.subtree_tabs(panel);
        if let Some(locked) = doomed
            .iter()
            .find(|id| self.tree.tab(id).is_some_and(|tab| tab.is_locked))
        {
            tracing::debug!(panel = %panel, tab = %locked, "panel holds a locked tab; close refused");
            return false;
        }
        let result = self.tree.remove_panel(panel);
        if self.settle("close_panel", result).is_none() {
            return false;
        }
        for tab in &doomed {
            self.manager.forget_tab(tab);
        }
        tracing::debug!(panel = %panel, tabs = doomed.len(), "panel closed");
        self.persist();
        true
    }

    /// Resize the children of a split; sizes are normalized to 100.
    pub fn resize_split(&mut self, split: PanelId, sizes: Vec<u16>) -> bool {
        let result = self.tree.set_split_sizes(split, sizes);
        self.settle_and_persist("resize_split", result)
    }

    fn subtree_tabs(&self, panel: PanelId) -> Vec<TabId> {
        let mut out = Vec::new();
        let mut pending = vec![panel];
        while let Some(id) = pending.pop() {
            let Some(node) = self.tree.node(id) else {
                continue;
            };
            if let Some(tabs) = node.tabs() {
                out.extend(tabs.iter().map(|tab| tab.id.clone()));
            }
            pending.extend_from_slice(node.children());
        }
        out
    }

    /// Step back in `panel`'s history and activate that tab.
    ///
    /// The activation is not recorded as a new history entry. Returns `None`
    /// at the start of history or when the entry no longer lives in `panel`.
    pub fn navigate_back(&mut self, panel: PanelId) -> Option<TabId> {
        let tab = self.manager.navigate_back(panel)?;
        self.finish_navigation(panel, tab)
    }

    /// Step forward; see [`Shell::navigate_back`].
    pub fn navigate_forward(&mut self, panel: PanelId) -> Option<TabId> {
        let tab = self.manager.navigate_forward(panel)?;
        self.finish_navigation(panel, tab)
    }

    fn finish_navigation(&mut self, panel: PanelId, tab: TabId) -> Option<TabId> {
        if self.tree.panel_for_tab(&tab) != Some(panel) {
            tracing::debug!(panel = %panel, tab = %tab, "history entry left this panel");
            self.persist();
            return None;
        }
        let applied = self.apply_activation(&tab);
        self.persist();
        applied.then_some(tab)
    }

    #[must_use]
    pub fn recent_tabs(&self, panel: PanelId, limit: usize) -> Vec<TabId> {
        self.manager.get_recent_tabs(panel, limit)
    }

    pub fn clear_history(&mut self, panel: PanelId) -> bool {
        let cleared = self.manager.clear_history(panel);
        if cleared {
            self.persist();
        }
        cleared
    }

    /// Create a group holding those of `tabs` that are open.
    pub fn create_tab_group(
        &mut self,
        name: impl Into<String>,
        color: impl Into<String>,
        tabs: &[TabId],
    ) -> Option<GroupId> {
        let members = self.open_tabs_among(tabs);
        let (id, changes) = self.manager.create_tab_group(name, color, &members)?;
        self.sync_groups(changes);
        self.persist();
        Some(id)
    }

    pub fn add_tab_to_group(&mut self, group: &GroupId, tab: &TabId) -> bool {
        if self.tree.tab(tab).is_none() {
            tracing::debug!(tab = %tab, "cannot group unknown tab");
            return false;
        }
        let changes = self.manager.add_tab_to_group(group, tab);
        self.sync_groups_and_persist(changes)
    }

    pub fn remove_tab_from_group(&mut self, group: &GroupId, tab: &TabId) -> bool {
        let changes = self.manager.remove_tab_from_group(group, tab);
        self.sync_groups_and_persist(changes)
    }

    pub fn move_tab_between_groups(&mut self, from: &GroupId, to: &GroupId, tab: &TabId) -> bool {
        let changes = self.manager.move_tab_between_groups(from, to, tab);
        self.sync_groups_and_persist(changes)
    }

    /// Delete a group; its members become ungrouped.
    pub fn delete_tab_group(&mut self, group: &GroupId) -> bool {
        if self.manager.tab_group(group).is_none() {
            return false;
        }
        let changes = self.manager.delete_tab_group(group);
        self.sync_groups(changes);
        self.persist();
        true
    }

    pub fn rename_tab_group(&mut self, group: &GroupId, name: impl Into<String>) -> bool {
        let changed = self.manager.rename_tab_group(group, name);
        self.persist_if(changed)
    }

    pub fn set_tab_group_color(&mut self, group: &GroupId, color: impl Into<String>) -> bool {
        let changed = self.manager.set_tab_group_color(group, color);
        self.persist_if(changed)
    }

    pub fn toggle_tab_group_collapsed(&mut self, group: &GroupId) -> bool {
        let changed = self.manager.toggle_tab_group_collapsed(group);
        self.persist_if(changed)
    }

    pub fn toggle_tab_group_locked(&mut self, group: &GroupId) -> bool {
        let changed = self.manager.toggle_tab_group_locked(group);
        self.persist_if(changed)
    }

    pub fn reorder_tab_group(&mut self, group: &GroupId, position: usize) -> bool {
        let changed = self.manager.reorder_tab_group(group, position);
        self.persist_if(changed)
    }

    /// Create a stack on a leaf holding those of `tabs` that live there.
    pub fn create_tab_stack(&mut self, panel: PanelId, tabs: &[TabId]) -> Option<StackId> {
        if !self.tree.is_leaf(panel) {
            tracing::debug!(panel = %panel, "stacks attach to leaf panels only");
            return None;
        }
        let members: Vec<TabId> = tabs
            .iter()
            .filter(|tab| self.tree.panel_for_tab(tab) == Some(panel))
            .cloned()
            .collect();
        let (id, changes) = self.manager.create_tab_stack(panel, &members);
        self.sync_stacks(changes);
        self.persist();
        Some(id)
    }

    /// Add a tab to a stack bound to the tab's own panel.
    pub fn add_tab_to_stack(&mut self, stack: &StackId, tab: &TabId) -> bool {
        let Some(panel) = self.manager.tab_stack(stack).map(|s| s.panel_id) else {
            tracing::debug!(stack = %stack, "add to unknown stack ignored");
            return false;
        };
        if self.tree.panel_for_tab(tab) != Some(panel) {
            tracing::debug!(stack = %stack, tab = %tab, "tab lives in another panel");
            return false;
        }
        let changes = self.manager.add_tab_to_stack(stack, tab);
        self.sync_stacks_and_persist(changes)
    }

    pub fn remove_tab_from_stack(&mut self, stack: &StackId, tab: &TabId) -> bool {
        let changes = self.manager.remove_tab_from_stack(stack, tab);
        self.sync_stacks_and_persist(changes)
    }

    /// Make the stack member at `index` active, in the stack and the panel.
    pub fn set_stack_active_tab(&mut self, stack: &StackId, index: usize) -> bool {
        if !self.manager.set_stack_active_tab(stack, index) {
            return false;
        }
        if let Some(tab) = self.manager.stack_active_tab(stack).cloned() {
            let _ = self.apply_activation(&tab);
        }
        self.persist();
        true
    }

    pub fn toggle_stack_mode(&mut self, stack: &StackId) -> bool {
        let changed = self.manager.toggle_stack_mode(stack);
        self.persist_if(changed)
    }

    /// Delete a stack; its members go back to the plain tab list.
    pub fn delete_tab_stack(&mut self, stack: &StackId) -> bool {
        if self.manager.tab_stack(stack).is_none() {
            return false;
        }
        let changes = self.manager.delete_tab_stack(stack);
        self.sync_stacks(changes);
        self.persist();
        true
    }

    /// Whether `panel`'s current tab count calls for stacking.
    #[must_use]
    pub fn should_stack(&self, panel: PanelId) -> bool {
        let count = self.tree.leaf_tabs(panel).map_or(0, <[Tab]>::len);
        self.manager.should_stack_tabs(panel, count)
    }

    pub fn save_layout(&mut self, name: impl Into<String>, description: Option<String>) -> LayoutId {
        let id = self.manager.save_workspace_layout(name, &self.tree, description);
        self.persist();
        id
    }

    /// Install a saved layout's tree, groups and stacks.
    ///
    /// Allocators never move backwards, so ids minted before the load are
    /// not handed out again.
    pub fn load_layout(&mut self, id: &LayoutId) -> bool {
        let Some(layout) = self.manager.load_workspace_layout(id) else {
            return false;
        };
        self.install(&layout)
    }

    /// Load the default layout, if one is marked.
    pub fn load_default_layout(&mut self) -> bool {
        let Some(id) = self.manager.default_layout().map(|layout| layout.id.clone()) else {
            return false;
        };
        self.load_layout(&id)
    }

    fn install(&mut self, layout: &WorkspaceLayout) -> bool {
        let mut tree = match layout.restore_tree() {
            Ok(tree) => tree,
            Err(err) => {
                tracing::warn!(layout = %layout.id, error = %err, "layout tree rejected");
                return false;
            }
        };
        tree.raise_allocators(self.tree.next_id(), self.tree.next_tab());
        self.tree = tree;
        self.reconcile();
        self.persist();
        true
    }

    pub fn delete_layout(&mut self, id: &LayoutId) -> bool {
        let removed = self.manager.delete_workspace_layout(id);
        self.persist_if(removed)
    }

    pub fn set_default_layout(&mut self, id: &LayoutId) -> bool {
        let changed = self.manager.set_default_layout(id);
        self.persist_if(changed)
    }

    pub fn rename_layout(&mut self, id: &LayoutId, name: impl Into<String>) -> bool {
        let changed = self.manager.rename_layout(id, name);
        self.persist_if(changed)
    }

    pub fn update_settings(&mut self, settings: TabSettings) {
        self.manager.update_settings(settings);
        self.persist();
    }

    pub fn set_shortcut(&mut self, action: impl Into<String>, chord: impl Into<String>) {
        self.manager.set_shortcut(action, chord);
        self.persist();
    }

    pub fn reset_shortcuts(&mut self) {
        self.manager.reset_shortcuts();
        self.persist();
    }

    /// Write pending changes now and wait for the store.
    pub fn flush(&self) {
        if let Some(worker) = &self.persistence {
            worker.flush();
        }
    }

    /// Flush pending writes and stop the writer.
    ///
    /// Only changes already scheduled by a mutation are written, so a shell
    /// that degraded stored blobs to defaults on open leaves them untouched.
    pub fn shutdown(mut self) {
        if let Some(worker) = self.persistence.take() {
            worker.shutdown();
        }
        tracing::info!("shell shut down");
    }

    fn persist(&self) {
        let Some(worker) = &self.persistence else {
            return;
        };
        match self.manager.to_blob() {
            Ok(payload) => worker.schedule(TAB_MANAGER_KEY, payload),
            Err(err) => tracing::warn!(error = %err, "tab manager state not serializable"),
        }
        match serde_json::to_string(&self.tree.to_snapshot()) {
            Ok(payload) => worker.schedule(PANEL_LAYOUT_KEY, payload),
            Err(err) => tracing::warn!(error = %err, "panel layout not serializable"),
        }
    }

    fn persist_if(&self, changed: bool) -> bool {
        if changed {
            self.persist();
        }
        changed
    }

    /// Accept a tree outcome, dropping manager state of removed panels.
    fn settle(
        &mut self,
        op: &'static str,
        result: Result<PanelOperationOutcome, PanelOperationError>,
    ) -> Option<PanelOperationOutcome> {
        match result {
            Ok(outcome) => {
                for panel in &outcome.removed_nodes {
                    let changes = self.manager.drop_panel(*panel);
                    self.sync_stacks(changes);
                }
                Some(outcome)
            }
            Err(err) => {
                tracing::debug!(op, error = %err, "panel operation rejected");
                None
            }
        }
    }

    fn settle_and_persist(
        &mut self,
        op: &'static str,
        result: Result<PanelOperationOutcome, PanelOperationError>,
    ) -> bool {
        let applied = self.settle(op, result).is_some();
        self.persist_if(applied)
    }

    /// Activate `tab` in the tree and point its stack at it.
    fn apply_activation(&mut self, tab: &TabId) -> bool {
        let result = self.tree.activate_tab(tab);
        if self.settle("activate_tab", result).is_none() {
            return false;
        }
        let position = self.manager.stack_for_tab(tab).and_then(|stack| {
            let index = stack.tabs.iter().position(|member| member == tab)?;
            Some((stack.id.clone(), index))
        });
        if let Some((stack, index)) = position {
            let _ = self.manager.set_stack_active_tab(&stack, index);
        }
        true
    }

    fn open_tabs_among(&self, tabs: &[TabId]) -> Vec<TabId> {
        tabs.iter()
            .filter(|tab| self.tree.tab(tab).is_some())
            .cloned()
            .collect()
    }

    fn sync_groups(&mut self, changes: Vec<GroupAssignment>) {
        for change in changes {
            if self.tree.tab(&change.tab).is_none() {
                continue;
            }
            if let Err(err) = self.tree.set_tab_group(&change.tab, change.group) {
                tracing::debug!(tab = %change.tab, error = %err, "group flag not updated");
            }
        }
    }

    fn sync_groups_and_persist(&mut self, changes: Vec<GroupAssignment>) -> bool {
        let changed = !changes.is_empty();
        self.sync_groups(changes);
        self.persist_if(changed)
    }

    fn sync_stacks(&mut self, changes: Vec<StackAssignment>) {
        for change in changes {
            if self.tree.tab(&change.tab).is_none() {
                continue;
            }
            if let Err(err) = self.tree.set_tab_stack(&change.tab, change.stack) {
                tracing::debug!(tab = %change.tab, error = %err, "stack flag not updated");
            }
        }
    }

    fn sync_stacks_and_persist(&mut self, changes: Vec<StackAssignment>) -> bool {
        let changed = !changes.is_empty();
        self.sync_stacks(changes);
        self.persist_if(changed)
    }

    /// Bring the manager in line with the current tree after a restore or a
    /// layout install, then rewrite every tab's group and stack flags.
    fn reconcile(&mut self) {
        self.manager.retain_panels_of(&self.tree);

        let live: BTreeSet<TabId> = self.tree.tabs().map(|tab| tab.id.clone()).collect();
        let mut stale: BTreeSet<TabId> = BTreeSet::new();
        let mut misplaced: Vec<(StackId, TabId)> = Vec::new();
        for group in self.manager.tab_groups() {
            stale.extend(group.tabs.iter().filter(|tab| !live.contains(*tab)).cloned());
        }
        for stack in self.manager.tab_stacks() {
            for tab in &stack.tabs {
                match self.tree.panel_for_tab(tab) {
                    None => {
                        let _ = stale.insert(tab.clone());
                    }
                    Some(panel) if panel != stack.panel_id => {
                        misplaced.push((stack.id.clone(), tab.clone()));
                    }
                    Some(_) => {}
                }
            }
        }
        for panel in self.tree.leaf_ids() {
            if let Some(history) = self.manager.navigation_history(panel) {
                stale.extend(history.history.iter().filter(|tab| !live.contains(*tab)).cloned());
            }
        }
        for tab in &stale {
            self.manager.forget_tab(tab);
        }
        for (stack, tab) in &misplaced {
            let _ = self.manager.remove_tab_from_stack(stack, tab);
        }

        let flags: Vec<(TabId, Option<GroupId>, Option<StackId>)> = self
            .tree
            .tabs()
            .filter_map(|tab| {
                let group = self.manager.group_for_tab(&tab.id).map(|g| g.id.clone());
                let stack = self.manager.stack_for_tab(&tab.id).map(|s| s.id.clone());
                (tab.group_id != group || tab.stack_id != stack)
                    .then(|| (tab.id.clone(), group, stack))
            })
            .collect();
        for (tab, group, stack) in flags {
            let _ = self.tree.set_tab_group(&tab, group);
            let _ = self.tree.set_tab_stack(&tab, stack);
        }
        if !stale.is_empty() || !misplaced.is_empty() {
            tracing::debug!(
                stale = stale.len(),
                misplaced = misplaced.len(),
                "manager indices repaired against panel tree"
            );
        }
    }
}

fn load_blob(store: &dyn BlobStore, key: &str) -> Option<String> {
    match store.load(key) {
        Ok(blob) => blob,
        Err(err) => {
            tracing::warn!(key, error = %err, "stored blob unreadable; using defaults");
            None
        }
    }
}

/// Rebuild the stored tree. `None` means the caller needs a fallback tree.
fn restore_tree(blob: Option<&str>) -> Option<PanelTree> {
    let payload = blob?;
    let snapshot = match serde_json::from_str::<PanelTreeSnapshot>(payload) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            tracing::warn!(error = %err, "stored panel layout is malformed; using a single panel");
            return None;
        }
    };
    match PanelTree::from_snapshot(snapshot) {
        Ok(tree) => Some(tree),
        Err(err) => {
            tracing::warn!(error = %err, "stored panel layout is invalid; using a single panel");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBlobStore;

    fn shell() -> Shell {
        Shell::new(&ShellConfig::default())
    }

    fn root(shell: &Shell) -> PanelId {
        shell.tree().root()
    }

    fn titles(shell: &Shell, panel: PanelId) -> Vec<String> {
        shell
            .tree()
            .leaf_tabs(panel)
            .expect("leaf")
            .iter()
            .map(|tab| tab.title.clone())
            .collect()
    }

    fn active_title(shell: &Shell, panel: PanelId) -> String {
        shell.tree().active_tab(panel).expect("active").title.clone()
    }

    #[test]
    fn opened_tab_is_active_and_recorded() {
        let mut shell = shell();
        let panel = root(&shell);
        let a = shell.open_tab(panel, "a").expect("open");
        assert_eq!(shell.tree().active_tab(panel).map(|t| &t.id), Some(&a));
        assert_eq!(shell.recent_tabs(panel, 5), vec![a]);
    }

    #[test]
    fn open_on_missing_panel_is_noop() {
        let mut shell = shell();
        let before = shell.tree().state_hash();
        assert!(shell.open_tab(PanelId::new(99).expect("id"), "x").is_none());
        assert_eq!(shell.tree().state_hash(), before);
    }

    #[test]
    fn open_document_carries_reference() {
        let mut shell = shell();
        let panel = root(&shell);
        let id = shell
            .open_document(panel, "main.rs", "doc-7", Some(PathBuf::from("src/main.rs")))
            .expect("open");
        let tab = shell.tree().tab(&id).expect("tab");
        assert_eq!(tab.document_id.as_deref(), Some("doc-7"));
        assert_eq!(tab.file_path.as_deref(), Some(std::path::Path::new("src/main.rs")));
    }

    #[test]
    fn closing_active_tab_activates_first_remaining() {
        let mut shell = shell();
        let panel = root(&shell);
        let blank = shell.tree().leaf_tabs(panel).expect("leaf")[0].id.clone();
        let one = shell.open_tab(panel, "one").expect("open");
        let two = shell.open_tab(panel, "two").expect("open");
        let _three = shell.open_tab(panel, "three").expect("open");
        assert!(shell.close_tab(&blank));
        assert!(shell.activate_tab(&two));

        assert!(shell.close_tab(&two));
        assert_eq!(titles(&shell, panel), vec!["one", "three"]);
        assert_eq!(shell.tree().active_tab(panel).map(|t| &t.id), Some(&one));
    }

    #[test]
    fn locked_tab_cannot_close() {
        let mut shell = shell();
        let panel = root(&shell);
        let a = shell.open_tab(panel, "a").expect("open");
        assert!(shell.toggle_tab_lock(&a));
        assert!(!shell.close_tab(&a));
        assert!(shell.tree().tab(&a).is_some());
    }

    #[test]
    fn closing_tab_forgets_it_everywhere() {
        let mut shell = shell();
        let panel = root(&shell);
        let a = shell.open_tab(panel, "a").expect("open");
        let b = shell.open_tab(panel, "b").expect("open");
        let group = shell.create_tab_group("g", "#f00", &[a.clone()]).expect("group");
        let stack = shell.create_tab_stack(panel, &[a.clone(), b.clone()]).expect("stack");

        assert!(shell.close_tab(&a));
        assert!(!shell.manager().tab_group(&group).expect("group").contains(&a));
        assert!(!shell.manager().tab_stack(&stack).expect("stack").contains(&a));
        assert!(!shell.recent_tabs(panel, 10).contains(&a));
    }

    #[test]
    fn closing_last_tab_of_root_leaves_blank() {
        let mut shell = shell();
        let panel = root(&shell);
        let only = shell.tree().leaf_tabs(panel).expect("leaf")[0].id.clone();
        assert!(shell.close_tab(&only));
        let tabs = shell.tree().leaf_tabs(panel).expect("leaf");
        assert_eq!(tabs.len(), 1);
        assert_ne!(tabs[0].id, only);
        assert!(tabs[0].is_active);
    }

    #[test]
    fn split_duplicates_active_tab() {
        let mut shell = shell();
        let panel = root(&shell);
        let first = shell.tree().leaf_tabs(panel).expect("leaf")[0].id.clone();
        assert!(shell.rename_tab(&first, "A"));
        let created = shell
            .split_panel(panel, SplitDirection::Horizontal)
            .expect("split");

        assert_eq!(shell.tree().leaf_ids(), vec![panel, created]);
        assert_eq!(titles(&shell, panel), vec!["A"]);
        assert_eq!(titles(&shell, created), vec!["A"]);
        let original = &shell.tree().leaf_tabs(panel).expect("leaf")[0].id;
        let copy = &shell.tree().leaf_tabs(created).expect("leaf")[0].id;
        assert_ne!(original, copy);
        assert_eq!(shell.recent_tabs(created, 1), vec![copy.clone()]);
    }

    #[test]
    fn closing_last_tab_of_split_leaf_collapses_and_drops_state() {
        let mut shell = shell();
        let panel = root(&shell);
        let created = shell
            .split_panel(panel, SplitDirection::Vertical)
            .expect("split");
        let stack = shell.create_tab_stack(created, &[]).expect("stack");
        let copy = shell.tree().leaf_tabs(created).expect("leaf")[0].id.clone();

        assert!(shell.close_tab(&copy));
        assert_eq!(shell.tree().leaf_ids(), vec![panel]);
        assert_eq!(shell.tree().root(), panel);
        assert!(shell.manager().tab_stack(&stack).is_none());
        assert!(shell.manager().navigation_history(created).is_none());
    }

    #[test]
    fn close_panel_refuses_locked_subtree() {
        let mut shell = shell();
        let panel = root(&shell);
        let created = shell
            .split_panel(panel, SplitDirection::Horizontal)
            .expect("split");
        let copy = shell.tree().leaf_tabs(created).expect("leaf")[0].id.clone();
        assert!(shell.toggle_tab_lock(&copy));
        assert!(!shell.close_panel(created));
        assert!(shell.toggle_tab_lock(&copy));
        assert!(shell.close_panel(created));
        assert_eq!(shell.tree().leaf_count(), 1);
        assert!(shell.tree().tab(&copy).is_none());
    }

    #[test]
    fn move_tab_across_panels_leaves_stack() {
        let mut shell = shell();
        let left = root(&shell);
        let right = shell
            .split_panel(left, SplitDirection::Horizontal)
            .expect("split");
        let a = shell.open_tab(left, "a").expect("open");
        let stack = shell.create_tab_stack(left, &[a.clone()]).expect("stack");
        assert_eq!(shell.tree().tab(&a).and_then(|t| t.stack_id.clone()), Some(stack.clone()));

        assert!(shell.move_tab(&a, right, None));
        assert_eq!(shell.tree().panel_for_tab(&a), Some(right));
        assert!(shell.tree().tab(&a).expect("tab").stack_id.is_none());
        assert!(!shell.manager().tab_stack(&stack).expect("stack").contains(&a));
    }

    #[test]
    fn group_membership_is_mirrored_on_tabs() {
        let mut shell = shell();
        let panel = root(&shell);
        let a = shell.open_tab(panel, "a").expect("open");
        let b = shell.open_tab(panel, "b").expect("open");
        let first = shell.create_tab_group("one", "#111", &[a.clone()]).expect("group");
        let second = shell.create_tab_group("two", "#222", &[]).expect("group");

        assert_eq!(shell.tree().tab(&a).expect("tab").group_id.as_ref(), Some(&first));
        assert!(shell.move_tab_between_groups(&first, &second, &a));
        assert_eq!(shell.tree().tab(&a).expect("tab").group_id.as_ref(), Some(&second));
        assert!(shell.add_tab_to_group(&second, &b));

        assert!(shell.delete_tab_group(&second));
        assert!(shell.tree().tab(&a).expect("tab").group_id.is_none());
        assert!(shell.tree().tab(&b).expect("tab").group_id.is_none());
    }

    #[test]
    fn unknown_tabs_are_not_grouped() {
        let mut shell = shell();
        let ghost = TabId::new("tab-404");
        let group = shell.create_tab_group("g", "#000", &[ghost.clone()]).expect("group");
        assert!(shell.manager().tab_group(&group).expect("group").tabs.is_empty());
        assert!(!shell.add_tab_to_group(&group, &ghost));
    }

    #[test]
    fn stack_active_index_follows_activation() {
        let mut shell = shell();
        let panel = root(&shell);
        let a = shell.open_tab(panel, "a").expect("open");
        let b = shell.open_tab(panel, "b").expect("open");
        let c = shell.open_tab(panel, "c").expect("open");
        let stack = shell
            .create_tab_stack(panel, &[a.clone(), b.clone(), c.clone()])
            .expect("stack");

        assert!(shell.activate_tab(&c));
        assert_eq!(shell.manager().stack_active_tab(&stack), Some(&c));
        assert!(shell.set_stack_active_tab(&stack, 0));
        assert_eq!(shell.tree().active_tab(panel).map(|t| &t.id), Some(&a));
        assert!(!shell.set_stack_active_tab(&stack, 3));
    }

    #[test]
    fn stack_rejects_tab_from_other_panel() {
        let mut shell = shell();
        let left = root(&shell);
        let right = shell
            .split_panel(left, SplitDirection::Horizontal)
            .expect("split");
        let stack = shell.create_tab_stack(left, &[]).expect("stack");
        let stranger = shell.tree().leaf_tabs(right).expect("leaf")[0].id.clone();
        assert!(!shell.add_tab_to_stack(&stack, &stranger));
        assert!(shell.create_tab_stack(PanelId::new(404).expect("id"), &[]).is_none());
    }

    #[test]
    fn navigation_activates_without_recording() {
        let mut shell = shell();
        let panel = root(&shell);
        let a = shell.open_tab(panel, "a").expect("open");
        let b = shell.open_tab(panel, "b").expect("open");
        let len = shell
            .manager()
            .navigation_history(panel)
            .expect("history")
            .history
            .len();

        assert_eq!(shell.navigate_back(panel), Some(a.clone()));
        assert_eq!(shell.tree().active_tab(panel).map(|t| &t.id), Some(&a));
        let history = shell.manager().navigation_history(panel).expect("history");
        assert_eq!(history.history.len(), len);

        assert_eq!(shell.navigate_forward(panel), Some(b.clone()));
        assert_eq!(active_title(&shell, panel), "b");
        assert_eq!(shell.navigate_forward(panel), None);
    }

    #[test]
    fn auto_stack_threshold() {
        let mut shell = shell();
        let panel = root(&shell);
        for n in 0..7 {
            let _ = shell.open_tab(panel, format!("t{n}"));
        }
        assert!(!shell.should_stack(panel));
        let _ = shell.open_tab(panel, "t8");
        assert!(shell.should_stack(panel));
    }

    #[test]
    fn saved_layout_is_isolated_from_later_edits() {
        let mut shell = shell();
        let panel = root(&shell);
        let a = shell.open_tab(panel, "a").expect("open");
        let group = shell.create_tab_group("work", "#0af", &[a.clone()]).expect("group");
        let saved = shell.save_layout("before", None);

        let _ = shell.split_panel(panel, SplitDirection::Vertical);
        assert!(shell.rename_tab_group(&group, "changed"));
        assert!(shell.remove_tab_from_group(&group, &a));

        assert!(shell.load_layout(&saved));
        assert_eq!(shell.tree().leaf_count(), 1);
        let restored = shell.manager().tab_group(&group).expect("group");
        assert_eq!(restored.name, "work");
        assert!(restored.contains(&a));
        assert_eq!(shell.tree().tab(&a).expect("tab").group_id.as_ref(), Some(&group));
    }

    #[test]
    fn load_layout_never_rewinds_allocators() {
        let mut shell = shell();
        let panel = root(&shell);
        let saved = shell.save_layout("small", None);
        let _ = shell.split_panel(panel, SplitDirection::Horizontal);
        let _ = shell.open_tab(panel, "later");
        let next_tab = shell.tree().next_tab();
        let next_id = shell.tree().next_id();

        assert!(shell.load_layout(&saved));
        assert_eq!(shell.tree().next_tab(), next_tab);
        assert_eq!(shell.tree().next_id(), next_id);
        let fresh = shell.open_tab(panel, "fresh").expect("open");
        assert_eq!(fresh, TabId::new(format!("tab-{next_tab}")));
    }

    #[test]
    fn load_layout_drops_history_of_missing_panels() {
        let mut shell = shell();
        let panel = root(&shell);
        let saved = shell.save_layout("single", None);
        let created = shell
            .split_panel(panel, SplitDirection::Horizontal)
            .expect("split");
        assert!(shell.manager().navigation_history(created).is_some());
        assert!(shell.load_layout(&saved));
        assert!(shell.manager().navigation_history(created).is_none());
    }

    #[test]
    fn unknown_layout_load_is_noop() {
        let mut shell = shell();
        let before = shell.tree().state_hash();
        assert!(!shell.load_layout(&LayoutId::new("layout-404")));
        assert!(!shell.load_default_layout());
        assert_eq!(shell.tree().state_hash(), before);
    }

    #[test]
    fn default_layout_is_exclusive() {
        let mut shell = shell();
        let first = shell.save_layout("one", None);
        let second = shell.save_layout("two", Some("desc".into()));
        assert!(shell.set_default_layout(&first));
        assert!(shell.set_default_layout(&second));
        let defaults: Vec<_> = shell
            .manager()
            .list_layouts()
            .into_iter()
            .filter(|layout| layout.is_default)
            .map(|layout| layout.id.clone())
            .collect();
        assert_eq!(defaults, vec![second.clone()]);
        assert!(shell.load_default_layout());
        assert!(shell.delete_layout(&second));
        assert!(!shell.load_default_layout());
    }

    #[test]
    fn resize_split_normalizes() {
        let mut shell = shell();
        let panel = root(&shell);
        let _ = shell.split_panel(panel, SplitDirection::Horizontal);
        let split = shell.tree().root();
        assert!(shell.resize_split(split, vec![3, 1]));
        let sizes: Vec<u16> = shell
            .tree()
            .node(split)
            .expect("split")
            .children()
            .iter()
            .map(|child| shell.tree().node(*child).expect("child").size)
            .collect();
        assert_eq!(sizes.iter().sum::<u16>(), 100);
        assert!(!shell.resize_split(split, vec![1]));
    }

    #[test]
    fn shutdown_without_changes_writes_nothing() {
        let store = MemoryBlobStore::new();
        store.insert(TAB_MANAGER_KEY, "{broken");
        let config = ShellConfig::default();
        let mut shell = Shell::open(Arc::new(store.clone()), &config);
        assert!(!shell.rename_layout(&LayoutId::new("layout-404"), "x"));
        shell.shutdown();
        assert_eq!(store.save_count(), 0);
        assert_eq!(store.get(TAB_MANAGER_KEY).as_deref(), Some("{broken"));
    }

    #[test]
    fn in_memory_shell_has_no_persistence() {
        let shell = shell();
        assert!(!shell.is_persistent());
        shell.flush();
        shell.shutdown();
    }
}
