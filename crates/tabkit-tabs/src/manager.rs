//! The tab manager: every index that lives beside the panel tree.
//!
//! The manager never holds the tree itself. It is coupled to it only through
//! shared identifiers (tab ids and panel ids); callers that own both keep the
//! two in step (see `tabkit-runtime`'s `Shell`).

use chrono::Utc;
use tabkit_layout::{GroupId, PanelId, PanelTree, StackId, TabId};

use crate::group::{GroupAssignment, GroupRegistry, TabGroup};
use crate::history::{DEFAULT_HISTORY_LIMIT, Histories, NavigationHistory};
use crate::layout::{LayoutId, WorkspaceLayout};
use crate::settings::TabSettings;
use crate::shortcuts::ShortcutMap;
use crate::stack::{StackAssignment, StackRegistry, TabStack};
use crate::state::{TAB_MANAGER_SCHEMA_VERSION, TabManagerState};

/// Groups, stacks, histories, saved layouts, settings and shortcuts.
#[derive(Debug, Clone, PartialEq)]
pub struct TabManager {
    groups: GroupRegistry,
    stacks: StackRegistry,
    histories: Histories,
    layouts: Vec<WorkspaceLayout>,
    settings: TabSettings,
    shortcuts: ShortcutMap,
    next_seq: u64,
}

impl Default for TabManager {
    fn default() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl TabManager {
    #[must_use]
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            groups: GroupRegistry::default(),
            stacks: StackRegistry::default(),
            histories: Histories::with_limit(limit),
            layouts: Vec::new(),
            settings: TabSettings::default(),
            shortcuts: ShortcutMap::default(),
            next_seq: 0,
        }
    }

    fn allocate(&mut self, prefix: &str) -> String {
        self.next_seq = self.next_seq.saturating_add(1);
        format!("{prefix}-{}", self.next_seq)
    }

    /// Create a group at the end of the display order.
    ///
    /// Returns `None` when tab groups are disabled in settings.
    pub fn create_tab_group(
        &mut self,
        name: impl Into<String>,
        color: impl Into<String>,
        tab_ids: &[TabId],
    ) -> Option<(GroupId, Vec<GroupAssignment>)> {
        if !self.settings.enable_tab_groups {
            tracing::debug!("tab groups disabled; create refused");
            return None;
        }
        let id = GroupId::new(self.allocate("group"));
        let changes = self.groups.create(id.clone(), name, color, tab_ids);
        tracing::debug!(group = %id, members = changes.len(), "tab group created");
        Some((id, changes))
    }

    pub fn add_tab_to_group(&mut self, group: &GroupId, tab: &TabId) -> Vec<GroupAssignment> {
        self.groups.add_tab(group, tab)
    }

    pub fn remove_tab_from_group(&mut self, group: &GroupId, tab: &TabId) -> Vec<GroupAssignment> {
        self.groups.remove_tab(group, tab)
    }

    pub fn move_tab_between_groups(
        &mut self,
        from: &GroupId,
        to: &GroupId,
        tab: &TabId,
    ) -> Vec<GroupAssignment> {
        self.groups.move_tab(from, to, tab)
    }

    /// Delete a group; members become ungrouped.
    pub fn delete_tab_group(&mut self, group: &GroupId) -> Vec<GroupAssignment> {
        self.groups.delete(group)
    }

    pub fn rename_tab_group(&mut self, group: &GroupId, name: impl Into<String>) -> bool {
        self.groups.rename(group, name)
    }

    pub fn set_tab_group_color(&mut self, group: &GroupId, color: impl Into<String>) -> bool {
        self.groups.recolor(group, color)
    }

    pub fn toggle_tab_group_collapsed(&mut self, group: &GroupId) -> bool {
        self.groups.toggle_collapsed(group)
    }

    pub fn toggle_tab_group_locked(&mut self, group: &GroupId) -> bool {
        self.groups.toggle_locked(group)
    }

    pub fn reorder_tab_group(&mut self, group: &GroupId, position: usize) -> bool {
        self.groups.reorder(group, position)
    }

    #[must_use]
    pub fn tab_group(&self, group: &GroupId) -> Option<&TabGroup> {
        self.groups.get(group)
    }

    /// Groups in display order.
    #[must_use]
    pub fn tab_groups(&self) -> Vec<&TabGroup> {
        self.groups.ordered()
    }

    #[must_use]
    pub fn group_for_tab(&self, tab: &TabId) -> Option<&TabGroup> {
        self.groups.group_for_tab(tab)
    }

    /// Create a stack bound to `panel`, active index 0.
    pub fn create_tab_stack(
        &mut self,
        panel: PanelId,
        tab_ids: &[TabId],
    ) -> (StackId, Vec<StackAssignment>) {
        let id = StackId::new(self.allocate("stack"));
        let changes = self.stacks.create(id.clone(), panel, tab_ids);
        tracing::debug!(stack = %id, panel = %panel, members = changes.len(), "tab stack created");
        (id, changes)
    }

    pub fn add_tab_to_stack(&mut self, stack: &StackId, tab: &TabId) -> Vec<StackAssignment> {
        self.stacks.add_tab(stack, tab)
    }

    pub fn remove_tab_from_stack(&mut self, stack: &StackId, tab: &TabId) -> Vec<StackAssignment> {
        self.stacks.remove_tab(stack, tab)
    }

    pub fn set_stack_active_tab(&mut self, stack: &StackId, index: usize) -> bool {
        self.stacks.set_active(stack, index)
    }

    pub fn toggle_stack_mode(&mut self, stack: &StackId) -> bool {
        self.stacks.toggle_mode(stack)
    }

    pub fn delete_tab_stack(&mut self, stack: &StackId) -> Vec<StackAssignment> {
        self.stacks.delete(stack)
    }

    #[must_use]
    pub fn tab_stack(&self, stack: &StackId) -> Option<&TabStack> {
        self.stacks.get(stack)
    }

    #[must_use]
    pub fn stack_active_tab(&self, stack: &StackId) -> Option<&TabId> {
        self.stacks.get(stack)?.active_tab()
    }

    #[must_use]
    pub fn stacks_for_panel(&self, panel: PanelId) -> Vec<&TabStack> {
        self.stacks.for_panel(panel)
    }

    pub fn tab_stacks(&self) -> impl Iterator<Item = &TabStack> {
        self.stacks.iter()
    }

    #[must_use]
    pub fn stack_for_tab(&self, tab: &TabId) -> Option<&TabStack> {
        self.stacks.stack_for_tab(tab)
    }

    /// Whether a panel showing `tab_count` tabs should collapse into a stack.
    ///
    /// Pure policy check; `panel` needs no backing stack.
    #[must_use]
    pub fn should_stack_tabs(&self, _panel: PanelId, tab_count: usize) -> bool {
        self.settings.should_stack(tab_count)
    }

    pub fn add_to_history(&mut self, panel: PanelId, tab: &TabId) {
        self.histories.record(panel, tab);
    }

    pub fn navigate_back(&mut self, panel: PanelId) -> Option<TabId> {
        self.histories.back(panel)
    }

    pub fn navigate_forward(&mut self, panel: PanelId) -> Option<TabId> {
        self.histories.forward(panel)
    }

    /// Most-recent-first tab ids visited in `panel`.
    #[must_use]
    pub fn get_recent_tabs(&self, panel: PanelId, limit: usize) -> Vec<TabId> {
        self.histories.recent(panel, limit)
    }

    #[must_use]
    pub fn navigation_history(&self, panel: PanelId) -> Option<&NavigationHistory> {
        self.histories.get(panel)
    }

    pub fn clear_history(&mut self, panel: PanelId) -> bool {
        self.histories.clear(panel)
    }

    /// Remove a closed tab from every group, stack and history.
    pub fn forget_tab(&mut self, tab: &TabId) {
        let _ = self.groups.forget_tab(tab);
        let _ = self.stacks.forget_tab(tab);
        self.histories.forget_tab(tab);
    }

    /// Drop per-panel state for a panel that left the tree.
    pub fn drop_panel(&mut self, panel: PanelId) -> Vec<StackAssignment> {
        let _ = self.histories.clear(panel);
        self.stacks.drop_panel(panel)
    }

    /// Smallest panel id and tab sequence above every id this manager
    /// references: group and stack members, history entries, the panels
    /// owning stacks and histories, and the allocators of stored layouts.
    #[must_use]
    pub fn id_floor(&self) -> (PanelId, u64) {
        let owners = self
            .stacks
            .iter()
            .map(|stack| stack.panel_id)
            .chain(self.histories.iter().map(|history| history.panel_id))
            .filter_map(|panel| panel.checked_next().ok());
        let panel = owners
            .chain(self.layouts.iter().map(|layout| layout.panel_tree.next_id))
            .fold(PanelId::MIN, PanelId::max);

        let members = self
            .groups
            .ordered()
            .into_iter()
            .flat_map(|group| group.tabs.iter())
            .chain(self.stacks.iter().flat_map(|stack| stack.tabs.iter()))
            .chain(self.histories.iter().flat_map(|history| history.history.iter()))
            .filter_map(|tab| tab.sequence().map(|seq| seq.saturating_add(1)));
        let tab = members
            .chain(self.layouts.iter().map(|layout| layout.panel_tree.next_tab))
            .fold(1, u64::max);
        (panel, tab)
    }

    /// Drop histories and stacks of every panel not present in `tree`.
    pub fn retain_panels_of(&mut self, tree: &PanelTree) {
        self.histories.retain_panels(|panel| tree.is_leaf(panel));
        let orphaned: Vec<PanelId> = self
            .stacks
            .iter()
            .map(|stack| stack.panel_id)
            .filter(|panel| !tree.is_leaf(*panel))
            .collect();
        for panel in orphaned {
            let _ = self.stacks.drop_panel(panel);
        }
    }

    /// Snapshot the tree and the current groups/stacks under `name`.
    pub fn save_workspace_layout(
        &mut self,
        name: impl Into<String>,
        tree: &PanelTree,
        description: Option<String>,
    ) -> LayoutId {
        let id = LayoutId::new(self.allocate("layout"));
        let layout = WorkspaceLayout {
            id: id.clone(),
            name: name.into(),
            description,
            panel_tree: tree.to_snapshot(),
            tab_groups: self.groups.to_vec(),
            tab_stacks: self.stacks.to_vec(),
            created_at: Utc::now(),
            is_default: false,
        };
        tracing::info!(layout = %id, name = %layout.name, panels = layout.leaf_count(), "workspace layout saved");
        self.layouts.push(layout);
        id
    }

    /// Replace live groups and stacks with the layout's copies and hand the
    /// layout back so the caller can install its tree.
    ///
    /// Unknown ids and layouts whose tree no longer validates return `None`
    /// and leave live state untouched.
    pub fn load_workspace_layout(&mut self, id: &LayoutId) -> Option<WorkspaceLayout> {
        let Some(layout) = self.workspace_layout(id).cloned() else {
            tracing::warn!(layout = %id, "workspace layout not found");
            return None;
        };
        if let Err(err) = layout.restore_tree() {
            tracing::warn!(layout = %id, error = %err, "stored layout tree is invalid");
            return None;
        }
        self.groups = GroupRegistry::from_groups(layout.tab_groups.clone());
        self.stacks = StackRegistry::from_stacks(layout.tab_stacks.clone());
        tracing::info!(layout = %id, "workspace layout loaded");
        Some(layout)
    }

    pub fn delete_workspace_layout(&mut self, id: &LayoutId) -> bool {
        let before = self.layouts.len();
        self.layouts.retain(|layout| &layout.id != id);
        let removed = self.layouts.len() != before;
        if !removed {
            tracing::debug!(layout = %id, "delete of unknown layout ignored");
        }
        removed
    }

    /// Mark `id` as the only default layout. Unknown ids change nothing.
    pub fn set_default_layout(&mut self, id: &LayoutId) -> bool {
        if self.workspace_layout(id).is_none() {
            tracing::debug!(layout = %id, "unknown layout cannot become default");
            return false;
        }
        for layout in &mut self.layouts {
            layout.is_default = &layout.id == id;
        }
        true
    }

    pub fn rename_layout(&mut self, id: &LayoutId, name: impl Into<String>) -> bool {
        match self.layouts.iter_mut().find(|layout| &layout.id == id) {
            Some(layout) => {
                layout.name = name.into();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn workspace_layout(&self, id: &LayoutId) -> Option<&WorkspaceLayout> {
        self.layouts.iter().find(|layout| &layout.id == id)
    }

    /// Saved layouts, oldest first.
    #[must_use]
    pub fn list_layouts(&self) -> Vec<&WorkspaceLayout> {
        let mut layouts: Vec<&WorkspaceLayout> = self.layouts.iter().collect();
        layouts.sort_by_key(|layout| layout.created_at);
        layouts
    }

    #[must_use]
    pub fn default_layout(&self) -> Option<&WorkspaceLayout> {
        self.layouts.iter().find(|layout| layout.is_default)
    }

    #[must_use]
    pub fn settings(&self) -> &TabSettings {
        &self.settings
    }

    /// Replace settings; invalid fields fall back to defaults.
    pub fn update_settings(&mut self, settings: TabSettings) {
        let (settings, problems) = settings.sanitized();
        for problem in problems {
            tracing::warn!(%problem, "settings value replaced with default");
        }
        self.settings = settings;
    }

    #[must_use]
    pub fn shortcuts(&self) -> &ShortcutMap {
        &self.shortcuts
    }

    #[must_use]
    pub fn shortcut_for(&self, action: &str) -> Option<&str> {
        self.shortcuts.get(action)
    }

    pub fn set_shortcut(&mut self, action: impl Into<String>, chord: impl Into<String>) {
        self.shortcuts.set(action, chord);
    }

    pub fn reset_shortcuts(&mut self) {
        self.shortcuts.reset();
    }

    /// Export every index as the persisted blob shape.
    #[must_use]
    pub fn to_state(&self) -> TabManagerState {
        TabManagerState {
            schema_version: TAB_MANAGER_SCHEMA_VERSION,
            next_seq: self.next_seq,
            tab_groups: self.groups.to_vec(),
            tab_stacks: self.stacks.to_vec(),
            workspace_layouts: self.layouts.clone(),
            navigation_histories: self.histories.to_vec(),
            shortcuts: self.shortcuts.clone(),
            settings: serde_json::to_value(&self.settings).unwrap_or_default(),
        }
    }

    /// Rebuild from a decoded blob, repairing every index.
    #[must_use]
    pub fn from_state(state: TabManagerState, history_limit: usize) -> Self {
        let (settings, problems) = TabSettings::from_value(&state.settings);
        for problem in problems {
            tracing::warn!(%problem, "settings value replaced with default");
        }

        let mut layouts: Vec<WorkspaceLayout> = Vec::with_capacity(state.workspace_layouts.len());
        for layout in state.workspace_layouts {
            if let Err(err) = layout.restore_tree() {
                tracing::warn!(layout = %layout.id, error = %err, "dropping layout with invalid tree");
                continue;
            }
            layouts.push(layout);
        }
        let mut seen_default = false;
        for layout in &mut layouts {
            if layout.is_default && seen_default {
                layout.is_default = false;
            }
            seen_default |= layout.is_default;
        }

        let mut manager = Self {
            groups: GroupRegistry::from_groups(state.tab_groups),
            stacks: StackRegistry::from_stacks(state.tab_stacks),
            histories: Histories::from_histories(history_limit, state.navigation_histories),
            layouts,
            settings,
            shortcuts: state.shortcuts,
            next_seq: state.next_seq,
        };
        manager.next_seq = manager.next_seq.max(manager.highest_issued_sequence());
        manager
    }

    /// Restore from an optional stored blob. Any failure yields defaults.
    #[must_use]
    pub fn restore(blob: Option<&str>, history_limit: usize) -> Self {
        let Some(payload) = blob else {
            tracing::info!("no stored tab manager state; starting fresh");
            return Self::with_history_limit(history_limit);
        };
        match TabManagerState::decode(payload) {
            Ok(state) => Self::from_state(state, history_limit),
            Err(err) => {
                tracing::warn!(error = %err, "stored tab manager state unusable; using defaults");
                Self::with_history_limit(history_limit)
            }
        }
    }

    pub fn to_blob(&self) -> Result<String, serde_json::Error> {
        self.to_state().encode()
    }

    fn highest_issued_sequence(&self) -> u64 {
        fn suffix(raw: &str) -> u64 {
            raw.rsplit_once('-')
                .and_then(|(_, n)| n.parse().ok())
                .unwrap_or(0)
        }
        let groups = self.groups.ordered().into_iter().map(|g| suffix(g.id.as_str()));
        let stacks = self.stacks.iter().map(|s| suffix(s.id.as_str()));
        let layouts = self.layouts.iter().map(|l| suffix(l.id.as_str()));
        groups.chain(stacks).chain(layouts).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabkit_layout::SplitDirection;

    fn tab(raw: &str) -> TabId {
        TabId::new(raw)
    }

    #[test]
    fn ids_are_sequential_per_manager() {
        let mut manager = TabManager::default();
        let (group, _) = manager
            .create_tab_group("Work", "#f00", &[])
            .expect("groups enabled");
        let (stack, _) = manager.create_tab_stack(PanelId::MIN, &[]);
        let layout = manager.save_workspace_layout("L", &PanelTree::singleton(), None);
        assert_eq!(group.as_str(), "group-1");
        assert_eq!(stack.as_str(), "stack-2");
        assert_eq!(layout.as_str(), "layout-3");
    }

    #[test]
    fn id_floor_clears_every_referenced_id() {
        let mut manager = TabManager::default();
        assert_eq!(manager.id_floor(), (PanelId::MIN, 1));

        let panel = PanelId::new(4).expect("non-zero");
        let _ = manager.create_tab_group("Work", "#f00", &[tab("tab-9")]);
        let _ = manager.create_tab_stack(panel, &[tab("tab-3"), tab("notes")]);
        manager.add_to_history(PanelId::new(6).expect("non-zero"), &tab("tab-2"));
        assert_eq!(manager.id_floor(), (PanelId::new(7).expect("non-zero"), 10));

        let mut tree = PanelTree::singleton();
        tree.raise_allocators(PanelId::new(20).expect("non-zero"), 30);
        let _ = manager.save_workspace_layout("Wide", &tree, None);
        assert_eq!(manager.id_floor(), (PanelId::new(20).expect("non-zero"), 30));
    }

    #[test]
    fn group_creation_refused_when_disabled() {
        let mut manager = TabManager::default();
        manager.update_settings(TabSettings {
            enable_tab_groups: false,
            ..TabSettings::default()
        });
        assert!(manager.create_tab_group("Work", "#f00", &[tab("a")]).is_none());
        assert!(manager.tab_groups().is_empty());
    }

    #[test]
    fn should_stack_with_defaults() {
        let manager = TabManager::default();
        assert!(manager.should_stack_tabs(PanelId::MIN, 9));
        assert!(!manager.should_stack_tabs(PanelId::MIN, 8));
    }

    #[test]
    fn saved_layout_is_isolated_from_later_edits() {
        let mut manager = TabManager::default();
        let mut tree = PanelTree::singleton();
        let first = tree.tabs().next().expect("tab").id.clone();
        let (group, _) = manager
            .create_tab_group("Work", "#f00", &[first.clone()])
            .expect("groups enabled");
        let (stack, _) = manager.create_tab_stack(tree.root(), &[first.clone()]);
        let saved_groups = manager.groups.to_vec();
        let saved_stacks = manager.stacks.to_vec();
        let layout = manager.save_workspace_layout("Focus", &tree, Some("desc".into()));

        manager.rename_tab_group(&group, "Changed");
        manager.delete_tab_stack(&stack);
        manager.create_tab_group("Extra", "#0f0", &[]);
        tree.split_panel(tree.root(), SplitDirection::Horizontal)
            .expect("split");

        let loaded = manager.load_workspace_layout(&layout).expect("layout exists");
        assert_eq!(manager.groups.to_vec(), saved_groups);
        assert_eq!(manager.stacks.to_vec(), saved_stacks);
        assert_eq!(loaded.panel_tree, PanelTree::singleton().to_snapshot());
        assert_eq!(loaded.description.as_deref(), Some("desc"));
    }

    #[test]
    fn load_unknown_layout_is_none_and_keeps_state() {
        let mut manager = TabManager::default();
        manager.create_tab_group("Work", "#f00", &[]);
        let before = manager.clone();
        assert!(manager.load_workspace_layout(&LayoutId::new("nope")).is_none());
        assert_eq!(manager, before);
    }

    #[test]
    fn set_default_is_exclusive() {
        let mut manager = TabManager::default();
        let tree = PanelTree::singleton();
        let a = manager.save_workspace_layout("a", &tree, None);
        let b = manager.save_workspace_layout("b", &tree, None);
        assert!(manager.set_default_layout(&a));
        assert!(manager.set_default_layout(&b));
        let defaults: Vec<&LayoutId> = manager
            .list_layouts()
            .into_iter()
            .filter(|layout| layout.is_default)
            .map(|layout| &layout.id)
            .collect();
        assert_eq!(defaults, vec![&b]);
        assert!(!manager.set_default_layout(&LayoutId::new("ghost")));
        assert_eq!(manager.default_layout().map(|l| &l.id), Some(&b));
    }

    #[test]
    fn delete_and_rename_layout() {
        let mut manager = TabManager::default();
        let id = manager.save_workspace_layout("a", &PanelTree::singleton(), None);
        assert!(manager.rename_layout(&id, "renamed"));
        assert_eq!(manager.workspace_layout(&id).map(|l| l.name.as_str()), Some("renamed"));
        assert!(manager.delete_workspace_layout(&id));
        assert!(!manager.delete_workspace_layout(&id));
        assert!(manager.list_layouts().is_empty());
    }

    #[test]
    fn forget_tab_clears_every_index() {
        let mut manager = TabManager::default();
        let (group, _) = manager
            .create_tab_group("g", "#000", &[tab("a"), tab("b")])
            .expect("groups enabled");
        let (stack, _) = manager.create_tab_stack(PanelId::MIN, &[tab("a")]);
        manager.add_to_history(PanelId::MIN, &tab("a"));
        manager.add_to_history(PanelId::MIN, &tab("b"));

        manager.forget_tab(&tab("a"));

        assert!(!manager.tab_group(&group).expect("group").contains(&tab("a")));
        assert!(manager.tab_stack(&stack).expect("stack").tabs.is_empty());
        assert_eq!(manager.get_recent_tabs(PanelId::MIN, 10), vec![tab("b")]);
    }

    #[test]
    fn blob_round_trip_preserves_indices() {
        let mut manager = TabManager::default();
        manager.create_tab_group("g", "#000", &[tab("a")]);
        manager.create_tab_stack(PanelId::MIN, &[tab("b")]);
        manager.add_to_history(PanelId::MIN, &tab("a"));
        manager.set_shortcut("tab.new", "Ctrl+N");
        let layout = manager.save_workspace_layout("L", &PanelTree::singleton(), None);
        manager.set_default_layout(&layout);

        let blob = manager.to_blob().expect("encode");
        let restored = TabManager::restore(Some(&blob), DEFAULT_HISTORY_LIMIT);
        assert_eq!(restored, manager);
    }

    #[test]
    fn blob_uses_camel_case_keys() {
        let manager = TabManager::default();
        let value: serde_json::Value =
            serde_json::from_str(&manager.to_blob().expect("encode")).expect("json");
        for key in [
            "tabGroups",
            "tabStacks",
            "workspaceLayouts",
            "navigationHistories",
            "shortcuts",
            "settings",
            "schemaVersion",
            "nextSeq",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn malformed_blob_restores_defaults() {
        let restored = TabManager::restore(Some("{\"tabGroups\": 12"), 50);
        assert_eq!(restored, TabManager::default());
        let restored = TabManager::restore(None, 50);
        assert_eq!(restored, TabManager::default());
    }

    #[test]
    fn restore_never_reissues_existing_ids() {
        let blob = r##"{
            "nextSeq": 1,
            "tabGroups": [{"id": "group-9", "name": "g", "color": "#000"}]
        }"##;
        let mut manager = TabManager::restore(Some(blob), 50);
        let (id, _) = manager
            .create_tab_group("new", "#fff", &[])
            .expect("groups enabled");
        assert_eq!(id.as_str(), "group-10");
    }

    #[test]
    fn restore_keeps_one_default_layout() {
        let mut manager = TabManager::default();
        let tree = PanelTree::singleton();
        manager.save_workspace_layout("a", &tree, None);
        manager.save_workspace_layout("b", &tree, None);
        let mut state = manager.to_state();
        for layout in &mut state.workspace_layouts {
            layout.is_default = true;
        }
        let restored = TabManager::from_state(state, 50);
        let defaults = restored
            .list_layouts()
            .iter()
            .filter(|layout| layout.is_default)
            .count();
        assert_eq!(defaults, 1);
    }

    #[test]
    fn retain_panels_of_drops_orphaned_state() {
        let mut manager = TabManager::default();
        let tree = PanelTree::singleton();
        let gone = PanelId::new(42).expect("non-zero");
        manager.add_to_history(gone, &tab("x"));
        manager.add_to_history(tree.root(), &tab("y"));
        manager.create_tab_stack(gone, &[tab("x")]);

        manager.retain_panels_of(&tree);

        assert!(manager.navigation_history(gone).is_none());
        assert!(manager.navigation_history(tree.root()).is_some());
        assert!(manager.stacks_for_panel(gone).is_empty());
    }
}
