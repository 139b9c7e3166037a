//! Tab groups: named, colored, orderable collections of tab references.
//!
//! Groups are independent of where a tab sits in the panel tree. A tab
//! belongs to at most one group; every membership mutation returns the
//! [`GroupAssignment`]s it caused so the owner of the tab records can mirror
//! them onto `Tab::group_id` in the same step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tabkit_layout::{GroupId, TabId};

/// A named collection of tabs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroup {
    pub id: GroupId,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub tabs: Vec<TabId>,
    #[serde(default)]
    pub is_collapsed: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub position: usize,
}

impl TabGroup {
    #[must_use]
    pub fn contains(&self, tab: &TabId) -> bool {
        self.tabs.contains(tab)
    }
}

/// Membership change produced by a group mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAssignment {
    pub tab: TabId,
    /// New group, `None` when the tab became ungrouped.
    pub group: Option<GroupId>,
}

impl GroupAssignment {
    fn joined(tab: TabId, group: &GroupId) -> Self {
        Self {
            tab,
            group: Some(group.clone()),
        }
    }

    fn left(tab: TabId) -> Self {
        Self { tab, group: None }
    }
}

/// Registry of every live group, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupRegistry {
    groups: BTreeMap<GroupId, TabGroup>,
}

impl GroupRegistry {
    /// Rebuild from persisted records.
    ///
    /// Duplicate tab references are dropped (first group in position order
    /// keeps the tab) and positions are re-densified.
    #[must_use]
    pub fn from_groups(mut groups: Vec<TabGroup>) -> Self {
        groups.sort_by_key(|group| group.position);
        let mut registry = Self::default();
        for mut group in groups {
            let mut kept = Vec::with_capacity(group.tabs.len());
            for tab in group.tabs.drain(..) {
                if registry.group_for_tab(&tab).is_none() && !kept.contains(&tab) {
                    kept.push(tab);
                }
            }
            group.tabs = kept;
            let _ = registry.groups.insert(group.id.clone(), group);
        }
        registry.renumber();
        registry
    }

    /// Groups in display order.
    #[must_use]
    pub fn ordered(&self) -> Vec<&TabGroup> {
        let mut groups: Vec<&TabGroup> = self.groups.values().collect();
        groups.sort_by_key(|group| group.position);
        groups
    }

    /// Owned copies in display order, for snapshots and persistence.
    #[must_use]
    pub fn to_vec(&self) -> Vec<TabGroup> {
        self.ordered().into_iter().cloned().collect()
    }

    #[must_use]
    pub fn get(&self, id: &GroupId) -> Option<&TabGroup> {
        self.groups.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[must_use]
    pub fn group_for_tab(&self, tab: &TabId) -> Option<&TabGroup> {
        self.groups.values().find(|group| group.contains(tab))
    }

    /// Insert a new group at the end of the display order and pull the given
    /// tabs into it.
    pub fn create(
        &mut self,
        id: GroupId,
        name: impl Into<String>,
        color: impl Into<String>,
        tabs: &[TabId],
    ) -> Vec<GroupAssignment> {
        let group = TabGroup {
            id: id.clone(),
            name: name.into(),
            color: color.into(),
            tabs: Vec::new(),
            is_collapsed: false,
            is_locked: false,
            position: self.groups.len(),
        };
        let _ = self.groups.insert(id.clone(), group);
        let mut changes = Vec::new();
        for tab in tabs {
            changes.extend(self.add_tab(&id, tab));
        }
        changes
    }

    /// Add `tab` to `group`, removing it from any other group first.
    ///
    /// Refused (no changes) when either group involved is locked.
    pub fn add_tab(&mut self, group: &GroupId, tab: &TabId) -> Vec<GroupAssignment> {
        let Some(target) = self.groups.get(group) else {
            tracing::debug!(group = %group, "add to unknown group ignored");
            return Vec::new();
        };
        if target.is_locked {
            tracing::debug!(group = %group, "group is locked");
            return Vec::new();
        }
        if target.contains(tab) {
            return Vec::new();
        }
        if let Some(current) = self.group_for_tab(tab) {
            if current.is_locked {
                tracing::debug!(group = %current.id, tab = %tab, "tab held by locked group");
                return Vec::new();
            }
            let current = current.id.clone();
            if let Some(previous) = self.groups.get_mut(&current) {
                previous.tabs.retain(|member| member != tab);
            }
        }
        if let Some(target) = self.groups.get_mut(group) {
            target.tabs.push(tab.clone());
        }
        vec![GroupAssignment::joined(tab.clone(), group)]
    }

    /// Remove `tab` from `group`. Refused when the group is locked.
    pub fn remove_tab(&mut self, group: &GroupId, tab: &TabId) -> Vec<GroupAssignment> {
        let Some(target) = self.groups.get_mut(group) else {
            tracing::debug!(group = %group, "remove from unknown group ignored");
            return Vec::new();
        };
        if target.is_locked || !target.contains(tab) {
            return Vec::new();
        }
        target.tabs.retain(|member| member != tab);
        vec![GroupAssignment::left(tab.clone())]
    }

    /// Move `tab` from one group to another.
    pub fn move_tab(&mut self, from: &GroupId, to: &GroupId, tab: &TabId) -> Vec<GroupAssignment> {
        if from == to || !self.groups.get(from).is_some_and(|group| group.contains(tab)) {
            return Vec::new();
        }
        if !self.groups.contains_key(to) {
            tracing::debug!(group = %to, "move into unknown group ignored");
            return Vec::new();
        }
        self.add_tab(to, tab)
    }

    /// Delete a group; its members become ungrouped.
    pub fn delete(&mut self, group: &GroupId) -> Vec<GroupAssignment> {
        let Some(removed) = self.groups.remove(group) else {
            tracing::debug!(group = %group, "delete of unknown group ignored");
            return Vec::new();
        };
        self.renumber();
        removed.tabs.into_iter().map(GroupAssignment::left).collect()
    }

    /// Drop a closed tab from whichever group holds it, regardless of locks.
    pub fn forget_tab(&mut self, tab: &TabId) -> Vec<GroupAssignment> {
        let mut changes = Vec::new();
        for group in self.groups.values_mut() {
            let before = group.tabs.len();
            group.tabs.retain(|member| member != tab);
            if group.tabs.len() != before {
                changes.push(GroupAssignment::left(tab.clone()));
            }
        }
        changes
    }

    pub fn rename(&mut self, group: &GroupId, name: impl Into<String>) -> bool {
        self.with_group(group, |target| target.name = name.into())
    }

    pub fn recolor(&mut self, group: &GroupId, color: impl Into<String>) -> bool {
        self.with_group(group, |target| target.color = color.into())
    }

    pub fn toggle_collapsed(&mut self, group: &GroupId) -> bool {
        self.with_group(group, |target| target.is_collapsed = !target.is_collapsed)
    }

    pub fn toggle_locked(&mut self, group: &GroupId) -> bool {
        self.with_group(group, |target| target.is_locked = !target.is_locked)
    }

    /// Move a group to `position` (clamped); other groups shift to keep
    /// positions dense.
    pub fn reorder(&mut self, group: &GroupId, position: usize) -> bool {
        if !self.groups.contains_key(group) {
            return false;
        }
        let mut order: Vec<GroupId> = self
            .ordered()
            .into_iter()
            .map(|entry| entry.id.clone())
            .filter(|id| id != group)
            .collect();
        order.insert(position.min(order.len()), group.clone());
        for (index, id) in order.iter().enumerate() {
            if let Some(entry) = self.groups.get_mut(id) {
                entry.position = index;
            }
        }
        true
    }

    fn with_group(&mut self, group: &GroupId, edit: impl FnOnce(&mut TabGroup)) -> bool {
        match self.groups.get_mut(group) {
            Some(target) => {
                edit(target);
                true
            }
            None => {
                tracing::debug!(group = %group, "unknown group");
                false
            }
        }
    }

    fn renumber(&mut self) {
        let order: Vec<GroupId> = self
            .ordered()
            .into_iter()
            .map(|group| group.id.clone())
            .collect();
        for (index, id) in order.iter().enumerate() {
            if let Some(group) = self.groups.get_mut(id) {
                group.position = index;
            }
        }
    }
}
