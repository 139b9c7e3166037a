//! Tab stacks: panel-local collections collapsed into one visual slot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tabkit_layout::{PanelId, StackId, TabId};

/// Ordered tabs of one panel shown as a single slot with one active entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabStack {
    pub id: StackId,
    pub panel_id: PanelId,
    #[serde(default)]
    pub tabs: Vec<TabId>,
    #[serde(default)]
    pub active_tab_index: usize,
    #[serde(default = "default_stacked")]
    pub is_stacked: bool,
}

fn default_stacked() -> bool {
    true
}

impl TabStack {
    /// Tab at the active index, `None` when the stack is empty.
    #[must_use]
    pub fn active_tab(&self) -> Option<&TabId> {
        self.tabs.get(self.active_tab_index)
    }

    #[must_use]
    pub fn contains(&self, tab: &TabId) -> bool {
        self.tabs.contains(tab)
    }

    fn clamp_active(&mut self) {
        self.active_tab_index = self
            .active_tab_index
            .min(self.tabs.len().saturating_sub(1));
    }
}

/// Membership change produced by a stack mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackAssignment {
    pub tab: TabId,
    pub stack: Option<StackId>,
}

/// Registry of every live stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackRegistry {
    stacks: BTreeMap<StackId, TabStack>,
}

impl StackRegistry {
    /// Rebuild from persisted records, dropping duplicate membership and
    /// clamping active indices.
    #[must_use]
    pub fn from_stacks(stacks: Vec<TabStack>) -> Self {
        let mut registry = Self::default();
        for mut stack in stacks {
            let mut kept: Vec<TabId> = Vec::with_capacity(stack.tabs.len());
            for tab in stack.tabs.drain(..) {
                if registry.stack_for_tab(&tab).is_none() && !kept.contains(&tab) {
                    kept.push(tab);
                }
            }
            stack.tabs = kept;
            stack.clamp_active();
            let _ = registry.stacks.insert(stack.id.clone(), stack);
        }
        registry
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<TabStack> {
        self.stacks.values().cloned().collect()
    }

    #[must_use]
    pub fn get(&self, id: &StackId) -> Option<&TabStack> {
        self.stacks.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TabStack> {
        self.stacks.values()
    }

    #[must_use]
    pub fn stack_for_tab(&self, tab: &TabId) -> Option<&TabStack> {
        self.stacks.values().find(|stack| stack.contains(tab))
    }

    #[must_use]
    pub fn for_panel(&self, panel: PanelId) -> Vec<&TabStack> {
        self.stacks
            .values()
            .filter(|stack| stack.panel_id == panel)
            .collect()
    }

    /// Create a stack bound to `panel` with `active_tab_index = 0`.
    pub fn create(&mut self, id: StackId, panel: PanelId, tabs: &[TabId]) -> Vec<StackAssignment> {
        let stack = TabStack {
            id: id.clone(),
            panel_id: panel,
            tabs: Vec::new(),
            active_tab_index: 0,
            is_stacked: true,
        };
        let _ = self.stacks.insert(id.clone(), stack);
        let mut changes = Vec::new();
        for tab in tabs {
            changes.extend(self.add_tab(&id, tab));
        }
        changes
    }

    /// Append `tab`, pulling it out of any other stack first.
    pub fn add_tab(&mut self, stack: &StackId, tab: &TabId) -> Vec<StackAssignment> {
        match self.stacks.get(stack) {
            None => {
                tracing::debug!(stack = %stack, "add to unknown stack ignored");
                return Vec::new();
            }
            Some(target) if target.contains(tab) => return Vec::new(),
            Some(_) => {}
        }
        for other in self.stacks.values_mut() {
            if other.contains(tab) {
                other.tabs.retain(|member| member != tab);
                other.clamp_active();
            }
        }
        if let Some(target) = self.stacks.get_mut(stack) {
            target.tabs.push(tab.clone());
        }
        vec![StackAssignment {
            tab: tab.clone(),
            stack: Some(stack.clone()),
        }]
    }

    /// Remove `tab`; the active index is clamped to the new length.
    pub fn remove_tab(&mut self, stack: &StackId, tab: &TabId) -> Vec<StackAssignment> {
        let Some(target) = self.stacks.get_mut(stack) else {
            tracing::debug!(stack = %stack, "remove from unknown stack ignored");
            return Vec::new();
        };
        if !target.contains(tab) {
            return Vec::new();
        }
        target.tabs.retain(|member| member != tab);
        target.clamp_active();
        vec![StackAssignment {
            tab: tab.clone(),
            stack: None,
        }]
    }

    /// Set the active index; out-of-range indices are rejected.
    pub fn set_active(&mut self, stack: &StackId, index: usize) -> bool {
        match self.stacks.get_mut(stack) {
            Some(target) if index < target.tabs.len() => {
                target.active_tab_index = index;
                true
            }
            Some(target) => {
                tracing::debug!(stack = %stack, index, len = target.tabs.len(), "stack index out of range");
                false
            }
            None => false,
        }
    }

    /// Flip between stacked and expanded display. Membership is untouched.
    pub fn toggle_mode(&mut self, stack: &StackId) -> bool {
        match self.stacks.get_mut(stack) {
            Some(target) => {
                target.is_stacked = !target.is_stacked;
                true
            }
            None => false,
        }
    }

    /// Delete a stack; members become unstacked.
    pub fn delete(&mut self, stack: &StackId) -> Vec<StackAssignment> {
        let Some(removed) = self.stacks.remove(stack) else {
            tracing::debug!(stack = %stack, "delete of unknown stack ignored");
            return Vec::new();
        };
        removed
            .tabs
            .into_iter()
            .map(|tab| StackAssignment { tab, stack: None })
            .collect()
    }

    /// Remove every stack bound to a panel that no longer exists.
    pub fn drop_panel(&mut self, panel: PanelId) -> Vec<StackAssignment> {
        let doomed: Vec<StackId> = self
            .for_panel(panel)
            .into_iter()
            .map(|stack| stack.id.clone())
            .collect();
        doomed.iter().flat_map(|id| self.delete(id)).collect()
    }

    /// Drop a closed tab from whichever stack holds it.
    pub fn forget_tab(&mut self, tab: &TabId) -> Vec<StackAssignment> {
        let holder = self.stack_for_tab(tab).map(|stack| stack.id.clone());
        match holder {
            Some(id) => self.remove_tab(&id, tab),
            None => Vec::new(),
        }
    }
}
