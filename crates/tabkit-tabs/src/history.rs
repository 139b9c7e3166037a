//! Per-panel back/forward navigation over tab ids.
//!
//! Each panel keeps a bounded, deduplicated list of visited tabs and a cursor.
//! Recording a visit moves the tab to the end (dropping its older entry),
//! trims the oldest entries past the limit and puts the cursor on the end.
//! Back/forward only move the cursor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tabkit_layout::{PanelId, TabId};

/// Default number of entries kept per panel.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Navigation history for one panel.
///
/// `current_index` is `None` only while the history is empty; otherwise it
/// is a valid index into `history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationHistory {
    pub panel_id: PanelId,
    #[serde(default)]
    pub history: Vec<TabId>,
    #[serde(default)]
    pub current_index: Option<usize>,
    #[serde(default = "default_max_size")]
    pub max_size: usize,
}

fn default_max_size() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl NavigationHistory {
    #[must_use]
    pub fn new(panel_id: PanelId, max_size: usize) -> Self {
        Self {
            panel_id,
            history: Vec::new(),
            current_index: None,
            max_size: max_size.max(1),
        }
    }

    /// Record a visit to `tab`.
    pub fn push(&mut self, tab: &TabId) {
        self.history.retain(|entry| entry != tab);
        self.history.push(tab.clone());
        if self.history.len() > self.max_size {
            let excess = self.history.len() - self.max_size;
            self.history.drain(..excess);
        }
        self.current_index = self.history.len().checked_sub(1);
    }

    /// Step back one entry. `None` at the oldest entry.
    pub fn back(&mut self) -> Option<TabId> {
        let index = self.current_index?.checked_sub(1)?;
        self.current_index = Some(index);
        self.history.get(index).cloned()
    }

    /// Step forward one entry. `None` at the newest entry.
    pub fn forward(&mut self) -> Option<TabId> {
        let index = self.current_index? + 1;
        let tab = self.history.get(index).cloned()?;
        self.current_index = Some(index);
        Some(tab)
    }

    #[must_use]
    pub fn current(&self) -> Option<&TabId> {
        self.history.get(self.current_index?)
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.current_index.is_some_and(|index| index > 0)
    }

    #[must_use]
    pub fn can_go_forward(&self) -> bool {
        self.current_index
            .is_some_and(|index| index + 1 < self.history.len())
    }

    /// Most-recent-first, at most `limit` entries.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<TabId> {
        self.history.iter().rev().take(limit).cloned().collect()
    }

    /// Drop `tab`, keeping the cursor on the same entry when possible.
    pub fn remove(&mut self, tab: &TabId) -> bool {
        let Some(position) = self.history.iter().position(|entry| entry == tab) else {
            return false;
        };
        self.history.remove(position);
        self.current_index = match self.current_index {
            _ if self.history.is_empty() => None,
            Some(current) if position < current => Some(current - 1),
            Some(current) => Some(current.min(self.history.len() - 1)),
            None => Some(self.history.len() - 1),
        };
        true
    }

    /// Re-establish the cursor and size bounds after deserialization.
    fn repair(&mut self, fallback_limit: usize) {
        if self.max_size == 0 {
            self.max_size = fallback_limit.max(1);
        }
        let mut seen = Vec::with_capacity(self.history.len());
        self.history.retain(|entry| {
            if seen.contains(entry) {
                false
            } else {
                seen.push(entry.clone());
                true
            }
        });
        if self.history.len() > self.max_size {
            let excess = self.history.len() - self.max_size;
            self.history.drain(..excess);
        }
        self.current_index = match (self.current_index, self.history.len()) {
            (_, 0) => None,
            (Some(index), len) => Some(index.min(len - 1)),
            (None, len) => Some(len - 1),
        };
    }
}

/// Histories for every panel, created lazily on first visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histories {
    limit: usize,
    by_panel: BTreeMap<PanelId, NavigationHistory>,
}

impl Default for Histories {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl Histories {
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            by_panel: BTreeMap::new(),
        }
    }

    /// Rebuild from persisted records, repairing out-of-range cursors.
    #[must_use]
    pub fn from_histories(limit: usize, histories: Vec<NavigationHistory>) -> Self {
        let mut out = Self::with_limit(limit);
        for mut history in histories {
            history.repair(out.limit);
            let _ = out.by_panel.insert(history.panel_id, history);
        }
        out
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<NavigationHistory> {
        self.by_panel.values().cloned().collect()
    }

    #[must_use]
    pub fn get(&self, panel: PanelId) -> Option<&NavigationHistory> {
        self.by_panel.get(&panel)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NavigationHistory> {
        self.by_panel.values()
    }

    pub fn record(&mut self, panel: PanelId, tab: &TabId) {
        let limit = self.limit;
        self.by_panel
            .entry(panel)
            .or_insert_with(|| NavigationHistory::new(panel, limit))
            .push(tab);
    }

    pub fn back(&mut self, panel: PanelId) -> Option<TabId> {
        self.by_panel.get_mut(&panel)?.back()
    }

    pub fn forward(&mut self, panel: PanelId) -> Option<TabId> {
        self.by_panel.get_mut(&panel)?.forward()
    }

    #[must_use]
    pub fn recent(&self, panel: PanelId, limit: usize) -> Vec<TabId> {
        self.by_panel
            .get(&panel)
            .map(|history| history.recent(limit))
            .unwrap_or_default()
    }

    /// Remove a closed tab from every panel's history.
    pub fn forget_tab(&mut self, tab: &TabId) {
        for history in self.by_panel.values_mut() {
            let _ = history.remove(tab);
        }
    }

    pub fn clear(&mut self, panel: PanelId) -> bool {
        self.by_panel.remove(&panel).is_some()
    }

    /// Keep only histories whose panel satisfies `keep`.
    pub fn retain_panels(&mut self, mut keep: impl FnMut(PanelId) -> bool) {
        self.by_panel.retain(|panel, _| keep(*panel));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> PanelId {
        PanelId::MIN
    }

    fn tab(raw: &str) -> TabId {
        TabId::new(raw)
    }

    #[test]
    fn recording_same_tab_twice_keeps_length() {
        let mut history = NavigationHistory::new(panel(), 10);
        history.push(&tab("a"));
        history.push(&tab("b"));
        let before = history.history.len();
        history.push(&tab("b"));
        assert_eq!(history.history.len(), before);
        history.push(&tab("a"));
        assert_eq!(history.history, vec![tab("b"), tab("a")]);
        assert_eq!(history.current_index, Some(1));
    }

    #[test]
    fn push_truncates_oldest() {
        let mut history = NavigationHistory::new(panel(), 3);
        for name in ["a", "b", "c", "d"] {
            history.push(&tab(name));
        }
        assert_eq!(history.history, vec![tab("b"), tab("c"), tab("d")]);
        assert_eq!(history.current_index, Some(2));
    }

    #[test]
    fn back_and_forward_stop_at_bounds_without_mutation() {
        let mut history = NavigationHistory::new(panel(), 10);
        history.push(&tab("a"));
        history.push(&tab("b"));

        assert_eq!(history.forward(), None);
        assert_eq!(history.current_index, Some(1));

        assert_eq!(history.back(), Some(tab("a")));
        let snapshot = history.clone();
        assert_eq!(history.back(), None);
        assert_eq!(history, snapshot);

        assert_eq!(history.forward(), Some(tab("b")));
        assert_eq!(history.current(), Some(&tab("b")));
    }

    #[test]
    fn empty_history_navigation_is_none() {
        let mut history = NavigationHistory::new(panel(), 10);
        assert_eq!(history.back(), None);
        assert_eq!(history.forward(), None);
        assert!(!history.can_go_back() && !history.can_go_forward());
    }

    #[test]
    fn recent_is_most_recent_first() {
        let mut history = NavigationHistory::new(panel(), 10);
        for name in ["a", "b", "c"] {
            history.push(&tab(name));
        }
        assert_eq!(history.recent(2), vec![tab("c"), tab("b")]);
        assert_eq!(history.recent(10).len(), 3);
    }

    #[test]
    fn remove_keeps_cursor_on_same_entry() {
        let mut history = NavigationHistory::new(panel(), 10);
        for name in ["a", "b", "c"] {
            history.push(&tab(name));
        }
        history.back();
        assert!(history.remove(&tab("a")));
        assert_eq!(history.current(), Some(&tab("b")));
        assert!(history.remove(&tab("b")));
        assert_eq!(history.current(), Some(&tab("c")));
        assert!(history.remove(&tab("c")));
        assert_eq!(history.current_index, None);
        assert!(!history.remove(&tab("c")));
    }

    #[test]
    fn histories_are_per_panel() {
        let mut histories = Histories::with_limit(5);
        let other = PanelId::new(2).expect("non-zero");
        histories.record(panel(), &tab("a"));
        histories.record(panel(), &tab("b"));
        histories.record(other, &tab("x"));
        assert_eq!(histories.back(panel()), Some(tab("a")));
        assert_eq!(histories.back(other), None);
        histories.forget_tab(&tab("a"));
        assert_eq!(histories.recent(panel(), 5), vec![tab("b")]);
        histories.retain_panels(|id| id == other);
        assert!(histories.get(panel()).is_none());
        assert!(histories.clear(other));
    }

    #[test]
    fn from_histories_repairs_cursor() {
        let mut broken = NavigationHistory::new(panel(), 2);
        broken.history = vec![tab("a"), tab("a"), tab("b"), tab("c")];
        broken.current_index = Some(40);
        let histories = Histories::from_histories(50, vec![broken]);
        let repaired = histories.get(panel()).expect("history");
        assert_eq!(repaired.history, vec![tab("b"), tab("c")]);
        assert_eq!(repaired.current_index, Some(1));
    }
}
