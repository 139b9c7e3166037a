//! Tab records and the active-tab policy for a leaf's ordered tab list.
//!
//! A [`Tab`] is the atomic unit of an open view. Tabs live inside exactly one
//! leaf of the panel tree; group and stack membership is recorded on the tab
//! as plain identifiers (no back-references into the manager indices).
//!
//! The free functions in this module are the only place that touches the
//! `is_active` flag. Every one of them leaves a non-empty list with exactly
//! one active tab.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title given to placeholder tabs created when a panel would otherwise be empty.
pub const BLANK_TAB_TITLE: &str = "Untitled";

/// Stable opaque tab identifier. Never reused once allocated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    /// Wrap a raw identifier.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Identifier minted by a tree's tab allocator.
    #[must_use]
    pub(crate) fn from_sequence(sequence: u64) -> Self {
        Self(format!("tab-{sequence}"))
    }

    /// Sequence number if this id was minted by a tab allocator.
    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        self.0.strip_prefix("tab-")?.parse().ok()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TabId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Identifier of a tab group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a tab stack.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackId(String);

impl StackId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One open view.
///
/// `document_id` is a weak reference into the external document store; the
/// core never resolves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub title: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_dirty: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_id: Option<StackId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activated_at: Option<DateTime<Utc>>,
}

impl Tab {
    /// Build an inactive, clean, unlocked tab.
    #[must_use]
    pub fn new(id: TabId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            is_active: false,
            is_dirty: false,
            is_locked: false,
            document_id: None,
            file_path: None,
            group_id: None,
            stack_id: None,
            last_activated_at: None,
        }
    }

    /// Placeholder tab used when a panel must not be left empty.
    #[must_use]
    pub fn blank(id: TabId) -> Self {
        Self::new(id, BLANK_TAB_TITLE)
    }

    #[must_use]
    pub fn with_document(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    #[must_use]
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Copy of this tab's view under a fresh id.
    ///
    /// The copy points at the same document but carries none of the
    /// per-tab state: it is clean, unlocked, and outside any group or stack.
    #[must_use]
    pub fn duplicate_as(&self, id: TabId) -> Self {
        Self {
            id,
            title: self.title.clone(),
            is_active: false,
            is_dirty: false,
            is_locked: false,
            document_id: self.document_id.clone(),
            file_path: self.file_path.clone(),
            group_id: None,
            stack_id: None,
            last_activated_at: None,
        }
    }
}

/// Index of the active tab, if any.
#[must_use]
pub fn active_index(tabs: &[Tab]) -> Option<usize> {
    tabs.iter().position(|tab| tab.is_active)
}

/// Re-establish the single-active invariant without choosing a new tab
/// unless none is active: the first active tab wins, otherwise index 0.
pub fn normalize_active(tabs: &mut [Tab]) {
    let keep = active_index(tabs).unwrap_or(0);
    for (index, tab) in tabs.iter_mut().enumerate() {
        tab.is_active = index == keep;
    }
}

/// Activate `id`, clearing the flag on every sibling first.
///
/// Returns `false` (list untouched) when `id` is not in the list.
pub fn activate(tabs: &mut [Tab], id: &TabId) -> bool {
    let Some(target) = tabs.iter().position(|tab| &tab.id == id) else {
        return false;
    };
    for tab in tabs.iter_mut() {
        tab.is_active = false;
    }
    let tab = &mut tabs[target];
    tab.is_active = true;
    tab.last_activated_at = Some(Utc::now());
    true
}

/// Insert `tab` at `index` (clamped to the list length) and make it active.
pub fn insert_active(tabs: &mut Vec<Tab>, tab: Tab, index: Option<usize>) {
    let id = tab.id.clone();
    let at = index.map_or(tabs.len(), |i| i.min(tabs.len()));
    tabs.insert(at, tab);
    activate(tabs, &id);
}

/// Remove `id` from the list.
///
/// When the removed tab was active and others remain, the first remaining
/// tab becomes active (index 0, not the nearest neighbour).
pub fn remove(tabs: &mut Vec<Tab>, id: &TabId) -> Option<Tab> {
    let index = tabs.iter().position(|tab| &tab.id == id)?;
    let removed = tabs.remove(index);
    if removed.is_active
        && let Some(first) = tabs.first()
    {
        let first = first.id.clone();
        activate(tabs, &first);
    }
    Some(removed)
}

/// Move the tab at `from` to position `to` (clamped). Active flags travel
/// with the tabs.
pub fn reorder(tabs: &mut Vec<Tab>, from: usize, to: usize) -> bool {
    if from >= tabs.len() {
        return false;
    }
    let to = to.min(tabs.len() - 1);
    if from == to {
        return false;
    }
    let tab = tabs.remove(from);
    tabs.insert(to, tab);
    true
}
