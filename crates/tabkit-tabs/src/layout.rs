//! Saved workspace layouts.
//!
//! A layout is a value snapshot of the panel tree plus the group and stack
//! indices at save time. Nothing in it aliases live state: loading hands
//! back copies, and later live edits never reach a stored layout.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabkit_layout::{PanelTree, PanelTreeSnapshot};

use crate::group::TabGroup;
use crate::stack::TabStack;

/// Identifier of a saved layout.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutId(String);

impl LayoutId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named snapshot of a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceLayout {
    pub id: LayoutId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub panel_tree: PanelTreeSnapshot,
    #[serde(default)]
    pub tab_groups: Vec<TabGroup>,
    #[serde(default)]
    pub tab_stacks: Vec<TabStack>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_default: bool,
}

impl WorkspaceLayout {
    /// Rebuild a live tree from the stored snapshot.
    pub fn restore_tree(&self) -> Result<PanelTree, tabkit_layout::PanelModelError> {
        PanelTree::from_snapshot(self.panel_tree.clone())
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.panel_tree.leaf_count()
    }

    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.panel_tree.tab_count()
    }
}
