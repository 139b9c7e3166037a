//! Arena-backed split panel tree.
//!
//! Panels form an n-ary split tree stored as a flat arena keyed by
//! [`PanelId`], with explicit parent links and ordered child lists:
//!
//! - **Leaf** nodes own an ordered `Vec<Tab>` with exactly one active tab.
//! - **Split** nodes carry a [`SplitDirection`] and two or more children.
//!
//! Every node carries a relative `size` (share of its parent, children of
//! one split sum to [`FULL_SIZE`]) and a `min_size` floor used when resizing.
//!
//! Structural edits are expressed as [`PanelOperation`] values and applied
//! through [`PanelTree::apply_operation`]. The operation runs on a working
//! copy which is validated before it replaces the live tree, so a failed
//! operation leaves the tree exactly as it was and readers never observe a
//! half-applied edit.
//!
//! ```text
//! Split#3 (horizontal)
//! ├── Leaf#1 [tab-1*, tab-2]
//! └── Leaf#2 [tab-3*]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::tab::{self, GroupId, StackId, Tab, TabId};

/// Current panel tree schema version.
pub const PANEL_TREE_SCHEMA_VERSION: u16 = 1;

/// Total size shared by the children of one split.
pub const FULL_SIZE: u16 = 100;

/// Minimum size given to both halves of a fresh split.
pub const DEFAULT_MIN_SIZE: u16 = 20;

/// Stable identifier for panel nodes.
///
/// `0` is reserved/invalid so IDs are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanelId(u64);

impl PanelId {
    /// Lowest valid panel ID.
    pub const MIN: Self = Self(1);

    /// Create a new panel ID, rejecting 0.
    pub fn new(raw: u64) -> Result<Self, PanelModelError> {
        if raw == 0 {
            return Err(PanelModelError::ZeroPanelId);
        }
        Ok(Self(raw))
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the next ID, or an error on overflow.
    pub fn checked_next(self) -> Result<Self, PanelModelError> {
        let Some(next) = self.0.checked_add(1) else {
            return Err(PanelModelError::PanelIdOverflow { current: self });
        };
        Self::new(next)
    }
}

impl Default for PanelId {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Orientation of a split node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitDirection {
    /// Children side by side.
    Horizontal,
    /// Children stacked top to bottom.
    Vertical,
}

/// Leaf payload: the panel's ordered tabs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelLeaf {
    pub tabs: Vec<Tab>,
}

/// Split payload with ordered child references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSplit {
    pub direction: SplitDirection,
    pub children: Vec<PanelId>,
}

/// Node payload variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelNodeKind {
    Leaf(PanelLeaf),
    Split(PanelSplit),
}

/// Serializable node record in the canonical schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelNode {
    pub id: PanelId,
    #[serde(default)]
    pub parent: Option<PanelId>,
    #[serde(default = "default_size")]
    pub size: u16,
    #[serde(default = "default_min_size")]
    pub min_size: u16,
    #[serde(flatten)]
    pub kind: PanelNodeKind,
}

fn default_size() -> u16 {
    FULL_SIZE
}

fn default_min_size() -> u16 {
    DEFAULT_MIN_SIZE
}

impl PanelNode {
    /// Construct a full-size leaf node.
    #[must_use]
    pub fn leaf(id: PanelId, parent: Option<PanelId>, tabs: Vec<Tab>) -> Self {
        Self {
            id,
            parent,
            size: FULL_SIZE,
            min_size: DEFAULT_MIN_SIZE,
            kind: PanelNodeKind::Leaf(PanelLeaf { tabs }),
        }
    }

    /// Construct a full-size split node.
    #[must_use]
    pub fn split(
        id: PanelId,
        parent: Option<PanelId>,
        direction: SplitDirection,
        children: Vec<PanelId>,
    ) -> Self {
        Self {
            id,
            parent,
            size: FULL_SIZE,
            min_size: DEFAULT_MIN_SIZE,
            kind: PanelNodeKind::Split(PanelSplit {
                direction,
                children,
            }),
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: u16) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.kind, PanelNodeKind::Leaf(_))
    }

    /// Tabs of a leaf node, `None` for splits.
    #[must_use]
    pub fn tabs(&self) -> Option<&[Tab]> {
        match &self.kind {
            PanelNodeKind::Leaf(leaf) => Some(&leaf.tabs),
            PanelNodeKind::Split(_) => None,
        }
    }

    /// Children of a split node, empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[PanelId] {
        match &self.kind {
            PanelNodeKind::Leaf(_) => &[],
            PanelNodeKind::Split(split) => &split.children,
        }
    }
}

/// Canonical serialized panel tree shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelTreeSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub root: PanelId,
    pub next_id: PanelId,
    #[serde(default)]
    pub next_tab: u64,
    pub nodes: Vec<PanelNode>,
}

fn default_schema_version() -> u16 {
    PANEL_TREE_SCHEMA_VERSION
}

impl PanelTreeSnapshot {
    /// Canonicalize node ordering by ID for deterministic serialization.
    pub fn canonicalize(&mut self) {
        self.nodes.sort_by_key(|node| node.id);
    }

    /// Inspect invariants and collect every violation.
    #[must_use]
    pub fn invariant_report(&self) -> PanelInvariantReport {
        let mut issues = Vec::new();
        let mut nodes = BTreeMap::new();
        for node in &self.nodes {
            if nodes.insert(node.id, node.clone()).is_some() {
                issues.push(PanelModelError::DuplicateNodeId { node_id: node.id });
            }
        }
        issues.extend(collect_issues(
            self.root,
            self.next_id,
            self.next_tab,
            &nodes,
        ));
        PanelInvariantReport { issues }
    }

    /// Number of leaf panels.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// Number of tabs across all leaves.
    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(PanelNode::tabs)
            .map(<[Tab]>::len)
            .sum()
    }
}

/// Every invariant violation found in a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelInvariantReport {
    pub issues: Vec<PanelModelError>,
}

impl PanelInvariantReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Stable issue codes, in discovery order.
    #[must_use]
    pub fn codes(&self) -> Vec<&'static str> {
        self.issues.iter().map(PanelModelError::code).collect()
    }
}

/// Supported structural panel operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PanelOperation {
    /// Wrap a leaf in a new split; the leaf keeps its tabs and a sibling leaf
    /// receives a duplicate of the active tab.
    SplitPanel {
        target: PanelId,
        direction: SplitDirection,
    },
    /// Remove a node (and its subtree), promoting a lone remaining sibling.
    /// The root leaf is reset to a single blank tab instead.
    RemovePanel { target: PanelId },
    /// Replace a leaf's tab list.
    UpdateLeafTabs { target: PanelId, tabs: Vec<Tab> },
    /// Close one tab, applying the leaf close policy.
    RemoveTab { tab: TabId },
    /// Move a tab into another leaf (or to a new index in the same leaf).
    MoveTab {
        tab: TabId,
        target: PanelId,
        index: Option<usize>,
    },
    /// Set relative child sizes on a split.
    SetSplitSizes { split: PanelId, sizes: Vec<u16> },
}

impl PanelOperation {
    /// Operation family.
    #[must_use]
    pub const fn kind(&self) -> PanelOperationKind {
        match self {
            Self::SplitPanel { .. } => PanelOperationKind::SplitPanel,
            Self::RemovePanel { .. } => PanelOperationKind::RemovePanel,
            Self::UpdateLeafTabs { .. } => PanelOperationKind::UpdateLeafTabs,
            Self::RemoveTab { .. } => PanelOperationKind::RemoveTab,
            Self::MoveTab { .. } => PanelOperationKind::MoveTab,
            Self::SetSplitSizes { .. } => PanelOperationKind::SetSplitSizes,
        }
    }
}

/// Stable operation discriminator used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelOperationKind {
    SplitPanel,
    RemovePanel,
    UpdateLeafTabs,
    RemoveTab,
    MoveTab,
    SetSplitSizes,
}

impl fmt::Display for PanelOperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SplitPanel => "split_panel",
            Self::RemovePanel => "remove_panel",
            Self::UpdateLeafTabs => "update_leaf_tabs",
            Self::RemoveTab => "remove_tab",
            Self::MoveTab => "move_tab",
            Self::SetSplitSizes => "set_split_sizes",
        };
        f.write_str(name)
    }
}

/// Successful operation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelOperationOutcome {
    pub kind: PanelOperationKind,
    pub touched_nodes: Vec<PanelId>,
    /// Nodes that no longer exist (closed leaves and collapsed splits).
    pub removed_nodes: Vec<PanelId>,
    /// Leaf created by a split.
    pub created_panel: Option<PanelId>,
    /// Tab minted by the operation (split duplicate or blank placeholder).
    pub created_tab: Option<TabId>,
    pub before_hash: u64,
    pub after_hash: u64,
}

/// Failure payload for operation APIs. The tree is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelOperationError {
    pub kind: PanelOperationKind,
    pub reason: PanelOperationFailure,
}

/// Structured reasons for panel operation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelOperationFailure {
    MissingNode {
        node_id: PanelId,
    },
    NodeNotLeaf {
        node_id: PanelId,
    },
    NodeNotSplit {
        node_id: PanelId,
    },
    ParentChildMismatch {
        parent: PanelId,
        child: PanelId,
    },
    CannotRemoveRoot {
        node_id: PanelId,
    },
    TabNotFound {
        tab_id: TabId,
    },
    TabIndexOutOfRange {
        node_id: PanelId,
        index: usize,
        len: usize,
    },
    EmptyTabList {
        node_id: PanelId,
    },
    SizeCountMismatch {
        node_id: PanelId,
        expected: usize,
        actual: usize,
    },
    ZeroSizes {
        node_id: PanelId,
    },
    SizeBelowMinimum {
        node_id: PanelId,
        size: u16,
        min_size: u16,
    },
    PanelIdOverflow {
        current: PanelId,
    },
    Validation(PanelModelError),
}

impl fmt::Display for PanelOperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingNode { node_id } => write!(f, "panel {node_id} not found"),
            Self::NodeNotLeaf { node_id } => write!(f, "panel {node_id} is not a leaf"),
            Self::NodeNotSplit { node_id } => write!(f, "panel {node_id} is not a split"),
            Self::ParentChildMismatch { parent, child } => write!(
                f,
                "panel {child} is not listed as a child of split {parent}"
            ),
            Self::CannotRemoveRoot { node_id } => {
                write!(f, "split panel {node_id} is the root and cannot be removed")
            }
            Self::TabNotFound { tab_id } => write!(f, "tab {tab_id} not found"),
            Self::TabIndexOutOfRange {
                node_id,
                index,
                len,
            } => write!(f, "leaf {node_id} has {len} tabs; index {index} is out of range"),
            Self::EmptyTabList { node_id } => {
                write!(f, "leaf {node_id} cannot hold an empty tab list")
            }
            Self::SizeCountMismatch {
                node_id,
                expected,
                actual,
            } => write!(
                f,
                "split {node_id} has {expected} children but {actual} sizes were given"
            ),
            Self::ZeroSizes { node_id } => {
                write!(f, "sizes for split {node_id} must not all be zero")
            }
            Self::SizeBelowMinimum {
                node_id,
                size,
                min_size,
            } => write!(
                f,
                "panel {node_id} size {size} is below its minimum {min_size}"
            ),
            Self::PanelIdOverflow { current } => write!(f, "panel id overflow after {current}"),
            Self::Validation(err) => write!(f, "invalid resulting tree: {err}"),
        }
    }
}

impl std::error::Error for PanelOperationFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for PanelOperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.kind, self.reason)
    }
}

impl std::error::Error for PanelOperationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

#[derive(Debug, Default)]
struct Effects {
    touched: BTreeSet<PanelId>,
    removed: Vec<PanelId>,
    created_panel: Option<PanelId>,
    created_tab: Option<TabId>,
}

impl Effects {
    fn touch(&mut self, ids: impl IntoIterator<Item = PanelId>) {
        self.touched.extend(ids);
    }
}

/// Validated panel tree model for runtime usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelTree {
    schema_version: u16,
    root: PanelId,
    next_id: PanelId,
    next_tab: u64,
    nodes: BTreeMap<PanelId, PanelNode>,
    tab_index: FxHashMap<TabId, PanelId>,
}

impl Default for PanelTree {
    fn default() -> Self {
        Self::singleton()
    }
}

impl PanelTree {
    /// Build a tree with one root leaf holding one blank tab.
    #[must_use]
    pub fn singleton() -> Self {
        Self::singleton_after(PanelId::MIN, 1)
    }

    /// Like [`Self::singleton`], but the root panel and its blank tab are
    /// minted at or above `next_id` and `next_tab`.
    ///
    /// Used when a fallback tree must not collide with ids still referenced
    /// elsewhere.
    #[must_use]
    pub fn singleton_after(next_id: PanelId, next_tab: u64) -> Self {
        let root = next_id.max(PanelId::MIN);
        let sequence = next_tab.max(1);
        let mut tab = Tab::blank(TabId::from_sequence(sequence));
        tab.is_active = true;
        let mut nodes = BTreeMap::new();
        let _ = nodes.insert(root, PanelNode::leaf(root, None, vec![tab]));
        let mut tree = Self {
            schema_version: PANEL_TREE_SCHEMA_VERSION,
            root,
            next_id: root.checked_next().unwrap_or(root),
            next_tab: sequence.saturating_add(1),
            nodes,
            tab_index: FxHashMap::default(),
        };
        tree.rebuild_tab_index();
        tree
    }

    /// Build a single-leaf tree around caller-provided tabs.
    pub fn from_tabs(mut tabs: Vec<Tab>) -> Result<Self, PanelModelError> {
        let root = PanelId::MIN;
        if tabs.is_empty() {
            return Err(PanelModelError::EmptyLeaf { node_id: root });
        }
        tab::normalize_active(&mut tabs);
        let next_tab = tabs
            .iter()
            .filter_map(|tab| tab.id.sequence())
            .max()
            .map_or(1, |max| max.saturating_add(1));
        Self::from_snapshot(PanelTreeSnapshot {
            schema_version: PANEL_TREE_SCHEMA_VERSION,
            root,
            next_id: root.checked_next()?,
            next_tab,
            nodes: vec![PanelNode::leaf(root, None, tabs)],
        })
    }

    /// Construct and validate from a serial snapshot.
    pub fn from_snapshot(mut snapshot: PanelTreeSnapshot) -> Result<Self, PanelModelError> {
        if snapshot.schema_version != PANEL_TREE_SCHEMA_VERSION {
            return Err(PanelModelError::UnsupportedSchemaVersion {
                version: snapshot.schema_version,
            });
        }
        snapshot.canonicalize();
        let mut nodes = BTreeMap::new();
        for node in snapshot.nodes {
            let node_id = node.id;
            if nodes.insert(node_id, node).is_some() {
                return Err(PanelModelError::DuplicateNodeId { node_id });
            }
        }
        validate_tree(snapshot.root, snapshot.next_id, snapshot.next_tab, &nodes)?;
        let mut tree = Self {
            schema_version: snapshot.schema_version,
            root: snapshot.root,
            next_id: snapshot.next_id,
            next_tab: snapshot.next_tab,
            nodes,
            tab_index: FxHashMap::default(),
        };
        tree.rebuild_tab_index();
        Ok(tree)
    }

    /// Export to canonical snapshot form.
    #[must_use]
    pub fn to_snapshot(&self) -> PanelTreeSnapshot {
        PanelTreeSnapshot {
            schema_version: self.schema_version,
            root: self.root,
            next_id: self.next_id,
            next_tab: self.next_tab,
            nodes: self.nodes.values().cloned().collect(),
        }
    }

    /// Root node ID.
    #[must_use]
    pub const fn root(&self) -> PanelId {
        self.root
    }

    /// Next panel ID the allocator will hand out.
    #[must_use]
    pub const fn next_id(&self) -> PanelId {
        self.next_id
    }

    /// Next tab sequence the allocator will hand out.
    #[must_use]
    pub const fn next_tab(&self) -> u64 {
        self.next_tab
    }

    /// Lookup a node by ID.
    #[must_use]
    pub fn node(&self, id: PanelId) -> Option<&PanelNode> {
        self.nodes.get(&id)
    }

    /// Iterate nodes in canonical ID order.
    pub fn nodes(&self) -> impl Iterator<Item = &PanelNode> {
        self.nodes.values()
    }

    #[must_use]
    pub fn contains_panel(&self, id: PanelId) -> bool {
        self.nodes.contains_key(&id)
    }

    #[must_use]
    pub fn is_leaf(&self, id: PanelId) -> bool {
        self.nodes.get(&id).is_some_and(PanelNode::is_leaf)
    }

    /// Leaf IDs in visual order (depth-first, children in order).
    #[must_use]
    pub fn leaf_ids(&self) -> Vec<PanelId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            match &node.kind {
                PanelNodeKind::Leaf(_) => out.push(id),
                PanelNodeKind::Split(split) => stack.extend(split.children.iter().rev()),
            }
        }
        out
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.nodes.values().filter(|node| node.is_leaf()).count()
    }

    /// Tabs of a leaf panel.
    #[must_use]
    pub fn leaf_tabs(&self, panel: PanelId) -> Option<&[Tab]> {
        self.nodes.get(&panel).and_then(PanelNode::tabs)
    }

    /// Every tab in the tree, in canonical node order.
    pub fn tabs(&self) -> impl Iterator<Item = &Tab> {
        self.nodes.values().filter_map(PanelNode::tabs).flatten()
    }

    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.tab_index.len()
    }

    /// Leaf currently holding `tab_id`.
    #[must_use]
    pub fn panel_for_tab(&self, tab_id: &TabId) -> Option<PanelId> {
        self.tab_index.get(tab_id).copied()
    }

    #[must_use]
    pub fn tab(&self, tab_id: &TabId) -> Option<&Tab> {
        let panel = self.panel_for_tab(tab_id)?;
        self.leaf_tabs(panel)?.iter().find(|tab| &tab.id == tab_id)
    }

    /// Active tab of a leaf.
    #[must_use]
    pub fn active_tab(&self, panel: PanelId) -> Option<&Tab> {
        self.leaf_tabs(panel)?.iter().find(|tab| tab.is_active)
    }

    /// Validate internal invariants.
    pub fn validate(&self) -> Result<(), PanelModelError> {
        validate_tree(self.root, self.next_id, self.next_tab, &self.nodes)
    }

    /// Structured invariant diagnostics for the current tree.
    #[must_use]
    pub fn invariant_report(&self) -> PanelInvariantReport {
        PanelInvariantReport {
            issues: collect_issues(self.root, self.next_id, self.next_tab, &self.nodes),
        }
    }

    /// Deterministic structural hash of the current tree state.
    ///
    /// Intended for operation logs; covers topology, sizes, tab order and
    /// active flags but not tab metadata.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0001_0000_01b3;

        fn mix_bytes(hash: &mut u64, bytes: &[u8]) {
            for byte in bytes {
                *hash ^= u64::from(*byte);
                *hash = hash.wrapping_mul(PRIME);
            }
        }

        let mut hash = OFFSET_BASIS;
        mix_bytes(&mut hash, &self.root.0.to_le_bytes());
        mix_bytes(&mut hash, &self.next_id.0.to_le_bytes());
        mix_bytes(&mut hash, &self.next_tab.to_le_bytes());
        for node in self.nodes.values() {
            mix_bytes(&mut hash, &node.id.0.to_le_bytes());
            mix_bytes(&mut hash, &node.parent.map_or(0, PanelId::get).to_le_bytes());
            mix_bytes(&mut hash, &node.size.to_le_bytes());
            mix_bytes(&mut hash, &node.min_size.to_le_bytes());
            match &node.kind {
                PanelNodeKind::Leaf(leaf) => {
                    mix_bytes(&mut hash, &[0]);
                    for tab in &leaf.tabs {
                        mix_bytes(&mut hash, tab.id.as_str().as_bytes());
                        mix_bytes(&mut hash, &[u8::from(tab.is_active)]);
                    }
                }
                PanelNodeKind::Split(split) => {
                    let direction = match split.direction {
                        SplitDirection::Horizontal => 1,
                        SplitDirection::Vertical => 2,
                    };
                    mix_bytes(&mut hash, &[direction]);
                    for child in &split.children {
                        mix_bytes(&mut hash, &child.0.to_le_bytes());
                    }
                }
            }
        }
        hash
    }

    /// Mint a fresh tab ID.
    pub fn allocate_tab_id(&mut self) -> TabId {
        let id = TabId::from_sequence(self.next_tab);
        self.next_tab = self.next_tab.saturating_add(1);
        id
    }

    /// Mint a fresh inactive tab.
    pub fn new_tab(&mut self, title: impl Into<String>) -> Tab {
        Tab::new(self.allocate_tab_id(), title)
    }

    /// Move both allocators forward to at least the given values.
    ///
    /// Used when a restored tree replaces a live one so that IDs handed out
    /// by the live tree are never minted again.
    pub fn raise_allocators(&mut self, next_id: PanelId, next_tab: u64) {
        self.next_id = self.next_id.max(next_id);
        self.next_tab = self.next_tab.max(next_tab);
    }

    /// Apply one structural operation atomically.
    ///
    /// The operation is executed on a cloned working tree. On success, the
    /// validated clone replaces `self`; on failure, `self` is unchanged.
    pub fn apply_operation(
        &mut self,
        operation: PanelOperation,
    ) -> Result<PanelOperationOutcome, PanelOperationError> {
        let kind = operation.kind();
        let before_hash = self.state_hash();
        let mut working = self.clone();
        let mut effects = Effects::default();

        working
            .apply_operation_inner(operation, &mut effects)
            .map_err(|reason| PanelOperationError { kind, reason })?;
        working.validate().map_err(|err| PanelOperationError {
            kind,
            reason: PanelOperationFailure::Validation(err),
        })?;
        working.rebuild_tab_index();

        let after_hash = working.state_hash();
        *self = working;

        Ok(PanelOperationOutcome {
            kind,
            touched_nodes: effects.touched.into_iter().collect(),
            removed_nodes: effects.removed,
            created_panel: effects.created_panel,
            created_tab: effects.created_tab,
            before_hash,
            after_hash,
        })
    }

    /// Split a leaf. See [`PanelOperation::SplitPanel`].
    pub fn split_panel(
        &mut self,
        target: PanelId,
        direction: SplitDirection,
    ) -> Result<PanelOperationOutcome, PanelOperationError> {
        self.apply_operation(PanelOperation::SplitPanel { target, direction })
    }

    /// Remove a panel. See [`PanelOperation::RemovePanel`].
    pub fn remove_panel(
        &mut self,
        target: PanelId,
    ) -> Result<PanelOperationOutcome, PanelOperationError> {
        self.apply_operation(PanelOperation::RemovePanel { target })
    }

    /// Replace a leaf's tabs. See [`PanelOperation::UpdateLeafTabs`].
    pub fn update_leaf_tabs(
        &mut self,
        target: PanelId,
        tabs: Vec<Tab>,
    ) -> Result<PanelOperationOutcome, PanelOperationError> {
        self.apply_operation(PanelOperation::UpdateLeafTabs { target, tabs })
    }

    /// Close a tab. See [`PanelOperation::RemoveTab`].
    pub fn remove_tab(
        &mut self,
        tab: &TabId,
    ) -> Result<PanelOperationOutcome, PanelOperationError> {
        self.apply_operation(PanelOperation::RemoveTab { tab: tab.clone() })
    }

    /// Move a tab between leaves.
    pub fn move_tab(
        &mut self,
        tab: &TabId,
        target: PanelId,
        index: Option<usize>,
    ) -> Result<PanelOperationOutcome, PanelOperationError> {
        self.apply_operation(PanelOperation::MoveTab {
            tab: tab.clone(),
            target,
            index,
        })
    }

    /// Resize the children of a split.
    pub fn set_split_sizes(
        &mut self,
        split: PanelId,
        sizes: Vec<u16>,
    ) -> Result<PanelOperationOutcome, PanelOperationError> {
        self.apply_operation(PanelOperation::SetSplitSizes { split, sizes })
    }

    /// Append (or insert) a tab into a leaf and activate it.
    pub fn add_tab(
        &mut self,
        panel: PanelId,
        tab: Tab,
        index: Option<usize>,
    ) -> Result<PanelOperationOutcome, PanelOperationError> {
        let Some(current) = self.leaf_tabs(panel) else {
            let reason = if self.contains_panel(panel) {
                PanelOperationFailure::NodeNotLeaf { node_id: panel }
            } else {
                PanelOperationFailure::MissingNode { node_id: panel }
            };
            return Err(PanelOperationError {
                kind: PanelOperationKind::UpdateLeafTabs,
                reason,
            });
        };
        let mut tabs = current.to_vec();
        tab::insert_active(&mut tabs, tab, index);
        self.update_leaf_tabs(panel, tabs)
    }

    /// Activate a tab, clearing the flag on its siblings.
    pub fn activate_tab(
        &mut self,
        tab_id: &TabId,
    ) -> Result<PanelOperationOutcome, PanelOperationError> {
        let id = tab_id.clone();
        self.edit_tab(tab_id, move |tabs, _| {
            tab::activate(tabs, &id);
        })
    }

    pub fn rename_tab(
        &mut self,
        tab_id: &TabId,
        title: impl Into<String>,
    ) -> Result<PanelOperationOutcome, PanelOperationError> {
        let title = title.into();
        self.edit_tab(tab_id, move |tabs, index| tabs[index].title = title)
    }

    pub fn toggle_tab_lock(
        &mut self,
        tab_id: &TabId,
    ) -> Result<PanelOperationOutcome, PanelOperationError> {
        self.edit_tab(tab_id, |tabs, index| {
            tabs[index].is_locked = !tabs[index].is_locked;
        })
    }

    pub fn set_tab_dirty(
        &mut self,
        tab_id: &TabId,
        dirty: bool,
    ) -> Result<PanelOperationOutcome, PanelOperationError> {
        self.edit_tab(tab_id, move |tabs, index| tabs[index].is_dirty = dirty)
    }

    /// Record group membership on the tab itself.
    pub fn set_tab_group(
        &mut self,
        tab_id: &TabId,
        group: Option<GroupId>,
    ) -> Result<PanelOperationOutcome, PanelOperationError> {
        self.edit_tab(tab_id, move |tabs, index| tabs[index].group_id = group)
    }

    /// Record stack membership on the tab itself.
    pub fn set_tab_stack(
        &mut self,
        tab_id: &TabId,
        stack: Option<StackId>,
    ) -> Result<PanelOperationOutcome, PanelOperationError> {
        self.edit_tab(tab_id, move |tabs, index| tabs[index].stack_id = stack)
    }

    /// Reorder within a leaf.
    pub fn reorder_tab(
        &mut self,
        panel: PanelId,
        from: usize,
        to: usize,
    ) -> Result<PanelOperationOutcome, PanelOperationError> {
        let fail = |reason| PanelOperationError {
            kind: PanelOperationKind::MoveTab,
            reason,
        };
        let tabs = match self.node(panel) {
            None => return Err(fail(PanelOperationFailure::MissingNode { node_id: panel })),
            Some(node) => node
                .tabs()
                .ok_or_else(|| fail(PanelOperationFailure::NodeNotLeaf { node_id: panel }))?,
        };
        let Some(tab) = tabs.get(from) else {
            return Err(fail(PanelOperationFailure::TabIndexOutOfRange {
                node_id: panel,
                index: from,
                len: tabs.len(),
            }));
        };
        let tab_id = tab.id.clone();
        self.move_tab(&tab_id, panel, Some(to))
    }

    /// Duplicate a tab next to the original and activate the copy.
    ///
    /// Returns the new tab's ID in `created_tab`.
    pub fn duplicate_tab(
        &mut self,
        tab_id: &TabId,
    ) -> Result<PanelOperationOutcome, PanelOperationError> {
        if self.panel_for_tab(tab_id).is_none() {
            return Err(PanelOperationError {
                kind: PanelOperationKind::UpdateLeafTabs,
                reason: PanelOperationFailure::TabNotFound {
                    tab_id: tab_id.clone(),
                },
            });
        }
        let new_id = self.allocate_tab_id();
        let created = new_id.clone();
        let mut outcome = self.edit_tab(tab_id, move |tabs, index| {
            let copy = tabs[index].duplicate_as(new_id);
            tab::insert_active(tabs, copy, Some(index + 1));
        })?;
        outcome.created_tab = Some(created);
        Ok(outcome)
    }

    fn edit_tab(
        &mut self,
        tab_id: &TabId,
        edit: impl FnOnce(&mut Vec<Tab>, usize),
    ) -> Result<PanelOperationOutcome, PanelOperationError> {
        let located = self.panel_for_tab(tab_id).and_then(|panel| {
            let tabs = self.leaf_tabs(panel)?;
            let index = tabs.iter().position(|tab| &tab.id == tab_id)?;
            Some((panel, tabs.to_vec(), index))
        });
        let Some((panel, mut tabs, index)) = located else {
            return Err(PanelOperationError {
                kind: PanelOperationKind::UpdateLeafTabs,
                reason: PanelOperationFailure::TabNotFound {
                    tab_id: tab_id.clone(),
                },
            });
        };
        edit(&mut tabs, index);
        self.update_leaf_tabs(panel, tabs)
    }

    fn apply_operation_inner(
        &mut self,
        operation: PanelOperation,
        effects: &mut Effects,
    ) -> Result<(), PanelOperationFailure> {
        match operation {
            PanelOperation::SplitPanel { target, direction } => {
                self.apply_split_panel(target, direction, effects)
            }
            PanelOperation::RemovePanel { target } => self.apply_remove_panel(target, effects),
            PanelOperation::UpdateLeafTabs { target, tabs } => {
                self.apply_update_leaf_tabs(target, tabs, effects)
            }
            PanelOperation::RemoveTab { tab } => self.apply_remove_tab(&tab, effects),
            PanelOperation::MoveTab { tab, target, index } => {
                self.apply_move_tab(&tab, target, index, effects)
            }
            PanelOperation::SetSplitSizes { split, sizes } => {
                self.apply_set_split_sizes(split, &sizes, effects)
            }
        }
    }

    fn apply_split_panel(
        &mut self,
        target: PanelId,
        direction: SplitDirection,
        effects: &mut Effects,
    ) -> Result<(), PanelOperationFailure> {
        let (parent, size, min_size, source) = match self.nodes.get(&target) {
            Some(PanelNode {
                parent,
                size,
                min_size,
                kind: PanelNodeKind::Leaf(leaf),
                ..
            }) => (
                *parent,
                *size,
                *min_size,
                leaf.tabs.iter().find(|tab| tab.is_active).cloned(),
            ),
            Some(_) => return Err(PanelOperationFailure::NodeNotLeaf { node_id: target }),
            None => return Err(PanelOperationFailure::MissingNode { node_id: target }),
        };

        let split_id = self.allocate_node_id()?;
        let new_leaf_id = self.allocate_node_id()?;
        let tab_id = self.allocate_tab_id();
        let mut new_tab = match &source {
            Some(active) => active.duplicate_as(tab_id),
            None => Tab::blank(tab_id),
        };
        new_tab.is_active = true;

        effects.touch([target, split_id, new_leaf_id]);
        effects.touch(parent);
        effects.created_panel = Some(new_leaf_id);
        effects.created_tab = Some(new_tab.id.clone());

        let half = FULL_SIZE / 2;
        if let Some(node) = self.nodes.get_mut(&target) {
            node.parent = Some(split_id);
            node.size = half;
            node.min_size = DEFAULT_MIN_SIZE;
        }
        let _ = self.nodes.insert(
            new_leaf_id,
            PanelNode::leaf(new_leaf_id, Some(split_id), vec![new_tab])
                .with_size(FULL_SIZE - half),
        );
        let mut split = PanelNode::split(split_id, parent, direction, vec![target, new_leaf_id])
            .with_size(size);
        split.min_size = min_size;
        let _ = self.nodes.insert(split_id, split);

        match parent {
            Some(parent_id) => self.replace_child(parent_id, target, split_id),
            None => {
                self.root = split_id;
                Ok(())
            }
        }
    }

    fn apply_remove_panel(
        &mut self,
        target: PanelId,
        effects: &mut Effects,
    ) -> Result<(), PanelOperationFailure> {
        let (parent, is_leaf) = match self.nodes.get(&target) {
            Some(node) => (node.parent, node.is_leaf()),
            None => return Err(PanelOperationFailure::MissingNode { node_id: target }),
        };

        let Some(parent_id) = parent else {
            if !is_leaf {
                return Err(PanelOperationFailure::CannotRemoveRoot { node_id: target });
            }
            return self.reset_with_blank_tab(target, effects);
        };

        let subtree = self.collect_subtree_ids(target)?;
        self.detach_child(parent_id, target)?;
        for node_id in &subtree {
            let _ = self.nodes.remove(node_id);
        }
        effects.touch([parent_id]);
        effects.removed.extend(subtree);
        self.collapse_lone_splits(parent_id, effects)
    }

    fn apply_update_leaf_tabs(
        &mut self,
        target: PanelId,
        mut tabs: Vec<Tab>,
        effects: &mut Effects,
    ) -> Result<(), PanelOperationFailure> {
        if tabs.is_empty() {
            return Err(PanelOperationFailure::EmptyTabList { node_id: target });
        }
        let leaf = self.leaf_mut(target)?;
        tab::normalize_active(&mut tabs);
        leaf.tabs = tabs;
        effects.touch([target]);
        Ok(())
    }

    fn apply_remove_tab(
        &mut self,
        tab_id: &TabId,
        effects: &mut Effects,
    ) -> Result<(), PanelOperationFailure> {
        let panel = self
            .panel_for_tab(tab_id)
            .ok_or_else(|| PanelOperationFailure::TabNotFound {
                tab_id: tab_id.clone(),
            })?;
        effects.touch([panel]);

        let leaf = self.leaf_mut(panel)?;
        if tab::remove(&mut leaf.tabs, tab_id).is_none() {
            return Err(PanelOperationFailure::TabNotFound {
                tab_id: tab_id.clone(),
            });
        }
        if !leaf.tabs.is_empty() {
            return Ok(());
        }

        if panel == self.root {
            self.reset_with_blank_tab(panel, effects)
        } else {
            self.apply_remove_panel(panel, effects)
        }
    }

    fn apply_move_tab(
        &mut self,
        tab_id: &TabId,
        target: PanelId,
        index: Option<usize>,
        effects: &mut Effects,
    ) -> Result<(), PanelOperationFailure> {
        let source = self
            .panel_for_tab(tab_id)
            .ok_or_else(|| PanelOperationFailure::TabNotFound {
                tab_id: tab_id.clone(),
            })?;
        let _ = self.leaf_mut(target)?;
        effects.touch([source, target]);

        if source == target {
            let leaf = self.leaf_mut(target)?;
            let from = leaf
                .tabs
                .iter()
                .position(|tab| &tab.id == tab_id)
                .ok_or_else(|| PanelOperationFailure::TabNotFound {
                    tab_id: tab_id.clone(),
                })?;
            let to = index.unwrap_or(leaf.tabs.len().saturating_sub(1));
            tab::reorder(&mut leaf.tabs, from, to);
            return Ok(());
        }

        let leaf = self.leaf_mut(source)?;
        let mut moved =
            tab::remove(&mut leaf.tabs, tab_id).ok_or_else(|| PanelOperationFailure::TabNotFound {
                tab_id: tab_id.clone(),
            })?;
        let source_emptied = leaf.tabs.is_empty();
        // Stacks are panel-local.
        moved.stack_id = None;
        moved.is_active = false;

        let destination = self.leaf_mut(target)?;
        tab::insert_active(&mut destination.tabs, moved, index);

        if !source_emptied {
            return Ok(());
        }
        if source == self.root {
            self.reset_with_blank_tab(source, effects)
        } else {
            self.apply_remove_panel(source, effects)
        }
    }

    fn apply_set_split_sizes(
        &mut self,
        split_id: PanelId,
        sizes: &[u16],
        effects: &mut Effects,
    ) -> Result<(), PanelOperationFailure> {
        let children = match self.nodes.get(&split_id) {
            Some(PanelNode {
                kind: PanelNodeKind::Split(split),
                ..
            }) => split.children.clone(),
            Some(_) => return Err(PanelOperationFailure::NodeNotSplit { node_id: split_id }),
            None => return Err(PanelOperationFailure::MissingNode { node_id: split_id }),
        };
        if sizes.len() != children.len() {
            return Err(PanelOperationFailure::SizeCountMismatch {
                node_id: split_id,
                expected: children.len(),
                actual: sizes.len(),
            });
        }
        if sizes.iter().all(|size| *size == 0) {
            return Err(PanelOperationFailure::ZeroSizes { node_id: split_id });
        }

        let normalized = normalize_sizes(sizes);
        for (child, size) in children.iter().zip(&normalized) {
            let min_size = self.nodes.get(child).map_or(0, |node| node.min_size);
            if *size < min_size {
                return Err(PanelOperationFailure::SizeBelowMinimum {
                    node_id: *child,
                    size: *size,
                    min_size,
                });
            }
        }
        for (child, size) in children.iter().zip(normalized) {
            if let Some(node) = self.nodes.get_mut(child) {
                node.size = size;
            }
        }
        effects.touch([split_id]);
        effects.touch(children);
        Ok(())
    }

    fn reset_with_blank_tab(
        &mut self,
        panel: PanelId,
        effects: &mut Effects,
    ) -> Result<(), PanelOperationFailure> {
        let mut blank = Tab::blank(self.allocate_tab_id());
        blank.is_active = true;
        effects.created_tab = Some(blank.id.clone());
        effects.touch([panel]);
        let leaf = self.leaf_mut(panel)?;
        leaf.tabs = vec![blank];
        Ok(())
    }

    /// Replace every split left with a single child by that child, walking
    /// upward from `start`. The promoted child inherits the split's size.
    fn collapse_lone_splits(
        &mut self,
        start: PanelId,
        effects: &mut Effects,
    ) -> Result<(), PanelOperationFailure> {
        let mut current = start;
        loop {
            let (child, grandparent, size) = match self.nodes.get(&current) {
                Some(PanelNode {
                    parent,
                    size,
                    kind: PanelNodeKind::Split(split),
                    ..
                }) if split.children.len() == 1 => (split.children[0], *parent, *size),
                _ => return Ok(()),
            };

            let _ = self.nodes.remove(&current);
            effects.removed.push(current);
            effects.touch([child]);
            if let Some(node) = self.nodes.get_mut(&child) {
                node.parent = grandparent;
                node.size = size;
            }

            match grandparent {
                Some(grandparent_id) => {
                    self.replace_child(grandparent_id, current, child)?;
                    effects.touch([grandparent_id]);
                    current = grandparent_id;
                }
                None => {
                    self.root = child;
                    return Ok(());
                }
            }
        }
    }

    fn leaf_mut(&mut self, id: PanelId) -> Result<&mut PanelLeaf, PanelOperationFailure> {
        match self.nodes.get_mut(&id) {
            Some(PanelNode {
                kind: PanelNodeKind::Leaf(leaf),
                ..
            }) => Ok(leaf),
            Some(_) => Err(PanelOperationFailure::NodeNotLeaf { node_id: id }),
            None => Err(PanelOperationFailure::MissingNode { node_id: id }),
        }
    }

    fn children_mut(&mut self, id: PanelId) -> Result<&mut Vec<PanelId>, PanelOperationFailure> {
        match self.nodes.get_mut(&id) {
            Some(PanelNode {
                kind: PanelNodeKind::Split(split),
                ..
            }) => Ok(&mut split.children),
            Some(_) => Err(PanelOperationFailure::NodeNotSplit { node_id: id }),
            None => Err(PanelOperationFailure::MissingNode { node_id: id }),
        }
    }

    fn replace_child(
        &mut self,
        parent_id: PanelId,
        old_child: PanelId,
        new_child: PanelId,
    ) -> Result<(), PanelOperationFailure> {
        let children = self.children_mut(parent_id)?;
        let slot = children
            .iter_mut()
            .find(|child| **child == old_child)
            .ok_or(PanelOperationFailure::ParentChildMismatch {
                parent: parent_id,
                child: old_child,
            })?;
        *slot = new_child;
        Ok(())
    }

    /// Unlink `child` from its parent and rebalance the remaining siblings
    /// so their sizes again sum to [`FULL_SIZE`].
    fn detach_child(
        &mut self,
        parent_id: PanelId,
        child: PanelId,
    ) -> Result<(), PanelOperationFailure> {
        let children = self.children_mut(parent_id)?;
        let position = children.iter().position(|id| *id == child).ok_or(
            PanelOperationFailure::ParentChildMismatch {
                parent: parent_id,
                child,
            },
        )?;
        children.remove(position);
        let remaining = children.clone();

        let raw: Vec<u16> = remaining
            .iter()
            .map(|id| self.nodes.get(id).map_or(0, |node| node.size))
            .collect();
        for (id, size) in remaining.iter().zip(normalize_sizes(&raw)) {
            if let Some(node) = self.nodes.get_mut(id) {
                node.size = size;
            }
        }
        Ok(())
    }

    fn collect_subtree_ids(
        &self,
        root_id: PanelId,
    ) -> Result<Vec<PanelId>, PanelOperationFailure> {
        let mut out = Vec::new();
        let mut stack = vec![root_id];
        while let Some(node_id) = stack.pop() {
            let node = self
                .nodes
                .get(&node_id)
                .ok_or(PanelOperationFailure::MissingNode { node_id })?;
            out.push(node_id);
            stack.extend(node.children().iter().copied());
        }
        Ok(out)
    }

    fn allocate_node_id(&mut self) -> Result<PanelId, PanelOperationFailure> {
        let current = self.next_id;
        self.next_id = self
            .next_id
            .checked_next()
            .map_err(|_| PanelOperationFailure::PanelIdOverflow { current })?;
        Ok(current)
    }

    fn rebuild_tab_index(&mut self) {
        self.tab_index.clear();
        for node in self.nodes.values() {
            if let PanelNodeKind::Leaf(leaf) = &node.kind {
                for tab in &leaf.tabs {
                    let _ = self.tab_index.insert(tab.id.clone(), node.id);
                }
            }
        }
    }
}

/// Scale `raw` so the values sum to exactly [`FULL_SIZE`].
///
/// Rounding remainder goes to the last entry. All-zero input is split evenly.
#[must_use]
pub fn normalize_sizes(raw: &[u16]) -> Vec<u16> {
    if raw.is_empty() {
        return Vec::new();
    }
    let full = u32::from(FULL_SIZE);
    let total: u32 = raw.iter().map(|size| u32::from(*size)).sum();
    let mut out: Vec<u16> = if total == 0 {
        vec![(full / raw.len() as u32) as u16; raw.len()]
    } else {
        raw.iter()
            .map(|size| (u32::from(*size) * full / total) as u16)
            .collect()
    };
    let assigned: u32 = out.iter().map(|size| u32::from(*size)).sum();
    if let Some(last) = out.last_mut() {
        *last += (full - assigned) as u16;
    }
    out
}

/// Validation errors for panel tree construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelModelError {
    ZeroPanelId,
    UnsupportedSchemaVersion {
        version: u16,
    },
    DuplicateNodeId {
        node_id: PanelId,
    },
    MissingRoot {
        root: PanelId,
    },
    RootHasParent {
        root: PanelId,
        parent: PanelId,
    },
    MissingParent {
        node_id: PanelId,
        parent: PanelId,
    },
    MissingChild {
        parent: PanelId,
        child: PanelId,
    },
    MultipleParents {
        child: PanelId,
        first_parent: PanelId,
        second_parent: PanelId,
    },
    ParentMismatch {
        node_id: PanelId,
        expected: Option<PanelId>,
        actual: Option<PanelId>,
    },
    SelfReferentialSplit {
        node_id: PanelId,
    },
    DuplicateSplitChildren {
        node_id: PanelId,
        child: PanelId,
    },
    UnderfilledSplit {
        node_id: PanelId,
        children: usize,
    },
    EmptyLeaf {
        node_id: PanelId,
    },
    ActiveTabCount {
        node_id: PanelId,
        active: usize,
    },
    DuplicateTabId {
        tab_id: TabId,
    },
    InvalidSize {
        node_id: PanelId,
        size: u16,
        min_size: u16,
    },
    CycleDetected {
        node_id: PanelId,
    },
    UnreachableNode {
        node_id: PanelId,
    },
    NextIdNotGreaterThanExisting {
        next_id: PanelId,
        max_existing: PanelId,
    },
    TabSequenceBehind {
        next_tab: u64,
        max_existing: u64,
    },
    PanelIdOverflow {
        current: PanelId,
    },
}

impl PanelModelError {
    /// Stable machine-readable code for reports.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ZeroPanelId => "zero_panel_id",
            Self::UnsupportedSchemaVersion { .. } => "unsupported_schema_version",
            Self::DuplicateNodeId { .. } => "duplicate_node_id",
            Self::MissingRoot { .. } => "missing_root",
            Self::RootHasParent { .. } => "root_has_parent",
            Self::MissingParent { .. } => "missing_parent",
            Self::MissingChild { .. } => "missing_child",
            Self::MultipleParents { .. } => "multiple_parents",
            Self::ParentMismatch { .. } => "parent_mismatch",
            Self::SelfReferentialSplit { .. } => "self_referential_split",
            Self::DuplicateSplitChildren { .. } => "duplicate_split_children",
            Self::UnderfilledSplit { .. } => "underfilled_split",
            Self::EmptyLeaf { .. } => "empty_leaf",
            Self::ActiveTabCount { .. } => "active_tab_count",
            Self::DuplicateTabId { .. } => "duplicate_tab_id",
            Self::InvalidSize { .. } => "invalid_size",
            Self::CycleDetected { .. } => "cycle_detected",
            Self::UnreachableNode { .. } => "unreachable_node",
            Self::NextIdNotGreaterThanExisting { .. } => "next_id_not_greater_than_existing",
            Self::TabSequenceBehind { .. } => "tab_sequence_behind",
            Self::PanelIdOverflow { .. } => "panel_id_overflow",
        }
    }
}

impl fmt::Display for PanelModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPanelId => write!(f, "panel id 0 is invalid"),
            Self::UnsupportedSchemaVersion { version } => write!(
                f,
                "unsupported panel schema version {version} (expected {PANEL_TREE_SCHEMA_VERSION})"
            ),
            Self::DuplicateNodeId { node_id } => write!(f, "duplicate panel node id {node_id}"),
            Self::MissingRoot { root } => write!(f, "root panel node {root} not found"),
            Self::RootHasParent { root, parent } => {
                write!(f, "root panel node {root} must not have parent {parent}")
            }
            Self::MissingParent { node_id, parent } => {
                write!(f, "node {node_id} references missing parent {parent}")
            }
            Self::MissingChild { parent, child } => {
                write!(f, "split node {parent} references missing child {child}")
            }
            Self::MultipleParents {
                child,
                first_parent,
                second_parent,
            } => write!(
                f,
                "node {child} has multiple parents: {first_parent} and {second_parent}"
            ),
            Self::ParentMismatch {
                node_id,
                expected,
                actual,
            } => write!(
                f,
                "node {node_id} parent mismatch: expected {:?}, got {:?}",
                expected.map(PanelId::get),
                actual.map(PanelId::get)
            ),
            Self::SelfReferentialSplit { node_id } => {
                write!(f, "split node {node_id} cannot reference itself")
            }
            Self::DuplicateSplitChildren { node_id, child } => {
                write!(f, "split node {node_id} references child {child} twice")
            }
            Self::UnderfilledSplit { node_id, children } => write!(
                f,
                "split node {node_id} has {children} child(ren); at least 2 required"
            ),
            Self::EmptyLeaf { node_id } => write!(f, "leaf {node_id} has no tabs"),
            Self::ActiveTabCount { node_id, active } => write!(
                f,
                "leaf {node_id} has {active} active tabs; exactly 1 required"
            ),
            Self::DuplicateTabId { tab_id } => write!(f, "tab {tab_id} appears more than once"),
            Self::InvalidSize {
                node_id,
                size,
                min_size,
            } => write!(
                f,
                "node {node_id} size {size} / min {min_size} exceeds {FULL_SIZE}"
            ),
            Self::CycleDetected { node_id } => write!(f, "cycle detected at node {node_id}"),
            Self::UnreachableNode { node_id } => {
                write!(f, "node {node_id} is unreachable from root")
            }
            Self::NextIdNotGreaterThanExisting {
                next_id,
                max_existing,
            } => write!(
                f,
                "next_id {next_id} must be greater than max existing id {max_existing}"
            ),
            Self::TabSequenceBehind {
                next_tab,
                max_existing,
            } => write!(
                f,
                "next tab sequence {next_tab} must be greater than existing tab-{max_existing}"
            ),
            Self::PanelIdOverflow { current } => write!(f, "panel id overflow after {current}"),
        }
    }
}

impl std::error::Error for PanelModelError {}

fn validate_tree(
    root: PanelId,
    next_id: PanelId,
    next_tab: u64,
    nodes: &BTreeMap<PanelId, PanelNode>,
) -> Result<(), PanelModelError> {
    match collect_issues(root, next_id, next_tab, nodes).into_iter().next() {
        Some(issue) => Err(issue),
        None => Ok(()),
    }
}

fn collect_issues(
    root: PanelId,
    next_id: PanelId,
    next_tab: u64,
    nodes: &BTreeMap<PanelId, PanelNode>,
) -> Vec<PanelModelError> {
    let mut issues = Vec::new();
    let Some(root_node) = nodes.get(&root) else {
        issues.push(PanelModelError::MissingRoot { root });
        return issues;
    };

    if let Some(max_existing) = nodes.keys().next_back().copied()
        && next_id <= max_existing
    {
        issues.push(PanelModelError::NextIdNotGreaterThanExisting {
            next_id,
            max_existing,
        });
    }

    let mut expected_parents: BTreeMap<PanelId, PanelId> = BTreeMap::new();
    let mut seen_tabs: BTreeSet<&TabId> = BTreeSet::new();
    let mut max_tab_sequence: Option<u64> = None;

    for node in nodes.values() {
        if node.size > FULL_SIZE || node.min_size > FULL_SIZE {
            issues.push(PanelModelError::InvalidSize {
                node_id: node.id,
                size: node.size,
                min_size: node.min_size,
            });
        }

        if let Some(parent) = node.parent
            && !nodes.contains_key(&parent)
        {
            issues.push(PanelModelError::MissingParent {
                node_id: node.id,
                parent,
            });
        }

        match &node.kind {
            PanelNodeKind::Leaf(leaf) => {
                if leaf.tabs.is_empty() {
                    issues.push(PanelModelError::EmptyLeaf { node_id: node.id });
                } else {
                    let active = leaf.tabs.iter().filter(|tab| tab.is_active).count();
                    if active != 1 {
                        issues.push(PanelModelError::ActiveTabCount {
                            node_id: node.id,
                            active,
                        });
                    }
                }
                for tab in &leaf.tabs {
                    if !seen_tabs.insert(&tab.id) {
                        issues.push(PanelModelError::DuplicateTabId {
                            tab_id: tab.id.clone(),
                        });
                    }
                    if let Some(sequence) = tab.id.sequence() {
                        max_tab_sequence = max_tab_sequence.max(Some(sequence));
                    }
                }
            }
            PanelNodeKind::Split(split) => {
                if split.children.len() < 2 {
                    issues.push(PanelModelError::UnderfilledSplit {
                        node_id: node.id,
                        children: split.children.len(),
                    });
                }
                let mut local = BTreeSet::new();
                for child in &split.children {
                    if *child == node.id {
                        issues.push(PanelModelError::SelfReferentialSplit { node_id: node.id });
                        continue;
                    }
                    if !local.insert(*child) {
                        issues.push(PanelModelError::DuplicateSplitChildren {
                            node_id: node.id,
                            child: *child,
                        });
                        continue;
                    }
                    if !nodes.contains_key(child) {
                        issues.push(PanelModelError::MissingChild {
                            parent: node.id,
                            child: *child,
                        });
                        continue;
                    }
                    if let Some(first_parent) = expected_parents.insert(*child, node.id) {
                        issues.push(PanelModelError::MultipleParents {
                            child: *child,
                            first_parent,
                            second_parent: node.id,
                        });
                    }
                }
            }
        }
    }

    if let Some(max_existing) = max_tab_sequence
        && next_tab <= max_existing
    {
        issues.push(PanelModelError::TabSequenceBehind {
            next_tab,
            max_existing,
        });
    }

    if let Some(parent) = root_node.parent {
        issues.push(PanelModelError::RootHasParent { root, parent });
    }

    for node in nodes.values() {
        let expected = if node.id == root {
            None
        } else {
            expected_parents.get(&node.id).copied()
        };
        if node.parent != expected && !(node.id == root && node.parent.is_some()) {
            issues.push(PanelModelError::ParentMismatch {
                node_id: node.id,
                expected,
                actual: node.parent,
            });
        }
    }

    let mut visited = BTreeSet::new();
    let mut stack = vec![root];
    while let Some(node_id) = stack.pop() {
        if !visited.insert(node_id) {
            issues.push(PanelModelError::CycleDetected { node_id });
            continue;
        }
        if let Some(node) = nodes.get(&node_id) {
            stack.extend(
                node.children()
                    .iter()
                    .filter(|child| nodes.contains_key(*child)),
            );
        }
    }
    for node_id in nodes.keys() {
        if !visited.contains(node_id) {
            issues.push(PanelModelError::UnreachableNode { node_id: *node_id });
        }
    }

    issues
}
