#![forbid(unsafe_code)]

//! Tab records and the split panel tree.
//!
//! This crate owns the structural half of a tabkit workspace: which panels
//! exist, how they are split, and which tabs each leaf shows. Cross-panel
//! concerns (groups, stacks, history, saved layouts) live in `tabkit-tabs`.

pub mod panel;
pub mod tab;

pub use panel::{
    DEFAULT_MIN_SIZE, FULL_SIZE, PANEL_TREE_SCHEMA_VERSION, PanelId, PanelInvariantReport,
    PanelLeaf, PanelModelError, PanelNode, PanelNodeKind, PanelOperation, PanelOperationError,
    PanelOperationFailure, PanelOperationKind, PanelOperationOutcome, PanelSplit, PanelTree,
    PanelTreeSnapshot, SplitDirection, normalize_sizes,
};
pub use tab::{BLANK_TAB_TITLE, GroupId, StackId, Tab, TabId};
