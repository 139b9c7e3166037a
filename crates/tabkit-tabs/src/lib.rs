#![forbid(unsafe_code)]

//! Tab manager indices that live beside the panel tree.
//!
//! Groups, stacks, per-panel navigation history, saved workspace layouts,
//! settings and shortcuts, plus the persisted `tabManager` blob.

pub mod group;
pub mod history;
pub mod layout;
pub mod manager;
pub mod settings;
pub mod shortcuts;
pub mod stack;
pub mod state;

pub use group::{GroupAssignment, GroupRegistry, TabGroup};
pub use history::{DEFAULT_HISTORY_LIMIT, Histories, NavigationHistory};
pub use layout::{LayoutId, WorkspaceLayout};
pub use manager::TabManager;
pub use settings::{StackingStrategy, TabSettings};
pub use shortcuts::{DEFAULT_SHORTCUTS, ShortcutMap};
pub use stack::{StackAssignment, StackRegistry, TabStack};
pub use state::{
    PANEL_LAYOUT_KEY, StateDecodeError, TAB_MANAGER_KEY, TAB_MANAGER_SCHEMA_VERSION,
    TabManagerState,
};
