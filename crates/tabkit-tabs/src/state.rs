//! Persisted `tabManager` blob.
//!
//! The blob carries every manager index under camelCase keys plus a schema
//! version and the id sequence counter. Each top-level key is optional on
//! read; settings are parsed leniently (see [`crate::settings`]).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::group::TabGroup;
use crate::history::NavigationHistory;
use crate::layout::WorkspaceLayout;
use crate::shortcuts::ShortcutMap;
use crate::stack::TabStack;

/// Blob-store key for the manager state.
pub const TAB_MANAGER_KEY: &str = "tabManager";

/// Blob-store key for the live panel tree snapshot.
pub const PANEL_LAYOUT_KEY: &str = "panelLayout";

/// Current `tabManager` blob schema version.
pub const TAB_MANAGER_SCHEMA_VERSION: u16 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabManagerState {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    #[serde(default)]
    pub next_seq: u64,
    #[serde(default)]
    pub tab_groups: Vec<TabGroup>,
    #[serde(default)]
    pub tab_stacks: Vec<TabStack>,
    #[serde(default)]
    pub workspace_layouts: Vec<WorkspaceLayout>,
    #[serde(default)]
    pub navigation_histories: Vec<NavigationHistory>,
    #[serde(default)]
    pub shortcuts: ShortcutMap,
    #[serde(default)]
    pub settings: Value,
}

fn default_schema_version() -> u16 {
    TAB_MANAGER_SCHEMA_VERSION
}

/// Why a stored blob could not be used.
#[derive(Debug)]
pub enum StateDecodeError {
    Malformed(serde_json::Error),
    UnsupportedSchemaVersion { found: u16 },
}

impl fmt::Display for StateDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "malformed tabManager blob: {err}"),
            Self::UnsupportedSchemaVersion { found } => write!(
                f,
                "unsupported tabManager schema version {found} (expected {TAB_MANAGER_SCHEMA_VERSION})"
            ),
        }
    }
}

impl std::error::Error for StateDecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Malformed(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl TabManagerState {
    /// Parse and version-check a stored blob.
    pub fn decode(payload: &str) -> Result<Self, StateDecodeError> {
        let state: Self = serde_json::from_str(payload).map_err(StateDecodeError::Malformed)?;
        if state.schema_version != TAB_MANAGER_SCHEMA_VERSION {
            return Err(StateDecodeError::UnsupportedSchemaVersion {
                found: state.schema_version,
            });
        }
        Ok(state)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_decodes_to_defaults() {
        let state = TabManagerState::decode("{}").expect("decode");
        assert_eq!(state.schema_version, TAB_MANAGER_SCHEMA_VERSION);
        assert!(state.tab_groups.is_empty());
        assert_eq!(state.shortcuts, ShortcutMap::default());
        assert!(state.settings.is_null());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            TabManagerState::decode("{not json"),
            Err(StateDecodeError::Malformed(_))
        ));
    }

    #[test]
    fn future_schema_is_rejected() {
        let err = TabManagerState::decode(r#"{"schemaVersion": 7}"#).expect_err("version");
        assert!(err.to_string().contains("unsupported tabManager schema version 7"));
    }
}
