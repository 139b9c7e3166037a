//! Action-name to key-chord bindings.
//!
//! Only the table lives here; dispatching chords to actions is the host's job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Built-in bindings restored by [`ShortcutMap::reset`].
pub const DEFAULT_SHORTCUTS: &[(&str, &str)] = &[
    ("tab.new", "Ctrl+T"),
    ("tab.close", "Ctrl+W"),
    ("tab.next", "Ctrl+Tab"),
    ("tab.previous", "Ctrl+Shift+Tab"),
    ("panel.splitHorizontal", "Ctrl+\\"),
    ("panel.splitVertical", "Ctrl+Shift+\\"),
    ("history.back", "Alt+Left"),
    ("history.forward", "Alt+Right"),
    ("layout.save", "Ctrl+Shift+S"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortcutMap(BTreeMap<String, String>);

impl Default for ShortcutMap {
    fn default() -> Self {
        Self(
            DEFAULT_SHORTCUTS
                .iter()
                .map(|(action, chord)| ((*action).to_string(), (*chord).to_string()))
                .collect(),
        )
    }
}

impl ShortcutMap {
    #[must_use]
    pub fn get(&self, action: &str) -> Option<&str> {
        self.0.get(action).map(String::as_str)
    }

    /// Bind `chord` to `action`, replacing any previous binding.
    ///
    /// A chord already bound to another action is released from it.
    pub fn set(&mut self, action: impl Into<String>, chord: impl Into<String>) {
        let action = action.into();
        let chord = chord.into();
        self.0
            .retain(|existing, bound| existing == &action || bound != &chord);
        let _ = self.0.insert(action, chord);
    }

    /// Restore the built-in table.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(action, chord)| (action.as_str(), chord.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_core_actions() {
        let map = ShortcutMap::default();
        assert_eq!(map.len(), DEFAULT_SHORTCUTS.len());
        assert_eq!(map.get("history.back"), Some("Alt+Left"));
        assert_eq!(map.get("unknown"), None);
    }

    #[test]
    fn set_releases_chord_from_previous_action() {
        let mut map = ShortcutMap::default();
        map.set("layout.save", "Ctrl+T");
        assert_eq!(map.get("layout.save"), Some("Ctrl+T"));
        assert_eq!(map.get("tab.new"), None);
        map.reset();
        assert_eq!(map.get("tab.new"), Some("Ctrl+T"));
    }
}
