//! Tab display settings.
//!
//! Settings are parsed field by field from the persisted JSON value so a
//! single bad field falls back to its default without discarding the rest.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How overflowing tab strips are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackingStrategy {
    /// Stack once a panel shows more than `max_visible_tabs` tabs.
    #[default]
    Overflow,
    /// Reserved.
    Group,
    /// Reserved.
    Manual,
}

impl StackingStrategy {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "overflow" => Some(Self::Overflow),
            "group" => Some(Self::Group),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// User-facing tab behaviour knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSettings {
    pub max_visible_tabs: usize,
    pub enable_auto_stacking: bool,
    pub stacking_strategy: StackingStrategy,
    pub enable_tab_groups: bool,
    pub show_tab_preview: bool,
}

impl Default for TabSettings {
    fn default() -> Self {
        Self {
            max_visible_tabs: 8,
            enable_auto_stacking: true,
            stacking_strategy: StackingStrategy::Overflow,
            enable_tab_groups: true,
            show_tab_preview: true,
        }
    }
}

impl TabSettings {
    /// Whether a panel showing `tab_count` tabs should collapse into a stack.
    #[must_use]
    pub fn should_stack(&self, tab_count: usize) -> bool {
        self.enable_auto_stacking
            && self.stacking_strategy == StackingStrategy::Overflow
            && tab_count > self.max_visible_tabs
    }

    /// Validate settings and return human-readable errors.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_visible_tabs == 0 {
            errors.push("maxVisibleTabs must be > 0".to_string());
        }
        errors
    }

    /// Replace invalid fields with their defaults, returning what was fixed.
    #[must_use]
    pub fn sanitized(mut self) -> (Self, Vec<String>) {
        let problems = self.validate();
        if self.max_visible_tabs == 0 {
            self.max_visible_tabs = Self::default().max_visible_tabs;
        }
        (self, problems)
    }

    /// Lenient parse from a persisted JSON value.
    ///
    /// Unknown keys are ignored; missing, mistyped or out-of-range fields
    /// take their defaults and are reported.
    #[must_use]
    pub fn from_value(value: &Value) -> (Self, Vec<String>) {
        let mut settings = Self::default();
        let mut problems = Vec::new();
        let Some(object) = value.as_object() else {
            if !value.is_null() {
                problems.push("settings must be an object".to_string());
            }
            return (settings, problems);
        };

        if let Some(raw) = object.get("maxVisibleTabs") {
            match raw.as_u64().and_then(|n| usize::try_from(n).ok()) {
                Some(n) if n > 0 => settings.max_visible_tabs = n,
                _ => problems.push(format!("invalid maxVisibleTabs {raw}")),
            }
        }
        let mut read_bool = |key: &str, slot: &mut bool| {
            if let Some(raw) = object.get(key) {
                match raw.as_bool() {
                    Some(flag) => *slot = flag,
                    None => problems.push(format!("invalid {key} {raw}")),
                }
            }
        };
        read_bool("enableAutoStacking", &mut settings.enable_auto_stacking);
        read_bool("enableTabGroups", &mut settings.enable_tab_groups);
        read_bool("showTabPreview", &mut settings.show_tab_preview);

        if let Some(raw) = object.get("stackingStrategy") {
            match raw.as_str().and_then(StackingStrategy::parse) {
                Some(strategy) => settings.stacking_strategy = strategy,
                None => problems.push(format!("invalid stackingStrategy {raw}")),
            }
        }
        (settings, problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_documented_values() {
        let settings = TabSettings::default();
        assert_eq!(settings.max_visible_tabs, 8);
        assert!(settings.enable_auto_stacking);
        assert_eq!(settings.stacking_strategy, StackingStrategy::Overflow);
        assert!(settings.enable_tab_groups);
        assert!(settings.show_tab_preview);
    }

    #[test]
    fn should_stack_needs_overflow() {
        let settings = TabSettings::default();
        assert!(settings.should_stack(9));
        assert!(!settings.should_stack(8));

        let manual = TabSettings {
            stacking_strategy: StackingStrategy::Manual,
            ..TabSettings::default()
        };
        assert!(!manual.should_stack(20));

        let off = TabSettings {
            enable_auto_stacking: false,
            ..TabSettings::default()
        };
        assert!(!off.should_stack(20));
    }

    #[test]
    fn from_value_keeps_good_fields_and_reports_bad_ones() {
        let value = json!({
            "maxVisibleTabs": 0,
            "enableAutoStacking": false,
            "stackingStrategy": "sideways",
            "enableTabGroups": "yes",
            "showTabPreview": false,
        });
        let (settings, problems) = TabSettings::from_value(&value);
        assert_eq!(settings.max_visible_tabs, 8);
        assert!(!settings.enable_auto_stacking);
        assert_eq!(settings.stacking_strategy, StackingStrategy::Overflow);
        assert!(settings.enable_tab_groups);
        assert!(!settings.show_tab_preview);
        assert_eq!(problems.len(), 3);
    }

    #[test]
    fn from_value_null_is_silent_default() {
        let (settings, problems) = TabSettings::from_value(&Value::Null);
        assert_eq!(settings, TabSettings::default());
        assert!(problems.is_empty());
    }

    #[test]
    fn sanitized_repairs_zero_limit() {
        let (settings, problems) = TabSettings {
            max_visible_tabs: 0,
            ..TabSettings::default()
        }
        .sanitized();
        assert_eq!(settings.max_visible_tabs, 8);
        assert_eq!(problems.len(), 1);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(TabSettings::default()).expect("serialize");
        assert_eq!(json["maxVisibleTabs"], 8);
        assert_eq!(json["stackingStrategy"], "overflow");
    }
}
