//! Subcommand implementations.
//!
//! Read-only commands open the shell with persistence disabled so that
//! inspecting a workspace never rewrites it.

use std::io::Write;
use std::sync::Arc;

use tabkit_layout::{PANEL_TREE_SCHEMA_VERSION, PanelTree, PanelTreeSnapshot};
use tabkit_runtime::{BlobStore, FileBlobStore, Shell, ShellConfig};
use tabkit_tabs::{
    LayoutId, PANEL_LAYOUT_KEY, TAB_MANAGER_KEY, TabManagerState, TabSettings, WorkspaceLayout,
};

use crate::cli::{InspectArgs, LayoutsCommand, ResetArgs, ResolvedConfig};
use crate::error::{CliError, Result};

fn store_for(config: &ShellConfig) -> Arc<dyn BlobStore> {
    Arc::new(FileBlobStore::new(&config.state_dir))
}

fn open_read_only(config: &ShellConfig) -> Shell {
    let config = ShellConfig {
        persist: false,
        ..config.clone()
    };
    Shell::open(store_for(&config), &config)
}

fn open_writable(config: &ShellConfig) -> Shell {
    let config = ShellConfig {
        persist: true,
        ..config.clone()
    };
    Shell::open(store_for(&config), &config)
}

fn flag(on: bool, label: &str) -> String {
    if on { format!(" [{label}]") } else { String::new() }
}

pub fn run_inspect(config: &ShellConfig, args: &InspectArgs, out: &mut dyn Write) -> Result<()> {
    let shell = open_read_only(config);
    if args.json {
        let summary = serde_json::json!({
            "stateDir": config.state_dir.display().to_string(),
            "panelLayout": shell.tree().to_snapshot(),
            "tabManager": shell.manager().to_state(),
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
        return Ok(());
    }

    let tree = shell.tree();
    let manager = shell.manager();
    writeln!(out, "state: {}", config.state_dir.display())?;
    writeln!(out, "panels: {} (root {})", tree.leaf_count(), tree.root())?;
    write_panels(tree, out)?;

    let groups = manager.tab_groups();
    writeln!(out, "groups: {}", groups.len())?;
    for group in groups {
        writeln!(
            out,
            "  {} {:?} {} {} tab(s){}{}",
            group.id,
            group.name,
            group.color,
            group.tabs.len(),
            flag(group.is_collapsed, "collapsed"),
            flag(group.is_locked, "locked"),
        )?;
    }

    let stacks: Vec<_> = manager.tab_stacks().collect();
    writeln!(out, "stacks: {}", stacks.len())?;
    for stack in stacks {
        writeln!(
            out,
            "  {} panel {} {} tab(s) active {}{}",
            stack.id,
            stack.panel_id,
            stack.tabs.len(),
            stack.active_tab_index,
            flag(!stack.is_stacked, "expanded"),
        )?;
    }

    write_layouts(&manager.list_layouts(), out)
}

fn write_panels(tree: &PanelTree, out: &mut dyn Write) -> Result<()> {
    for panel in tree.leaf_ids() {
        let tabs = tree.leaf_tabs(panel).unwrap_or_default();
        writeln!(out, "  panel {panel}: {} tab(s)", tabs.len())?;
        for tab in tabs {
            let marker = if tab.is_active { '*' } else { ' ' };
            let group = tab
                .group_id
                .as_ref()
                .map(|id| format!(" group={id}"))
                .unwrap_or_default();
            let stack = tab
                .stack_id
                .as_ref()
                .map(|id| format!(" stack={id}"))
                .unwrap_or_default();
            writeln!(
                out,
                "    {marker} {} {:?}{}{}{group}{stack}",
                tab.id,
                tab.title,
                flag(tab.is_dirty, "dirty"),
                flag(tab.is_locked, "locked"),
            )?;
        }
    }
    Ok(())
}

fn write_layouts(layouts: &[&WorkspaceLayout], out: &mut dyn Write) -> Result<()> {
    writeln!(out, "layouts: {}", layouts.len())?;
    for layout in layouts {
        let marker = if layout.is_default { '*' } else { ' ' };
        writeln!(
            out,
            "  {marker} {} {:?} {} panel(s), {} tab(s), saved {}",
            layout.id,
            layout.name,
            layout.leaf_count(),
            layout.tab_count(),
            layout.created_at.to_rfc3339(),
        )?;
    }
    Ok(())
}

/// Report every problem found in the config and stored blobs.
///
/// Nothing is repaired; a non-empty report is an error.
pub fn run_validate(resolved: &ResolvedConfig, out: &mut dyn Write) -> Result<()> {
    let config = &resolved.config;
    let store = FileBlobStore::new(&config.state_dir);
    let mut problems: Vec<String> = resolved
        .problems
        .iter()
        .map(|problem| format!("config: {problem}"))
        .collect();

    match store.load(TAB_MANAGER_KEY)? {
        None => writeln!(out, "{TAB_MANAGER_KEY}: absent")?,
        Some(payload) => {
            let found = validate_manager_blob(&payload);
            writeln!(out, "{TAB_MANAGER_KEY}: {} problem(s)", found.len())?;
            problems.extend(found);
        }
    }
    match store.load(PANEL_LAYOUT_KEY)? {
        None => writeln!(out, "{PANEL_LAYOUT_KEY}: absent")?,
        Some(payload) => {
            let found = validate_tree_blob(&payload);
            writeln!(out, "{PANEL_LAYOUT_KEY}: {} problem(s)", found.len())?;
            problems.extend(found);
        }
    }

    for problem in &problems {
        writeln!(out, "  - {problem}")?;
    }
    if problems.is_empty() {
        writeln!(out, "ok")?;
        Ok(())
    } else {
        Err(CliError::ValidationFailed {
            count: problems.len(),
        })
    }
}

fn validate_manager_blob(payload: &str) -> Vec<String> {
    let state = match TabManagerState::decode(payload) {
        Ok(state) => state,
        Err(err) => return vec![format!("{TAB_MANAGER_KEY}: {err}")],
    };
    let mut problems = Vec::new();
    let (_, settings) = TabSettings::from_value(&state.settings);
    problems.extend(settings.into_iter().map(|p| format!("settings: {p}")));
    for layout in &state.workspace_layouts {
        for issue in snapshot_issues(&layout.panel_tree) {
            problems.push(format!("layout {}: {issue}", layout.id));
        }
    }
    let defaults = state
        .workspace_layouts
        .iter()
        .filter(|layout| layout.is_default)
        .count();
    if defaults > 1 {
        problems.push(format!("{defaults} layouts are marked default"));
    }
    for history in &state.navigation_histories {
        let out_of_range = match history.current_index {
            Some(index) => index >= history.history.len(),
            None => !history.history.is_empty(),
        };
        if out_of_range || history.history.len() > history.max_size {
            problems.push(format!("history for panel {}: cursor or size out of range", history.panel_id));
        }
    }
    problems
}

fn validate_tree_blob(payload: &str) -> Vec<String> {
    match serde_json::from_str::<PanelTreeSnapshot>(payload) {
        Ok(snapshot) => snapshot_issues(&snapshot)
            .into_iter()
            .map(|issue| format!("{PANEL_LAYOUT_KEY}: {issue}"))
            .collect(),
        Err(err) => vec![format!("{PANEL_LAYOUT_KEY}: malformed: {err}")],
    }
}

fn snapshot_issues(snapshot: &PanelTreeSnapshot) -> Vec<String> {
    let mut issues = Vec::new();
    if snapshot.schema_version != PANEL_TREE_SCHEMA_VERSION {
        issues.push(format!(
            "unsupported schema version {}",
            snapshot.schema_version
        ));
    }
    issues.extend(
        snapshot
            .invariant_report()
            .issues
            .iter()
            .map(ToString::to_string),
    );
    issues
}

pub fn run_layouts(config: &ShellConfig, command: LayoutsCommand, out: &mut dyn Write) -> Result<()> {
    match command {
        LayoutsCommand::List { json } => {
            let shell = open_read_only(config);
            let layouts = shell.manager().list_layouts();
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&layouts)?)?;
                Ok(())
            } else {
                write_layouts(&layouts, out)
            }
        }
        LayoutsCommand::SetDefault { id } => {
            edit_layout(config, &id, |shell, layout| shell.set_default_layout(layout))?;
            writeln!(out, "default layout: {id}")?;
            Ok(())
        }
        LayoutsCommand::Delete { id } => {
            edit_layout(config, &id, |shell, layout| shell.delete_layout(layout))?;
            writeln!(out, "deleted layout: {id}")?;
            Ok(())
        }
        LayoutsCommand::Rename { id, name } => {
            edit_layout(config, &id, |shell, layout| shell.rename_layout(layout, name.clone()))?;
            writeln!(out, "renamed layout {id} to {name:?}")?;
            Ok(())
        }
    }
}

fn edit_layout(
    config: &ShellConfig,
    id: &str,
    edit: impl FnOnce(&mut Shell, &LayoutId) -> bool,
) -> Result<()> {
    let layout = LayoutId::new(id);
    let mut shell = open_writable(config);
    let applied = edit(&mut shell, &layout);
    shell.shutdown();
    if applied {
        Ok(())
    } else {
        Err(CliError::LayoutNotFound { id: id.to_string() })
    }
}

pub fn run_reset(config: &ShellConfig, args: &ResetArgs, out: &mut dyn Write) -> Result<()> {
    if !args.yes {
        return Err(CliError::invalid("reset deletes stored state; pass --yes"));
    }
    if !config.state_dir.is_dir() {
        return Err(CliError::MissingStateDir {
            path: config.state_dir.clone(),
        });
    }
    let store = FileBlobStore::new(&config.state_dir);
    for key in [TAB_MANAGER_KEY, PANEL_LAYOUT_KEY] {
        let status = if store.remove(key)? { "removed" } else { "absent" };
        writeln!(out, "{key}: {status}")?;
    }
    tracing::info!(state_dir = %config.state_dir.display(), "stored state reset");
    Ok(())
}
