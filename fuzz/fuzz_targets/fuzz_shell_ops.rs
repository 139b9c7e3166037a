#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tabkit_layout::{PanelId, SplitDirection, TabId};
use tabkit_runtime::{Shell, ShellConfig};

/// One user action. Indices pick among live panels/tabs/groups/stacks
/// modulo their count, so most actions hit something real.
#[derive(Debug, Arbitrary)]
enum Action {
    Open(u8),
    Activate(u8),
    Close(u8),
    ToggleLock(u8),
    Duplicate(u8),
    Move { tab: u8, panel: u8, index: Option<u8> },
    Split { panel: u8, vertical: bool },
    ClosePanel(u8),
    Resize { split: u8, first: u8, second: u8 },
    Back(u8),
    Forward(u8),
    CreateGroup(Vec<u8>),
    AddToGroup { group: u8, tab: u8 },
    DeleteGroup(u8),
    ToggleGroupLock(u8),
    CreateStack { panel: u8, tabs: Vec<u8> },
    AddToStack { stack: u8, tab: u8 },
    SetStackActive { stack: u8, index: u8 },
    DeleteStack(u8),
    SaveLayout,
    LoadLayout(u8),
}

fn pick<T: Clone>(items: &[T], n: u8) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[usize::from(n) % items.len()].clone())
    }
}

fn panels(shell: &Shell) -> Vec<PanelId> {
    shell.tree().leaf_ids()
}

fn tabs(shell: &Shell) -> Vec<TabId> {
    shell.tree().tabs().map(|tab| tab.id.clone()).collect()
}

fn apply(shell: &mut Shell, action: Action, layouts: &mut Vec<tabkit_tabs::LayoutId>) {
    match action {
        Action::Open(n) => {
            if let Some(panel) = pick(&panels(shell), n) {
                let _ = shell.open_tab(panel, "fuzz");
            }
        }
        Action::Activate(n) => {
            if let Some(tab) = pick(&tabs(shell), n) {
                let _ = shell.activate_tab(&tab);
            }
        }
        Action::Close(n) => {
            if let Some(tab) = pick(&tabs(shell), n) {
                let _ = shell.close_tab(&tab);
            }
        }
        Action::ToggleLock(n) => {
            if let Some(tab) = pick(&tabs(shell), n) {
                let _ = shell.toggle_tab_lock(&tab);
            }
        }
        Action::Duplicate(n) => {
            if let Some(tab) = pick(&tabs(shell), n) {
                let _ = shell.duplicate_tab(&tab);
            }
        }
        Action::Move { tab, panel, index } => {
            if let (Some(tab), Some(panel)) = (pick(&tabs(shell), tab), pick(&panels(shell), panel)) {
                let _ = shell.move_tab(&tab, panel, index.map(usize::from));
            }
        }
        Action::Split { panel, vertical } => {
            if shell.tree().leaf_count() < 32
                && let Some(panel) = pick(&panels(shell), panel)
            {
                let direction = if vertical {
                    SplitDirection::Vertical
                } else {
                    SplitDirection::Horizontal
                };
                let _ = shell.split_panel(panel, direction);
            }
        }
        Action::ClosePanel(n) => {
            let all: Vec<PanelId> = shell.tree().nodes().map(|node| node.id).collect();
            if let Some(panel) = pick(&all, n) {
                let _ = shell.close_panel(panel);
            }
        }
        Action::Resize { split, first, second } => {
            let splits: Vec<PanelId> = shell
                .tree()
                .nodes()
                .filter(|node| !node.is_leaf())
                .map(|node| node.id)
                .collect();
            if let Some(split) = pick(&splits, split) {
                let count = shell.tree().node(split).map_or(0, |node| node.children().len());
                let mut sizes = vec![u16::from(second); count];
                if let Some(head) = sizes.first_mut() {
                    *head = u16::from(first);
                }
                let _ = shell.resize_split(split, sizes);
            }
        }
        Action::Back(n) => {
            if let Some(panel) = pick(&panels(shell), n) {
                let _ = shell.navigate_back(panel);
            }
        }
        Action::Forward(n) => {
            if let Some(panel) = pick(&panels(shell), n) {
                let _ = shell.navigate_forward(panel);
            }
        }
        Action::CreateGroup(members) => {
            let all = tabs(shell);
            let chosen: Vec<TabId> = members.iter().filter_map(|n| pick(&all, *n)).collect();
            let _ = shell.create_tab_group("g", "#000", &chosen);
        }
        Action::AddToGroup { group, tab } => {
            let groups: Vec<_> = shell.manager().tab_groups().iter().map(|g| g.id.clone()).collect();
            if let (Some(group), Some(tab)) = (pick(&groups, group), pick(&tabs(shell), tab)) {
                let _ = shell.add_tab_to_group(&group, &tab);
            }
        }
        Action::DeleteGroup(n) => {
            let groups: Vec<_> = shell.manager().tab_groups().iter().map(|g| g.id.clone()).collect();
            if let Some(group) = pick(&groups, n) {
                let _ = shell.delete_tab_group(&group);
            }
        }
        Action::ToggleGroupLock(n) => {
            let groups: Vec<_> = shell.manager().tab_groups().iter().map(|g| g.id.clone()).collect();
            if let Some(group) = pick(&groups, n) {
                let _ = shell.toggle_tab_group_locked(&group);
            }
        }
        Action::CreateStack { panel, tabs: members } => {
            if let Some(panel) = pick(&panels(shell), panel) {
                let all = tabs(shell);
                let chosen: Vec<TabId> = members.iter().filter_map(|n| pick(&all, *n)).collect();
                let _ = shell.create_tab_stack(panel, &chosen);
            }
        }
        Action::AddToStack { stack, tab } => {
            let stacks: Vec<_> = shell.manager().tab_stacks().map(|s| s.id.clone()).collect();
            if let (Some(stack), Some(tab)) = (pick(&stacks, stack), pick(&tabs(shell), tab)) {
                let _ = shell.add_tab_to_stack(&stack, &tab);
            }
        }
        Action::SetStackActive { stack, index } => {
            let stacks: Vec<_> = shell.manager().tab_stacks().map(|s| s.id.clone()).collect();
            if let Some(stack) = pick(&stacks, stack) {
                let _ = shell.set_stack_active_tab(&stack, usize::from(index));
            }
        }
        Action::DeleteStack(n) => {
            let stacks: Vec<_> = shell.manager().tab_stacks().map(|s| s.id.clone()).collect();
            if let Some(stack) = pick(&stacks, n) {
                let _ = shell.delete_tab_stack(&stack);
            }
        }
        Action::SaveLayout => layouts.push(shell.save_layout("fuzz", None)),
        Action::LoadLayout(n) => {
            if let Some(layout) = pick(layouts, n) {
                let _ = shell.load_layout(&layout);
            }
        }
    }
}

fn check(shell: &Shell) {
    let tree = shell.tree();
    let manager = shell.manager();
    tree.validate().expect("tree invariants");

    for panel in tree.leaf_ids() {
        let tabs = tree.leaf_tabs(panel).expect("leaf tabs");
        assert_eq!(tabs.iter().filter(|tab| tab.is_active).count(), 1);
        if let Some(history) = manager.navigation_history(panel) {
            match history.current_index {
                Some(index) => assert!(index < history.history.len()),
                None => assert!(history.history.is_empty()),
            }
        }
    }
    for tab in tree.tabs() {
        let group = manager.group_for_tab(&tab.id).map(|g| g.id.clone());
        let stack = manager.stack_for_tab(&tab.id).map(|s| s.id.clone());
        assert_eq!(tab.group_id, group, "group flag out of sync for {}", tab.id);
        assert_eq!(tab.stack_id, stack, "stack flag out of sync for {}", tab.id);
    }
    for group in manager.tab_groups() {
        for member in &group.tabs {
            assert!(tree.tab(member).is_some(), "group holds closed tab {member}");
        }
    }
    for stack in manager.tab_stacks() {
        assert!(tree.is_leaf(stack.panel_id), "stack bound to missing panel");
        assert!(stack.tabs.is_empty() || stack.active_tab_index < stack.tabs.len());
        for member in &stack.tabs {
            assert_eq!(tree.panel_for_tab(member), Some(stack.panel_id));
        }
    }
}

fuzz_target!(|actions: Vec<Action>| {
    let mut shell = Shell::new(&ShellConfig::default());
    let mut layouts = Vec::new();
    for action in actions.into_iter().take(256) {
        apply(&mut shell, action, &mut layouts);
        check(&shell);
    }
});
