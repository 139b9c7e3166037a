//! Property tests for history bounds and group/stack membership.

use proptest::prelude::*;
use tabkit_layout::{PanelId, TabId};
use tabkit_tabs::{NavigationHistory, TabManager};

#[derive(Debug, Clone)]
enum HistoryStep {
    Visit(u8),
    Back,
    Forward,
    Forget(u8),
}

fn history_step() -> impl Strategy<Value = HistoryStep> {
    prop_oneof![
        4 => (0u8..12).prop_map(HistoryStep::Visit),
        2 => Just(HistoryStep::Back),
        2 => Just(HistoryStep::Forward),
        1 => (0u8..12).prop_map(HistoryStep::Forget),
    ]
}

fn tab(n: u8) -> TabId {
    TabId::new(format!("tab-{n}"))
}

fn assert_history_bounds(history: &NavigationHistory) {
    assert!(history.history.len() <= history.max_size);
    match history.current_index {
        None => assert!(history.history.is_empty()),
        Some(index) => assert!(index < history.history.len()),
    }
    let mut seen = history.history.clone();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), history.history.len(), "entries must be unique");
}

proptest! {
    #[test]
    fn history_cursor_stays_in_range(
        limit in 1usize..8,
        steps in prop::collection::vec(history_step(), 0..80),
    ) {
        let mut history = NavigationHistory::new(PanelId::MIN, limit);
        for step in steps {
            match step {
                HistoryStep::Visit(n) => {
                    history.push(&tab(n));
                    prop_assert_eq!(history.current(), Some(&tab(n)));
                }
                HistoryStep::Back => {
                    let before = history.clone();
                    if history.back().is_none() {
                        prop_assert_eq!(&history, &before);
                    }
                }
                HistoryStep::Forward => {
                    let before = history.clone();
                    if history.forward().is_none() {
                        prop_assert_eq!(&history, &before);
                    }
                }
                HistoryStep::Forget(n) => {
                    let _ = history.remove(&tab(n));
                }
            }
            assert_history_bounds(&history);
        }
    }

    #[test]
    fn each_tab_has_at_most_one_group_and_stack(
        moves in prop::collection::vec((0u8..6, 0usize..3, any::<bool>()), 1..60),
    ) {
        let mut manager = TabManager::default();
        let groups: Vec<_> = (0..3)
            .map(|n| manager.create_tab_group(format!("g{n}"), "#000", &[]).expect("enabled").0)
            .collect();
        let stacks: Vec<_> = (0..3)
            .map(|_| manager.create_tab_stack(PanelId::MIN, &[]).0)
            .collect();

        for (n, target, into_group) in moves {
            if into_group {
                let _ = manager.add_tab_to_group(&groups[target], &tab(n));
            } else {
                let _ = manager.add_tab_to_stack(&stacks[target], &tab(n));
            }
        }

        for n in 0u8..6 {
            let id = tab(n);
            let holding_groups = manager.tab_groups().iter().filter(|g| g.contains(&id)).count();
            let holding_stacks = manager.tab_stacks().filter(|s| s.contains(&id)).count();
            prop_assert!(holding_groups <= 1);
            prop_assert!(holding_stacks <= 1);
        }
        for stack in manager.tab_stacks() {
            prop_assert!(stack.tabs.is_empty() || stack.active_tab_index < stack.tabs.len());
        }
    }
}
