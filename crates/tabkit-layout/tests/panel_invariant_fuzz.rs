//! Property/fuzz-style invariants for panel tree operations.
//!
//! Random operation streams run against the public PanelTree API. After every
//! step the tree must validate cleanly; failed operations must leave the tree
//! untouched; replaying the same stream must reproduce the same state hash.

use proptest::prelude::*;
use tabkit_layout::{
    FULL_SIZE, PanelId, PanelNodeKind, PanelOperation, PanelTree, SplitDirection, Tab, TabId,
};

#[derive(Debug, Clone)]
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    fn next_u16_range(&mut self, min: u16, max: u16) -> u16 {
        debug_assert!(min <= max);
        if min == max {
            return min;
        }
        let span = u64::from(max - min + 1);
        min + (self.next_u64() % span) as u16
    }

    fn choose_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        (self.next_u64() % len as u64) as usize
    }

    fn choose_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 0
    }
}

fn split_ids(tree: &PanelTree) -> Vec<(PanelId, usize)> {
    tree.nodes()
        .filter_map(|node| match &node.kind {
            PanelNodeKind::Split(split) => Some((node.id, split.children.len())),
            PanelNodeKind::Leaf(_) => None,
        })
        .collect()
}

fn all_tab_ids(tree: &PanelTree) -> Vec<TabId> {
    tree.tabs().map(|tab| tab.id.clone()).collect()
}

fn random_direction(rng: &mut Lcg) -> SplitDirection {
    if rng.choose_bool() {
        SplitDirection::Horizontal
    } else {
        SplitDirection::Vertical
    }
}

fn random_operation(tree: &PanelTree, rng: &mut Lcg) -> PanelOperation {
    let leaves = tree.leaf_ids();
    let splits = split_ids(tree);
    let tabs = all_tab_ids(tree);

    let mut candidates = vec![0usize, 1, 2, 3];
    if !splits.is_empty() {
        candidates.push(4);
    }
    if tabs.len() < 40 {
        candidates.push(5);
    }

    match candidates[rng.choose_index(candidates.len())] {
        0 => PanelOperation::SplitPanel {
            target: leaves[rng.choose_index(leaves.len())],
            direction: random_direction(rng),
        },
        1 => {
            let nodes: Vec<PanelId> = tree.nodes().map(|node| node.id).collect();
            PanelOperation::RemovePanel {
                target: nodes[rng.choose_index(nodes.len())],
            }
        }
        2 => PanelOperation::RemoveTab {
            tab: tabs[rng.choose_index(tabs.len())].clone(),
        },
        3 => PanelOperation::MoveTab {
            tab: tabs[rng.choose_index(tabs.len())].clone(),
            target: leaves[rng.choose_index(leaves.len())],
            index: rng.choose_bool().then(|| rng.choose_index(4)),
        },
        4 => {
            let (split, children) = splits[rng.choose_index(splits.len())];
            let sizes = (0..children)
                .map(|_| rng.next_u16_range(0, FULL_SIZE))
                .collect();
            PanelOperation::SetSplitSizes { split, sizes }
        }
        _ => {
            let target = leaves[rng.choose_index(leaves.len())];
            let mut next = tree.leaf_tabs(target).map(<[_]>::to_vec).unwrap_or_default();
            let id = TabId::new(format!("ext-{:x}", rng.next_u64()));
            next.push(Tab::new(id, format!("doc-{}", next.len())));
            PanelOperation::UpdateLeafTabs { target, tabs: next }
        }
    }
}

fn assert_tree_invariants(tree: &PanelTree) {
    tree.validate()
        .expect("tree should remain structurally valid");
    let report = tree.invariant_report();
    assert!(
        report.is_clean(),
        "invariant report contains errors: {:?}",
        report.issues
    );
    assert!(tree.leaf_count() >= 1);
    for node in tree.nodes() {
        if let PanelNodeKind::Split(split) = &node.kind {
            let total: u16 = split
                .children
                .iter()
                .filter_map(|child| tree.node(*child))
                .map(|child| child.size)
                .sum();
            assert_eq!(total, FULL_SIZE, "split {} sizes must sum to 100", node.id);
        }
    }
}

fn run_sequence(seed: u64, steps: usize) -> (PanelTree, Vec<PanelOperation>) {
    let mut tree = PanelTree::singleton();
    let mut rng = Lcg::new(seed);
    let mut applied = Vec::with_capacity(steps);

    for step in 0..steps {
        let operation = random_operation(&tree, &mut rng);
        let before = tree.clone();
        match tree.apply_operation(operation.clone()) {
            Ok(outcome) => {
                assert_eq!(outcome.before_hash, before.state_hash());
                assert_eq!(outcome.after_hash, tree.state_hash());
            }
            Err(err) => {
                assert_eq!(
                    tree, before,
                    "failed operation must not mutate: step {step}, seed={seed}, err={err}"
                );
            }
        }
        assert_tree_invariants(&tree);
        applied.push(operation);
    }

    (tree, applied)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn panel_tree_random_operation_sequences_preserve_invariants(
        seed in any::<u64>(),
        steps in 20usize..120,
    ) {
        let (tree, _) = run_sequence(seed, steps);
        assert_tree_invariants(&tree);
    }

    #[test]
    fn panel_tree_random_operation_sequences_replay_deterministically(
        seed in any::<u64>(),
        steps in 20usize..80,
    ) {
        let (final_tree, operations) = run_sequence(seed, steps);

        let mut replay_tree = PanelTree::singleton();
        for operation in operations {
            let _ = replay_tree.apply_operation(operation);
        }

        prop_assert_eq!(replay_tree.state_hash(), final_tree.state_hash());
        prop_assert_eq!(replay_tree.leaf_ids(), final_tree.leaf_ids());
    }

    #[test]
    fn snapshot_restore_preserves_state_hash(seed in any::<u64>(), steps in 1usize..60) {
        let (tree, _) = run_sequence(seed, steps);
        let restored = PanelTree::from_snapshot(tree.to_snapshot())
            .expect("snapshot of a valid tree restores");
        prop_assert_eq!(restored.state_hash(), tree.state_hash());
        prop_assert_eq!(restored.tab_count(), tree.tab_count());
    }
}

#[test]
fn panel_tree_fuzz_seed_corpus_preserves_invariants() {
    let seeds = [
        0_u64,
        1,
        2,
        3,
        5,
        8,
        13,
        21,
        34,
        55,
        89,
        144,
        u32::MAX as u64,
        (u32::MAX as u64) + 1,
        u64::MAX - 1,
        u64::MAX,
    ];

    for seed in seeds {
        let (tree, _) = run_sequence(seed, 180);
        assert_tree_invariants(&tree);
    }
}
