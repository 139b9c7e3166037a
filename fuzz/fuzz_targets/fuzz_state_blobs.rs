#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use tabkit_runtime::{MemoryBlobStore, Shell, ShellConfig};
use tabkit_tabs::{PANEL_LAYOUT_KEY, TAB_MANAGER_KEY};

// Arbitrary blobs must never panic the restore path and must always yield a
// valid tree.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (manager_blob, tree_blob) = text.split_once('\u{0}').unwrap_or((text, text));

    let store = MemoryBlobStore::new();
    store.insert(TAB_MANAGER_KEY, manager_blob);
    store.insert(PANEL_LAYOUT_KEY, tree_blob);
    let config = ShellConfig {
        persist: false,
        ..ShellConfig::default()
    };
    let shell = Shell::open(Arc::new(store), &config);
    shell.tree().validate().expect("restored tree is valid");
    for layout in shell.manager().list_layouts() {
        assert!(layout.restore_tree().is_ok());
    }
});
