#![forbid(unsafe_code)]

//! Runtime half of tabkit: the [`Shell`] application state, its TOML
//! configuration, blob stores and the debounced persistence worker.

pub mod config;
pub mod persist;
pub mod shell;
pub mod store;

pub use config::{ConfigError, DEFAULT_DEBOUNCE_MS, MAX_DEBOUNCE_MS, ShellConfig};
pub use persist::PersistWorker;
pub use shell::Shell;
pub use store::{BlobStore, FileBlobStore, MemoryBlobStore, StoreError, StoreResult};
