//! Subscriber setup for the binary.
//!
//! Filtering comes from `TABKIT_LOG` (same syntax as `RUST_LOG`), defaulting
//! to `info`. Logs go to stderr so command output on stdout stays clean.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "TABKIT_LOG";

/// Filter used when `TABKIT_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
