use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] tabkit_runtime::ConfigError),

    #[error("store error: {0}")]
    Store(#[from] tabkit_runtime::StoreError),

    #[error("layout not found: {id}")]
    LayoutNotFound { id: String },

    #[error("state directory does not exist: {path}")]
    MissingStateDir { path: PathBuf },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("validation found {count} problem(s)")]
    ValidationFailed { count: usize },
}

impl CliError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } => 2,
            Self::ValidationFailed { .. } => 3,
            Self::LayoutNotFound { .. } | Self::MissingStateDir { .. } => 4,
            _ => 1,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
