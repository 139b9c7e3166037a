use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tabkit_runtime::{ConfigError, ShellConfig};

use crate::commands::{run_inspect, run_layouts, run_reset, run_validate};
use crate::error::Result;
use crate::logging;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "tabkit.toml";

#[derive(Debug, Parser)]
#[command(
    name = "tabkit",
    about = "Inspect and maintain persisted tabkit workspace state",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Shell config file (TOML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the state directory from the config.
    #[arg(long = "state-dir", global = true)]
    pub state_dir: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long = "log-json", global = true)]
    pub log_json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Summarize panels, tabs, groups, stacks and saved layouts.
    Inspect(InspectArgs),

    /// Check config and stored blobs without repairing anything.
    Validate,

    /// Manage saved workspace layouts.
    #[command(subcommand)]
    Layouts(LayoutsCommand),

    /// Delete both stored blobs.
    Reset(ResetArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct InspectArgs {
    /// Print the full restored state as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum LayoutsCommand {
    /// List saved layouts, oldest first.
    List {
        #[arg(long)]
        json: bool,
    },

    /// Mark a layout as the default.
    #[command(name = "set-default")]
    SetDefault { id: String },

    /// Delete a layout.
    Delete { id: String },

    /// Rename a layout.
    Rename { id: String, name: String },
}

#[derive(Debug, Clone, Default, Args)]
pub struct ResetArgs {
    /// Required; reset is not reversible.
    #[arg(long)]
    pub yes: bool,
}

/// Resolved configuration plus any problems that forced a fallback.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: ShellConfig,
    pub problems: Vec<String>,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.global.log_json);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(cli, &mut out)
}

pub fn run(cli: Cli, out: &mut dyn Write) -> Result<()> {
    let resolved = resolve_config(&cli.global)?;
    match cli.command {
        Commands::Inspect(args) => run_inspect(&resolved.config, &args, out),
        Commands::Validate => run_validate(&resolved, out),
        Commands::Layouts(command) => run_layouts(&resolved.config, command, out),
        Commands::Reset(args) => run_reset(&resolved.config, &args, out),
    }
}

/// Load the shell config.
///
/// An explicit `--config` that cannot be read is an error. Unparsable or
/// invalid configs fall back to defaults with a warning; the problems are
/// kept so `validate` can report them.
pub fn resolve_config(global: &GlobalArgs) -> Result<ResolvedConfig> {
    let mut problems = Vec::new();
    let loaded = match &global.config {
        Some(path) => Some(ShellConfig::from_toml_file(path)),
        None => {
            let implicit = Path::new(DEFAULT_CONFIG_FILE);
            implicit
                .is_file()
                .then(|| ShellConfig::from_toml_file(implicit))
        }
    };
    let mut config = match loaded {
        None => ShellConfig::default(),
        Some(Ok(config)) => config,
        Some(Err(err @ ConfigError::Io { .. })) => return Err(err.into()),
        Some(Err(err)) => {
            tracing::warn!(error = %err, "config unreadable; using defaults");
            problems.push(err.to_string());
            ShellConfig::default()
        }
    };

    let invalid = config.validate();
    if !invalid.is_empty() {
        for problem in &invalid {
            tracing::warn!(%problem, "config invalid; using defaults");
        }
        problems.extend(invalid);
        config = ShellConfig::default();
    }
    if let Some(dir) = &global.state_dir {
        config.state_dir = dir.clone();
    }
    tracing::debug!(state_dir = %config.state_dir.display(), "config resolved");
    Ok(ResolvedConfig { config, problems })
}
