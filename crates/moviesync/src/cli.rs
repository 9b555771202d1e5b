//! Clap derive structures for the `moviesync` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// moviesync -- keep a movie list in sync with its server, offline too
#[derive(Debug, Parser)]
#[command(
    name = "moviesync",
    version,
    about = "Sync movie records with a moviesync server from the command line",
    long_about = "Lists, saves and deletes movie records on a moviesync server.\n\n\
        Every successful server response is mirrored into a local cache, so\n\
        `list` keeps working from the last known-good data when the server\n\
        is unreachable.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "MOVIESYNC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "MOVIESYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Server URL (overrides profile)
    #[arg(long, short = 's', env = "MOVIESYNC_SERVER", global = true)]
    pub server: Option<String>,

    /// Session token
    #[arg(long, env = "MOVIESYNC_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Offline cache directory (overrides profile)
    #[arg(long, env = "MOVIESYNC_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MOVIESYNC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "MOVIESYNC_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "MOVIESYNC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one id per line (scripting)
    Plain,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List movies (served from the cache when the server is down)
    #[command(alias = "ls")]
    List(ListArgs),

    /// Create a movie, or update one when --id is given
    Save(SaveArgs),

    /// Delete a movie by id
    #[command(alias = "rm")]
    Delete(DeleteArgs),

    /// Print every state change, including pushed updates, until Ctrl-C
    Watch,

    /// Forget the stored session token
    Logout,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Show at most this many movies
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct SaveArgs {
    /// Id of an existing movie to update
    #[arg(long)]
    pub id: Option<String>,

    /// Movie title
    #[arg(long, short = 't')]
    pub title: String,

    /// Investment amount
    #[arg(long, short = 'i', allow_negative_numbers = true)]
    pub investment: f64,

    /// Release date (DD.MM.YYYY)
    #[arg(long, short = 'r')]
    pub release_date: String,

    /// The movie has a sequel
    #[arg(long)]
    pub sequel: bool,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Movie id
    pub id: String,
}
