//! Clap derive structures for the `edged` binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// edged -- keeps an edge device's tailscale preferences on target
#[derive(Debug, Parser)]
#[command(
    name = "edged",
    version,
    about = "Keep tailscaled preferences converged on a declared document",
    long_about = "Edge-device agent for tailscaled.\n\n\
        Reads the desired preferences from a YAML document, applies only the\n\
        fields that differ through the local API and verifies the result.\n\
        While running it also tracks the device mode and launches the login\n\
        command when the daemon needs one.",
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
    /// Config file (default: /etc/edged/config.toml or the user config dir)
    #[arg(long, short = 'c', env = "EDGED_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// tailscaled local API base URL (reached over TCP)
    #[arg(long, env = "EDGED_LOCAL_API", global = true, conflicts_with = "socket")]
    pub local_api: Option<String>,

    /// tailscaled unix socket (default on Linux: /var/run/tailscale/tailscaled.sock)
    #[arg(long, env = "EDGED_SOCKET", global = true)]
    pub socket: Option<PathBuf>,

    /// Local API token
    #[arg(long, env = "EDGED_LOCAL_API_TOKEN", global = true, hide_env_values = true)]
    pub local_api_token: Option<String>,

    /// Local API request timeout in seconds
    #[arg(long, env = "EDGED_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(long, short = 'o', env = "EDGED_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

impl GlobalOpts {
    /// The requested format, or the command's own default.
    pub fn format_or(&self, default: OutputFormat) -> OutputFormat {
        self.output.unwrap_or(default)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table
    Table,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the agent until interrupted
    Run(RunArgs),

    /// Run one reconcile pass and print the outcome
    Reconcile(DocumentArgs),

    /// Show preferences that differ between the daemon and the document
    Diff(DocumentArgs),

    /// Print the daemon's current preferences
    Prefs,

    /// Show backend state, derived mode and node details
    #[command(alias = "st")]
    Status,

    /// Log the daemon out of its tailnet
    Logout,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct DocumentArgs {
    /// Desired-preferences YAML document
    #[arg(long, short = 'f', env = "EDGED_PREFS_FILE")]
    pub prefs_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub document: DocumentArgs,

    /// Status poll interval (e.g. "30s", "1m")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub tick: Option<Duration>,

    /// Upper bound for one reconcile attempt
    #[arg(long, value_parser = humantime::parse_duration)]
    pub apply_timeout: Option<Duration>,

    /// Control binary used for the login command
    #[arg(long)]
    pub cli_path: Option<PathBuf>,

    /// Do not watch the document for changes (reload with SIGHUP)
    #[arg(long)]
    pub no_watch: bool,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
