//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use edged_config::ConfigError;
use edged_core::{CoreError, PrefField};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const AUTH: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const VERIFICATION: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Daemon ───────────────────────────────────────────────────────
    #[error("Could not reach tailscaled at {endpoint}: {reason}")]
    #[diagnostic(
        code(edged::daemon_unreachable),
        help(
            "Check that tailscaled is running and its local API is reachable.\n\
             Endpoint: {endpoint}\n\
             Override with --socket (EDGED_SOCKET) or --local-api (EDGED_LOCAL_API)."
        )
    )]
    DaemonUnreachable { endpoint: String, reason: String },

    #[error("tailscaled rejected the request: {message}")]
    #[diagnostic(
        code(edged::daemon_rejected),
        help("A 401/403 usually means the local API token is missing or wrong.")
    )]
    DaemonRejected {
        message: String,
        status: Option<u16>,
    },

    // ── Verification ─────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(edged::verification_failed),
        help(
            "tailscaled did not keep the requested values for: {fields}\n\
             Inspect the daemon with: edged prefs"
        )
    )]
    Verification { message: String, fields: String },

    // ── Control command ──────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(edged::command_failed))]
    Command { message: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Reconcile attempt timed out after {seconds}s")]
    #[diagnostic(
        code(edged::timeout),
        help("Raise it with --apply-timeout or agent.apply_timeout_secs.")
    )]
    Timeout { seconds: u64 },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file not found: {}", .path.display())]
    #[diagnostic(
        code(edged::no_config),
        help("Drop --config to use the defaults, or create the file.")
    )]
    NoConfig { path: PathBuf },

    #[error("Cannot load desired preferences")]
    #[diagnostic(
        code(edged::document),
        help("The document is YAML with snake_case preference keys, e.g. `route_all: true`.")
    )]
    Document {
        #[source]
        source: ConfigError,
    },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(edged::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(edged::config))]
    Config(ConfigError),

    // ── Internal ─────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(edged::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(edged::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DaemonUnreachable { .. } => exit_code::CONNECTION,
            Self::DaemonRejected {
                status: Some(401 | 403),
                ..
            } => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Verification { .. } => exit_code::VERIFICATION,
            Self::NoConfig { .. } | Self::Document { .. } | Self::Config(_) => exit_code::CONFIG,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the daemon endpoint to a core error.
    pub fn from_core(err: CoreError, endpoint: &str) -> Self {
        match err {
            CoreError::DaemonUnavailable { reason } => Self::DaemonUnreachable {
                endpoint: endpoint.to_owned(),
                reason,
            },
            other => other.into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::DaemonUnavailable { reason } => CliError::DaemonUnreachable {
                endpoint: "(local API)".into(),
                reason,
            },

            CoreError::Daemon { message, status } => CliError::DaemonRejected { message, status },

            CoreError::PersistenceMismatch { fields }
            | CoreError::ConvergenceMismatch { fields } => CliError::Verification {
                message,
                fields: fields
                    .iter()
                    .copied()
                    .map(PrefField::wire_name)
                    .collect::<Vec<_>>()
                    .join(", "),
            },

            CoreError::ExecutionConflict | CoreError::CommandFailed { .. } => {
                CliError::Command { message }
            }

            CoreError::Timeout { after } => CliError::Timeout {
                seconds: after.as_secs(),
            },

            CoreError::SourceRead { message } => CliError::Validation {
                field: "prefs_file".into(),
                reason: message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound { path } => CliError::NoConfig { path },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            err @ (ConfigError::Read { .. } | ConfigError::Document { .. }) => {
                CliError::Document { source: err }
            }
            other => CliError::Config(other),
        }
    }
}
