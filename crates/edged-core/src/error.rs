// ── Core error types ──
//
// Domain errors from edged-core. Consumers never see raw HTTP details;
// the `From<edged_api::Error>` impl folds transport failures into
// `DaemonUnavailable` and daemon rejections into `Daemon`.

use std::time::Duration;

use thiserror::Error;

use crate::model::PrefField;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Desired source ───────────────────────────────────────────────
    #[error("Cannot read desired preferences: {message}")]
    SourceRead { message: String },

    // ── Daemon errors ────────────────────────────────────────────────
    #[error("Daemon unreachable: {reason}")]
    DaemonUnavailable { reason: String },

    #[error("Daemon rejected request: {message}")]
    Daemon {
        message: String,
        /// HTTP status code, when the daemon answered.
        status: Option<u16>,
    },

    // ── Verification errors ──────────────────────────────────────────
    /// The preferences returned by the apply call differ from a fresh read.
    #[error("Applied preferences were not persisted: {}", field_list(.fields))]
    PersistenceMismatch { fields: Vec<PrefField> },

    /// The daemon's persisted preferences still differ from the target.
    #[error("Preferences did not converge on target: {}", field_list(.fields))]
    ConvergenceMismatch { fields: Vec<PrefField> },

    // ── Executor errors ──────────────────────────────────────────────
    #[error("A control command is already running")]
    ExecutionConflict,

    #[error("Control command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Reconcile attempt timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the error should end the agent run.
    ///
    /// Conflicts and timeouts are transient, and a broken desired document
    /// leaves the previous target in force.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::ExecutionConflict | Self::Timeout { .. } | Self::SourceRead { .. }
        )
    }

    /// The mismatched fields of a verification error.
    pub fn mismatched_fields(&self) -> Option<&[PrefField]> {
        match self {
            Self::PersistenceMismatch { fields } | Self::ConvergenceMismatch { fields } => {
                Some(fields)
            }
            _ => None,
        }
    }
}

fn field_list(fields: &[PrefField]) -> String {
    fields
        .iter()
        .copied()
        .map(PrefField::wire_name)
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<edged_api::Error> for CoreError {
    fn from(err: edged_api::Error) -> Self {
        let unreachable = err.is_unreachable();
        match err {
            edged_api::Error::Transport(e) if unreachable => CoreError::DaemonUnavailable {
                reason: e.to_string(),
            },
            edged_api::Error::Transport(e) => CoreError::Daemon {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            edged_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid local API URL: {e}"),
            },
            edged_api::Error::ClientBuild(message) => CoreError::Config { message },
            edged_api::Error::AccessDenied { status } => CoreError::Daemon {
                message: "local API access denied (check the local API token)".into(),
                status: Some(status),
            },
            edged_api::Error::LocalApi { status, message } => CoreError::Daemon {
                message,
                status: Some(status),
            },
            edged_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
