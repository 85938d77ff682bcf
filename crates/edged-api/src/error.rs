use thiserror::Error;

/// Top-level error type for the `edged-api` crate.
///
/// Covers every failure mode of the local API surface: transport,
/// non-success HTTP responses, and payload decoding.
/// `edged-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, socket proxy gone, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Failed to construct the underlying HTTP client.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Local API ───────────────────────────────────────────────────
    /// The daemon rejected the local API token.
    #[error("Local API access denied (HTTP {status})")]
    AccessDenied { status: u16 },

    /// Non-success response from the daemon. The body is usually a
    /// short plain-text or `{"error": "..."}` message.
    #[error("Local API error (HTTP {status}): {message}")]
    LocalApi { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the daemon could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }

    /// HTTP status code, when the daemon answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AccessDenied { status } | Self::LocalApi { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
