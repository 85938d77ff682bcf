//! Configuration for the edged agent.
//!
//! TOML settings layered with figment (defaults, then the config file, then
//! `EDGED_*` environment variables), the desired-preferences YAML document
//! and a polling watcher that turns document edits into reconcile triggers.
//! The CLI adds flag overrides on top.

mod document;
mod watch;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use edged_api::TransportConfig;
use edged_api::transport::{DEFAULT_LOCAL_API_URL, DEFAULT_SOCKET_PATH};
use edged_core::{AgentConfig, DEFAULT_APPLY_TIMEOUT, DEFAULT_TICK};

pub use document::PrefsDocument;
pub use watch::{DEFAULT_WATCH_INTERVAL, DocumentWatcher};

/// Where the desired-preferences document lives unless configured.
pub const DEFAULT_PREFS_FILE: &str = "/etc/edged/tailscale-prefs.yaml";

/// Prefix for environment overrides. Only nested keys are read
/// (`EDGED_AGENT__TICK_SECS=30`); flat `EDGED_*` names belong to CLI flags.
pub const ENV_PREFIX: &str = "EDGED_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid preferences document {}: {source}", .path.display())]
    Document {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("failed to serialize: {0}")]
    Serialization(String),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub local_api: LocalApiSettings,
    pub agent: AgentSettings,
    pub log: LogSettings,
}

/// How to reach the daemon's local API.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocalApiSettings {
    pub url: String,
    /// Unix socket of the daemon; wins over `url` when set. An empty path
    /// selects TCP.
    pub socket: Option<PathBuf>,
    /// Local API token (plaintext; prefer `EDGED_LOCAL_API__TOKEN`).
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LocalApiSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_LOCAL_API_URL.into(),
            socket: cfg!(target_os = "linux").then(|| PathBuf::from(DEFAULT_SOCKET_PATH)),
            token: None,
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for LocalApiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalApiSettings")
            .field("url", &self.url)
            .field("socket", &self.socket)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentSettings {
    pub prefs_file: PathBuf,
    pub tick_secs: u64,
    pub apply_timeout_secs: u64,
    /// Control binary used for interactive commands.
    pub cli_path: PathBuf,
    pub login_args: Vec<String>,
    /// Poll the desired document for changes.
    pub watch: bool,
    pub watch_interval_ms: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            prefs_file: PathBuf::from(DEFAULT_PREFS_FILE),
            tick_secs: DEFAULT_TICK.as_secs(),
            apply_timeout_secs: DEFAULT_APPLY_TIMEOUT.as_secs(),
            cli_path: PathBuf::from("tailscale"),
            login_args: vec!["up".into()],
            watch: true,
            watch_interval_ms: duration_millis(DEFAULT_WATCH_INTERVAL),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LogSettings {
    /// Also write logs to this file.
    pub file: Option<PathBuf>,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Config {
    /// Transport settings for `edged_api::LocalClient`.
    pub fn transport(&self) -> Result<TransportConfig, ConfigError> {
        let url: url::Url = self
            .local_api
            .url
            .parse()
            .map_err(|e| ConfigError::Validation {
                field: "local_api.url".into(),
                reason: format!("{e}: {}", self.local_api.url),
            })?;

        let mut transport = TransportConfig::new(url)
            .with_timeout(Duration::from_secs(self.local_api.timeout_secs));
        if let Some(socket) = self.socket() {
            transport = transport.with_socket(socket);
        }
        if let Some(token) = self.local_api.token.as_deref().filter(|t| !t.is_empty()) {
            transport = transport.with_token(SecretString::from(token.to_owned()));
        }
        Ok(transport)
    }

    /// The unix socket in use, if any.
    pub fn socket(&self) -> Option<&Path> {
        self.local_api
            .socket
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Human-readable local API endpoint for logs and error messages.
    pub fn endpoint(&self) -> String {
        match self.socket() {
            Some(socket) => format!("unix:{}", socket.display()),
            None => self.local_api.url.clone(),
        }
    }

    /// Runtime settings for `edged_core::Agent`.
    pub fn agent(&self) -> Result<AgentConfig, ConfigError> {
        if self.agent.tick_secs == 0 {
            return Err(ConfigError::Validation {
                field: "agent.tick_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.agent.apply_timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "agent.apply_timeout_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(AgentConfig {
            tick: Duration::from_secs(self.agent.tick_secs),
            apply_timeout: Duration::from_secs(self.agent.apply_timeout_secs),
            login_args: self.agent.login_args.clone(),
            ..AgentConfig::default()
        })
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.agent.watch_interval_ms.max(1))
    }

    pub fn document(&self) -> PrefsDocument {
        PrefsDocument::new(&self.agent.prefs_file)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path.
///
/// A system-wide `/etc/edged/config.toml` wins when present; otherwise
/// the per-user XDG / platform location is used.
pub fn config_path() -> PathBuf {
    let system = PathBuf::from("/etc/edged/config.toml");
    if system.exists() {
        return system;
    }
    ProjectDirs::from("dev", "edged", "edged").map_or_else(
        || PathBuf::from(".").join("edged.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Build the layered figment for `path` (defaults → file → env).
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(
            Env::prefixed(ENV_PREFIX)
                .filter(|key| key.as_str().contains("__"))
                .split("__"),
        )
}

/// Load configuration.
///
/// An explicitly given file must exist; the default location is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match explicit {
        Some(path) if !path.exists() => {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Some(path) => path.to_path_buf(),
        None => config_path(),
    };

    let config: Config = figment(&path).extract()?;
    Ok(config)
}

/// Render a config as TOML (for `--print-config` style output).
pub fn to_toml(config: &Config) -> Result<String, ConfigError> {
    toml::to_string_pretty(config).map_err(|e| ConfigError::Serialization(e.to_string()))
}
