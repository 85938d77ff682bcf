// ── Agent mode machine ──

use serde::Serialize;
use strum::Display;
use tracing::info;

use crate::model::{BackendState, StatusSnapshot};

/// Coarse lifecycle mode of the agent. Not persisted; every start
/// begins in `Bootstrap`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Bootstrap,
    /// Reserved; nothing transitions into it yet.
    Provisioning,
    ConfigurationPending,
    Running,
}

/// Something the mode machine reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeInput {
    /// Backend state from a status report.
    Backend(BackendState),
    /// The operator asked to enter configuration.
    Configure,
}

/// Pure transition function.
pub fn next_mode(current: Mode, input: &ModeInput) -> Mode {
    match (current, input) {
        (_, ModeInput::Backend(BackendState::NeedsLogin)) => Mode::Bootstrap,
        (_, ModeInput::Backend(BackendState::Running)) if current != Mode::ConfigurationPending => {
            Mode::Running
        }
        (Mode::Running, ModeInput::Configure) => Mode::ConfigurationPending,
        _ => current,
    }
}

/// Whether the status loop should launch the login command: the agent
/// is bootstrapping, the daemon needs a login and has not handed out a
/// login URL yet.
pub fn wants_login_command(mode: Mode, snapshot: &StatusSnapshot) -> bool {
    mode == Mode::Bootstrap
        && snapshot.backend_state == BackendState::NeedsLogin
        && snapshot.auth_url.as_deref().is_none_or(str::is_empty)
}

/// Holds the current mode and applies inputs to it.
#[derive(Debug, Clone, Default)]
pub struct ModeMachine {
    mode: Mode,
}

impl ModeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Apply `input`. Returns the new mode if it changed.
    pub fn apply(&mut self, input: &ModeInput) -> Option<Mode> {
        let next = next_mode(self.mode, input);
        if next == self.mode {
            return None;
        }
        info!(from = %self.mode, to = %next, "mode changed");
        self.mode = next;
        Some(next)
    }
}
