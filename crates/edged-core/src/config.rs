// ── Agent runtime configuration ──
//
// Built by the CLI layer from `edged-config`; the core never reads files.

use std::time::Duration;

/// Status poll interval.
pub const DEFAULT_TICK: Duration = Duration::from_secs(60);

/// Upper bound on a single reconcile attempt.
pub const DEFAULT_APPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Tunables for [`Agent`](crate::Agent).
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub tick: Duration,
    pub apply_timeout: Duration,
    /// Arguments passed to the control command to start a login.
    pub login_args: Vec<String>,
    /// Run one reconcile attempt as soon as the agent starts.
    pub reconcile_on_start: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            apply_timeout: DEFAULT_APPLY_TIMEOUT,
            login_args: vec!["up".to_owned()],
            reconcile_on_start: true,
        }
    }
}
