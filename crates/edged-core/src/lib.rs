//! Reconciliation core between `edged-api` and the `edged` binary.
//!
//! This crate owns the convergence logic and the coordination primitives of
//! the edge agent:
//!
//! - **[`compute_diff`]**: pure field-by-field diff of two [`Preferences`]
//!   records into a [`PreferenceMask`]: the observed payload with desired
//!   values substituted for exactly the fields that differ.
//!
//! - **[`Reconciler`]**: fetches observed preferences, diffs them against the
//!   desired target and, when dirty, executes a single [`ReconcileAction`]
//!   that applies the mask and double-checks the result (the daemon's
//!   immediate answer against a fresh read, then the fresh read against the
//!   target).
//!
//! - **[`ExecutorCoordinator`]**: single-flight launcher for the daemon's
//!   interactive control command. All clones share one slot; a second
//!   launch while one is in flight fails fast with
//!   [`CoreError::ExecutionConflict`].
//!
//! - **[`ModeMachine`]**: tracks the agent [`Mode`] from the daemon's backend
//!   state and decides when the login command is armed.
//!
//! - **[`Agent`]**: the control loop wiring triggers (document change,
//!   reload, status ticks, user actions) to the pieces above.
//!
//! The daemon itself is abstracted behind [`PreferenceStore`]; the
//! production implementation is [`edged_api::LocalClient`].

pub mod agent;
pub mod config;
pub mod convert;
pub mod daemon;
pub mod error;
pub mod executor;
pub mod mask;
pub mod mode;
pub mod model;
pub mod reconcile;

// ── Primary re-exports ──────────────────────────────────────────────
pub use agent::{Agent, AgentHandle, Trigger, UserAction};
pub use config::{AgentConfig, DEFAULT_APPLY_TIMEOUT, DEFAULT_TICK};
pub use daemon::{DesiredSource, PreferenceStore, StaticSource};
pub use error::CoreError;
pub use executor::{
    CommandRunner, ExecutorCoordinator, OutputSink, OutputStream, ProcessRunner, TracingSink,
};
pub use mask::{PreferenceMask, compute_diff};
pub use mode::{Mode, ModeInput, ModeMachine, next_mode, wants_login_command};
pub use reconcile::{ReconcileAction, ReconcileOutcome, ReconcilePlan, Reconciler};

pub use model::{
    BackendState, DEFAULT_CONTROL_URL, NetfilterMode, PrefField, PrefValue, Preferences, SelfNode,
    StatusSnapshot,
};
