// ── Control loop ──
//
// Two independent tasks share one cancellation token:
//
// - the reconcile task waits for triggers (startup, document change,
//   reload), refreshes the target and runs one bounded reconcile attempt
//   per trigger;
// - the status task polls the daemon on a fixed tick, drives the mode
//   machine, launches the login command when armed and handles operator
//   actions.
//
// A fatal error in either task cancels the token; `Agent::run` then waits
// for both tasks and drains the executor before returning.

use std::time::Duration;

use strum::Display;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::AgentConfig;
use crate::daemon::{DesiredSource, PreferenceStore};
use crate::error::CoreError;
use crate::executor::ExecutorCoordinator;
use crate::mode::{Mode, ModeInput, ModeMachine, wants_login_command};
use crate::model::{Preferences, StatusSnapshot};
use crate::reconcile::{ReconcileOutcome, Reconciler};

const TRIGGER_CHANNEL_SIZE: usize = 8;
const ACTION_CHANNEL_SIZE: usize = 8;

/// Why a reconcile attempt is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Trigger {
    /// Initial pass with the target the agent was built with.
    Startup,
    /// The desired document changed on disk.
    DesiredChanged,
    /// Explicit reload request (SIGHUP).
    Reload,
}

impl Trigger {
    fn reloads_source(self) -> bool {
        matches!(self, Self::DesiredChanged | Self::Reload)
    }
}

/// Operator request delivered to the status task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum UserAction {
    /// Enter configuration (only honored while running).
    Configure,
    /// Log the daemon out (only honored while running).
    Logout,
}

// ── Handle ───────────────────────────────────────────────────────────

/// Cloneable remote control for a running [`Agent`].
#[derive(Debug, Clone)]
pub struct AgentHandle {
    triggers: mpsc::Sender<Trigger>,
    actions: mpsc::Sender<UserAction>,
    cancel: CancellationToken,
    mode: watch::Receiver<Mode>,
    status: watch::Receiver<Option<StatusSnapshot>>,
}

impl AgentHandle {
    /// Reload the desired document and reconcile.
    pub fn reload(&self) {
        self.send_trigger(Trigger::Reload);
    }

    /// Signal that the desired document changed.
    pub fn desired_changed(&self) {
        self.send_trigger(Trigger::DesiredChanged);
    }

    pub fn configure(&self) {
        self.send_action(UserAction::Configure);
    }

    pub fn logout(&self) {
        self.send_action(UserAction::Logout);
    }

    /// Stop both loops. `Agent::run` returns once the executor drains.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Sender for components that produce triggers (document watchers).
    pub fn triggers(&self) -> mpsc::Sender<Trigger> {
        self.triggers.clone()
    }

    /// Token cancelled when the agent stops.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn mode(&self) -> watch::Receiver<Mode> {
        self.mode.clone()
    }

    /// Latest status snapshot; `None` until the first poll completes.
    pub fn status(&self) -> watch::Receiver<Option<StatusSnapshot>> {
        self.status.clone()
    }

    fn send_trigger(&self, trigger: Trigger) {
        // A full queue already holds a pending attempt that will pick up
        // the latest document.
        if let Err(e) = self.triggers.try_send(trigger) {
            debug!(%trigger, error = %e, "trigger dropped");
        }
    }

    fn send_action(&self, action: UserAction) {
        if let Err(e) = self.actions.try_send(action) {
            warn!(%action, error = %e, "user action dropped");
        }
    }
}

// ── Agent ────────────────────────────────────────────────────────────

/// The control-loop driver.
pub struct Agent<S, D> {
    store: S,
    desired: Preferences,
    source: D,
    executor: ExecutorCoordinator,
    config: AgentConfig,
    trigger_rx: mpsc::Receiver<Trigger>,
    action_rx: mpsc::Receiver<UserAction>,
    cancel: CancellationToken,
    mode_tx: watch::Sender<Mode>,
    status_tx: watch::Sender<Option<StatusSnapshot>>,
}

impl<S, D> Agent<S, D>
where
    S: PreferenceStore + Clone + 'static,
    D: DesiredSource + 'static,
{
    pub fn new(
        store: S,
        desired: Preferences,
        source: D,
        executor: ExecutorCoordinator,
        config: AgentConfig,
    ) -> (Self, AgentHandle) {
        let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_CHANNEL_SIZE);
        let (action_tx, action_rx) = mpsc::channel(ACTION_CHANNEL_SIZE);
        let (mode_tx, mode_rx) = watch::channel(Mode::default());
        let (status_tx, status_rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        if config.reconcile_on_start {
            // Fresh channel with spare capacity.
            let _ = trigger_tx.try_send(Trigger::Startup);
        }

        let handle = AgentHandle {
            triggers: trigger_tx,
            actions: action_tx,
            cancel: cancel.clone(),
            mode: mode_rx,
            status: status_rx,
        };
        let agent = Self {
            store,
            desired,
            source,
            executor,
            config,
            trigger_rx,
            action_rx,
            cancel,
            mode_tx,
            status_tx,
        };
        (agent, handle)
    }

    /// Run both loops until shutdown or a fatal error.
    pub async fn run(self) -> Result<(), CoreError> {
        let Self {
            store,
            desired,
            source,
            executor,
            config,
            trigger_rx,
            action_rx,
            cancel,
            mode_tx,
            status_tx,
        } = self;

        info!(
            source = %source.describe(),
            tick = ?config.tick,
            apply_timeout = ?config.apply_timeout,
            "agent starting"
        );

        let reconcile = tokio::spawn(reconcile_task(
            Reconciler::new(store.clone(), desired),
            source,
            trigger_rx,
            config.apply_timeout,
            cancel.clone(),
        ));
        let status = tokio::spawn(status_task(
            StatusLoop {
                store,
                executor: executor.clone(),
                login_args: config.login_args,
                machine: ModeMachine::new(),
                mode_tx,
                status_tx,
            },
            config.tick,
            action_rx,
            cancel.clone(),
        ));

        let (reconcile, status) = tokio::join!(reconcile, status);

        if executor.is_running() {
            info!("waiting for control command to finish");
        }
        executor.wait_for_all().await;

        let result = flatten(reconcile).and(flatten(status));
        match &result {
            Ok(()) => info!("agent stopped"),
            Err(e) => error!(error = %e, "agent stopped on fatal error"),
        }
        result
    }
}

fn flatten(joined: Result<Result<(), CoreError>, tokio::task::JoinError>) -> Result<(), CoreError> {
    joined.map_err(|e| CoreError::Internal(format!("agent task failed: {e}")))?
}

// ── Reconcile task ───────────────────────────────────────────────────

async fn reconcile_task<S, D>(
    mut reconciler: Reconciler<S>,
    source: D,
    mut triggers: mpsc::Receiver<Trigger>,
    apply_timeout: Duration,
    cancel: CancellationToken,
) -> Result<(), CoreError>
where
    S: PreferenceStore,
    D: DesiredSource,
{
    loop {
        let trigger = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            trigger = triggers.recv() => match trigger {
                Some(t) => t,
                None => {
                    cancel.cancelled().await;
                    break;
                }
            },
        };
        debug!(%trigger, "reconcile triggered");

        if trigger.reloads_source() {
            match source.load() {
                Ok(desired) => reconciler.set_desired(desired),
                Err(e) => warn!(error = %e, "keeping previous desired preferences"),
            }
        }

        match reconciler.reconcile_within(apply_timeout).await {
            Ok(ReconcileOutcome::InSync) => debug!(%trigger, "nothing to apply"),
            Ok(ReconcileOutcome::Applied { changed }) => {
                info!(%trigger, fields = ?changed, "preferences reconciled");
            }
            Err(e) if !e.is_fatal() => warn!(%trigger, error = %e, "reconcile attempt failed"),
            Err(e) => {
                error!(%trigger, error = %e, "reconcile failed");
                cancel.cancel();
                return Err(e);
            }
        }
    }
    Ok(())
}

// ── Status task ──────────────────────────────────────────────────────

struct StatusLoop<S> {
    store: S,
    executor: ExecutorCoordinator,
    login_args: Vec<String>,
    machine: ModeMachine,
    mode_tx: watch::Sender<Mode>,
    status_tx: watch::Sender<Option<StatusSnapshot>>,
}

impl<S: PreferenceStore> StatusLoop<S> {
    async fn poll(&mut self) -> Result<(), CoreError> {
        let snapshot = self.store.status().await?;
        self.transition(&ModeInput::Backend(snapshot.backend_state.clone()));

        let mode = self.machine.mode();
        if wants_login_command(mode, &snapshot) && !self.executor.is_running() {
            match self.executor.run(self.login_args.iter().cloned()) {
                Ok(()) => info!(args = ?self.login_args, "login command launched"),
                Err(CoreError::ExecutionConflict) => debug!("login command already running"),
                Err(e) => return Err(e),
            }
        }

        self.status_tx.send_replace(Some(snapshot));
        Ok(())
    }

    async fn handle(&mut self, action: UserAction) -> Result<(), CoreError> {
        match action {
            UserAction::Configure => self.transition(&ModeInput::Configure),
            UserAction::Logout if self.machine.mode() == Mode::Running => {
                info!("logging out");
                self.store.logout().await?;
            }
            UserAction::Logout => {
                debug!(mode = %self.machine.mode(), "logout ignored outside running mode");
            }
        }
        Ok(())
    }

    fn transition(&mut self, input: &ModeInput) {
        if let Some(mode) = self.machine.apply(input) {
            self.mode_tx.send_replace(mode);
        }
    }
}

async fn status_task<S: PreferenceStore>(
    mut state: StatusLoop<S>,
    tick: Duration,
    mut actions: mpsc::Receiver<UserAction>,
    cancel: CancellationToken,
) -> Result<(), CoreError> {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            Some(action) = actions.recv() => state.handle(action).await,
            _ = interval.tick() => state.poll().await,
        };

        if let Err(e) = result {
            if !e.is_fatal() {
                warn!(error = %e, "status step failed");
                continue;
            }
            error!(error = %e, "status loop failed");
            cancel.cancel();
            return Err(e);
        }
    }
    Ok(())
}
