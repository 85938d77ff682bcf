//! `edged run`: the long-running agent.
//!
//! Wires the local API client, the desired document, the control command
//! executor and the document watcher into an `Agent`, and forwards process
//! signals: SIGHUP reloads the document, SIGINT/SIGTERM shut down after the
//! running control command (if any) has exited.

use tokio::signal::unix::{Signal, SignalKind, signal};
use tracing::{info, warn};

use edged_config::DocumentWatcher;
use edged_core::{Agent, AgentHandle, ExecutorCoordinator};

use crate::commands::Context;
use crate::error::CliError;

pub async fn handle(ctx: Context) -> Result<(), CliError> {
    let Context { config, client } = ctx;
    let agent_config = config.agent()?;
    let document = config.document();
    // Baseline the watcher before the first read so an edit landing in
    // between is not missed.
    let watcher = config
        .agent
        .watch
        .then(|| DocumentWatcher::new(document.path(), config.watch_interval()));
    let desired = document.read()?;

    let signals = Signals::install()?;
    let executor = ExecutorCoordinator::new(config.agent.cli_path.clone());
    info!(
        local_api = %config.endpoint(),
        control = %config.agent.cli_path.display(),
        watch = config.agent.watch,
        "edged starting"
    );

    let (agent, handle) = Agent::new(client, desired, document.clone(), executor, agent_config);

    if let Some(watcher) = watcher {
        tokio::spawn(watcher.run(handle.triggers(), handle.cancellation_token()));
    }
    tokio::spawn(signals.forward(handle.clone()));

    agent
        .run()
        .await
        .map_err(|e| CliError::from_core(e, &config.endpoint()))
}

struct Signals {
    hangup: Signal,
    terminate: Signal,
    interrupt: Signal,
}

impl Signals {
    fn install() -> Result<Self, CliError> {
        Ok(Self {
            hangup: signal(SignalKind::hangup())?,
            terminate: signal(SignalKind::terminate())?,
            interrupt: signal(SignalKind::interrupt())?,
        })
    }

    async fn forward(mut self, handle: AgentHandle) {
        let cancel = handle.cancellation_token();
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = self.hangup.recv() => {
                    info!("SIGHUP: reloading desired preferences");
                    handle.reload();
                }
                _ = self.terminate.recv() => {
                    info!("SIGTERM: shutting down");
                    handle.shutdown();
                    break;
                }
                _ = self.interrupt.recv() => {
                    warn!("interrupted: shutting down");
                    handle.shutdown();
                    break;
                }
            }
        }
    }
}
