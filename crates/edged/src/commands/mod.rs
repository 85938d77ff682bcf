//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod diff;
pub mod logout;
pub mod prefs;
pub mod reconcile;
pub mod run;
pub mod status;

use edged_api::LocalClient;
use edged_config::Config;
use edged_core::CoreError;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Resolved configuration plus a local API client built from it.
pub struct Context {
    pub config: Config,
    pub client: LocalClient,
}

impl Context {
    pub fn new(config: Config) -> Result<Self, CliError> {
        let transport = config.transport()?;
        let client = LocalClient::new(&transport).map_err(CoreError::from)?;
        Ok(Self { config, client })
    }

    /// Wrap a core error with the configured daemon URL.
    pub fn error(&self, err: CoreError) -> CliError {
        CliError::from_core(err, &self.config.endpoint())
    }
}

/// Dispatch a daemon-bound command to its handler.
pub async fn dispatch(cmd: Command, ctx: Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run(_) => run::handle(ctx).await,
        Command::Reconcile(_) => reconcile::handle(&ctx, global).await,
        Command::Diff(_) => diff::handle(&ctx, global).await,
        Command::Prefs => prefs::handle(&ctx, global).await,
        Command::Status => status::handle(&ctx, global).await,
        Command::Logout => logout::handle(&ctx, global).await,
        // Completions are handled before dispatch
        Command::Completions(_) => unreachable!(),
    }
}
