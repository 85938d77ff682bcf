use edged_core::PreferenceStore;

use crate::cli::GlobalOpts;
use crate::commands::Context;
use crate::error::CliError;
use crate::output;

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    PreferenceStore::logout(&ctx.client)
        .await
        .map_err(|e| ctx.error(e))?;
    tracing::info!("daemon logged out");
    output::print_output("Logged out", global.quiet);
    Ok(())
}
