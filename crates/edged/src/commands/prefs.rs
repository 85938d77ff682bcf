//! `edged prefs`: dump the daemon's preferences.
//!
//! The default YAML form is a valid desired document, so
//! `edged prefs > /etc/edged/tailscale-prefs.yaml` seeds a new device.

use tabled::Tabled;

use edged_core::{PrefField, PreferenceStore, Preferences};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::commands::Context;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct PrefRow {
    #[tabled(rename = "KEY")]
    key: &'static str,
    #[tabled(rename = "VALUE")]
    value: String,
}

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let prefs = ctx
        .client
        .get_preferences()
        .await
        .map_err(|e| ctx.error(e))?;

    let format = global.format_or(OutputFormat::Yaml);
    let rendered = output::render_single(format, &prefs, table, plain)?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn table(prefs: &Preferences) -> String {
    let rows: Vec<PrefRow> = PrefField::ALL
        .iter()
        .map(|field| PrefRow {
            key: field.document_key(),
            value: field.value(prefs).to_string(),
        })
        .collect();
    output::render_table(&rows)
}

/// `key=value` per line.
fn plain(prefs: &Preferences) -> String {
    PrefField::ALL
        .iter()
        .map(|field| format!("{}={}", field.document_key(), field.value(prefs)))
        .collect::<Vec<_>>()
        .join("\n")
}
