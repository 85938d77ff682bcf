//! `edged diff`: what a reconcile pass would change, without writing.

use serde::Serialize;
use tabled::Tabled;

use edged_core::{PrefField, PrefValue, ReconcilePlan, Reconciler};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::commands::Context;
use crate::error::CliError;
use crate::output;

/// One differing field.
#[derive(Debug, Serialize)]
pub struct FieldChange {
    pub field: PrefField,
    pub current: PrefValue,
    pub desired: PrefValue,
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "FIELD")]
    field: String,
    #[tabled(rename = "CURRENT")]
    current: String,
    #[tabled(rename = "DESIRED")]
    desired: String,
}

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let document = ctx.config.document();
    let desired = document.read()?;
    tracing::debug!(path = %document.path().display(), "loaded desired preferences");

    let mut reconciler = Reconciler::new(ctx.client.clone(), desired);
    let plan = reconciler.plan().await.map_err(|e| ctx.error(e))?;
    let changes = changes(&plan);

    let format = global.format_or(OutputFormat::Table);
    if changes.is_empty() && format == OutputFormat::Table {
        output::print_output("Preferences in sync", global.quiet);
        return Ok(());
    }

    let rendered = output::render_list(
        format,
        &changes,
        |c| ChangeRow {
            field: c.field.wire_name().to_owned(),
            current: output::dim(&c.current.to_string()),
            desired: output::paint_state(&c.desired.to_string(), true),
        },
        |c| c.field.wire_name().to_owned(),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

/// Marked fields of the plan with before/after values, in field order.
pub fn changes(plan: &ReconcilePlan) -> Vec<FieldChange> {
    plan.mask()
        .changes()
        .iter()
        .map(|(&field, desired)| FieldChange {
            field,
            current: field.value(plan.observed()),
            desired: desired.clone(),
        })
        .collect()
}
