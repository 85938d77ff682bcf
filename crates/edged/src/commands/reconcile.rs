//! `edged reconcile`: one bounded reconcile pass against the document.

use chrono::{DateTime, Utc};
use serde::Serialize;

use edged_core::{ReconcileOutcome, Reconciler};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::commands::Context;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Report {
    #[serde(flatten)]
    outcome: ReconcileOutcome,
    converged_at: Option<DateTime<Utc>>,
}

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let agent = ctx.config.agent()?;
    let desired = ctx.config.document().read()?;

    let mut reconciler = Reconciler::new(ctx.client.clone(), desired);
    let outcome = reconciler
        .reconcile_within(agent.apply_timeout)
        .await
        .map_err(|e| ctx.error(e))?;

    let report = Report {
        outcome,
        converged_at: reconciler.last_converged(),
    };
    let format = global.format_or(OutputFormat::Table);
    let rendered = output::render_single(format, &report, detail, summary)?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn summary(report: &Report) -> String {
    match &report.outcome {
        ReconcileOutcome::InSync => "in_sync".into(),
        ReconcileOutcome::Applied { changed } => changed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn detail(report: &Report) -> String {
    let at = report
        .converged_at
        .as_ref()
        .map_or_else(String::new, DateTime::to_rfc3339);
    match &report.outcome {
        ReconcileOutcome::InSync => output::detail_lines(&[
            ("Outcome", output::paint_state("in sync", true)),
            ("Checked", at),
        ]),
        ReconcileOutcome::Applied { changed } => output::detail_lines(&[
            ("Outcome", output::paint_state("applied", true)),
            ("Changed", summary(report).replace('\n', ", ")),
            ("Fields", changed.len().to_string()),
            ("Converged", at),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use edged_core::PrefField;

    use super::*;

    #[test]
    fn json_report_is_flat() {
        let report = Report {
            outcome: ReconcileOutcome::Applied {
                changed: vec![PrefField::RouteAll, PrefField::Hostname],
            },
            converged_at: None,
        };
        let json = serde_json::to_value(&report).expect("serializable");
        assert_eq!(json["outcome"], "applied");
        assert_eq!(json["changed"][0], "RouteAll");
        assert!(json["converged_at"].is_null());
        assert_eq!(summary(&report), "RouteAll\nHostname");
    }
}
