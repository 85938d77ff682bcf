//! `edged status`: daemon state plus the mode a freshly started agent
//! would derive from it.

use serde::Serialize;

use edged_core::{BackendState, Mode, ModeInput, PreferenceStore, StatusSnapshot, next_mode};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::commands::Context;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct StatusView {
    mode: Mode,
    healthy: bool,
    login_name: Option<String>,
    #[serde(flatten)]
    snapshot: StatusSnapshot,
}

impl StatusView {
    fn new(snapshot: StatusSnapshot) -> Self {
        let mode = next_mode(
            Mode::default(),
            &ModeInput::Backend(snapshot.backend_state.clone()),
        );
        Self {
            mode,
            healthy: snapshot.is_healthy(),
            login_name: snapshot.login_name().map(str::to_owned),
            snapshot,
        }
    }
}

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = PreferenceStore::status(&ctx.client)
        .await
        .map_err(|e| ctx.error(e))?;
    let view = StatusView::new(snapshot);

    let format = global.format_or(OutputFormat::Table);
    let rendered = output::render_single(format, &view, detail, |v| {
        v.snapshot.backend_state.to_string()
    })?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn or_none(value: Option<String>) -> String {
    value.unwrap_or_else(|| output::dim("-"))
}

fn detail(view: &StatusView) -> String {
    let s = &view.snapshot;
    let running = s.backend_state == BackendState::Running;
    let mut pairs = vec![
        (
            "State",
            output::paint_state(s.backend_state.as_str(), running),
        ),
        ("Mode", view.mode.to_string()),
        (
            "Health",
            if view.healthy {
                output::paint_state("ok", true)
            } else if s.health.is_empty() {
                output::paint_state("offline", false)
            } else {
                output::paint_state(&s.health.join("; "), false)
            },
        ),
        ("Tailnet", or_none(s.tailnet.clone())),
        (
            "Host",
            or_none(s.self_node.as_ref().map(|n| n.host_name.clone())),
        ),
        (
            "Address",
            or_none(s.primary_address().as_ref().map(ToString::to_string)),
        ),
        ("Login", or_none(view.login_name.clone())),
        ("Version", s.version.clone()),
    ];
    if let Some(url) = s.auth_url.as_deref().filter(|u| !u.is_empty()) {
        pairs.push(("Auth URL", url.to_owned()));
    }
    output::detail_lines(&pairs)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use edged_core::SelfNode;

    use super::*;

    fn running() -> StatusSnapshot {
        StatusSnapshot {
            version: "1.80.0".into(),
            backend_state: BackendState::Running,
            self_node: Some(SelfNode {
                host_name: "edge-01".into(),
                online: true,
                user_id: 7,
                ..SelfNode::default()
            }),
            tailnet: Some("home.ts.net".into()),
            addresses: vec!["100.64.0.9".parse().expect("ip")],
            users: BTreeMap::from([(7, "ops@example.com".into())]),
            ..StatusSnapshot::default()
        }
    }

    #[test]
    fn view_derives_mode_and_login() {
        let view = StatusView::new(running());
        assert_eq!(view.mode, Mode::Running);
        assert!(view.healthy);
        assert_eq!(view.login_name.as_deref(), Some("ops@example.com"));

        let needs_login = StatusView::new(StatusSnapshot {
            backend_state: BackendState::NeedsLogin,
            ..StatusSnapshot::default()
        });
        assert_eq!(needs_login.mode, Mode::Bootstrap);
        assert!(!needs_login.healthy);
    }

    #[test]
    fn detail_shows_node_fields() {
        let text = detail(&StatusView::new(running()));
        assert!(text.contains("Running"));
        assert!(text.contains("edge-01"));
        assert!(text.contains("100.64.0.9"));
        assert!(!text.contains("Auth URL"));
    }

    #[test]
    fn json_view_is_flat() {
        let json = serde_json::to_value(StatusView::new(running())).expect("serializable");
        assert_eq!(json["mode"], "running");
        assert_eq!(json["backend_state"], "Running");
        assert_eq!(json["tailnet"], "home.ts.net");
    }
}
