// ── API-to-domain type conversions ──
//
// Bridges `edged_api` wire types and `edged_core::model` domain types.
// Go `null` collections become empty vectors, empty address strings become
// `None`, and the numeric netfilter mode becomes `NetfilterMode`.

use std::collections::BTreeMap;
use std::net::IpAddr;

use edged_api::{MaskedPrefs, Prefs, Status};

use crate::mask::PreferenceMask;
use crate::model::{BackendState, NetfilterMode, Preferences, SelfNode, StatusSnapshot};

// ── Helpers ────────────────────────────────────────────────────────

/// Parse an address string, treating empty or unparseable values as unset.
fn parse_ip(raw: &str) -> Option<IpAddr> {
    raw.trim().parse().ok()
}

fn non_empty(raw: &str) -> Option<String> {
    (!raw.is_empty()).then(|| raw.to_owned())
}

/// Go encodes empty slices as `null`; send empty lists the same way.
fn wire_list(items: &[String]) -> Option<Vec<String>> {
    (!items.is_empty()).then(|| items.to_vec())
}

// ── Preferences ────────────────────────────────────────────────────

impl From<Prefs> for Preferences {
    fn from(p: Prefs) -> Self {
        Self {
            exit_node_ip: parse_ip(&p.exit_node_ip),
            control_url: p.control_url,
            route_all: p.route_all,
            allow_single_hosts: p.allow_single_hosts,
            exit_node_id: p.exit_node_id,
            exit_node_allow_lan_access: p.exit_node_allow_lan_access,
            corp_dns: p.corp_dns,
            run_ssh: p.run_ssh,
            want_running: p.want_running,
            logged_out: p.logged_out,
            shields_up: p.shields_up,
            advertise_tags: p.advertise_tags.unwrap_or_default(),
            hostname: p.hostname,
            notepad_urls: p.notepad_urls,
            force_daemon: p.force_daemon,
            advertise_routes: p.advertise_routes.unwrap_or_default(),
            no_snat: p.no_snat,
            netfilter_mode: NetfilterMode::from_wire(p.netfilter_mode),
            operator_user: p.operator_user,
        }
    }
}

impl From<&Preferences> for Prefs {
    fn from(p: &Preferences) -> Self {
        Self {
            control_url: p.control_url.clone(),
            route_all: p.route_all,
            allow_single_hosts: p.allow_single_hosts,
            exit_node_id: p.exit_node_id.clone(),
            exit_node_ip: p.exit_node_ip.map(|ip| ip.to_string()).unwrap_or_default(),
            exit_node_allow_lan_access: p.exit_node_allow_lan_access,
            corp_dns: p.corp_dns,
            run_ssh: p.run_ssh,
            want_running: p.want_running,
            logged_out: p.logged_out,
            shields_up: p.shields_up,
            advertise_tags: wire_list(&p.advertise_tags),
            hostname: p.hostname.clone(),
            notepad_urls: p.notepad_urls,
            force_daemon: p.force_daemon,
            advertise_routes: wire_list(&p.advertise_routes),
            no_snat: p.no_snat,
            netfilter_mode: p.netfilter_mode.as_wire(),
            operator_user: p.operator_user.clone(),
        }
    }
}

impl From<&PreferenceMask> for MaskedPrefs {
    fn from(mask: &PreferenceMask) -> Self {
        let mut masked = MaskedPrefs::new(Prefs::from(mask.payload()));
        for field in mask.fields() {
            masked.mark(field.wire_name());
        }
        masked
    }
}

// ── Status ─────────────────────────────────────────────────────────

impl From<Status> for StatusSnapshot {
    fn from(s: Status) -> Self {
        let users: BTreeMap<i64, String> = s
            .user
            .unwrap_or_default()
            .into_values()
            .map(|u| (u.id, u.login_name))
            .collect();

        Self {
            backend_state: BackendState::from(s.backend_state),
            auth_url: non_empty(&s.auth_url),
            health: s.health.unwrap_or_default(),
            self_node: s.self_status.map(|n| SelfNode {
                host_name: n.host_name,
                dns_name: n.dns_name,
                online: n.online,
                user_id: n.user_id,
            }),
            tailnet: s.current_tailnet.map(|t| t.name).filter(|n| !n.is_empty()),
            addresses: s
                .tailscale_ips
                .unwrap_or_default()
                .iter()
                .filter_map(|ip| parse_ip(ip))
                .collect(),
            users,
            version: s.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::compute_diff;
    use crate::model::PrefField;

    #[test]
    fn wire_prefs_normalize_nulls_and_empty_addresses() {
        let wire = Prefs {
            exit_node_ip: String::new(),
            advertise_tags: None,
            advertise_routes: Some(vec!["10.0.0.0/24".into()]),
            netfilter_mode: 1,
            ..Prefs::default()
        };
        let prefs = Preferences::from(wire);
        assert_eq!(prefs.exit_node_ip, None);
        assert!(prefs.advertise_tags.is_empty());
        assert_eq!(prefs.advertise_routes, vec!["10.0.0.0/24".to_owned()]);
        assert_eq!(prefs.netfilter_mode, NetfilterMode::NoDivert);

        let back = Prefs::from(&prefs);
        assert_eq!(back.exit_node_ip, "");
        assert_eq!(back.advertise_tags, None);
        assert_eq!(back.netfilter_mode, 1);
    }

    #[test]
    fn mask_becomes_masked_prefs_with_wire_markers() {
        let current = Preferences::default();
        let desired = Preferences {
            route_all: true,
            exit_node_ip: Some("100.64.0.1".parse().expect("ip")),
            ..Preferences::default()
        };
        let (mask, dirty) = compute_diff(&current, &desired);
        assert!(dirty);

        let masked = MaskedPrefs::from(&mask);
        assert!(masked.is_set(PrefField::RouteAll.wire_name()));
        assert!(masked.is_set("ExitNodeIP"));
        assert!(!masked.is_set("Hostname"));
        assert!(masked.prefs.route_all);
        assert_eq!(masked.prefs.exit_node_ip, "100.64.0.1");
    }

    #[test]
    fn status_snapshot_from_wire() {
        let raw = serde_json::json!({
            "Version": "1.62.0",
            "BackendState": "Running",
            "AuthURL": "",
            "TailscaleIPs": ["100.64.0.7", "bogus"],
            "Self": { "HostName": "edge-01", "UserID": 42, "Online": true },
            "Health": null,
            "CurrentTailnet": { "Name": "example.com" },
            "User": { "42": { "ID": 42, "LoginName": "ops@example.com" } }
        });
        let status: Status = serde_json::from_value(raw).expect("valid status");
        let snap = StatusSnapshot::from(status);

        assert_eq!(snap.backend_state, BackendState::Running);
        assert_eq!(snap.auth_url, None);
        assert_eq!(snap.addresses.len(), 1);
        assert_eq!(snap.tailnet.as_deref(), Some("example.com"));
        assert_eq!(snap.login_name(), Some("ops@example.com"));
        assert!(snap.is_healthy());
    }
}
