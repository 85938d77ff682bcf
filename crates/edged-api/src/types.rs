// Local API wire types
//
// Field names follow tailscaled's JSON encoding (Go struct field names).
// Go encodes nil slices and maps as `null`, so every collection is optional
// here and normalized by the consumer.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

// ── Preferences ─────────────────────────────────────────────────────

/// The subset of `ipn.Prefs` edged manages.
///
/// Unknown fields sent by the daemon (persist state, auto-update settings,
/// ...) are ignored on read and never written back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefs {
    #[serde(rename = "ControlURL")]
    pub control_url: String,
    #[serde(rename = "RouteAll")]
    pub route_all: bool,
    #[serde(rename = "AllowSingleHosts")]
    pub allow_single_hosts: bool,
    #[serde(rename = "ExitNodeID")]
    pub exit_node_id: String,
    #[serde(rename = "ExitNodeIP")]
    pub exit_node_ip: String,
    #[serde(rename = "ExitNodeAllowLANAccess")]
    pub exit_node_allow_lan_access: bool,
    #[serde(rename = "CorpDNS")]
    pub corp_dns: bool,
    #[serde(rename = "RunSSH")]
    pub run_ssh: bool,
    #[serde(rename = "WantRunning")]
    pub want_running: bool,
    #[serde(rename = "LoggedOut")]
    pub logged_out: bool,
    #[serde(rename = "ShieldsUp")]
    pub shields_up: bool,
    #[serde(rename = "AdvertiseTags")]
    pub advertise_tags: Option<Vec<String>>,
    #[serde(rename = "Hostname")]
    pub hostname: String,
    #[serde(rename = "NotepadURLs")]
    pub notepad_urls: bool,
    #[serde(rename = "ForceDaemon")]
    pub force_daemon: bool,
    #[serde(rename = "AdvertiseRoutes")]
    pub advertise_routes: Option<Vec<String>>,
    #[serde(rename = "NoSNAT")]
    pub no_snat: bool,
    #[serde(rename = "NetfilterMode")]
    pub netfilter_mode: i32,
    #[serde(rename = "OperatorUser")]
    pub operator_user: String,
}

/// `ipn.MaskedPrefs`: a full `Prefs` payload plus one `<Field>Set` marker
/// per field that should actually be written.
///
/// The daemon only looks at payload fields whose marker is present, so
/// the payload for unmarked fields is informational.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaskedPrefs {
    pub prefs: Prefs,
    /// Wire names (`RouteAll`, `Hostname`, ...) of the fields to write.
    pub set: BTreeSet<String>,
}

impl MaskedPrefs {
    pub fn new(prefs: Prefs) -> Self {
        Self {
            prefs,
            set: BTreeSet::new(),
        }
    }

    /// Mark a field (by wire name) as set.
    pub fn mark(&mut self, field: impl Into<String>) {
        self.set.insert(field.into());
    }

    pub fn is_set(&self, field: &str) -> bool {
        self.set.contains(field)
    }

    /// Encode as the flat JSON object the daemon expects:
    /// every `Prefs` key plus `"<Field>Set": true` for marked fields.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut value = serde_json::to_value(&self.prefs)?;
        if let serde_json::Value::Object(ref mut map) = value {
            for field in &self.set {
                map.insert(format!("{field}Set"), serde_json::Value::Bool(true));
            }
        }
        Ok(value)
    }
}

// ── Status ──────────────────────────────────────────────────────────

/// `ipnstate.Status` as returned by `GET /localapi/v0/status`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Status {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "BackendState")]
    pub backend_state: String,
    #[serde(rename = "AuthURL")]
    pub auth_url: String,
    #[serde(rename = "TailscaleIPs")]
    pub tailscale_ips: Option<Vec<String>>,
    #[serde(rename = "Self")]
    pub self_status: Option<PeerStatus>,
    #[serde(rename = "Health")]
    pub health: Option<Vec<String>>,
    #[serde(rename = "CurrentTailnet")]
    pub current_tailnet: Option<CurrentTailnet>,
    /// Keyed by the decimal user ID.
    #[serde(rename = "User")]
    pub user: Option<HashMap<String, UserProfile>>,
}

/// The fields of `ipnstate.PeerStatus` edged reads for the self node.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PeerStatus {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "HostName")]
    pub host_name: String,
    #[serde(rename = "DNSName")]
    pub dns_name: String,
    #[serde(rename = "OS")]
    pub os: String,
    #[serde(rename = "UserID")]
    pub user_id: i64,
    #[serde(rename = "Online")]
    pub online: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CurrentTailnet {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "MagicDNSSuffix")]
    pub magic_dns_suffix: String,
    #[serde(rename = "MagicDNSEnabled")]
    pub magic_dns_enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UserProfile {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "LoginName")]
    pub login_name: String,
    #[serde(rename = "DisplayName")]
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_prefs_json_carries_set_markers_for_marked_fields_only() {
        let mut mask = MaskedPrefs::new(Prefs {
            route_all: true,
            hostname: "edge-01".into(),
            ..Prefs::default()
        });
        mask.mark("RouteAll");

        let json = mask.to_json().expect("serializable");
        assert_eq!(json["RouteAll"], serde_json::Value::Bool(true));
        assert_eq!(json["RouteAllSet"], serde_json::Value::Bool(true));
        assert_eq!(json["Hostname"], "edge-01");
        assert!(json.get("HostnameSet").is_none());
    }

    #[test]
    fn prefs_tolerate_null_collections_and_unknown_keys() {
        let raw = r#"{
            "ControlURL": "https://controlplane.tailscale.com",
            "AdvertiseTags": null,
            "AdvertiseRoutes": null,
            "NetfilterMode": 2,
            "Persist": {"LoginName": "someone@example.com"}
        }"#;
        let prefs: Prefs = serde_json::from_str(raw).expect("valid prefs");
        assert_eq!(prefs.advertise_tags, None);
        assert_eq!(prefs.netfilter_mode, 2);
        assert!(!prefs.route_all);
    }
}
