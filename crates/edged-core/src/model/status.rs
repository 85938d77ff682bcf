// ── Daemon status domain types ──

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Lifecycle state the daemon reports for its backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BackendState {
    #[default]
    NoState,
    NeedsLogin,
    NeedsMachineAuth,
    Stopped,
    Starting,
    Running,
    /// A state name this version of edged doesn't know.
    Other(String),
}

impl BackendState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::NoState => "NoState",
            Self::NeedsLogin => "NeedsLogin",
            Self::NeedsMachineAuth => "NeedsMachineAuth",
            Self::Stopped => "Stopped",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for BackendState {
    fn from(s: &str) -> Self {
        match s {
            "" | "NoState" => Self::NoState,
            "NeedsLogin" => Self::NeedsLogin,
            "NeedsMachineAuth" => Self::NeedsMachineAuth,
            "Stopped" => Self::Stopped,
            "Starting" => Self::Starting,
            "Running" => Self::Running,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for BackendState {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<BackendState> for String {
    fn from(state: BackendState) -> Self {
        match state {
            BackendState::Other(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The local node as seen in a status report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelfNode {
    pub host_name: String,
    pub dns_name: String,
    pub online: bool,
    pub user_id: i64,
}

/// Point-in-time view of the daemon's status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub version: String,
    pub backend_state: BackendState,
    /// Interactive login URL, present while the daemon waits for a login.
    pub auth_url: Option<String>,
    pub health: Vec<String>,
    pub self_node: Option<SelfNode>,
    pub tailnet: Option<String>,
    pub addresses: Vec<IpAddr>,
    /// User ID → login name.
    pub users: BTreeMap<i64, String>,
}

impl StatusSnapshot {
    /// The self node is online and the daemon reports no health problems.
    pub fn is_healthy(&self) -> bool {
        self.self_node.as_ref().is_some_and(|n| n.online) && self.health.is_empty()
    }

    /// Login name of the user owning the self node, if known.
    pub fn login_name(&self) -> Option<&str> {
        let node = self.self_node.as_ref()?;
        self.users.get(&node.user_id).map(String::as_str)
    }

    /// First assigned address, preferring IPv4.
    pub fn primary_address(&self) -> Option<IpAddr> {
        self.addresses
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| self.addresses.first())
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_state_parses_known_and_unknown_names() {
        assert_eq!(BackendState::from("NeedsLogin"), BackendState::NeedsLogin);
        assert_eq!(BackendState::from(""), BackendState::NoState);
        assert_eq!(
            BackendState::from("InUseOtherUser"),
            BackendState::Other("InUseOtherUser".into())
        );
        assert_eq!(BackendState::Other("Weird".into()).to_string(), "Weird");
        assert_eq!(String::from(BackendState::Running), "Running");
    }

    #[test]
    fn health_and_login_helpers() {
        let mut snapshot = StatusSnapshot {
            backend_state: BackendState::Running,
            self_node: Some(SelfNode {
                host_name: "edge-01".into(),
                online: true,
                user_id: 42,
                ..SelfNode::default()
            }),
            users: BTreeMap::from([(42, "ops@example.com".to_owned())]),
            addresses: vec![
                "fd7a:115c:a1e0::7".parse().expect("ipv6"),
                "100.64.0.7".parse().expect("ipv4"),
            ],
            ..StatusSnapshot::default()
        };

        assert!(snapshot.is_healthy());
        assert_eq!(snapshot.login_name(), Some("ops@example.com"));
        assert_eq!(
            snapshot.primary_address(),
            Some("100.64.0.7".parse().expect("ipv4"))
        );

        snapshot.health.push("no DERP home".into());
        assert!(!snapshot.is_healthy());

        snapshot.self_node = None;
        assert_eq!(snapshot.login_name(), None);
    }
}
