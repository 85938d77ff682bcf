// ── Preference domain types ──

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize, Serializer};
use strum::{Display, IntoStaticStr};

/// Control server the daemon talks to unless told otherwise.
pub const DEFAULT_CONTROL_URL: &str = "https://controlplane.tailscale.com";

/// How the daemon manages netfilter rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NetfilterMode {
    Off,
    NoDivert,
    #[default]
    On,
}

impl NetfilterMode {
    /// Numeric encoding used on the local API.
    pub fn as_wire(self) -> i32 {
        match self {
            Self::Off => 0,
            Self::NoDivert => 1,
            Self::On => 2,
        }
    }

    /// Decode the local API value. Unknown values are treated as `On`,
    /// the daemon's own default.
    pub fn from_wire(value: i32) -> Self {
        match value {
            0 => Self::Off,
            1 => Self::NoDivert,
            _ => Self::On,
        }
    }
}

/// The daemon preferences edged manages.
///
/// Used both for the operator's desired target (deserialized from the
/// document, missing keys take the daemon defaults) and for the state
/// observed on the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Preferences {
    pub control_url: String,
    pub route_all: bool,
    pub allow_single_hosts: bool,
    pub exit_node_id: String,
    pub exit_node_ip: Option<IpAddr>,
    pub exit_node_allow_lan_access: bool,
    pub corp_dns: bool,
    pub run_ssh: bool,
    pub want_running: bool,
    pub logged_out: bool,
    pub shields_up: bool,
    pub advertise_tags: Vec<String>,
    pub hostname: String,
    pub notepad_urls: bool,
    pub force_daemon: bool,
    pub advertise_routes: Vec<String>,
    pub no_snat: bool,
    pub netfilter_mode: NetfilterMode,
    pub operator_user: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            control_url: DEFAULT_CONTROL_URL.to_owned(),
            route_all: false,
            allow_single_hosts: true,
            exit_node_id: String::new(),
            exit_node_ip: None,
            exit_node_allow_lan_access: false,
            corp_dns: true,
            run_ssh: false,
            want_running: false,
            logged_out: false,
            shields_up: false,
            advertise_tags: Vec::new(),
            hostname: String::new(),
            notepad_urls: false,
            force_daemon: false,
            advertise_routes: Vec::new(),
            no_snat: false,
            netfilter_mode: NetfilterMode::On,
            operator_user: String::new(),
        }
    }
}

// ── Field values ─────────────────────────────────────────────────────

/// The value of a single preference field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PrefValue {
    Flag(bool),
    Text(String),
    Addr(Option<IpAddr>),
    List(Vec<String>),
    Netfilter(NetfilterMode),
}

impl From<&bool> for PrefValue {
    fn from(v: &bool) -> Self {
        Self::Flag(*v)
    }
}

impl From<&String> for PrefValue {
    fn from(v: &String) -> Self {
        Self::Text(v.clone())
    }
}

impl From<&Option<IpAddr>> for PrefValue {
    fn from(v: &Option<IpAddr>) -> Self {
        Self::Addr(*v)
    }
}

impl From<&Vec<String>> for PrefValue {
    fn from(v: &Vec<String>) -> Self {
        Self::List(v.clone())
    }
}

impl From<&NetfilterMode> for PrefValue {
    fn from(v: &NetfilterMode) -> Self {
        Self::Netfilter(*v)
    }
}

impl fmt::Display for PrefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(v) => write!(f, "{v}"),
            Self::Text(v) if v.is_empty() => f.write_str("\"\""),
            Self::Text(v) => f.write_str(v),
            Self::Addr(Some(ip)) => write!(f, "{ip}"),
            Self::Addr(None) => f.write_str("<none>"),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
            Self::Netfilter(mode) => write!(f, "{mode}"),
        }
    }
}

// ── Field list ───────────────────────────────────────────────────────

/// Declares [`PrefField`] and its per-field accessors from one table:
/// variant, `Preferences` field, local API name.
macro_rules! pref_fields {
    ($( $variant:ident => $field:ident, $wire:literal; )+) => {
        /// Identifier of one managed preference field.
        ///
        /// `Display` yields the local API name (`RouteAll`, `ExitNodeIP`, ...).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, IntoStaticStr)]
        pub enum PrefField {
            $(
                #[strum(to_string = $wire)]
                $variant,
            )+
        }

        impl PrefField {
            /// Every managed field, in declaration order.
            pub const ALL: &'static [PrefField] = &[$(PrefField::$variant,)+];

            /// Key used for this field in the desired-preferences document.
            pub fn document_key(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($field),)+
                }
            }

            /// Read this field's value from `prefs`.
            pub fn value(self, prefs: &Preferences) -> PrefValue {
                match self {
                    $(Self::$variant => PrefValue::from(&prefs.$field),)+
                }
            }

            /// Overwrite this field in `dst` with the value from `src`.
            pub(crate) fn copy(self, dst: &mut Preferences, src: &Preferences) {
                match self {
                    $(Self::$variant => dst.$field.clone_from(&src.$field),)+
                }
            }
        }
    };
}

pref_fields! {
    ControlUrl => control_url, "ControlURL";
    RouteAll => route_all, "RouteAll";
    AllowSingleHosts => allow_single_hosts, "AllowSingleHosts";
    ExitNodeId => exit_node_id, "ExitNodeID";
    ExitNodeIp => exit_node_ip, "ExitNodeIP";
    ExitNodeAllowLanAccess => exit_node_allow_lan_access, "ExitNodeAllowLANAccess";
    CorpDns => corp_dns, "CorpDNS";
    RunSsh => run_ssh, "RunSSH";
    WantRunning => want_running, "WantRunning";
    LoggedOut => logged_out, "LoggedOut";
    ShieldsUp => shields_up, "ShieldsUp";
    AdvertiseTags => advertise_tags, "AdvertiseTags";
    Hostname => hostname, "Hostname";
    NotepadUrls => notepad_urls, "NotepadURLs";
    ForceDaemon => force_daemon, "ForceDaemon";
    AdvertiseRoutes => advertise_routes, "AdvertiseRoutes";
    NoSnat => no_snat, "NoSNAT";
    NetfilterMode => netfilter_mode, "NetfilterMode";
    OperatorUser => operator_user, "OperatorUser";
}

impl PrefField {
    /// Local API name of the field.
    pub fn wire_name(self) -> &'static str {
        self.into()
    }

    /// Whether `a` and `b` disagree on this field. Lists compare in order.
    pub fn differs(self, a: &Preferences, b: &Preferences) -> bool {
        self.value(a) != self.value(b)
    }
}

impl Serialize for PrefField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_name())
    }
}
