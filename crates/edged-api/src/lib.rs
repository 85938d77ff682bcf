// edged-api: Async Rust client for the tailscaled local API

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::LocalClient;
pub use error::Error;
pub use transport::TransportConfig;
pub use types::{CurrentTailnet, MaskedPrefs, PeerStatus, Prefs, Status, UserProfile};
