// Shared transport configuration for building the reqwest::Client.
//
// On Linux tailscaled serves the local API on a unix socket; elsewhere (or
// behind a socket proxy) it is reached over TCP. Either way every request
// carries the `local-tailscaled.sock` Host header.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Default local API endpoint.
pub const DEFAULT_LOCAL_API_URL: &str = "http://127.0.0.1:41112";

/// Default tailscaled socket on Linux.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/tailscale/tailscaled.sock";

/// Host header tailscaled expects on local API requests.
pub(crate) const LOCAL_API_HOST: &str = "local-tailscaled.sock";

/// Transport configuration for the local API client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL of the local API endpoint. With a socket set only its path
    /// is used.
    pub base_url: Url,
    /// Unix socket to connect through instead of TCP.
    pub socket: Option<PathBuf>,
    /// Local API token, sent as the basic-auth password when present.
    pub token: Option<SecretString>,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_LOCAL_API_URL).expect("default local API URL is valid"),
            socket: None,
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            ..Self::default()
        }
    }

    pub fn with_socket(mut self, socket: impl Into<PathBuf>) -> Self {
        self.socket = Some(socket.into());
        self
    }

    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::HOST,
            reqwest::header::HeaderValue::from_static(LOCAL_API_HOST),
        );

        let builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("edged/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers);

        #[cfg(unix)]
        let builder = match &self.socket {
            Some(path) => builder.unix_socket(path.clone()),
            None => builder,
        };
        #[cfg(not(unix))]
        if let Some(path) = &self.socket {
            return Err(crate::error::Error::ClientBuild(format!(
                "unix sockets are not supported on this platform: {}",
                path.display()
            )));
        }

        builder
            .build()
            .map_err(|e| crate::error::Error::ClientBuild(e.to_string()))
    }
}
