// Local API HTTP client
//
// Wraps `reqwest::Client` with local API URL construction, token auth and
// error-body decoding. One method per endpoint the agent consumes.

use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{MaskedPrefs, Prefs, Status};

const LOCAL_API_PREFIX: &str = "localapi/v0";

/// tailscaled reports errors as `{"error": "..."}` or as plain text.
#[derive(serde::Deserialize)]
struct LocalApiError {
    error: Option<String>,
}

/// HTTP client for tailscaled's local API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct LocalClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<secrecy::SecretString>,
}

impl std::fmt::Debug for LocalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl LocalClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: transport.base_url.clone(),
            token: transport.token.clone(),
        })
    }

    /// Create a client with a pre-built `reqwest::Client` (tests, custom TLS).
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            token: None,
        }
    }

    /// The local API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /localapi/v0/prefs`
    pub async fn get_prefs(&self) -> Result<Prefs, Error> {
        let url = self.api_url("prefs")?;
        debug!("GET {url}");
        let resp = self.authorize(self.http.get(url)).send().await?;
        Self::parse_json(resp).await
    }

    /// `PATCH /localapi/v0/prefs` with a masked prefs body.
    ///
    /// Returns the preferences the daemon reports after the edit.
    pub async fn edit_prefs(&self, mask: &MaskedPrefs) -> Result<Prefs, Error> {
        let url = self.api_url("prefs")?;
        let body = mask.to_json().map_err(|e| Error::Deserialization {
            message: format!("failed to encode masked prefs: {e}"),
            body: String::new(),
        })?;
        debug!(fields = ?mask.set, "PATCH {url}");
        let resp = self
            .authorize(self.http.patch(url).json(&body))
            .send()
            .await?;
        Self::parse_json(resp).await
    }

    /// `GET /localapi/v0/status`
    pub async fn status(&self) -> Result<Status, Error> {
        let url = self.api_url("status")?;
        trace!("GET {url}");
        let resp = self.authorize(self.http.get(url)).send().await?;
        Self::parse_json(resp).await
    }

    /// `POST /localapi/v0/logout`
    pub async fn logout(&self) -> Result<(), Error> {
        let url = self.api_url("logout")?;
        debug!("POST {url}");
        let resp = self.authorize(self.http.post(url)).send().await?;
        Self::check_status(resp).await.map(|_| ())
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn api_url(&self, endpoint: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{LOCAL_API_PREFIX}/{endpoint}"))?)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.basic_auth("", Some(token.expose_secret())),
            None => builder,
        }
    }

    /// Map non-success statuses to typed errors, passing successful
    /// responses through untouched.
    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::AccessDenied {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<LocalApiError>(&body)
            .ok()
            .and_then(|e| e.error)
            .unwrap_or_else(|| body.trim().chars().take(200).collect());

        Err(Error::LocalApi {
            status: status.as_u16(),
            message,
        })
    }

    async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let resp = Self::check_status(resp).await?;
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }
}
