// ── Daemon and desired-state seams ──
//
// The reconciler and agent only talk to the daemon through
// `PreferenceStore` and only learn the target through `DesiredSource`.
// Production wiring uses `edged_api::LocalClient` and the YAML document
// from `edged-config`; tests substitute in-memory fakes.

use std::future::Future;

use edged_api::{LocalClient, MaskedPrefs};

use crate::error::CoreError;
use crate::mask::PreferenceMask;
use crate::model::{Preferences, StatusSnapshot};

/// Read/write access to the daemon's persisted preferences and status.
pub trait PreferenceStore: Send + Sync {
    /// Fetch the preferences the daemon currently holds.
    fn get_preferences(&self) -> impl Future<Output = Result<Preferences, CoreError>> + Send;

    /// Write the marked fields of `mask`. Returns the daemon's view of the
    /// preferences after the edit.
    fn apply_masked(
        &self,
        mask: &PreferenceMask,
    ) -> impl Future<Output = Result<Preferences, CoreError>> + Send;

    fn status(&self) -> impl Future<Output = Result<StatusSnapshot, CoreError>> + Send;

    fn logout(&self) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Where the desired preferences come from.
pub trait DesiredSource: Send + Sync {
    /// Load the full desired record. Called on startup and on every
    /// change or reload trigger; the result replaces the previous target.
    fn load(&self) -> Result<Preferences, CoreError>;

    /// Human-readable origin for logs (a path, "inline", ...).
    fn describe(&self) -> String {
        String::from("desired preferences")
    }
}

// ── Local API implementation ─────────────────────────────────────────

impl PreferenceStore for LocalClient {
    async fn get_preferences(&self) -> Result<Preferences, CoreError> {
        Ok(self.get_prefs().await?.into())
    }

    async fn apply_masked(&self, mask: &PreferenceMask) -> Result<Preferences, CoreError> {
        let masked = MaskedPrefs::from(mask);
        Ok(self.edit_prefs(&masked).await?.into())
    }

    async fn status(&self) -> Result<StatusSnapshot, CoreError> {
        Ok(LocalClient::status(self).await?.into())
    }

    async fn logout(&self) -> Result<(), CoreError> {
        Ok(LocalClient::logout(self).await?)
    }
}

/// A fixed desired record, for one-shot commands and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource(pub Preferences);

impl DesiredSource for StaticSource {
    fn load(&self) -> Result<Preferences, CoreError> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        String::from("inline")
    }
}
