// ── Preference reconciliation ──
//
// One attempt = fetch observed → diff against desired → (when dirty)
// apply the mask and verify twice. Attempts are driven externally; a
// failed attempt is never retried here.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::daemon::PreferenceStore;
use crate::error::CoreError;
use crate::mask::{PreferenceMask, compute_diff};
use crate::model::{PrefField, Preferences};

/// Result of a successful reconcile attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Observed already matched desired; nothing was written.
    InSync,
    /// The listed fields were written and verified.
    Applied { changed: Vec<PrefField> },
}

// ── Plan ─────────────────────────────────────────────────────────────

/// A diff between the daemon's preferences and the target, captured at
/// one point in time.
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    target: Preferences,
    observed: Preferences,
    mask: PreferenceMask,
    dirty: bool,
}

impl ReconcilePlan {
    pub fn new(observed: Preferences, target: Preferences) -> Self {
        let (mask, dirty) = compute_diff(&observed, &target);
        Self {
            target,
            observed,
            mask,
            dirty,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mask(&self) -> &PreferenceMask {
        &self.mask
    }

    pub fn observed(&self) -> &Preferences {
        &self.observed
    }

    pub fn target(&self) -> &Preferences {
        &self.target
    }

    /// The corrective action, if the plan is dirty.
    pub fn action(&self) -> Option<ReconcileAction<'_>> {
        self.dirty.then_some(ReconcileAction { plan: self })
    }
}

/// Apply-and-verify step for a dirty plan. Consumed by `execute`.
#[derive(Debug)]
pub struct ReconcileAction<'a> {
    plan: &'a ReconcilePlan,
}

impl ReconcileAction<'_> {
    /// Apply the mask, re-read the daemon and check both that the edit
    /// persisted and that the persisted state matches the target.
    ///
    /// Returns the freshly fetched preferences on success.
    pub async fn execute<S: PreferenceStore>(self, store: &S) -> Result<Preferences, CoreError> {
        let mask = &self.plan.mask;
        let returned = store.apply_masked(mask).await?;
        let fetched = store.get_preferences().await?;

        let (persisted, dirty) = compute_diff(&returned, &fetched);
        if dirty {
            return Err(CoreError::PersistenceMismatch {
                fields: persisted.fields().collect(),
            });
        }

        let (remaining, dirty) = compute_diff(&fetched, &self.plan.target);
        if dirty {
            return Err(CoreError::ConvergenceMismatch {
                fields: remaining.fields().collect(),
            });
        }

        Ok(fetched)
    }
}

// ── Reconciler ───────────────────────────────────────────────────────

/// Holds the store, the desired target and the last observed state.
pub struct Reconciler<S> {
    store: S,
    desired: Preferences,
    current: Option<Preferences>,
    last_converged: Option<DateTime<Utc>>,
}

impl<S: PreferenceStore> Reconciler<S> {
    pub fn new(store: S, desired: Preferences) -> Self {
        Self {
            store,
            desired,
            current: None,
            last_converged: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn desired(&self) -> &Preferences {
        &self.desired
    }

    /// Replace the target wholesale.
    pub fn set_desired(&mut self, desired: Preferences) {
        self.desired = desired;
    }

    /// Last preferences read from the daemon, if any attempt got that far.
    pub fn current(&self) -> Option<&Preferences> {
        self.current.as_ref()
    }

    /// When an attempt last ended with the daemon matching the target.
    pub fn last_converged(&self) -> Option<DateTime<Utc>> {
        self.last_converged
    }

    /// Fetch the daemon's preferences and diff them against the target
    /// without writing anything.
    pub async fn plan(&mut self) -> Result<ReconcilePlan, CoreError> {
        let observed = self.store.get_preferences().await?;
        self.current = Some(observed.clone());
        Ok(ReconcilePlan::new(observed, self.desired.clone()))
    }

    /// Run one reconcile attempt.
    pub async fn reconcile(&mut self) -> Result<ReconcileOutcome, CoreError> {
        let plan = self.plan().await?;
        let Some(action) = plan.action() else {
            debug!("preferences in sync");
            self.last_converged = Some(Utc::now());
            return Ok(ReconcileOutcome::InSync);
        };

        let changed: Vec<PrefField> = plan.mask().fields().collect();
        info!(fields = ?changed, "applying preference changes");

        match action.execute(&self.store).await {
            Ok(fetched) => {
                self.current = Some(fetched);
                self.last_converged = Some(Utc::now());
                info!(count = changed.len(), "preferences converged");
                Ok(ReconcileOutcome::Applied { changed })
            }
            Err(e) => {
                warn!(error = %e, "preference apply failed verification");
                Err(e)
            }
        }
    }

    /// Run one attempt bounded by `deadline`.
    ///
    /// On elapse the in-flight daemon call is dropped and `Timeout` is
    /// returned; whatever the daemon already accepted stays applied.
    pub async fn reconcile_within(
        &mut self,
        deadline: Duration,
    ) -> Result<ReconcileOutcome, CoreError> {
        tokio::time::timeout(deadline, self.reconcile())
            .await
            .map_err(|_| CoreError::Timeout { after: deadline })?
    }
}
