// In-memory daemon double shared by the integration tests.
#![allow(clippy::unwrap_used, dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::Semaphore;

use edged_core::{
    CommandRunner, CoreError, OutputSink, OutputStream, PrefField, PreferenceMask,
    PreferenceStore, Preferences, StatusSnapshot,
};

#[derive(Default)]
pub struct FakeState {
    pub prefs: Preferences,
    /// Status reports served in order; the last one repeats.
    pub statuses: VecDeque<StatusSnapshot>,
    pub last_status: StatusSnapshot,
    /// Fields of every apply call, in order.
    pub applies: Vec<Vec<PrefField>>,
    pub get_calls: usize,
    pub logouts: usize,
    /// Mutation the daemon performs after accepting an edit (drops a field,
    /// rewrites a value, ...).
    pub after_apply: Option<fn(&mut Preferences)>,
    /// Answer the apply call with the requested payload instead of the
    /// state actually stored.
    pub echo_request: bool,
    /// Delay every `get_preferences` call.
    pub get_delay: Option<Duration>,
    pub unreachable: bool,
}

#[derive(Clone, Default)]
pub struct FakeStore {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeStore {
    pub fn with_prefs(prefs: Preferences) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().prefs = prefs;
        store
    }

    pub fn prefs(&self) -> Preferences {
        self.state.lock().unwrap().prefs.clone()
    }

    pub fn applies(&self) -> Vec<Vec<PrefField>> {
        self.state.lock().unwrap().applies.clone()
    }

    pub fn push_status(&self, status: StatusSnapshot) {
        self.state.lock().unwrap().statuses.push_back(status);
    }

    pub fn after_apply(&self, mutate: fn(&mut Preferences)) {
        self.state.lock().unwrap().after_apply = Some(mutate);
    }

    pub fn logouts(&self) -> usize {
        self.state.lock().unwrap().logouts
    }

    fn check_reachable(&self) -> Result<(), CoreError> {
        if self.state.lock().unwrap().unreachable {
            return Err(CoreError::DaemonUnavailable {
                reason: "connection refused".into(),
            });
        }
        Ok(())
    }
}

impl PreferenceStore for FakeStore {
    async fn get_preferences(&self) -> Result<Preferences, CoreError> {
        self.check_reachable()?;
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.get_calls += 1;
            state.get_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.prefs())
    }

    async fn apply_masked(&self, mask: &PreferenceMask) -> Result<Preferences, CoreError> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        state.applies.push(mask.fields().collect());
        mask.apply_to(&mut state.prefs);
        if let Some(mutate) = state.after_apply {
            mutate(&mut state.prefs);
        }
        if state.echo_request {
            let mut requested = state.prefs.clone();
            mask.apply_to(&mut requested);
            return Ok(requested);
        }
        Ok(state.prefs.clone())
    }

    async fn status(&self) -> Result<StatusSnapshot, CoreError> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        if let Some(next) = state.statuses.pop_front() {
            state.last_status = next;
        }
        Ok(state.last_status.clone())
    }

    async fn logout(&self) -> Result<(), CoreError> {
        self.check_reachable()?;
        self.state.lock().unwrap().logouts += 1;
        Ok(())
    }
}

// ── Command doubles ─────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    chunks: Mutex<Vec<(OutputStream, Vec<u8>)>>,
}

impl RecordingSink {
    pub fn text(&self, stream: OutputStream) -> String {
        let chunks = self.chunks.lock().unwrap();
        chunks
            .iter()
            .filter(|(s, _)| *s == stream)
            .map(|(_, data)| String::from_utf8_lossy(data).into_owned())
            .collect()
    }
}

impl OutputSink for RecordingSink {
    fn write(&self, stream: OutputStream, data: &[u8]) {
        self.chunks.lock().unwrap().push((stream, data.to_vec()));
    }
}

/// Blocks every launch until a permit is released.
pub struct GatedRunner {
    gate: Arc<Semaphore>,
    launches: Arc<Mutex<Vec<Vec<String>>>>,
}

impl GatedRunner {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            launches: Arc::default(),
        }
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn launches(&self) -> Vec<Vec<String>> {
        self.launches.lock().unwrap().clone()
    }
}

impl CommandRunner for GatedRunner {
    fn run(
        &self,
        args: Vec<String>,
        _sink: Arc<dyn OutputSink>,
    ) -> BoxFuture<'static, Result<(), CoreError>> {
        self.launches.lock().unwrap().push(args);
        let gate = Arc::clone(&self.gate);
        Box::pin(async move {
            gate.acquire().await.unwrap().forget();
            Ok(())
        })
    }
}
