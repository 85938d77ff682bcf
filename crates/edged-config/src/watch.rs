// Polling watcher for the desired-preferences document.
//
// Compares the file's modification time and length on every poll and
// emits `Trigger::DesiredChanged` when either changes, including the file
// appearing or disappearing.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use edged_core::Trigger;

pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

fn fingerprint(path: &Path) -> Option<Fingerprint> {
    let meta = std::fs::metadata(path).ok()?;
    Some(Fingerprint {
        modified: meta.modified().ok(),
        len: meta.len(),
    })
}

/// Watches one document path.
#[derive(Debug)]
pub struct DocumentWatcher {
    path: PathBuf,
    interval: Duration,
    last: Option<Fingerprint>,
}

impl DocumentWatcher {
    /// Start watching `path`; its current state is the baseline.
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        let path = path.into();
        let last = fingerprint(&path);
        Self {
            path,
            interval,
            last,
        }
    }

    /// Check the file once. Returns `true` if it changed since the last check.
    pub fn poll_changed(&mut self) -> bool {
        let current = fingerprint(&self.path);
        if current == self.last {
            return false;
        }
        self.last = current;
        true
    }

    /// Poll until cancelled or the trigger receiver goes away.
    pub async fn run(mut self, triggers: mpsc::Sender<Trigger>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.tick().await; // consume the immediate first tick
        debug!(path = %self.path.display(), "watching desired preferences");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if self.poll_changed() {
                        info!(path = %self.path.display(), "desired preferences changed");
                        if triggers.send(Trigger::DesiredChanged).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_create_modify_and_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.yaml");
        let mut watcher = DocumentWatcher::new(&path, DEFAULT_WATCH_INTERVAL);

        assert!(!watcher.poll_changed());

        std::fs::write(&path, "route_all: true\n").expect("write");
        assert!(watcher.poll_changed());
        assert!(!watcher.poll_changed());

        std::fs::write(&path, "route_all: true\nhostname: edge-01\n").expect("write");
        assert!(watcher.poll_changed());

        std::fs::remove_file(&path).expect("remove");
        assert!(watcher.poll_changed());
        assert!(!watcher.poll_changed());
    }
}
