// ── Domain model ──
//
// Canonical types the reconciler, mode machine and CLI work with.
// Wire-level shapes live in `edged_api`; `crate::convert` maps between them.

mod prefs;
mod status;

pub use prefs::{DEFAULT_CONTROL_URL, NetfilterMode, PrefField, PrefValue, Preferences};
pub use status::{BackendState, SelfNode, StatusSnapshot};
