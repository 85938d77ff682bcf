// ── Preference diff ──
//
// Pure field-by-field comparison of two `Preferences` records. The
// result is the masked edit the daemon understands: a full payload plus
// the set of fields that should actually be written.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{PrefField, PrefValue, Preferences};

/// A preference edit: `current` with desired values substituted for
/// exactly the fields in `changed`.
///
/// A field is marked iff it appears in `changed`; every unmarked payload
/// field equals the record the mask was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferenceMask {
    payload: Preferences,
    changed: BTreeMap<PrefField, PrefValue>,
}

impl PreferenceMask {
    pub fn payload(&self) -> &Preferences {
        &self.payload
    }

    /// Marked fields with their new values, in field-list order.
    pub fn changes(&self) -> &BTreeMap<PrefField, PrefValue> {
        &self.changed
    }

    /// Marked fields, in field-list order.
    pub fn fields(&self) -> impl Iterator<Item = PrefField> + '_ {
        self.changed.keys().copied()
    }

    pub fn is_marked(&self, field: PrefField) -> bool {
        self.changed.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changed.len()
    }

    /// Write the marked fields onto `prefs`, leaving the rest untouched.
    /// This is what the daemon does with a masked edit.
    pub fn apply_to(&self, prefs: &mut Preferences) {
        for field in self.fields() {
            field.copy(prefs, &self.payload);
        }
    }
}

/// Diff `current` against `desired`.
///
/// Returns the mask and whether any field differs. Lists compare in order,
/// so a reordered tag list counts as a change.
pub fn compute_diff(current: &Preferences, desired: &Preferences) -> (PreferenceMask, bool) {
    let mut payload = current.clone();
    let mut changed = BTreeMap::new();

    for &field in PrefField::ALL {
        if field.differs(current, desired) {
            field.copy(&mut payload, desired);
            changed.insert(field, field.value(desired));
        }
    }

    let dirty = !changed.is_empty();
    (PreferenceMask { payload, changed }, dirty)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn observed() -> Preferences {
        Preferences {
            want_running: true,
            hostname: "old-name".into(),
            advertise_tags: vec!["tag:a".into(), "tag:b".into()],
            ..Preferences::default()
        }
    }

    #[test]
    fn identical_records_are_clean() {
        let (mask, dirty) = compute_diff(&observed(), &observed());
        assert!(!dirty);
        assert!(mask.is_empty());
        assert_eq!(mask.payload(), &observed());
    }

    #[test]
    fn applying_the_mask_converges() {
        let desired = Preferences {
            route_all: true,
            hostname: "edge-01".into(),
            ..observed()
        };
        let (mask, dirty) = compute_diff(&observed(), &desired);
        assert!(dirty);
        assert_eq!(mask.payload(), &desired);

        let (again, dirty) = compute_diff(mask.payload(), &desired);
        assert!(!dirty);
        assert!(again.is_empty());
    }

    #[test]
    fn only_differing_fields_are_marked() {
        let desired = Preferences {
            route_all: true,
            hostname: "edge-01".into(),
            ..observed()
        };
        let (mask, _) = compute_diff(&observed(), &desired);

        assert_eq!(
            mask.fields().collect::<Vec<_>>(),
            vec![PrefField::RouteAll, PrefField::Hostname]
        );
        for &field in PrefField::ALL {
            if !mask.is_marked(field) {
                assert_eq!(field.value(mask.payload()), field.value(&observed()));
            }
        }
    }

    #[test]
    fn route_all_change_leaves_corp_dns_alone() {
        // Only the keys the operator wrote; the rest take daemon defaults.
        let desired: Preferences = serde_json::from_value(serde_json::json!({
            "route_all": true,
            "hostname": "edge-01",
        }))
        .expect("valid document");
        let current = Preferences {
            route_all: false,
            hostname: "edge-01".into(),
            corp_dns: true,
            ..Preferences::default()
        };

        let (mask, dirty) = compute_diff(&current, &desired);
        assert!(dirty);
        assert_eq!(mask.fields().collect::<Vec<_>>(), vec![PrefField::RouteAll]);
        assert_eq!(
            mask.changes().get(&PrefField::RouteAll),
            Some(&PrefValue::Flag(true))
        );
        assert!(!mask.is_marked(PrefField::Hostname));
        assert!(!mask.is_marked(PrefField::CorpDns));
        assert!(mask.payload().corp_dns);
        assert_eq!(mask.payload().hostname, "edge-01");
    }

    #[test]
    fn list_comparison_is_order_sensitive() {
        let desired = Preferences {
            advertise_tags: vec!["tag:b".into(), "tag:a".into()],
            ..observed()
        };
        let (mask, dirty) = compute_diff(&observed(), &desired);
        assert!(dirty);
        assert_eq!(mask.fields().collect::<Vec<_>>(), vec![PrefField::AdvertiseTags]);
    }
}
