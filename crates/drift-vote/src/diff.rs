use drift_core::{Diff, Fingerprint, PushContext};
use std::collections::HashMap;

/// Pair every fingerprint with its previous value and target, by `type::name`.
pub fn build_diffs(
    fingerprints: &[Fingerprint],
    previous: &HashMap<String, Fingerprint>,
    targets: &HashMap<String, Fingerprint>,
    push: &PushContext,
) -> Vec<Diff> {
    fingerprints
        .iter()
        .map(|fp| {
            let key = fp.key();
            Diff::new(
                previous.get(&key).cloned(),
                fp.clone(),
                targets.get(&key).cloned(),
                push,
            )
        })
        .collect()
}

/// Diffs sharing one fingerprint type.
#[derive(Debug, Clone)]
pub struct DiffGroup {
    pub fp_type: String,
    pub diffs: Vec<Diff>,
}

impl DiffGroup {
    /// Fingerprint handlers are selected against this one.
    pub fn representative(&self) -> Option<&Fingerprint> {
        self.diffs.first().map(|d| &d.to)
    }

    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        self.diffs.iter().map(|d| d.to.clone()).collect()
    }
}

/// Group diffs by fingerprint type, in order of first appearance.
pub fn group_by_type(diffs: Vec<Diff>) -> Vec<DiffGroup> {
    let mut groups: Vec<DiffGroup> = Vec::new();
    for diff in diffs {
        let fp_type = diff.to.type_name().to_string();
        match groups.iter_mut().find(|g| g.fp_type == fp_type) {
            Some(group) => group.diffs.push(diff),
            None => groups.push(DiffGroup {
                fp_type,
                diffs: vec![diff],
            }),
        }
    }
    groups
}
