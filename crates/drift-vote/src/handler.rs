use drift_aspect::Aspect;
use drift_core::{Diff, Fingerprint, Vote};

/// Casts votes on one group of same-typed fingerprints.
///
/// A handler runs for a group when `selects` accepts the group's first
/// fingerprint. Both `diff_handler` and `handler` are invoked; override
/// whichever fits. `aspect` is the aspect owning the group, when known.
pub trait FingerprintHandler: Send + Sync {
    fn name(&self) -> &str;

    fn selects(&self, fp: &Fingerprint) -> bool;

    fn diff_handler(
        &self,
        _aspect: Option<&dyn Aspect>,
        _diffs: &[Diff],
    ) -> anyhow::Result<Vec<Vote>> {
        Ok(Vec::new())
    }

    fn handler(
        &self,
        _aspect: Option<&dyn Aspect>,
        _fingerprints: &[Fingerprint],
    ) -> anyhow::Result<Vec<Vote>> {
        Ok(Vec::new())
    }
}
