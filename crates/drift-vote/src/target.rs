use crate::handler::FingerprintHandler;
use drift_aspect::aspect::summarize;
use drift_aspect::Aspect;
use drift_core::{Diff, Fingerprint, Vote};

type Selector = dyn Fn(&Fingerprint) -> bool + Send + Sync;

/// Votes each diff against its team target.
///
/// First sightings (no previous fingerprint) always abstain. Otherwise the
/// vote is `For` when there is no target or the current sha matches it,
/// and `Against` with a summary when it does not.
pub struct TargetDiffHandler {
    selector: Box<Selector>,
}

impl TargetDiffHandler {
    /// Handler selecting every fingerprint type.
    pub fn new() -> Self {
        Self {
            selector: Box::new(|_| true),
        }
    }

    pub fn for_types(types: &[&str]) -> Self {
        let types: Vec<String> = types.iter().map(|t| t.to_string()).collect();
        Self {
            selector: Box::new(move |fp| types.iter().any(|t| t == fp.type_name())),
        }
    }

    pub fn vote(&self, aspect: Option<&dyn Aspect>, diff: &Diff) -> Vote {
        if diff.from.is_none() {
            return Vote::abstain();
        }
        if diff.off_target() {
            Vote::against(diff, summarize(aspect, diff))
        } else {
            Vote::in_favor(diff)
        }
    }
}

impl Default for TargetDiffHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintHandler for TargetDiffHandler {
    fn name(&self) -> &str {
        "target-diff"
    }

    fn selects(&self, fp: &Fingerprint) -> bool {
        (self.selector)(fp)
    }

    fn diff_handler(
        &self,
        aspect: Option<&dyn Aspect>,
        diffs: &[Diff],
    ) -> anyhow::Result<Vec<Vote>> {
        Ok(diffs.iter().map(|d| self.vote(aspect, d)).collect())
    }
}
