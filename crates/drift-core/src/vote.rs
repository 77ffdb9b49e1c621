use crate::fingerprint::Fingerprint;
use crate::push::Diff;
use serde::{Deserialize, Serialize};

/// Non-abstaining judgment on a diff.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Decision {
    For,
    Against,
}

/// Human-readable explanation attached to a vote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteSummary {
    pub title: String,
    pub description: String,
}

/// One handler's verdict on one diff.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Vote {
    pub abstain: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
    #[serde(
        rename = "fpTarget",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub fp_target: Option<Fingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<Diff>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<VoteSummary>,
}

impl Vote {
    pub fn abstain() -> Self {
        Self {
            abstain: true,
            ..Default::default()
        }
    }

    pub fn in_favor(diff: &Diff) -> Self {
        Self {
            abstain: false,
            decision: Some(Decision::For),
            name: Some(diff.to.name.clone()),
            fingerprint: Some(diff.to.clone()),
            fp_target: diff.target.clone(),
            diff: Some(diff.clone()),
            summary: None,
        }
    }

    pub fn against(diff: &Diff, summary: VoteSummary) -> Self {
        Self {
            abstain: false,
            decision: Some(Decision::Against),
            name: Some(diff.to.name.clone()),
            fingerprint: Some(diff.to.clone()),
            fp_target: diff.target.clone(),
            diff: Some(diff.clone()),
            summary: Some(summary),
        }
    }

    /// A non-abstaining vote whose decision is anything but `For`.
    pub fn is_failing(&self) -> bool {
        !self.abstain && self.decision != Some(Decision::For)
    }

    pub fn is_passing(&self) -> bool {
        !self.abstain && self.decision == Some(Decision::For)
    }

    /// Name reported for this vote: the target's name, then the
    /// fingerprint's, then the vote's own.
    pub fn fingerprint_name(&self) -> Option<&str> {
        self.fp_target
            .as_ref()
            .map(|f| f.name.as_str())
            .or(self.fingerprint.as_ref().map(|f| f.name.as_str()))
            .or(self.name.as_deref())
    }
}

/// Reduction of every vote cast for one push.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VoteResults {
    pub failed: bool,
    #[serde(rename = "failedFps")]
    pub failed_fps: Vec<String>,
    #[serde(rename = "successFps")]
    pub success_fps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<Diff>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::PushContext;
    use serde_json::json;

    fn diff() -> Diff {
        let target = Fingerprint::new("t", "n", json!(1));
        let to = Fingerprint::new("t", "n", json!(2));
        Diff::new(Some(target.clone()), to, Some(target), &PushContext::default())
    }

    #[test]
    fn abstain_is_neither_passing_nor_failing() {
        let v = Vote::abstain();
        assert!(!v.is_failing());
        assert!(!v.is_passing());
    }

    #[test]
    fn non_abstaining_without_decision_fails() {
        let v = Vote {
            abstain: false,
            ..Default::default()
        };
        assert!(v.is_failing());
    }

    #[test]
    fn against_carries_summary_and_target() {
        let d = diff();
        let v = Vote::against(
            &d,
            VoteSummary {
                title: "t".into(),
                description: "d".into(),
            },
        );
        assert!(v.is_failing());
        assert_eq!(v.fp_target.as_ref().unwrap().sha, d.target.as_ref().unwrap().sha);
        assert_eq!(v.fingerprint_name(), Some("n"));
    }

    #[test]
    fn vote_serializes_decision_as_word() {
        let v = Vote::in_favor(&diff());
        let j = serde_json::to_value(&v).unwrap();
        assert_eq!(j["decision"], "For");
        assert_eq!(j["abstain"], false);
    }
}
