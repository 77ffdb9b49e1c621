use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};

/// Metadata of the push being evaluated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PushContext {
    pub owner: String,
    pub repo: String,
    /// Commit sha of the pushed head.
    pub sha: String,
    pub branch: String,
    /// Commit sha before the push, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl PushContext {
    pub fn new(owner: &str, repo: &str, sha: &str, branch: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            sha: sha.to_string(),
            branch: branch.to_string(),
            ..Default::default()
        }
    }

    /// `owner/repo`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Previous, current and target fingerprint for one key within one push.
///
/// `from` is absent the first time a fingerprint is observed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diff {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Fingerprint>,
    pub to: Fingerprint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Fingerprint>,
    pub owner: String,
    pub repo: String,
    pub sha: String,
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl Diff {
    pub fn new(
        from: Option<Fingerprint>,
        to: Fingerprint,
        target: Option<Fingerprint>,
        push: &PushContext,
    ) -> Self {
        Self {
            from,
            to,
            target,
            owner: push.owner.clone(),
            repo: push.repo.clone(),
            sha: push.sha.clone(),
            branch: push.branch.clone(),
            provider_id: push.provider_id.clone(),
            channel: push.channel.clone(),
        }
    }

    pub fn is_first_sighting(&self) -> bool {
        self.from.is_none()
    }

    /// True when `to` differs from the previous commit's fingerprint.
    pub fn changed(&self) -> bool {
        self.from.as_ref().is_some_and(|f| self.to.is_changed_from(f))
    }

    /// True when a target exists and `to` does not match it.
    pub fn off_target(&self) -> bool {
        self.target.as_ref().is_some_and(|t| t.sha != self.to.sha)
    }
}
