use crate::paths::DriftPaths;
use crate::{lock_file, write_json};
use drift_core::{fingerprint_key, Fingerprint, PushContext};
use drift_vote::FingerprintStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// One commit's published fingerprint set, as stored in
/// `.drift/fingerprints/<sha>.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishedSet {
    pub sha: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_sha: Option<String>,
    pub published_at: String,
    pub aspects: Vec<String>,
    pub fingerprints: Vec<Fingerprint>,
    /// Keys whose sha differs from the previous commit's.
    #[serde(default)]
    pub changed: Vec<String>,
}

/// File-backed store under `.drift/`. Writes take the workspace lock.
#[derive(Debug, Clone)]
pub struct FileStore {
    paths: DriftPaths,
}

impl FileStore {
    pub fn new(paths: DriftPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &DriftPaths {
        &self.paths
    }

    /// The published set for `commit_sha`, if any.
    pub fn load_published(&self, commit_sha: &str) -> anyhow::Result<Option<PublishedSet>> {
        let path = self.paths.fingerprints_file(commit_sha);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let set = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("corrupt fingerprint set {}: {}", path.display(), e))?;
        Ok(Some(set))
    }

    /// Targets keyed by `type::name`, ordered by key.
    pub fn list_targets(&self) -> anyhow::Result<BTreeMap<String, Fingerprint>> {
        let path = &self.paths.targets_json;
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("corrupt targets file {}: {}", path.display(), e))
    }

    /// Make `fp` the team target for its key, replacing any previous one.
    pub fn set_target(&self, fp: &Fingerprint) -> anyhow::Result<()> {
        let _lock = lock_file(&self.paths.lock_file)?;
        let mut targets = self.list_targets()?;
        targets.insert(fp.key(), fp.clone());
        write_json(&self.paths.targets_json, &targets)?;
        debug!(key = %fp.key(), sha = %fp.sha, "target set");
        Ok(())
    }

    /// Remove the target for `type::name`. Returns whether one existed.
    pub fn delete_target(&self, fp_type: &str, name: &str) -> anyhow::Result<bool> {
        let _lock = lock_file(&self.paths.lock_file)?;
        let mut targets = self.list_targets()?;
        let removed = targets.remove(&fingerprint_key(fp_type, name)).is_some();
        if removed {
            write_json(&self.paths.targets_json, &targets)?;
        }
        Ok(removed)
    }
}

impl FingerprintStore for FileStore {
    fn previous_fingerprints(
        &self,
        commit_sha: &str,
    ) -> anyhow::Result<HashMap<String, Fingerprint>> {
        let mut map = HashMap::new();
        if let Some(set) = self.load_published(commit_sha)? {
            for fp in set.fingerprints {
                map.entry(fp.key()).or_insert(fp);
            }
        }
        Ok(map)
    }

    fn targets(&self) -> anyhow::Result<HashMap<String, Fingerprint>> {
        Ok(self.list_targets()?.into_iter().collect())
    }

    fn publish(
        &self,
        push: &PushContext,
        aspects: &[&str],
        fingerprints: &[Fingerprint],
        previous: &HashMap<String, Fingerprint>,
    ) -> anyhow::Result<()> {
        let mut changed: Vec<String> = fingerprints
            .iter()
            .filter(|fp| previous.get(&fp.key()).is_some_and(|p| fp.is_changed_from(p)))
            .map(Fingerprint::key)
            .collect();
        changed.sort();
        changed.dedup();
        let set = PublishedSet {
            sha: push.sha.clone(),
            owner: push.owner.clone(),
            repo: push.repo.clone(),
            branch: push.branch.clone(),
            previous_sha: push.previous_sha.clone(),
            published_at: now_rfc3339()?,
            aspects: aspects.iter().map(|a| a.to_string()).collect(),
            fingerprints: fingerprints.to_vec(),
            changed,
        };
        let _lock = lock_file(&self.paths.lock_file)?;
        write_json(&self.paths.fingerprints_file(&push.sha), &set)?;
        debug!(
            sha = %push.sha,
            count = fingerprints.len(),
            changed = set.changed.len(),
            "published fingerprints"
        );
        Ok(())
    }
}

pub(crate) fn now_rfc3339() -> anyhow::Result<String> {
    Ok(time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> (tempfile::TempDir, FileStore) {
        let tmp = tempfile::tempdir().unwrap();
        let paths = DriftPaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        (tmp, FileStore::new(paths))
    }

    fn push(sha: &str, previous: Option<&str>) -> PushContext {
        PushContext {
            previous_sha: previous.map(str::to_string),
            ..PushContext::new("acme", "web", sha, "main")
        }
    }

    #[test]
    fn unknown_commit_has_no_previous() {
        let (_tmp, s) = store();
        assert!(s.previous_fingerprints("nope").unwrap().is_empty());
        assert!(s.targets().unwrap().is_empty());
    }

    #[test]
    fn publish_then_read_back_as_previous() {
        let (_tmp, s) = store();
        let v1 = Fingerprint::new("npm", "lodash", json!("4.17.20"));
        s.publish(&push("c1", None), &["npm"], &[v1.clone()], &HashMap::new())
            .unwrap();

        let previous = s.previous_fingerprints("c1").unwrap();
        assert_eq!(previous.get("npm::lodash"), Some(&v1));

        let v2 = Fingerprint::new("npm", "lodash", json!("4.17.21"));
        s.publish(&push("c2", Some("c1")), &["npm"], &[v2], &previous)
            .unwrap();
        let set = s.load_published("c2").unwrap().unwrap();
        assert_eq!(set.previous_sha.as_deref(), Some("c1"));
        assert_eq!(set.changed, vec!["npm::lodash"]);
        assert_eq!(set.aspects, vec!["npm"]);
        assert!(!set.published_at.is_empty());
    }

    #[test]
    fn sibling_virtual_projects_are_stored_separately() {
        let (_tmp, s) = store();
        let a = Fingerprint::new("gradle", "build.gradle", json!("a"))
            .in_virtual_project(Some("moduleA"));
        let b = Fingerprint::new("gradle", "build.gradle", json!("b"))
            .in_virtual_project(Some("moduleB"));
        s.publish(&push("c1", None), &["gradle"], &[a.clone(), b.clone()], &HashMap::new())
            .unwrap();

        let previous = s.previous_fingerprints("c1").unwrap();
        assert_eq!(previous.len(), 2);
        assert_eq!(previous[&a.key()], a);
        assert_eq!(previous[&b.key()], b);

        s.publish(&push("c2", Some("c1")), &["gradle"], &[a, b], &previous)
            .unwrap();
        assert!(s.load_published("c2").unwrap().unwrap().changed.is_empty());
    }

    #[test]
    fn targets_set_replace_delete() {
        let (_tmp, s) = store();
        let a = Fingerprint::new("docker", "node", json!("18"));
        let b = Fingerprint::new("docker", "node", json!("20"));
        s.set_target(&a).unwrap();
        s.set_target(&b).unwrap();
        let targets = s.targets().unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets["docker::node"].sha, b.sha);

        assert!(s.delete_target("docker", "node").unwrap());
        assert!(!s.delete_target("docker", "node").unwrap());
        assert!(s.list_targets().unwrap().is_empty());
    }

    #[test]
    fn corrupt_targets_file_is_an_error() {
        let (_tmp, s) = store();
        std::fs::write(&s.paths().targets_json, "not json").unwrap();
        assert!(s.targets().is_err());
    }
}
