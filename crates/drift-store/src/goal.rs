use crate::paths::DriftPaths;
use crate::store::now_rfc3339;
use crate::write_json;
use drift_core::PushContext;
use drift_vote::{ComplianceGoal, GoalState};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Compliance goal state of one commit, `.drift/goals/<sha>.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalRecord {
    pub state: GoalState,
    pub description: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub sha: String,
    pub updated_at: String,
}

/// Records compliance goal updates as per-commit JSON files.
pub struct FileGoalRecorder {
    paths: DriftPaths,
}

impl FileGoalRecorder {
    pub fn new(paths: DriftPaths) -> Self {
        Self { paths }
    }

    pub fn read(&self, commit_sha: &str) -> anyhow::Result<Option<GoalRecord>> {
        let path = self.paths.goal_file(commit_sha);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

impl ComplianceGoal for FileGoalRecorder {
    fn update(
        &self,
        push: &PushContext,
        state: GoalState,
        description: &str,
    ) -> anyhow::Result<()> {
        let record = GoalRecord {
            state,
            description: description.to_string(),
            owner: push.owner.clone(),
            repo: push.repo.clone(),
            branch: push.branch.clone(),
            sha: push.sha.clone(),
            updated_at: now_rfc3339()?,
        };
        write_json(&self.paths.goal_file(&push.sha), &record)?;
        info!(sha = %push.sha, state = state.as_str(), "compliance goal updated");
        Ok(())
    }
}
