use std::path::{Path, PathBuf};

/// All well-known paths under `.drift/`.
#[derive(Debug, Clone)]
pub struct DriftPaths {
    pub root: PathBuf,
    pub drift_dir: PathBuf,
    pub config_json: PathBuf,
    pub fingerprints_dir: PathBuf,
    pub targets_json: PathBuf,
    pub goals_dir: PathBuf,
    pub lock_file: PathBuf,
}

impl DriftPaths {
    /// Derive all paths from a repo root. Pure computation, no I/O.
    pub fn discover(repo_root: impl Into<PathBuf>) -> Self {
        let root = repo_root.into();
        let drift_dir = root.join(".drift");
        Self {
            config_json: drift_dir.join("config.json"),
            fingerprints_dir: drift_dir.join("fingerprints"),
            targets_json: drift_dir.join("targets.json"),
            goals_dir: drift_dir.join("goals"),
            lock_file: drift_dir.join("LOCK"),
            drift_dir,
            root,
        }
    }

    /// Create all required directories. Idempotent.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        for dir in [&self.drift_dir, &self.fingerprints_dir, &self.goals_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Check whether `.drift/` exists.
    pub fn is_initialized(&self) -> bool {
        self.drift_dir.is_dir()
    }

    /// Published fingerprint set of one commit.
    pub fn fingerprints_file(&self, commit_sha: &str) -> PathBuf {
        self.fingerprints_dir.join(format!("{}.json", file_stem(commit_sha)))
    }

    /// Compliance goal record of one commit.
    pub fn goal_file(&self, commit_sha: &str) -> PathBuf {
        self.goals_dir.join(format!("{}.json", file_stem(commit_sha)))
    }

    /// Walk up from `start` looking for a directory containing `.drift/`.
    /// Returns `None` if not found.
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        let mut cur = start.to_path_buf();
        loop {
            if cur.join(".drift").is_dir() {
                return Some(cur);
            }
            if !cur.pop() {
                return None;
            }
        }
    }
}

/// Commit shas become file names; anything outside `[A-Za-z0-9._-]` is replaced.
fn file_stem(commit_sha: &str) -> String {
    commit_sha
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
