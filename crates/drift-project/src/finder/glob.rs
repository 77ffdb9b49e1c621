use super::{VirtualProject, VirtualProjectFinder, VirtualProjectInfo};
use crate::project::Project;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

/// How a matched file affects detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStatus {
    /// `false` drops the match entirely.
    pub include: bool,
    /// A root match with `keep_looking` does not suppress deeper matches.
    pub keep_looking: bool,
}

impl Default for FileStatus {
    fn default() -> Self {
        Self {
            include: true,
            keep_looking: false,
        }
    }
}

type StatusFn = dyn Fn(&dyn Project, &str) -> anyhow::Result<FileStatus> + Send + Sync;

/// A glob plus an optional per-file status decision.
#[derive(Clone)]
pub struct FileRule {
    pub glob: String,
    status: Option<Arc<StatusFn>>,
}

impl std::fmt::Debug for FileRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRule")
            .field("glob", &self.glob)
            .field("status", &self.status.is_some())
            .finish()
    }
}

impl FileRule {
    /// Every match counts; a root match stops the search.
    pub fn new(glob: &str) -> Self {
        Self {
            glob: glob.to_string(),
            status: None,
        }
    }

    /// Match `name` at any depth, root included.
    pub fn file_name(name: &str) -> Self {
        Self::new(&format!("**/{name}"))
    }

    pub fn with_status<F>(glob: &str, status: F) -> Self
    where
        F: Fn(&dyn Project, &str) -> anyhow::Result<FileStatus> + Send + Sync + 'static,
    {
        Self {
            glob: glob.to_string(),
            status: Some(Arc::new(status)),
        }
    }

    /// Keep looking below a match whose content matches `pattern`, e.g. a
    /// root `pom.xml` declaring `<modules>`.
    pub fn keep_looking_when(glob: &str, pattern: Regex) -> Self {
        Self::with_status(glob, move |project, path| {
            let content = project.get_file(path)?.unwrap_or_default();
            Ok(FileStatus {
                include: true,
                keep_looking: pattern.is_match(&content),
            })
        })
    }

    fn status_of(&self, project: &dyn Project, path: &str) -> anyhow::Result<FileStatus> {
        match &self.status {
            Some(f) => f(project, path),
            None => Ok(FileStatus::default()),
        }
    }
}

/// Finds virtual projects by the directories containing matching files.
///
/// - a root match that does not keep looking yields `RootOnly`;
/// - otherwise every distinct containing directory becomes a virtual project
///   (`"."` for a root match that keeps looking);
/// - no matches at all yields `Unknown`.
pub struct GlobFinder {
    name: String,
    rules: Vec<FileRule>,
}

impl GlobFinder {
    pub fn new(name: &str, rules: Vec<FileRule>) -> Self {
        Self {
            name: name.to_string(),
            rules,
        }
    }

    /// One rule per file name, matched at any depth.
    pub fn file_names(names: &[&str]) -> Self {
        Self::new(
            &format!("files:{}", names.join(",")),
            names.iter().map(|n| FileRule::file_name(n)).collect(),
        )
    }

    pub fn globs(globs: &[&str]) -> Self {
        Self::new(
            &format!("globs:{}", globs.join(",")),
            globs.iter().map(|g| FileRule::new(g)).collect(),
        )
    }
}

struct Match {
    dir: Option<String>,
    file_name: String,
    keep_looking: bool,
}

fn split_dir(path: &str) -> (Option<String>, String) {
    match path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir.to_string()), file.to_string()),
        None => (None, path.to_string()),
    }
}

impl VirtualProjectFinder for GlobFinder {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, project: &dyn Project) -> anyhow::Result<VirtualProjectInfo> {
        let mut matches: Vec<Match> = Vec::new();
        for rule in &self.rules {
            for path in project.files_matching(&rule.glob)? {
                let status = match rule.status_of(project, &path) {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(
                            finder = %self.name,
                            path = %path,
                            error = %e,
                            "file status check failed; skipping match"
                        );
                        continue;
                    }
                };
                if !status.include {
                    continue;
                }
                let (dir, file_name) = split_dir(&path);
                matches.push(Match {
                    dir,
                    file_name,
                    keep_looking: status.keep_looking,
                });
            }
        }

        if matches.is_empty() {
            return Ok(VirtualProjectInfo::Unknown);
        }
        if matches.iter().any(|m| m.dir.is_none() && !m.keep_looking) {
            debug!(finder = %self.name, project = project.name(), "root match; not splitting");
            return Ok(VirtualProjectInfo::RootOnly);
        }

        let mut virtual_projects: Vec<VirtualProject> = Vec::new();
        for m in matches {
            let path = m.dir.unwrap_or_else(|| ".".to_string());
            if virtual_projects.iter().any(|vp| vp.path == path) {
                continue;
            }
            virtual_projects.push(VirtualProject {
                path,
                reason: format!("has file: {}", m.file_name),
            });
        }
        virtual_projects.sort_by(|a, b| (a.path != ".", &a.path).cmp(&(b.path != ".", &b.path)));
        debug!(
            finder = %self.name,
            project = project.name(),
            count = virtual_projects.len(),
            "identified virtual projects"
        );
        Ok(VirtualProjectInfo::identified(virtual_projects))
    }
}
