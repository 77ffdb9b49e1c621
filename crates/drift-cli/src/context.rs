use drift_core::PushContext;
use drift_project::LocalProject;
use drift_store::DriftPaths;
use std::path::Path;

/// Paths of an initialized workspace, or an error telling the user to init.
pub fn require_workspace(repo_root: &Path) -> anyhow::Result<DriftPaths> {
    let paths = DriftPaths::discover(repo_root);
    if !paths.is_initialized() {
        anyhow::bail!("No .drift/ workspace found. Run `drift init` first.");
    }
    Ok(paths)
}

/// The project to fingerprint: `--path` when given, else the repo root.
pub fn open_project(repo_root: &Path, path: Option<&Path>) -> anyhow::Result<LocalProject> {
    LocalProject::open(path.unwrap_or(repo_root))
}

/// Push metadata for commands run against the working tree.
pub fn working_tree_push(repo_root: &Path) -> PushContext {
    PushContext::new("local", &repo_name(repo_root), "working-tree", "local")
}

pub fn repo_name(repo_root: &Path) -> String {
    repo_root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "repo".to_string())
}

/// First 8 characters of a sha, for tables.
pub fn short(sha: &str) -> &str {
    sha.get(..8).unwrap_or(sha)
}
