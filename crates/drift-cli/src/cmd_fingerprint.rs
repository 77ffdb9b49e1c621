use crate::config::load_setup;
use crate::context::{open_project, require_workspace, short, working_tree_push};
use drift_store::DriftPaths;
use std::path::Path;

/// `drift fingerprint [--path DIR] [--json]`
pub fn execute(repo_root: &Path, path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let paths = require_workspace(repo_root)?;
    let (_, setup) = load_setup(&paths)?;
    let project = open_project(repo_root, path)?;
    let fingerprints = setup.computer().compute(&project, &working_tree_push(repo_root));

    if json {
        println!("{}", serde_json::to_string_pretty(&fingerprints)?);
        return Ok(());
    }
    if fingerprints.is_empty() {
        println!("No fingerprints. Configure aspects in {}", paths.config_json.display());
        return Ok(());
    }
    for fp in &fingerprints {
        let location = fp.path.as_deref().map(|p| format!("  ({p})")).unwrap_or_default();
        println!("{}  {}{}", short(&fp.sha), fp.key(), location);
    }
    Ok(())
}

/// `drift virtual [--path DIR]`
pub fn virtual_projects(repo_root: &Path, path: Option<&Path>) -> anyhow::Result<()> {
    let paths = DriftPaths::discover(repo_root);
    let (_, setup) = load_setup(&paths)?;
    let Some(finder) = setup.finder else {
        println!("No virtual_projects rules configured.");
        return Ok(());
    };
    let project = open_project(repo_root, path)?;
    let info = finder.find(&project)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
