use crate::config::load_setup;
use crate::context::{open_project, require_workspace, short, working_tree_push};
use clap::Subcommand;
use drift_store::FileStore;
use std::path::{Path, PathBuf};

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum TargetCmd {
    /// Make the project's current fingerprint the team target
    Set {
        /// Fingerprint type (aspect name)
        fp_type: String,
        /// Fingerprint name
        name: String,
        /// Project directory (defaults to the repo root)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// List team targets
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a team target
    Delete {
        /// Fingerprint type (aspect name)
        fp_type: String,
        /// Fingerprint name
        name: String,
    },
}

// ── Dispatch ──

pub fn run(cmd: TargetCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        TargetCmd::Set {
            fp_type,
            name,
            path,
        } => set(repo_root, &fp_type, &name, path.as_deref()),
        TargetCmd::List { json } => list(repo_root, json),
        TargetCmd::Delete { fp_type, name } => delete(repo_root, &fp_type, &name),
    }
}

// ── Command Implementations ──

/// `drift target set <type> <name>`
pub fn set(
    repo_root: &Path,
    fp_type: &str,
    name: &str,
    path: Option<&Path>,
) -> anyhow::Result<()> {
    let paths = require_workspace(repo_root)?;
    let (_, setup) = load_setup(&paths)?;
    let project = open_project(repo_root, path)?;
    let fingerprints = setup.computer().compute(&project, &working_tree_push(repo_root));
    let Some(fp) = fingerprints
        .into_iter()
        .find(|f| f.type_name() == fp_type && f.name == name)
    else {
        anyhow::bail!(
            "no current fingerprint {fp_type}::{name} in {}",
            project.root().display()
        );
    };
    FileStore::new(paths).set_target(&fp)?;
    println!("target {} = {}", fp.key(), short(&fp.sha));
    Ok(())
}

/// `drift target list`
pub fn list(repo_root: &Path, json: bool) -> anyhow::Result<()> {
    let paths = require_workspace(repo_root)?;
    let targets = FileStore::new(paths).list_targets()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&targets)?);
    } else if targets.is_empty() {
        println!("(no targets set)");
    } else {
        for (key, fp) in &targets {
            println!("{}  {key}", short(&fp.sha));
        }
    }
    Ok(())
}

/// `drift target delete <type> <name>`
pub fn delete(repo_root: &Path, fp_type: &str, name: &str) -> anyhow::Result<()> {
    let paths = require_workspace(repo_root)?;
    if FileStore::new(paths).delete_target(fp_type, name)? {
        println!("deleted {fp_type}::{name}");
    } else {
        println!("no target {fp_type}::{name}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_store::DriftPaths;

    #[test]
    fn set_takes_the_current_fingerprint() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = DriftPaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        std::fs::write(
            &paths.config_json,
            r#"{"aspects":[{"name":"node","files":[".nvmrc"]}]}"#,
        )
        .unwrap();
        std::fs::write(tmp.path().join(".nvmrc"), "20").unwrap();

        set(tmp.path(), "node", ".nvmrc", None).unwrap();
        let targets = FileStore::new(paths.clone()).list_targets().unwrap();
        assert_eq!(targets["node::.nvmrc"].data["content"], "20");

        assert!(set(tmp.path(), "node", "missing", None).is_err());
        delete(tmp.path(), "node", ".nvmrc").unwrap();
        assert!(FileStore::new(paths).list_targets().unwrap().is_empty());
    }
}
