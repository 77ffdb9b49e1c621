use crate::config::load_setup;
use crate::context::{open_project, require_workspace, short, working_tree_push};
use drift_aspect::apply::propagate_targets;
use drift_store::FileStore;
use std::collections::HashMap;
use std::path::Path;

/// `drift apply [--type T] [--name N]`: bring the project in line with its targets.
pub fn execute(
    repo_root: &Path,
    fp_type: Option<&str>,
    name: Option<&str>,
    path: Option<&Path>,
) -> anyhow::Result<()> {
    let paths = require_workspace(repo_root)?;
    let (_, setup) = load_setup(&paths)?;
    let project = open_project(repo_root, path)?;
    let current = setup.computer().compute(&project, &working_tree_push(repo_root));

    let targets: HashMap<_, _> = FileStore::new(paths)
        .list_targets()?
        .into_iter()
        .filter(|(_, fp)| fp_type.map_or(true, |t| fp.type_name() == t))
        .filter(|(_, fp)| name.map_or(true, |n| fp.name == n))
        .collect();

    let outcomes = propagate_targets(&setup.registry, &project, &current, &targets);
    if outcomes.is_empty() {
        println!("Nothing to apply: project matches its targets.");
        return Ok(());
    }

    let mut failed = 0;
    for o in &outcomes {
        if o.applied {
            println!("  OK  {}  {} -> {}", o.key, short(&o.from_sha), short(&o.to_sha));
        } else {
            failed += 1;
            match &o.error {
                Some(e) => println!("  ERR {}: {e}", o.key),
                None => println!("  ERR {}: apply reported failure", o.key),
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} target(s) failed to apply", outcomes.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::Fingerprint;
    use drift_store::DriftPaths;

    #[test]
    fn apply_writes_target_content_to_the_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = DriftPaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        std::fs::write(
            &paths.config_json,
            r#"{"aspects":[{"name":"node","files":[".nvmrc"]}]}"#,
        )
        .unwrap();
        std::fs::write(tmp.path().join(".nvmrc"), "18").unwrap();
        FileStore::new(paths)
            .set_target(&Fingerprint::new(
                "node",
                ".nvmrc",
                serde_json::json!({"path": ".nvmrc", "content": "20"}),
            ))
            .unwrap();

        execute(tmp.path(), Some("docker"), None, None).unwrap();
        assert_eq!(std::fs::read_to_string(tmp.path().join(".nvmrc")).unwrap(), "18");

        execute(tmp.path(), None, None, None).unwrap();
        assert_eq!(std::fs::read_to_string(tmp.path().join(".nvmrc")).unwrap(), "20");
    }

    #[test]
    fn monorepo_target_only_touches_its_module() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let paths = DriftPaths::discover(root);
        paths.ensure_layout().unwrap();
        std::fs::write(
            &paths.config_json,
            r#"{
                "aspects": [{"name": "gradle", "files": ["build.gradle"]}],
                "virtual_projects": [{"glob": "**/build.gradle"}]
            }"#,
        )
        .unwrap();
        for module in ["moduleA", "moduleB"] {
            std::fs::create_dir_all(root.join(module)).unwrap();
            std::fs::write(root.join(module).join("build.gradle"), "old").unwrap();
        }
        let target = Fingerprint::new(
            "gradle",
            "build.gradle",
            serde_json::json!({"path": "build.gradle", "content": "new"}),
        )
        .in_virtual_project(Some("moduleB"));
        FileStore::new(paths).set_target(&target).unwrap();

        execute(root, Some("gradle"), Some("moduleB/build.gradle"), None).unwrap();
        let read = |m: &str| std::fs::read_to_string(root.join(m).join("build.gradle")).unwrap();
        assert_eq!(read("moduleA"), "old");
        assert_eq!(read("moduleB"), "new");
    }
}
