use drift_store::{write_atomic, DriftPaths};
use std::path::Path;

/// `drift init`
pub fn execute(repo_root: &Path) -> anyhow::Result<()> {
    let paths = DriftPaths::discover(repo_root);
    let existed = paths.is_initialized();
    paths.ensure_layout()?;

    if !paths.config_json.exists() {
        write_atomic(&paths.config_json, b"{}\n")?;
    }

    if existed {
        println!("Already initialized at {}", paths.drift_dir.display());
    } else {
        println!("Initialized {}", paths.drift_dir.display());
        println!("  configure aspects in {}", paths.config_json.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent_and_keeps_config() {
        let tmp = tempfile::tempdir().unwrap();
        execute(tmp.path()).unwrap();
        let paths = DriftPaths::discover(tmp.path());
        assert!(paths.fingerprints_dir.is_dir());
        assert_eq!(std::fs::read_to_string(&paths.config_json).unwrap(), "{}\n");

        std::fs::write(&paths.config_json, r#"{"compliance_goal":true}"#).unwrap();
        execute(tmp.path()).unwrap();
        assert!(std::fs::read_to_string(&paths.config_json)
            .unwrap()
            .contains("compliance_goal"));
    }
}
