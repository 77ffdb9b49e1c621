use crate::context::require_workspace;
use clap::Subcommand;
use std::path::Path;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key (e.g. compliance_goal)
        key: String,
        /// Config value (true/false/number/JSON/string)
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Set { key, value } => set(repo_root, &key, &value),
        ConfigCmd::Get { key } => get(repo_root, &key),
        ConfigCmd::List => list(repo_root),
    }
}

// ── Command Implementations ──

/// Read config from `.drift/config.json`. Returns empty map if file doesn't exist.
fn read_config(path: &Path) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    if !path.exists() {
        return Ok(serde_json::Map::new());
    }
    let content = std::fs::read_to_string(path)?;
    let val: serde_json::Value = serde_json::from_str(&content)?;
    match val {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

fn write_config(
    path: &Path,
    config: &serde_json::Map<String, serde_json::Value>,
) -> anyhow::Result<()> {
    drift_store::write_json(path, config)
}

/// Parse a string value into JSON: bool, number, array/object, else string.
fn parse_value(s: &str) -> serde_json::Value {
    match s {
        "true" => serde_json::Value::Bool(true),
        "false" => serde_json::Value::Bool(false),
        _ => {
            if let Ok(n) = s.parse::<i64>() {
                serde_json::Value::Number(n.into())
            } else if let Ok(f) = s.parse::<f64>() {
                serde_json::json!(f)
            } else if s.starts_with('[') || s.starts_with('{') {
                serde_json::from_str(s).unwrap_or_else(|_| serde_json::Value::String(s.to_string()))
            } else {
                serde_json::Value::String(s.to_string())
            }
        }
    }
}

/// `drift config set <key> <value>`
pub fn set(repo_root: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let paths = require_workspace(repo_root)?;
    let mut config = read_config(&paths.config_json)?;
    config.insert(key.to_string(), parse_value(value));
    write_config(&paths.config_json, &config)?;
    println!("{key} = {value}");
    Ok(())
}

/// `drift config get <key>`
pub fn get(repo_root: &Path, key: &str) -> anyhow::Result<()> {
    let paths = require_workspace(repo_root)?;
    let config = read_config(&paths.config_json)?;
    match config.get(key) {
        Some(val) => println!("{val}"),
        None => println!("(not set)"),
    }
    Ok(())
}

/// `drift config list`
pub fn list(repo_root: &Path) -> anyhow::Result<()> {
    let paths = require_workspace(repo_root)?;
    let config = read_config(&paths.config_json)?;
    if config.is_empty() {
        println!("(no config set)");
    } else {
        for (k, v) in &config {
            println!("{k} = {v}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_store::DriftPaths;

    #[test]
    fn parse_value_kinds() {
        assert_eq!(parse_value("true"), serde_json::json!(true));
        assert_eq!(parse_value("42"), serde_json::json!(42));
        assert_eq!(parse_value("1.5"), serde_json::json!(1.5));
        assert_eq!(parse_value(r#"["a"]"#), serde_json::json!(["a"]));
        assert_eq!(parse_value("[oops"), serde_json::json!("[oops"));
        assert_eq!(parse_value("hello"), serde_json::json!("hello"));
    }

    #[test]
    fn set_preserves_other_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = DriftPaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        std::fs::write(&paths.config_json, r#"{"aspects":[]}"#).unwrap();

        set(tmp.path(), "compliance_goal", "true").unwrap();
        let config = read_config(&paths.config_json).unwrap();
        assert_eq!(config["compliance_goal"], true);
        assert!(config.contains_key("aspects"));
    }

    #[test]
    fn commands_require_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(set(tmp.path(), "k", "v").is_err());
    }
}
