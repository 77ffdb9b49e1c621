use anyhow::Context;
use drift_aspect::{
    Aspect, AspectRegistry, CompositeAspect, FileAspect, FingerprintComputer, VirtualProjectAspect,
};
use drift_core::DriftError;
use drift_project::finder::{first_virtual_project_finder_of, CachingFinder, FileRule, GlobFinder};
use drift_project::VirtualProjectFinder;
use drift_store::DriftPaths;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

// ── Schema ──

/// `.drift/config.json`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    pub aspects: Vec<AspectConfig>,
    pub virtual_projects: Vec<VirtualProjectRule>,
    pub composites: Vec<CompositeConfig>,
    pub compliance_goal: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AspectConfig {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub files: Vec<String>,
    #[serde(default)]
    pub veto_when_missing: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VirtualProjectRule {
    pub glob: String,
    /// Regex over the matched file's content; a root match whose content
    /// matches does not stop the search.
    #[serde(default)]
    pub keep_looking_when: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompositeConfig {
    pub name: String,
    pub display_name: String,
    pub aspects: Vec<String>,
}

/// Aspects and finder built from a config.
pub struct Setup {
    pub registry: Arc<AspectRegistry>,
    pub finder: Option<Arc<dyn VirtualProjectFinder>>,
}

impl Setup {
    pub fn computer(&self) -> FingerprintComputer {
        let computer = FingerprintComputer::new(Arc::clone(&self.registry));
        match &self.finder {
            Some(finder) => computer.with_finder(Arc::clone(finder)),
            None => computer,
        }
    }
}

// ── Loading ──

impl DriftConfig {
    /// Missing file or invalid content yields the default config (logged).
    pub fn load(paths: &DriftPaths) -> Self {
        let content = match std::fs::read_to_string(&paths.config_json) {
            Ok(c) => c,
            Err(_) => {
                debug!(path = %paths.config_json.display(), "no config file; using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    path = %paths.config_json.display(),
                    error = %e,
                    "invalid config; using defaults"
                );
                Self::default()
            }
        }
    }

    /// Register every configured aspect (wrapped per virtual project when
    /// finder rules exist), then the composites over them.
    pub fn build(&self) -> anyhow::Result<Setup> {
        let finder = self.finder()?;
        let mut registry = AspectRegistry::new();

        for entry in &self.aspects {
            let mut aspect = FileAspect::new(&entry.name, entry.files.clone());
            if let Some(display) = &entry.display_name {
                aspect = aspect.with_display_name(display);
            }
            if entry.veto_when_missing {
                aspect = aspect.veto_when_missing();
            }
            let aspect: Arc<dyn Aspect> = match &finder {
                Some(f) => Arc::new(VirtualProjectAspect::new(Arc::new(aspect), Arc::clone(f))),
                None => Arc::new(aspect),
            };
            registry.register(aspect)?;
        }

        for entry in &self.composites {
            let members = entry
                .aspects
                .iter()
                .map(|name| {
                    registry
                        .get(name)
                        .cloned()
                        .ok_or_else(|| DriftError::AspectNotFound(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("composite '{}'", entry.name))?;
            registry.register(Arc::new(CompositeAspect::new(
                &entry.name,
                &entry.display_name,
                members,
            )))?;
        }

        debug!(aspects = ?registry.names(), virtual_projects = finder.is_some(), "configured");
        Ok(Setup {
            registry: Arc::new(registry),
            finder,
        })
    }

    fn finder(&self) -> anyhow::Result<Option<Arc<dyn VirtualProjectFinder>>> {
        if self.virtual_projects.is_empty() {
            return Ok(None);
        }
        let mut finders: Vec<Arc<dyn VirtualProjectFinder>> = Vec::new();
        for rule in &self.virtual_projects {
            let file_rule = match &rule.keep_looking_when {
                Some(pattern) => {
                    let re = Regex::new(pattern)
                        .with_context(|| format!("invalid keep_looking_when for {}", rule.glob))?;
                    FileRule::keep_looking_when(&rule.glob, re)
                }
                None => FileRule::new(&rule.glob),
            };
            finders.push(Arc::new(GlobFinder::new(&rule.glob, vec![file_rule])));
        }
        let composed = first_virtual_project_finder_of(finders);
        Ok(Some(Arc::new(CachingFinder::new(Arc::new(composed)))))
    }
}

/// Load and build in one step; the CLI entry point for every command that
/// computes fingerprints.
pub fn load_setup(paths: &DriftPaths) -> anyhow::Result<(DriftConfig, Setup)> {
    let config = DriftConfig::load(paths);
    let setup = config.build()?;
    Ok((config, setup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::PushContext;
    use drift_project::MemoryProject;

    fn parse(json: &str) -> DriftConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn empty_object_is_default() {
        let c = parse("{}");
        assert!(c.aspects.is_empty());
        assert!(!c.compliance_goal);
        assert!(c.build().unwrap().registry.is_empty());
    }

    #[test]
    fn missing_or_invalid_file_falls_back_to_default() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = DriftPaths::discover(tmp.path());
        assert!(DriftConfig::load(&paths).aspects.is_empty());
        paths.ensure_layout().unwrap();
        std::fs::write(&paths.config_json, r#"{"aspects": "nope"}"#).unwrap();
        assert!(DriftConfig::load(&paths).aspects.is_empty());
    }

    #[test]
    fn builds_aspects_and_composites() {
        let c = parse(
            r#"{
                "aspects": [
                    {"name": "node", "files": [".nvmrc"]},
                    {"name": "docker", "display_name": "Docker", "files": ["Dockerfile"]}
                ],
                "composites": [
                    {"name": "runtime", "display_name": "Runtime", "aspects": ["node", "docker"]}
                ]
            }"#,
        );
        let setup = c.build().unwrap();
        assert_eq!(setup.registry.names(), vec!["node", "docker", "runtime"]);

        let p = MemoryProject::with_files("p", [(".nvmrc", "20"), ("Dockerfile", "FROM node:20")]);
        let fps = setup.computer().compute(&p, &PushContext::default());
        assert_eq!(fps.len(), 3);
        assert_eq!(fps[2].name, "Runtime:.nvmrc&Dockerfile");
    }

    #[test]
    fn composite_over_unknown_aspect_is_rejected() {
        let c = parse(
            r#"{"composites": [{"name": "x", "display_name": "X", "aspects": ["ghost"]}]}"#,
        );
        let err = c.build().err().unwrap();
        assert!(format!("{err:#}").contains("ghost"));
    }

    #[test]
    fn virtual_project_rules_split_fingerprints() {
        let c = parse(
            r#"{
                "aspects": [{"name": "gradle", "files": ["build.gradle"]}],
                "virtual_projects": [{"glob": "**/build.gradle"}]
            }"#,
        );
        let setup = c.build().unwrap();
        assert!(setup.finder.is_some());
        let p = MemoryProject::with_files(
            "mono",
            [("moduleA/build.gradle", "a"), ("moduleB/build.gradle", "b")],
        );
        let fps = setup.computer().compute(&p, &PushContext::default());
        let paths: Vec<Option<&str>> = fps.iter().map(|f| f.path.as_deref()).collect();
        assert_eq!(paths, vec![Some("moduleA"), Some("moduleB")]);
        let keys: Vec<String> = fps.iter().map(|f| f.key()).collect();
        assert_eq!(keys, vec!["gradle::moduleA/build.gradle", "gradle::moduleB/build.gradle"]);
    }

    #[test]
    fn invalid_keep_looking_regex_is_an_error() {
        let c = parse(r#"{"virtual_projects": [{"glob": "pom.xml", "keep_looking_when": "("}]}"#);
        assert!(c.build().is_err());
    }
}
