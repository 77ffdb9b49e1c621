use crate::aspect::{Apply, Aspect, Summarize, Veto};
use drift_core::{Diff, DriftError, Fingerprint, PushContext, VoteSummary};
use drift_project::Project;
use serde_json::{json, Value};

/// Fingerprints the content of named files (exact paths or globs).
///
/// Each file becomes one fingerprint of type `<aspect name>` named by its
/// path, with data `{path, content}`. Applying a target writes its content
/// back to its path.
pub struct FileAspect {
    name: String,
    display_name: String,
    files: Vec<String>,
    applier: FileApplier,
    summarizer: FileSummarizer,
    veto: Option<MissingFilesVeto>,
}

impl FileAspect {
    pub fn new(name: &str, files: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            display_name: name.to_string(),
            files,
            applier: FileApplier,
            summarizer: FileSummarizer {
                display_name: name.to_string(),
            },
            veto: None,
        }
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = display_name.to_string();
        self.summarizer.display_name = display_name.to_string();
        self
    }

    /// Veto the push when none of the files exist.
    pub fn veto_when_missing(mut self) -> Self {
        self.veto = Some(MissingFilesVeto {
            aspect: self.name.clone(),
            files: self.files.clone(),
        });
        self
    }

    fn resolve(&self, project: &dyn Project) -> anyhow::Result<Vec<String>> {
        let mut paths: Vec<String> = Vec::new();
        for pattern in &self.files {
            let found = if is_glob(pattern) {
                project.files_matching(pattern)?
            } else {
                vec![pattern.clone()]
            };
            for path in found {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        Ok(paths)
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

impl Aspect for FileAspect {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn extract(
        &self,
        project: &dyn Project,
        _push: &PushContext,
    ) -> anyhow::Result<Vec<Fingerprint>> {
        let mut fingerprints = Vec::new();
        for path in self.resolve(project)? {
            if let Some(content) = project.get_file(&path)? {
                let data = json!({ "path": &path, "content": content });
                fingerprints.push(Fingerprint::new(&self.name, path, data));
            }
        }
        Ok(fingerprints)
    }

    fn applier(&self) -> Option<&dyn Apply> {
        Some(&self.applier)
    }

    fn summarizer(&self) -> Option<&dyn Summarize> {
        Some(&self.summarizer)
    }

    fn veto(&self) -> Option<&dyn Veto> {
        self.veto.as_ref().map(|v| v as &dyn Veto)
    }
}

struct FileApplier;

impl Apply for FileApplier {
    fn apply(&self, project: &dyn Project, target: &Fingerprint) -> anyhow::Result<bool> {
        let invalid = |reason: &str| DriftError::InvalidFingerprint {
            name: target.name.clone(),
            reason: reason.to_string(),
        };
        let path = target
            .data
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing data.path"))?;
        let content = target
            .data
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing data.content"))?;
        project.add_file(path, content)?;
        Ok(true)
    }
}

struct FileSummarizer {
    display_name: String,
}

impl Summarize for FileSummarizer {
    fn summary(&self, diff: &Diff, target: Option<&Fingerprint>) -> VoteSummary {
        let short = |fp: &Fingerprint| fp.sha.chars().take(8).collect::<String>();
        let target = target.map(short).unwrap_or_else(|| "(none)".to_string());
        VoteSummary {
            title: format!("{} drift: {}", self.display_name, diff.to.name),
            description: format!(
                "`{}` content is {} but the target is {}",
                diff.to.name,
                short(&diff.to),
                target
            ),
        }
    }
}

struct MissingFilesVeto {
    aspect: String,
    files: Vec<String>,
}

impl Veto for MissingFilesVeto {
    fn veto_when(&self, fingerprints: &[Fingerprint]) -> Option<Value> {
        let present = fingerprints
            .iter()
            .any(|fp| fp.fp_type.as_deref() == Some(self.aspect.as_str()));
        (!present).then(|| {
            let files = self.files.join(", ");
            json!({
                "reason": format!("none of the required files are present: {files}"),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::has_veto;
    use drift_project::MemoryProject;

    #[test]
    fn extracts_existing_files_only() {
        let p = MemoryProject::with_files("p", [("Dockerfile", "FROM node:18")]);
        let a = FileAspect::new("docker", vec!["Dockerfile".into(), ".nvmrc".into()]);
        let fps = a.extract(&p, &PushContext::default()).unwrap();
        assert_eq!(fps.len(), 1);
        assert_eq!(fps[0].name, "Dockerfile");
        assert_eq!(fps[0].type_name(), "docker");
        assert_eq!(fps[0].data["content"], "FROM node:18");
    }

    #[test]
    fn globs_expand_against_project() {
        let p = MemoryProject::with_files(
            "p",
            [(".github/workflows/ci.yml", "on: push"), (".github/workflows/rel.yml", "on: tag")],
        );
        let a = FileAspect::new("ci", vec![".github/workflows/*.yml".into()]);
        let names: Vec<String> = a
            .extract(&p, &PushContext::default())
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec![".github/workflows/ci.yml", ".github/workflows/rel.yml"]);
    }

    #[test]
    fn apply_writes_target_content() {
        let p = MemoryProject::with_files("p", [(".nvmrc", "16")]);
        let a = FileAspect::new("node", vec![".nvmrc".into()]);
        let target = Fingerprint::new("node", ".nvmrc", json!({"path": ".nvmrc", "content": "20"}));
        assert!(a.applier().unwrap().apply(&p, &target).unwrap());
        assert_eq!(p.get_file(".nvmrc").unwrap().as_deref(), Some("20"));
    }

    #[test]
    fn apply_rejects_malformed_target() {
        let p = MemoryProject::new("p");
        let a = FileAspect::new("node", vec![".nvmrc".into()]);
        let target = Fingerprint::new("node", ".nvmrc", json!("20"));
        assert!(a.applier().unwrap().apply(&p, &target).is_err());
    }

    #[test]
    fn veto_only_when_configured_and_missing() {
        let a = FileAspect::new("lic", vec!["LICENSE".into()]);
        assert!(!has_veto(&a));
        let a = a.veto_when_missing();
        let veto = a.veto().unwrap();
        assert!(veto.veto_when(&[]).is_some());
        let fp = Fingerprint::new("lic", "LICENSE", json!({"path": "LICENSE", "content": "MIT"}));
        assert!(veto.veto_when(&[fp]).is_none());
    }
}
