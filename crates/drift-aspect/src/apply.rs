use crate::registry::AspectRegistry;
use drift_core::{DriftError, Fingerprint};
use drift_project::Project;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Apply `target` through the aspect that owns it.
///
/// Fails with `AspectNotFound` when no registered aspect owns the
/// fingerprint and with `ApplyUnsupported` when the owner cannot apply.
pub fn apply_target(
    registry: &AspectRegistry,
    project: &dyn Project,
    target: &Fingerprint,
) -> anyhow::Result<bool> {
    let aspect = registry
        .find_owner(target)
        .ok_or_else(|| DriftError::AspectNotFound(target.type_name().to_string()))?;
    let applier = aspect
        .applier()
        .ok_or_else(|| DriftError::ApplyUnsupported(aspect.name().to_string()))?;
    debug!(aspect = aspect.name(), fingerprint = %target.name, "applying target");
    applier.apply(project, target)
}

/// Outcome of propagating one target.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Propagation {
    pub key: String,
    pub from_sha: String,
    pub to_sha: String,
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Bring a project in line with its targets.
///
/// Only targets whose key the project currently carries with a different
/// sha are applied; fingerprints without a target and targets the project
/// does not carry are left alone. Every eligible target is attempted even
/// when an earlier one fails.
pub fn propagate_targets(
    registry: &AspectRegistry,
    project: &dyn Project,
    current: &[Fingerprint],
    targets: &HashMap<String, Fingerprint>,
) -> Vec<Propagation> {
    let mut seen: Vec<String> = Vec::new();
    let mut outcomes = Vec::new();
    for fp in current {
        let key = fp.key();
        if seen.contains(&key) {
            continue;
        }
        let Some(target) = targets.get(&key) else {
            continue;
        };
        if target.sha == fp.sha {
            continue;
        }
        seen.push(key.clone());

        let (applied, error) = match apply_target(registry, project, target) {
            Ok(ok) => (ok, None),
            Err(e) => {
                warn!(key = %key, error = %e, "target propagation failed");
                (false, Some(e.to_string()))
            }
        };
        info!(key = %key, applied, "propagated target");
        outcomes.push(Propagation {
            key,
            from_sha: fp.sha.clone(),
            to_sha: target.sha.clone(),
            applied,
            error,
        });
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::{Aspect, SimpleAspect};
    use crate::file::FileAspect;
    use drift_project::MemoryProject;
    use serde_json::json;
    use std::sync::Arc;

    fn registry() -> AspectRegistry {
        let node: Arc<dyn Aspect> = Arc::new(FileAspect::new("node", vec![".nvmrc".into()]));
        let readonly: Arc<dyn Aspect> =
            Arc::new(SimpleAspect::new("readonly", |_, _| Ok(Vec::new())));
        AspectRegistry::from_aspects(vec![node, readonly]).unwrap()
    }

    fn nvmrc(content: &str) -> Fingerprint {
        Fingerprint::new("node", ".nvmrc", json!({"path": ".nvmrc", "content": content}))
    }

    #[test]
    fn apply_target_writes_through_owner() {
        let p = MemoryProject::with_files("p", [(".nvmrc", "16")]);
        assert!(apply_target(&registry(), &p, &nvmrc("20")).unwrap());
        assert_eq!(p.get_file(".nvmrc").unwrap().as_deref(), Some("20"));
    }

    #[test]
    fn apply_target_errors_for_unknown_or_readonly() {
        let p = MemoryProject::new("p");
        let orphan = Fingerprint::new("maven", "x", json!(1));
        let err = apply_target(&registry(), &p, &orphan).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DriftError>(),
            Some(DriftError::AspectNotFound(t)) if t == "maven"
        ));

        let ro = Fingerprint::new("readonly", "x", json!(1));
        let err = apply_target(&registry(), &p, &ro).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DriftError>(),
            Some(DriftError::ApplyUnsupported(_))
        ));
    }

    #[test]
    fn propagation_only_touches_differing_targets() {
        let p = MemoryProject::with_files("p", [(".nvmrc", "16")]);
        let current = vec![nvmrc("16"), Fingerprint::new("readonly", "r", json!(1))];
        let mut targets = HashMap::new();
        targets.insert(current[0].key(), nvmrc("20"));
        targets.insert(current[1].key(), current[1].clone());
        targets.insert("node::missing".to_string(), nvmrc("99"));

        let out = propagate_targets(&registry(), &p, &current, &targets);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, "node::.nvmrc");
        assert!(out[0].applied);
        assert_eq!(out[0].to_sha, nvmrc("20").sha);
        assert_eq!(p.get_file(".nvmrc").unwrap().as_deref(), Some("20"));
    }

    #[test]
    fn propagation_reports_failures_and_continues() {
        let p = MemoryProject::with_files("p", [(".nvmrc", "16")]);
        let current = vec![Fingerprint::new("readonly", "r", json!(1)), nvmrc("16")];
        let mut targets = HashMap::new();
        targets.insert(current[0].key(), Fingerprint::new("readonly", "r", json!(2)));
        targets.insert(current[1].key(), nvmrc("18"));

        let out = propagate_targets(&registry(), &p, &current, &targets);
        assert_eq!(out.len(), 2);
        assert!(!out[0].applied);
        assert!(out[0].error.as_deref().unwrap().contains("does not support apply"));
        assert!(out[1].applied);
        assert_eq!(p.get_file(".nvmrc").unwrap().as_deref(), Some("18"));
    }
}
