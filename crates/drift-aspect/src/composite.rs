use crate::aspect::{Apply, Aspect, Consolidate};
use drift_core::{DriftError, Fingerprint, PushContext};
use drift_project::Project;
use std::sync::Arc;
use tracing::warn;

/// Schema version of composite fingerprint payloads.
pub const COMPOSITE_VERSION: &str = "0.1.0";

type Narrower = dyn Fn(&Fingerprint) -> bool + Send + Sync;

/// Combines fingerprints produced by other aspects into one composite.
///
/// The composite extracts nothing itself; it emits during consolidation,
/// selecting inputs with its narrower (by default: fingerprints whose type
/// is one of the combined aspects' names). The composite's `data` is the
/// array of selected fingerprints.
///
/// `apply` exists only when every combined aspect can apply; this is fixed
/// at construction.
pub struct CompositeAspect {
    name: String,
    display_name: String,
    consolidator: CompositeConsolidator,
    applier: Option<CompositeApplier>,
}

impl CompositeAspect {
    pub fn new(name: &str, display_name: &str, aspects: Vec<Arc<dyn Aspect>>) -> Self {
        let names: Vec<String> = aspects.iter().map(|a| a.name().to_string()).collect();
        Self::with_narrower(name, display_name, aspects, move |fp| {
            fp.fp_type.as_ref().is_some_and(|t| names.contains(t))
        })
    }

    pub fn with_narrower<F>(
        name: &str,
        display_name: &str,
        aspects: Vec<Arc<dyn Aspect>>,
        narrower: F,
    ) -> Self
    where
        F: Fn(&Fingerprint) -> bool + Send + Sync + 'static,
    {
        let applier = aspects
            .iter()
            .all(|a| a.applier().is_some())
            .then(|| CompositeApplier {
                aspects: aspects.clone(),
            });
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            consolidator: CompositeConsolidator {
                display_name: display_name.to_string(),
                narrower: Box::new(narrower),
            },
            applier,
        }
    }

    fn type_prefix(&self) -> String {
        format!("{}:", self.display_name)
    }
}

impl Aspect for CompositeAspect {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn extract(
        &self,
        _project: &dyn Project,
        _push: &PushContext,
    ) -> anyhow::Result<Vec<Fingerprint>> {
        Ok(Vec::new())
    }

    fn owns(&self, fp: &Fingerprint) -> bool {
        fp.fp_type
            .as_deref()
            .is_some_and(|t| t == self.name || t.starts_with(&self.type_prefix()))
    }

    fn applier(&self) -> Option<&dyn Apply> {
        self.applier.as_ref().map(|a| a as &dyn Apply)
    }

    fn consolidator(&self) -> Option<&dyn Consolidate> {
        Some(&self.consolidator)
    }
}

struct CompositeConsolidator {
    display_name: String,
    narrower: Box<Narrower>,
}

impl CompositeConsolidator {
    fn build(&self, fingerprints: &[Fingerprint]) -> anyhow::Result<Option<Fingerprint>> {
        let selected: Vec<&Fingerprint> =
            fingerprints.iter().filter(|fp| (self.narrower)(fp)).collect();
        if selected.is_empty() {
            return Ok(None);
        }
        let names = selected
            .iter()
            .map(|fp| fp.name.as_str())
            .collect::<Vec<_>>()
            .join("&");
        let types = selected
            .iter()
            .map(|fp| fp.type_name())
            .collect::<Vec<_>>()
            .join("&");
        let data = serde_json::to_value(&selected)?;
        Ok(Some(
            Fingerprint::new(
                format!("{}:{}", self.display_name, types),
                format!("{}:{}", self.display_name, names),
                data,
            )
            .with_version(COMPOSITE_VERSION),
        ))
    }
}

impl Consolidate for CompositeConsolidator {
    fn consolidate(
        &self,
        fingerprints: &[Fingerprint],
        _project: &dyn Project,
        _push: &PushContext,
    ) -> anyhow::Result<Option<Fingerprint>> {
        self.build(fingerprints)
    }
}

/// Applies each constituent fingerprint through the aspect that owns it.
///
/// Ownership is resolved for every constituent before anything is written;
/// an unowned constituent is an error. All applies then run, even after a
/// failure, and the result is `true` only if every one succeeded.
struct CompositeApplier {
    aspects: Vec<Arc<dyn Aspect>>,
}

impl Apply for CompositeApplier {
    fn apply(&self, project: &dyn Project, target: &Fingerprint) -> anyhow::Result<bool> {
        let parts: Vec<Fingerprint> =
            serde_json::from_value(target.data.clone()).map_err(|e| {
                DriftError::InvalidFingerprint {
                    name: target.name.clone(),
                    reason: format!("composite data is not a fingerprint array: {e}"),
                }
            })?;

        let mut plan: Vec<(&dyn Apply, &Fingerprint, &str)> = Vec::with_capacity(parts.len());
        for part in &parts {
            let aspect = self
                .aspects
                .iter()
                .find(|a| a.owns(part))
                .ok_or_else(|| DriftError::AspectNotFound(part.type_name().to_string()))?;
            let applier = aspect
                .applier()
                .ok_or_else(|| DriftError::ApplyUnsupported(aspect.name().to_string()))?;
            plan.push((applier, part, aspect.name()));
        }

        let mut all_ok = true;
        for (applier, part, aspect_name) in plan {
            match applier.apply(project, part) {
                Ok(true) => {}
                Ok(false) => all_ok = false,
                Err(e) => {
                    warn!(
                        aspect = aspect_name,
                        fingerprint = %part.name,
                        error = %e,
                        "constituent apply failed"
                    );
                    all_ok = false;
                }
            }
        }
        Ok(all_ok)
    }
}
