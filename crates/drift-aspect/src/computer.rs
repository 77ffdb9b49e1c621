use crate::aspect::Aspect;
use crate::registry::AspectRegistry;
use drift_core::{Fingerprint, PushContext, VETO_TYPE};
use drift_project::{Project, VirtualProjectFinder};
use rayon::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Supplies extra aspects that only apply to a particular push.
pub trait DynamicAspects: Send + Sync {
    fn aspects_for(&self, project: &dyn Project, push: &PushContext) -> Vec<Arc<dyn Aspect>>;
}

impl<F> DynamicAspects for F
where
    F: Fn(&dyn Project, &PushContext) -> Vec<Arc<dyn Aspect>> + Send + Sync,
{
    fn aspects_for(&self, project: &dyn Project, push: &PushContext) -> Vec<Arc<dyn Aspect>> {
        self(project, push)
    }
}

/// Runs the configured aspects over a project and returns the full
/// fingerprint set for one push.
///
/// Order of work:
/// 1. append dynamic aspects to the registered ones;
/// 2. warm the virtual project finder, if any;
/// 3. run veto-capable aspects one by one; the first veto appends a
///    `veto` fingerprint and ends the computation;
/// 4. run ordinary aspects in parallel (results kept in registration order);
///    a failing aspect contributes nothing;
/// 5. run consolidators serially in configuration order, each seeing
///    everything appended so far;
/// 6. release the finder's cached detection for this project.
pub struct FingerprintComputer {
    registry: Arc<AspectRegistry>,
    finder: Option<Arc<dyn VirtualProjectFinder>>,
    dynamic: Option<Box<dyn DynamicAspects>>,
}

impl FingerprintComputer {
    pub fn new(registry: Arc<AspectRegistry>) -> Self {
        Self {
            registry,
            finder: None,
            dynamic: None,
        }
    }

    /// Finder to pre-seed before extraction. Pass the same (caching)
    /// instance the virtual-project-aware aspects use.
    pub fn with_finder(mut self, finder: Arc<dyn VirtualProjectFinder>) -> Self {
        self.finder = Some(finder);
        self
    }

    pub fn with_dynamic_aspects(mut self, dynamic: impl DynamicAspects + 'static) -> Self {
        self.dynamic = Some(Box::new(dynamic));
        self
    }

    pub fn compute(&self, project: &dyn Project, push: &PushContext) -> Vec<Fingerprint> {
        let aspects = self.aspects_for(project, push);
        self.compute_with(&aspects, project, push)
    }

    /// Registered aspects followed by this push's dynamic aspects.
    pub fn aspects_for(&self, project: &dyn Project, push: &PushContext) -> Vec<Arc<dyn Aspect>> {
        let mut aspects: Vec<Arc<dyn Aspect>> = self.registry.all().to_vec();
        if let Some(dynamic) = &self.dynamic {
            let extra = dynamic.aspects_for(project, push);
            debug!(count = extra.len(), "dynamic aspects");
            aspects.extend(extra);
        }
        aspects
    }

    /// Compute over an aspect list already resolved with [`Self::aspects_for`].
    pub fn compute_with(
        &self,
        aspects: &[Arc<dyn Aspect>],
        project: &dyn Project,
        push: &PushContext,
    ) -> Vec<Fingerprint> {
        if let Some(finder) = &self.finder {
            match finder.find(project) {
                Ok(info) => debug!(status = info.status_name(), "virtual project info"),
                Err(e) => {
                    warn!(finder = finder.name(), error = %e, "virtual project pre-seed failed")
                }
            }
        }
        let fingerprints = self.run_aspects(aspects, project, push);
        if let Some(finder) = &self.finder {
            finder.release(project);
        }
        fingerprints
    }

    fn run_aspects(
        &self,
        aspects: &[Arc<dyn Aspect>],
        project: &dyn Project,
        push: &PushContext,
    ) -> Vec<Fingerprint> {
        let (veto_aspects, ordinary): (Vec<&Arc<dyn Aspect>>, Vec<&Arc<dyn Aspect>>) =
            aspects.iter().partition(|a| a.veto().is_some());

        let mut fingerprints: Vec<Fingerprint> = Vec::new();
        for aspect in veto_aspects {
            // A failed extraction cannot veto.
            let extracted = match aspect.extract(project, push) {
                Ok(fps) => fps,
                Err(e) => {
                    warn!(
                        aspect = aspect.name(),
                        project = project.name(),
                        error = %e,
                        "fingerprint extraction failed"
                    );
                    continue;
                }
            };
            let vetoed = aspect.veto().and_then(|v| v.veto_when(&extracted));
            fingerprints.extend(extracted);
            if let Some(payload) = vetoed {
                info!(aspect = aspect.name(), "aspect vetoed fingerprinting for this push");
                fingerprints.push(veto_fingerprint(aspect.name(), payload));
                return fingerprints;
            }
        }

        let extracted: Vec<Vec<Fingerprint>> = ordinary
            .par_iter()
            .map(|aspect| extract_logged(aspect.as_ref(), project, push))
            .collect();
        fingerprints.extend(extracted.into_iter().flatten());

        for aspect in aspects {
            let Some(consolidator) = aspect.consolidator() else {
                continue;
            };
            match consolidator.consolidate(&fingerprints, project, push) {
                Ok(Some(fp)) => {
                    debug!(aspect = aspect.name(), fingerprint = %fp.name, "consolidated");
                    fingerprints.push(fp);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(aspect = aspect.name(), error = %e, "consolidation failed");
                }
            }
        }

        debug!(
            project = project.name(),
            count = fingerprints.len(),
            "computed fingerprints"
        );
        fingerprints
    }
}

fn extract_logged(
    aspect: &dyn Aspect,
    project: &dyn Project,
    push: &PushContext,
) -> Vec<Fingerprint> {
    match aspect.extract(project, push) {
        Ok(fps) => fps,
        Err(e) => {
            warn!(
                aspect = aspect.name(),
                project = project.name(),
                error = %e,
                "fingerprint extraction failed"
            );
            Vec::new()
        }
    }
}

/// Synthetic fingerprint recording a veto.
pub fn veto_fingerprint(aspect_name: &str, payload: Value) -> Fingerprint {
    Fingerprint::new(
        VETO_TYPE,
        aspect_name,
        json!({ "aspect": aspect_name, "veto": payload }),
    )
}
