use crate::aspect::{Apply, Aspect, Consolidate, Summarize, Veto, Workflow};
use drift_core::{normalize_path, DriftError, Fingerprint, PushContext};
use drift_project::{Project, VirtualProjectFinder, VirtualProjectInfo};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs an aspect once per virtual project.
///
/// Without identified virtual projects the inner aspect sees the whole
/// project and its fingerprints are returned untouched. Otherwise each
/// virtual project is extracted independently (in parallel) and every
/// resulting fingerprint is placed in that project: its path is recorded
/// and prefixed to its name, so `moduleA/build.gradle` and
/// `moduleB/build.gradle` are distinct entities.
pub struct VirtualProjectAspect {
    inner: Arc<dyn Aspect>,
    finder: Arc<dyn VirtualProjectFinder>,
    applier: Option<VirtualProjectApplier>,
}

impl VirtualProjectAspect {
    pub fn new(inner: Arc<dyn Aspect>, finder: Arc<dyn VirtualProjectFinder>) -> Self {
        let applier = inner.applier().is_some().then(|| VirtualProjectApplier {
            inner: Arc::clone(&inner),
            finder: Arc::clone(&finder),
        });
        Self {
            inner,
            finder,
            applier,
        }
    }
}

/// Sub-project paths to visit; `None` stands for the whole project.
fn target_paths(finder: &dyn VirtualProjectFinder, project: &dyn Project) -> Vec<Option<String>> {
    let info = match finder.find(project) {
        Ok(info) => info,
        Err(e) => {
            warn!(
                finder = finder.name(),
                error = %e,
                "virtual project detection failed; using whole project"
            );
            VirtualProjectInfo::Unknown
        }
    };
    let vps = info.virtual_projects();
    if vps.is_empty() {
        return vec![None];
    }
    vps.iter().map(|vp| normalize_path(Some(&vp.path))).collect()
}

fn view_of(project: &dyn Project, path: Option<&str>) -> anyhow::Result<Option<Arc<dyn Project>>> {
    match path {
        Some(p) => Ok(Some(project.sub_project(p)?)),
        None => Ok(None),
    }
}

impl Aspect for VirtualProjectAspect {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn display_name(&self) -> &str {
        self.inner.display_name()
    }

    fn extract(
        &self,
        project: &dyn Project,
        push: &PushContext,
    ) -> anyhow::Result<Vec<Fingerprint>> {
        let paths = target_paths(self.finder.as_ref(), project);
        if paths.len() == 1 && paths[0].is_none() {
            return self.inner.extract(project, push);
        }

        let per_project: Vec<Vec<Fingerprint>> = paths
            .par_iter()
            .map(|path| {
                let extracted = view_of(project, path.as_deref()).and_then(|view| match &view {
                    Some(v) => self.inner.extract(v.as_ref(), push),
                    None => self.inner.extract(project, push),
                });
                match extracted {
                    Ok(fps) => fps
                        .into_iter()
                        .map(|fp| fp.in_virtual_project(path.as_deref()))
                        .collect(),
                    Err(e) => {
                        warn!(
                            aspect = self.inner.name(),
                            path = path.as_deref().unwrap_or("."),
                            error = %e,
                            "extraction failed for virtual project"
                        );
                        Vec::new()
                    }
                }
            })
            .collect();

        let fingerprints: Vec<Fingerprint> = per_project
            .into_iter()
            .filter(|fps| !fps.is_empty())
            .flatten()
            .collect();
        debug!(
            aspect = self.inner.name(),
            projects = paths.len(),
            fingerprints = fingerprints.len(),
            "extracted across virtual projects"
        );
        Ok(fingerprints)
    }

    fn owns(&self, fp: &Fingerprint) -> bool {
        self.inner.owns(fp)
    }

    fn applier(&self) -> Option<&dyn Apply> {
        self.applier.as_ref().map(|a| a as &dyn Apply)
    }

    fn consolidator(&self) -> Option<&dyn Consolidate> {
        self.inner.consolidator()
    }

    fn summarizer(&self) -> Option<&dyn Summarize> {
        self.inner.summarizer()
    }

    fn veto(&self) -> Option<&dyn Veto> {
        self.inner.veto()
    }

    fn workflows(&self) -> &[Arc<dyn Workflow>] {
        self.inner.workflows()
    }
}

/// Applies a target to the virtual projects it concerns.
///
/// A target placed in a virtual project is applied there only, seen from
/// inside that project. A target without a path goes to every virtual
/// project (or the whole project). Every invocation runs even after a
/// failure; earlier successes are not rolled back. The result is `true`
/// only if all invocations succeeded.
struct VirtualProjectApplier {
    inner: Arc<dyn Aspect>,
    finder: Arc<dyn VirtualProjectFinder>,
}

impl Apply for VirtualProjectApplier {
    fn apply(&self, project: &dyn Project, target: &Fingerprint) -> anyhow::Result<bool> {
        let base = self
            .inner
            .applier()
            .ok_or_else(|| DriftError::ApplyUnsupported(self.inner.name().to_string()))?;
        let paths = match normalize_path(target.path.as_deref()) {
            Some(own) => vec![Some(own)],
            None => target_paths(self.finder.as_ref(), project),
        };
        let local = target.local_to_virtual_project();
        let mut all_ok = true;
        for path in paths {
            let outcome = view_of(project, path.as_deref()).and_then(|view| match &view {
                Some(v) => base.apply(v.as_ref(), &local),
                None => base.apply(project, &local),
            });
            match outcome {
                Ok(true) => {}
                Ok(false) => {
                    debug!(
                        aspect = self.inner.name(),
                        path = path.as_deref().unwrap_or("."),
                        "apply reported failure"
                    );
                    all_ok = false;
                }
                Err(e) => {
                    warn!(
                        aspect = self.inner.name(),
                        path = path.as_deref().unwrap_or("."),
                        error = %e,
                        "apply failed"
                    );
                    all_ok = false;
                }
            }
        }
        Ok(all_ok)
    }
}
