use drift_core::{Diff, Fingerprint, PushContext, Vote, VoteSummary};
use drift_project::Project;
use serde_json::Value;
use std::sync::Arc;

// ── Capabilities ──

/// Writes a target fingerprint back onto a project. `Ok(false)` means the
/// apply ran but did not succeed.
pub trait Apply: Send + Sync {
    fn apply(&self, project: &dyn Project, target: &Fingerprint) -> anyhow::Result<bool>;
}

/// Merges already-extracted fingerprints into one composite. `Ok(None)`
/// means nothing to emit.
pub trait Consolidate: Send + Sync {
    fn consolidate(
        &self,
        fingerprints: &[Fingerprint],
        project: &dyn Project,
        push: &PushContext,
    ) -> anyhow::Result<Option<Fingerprint>>;
}

/// Renders a diff for humans.
pub trait Summarize: Send + Sync {
    fn summary(&self, diff: &Diff, target: Option<&Fingerprint>) -> VoteSummary;
}

/// Aborts fingerprinting of the whole push when it returns a payload.
pub trait Veto: Send + Sync {
    fn veto_when(&self, fingerprints: &[Fingerprint]) -> Option<Value>;
}

/// Aspect-owned follow-up run over the diffs of the aspect's fingerprints.
pub trait Workflow: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, aspect: &dyn Aspect, diffs: &[Diff]) -> anyhow::Result<Vec<Vote>>;
}

impl<F> Apply for F
where
    F: Fn(&dyn Project, &Fingerprint) -> anyhow::Result<bool> + Send + Sync,
{
    fn apply(&self, project: &dyn Project, target: &Fingerprint) -> anyhow::Result<bool> {
        self(project, target)
    }
}

impl<F> Consolidate for F
where
    F: Fn(&[Fingerprint], &dyn Project, &PushContext) -> anyhow::Result<Option<Fingerprint>>
        + Send
        + Sync,
{
    fn consolidate(
        &self,
        fingerprints: &[Fingerprint],
        project: &dyn Project,
        push: &PushContext,
    ) -> anyhow::Result<Option<Fingerprint>> {
        self(fingerprints, project, push)
    }
}

impl<F> Summarize for F
where
    F: Fn(&Diff, Option<&Fingerprint>) -> VoteSummary + Send + Sync,
{
    fn summary(&self, diff: &Diff, target: Option<&Fingerprint>) -> VoteSummary {
        self(diff, target)
    }
}

impl<F> Veto for F
where
    F: Fn(&[Fingerprint]) -> Option<Value> + Send + Sync,
{
    fn veto_when(&self, fingerprints: &[Fingerprint]) -> Option<Value> {
        self(fingerprints)
    }
}

// ── Aspect ──

/// A category of fingerprint: how to extract it and, optionally, how to
/// apply, consolidate, summarize, veto and follow up on it.
///
/// Optional capabilities are exposed through accessors returning `None`
/// by default; check them with [`has_apply`], [`has_consolidate`] and
/// [`has_veto`] rather than probing implementations.
pub trait Aspect: Send + Sync {
    fn name(&self) -> &str;

    fn display_name(&self) -> &str {
        self.name()
    }

    fn extract(&self, project: &dyn Project, push: &PushContext)
        -> anyhow::Result<Vec<Fingerprint>>;

    /// Whether `fp` belongs to this aspect. Defaults to `type == name`.
    fn owns(&self, fp: &Fingerprint) -> bool {
        fp.fp_type.as_deref() == Some(self.name())
    }

    fn applier(&self) -> Option<&dyn Apply> {
        None
    }

    fn consolidator(&self) -> Option<&dyn Consolidate> {
        None
    }

    fn summarizer(&self) -> Option<&dyn Summarize> {
        None
    }

    fn veto(&self) -> Option<&dyn Veto> {
        None
    }

    fn workflows(&self) -> &[Arc<dyn Workflow>] {
        &[]
    }
}

pub fn has_apply(aspect: &dyn Aspect) -> bool {
    aspect.applier().is_some()
}

pub fn has_consolidate(aspect: &dyn Aspect) -> bool {
    aspect.consolidator().is_some()
}

pub fn has_veto(aspect: &dyn Aspect) -> bool {
    aspect.veto().is_some()
}

/// Generic "from X to Y" summary used when an aspect has no summarizer.
pub fn default_summary(aspect_display: &str, diff: &Diff) -> VoteSummary {
    let from = diff
        .from
        .as_ref()
        .map(Fingerprint::display_value)
        .unwrap_or_else(|| "(none)".to_string());
    let to = diff.to.display_value();
    let target = diff
        .target
        .as_ref()
        .map(Fingerprint::display_value)
        .unwrap_or_else(|| "(none)".to_string());
    VoteSummary {
        title: format!("New {aspect_display} policy: {}", diff.to.name),
        description: format!(
            "{} changed from {from} to {to} in {}/{} (target {target})",
            diff.to.name, diff.owner, diff.repo
        ),
    }
}

/// Summary through the aspect's summarizer, falling back to [`default_summary`].
pub fn summarize(aspect: Option<&dyn Aspect>, diff: &Diff) -> VoteSummary {
    match aspect {
        Some(a) => match a.summarizer() {
            Some(s) => s.summary(diff, diff.target.as_ref()),
            None => default_summary(a.display_name(), diff),
        },
        None => default_summary(diff.to.type_name(), diff),
    }
}

// ── SimpleAspect ──

type ExtractFn =
    dyn Fn(&dyn Project, &PushContext) -> anyhow::Result<Vec<Fingerprint>> + Send + Sync;

/// Aspect assembled from closures.
pub struct SimpleAspect {
    name: String,
    display_name: String,
    extract: Box<ExtractFn>,
    apply: Option<Box<dyn Apply>>,
    consolidate: Option<Box<dyn Consolidate>>,
    summary: Option<Box<dyn Summarize>>,
    veto: Option<Box<dyn Veto>>,
    workflows: Vec<Arc<dyn Workflow>>,
}

impl SimpleAspect {
    pub fn new<F>(name: &str, extract: F) -> Self
    where
        F: Fn(&dyn Project, &PushContext) -> anyhow::Result<Vec<Fingerprint>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.to_string(),
            display_name: name.to_string(),
            extract: Box::new(extract),
            apply: None,
            consolidate: None,
            summary: None,
            veto: None,
            workflows: Vec::new(),
        }
    }

    /// Aspect that only consolidates; its extractor returns nothing.
    pub fn consolidating<F>(name: &str, consolidate: F) -> Self
    where
        F: Fn(&[Fingerprint], &dyn Project, &PushContext) -> anyhow::Result<Option<Fingerprint>>
            + Send
            + Sync
            + 'static,
    {
        Self::new(name, |_, _| Ok(Vec::new())).with_consolidate(consolidate)
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = display_name.to_string();
        self
    }

    pub fn with_apply<F>(mut self, apply: F) -> Self
    where
        F: Fn(&dyn Project, &Fingerprint) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.apply = Some(Box::new(apply));
        self
    }

    pub fn with_consolidate<F>(mut self, consolidate: F) -> Self
    where
        F: Fn(&[Fingerprint], &dyn Project, &PushContext) -> anyhow::Result<Option<Fingerprint>>
            + Send
            + Sync
            + 'static,
    {
        self.consolidate = Some(Box::new(consolidate));
        self
    }

    pub fn with_summary<F>(mut self, summary: F) -> Self
    where
        F: Fn(&Diff, Option<&Fingerprint>) -> VoteSummary + Send + Sync + 'static,
    {
        self.summary = Some(Box::new(summary));
        self
    }

    pub fn with_veto<F>(mut self, veto: F) -> Self
    where
        F: Fn(&[Fingerprint]) -> Option<Value> + Send + Sync + 'static,
    {
        self.veto = Some(Box::new(veto));
        self
    }

    pub fn with_workflow(mut self, workflow: Arc<dyn Workflow>) -> Self {
        self.workflows.push(workflow);
        self
    }
}

impl Aspect for SimpleAspect {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn extract(
        &self,
        project: &dyn Project,
        push: &PushContext,
    ) -> anyhow::Result<Vec<Fingerprint>> {
        (self.extract)(project, push)
    }

    fn applier(&self) -> Option<&dyn Apply> {
        self.apply.as_deref()
    }

    fn consolidator(&self) -> Option<&dyn Consolidate> {
        self.consolidate.as_deref()
    }

    fn summarizer(&self) -> Option<&dyn Summarize> {
        self.summary.as_deref()
    }

    fn veto(&self) -> Option<&dyn Veto> {
        self.veto.as_deref()
    }

    fn workflows(&self) -> &[Arc<dyn Workflow>] {
        &self.workflows
    }
}
