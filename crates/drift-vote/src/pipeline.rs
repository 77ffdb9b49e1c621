use crate::diff::{build_diffs, group_by_type, DiffGroup};
use crate::handler::FingerprintHandler;
use crate::tally::vote_results;
use drift_aspect::{Aspect, FingerprintComputer};
use drift_core::{Diff, Fingerprint, PushContext, Vote, VoteResults};
use drift_project::Project;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ── Collaborators ──

/// Where fingerprint sets and team targets live.
pub trait FingerprintStore: Send + Sync {
    /// Fingerprints published for `commit_sha`, keyed by `type::name`.
    /// Empty when the commit was never published.
    fn previous_fingerprints(
        &self,
        commit_sha: &str,
    ) -> anyhow::Result<HashMap<String, Fingerprint>>;

    /// Team targets keyed by `type::name`.
    fn targets(&self) -> anyhow::Result<HashMap<String, Fingerprint>>;

    fn publish(
        &self,
        push: &PushContext,
        aspects: &[&str],
        fingerprints: &[Fingerprint],
        previous: &HashMap<String, Fingerprint>,
    ) -> anyhow::Result<()>;
}

/// Outbound message channel for evaluation results.
pub trait Notifier: Send + Sync {
    /// Called when the push failed, with every failing vote.
    fn send_notification(
        &self,
        results: &VoteResults,
        failing: &[Vote],
        push: &PushContext,
    ) -> anyhow::Result<()>;

    /// Called when the push passed.
    fn passed(&self, _results: &VoteResults, _push: &PushContext) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GoalState {
    Success,
    Failure,
}

impl GoalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalState::Success => "success",
            GoalState::Failure => "failure",
        }
    }
}

/// Optional compliance goal updated after every evaluated push.
pub trait ComplianceGoal: Send + Sync {
    fn update(
        &self,
        push: &PushContext,
        state: GoalState,
        description: &str,
    ) -> anyhow::Result<()>;
}

// ── Evaluation ──

/// Everything produced for one push.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Evaluation {
    pub fingerprints: Vec<Fingerprint>,
    pub diffs: Vec<Diff>,
    pub votes: Vec<Vote>,
    /// Absent when the diff/vote phase was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<VoteResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl Evaluation {
    pub fn failed(&self) -> bool {
        self.results.as_ref().is_some_and(|r| r.failed)
    }
}

/// Evaluates pushes: compute, publish, diff, vote, tally, report.
///
/// Collaborator failures are logged and degrade the evaluation (an
/// unreadable store means no previous fingerprints and no targets); they
/// never abort it.
pub struct PushEvaluator {
    computer: FingerprintComputer,
    store: Arc<dyn FingerprintStore>,
    handlers: Vec<Arc<dyn FingerprintHandler>>,
    notifier: Option<Arc<dyn Notifier>>,
    goal: Option<Arc<dyn ComplianceGoal>>,
}

impl PushEvaluator {
    pub fn new(computer: FingerprintComputer, store: Arc<dyn FingerprintStore>) -> Self {
        Self {
            computer,
            store,
            handlers: Vec::new(),
            notifier: None,
            goal: None,
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn FingerprintHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_compliance_goal(mut self, goal: Arc<dyn ComplianceGoal>) -> Self {
        self.goal = Some(goal);
        self
    }

    pub fn evaluate(&self, project: &dyn Project, push: &PushContext) -> Evaluation {
        // One resolution per push: the vote phase must see the same dynamic
        // aspects the computation ran.
        let aspects = self.computer.aspects_for(project, push);
        let fingerprints = self.computer.compute_with(&aspects, project, push);

        let previous = match &push.previous_sha {
            Some(sha) => self.store.previous_fingerprints(sha).unwrap_or_else(|e| {
                warn!(commit = %sha, error = %e, "previous fingerprint lookup failed");
                HashMap::new()
            }),
            None => HashMap::new(),
        };

        let names: Vec<&str> = aspects.iter().map(|a| a.name()).collect();
        if let Err(e) = self.store.publish(push, &names, &fingerprints, &previous) {
            warn!(sha = %push.sha, error = %e, "publishing fingerprints failed");
        }

        if push.provider_id.is_none() {
            info!(
                repo = %push.slug(),
                sha = %push.sha,
                "no provider id; skipping target comparison"
            );
            return Evaluation {
                fingerprints,
                skipped: Some("missing provider id".to_string()),
                ..Default::default()
            };
        }

        let targets = self.store.targets().unwrap_or_else(|e| {
            warn!(error = %e, "target lookup failed");
            HashMap::new()
        });

        let diffs = build_diffs(&fingerprints, &previous, &targets, push);
        let groups = group_by_type(diffs.clone());
        let votes = self.collect_votes(&aspects, &groups);
        let results = vote_results(&votes);
        debug!(
            votes = votes.len(),
            failed = results.failed,
            "tallied votes"
        );

        self.report(&results, &votes, push);

        Evaluation {
            fingerprints,
            diffs,
            votes,
            results: Some(results),
            skipped: None,
        }
    }

    /// Votes from every group; groups run in parallel, output keeps group order.
    fn collect_votes(&self, aspects: &[Arc<dyn Aspect>], groups: &[DiffGroup]) -> Vec<Vote> {
        let per_group: Vec<Vec<Vote>> = groups
            .par_iter()
            .map(|g| self.group_votes(aspects, g))
            .collect();
        per_group.into_iter().flatten().collect()
    }

    fn group_votes(&self, aspects: &[Arc<dyn Aspect>], group: &DiffGroup) -> Vec<Vote> {
        let Some(representative) = group.representative() else {
            return Vec::new();
        };
        let aspect: Option<&dyn Aspect> = aspects
            .iter()
            .find(|a| a.name() == group.fp_type)
            .or_else(|| aspects.iter().find(|a| a.owns(representative)))
            .map(|a| a.as_ref());

        let mut votes = Vec::new();
        let fingerprints = group.fingerprints();
        for handler in self.handlers.iter().filter(|h| h.selects(representative)) {
            match handler.diff_handler(aspect, &group.diffs) {
                Ok(v) => votes.extend(v),
                Err(e) => warn!(
                    handler = handler.name(),
                    fp_type = %group.fp_type,
                    error = %e,
                    "diff handler failed"
                ),
            }
            match handler.handler(aspect, &fingerprints) {
                Ok(v) => votes.extend(v),
                Err(e) => warn!(
                    handler = handler.name(),
                    fp_type = %group.fp_type,
                    error = %e,
                    "fingerprint handler failed"
                ),
            }
        }

        if let Some(aspect) = aspect {
            for workflow in aspect.workflows() {
                match workflow.run(aspect, &group.diffs) {
                    Ok(v) => votes.extend(v),
                    Err(e) => warn!(
                        workflow = workflow.name(),
                        aspect = aspect.name(),
                        error = %e,
                        "workflow failed"
                    ),
                }
            }
        }
        votes
    }

    fn report(&self, results: &VoteResults, votes: &[Vote], push: &PushContext) {
        if results.failed {
            let failing: Vec<Vote> = votes.iter().filter(|v| v.is_failing()).cloned().collect();
            if let Some(notifier) = &self.notifier {
                if let Err(e) = notifier.send_notification(results, &failing, push) {
                    warn!(error = %e, "failure notification failed");
                }
            }
            self.update_goal(
                push,
                GoalState::Failure,
                &format!("off target: {}", results.failed_fps.join(", ")),
            );
        } else {
            if let Some(notifier) = &self.notifier {
                if let Err(e) = notifier.passed(results, push) {
                    warn!(error = %e, "pass notification failed");
                }
            }
            self.update_goal(push, GoalState::Success, "all fingerprints on target");
        }
    }

    fn update_goal(&self, push: &PushContext, state: GoalState, description: &str) {
        if let Some(goal) = &self.goal {
            if let Err(e) = goal.update(push, state, description) {
                warn!(state = state.as_str(), error = %e, "compliance goal update failed");
            }
        }
    }
}
