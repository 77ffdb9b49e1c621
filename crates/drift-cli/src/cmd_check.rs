use crate::config::load_setup;
use crate::context::{open_project, repo_name, require_workspace};
use drift_core::{PushContext, Vote};
use drift_notify::{ChannelNotifier, NotifyConfig};
use drift_store::{FileGoalRecorder, FileStore};
use drift_vote::{Evaluation, PushEvaluator, TargetDiffHandler};
use std::path::Path;
use std::sync::Arc;

pub struct CheckParams<'a> {
    pub repo_root: &'a Path,
    pub path: Option<&'a Path>,
    pub sha: &'a str,
    pub previous: Option<&'a str>,
    pub branch: &'a str,
    pub owner: &'a str,
    pub repo: Option<&'a str>,
    pub provider_id: Option<&'a str>,
    pub json: bool,
}

impl CheckParams<'_> {
    fn push(&self) -> PushContext {
        let repo = self
            .repo
            .map(str::to_string)
            .unwrap_or_else(|| repo_name(self.repo_root));
        PushContext {
            previous_sha: self.previous.map(str::to_string),
            provider_id: self.provider_id.filter(|p| !p.is_empty()).map(str::to_string),
            ..PushContext::new(self.owner, &repo, self.sha, self.branch)
        }
    }
}

/// `drift check`: evaluate the working tree as push `--sha`.
/// Returns whether the push passed.
pub fn execute(params: &CheckParams) -> anyhow::Result<bool> {
    let paths = require_workspace(params.repo_root)?;
    let (config, setup) = load_setup(&paths)?;
    let project = open_project(params.repo_root, params.path)?;

    let store = Arc::new(FileStore::new(paths.clone()));
    let mut evaluator = PushEvaluator::new(setup.computer(), store)
        .with_handler(Arc::new(TargetDiffHandler::new()));
    let notify = NotifyConfig::load(&paths);
    if !notify.is_empty() {
        evaluator = evaluator.with_notifier(Arc::new(ChannelNotifier::new(notify)));
    }
    if config.compliance_goal {
        evaluator = evaluator.with_compliance_goal(Arc::new(FileGoalRecorder::new(paths.clone())));
    }

    let evaluation = evaluator.evaluate(&project, &params.push());
    if params.json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
    } else {
        print_report(&evaluation);
    }
    Ok(!evaluation.failed())
}

fn print_report(evaluation: &Evaluation) {
    println!("{} fingerprint(s) computed", evaluation.fingerprints.len());
    if let Some(reason) = &evaluation.skipped {
        println!("Target comparison skipped: {reason}");
        return;
    }
    let Some(results) = &evaluation.results else {
        return;
    };
    let changed = evaluation.diffs.iter().filter(|d| d.changed()).count();
    let off_target = evaluation.diffs.iter().filter(|d| d.off_target()).count();
    println!(
        "{} diff(s): {changed} changed since the previous commit, {off_target} off target",
        evaluation.diffs.len()
    );
    let abstained = evaluation.votes.iter().filter(|v| v.abstain).count();
    if results.failed {
        println!("FAILED: {} fingerprint(s) off target", results.failed_fps.len());
        for vote in evaluation.votes.iter().filter(|v| v.is_failing()) {
            print_failing(vote);
        }
    } else {
        println!(
            "PASSED: {} on target, {} abstained",
            results.success_fps.len(),
            abstained
        );
    }
}

fn print_failing(vote: &Vote) {
    let name = vote.fingerprint_name().unwrap_or("(unnamed)");
    match &vote.summary {
        Some(summary) => {
            println!("  - {name}: {}", summary.title);
            println!("      {}", summary.description);
        }
        None => println!("  - {name}"),
    }
}
