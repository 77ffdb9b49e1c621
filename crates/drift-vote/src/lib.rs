//! Diffs and votes: compares a push's fingerprints against the previous
//! commit and the team targets, collects votes from handlers and aspect
//! workflows, and reduces them to a pass/fail result.

pub mod diff;
pub mod handler;
pub mod pipeline;
pub mod tally;
pub mod target;

pub use diff::{build_diffs, group_by_type, DiffGroup};
pub use handler::FingerprintHandler;
pub use pipeline::{
    ComplianceGoal, Evaluation, FingerprintStore, GoalState, Notifier, PushEvaluator,
};
pub use tally::vote_results;
pub use target::TargetDiffHandler;
