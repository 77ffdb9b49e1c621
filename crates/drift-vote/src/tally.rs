use drift_core::{Vote, VoteResults};

/// Reduce every vote cast for a push.
///
/// The push fails when any non-abstaining vote is not `For`. Abstentions
/// appear in neither list. Pure: the same votes always give the same result.
pub fn vote_results(votes: &[Vote]) -> VoteResults {
    let mut results = VoteResults {
        diff: votes.iter().find_map(|v| v.diff.clone()),
        ..Default::default()
    };
    for vote in votes {
        if vote.is_failing() {
            results.failed = true;
            if let Some(name) = vote.fingerprint_name() {
                results.failed_fps.push(name.to_string());
            }
        } else if vote.is_passing() {
            if let Some(name) = vote.fingerprint_name() {
                results.success_fps.push(name.to_string());
            }
        }
    }
    results
}
