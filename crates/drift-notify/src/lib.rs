use std::time::Duration;

use drift_core::{PushContext, Vote, VoteResults};
use drift_store::DriftPaths;
use serde::Deserialize;
use tracing::{debug, warn};

// ── Config ──

/// Notification channel configuration, stored in `.drift/config.json` under key `notify_channels`.
#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "type")]
pub enum Channel {
    #[serde(rename = "ntfy")]
    Ntfy { url: String, events: Vec<String> },
    #[serde(rename = "webhook")]
    Webhook { url: String, events: Vec<String> },
}

impl Channel {
    /// Event names this channel subscribes to; `*` means every event.
    pub fn events(&self) -> &[String] {
        match self {
            Channel::Ntfy { events, .. } => events,
            Channel::Webhook { events, .. } => events,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Channel::Ntfy { url, .. } => format!("ntfy({})", url),
            Channel::Webhook { url, .. } => format!("webhook({})", url),
        }
    }

    fn matches(&self, event: &NotifyEvent) -> bool {
        let name = event.event_name();
        self.events().iter().any(|e| e == name || e == "*")
    }
}

/// Top-level notify configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct NotifyConfig {
    pub channels: Vec<Channel>,
}

impl NotifyConfig {
    /// Load from `.drift/config.json` key `notify_channels`.
    /// Returns empty config if key is missing or unparseable.
    pub fn load(paths: &DriftPaths) -> Self {
        let content = match std::fs::read_to_string(&paths.config_json) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };
        let val: serde_json::Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "config.json is not valid JSON; notifications disabled");
                return Self::default();
            }
        };
        match val.get("notify_channels") {
            Some(v) => Self::from_value(v.clone()),
            None => Self::default(),
        }
    }

    pub fn from_value(channels: serde_json::Value) -> Self {
        match serde_json::from_value(channels) {
            Ok(channels) => Self { channels },
            Err(e) => {
                warn!(error = %e, "invalid notify_channels; notifications disabled");
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

// ── Notification Events ──

/// Notification events raised by push evaluation.
pub enum NotifyEvent {
    PolicyFailed {
        repo: String,
        branch: String,
        sha: String,
        failed: Vec<String>,
        /// `(title, description)` of every failing vote.
        summaries: Vec<(String, String)>,
    },
    PolicyPassed {
        repo: String,
        branch: String,
        sha: String,
        passed: usize,
    },
    Test,
}

impl NotifyEvent {
    pub fn failed(results: &VoteResults, failing: &[Vote], push: &PushContext) -> Self {
        NotifyEvent::PolicyFailed {
            repo: push.slug(),
            branch: push.branch.clone(),
            sha: push.sha.clone(),
            failed: results.failed_fps.clone(),
            summaries: failing
                .iter()
                .filter_map(|v| v.summary.as_ref())
                .map(|s| (s.title.clone(), s.description.clone()))
                .collect(),
        }
    }

    pub fn passed(results: &VoteResults, push: &PushContext) -> Self {
        NotifyEvent::PolicyPassed {
            repo: push.slug(),
            branch: push.branch.clone(),
            sha: push.sha.clone(),
            passed: results.success_fps.len(),
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            NotifyEvent::PolicyFailed { .. } => "policy_failed",
            NotifyEvent::PolicyPassed { .. } => "policy_passed",
            NotifyEvent::Test => "test",
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            NotifyEvent::PolicyFailed {
                repo,
                branch,
                sha,
                failed,
                summaries,
            } => serde_json::json!({
                "repo": repo,
                "branch": branch,
                "sha": sha,
                "failed": failed,
                "summaries": summaries
                    .iter()
                    .map(|(title, description)| {
                        serde_json::json!({"title": title, "description": description})
                    })
                    .collect::<Vec<_>>(),
            }),
            NotifyEvent::PolicyPassed {
                repo,
                branch,
                sha,
                passed,
            } => serde_json::json!({
                "repo": repo,
                "branch": branch,
                "sha": sha,
                "passed": passed,
            }),
            NotifyEvent::Test => serde_json::json!({
                "message": "drift notify test: if you see this, notifications are working",
            }),
        }
    }
}

// ── Dispatch ──

const TIMEOUT: Duration = Duration::from_secs(5);

/// Send notifications to all channels matching this event.
/// Errors are logged but never propagated.
pub fn dispatch(config: &NotifyConfig, event: &NotifyEvent) {
    for channel in &config.channels {
        if !channel.matches(event) {
            continue;
        }
        let name = channel.display_name();
        match send(channel, event) {
            Ok(()) => debug!(channel = %name, event = event.event_name(), "notification sent"),
            Err(e) => warn!(channel = %name, error = %e, "notification failed"),
        }
    }
}

/// Send a test notification to all configured channels.
/// Returns per-channel results for CLI display.
pub fn test_channels(config: &NotifyConfig) -> Vec<(String, Result<(), String>)> {
    config
        .channels
        .iter()
        .map(|ch| {
            let name = ch.display_name();
            let result = send(ch, &NotifyEvent::Test).map_err(|e| e.to_string());
            (name, result)
        })
        .collect()
}

fn send(channel: &Channel, event: &NotifyEvent) -> anyhow::Result<()> {
    match channel {
        Channel::Ntfy { url, .. } => send_ntfy(url, event),
        Channel::Webhook { url, .. } => send_webhook(url, event),
    }
}

fn agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(TIMEOUT))
        .build()
        .new_agent()
}

// ── ntfy ──

fn send_ntfy(url: &str, event: &NotifyEvent) -> anyhow::Result<()> {
    let (title, body, priority) = format_ntfy(event);
    agent()
        .post(url)
        .header("Title", &title)
        .header("Priority", &priority)
        .send(&body)?;
    Ok(())
}

fn format_ntfy(event: &NotifyEvent) -> (String, String, String) {
    match event {
        NotifyEvent::PolicyFailed {
            repo,
            branch,
            sha,
            failed,
            summaries,
        } => {
            let mut body = format!("{repo}@{branch} ({sha}) is off target: {}", failed.join(", "));
            for (title, description) in summaries {
                body.push_str(&format!("\n- {title}: {description}"));
            }
            (
                format!("Policy failed: {repo}"),
                body,
                "high".to_string(),
            )
        }
        NotifyEvent::PolicyPassed {
            repo,
            branch,
            sha,
            passed,
        } => (
            format!("Policy passed: {repo}"),
            format!("{repo}@{branch} ({sha}): {passed} fingerprint(s) on target"),
            "low".to_string(),
        ),
        NotifyEvent::Test => (
            "drift notify test".to_string(),
            "If you see this, notifications are working.".to_string(),
            "default".to_string(),
        ),
    }
}

// ── Webhook (generic JSON POST) ──

fn send_webhook(url: &str, event: &NotifyEvent) -> anyhow::Result<()> {
    let payload = format_webhook(event);
    agent()
        .post(url)
        .header("Content-Type", "application/json")
        .send(payload.to_string())?;
    Ok(())
}

fn format_webhook(event: &NotifyEvent) -> serde_json::Value {
    serde_json::json!({
        "event_type": event.event_name(),
        "data": event.to_json(),
    })
}

// ── Notifier ──

/// Pipeline notifier dispatching to configured channels.
pub struct ChannelNotifier {
    config: NotifyConfig,
}

impl ChannelNotifier {
    pub fn new(config: NotifyConfig) -> Self {
        Self { config }
    }
}

impl drift_vote::Notifier for ChannelNotifier {
    fn send_notification(
        &self,
        results: &VoteResults,
        failing: &[Vote],
        push: &PushContext,
    ) -> anyhow::Result<()> {
        dispatch(&self.config, &NotifyEvent::failed(results, failing, push));
        Ok(())
    }

    fn passed(&self, results: &VoteResults, push: &PushContext) -> anyhow::Result<()> {
        dispatch(&self.config, &NotifyEvent::passed(results, push));
        Ok(())
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::{Diff, Fingerprint, VoteSummary};

    fn failing_vote() -> Vote {
        let diff = Diff::new(
            Some(Fingerprint::new("npm", "lodash", serde_json::json!(1))),
            Fingerprint::new("npm", "lodash", serde_json::json!(2)),
            Some(Fingerprint::new("npm", "lodash", serde_json::json!(3))),
            &PushContext::default(),
        );
        Vote::against(
            &diff,
            VoteSummary {
                title: "lodash drift".into(),
                description: "2 is not 3".into(),
            },
        )
    }

    fn push() -> PushContext {
        PushContext::new("acme", "web", "abc123", "main")
    }

    #[test]
    fn config_deserialize_all_types() {
        let json = r#"[
            {"type":"ntfy","url":"https://ntfy.sh/t","events":["policy_failed"]},
            {"type":"webhook","url":"https://hooks.example.com/x","events":["*"]}
        ]"#;
        let channels: Vec<Channel> = serde_json::from_str(json).unwrap();
        assert_eq!(channels.len(), 2);
        assert!(matches!(&channels[0], Channel::Ntfy { url, .. } if url == "https://ntfy.sh/t"));
        assert!(matches!(&channels[1], Channel::Webhook { .. }));
    }

    #[test]
    fn config_load_missing_file() {
        let paths = DriftPaths::discover(std::path::Path::new("/nonexistent"));
        assert!(NotifyConfig::load(&paths).is_empty());
    }

    #[test]
    fn config_load_from_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = DriftPaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        std::fs::write(
            &paths.config_json,
            r#"{"notify_channels":[{"type":"ntfy","url":"https://ntfy.sh/x","events":["*"]}]}"#,
        )
        .unwrap();
        assert_eq!(NotifyConfig::load(&paths).channels.len(), 1);
    }

    #[test]
    fn invalid_channels_disable_notifications() {
        let config = NotifyConfig::from_value(serde_json::json!([{"type": "carrier-pigeon"}]));
        assert!(config.is_empty());
    }

    #[test]
    fn event_matches_channel() {
        let ch: Channel = serde_json::from_value(serde_json::json!({
            "type": "ntfy",
            "url": "https://ntfy.sh/test",
            "events": ["policy_failed"]
        }))
        .unwrap();
        let results = VoteResults {
            failed: true,
            failed_fps: vec!["lodash".into()],
            ..Default::default()
        };
        assert!(ch.matches(&NotifyEvent::failed(&results, &[failing_vote()], &push())));
        assert!(!ch.matches(&NotifyEvent::passed(&results, &push())));

        let wildcard: Channel = serde_json::from_value(serde_json::json!({
            "type": "webhook", "url": "https://x", "events": ["*"]
        }))
        .unwrap();
        assert!(wildcard.matches(&NotifyEvent::passed(&results, &push())));
    }

    #[test]
    fn failure_message_lists_fingerprints_and_summaries() {
        let results = VoteResults {
            failed: true,
            failed_fps: vec!["lodash".into()],
            ..Default::default()
        };
        let event = NotifyEvent::failed(&results, &[failing_vote()], &push());
        let (title, body, priority) = format_ntfy(&event);
        assert_eq!(title, "Policy failed: acme/web");
        assert!(body.contains("main"));
        assert!(body.contains("abc123"));
        assert!(body.contains("lodash"));
        assert!(body.contains("2 is not 3"));
        assert_eq!(priority, "high");

        let payload = format_webhook(&event);
        assert_eq!(payload["event_type"], "policy_failed");
        assert_eq!(payload["data"]["summaries"][0]["title"], "lodash drift");
    }

    #[test]
    fn dispatch_without_channels_is_a_noop() {
        let results = VoteResults::default();
        dispatch(&NotifyConfig::default(), &NotifyEvent::passed(&results, &push()));
        assert!(test_channels(&NotifyConfig::default()).is_empty());
    }
}
