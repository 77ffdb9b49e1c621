use std::path::Path;

use clap::Subcommand;
use drift_notify::{Channel, NotifyConfig};
use drift_store::DriftPaths;

/// Events `drift check` can raise, in the order they are listed.
const POLICY_EVENTS: [&str; 2] = ["policy_failed", "policy_passed"];

#[derive(Subcommand)]
pub enum NotifyCmd {
    /// Ping every channel in notify_channels, ignoring its event filter
    Test,
    /// List channels and the policy events each one receives
    Status,
}

pub fn run(cmd: NotifyCmd, repo_root: &Path) -> anyhow::Result<()> {
    let paths = DriftPaths::discover(repo_root);
    let config = NotifyConfig::load(&paths);
    if config.is_empty() {
        print_setup_hint();
        return Ok(());
    }
    match cmd {
        NotifyCmd::Test => ping_channels(&config),
        NotifyCmd::Status => {
            for line in channel_lines(&config) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn print_setup_hint() {
    let example = serde_json::json!([
        {"type": "ntfy", "url": "https://ntfy.sh/my-topic", "events": ["policy_failed"]}
    ]);
    println!("drift check will not notify anyone: notify_channels is empty.");
    println!("Subscribe a channel to {} with:", POLICY_EVENTS.join(" or "));
    println!("  drift config set notify_channels '{example}'");
}

fn ping_channels(config: &NotifyConfig) {
    println!("Pinging {} channel(s)", config.channels.len());
    for (name, result) in drift_notify::test_channels(config) {
        match result {
            Ok(()) => println!("  delivered  {name}"),
            Err(e) => println!("  failed     {name}: {e}"),
        }
    }
}

/// One line per channel, naming the policy events routed to it.
fn channel_lines(config: &NotifyConfig) -> Vec<String> {
    config
        .channels
        .iter()
        .map(|ch| format!("{} <- {}", ch.display_name(), routed_events(ch)))
        .collect()
}

fn routed_events(channel: &Channel) -> String {
    let events: Vec<&str> = POLICY_EVENTS
        .into_iter()
        .filter(|name| channel.events().iter().any(|e| e == name || e == "*"))
        .collect();
    if events.is_empty() {
        "no policy events".to_string()
    } else {
        events.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(channels: serde_json::Value) -> NotifyConfig {
        NotifyConfig::from_value(channels)
    }

    #[test]
    fn status_lists_routed_policy_events() {
        let c = config(serde_json::json!([
            {"type": "ntfy", "url": "https://ntfy.sh/t", "events": ["policy_failed"]},
            {"type": "webhook", "url": "https://hooks.example.com/x", "events": ["*"]},
            {"type": "webhook", "url": "https://hooks.example.com/y", "events": ["test"]}
        ]));
        assert_eq!(
            channel_lines(&c),
            vec![
                "ntfy(https://ntfy.sh/t) <- policy_failed",
                "webhook(https://hooks.example.com/x) <- policy_failed, policy_passed",
                "webhook(https://hooks.example.com/y) <- no policy events",
            ]
        );
    }

    #[test]
    fn unconfigured_repo_prints_hint_and_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        run(NotifyCmd::Status, dir.path()).unwrap();
        run(NotifyCmd::Test, dir.path()).unwrap();
    }
}
