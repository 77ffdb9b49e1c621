mod cmd_apply;
mod cmd_check;
mod cmd_config;
mod cmd_fingerprint;
mod cmd_init;
mod cmd_notify;
mod cmd_target;
mod config;
mod context;

use clap::{Parser, Subcommand};
use drift_store::DriftPaths;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "drift", version, about = "Fingerprint drift detection and policy checks")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a new .drift/ workspace
    Init,
    /// Compute and print the project's fingerprints
    Fingerprint {
        /// Project directory (defaults to the repo root)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show virtual project detection for the project
    Virtual {
        /// Project directory (defaults to the repo root)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Evaluate the working tree as a push against previous fingerprints and targets
    Check {
        /// Commit sha of the push
        #[arg(long)]
        sha: String,
        /// Commit sha before the push
        #[arg(long)]
        previous: Option<String>,
        /// Branch pushed to
        #[arg(long, default_value = "main")]
        branch: String,
        /// Repository owner
        #[arg(long, default_value = "local")]
        owner: String,
        /// Repository name (defaults to the directory name)
        #[arg(long)]
        repo: Option<String>,
        /// Provider id; pass an empty value to skip target comparison
        #[arg(long, default_value = "local")]
        provider_id: String,
        /// Project directory (defaults to the repo root)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Output the full evaluation as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage team targets
    Target {
        #[command(subcommand)]
        cmd: cmd_target::TargetCmd,
    },
    /// Apply team targets to the project
    Apply {
        /// Only targets of this type
        #[arg(long = "type")]
        fp_type: Option<String>,
        /// Only targets with this name
        #[arg(long)]
        name: Option<String>,
        /// Project directory (defaults to the repo root)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Read and write .drift/config.json
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
    /// Inspect channels that receive policy_failed / policy_passed events
    Notify {
        #[command(subcommand)]
        cmd: cmd_notify::NotifyCmd,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DRIFT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    // Init creates .drift in cwd; everything else works from anywhere inside the repo.
    let repo_root = match &cli.cmd {
        Command::Init => cwd,
        _ => DriftPaths::find_root(&cwd).unwrap_or(cwd),
    };

    match cli.cmd {
        Command::Init => cmd_init::execute(&repo_root),
        Command::Fingerprint { path, json } => {
            cmd_fingerprint::execute(&repo_root, path.as_deref(), json)
        }
        Command::Virtual { path } => cmd_fingerprint::virtual_projects(&repo_root, path.as_deref()),
        Command::Check {
            sha,
            previous,
            branch,
            owner,
            repo,
            provider_id,
            path,
            json,
        } => {
            let passed = cmd_check::execute(&cmd_check::CheckParams {
                repo_root: &repo_root,
                path: path.as_deref(),
                sha: &sha,
                previous: previous.as_deref(),
                branch: &branch,
                owner: &owner,
                repo: repo.as_deref(),
                provider_id: Some(provider_id.as_str()),
                json,
            })?;
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Target { cmd } => cmd_target::run(cmd, &repo_root),
        Command::Apply {
            fp_type,
            name,
            path,
        } => cmd_apply::execute(
            &repo_root,
            fp_type.as_deref(),
            name.as_deref(),
            path.as_deref(),
        ),
        Command::Config { cmd } => cmd_config::run(cmd, &repo_root),
        Command::Notify { cmd } => cmd_notify::run(cmd, &repo_root),
    }
}
