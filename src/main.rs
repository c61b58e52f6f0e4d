use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use relnotify::{
    load_repo_list, load_rules, write_github_output, write_repo_list, ConfigRules, GitHubSource,
    NotifierConfig, Platform, ReleaseNotifier, Result, RunReport, Target, WebhookTransport,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Check tracked GitHub repositories for new releases and build chat notifications.
#[derive(Debug, Parser)]
#[command(name = "relnotify", version, about, long_about = None)]
struct Cli {
    /// File listing one `owner/name` repository per line.
    #[arg(long, value_name = "FILE", required_unless_present = "starred")]
    repos: Option<PathBuf>,

    /// Track the repositories starred by the token's user instead of a file.
    #[arg(long, conflicts_with = "repos")]
    starred: bool,

    /// Save the tracked repository list to this file.
    #[arg(long, value_name = "FILE")]
    write_repos: Option<PathBuf>,

    /// Snapshot of last-seen releases, rewritten after every run.
    #[arg(long, value_name = "FILE", default_value = "release-snapshot.json")]
    snapshot: PathBuf,

    /// Formatting rules (TOML, or JSON by extension).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Platform to build payloads for; repeat for several.
    #[arg(long = "target", value_name = "PLATFORM", default_value = "slack")]
    targets: Vec<Platform>,

    /// Override the Slack message body ceiling.
    #[arg(long, value_name = "CHARS")]
    slack_max_size: Option<usize>,

    /// Override the Discord message body ceiling.
    #[arg(long, value_name = "CHARS")]
    discord_max_size: Option<usize>,

    /// Pause between release fetches.
    #[arg(long, value_name = "MS", default_value_t = 1_000)]
    delay_ms: u64,

    /// GitHub API token.
    #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// GitHub API base URL.
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Append results to this CI step output file.
    #[arg(long, env = "GITHUB_OUTPUT", value_name = "FILE")]
    github_output: Option<PathBuf>,

    /// Post Slack payloads to this incoming webhook.
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    slack_webhook: Option<String>,

    /// Post Discord payloads to this webhook.
    #[arg(long, env = "DISCORD_WEBHOOK_URL", hide_env_values = true)]
    discord_webhook: Option<String>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut source = GitHubSource::new();
    if let Some(ref url) = cli.api_url {
        source = source.base_url(url)?;
    }
    if let Some(ref token) = cli.token {
        source = source.token(token);
    }

    let repos = match cli.repos {
        Some(ref path) if !cli.starred => load_repo_list(path)?,
        _ => source.starred_repos().await?,
    };
    if let Some(ref path) = cli.write_repos {
        write_repo_list(path, &repos)?;
    }

    let rules = match cli.config {
        Some(ref path) => load_rules(path)?,
        None => ConfigRules::default(),
    };

    let mut targets: Vec<Target> = Vec::new();
    for platform in &cli.targets {
        if targets.iter().any(|t| t.platform == *platform) {
            continue;
        }
        let max_size = match platform {
            Platform::Slack => cli.slack_max_size,
            Platform::Discord => cli.discord_max_size,
        };
        let target = Target::new(*platform);
        targets.push(max_size.map_or(target, |size| target.max_size(size)));
    }

    let config = NotifierConfig::new(&cli.snapshot)
        .fetch_delay(Duration::from_millis(cli.delay_ms))
        .targets(targets)
        .rules(rules);

    info!(repos = repos.len(), "checking releases");
    let report = ReleaseNotifier::new(config, source).run(&repos).await?;

    if let Some(ref path) = cli.github_output {
        write_github_output(path, report.changes.len(), &report.emissions)?;
    }

    deliver(&report, cli.slack_webhook.as_deref(), cli.discord_webhook.as_deref()).await?;

    for emission in &report.emissions {
        for payload in &emission.payloads {
            println!("{}", serde_json::to_string(payload)?);
        }
    }
    Ok(())
}

/// Posts payloads for every target that has a webhook configured.
///
/// Nothing is posted for a target whose run found no changes.
async fn deliver(report: &RunReport, slack: Option<&str>, discord: Option<&str>) -> Result<()> {
    for emission in &report.emissions {
        let url = match emission.platform {
            Platform::Slack => slack,
            Platform::Discord => discord,
        };
        let Some(url) = url else { continue };
        if !emission.has_new {
            info!(platform = %emission.platform, "no changes, skipping delivery");
            continue;
        }
        WebhookTransport::new(url)?.send_all(&emission.payloads).await?;
    }
    Ok(())
}
