//! # relnotify
//!
//! Tracks the latest GitHub release of a list of repositories, detects which
//! ones changed since the previous run, and builds Slack or Discord payloads
//! for them, split across several messages when a platform's size ceiling
//! would otherwise be exceeded.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use relnotify::{GitHubSource, NotifierConfig, Platform, ReleaseNotifier, Target};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NotifierConfig::new("/tmp/release-snapshot.json")
//!         .fetch_delay(Duration::from_millis(500))
//!         .targets([Target::new(Platform::Slack), Target::new(Platform::Discord)]);
//!
//!     let notifier = ReleaseNotifier::new(config, GitHubSource::new());
//!     let report = notifier.run(&["rust-lang/rust".to_string()]).await?;
//!
//!     for emission in &report.emissions {
//!         println!("{}: {} payload(s)", emission.platform, emission.payloads.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

mod config;
mod detector;
mod emit;
mod error;
mod format;
mod notifier;
mod paginate;
mod snapshot;
mod source;
mod transport;
mod types;

pub use config::{load_repo_list, load_rules, parse_repo_list, write_repo_list};
pub use detector::{detect, Detection};
pub use emit::{
    emit, emit_with_color, write_github_output, DiscordEmbed, DiscordPayload, Emission,
    SlackBlock, SlackPayload, SlackText, WirePayload, DISCORD_EMBED_COLOR, NO_CHANGES_BODY,
    NO_CHANGES_HEADER,
};
pub use error::{ReleaseNotifierError, Result};
pub use format::{
    format_date, is_valid_identifier, parse_date, render, split_identifier, strip_title_prefix,
    theme, Theme, EMPHASIS_MARKER,
};
pub use notifier::{ReleaseNotifier, RunReport, BOOTSTRAP_GUIDE, UPDATE_GUIDE};
pub use paginate::{paginate, Paginator, DEFAULT_CONTINUATION, DEFAULT_SEPARATOR};
pub use snapshot::SnapshotStore;
pub use source::{GitHubSource, ReleaseSource};
pub use transport::WebhookTransport;
pub use types::{
    normalize_identifier, ChangeRecord, ConfigRules, Message, NotifierConfig, Platform,
    ReleaseInfo, RenderedEntry, Snapshot, SnapshotEntry, Target,
};
