use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Configuration for a [`ReleaseNotifier`](crate::ReleaseNotifier) run.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Path of the JSON snapshot persisted between runs.
    pub snapshot_path: PathBuf,
    /// Pause between two consecutive release fetches. Default is 1 second.
    pub fetch_delay: Duration,
    /// Chat platforms to build payloads for.
    pub targets: Vec<Target>,
    /// Formatting rules applied to every rendered entry.
    pub rules: ConfigRules,
}

impl NotifierConfig {
    /// Creates a new config persisting its snapshot at the given path.
    ///
    /// Targets default to Slack only.
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            fetch_delay: Duration::from_secs(1),
            targets: vec![Target::new(Platform::Slack)],
            rules: ConfigRules::default(),
        }
    }

    /// Sets the delay between fetches.
    pub fn fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Replaces the list of output targets.
    pub fn targets(mut self, targets: impl IntoIterator<Item = Target>) -> Self {
        self.targets = targets.into_iter().collect();
        self
    }

    /// Sets the formatting rules.
    pub fn rules(mut self, rules: ConfigRules) -> Self {
        self.rules = rules;
        self
    }
}

/// A chat platform payloads can be rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Slack,
    Discord,
}

impl Platform {
    /// Default ceiling for one message body on this platform.
    pub fn default_max_size(self) -> usize {
        match self {
            Platform::Slack => 35_000,
            // Embed descriptions cap at 4096; leave headroom.
            Platform::Discord => 3_800,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Slack => "slack",
            Platform::Discord => "discord",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slack" => Ok(Platform::Slack),
            "discord" => Ok(Platform::Discord),
            other => Err(format!("unknown platform '{other}' (expected slack or discord)")),
        }
    }
}

/// A platform together with the size ceiling its message bodies must respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub platform: Platform,
    pub max_size: usize,
}

impl Target {
    /// Creates a target using the platform's default size ceiling.
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            max_size: platform.default_max_size(),
        }
    }

    /// Overrides the size ceiling.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }
}

/// Styling rules for the entry formatter. Never affects change detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigRules {
    /// Items rendered with the emphasis marker.
    pub special_items: BTreeSet<String>,
    /// Prefix each entry with its namespace glyph.
    pub show_glyphs: bool,
}

impl ConfigRules {
    /// Builds rules from raw identifiers, normalizing each one.
    pub fn with_special_items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            special_items: items
                .into_iter()
                .map(|item| normalize_identifier(item.as_ref()))
                .filter(|item| !item.is_empty())
                .collect(),
            show_glyphs: false,
        }
    }

    pub fn is_special(&self, item: &str) -> bool {
        self.special_items.contains(item)
    }
}

/// Trims an identifier and removes stray whitespace around the `/` separator.
///
/// `" rust-lang / rust "` becomes `"rust-lang/rust"`.
pub fn normalize_identifier(raw: &str) -> String {
    raw.split('/')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("/")
}

/// The latest published release of one tracked item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    /// The release tag (e.g., "v1.0.0").
    pub tag: String,
    /// The release title; may be empty.
    #[serde(default)]
    pub title: String,
    /// Publication date of the release.
    pub published: NaiveDate,
    /// The URL to the release page.
    pub url: String,
}

/// Last-seen release identity for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub tag: String,
    pub published: NaiveDate,
}

impl From<&ReleaseInfo> for SnapshotEntry {
    fn from(release: &ReleaseInfo) -> Self {
        Self {
            tag: release.tag.clone(),
            published: release.published,
        }
    }
}

/// Last-seen state per tracked item, persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    entries: BTreeMap<String, SnapshotEntry>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, item: &str) -> Option<&SnapshotEntry> {
        self.entries.get(item)
    }

    pub fn contains(&self, item: &str) -> bool {
        self.entries.contains_key(item)
    }

    /// Records an entry, replacing any previous one for the same item.
    pub fn insert(&mut self, item: impl Into<String>, entry: SnapshotEntry) {
        self.entries.insert(item.into(), entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SnapshotEntry)> {
        self.entries.iter()
    }
}

/// One detected release change for a tracked item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub item: String,
    pub new_release: ReleaseInfo,
    /// Tag seen on the previous run; `None` for items observed for the first time.
    pub previous_tag: Option<String>,
}

/// A rendered, single-line entry.
pub type RenderedEntry = String;

/// One size-bounded message produced by the paginator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: String,
    pub body: String,
    /// 1-based position among the messages of one run.
    pub ordinal: usize,
    pub total: usize,
}

/// Internal structure for the GitHub latest-release response.
#[derive(Debug, Deserialize)]
pub(crate) struct GitHubReleaseResponse {
    pub tag_name: String,
    pub name: Option<String>,
    pub html_url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Internal structure for one entry of the GitHub starred-repositories listing.
#[derive(Debug, Deserialize)]
pub(crate) struct GitHubStarredRepo {
    pub full_name: String,
}

impl GitHubReleaseResponse {
    /// Converts to a [`ReleaseInfo`]; `None` when the release carries no date at all.
    pub(crate) fn into_release_info(self) -> Option<ReleaseInfo> {
        let published = self.published_at.or(self.created_at)?.date_naive();
        Some(ReleaseInfo {
            tag: self.tag_name,
            title: self.name.unwrap_or_default(),
            published,
            url: self.html_url,
        })
    }
}
