use tracing::{info, warn};

use crate::detector::{detect, Detection};
use crate::emit::{emit_with_color, Emission, DISCORD_EMBED_COLOR};
use crate::error::Result;
use crate::format::{render, split_identifier, theme};
use crate::paginate::Paginator;
use crate::snapshot::SnapshotStore;
use crate::source::ReleaseSource;
use crate::types::{ChangeRecord, NotifierConfig, Target};

/// Legend shown above the entries of an ordinary run.
pub const UPDATE_GUIDE: &str = "⭐ marks pinned repositories. Tags link to the release page.";

/// Text shown above the entries of a first run.
pub const BOOTSTRAP_GUIDE: &str = "First run: listing the current release of every tracked \
    repository. Later runs report changes only.";

/// Result of one completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// True when no snapshot existed before this run.
    pub first_run: bool,
    /// Detected changes, most recent first.
    pub changes: Vec<ChangeRecord>,
    /// Changes left out of the payloads because they could not be rendered.
    pub skipped: Vec<ChangeRecord>,
    /// One emission per configured target.
    pub emissions: Vec<Emission>,
}

impl RunReport {
    pub fn has_new(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Checks tracked repositories for new releases and builds notification payloads.
pub struct ReleaseNotifier<S> {
    config: NotifierConfig,
    source: S,
    store: SnapshotStore,
}

impl<S: ReleaseSource> ReleaseNotifier<S> {
    /// Creates a new notifier reading releases from `source`.
    pub fn new(config: NotifierConfig, source: S) -> Self {
        let store = SnapshotStore::new(&config.snapshot_path);
        Self {
            config,
            source,
            store,
        }
    }

    /// Runs one full check over `items`.
    ///
    /// The snapshot is saved once all payloads are built, whether or not
    /// anything changed. A fetch failure returns early and leaves the previous
    /// snapshot untouched; a save failure fails the run.
    pub async fn run(&self, items: &[String]) -> Result<RunReport> {
        let previous = self.store.load()?;

        let mut fetched = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if index > 0 && !self.config.fetch_delay.is_zero() {
                tokio::time::sleep(self.config.fetch_delay).await;
            }
            match self.source.latest_release(item).await? {
                Some(release) => fetched.push((item.clone(), release)),
                None => info!(item = %item, "no release published, skipping"),
            }
        }

        let Detection {
            snapshot,
            changes,
            first_run,
        } = detect(&previous, fetched);

        if first_run {
            info!(count = changes.len(), "no previous snapshot, reporting every release");
        } else {
            info!(count = changes.len(), "detected release changes");
        }

        let mut skipped = Vec::new();
        let emissions = self
            .config
            .targets
            .iter()
            .map(|target| self.build_emission(*target, &changes, first_run, &mut skipped))
            .collect();

        self.store.save(&snapshot)?;

        Ok(RunReport {
            first_run,
            changes,
            skipped,
            emissions,
        })
    }

    fn build_emission(
        &self,
        target: Target,
        changes: &[ChangeRecord],
        first_run: bool,
        skipped: &mut Vec<ChangeRecord>,
    ) -> Emission {
        let mut entries = Vec::with_capacity(changes.len());
        let mut namespaces = Vec::new();
        for change in changes {
            match render(change, &self.config.rules, target.platform) {
                Ok(entry) => {
                    entries.push(entry);
                    if let Ok((owner, _)) = split_identifier(&change.item) {
                        namespaces.push(owner);
                    }
                }
                Err(e) => {
                    warn!(
                        item = %change.item,
                        platform = %target.platform,
                        error = %e,
                        "skipping entry"
                    );
                    if !skipped.contains(change) {
                        skipped.push(change.clone());
                    }
                }
            }
        }

        let messages = if entries.is_empty() {
            Vec::new()
        } else {
            let (header, guide) = if first_run {
                (tracking_header(entries.len()), BOOTSTRAP_GUIDE)
            } else {
                (format!("New releases ({})", entries.len()), UPDATE_GUIDE)
            };
            Paginator::new(target.max_size).paginate(&header, guide, &entries)
        };
        if messages.len() > 1 {
            info!(platform = %target.platform, messages = messages.len(), "split notification");
        }

        let mut emission = emit_with_color(target.platform, &messages, accent_color(&namespaces));
        // Unrenderable changes still count as changes.
        emission.has_new = !changes.is_empty();
        emission
    }
}

fn tracking_header(count: usize) -> String {
    if count == 1 {
        "Now tracking 1 repository".to_string()
    } else {
        format!("Now tracking {count} repositories")
    }
}

/// Theme color of the shared namespace, or the default embed color when the
/// entries span several namespaces.
fn accent_color(namespaces: &[&str]) -> u32 {
    match namespaces.split_first() {
        Some((first, rest)) if rest.iter().all(|ns| ns.eq_ignore_ascii_case(first)) => {
            theme(first).color
        }
        _ => DISCORD_EMBED_COLOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::{write_github_output, WirePayload};
    use crate::error::ReleaseNotifierError;
    use crate::types::{Platform, ReleaseInfo};
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    /// In-memory release source; items listed in `failing` return a transport error.
    #[derive(Default)]
    struct FakeSource {
        releases: HashMap<String, ReleaseInfo>,
        failing: Vec<String>,
    }

    impl FakeSource {
        fn with(mut self, item: &str, tag: &str, published: &str) -> Self {
            self.releases.insert(
                item.to_string(),
                ReleaseInfo {
                    tag: tag.to_string(),
                    title: String::new(),
                    published: NaiveDate::parse_from_str(published, "%Y-%m-%d").unwrap(),
                    url: format!("https://github.com/{item}/releases/tag/{tag}"),
                },
            );
            self
        }
    }

    impl ReleaseSource for FakeSource {
        async fn latest_release(&self, item: &str) -> Result<Option<ReleaseInfo>> {
            if self.failing.iter().any(|f| f == item) {
                return Err(ReleaseNotifierError::ApiError {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(self.releases.get(item).cloned())
        }
    }

    fn config(dir: &TempDir) -> NotifierConfig {
        NotifierConfig::new(dir.path().join("snapshot.json"))
            .fetch_delay(Duration::ZERO)
            .targets([Target::new(Platform::Slack), Target::new(Platform::Discord)])
    }

    fn items(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn discord_title(emission: &Emission, index: usize) -> String {
        let WirePayload::Discord(payload) = &emission.payloads[index] else {
            panic!("Expected Discord payload");
        };
        payload.embeds[0].title.clone()
    }

    #[tokio::test]
    async fn test_first_run_uses_bootstrap_header() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::default()
            .with("a/b", "v1", "2024-01-01")
            .with("c/d", "v2", "2024-02-01");
        let notifier = ReleaseNotifier::new(config(&dir), source);

        let report = notifier.run(&items(&["a/b", "c/d", "e/f"])).await.unwrap();

        assert!(report.first_run);
        assert_eq!(report.changes.len(), 2);
        assert_eq!(report.emissions.len(), 2);
        assert_eq!(discord_title(&report.emissions[1], 0), "Now tracking 2 repositories");
        assert!(dir.path().join("snapshot.json").exists());
    }

    #[tokio::test]
    async fn test_second_run_without_changes_still_saves() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::default().with("a/b", "v1", "2024-01-01");
        let notifier = ReleaseNotifier::new(config(&dir), source);

        notifier.run(&items(&["a/b"])).await.unwrap();
        let report = notifier.run(&items(&["a/b"])).await.unwrap();

        assert!(!report.first_run);
        assert!(!report.has_new());
        assert!(report.emissions.iter().all(|e| !e.has_new));
        assert_eq!(discord_title(&report.emissions[1], 0), "No new releases");
    }

    #[tokio::test]
    async fn test_update_run_uses_update_header() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshot.json"));
        let first = FakeSource::default().with("a/b", "v1", "2024-01-01");
        ReleaseNotifier::new(config(&dir), first)
            .run(&items(&["a/b"]))
            .await
            .unwrap();

        let second = FakeSource::default().with("a/b", "v2", "2024-03-01");
        let report = ReleaseNotifier::new(config(&dir), second)
            .run(&items(&["a/b"]))
            .await
            .unwrap();

        assert_eq!(report.changes[0].previous_tag.as_deref(), Some("v1"));
        assert_eq!(discord_title(&report.emissions[1], 0), "New releases (1)");
        assert_eq!(store.load().unwrap().get("a/b").unwrap().tag, "v2");
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_snapshot_untouched() {
        let dir = TempDir::new().unwrap();
        let mut source = FakeSource::default().with("a/b", "v1", "2024-01-01");
        source.failing.push("c/d".to_string());
        let notifier = ReleaseNotifier::new(config(&dir), source);

        let result = notifier.run(&items(&["a/b", "c/d"])).await;

        assert!(matches!(
            result,
            Err(ReleaseNotifierError::ApiError { status: 500, .. })
        ));
        assert!(!dir.path().join("snapshot.json").exists());
    }

    #[tokio::test]
    async fn test_unrenderable_change_is_skipped_but_recorded() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::default()
            .with("a/b", "v1", "2024-01-01")
            .with("bogus", "v1", "2024-01-02");
        let notifier = ReleaseNotifier::new(config(&dir), source);

        let report = notifier.run(&items(&["a/b", "bogus"])).await.unwrap();

        assert_eq!(report.changes.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].item, "bogus");
        assert_eq!(discord_title(&report.emissions[1], 0), "Now tracking 1 repository");
        assert!(SnapshotStore::new(dir.path().join("snapshot.json"))
            .load()
            .unwrap()
            .contains("bogus"));
    }

    #[tokio::test]
    async fn test_has_new_counts_unrenderable_changes() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::default().with("bogus", "v1", "2024-01-02");
        let config = NotifierConfig::new(dir.path().join("snapshot.json"))
            .fetch_delay(Duration::ZERO)
            .targets([Target::new(Platform::Discord)]);

        let report = ReleaseNotifier::new(config, source)
            .run(&items(&["bogus"]))
            .await
            .unwrap();

        assert!(report.has_new());
        assert_eq!(report.skipped.len(), 1);
        assert!(report.emissions[0].has_new);

        let output = dir.path().join("github_output");
        write_github_output(&output, report.changes.len(), &report.emissions).unwrap();
        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains("has_new=true"), "got {text}");
        assert!(text.contains("change_count=1"), "got {text}");
    }

    #[tokio::test]
    async fn test_single_namespace_sets_embed_color() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::default()
            .with("rust-lang/rust", "1.86.0", "2025-04-03")
            .with("rust-lang/cargo", "0.87.0", "2025-04-03");
        let config = NotifierConfig::new(dir.path().join("snapshot.json"))
            .fetch_delay(Duration::ZERO)
            .targets([Target::new(Platform::Discord)]);

        let report = ReleaseNotifier::new(config, source)
            .run(&items(&["rust-lang/rust", "rust-lang/cargo"]))
            .await
            .unwrap();

        let WirePayload::Discord(payload) = &report.emissions[0].payloads[0] else {
            panic!("Expected Discord payload");
        };
        assert_eq!(payload.embeds[0].color, theme("rust-lang").color);
    }

    #[test]
    fn test_accent_color_falls_back_for_mixed_namespaces() {
        assert_eq!(accent_color(&["a", "b"]), DISCORD_EMBED_COLOR);
        assert_eq!(accent_color(&[]), DISCORD_EMBED_COLOR);
        assert_eq!(accent_color(&["Rust-Lang", "rust-lang"]), theme("rust-lang").color);
    }

    #[test]
    fn test_tracking_header_singular() {
        assert_eq!(tracking_header(1), "Now tracking 1 repository");
        assert_eq!(tracking_header(3), "Now tracking 3 repositories");
    }

    #[tokio::test]
    async fn test_small_ceiling_splits_into_numbered_messages() {
        let dir = TempDir::new().unwrap();
        let mut source = FakeSource::default();
        let mut names = Vec::new();
        for i in 0..20 {
            let name = format!("org/repo{i}");
            source = source.with(&name, "v1", "2024-01-01");
            names.push(name);
        }
        let config = NotifierConfig::new(dir.path().join("snapshot.json"))
            .fetch_delay(Duration::ZERO)
            .targets([Target::new(Platform::Discord).max_size(400)]);

        let report = ReleaseNotifier::new(config, source).run(&names).await.unwrap();

        let emission = &report.emissions[0];
        let total = emission.payloads.len();
        assert!(total > 1);
        assert_eq!(
            discord_title(emission, total - 1),
            format!("Now tracking 20 repositories — {total}/{total}")
        );
    }

    #[tokio::test]
    async fn test_save_failure_fails_the_run() {
        let dir = TempDir::new().unwrap();
        let config = NotifierConfig::new(dir.path().join("missing").join("snapshot.json"))
            .fetch_delay(Duration::ZERO);
        let source = FakeSource::default().with("a/b", "v1", "2024-01-01");

        let result = ReleaseNotifier::new(config, source).run(&items(&["a/b"])).await;

        assert!(matches!(result, Err(ReleaseNotifierError::Persistence { .. })));
    }
}
