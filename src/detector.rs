use std::collections::HashSet;

use tracing::debug;

use crate::types::{ChangeRecord, ReleaseInfo, Snapshot, SnapshotEntry};

/// Outcome of diffing freshly fetched releases against the previous snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Snapshot rebuilt from this run's fetch results only.
    pub snapshot: Snapshot,
    /// Changes ordered by publication date, most recent first.
    pub changes: Vec<ChangeRecord>,
    /// True when no previous snapshot existed, so every release is reported as new.
    pub first_run: bool,
}

/// Compares fetched releases with the previous snapshot.
///
/// An item counts as changed when it has no previous entry, or when its
/// release was published strictly later than the recorded one. Tag strings
/// are not compared: a re-tag on the same or an earlier date is not a change.
///
/// Items fetched more than once keep their first occurrence.
pub fn detect<I>(previous: &Snapshot, fetched: I) -> Detection
where
    I: IntoIterator<Item = (String, ReleaseInfo)>,
{
    let first_run = previous.is_empty();
    let mut snapshot = Snapshot::new();
    let mut changes = Vec::new();
    let mut seen = HashSet::new();

    for (item, release) in fetched {
        if !seen.insert(item.clone()) {
            debug!(item = %item, "duplicate item in fetch results, ignoring");
            continue;
        }

        snapshot.insert(item.clone(), SnapshotEntry::from(&release));

        let previous_tag = match previous.get(&item) {
            Some(prior) if release.published <= prior.published => continue,
            Some(prior) => Some(prior.tag.clone()),
            None => None,
        };

        debug!(item = %item, tag = %release.tag, "release changed");
        changes.push(ChangeRecord {
            item,
            new_release: release,
            previous_tag,
        });
    }

    // `sort_by` is stable, so equal dates keep fetch order.
    changes.sort_by(|a, b| b.new_release.published.cmp(&a.new_release.published));

    Detection {
        snapshot,
        changes,
        first_run,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn release(tag: &str, published: &str) -> ReleaseInfo {
        ReleaseInfo {
            tag: tag.to_string(),
            title: String::new(),
            published: date(published),
            url: format!("https://example.com/{tag}"),
        }
    }

    fn snapshot_of(entries: &[(&str, &str, &str)]) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for (item, tag, published) in entries {
            snapshot.insert(
                *item,
                SnapshotEntry {
                    tag: tag.to_string(),
                    published: date(published),
                },
            );
        }
        snapshot
    }

    #[test]
    fn test_first_run_reports_everything_without_previous_tag() {
        let fetched = vec![
            ("a/b".to_string(), release("v1", "2024-01-01")),
            ("c/d".to_string(), release("v3", "2024-03-01")),
        ];

        let detection = detect(&Snapshot::new(), fetched);

        assert!(detection.first_run);
        assert_eq!(detection.changes.len(), 2);
        assert!(detection.changes.iter().all(|c| c.previous_tag.is_none()));
        assert_eq!(detection.snapshot.len(), 2);
    }

    #[test]
    fn test_update_and_new_item_ordered_by_date() {
        let previous = snapshot_of(&[("a/b", "v1", "2024-01-01")]);
        let fetched = vec![
            ("a/b".to_string(), release("v2", "2024-02-01")),
            ("c/d".to_string(), release("v1", "2024-01-05")),
        ];

        let detection = detect(&previous, fetched);

        assert!(!detection.first_run);
        let items: Vec<_> = detection.changes.iter().map(|c| c.item.as_str()).collect();
        assert_eq!(items, ["a/b", "c/d"]);
        assert_eq!(detection.changes[0].previous_tag.as_deref(), Some("v1"));
        assert_eq!(detection.changes[1].previous_tag, None);
    }

    #[test]
    fn test_retag_with_same_or_earlier_date_is_not_a_change() {
        let previous = snapshot_of(&[("a/b", "v1", "2024-02-01"), ("c/d", "v5", "2024-02-01")]);
        let fetched = vec![
            ("a/b".to_string(), release("v1-retag", "2024-02-01")),
            ("c/d".to_string(), release("v4", "2024-01-15")),
        ];

        let detection = detect(&previous, fetched);

        assert!(detection.changes.is_empty());
        // The snapshot still follows what was fetched.
        assert_eq!(detection.snapshot.get("a/b").unwrap().tag, "v1-retag");
        assert_eq!(detection.snapshot.get("c/d").unwrap().tag, "v4");
    }

    #[test]
    fn test_unfetched_items_drop_out_of_snapshot() {
        let previous = snapshot_of(&[
            ("a/b", "v1", "2024-01-01"),
            ("gone/repo", "v1", "2024-01-01"),
        ]);
        let fetched = vec![("a/b".to_string(), release("v1", "2024-01-01"))];

        let detection = detect(&previous, fetched);

        assert!(detection.changes.is_empty());
        assert!(!detection.snapshot.contains("gone/repo"));
    }

    #[test]
    fn test_equal_dates_keep_fetch_order() {
        let fetched = vec![
            ("z/z".to_string(), release("v1", "2024-01-01")),
            ("a/a".to_string(), release("v1", "2024-01-01")),
            ("m/m".to_string(), release("v1", "2024-06-01")),
        ];

        let detection = detect(&Snapshot::new(), fetched);

        let items: Vec<_> = detection.changes.iter().map(|c| c.item.as_str()).collect();
        assert_eq!(items, ["m/m", "z/z", "a/a"]);
    }

    #[test]
    fn test_second_run_with_same_input_is_idempotent() {
        let previous = snapshot_of(&[("a/b", "v1", "2024-01-01")]);
        let fetched = vec![
            ("a/b".to_string(), release("v2", "2024-02-01")),
            ("c/d".to_string(), release("v1", "2024-01-05")),
        ];

        let first = detect(&previous, fetched.clone());
        let second = detect(&first.snapshot, fetched);

        assert_eq!(first.changes.len(), 2);
        assert!(second.changes.is_empty());
        assert_eq!(first.snapshot, second.snapshot);
    }

    #[test]
    fn test_duplicate_items_emit_one_change() {
        let fetched = vec![
            ("a/b".to_string(), release("v1", "2024-01-01")),
            ("a/b".to_string(), release("v2", "2024-02-01")),
        ];

        let detection = detect(&Snapshot::new(), fetched);

        assert_eq!(detection.changes.len(), 1);
        assert_eq!(detection.snapshot.get("a/b").unwrap().tag, "v1");
    }
}
