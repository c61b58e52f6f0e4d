use chrono::NaiveDate;

use crate::error::{ReleaseNotifierError, Result};
use crate::types::{ChangeRecord, ConfigRules, Platform, RenderedEntry};

/// Marker placed before the title of items listed in `special_items`.
pub const EMPHASIS_MARKER: &str = "⭐ ";

/// Title prefixes removed before comparing a release title with its tag.
/// Only the first match (case-insensitive, in this order) is stripped.
const TITLE_PREFIXES: [&str; 5] = ["Release ", "release ", "version ", "Version ", "v"];

/// Maximum length for a GitHub username/organization name.
/// This limit is enforced by GitHub.
const MAX_GITHUB_OWNER_LENGTH: usize = 39;

/// Maximum length for a GitHub repository name.
/// This limit is enforced by GitHub.
const MAX_GITHUB_REPO_LENGTH: usize = 100;

/// Splits an `owner/name` identifier into its two segments.
pub fn split_identifier(item: &str) -> Result<(&str, &str)> {
    let malformed = || ReleaseNotifierError::MalformedIdentifier(item.to_string());

    let (owner, name) = item.split_once('/').ok_or_else(malformed)?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return Err(malformed());
    }
    Ok((owner, name))
}

/// Validates that an identifier is a GitHub repository in "owner/repo" format.
///
/// GitHub requirements:
/// - Owner: alphanumeric or hyphens, cannot start/end with hyphen, max 39 chars
/// - Repo: alphanumeric, hyphens, underscores, or dots, max 100 chars
pub fn is_valid_identifier(item: &str) -> bool {
    match split_identifier(item) {
        Ok((owner, name)) => is_valid_owner(owner) && is_valid_repo_name(name),
        Err(_) => false,
    }
}

fn is_valid_owner(owner: &str) -> bool {
    owner.len() <= MAX_GITHUB_OWNER_LENGTH
        && !owner.starts_with('-')
        && !owner.ends_with('-')
        && owner.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_valid_repo_name(name: &str) -> bool {
    name.len() <= MAX_GITHUB_REPO_LENGTH
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Parses a strict `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let invalid = || ReleaseNotifierError::InvalidDate(input.to_string());

    let bytes = input.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| invalid())
}

/// Renders `2025-04-16` as `25.04.16`.
pub fn format_date(input: &str) -> Result<String> {
    parse_date(input).map(short_date)
}

pub(crate) fn short_date(date: NaiveDate) -> String {
    date.format("%y.%m.%d").to_string()
}

/// Removes the first matching version-ish prefix from a release title.
pub fn strip_title_prefix(title: &str) -> &str {
    for prefix in TITLE_PREFIXES {
        if let Some(head) = title.get(..prefix.len()) {
            if head.eq_ignore_ascii_case(prefix) {
                return &title[prefix.len()..];
            }
        }
    }
    title
}

/// Returns the title suffix to show for a release, if any.
///
/// Empty titles and titles that only restate the tag are dropped.
fn display_title<'a>(title: &'a str, tag: &str) -> Option<&'a str> {
    let title = title.trim();
    if title.is_empty() {
        return None;
    }

    let stripped = strip_title_prefix(title).trim();
    let restates_tag = [title, stripped].iter().any(|candidate| {
        candidate.eq_ignore_ascii_case(tag)
            || candidate.eq_ignore_ascii_case(strip_title_prefix(tag))
    });

    if restates_tag || stripped.is_empty() {
        None
    } else {
        Some(stripped)
    }
}

/// Accent color and glyph associated with a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub color: u32,
    pub glyph: &'static str,
}

const KNOWN_THEMES: &[(&str, Theme)] = &[
    ("rust-lang", Theme { color: 0xDEA584, glyph: "🦀" }),
    ("tokio-rs", Theme { color: 0x7C3AED, glyph: "🗼" }),
    ("microsoft", Theme { color: 0x00A4EF, glyph: "🪟" }),
    ("google", Theme { color: 0x4285F4, glyph: "🔍" }),
    ("facebook", Theme { color: 0x1877F2, glyph: "📘" }),
    ("vercel", Theme { color: 0x000000, glyph: "▲" }),
    ("anthropics", Theme { color: 0xD97757, glyph: "✳️" }),
    ("openai", Theme { color: 0x10A37F, glyph: "🌀" }),
];

const FALLBACK_THEMES: &[Theme] = &[
    Theme { color: 0xE74C3C, glyph: "🔴" },
    Theme { color: 0xE67E22, glyph: "🟠" },
    Theme { color: 0xF1C40F, glyph: "🟡" },
    Theme { color: 0x2ECC71, glyph: "🟢" },
    Theme { color: 0x3498DB, glyph: "🔵" },
    Theme { color: 0x9B59B6, glyph: "🟣" },
];

/// Looks up the theme for a namespace.
///
/// Unknown namespaces land in a fallback bucket chosen by a stable FNV-1a hash
/// of the lowercased name, so the same namespace always gets the same theme.
pub fn theme(namespace: &str) -> Theme {
    let key = namespace.trim().to_ascii_lowercase();
    if let Some((_, theme)) = KNOWN_THEMES.iter().find(|(name, _)| *name == key) {
        return *theme;
    }

    let bucket = fnv1a(key.as_bytes()) % FALLBACK_THEMES.len() as u64;
    FALLBACK_THEMES[bucket as usize]
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes.iter().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

/// Inline markup dialect of a chat platform.
#[derive(Debug, Clone, Copy)]
struct Markup(Platform);

impl Markup {
    fn bold(self, text: &str) -> String {
        match self.0 {
            Platform::Slack => format!("*{}*", escape_slack(text)),
            Platform::Discord => format!("**{text}**"),
        }
    }

    fn italic(self, text: &str) -> String {
        match self.0 {
            Platform::Slack => format!("_{}_", escape_slack(text)),
            Platform::Discord => format!("_{text}_"),
        }
    }

    fn link(self, url: &str, text: &str) -> String {
        match self.0 {
            Platform::Slack => format!("<{url}|{}>", escape_slack(text)),
            Platform::Discord => format!("[{text}]({url})"),
        }
    }

    fn plain(self, text: &str) -> String {
        match self.0 {
            Platform::Slack => escape_slack(text),
            Platform::Discord => text.to_string(),
        }
    }
}

/// Slack mrkdwn reserves `&`, `<` and `>`.
fn escape_slack(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Renders one change as a single line in the platform's markup.
///
/// Layout: `[glyph ][⭐ ]owner / *name* <url|old → new> _title_ · yy.mm.dd`
pub fn render(
    record: &ChangeRecord,
    rules: &ConfigRules,
    platform: Platform,
) -> Result<RenderedEntry> {
    let markup = Markup(platform);
    let (owner, name) = split_identifier(&record.item)?;
    let release = &record.new_release;

    let mut line = String::new();
    if rules.show_glyphs {
        line.push_str(theme(owner).glyph);
        line.push(' ');
    }
    if rules.is_special(&record.item) {
        line.push_str(EMPHASIS_MARKER);
    }
    line.push_str(&format!("{} / {}", markup.plain(owner), markup.bold(name)));

    let tag_text = match record.previous_tag.as_deref() {
        Some(previous) if previous != release.tag => format!("{previous} → {}", release.tag),
        _ => release.tag.clone(),
    };
    line.push(' ');
    line.push_str(&markup.link(&release.url, &tag_text));

    if let Some(title) = display_title(&release.title, &release.tag) {
        line.push(' ');
        line.push_str(&markup.italic(title));
    }

    line.push_str(" · ");
    line.push_str(&short_date(release.published));

    // Entries are single-line by contract.
    Ok(line.replace(['\r', '\n'], " "))
}
