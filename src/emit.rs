use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Message, Platform};

/// Slack caps the text of a single section block at 3000 characters.
const SLACK_SECTION_LIMIT: usize = 3_000;

/// Discord blurple, used for every embed.
pub const DISCORD_EMBED_COLOR: u32 = 0x5865F2;

pub const NO_CHANGES_HEADER: &str = "No new releases";
pub const NO_CHANGES_BODY: &str =
    "None of the tracked repositories published a new release since the last check.";

/// A payload ready to be posted to a chat platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WirePayload {
    Slack(SlackPayload),
    Discord(DiscordPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackPayload {
    /// Notification fallback text.
    pub text: String,
    pub blocks: Vec<SlackBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SlackBlock {
    Header { text: SlackText },
    Section { text: SlackText },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackText {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl SlackText {
    fn plain(text: &str) -> Self {
        Self {
            kind: "plain_text".to_string(),
            text: text.to_string(),
        }
    }

    fn mrkdwn(text: &str) -> Self {
        Self {
            kind: "mrkdwn".to_string(),
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscordPayload {
    pub embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscordEmbed {
    pub title: String,
    pub description: String,
    pub color: u32,
}

/// Payloads produced for one target, plus whether anything changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub platform: Platform,
    pub has_new: bool,
    pub payloads: Vec<WirePayload>,
}

/// Maps messages to wire payloads, one per message.
///
/// An empty input yields a single "no new releases" payload with `has_new` unset.
pub fn emit(platform: Platform, messages: &[Message]) -> Emission {
    emit_with_color(platform, messages, DISCORD_EMBED_COLOR)
}

/// Like [`emit`], with a custom accent color for Discord embeds.
pub fn emit_with_color(platform: Platform, messages: &[Message], color: u32) -> Emission {
    if messages.is_empty() {
        return Emission {
            platform,
            has_new: false,
            payloads: vec![to_payload(platform, NO_CHANGES_HEADER, NO_CHANGES_BODY, color)],
        };
    }

    Emission {
        platform,
        has_new: true,
        payloads: messages
            .iter()
            .map(|message| to_payload(platform, &message.header, &message.body, color))
            .collect(),
    }
}

fn to_payload(platform: Platform, header: &str, body: &str, color: u32) -> WirePayload {
    match platform {
        Platform::Slack => {
            let mut blocks = vec![SlackBlock::Header {
                text: SlackText::plain(header),
            }];
            blocks.extend(
                section_chunks(body, SLACK_SECTION_LIMIT)
                    .into_iter()
                    .map(|chunk| SlackBlock::Section {
                        text: SlackText::mrkdwn(&chunk),
                    }),
            );
            WirePayload::Slack(SlackPayload {
                text: header.to_string(),
                blocks,
            })
        }
        Platform::Discord => WirePayload::Discord(DiscordPayload {
            embeds: vec![DiscordEmbed {
                title: header.to_string(),
                description: body.to_string(),
                color,
            }],
        }),
    }
}

/// Groups whole lines into chunks of at most `limit` characters.
///
/// A single line longer than the limit becomes its own chunk.
fn section_chunks(body: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in body.lines() {
        let line_len = line.chars().count();
        let needed = if current.is_empty() { line_len } else { line_len + 1 };

        if !current.is_empty() && current_len + needed > limit {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Appends run results to a CI step output file (`GITHUB_OUTPUT` format).
///
/// Writes `has_new` (any change detected this run) and `change_count`, then
/// for each emission `<platform>_payload_count` and `<platform>_payload_<i>`
/// (1-based, compact JSON).
pub fn write_github_output(
    path: &Path,
    change_count: usize,
    emissions: &[Emission],
) -> Result<()> {
    let has_new = change_count > 0;

    let mut lines = vec![
        format!("has_new={has_new}"),
        format!("change_count={change_count}"),
    ];
    for emission in emissions {
        let platform = emission.platform.as_str();
        lines.push(format!("{platform}_payload_count={}", emission.payloads.len()));
        for (index, payload) in emission.payloads.iter().enumerate() {
            lines.push(format!(
                "{platform}_payload_{}={}",
                index + 1,
                serde_json::to_string(payload)?
            ));
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    Ok(())
}
