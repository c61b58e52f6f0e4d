use crate::types::{Message, RenderedEntry};

/// Default separator between the guide text and the first entry.
pub const DEFAULT_SEPARATOR: &str = "\n\n";

/// Default continuation header; `{n}` is replaced with the message ordinal.
pub const DEFAULT_CONTINUATION: &str = "_(continued, part {n})_\n\n";

/// Packs rendered entries into size-bounded messages.
///
/// Sizes are counted in characters. The ceiling applies to each message body;
/// the header travels separately (embed title, Slack header block).
#[derive(Debug, Clone)]
pub struct Paginator {
    max_size: usize,
    separator: String,
    continuation: String,
}

impl Paginator {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            separator: DEFAULT_SEPARATOR.to_string(),
            continuation: DEFAULT_CONTINUATION.to_string(),
        }
    }

    /// Sets the text placed between the guide and the first entry.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Sets the continuation header template. `{n}` expands to the ordinal.
    pub fn continuation(mut self, template: impl Into<String>) -> Self {
        self.continuation = template.into();
        self
    }

    /// Continuation header opening message `ordinal` (1-based).
    pub fn continuation_header(&self, ordinal: usize) -> String {
        self.continuation.replace("{n}", &ordinal.to_string())
    }

    /// Splits `entries` across as few messages as the ceiling allows.
    ///
    /// Entries are never split; one that alone exceeds the ceiling still gets
    /// its own message. With more than one message, every header is suffixed
    /// with `ordinal/total`.
    pub fn paginate<S>(&self, header: &str, guide: &str, entries: &[S]) -> Vec<Message>
    where
        S: AsRef<str>,
    {
        let mut bodies = Vec::new();
        let mut current = format!("{guide}{}", self.separator);
        let mut current_len = current.chars().count();
        let mut holds_entry = false;

        for entry in entries {
            let entry = entry.as_ref();
            let added = entry.chars().count() + 1;

            if current_len + added > self.max_size && holds_entry {
                bodies.push(close(current));
                current = self.continuation_header(bodies.len() + 1);
                current_len = current.chars().count();
            }

            current.push_str(entry);
            current.push('\n');
            current_len += added;
            holds_entry = true;
        }
        bodies.push(close(current));

        let total = bodies.len();
        bodies
            .into_iter()
            .enumerate()
            .map(|(index, body)| {
                let ordinal = index + 1;
                let header = if total > 1 {
                    format!("{header} — {ordinal}/{total}")
                } else {
                    header.to_string()
                };
                Message {
                    header,
                    body,
                    ordinal,
                    total,
                }
            })
            .collect()
    }
}

fn close(mut body: String) -> String {
    body.truncate(body.trim_end().len());
    body
}

/// Convenience wrapper around [`Paginator::paginate`] with default templates.
pub fn paginate(
    header: &str,
    guide: &str,
    entries: &[RenderedEntry],
    max_size: usize,
) -> Vec<Message> {
    Paginator::new(max_size).paginate(header, guide, entries)
}
