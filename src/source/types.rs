// src/source/types.rs
use serde::{Deserialize, Serialize};

/// A message as returned by the chat source, before author resolution.
/// Immutable once collected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawMessage {
    /// Source-native message id (for Slack-shaped APIs this is the `ts` value).
    pub external_id: String,
    pub author_id: String,
    pub text: String,
    /// Fixed-point decimal seconds as a string, e.g. "1726053123.000200".
    /// Always parsed as f64 for ordering; decimal lengths vary, so
    /// lexicographic comparison is wrong.
    pub timestamp: String,
    pub channel_id: String,
    pub parent_thread_id: Option<String>,
    pub is_thread_reply: bool,
    pub reply_count: Option<u32>,
}

/// Thread placement of a message, carried between stages as named fields.
/// Versioned so payloads written by older workers still deserialize.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThreadMeta {
    #[serde(default = "ThreadMeta::current_version")]
    pub version: u32,
    #[serde(default)]
    pub parent_thread_id: Option<String>,
    #[serde(default)]
    pub is_thread_reply: bool,
    #[serde(default)]
    pub reply_count: Option<u32>,
}

impl ThreadMeta {
    pub const VERSION: u32 = 1;

    fn current_version() -> u32 {
        Self::VERSION
    }

    pub fn top_level(reply_count: Option<u32>) -> Self {
        Self {
            version: Self::VERSION,
            parent_thread_id: None,
            is_thread_reply: false,
            reply_count,
        }
    }

    pub fn reply_to(parent_ts: &str) -> Self {
        Self {
            version: Self::VERSION,
            parent_thread_id: Some(parent_ts.to_string()),
            is_thread_reply: true,
            reply_count: None,
        }
    }
}

impl Default for ThreadMeta {
    fn default() -> Self {
        Self::top_level(None)
    }
}

/// A raw message with its author resolved to a display name; the unit
/// exchanged between the collect and process stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedMessage {
    /// Stable id in the form `<source>-<channel>-<ts>`.
    pub id: String,
    pub source: String,
    pub text: String,
    pub author_id: String,
    pub display_name: String,
    pub timestamp: String,
    pub channel_id: String,
    #[serde(default)]
    pub thread: ThreadMeta,
}

impl NormalizedMessage {
    /// Timestamp parsed as decimal seconds; unparseable values sort first.
    pub fn timestamp_seconds(&self) -> f64 {
        self.timestamp.parse::<f64>().unwrap_or(0.0)
    }
}

/// Stable sort by timestamp ascending. Ties keep fetch order, which is what
/// keeps a thread reply next to its parent when both carry the same second.
pub fn sort_chronological(messages: &mut [NormalizedMessage]) {
    messages.sort_by(|a, b| {
        a.timestamp_seconds()
            .partial_cmp(&b.timestamp_seconds())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
