// src/summarize/transcript.rs
use chrono::{TimeZone, Utc};

use crate::source::NormalizedMessage;

/// Two-character marker nesting thread replies under their parent. Purely
/// cosmetic; ordering stays strictly chronological, not a parent-grouped tree.
pub const THREAD_INDENT: &str = "↳ ";

/// Render messages one per line: `[<ISO8601 UTC>] <display name>: <text>`,
/// replies prefixed with the indent marker. Input order is preserved.
pub fn render(messages: &[NormalizedMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let prefix = if m.thread.is_thread_reply {
                THREAD_INDENT
            } else {
                ""
            };
            format!(
                "{}[{}] {}: {}",
                prefix,
                iso_utc(m.timestamp_seconds()),
                m.display_name,
                m.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decimal unix seconds to ISO8601 UTC with millisecond precision.
fn iso_utc(seconds: f64) -> String {
    let millis = (seconds * 1000.0).round() as i64;
    match Utc.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        None => format!("{seconds}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ThreadMeta;

    fn msg(ts: &str, name: &str, text: &str, reply: bool) -> NormalizedMessage {
        NormalizedMessage {
            id: format!("slack-C1-{ts}"),
            source: "slack".into(),
            text: text.into(),
            author_id: "U1".into(),
            display_name: name.into(),
            timestamp: ts.into(),
            channel_id: "C1".into(),
            thread: if reply {
                ThreadMeta::reply_to("1000.1")
            } else {
                ThreadMeta::top_level(None)
            },
        }
    }

    #[test]
    fn lines_carry_iso_timestamp_name_and_text() {
        let out = render(&[msg("1000.1", "Ada", "hi", false)]);
        assert_eq!(out, "[1970-01-01T00:16:40.100Z] Ada: hi");
    }

    #[test]
    fn replies_get_the_two_char_indent_marker() {
        let out = render(&[
            msg("1000.1", "Ada", "root", false),
            msg("1000.2", "Ben", "child", true),
        ]);
        let lines: Vec<&str> = out.lines().collect();
        assert!(!lines[0].starts_with(THREAD_INDENT));
        assert!(lines[1].starts_with(THREAD_INDENT));
        assert_eq!(THREAD_INDENT.chars().count(), 2);
    }

    #[test]
    fn order_is_input_order_not_thread_grouping() {
        let out = render(&[
            msg("999.9", "Ben", "early reply", true),
            msg("1000.1", "Ada", "parent", false),
        ]);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].contains("early reply"));
        assert!(lines[1].contains("parent"));
    }
}
