// src/summarize/prompt.rs
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::store::Interest;

/// Prompt fragments combined (in this order) into the final summarization
/// instruction. `system_prompt` is mandatory but may legally be empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SummarizeContext {
    pub system_prompt: String,
    #[serde(default)]
    pub source_prompt: Option<String>,
    #[serde(default)]
    pub interest_prompt: Option<String>,
}

impl SummarizeContext {
    pub fn composed(&self) -> String {
        compose(
            &self.system_prompt,
            self.source_prompt.as_deref().unwrap_or(""),
            self.interest_prompt.as_deref().unwrap_or(""),
        )
    }
}

/// Merge the three fragments in fixed order: system prompt first, then the
/// source fragment, then the interest fragment. Non-empty fragments are
/// separated by a blank line; empty ones are omitted entirely — no
/// placeholder text is ever emitted. Pure function, no I/O.
pub fn compose(system_prompt: &str, source_prompt: &str, interest_prompt: &str) -> String {
    let mut out = String::from(system_prompt);
    for fragment in [source_prompt, interest_prompt] {
        if !fragment.is_empty() {
            out.push_str("\n\n");
            out.push_str(fragment);
        }
    }
    out
}

/// Render active interests one bullet per line, heaviest first; ties keep
/// declaration order. No active interests yields the empty string, which
/// `compose` then drops.
pub fn interest_fragment(interests: &[Interest]) -> String {
    let mut active: Vec<&Interest> = interests.iter().filter(|i| i.active).collect();
    active.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));
    active
        .iter()
        .map(|i| format!("- {} (priority: {})", i.keyword, i.weight))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interest(keyword: &str, weight: f64, active: bool) -> Interest {
        Interest {
            user_id: "default".into(),
            keyword: keyword.into(),
            weight,
            active,
        }
    }

    #[test]
    fn system_only_composition_is_identity() {
        assert_eq!(compose("Summarize this.", "", ""), "Summarize this.");
        assert_eq!(compose("", "", ""), "");
    }

    #[test]
    fn source_fragment_follows_system_after_blank_line() {
        let out = compose("SYS", "Focus on decisions.", "");
        assert_eq!(out, "SYS\n\nFocus on decisions.");
    }

    #[test]
    fn all_three_fragments_keep_fixed_order() {
        let out = compose("SYS", "SRC", "INT");
        assert_eq!(out, "SYS\n\nSRC\n\nINT");
    }

    #[test]
    fn interest_fragment_skipped_means_no_placeholder() {
        let out = compose("SYS", "SRC", "");
        assert!(!out.to_lowercase().contains("interest"));
        assert!(!out.contains("none"));
    }

    #[test]
    fn interests_render_heaviest_first() {
        let fragment = interest_fragment(&[
            interest("stuffing", 1.2, true),
            interest("pumpkin pie", 1.5, true),
        ]);
        assert_eq!(
            fragment,
            "- pumpkin pie (priority: 1.5)\n- stuffing (priority: 1.2)"
        );
    }

    #[test]
    fn weight_ties_keep_declaration_order() {
        let fragment = interest_fragment(&[
            interest("first", 1.0, true),
            interest("second", 1.0, true),
            interest("third", 1.0, true),
        ]);
        assert_eq!(
            fragment,
            "- first (priority: 1)\n- second (priority: 1)\n- third (priority: 1)"
        );
    }

    #[test]
    fn inactive_interests_are_excluded() {
        let fragment = interest_fragment(&[
            interest("live", 2.0, true),
            interest("muted", 9.0, false),
        ]);
        assert_eq!(fragment, "- live (priority: 2)");
    }

    #[test]
    fn no_active_interests_yields_empty_string() {
        assert_eq!(interest_fragment(&[]), "");
        assert_eq!(interest_fragment(&[interest("muted", 1.0, false)]), "");
    }
}
