// src/sink.rs
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::pipeline::types::OutputJob;

/// Metadata snapshot keeps at most this many summary characters.
const METADATA_SUMMARY_CHARS: usize = 200;

/// Durable writer for the terminal artifacts of one summarization run:
/// a timestamped per-run file, a fixed "latest" pointer file per source, and
/// a metadata snapshot. All writes either create a fresh timestamped name or
/// overwrite a fixed one, so re-running the same job is idempotent.
pub struct ResultSink {
    dir: PathBuf,
}

/// Where one run's artifacts landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub run_file: PathBuf,
    pub latest_file: PathBuf,
    pub metadata_file: PathBuf,
}

#[derive(Serialize)]
struct MetadataSnapshot<'a> {
    message_ids: &'a [String],
    summary: String,
    relevance_score: f64,
    topics: &'a [String],
    source: &'a str,
    timestamp: String,
    user_id: &'a str,
    summary_id: &'a str,
    processed_at: String,
}

impl ResultSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write all three artifacts for `job`. Any single failure bubbles up and
    /// fails the whole call; the queue re-runs all three writes on retry.
    pub async fn write_artifacts(&self, job: &OutputJob) -> Result<ArtifactPaths> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating output dir {}", self.dir.display()))?;

        let run_file = self
            .dir
            .join(format!("{}-{}.txt", job.source, Utc::now().timestamp_millis()));
        let latest_file = self.dir.join(format!("{}-latest.txt", job.source));
        let metadata_file = self.dir.join(format!("{}-metadata.json", job.source));

        write_summary_file(&run_file, &job.summary).await?;
        write_summary_file(&latest_file, &job.summary).await?;

        let snapshot = MetadataSnapshot {
            message_ids: &job.message_ids,
            summary: snapshot_summary(&job.summary),
            relevance_score: job.relevance_score,
            topics: &job.topics,
            source: &job.source,
            timestamp: iso_millis(job.timestamp),
            user_id: &job.user_id,
            summary_id: &job.summary_id,
            processed_at: iso_now(),
        };
        let json = serde_json::to_string_pretty(&snapshot).context("encoding metadata snapshot")?;
        tokio::fs::write(&metadata_file, json)
            .await
            .with_context(|| format!("writing {}", metadata_file.display()))?;

        info!(
            run_file = %run_file.display(),
            latest_file = %latest_file.display(),
            "stored output artifacts"
        );

        Ok(ArtifactPaths {
            run_file,
            latest_file,
            metadata_file,
        })
    }
}

/// Summary files open with a generation timestamp line, then the text.
async fn write_summary_file(path: &Path, summary: &str) -> Result<()> {
    let content = format!("Generated: {}\n\n{}\n", iso_now(), summary);
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

/// Truncate to the snapshot cap; the ellipsis marks an actual cut.
fn snapshot_summary(summary: &str) -> String {
    let mut out: String = summary.chars().take(METADATA_SUMMARY_CHARS).collect();
    if summary.chars().count() > METADATA_SUMMARY_CHARS {
        out.push_str("...");
    }
    out
}

fn iso_now() -> String {
    iso_millis(Utc::now())
}

fn iso_millis(ts: chrono::DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_summary_is_not_marked_truncated() {
        assert_eq!(snapshot_summary("short"), "short");
    }

    #[test]
    fn long_summary_is_cut_at_the_cap_with_marker() {
        let long = "x".repeat(500);
        let out = snapshot_summary(&long);
        assert_eq!(out.chars().count(), METADATA_SUMMARY_CHARS + 3);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let long = "ř".repeat(300);
        let out = snapshot_summary(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), METADATA_SUMMARY_CHARS + 3);
    }
}
