// src/pipeline/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::NormalizedMessage;

/// Version tag stamped on every queue payload this crate emits. Older
/// payloads without the field deserialize as version 1.
pub const PAYLOAD_VERSION: u32 = 1;

fn payload_version() -> u32 {
    PAYLOAD_VERSION
}

/// Payload of a `collect` queue job. The handler is bound to a source, so the
/// payload carries only the overrides and the schedule stamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectJob {
    #[serde(default = "payload_version")]
    pub version: u32,
    /// Override of the configured channel list, when set.
    #[serde(default)]
    pub channel_ids: Option<Vec<String>>,
    /// Override of the configured lookback window, when set.
    #[serde(default)]
    pub lookback_hours: Option<f64>,
    pub scheduled_at: DateTime<Utc>,
}

impl CollectJob {
    pub fn scheduled_now() -> Self {
        Self {
            version: PAYLOAD_VERSION,
            channel_ids: None,
            lookback_hours: None,
            scheduled_at: Utc::now(),
        }
    }
}

/// Payload of a `process` queue job: one whole collected batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessJob {
    #[serde(default = "payload_version")]
    pub version: u32,
    pub messages: Vec<NormalizedMessage>,
    pub user_id: String,
    pub source: String,
}

/// Payload of an `output` queue job, referencing the persisted summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputJob {
    #[serde(default = "payload_version")]
    pub version: u32,
    pub message_ids: Vec<String>,
    pub summary: String,
    pub relevance_score: f64,
    pub topics: Vec<String>,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub summary_id: String,
}

/// Terminal result of one collect invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome {
    /// Collector disabled in config: a legitimate terminal state, not a failure.
    Disabled,
    /// Lookback window held no messages; nothing to process.
    Empty,
    /// One process job enqueued with the whole batch.
    Enqueued { message_count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unversioned_payloads_default_to_version_one() {
        let job: ProcessJob = serde_json::from_str(
            r#"{"messages": [], "user_id": "default", "source": "slack"}"#,
        )
        .unwrap();
        assert_eq!(job.version, PAYLOAD_VERSION);
    }
}
