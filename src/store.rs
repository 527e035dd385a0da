// src/store.rs
// Contracts against the external relational store. Implementations are
// host-owned (connection pooling included); the core only depends on these
// traits and threads handles through stage entry points explicitly.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-source collector row: enable flag plus fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectorConfig {
    pub name: String,
    pub enabled: bool,
    pub channel_ids: Vec<String>,
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: f64,
    /// Credential for the source API; hosts may keep it out of the store and
    /// rely on the runtime fallback instead.
    #[serde(default)]
    pub api_token: Option<String>,
}

fn default_lookback_hours() -> f64 {
    24.0
}

/// Processor row: which model to call and the prompt fragments to compose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessorConfig {
    pub model: String,
    pub endpoint_url: String,
    pub system_prompt: String,
    /// Per-source prompt additions, keyed by source name.
    #[serde(default)]
    pub source_prompts: HashMap<String, String>,
}

/// A user-declared keyword with a relevance weight used to bias summaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interest {
    pub user_id: String,
    pub keyword: String,
    pub weight: f64,
    pub active: bool,
}

/// Terminal artifact persisted by the process stage. Never mutated after
/// creation; a queue redelivery may write it twice (at-least-once artifact).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewSummary {
    pub source: String,
    pub text: String,
    pub message_ids: Vec<String>,
    pub user_id: String,
    pub generated_at: DateTime<Utc>,
    pub relevance_score: f64,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Active,
    Completed,
    Failed,
}

/// Read access to collector/processor configuration and user interests.
/// Stages call these fresh on every invocation; nothing here may be cached
/// across jobs, since rows can change between queue retries.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn collector_config(&self, source: &str) -> Result<Option<CollectorConfig>>;
    async fn processor_config(&self) -> Result<ProcessorConfig>;
    /// Active interests only, any order; prompt assembly re-sorts by weight.
    async fn active_interests(&self, user_id: &str) -> Result<Vec<Interest>>;
}

/// Append-only job-status records. `job_started` writes ACTIVE before the
/// stage performs any other external I/O; exactly one of `job_completed` /
/// `job_failed` follows per attempt. Implementations own the attempt counter
/// and increment it on `job_failed`.
#[async_trait]
pub trait JobStatusStore: Send + Sync {
    async fn job_started(&self, stage: &str, payload: serde_json::Value) -> Result<String>;
    async fn job_completed(&self, job_id: &str, result: serde_json::Value) -> Result<()>;
    async fn job_failed(&self, job_id: &str, error: &str) -> Result<()>;
}

/// Durable summary persistence. Returns the new record's id.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn insert_summary(&self, summary: NewSummary) -> Result<String>;
}
