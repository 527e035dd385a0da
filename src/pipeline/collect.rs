// src/pipeline/collect.rs
use metrics::{counter, gauge};
use serde_json::json;
use tracing::{info, warn};

use crate::config::{resolve_source_token, RuntimeConfig};
use crate::error::StageError;
use crate::pipeline::types::{CollectJob, CollectOutcome, ProcessJob, PAYLOAD_VERSION};
use crate::pipeline::{ensure_metrics_described, record_failure, JobQueue};
use crate::source::{ChannelApi, SourceClient};
use crate::store::{CollectorConfig, ConfigStore, JobStatusStore};

/// Single-tenant for now; collect jobs don't carry a user.
const DEFAULT_USER: &str = "default";

/// Collect stage handler for one source. Marks the job record ACTIVE before
/// any other external I/O, fetches and normalizes the lookback window, and on
/// N>0 messages enqueues exactly one process job carrying the whole batch.
///
/// `make_client` builds the source client from the freshly loaded collector
/// row and resolved credential, so a config change between queue retries is
/// picked up; the host closes over its process-lifetime `AuthorCache` there.
///
/// A disabled collector and an empty window both complete with a
/// zero-message result; any error marks the record FAILED and re-raises so
/// the external queue owns retry/backoff.
pub async fn run_collect<A, F>(
    source: &str,
    runtime: &RuntimeConfig,
    config: &dyn ConfigStore,
    jobs: &dyn JobStatusStore,
    queue: &dyn JobQueue,
    make_client: F,
    job: &CollectJob,
) -> Result<CollectOutcome, StageError>
where
    A: ChannelApi,
    F: FnOnce(&CollectorConfig, &str) -> SourceClient<A>,
{
    ensure_metrics_described();
    counter!("collect_jobs_total").increment(1);
    gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

    let payload = serde_json::to_value(job).map_err(|e| StageError::Persistence(e.into()))?;
    let job_id = jobs
        .job_started("collect", payload)
        .await
        .map_err(StageError::Persistence)?;

    match collect_inner(source, runtime, config, queue, make_client, job).await {
        Ok(outcome) => {
            let result = match &outcome {
                CollectOutcome::Disabled => json!({ "message_count": 0, "disabled": true }),
                CollectOutcome::Empty => json!({ "message_count": 0 }),
                CollectOutcome::Enqueued { message_count } => {
                    json!({ "message_count": message_count })
                }
            };
            jobs.job_completed(&job_id, result)
                .await
                .map_err(StageError::Persistence)?;
            Ok(outcome)
        }
        Err(e) => {
            record_failure(jobs, &job_id, &e).await;
            Err(e)
        }
    }
}

async fn collect_inner<A, F>(
    source: &str,
    runtime: &RuntimeConfig,
    config: &dyn ConfigStore,
    queue: &dyn JobQueue,
    make_client: F,
    job: &CollectJob,
) -> Result<CollectOutcome, StageError>
where
    A: ChannelApi,
    F: FnOnce(&CollectorConfig, &str) -> SourceClient<A>,
{
    let collector = config
        .collector_config(source)
        .await
        .map_err(StageError::Persistence)?
        .ok_or_else(|| {
            StageError::ConfigurationMissing(format!("collector config for source '{source}'"))
        })?;

    if !collector.enabled {
        info!(source = %source, "collector disabled, completing with empty result");
        return Ok(CollectOutcome::Disabled);
    }

    let token = resolve_source_token(&collector, runtime).ok_or_else(|| {
        StageError::ConfigurationMissing(format!("api token for source '{source}'"))
    })?;

    let channels = job
        .channel_ids
        .clone()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| collector.channel_ids.clone());
    if channels.is_empty() {
        return Err(StageError::ConfigurationMissing(format!(
            "no channels configured for source '{source}'"
        )));
    }
    let lookback_hours = job.lookback_hours.unwrap_or(collector.lookback_hours);

    info!(
        source = %source,
        channels = channels.len(),
        lookback_hours,
        "collecting channel messages"
    );

    let client = make_client(&collector, &token);
    let messages = client.fetch_messages(&channels, lookback_hours).await?;

    if messages.is_empty() {
        warn!(source = %source, "no messages found in lookback window");
        return Ok(CollectOutcome::Empty);
    }

    let message_count = messages.len();
    queue
        .enqueue_process(ProcessJob {
            version: PAYLOAD_VERSION,
            messages,
            user_id: DEFAULT_USER.to_string(),
            source: source.to_string(),
        })
        .await
        .map_err(StageError::Persistence)?;

    info!(source = %source, count = message_count, "queued batch for processing");
    Ok(CollectOutcome::Enqueued { message_count })
}
