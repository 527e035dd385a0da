// src/pipeline/process.rs
use chrono::Utc;
use metrics::{counter, gauge};
use serde_json::json;
use tracing::info;

use crate::error::StageError;
use crate::pipeline::types::{OutputJob, ProcessJob, PAYLOAD_VERSION};
use crate::pipeline::{ensure_metrics_described, record_failure, JobQueue};
use crate::store::{ConfigStore, JobStatusStore, NewSummary, ProcessorConfig, SummaryStore};
use crate::summarize::{interest_fragment, ModelEndpoint, SummarizationClient, SummarizeContext};

/// Stated default until a real relevance scorer lands.
pub const PLACEHOLDER_RELEVANCE_SCORE: f64 = 0.8;

/// Process stage handler: summarize one collected batch and persist the
/// result.
///
/// Processor config and the user's active interests are loaded fresh on
/// every invocation — they may change between queue retries — and the
/// summarization client is rebuilt from that fresh config through
/// `make_client`. Exactly one summary record is persisted and exactly one
/// output job enqueued per successful run; a redelivery after the insert but
/// before acknowledgment writes a second summary, which is accepted under
/// the queue's at-least-once guarantee rather than deduplicated here.
///
/// Failures propagate unmodified after the FAILED record write.
pub async fn run_process<M, F>(
    config: &dyn ConfigStore,
    jobs: &dyn JobStatusStore,
    summaries: &dyn SummaryStore,
    queue: &dyn JobQueue,
    make_client: F,
    job: &ProcessJob,
) -> Result<String, StageError>
where
    M: ModelEndpoint,
    F: FnOnce(&ProcessorConfig) -> SummarizationClient<M>,
{
    ensure_metrics_described();
    gauge!("pipeline_last_run_ts").set(Utc::now().timestamp() as f64);

    let payload = json!({
        "source": &job.source,
        "user_id": &job.user_id,
        "message_count": job.messages.len(),
    });
    let job_id = jobs
        .job_started("process", payload)
        .await
        .map_err(StageError::Persistence)?;

    match process_inner(config, summaries, queue, make_client, job).await {
        Ok(summary_id) => {
            jobs.job_completed(&job_id, json!({ "summary_id": &summary_id }))
                .await
                .map_err(StageError::Persistence)?;
            Ok(summary_id)
        }
        Err(e) => {
            record_failure(jobs, &job_id, &e).await;
            Err(e)
        }
    }
}

async fn process_inner<M, F>(
    config: &dyn ConfigStore,
    summaries: &dyn SummaryStore,
    queue: &dyn JobQueue,
    make_client: F,
    job: &ProcessJob,
) -> Result<String, StageError>
where
    M: ModelEndpoint,
    F: FnOnce(&ProcessorConfig) -> SummarizationClient<M>,
{
    info!(
        source = %job.source,
        count = job.messages.len(),
        "processing collected batch"
    );

    let processor = config
        .processor_config()
        .await
        .map_err(StageError::Persistence)?;
    let interests = config
        .active_interests(&job.user_id)
        .await
        .map_err(StageError::Persistence)?;

    let fragment = interest_fragment(&interests);
    let context = SummarizeContext {
        system_prompt: processor.system_prompt.clone(),
        source_prompt: processor.source_prompts.get(&job.source).cloned(),
        interest_prompt: (!fragment.is_empty()).then_some(fragment),
    };

    let client = make_client(&processor);
    let summary_text = client.summarize(&job.messages, &context).await?;

    let generated_at = Utc::now();
    let message_ids: Vec<String> = job.messages.iter().map(|m| m.id.clone()).collect();

    let summary_id = summaries
        .insert_summary(NewSummary {
            source: job.source.clone(),
            text: summary_text.clone(),
            message_ids: message_ids.clone(),
            user_id: job.user_id.clone(),
            generated_at,
            relevance_score: PLACEHOLDER_RELEVANCE_SCORE,
            topics: Vec::new(),
        })
        .await
        .map_err(StageError::Persistence)?;

    counter!("process_summaries_total").increment(1);
    info!(summary_id = %summary_id, "summary persisted");

    queue
        .enqueue_output(OutputJob {
            version: PAYLOAD_VERSION,
            message_ids,
            summary: summary_text,
            relevance_score: PLACEHOLDER_RELEVANCE_SCORE,
            topics: Vec::new(),
            source: job.source.clone(),
            timestamp: generated_at,
            user_id: job.user_id.clone(),
            summary_id: summary_id.clone(),
        })
        .await
        .map_err(StageError::Persistence)?;

    Ok(summary_id)
}
