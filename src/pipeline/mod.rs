// src/pipeline/mod.rs
pub mod collect;
pub mod output;
pub mod process;
pub mod types;

pub use collect::run_collect;
pub use output::run_output;
pub use process::run_process;
pub use types::{CollectJob, CollectOutcome, OutputJob, ProcessJob, PAYLOAD_VERSION};

use anyhow::Result;
use async_trait::async_trait;
use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;
use tracing::warn;

use crate::error::StageError;
use crate::store::JobStatusStore;

/// Enqueue access to the downstream work queues. Retry/backoff policy for the
/// enqueued jobs (reference: 3 attempts, exponential from 5s) belongs to the
/// host's queue setup, not to the handlers.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue_process(&self, job: ProcessJob) -> Result<()>;
    async fn enqueue_output(&self, job: OutputJob) -> Result<()>;
}

/// One-time metrics registration (so series show up on the host's exporter).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("source_messages_total", "Messages collected, replies included.");
        describe_counter!("source_thread_replies_total", "Thread replies fetched.");
        describe_counter!(
            "source_thread_fetch_errors_total",
            "Per-parent thread fetches swallowed after failure."
        );
        describe_counter!("source_author_cache_hits_total", "Author cache hits.");
        describe_counter!("model_retries_total", "Model calls retried in-component.");
        describe_counter!(
            "model_exhausted_total",
            "Summarizations that exhausted the retry ceiling."
        );
        describe_counter!("collect_jobs_total", "Collect stage invocations.");
        describe_counter!("process_summaries_total", "Summaries persisted.");
        describe_counter!("output_writes_total", "Output artifact sets written.");
        describe_gauge!("pipeline_last_run_ts", "Unix ts of the last stage run.");
    });
}

/// Best-effort FAILED record write. The stage error must still propagate even
/// when the status store itself is down, so this only logs.
pub(crate) async fn record_failure(jobs: &dyn JobStatusStore, job_id: &str, err: &StageError) {
    if let Err(store_err) = jobs.job_failed(job_id, &err.to_string()).await {
        warn!(
            job_id = %job_id,
            error = %store_err,
            "failed to record job failure; propagating original error anyway"
        );
    }
}
