// src/pipeline/output.rs
use metrics::{counter, gauge};
use serde_json::json;
use tracing::info;

use crate::error::StageError;
use crate::pipeline::types::OutputJob;
use crate::pipeline::{ensure_metrics_described, record_failure};
use crate::sink::{ArtifactPaths, ResultSink};
use crate::store::JobStatusStore;

/// Output stage handler: persist the per-run file, the "latest" pointer, and
/// the metadata snapshot through the sink. The three writes run under one
/// job; a failure in any one fails the job and the queue re-runs all three,
/// which is safe because each write is idempotent.
pub async fn run_output(
    sink: &ResultSink,
    jobs: &dyn JobStatusStore,
    job: &OutputJob,
) -> Result<ArtifactPaths, StageError> {
    ensure_metrics_described();
    gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

    let payload = json!({
        "source": &job.source,
        "summary_id": &job.summary_id,
        "user_id": &job.user_id,
    });
    let job_id = jobs
        .job_started("output", payload)
        .await
        .map_err(StageError::Persistence)?;

    info!(source = %job.source, summary_id = %job.summary_id, "storing output artifacts");

    match sink
        .write_artifacts(job)
        .await
        .map_err(StageError::Persistence)
    {
        Ok(paths) => {
            counter!("output_writes_total").increment(1);
            jobs.job_completed(
                &job_id,
                json!({ "run_file": paths.run_file.display().to_string() }),
            )
            .await
            .map_err(StageError::Persistence)?;
            Ok(paths)
        }
        Err(e) => {
            record_failure(jobs, &job_id, &e).await;
            Err(e)
        }
    }
}
