// src/error.rs
// Error taxonomy for the pipeline core. Per-item failures (one author's
// identity, one thread's replies) are absorbed at the call site and never
// surface here; these types cover failures the external queue must see.

use thiserror::Error;

/// Failures talking to the upstream chat source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source API is unreachable or answered with a non-success status.
    #[error("source api unavailable: {0}")]
    Unavailable(String),

    /// The source signalled throttling. Propagated as-is; retry pacing is the
    /// queue's job, not this client's.
    #[error("source api rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },
}

/// The model endpoint stayed unreachable through the in-component retry loop.
#[derive(Debug, Error)]
#[error("model endpoint unavailable after {attempts} attempts: {last_error}")]
pub struct ModelError {
    pub attempts: u32,
    pub last_error: String,
}

/// Stage-level failure handed back to the external queue for retry/backoff.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// A required configuration value is absent (e.g. no collector row, no API
    /// credential). Note: a *disabled* collector is not an error.
    #[error("missing required configuration: {0}")]
    ConfigurationMissing(String),

    /// Store/queue/filesystem write failure, propagated unmodified.
    #[error("persistence failure: {0}")]
    Persistence(#[source] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_display_carries_attempts_and_cause() {
        let e = ModelError {
            attempts: 5,
            last_error: "connection refused".into(),
        };
        let s = e.to_string();
        assert!(s.contains("5 attempts"));
        assert!(s.contains("connection refused"));
    }

    #[test]
    fn stage_error_is_transparent_for_source() {
        let e = StageError::from(SourceError::Unavailable("boom".into()));
        assert_eq!(e.to_string(), "source api unavailable: boom");
    }
}
