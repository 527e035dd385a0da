// src/lib.rs
// Public library surface for the collect -> process -> output pipeline.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod store;
pub mod summarize;

// ---- Re-exports for stable public API ----
pub use crate::error::{ModelError, SourceError, StageError};
pub use crate::pipeline::{run_collect, run_output, run_process, CollectOutcome, JobQueue};
pub use crate::sink::ResultSink;
pub use crate::source::{AuthorCache, SourceClient};
pub use crate::summarize::{RetryPolicy, SummarizationClient, SummarizeContext};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR DIGEST_ENV in {local, development, dev})
///   - DIGEST_DEV_LOG=1
///
/// Call this once from the hosting worker process, before handling jobs.
/// Also loads `.env` so local runs can configure tokens and paths from a file.
pub fn init_dev_tracing() {
    let _ = dotenvy::dotenv();

    let dev_flag = std::env::var("DIGEST_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("DIGEST_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("channel_digest=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}
