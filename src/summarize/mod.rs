// src/summarize/mod.rs
pub mod client;
pub mod prompt;
pub mod transcript;

pub use client::{HttpModelEndpoint, ModelEndpoint, RetryPolicy, SummarizationClient};
pub use prompt::{compose, interest_fragment, SummarizeContext};
