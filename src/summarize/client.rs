// src/summarize/client.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::ModelError;
use crate::source::NormalizedMessage;
use crate::summarize::prompt::SummarizeContext;
use crate::summarize::transcript;

/// A single non-streaming generation call against a model endpoint.
#[async_trait]
pub trait ModelEndpoint: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Ollama-style HTTP endpoint: POST `<base>/api/generate` with
/// `{model, prompt, stream: false}`, answering `{response, done}`.
pub struct HttpModelEndpoint {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[allow(dead_code)]
    done: bool,
}

impl HttpModelEndpoint {
    pub fn new(base_url: &str, model: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("channel-digest/0.1")
            .connect_timeout(Duration::from_secs(4))
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl ModelEndpoint for HttpModelEndpoint {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(model = %self.model, url = %url, "sending generate request");

        let resp = self
            .http
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .context("model endpoint post")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("model endpoint error: {status} {body}"));
        }

        let body: GenerateResponse = resp.json().await.context("decoding generate response")?;
        Ok(body.response)
    }
}

/// In-component retry discipline: fixed delay, bounded attempts, per-attempt
/// wall-clock timeout. The queue applies its own exponential backoff around
/// the whole process stage; the two layers are intentionally distinct — fast
/// local retry absorbs transient network blips, the queue's slower backoff
/// handles sustained outages. Do not collapse them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_secs(5),
            request_timeout: Duration::from_secs(120),
        }
    }
}

pub struct SummarizationClient<M> {
    endpoint: M,
    policy: RetryPolicy,
}

impl<M: ModelEndpoint> SummarizationClient<M> {
    pub fn new(endpoint: M) -> Self {
        Self::with_policy(endpoint, RetryPolicy::default())
    }

    pub fn with_policy(endpoint: M, policy: RetryPolicy) -> Self {
        Self { endpoint, policy }
    }

    /// Summarize a transcript under the composed context. The returned text
    /// is trimmed; an empty trimmed result is legal and left to caller
    /// policy. Raises `ModelError` only after the attempt ceiling.
    pub async fn summarize(
        &self,
        messages: &[NormalizedMessage],
        context: &SummarizeContext,
    ) -> Result<String, ModelError> {
        let prompt = build_prompt(messages, context);
        info!(messages = messages.len(), "summarizing transcript");

        let max = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max {
            let call = self.endpoint.generate(&prompt);
            let outcome = match tokio::time::timeout(self.policy.request_timeout, call).await {
                Ok(Ok(text)) => Some(text),
                Ok(Err(e)) => {
                    last_error = e.to_string();
                    None
                }
                Err(_) => {
                    last_error = format!(
                        "timed out after {}s",
                        self.policy.request_timeout.as_secs()
                    );
                    None
                }
            };

            match outcome {
                Some(text) => {
                    info!(attempt, "summary generated");
                    return Ok(text.trim().to_string());
                }
                None if attempt < max => {
                    warn!(
                        attempt,
                        max,
                        error = %last_error,
                        "model call failed; retrying after fixed delay"
                    );
                    counter!("model_retries_total").increment(1);
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
                None => {}
            }
        }

        counter!("model_exhausted_total").increment(1);
        Err(ModelError {
            attempts: max,
            last_error,
        })
    }
}

/// Assemble the full prompt: composed context, a note explaining the reply
/// indent, the rendered conversation, and the summary cue.
fn build_prompt(messages: &[NormalizedMessage], context: &SummarizeContext) -> String {
    format!(
        "{}\n\nNote: Messages indented with \"{}\" are replies within conversation threads.\n\nConversation:\n{}\n\nSummary:",
        context.composed(),
        transcript::THREAD_INDENT.trim_end(),
        transcript::render(messages)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ThreadMeta;

    fn msg(ts: &str, text: &str) -> NormalizedMessage {
        NormalizedMessage {
            id: format!("slack-C1-{ts}"),
            source: "slack".into(),
            text: text.into(),
            author_id: "U1".into(),
            display_name: "Ada".into(),
            timestamp: ts.into(),
            channel_id: "C1".into(),
            thread: ThreadMeta::top_level(None),
        }
    }

    #[test]
    fn generate_response_decodes_the_wire_shape() {
        let body: GenerateResponse =
            serde_json::from_str(r#"{"response": " summary text ", "done": true}"#).unwrap();
        assert_eq!(body.response, " summary text ");
        assert!(body.done);
    }

    #[test]
    fn endpoint_base_url_is_normalized() {
        let ep = HttpModelEndpoint::new("http://model:11434/", "llama3.1:8b");
        assert_eq!(ep.base_url, "http://model:11434");
    }

    #[test]
    fn prompt_contains_context_conversation_and_cue() {
        let ctx = SummarizeContext {
            system_prompt: "SYS".into(),
            source_prompt: Some("SRC".into()),
            interest_prompt: None,
        };
        let p = build_prompt(&[msg("1000.1", "hello")], &ctx);
        assert!(p.starts_with("SYS\n\nSRC\n\n"));
        assert!(p.contains("Conversation:\n["));
        assert!(p.contains("Ada: hello"));
        assert!(p.ends_with("Summary:"));
    }
}
