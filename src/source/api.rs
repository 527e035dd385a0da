// src/source/api.rs
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::error::SourceError;
use crate::source::types::RawMessage;

/// Chat-source API surface the collector needs: paginated channel history,
/// thread replies by parent timestamp, and identity lookup.
#[async_trait]
pub trait ChannelApi: Send + Sync {
    /// Oldest-first page of channel history since `oldest` (unix seconds),
    /// capped at `limit` records.
    async fn history(
        &self,
        channel_id: &str,
        oldest: f64,
        limit: u32,
    ) -> Result<Vec<RawMessage>, SourceError>;

    /// Replies for the thread rooted at `parent_ts`. The upstream convention
    /// returns the parent itself at index 0.
    async fn thread_replies(
        &self,
        channel_id: &str,
        parent_ts: &str,
    ) -> Result<Vec<RawMessage>, SourceError>;

    /// Display name for a user id.
    async fn user_info(&self, user_id: &str) -> Result<String, SourceError>;
}

const DEFAULT_BASE_URL: &str = "https://slack.com/api";
const THREAD_REPLIES_LIMIT: u32 = 100;

/// Slack-compatible REST adapter.
pub struct HttpChannelApi {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpChannelApi {
    pub fn new(token: &str) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    /// Override the API origin (tests, proxies).
    pub fn with_base_url(token: &str, base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("channel-digest/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    async fn get_envelope<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = format!("{}/{}", self.base_url, method);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(format!("{method}: {e}")))?;

        let status = resp.status();
        if status.as_u16() == 429 {
            let retry_after_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return Err(SourceError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!(
                "{method}: http status {status}"
            )));
        }

        resp.json::<T>()
            .await
            .map_err(|e| SourceError::Unavailable(format!("{method}: decoding body: {e}")))
    }
}

// ---- Wire shapes ----

#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Option<Vec<WireMessage>>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
    #[serde(default)]
    reply_count: Option<u32>,
}

impl WireMessage {
    /// A record is usable only with a non-empty text, a timestamp, and an
    /// author; anything else (joins, bot stubs, tombstones) is dropped here.
    fn into_raw(self, channel_id: &str) -> Option<RawMessage> {
        let text = self.text.filter(|t| !t.is_empty())?;
        let ts = self.ts?;
        let user = self.user?;
        let is_reply = self.thread_ts.as_deref().is_some_and(|p| p != ts);
        Some(RawMessage {
            external_id: ts.clone(),
            author_id: user,
            text,
            timestamp: ts,
            channel_id: channel_id.to_string(),
            parent_thread_id: self.thread_ts.filter(|_| is_reply),
            is_thread_reply: is_reply,
            reply_count: self.reply_count,
        })
    }
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user: Option<WireUser>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

fn envelope_err(method: &str, error: Option<String>) -> SourceError {
    SourceError::Unavailable(format!(
        "{method}: api error: {}",
        error.unwrap_or_else(|| "unknown".to_string())
    ))
}

#[async_trait]
impl ChannelApi for HttpChannelApi {
    async fn history(
        &self,
        channel_id: &str,
        oldest: f64,
        limit: u32,
    ) -> Result<Vec<RawMessage>, SourceError> {
        let env: HistoryEnvelope = self
            .get_envelope(
                "conversations.history",
                &[
                    ("channel", channel_id.to_string()),
                    ("oldest", oldest.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        if !env.ok {
            return Err(envelope_err("conversations.history", env.error));
        }
        // Upstream returns newest-first; the collector wants oldest-first.
        let mut out: Vec<RawMessage> = env
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| m.into_raw(channel_id))
            .collect();
        out.reverse();
        Ok(out)
    }

    async fn thread_replies(
        &self,
        channel_id: &str,
        parent_ts: &str,
    ) -> Result<Vec<RawMessage>, SourceError> {
        let env: HistoryEnvelope = self
            .get_envelope(
                "conversations.replies",
                &[
                    ("channel", channel_id.to_string()),
                    ("ts", parent_ts.to_string()),
                    ("limit", THREAD_REPLIES_LIMIT.to_string()),
                ],
            )
            .await?;
        if !env.ok {
            return Err(envelope_err("conversations.replies", env.error));
        }
        Ok(env
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| m.into_raw(channel_id))
            .collect())
    }

    async fn user_info(&self, user_id: &str) -> Result<String, SourceError> {
        let env: UserEnvelope = self
            .get_envelope("users.info", &[("user", user_id.to_string())])
            .await?;
        if !env.ok {
            return Err(envelope_err("users.info", env.error));
        }
        env.user
            .and_then(|u| u.real_name.filter(|n| !n.is_empty()).or(u.name))
            .ok_or_else(|| {
                SourceError::Unavailable(format!("users.info: no name for {user_id}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_message_without_author_or_text_is_dropped() {
        let no_user = WireMessage {
            user: None,
            text: Some("hello".into()),
            ts: Some("1.0".into()),
            thread_ts: None,
            reply_count: None,
        };
        assert!(no_user.into_raw("C1").is_none());

        let empty_text = WireMessage {
            user: Some("U1".into()),
            text: Some(String::new()),
            ts: Some("1.0".into()),
            thread_ts: None,
            reply_count: None,
        };
        assert!(empty_text.into_raw("C1").is_none());
    }

    #[test]
    fn thread_parent_is_not_marked_as_reply() {
        // A thread parent carries thread_ts == ts.
        let parent = WireMessage {
            user: Some("U1".into()),
            text: Some("root".into()),
            ts: Some("10.5".into()),
            thread_ts: Some("10.5".into()),
            reply_count: Some(2),
        };
        let raw = parent.into_raw("C1").unwrap();
        assert!(!raw.is_thread_reply);
        assert_eq!(raw.parent_thread_id, None);

        let reply = WireMessage {
            user: Some("U2".into()),
            text: Some("child".into()),
            ts: Some("11.0".into()),
            thread_ts: Some("10.5".into()),
            reply_count: None,
        };
        let raw = reply.into_raw("C1").unwrap();
        assert!(raw.is_thread_reply);
        assert_eq!(raw.parent_thread_id.as_deref(), Some("10.5"));
    }

    #[test]
    fn history_envelope_decodes_sparse_payloads() {
        let env: HistoryEnvelope =
            serde_json::from_str(r#"{"ok": false, "error": "channel_not_found"}"#).unwrap();
        assert!(!env.ok);
        assert_eq!(env.error.as_deref(), Some("channel_not_found"));
        assert!(env.messages.is_none());
    }
}
