// src/source/client.rs
use metrics::counter;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::source::api::ChannelApi;
use crate::source::cache::AuthorCache;
use crate::source::types::{sort_chronological, NormalizedMessage, RawMessage, ThreadMeta};

/// Per-call history page cap.
const PAGE_LIMIT: u32 = 1000;

/// Thread-aware message collector for one chat source.
///
/// Holds no mutable state of its own besides the injected `AuthorCache`, so a
/// queue-side rate limiter can invoke it at any cadence; concurrent calls only
/// share the cache, whose contract allows benign write races.
pub struct SourceClient<A> {
    api: A,
    cache: AuthorCache,
    source: String,
}

impl<A: ChannelApi> SourceClient<A> {
    pub fn new(api: A, cache: AuthorCache, source: &str) -> Self {
        Self {
            api,
            cache,
            source: source.to_string(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Collect messages from `channel_ids` (in input order) going back
    /// `lookback_hours`, resolve author names, pull in thread replies behind
    /// their parents, and return the combined list sorted by timestamp
    /// ascending (stable, parsed as decimal seconds).
    ///
    /// Upstream fetch errors and rate-limit signals propagate; a channel with
    /// zero records, a failed identity lookup, or a failed thread-reply fetch
    /// never fail the call.
    pub async fn fetch_messages(
        &self,
        channel_ids: &[String],
        lookback_hours: f64,
    ) -> Result<Vec<NormalizedMessage>, SourceError> {
        let now_secs = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        let lookback_time = now_secs - lookback_hours * 3600.0;

        let mut messages: Vec<NormalizedMessage> = Vec::new();

        for channel_id in channel_ids {
            debug!(channel = %channel_id, "fetching channel history");

            let page = self.api.history(channel_id, lookback_time, PAGE_LIMIT).await?;
            if page.is_empty() {
                debug!(channel = %channel_id, "no messages in lookback window");
                continue;
            }
            let fetched = page.len();

            for raw in page {
                if raw.text.is_empty() {
                    continue;
                }
                let reply_count = raw.reply_count.unwrap_or(0);
                let parent_ts = raw.external_id.clone();

                messages.push(self.normalize(raw).await);

                if reply_count > 0 {
                    debug!(
                        channel = %channel_id,
                        parent = %parent_ts,
                        replies = reply_count,
                        "fetching thread replies"
                    );
                    let replies = self.fetch_thread_replies(channel_id, &parent_ts).await;
                    counter!("source_thread_replies_total").increment(replies.len() as u64);
                    messages.extend(replies);
                }
            }

            debug!(channel = %channel_id, fetched, "channel done");
        }

        sort_chronological(&mut messages);

        counter!("source_messages_total").increment(messages.len() as u64);
        info!(
            source = %self.source,
            total = messages.len(),
            "collected messages including thread replies"
        );

        Ok(messages)
    }

    /// Replies for one parent, already normalized and flagged. The parent
    /// comes back at index 0 and is discarded. A fetch failure yields an
    /// empty list so one broken thread can't sink the whole batch.
    async fn fetch_thread_replies(
        &self,
        channel_id: &str,
        parent_ts: &str,
    ) -> Vec<NormalizedMessage> {
        let fetched = match self.api.thread_replies(channel_id, parent_ts).await {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    channel = %channel_id,
                    parent = %parent_ts,
                    error = %e,
                    "thread replies fetch failed; continuing without them"
                );
                counter!("source_thread_fetch_errors_total").increment(1);
                return Vec::new();
            }
        };

        let mut out = Vec::new();
        for raw in fetched.into_iter().skip(1) {
            if raw.text.is_empty() {
                continue;
            }
            let display_name = self.resolve_author(&raw.author_id).await;
            out.push(NormalizedMessage {
                id: self.message_id(&raw),
                source: self.source.clone(),
                text: raw.text,
                author_id: raw.author_id,
                display_name,
                timestamp: raw.timestamp,
                channel_id: raw.channel_id,
                thread: ThreadMeta::reply_to(parent_ts),
            });
        }
        out
    }

    async fn normalize(&self, raw: RawMessage) -> NormalizedMessage {
        let display_name = self.resolve_author(&raw.author_id).await;
        let thread = if raw.is_thread_reply {
            ThreadMeta {
                version: ThreadMeta::VERSION,
                parent_thread_id: raw.parent_thread_id.clone(),
                is_thread_reply: true,
                reply_count: raw.reply_count,
            }
        } else {
            ThreadMeta::top_level(raw.reply_count)
        };
        NormalizedMessage {
            id: self.message_id(&raw),
            source: self.source.clone(),
            text: raw.text,
            author_id: raw.author_id,
            display_name,
            timestamp: raw.timestamp,
            channel_id: raw.channel_id,
            thread,
        }
    }

    fn message_id(&self, raw: &RawMessage) -> String {
        format!("{}-{}-{}", self.source, raw.channel_id, raw.timestamp)
    }

    /// Resolve an author id through the shared cache. A lookup failure falls
    /// back to the raw id and is never cached, so a later call may still
    /// succeed.
    async fn resolve_author(&self, author_id: &str) -> String {
        if let Some(name) = self.cache.get(author_id) {
            counter!("source_author_cache_hits_total").increment(1);
            return name;
        }
        match self.api.user_info(author_id).await {
            Ok(name) => {
                self.cache.insert(author_id, &name);
                name
            }
            Err(e) => {
                debug!(author = %author_id, error = %e, "could not resolve author; using raw id");
                author_id.to_string()
            }
        }
    }
}
