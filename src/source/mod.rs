// src/source/mod.rs
pub mod api;
pub mod cache;
pub mod client;
pub mod types;

pub use api::{ChannelApi, HttpChannelApi};
pub use cache::AuthorCache;
pub use client::SourceClient;
pub use types::{NormalizedMessage, RawMessage, ThreadMeta};
