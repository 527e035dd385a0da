// src/source/cache.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Process-lifetime author-name cache, injected into `SourceClient` rather
/// than owned by it, so the hosting worker decides its lifetime and sharing.
///
/// Concurrency contract: safe for concurrent reads and inserts from parallel
/// collect invocations. Identity resolution is idempotent, so two racing
/// writers at worst repeat one lookup; last write wins.
#[derive(Debug, Clone, Default)]
pub struct AuthorCache {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl AuthorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, author_id: &str) -> Option<String> {
        self.inner
            .lock()
            .expect("author cache mutex poisoned")
            .get(author_id)
            .cloned()
    }

    pub fn insert(&self, author_id: &str, display_name: &str) {
        self.inner
            .lock()
            .expect("author cache mutex poisoned")
            .insert(author_id.to_string(), display_name.to_string());
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("author cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_entries() {
        let cache = AuthorCache::new();
        let other = cache.clone();
        cache.insert("U1", "Ada");
        assert_eq!(other.get("U1").as_deref(), Some("Ada"));
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn last_write_wins() {
        let cache = AuthorCache::new();
        cache.insert("U1", "Ada");
        cache.insert("U1", "Ada L.");
        assert_eq!(cache.get("U1").as_deref(), Some("Ada L."));
    }
}
