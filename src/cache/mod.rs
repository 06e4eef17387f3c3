use crate::model::AiResponse;
use moka::future::Cache;
use std::time::Duration;

/// AI response cache. Entries older than the TTL read as absent; callers
/// cannot tell an expired entry from one that was never written.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Cache<String, AiResponse>,
}

impl ResponseCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { inner }
    }

    pub async fn get(&self, key_parts: &[&str]) -> Option<AiResponse> {
        self.inner.get(&Self::hash_key(key_parts)).await
    }

    pub async fn put(&self, key_parts: &[&str], response: AiResponse) {
        self.inner.insert(Self::hash_key(key_parts), response).await;
    }

    /// Hashes the ordered parts, each prefixed with its length, so neither
    /// reordering nor moving a separator between parts yields the same key.
    pub fn hash_key(key_parts: &[&str]) -> String {
        let mut hasher = blake3::Hasher::new();
        for part in key_parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AiResult;

    fn response(text: &str) -> AiResponse {
        AiResponse {
            result: AiResult::Text(text.to_string()),
            alternatives: None,
            is_offensive: false,
            from_cache: false,
        }
    }

    #[test]
    fn keys_are_deterministic_and_order_sensitive() {
        let a = ResponseCache::hash_key(&["u1", "neutralize-observation", "hi"]);
        let b = ResponseCache::hash_key(&["u1", "neutralize-observation", "hi"]);
        let c = ResponseCache::hash_key(&["neutralize-observation", "u1", "hi"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn separators_inside_parts_do_not_collide() {
        let a = ResponseCache::hash_key(&["a:suggest-feelings", "suggest-needs", "x", ""]);
        let b = ResponseCache::hash_key(&["a", "suggest-feelings", "suggest-needs:x", ""]);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn put_then_get_within_ttl() {
        let cache = ResponseCache::new(100, Duration::from_secs(600));
        let key = ["u1", "suggest-feelings", "I shouted"];
        assert!(cache.get(&key).await.is_none());

        cache.put(&key, response("angry")).await;
        assert_eq!(cache.get(&key).await, Some(response("angry")));
        assert!(cache.get(&["u2", "suggest-feelings", "I shouted"]).await.is_none());
    }

    #[tokio::test]
    async fn expired_entries_read_as_missing() {
        let cache = ResponseCache::new(100, Duration::from_millis(50));
        let key = ["u1", "generate-reflection", "text"];
        cache.put(&key, response("reflection")).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cache.get(&key).await.is_none());
    }
}
