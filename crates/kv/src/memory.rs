use std::collections::HashMap;

use async_trait::async_trait;
use orch_domain::error::Result;
use parking_lot::Mutex;

use crate::{KvStore, SlidingWindowResult};

struct Entry {
    value: String,
    expires_at: std::time::Instant,
}

struct WindowEntry {
    timestamps: Vec<i64>,
    expires_at: std::time::Instant,
}

/// In-process [`KvStore`] for tests and for the `doctor` CLI path when no
/// Redis is configured. Not shared across instances, matching spec §1's
/// "each instance is independent" non-goal.
#[derive(Default)]
pub struct InMemoryKv {
    strings: Mutex<HashMap<String, Entry>>,
    windows: Mutex<HashMap<String, WindowEntry>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKv {
    async fn sliding_window_admit(
        &self,
        key: &str,
        now_unix_secs: i64,
        window_seconds: u32,
        limit: u32,
    ) -> Result<SlidingWindowResult> {
        let cutoff = now_unix_secs - window_seconds as i64;
        let mut windows = self.windows.lock();
        let entry = windows.entry(key.to_string()).or_insert_with(|| WindowEntry {
            timestamps: Vec::new(),
            expires_at: std::time::Instant::now(),
        });
        entry.timestamps.retain(|&ts| ts > cutoff);
        let count_before = entry.timestamps.len() as u64;
        entry.timestamps.push(now_unix_secs);
        entry.expires_at =
            std::time::Instant::now() + std::time::Duration::from_secs(window_seconds as u64 + 1);

        Ok(SlidingWindowResult {
            count_before,
            limit,
            window_seconds,
        })
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let mut strings = self.strings.lock();
        if let Some(entry) = strings.get(key) {
            if entry.expires_at > std::time::Instant::now() {
                return Ok(Some(entry.value.clone()));
            }
            strings.remove(key);
        }
        Ok(None)
    }

    async fn set_string_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        self.strings.lock().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: std::time::Instant::now() + std::time::Duration::from_secs(ttl_seconds),
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.strings.lock().remove(key);
        Ok(())
    }

    async fn push_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let member_key = format!("{key}::{}", uuid::Uuid::new_v4());
        self.set_string_ex(&member_key, value, ttl_seconds).await?;
        let list_key = format!("{key}::order");
        let mut strings = self.strings.lock();
        let mut order: Vec<String> = strings
            .get(&list_key)
            .map(|e| serde_json::from_str(&e.value).unwrap_or_default())
            .unwrap_or_default();
        order.push(member_key);
        strings.insert(
            list_key,
            Entry {
                value: serde_json::to_string(&order).unwrap_or_default(),
                expires_at: std::time::Instant::now() + std::time::Duration::from_secs(ttl_seconds),
            },
        );
        Ok(())
    }

    async fn recent(&self, key: &str, limit: usize) -> Result<Vec<String>> {
        let list_key = format!("{key}::order");
        let order: Vec<String> = match self.get_string(&list_key).await? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            None => return Ok(Vec::new()),
        };
        let mut out = Vec::new();
        for member_key in order.into_iter().rev() {
            if out.len() >= limit {
                break;
            }
            if let Some(v) = self.get_string(&member_key).await? {
                out.push(v);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sliding_window_admits_until_limit() {
        let kv = InMemoryKv::new();
        for i in 0..3 {
            let r = kv.sliding_window_admit("k", 1000 + i, 60, 3).await.unwrap();
            assert!(r.admitted(), "admission {i} should pass");
        }
        let r = kv.sliding_window_admit("k", 1003, 60, 3).await.unwrap();
        assert!(!r.admitted(), "fourth admission should be rejected");
    }

    #[tokio::test]
    async fn sliding_window_trims_expired_entries() {
        let kv = InMemoryKv::new();
        kv.sliding_window_admit("k", 0, 60, 1).await.unwrap();
        let r = kv.sliding_window_admit("k", 61, 60, 1).await.unwrap();
        assert!(r.admitted(), "old entry should have been trimmed");
    }

    #[tokio::test]
    async fn string_roundtrip() {
        let kv = InMemoryKv::new();
        kv.set_string_ex("a", "hello", 60).await.unwrap();
        assert_eq!(kv.get_string("a").await.unwrap(), Some("hello".to_string()));
        kv.del("a").await.unwrap();
        assert_eq!(kv.get_string("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn recent_returns_newest_first() {
        let kv = InMemoryKv::new();
        kv.push_with_ttl("p", "one", 60).await.unwrap();
        kv.push_with_ttl("p", "two", 60).await.unwrap();
        kv.push_with_ttl("p", "three", 60).await.unwrap();
        let recent = kv.recent("p", 2).await.unwrap();
        assert_eq!(recent, vec!["three".to_string(), "two".to_string()]);
    }
}
