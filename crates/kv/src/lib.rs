//! Thin, typed key-value adapter.
//!
//! Exposes only the operations the rest of the workspace needs: sliding-
//! window rate-limit admission, a TTL'd string cache (budget cache,
//! transaction durable-copy, pheromind signals), and bounded recent-items
//! reads. Everything else about the backing store — connection pooling,
//! pipelining, retry — is private to the two implementations below.

use async_trait::async_trait;
use orch_domain::error::{Error, Result};

mod memory;
mod redis_store;

pub use memory::InMemoryKv;
pub use redis_store::RedisKv;

/// Result of a single sliding-window admission check (spec §4.2).
#[derive(Debug, Clone, Copy)]
pub struct SlidingWindowResult {
    /// Count of admissions in the window *before* this one was added.
    pub count_before: u64,
    pub limit: u32,
    pub window_seconds: u32,
}

impl SlidingWindowResult {
    pub fn admitted(&self) -> bool {
        self.count_before < self.limit as u64
    }

    pub fn remaining(&self) -> u64 {
        (self.limit as u64).saturating_sub(self.count_before + 1)
    }
}

/// Typed key-value adapter. Implementations must treat connection failure
/// as [`Error::KvUnavailable`] so callers (the rate limiter, the budget
/// cache) can apply their own fail-open/fail-closed policy — this crate
/// never decides that policy itself.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Atomically trim entries older than `window_seconds`, count what
    /// remains, add `now_unix_secs`, and refresh the key's expiry to
    /// `window_seconds + 1`. Returns the count *before* the add, so the
    /// caller can decide admit/reject without a second round-trip.
    async fn sliding_window_admit(
        &self,
        key: &str,
        now_unix_secs: i64,
        window_seconds: u32,
        limit: u32,
    ) -> Result<SlidingWindowResult>;

    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    async fn set_string_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;

    async fn del(&self, key: &str) -> Result<()>;

    /// Push a TTL'd item onto an ordered-by-arrival list (pheromind
    /// signals). Older-than-TTL items are not eagerly evicted; readers
    /// filter on read via `recent`.
    async fn push_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;

    /// Return up to `limit` most-recently-pushed items still within TTL.
    async fn recent(&self, key: &str, limit: usize) -> Result<Vec<String>>;
}

pub fn kv_unavailable(context: &str, source: impl std::fmt::Display) -> Error {
    Error::KvUnavailable(format!("{context}: {source}"))
}
