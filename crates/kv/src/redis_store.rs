use async_trait::async_trait;
use orch_domain::error::Result;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::{kv_unavailable, KvStore, SlidingWindowResult};

/// Redis-backed [`KvStore`]. Uses a single shared `ConnectionManager`,
/// which reconnects transparently and serializes pipelined commands.
pub struct RedisKv {
    conn: ConnectionManager,
}

impl RedisKv {
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let url = format!("redis://{host}:{port}");
        let client = redis::Client::open(url.as_str())
            .map_err(|e| kv_unavailable("opening redis client", e))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| kv_unavailable("connecting to redis", e))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisKv {
    async fn sliding_window_admit(
        &self,
        key: &str,
        now_unix_secs: i64,
        window_seconds: u32,
        limit: u32,
    ) -> Result<SlidingWindowResult> {
        let mut conn = self.conn.clone();
        let cutoff = now_unix_secs - window_seconds as i64;

        // One atomic pipeline: trim, count, add, expire. All four
        // operations execute as a single batch against Redis (spec §4.2).
        let (_, count_before, _, _): (i64, u64, i64, bool) = redis::pipe()
            .atomic()
            .zrembyscore(key, "-inf", cutoff)
            .zcard(key)
            .zadd(key, now_unix_secs, now_unix_secs)
            .expire(key, (window_seconds + 1) as i64)
            .query_async(&mut conn)
            .await
            .map_err(|e| kv_unavailable("sliding window pipeline", e))?;

        Ok(SlidingWindowResult {
            count_before,
            limit,
            window_seconds,
        })
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| kv_unavailable("get", e))
    }

    async fn set_string_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(key, value, ttl_seconds)
            .await
            .map_err(|e| kv_unavailable("set_ex", e))?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await.map_err(|e| kv_unavailable("del", e))?;
        Ok(())
    }

    async fn push_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        let member_key = format!("{key}:{value}");
        let now_ms = chrono::Utc::now().timestamp_millis();
        redis::pipe()
            .atomic()
            .zadd(key, &member_key, now_ms)
            .expire(key, ttl_seconds as i64)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| kv_unavailable("push_with_ttl", e))?;
        let _: () = conn
            .set_ex(&member_key, value, ttl_seconds)
            .await
            .map_err(|e| kv_unavailable("push_with_ttl value", e))?;
        Ok(())
    }

    async fn recent(&self, key: &str, limit: usize) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let member_keys: Vec<String> = conn
            .zrevrange(key, 0, limit as isize - 1)
            .await
            .map_err(|e| kv_unavailable("recent zrevrange", e))?;
        let mut out = Vec::with_capacity(member_keys.len());
        for mk in member_keys {
            if let Some(v) = conn
                .get::<_, Option<String>>(&mk)
                .await
                .map_err(|e| kv_unavailable("recent get", e))?
            {
                out.push(v);
            }
        }
        Ok(out)
    }
}
