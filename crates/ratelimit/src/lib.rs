//! Edge rate limiting (spec §4.2): Redis-backed sliding-window admission
//! plus in-process WebSocket connection accounting.
//!
//! Grounded on the sliding-window algorithm described in the original
//! `rate_limiting.py` middleware: a default set of IP-scoped limits, an
//! endpoint-specific override table, and extra scope-specific limits for
//! paths containing `/chat` or `/voice`. All applicable limits must pass;
//! the first rejection short-circuits the rest.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use orch_domain::config::{RateLimit, RateLimitConfig};
use orch_domain::trace::TraceEvent;
use orch_kv::KvStore;
use parking_lot::RwLock;

/// Outcome of a full admission check across every applicable limit.
#[derive(Debug, Clone)]
pub struct AdmissionDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u64,
    pub reset_unix_secs: i64,
    pub retry_after_secs: Option<u64>,
}

pub struct RateLimiter {
    kv: Arc<dyn KvStore>,
    config: RateLimitConfig,
    ws_connections: RwLock<HashMap<String, Arc<AtomicUsize>>>,
}

impl RateLimiter {
    pub fn new(kv: Arc<dyn KvStore>, config: RateLimitConfig) -> Self {
        Self {
            kv,
            config,
            ws_connections: RwLock::new(HashMap::new()),
        }
    }

    /// Client IP extraction order (spec §4.2): `X-Forwarded-For` (first
    /// token) → `X-Real-IP` → transport peer.
    pub fn extract_client_ip(
        forwarded_for: Option<&str>,
        real_ip: Option<&str>,
        peer_ip: &str,
    ) -> String {
        if let Some(xff) = forwarded_for {
            if let Some(first) = xff.split(',').next() {
                let trimmed = first.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
        if let Some(ip) = real_ip {
            if !ip.trim().is_empty() {
                return ip.trim().to_string();
            }
        }
        peer_ip.to_string()
    }

    pub fn is_loopback(ip: &str) -> bool {
        ip == "127.0.0.1" || ip == "::1"
    }

    /// Collect every limit applicable to this request, per spec §4.2:
    /// always the default IP-scoped set, the `/health` endpoint override,
    /// and scope-specific limits for `/chat` or `/voice` paths.
    fn applicable_limits(&self, path: &str) -> Vec<RateLimit> {
        let mut limits = vec![
            self.config.ip_per_minute.clone(),
            self.config.ip_per_hour.clone(),
        ];
        if path == "/health" {
            limits.push(self.config.health_per_minute.clone());
        }
        if path.contains("/chat") {
            limits.push(self.config.chat_per_minute.clone());
        }
        if path.contains("/voice") {
            limits.push(self.config.voice_per_minute.clone());
        }
        limits
    }

    fn window_key(&self, limit: &RateLimit, client_ip: &str, path: &str) -> String {
        if limit.scope == "endpoint" {
            format!(
                "{}:{}:{}:{}",
                self.config.key_prefix,
                limit.scope,
                client_ip,
                path.replace('/', "_")
            )
        } else {
            format!("{}:{}:{}", self.config.key_prefix, limit.scope, client_ip)
        }
    }

    /// Check every applicable limit. KV unavailability fails open (admit,
    /// warn) per spec §4.2's explicit rationale: availability over
    /// lockout for a DoS safeguard. Loopback health checks bypass limits
    /// entirely.
    pub async fn check(&self, client_ip: &str, path: &str, now_unix_secs: i64) -> AdmissionDecision {
        if path == "/health" && Self::is_loopback(client_ip) {
            return AdmissionDecision {
                allowed: true,
                limit: u32::MAX,
                remaining: u64::MAX,
                reset_unix_secs: now_unix_secs,
                retry_after_secs: None,
            };
        }

        let limits = self.applicable_limits(path);
        let mut most_restrictive: Option<AdmissionDecision> = None;

        for limit in &limits {
            let key = self.window_key(limit, client_ip, path);
            let result = self
                .kv
                .sliding_window_admit(&key, now_unix_secs, limit.window_seconds, limit.requests)
                .await;

            let result = match result {
                Ok(r) => r,
                Err(e) => {
                    TraceEvent::RateLimitFailOpen {
                        reason: e.to_string(),
                    }
                    .emit();
                    return AdmissionDecision {
                        allowed: true,
                        limit: limit.requests,
                        remaining: limit.requests as u64,
                        reset_unix_secs: now_unix_secs + limit.window_seconds as i64,
                        retry_after_secs: None,
                    };
                }
            };

            if !result.admitted() {
                let decision = AdmissionDecision {
                    allowed: false,
                    limit: limit.requests,
                    remaining: 0,
                    reset_unix_secs: now_unix_secs + limit.window_seconds as i64,
                    retry_after_secs: Some(limit.window_seconds as u64),
                };
                TraceEvent::RateLimitRejected {
                    client_ip: client_ip.to_string(),
                    scope: limit.scope.to_string(),
                    path: path.to_string(),
                    retry_after_secs: limit.window_seconds as u64,
                }
                .emit();
                return decision;
            }

            let decision = AdmissionDecision {
                allowed: true,
                limit: limit.requests,
                remaining: result.remaining(),
                reset_unix_secs: now_unix_secs + limit.window_seconds as i64,
                retry_after_secs: None,
            };
            let keep = match &most_restrictive {
                Some(current) => decision.remaining < current.remaining,
                None => true,
            };
            if keep {
                most_restrictive = Some(decision);
            }
        }

        most_restrictive.unwrap_or(AdmissionDecision {
            allowed: true,
            limit: u32::MAX,
            remaining: u64::MAX,
            reset_unix_secs: now_unix_secs,
            retry_after_secs: None,
        })
    }

    /// Attempt to admit a new WebSocket connection from `client_ip`.
    /// Returns `false` (and does not increment) if the per-IP cap would be
    /// exceeded.
    pub fn try_admit_websocket(&self, client_ip: &str) -> bool {
        let counter = {
            let connections = self.ws_connections.read();
            connections.get(client_ip).cloned()
        };
        let counter = counter.unwrap_or_else(|| {
            let mut connections = self.ws_connections.write();
            connections
                .entry(client_ip.to_string())
                .or_insert_with(|| Arc::new(AtomicUsize::new(0)))
                .clone()
        });

        let cap = self.config.max_websocket_connections_per_ip;
        let mut current = counter.load(Ordering::SeqCst);
        loop {
            if current >= cap {
                return false;
            }
            match counter.compare_exchange(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Release a previously admitted WebSocket connection slot.
    pub fn release_websocket(&self, client_ip: &str) {
        let connections = self.ws_connections.read();
        if let Some(counter) = connections.get(client_ip) {
            let _ = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                Some(v.saturating_sub(1))
            });
        }
    }
}

/// Clock-skew-tolerant monotonic timestamp source shared by callers that
/// need `now` in Unix seconds; kept as a single atomic so tests can freeze
/// it without touching the system clock.
pub struct Clock {
    frozen: Option<AtomicI64>,
}

impl Clock {
    pub fn system() -> Self {
        Self { frozen: None }
    }

    pub fn frozen_at(unix_secs: i64) -> Self {
        Self {
            frozen: Some(AtomicI64::new(unix_secs)),
        }
    }

    pub fn now_unix_secs(&self) -> i64 {
        match &self.frozen {
            Some(v) => v.load(Ordering::SeqCst),
            None => chrono::Utc::now().timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orch_kv::InMemoryKv;

    fn limiter() -> RateLimiter {
        let mut config = RateLimitConfig::from_env();
        config.chat_per_minute.requests = 2;
        RateLimiter::new(Arc::new(InMemoryKv::new()), config)
    }

    #[tokio::test]
    async fn admits_until_chat_limit_then_rejects() {
        let limiter = limiter();
        let a = limiter.check("1.2.3.4", "/api/chat", 1000).await;
        assert!(a.allowed);
        let b = limiter.check("1.2.3.4", "/api/chat", 1001).await;
        assert!(b.allowed);
        let c = limiter.check("1.2.3.4", "/api/chat", 1002).await;
        assert!(!c.allowed);
        assert!(c.retry_after_secs.is_some());
    }

    #[tokio::test]
    async fn different_ips_are_independent() {
        let limiter = limiter();
        limiter.check("1.1.1.1", "/api/chat", 1000).await;
        limiter.check("1.1.1.1", "/api/chat", 1001).await;
        let other = limiter.check("2.2.2.2", "/api/chat", 1001).await;
        assert!(other.allowed);
    }

    #[test]
    fn websocket_cap_enforced() {
        let mut config = RateLimitConfig::from_env();
        config.max_websocket_connections_per_ip = 2;
        let limiter = RateLimiter::new(Arc::new(InMemoryKv::new()), config);
        assert!(limiter.try_admit_websocket("9.9.9.9"));
        assert!(limiter.try_admit_websocket("9.9.9.9"));
        assert!(!limiter.try_admit_websocket("9.9.9.9"));
        limiter.release_websocket("9.9.9.9");
        assert!(limiter.try_admit_websocket("9.9.9.9"));
    }

    #[test]
    fn client_ip_extraction_prefers_forwarded_for() {
        let ip = RateLimiter::extract_client_ip(Some("10.0.0.1, 10.0.0.2"), Some("10.0.0.9"), "10.0.0.99");
        assert_eq!(ip, "10.0.0.1");
    }

    #[test]
    fn client_ip_extraction_falls_back_to_peer() {
        let ip = RateLimiter::extract_client_ip(None, None, "10.0.0.99");
        assert_eq!(ip, "10.0.0.99");
    }
}
