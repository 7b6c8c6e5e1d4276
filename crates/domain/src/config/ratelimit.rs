// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Rate limiting
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use super::env_helpers::{env_string, env_u16, env_u32, env_usize};

/// A single rate limit: `requests` admissions per `window_seconds`,
/// recorded under `scope`.
#[derive(Debug, Clone)]
pub struct RateLimit {
    pub requests: u32,
    pub window_seconds: u32,
    pub scope: &'static str,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub redis_host: String,
    pub redis_port: u16,
    pub key_prefix: String,
    pub ip_per_minute: RateLimit,
    pub ip_per_hour: RateLimit,
    pub chat_per_minute: RateLimit,
    pub voice_per_minute: RateLimit,
    pub health_per_minute: RateLimit,
    pub max_websocket_connections_per_ip: usize,
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        Self {
            redis_host: env_string("REDIS_HOST", "localhost"),
            redis_port: env_u16("REDIS_PORT", 6379),
            key_prefix: env_string("RATE_LIMIT_KEY_PREFIX", "rate_limit"),
            ip_per_minute: RateLimit {
                requests: env_u32("RATE_LIMIT_IP_PER_MINUTE", 100),
                window_seconds: 60,
                scope: "ip_per_minute",
            },
            ip_per_hour: RateLimit {
                requests: env_u32("RATE_LIMIT_IP_PER_HOUR", 1000),
                window_seconds: 3600,
                scope: "ip_per_hour",
            },
            chat_per_minute: RateLimit {
                requests: env_u32("RATE_LIMIT_CHAT_PER_MINUTE", 10),
                window_seconds: 60,
                scope: "chat_per_minute",
            },
            voice_per_minute: RateLimit {
                requests: env_u32("RATE_LIMIT_VOICE_PER_MINUTE", 5),
                window_seconds: 60,
                scope: "voice_per_minute",
            },
            health_per_minute: RateLimit {
                requests: env_u32("RATE_LIMIT_HEALTH_PER_MINUTE", 300),
                window_seconds: 60,
                scope: "endpoint",
            },
            max_websocket_connections_per_ip: env_usize("MAX_WEBSOCKET_PER_IP", 5),
        }
    }
}
