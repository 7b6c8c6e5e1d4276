// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use super::env_helpers::{env_string, env_u16};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_concurrent_requests: usize,
    admin_token_env: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|| vec!["http://localhost:*".into(), "http://127.0.0.1:*".into()]);

        Self {
            host: env_string("API_HOST", "127.0.0.1"),
            port: env_u16("API_PORT", 8080),
            cors_allowed_origins: origins,
            max_concurrent_requests: std::env::var("MAX_CONCURRENT_REQUESTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(256),
            admin_token_env: env_string("ADMIN_TOKEN_ENV", "ADMIN_TOKEN"),
        }
    }

    /// The admin bearer token, if the configured environment variable is set.
    /// Absence disables admin endpoints rather than failing startup.
    pub fn admin_token_env_value(&self) -> Option<String> {
        std::env::var(&self.admin_token_env).ok()
    }
}
