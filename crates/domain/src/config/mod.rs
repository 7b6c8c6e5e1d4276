mod env_helpers;
mod kip;
mod orchestrator;
mod ratelimit;
mod router;
mod server;
mod treasury;
mod validation;
mod voice;

pub use kip::*;
pub use orchestrator::*;
pub use ratelimit::*;
pub use router::*;
pub use server::*;
pub use treasury::*;
pub use validation::*;
pub use voice::*;

use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process-wide configuration, assembled once at startup from the
/// environment and passed by read-only reference throughout.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub server: ServerConfig,
    pub router: RouterConfig,
    pub rate_limit: RateLimitConfig,
    pub validation: ValidationConfig,
    pub treasury: TreasuryConfig,
    pub kip: KipConfig,
    pub voice: VoiceConfig,
    pub orchestrator: OrchestratorConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::str::FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            _ => Ok(Environment::Development),
        }
    }
}

impl Config {
    /// Load configuration from the process environment. Defaults are
    /// applied for anything unset; call [`Config::validate`] afterward to
    /// discover anything that still needs operator attention.
    pub fn from_env() -> Self {
        let environment: Environment = std::env::var("ENVIRONMENT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Environment::Development);

        Self {
            environment,
            server: ServerConfig::from_env(),
            router: RouterConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
            validation: ValidationConfig::from_env(),
            treasury: TreasuryConfig::from_env(),
            kip: KipConfig::from_env(),
            voice: VoiceConfig::from_env(),
            orchestrator: OrchestratorConfig::from_env(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

fn err(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError {
        severity: ConfigSeverity::Error,
        field: field.into(),
        message: message.into(),
    }
}

fn warn(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError {
        severity: ConfigSeverity::Warning,
        field: field.into(),
        message: message.into(),
    }
}

impl Config {
    /// Validate the configuration and return every issue found (not just
    /// the first). In `production`, any missing secret or default
    /// credential is promoted from `Warning` to `Error`.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut issues = Vec::new();

        if self.server.port == 0 {
            issues.push(err("server.port", "port must be greater than 0"));
        }
        if self.server.host.trim().is_empty() {
            issues.push(err("server.host", "host must not be empty"));
        }
        for origin in &self.server.cors_allowed_origins {
            if origin == "*" && self.environment.is_production() {
                issues.push(warn(
                    "server.cors_allowed_origins",
                    "wildcard CORS origin in production",
                ));
            }
        }

        if self.router.aliases.is_empty() {
            issues.push(err(
                "router.aliases",
                "no model aliases configured; the router has nothing to dispatch to",
            ));
        }
        for (alias, desc) in &self.router.aliases {
            if desc.host.trim().is_empty() {
                issues.push(err(&format!("router.aliases.{alias}.host"), "host must not be empty"));
            }
            if desc.port == 0 {
                issues.push(err(&format!("router.aliases.{alias}.port"), "port must be greater than 0"));
            }
        }
        if !self.router.aliases.contains_key(&self.router.synthesis_alias) {
            issues.push(err(
                "router.synthesis_alias",
                format!(
                    "synthesis alias '{}' is not a configured model alias",
                    self.router.synthesis_alias
                ),
            ));
        }
        for alias in &self.router.council_aliases {
            if !self.router.aliases.contains_key(alias) {
                issues.push(err(
                    "router.council_aliases",
                    format!("council alias '{alias}' is not a configured model alias"),
                ));
            }
        }
        if self.router.council_aliases.is_empty() {
            issues.push(warn(
                "router.council_aliases",
                "no council aliases configured; complex/exploratory/action intents will fail council_unavailable",
            ));
        }

        if self.rate_limit.chat_per_minute.requests == 0 {
            issues.push(err("rate_limit.chat_per_minute", "requests must be greater than 0"));
        }
        if self.rate_limit.redis_host.trim().is_empty() {
            issues.push(warn(
                "rate_limit.redis_host",
                "empty redis host; rate limiting will fail open on every request",
            ));
        }

        if self.validation.max_request_size_bytes == 0 {
            issues.push(err("validation.max_request_size_bytes", "must be greater than 0"));
        }
        if self.validation.max_json_size_bytes > self.validation.max_request_size_bytes {
            issues.push(warn(
                "validation.max_json_size_bytes",
                "larger than max_request_size_bytes; the JSON limit can never bind",
            ));
        }

        if self.treasury.default_seed_cents < 0
            || self.treasury.default_daily_limit_cents <= 0
            || self.treasury.default_per_action_limit_cents <= 0
        {
            issues.push(err(
                "treasury",
                "seed must be non-negative and daily/per-action limits must be positive",
            ));
        }
        if self.treasury.default_per_action_limit_cents > self.treasury.default_daily_limit_cents {
            issues.push(warn(
                "treasury.default_per_action_limit_cents",
                "per-action limit exceeds daily limit; per-action ceiling will never bind",
            ));
        }

        if self.kip.quota_retention_days == 0 {
            issues.push(warn(
                "kip.quota_retention_days",
                "retention of 0 days discards usage counters immediately",
            ));
        }

        if self.voice.enabled && self.voice.base_url.trim().is_empty() {
            issues.push(err("voice.base_url", "voice enabled but base_url is empty"));
        }

        if self.orchestrator.request_timeout_ms == 0 {
            issues.push(err("orchestrator.request_timeout_ms", "must be greater than 0"));
        }
        if self.orchestrator.synthesis_deadline_combined_exceeds_request_cap(&self.router) {
            issues.push(warn(
                "orchestrator.request_timeout_ms",
                "smaller than council_deadline_ms + synthesis_deadline_ms; most requests will hit the overall cap before synthesis finishes",
            ));
        }

        if self.environment.is_production() {
            if self.server.admin_token_env_value().is_none() {
                issues.push(warn(
                    "admin.token",
                    "no admin bearer token configured; admin endpoints are disabled",
                ));
            }
            for issue in &mut issues {
                if issue.severity == ConfigSeverity::Warning
                    && (issue.field.starts_with("rate_limit.redis_host")
                        || issue.field.starts_with("server.cors_allowed_origins"))
                {
                    issue.severity = ConfigSeverity::Error;
                }
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::from_env();
        config.router.aliases.insert(
            "fast".into(),
            ModelDescriptor {
                provider: ModelProvider::Llamacpp,
                host: "127.0.0.1".into(),
                port: 8080,
                context_size: 8192,
                daily_cost_hint: 0,
            },
        );
        config.router.synthesis_alias = "fast".into();
        config.router.council_aliases = vec!["fast".into()];
        config
    }

    fn find_issue<'a>(issues: &'a [ConfigError], field: &str) -> Option<&'a ConfigError> {
        issues.iter().find(|i| i.field == field)
    }

    #[test]
    fn valid_config_has_no_errors() {
        let config = valid_config();
        let issues = config.validate();
        assert!(
            issues.iter().all(|i| i.severity != ConfigSeverity::Error),
            "unexpected errors: {issues:?}"
        );
    }

    #[test]
    fn zero_port_is_fatal() {
        let mut config = valid_config();
        config.server.port = 0;
        let issues = config.validate();
        let issue = find_issue(&issues, "server.port").expect("expected an issue");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn missing_synthesis_alias_is_fatal() {
        let mut config = valid_config();
        config.router.synthesis_alias = "missing".into();
        let issues = config.validate();
        assert!(find_issue(&issues, "router.synthesis_alias").is_some());
    }

    #[test]
    fn empty_council_is_warning_not_error() {
        let mut config = valid_config();
        config.router.council_aliases.clear();
        let issues = config.validate();
        let issue = find_issue(&issues, "router.council_aliases").unwrap();
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn production_promotes_redis_warning_to_error() {
        let mut config = valid_config();
        config.environment = Environment::Production;
        config.rate_limit.redis_host = String::new();
        let issues = config.validate();
        let issue = find_issue(&issues, "rate_limit.redis_host").unwrap();
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn per_action_over_daily_is_warning() {
        let mut config = valid_config();
        config.treasury.default_per_action_limit_cents = config.treasury.default_daily_limit_cents + 1;
        let issues = config.validate();
        let issue = find_issue(&issues, "treasury.default_per_action_limit_cents").unwrap();
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }
}
