// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Treasury
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use super::env_helpers::env_i64;

#[derive(Debug, Clone)]
pub struct TreasuryConfig {
    pub default_seed_cents: i64,
    pub default_daily_limit_cents: i64,
    pub default_per_action_limit_cents: i64,
    /// TTL, in seconds, for the in-process budget cache in front of the KV
    /// store (spec §4.4: "1-minute TTL").
    pub budget_cache_ttl_secs: u64,
}

impl TreasuryConfig {
    pub fn from_env() -> Self {
        Self {
            default_seed_cents: env_i64("TREASURY_DEFAULT_SEED_CENTS", 5000),
            default_daily_limit_cents: env_i64("TREASURY_DEFAULT_DAILY_LIMIT_CENTS", 10_000),
            default_per_action_limit_cents: env_i64("TREASURY_DEFAULT_PER_ACTION_LIMIT_CENTS", 1_000),
            budget_cache_ttl_secs: 60,
        }
    }
}
