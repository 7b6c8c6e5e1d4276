// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Orchestrator state machine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use super::env_helpers::{env_u64, env_usize};
use super::RouterConfig;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Hard cap on the whole `ProcessRequest` call, spanning every phase.
    pub request_timeout_ms: u64,
    /// TTL applied to pheromind signal keys (spec §6 `PHEROMIND_TTL`).
    pub pheromind_ttl_secs: u64,
    /// Maximum signals returned by a single `PheromindScan` read.
    pub pheromind_max_signals: usize,
}

impl OrchestratorConfig {
    pub fn from_env() -> Self {
        Self {
            request_timeout_ms: env_u64("REQUEST_TIMEOUT_MS", 120_000),
            pheromind_ttl_secs: env_u64("PHEROMIND_TTL", 12),
            pheromind_max_signals: env_usize("PHEROMIND_MAX_SIGNALS", 20),
        }
    }

    pub fn synthesis_deadline_combined_exceeds_request_cap(&self, router: &RouterConfig) -> bool {
        router.council_deadline_ms.saturating_add(router.synthesis_deadline_ms) > self.request_timeout_ms
    }
}
