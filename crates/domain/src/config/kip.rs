// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// KIP tool registry & executor
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use super::env_helpers::env_string;

#[derive(Debug, Clone)]
pub struct KipConfig {
    /// Path to a JSON file describing the static tool catalog, loaded once
    /// at startup. The registry is immutable for the process lifetime.
    pub tool_catalog_path: String,
    /// Per-(agent, tool, date) usage counters older than this are pruned
    /// on every increment (spec §4.5: "discard counter keys older than 7
    /// days").
    pub quota_retention_days: u32,
}

impl KipConfig {
    pub fn from_env() -> Self {
        Self {
            tool_catalog_path: env_string("KIP_TOOL_CATALOG_PATH", "tools.json"),
            quota_retention_days: 7,
        }
    }
}
