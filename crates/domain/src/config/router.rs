// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Model router
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::env_helpers::{env_u32, env_u64, env_usize};

/// One entry of the static alias→backend table (spec §3 "Model descriptor").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub provider: ModelProvider,
    pub host: String,
    pub port: u16,
    pub context_size: u32,
    pub daily_cost_hint: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Llamacpp,
    Ollama,
    Other,
}

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub aliases: HashMap<String, ModelDescriptor>,
    /// Alias used for the SmartRouter classification call.
    pub classifier_alias: Option<String>,
    /// Aliases invoked in parallel during council deliberation.
    pub council_aliases: Vec<String>,
    /// Alias used for the final synthesis/verifier call.
    pub synthesis_alias: String,
    pub default_timeout_ms: u64,
    pub health_check_timeout_ms: u64,
    pub council_size: usize,
    pub council_deadline_ms: u64,
    pub synthesis_deadline_ms: u64,
    /// Cap on concurrent in-flight backend calls per model alias.
    pub max_concurrent_per_alias: usize,
}

impl RouterConfig {
    /// Build the alias table from `{PREFIX}_HOST_{ALIAS}` /
    /// `{PREFIX}_PORT_{ALIAS}` pairs declared via `MODEL_ALIASES` (a
    /// comma-separated list of alias names), with `LLAMACPP_MODEL_DIR` used
    /// only to confirm the backend family when the alias prefix is
    /// `LLAMACPP`.
    pub fn from_env() -> Self {
        let mut aliases = HashMap::new();

        let alias_names = std::env::var("MODEL_ALIASES").unwrap_or_default();
        for raw in alias_names.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let env_key = raw.to_ascii_uppercase().replace('-', "_");
            let host = std::env::var(format!("{env_key}_HOST"));
            let port = std::env::var(format!("{env_key}_PORT")).ok().and_then(|v| v.parse().ok());
            let provider = std::env::var(format!("{env_key}_PROVIDER"))
                .ok()
                .map(|v| match v.to_ascii_lowercase().as_str() {
                    "ollama" => ModelProvider::Ollama,
                    "llamacpp" => ModelProvider::Llamacpp,
                    _ => ModelProvider::Other,
                })
                .unwrap_or(ModelProvider::Llamacpp);

            if let (Ok(host), Some(port)) = (host, port) {
                aliases.insert(
                    raw.to_string(),
                    ModelDescriptor {
                        provider,
                        host,
                        port,
                        context_size: env_u32(&format!("{env_key}_CONTEXT_SIZE"), 8192),
                        daily_cost_hint: std::env::var(format!("{env_key}_DAILY_COST_HINT_CENTS"))
                            .ok()
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(0),
                    },
                );
            }
        }

        let council_aliases: Vec<String> = std::env::var("COUNCIL_ALIASES")
            .ok()
            .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        Self {
            synthesis_alias: std::env::var("SYNTHESIS_ALIAS").unwrap_or_else(|_| {
                aliases.keys().next().cloned().unwrap_or_default()
            }),
            classifier_alias: std::env::var("CLASSIFIER_ALIAS").ok(),
            council_size: env_usize("COUNCIL_SIZE", council_aliases.len().max(3)),
            council_aliases,
            default_timeout_ms: env_u64("BACKEND_DEFAULT_TIMEOUT_MS", 60_000),
            health_check_timeout_ms: env_u64("BACKEND_HEALTH_TIMEOUT_MS", 5_000),
            council_deadline_ms: env_u64("COUNCIL_DEADLINE_MS", 45_000),
            synthesis_deadline_ms: env_u64("SYNTHESIS_DEADLINE_MS", 30_000),
            max_concurrent_per_alias: env_usize("MAX_CONCURRENT_PER_ALIAS", 4),
            aliases,
        }
    }
}
