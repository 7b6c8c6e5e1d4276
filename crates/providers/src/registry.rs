//! Static model-alias registry.
//!
//! The alias table is loaded once at startup from [`RouterConfig`] and
//! never mutated afterward — readers need no lock, matching the
//! "immutable after startup" shared-resource policy for the model
//! descriptor table.

use std::collections::HashMap;

use orch_domain::config::{ModelDescriptor, RouterConfig};
use orch_domain::error::{Error, Result};

/// Whether the registry requires at least one configured backend alias at
/// startup. Defaults to `RequireOne`: the orchestrator has no useful
/// fallback behavior with zero model aliases configured, a stricter
/// default than allowing an empty registry to boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterStartupPolicy {
    RequireOne,
    AllowNone,
}

pub struct ModelRegistry {
    aliases: HashMap<String, ModelDescriptor>,
}

impl ModelRegistry {
    pub fn from_config(config: &RouterConfig, policy: RouterStartupPolicy) -> Result<Self> {
        if config.aliases.is_empty() && policy == RouterStartupPolicy::RequireOne {
            return Err(Error::Config(
                "no model aliases configured (MODEL_ALIASES is empty)".to_string(),
            ));
        }
        Ok(Self {
            aliases: config.aliases.clone(),
        })
    }

    pub fn resolve(&self, alias: &str) -> Option<&ModelDescriptor> {
        self.aliases.get(alias)
    }

    pub fn list_aliases(&self) -> Vec<String> {
        let mut names: Vec<String> = self.aliases.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orch_domain::config::ModelProvider;

    fn config_with_one_alias() -> RouterConfig {
        let mut aliases = HashMap::new();
        aliases.insert(
            "fast".to_string(),
            ModelDescriptor {
                provider: ModelProvider::Llamacpp,
                host: "127.0.0.1".to_string(),
                port: 8080,
                context_size: 8192,
                daily_cost_hint: 0,
            },
        );
        RouterConfig {
            aliases,
            classifier_alias: None,
            council_aliases: vec![],
            synthesis_alias: "fast".to_string(),
            default_timeout_ms: 60_000,
            health_check_timeout_ms: 5_000,
            council_size: 3,
            council_deadline_ms: 45_000,
            synthesis_deadline_ms: 30_000,
            max_concurrent_per_alias: 4,
        }
    }

    #[test]
    fn empty_aliases_fatal_under_require_one() {
        let config = RouterConfig {
            aliases: HashMap::new(),
            ..config_with_one_alias()
        };
        assert!(ModelRegistry::from_config(&config, RouterStartupPolicy::RequireOne).is_err());
        assert!(ModelRegistry::from_config(&config, RouterStartupPolicy::AllowNone).is_ok());
    }

    #[test]
    fn resolves_configured_alias() {
        let registry = ModelRegistry::from_config(&config_with_one_alias(), RouterStartupPolicy::RequireOne).unwrap();
        assert!(registry.resolve("fast").is_some());
        assert!(registry.resolve("ghost").is_none());
    }
}
