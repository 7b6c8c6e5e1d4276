//! SmartRouter phase (spec §4.6): classify the request into one of four
//! intents, preferring a single lightweight LLM call when a classifier
//! alias is configured, falling back to the deterministic heuristic.

use std::sync::Arc;

use orch_providers::{classify, GenerateOptions, ModelRouter, RoutingIntent};

pub async fn classify_request(
    request_id: &str,
    router: &Arc<ModelRouter>,
    classifier_alias: Option<&str>,
    user_input: &str,
) -> (RoutingIntent, f32) {
    if let Some(alias) = classifier_alias {
        if let Some(result) = classify_with_llm(request_id, router, alias, user_input).await {
            return result;
        }
    }
    classify(user_input)
}

async fn classify_with_llm(
    request_id: &str,
    router: &Arc<ModelRouter>,
    alias: &str,
    user_input: &str,
) -> Option<(RoutingIntent, f32)> {
    let prompt = format!(
        "Classify the following user request into exactly one of: simple_query, \
         complex_reasoning, exploratory, action. Reply with only the label.\n\nRequest: {user_input}"
    );
    let mut options = GenerateOptions::default();
    options.max_tokens = 8;
    let result = router.generate(request_id, alias, &prompt, &options).await.ok()?;
    let label = result.content.trim().to_ascii_lowercase();
    let intent = match label.as_str() {
        "simple_query" => RoutingIntent::SimpleQuery,
        "complex_reasoning" => RoutingIntent::ComplexReasoning,
        "exploratory" => RoutingIntent::Exploratory,
        "action" => RoutingIntent::Action,
        _ => return None,
    };
    Some((intent, 0.9))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn falls_back_to_heuristic_when_no_classifier_alias_configured() {
        let registry = orch_providers::ModelRegistry::from_config(
            &test_router_config(),
            orch_providers::RouterStartupPolicy::AllowNone,
        )
        .unwrap();
        let router = Arc::new(ModelRouter::new(registry, 1000, 1000));
        let (intent, _) = classify_request("req-1", &router, None, "Schedule a meeting").await;
        assert_eq!(intent, RoutingIntent::Action);
    }

    fn test_router_config() -> orch_domain::config::RouterConfig {
        orch_domain::config::RouterConfig {
            aliases: std::collections::HashMap::new(),
            classifier_alias: None,
            council_aliases: vec![],
            synthesis_alias: "fast".into(),
            default_timeout_ms: 1000,
            health_check_timeout_ms: 1000,
            council_size: 3,
            council_deadline_ms: 1000,
            synthesis_deadline_ms: 1000,
            max_concurrent_per_alias: 4,
        }
    }
}
