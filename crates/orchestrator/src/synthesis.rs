//! Synthesis (spec §4.6): the final synthesizer/verifier call.

use std::sync::Arc;

use orch_domain::error::Result;
use orch_providers::{GenerateOptions, GenerateResult, ModelRouter, RoutingIntent};

use crate::council::CouncilPosition;

/// Build the structured synthesis prompt. Council positions are sorted
/// alphabetically by alias so the prompt is stable regardless of fan-out
/// completion order (spec §5 "Ordering guarantees").
pub fn build_prompt(
    user_input: &str,
    intent: RoutingIntent,
    pheromind_signals: &[String],
    council_positions: &[CouncilPosition],
) -> String {
    if intent == RoutingIntent::SimpleQuery && council_positions.is_empty() && pheromind_signals.is_empty() {
        return user_input.to_string();
    }

    let mut sorted_positions = council_positions.to_vec();
    sorted_positions.sort_by(|a, b| a.model_alias.cmp(&b.model_alias));

    let mut prompt = String::new();
    prompt.push_str("User request:\n");
    prompt.push_str(user_input);
    prompt.push_str(&format!("\n\nIntent: {intent:?}\n"));

    if !pheromind_signals.is_empty() {
        prompt.push_str("\nAmbient signals from this conversation:\n");
        for signal in pheromind_signals {
            prompt.push_str(&format!("- {signal}\n"));
        }
    }

    if !sorted_positions.is_empty() {
        prompt.push_str("\nCouncil positions:\n");
        for position in &sorted_positions {
            prompt.push_str(&format!("[{}] {}\n", position.model_alias, position.answer));
        }
    }

    prompt.push_str("\nSynthesize a single final answer for the user.");
    prompt
}

pub async fn synthesize(
    request_id: &str,
    router: &Arc<ModelRouter>,
    synthesis_alias: &str,
    prompt: &str,
) -> Result<GenerateResult> {
    let options = GenerateOptions::default();
    router.generate(request_id, synthesis_alias, prompt, &options).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_query_with_no_context_passes_user_input_through() {
        let prompt = build_prompt("what time is it", RoutingIntent::SimpleQuery, &[], &[]);
        assert_eq!(prompt, "what time is it");
    }

    #[test]
    fn council_positions_are_sorted_alphabetically_in_the_prompt() {
        let positions = vec![
            CouncilPosition { model_alias: "zed".into(), answer: "z-answer".into(), latency_ms: 10 },
            CouncilPosition { model_alias: "alpha".into(), answer: "a-answer".into(), latency_ms: 10 },
        ];
        let prompt = build_prompt("compare these", RoutingIntent::ComplexReasoning, &[], &positions);
        let alpha_idx = prompt.find("[alpha]").unwrap();
        let zed_idx = prompt.find("[zed]").unwrap();
        assert!(alpha_idx < zed_idx);
    }
}
