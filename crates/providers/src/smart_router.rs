//! Deterministic intent classification fallback.
//!
//! Pure, synchronous heuristic used when no classifier model alias is
//! configured, or as the default the orchestrator falls back to when a
//! classifier call itself fails. No HTTP, no async — just lexical signal
//! combination, mirroring the pure-decision-logic shape used for model
//! tier resolution elsewhere in this workspace.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingIntent {
    SimpleQuery,
    ComplexReasoning,
    Exploratory,
    Action,
}

const SIMPLE_MARKERS: &[&str] = &["what", "who", "when", "where", "define", "definition of"];
const COMPLEX_MARKERS: &[&str] = &["pros and cons", "compare", "analyze", "trade-off", "trade-offs"];
const EXPLORATORY_MARKERS: &[&str] = &["find connections", "explore", "patterns", "related to"];
const ACTION_VERBS: &[&str] = &[
    "send", "create", "delete", "update", "schedule", "book", "buy", "execute", "run", "cancel",
];

const LONG_INPUT_TOKEN_THRESHOLD: usize = 15;

/// Classify a user utterance using lexical signals combined with length
/// (spec §4.6: "length (> 15 tokens biases away from simple)").
pub fn classify(text: &str) -> (RoutingIntent, f32) {
    let lower = text.to_ascii_lowercase();
    let token_count = text.split_whitespace().count();
    let starts_with_action_verb = lower
        .split_whitespace()
        .next()
        .map(|first| ACTION_VERBS.contains(&first))
        .unwrap_or(false);

    let matches = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if matches(COMPLEX_MARKERS) {
        return (RoutingIntent::ComplexReasoning, 0.85);
    }
    if matches(EXPLORATORY_MARKERS) {
        return (RoutingIntent::Exploratory, 0.8);
    }
    if starts_with_action_verb {
        return (RoutingIntent::Action, 0.8);
    }
    if matches(SIMPLE_MARKERS) {
        let confidence = if token_count > LONG_INPUT_TOKEN_THRESHOLD { 0.45 } else { 0.9 };
        return finalize(RoutingIntent::SimpleQuery, confidence);
    }

    // No strong lexical signal: longer inputs lean complex, short ones
    // default to simple with reduced confidence.
    if token_count > LONG_INPUT_TOKEN_THRESHOLD {
        (RoutingIntent::ComplexReasoning, 0.55)
    } else {
        finalize(RoutingIntent::SimpleQuery, 0.6)
    }
}

/// Confidence below 0.5 conservatively routes to complex reasoning rather
/// than trusting a weak classification (spec §4.6).
fn finalize(intent: RoutingIntent, confidence: f32) -> (RoutingIntent, f32) {
    if confidence < 0.5 {
        (RoutingIntent::ComplexReasoning, confidence)
    } else {
        (intent, confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn who_is_question_classifies_simple() {
        let (intent, confidence) = classify("Who is the CEO of Google?");
        assert_eq!(intent, RoutingIntent::SimpleQuery);
        assert!(confidence >= 0.5);
    }

    #[test]
    fn pros_and_cons_classifies_complex() {
        let (intent, _) = classify("What are the pros and cons of starting an AI business in 2025?");
        assert_eq!(intent, RoutingIntent::ComplexReasoning);
    }

    #[test]
    fn explore_patterns_classifies_exploratory() {
        let (intent, _) = classify("Help me explore patterns in this dataset");
        assert_eq!(intent, RoutingIntent::Exploratory);
    }

    #[test]
    fn imperative_verb_classifies_action() {
        let (intent, _) = classify("Schedule a meeting with the team tomorrow");
        assert_eq!(intent, RoutingIntent::Action);
    }

    #[test]
    fn long_simple_looking_input_biases_away_from_simple() {
        let long_input = "what ".to_string() + &"word ".repeat(20);
        let (intent, confidence) = classify(&long_input);
        assert!(confidence < 0.5 || intent != RoutingIntent::SimpleQuery);
        assert_eq!(intent, RoutingIntent::ComplexReasoning);
    }
}
