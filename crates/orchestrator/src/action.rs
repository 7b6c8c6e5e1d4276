//! KIPExecution action-spec parsing (spec §4.6): the synthesizer's output
//! is scanned for a structured `{tool_name, params}` action spec.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct ActionSpec {
    pub tool_name: String,
    #[serde(default)]
    pub params: Value,
}

/// Parse failure or absence of an action is a safe no-op, never a phase
/// failure (spec §4.6).
pub fn parse_action(synthesis_output: &str) -> Option<ActionSpec> {
    let trimmed = synthesis_output.trim();
    if let Ok(spec) = serde_json::from_str::<ActionSpec>(trimmed) {
        return Some(spec);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<ActionSpec>(&trimmed[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json_action() {
        let spec = parse_action(r#"{"tool_name": "send_email", "params": {"to": "a@b.com"}}"#).unwrap();
        assert_eq!(spec.tool_name, "send_email");
        assert_eq!(spec.params["to"], "a@b.com");
    }

    #[test]
    fn parses_action_embedded_in_prose() {
        let text = r#"Sure, I'll do that: {"tool_name": "schedule_meeting", "params": {}} — done."#;
        let spec = parse_action(text).unwrap();
        assert_eq!(spec.tool_name, "schedule_meeting");
    }

    #[test]
    fn plain_prose_with_no_json_is_a_no_op() {
        assert!(parse_action("Here is your answer, no tool needed.").is_none());
    }

    #[test]
    fn json_missing_tool_name_is_a_no_op() {
        assert!(parse_action(r#"{"params": {}}"#).is_none());
    }
}
