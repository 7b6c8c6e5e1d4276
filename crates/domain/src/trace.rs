use serde::Serialize;

/// Structured trace events emitted across the orchestrator workspace.
///
/// Each variant corresponds to a point in the control flow where an
/// operator needs a bound-field log line rather than free text. Emitting
/// serializes the event and binds it on a single `tracing` line so the JSON
/// subscriber configured at startup indexes every field.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    RequestReceived {
        request_id: String,
        conversation_id: String,
        input_chars: usize,
    },
    PhaseTransition {
        request_id: String,
        from: String,
        to: String,
    },
    LlmRequest {
        request_id: String,
        alias: String,
        role: String,
    },
    LlmFallback {
        request_id: String,
        failed_alias: String,
        fallback_alias: String,
        reason: String,
    },
    CouncilQuorumReached {
        request_id: String,
        responded: usize,
        total: usize,
    },
    RateLimitRejected {
        client_ip: String,
        scope: String,
        path: String,
        retry_after_secs: u64,
    },
    RateLimitFailOpen {
        reason: String,
    },
    ValidationRejected {
        client_ip: String,
        path: String,
        pattern_family: String,
    },
    TransactionRecorded {
        tx_id: String,
        agent_id: String,
        amount_cents: i64,
        kind: String,
    },
    BudgetFrozen {
        agent_id: String,
        reason: String,
    },
    ToolExecuted {
        action_id: String,
        agent_id: String,
        tool_name: String,
        status: String,
        cost_cents: i64,
    },
    VoiceStageCompleted {
        request_id: String,
        stage: String,
        latency_ms: u64,
    },
}

impl TraceEvent {
    /// Emit this event. Rejections, fallbacks, and freezes log as warnings;
    /// everything else is informational.
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        match self {
            TraceEvent::RateLimitRejected { .. }
            | TraceEvent::RateLimitFailOpen { .. }
            | TraceEvent::ValidationRejected { .. }
            | TraceEvent::LlmFallback { .. }
            | TraceEvent::BudgetFrozen { .. } => {
                tracing::warn!(trace_event = %json, "orch_event");
            }
            _ => {
                tracing::info!(trace_event = %json, "orch_event");
            }
        }
    }
}
