//! Streaming event frames emitted during one request (spec §4.6).

use serde::Serialize;
use serde_json::Value;

use crate::phase::Phase;

/// Order within a request is strictly phase order, and within a phase, the
/// order produced (spec §5 "Ordering guarantees").
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "status")]
    Status { phase: Phase, message: String },

    #[serde(rename = "partial")]
    Partial { phase: Phase, content: String },

    #[serde(rename = "phase_complete")]
    PhaseComplete { phase: Phase, metadata: Value },

    #[serde(rename = "final")]
    Final { content: String, metadata: Value },

    #[serde(rename = "error")]
    Error { phase: Phase, message: String },

    #[serde(rename = "cancelled")]
    Cancelled,
}
