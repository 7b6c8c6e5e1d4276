//! Phase graph (spec §4.6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Received,
    SmartRouter,
    PheromindScan,
    CouncilDeliberation,
    Synthesis,
    KipExecution,
    Complete,
    Failed,
}

/// `path_taken` reported on the final HTTP response (spec §6 `POST /api/chat`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathTaken {
    FastResponse,
    PheromindScan,
    CouncilDeliberation,
    KipExecution,
    Unknown,
}
