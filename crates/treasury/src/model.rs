use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Kind of ledger entry (spec §3 `Transaction.kind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Seed,
    Earning,
    Spending,
    RoiAdjustment,
    Penalty,
    Refund,
    Freeze,
    LimitAdjustment,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Seed => "seed",
            TransactionKind::Earning => "earning",
            TransactionKind::Spending => "spending",
            TransactionKind::RoiAdjustment => "roi_adjustment",
            TransactionKind::Penalty => "penalty",
            TransactionKind::Refund => "refund",
            TransactionKind::Freeze => "freeze",
            TransactionKind::LimitAdjustment => "limit_adjustment",
        }
    }
}

/// Per-agent budget state (spec §3 `Budget`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub agent_id: String,
    pub balance_cents: i64,
    pub total_spent: i64,
    pub total_earned: i64,
    pub daily_spent: i64,
    pub daily_limit: i64,
    pub per_action_limit: i64,
    pub last_reset_date: NaiveDate,
    pub frozen: bool,
    pub total_transactions: u64,
    pub roi_score: f64,
}

/// Revenue/cost breakdown attached to ROI-adjustment and penalty
/// transactions (spec §3 `RoiData`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoiData {
    pub revenue_cents: i64,
    pub cost_cents: i64,
    pub profit_cents: i64,
    pub roi_percent: f64,
}

/// Append-only ledger entry (spec §3 `Transaction`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_id: String,
    pub agent_id: String,
    pub amount_cents: i64,
    pub kind: TransactionKind,
    pub description: String,
    pub balance_before: i64,
    pub balance_after: i64,
    pub roi_data: Option<RoiData>,
    pub timestamp: DateTime<Utc>,
    pub processed_by: String,
}

/// Rejection reasons for `CheckFunds`, in spec §4.4 priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    InvalidAmount,
    EmergencyFreeze,
    AgentNotFound,
    AgentFrozen,
    InsufficientBalance,
    PerActionExceeded,
    DailyLimitExceeded,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::InvalidAmount => "invalid_amount",
            RejectReason::EmergencyFreeze => "emergency_freeze",
            RejectReason::AgentNotFound => "agent_not_found",
            RejectReason::AgentFrozen => "agent_frozen",
            RejectReason::InsufficientBalance => "insufficient_balance",
            RejectReason::PerActionExceeded => "per_action_exceeded",
            RejectReason::DailyLimitExceeded => "daily_limit_exceeded",
        }
    }
}
