use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authorization tiers a tool can demand and an agent can hold, ordered
/// `basic < intermediate < advanced < full` (spec §4.5 gate 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthLevel {
    Basic,
    Intermediate,
    Advanced,
    Full,
}

/// Static tool catalog entry (spec §3 `Tool`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub cost_cents: i64,
    pub category: String,
    pub min_auth_level: AuthLevel,
    pub max_daily_uses: u32,
    pub timeout_ms: u64,
    /// Identifier resolved against the registry's handler map at
    /// invocation time; not a function pointer, since tools are
    /// registered once at startup rather than loaded dynamically.
    pub function_ref: String,
    pub active: bool,
}

/// A single grant of authorization to an agent (spec §3 `authorized_tools`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedTool {
    pub tool_name: String,
    pub category: String,
    pub auth_level: AuthLevel,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentFunction {
    DataAnalyst,
    ContentCreator,
    Researcher,
    Coordinator,
    Monitor,
    Executor,
    Specialist,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Inactive,
    Active,
    Busy,
    Error,
    Maintenance,
    Retired,
}

/// Agent genome (spec §3 `Agent genome`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub function: AgentFunction,
    pub status: AgentStatus,
    pub authorized_tools: Vec<AuthorizedTool>,
    pub max_concurrent: u32,
    pub default_timeout_ms: u64,
    pub priority: u8,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Agent {
    /// An authorization matches if any grant names the tool directly or
    /// its category, at an auth level at or above the tool's minimum
    /// (spec §4.5 gate 3).
    pub fn is_authorized_for(&self, tool: &Tool) -> bool {
        self.authorized_tools.iter().any(|grant| {
            (grant.tool_name == tool.name || grant.category == tool.category)
                && grant.auth_level >= tool.min_auth_level
        })
    }
}

/// Gates and failures an execution attempt can hit, in the spec §4.5
/// priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreGateFailure {
    ToolNotFound,
    ToolInactive,
    NotAuthorized,
    DailyLimitExceeded,
    InsufficientFunds,
}

impl PreGateFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            PreGateFailure::ToolNotFound => "tool_not_found",
            PreGateFailure::ToolInactive => "tool_inactive",
            PreGateFailure::NotAuthorized => "not_authorized",
            PreGateFailure::DailyLimitExceeded => "daily_limit_exceeded",
            PreGateFailure::InsufficientFunds => "insufficient_funds",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Error,
    Timeout,
}

/// Outcome of `ExecuteAction` (spec §4.5).
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub action_id: String,
    pub agent_id: String,
    pub tool_name: String,
    pub status: ActionStatus,
    pub data: Option<serde_json::Value>,
    pub message: Option<String>,
    pub cost_cents: i64,
    pub transaction_id: Option<String>,
    pub execution_time_seconds: f64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}
