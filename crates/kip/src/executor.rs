use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use orch_domain::trace::TraceEvent;
use orch_treasury::{Treasury, TransactionKind};

use crate::model::{ActionResult, ActionStatus, PreGateFailure};
use crate::quota::QuotaTracker;
use crate::registry::KipRegistry;

pub struct KipExecutor {
    registry: Arc<KipRegistry>,
    quota: QuotaTracker,
    treasury: Option<Arc<Treasury>>,
}

impl KipExecutor {
    pub fn new(registry: Arc<KipRegistry>, quota_retention_days: u32, treasury: Option<Arc<Treasury>>) -> Self {
        Self {
            registry,
            quota: QuotaTracker::new(quota_retention_days),
            treasury,
        }
    }

    /// `ExecuteAction` (spec §4.5): five pre-execution gates in order,
    /// then debit-first, timeout-bounded invocation. Spend is never
    /// refunded on timeout or tool error ("Darwinian" policy).
    pub async fn execute_action(&self, agent_id: &str, tool_name: &str, params: serde_json::Value) -> ActionResult {
        let action_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();

        macro_rules! failure {
            ($reason:expr) => {{
                let completed_at = Utc::now();
                return ActionResult {
                    action_id,
                    agent_id: agent_id.to_string(),
                    tool_name: tool_name.to_string(),
                    status: ActionStatus::Error,
                    data: None,
                    message: Some($reason.as_str().to_string()),
                    cost_cents: 0,
                    transaction_id: None,
                    execution_time_seconds: completed_at
                        .signed_duration_since(started_at)
                        .num_milliseconds()
                        .max(0) as f64
                        / 1000.0,
                    started_at,
                    completed_at,
                };
            }};
        }

        // Gate 1 + 2: tool exists and is active.
        let Some(tool) = self.registry.get_tool(tool_name) else {
            failure!(PreGateFailure::ToolNotFound);
        };
        if !tool.active {
            failure!(PreGateFailure::ToolInactive);
        }

        // Gate 3: authorization.
        let Some(agent) = self.registry.get_agent(agent_id) else {
            failure!(PreGateFailure::NotAuthorized);
        };
        if !agent.is_authorized_for(&tool) {
            failure!(PreGateFailure::NotAuthorized);
        }

        // Gate 4: daily use quota.
        if self.quota.count_today(agent_id, tool_name) >= tool.max_daily_uses {
            failure!(PreGateFailure::DailyLimitExceeded);
        }

        // Gate 5: funds, if the tool has a cost and a treasury is wired in.
        if tool.cost_cents > 0 {
            if let Some(treasury) = &self.treasury {
                let check = treasury.check_funds(agent_id, tool.cost_cents);
                if !check.approved {
                    failure!(PreGateFailure::InsufficientFunds);
                }
            }
        }

        // Debit first.
        let mut transaction_id = None;
        if tool.cost_cents > 0 {
            if let Some(treasury) = &self.treasury {
                match treasury
                    .record_transaction(
                        agent_id,
                        -tool.cost_cents,
                        &format!("tool call: {tool_name}"),
                        TransactionKind::Spending,
                        "kip_executor",
                    )
                    .await
                {
                    Ok(Some(tx)) => transaction_id = Some(tx.tx_id),
                    Ok(None) => failure!(PreGateFailure::InsufficientFunds),
                    Err(_) => failure!(PreGateFailure::InsufficientFunds),
                }
            }
        }

        let Some(handler) = self.registry.handler_for(&tool.function_ref) else {
            let completed_at = Utc::now();
            return ActionResult {
                action_id,
                agent_id: agent_id.to_string(),
                tool_name: tool_name.to_string(),
                status: ActionStatus::Error,
                data: None,
                message: Some("tool has no registered handler".to_string()),
                cost_cents: tool.cost_cents,
                transaction_id,
                execution_time_seconds: completed_at
                    .signed_duration_since(started_at)
                    .num_milliseconds()
                    .max(0) as f64
                    / 1000.0,
                started_at,
                completed_at,
            };
        };

        let outcome = tokio::time::timeout(Duration::from_millis(tool.timeout_ms), handler.invoke(params)).await;

        let completed_at = Utc::now();
        let execution_time_seconds =
            completed_at.signed_duration_since(started_at).num_milliseconds().max(0) as f64 / 1000.0;

        let (status, data, message) = match outcome {
            Err(_) => (ActionStatus::Timeout, None, Some("tool execution timed out".to_string())),
            Ok(Err(message)) => (ActionStatus::Error, None, Some(message)),
            Ok(Ok(data)) => {
                self.quota.increment(agent_id, tool_name);
                (ActionStatus::Success, Some(data), None)
            }
        };

        TraceEvent::ToolExecuted {
            action_id: action_id.clone(),
            agent_id: agent_id.to_string(),
            tool_name: tool_name.to_string(),
            status: match status {
                ActionStatus::Success => "success".to_string(),
                ActionStatus::Error => "error".to_string(),
                ActionStatus::Timeout => "timeout".to_string(),
            },
            cost_cents: tool.cost_cents,
        }
        .emit();

        ActionResult {
            action_id,
            agent_id: agent_id.to_string(),
            tool_name: tool_name.to_string(),
            status,
            data,
            message,
            cost_cents: tool.cost_cents,
            transaction_id,
            execution_time_seconds,
            started_at,
            completed_at,
        }
    }
}
