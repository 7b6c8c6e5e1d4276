//! KIP tool registry and executor (spec §4.5): tool catalog, agent
//! authorization, per-agent daily quotas, and timed, debit-first
//! execution against the treasury.

mod executor;
mod model;
mod quota;
mod registry;

pub use executor::KipExecutor;
pub use model::{
    ActionResult, ActionStatus, Agent, AgentFunction, AgentStatus, AuthLevel, AuthorizedTool, PreGateFailure, Tool,
};
pub use quota::QuotaTracker;
pub use registry::{KipRegistry, ToolHandler};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use orch_kv::InMemoryKv;
    use orch_treasury::Treasury;

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        async fn invoke(&self, params: serde_json::Value) -> Result<serde_json::Value, String> {
            Ok(params)
        }
    }

    struct FailingTool;

    #[async_trait]
    impl ToolHandler for FailingTool {
        async fn invoke(&self, _params: serde_json::Value) -> Result<serde_json::Value, String> {
            Err("upstream exploded".to_string())
        }
    }

    struct HangingTool;

    #[async_trait]
    impl ToolHandler for HangingTool {
        async fn invoke(&self, _params: serde_json::Value) -> Result<serde_json::Value, String> {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok(json!({}))
        }
    }

    fn free_tool(name: &str, max_daily_uses: u32) -> Tool {
        Tool {
            name: name.to_string(),
            description: "test tool".to_string(),
            cost_cents: 0,
            category: "test".to_string(),
            min_auth_level: AuthLevel::Basic,
            max_daily_uses,
            timeout_ms: 1_000,
            function_ref: name.to_string(),
            active: true,
        }
    }

    fn agent_with(tool_name: &str, category: &str, auth_level: AuthLevel) -> Agent {
        Agent {
            agent_id: "data_analyst_01".to_string(),
            function: AgentFunction::DataAnalyst,
            status: AgentStatus::Active,
            authorized_tools: vec![AuthorizedTool {
                tool_name: tool_name.to_string(),
                category: category.to_string(),
                auth_level,
                granted_at: Utc::now(),
            }],
            max_concurrent: 1,
            default_timeout_ms: 5_000,
            priority: 5,
            created_at: Utc::now(),
            last_active: Utc::now(),
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let registry = Arc::new(KipRegistry::new());
        let executor = KipExecutor::new(registry, 7, None);
        let result = executor.execute_action("agent_x", "ghost_tool", json!({})).await;
        assert_eq!(result.message.as_deref(), Some(PreGateFailure::ToolNotFound.as_str()));
    }

    #[tokio::test]
    async fn inactive_tool_is_rejected() {
        let registry = Arc::new(KipRegistry::new());
        let mut tool = free_tool("echo", 5);
        tool.active = false;
        registry.register_tool(tool, Arc::new(EchoTool));
        registry.register_agent(agent_with("echo", "test", AuthLevel::Basic));

        let executor = KipExecutor::new(registry, 7, None);
        let result = executor.execute_action("data_analyst_01", "echo", json!({})).await;
        assert_eq!(result.message.as_deref(), Some(PreGateFailure::ToolInactive.as_str()));
    }

    #[tokio::test]
    async fn unauthorized_agent_is_rejected() {
        let registry = Arc::new(KipRegistry::new());
        registry.register_tool(free_tool("echo", 5), Arc::new(EchoTool));
        // agent authorized for a different tool/category entirely
        registry.register_agent(agent_with("other_tool", "other", AuthLevel::Full));

        let executor = KipExecutor::new(registry, 7, None);
        let result = executor.execute_action("data_analyst_01", "echo", json!({})).await;
        assert_eq!(result.message.as_deref(), Some(PreGateFailure::NotAuthorized.as_str()));
    }

    #[tokio::test]
    async fn insufficient_auth_level_is_rejected() {
        let registry = Arc::new(KipRegistry::new());
        let mut tool = free_tool("echo", 5);
        tool.min_auth_level = AuthLevel::Advanced;
        registry.register_tool(tool, Arc::new(EchoTool));
        registry.register_agent(agent_with("echo", "test", AuthLevel::Basic));

        let executor = KipExecutor::new(registry, 7, None);
        let result = executor.execute_action("data_analyst_01", "echo", json!({})).await;
        assert_eq!(result.message.as_deref(), Some(PreGateFailure::NotAuthorized.as_str()));
    }

    #[tokio::test]
    async fn successful_execution_increments_quota_and_returns_data() {
        let registry = Arc::new(KipRegistry::new());
        registry.register_tool(free_tool("echo", 2), Arc::new(EchoTool));
        registry.register_agent(agent_with("echo", "test", AuthLevel::Basic));

        let executor = KipExecutor::new(registry, 7, None);
        let result = executor.execute_action("data_analyst_01", "echo", json!({"x": 1})).await;
        assert_eq!(result.status, ActionStatus::Success);
        assert_eq!(result.data, Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn daily_quota_enforced_after_max_uses() {
        let registry = Arc::new(KipRegistry::new());
        registry.register_tool(free_tool("echo", 2), Arc::new(EchoTool));
        registry.register_agent(agent_with("echo", "test", AuthLevel::Basic));

        let executor = KipExecutor::new(registry, 7, None);
        for _ in 0..2 {
            let r = executor.execute_action("data_analyst_01", "echo", json!({})).await;
            assert_eq!(r.status, ActionStatus::Success);
        }
        let third = executor.execute_action("data_analyst_01", "echo", json!({})).await;
        assert_eq!(third.message.as_deref(), Some(PreGateFailure::DailyLimitExceeded.as_str()));
    }

    #[tokio::test]
    async fn timeout_does_not_refund_debited_cost() {
        let registry = Arc::new(KipRegistry::new());
        let mut tool = free_tool("hang", 5);
        tool.cost_cents = 200;
        tool.timeout_ms = 10;
        registry.register_tool(tool, Arc::new(HangingTool));
        registry.register_agent(agent_with("hang", "test", AuthLevel::Basic));

        let treasury = Arc::new(Treasury::new(5_000, 10_000, 1_000, Arc::new(InMemoryKv::new()), 60));
        treasury.initialize_budget("data_analyst_01", None, None, None).await.unwrap();

        let executor = KipExecutor::new(registry, 7, Some(treasury.clone()));
        let result = executor.execute_action("data_analyst_01", "hang", json!({})).await;
        assert_eq!(result.status, ActionStatus::Timeout);
        assert!(result.transaction_id.is_some());

        let budget = treasury.get_budget("data_analyst_01").await.unwrap();
        assert_eq!(budget.balance_cents, 5_000 - 200);
    }

    #[tokio::test]
    async fn insufficient_funds_blocks_execution_before_invoking_tool() {
        let registry = Arc::new(KipRegistry::new());
        let mut tool = free_tool("pricey", 5);
        tool.cost_cents = 200;
        registry.register_tool(tool, Arc::new(EchoTool));
        registry.register_agent(agent_with("pricey", "test", AuthLevel::Basic));

        let treasury = Arc::new(Treasury::new(50, 10_000, 1_000, Arc::new(InMemoryKv::new()), 60));
        treasury.initialize_budget("data_analyst_01", Some(50), None, None).await.unwrap();

        let executor = KipExecutor::new(registry, 7, Some(treasury));
        let result = executor.execute_action("data_analyst_01", "pricey", json!({})).await;
        assert_eq!(result.message.as_deref(), Some(PreGateFailure::InsufficientFunds.as_str()));
        assert_eq!(result.cost_cents, 0);
    }

    #[tokio::test]
    async fn tool_error_surfaces_sanitized_message() {
        let registry = Arc::new(KipRegistry::new());
        registry.register_tool(free_tool("flaky", 5), Arc::new(FailingTool));
        registry.register_agent(agent_with("flaky", "test", AuthLevel::Basic));

        let executor = KipExecutor::new(registry, 7, None);
        let result = executor.execute_action("data_analyst_01", "flaky", json!({})).await;
        assert_eq!(result.status, ActionStatus::Error);
        assert_eq!(result.message.as_deref(), Some("upstream exploded"));
    }
}
