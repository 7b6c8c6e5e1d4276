//! Static tool catalog and agent registry.
//!
//! Tools and agents are registered once at startup and read far more than
//! written, so lookups go through a reader-writer lock the way the process
//! manager and tool manager elsewhere in this workspace guard their
//! in-memory tables.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::model::{Agent, Tool};

/// A tool's executable behavior, looked up by `Tool::function_ref` at
/// invocation time. Registered once at startup; no dynamic loading.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, params: serde_json::Value) -> Result<serde_json::Value, String>;
}

#[derive(Default)]
pub struct KipRegistry {
    tools: RwLock<HashMap<String, Tool>>,
    handlers: RwLock<HashMap<String, Arc<dyn ToolHandler>>>,
    agents: RwLock<HashMap<String, Agent>>,
}

impl KipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tool(&self, tool: Tool, handler: Arc<dyn ToolHandler>) {
        let ref_name = tool.function_ref.clone();
        self.tools.write().insert(tool.name.clone(), tool);
        self.handlers.write().insert(ref_name, handler);
    }

    pub fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tools.read().get(name).cloned()
    }

    pub fn handler_for(&self, function_ref: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.read().get(function_ref).cloned()
    }

    pub fn register_agent(&self, agent: Agent) {
        self.agents.write().insert(agent.agent_id.clone(), agent);
    }

    pub fn get_agent(&self, agent_id: &str) -> Option<Agent> {
        self.agents.read().get(agent_id).cloned()
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.read().values().cloned().collect()
    }

    pub fn list_agents(&self) -> Vec<Agent> {
        self.agents.read().values().cloned().collect()
    }
}
