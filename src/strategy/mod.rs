//! Execution strategies.
//!
//! The engine dispatches nodes through an [`ExecutionStrategy`] chosen once
//! at startup: [`RealDispatch`] resolves handlers through the agent
//! registry; [`Simulated`] is the deterministic stand-in used when the real
//! agent runtime is unavailable. The step loop itself never branches on the
//! mode.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agents::{AgentRegistry, NodeOutput, StateMap};
use crate::definition::schema::NodeSpec;
use crate::error::AgentError;

/// Which dispatch path produced an execution's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Real,
    Simulated,
}

/// Strategy contract shared by the real dispatch path and the simulator.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    fn mode(&self) -> ExecutionMode;

    async fn dispatch(&self, state: &StateMap, node: &NodeSpec) -> Result<NodeOutput, AgentError>;
}

/// Resolves each node's agent through the registry and invokes it.
pub struct RealDispatch {
    registry: Arc<AgentRegistry>,
}

impl RealDispatch {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        RealDispatch { registry }
    }
}

#[async_trait]
impl ExecutionStrategy for RealDispatch {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Real
    }

    async fn dispatch(&self, state: &StateMap, node: &NodeSpec) -> Result<NodeOutput, AgentError> {
        let handler = self
            .registry
            .get(&node.agent)
            .ok_or_else(|| AgentError::UnknownAgent(node.agent.clone()))?;
        handler.execute(state, node).await
    }
}

/// Deterministic stand-in: echoes the input state and tags the output with
/// `simulated: true` so consumers can tell synthetic runs from real ones.
pub struct Simulated;

#[async_trait]
impl ExecutionStrategy for Simulated {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Simulated
    }

    async fn dispatch(&self, state: &StateMap, _node: &NodeSpec) -> Result<NodeOutput, AgentError> {
        let mut output = state.clone();
        output.insert("simulated".to_string(), Value::Bool(true));
        Ok(output)
    }
}
