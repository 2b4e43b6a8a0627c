//! Execution instance records.
//!
//! One [`ExecutionInstance`] per run. Only the engine mutates it; everyone
//! else sees read-only snapshots through the execution handle. Status
//! transitions are monotonic and terminal states are absorbing; history is
//! append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::{NodeOutput, StateMap};
use crate::strategy::ExecutionMode;

/// Status of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Succeeded,
    Failed { error: ExecutionFailure },
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Succeeded
                | ExecutionStatus::Failed { .. }
                | ExecutionStatus::Cancelled
        )
    }
}

/// Structured failure surfaced through the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionFailure {
    /// Stable kind name: `NodeExecutionError`, `NodeTimeoutError`,
    /// `UnknownAgentError`, `ExecutionLimitExceeded`, ...
    pub kind: String,
    pub message: String,
    pub failed_node: Option<String>,
    pub attempt_count: u32,
}

/// One dispatch attempt recorded in history. Retries append separate
/// entries with increasing `attempt` under the same node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub node_id: String,
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<NodeOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One concrete run of a workflow version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionInstance {
    pub id: String,
    pub workflow_name: String,
    pub workflow_version: u32,
    pub state: StateMap,
    pub current_node: Option<String>,
    pub status: ExecutionStatus,
    pub history: Vec<ExecutionStep>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub mode: ExecutionMode,
}

impl ExecutionInstance {
    pub fn new(
        workflow_name: String,
        workflow_version: u32,
        input: StateMap,
        mode: ExecutionMode,
    ) -> Self {
        ExecutionInstance {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_name,
            workflow_version,
            state: input,
            current_node: None,
            status: ExecutionStatus::Pending,
            history: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
            mode,
        }
    }

    /// The node ids visited, in dispatch order, deduplicated per retry
    /// (successive attempts of one dispatch count once).
    pub fn path(&self) -> Vec<&str> {
        let mut path: Vec<&str> = Vec::new();
        for step in &self.history {
            if step.attempt == 1 {
                path.push(step.node_id.as_str());
            }
        }
        path
    }
}
