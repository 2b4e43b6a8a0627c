//! Workflow-level error types.

use thiserror::Error;

use crate::definition::validation::ValidationReport;

/// Workflow-level errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Validation failed")]
    ValidationFailed(Box<ValidationReport>),
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),
    #[error("Workflow version not found: {name} v{version}")]
    VersionNotFound { name: String, version: u32 },
    #[error("Node not found: {0}")]
    NodeNotFound(String),
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),
    #[error("Graph build error: {0}")]
    GraphBuildError(String),
    #[error("Execution not found: {0}")]
    ExecutionNotFound(String),
    #[error("Max steps exceeded: {0}")]
    ExecutionLimitExceeded(u32),
    #[error("Execution cancelled")]
    Cancelled,
    #[error("Node execution failed: node={node_id}, attempts={attempt_count}, error={error}")]
    NodeExecutionFailed {
        node_id: String,
        attempt_count: u32,
        error: String,
    },
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl WorkflowError {
    /// Stable name used in user-facing failure reports.
    pub fn kind_name(&self) -> &'static str {
        match self {
            WorkflowError::ValidationFailed(_) => "ConfigurationError",
            WorkflowError::WorkflowNotFound(_) | WorkflowError::VersionNotFound { .. } => {
                "WorkflowNotFound"
            }
            WorkflowError::NodeNotFound(_) => "NodeNotFound",
            WorkflowError::UnknownAgent(_) => "UnknownAgentError",
            WorkflowError::GraphBuildError(_) => "ConfigurationError",
            WorkflowError::ExecutionNotFound(_) => "ExecutionNotFound",
            WorkflowError::ExecutionLimitExceeded(_) => "ExecutionLimitExceeded",
            WorkflowError::Cancelled => "CancellationRequested",
            WorkflowError::NodeExecutionFailed { .. } => "NodeExecutionError",
            WorkflowError::InternalError(_) => "InternalError",
        }
    }
}
