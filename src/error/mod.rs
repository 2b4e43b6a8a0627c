mod agent_error;
mod workflow_error;

pub use agent_error::AgentError;
pub use workflow_error::WorkflowError;

pub type WorkflowResult<T> = Result<T, WorkflowError>;
