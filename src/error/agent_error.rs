use thiserror::Error;

/// Agent-handler-level errors
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Execution error: {0}")]
    ExecutionError(String),
    #[error("Timeout: handler exceeded its deadline")]
    Timeout,
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("HTTP error: {0}")]
    HttpError(String),
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),
}

impl AgentError {
    /// Whether the engine's retry policy applies to this error.
    /// Configuration problems never become transient by retrying.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            AgentError::ConfigError(_)
                | AgentError::SerializationError(_)
                | AgentError::UnknownAgent(_)
        )
    }

    /// Failure kind name surfaced in execution reports.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AgentError::ConfigError(_) => "ConfigurationError",
            AgentError::Timeout => "NodeTimeoutError",
            AgentError::UnknownAgent(_) => "UnknownAgentError",
            _ => "NodeExecutionError",
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::SerializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability() {
        assert!(AgentError::ExecutionError("x".into()).is_retryable());
        assert!(AgentError::Timeout.is_retryable());
        assert!(AgentError::HttpError("503".into()).is_retryable());
        assert!(!AgentError::ConfigError("bad".into()).is_retryable());
        assert!(!AgentError::SerializationError("bad".into()).is_retryable());
        assert!(!AgentError::UnknownAgent("x".into()).is_retryable());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(AgentError::Timeout.kind_name(), "NodeTimeoutError");
        assert_eq!(
            AgentError::ExecutionError("x".into()).kind_name(),
            "NodeExecutionError"
        );
        assert_eq!(
            AgentError::ConfigError("x".into()).kind_name(),
            "ConfigurationError"
        );
    }
}
