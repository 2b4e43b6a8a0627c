//! Built-in agent handlers.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::definition::schema::NodeSpec;
use crate::error::AgentError;

use super::{AgentHandler, NodeOutput, StateMap};

/// Echoes its input back as output.
///
/// With no `config.keys`, the whole state map is returned; with
/// `config.keys: ["a", "b"]` only that slice is echoed.
pub struct EchoAgent;

#[async_trait]
impl AgentHandler for EchoAgent {
    async fn execute(&self, state: &StateMap, node: &NodeSpec) -> Result<NodeOutput, AgentError> {
        let keys = node.config.get("keys").and_then(|v| v.as_array());
        let output = match keys {
            Some(keys) => {
                let mut out = NodeOutput::new();
                for key in keys.iter().filter_map(|k| k.as_str()) {
                    if let Some(value) = state.get(key) {
                        out.insert(key.to_string(), value.clone());
                    }
                }
                out
            }
            None => state.clone(),
        };
        Ok(output)
    }
}

/// Remote handler: POSTs the run state to `config.url` and merges the JSON
/// object it returns. The request carries its own client-side timeout so a
/// dead endpoint fails the dispatch instead of pinning the engine to the
/// outer deadline.
pub struct HttpAgent {
    client: reqwest::Client,
}

impl HttpAgent {
    pub fn new() -> Self {
        HttpAgent {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentHandler for HttpAgent {
    async fn execute(&self, state: &StateMap, node: &NodeSpec) -> Result<NodeOutput, AgentError> {
        let url = node
            .config
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AgentError::ConfigError(format!("http agent on node {} has no url", node.id))
            })?;

        let response = self
            .client
            .post(url)
            .timeout(Duration::from_secs(node.timeout_secs))
            .json(&Value::Object(state.clone()))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout
                } else {
                    AgentError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::HttpError(format!(
                "{} returned {}",
                url, status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::HttpError(e.to_string()))?;
        match body {
            Value::Object(map) => Ok(map),
            other => {
                let mut out = NodeOutput::new();
                out.insert("response".to_string(), other);
                Ok(out)
            }
        }
    }
}

type FnAgentFuture = Pin<Box<dyn Future<Output = Result<NodeOutput, AgentError>> + Send>>;

/// Closure adapter, mainly for tests and small local handlers.
pub struct FnAgent {
    f: Box<dyn Fn(StateMap, NodeSpec) -> FnAgentFuture + Send + Sync>,
}

impl FnAgent {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(StateMap, NodeSpec) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<NodeOutput, AgentError>> + Send + 'static,
    {
        FnAgent {
            f: Box::new(move |state, node| Box::pin(f(state, node))),
        }
    }
}

#[async_trait]
impl AgentHandler for FnAgent {
    async fn execute(&self, state: &StateMap, node: &NodeSpec) -> Result<NodeOutput, AgentError> {
        (self.f)(state.clone(), node.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node_with_config(config: Value) -> NodeSpec {
        NodeSpec {
            id: "n1".to_string(),
            agent: "echo".to_string(),
            config,
            timeout_secs: 5,
            retry: None,
            optional: false,
        }
    }

    fn state(pairs: &[(&str, Value)]) -> StateMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_echo_full_state() {
        let s = state(&[("x", json!(1)), ("y", json!("two"))]);
        let out = EchoAgent
            .execute(&s, &node_with_config(json!({})))
            .await
            .unwrap();
        assert_eq!(out, s);
    }

    #[tokio::test]
    async fn test_echo_key_slice() {
        let s = state(&[("x", json!(1)), ("y", json!("two"))]);
        let out = EchoAgent
            .execute(&s, &node_with_config(json!({"keys": ["x"]})))
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.get("x"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_http_agent_missing_url() {
        let s = state(&[]);
        let err = HttpAgent::new()
            .execute(&s, &node_with_config(json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_fn_agent() {
        let agent = FnAgent::new(|state, _node| async move {
            let mut out = NodeOutput::new();
            let n = state.get("n").and_then(|v| v.as_i64()).unwrap_or(0);
            out.insert("n".to_string(), json!(n + 1));
            Ok(out)
        });
        let out = agent
            .execute(&state(&[("n", json!(41))]), &node_with_config(json!({})))
            .await
            .unwrap();
        assert_eq!(out.get("n"), Some(&json!(42)));
    }
}
