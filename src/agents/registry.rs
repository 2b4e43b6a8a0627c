use std::collections::HashMap;
use std::sync::Arc;

use super::AgentHandler;

/// Registry of agent handlers by agent name.
pub struct AgentRegistry {
    handlers: HashMap<String, Arc<dyn AgentHandler>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        AgentRegistry {
            handlers: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in handlers.
    pub fn with_builtins() -> Self {
        let mut registry = AgentRegistry::new();
        registry.register("echo", Arc::new(super::builtin::EchoAgent));
        registry.register("http", Arc::new(super::builtin::HttpAgent::new()));
        registry
    }

    /// Register a handler. Re-registering a name replaces the previous
    /// handler; in-flight executions keep the Arc they already resolved.
    pub fn register(&mut self, name: &str, handler: Arc<dyn AgentHandler>) {
        self.handlers.insert(name.to_string(), handler);
    }

    /// Resolve an agent name to its handler.
    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentHandler>> {
        self.handlers.get(name).cloned()
    }

    /// All registered agent names.
    pub fn registered_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::builtin::EchoAgent;

    #[test]
    fn test_register_and_get() {
        let mut registry = AgentRegistry::new();
        registry.register("echo", Arc::new(EchoAgent));

        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_with_builtins() {
        let registry = AgentRegistry::with_builtins();
        assert!(registry.get("echo").is_some());
        assert!(registry.get("http").is_some());
    }

    #[test]
    fn test_reregister_replaces() {
        let mut registry = AgentRegistry::new();
        registry.register("echo", Arc::new(EchoAgent));
        registry.register("echo", Arc::new(EchoAgent));
        assert_eq!(registry.registered_names().len(), 1);
    }
}
