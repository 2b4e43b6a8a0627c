//! Agent dispatch: the capability trait node handlers implement, and the
//! string-keyed registry resolving agent names to handler instances.

pub mod builtin;
mod registry;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::definition::schema::NodeSpec;
use crate::error::AgentError;

pub use registry::AgentRegistry;

/// Accumulated run state: a flat map of named values.
pub type StateMap = Map<String, Value>;

/// Output of one successful node dispatch, merged into run state by
/// shallow key overwrite.
pub type NodeOutput = Map<String, Value>;

/// A pluggable implementation of node execution logic.
///
/// Handlers may be local (pure functions over state) or remote (calls to an
/// external service). The engine wraps every invocation in the node's
/// deadline; a handler that outlives it is treated exactly like one that
/// returned a failure. Handlers should honor `node.timeout_secs` on any
/// outbound calls of their own so cancellation stays cooperative.
#[async_trait]
pub trait AgentHandler: Send + Sync {
    async fn execute(&self, state: &StateMap, node: &NodeSpec) -> Result<NodeOutput, AgentError>;
}
