//! Compiled workflow artifact.
//!
//! Compilation runs once at registration; the resulting [`CompiledWorkflow`]
//! carries the adjacency structure and per-node routing table the engine
//! walks on every execution, so runs never re-validate the definition.

use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};

use crate::definition::schema::{ConditionBranch, NodeSpec, WorkflowDefinition};
use crate::error::WorkflowError;

/// Precomputed outgoing routing for one node.
#[derive(Debug, Clone)]
pub enum Routing {
    /// No outgoing edge: reaching this node succeeds the run.
    Terminal,
    /// Single unconditional successor.
    Next(String),
    /// Guarded branches evaluated in declaration order, with the mandatory
    /// else target taken when none match.
    Conditional {
        branches: Vec<ConditionBranch>,
        else_target: String,
    },
}

/// Immutable compiled form of a workflow definition.
#[derive(Debug)]
pub struct CompiledWorkflow {
    pub name: String,
    pub entry_point: String,
    pub max_steps: u32,
    pub(crate) graph: StableDiGraph<NodeSpec, ()>,
    pub(crate) node_index_map: HashMap<String, NodeIndex>,
    routing: HashMap<String, Routing>,
}

impl CompiledWorkflow {
    pub(crate) fn new(
        definition: &WorkflowDefinition,
        graph: StableDiGraph<NodeSpec, ()>,
        node_index_map: HashMap<String, NodeIndex>,
        routing: HashMap<String, Routing>,
    ) -> Self {
        CompiledWorkflow {
            name: definition.name.clone(),
            entry_point: definition.entry_point.clone(),
            max_steps: definition.max_steps,
            graph,
            node_index_map,
            routing,
        }
    }

    /// Look up a node spec by id.
    pub fn get_node(&self, node_id: &str) -> Result<&NodeSpec, WorkflowError> {
        let idx = self
            .node_index_map
            .get(node_id)
            .ok_or_else(|| WorkflowError::NodeNotFound(node_id.to_string()))?;
        self.graph
            .node_weight(*idx)
            .ok_or_else(|| WorkflowError::NodeNotFound(node_id.to_string()))
    }

    /// Precomputed routing for a node.
    pub fn routing(&self, node_id: &str) -> Result<&Routing, WorkflowError> {
        self.routing
            .get(node_id)
            .ok_or_else(|| WorkflowError::NodeNotFound(node_id.to_string()))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// All node ids; iteration order is unspecified.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.node_index_map.keys().map(|k| k.as_str())
    }
}
