//! Workflow definition schema.
//!
//! A [`WorkflowDefinition`] is the serialized form of a directed workflow
//! graph: nodes bound to agent handlers, unconditional edges, and
//! conditional edges guarded by expressions over run state. Definitions are
//! immutable once registered; updates publish a new version.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A workflow definition as submitted for registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
    #[serde(default)]
    pub conditional_edges: Vec<ConditionalEdgeSpec>,
    pub entry_point: String,
    /// Safety net against runtime-only-detectable cycles.
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
}

fn default_max_steps() -> u32 {
    1000
}

/// A unit of work bound to an agent handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    pub agent: String,
    /// Handler-specific configuration, passed through verbatim.
    #[serde(default)]
    pub config: Value,
    /// Per-dispatch deadline. Handlers exceeding it count as failed.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
    /// Optional nodes degrade to an empty successful output when retries
    /// are exhausted instead of failing the run.
    #[serde(default)]
    pub optional: bool,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Unconditional edge between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
}

/// Edge guarded by conditions over run state. `else_target` is mandatory:
/// evaluation always takes exactly one branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalEdgeSpec {
    pub from: String,
    /// Evaluated in declaration order; the first match wins.
    pub branches: Vec<ConditionBranch>,
    pub else_target: String,
}

/// One guarded branch of a conditional edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionBranch {
    pub condition: ConditionSpec,
    pub target: String,
}

/// A boolean expression over the run-state map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionSpec {
    /// Key into the run-state map.
    pub variable: String,
    pub operator: ComparisonOperator,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
}

/// Bounded retry with backoff, applied per node dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,
    #[serde(default = "default_backoff_strategy")]
    pub backoff_strategy: BackoffStrategy,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_interval_ms() -> u64 {
    200
}
fn default_backoff_strategy() -> BackoffStrategy {
    BackoffStrategy::Exponential
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_max_interval_ms() -> u64 {
    10_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: default_max_attempts(),
            initial_interval_ms: default_initial_interval_ms(),
            backoff_strategy: default_backoff_strategy(),
            backoff_multiplier: default_backoff_multiplier(),
            max_interval_ms: default_max_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    Fixed,
    Exponential,
    ExponentialWithJitter,
}

/// Lifecycle status of a stored workflow version. Versions are never hard
/// deleted; retiring removes one from default resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Active,
    Retired,
}
