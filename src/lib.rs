//! # Procflow — A Workflow Orchestration Engine
//!
//! `procflow` executes versioned directed-graph workflows of agent tasks.
//! Definitions are compiled once at registration into a reusable artifact;
//! executions walk that artifact strictly sequentially with:
//!
//! - **Pluggable agents**: node handlers resolved by name through a
//!   string-keyed registry, with `echo` and `http` built in.
//! - **Conditional routing**: guarded branches evaluated against run state,
//!   first match wins, mandatory else target.
//! - **Retry and timeout**: per-node retry policies (fixed, exponential,
//!   jittered backoff) and a hard per-dispatch deadline.
//! - **Validation**: structure, topology and agent-binding checks that
//!   report every error together; cycles are accepted only when a
//!   conditional edge can exit them.
//! - **Simulated mode**: a deterministic dispatch strategy standing in for
//!   the real agent runtime, chosen once at startup.
//! - **Metrics**: per-workflow and per-node counters with an incremental
//!   moving average of durations.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use procflow::{Orchestrator, StateMap, WorkflowDefinition};
//!
//! #[tokio::main]
//! async fn main() {
//!     let json = std::fs::read_to_string("workflow.json").unwrap();
//!     let definition: WorkflowDefinition = serde_json::from_str(&json).unwrap();
//!
//!     let orchestrator = Orchestrator::builder().build();
//!     orchestrator.register_workflow(definition.clone()).unwrap();
//!
//!     let mut handle = orchestrator
//!         .execute(&definition.name, StateMap::new())
//!         .unwrap();
//!     let status = handle.wait().await;
//!     println!("{:?}", status);
//! }
//! ```

pub mod agents;
pub mod compiler;
pub mod definition;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod metrics;
pub mod orchestrator;
pub mod store;
pub mod strategy;

pub use crate::agents::{AgentHandler, AgentRegistry, NodeOutput, StateMap};
pub use crate::compiler::{compile, CompileOptions, CompiledWorkflow, Routing};
pub use crate::definition::{
    BackoffStrategy, ComparisonOperator, ConditionBranch, ConditionSpec, ConditionalEdgeSpec,
    Diagnostic, DiagnosticLevel, EdgeSpec, NodeSpec, RetryPolicy, ValidationReport,
    WorkflowDefinition, WorkflowStatus,
};
pub use crate::engine::{
    EngineConfig, ExecutionFailure, ExecutionHandle, ExecutionInstance, ExecutionStatus,
    ExecutionStep,
};
pub use crate::error::{AgentError, WorkflowError, WorkflowResult};
pub use crate::metrics::{MetricSnapshot, MetricsRecorder};
pub use crate::orchestrator::{Orchestrator, OrchestratorBuilder, OrchestratorStatus};
pub use crate::store::{DefinitionStore, ListFilter, StoredWorkflow, WorkflowSummary};
pub use crate::strategy::{ExecutionMode, ExecutionStrategy, RealDispatch, Simulated};
