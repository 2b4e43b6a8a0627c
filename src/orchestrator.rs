//! Top-level orchestrator facade.
//!
//! Owns the definition store, the agent registry, the metrics recorder and
//! the execution strategy. The strategy is fixed when the orchestrator is
//! built; every run it spawns dispatches through that one strategy.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

use crate::agents::{AgentHandler, AgentRegistry, StateMap};
use crate::compiler::CompileOptions;
use crate::definition::schema::WorkflowDefinition;
use crate::engine::{
    EngineConfig, ExecutionDispatcher, ExecutionHandle, ExecutionInstance, ExecutionStatus,
};
use crate::error::{WorkflowError, WorkflowResult};
use crate::metrics::MetricsRecorder;
use crate::store::{DefinitionStore, ListFilter, WorkflowSummary};
use crate::strategy::{ExecutionMode, ExecutionStrategy, RealDispatch, Simulated};

/// Point-in-time view of the orchestrator, for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub mode: ExecutionMode,
    pub active_workflows: usize,
    pub total_executions: u64,
    pub aggregate_success_rate: f64,
}

/// Configures and builds an [`Orchestrator`].
pub struct OrchestratorBuilder {
    registry: AgentRegistry,
    mode: ExecutionMode,
    compile_options: CompileOptions,
    engine_config: EngineConfig,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        OrchestratorBuilder {
            registry: AgentRegistry::with_builtins(),
            mode: ExecutionMode::Real,
            compile_options: CompileOptions::default(),
            engine_config: EngineConfig::default(),
        }
    }

    pub fn register_agent(mut self, name: &str, handler: Arc<dyn AgentHandler>) -> Self {
        self.registry.register(name, handler);
        self
    }

    /// Dispatch every node through the deterministic simulator instead of
    /// the registry. For environments where the real agent runtime is
    /// unavailable.
    pub fn simulated(mut self) -> Self {
        self.mode = ExecutionMode::Simulated;
        self
    }

    /// Defer agent binding from registration to dispatch time.
    pub fn allow_deferred_binding(mut self) -> Self {
        self.compile_options.allow_deferred_binding = true;
        self
    }

    pub fn engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    pub fn build(self) -> Orchestrator {
        let registry = Arc::new(self.registry);
        let strategy: Arc<dyn ExecutionStrategy> = match self.mode {
            ExecutionMode::Real => Arc::new(RealDispatch::new(Arc::clone(&registry))),
            ExecutionMode::Simulated => Arc::new(Simulated),
        };
        info!(mode = ?self.mode, "orchestrator built");
        Orchestrator {
            store: DefinitionStore::new(),
            registry,
            strategy,
            metrics: Arc::new(MetricsRecorder::new()),
            compile_options: self.compile_options,
            engine_config: self.engine_config,
            executions: DashMap::new(),
        }
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The engine's front door: workflow registration, execution spawning,
/// lookup, cancellation and status reporting.
pub struct Orchestrator {
    store: DefinitionStore,
    registry: Arc<AgentRegistry>,
    strategy: Arc<dyn ExecutionStrategy>,
    metrics: Arc<MetricsRecorder>,
    compile_options: CompileOptions,
    engine_config: EngineConfig,
    executions: DashMap<String, ExecutionHandle>,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Compile and store a definition, returning its id and version.
    pub fn register_workflow(
        &self,
        definition: WorkflowDefinition,
    ) -> WorkflowResult<(String, u32)> {
        let name = definition.name.clone();
        let (id, version) = self
            .store
            .create(definition, &self.registry, &self.compile_options)?;
        info!(workflow = %name, version, "workflow registered");
        Ok((id, version))
    }

    pub fn list_workflows(&self, filter: &ListFilter) -> Vec<WorkflowSummary> {
        self.store.list(filter)
    }

    /// Retire the latest active version of a workflow.
    pub fn retire_workflow(&self, name: &str) -> WorkflowResult<u32> {
        self.store.retire(name)
    }

    /// Start the latest active version of a workflow.
    pub fn execute(&self, name: &str, input: StateMap) -> WorkflowResult<ExecutionHandle> {
        self.execute_version(name, None, input)
    }

    /// Start a pinned version of a workflow. The run proceeds in the
    /// background; the returned handle observes and cancels it.
    pub fn execute_version(
        &self,
        name: &str,
        version: Option<u32>,
        input: StateMap,
    ) -> WorkflowResult<ExecutionHandle> {
        let stored = self.store.get(name, version)?;

        let instance = Arc::new(RwLock::new(ExecutionInstance::new(
            name.to_string(),
            stored.version,
            input,
            self.strategy.mode(),
        )));
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let (status_tx, status_rx) = watch::channel(ExecutionStatus::Pending);
        let handle = ExecutionHandle::new(
            Arc::clone(&instance),
            Arc::clone(&cancel_flag),
            status_rx,
        );

        let dispatcher = ExecutionDispatcher::new(
            Arc::clone(&stored.compiled),
            Arc::clone(&self.strategy),
            Arc::clone(&self.metrics),
            self.engine_config.clone(),
            instance,
            cancel_flag,
            status_tx,
        );
        tokio::spawn(dispatcher.run());

        self.executions
            .insert(handle.id().to_string(), handle.clone());
        Ok(handle)
    }

    /// Handle for a previously started execution.
    pub fn get_execution(&self, id: &str) -> WorkflowResult<ExecutionHandle> {
        self.executions
            .get(id)
            .map(|h| h.clone())
            .ok_or_else(|| WorkflowError::ExecutionNotFound(id.to_string()))
    }

    /// Snapshot of a previously started execution.
    pub fn execution_snapshot(&self, id: &str) -> WorkflowResult<ExecutionInstance> {
        Ok(self.get_execution(id)?.snapshot())
    }

    /// Request cancellation of a running execution. Returns whether the
    /// request was accepted; cancelling a finished run is a no-op.
    pub fn cancel(&self, id: &str) -> WorkflowResult<bool> {
        Ok(self.get_execution(id)?.cancel())
    }

    pub fn mode(&self) -> ExecutionMode {
        self.strategy.mode()
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            mode: self.strategy.mode(),
            active_workflows: self.store.workflow_count(),
            total_executions: self.metrics.total_executions(),
            aggregate_success_rate: self.metrics.aggregate_success_rate(),
        }
    }
}
