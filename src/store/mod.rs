//! Versioned workflow definition store.
//!
//! Registration compiles first; nothing invalid is ever persisted. Each
//! registration under an existing name appends a new version, the previous
//! ones stay readable. Retiring hides the latest version from default
//! resolution without deleting anything.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::agents::AgentRegistry;
use crate::compiler::{compile, CompileOptions, CompiledWorkflow};
use crate::definition::schema::{WorkflowDefinition, WorkflowStatus};
use crate::error::{WorkflowError, WorkflowResult};

/// One persisted workflow version with its compiled artifact.
#[derive(Debug, Clone)]
pub struct StoredWorkflow {
    pub id: String,
    pub version: u32,
    pub status: WorkflowStatus,
    pub definition: Arc<WorkflowDefinition>,
    pub compiled: Arc<CompiledWorkflow>,
    pub created_at: DateTime<Utc>,
}

/// Listing row, one per stored version.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSummary {
    pub name: String,
    pub version: u32,
    pub status: WorkflowStatus,
    pub node_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Listing filter. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<WorkflowStatus>,
    pub name_prefix: Option<String>,
}

/// In-memory store, keyed by workflow name with versions in ascending order.
#[derive(Default)]
pub struct DefinitionStore {
    workflows: RwLock<HashMap<String, Vec<StoredWorkflow>>>,
}

impl DefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and persist a definition. Returns the stored id and the
    /// version assigned under the definition's name.
    pub fn create(
        &self,
        definition: WorkflowDefinition,
        registry: &AgentRegistry,
        options: &CompileOptions,
    ) -> WorkflowResult<(String, u32)> {
        let compiled = compile(&definition, registry, options)?;

        let mut workflows = self.workflows.write();
        let versions = workflows.entry(definition.name.clone()).or_default();
        let version = versions.last().map(|w| w.version + 1).unwrap_or(1);
        let stored = StoredWorkflow {
            id: uuid::Uuid::new_v4().to_string(),
            version,
            status: WorkflowStatus::Active,
            definition: Arc::new(definition),
            compiled: Arc::new(compiled),
            created_at: Utc::now(),
        };
        let id = stored.id.clone();
        versions.push(stored);
        Ok((id, version))
    }

    /// Fetch a specific version, or the latest active one when `version`
    /// is `None`.
    pub fn get(&self, name: &str, version: Option<u32>) -> WorkflowResult<StoredWorkflow> {
        let workflows = self.workflows.read();
        let versions = workflows
            .get(name)
            .ok_or_else(|| WorkflowError::WorkflowNotFound(name.to_string()))?;
        match version {
            Some(v) => versions
                .iter()
                .find(|w| w.version == v)
                .cloned()
                .ok_or(WorkflowError::VersionNotFound {
                    name: name.to_string(),
                    version: v,
                }),
            None => versions
                .iter()
                .rev()
                .find(|w| w.status == WorkflowStatus::Active)
                .cloned()
                .ok_or_else(|| WorkflowError::WorkflowNotFound(name.to_string())),
        }
    }

    /// Retire the latest active version of a workflow. Pinned lookups by
    /// explicit version still resolve it.
    pub fn retire(&self, name: &str) -> WorkflowResult<u32> {
        let mut workflows = self.workflows.write();
        let versions = workflows
            .get_mut(name)
            .ok_or_else(|| WorkflowError::WorkflowNotFound(name.to_string()))?;
        let latest_active = versions
            .iter_mut()
            .rev()
            .find(|w| w.status == WorkflowStatus::Active)
            .ok_or_else(|| WorkflowError::WorkflowNotFound(name.to_string()))?;
        latest_active.status = WorkflowStatus::Retired;
        Ok(latest_active.version)
    }

    /// Summaries of every stored version matching the filter, sorted by
    /// name then version.
    pub fn list(&self, filter: &ListFilter) -> Vec<WorkflowSummary> {
        let workflows = self.workflows.read();
        let mut summaries: Vec<WorkflowSummary> = workflows
            .iter()
            .filter(|(name, _)| {
                filter
                    .name_prefix
                    .as_deref()
                    .map(|p| name.starts_with(p))
                    .unwrap_or(true)
            })
            .flat_map(|(name, versions)| {
                versions
                    .iter()
                    .filter(|w| filter.status.map(|s| w.status == s).unwrap_or(true))
                    .map(|w| WorkflowSummary {
                        name: name.clone(),
                        version: w.version,
                        status: w.status,
                        node_count: w.compiled.node_count(),
                        created_at: w.created_at,
                    })
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name).then(a.version.cmp(&b.version)));
        summaries
    }

    pub fn workflow_count(&self) -> usize {
        self.workflows.read().len()
    }
}
