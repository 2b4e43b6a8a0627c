//! The execution step loop.
//!
//! One [`ExecutionDispatcher`] drives one instance from entry point to a
//! terminal status: dispatch the current node through the strategy, apply
//! the retry policy and timeout, merge the output, route. Nodes of one
//! instance never run concurrently; cancellation is honoured at dispatch
//! boundaries only, never mid-handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::agents::{NodeOutput, StateMap};
use crate::compiler::{CompiledWorkflow, Routing};
use crate::definition::schema::{BackoffStrategy, NodeSpec, RetryPolicy};
use crate::error::AgentError;
use crate::evaluator::select_branch;
use crate::metrics::MetricsRecorder;
use crate::strategy::ExecutionStrategy;

use super::instance::{ExecutionFailure, ExecutionInstance, ExecutionStatus, ExecutionStep};

/// Engine-level defaults applied where a node spec stays silent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Retry policy for nodes without one of their own.
    #[serde(default)]
    pub default_retry: RetryPolicy,
}

/// Backoff delay before retry number `attempt + 1`, capped at the policy's
/// maximum interval.
fn retry_interval(policy: &RetryPolicy, attempt: u32) -> Duration {
    let base = policy.initial_interval_ms as f64;
    let interval = match policy.backoff_strategy {
        BackoffStrategy::Fixed => base,
        BackoffStrategy::Exponential => {
            base * policy.backoff_multiplier.powi(attempt.saturating_sub(1) as i32)
        }
        BackoffStrategy::ExponentialWithJitter => {
            let exp = base * policy.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
            exp + exp * 0.1 * rand::random::<f64>()
        }
    };
    Duration::from_millis(interval.min(policy.max_interval_ms as f64) as u64)
}

/// Drives a single execution instance to completion.
pub struct ExecutionDispatcher {
    compiled: Arc<CompiledWorkflow>,
    strategy: Arc<dyn ExecutionStrategy>,
    metrics: Arc<MetricsRecorder>,
    config: EngineConfig,
    instance: Arc<RwLock<ExecutionInstance>>,
    cancel_flag: Arc<AtomicBool>,
    status_tx: watch::Sender<ExecutionStatus>,
}

enum DispatchOutcome {
    Success(NodeOutput),
    Failed(AgentError),
    Cancelled,
}

impl ExecutionDispatcher {
    pub fn new(
        compiled: Arc<CompiledWorkflow>,
        strategy: Arc<dyn ExecutionStrategy>,
        metrics: Arc<MetricsRecorder>,
        config: EngineConfig,
        instance: Arc<RwLock<ExecutionInstance>>,
        cancel_flag: Arc<AtomicBool>,
        status_tx: watch::Sender<ExecutionStatus>,
    ) -> Self {
        ExecutionDispatcher {
            compiled,
            strategy,
            metrics,
            config,
            instance,
            cancel_flag,
            status_tx,
        }
    }

    /// Run the instance to a terminal status. Consumes the dispatcher; the
    /// final status is also published through the watch channel and the
    /// shared instance record.
    pub async fn run(self) -> ExecutionStatus {
        let run_started = Instant::now();
        let workflow = self.compiled.name.clone();
        let execution_id = self.instance.read().id.clone();

        self.publish(ExecutionStatus::Running);
        info!(workflow = %workflow, execution = %execution_id, "execution started");

        let status = self.drive().await;

        {
            let mut instance = self.instance.write();
            instance.status = status.clone();
            instance.ended_at = Some(Utc::now());
            if matches!(status, ExecutionStatus::Succeeded) {
                instance.current_node = None;
            }
        }
        let succeeded = matches!(status, ExecutionStatus::Succeeded);
        self.metrics.on_run_complete(
            &workflow,
            succeeded,
            run_started.elapsed().as_secs_f64() * 1000.0,
        );
        info!(
            workflow = %workflow,
            execution = %execution_id,
            succeeded,
            "execution finished"
        );
        // Published last so waiters observing a terminal status see the
        // finalized instance record.
        self.publish(status.clone());
        status
    }

    async fn drive(&self) -> ExecutionStatus {
        let mut current = self.compiled.entry_point.clone();
        let mut steps: u32 = 0;

        loop {
            if self.cancel_flag.load(Ordering::SeqCst) {
                return ExecutionStatus::Cancelled;
            }

            let node = match self.compiled.get_node(&current) {
                Ok(node) => node.clone(),
                Err(e) => {
                    return ExecutionStatus::Failed {
                        error: ExecutionFailure {
                            kind: e.kind_name().to_string(),
                            message: e.to_string(),
                            failed_node: Some(current.clone()),
                            attempt_count: 0,
                        },
                    }
                }
            };
            self.instance.write().current_node = Some(current.clone());

            let dispatch_started = Instant::now();
            let (outcome, attempts) = self.dispatch_node(&node).await;
            steps += 1;

            let success = matches!(outcome, DispatchOutcome::Success(_));
            self.metrics.on_node_complete(
                &self.compiled.name,
                &node.id,
                success,
                dispatch_started.elapsed().as_secs_f64() * 1000.0,
            );

            match outcome {
                DispatchOutcome::Success(output) => {
                    let mut instance = self.instance.write();
                    for (key, value) in output {
                        instance.state.insert(key, value);
                    }
                }
                DispatchOutcome::Failed(error) if node.optional => {
                    // Optional nodes degrade to an empty successful output.
                    warn!(
                        workflow = %self.compiled.name,
                        node = %node.id,
                        error = %error,
                        "optional node failed, continuing"
                    );
                }
                DispatchOutcome::Failed(error) => {
                    return ExecutionStatus::Failed {
                        error: ExecutionFailure {
                            kind: error.kind_name().to_string(),
                            message: error.to_string(),
                            failed_node: Some(node.id.clone()),
                            attempt_count: attempts,
                        },
                    };
                }
                DispatchOutcome::Cancelled => return ExecutionStatus::Cancelled,
            }

            let next = match self.compiled.routing(&current) {
                Ok(Routing::Terminal) => return ExecutionStatus::Succeeded,
                Ok(Routing::Next(target)) => target.clone(),
                Ok(Routing::Conditional {
                    branches,
                    else_target,
                }) => {
                    let guard = self.instance.read();
                    let target =
                        select_branch(branches, &guard.state).unwrap_or(else_target.as_str());
                    debug!(
                        workflow = %self.compiled.name,
                        node = %current,
                        target = %target,
                        "conditional route"
                    );
                    target.to_string()
                }
                Err(e) => {
                    return ExecutionStatus::Failed {
                        error: ExecutionFailure {
                            kind: e.kind_name().to_string(),
                            message: e.to_string(),
                            failed_node: Some(current.clone()),
                            attempt_count: attempts,
                        },
                    }
                }
            };

            if steps >= self.compiled.max_steps {
                return ExecutionStatus::Failed {
                    error: ExecutionFailure {
                        kind: "ExecutionLimitExceeded".to_string(),
                        message: format!(
                            "execution exceeded {} steps without terminating",
                            self.compiled.max_steps
                        ),
                        failed_node: Some(current.clone()),
                        attempt_count: attempts,
                    },
                };
            }
            current = next;
        }
    }

    /// Dispatch one node, applying its timeout to every attempt and its
    /// retry policy to retryable failures. Every attempt lands in history.
    async fn dispatch_node(&self, node: &NodeSpec) -> (DispatchOutcome, u32) {
        let policy = node
            .retry
            .clone()
            .unwrap_or_else(|| self.config.default_retry.clone());
        let deadline = Duration::from_secs(node.timeout_secs);
        let state: StateMap = self.instance.read().state.clone();

        let mut attempt: u32 = 1;
        loop {
            let started_at = Utc::now();
            let result = match timeout(deadline, self.strategy.dispatch(&state, node)).await {
                Ok(result) => result,
                Err(_) => Err(AgentError::Timeout),
            };
            let ended_at = Utc::now();

            let step = ExecutionStep {
                node_id: node.id.clone(),
                attempt,
                started_at,
                ended_at,
                success: result.is_ok(),
                output: result.as_ref().ok().cloned(),
                error: result.as_ref().err().map(|e| e.to_string()),
            };
            self.instance.write().history.push(step);

            match result {
                Ok(output) => return (DispatchOutcome::Success(output), attempt),
                Err(error) => {
                    if !error.is_retryable() || attempt >= policy.max_attempts {
                        return (DispatchOutcome::Failed(error), attempt);
                    }
                    warn!(
                        workflow = %self.compiled.name,
                        node = %node.id,
                        attempt,
                        error = %error,
                        "node dispatch failed, retrying"
                    );
                    tokio::time::sleep(retry_interval(&policy, attempt)).await;
                    if self.cancel_flag.load(Ordering::SeqCst) {
                        return (DispatchOutcome::Cancelled, attempt);
                    }
                    attempt += 1;
                }
            }
        }
    }

    fn publish(&self, status: ExecutionStatus) {
        let _ = self.status_tx.send(status);
    }
}
