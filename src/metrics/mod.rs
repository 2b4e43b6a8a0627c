//! Execution metrics.
//!
//! Counters and an incremental moving average per workflow and per node,
//! updated as runs finish. The average is folded in place
//! (`avg += (duration - avg) / count`) so no sample history is kept.

use dashmap::DashMap;
use serde::Serialize;

/// Rolled-up counters for one workflow or one node.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricSnapshot {
    pub execution_count: u64,
    pub success_count: u64,
    pub avg_duration_ms: f64,
}

impl MetricSnapshot {
    fn record(&mut self, success: bool, duration_ms: f64) {
        self.execution_count += 1;
        if success {
            self.success_count += 1;
        }
        let count = self.execution_count as f64;
        self.avg_duration_ms += (duration_ms - self.avg_duration_ms) / count;
    }

    pub fn success_rate(&self) -> f64 {
        if self.execution_count == 0 {
            return 0.0;
        }
        self.success_count as f64 / self.execution_count as f64
    }
}

/// Shared metrics sink. Cheap to clone behind an `Arc`; safe to update from
/// concurrent executions.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    workflows: DashMap<String, MetricSnapshot>,
    nodes: DashMap<(String, String), MetricSnapshot>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished run. Cancelled runs count as unsuccessful
    /// executions.
    pub fn on_run_complete(&self, workflow: &str, success: bool, duration_ms: f64) {
        self.workflows
            .entry(workflow.to_string())
            .or_default()
            .record(success, duration_ms);
    }

    /// Record one finished node dispatch, retries included in its duration.
    pub fn on_node_complete(&self, workflow: &str, node: &str, success: bool, duration_ms: f64) {
        self.nodes
            .entry((workflow.to_string(), node.to_string()))
            .or_default()
            .record(success, duration_ms);
    }

    pub fn workflow_metrics(&self, workflow: &str) -> Option<MetricSnapshot> {
        self.workflows.get(workflow).map(|m| m.clone())
    }

    pub fn node_metrics(&self, workflow: &str, node: &str) -> Option<MetricSnapshot> {
        self.nodes
            .get(&(workflow.to_string(), node.to_string()))
            .map(|m| m.clone())
    }

    /// Total finished runs across all workflows.
    pub fn total_executions(&self) -> u64 {
        self.workflows.iter().map(|m| m.execution_count).sum()
    }

    /// Success rate over all finished runs, 0.0 when nothing ran yet.
    pub fn aggregate_success_rate(&self) -> f64 {
        let (mut total, mut ok) = (0u64, 0u64);
        for m in self.workflows.iter() {
            total += m.execution_count;
            ok += m.success_count;
        }
        if total == 0 {
            return 0.0;
        }
        ok as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average() {
        let metrics = MetricsRecorder::new();
        metrics.on_run_complete("wf", true, 100.0);
        metrics.on_run_complete("wf", true, 200.0);
        metrics.on_run_complete("wf", false, 300.0);

        let snapshot = metrics.workflow_metrics("wf").unwrap();
        assert_eq!(snapshot.execution_count, 3);
        assert_eq!(snapshot.success_count, 2);
        assert!((snapshot.avg_duration_ms - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_success_never_exceeds_executions() {
        let metrics = MetricsRecorder::new();
        for i in 0..50 {
            metrics.on_run_complete("wf", i % 3 != 0, 10.0);
        }
        let snapshot = metrics.workflow_metrics("wf").unwrap();
        assert!(snapshot.success_count <= snapshot.execution_count);
        assert_eq!(snapshot.execution_count, 50);
    }

    #[test]
    fn test_node_metrics_keyed_per_workflow() {
        let metrics = MetricsRecorder::new();
        metrics.on_node_complete("a", "n1", true, 5.0);
        metrics.on_node_complete("b", "n1", false, 7.0);

        assert_eq!(metrics.node_metrics("a", "n1").unwrap().success_count, 1);
        assert_eq!(metrics.node_metrics("b", "n1").unwrap().success_count, 0);
        assert!(metrics.node_metrics("a", "n2").is_none());
    }

    #[test]
    fn test_aggregate_rate() {
        let metrics = MetricsRecorder::new();
        assert_eq!(metrics.aggregate_success_rate(), 0.0);
        metrics.on_run_complete("a", true, 1.0);
        metrics.on_run_complete("b", false, 1.0);
        assert_eq!(metrics.total_executions(), 2);
        assert!((metrics.aggregate_success_rate() - 0.5).abs() < 1e-9);
    }
}
