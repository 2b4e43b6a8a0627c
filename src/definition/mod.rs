pub mod schema;
pub mod validation;

pub use schema::{
    BackoffStrategy, ComparisonOperator, ConditionBranch, ConditionSpec, ConditionalEdgeSpec,
    EdgeSpec, NodeSpec, RetryPolicy, WorkflowDefinition, WorkflowStatus,
};
pub use validation::{Diagnostic, DiagnosticLevel, ValidationReport};
