pub mod condition;
pub mod operators;
pub mod type_coercion;

pub use condition::{evaluate_condition, select_branch};
