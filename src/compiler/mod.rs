mod compiled;
mod compiler;

pub use compiled::{CompiledWorkflow, Routing};
pub use compiler::{compile, CompileOptions};
