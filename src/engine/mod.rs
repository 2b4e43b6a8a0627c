pub mod dispatcher;
pub mod handle;
pub mod instance;

pub use dispatcher::{EngineConfig, ExecutionDispatcher};
pub use handle::ExecutionHandle;
pub use instance::{
    ExecutionFailure, ExecutionInstance, ExecutionStatus, ExecutionStep,
};
