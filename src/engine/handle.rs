//! Client-side handle for a spawned execution.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use super::instance::{ExecutionInstance, ExecutionStatus};

/// Observe, await and cancel one running execution.
///
/// Clones share the same underlying run. Dropping every handle does not stop
/// the execution; it keeps running to a terminal status.
#[derive(Clone)]
pub struct ExecutionHandle {
    id: String,
    instance: Arc<RwLock<ExecutionInstance>>,
    cancel_flag: Arc<AtomicBool>,
    status_rx: watch::Receiver<ExecutionStatus>,
}

impl ExecutionHandle {
    pub(crate) fn new(
        instance: Arc<RwLock<ExecutionInstance>>,
        cancel_flag: Arc<AtomicBool>,
        status_rx: watch::Receiver<ExecutionStatus>,
    ) -> Self {
        let id = instance.read().id.clone();
        ExecutionHandle {
            id,
            instance,
            cancel_flag,
            status_rx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Last published status.
    pub fn status(&self) -> ExecutionStatus {
        self.status_rx.borrow().clone()
    }

    /// Full copy of the instance record at this moment.
    pub fn snapshot(&self) -> ExecutionInstance {
        self.instance.read().clone()
    }

    /// Request cooperative cancellation. Takes effect at the next dispatch
    /// boundary; a run that already reached a terminal status is left
    /// untouched. Returns whether the request was accepted.
    pub fn cancel(&self) -> bool {
        if self.status().is_terminal() {
            return false;
        }
        self.cancel_flag.store(true, Ordering::SeqCst);
        true
    }

    /// Wait until the execution reaches a terminal status and return it.
    pub async fn wait(&mut self) -> ExecutionStatus {
        loop {
            let status = self.status_rx.borrow_and_update().clone();
            if status.is_terminal() {
                return status;
            }
            if self.status_rx.changed().await.is_err() {
                // Sender gone; the last published value is all there is.
                return self.status_rx.borrow().clone();
            }
        }
    }
}
