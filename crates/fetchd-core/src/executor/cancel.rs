//! Cancellation registry for in-flight downloads.
//!
//! Each running job registers a oneshot token. Deleting a non-terminal job
//! fires it; the worker's `select!` drops the engine future and the spawned
//! subprocess is killed with it.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::oneshot;

use crate::store::JobId;

#[derive(Default)]
pub struct CancelMap {
    inner: RwLock<HashMap<JobId, oneshot::Sender<()>>>,
}

impl CancelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running job; the returned receiver fires on cancel.
    pub fn register(&self, id: JobId) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.inner.write().unwrap().insert(id, tx);
        rx
    }

    /// Drop a finished job's token (success or failure).
    pub fn unregister(&self, id: JobId) {
        self.inner.write().unwrap().remove(&id);
    }

    /// Request cancellation. Returns true if a running job was signalled.
    pub fn cancel(&self, id: JobId) -> bool {
        match self.inner.write().unwrap().remove(&id) {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}
