//! Bounded worker pool executing one engine fetch per job.
//!
//! Submissions go onto a bounded queue; a dispatcher keeps at most
//! `workers` fetches in flight and each job is owned by exactly one worker
//! for its whole lifecycle, so a job's transitions are strictly ordered.

mod cancel;
mod worker;

#[cfg(test)]
mod tests;

pub use cancel::CancelMap;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::engine::MediaEngine;
use crate::notify::NotificationHub;
use crate::registry::JobRegistry;
use crate::store::JobId;

/// Tuning for the worker pool.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Maximum fetches in flight at once.
    pub workers: usize,
    /// Bound on the submit queue.
    pub queue_capacity: usize,
    /// Root directory artifacts are written under.
    pub download_dir: PathBuf,
    /// Optional absolute prefix for output refs.
    pub public_base_url: Option<String>,
}

/// Submission handle; cheap to clone.
#[derive(Clone)]
pub struct Executor {
    tx: mpsc::Sender<JobId>,
}

impl Executor {
    /// Start the dispatcher task and return the submission handle.
    pub fn spawn(
        registry: Arc<JobRegistry>,
        hub: Arc<NotificationHub>,
        engine: Arc<dyn MediaEngine>,
        cancels: Arc<CancelMap>,
        options: ExecutorOptions,
    ) -> Self {
        let (tx, rx) = mpsc::channel(options.queue_capacity.max(1));
        tokio::spawn(dispatch(rx, registry, hub, engine, cancels, options));
        Executor { tx }
    }

    /// Enqueue a job for execution. Suspends only while the queue is full,
    /// never while workers are busy.
    pub async fn submit(&self, id: JobId) -> Result<()> {
        self.tx
            .send(id)
            .await
            .map_err(|_| anyhow::anyhow!("executor is shut down"))
    }
}

async fn dispatch(
    mut rx: mpsc::Receiver<JobId>,
    registry: Arc<JobRegistry>,
    hub: Arc<NotificationHub>,
    engine: Arc<dyn MediaEngine>,
    cancels: Arc<CancelMap>,
    options: ExecutorOptions,
) {
    let workers = options.workers.max(1);
    let mut running = JoinSet::new();

    loop {
        // With workers >= 1 at least one branch is always enabled: an empty
        // set has capacity, a full set has something to join.
        let has_running = !running.is_empty();
        let has_capacity = running.len() < workers;
        tokio::select! {
            res = running.join_next(), if has_running => {
                if let Some(Err(e)) = res {
                    tracing::error!("download task join: {e}");
                }
            }
            id = rx.recv(), if has_capacity => {
                let Some(id) = id else { break };
                running.spawn(worker::run_job(
                    Arc::clone(&registry),
                    Arc::clone(&hub),
                    Arc::clone(&engine),
                    Arc::clone(&cancels),
                    options.clone(),
                    id,
                ));
            }
        }
    }

    // All submitters are gone; drain in-flight downloads.
    while let Some(res) = running.join_next().await {
        if let Err(e) = res {
            tracing::error!("download task join: {e}");
        }
    }
}
