//! In-memory, concurrency-safe view of live job state.
//!
//! Seeded from the store at open and kept consistent by funneling every
//! mutation through the registry: the store write commits first, then the
//! cached map is patched. Readers get independent clones, never references
//! into the shared map.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;

use crate::store::db::unix_timestamp;
use crate::store::{Job, JobId, JobStore, JobUpdate, NewJob};

pub struct JobRegistry {
    store: JobStore,
    live: RwLock<HashMap<JobId, Job>>,
}

/// Point-in-time copy of job state, newest first.
///
/// Serializes as a JSON object keyed by job id, preserving the newest-first
/// entry order.
#[derive(Debug, Clone)]
pub struct StatusSnapshot(pub Vec<Job>);

impl serde::Serialize for StatusSnapshot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for job in &self.0 {
            map.serialize_entry(&job.id.to_string(), job)?;
        }
        map.end()
    }
}

impl JobRegistry {
    /// Seed the live view from the store. Call after any startup
    /// reconciliation so the cache never resurrects a pre-restart status.
    pub async fn open(store: JobStore) -> Result<Self> {
        let jobs = store.list_jobs().await?;
        let live = jobs.into_iter().map(|j| (j.id, j)).collect();
        Ok(Self {
            store,
            live: RwLock::new(live),
        })
    }

    /// Persist a new `pending` job and cache it. Returns the stored record.
    pub async fn create(&self, new: NewJob) -> Result<Job> {
        let id = self.store.add_job(&new).await?;
        let job = self
            .store
            .get_job(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("job {id} vanished after insert"))?;
        self.live.write().unwrap().insert(id, job.clone());
        Ok(job)
    }

    /// Apply a partial update: store first, then the cache. Updating a job
    /// that was deleted in the meantime is a no-op (the worker raced a
    /// delete; the deleting caller owns the record's fate).
    pub async fn apply(&self, id: JobId, update: &JobUpdate) -> Result<()> {
        self.store.update_job(id, update).await?;
        let mut live = self.live.write().unwrap();
        if let Some(job) = live.get_mut(&id) {
            if let Some(status) = update.status {
                job.status = status;
            }
            if let Some(ref title) = update.title {
                job.title = Some(title.clone());
            }
            if let Some(byte_size) = update.byte_size {
                job.byte_size = Some(byte_size);
            }
            if let Some(ref output_ref) = update.output_ref {
                job.output_ref = Some(output_ref.clone());
            }
            if let Some(ref detail) = update.error_detail {
                job.error_detail = Some(detail.clone());
            }
            job.updated_at = unix_timestamp();
        }
        Ok(())
    }

    /// Snapshot of all jobs, or one owner's, consistent at the instant of
    /// the call and newest first.
    pub fn snapshot(&self, owner_id: Option<&str>) -> StatusSnapshot {
        let live = self.live.read().unwrap();
        let mut jobs: Vec<Job> = live
            .values()
            .filter(|j| owner_id.map_or(true, |o| j.owner_id == o))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.id.cmp(&a.id));
        StatusSnapshot(jobs)
    }

    /// Cloned copy of one job.
    pub fn get(&self, id: JobId) -> Option<Job> {
        self.live.read().unwrap().get(&id).cloned()
    }

    /// Remove a job from the store and the cache.
    pub async fn remove(&self, id: JobId) -> Result<()> {
        self.store.remove_job(id).await?;
        self.live.write().unwrap().remove(&id);
        Ok(())
    }

    /// Terminal jobs created before `cutoff` (for the janitor).
    pub async fn purgeable(&self, cutoff: i64) -> Result<Vec<Job>> {
        self.store.list_purgeable(cutoff).await
    }
}
