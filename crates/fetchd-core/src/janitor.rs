//! Retention sweep: retire terminal jobs and their artifacts past a window.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;

use crate::artifacts;
use crate::notify::NotificationHub;
use crate::registry::JobRegistry;
use crate::store::db::unix_timestamp;

#[derive(Debug, Clone)]
pub struct JanitorOptions {
    /// How long terminal jobs and their artifacts are kept.
    pub retention: Duration,
    /// Time between sweeps.
    pub sweep_interval: Duration,
    /// Root directory artifacts live under.
    pub download_dir: PathBuf,
}

/// Run the sweep loop until the process exits.
pub fn spawn(registry: Arc<JobRegistry>, hub: Arc<NotificationHub>, options: JanitorOptions) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(options.sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match sweep(&registry, &hub, &options).await {
                Ok(0) => tracing::debug!("retention sweep: nothing to retire"),
                Ok(n) => tracing::info!("retention sweep retired {n} jobs"),
                Err(e) => tracing::warn!("retention sweep failed: {e:#}"),
            }
        }
    })
}

/// One sweep pass: for every terminal job older than the retention window,
/// delete its artifact (missing files tolerated) then remove the record.
/// Each removal is independently idempotent, so a failure mid-pass is safe
/// to resume on the next interval.
pub async fn sweep(registry: &JobRegistry, hub: &NotificationHub, options: &JanitorOptions) -> Result<u64> {
    let cutoff = unix_timestamp() - options.retention.as_secs() as i64;
    let mut retired = 0u64;
    let mut owners: Vec<String> = Vec::new();

    for job in registry.purgeable(cutoff).await? {
        if let Some(ref output_ref) = job.output_ref {
            if let Some(path) = artifacts::artifact_path(&options.download_dir, output_ref) {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => tracing::debug!(path = %path.display(), "deleted expired artifact"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => tracing::warn!(path = %path.display(), "could not delete artifact: {e}"),
                }
            }
        }
        registry.remove(job.id).await?;
        tracing::debug!(job = job.id, owner = %job.owner_id, "retired expired job");
        if !owners.contains(&job.owner_id) {
            owners.push(job.owner_id.clone());
        }
        retired += 1;
    }

    for owner in owners {
        hub.publish(&owner);
    }
    Ok(retired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::db::open_memory;
    use crate::store::{JobStatus, JobStore, JobUpdate, NewJob};

    fn new_job(owner: &str, url: &str) -> NewJob {
        NewJob {
            owner_id: owner.to_string(),
            url: url.to_string(),
            format: "mp4".to_string(),
            quality: "best".to_string(),
            folder: "default".to_string(),
        }
    }

    async fn backdate(store: &JobStore, id: i64) {
        sqlx::query("UPDATE jobs SET created_at = 1000 WHERE id = ?1")
            .bind(id)
            .execute(&store.pool)
            .await
            .unwrap();
    }

    fn options(dir: &std::path::Path) -> JanitorOptions {
        JanitorOptions {
            retention: Duration::from_secs(3 * 3600),
            sweep_interval: Duration::from_secs(3600),
            download_dir: dir.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn sweep_retires_old_terminal_jobs_and_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_memory().await.unwrap();
        let registry = Arc::new(JobRegistry::open(store.clone()).await.unwrap());
        let hub = NotificationHub::new(Arc::clone(&registry));

        let job = registry.create(new_job("u1", "https://a.com/1")).await.unwrap();
        let artifact = dir.path().join("default/clip.mp4");
        tokio::fs::create_dir_all(artifact.parent().unwrap()).await.unwrap();
        tokio::fs::write(&artifact, b"data").await.unwrap();
        registry
            .apply(job.id, &JobUpdate::completed("clip", 4, "/downloads/default/clip.mp4"))
            .await
            .unwrap();
        backdate(&store, job.id).await;

        let retired = sweep(&registry, &hub, &options(dir.path())).await.unwrap();
        assert_eq!(retired, 1);
        assert!(!artifact.exists());
        assert!(registry.get(job.id).is_none());
    }

    #[tokio::test]
    async fn sweep_never_touches_non_terminal_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_memory().await.unwrap();
        let registry = Arc::new(JobRegistry::open(store.clone()).await.unwrap());
        let hub = NotificationHub::new(Arc::clone(&registry));

        let job = registry.create(new_job("u1", "https://a.com/1")).await.unwrap();
        registry
            .apply(job.id, &JobUpdate::status(JobStatus::Downloading))
            .await
            .unwrap();
        backdate(&store, job.id).await;

        let retired = sweep(&registry, &hub, &options(dir.path())).await.unwrap();
        assert_eq!(retired, 0);
        assert_eq!(registry.get(job.id).unwrap().status, JobStatus::Downloading);
    }

    #[tokio::test]
    async fn sweep_keeps_fresh_terminal_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_memory().await.unwrap();
        let registry = Arc::new(JobRegistry::open(store).await.unwrap());
        let hub = NotificationHub::new(Arc::clone(&registry));

        let job = registry.create(new_job("u1", "https://a.com/1")).await.unwrap();
        registry.apply(job.id, &JobUpdate::failed("no")).await.unwrap();

        let retired = sweep(&registry, &hub, &options(dir.path())).await.unwrap();
        assert_eq!(retired, 0);
        assert!(registry.get(job.id).is_some());
    }

    #[tokio::test]
    async fn sweep_tolerates_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_memory().await.unwrap();
        let registry = Arc::new(JobRegistry::open(store.clone()).await.unwrap());
        let hub = NotificationHub::new(Arc::clone(&registry));

        let job = registry.create(new_job("u1", "https://a.com/1")).await.unwrap();
        registry
            .apply(job.id, &JobUpdate::completed("gone", 1, "/downloads/default/gone.mp4"))
            .await
            .unwrap();
        backdate(&store, job.id).await;

        let retired = sweep(&registry, &hub, &options(dir.path())).await.unwrap();
        assert_eq!(retired, 1);
        assert!(registry.get(job.id).is_none());
    }
}
