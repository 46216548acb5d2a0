//! Executor tests against a scripted engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::{EngineError, FetchFuture, FetchSpec, Fetched, MediaEngine};
use crate::notify::NotificationHub;
use crate::registry::JobRegistry;
use crate::store::db::open_memory;
use crate::store::{JobId, JobStatus, NewJob};

use super::{CancelMap, Executor, ExecutorOptions};

enum Script {
    Succeed,
    Reject(&'static str),
    Fault(&'static str),
    Hang,
}

struct FakeEngine {
    script: Script,
    calls: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeEngine {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }
}

impl MediaEngine for FakeEngine {
    fn fetch(&self, spec: FetchSpec) -> FetchFuture<'_> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            match self.script {
                Script::Succeed => {
                    let path = spec.dest_dir.join("clip.mp4");
                    tokio::fs::write(&path, b"data")
                        .await
                        .map_err(|e| EngineError::Infra(e.to_string()))?;
                    Ok(Fetched {
                        title: "clip".to_string(),
                        byte_size: 4,
                        final_path: path,
                    })
                }
                Script::Reject(msg) => Err(EngineError::Rejected(msg.to_string())),
                Script::Fault(msg) => Err(EngineError::Infra(msg.to_string())),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(EngineError::Infra("unreachable".to_string()))
                }
            }
        })
    }
}

struct Harness {
    registry: Arc<JobRegistry>,
    cancels: Arc<CancelMap>,
    executor: Executor,
    _dir: tempfile::TempDir,
}

async fn harness(engine: Arc<FakeEngine>, workers: usize) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = open_memory().await.unwrap();
    let registry = Arc::new(JobRegistry::open(store).await.unwrap());
    let hub = Arc::new(NotificationHub::new(Arc::clone(&registry)));
    let cancels = Arc::new(CancelMap::new());
    let executor = Executor::spawn(
        Arc::clone(&registry),
        hub,
        engine,
        Arc::clone(&cancels),
        ExecutorOptions {
            workers,
            queue_capacity: 16,
            download_dir: dir.path().to_path_buf(),
            public_base_url: None,
        },
    );
    Harness {
        registry,
        cancels,
        executor,
        _dir: dir,
    }
}

fn new_job(url: &str) -> NewJob {
    NewJob {
        owner_id: "u1".to_string(),
        url: url.to_string(),
        format: "mp4".to_string(),
        quality: "720p".to_string(),
        folder: "default".to_string(),
    }
}

async fn wait_for_status(registry: &JobRegistry, id: JobId, status: JobStatus) {
    for _ in 0..200 {
        if registry.get(id).map(|j| j.status) == Some(status) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "job {id} never reached {status:?}, currently {:?}",
        registry.get(id).map(|j| j.status)
    );
}

#[tokio::test]
async fn success_populates_engine_results() {
    let h = harness(FakeEngine::new(Script::Succeed), 2).await;
    let job = h.registry.create(new_job("https://example.com/v1")).await.unwrap();
    h.executor.submit(job.id).await.unwrap();

    wait_for_status(&h.registry, job.id, JobStatus::Completed).await;
    let done = h.registry.get(job.id).unwrap();
    assert_eq!(done.title.as_deref(), Some("clip"));
    assert_eq!(done.byte_size, Some(4));
    assert_eq!(done.output_ref.as_deref(), Some("/downloads/default/clip.mp4"));
    assert!(done.error_detail.is_none());
    assert!(h._dir.path().join("default/clip.mp4").exists());
}

#[tokio::test]
async fn rejection_marks_failed_with_detail() {
    let h = harness(FakeEngine::new(Script::Reject("ERROR: Unsupported URL")), 1).await;
    let job = h.registry.create(new_job("https://example.com/nope")).await.unwrap();
    h.executor.submit(job.id).await.unwrap();

    wait_for_status(&h.registry, job.id, JobStatus::Failed).await;
    let failed = h.registry.get(job.id).unwrap();
    assert_eq!(failed.error_detail.as_deref(), Some("ERROR: Unsupported URL"));
    assert!(failed.output_ref.is_none());
    assert!(failed.title.is_none());
}

#[tokio::test]
async fn infrastructure_fault_marks_error() {
    let h = harness(FakeEngine::new(Script::Fault("disk full")), 1).await;
    let job = h.registry.create(new_job("https://example.com/v1")).await.unwrap();
    h.executor.submit(job.id).await.unwrap();

    wait_for_status(&h.registry, job.id, JobStatus::Error).await;
    let errored = h.registry.get(job.id).unwrap();
    assert_eq!(errored.error_detail.as_deref(), Some("disk full"));
    assert!(errored.output_ref.is_none());
}

#[tokio::test]
async fn unsupported_format_fails_without_reaching_engine() {
    let engine = FakeEngine::new(Script::Succeed);
    let h = harness(Arc::clone(&engine), 1).await;
    let mut req = new_job("https://example.com/v1");
    req.format = "flac".to_string();
    let job = h.registry.create(req).await.unwrap();
    h.executor.submit(job.id).await.unwrap();

    wait_for_status(&h.registry, job.id, JobStatus::Failed).await;
    let failed = h.registry.get(job.id).unwrap();
    assert!(failed.error_detail.as_deref().unwrap().contains("unsupported format"));
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrency_stays_within_the_worker_bound() {
    let engine = FakeEngine::new(Script::Succeed);
    let h = harness(Arc::clone(&engine), 2).await;

    let mut ids = Vec::new();
    for i in 0..5 {
        let mut req = new_job(&format!("https://example.com/v{i}"));
        req.folder = format!("f{i}");
        let job = h.registry.create(req).await.unwrap();
        h.executor.submit(job.id).await.unwrap();
        ids.push(job.id);
    }
    for id in ids {
        wait_for_status(&h.registry, id, JobStatus::Completed).await;
    }
    assert_eq!(engine.calls.load(Ordering::SeqCst), 5);
    assert!(engine.peak.load(Ordering::SeqCst) <= 2, "worker bound exceeded");
}

#[tokio::test]
async fn delete_mid_download_cancels_the_worker() {
    let engine = FakeEngine::new(Script::Hang);
    let h = harness(Arc::clone(&engine), 1).await;
    let job = h.registry.create(new_job("https://example.com/v1")).await.unwrap();
    h.executor.submit(job.id).await.unwrap();

    wait_for_status(&h.registry, job.id, JobStatus::Downloading).await;
    // Give the worker a beat to register its cancel token.
    tokio::time::sleep(Duration::from_millis(30)).await;

    // The delete path: remove the record, then signal the worker.
    h.registry.remove(job.id).await.unwrap();
    assert!(h.cancels.cancel(job.id));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.registry.get(job.id).is_none());
    assert!(h.registry.snapshot(None).0.is_empty());
    // The worker slot is free again.
    let next = h.registry.create(new_job("https://example.com/v2")).await.unwrap();
    h.executor.submit(next.id).await.unwrap();
    wait_for_status(&h.registry, next.id, JobStatus::Downloading).await;
}

#[tokio::test]
async fn job_deleted_while_queued_is_skipped() {
    let engine = FakeEngine::new(Script::Succeed);
    let h = harness(Arc::clone(&engine), 1).await;
    let job = h.registry.create(new_job("https://example.com/v1")).await.unwrap();
    h.registry.remove(job.id).await.unwrap();
    h.executor.submit(job.id).await.unwrap();

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    assert!(h.registry.get(job.id).is_none());
}
