//! One worker's ownership of a single job, from claim to terminal state.

use std::sync::Arc;

use crate::artifacts;
use crate::engine::{EngineError, FetchSpec, Fetched, MediaEngine};
use crate::formats;
use crate::notify::NotificationHub;
use crate::registry::JobRegistry;
use crate::store::{Job, JobId, JobStatus, JobUpdate};

use super::{CancelMap, ExecutorOptions};

pub(super) async fn run_job(
    registry: Arc<JobRegistry>,
    hub: Arc<NotificationHub>,
    engine: Arc<dyn MediaEngine>,
    cancels: Arc<CancelMap>,
    options: ExecutorOptions,
    id: JobId,
) {
    // Deleted while still queued.
    let Some(job) = registry.get(id) else {
        tracing::debug!(job = id, "skipping job removed before execution");
        return;
    };

    // The claim is durable before the engine runs: a crash mid-download
    // leaves an observable `downloading` row.
    if let Err(e) = registry.apply(id, &JobUpdate::status(JobStatus::Downloading)).await {
        tracing::error!(job = id, "could not persist downloading state: {e:#}");
        return;
    }
    hub.publish(&job.owner_id);
    tracing::info!(job = id, url = %job.url, "download started");

    let mut cancel_rx = cancels.register(id);
    // A delete may have raced the registration; don't start a fetch for a
    // record that is already gone.
    if registry.get(id).is_none() {
        cancels.unregister(id);
        tracing::debug!(job = id, "job removed before fetch; skipping");
        return;
    }

    let update = match prepare(&options, &job) {
        Err(update) => Some(update),
        Ok(spec) => {
            if let Err(e) = tokio::fs::create_dir_all(&spec.dest_dir).await {
                Some(JobUpdate::errored(format!(
                    "could not create output directory {}: {}",
                    spec.dest_dir.display(),
                    e
                )))
            } else {
                tokio::select! {
                    res = engine.fetch(spec) => conclude(&registry, &options, &job, res).await,
                    _ = &mut cancel_rx => {
                        // The deleting caller owns the record; dropping the
                        // fetch future kills the engine subprocess.
                        tracing::info!(job = id, "download cancelled");
                        None
                    }
                }
            }
        }
    };

    cancels.unregister(id);
    if let Some(update) = update {
        if let Err(e) = registry.apply(id, &update).await {
            tracing::error!(job = id, "could not record outcome: {e:#}");
        }
    }
    hub.publish(&job.owner_id);
}

/// Resolve the format plan into an engine spec, or a terminal update when
/// the combination is unsupported.
fn prepare(options: &ExecutorOptions, job: &Job) -> Result<FetchSpec, JobUpdate> {
    let Some(plan) = formats::plan(&job.format, &job.quality) else {
        return Err(JobUpdate::failed(format!(
            "unsupported format/quality: {}/{}",
            job.format, job.quality
        )));
    };
    Ok(FetchSpec {
        url: job.url.clone(),
        selector: plan.selector,
        extra_args: plan.extra_args,
        dest_dir: options.download_dir.join(&job.folder),
    })
}

/// Turn an engine result into the job's terminal update. `None` means the
/// record vanished mid-fetch and nothing should be written.
async fn conclude(
    registry: &JobRegistry,
    options: &ExecutorOptions,
    job: &Job,
    res: Result<Fetched, EngineError>,
) -> Option<JobUpdate> {
    match res {
        Ok(fetched) => {
            if registry.get(job.id).is_none() {
                // Deleted while the fetch was finishing; don't leave an
                // orphaned artifact behind.
                remove_artifact(&fetched.final_path).await;
                return None;
            }
            match artifacts::output_ref(&options.download_dir, &fetched.final_path, options.public_base_url.as_deref())
            {
                Some(output_ref) => {
                    tracing::info!(job = job.id, path = %fetched.final_path.display(), "download completed");
                    Some(JobUpdate::completed(fetched.title, fetched.byte_size, output_ref))
                }
                None => Some(JobUpdate::errored(format!(
                    "engine wrote outside the download directory: {}",
                    fetched.final_path.display()
                ))),
            }
        }
        Err(EngineError::Rejected(detail)) => {
            tracing::warn!(job = job.id, "engine rejected download: {detail}");
            Some(JobUpdate::failed(detail))
        }
        Err(EngineError::Infra(detail)) => {
            tracing::error!(job = job.id, "download infrastructure fault: {detail}");
            Some(JobUpdate::errored(detail))
        }
    }
}

async fn remove_artifact(path: &std::path::Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "removed orphaned artifact"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "could not remove orphaned artifact: {e}"),
    }
}
