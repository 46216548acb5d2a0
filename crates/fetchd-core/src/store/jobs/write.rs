//! Job write operations: add, partial update, remove, startup reconcile.

use anyhow::Result;

use super::super::db::{unix_timestamp, JobStore};
use super::super::types::{JobId, JobStatus, JobUpdate, NewJob};

impl JobStore {
    /// Insert a new `pending` job. The id and timestamps are assigned here;
    /// `last_insert_rowid` makes the append-and-assign atomic under
    /// concurrent submissions.
    pub async fn add_job(&self, new: &NewJob) -> Result<JobId> {
        let now = unix_timestamp();
        let row_id = sqlx::query(
            r#"
            INSERT INTO jobs (
                owner_id, url, format, quality, folder,
                status, title, byte_size, output_ref, error_detail,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5,
                      ?6, NULL, NULL, NULL, NULL,
                      ?7, ?8)
            "#,
        )
        .bind(&new.owner_id)
        .bind(&new.url)
        .bind(&new.format)
        .bind(&new.quality)
        .bind(&new.folder)
        .bind(JobStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(row_id)
    }

    /// Partial merge: unset fields are left untouched. A single UPDATE
    /// statement, so concurrent writes to the same field are linearized by
    /// SQLite (and in practice each job has one writer, its worker).
    pub async fn update_job(&self, id: JobId, update: &JobUpdate) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = COALESCE(?1, status),
                title = COALESCE(?2, title),
                byte_size = COALESCE(?3, byte_size),
                output_ref = COALESCE(?4, output_ref),
                error_detail = COALESCE(?5, error_detail),
                updated_at = ?6
            WHERE id = ?7
            "#,
        )
        .bind(update.status.map(JobStatus::as_str))
        .bind(&update.title)
        .bind(update.byte_size)
        .bind(&update.output_ref)
        .bind(&update.error_detail)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Permanently remove a job row.
    ///
    /// Artifact cleanup is handled separately by higher layers.
    pub async fn remove_job(&self, id: JobId) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Reconcile jobs stranded by a crash: any non-terminal row becomes a
    /// terminal `error` with a distinguishing detail. Call at startup,
    /// before the registry seeds. Returns the number of jobs reconciled.
    pub async fn mark_interrupted(&self) -> Result<u64> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'error',
                error_detail = 'interrupted by restart',
                updated_at = ?1
            WHERE status IN ('pending', 'downloading')
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }
}
