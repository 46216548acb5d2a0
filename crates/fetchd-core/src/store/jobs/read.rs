//! Job read operations: list, get, and purge candidates.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::super::db::JobStore;
use super::super::types::{Job, JobId, JobStatus};

fn job_from_row(row: &SqliteRow) -> Job {
    let status: String = row.get("status");
    Job {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        url: row.get("url"),
        format: row.get("format"),
        quality: row.get("quality"),
        folder: row.get("folder"),
        status: JobStatus::parse(&status),
        title: row.get("title"),
        byte_size: row.get("byte_size"),
        output_ref: row.get("output_ref"),
        error_detail: row.get("error_detail"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl JobStore {
    /// List all jobs, newest first.
    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, url, format, quality, folder, status,
                   title, byte_size, output_ref, error_detail,
                   created_at, updated_at
            FROM jobs
            ORDER BY id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(job_from_row).collect())
    }

    /// List one owner's jobs, newest first.
    pub async fn list_jobs_for_owner(&self, owner_id: &str) -> Result<Vec<Job>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, url, format, quality, folder, status,
                   title, byte_size, output_ref, error_detail,
                   created_at, updated_at
            FROM jobs
            WHERE owner_id = ?1
            ORDER BY id DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(job_from_row).collect())
    }

    /// Fetch a single job row.
    pub async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, url, format, quality, folder, status,
                   title, byte_size, output_ref, error_detail,
                   created_at, updated_at
            FROM jobs
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(job_from_row))
    }

    /// Terminal jobs created before `cutoff`, oldest first. The status guard
    /// keeps in-flight jobs out of the janitor's reach no matter their age.
    pub async fn list_purgeable(&self, cutoff: i64) -> Result<Vec<Job>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, url, format, quality, folder, status,
                   title, byte_size, output_ref, error_detail,
                   created_at, updated_at
            FROM jobs
            WHERE status IN ('completed', 'failed', 'error')
              AND created_at < ?1
            ORDER BY id ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(job_from_row).collect())
    }
}
