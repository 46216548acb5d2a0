//! Types stored in and returned from the job database.

use serde::{Deserialize, Serialize};

/// Job identifier. Assigned by SQLite, unique and never reused.
pub type JobId = i64;

/// Lifecycle state of a job, stored as a lowercase string in the database.
///
/// `Failed` is a domain failure (the engine rejected the input); `Error` is
/// an infrastructure fault. Both are terminal; nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => JobStatus::Pending,
            "downloading" => JobStatus::Downloading,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Error,
        }
    }

    /// Terminal jobs never transition again and are eligible for the
    /// retention purge.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Error)
    }
}

/// Immutable inputs for a new job, as accepted by the submission API.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub owner_id: String,
    pub url: String,
    pub format: String,
    pub quality: String,
    pub folder: String,
}

/// One download request and its tracked lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub owner_id: String,
    pub url: String,
    pub format: String,
    pub quality: String,
    pub folder: String,
    pub status: JobStatus,
    pub title: Option<String>,
    pub byte_size: Option<i64>,
    pub output_ref: Option<String>,
    pub error_detail: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Partial update applied to an existing job. `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub title: Option<String>,
    pub byte_size: Option<i64>,
    pub output_ref: Option<String>,
    pub error_detail: Option<String>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Terminal success: engine-reported result, no error detail.
    pub fn completed(title: impl Into<String>, byte_size: i64, output_ref: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            title: Some(title.into()),
            byte_size: Some(byte_size),
            output_ref: Some(output_ref.into()),
            error_detail: None,
        }
    }

    /// Terminal domain failure: the engine rejected the input.
    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error_detail: Some(detail.into()),
            ..Default::default()
        }
    }

    /// Terminal infrastructure fault.
    pub fn errored(detail: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Error),
            error_detail: Some(detail.into()),
            ..Default::default()
        }
    }
}
