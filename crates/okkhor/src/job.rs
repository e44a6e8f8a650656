use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle states of a conversion job. `Completed` and `Failed` are
/// terminal; no transition leaves them, and none skips `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end-to-end conversion request. Status readers receive clones of this
/// record; mutation goes through the `JobStore` transition methods only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionJob {
    pub id: Uuid,
    /// Filename as submitted by the caller, used to derive artifact names.
    pub original_filename: String,
    pub status: JobStatus,
    /// Set once, after rasterization + extraction succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    /// Set once, after classification; sum of whitespace-split tokens over
    /// all pages' extracted text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u64>,
    /// Populated only on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Stored DOCX artifact filename, set on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docx_file: Option<String>,
    /// Stored transcript artifact filename, set on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txt_file: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ConversionJob {
    pub fn new(id: Uuid, original_filename: String) -> Self {
        Self {
            id,
            original_filename,
            status: JobStatus::Pending,
            total_pages: None,
            word_count: None,
            error_message: None,
            docx_file: None,
            txt_file: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Original filename without its extension, used in artifact names.
    pub fn basename(&self) -> &str {
        file_basename(&self.original_filename)
    }
}

/// Strips the final extension; inner dots are part of the base name.
pub fn file_basename(filename: &str) -> &str {
    filename
        .rsplit_once('.')
        .map(|(base, _)| base)
        .unwrap_or(filename)
}

/// Work item handed to the pool: everything a worker needs to process the
/// job without touching shared state beyond the job store.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub id: Uuid,
    pub source_path: PathBuf,
    pub original_filename: String,
}

/// Outcome reported back by a worker once a job reaches a terminal state.
#[derive(Debug)]
pub struct JobOutcome {
    pub job_id: Uuid,
    pub success: bool,
    pub docx_file: Option<String>,
    pub txt_file: Option<String>,
    pub error: Option<String>,
}

impl JobOutcome {
    pub fn success(request: &JobRequest, docx_file: String, txt_file: String) -> Self {
        Self {
            job_id: request.id,
            success: true,
            docx_file: Some(docx_file),
            txt_file: Some(txt_file),
            error: None,
        }
    }

    pub fn failure(request: &JobRequest, error: String) -> Self {
        Self {
            job_id: request.id,
            success: false,
            docx_file: None,
            txt_file: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_pending() {
        let job = ConversionJob::new(Uuid::new_v4(), "scan.pdf".to_string());
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.total_pages.is_none());
        assert!(job.word_count.is_none());
        assert!(job.error_message.is_none());
        assert!(job.docx_file.is_none());
        assert!(job.txt_file.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn test_basename_strips_extension() {
        let job = ConversionJob::new(Uuid::new_v4(), "bangla_book.pdf".to_string());
        assert_eq!(job.basename(), "bangla_book");
    }

    #[test]
    fn test_basename_without_extension() {
        let job = ConversionJob::new(Uuid::new_v4(), "noext".to_string());
        assert_eq!(job.basename(), "noext");
    }

    #[test]
    fn test_basename_keeps_inner_dots() {
        let job = ConversionJob::new(Uuid::new_v4(), "vol.1.scan.pdf".to_string());
        assert_eq!(job.basename(), "vol.1.scan");
    }

    #[test]
    fn test_status_terminal() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Processing).unwrap(),
            r#""processing""#
        );
        assert_eq!(
            serde_json::to_string(&JobStatus::Failed).unwrap(),
            r#""failed""#
        );
    }

    #[test]
    fn test_job_snapshot_omits_unset_fields() {
        let job = ConversionJob::new(Uuid::new_v4(), "scan.pdf".to_string());
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains(r#""status":"pending""#));
        assert!(!json.contains("totalPages"));
        assert!(!json.contains("errorMessage"));
    }

    #[test]
    fn test_outcome_failure_has_no_artifacts() {
        let request = JobRequest {
            id: Uuid::new_v4(),
            source_path: PathBuf::from("/tmp/in.pdf"),
            original_filename: "in.pdf".to_string(),
        };
        let outcome = JobOutcome::failure(&request, "boom".to_string());
        assert!(!outcome.success);
        assert!(outcome.docx_file.is_none());
        assert!(outcome.txt_file.is_none());
        assert_eq!(outcome.error.as_deref(), Some("boom"));
    }
}
