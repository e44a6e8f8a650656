//! Job progress events over a tokio broadcast channel.
//!
//! Collaborators (e.g. an SSE endpoint) subscribe to follow a conversion as
//! it moves through the pipeline stages. Events carry metadata only; OCR
//! text and artifact bytes never travel over the channel.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::job::JobStatus;

/// Pipeline stage a job is currently in, for progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Queued,
    Rasterizing,
    Extracting,
    Classifying,
    Assembling,
    Storing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    pub job_id: Uuid,
    pub filename: String,
    pub status: JobStatus,
    pub phase: JobPhase,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Per-job handle that stamps shared metadata onto every event. Send errors
/// are ignored: no subscriber just means nobody is watching.
pub struct JobProgressTracker {
    job_id: Uuid,
    filename: String,
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressTracker {
    pub fn new(
        job_id: Uuid,
        filename: &str,
        sender: Arc<broadcast::Sender<JobProgressEvent>>,
    ) -> Self {
        Self {
            job_id,
            filename: filename.to_string(),
            sender,
        }
    }

    pub fn update_phase(&self, phase: JobPhase, message: &str) {
        self.send(JobStatus::Processing, phase, message, None);
    }

    pub fn completed(&self, message: &str) {
        self.send(JobStatus::Completed, JobPhase::Completed, message, None);
    }

    pub fn failed(&self, error: &str) {
        self.send(
            JobStatus::Failed,
            JobPhase::Failed,
            "Conversion failed",
            Some(error.to_string()),
        );
    }

    fn send(&self, status: JobStatus, phase: JobPhase, message: &str, error: Option<String>) {
        let _ = self.sender.send(JobProgressEvent {
            job_id: self.job_id,
            filename: self.filename.clone(),
            status,
            phase,
            message: message.to_string(),
            error,
            timestamp: Utc::now(),
        });
    }
}

/// Creates the shared progress channel. Slow subscribers that fall more than
/// `capacity` events behind lose the oldest events, which is acceptable for
/// a progress display.
pub fn progress_channel(capacity: usize) -> Arc<broadcast::Sender<JobProgressEvent>> {
    let (sender, _) = broadcast::channel(capacity);
    Arc::new(sender)
}
