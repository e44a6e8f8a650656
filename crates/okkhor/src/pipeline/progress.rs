use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::broadcast::{JobPhase, JobProgressEvent, JobProgressTracker};

/// Events emitted by the pipeline while a job runs.
pub enum ProgressEvent {
    Phase { phase: JobPhase, message: String },
    Completed,
    Failed { error: String },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Bridges pipeline events onto the job progress broadcast channel.
pub struct BroadcastProgress {
    tracker: JobProgressTracker,
}

impl BroadcastProgress {
    pub fn new(
        job_id: Uuid,
        filename: &str,
        sender: Arc<broadcast::Sender<JobProgressEvent>>,
    ) -> Self {
        Self {
            tracker: JobProgressTracker::new(job_id, filename, sender),
        }
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase { phase, message } => {
                self.tracker.update_phase(phase, &message);
            }
            ProgressEvent::Completed => {
                self.tracker.completed("Conversion completed");
            }
            ProgressEvent::Failed { error } => {
                self.tracker.failed(&error);
            }
        }
    }
}
