//! In-memory job record store.
//!
//! The store is the only shared mutable state between workers and status
//! readers. Each job is mutated by exactly one worker for its whole lifetime;
//! the store enforces transition legality so a bug cannot resurrect a
//! terminal job or set counters twice. Readers get cloned snapshots taken
//! under the read lock, never a half-written record.

use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use crate::error::StoreError;
use crate::job::{ConversionJob, JobStatus};

#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, ConversionJob>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: ConversionJob) {
        self.jobs.write().expect("job store poisoned").insert(job.id, job);
    }

    pub fn remove(&self, id: Uuid) -> Option<ConversionJob> {
        self.jobs.write().expect("job store poisoned").remove(&id)
    }

    /// Consistent snapshot of a single job.
    pub fn get(&self, id: Uuid) -> Option<ConversionJob> {
        self.jobs.read().expect("job store poisoned").get(&id).cloned()
    }

    /// All jobs, newest first.
    pub fn list(&self) -> Vec<ConversionJob> {
        let mut jobs: Vec<ConversionJob> = self
            .jobs
            .read()
            .expect("job store poisoned")
            .values()
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    pub fn mark_processing(&self, id: Uuid) -> Result<(), StoreError> {
        self.transition(id, JobStatus::Processing, |job| {
            job.status = JobStatus::Processing;
        })
    }

    /// Records the page count once extraction has succeeded. The job stays
    /// `processing`; counters are set at most once and never on a terminal
    /// record.
    pub fn record_total_pages(&self, id: Uuid, total_pages: u32) -> Result<(), StoreError> {
        self.update_counter(id, |job| {
            if job.total_pages.is_none() {
                job.total_pages = Some(total_pages);
            }
        })
    }

    pub fn record_word_count(&self, id: Uuid, word_count: u64) -> Result<(), StoreError> {
        self.update_counter(id, |job| {
            if job.word_count.is_none() {
                job.word_count = Some(word_count);
            }
        })
    }

    pub fn complete(
        &self,
        id: Uuid,
        docx_file: String,
        txt_file: String,
    ) -> Result<(), StoreError> {
        self.transition(id, JobStatus::Completed, |job| {
            job.status = JobStatus::Completed;
            job.docx_file = Some(docx_file);
            job.txt_file = Some(txt_file);
            job.completed_at = Some(chrono::Utc::now());
        })
    }

    pub fn fail(&self, id: Uuid, error_message: String) -> Result<(), StoreError> {
        self.transition(id, JobStatus::Failed, |job| {
            job.status = JobStatus::Failed;
            job.error_message = Some(error_message);
            job.completed_at = Some(chrono::Utc::now());
        })
    }

    fn transition<F>(&self, id: Uuid, to: JobStatus, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut ConversionJob),
    {
        let mut jobs = self.jobs.write().expect("job store poisoned");
        let job = jobs.get_mut(&id).ok_or(StoreError::JobNotFound(id))?;

        let legal = matches!(
            (job.status, to),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        );

        if !legal {
            return Err(StoreError::InvalidTransition {
                from: job.status,
                to,
            });
        }

        apply(job);
        Ok(())
    }

    fn update_counter<F>(&self, id: Uuid, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut ConversionJob),
    {
        let mut jobs = self.jobs.write().expect("job store poisoned");
        let job = jobs.get_mut(&id).ok_or(StoreError::JobNotFound(id))?;

        if job.status.is_terminal() {
            return Err(StoreError::InvalidTransition {
                from: job.status,
                to: job.status,
            });
        }

        apply(job);
        Ok(())
    }
}
