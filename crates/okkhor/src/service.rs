use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::broadcast::JobProgressEvent;
use crate::config::EngineConfig;
use crate::error::ServiceError;
use crate::job::{ConversionJob, JobOutcome, JobRequest, JobStatus};
use crate::store::JobStore;
use crate::worker::WorkerPool;

/// Download artifact selector, parsed from the caller-supplied format string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DownloadFormat {
    Docx,
    Txt,
}

impl DownloadFormat {
    fn parse(format: &str) -> Result<Self, ServiceError> {
        match format {
            "docx" => Ok(Self::Docx),
            "txt" => Ok(Self::Txt),
            other => Err(ServiceError::UnknownFormat(other.to_string())),
        }
    }
}

/// Front door of the conversion engine: validates intake, tracks job
/// records, and feeds the worker pool. All methods take `&self`; the
/// service is shared behind an `Arc` by whatever surface embeds it.
pub struct ConversionService {
    config: Arc<EngineConfig>,
    store: Arc<JobStore>,
    pool: WorkerPool,
}

impl ConversionService {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self::with_progress_sender(config, None)
    }

    pub fn with_progress_sender(
        config: Arc<EngineConfig>,
        progress_sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
    ) -> Self {
        let store = Arc::new(JobStore::new());
        let pool =
            WorkerPool::with_progress_sender(Arc::clone(&config), Arc::clone(&store), progress_sender);
        Self {
            config,
            store,
            pool,
        }
    }

    /// Validates and enqueues a conversion. On success the returned record
    /// is in `pending`; processing starts when a worker picks it up. A full
    /// queue rejects the submission and leaves no record behind.
    pub fn submit(
        &self,
        source_path: &Path,
        original_filename: &str,
    ) -> Result<ConversionJob, ServiceError> {
        let is_pdf = mime_guess::from_path(original_filename)
            .iter()
            .any(|m| m == mime_guess::mime::APPLICATION_PDF);
        if !is_pdf {
            return Err(ServiceError::UnsupportedType(
                original_filename.to_string(),
            ));
        }

        let metadata =
            std::fs::metadata(source_path).map_err(|e| ServiceError::UnreadableInput {
                path: source_path.to_path_buf(),
                source: e,
            })?;
        if metadata.len() > self.config.max_upload_bytes {
            return Err(ServiceError::FileTooLarge {
                size: metadata.len(),
                max: self.config.max_upload_bytes,
            });
        }

        let id = Uuid::new_v4();
        let job = ConversionJob::new(id, original_filename.to_string());
        self.store.insert(job.clone());

        let request = JobRequest {
            id,
            source_path: source_path.to_path_buf(),
            original_filename: original_filename.to_string(),
        };
        if let Err(e) = self.pool.submit(request) {
            // The job never entered the queue, so drop its record too.
            self.store.remove(id);
            return Err(e.into());
        }

        info!("Accepted job {} ({})", id, original_filename);
        Ok(job)
    }

    /// Snapshot of one job record.
    pub fn status(&self, id: Uuid) -> Result<ConversionJob, ServiceError> {
        self.store.get(id).ok_or(ServiceError::JobNotFound(id))
    }

    /// All job records, newest first.
    pub fn list(&self) -> Vec<ConversionJob> {
        self.store.list()
    }

    /// Resolves the on-disk path of a completed job's artifact. Fails for
    /// unknown jobs, non-terminal or failed jobs, and unknown formats.
    pub fn download(&self, id: Uuid, format: &str) -> Result<PathBuf, ServiceError> {
        let format = DownloadFormat::parse(format)?;
        let job = self.status(id)?;

        if job.status != JobStatus::Completed {
            return Err(ServiceError::NotCompleted { status: job.status });
        }

        let filename = match format {
            DownloadFormat::Docx => job.docx_file,
            DownloadFormat::Txt => job.txt_file,
        }
        // Completed jobs always carry both artifact handles.
        .ok_or(ServiceError::NotCompleted { status: job.status })?;

        Ok(self.config.output_directory.join(filename))
    }

    /// Blocks until a worker reports the next terminal outcome. Returns
    /// `None` once the pool has shut down.
    pub fn recv_outcome(&self) -> Option<JobOutcome> {
        self.pool.recv_result()
    }

    pub fn try_recv_outcome(&self) -> Option<JobOutcome> {
        self.pool.try_recv_result()
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Stops accepting work and joins all workers.
    pub fn shutdown(self) {
        self.pool.shutdown();
        self.pool.wait();
    }
}
