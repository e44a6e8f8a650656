use std::path::PathBuf;
use thiserror::Error;

use crate::job::JobStatus;

#[derive(Error, Debug)]
pub enum OkkhorError {
    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Job store error: {0}")]
    Store(#[from] StoreError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

/// Errors raised by the conversion stages. Each variant maps to exactly one
/// pipeline stage; any of them moves the owning job to `failed`.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to rasterize PDF: {0}")]
    Rasterization(String),

    #[error("OCR extraction failed: {0}")]
    Extraction(String),

    #[error("Structure classification failed: {0}")]
    Classification(String),

    #[error("Failed to assemble output document: {0}")]
    Assembly(String),

    #[error("Artifact handoff failed: {0}")]
    Handoff(#[from] StorageError),

    #[error("Stage '{stage}' exceeded the {seconds}s time budget")]
    StageTimeout { stage: &'static str, seconds: u64 },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Job queue is full, submission rejected")]
    QueueFull,

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Job not found: {0}")]
    JobNotFound(uuid::Uuid),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}

/// Collaborator-facing validation errors: intake constraints and download
/// preconditions. These never originate inside the pipeline.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Unsupported input type '{0}', expected a PDF")]
    UnsupportedType(String),

    #[error("Input file is {size} bytes, exceeding the {max} byte limit")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Failed to inspect input file '{path}': {source}")]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Job not found: {0}")]
    JobNotFound(uuid::Uuid),

    #[error("Job is not completed (current status: {status})")]
    NotCompleted { status: JobStatus },

    #[error("Unknown download format '{0}', expected 'docx' or 'txt'")]
    UnknownFormat(String),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, OkkhorError>;
