pub mod assemble;
pub mod broadcast;
pub mod classify;
pub mod config;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod processor;
pub mod service;
pub mod storage;
pub mod store;
pub mod worker;

pub use broadcast::{progress_channel, JobPhase, JobProgressEvent};
pub use classify::{ClassifiedLine, LineRole, StructureClassifier};
pub use config::EngineConfig;
pub use error::{
    ConvertError, OkkhorError, Result, ServiceError, StorageError, StoreError, WorkerError,
};
pub use job::{ConversionJob, JobOutcome, JobRequest, JobStatus};
pub use pipeline::{Pipeline, PipelineContext};
pub use service::ConversionService;
pub use store::JobStore;
pub use worker::WorkerPool;
