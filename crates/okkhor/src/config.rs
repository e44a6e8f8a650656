use std::path::PathBuf;

use serde::Deserialize;

/// Immutable engine configuration, passed by `Arc` into the worker pool and
/// pipeline at construction. There is no process-global mutable state.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Tesseract language models, joined with '+' for the OCR engine.
    #[serde(default = "default_languages")]
    pub ocr_languages: Vec<String>,

    /// Rasterization resolution. 300 DPI is required for reliable Bangla
    /// character recognition on scanned pages.
    #[serde(default = "default_dpi")]
    pub ocr_dpi: u32,

    /// Directory where converted artifacts are handed off.
    pub output_directory: PathBuf,

    /// Maximum accepted input size, enforced at intake.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Number of conversion workers.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Optional wall-clock budget per stage, checked at page boundaries.
    /// A job exceeding it fails with a timeout error.
    #[serde(default)]
    pub stage_timeout_secs: Option<u64>,
}

fn default_languages() -> Vec<String> {
    vec!["ben".to_string(), "eng".to_string()]
}

fn default_dpi() -> u32 {
    300
}

fn default_max_upload_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

impl EngineConfig {
    pub fn new<P: Into<PathBuf>>(output_directory: P) -> Self {
        Self {
            ocr_languages: default_languages(),
            ocr_dpi: default_dpi(),
            output_directory: output_directory.into(),
            max_upload_bytes: default_max_upload_bytes(),
            worker_count: default_worker_count(),
            stage_timeout_secs: None,
        }
    }

    /// Queue capacity for the worker pool: twice the worker count, so a
    /// saturated pool still absorbs a small burst before rejecting intake.
    pub fn queue_capacity(&self) -> usize {
        self.worker_count * 2
    }
}
