pub mod docx;

use std::fmt::Write;

use uuid::Uuid;

use crate::classify::ClassifiedLine;
use crate::error::ConvertError;
use crate::processor::PageText;

/// The two generated artifacts for one job, as in-memory byte streams.
/// Durable storage is the collaborator's job.
pub struct OutputArtifacts {
    pub docx: Vec<u8>,
    pub txt: Vec<u8>,
}

/// Suggested artifact filenames: `{job-id}_{original-basename}.{ext}`.
pub fn artifact_names(job_id: Uuid, basename: &str) -> (String, String) {
    (
        format!("{}_{}.docx", job_id, basename),
        format!("{}_{}.txt", job_id, basename),
    )
}

pub struct DocumentAssembler;

impl DocumentAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Builds both artifacts from the same page ordering. `pages` carries the
    /// raw extracted text (transcript input); `classified_pages` the per-line
    /// roles (styled document input). The two must agree on page count.
    pub fn assemble(
        &self,
        pages: &[PageText],
        classified_pages: &[Vec<ClassifiedLine>],
    ) -> Result<OutputArtifacts, ConvertError> {
        let _span = tracing::info_span!("assemble", pages = pages.len()).entered();

        if pages.len() != classified_pages.len() {
            return Err(ConvertError::Assembly(format!(
                "page count mismatch: {} raw pages, {} classified pages",
                pages.len(),
                classified_pages.len()
            )));
        }

        let docx = docx::build_docx(classified_pages)?;
        let txt = build_transcript(pages).into_bytes();

        Ok(OutputArtifacts { docx, txt })
    }
}

impl Default for DocumentAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain transcript: a page marker, the page's raw text untouched, and a
/// blank-line separator. Lossless with respect to the extracted text.
pub fn build_transcript(pages: &[PageText]) -> String {
    let mut out = String::new();
    for page in pages {
        // Writing to a String cannot fail.
        let _ = write!(out, "--- Page {} ---\n\n", page.number);
        out.push_str(&page.text);
        out.push_str("\n\n");
    }
    out
}
