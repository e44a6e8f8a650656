use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info_span, warn};

use crate::assemble::{artifact_names, DocumentAssembler};
use crate::broadcast::JobPhase;
use crate::classify::{count_words, StructureClassifier};
use crate::config::EngineConfig;
use crate::error::ConvertError;
use crate::job::{JobOutcome, JobRequest};
use crate::processor::{
    IdentityRewriter, PageRasterizer, PageRewriter, PageText, PopplerRasterizer,
    TesseractExtractor, TextExtractor,
};
use crate::storage::ArtifactStorage;
use crate::store::JobStore;

use super::context::PipelineContext;
use super::progress::{ProgressEvent, ProgressReporter};

/// Per-stage wall-clock budget. Extraction checks it between pages, so a
/// stuck OCR page overruns by at most one page. Rasterization renders the
/// whole document in one call and is checked once it returns, so that stage
/// can overrun by the full render time before the job fails.
struct StageClock {
    started: Instant,
    budget: Option<Duration>,
}

impl StageClock {
    fn start(budget: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    fn check(&self, stage: &'static str) -> Result<(), ConvertError> {
        if let Some(budget) = self.budget {
            if self.started.elapsed() > budget {
                return Err(ConvertError::StageTimeout {
                    stage,
                    seconds: budget.as_secs(),
                });
            }
        }
        Ok(())
    }
}

/// Runs the four conversion stages for one job and owns every status
/// transition of that job. One pipeline instance lives per worker; jobs
/// never share mutable state beyond the job store.
pub struct Pipeline {
    rasterizer: Box<dyn PageRasterizer>,
    extractor: Box<dyn TextExtractor>,
    rewriter: Box<dyn PageRewriter>,
    classifier: StructureClassifier,
    assembler: DocumentAssembler,
    storage: ArtifactStorage,
    store: Arc<JobStore>,
    stage_timeout: Option<Duration>,
}

impl Pipeline {
    /// Production constructor — builds all stage components from config.
    pub fn from_config(config: &EngineConfig, store: Arc<JobStore>) -> Self {
        Self::with_components(
            Box::new(PopplerRasterizer::new(config.ocr_dpi)),
            Box::new(TesseractExtractor::new(&config.ocr_languages)),
            Box::new(IdentityRewriter),
            ArtifactStorage::new(&config.output_directory),
            store,
            config.stage_timeout_secs.map(Duration::from_secs),
        )
    }

    fn with_components(
        rasterizer: Box<dyn PageRasterizer>,
        extractor: Box<dyn TextExtractor>,
        rewriter: Box<dyn PageRewriter>,
        storage: ArtifactStorage,
        store: Arc<JobStore>,
        stage_timeout: Option<Duration>,
    ) -> Self {
        Self {
            rasterizer,
            extractor,
            rewriter,
            classifier: StructureClassifier::new(),
            assembler: DocumentAssembler::new(),
            storage,
            store,
            stage_timeout,
        }
    }

    /// Processes one job end to end. Every failure path lands the job in
    /// `failed` with a descriptive message; errors never escape past the
    /// job boundary.
    pub fn run(&self, request: JobRequest, progress: &dyn ProgressReporter) -> JobOutcome {
        let _span = info_span!("pipeline",
            job_id = %request.id,
            filename = %request.original_filename,
        )
        .entered();

        let mut ctx = PipelineContext::new(request);

        if let Err(e) = self.store.mark_processing(ctx.request.id) {
            return self.fail(&ctx.request, progress, format!("Failed to start job: {}", e));
        }

        // Stage 1: rasterize
        {
            let _step = info_span!("rasterize").entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Rasterizing,
                message: "Rendering PDF pages...".to_string(),
            });
            if let Err(e) = self.step_rasterize(&mut ctx) {
                return self.fail(&ctx.request, progress, e.to_string());
            }
        }

        // Stage 2: extract, strictly in page order
        {
            let _step = info_span!("extract").entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Extracting,
                message: "Running OCR over pages...".to_string(),
            });
            if let Err(e) = self.step_extract(&mut ctx) {
                return self.fail(&ctx.request, progress, e.to_string());
            }
        }

        // Stage 3: rewrite hook, classification, word count
        {
            let _step = info_span!("classify").entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Classifying,
                message: "Reconstructing document structure...".to_string(),
            });
            if let Err(e) = self.step_classify(&mut ctx) {
                return self.fail(&ctx.request, progress, e.to_string());
            }
        }

        // Stage 4: assemble artifacts
        {
            let _step = info_span!("assemble").entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Assembling,
                message: "Building DOCX and transcript...".to_string(),
            });
            if let Err(e) = self.step_assemble(&mut ctx) {
                return self.fail(&ctx.request, progress, e.to_string());
            }
        }

        // Stage 5: hand artifacts off to storage, then complete
        let (docx_file, txt_file) = {
            let _step = info_span!("handoff").entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Storing,
                message: "Storing artifacts...".to_string(),
            });
            match self.step_handoff(&ctx) {
                Ok(names) => names,
                Err(e) => return self.fail(&ctx.request, progress, e.to_string()),
            }
        };

        if let Err(e) = self
            .store
            .complete(ctx.request.id, docx_file.clone(), txt_file.clone())
        {
            // Completion was not recorded; the stored artifacts are orphans.
            self.storage.discard(&docx_file);
            self.storage.discard(&txt_file);
            return self.fail(&ctx.request, progress, format!("Failed to finalize job: {}", e));
        }

        progress.report(ProgressEvent::Completed);
        JobOutcome::success(&ctx.request, docx_file, txt_file)
    }

    fn step_rasterize(&self, ctx: &mut PipelineContext) -> Result<(), ConvertError> {
        let clock = StageClock::start(self.stage_timeout);
        let images = self.rasterizer.rasterize(&ctx.request.source_path)?;
        clock.check("rasterize")?;
        ctx.images = Some(images);
        Ok(())
    }

    fn step_extract(&self, ctx: &mut PipelineContext) -> Result<(), ConvertError> {
        let images = ctx.images.take().expect("rasterize step completed");
        let clock = StageClock::start(self.stage_timeout);

        let mut pages = Vec::with_capacity(images.len());
        for (index, image) in images.iter().enumerate() {
            clock.check("extract")?;
            let text = self.extractor.extract(image).map_err(|e| {
                ConvertError::Extraction(format!("page {}: {}", index + 1, e))
            })?;
            pages.push(PageText {
                number: index as u32 + 1,
                text,
            });
        }

        self.store
            .record_total_pages(ctx.request.id, pages.len() as u32)
            .map_err(|e| ConvertError::Extraction(e.to_string()))?;

        ctx.pages = Some(pages);
        Ok(())
    }

    fn step_classify(&self, ctx: &mut PipelineContext) -> Result<(), ConvertError> {
        let pages = ctx.pages.take().expect("extract step completed");

        // Proofreading hook: identity unless a rewriter was injected.
        let pages: Vec<PageText> = pages
            .into_iter()
            .map(|page| PageText {
                number: page.number,
                text: self.rewriter.rewrite(&page.text),
            })
            .collect();

        let classified: Vec<_> = pages
            .iter()
            .map(|page| self.classifier.classify_page(&page.text))
            .collect();
        let word_count: u64 = pages.iter().map(|page| count_words(&page.text)).sum();

        self.store
            .record_word_count(ctx.request.id, word_count)
            .map_err(|e| ConvertError::Classification(e.to_string()))?;

        ctx.pages = Some(pages);
        ctx.classified = Some(classified);
        ctx.word_count = Some(word_count);
        Ok(())
    }

    fn step_assemble(&self, ctx: &mut PipelineContext) -> Result<(), ConvertError> {
        let pages = ctx.pages.as_ref().expect("extract step completed");
        let classified = ctx.classified.as_ref().expect("classify step completed");
        ctx.artifacts = Some(self.assembler.assemble(pages, classified)?);
        Ok(())
    }

    /// Stores both artifacts. If the second write fails the first is
    /// discarded: a failed job must leave no partial outputs behind.
    fn step_handoff(&self, ctx: &PipelineContext) -> Result<(String, String), ConvertError> {
        let artifacts = ctx.artifacts.as_ref().expect("assemble step completed");
        let basename = crate::job::file_basename(&ctx.request.original_filename);
        let (docx_file, txt_file) = artifact_names(ctx.request.id, basename);

        self.storage
            .store(&artifacts.docx, &docx_file)
            .map_err(ConvertError::Handoff)?;

        if let Err(e) = self.storage.store(&artifacts.txt, &txt_file) {
            self.storage.discard(&docx_file);
            return Err(ConvertError::Handoff(e));
        }

        Ok((docx_file, txt_file))
    }

    fn fail(
        &self,
        request: &JobRequest,
        progress: &dyn ProgressReporter,
        error: String,
    ) -> JobOutcome {
        warn!(job_id = %request.id, error = %error, "conversion failed");
        if let Err(e) = self.store.fail(request.id, error.clone()) {
            warn!(job_id = %request.id, "could not record failure: {}", e);
        }
        progress.report(ProgressEvent::Failed {
            error: error.clone(),
        });
        JobOutcome::failure(request, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::TempDir;
    use uuid::Uuid;

    use crate::classify::LineRole;
    use crate::error::ConvertError;
    use crate::job::{ConversionJob, JobStatus};
    use crate::pipeline::progress::NoopProgress;

    const PAGE_ONE: &str = "Title One\nThis is a body paragraph that is reasonably long and \
                            exceeds one hundred characters in total length to force paragraph \
                            classification.";

    struct StubRasterizer {
        pages: usize,
    }

    impl PageRasterizer for StubRasterizer {
        fn rasterize(&self, _path: &std::path::Path) -> Result<Vec<Vec<u8>>, ConvertError> {
            Ok(vec![vec![0u8]; self.pages])
        }
    }

    struct FailingRasterizer;

    impl PageRasterizer for FailingRasterizer {
        fn rasterize(&self, _path: &std::path::Path) -> Result<Vec<Vec<u8>>, ConvertError> {
            Err(ConvertError::Rasterization(
                "PDF contains no pages".to_string(),
            ))
        }
    }

    struct ScriptedExtractor {
        texts: Vec<String>,
        calls: AtomicUsize,
    }

    impl ScriptedExtractor {
        fn new(texts: &[&str]) -> Self {
            Self {
                texts: texts.iter().map(|t| t.to_string()).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl TextExtractor for ScriptedExtractor {
        fn extract(&self, _image_data: &[u8]) -> Result<String, ConvertError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.texts[call].clone())
        }
    }

    struct FailingExtractor;

    impl TextExtractor for FailingExtractor {
        fn extract(&self, _image_data: &[u8]) -> Result<String, ConvertError> {
            Err(ConvertError::Extraction("engine crashed".to_string()))
        }
    }

    fn setup(
        rasterizer: Box<dyn PageRasterizer>,
        extractor: Box<dyn TextExtractor>,
        stage_timeout: Option<Duration>,
    ) -> (TempDir, Arc<JobStore>, Pipeline, JobRequest) {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(JobStore::new());

        let id = Uuid::new_v4();
        store.insert(ConversionJob::new(id, "scan.pdf".to_string()));
        let request = JobRequest {
            id,
            source_path: PathBuf::from("/ignored/by/stubs.pdf"),
            original_filename: "scan.pdf".to_string(),
        };

        let pipeline = Pipeline::with_components(
            rasterizer,
            extractor,
            Box::new(IdentityRewriter),
            ArtifactStorage::new(temp_dir.path()),
            Arc::clone(&store),
            stage_timeout,
        );

        (temp_dir, store, pipeline, request)
    }

    #[test]
    fn test_three_page_conversion_completes() {
        let (temp_dir, store, pipeline, request) = setup(
            Box::new(StubRasterizer { pages: 3 }),
            Box::new(ScriptedExtractor::new(&[PAGE_ONE, "", "2. Subtitle Two"])),
            None,
        );

        let outcome = pipeline.run(request.clone(), &NoopProgress);
        assert!(outcome.success, "failed: {:?}", outcome.error);

        let job = store.get(request.id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.total_pages, Some(3));

        let expected_words =
            count_words(PAGE_ONE) + count_words("") + count_words("2. Subtitle Two");
        assert_eq!(job.word_count, Some(expected_words));

        // Both artifacts stored under the suggested names.
        let docx_file = job.docx_file.unwrap();
        let txt_file = job.txt_file.unwrap();
        assert!(docx_file.starts_with(&request.id.to_string()));
        assert!(docx_file.ends_with("_scan.docx"));
        assert!(temp_dir.path().join(&docx_file).exists());
        assert!(temp_dir.path().join(&txt_file).exists());

        // Transcript is the lossless page-delimited concatenation.
        let transcript =
            std::fs::read_to_string(temp_dir.path().join(&txt_file)).unwrap();
        assert_eq!(
            transcript,
            format!(
                "--- Page 1 ---\n\n{}\n\n--- Page 2 ---\n\n\n\n--- Page 3 ---\n\n2. Subtitle Two\n\n",
                PAGE_ONE
            )
        );
    }

    #[test]
    fn test_page_roles_in_three_page_scenario() {
        let classifier = StructureClassifier::new();

        let page_one = classifier.classify_page(PAGE_ONE);
        assert_eq!(page_one[0].role, LineRole::Title);
        assert_eq!(page_one[1].role, LineRole::Paragraph);

        // An empty page yields exactly one empty-role line.
        let page_two = classifier.classify_page("");
        assert_eq!(page_two.len(), 1);
        assert_eq!(page_two[0].role, LineRole::Empty);

        // "2. Subtitle Two" satisfies the numbered-subtitle pattern, but the
        // title rule wins by precedence on such a short line.
        let page_three = classifier.classify_page("2. Subtitle Two");
        assert_eq!(page_three[0].role, LineRole::Title);
    }

    #[test]
    fn test_rasterization_failure_marks_job_failed() {
        let (_tmp, store, pipeline, request) = setup(
            Box::new(FailingRasterizer),
            Box::new(ScriptedExtractor::new(&[])),
            None,
        );

        let outcome = pipeline.run(request.clone(), &NoopProgress);
        assert!(!outcome.success);

        let job = store.get(request.id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        let message = job.error_message.unwrap();
        assert!(!message.is_empty());
        assert!(message.contains("no pages"), "got: {}", message);
        assert!(job.total_pages.is_none());
        assert!(job.word_count.is_none());
        assert!(job.docx_file.is_none());
        assert!(job.txt_file.is_none());
    }

    #[test]
    fn test_extraction_failure_fails_whole_job() {
        let (temp_dir, store, pipeline, request) = setup(
            Box::new(StubRasterizer { pages: 2 }),
            Box::new(FailingExtractor),
            None,
        );

        let outcome = pipeline.run(request.clone(), &NoopProgress);
        assert!(!outcome.success);

        let job = store.get(request.id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error_message.unwrap().contains("page 1"));
        // No partial page outputs: nothing reached storage.
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
        assert!(job.docx_file.is_none());
        assert!(job.txt_file.is_none());
    }

    #[test]
    fn test_partial_handoff_is_rolled_back() {
        let (temp_dir, store, pipeline, request) = setup(
            Box::new(StubRasterizer { pages: 1 }),
            Box::new(ScriptedExtractor::new(&["some text"])),
            None,
        );

        // Occupy the transcript's name so the second store fails.
        let (docx_file, txt_file) = artifact_names(request.id, "scan");
        std::fs::write(temp_dir.path().join(&txt_file), b"squatter").unwrap();

        let outcome = pipeline.run(request.clone(), &NoopProgress);
        assert!(!outcome.success);

        let job = store.get(request.id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        // The already-written DOCX was discarded.
        assert!(!temp_dir.path().join(&docx_file).exists());
    }

    #[test]
    fn test_zero_budget_times_out() {
        let (_tmp, store, pipeline, request) = setup(
            Box::new(StubRasterizer { pages: 1 }),
            Box::new(ScriptedExtractor::new(&["text"])),
            Some(Duration::ZERO),
        );

        let outcome = pipeline.run(request.clone(), &NoopProgress);
        assert!(!outcome.success);

        let job = store.get(request.id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error_message.unwrap().contains("time budget"));
    }

    #[test]
    fn test_page_indices_are_contiguous() {
        let (_tmp, _store, pipeline, request) = setup(
            Box::new(StubRasterizer { pages: 4 }),
            Box::new(ScriptedExtractor::new(&["a", "b", "c", "d"])),
            None,
        );

        let mut ctx = PipelineContext::new(request.clone());
        pipeline.store.mark_processing(request.id).unwrap();
        pipeline.step_rasterize(&mut ctx).unwrap();
        pipeline.step_extract(&mut ctx).unwrap();

        let pages = ctx.pages.as_ref().unwrap();
        let numbers: Vec<u32> = pages.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        let texts: Vec<&str> = pages.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_counter_rejection_reports_classification_stage() {
        let (_tmp, store, pipeline, request) = setup(
            Box::new(StubRasterizer { pages: 1 }),
            Box::new(ScriptedExtractor::new(&["some text"])),
            None,
        );

        let mut ctx = PipelineContext::new(request.clone());
        store.mark_processing(request.id).unwrap();
        pipeline.step_rasterize(&mut ctx).unwrap();
        pipeline.step_extract(&mut ctx).unwrap();

        // The job reaches a terminal state out from under the classify step;
        // the resulting store rejection must name the classification stage.
        store.fail(request.id, "external failure".to_string()).unwrap();
        let err = pipeline.step_classify(&mut ctx).unwrap_err();
        assert!(matches!(err, ConvertError::Classification(_)));
        assert!(err.to_string().contains("classification"), "got: {}", err);
    }

    #[test]
    fn test_word_count_recorded_before_completion() {
        let (_tmp, store, pipeline, request) = setup(
            Box::new(StubRasterizer { pages: 1 }),
            Box::new(ScriptedExtractor::new(&["পাঁচ word line here now"])),
            None,
        );

        pipeline.run(request.clone(), &NoopProgress);
        assert_eq!(store.get(request.id).unwrap().word_count, Some(5));
    }
}
