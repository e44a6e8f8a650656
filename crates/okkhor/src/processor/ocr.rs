use std::io::Cursor;

use crate::error::ConvertError;

/// Recognizes text on one rasterized page. Returns the raw recognized text,
/// which may be empty for a blank page. Must never mutate job state; the
/// orchestrator owns that.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, image_data: &[u8]) -> Result<String, ConvertError>;
}

/// Tesseract-backed extractor via leptess. The language string is fixed at
/// construction ("ben+eng" by default), never derived per input.
pub struct TesseractExtractor {
    languages: String,
}

impl TesseractExtractor {
    pub fn new(languages: &[String]) -> Self {
        let languages = if languages.is_empty() {
            "ben+eng".to_string()
        } else {
            languages.join("+")
        };
        Self { languages }
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }
}

impl TextExtractor for TesseractExtractor {
    fn extract(&self, image_data: &[u8]) -> Result<String, ConvertError> {
        let _span = tracing::info_span!("processor.ocr", languages = %self.languages).entered();

        // Normalize through the image crate first: leptess wants a format
        // leptonica understands, and pdftoppm output has varied over versions.
        let img = image::load_from_memory(image_data)
            .map_err(|e| ConvertError::Extraction(format!("Failed to load page image: {}", e)))?;

        let mut png_data = Vec::new();
        let mut cursor = Cursor::new(&mut png_data);
        img.write_to(&mut cursor, image::ImageFormat::Png)
            .map_err(|e| ConvertError::Extraction(format!("Failed to convert image: {}", e)))?;

        let mut lt = leptess::LepTess::new(None, &self.languages).map_err(|e| {
            ConvertError::Extraction(format!("Failed to initialize Tesseract: {}", e))
        })?;

        lt.set_image_from_mem(&png_data)
            .map_err(|e| ConvertError::Extraction(format!("Failed to set image for OCR: {}", e)))?;

        let text = lt
            .get_utf8_text()
            .map_err(|e| ConvertError::Extraction(format!("OCR failed: {}", e)))?;

        Ok(text.trim().to_string())
    }
}
