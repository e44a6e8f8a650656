use std::path::Path;
use std::process::Command;

use crate::error::ConvertError;

/// Renders every page of a PDF into a raster image, in document order.
/// The returned sequence length equals the page count.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, path: &Path) -> Result<Vec<Vec<u8>>, ConvertError>;
}

/// Production rasterizer: `lopdf` for structure validation and page count,
/// `pdftoppm` (poppler-utils) for the actual rendering. Scanned PDFs are
/// image containers, so rendering is the only way to get at the content.
pub struct PopplerRasterizer {
    dpi: u32,
}

impl PopplerRasterizer {
    pub fn new(dpi: u32) -> Self {
        Self { dpi }
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }
}

impl PageRasterizer for PopplerRasterizer {
    fn rasterize(&self, path: &Path) -> Result<Vec<Vec<u8>>, ConvertError> {
        let _span = tracing::info_span!("processor.raster", path = %path.display()).entered();

        let pdf_bytes = std::fs::read(path).map_err(|e| ConvertError::ReadDocument {
            path: path.to_path_buf(),
            source: e,
        })?;

        let page_count = page_count(&pdf_bytes)?;

        let mut images = Vec::with_capacity(page_count);
        for page_num in 1..=page_count {
            images.push(render_page(&pdf_bytes, page_num as u32, self.dpi)?);
        }

        Ok(images)
    }
}

/// Page count of a PDF, validating it parses as a document at all.
/// Corrupt input and zero-page documents are fatal rasterization errors.
pub fn page_count(pdf_bytes: &[u8]) -> Result<usize, ConvertError> {
    let doc = lopdf::Document::load_mem(pdf_bytes)
        .map_err(|e| ConvertError::Rasterization(format!("Failed to load PDF: {}", e)))?;

    let count = doc.get_pages().len();
    if count == 0 {
        return Err(ConvertError::Rasterization(
            "PDF contains no pages".to_string(),
        ));
    }

    Ok(count)
}

fn render_page(pdf_bytes: &[u8], page_num: u32, dpi: u32) -> Result<Vec<u8>, ConvertError> {
    let temp_dir = std::env::temp_dir();
    let pdf_path = temp_dir.join(format!("okkhor_src_{}.pdf", uuid::Uuid::new_v4()));
    let output_prefix = temp_dir.join(format!("okkhor_page_{}", uuid::Uuid::new_v4()));

    std::fs::write(&pdf_path, pdf_bytes)
        .map_err(|e| ConvertError::Rasterization(format!("Failed to write temp PDF: {}", e)))?;

    let output = Command::new("pdftoppm")
        .args([
            "-png",
            "-r",
            &dpi.to_string(),
            "-f",
            &page_num.to_string(),
            "-l",
            &page_num.to_string(),
        ])
        .arg(&pdf_path)
        .arg(&output_prefix)
        .output();

    let _ = std::fs::remove_file(&pdf_path);

    let output = output.map_err(|e| {
        ConvertError::Rasterization(format!(
            "Failed to run pdftoppm: {}. Make sure poppler-utils is installed.",
            e
        ))
    })?;

    if !output.status.success() {
        return Err(ConvertError::Rasterization(format!(
            "pdftoppm failed on page {}: {}",
            page_num,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    // pdftoppm pads the page suffix depending on the total page count.
    let candidates = [
        format!("{}-{}.png", output_prefix.display(), page_num),
        format!("{}-{:02}.png", output_prefix.display(), page_num),
        format!("{}-{:03}.png", output_prefix.display(), page_num),
    ];
    let image_path = candidates
        .iter()
        .find(|p| Path::new(p).exists())
        .ok_or_else(|| {
            ConvertError::Rasterization(format!(
                "Rendered image for page {} not found",
                page_num
            ))
        })?;

    let image_data = std::fs::read(image_path)
        .map_err(|e| ConvertError::Rasterization(format!("Failed to read rendered image: {}", e)))?;

    let _ = std::fs::remove_file(image_path);

    Ok(image_data)
}
